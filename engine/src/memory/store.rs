//! In-process document store.

use std::collections::HashMap;

use bson::{oid::ObjectId, Bson, Document};
use parking_lot::RwLock;

use super::filter::{lookup, matches, values_equal};
use super::update::{apply, seed_from_filter};
use crate::record::{RecordId, ID_FIELD};
use crate::store::{DocumentStore, UpdateOutcome};
use crate::{Error, Result};

/// A [`DocumentStore`] held in process memory.
///
/// Collections keep records in insertion order, which is the natural order
/// reported by `find`. Collections are created on first insert and survive
/// having all their records deleted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_into(records: &mut Vec<Document>, mut record: Document) -> Result<Bson> {
        let id = match record.get(ID_FIELD) {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                let mut with_id = Document::new();
                with_id.insert(ID_FIELD, id.clone());
                with_id.extend(record);
                record = with_id;
                id
            }
        };

        if records.iter().any(|r| r.get(ID_FIELD) == Some(&id)) {
            return Err(Error::Store(format!(
                "duplicate key error: {{ _id: {id} }}"
            )));
        }

        records.push(record);
        Ok(id)
    }

    fn select<'a>(
        records: &'a [Document],
        filter: &'a Document,
    ) -> impl Iterator<Item = Result<&'a Document>> + 'a {
        records
            .iter()
            .filter_map(move |r| match matches(r, filter) {
                Ok(true) => Some(Ok(r)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            })
    }

    fn update_where(
        &self,
        collection: &str,
        filter: &Document,
        update: &Document,
        many: bool,
    ) -> Result<UpdateOutcome> {
        let mut collections = self.collections.write();
        let Some(records) = collections.get_mut(collection) else {
            return Ok(UpdateOutcome::default());
        };

        let mut outcome = UpdateOutcome::default();
        for record in records.iter_mut() {
            if !matches(record, filter)? {
                continue;
            }
            outcome.matched += 1;

            let mut updated = record.clone();
            if apply(&mut updated, update)? {
                *record = updated;
                outcome.modified += 1;
            }
            if !many {
                break;
            }
        }
        Ok(outcome)
    }

    fn delete_where(&self, collection: &str, filter: &Document, many: bool) -> Result<u64> {
        let mut collections = self.collections.write();
        let Some(records) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let mut doomed = Vec::new();
        for (i, record) in records.iter().enumerate() {
            if matches(record, filter)? {
                doomed.push(i);
                if !many {
                    break;
                }
            }
        }

        for i in doomed.iter().rev() {
            records.remove(*i);
        }
        Ok(doomed.len() as u64)
    }
}

impl DocumentStore for MemoryStore {
    fn collection_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn count(&self, collection: &str, filter: Document) -> Result<u64> {
        let collections = self.collections.read();
        let Some(records) = collections.get(collection) else {
            return Ok(0);
        };

        let mut count = 0;
        for record in Self::select(records, &filter) {
            record?;
            count += 1;
        }
        Ok(count)
    }

    fn distinct(&self, collection: &str, field: &str, filter: Document) -> Result<Vec<Bson>> {
        let collections = self.collections.read();
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let mut values: Vec<Bson> = Vec::new();
        for record in Self::select(records, &filter) {
            let candidates = match lookup(record?, field) {
                None => continue,
                Some(Bson::Array(items)) => items.clone(),
                Some(value) => vec![value.clone()],
            };
            for candidate in candidates {
                if !values.iter().any(|v| values_equal(v, &candidate)) {
                    values.push(candidate);
                }
            }
        }
        Ok(values)
    }

    fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
        let collections = self.collections.read();
        let Some(records) = collections.get(collection) else {
            return Ok(None);
        };

        let found = Self::select(records, &filter)
            .next()
            .transpose()
            .map(|found| found.cloned());
        found
    }

    fn find(
        &self,
        collection: &str,
        filter: Document,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Document>> {
        let collections = self.collections.read();
        let Some(records) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let take = if limit == 0 { usize::MAX } else { limit as usize };
        Self::select(records, &filter)
            .skip(skip as usize)
            .take(take)
            .map(|r| r.cloned())
            .collect()
    }

    fn insert_one(&self, collection: &str, record: Document) -> Result<Bson> {
        let mut collections = self.collections.write();
        let records = collections.entry(collection.to_string()).or_default();
        Self::insert_into(records, record)
    }

    fn insert_many(&self, collection: &str, records: Vec<Document>) -> Result<Vec<Bson>> {
        if records.is_empty() {
            return Err(Error::Store(
                "insert_many requires at least one document".to_string(),
            ));
        }

        let mut collections = self.collections.write();
        let target = collections.entry(collection.to_string()).or_default();
        records
            .into_iter()
            .map(|record| Self::insert_into(target, record))
            .collect()
    }

    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        let outcome = self.update_where(collection, &filter, &update, false)?;
        if outcome.matched > 0 || !upsert {
            return Ok(outcome);
        }

        let mut record = seed_from_filter(&filter)?;
        apply(&mut record, &update)?;
        let id = self.insert_one(collection, record)?;

        Ok(UpdateOutcome {
            matched: 0,
            modified: 0,
            upserted_id: Some(RecordId::new(id)),
        })
    }

    fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome> {
        self.update_where(collection, &filter, &update, true)
    }

    fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
        self.delete_where(collection, &filter, false)
    }

    fn delete_many(&self, collection: &str, filter: Document) -> Result<u64> {
        self.delete_where(collection, &filter, true)
    }
}
