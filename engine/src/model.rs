//! Collection model.
//!
//! A [`Model`] is bound to one named collection for its lifetime and maps
//! each operation one-to-one onto a [`DocumentStore`] primitive. Identifier
//! normalization happens here: records leaving a model carry their `_id` in
//! canonical string form.

use std::fmt;
use std::sync::Arc;

use bson::{doc, Bson, Document};

use crate::pool::WritePool;
use crate::record::{normalize_id, Record, RecordId};
use crate::store::{DocumentStore, UpdateOutcome};
use crate::Result;

/// CRUD surface over one named collection.
///
/// Cloning is cheap; clones share the store, the write pool and the
/// collection handle.
#[derive(Clone)]
pub struct Model {
    store: Arc<dyn DocumentStore>,
    pool: Arc<WritePool>,
    collection: Arc<str>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

impl Model {
    pub fn new(store: Arc<dyn DocumentStore>, pool: Arc<WritePool>, collection: &str) -> Self {
        Self {
            store,
            pool,
            collection: Arc::from(collection),
        }
    }

    /// Name of the bound collection.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn count(&self, filter: Document) -> Result<u64> {
        self.store.count(&self.collection, filter)
    }

    /// Distinct values of `field` across the whole collection.
    pub fn distinct(&self, field: &str) -> Result<Vec<Bson>> {
        self.store.distinct(&self.collection, field, Document::new())
    }

    /// Record with the given identifier. A malformed identifier is reported
    /// as not found.
    pub fn find_by_id(&self, id: &str) -> Result<Option<Record>> {
        let Ok(id) = RecordId::parse(id) else {
            tracing::debug!(collection = %self.collection, id, "lookup with malformed id");
            return Ok(None);
        };
        self.find_one(id.filter())
    }

    pub fn find_one(&self, filter: Document) -> Result<Option<Record>> {
        Ok(self
            .store
            .find_one(&self.collection, filter)?
            .map(normalize_id))
    }

    /// Records matching `filter` in natural order, `skip` applied before
    /// `limit`. A `limit` of 0 returns everything after `skip`.
    pub fn find_all(&self, filter: Document, skip: u64, limit: u64) -> Result<Vec<Record>> {
        let records = self.store.find(&self.collection, filter, skip, limit)?;
        Ok(records.into_iter().map(normalize_id).collect())
    }

    /// Insert a document or an array of documents.
    ///
    /// Returns one identifier per inserted document, in order. Anything that
    /// is neither a document nor an array of documents yields `None`.
    pub fn insert(&self, data: Bson) -> Result<Option<Vec<RecordId>>> {
        insert_into(self.store.as_ref(), &self.collection, data)
    }

    /// Merge `changes` into matching records. With `update_all` unset at
    /// most one record, the first in natural order, is touched. Returns the
    /// number of records modified.
    pub fn update(&self, filter: Document, changes: Document, update_all: bool) -> Result<u64> {
        update_in(
            self.store.as_ref(),
            &self.collection,
            filter,
            changes,
            update_all,
        )
    }

    /// Merge `changes` into the record with the given identifier.
    pub fn update_by_id(&self, id: &str, changes: Document) -> Result<u64> {
        let id = RecordId::parse(id)?;
        self.update(id.filter(), changes, false)
    }

    /// Merge `changes` into the first matching record, creating one from the
    /// filter's equality conditions when nothing matches.
    pub fn upsert(&self, filter: Document, changes: Document) -> Result<UpdateOutcome> {
        self.store
            .update_one(&self.collection, filter, doc! { "$set": changes }, true)
    }

    /// Delete every matching record. Returns the number deleted.
    pub fn delete(&self, filter: Document) -> Result<u64> {
        self.store.delete_many(&self.collection, filter)
    }

    pub fn delete_by_id(&self, id: &str) -> Result<u64> {
        let id = RecordId::parse(id)?;
        self.store.delete_one(&self.collection, id.filter())
    }

    /// [`insert`](Self::insert) on the write pool. Returns immediately; the
    /// outcome is only ever logged.
    pub fn insert_on_thread(&self, data: Bson) {
        let store = Arc::clone(&self.store);
        let collection = Arc::clone(&self.collection);
        self.pool.submit("insert", Arc::clone(&self.collection), move || {
            insert_into(store.as_ref(), &collection, data).map(drop)
        });
    }

    /// [`update`](Self::update) on the write pool.
    pub fn update_on_thread(&self, filter: Document, changes: Document, update_all: bool) {
        let store = Arc::clone(&self.store);
        let collection = Arc::clone(&self.collection);
        self.pool.submit("update", Arc::clone(&self.collection), move || {
            update_in(store.as_ref(), &collection, filter, changes, update_all).map(drop)
        });
    }

    /// [`delete`](Self::delete) on the write pool.
    pub fn delete_on_thread(&self, filter: Document) {
        let store = Arc::clone(&self.store);
        let collection = Arc::clone(&self.collection);
        self.pool.submit("delete", Arc::clone(&self.collection), move || {
            store.delete_many(&collection, filter).map(drop)
        });
    }
}

fn insert_into(
    store: &dyn DocumentStore,
    collection: &str,
    data: Bson,
) -> Result<Option<Vec<RecordId>>> {
    match data {
        Bson::Document(record) => {
            let id = store.insert_one(collection, record)?;
            Ok(Some(vec![RecordId::new(id)]))
        }
        Bson::Array(items) => {
            let records: Option<Vec<Document>> = items
                .into_iter()
                .map(|item| match item {
                    Bson::Document(record) => Some(record),
                    _ => None,
                })
                .collect();
            let Some(records) = records else {
                return Ok(None);
            };

            let ids = store.insert_many(collection, records)?;
            Ok(Some(ids.into_iter().map(RecordId::new).collect()))
        }
        _ => Ok(None),
    }
}

fn update_in(
    store: &dyn DocumentStore,
    collection: &str,
    filter: Document,
    changes: Document,
    update_all: bool,
) -> Result<u64> {
    let update = doc! { "$set": changes };
    let outcome = if update_all {
        store.update_many(collection, filter, update)?
    } else {
        store.update_one(collection, filter, update, false)?
    };
    Ok(outcome.modified)
}
