//! MongoDB adapter over the synchronous driver.

use bson::{Bson, Document};
use docbridge_engine::{DocumentStore, Error, RecordId, Result, UpdateOutcome};
use mongodb::options::{FindOptions, UpdateOptions};
use mongodb::results::UpdateResult;
use mongodb::sync::{Client, Collection, Database};

fn store_error(e: mongodb::error::Error) -> Error {
    Error::Store(e.to_string())
}

fn outcome(result: UpdateResult) -> UpdateOutcome {
    UpdateOutcome {
        matched: result.matched_count,
        modified: result.modified_count,
        upserted_id: result.upserted_id.map(RecordId::new),
    }
}

/// A [`DocumentStore`] backed by one MongoDB database.
///
/// The driver pools connections internally; one instance serves the whole
/// process.
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).map_err(store_error)?;
        Ok(Self {
            db: client.database(database),
        })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

impl DocumentStore for MongoStore {
    fn collection_names(&self) -> Result<Vec<String>> {
        self.db.list_collection_names(None).map_err(store_error)
    }

    fn count(&self, collection: &str, filter: Document) -> Result<u64> {
        self.collection(collection)
            .count_documents(filter, None)
            .map_err(store_error)
    }

    fn distinct(&self, collection: &str, field: &str, filter: Document) -> Result<Vec<Bson>> {
        self.collection(collection)
            .distinct(field, filter, None)
            .map_err(store_error)
    }

    fn find_one(&self, collection: &str, filter: Document) -> Result<Option<Document>> {
        self.collection(collection)
            .find_one(filter, None)
            .map_err(store_error)
    }

    fn find(
        &self,
        collection: &str,
        filter: Document,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Document>> {
        let options = FindOptions::builder()
            .skip((skip > 0).then_some(skip))
            .limit((limit > 0).then(|| i64::try_from(limit).unwrap_or(i64::MAX)))
            .build();

        self.collection(collection)
            .find(filter, options)
            .map_err(store_error)?
            .map(|record| record.map_err(store_error))
            .collect()
    }

    fn insert_one(&self, collection: &str, record: Document) -> Result<Bson> {
        self.collection(collection)
            .insert_one(record, None)
            .map(|result| result.inserted_id)
            .map_err(store_error)
    }

    fn insert_many(&self, collection: &str, records: Vec<Document>) -> Result<Vec<Bson>> {
        let count = records.len();
        let mut inserted = self
            .collection(collection)
            .insert_many(records, None)
            .map_err(store_error)?
            .inserted_ids;

        (0..count)
            .map(|index| {
                inserted.remove(&index).ok_or_else(|| {
                    Error::Store(format!("no inserted id reported for document {index}"))
                })
            })
            .collect()
    }

    fn update_one(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<UpdateOutcome> {
        let options = UpdateOptions::builder().upsert(upsert).build();
        self.collection(collection)
            .update_one(filter, update, options)
            .map(outcome)
            .map_err(store_error)
    }

    fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> Result<UpdateOutcome> {
        self.collection(collection)
            .update_many(filter, update, None)
            .map(outcome)
            .map_err(store_error)
    }

    fn delete_one(&self, collection: &str, filter: Document) -> Result<u64> {
        self.collection(collection)
            .delete_one(filter, None)
            .map(|result| result.deleted_count)
            .map_err(store_error)
    }

    fn delete_many(&self, collection: &str, filter: Document) -> Result<u64> {
        self.collection(collection)
            .delete_many(filter, None)
            .map(|result| result.deleted_count)
            .map_err(store_error)
    }
}
