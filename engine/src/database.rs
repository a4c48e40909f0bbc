//! Document store client.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::model::Model;
use crate::pool::WritePool;
use crate::store::DocumentStore;

/// Collection holding account records.
pub const ACCOUNTS: &str = "accounts";
/// Collection holding user records.
pub const USERS: &str = "users";
/// Collection receiving the request audit log.
pub const REQUEST_LOGS: &str = "request_logs";
/// Collection holding scheduler state.
pub const SCHEDULER_DATA: &str = "scheduler_data";

/// Result of a database connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseCheck {
    pub status: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<String>,
    pub message: String,
}

/// Handle to one named database, shared by every [`Model`] built from it.
#[derive(Clone)]
pub struct Database {
    name: Arc<str>,
    store: Arc<dyn DocumentStore>,
    pool: Arc<WritePool>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl Database {
    pub fn new(name: &str, store: Arc<dyn DocumentStore>, pool: Arc<WritePool>) -> Self {
        Self {
            name: Arc::from(name),
            store,
            pool,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The write pool backing `*_on_thread` operations.
    pub fn pool(&self) -> &Arc<WritePool> {
        &self.pool
    }

    /// Model bound to `collection`.
    pub fn model(&self, collection: &str) -> Model {
        Model::new(Arc::clone(&self.store), Arc::clone(&self.pool), collection)
    }

    pub fn accounts(&self) -> Model {
        self.model(ACCOUNTS)
    }

    pub fn users(&self) -> Model {
        self.model(USERS)
    }

    pub fn request_logs(&self) -> Model {
        self.model(REQUEST_LOGS)
    }

    pub fn scheduler_data(&self) -> Model {
        self.model(SCHEDULER_DATA)
    }

    /// List the collections to prove the connection is alive. Never fails;
    /// errors are captured in the result.
    pub fn check_connection(&self) -> DatabaseCheck {
        match self.store.collection_names() {
            Ok(collections) => DatabaseCheck {
                status: true,
                collections,
                message: "Database connection successful".to_string(),
            },
            Err(e) => {
                tracing::warn!(database = %self.name, error = %e, "database connection check failed");
                DatabaseCheck {
                    status: false,
                    collections: Vec::new(),
                    message: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::{Error, Result};
    use bson::{doc, Bson, Document};

    fn database() -> Database {
        Database::new(
            "docbridge",
            Arc::new(MemoryStore::new()),
            Arc::new(WritePool::new(1, 4).unwrap()),
        )
    }

    #[test]
    fn named_models_share_the_store() {
        let db = database();
        db.users().insert(Bson::Document(doc! { "name": "a" })).unwrap();

        assert_eq!(db.model(USERS).count(Document::new()).unwrap(), 1);
        assert_eq!(db.accounts().count(Document::new()).unwrap(), 0);
        assert_eq!(db.request_logs().collection(), "request_logs");
        assert_eq!(db.scheduler_data().collection(), "scheduler_data");
    }

    #[test]
    fn connection_check_lists_collections() {
        let db = database();
        db.accounts().insert(Bson::Document(doc! {})).unwrap();
        db.users().insert(Bson::Document(doc! {})).unwrap();

        let check = db.check_connection();
        assert!(check.status);
        assert_eq!(check.collections, vec!["accounts", "users"]);
    }

    struct Offline;

    impl DocumentStore for Offline {
        fn collection_names(&self) -> Result<Vec<String>> {
            Err(Error::Store("server selection timeout".into()))
        }
        fn count(&self, _: &str, _: Document) -> Result<u64> {
            unreachable!()
        }
        fn distinct(&self, _: &str, _: &str, _: Document) -> Result<Vec<Bson>> {
            unreachable!()
        }
        fn find_one(&self, _: &str, _: Document) -> Result<Option<Document>> {
            unreachable!()
        }
        fn find(&self, _: &str, _: Document, _: u64, _: u64) -> Result<Vec<Document>> {
            unreachable!()
        }
        fn insert_one(&self, _: &str, _: Document) -> Result<Bson> {
            unreachable!()
        }
        fn insert_many(&self, _: &str, _: Vec<Document>) -> Result<Vec<Bson>> {
            unreachable!()
        }
        fn update_one(
            &self,
            _: &str,
            _: Document,
            _: Document,
            _: bool,
        ) -> Result<crate::UpdateOutcome> {
            unreachable!()
        }
        fn update_many(&self, _: &str, _: Document, _: Document) -> Result<crate::UpdateOutcome> {
            unreachable!()
        }
        fn delete_one(&self, _: &str, _: Document) -> Result<u64> {
            unreachable!()
        }
        fn delete_many(&self, _: &str, _: Document) -> Result<u64> {
            unreachable!()
        }
    }

    #[test]
    fn connection_check_captures_failure() {
        let db = Database::new(
            "docbridge",
            Arc::new(Offline),
            Arc::new(WritePool::new(1, 1).unwrap()),
        );

        let check = db.check_connection();
        assert!(!check.status);
        assert!(check.collections.is_empty());
        assert_eq!(check.message, "store error: server selection timeout");
    }
}
