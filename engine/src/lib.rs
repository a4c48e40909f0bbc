//! # Docbridge Engine
//!
//! A generic data-access core: a collection model over a document store, a
//! key/value cache client, and a closed dispatcher that maps named test
//! operations onto them.
//!
//! ## Design Principles
//!
//! - **Seams, not drivers**: storage is reached through the [`DocumentStore`]
//!   and [`CacheBackend`] traits; network drivers live in the server crate
//! - **Blocking and simple**: every operation is one synchronous request to
//!   the backing store, with no retries and no cross-operation locking
//! - **Closed dispatch**: only methods listed in the [`Dispatcher`] table are
//!   reachable by name
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! Records are schema-less BSON documents with a store-assigned `_id`.
//! A [`Model`] normalizes identifiers into their canonical string form before
//! records leave it.
//!
//! ### Models
//!
//! A [`Model`] is bound to one collection and exposes count, distinct, find,
//! insert, update, upsert and delete. The `*_on_thread` variants hand the
//! write to a bounded [`WritePool`] and return immediately: no result, no
//! error, no ordering guarantee.
//!
//! ### Cache
//!
//! [`CacheClient`] stores any serializable value under a string key, with
//! optional expiry, over a [`CacheBackend`].
//!
//! ### Dispatch
//!
//! The [`Dispatcher`] resolves a method name against its allow-list, shapes
//! the request's `data` into positional arguments and wraps the result in a
//! [`Reply`].
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use docbridge_engine::memory::MemoryStore;
//! use docbridge_engine::{Database, Dispatcher, Request, Services, WritePool};
//! use serde_json::json;
//!
//! let db = Database::new(
//!     "docbridge",
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(WritePool::with_defaults().unwrap()),
//! );
//!
//! // Work with a model directly
//! let users = db.users();
//! let ids = users
//!     .insert(bson::bson!({ "name": "Alice" }))
//!     .unwrap()
//!     .unwrap();
//! let alice = users.find_by_id(&ids[0].to_string()).unwrap().unwrap();
//! assert_eq!(alice.get_str("name").unwrap(), "Alice");
//!
//! // Or through the dispatcher
//! let dispatcher = Dispatcher::new(Services::new(db, None));
//! let reply = dispatcher
//!     .dispatch(&Request::new(
//!         "mongo-get",
//!         json!({ "collection": "users", "data": { "name": "Alice" } }),
//!     ))
//!     .unwrap();
//! assert_eq!(reply.data.as_array().unwrap().len(), 1);
//! ```

pub mod cache;
pub mod database;
pub mod dispatch;
pub mod encode;
pub mod error;
pub mod memory;
pub mod model;
pub mod pool;
pub mod record;
pub mod store;

// Re-export main types at crate root
pub use cache::{CacheBackend, CacheClient, ConnectionCheck};
pub use database::{Database, DatabaseCheck};
pub use dispatch::{Dispatcher, Operation, Reply, Request, Services, Status};
pub use error::{Error, Result};
pub use model::Model;
pub use pool::WritePool;
pub use record::{Record, RecordId};
pub use store::{DocumentStore, UpdateOutcome};
