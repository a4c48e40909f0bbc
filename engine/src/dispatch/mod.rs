//! Named-operation dispatcher.
//!
//! A [`Dispatcher`] owns a closed table from method name to [`Operation`],
//! built once in [`Dispatcher::new`]. A request can only reach an operation
//! listed in that table. Each operation declares how its positional
//! arguments are shaped out of the request's `data` object:
//!
//! | method | `data` | arguments |
//! |---|---|---|
//! | `mongo-connection-check` | | none |
//! | `mongo-insert`, `mongo-get`, `mongo-get-all`, `mongo-delete` | `collection`, `data` | `(collection, data)` |
//! | `mongo-update`, `mongo-upsert` | `collection`, `data.filter`, `data.update` | `(collection, filter, update)` |
//! | `cache-connection-check` | | none |
//! | `cache-store` | `key`, `value`, `expire?` | `(key, value, expire or 0)` |
//! | `cache-get`, `cache-delete` | `key` | `(key)` |
//! | `cache-get-all-keys`, `cache-get-all`, `cache-flush` | | none |
//! | `data-encode` | `cdc`, `secret`, `key` | `(cdc, secret, key)` |

mod envelope;
mod operations;
pub mod shape;

use std::collections::HashMap;
use std::fmt;

use bson::Document;
use serde_json::Value;

use crate::cache::CacheClient;
use crate::database::Database;
use crate::record::document_from_json;
use crate::{Error, Result};

pub use envelope::{Reply, Request, Status};

/// Backends the operations run against.
#[derive(Debug, Clone)]
pub struct Services {
    pub db: Database,
    pub cache: Option<CacheClient>,
}

impl Services {
    pub fn new(db: Database, cache: Option<CacheClient>) -> Self {
        Self { db, cache }
    }

    /// The cache client, or [`Error::CacheUnavailable`] when none is configured.
    pub fn cache(&self) -> Result<&CacheClient> {
        self.cache.as_ref().ok_or(Error::CacheUnavailable)
    }
}

type BareFn = fn(&Services) -> Result<Reply>;
type PayloadFn = fn(&Services, &str, &Value) -> Result<Reply>;
type FilterUpdateFn = fn(&Services, &str, Document, Document) -> Result<Reply>;
type KeyFn = fn(&Services, &str) -> Result<Reply>;
type KeyValueFn = fn(&Services, &str, &Value, u64) -> Result<Reply>;
type EncodeFn = fn(&Services, &str, &str, &str) -> Result<Reply>;

/// An allow-listed operation together with its argument convention.
#[derive(Clone, Copy)]
pub enum Operation {
    /// No arguments.
    Bare(BareFn),
    /// `(collection, data)`. With `required` set, `data` must be present and
    /// non-empty.
    CollectionPayload {
        required: bool,
        run: PayloadFn,
    },
    /// `(collection, data.filter, data.update)`.
    CollectionFilterUpdate(FilterUpdateFn),
    /// `(key)`.
    Key(KeyFn),
    /// `(key, value, expire)`; a missing expiry is 0.
    KeyValueExpire(KeyValueFn),
    /// `(cdc, secret, key)`.
    Encode(EncodeFn),
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let convention = match self {
            Operation::Bare(_) => "Bare",
            Operation::CollectionPayload { .. } => "CollectionPayload",
            Operation::CollectionFilterUpdate(_) => "CollectionFilterUpdate",
            Operation::Key(_) => "Key",
            Operation::KeyValueExpire(_) => "KeyValueExpire",
            Operation::Encode(_) => "Encode",
        };
        f.write_str(convention)
    }
}

impl Operation {
    /// Shape `data` into this operation's arguments and run it.
    pub fn invoke(&self, services: &Services, data: &Value) -> Result<Reply> {
        let params = shape::params(data)?;

        match *self {
            Operation::Bare(run) => run(services),
            Operation::CollectionPayload { required, run } => {
                let collection = shape::string(params, "collection")?;
                let payload = if required {
                    shape::non_empty(params, "data")?
                } else {
                    params.get("data").unwrap_or(&Value::Null)
                };
                run(services, collection, payload)
            }
            Operation::CollectionFilterUpdate(run) => {
                let collection = shape::string(params, "collection")?;
                let payload = shape::params(shape::non_empty(params, "data")?)?;
                let filter = document_from_json("filter", shape::required(payload, "filter")?)?;
                let update = document_from_json("update", shape::required(payload, "update")?)?;
                run(services, collection, filter, update)
            }
            Operation::Key(run) => run(services, shape::string(params, "key")?),
            Operation::KeyValueExpire(run) => {
                let key = shape::string(params, "key")?;
                let value = params
                    .get("value")
                    .ok_or_else(|| Error::MissingParameter("value".to_string()))?;
                let expire = shape::unsigned(params, "expire")?;
                run(services, key, value, expire)
            }
            Operation::Encode(run) => {
                let cdc = shape::string(params, "cdc")?;
                let secret = shape::string(params, "secret")?;
                let key = shape::string(params, "key")?;
                run(services, cdc, secret, key)
            }
        }
    }
}

/// Resolves method names against the allow-list and runs them.
pub struct Dispatcher {
    services: Services,
    operations: HashMap<&'static str, Operation>,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("services", &self.services)
            .field("methods", &self.methods())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(services: Services) -> Self {
        use operations as ops;
        use Operation::*;

        let operations = HashMap::from([
            ("mongo-connection-check", Bare(ops::mongo_connection_check)),
            (
                "mongo-insert",
                CollectionPayload {
                    required: true,
                    run: ops::mongo_insert,
                },
            ),
            (
                "mongo-get",
                CollectionPayload {
                    required: false,
                    run: ops::mongo_get,
                },
            ),
            (
                "mongo-get-all",
                CollectionPayload {
                    required: false,
                    run: ops::mongo_get_all,
                },
            ),
            (
                "mongo-delete",
                CollectionPayload {
                    required: true,
                    run: ops::mongo_delete,
                },
            ),
            ("mongo-update", CollectionFilterUpdate(ops::mongo_update)),
            ("mongo-upsert", CollectionFilterUpdate(ops::mongo_upsert)),
            ("cache-connection-check", Bare(ops::cache_connection_check)),
            ("cache-store", KeyValueExpire(ops::cache_store)),
            ("cache-get", Key(ops::cache_get)),
            ("cache-delete", Key(ops::cache_delete)),
            ("cache-get-all-keys", Bare(ops::cache_get_all_keys)),
            ("cache-get-all", Bare(ops::cache_get_all)),
            ("cache-flush", Bare(ops::cache_flush)),
            ("data-encode", Encode(ops::data_encode)),
        ]);

        Self {
            services,
            operations,
        }
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Allow-listed method names, sorted.
    pub fn methods(&self) -> Vec<&'static str> {
        let mut methods: Vec<_> = self.operations.keys().copied().collect();
        methods.sort_unstable();
        methods
    }

    pub fn resolve(&self, method: &str) -> Result<Operation> {
        self.operations
            .get(method)
            .copied()
            .ok_or_else(|| Error::UnknownMethod(method.to_string()))
    }

    /// Resolve, shape and run one request.
    pub fn dispatch(&self, request: &Request) -> Result<Reply> {
        let operation = self.resolve(&request.method)?;
        tracing::debug!(method = %request.method, convention = ?operation, "dispatching");
        operation.invoke(&self.services, &request.data)
    }
}
