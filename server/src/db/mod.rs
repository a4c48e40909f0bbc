//! Document store backends.

mod mongo;

use std::sync::Arc;

use docbridge_engine::memory::MemoryStore;
use docbridge_engine::{DocumentStore, Result};

use crate::config::MEMORY_URL;

pub use mongo::MongoStore;

/// Open the store named by `url`. Blocks while the driver resolves the
/// deployment, so call it off the async runtime.
pub fn connect(url: &str, database: &str) -> Result<Arc<dyn DocumentStore>> {
    if url == MEMORY_URL {
        tracing::info!("Using in-process document store");
        return Ok(Arc::new(MemoryStore::new()));
    }

    tracing::info!(database, "Connecting to MongoDB");
    Ok(Arc::new(MongoStore::connect(url, database)?))
}
