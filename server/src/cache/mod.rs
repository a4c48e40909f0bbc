//! Cache backends.

mod redis;

use std::sync::Arc;

use docbridge_engine::memory::MemoryCache;
use docbridge_engine::{CacheClient, Result};

use crate::config::MEMORY_URL;

pub use self::redis::RedisCache;

/// Build the cache client for `url`, or `None` when no cache is configured.
pub fn connect(url: Option<&str>) -> Result<Option<CacheClient>> {
    let Some(url) = url else {
        tracing::info!("No cache configured; cache methods are disabled");
        return Ok(None);
    };

    if url == MEMORY_URL {
        tracing::info!("Using in-process cache");
        return Ok(Some(CacheClient::new(Arc::new(MemoryCache::new()))));
    }

    tracing::info!("Using Redis cache");
    Ok(Some(CacheClient::new(Arc::new(RedisCache::open(url)?))))
}
