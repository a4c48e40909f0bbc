//! Key/value cache client.
//!
//! [`CacheBackend`] is the byte-level seam a cache server has to provide;
//! [`CacheClient`] layers opaque value serialization (MessagePack) and
//! expiry handling on top of it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{Error, Result};

/// Longest accepted expiry, in seconds.
pub const MAX_EXPIRE_SECONDS: u64 = u32::MAX as u64;

/// Byte-level primitives of a key/value cache server.
pub trait CacheBackend: Send + Sync {
    /// Round-trip to the server.
    fn ping(&self) -> Result<()>;

    /// Store `value` under `key`, replacing any previous entry and its
    /// expiry. The expiry is armed in the same request as the write.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Stored bytes, or `None` when the key is missing or expired.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove `key`. Returns whether it existed.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Whether `key` currently exists.
    fn exists(&self, key: &str) -> Result<bool>;

    /// All keys matching the glob `pattern`.
    fn scan(&self, pattern: &str) -> Result<Vec<String>>;

    /// Remove every entry of the current database.
    fn flush(&self) -> Result<()>;
}

/// Result of a connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionCheck {
    pub status: bool,
    pub message: String,
}

impl ConnectionCheck {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
        }
    }
}

/// Cache client storing arbitrary serializable values.
#[derive(Clone)]
pub struct CacheClient {
    backend: Arc<dyn CacheBackend>,
}

impl fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheClient").finish_non_exhaustive()
    }
}

impl CacheClient {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Probe the server. Never fails; connectivity errors land in the result.
    pub fn check_connection(&self) -> ConnectionCheck {
        match self.backend.ping() {
            Ok(()) => ConnectionCheck::ok("Cache connection successful."),
            Err(e) => {
                tracing::warn!(error = %e, "cache connection check failed");
                ConnectionCheck::failed(e.to_string())
            }
        }
    }

    /// Serialize and store `value`. An expiry of `None` or `Some(0)` keeps the
    /// entry until it is deleted or flushed.
    pub fn set<T>(&self, key: &str, value: &T, expire_seconds: Option<u64>) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let ttl = match expire_seconds {
            None | Some(0) => None,
            Some(secs) if secs > MAX_EXPIRE_SECONDS => {
                return Err(Error::invalid_parameter(
                    "expire",
                    format!("must be at most {MAX_EXPIRE_SECONDS} seconds"),
                ));
            }
            Some(secs) => Some(Duration::from_secs(secs)),
        };
        let bytes = rmp_serde::to_vec_named(value)?;
        self.backend.set(key, bytes, ttl)
    }

    /// Fetch and deserialize the value under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.backend.get(key)? {
            Some(bytes) => Ok(Some(rmp_serde::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn delete(&self, key: &str) -> Result<bool> {
        self.backend.delete(key)
    }

    pub fn exists(&self, key: &str) -> Result<bool> {
        self.backend.exists(key)
    }

    /// Keys matching a glob pattern (`*`, `?`, `[...]`, `\` escapes).
    pub fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.backend.scan(pattern)
    }

    /// Snapshot of every entry, deserialized as JSON values.
    ///
    /// Not atomic: keys that vanish between the scan and the read are left
    /// out, and entries written by other clients in a foreign encoding are
    /// skipped with a warning.
    pub fn get_all(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        let mut entries = BTreeMap::new();
        for key in self.backend.scan("*")? {
            let Some(bytes) = self.backend.get(&key)? else {
                continue;
            };
            match rmp_serde::from_slice(&bytes) {
                Ok(value) => {
                    entries.insert(key, value);
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "skipping undecodable cache entry"),
            }
        }
        Ok(entries)
    }

    /// Destroy every entry in the cache database.
    pub fn flushdb(&self) -> Result<()> {
        tracing::info!("flushing cache database");
        self.backend.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryCache;
    use crate::Error;
    use serde::Deserialize;
    use serde_json::json;
    use std::thread;

    fn client() -> CacheClient {
        CacheClient::new(Arc::new(MemoryCache::new()))
    }

    struct Unreachable;

    impl CacheBackend for Unreachable {
        fn ping(&self) -> Result<()> {
            Err(Error::Cache("connection refused".into()))
        }
        fn set(&self, _: &str, _: Vec<u8>, _: Option<Duration>) -> Result<()> {
            Err(Error::Cache("connection refused".into()))
        }
        fn get(&self, _: &str) -> Result<Option<Vec<u8>>> {
            Err(Error::Cache("connection refused".into()))
        }
        fn delete(&self, _: &str) -> Result<bool> {
            Err(Error::Cache("connection refused".into()))
        }
        fn exists(&self, _: &str) -> Result<bool> {
            Err(Error::Cache("connection refused".into()))
        }
        fn scan(&self, _: &str) -> Result<Vec<String>> {
            Err(Error::Cache("connection refused".into()))
        }
        fn flush(&self) -> Result<()> {
            Err(Error::Cache("connection refused".into()))
        }
    }

    #[test]
    fn round_trip_and_delete() {
        let cache = client();
        cache.set("k", "v", None).unwrap();

        assert_eq!(cache.get::<String>("k").unwrap(), Some("v".to_string()));
        assert!(cache.delete("k").unwrap());
        assert_eq!(cache.get::<String>("k").unwrap(), None);
    }

    #[test]
    fn stores_structured_values() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Session {
            user: String,
            roles: Vec<String>,
        }

        let cache = client();
        let session = Session {
            user: "alice".into(),
            roles: vec!["admin".into()],
        };
        cache.set("session:1", &session, None).unwrap();

        assert_eq!(cache.get::<Session>("session:1").unwrap(), Some(session));
        assert_eq!(
            cache.get::<serde_json::Value>("session:1").unwrap(),
            Some(json!({"user": "alice", "roles": ["admin"]}))
        );
    }

    #[test]
    fn entry_expires_after_one_second() {
        let cache = client();
        cache.set("k", "v", Some(1)).unwrap();
        assert!(cache.exists("k").unwrap());

        thread::sleep(Duration::from_millis(1100));
        assert_eq!(cache.get::<String>("k").unwrap(), None);
    }

    #[test]
    fn zero_expiry_means_none() {
        let cache = client();
        cache.set("k", &1, Some(0)).unwrap();

        thread::sleep(Duration::from_millis(10));
        assert_eq!(cache.get::<i32>("k").unwrap(), Some(1));
    }

    #[test]
    fn oversized_expiry_is_rejected() {
        let cache = client();

        assert!(matches!(
            cache.set("k", "v", Some(u64::MAX)),
            Err(Error::InvalidParameter { ref name, .. }) if name == "expire"
        ));
        assert!(!cache.exists("k").unwrap());

        cache.set("k", "v", Some(MAX_EXPIRE_SECONDS)).unwrap();
        assert_eq!(cache.get::<String>("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn get_all_and_keys() {
        let cache = client();
        cache.set("a", &1, None).unwrap();
        cache.set("b", &json!({"x": true}), None).unwrap();

        assert_eq!(cache.keys("*").unwrap(), vec!["a", "b"]);
        let all = cache.get_all().unwrap();
        assert_eq!(all.get("a"), Some(&json!(1)));
        assert_eq!(all.get("b"), Some(&json!({"x": true})));

        cache.flushdb().unwrap();
        assert!(cache.keys("*").unwrap().is_empty());
    }

    #[test]
    fn connection_check_captures_failure() {
        assert!(client().check_connection().status);

        let check = CacheClient::new(Arc::new(Unreachable)).check_connection();
        assert!(!check.status);
        assert_eq!(check.message, "cache error: connection refused");
    }
}
