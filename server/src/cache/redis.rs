//! Redis adapter over the synchronous client.

use std::time::Duration;

use docbridge_engine::cache::MAX_EXPIRE_SECONDS;
use docbridge_engine::{CacheBackend, Error, Result};
use r2d2::{CustomizeConnection, Pool, PooledConnection};
use redis::{Client, Connection, FromRedisValue, RedisError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const IO_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_CONNECTIONS: u32 = 16;
const SCAN_BATCH: usize = 100;

const MAX_EXPIRE_MILLIS: u64 = MAX_EXPIRE_SECONDS * 1000;

fn cache_error(e: RedisError) -> Error {
    Error::Cache(e.to_string())
}

/// Bounds every read and write on a pooled connection.
#[derive(Debug)]
struct IoTimeouts;

impl CustomizeConnection<Connection, RedisError> for IoTimeouts {
    fn on_acquire(&self, connection: &mut Connection) -> std::result::Result<(), RedisError> {
        connection.set_read_timeout(Some(IO_TIMEOUT))?;
        connection.set_write_timeout(Some(IO_TIMEOUT))
    }
}

/// A [`CacheBackend`] speaking to one Redis database through a connection
/// pool.
pub struct RedisCache {
    pool: Pool<Client>,
}

impl RedisCache {
    /// Parse `url`. Connections are opened on demand.
    pub fn open(url: &str) -> Result<Self> {
        let client = Client::open(url).map_err(cache_error)?;
        let pool = Pool::builder()
            .max_size(MAX_CONNECTIONS)
            .min_idle(Some(0))
            .connection_timeout(CONNECT_TIMEOUT)
            .connection_customizer(Box::new(IoTimeouts))
            .build_unchecked(client);
        Ok(Self { pool })
    }

    fn connection(&self) -> Result<PooledConnection<Client>> {
        self.pool
            .get()
            .map_err(|e| Error::Cache(format!("no Redis connection available: {e}")))
    }

    fn query<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> Result<T> {
        let mut connection = self.connection()?;
        cmd.query(&mut *connection).map_err(cache_error)
    }
}

impl CacheBackend for RedisCache {
    fn ping(&self) -> Result<()> {
        self.query::<String>(&redis::cmd("PING")).map(|_| ())
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl {
            let millis = u64::try_from(ttl.as_millis())
                .unwrap_or(u64::MAX)
                .clamp(1, MAX_EXPIRE_MILLIS);
            cmd.arg("PX").arg(millis);
        }
        self.query::<()>(&cmd)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.query(redis::cmd("GET").arg(key))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.query::<u64>(redis::cmd("DEL").arg(key))
            .map(|removed| removed > 0)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.query(redis::cmd("EXISTS").arg(key))
    }

    fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut connection = self.connection()?;
        let mut keys = Vec::new();
        let mut cursor = 0u64;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query(&mut *connection)
                .map_err(cache_error)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn flush(&self) -> Result<()> {
        self.query::<()>(&redis::cmd("FLUSHDB"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_url() {
        assert!(matches!(
            RedisCache::open("not a url"),
            Err(Error::Cache(_))
        ));
    }

    #[test]
    fn unreachable_server_is_a_cache_error() {
        let cache = RedisCache::open("redis://127.0.0.1:1/").unwrap();
        assert!(matches!(cache.ping(), Err(Error::Cache(_))));
        assert!(matches!(
            cache.set("k", b"v".to_vec(), Some(Duration::MAX)),
            Err(Error::Cache(_))
        ));
    }
}
