//! In-process cache backend.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::glob::glob_match;
use crate::cache::CacheBackend;
use crate::Result;

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// A [`CacheBackend`] held in process memory.
///
/// Expired entries are evicted lazily, on the next access that observes them.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
}

impl MemoryCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| e.is_live(now)).count()
    }

    /// Whether there are no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_if_expired(&self, key: &str) {
        let now = Instant::now();
        self.entries.remove_if(key, |_, entry| !entry.is_live(now));
    }
}

impl CacheBackend for MemoryCache {
    fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let entry = Entry {
            bytes: value,
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        };
        self.entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.evict_if_expired(key);
        Ok(self.entries.get(key).map(|e| e.bytes.clone()))
    }

    fn delete(&self, key: &str) -> Result<bool> {
        self.evict_if_expired(key);
        Ok(self.entries.remove(key).is_some())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        self.evict_if_expired(key);
        Ok(self.entries.contains_key(key))
    }

    fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.is_live(now));

        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| glob_match(pattern, e.key()))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn flush(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }
}
