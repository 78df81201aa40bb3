//! Thread-Safe Storage Engine with Passive Expiry
//!
//! A concurrent string-to-string map shared by every client connection.
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Keys are spread across shards so that unrelated keys
//!    do not contend on the same lock.
//! 2. **Passive Expiry**: An entry's expiry is only checked when it is read.
//!    Expired entries found by a read are removed on the spot.
//! 3. **Absolute Timestamps**: Expiry is stored as milliseconds since the Unix
//!    epoch, so an entry's deadline does not depend on when it is inspected.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     StorageEngine                           │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A SET holds its shard's write lock while inserting, so any GET that
//! starts after the SET returned sees the new value or a later one.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Number of shards for the storage engine.
const NUM_SHARDS: usize = 64;

/// Returns the current wall-clock time in milliseconds since the Unix epoch.
pub fn current_time_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A stored value with an optional absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The stored value
    pub value: String,
    /// Expiry in milliseconds since the epoch (None = never expires)
    pub expires_at: Option<u64>,
}

impl Entry {
    /// Creates a new entry.
    pub fn new(value: impl Into<String>, expires_at: Option<u64>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// An entry is live while its expiry is strictly in the future.
    #[inline]
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now_ms)
    }
}

type Shard = RwLock<HashMap<String, Entry>>;

/// Point-in-time counters for the storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StorageStats {
    /// Keys physically present, including expired ones not yet read
    pub keys: u64,
    /// Total GET operations
    pub get_ops: u64,
    /// Total SET operations
    pub set_ops: u64,
    /// Expired entries removed by reads
    pub expired: u64,
}

/// The key-value store shared by all connections.
///
/// Wrap it in an `Arc` and hand a clone to each connection's command handler.
///
/// # Example
///
/// ```
/// use pulsekv::storage::StorageEngine;
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
///
/// engine.set("name", "Ariz", None);
/// assert_eq!(engine.get("name"), Some("Ariz".to_string()));
///
/// engine.set_with_ttl("session", "abc123", Duration::from_secs(60));
/// assert_eq!(engine.get("session"), Some("abc123".to_string()));
/// ```
pub struct StorageEngine {
    shards: Vec<Shard>,
    key_count: AtomicU64,
    get_count: AtomicU64,
    set_count: AtomicU64,
    expired_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an empty storage engine.
    pub fn new() -> Self {
        Self {
            shards: (0..NUM_SHARDS).map(|_| RwLock::new(HashMap::new())).collect(),
            key_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    #[inline]
    fn shard(&self, key: &str) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[(hasher.finish() as usize) % NUM_SHARDS]
    }

    /// Inserts or overwrites `key`. Last write wins.
    ///
    /// `expires_at` is an absolute time in milliseconds since the epoch.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>, expires_at: Option<u64>) {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let key = key.into();
        let mut data = self.shard(&key).write();
        if data.insert(key, Entry::new(value, expires_at)).is_none() {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Inserts `key` so that it expires `ttl` from now.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: impl Into<String>, ttl: Duration) {
        let expires_at = current_time_millis().saturating_add(ttl.as_millis() as u64);
        self.set(key, value, Some(expires_at));
    }

    /// Returns the value for `key` if it exists and has not expired.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, current_time_millis())
    }

    /// Like [`get`](Self::get), against an explicit clock reading.
    ///
    /// An entry whose expiry is at or before `now_ms` is removed and
    /// reported as absent.
    pub fn get_at(&self, key: &str, now_ms: u64) -> Option<String> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.shard(key);

        {
            let data = shard.read();
            match data.get(key) {
                Some(entry) if !entry.is_expired_at(now_ms) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // Expired: take the write lock and re-check, another writer may
        // have replaced the entry in between.
        let mut data = shard.write();
        match data.get(key) {
            Some(entry) if !entry.is_expired_at(now_ms) => return Some(entry.value.clone()),
            Some(_) => {}
            None => return None,
        }

        data.remove(key);
        self.key_count.fetch_sub(1, Ordering::Relaxed);
        self.expired_count.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Number of keys physically present.
    pub fn len(&self) -> usize {
        self.key_count.load(Ordering::Relaxed) as usize
    }

    /// Returns true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a snapshot of the engine's counters.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.key_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_set_and_get() {
        let engine = StorageEngine::new();

        engine.set("key", "value", None);
        assert_eq!(engine.get("key"), Some("value".to_string()));
    }

    #[test]
    fn test_get_missing() {
        let engine = StorageEngine::new();
        assert_eq!(engine.get("nonexistent"), None);
    }

    #[test]
    fn test_overwrite_last_write_wins() {
        let engine = StorageEngine::new();

        engine.set("key", "first", None);
        engine.set("key", "second", None);

        assert_eq!(engine.get("key"), Some("second".to_string()));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_expiry_boundary() {
        let engine = StorageEngine::new();
        engine.set("key", "value", Some(1_000));

        assert_eq!(engine.get_at("key", 999), Some("value".to_string()));
        // Expiry equal to the current time counts as expired
        assert_eq!(engine.get_at("key", 1_000), None);
    }

    #[test]
    fn test_expired_entry_removed_on_read() {
        let engine = StorageEngine::new();
        engine.set("key", "value", Some(1_000));
        assert_eq!(engine.len(), 1);

        assert_eq!(engine.get_at("key", 2_000), None);
        assert_eq!(engine.len(), 0);
        assert_eq!(engine.stats().expired, 1);

        // Still absent on the next read, and nothing left to count
        assert_eq!(engine.get_at("key", 0), None);
        assert_eq!(engine.stats().expired, 1);
    }

    #[test]
    fn test_set_clears_previous_expiry() {
        let engine = StorageEngine::new();
        engine.set("key", "old", Some(1_000));
        engine.set("key", "new", None);

        assert_eq!(engine.get_at("key", u64::MAX), Some("new".to_string()));
    }

    #[test]
    fn test_set_with_ttl() {
        let engine = StorageEngine::new();
        engine.set_with_ttl("session", "token", Duration::from_millis(50));
        assert_eq!(engine.get("session"), Some("token".to_string()));

        thread::sleep(Duration::from_millis(100));
        assert_eq!(engine.get("session"), None);
    }

    #[test]
    fn test_stats() {
        let engine = StorageEngine::new();
        engine.set("a", "1", None);
        engine.set("b", "2", None);
        engine.get("a");
        engine.get("missing");

        let stats = engine.stats();
        assert_eq!(stats.keys, 2);
        assert_eq!(stats.set_ops, 2);
        assert_eq!(stats.get_ops, 2);
        assert_eq!(stats.expired, 0);
    }

    #[test]
    fn test_concurrent_access() {
        let engine = Arc::new(StorageEngine::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for i in 0..1000 {
                        let key = format!("key:{}:{}", t, i);
                        engine.set(key.clone(), format!("value:{}", i), None);
                        assert_eq!(engine.get(&key), Some(format!("value:{}", i)));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 8000);
    }
}
