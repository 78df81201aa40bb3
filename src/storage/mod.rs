//! Storage Module
//!
//! The key-value store shared by every connection: a sharded map of
//! string keys to string values with optional expiry timestamps.
//!
//! ## Features
//!
//! - **Sharded Storage**: 64 independent shards reduce lock contention
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **Passive Expiry**: Expired keys are hidden and removed when read
//!
//! ## Example
//!
//! ```
//! use pulsekv::storage::{current_time_millis, StorageEngine};
//!
//! let engine = StorageEngine::new();
//! engine.set("name", "Ariz", None);
//! assert_eq!(engine.get("name"), Some("Ariz".to_string()));
//!
//! // Already expired: logically absent
//! engine.set("stale", "value", Some(current_time_millis() - 1));
//! assert_eq!(engine.get("stale"), None);
//! ```

pub mod engine;

pub use engine::{current_time_millis, Entry, StorageEngine, StorageStats};
