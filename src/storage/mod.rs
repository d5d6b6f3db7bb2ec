//! Key-value persistence underneath the offline store
//!
//! The durable store only ever needs three string operations addressed by a
//! fixed key, so any backend that can hold a few JSON blobs qualifies:
//! - `MemoryBackend` for tests and ephemeral tills
//! - `RocksBackend` for on-disk persistence across restarts

pub mod memory;
pub mod rocks;

use std::sync::Arc;

use crate::error::OfflineResult;

pub use memory::MemoryBackend;
pub use rocks::RocksBackend;

/// Persistent string store addressed by key
pub trait KvBackend: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> OfflineResult<Option<String>>;

    /// Overwrite the value stored under `key`
    fn put(&self, key: &str, value: &str) -> OfflineResult<()>;

    /// Remove `key`; removing a missing key is not an error
    fn delete(&self, key: &str) -> OfflineResult<()>;

    /// Human-readable backend name for logs
    fn name(&self) -> &'static str;
}

pub type BackendRef = Arc<dyn KvBackend>;
