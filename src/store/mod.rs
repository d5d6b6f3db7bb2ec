//! Local durable store
//!
//! Write-through cache of application snapshots plus an append-only queue of
//! mutations recorded while the till is offline. Both live in the configured
//! [`KvBackend`](crate::storage::KvBackend) as JSON under two fixed keys:
//! - the cache map (`key -> CachedEntry`)
//! - the pending-action queue (array, insertion order)
//!
//! Public operations never return storage errors: failures are logged and
//! reported as `false` / `None`. Only [`LocalStore::clear_pending_actions`]
//! surfaces a typed error, because the reconciler must be able to tell a
//! failed clear apart from a successful one.

pub mod cache;
pub mod queue;

use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::clock::ClockRef;
use crate::config::OfflineConfig;
use crate::error::OfflineResult;
use crate::status::StatusRef;
use crate::storage::BackendRef;

pub use cache::{prune_expired, CacheMap, CachedEntry};
pub use queue::{generate_action_id, PendingAction};

pub struct LocalStore {
    backend: BackendRef,
    clock: ClockRef,
    status: StatusRef,
    cache_ttl: Duration,
    cache_key: String,
    queue_key: String,
    /// Serializes read-modify-write sequences within this process
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("backend", &self.backend.name())
            .field("cache_ttl", &self.cache_ttl)
            .field("cache_key", &self.cache_key)
            .field("queue_key", &self.queue_key)
            .finish()
    }
}

impl LocalStore {
    pub fn new(
        backend: BackendRef,
        clock: ClockRef,
        status: StatusRef,
        config: &OfflineConfig,
    ) -> Self {
        let store = Self {
            backend,
            clock,
            status,
            cache_ttl: config.cache_ttl,
            cache_key: config.cache_key.clone(),
            queue_key: config.queue_key.clone(),
            write_lock: Mutex::new(()),
        };

        // Queue survives restarts; expose its length immediately
        match store.load_queue() {
            Ok(queue) => store.status.set_pending_actions_count(queue.len()),
            Err(e) => tracing::error!("Failed to read pending actions at startup: {}", e),
        }
        store
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Write `data` through to durable storage under `key`
    pub fn save_to_local<T: Serialize + ?Sized>(&self, key: &str, data: &T) -> bool {
        match self.try_save(key, data) {
            Ok(()) => {
                tracing::debug!("Cached '{}'", key);
                true
            }
            Err(e) => {
                tracing::error!("Failed to save '{}' to local cache: {}", key, e);
                false
            }
        }
    }

    fn try_save<T: Serialize + ?Sized>(&self, key: &str, data: &T) -> OfflineResult<()> {
        let data = serde_json::to_value(data)?;
        let entry = CachedEntry::new(
            key,
            data,
            self.clock.now_millis(),
            self.status.is_online(),
        );

        let _guard = self.write_lock.lock();
        let mut map = self.load_cache()?;
        map.insert(key.to_string(), entry);
        self.persist_cache(&map)
    }

    /// Read a cached value, evicting it if it has outlived the TTL
    pub fn get_from_local<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = match self.try_get_entry(key) {
            Ok(entry) => entry?,
            Err(e) => {
                tracing::error!("Failed to read '{}' from local cache: {}", key, e);
                return None;
            }
        };

        match serde_json::from_value(entry.data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Cached '{}' does not match the requested type: {}", key, e);
                None
            }
        }
    }

    /// Full cache entry including its metadata
    pub fn get_entry(&self, key: &str) -> Option<CachedEntry> {
        self.try_get_entry(key).unwrap_or_else(|e| {
            tracing::error!("Failed to read '{}' from local cache: {}", key, e);
            None
        })
    }

    fn try_get_entry(&self, key: &str) -> OfflineResult<Option<CachedEntry>> {
        let _guard = self.write_lock.lock();
        let mut map = self.load_cache()?;

        let expired = match map.get(key) {
            None => return Ok(None),
            Some(entry) => entry.is_expired(self.clock.now_millis(), self.cache_ttl),
        };

        if expired {
            map.remove(key);
            tracing::debug!("Evicted expired cache entry '{}'", key);
            if let Err(e) = self.persist_cache(&map) {
                tracing::error!("Failed to persist eviction of '{}': {}", key, e);
            }
            return Ok(None);
        }

        Ok(map.remove(key))
    }

    pub fn remove_from_local(&self, key: &str) -> bool {
        match self.try_remove(key) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to remove '{}' from local cache: {}", key, e);
                false
            }
        }
    }

    fn try_remove(&self, key: &str) -> OfflineResult<()> {
        let _guard = self.write_lock.lock();
        let mut map = self.load_cache()?;
        if map.remove(key).is_some() {
            self.persist_cache(&map)?;
        }
        Ok(())
    }

    /// Keys currently stored, expired or not
    pub fn cached_keys(&self) -> Vec<String> {
        let _guard = self.write_lock.lock();
        match self.load_cache() {
            Ok(map) => map.into_keys().collect(),
            Err(e) => {
                tracing::error!("Failed to list local cache: {}", e);
                Vec::new()
            }
        }
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn clear_expired_cache(&self) -> usize {
        match self.try_clear_expired() {
            Ok(removed) => {
                if removed > 0 {
                    tracing::info!("Evicted {} expired cache entries", removed);
                }
                removed
            }
            Err(e) => {
                tracing::error!("Cache expiry sweep failed: {}", e);
                0
            }
        }
    }

    fn try_clear_expired(&self) -> OfflineResult<usize> {
        let _guard = self.write_lock.lock();
        let mut map = self.load_cache()?;
        let removed = prune_expired(&mut map, self.clock.now_millis(), self.cache_ttl);
        if removed > 0 {
            self.persist_cache(&map)?;
        }
        Ok(removed)
    }

    /// Append a mutation to the pending queue
    pub fn add_pending_action<T: Serialize + ?Sized>(
        &self,
        action: &str,
        table: &str,
        data: &T,
    ) -> bool {
        match self.try_add_pending_action(action, table, data) {
            Ok(id) => {
                tracing::debug!("Queued {} on '{}' as {}", action, table, id);
                true
            }
            Err(e) => {
                tracing::error!("Failed to queue {} on '{}': {}", action, table, e);
                false
            }
        }
    }

    fn try_add_pending_action<T: Serialize + ?Sized>(
        &self,
        action: &str,
        table: &str,
        data: &T,
    ) -> OfflineResult<String> {
        let data = serde_json::to_value(data)?;
        let pending = PendingAction::new(action, table, data, self.clock.now_millis());
        let id = pending.id.clone();

        let _guard = self.write_lock.lock();
        let mut queue = self.load_queue()?;
        queue.push(pending);
        self.persist_queue(&queue)?;
        self.status.set_pending_actions_count(queue.len());
        Ok(id)
    }

    /// Pending actions in insertion order
    pub fn pending_actions(&self) -> Vec<PendingAction> {
        let _guard = self.write_lock.lock();
        self.load_queue().unwrap_or_else(|e| {
            tracing::error!("Failed to read pending actions: {}", e);
            Vec::new()
        })
    }

    /// Replace the persisted queue with an empty one. Returns how many actions were dropped.
    pub fn clear_pending_actions(&self) -> OfflineResult<usize> {
        let _guard = self.write_lock.lock();
        let dropped = match self.load_queue() {
            Ok(queue) => queue.len(),
            Err(e) => {
                tracing::warn!("Clearing unreadable pending queue: {}", e);
                0
            }
        };

        self.persist_queue(&[])?;
        self.status.set_pending_actions_count(0);
        Ok(dropped)
    }

    fn load_cache(&self) -> OfflineResult<CacheMap> {
        match self.backend.get(&self.cache_key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(CacheMap::new()),
        }
    }

    /// An empty map removes the key rather than storing `{}`
    fn persist_cache(&self, map: &CacheMap) -> OfflineResult<()> {
        if map.is_empty() {
            return self.backend.delete(&self.cache_key);
        }
        let raw = serde_json::to_string(map)?;
        self.backend.put(&self.cache_key, &raw)
    }

    fn load_queue(&self) -> OfflineResult<Vec<PendingAction>> {
        match self.backend.get(&self.queue_key)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn persist_queue(&self, queue: &[PendingAction]) -> OfflineResult<()> {
        let raw = serde_json::to_string(queue)?;
        self.backend.put(&self.queue_key, &raw)
    }
}
