use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A cached snapshot written through to durable storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub key: String,
    pub data: JsonValue,
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
    /// Whether the till was online when this entry was written
    pub synced: bool,
}

/// Persisted form of the cache; ordered so serialized output is stable
pub type CacheMap = BTreeMap<String, CachedEntry>;

impl CachedEntry {
    pub fn new(key: impl Into<String>, data: JsonValue, timestamp: i64, synced: bool) -> Self {
        Self {
            key: key.into(),
            data,
            timestamp,
            synced,
        }
    }

    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis.saturating_sub(self.timestamp)
    }

    /// Strictly older than `ttl`; an entry exactly `ttl` old is still live
    pub fn is_expired(&self, now_millis: i64, ttl: Duration) -> bool {
        let ttl_millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.age_millis(now_millis) > ttl_millis
    }
}

/// Drop every expired entry, returning how many were removed
pub fn prune_expired(map: &mut CacheMap, now_millis: i64, ttl: Duration) -> usize {
    let before = map.len();
    map.retain(|_, entry| !entry.is_expired(now_millis, ttl));
    before - map.len()
}
