//! Configuration for the offline queue
//!
//! ## Environment Variables
//!
//! - `TILLSYNC_DATA_DIR` - RocksDB directory (unset means in-memory storage)
//! - `TILLSYNC_CACHE_TTL_SECS` - cached entry time-to-live
//! - `TILLSYNC_SWEEP_INTERVAL_SECS` - interval between expiry sweeps
//! - `TILLSYNC_REMOTE_URL` - endpoint that receives replayed action batches
//! - `TILLSYNC_REPLAY_TIMEOUT_SECS` - per-replayer timeout (unset means none)
//! - `TILLSYNC_START_ONLINE` - initial reachability (`true`/`false`)
//!
//! These can be set in a `.env` file in the working directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DATA_DIR: &str = "TILLSYNC_DATA_DIR";
pub const ENV_CACHE_TTL_SECS: &str = "TILLSYNC_CACHE_TTL_SECS";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "TILLSYNC_SWEEP_INTERVAL_SECS";
pub const ENV_REMOTE_URL: &str = "TILLSYNC_REMOTE_URL";
pub const ENV_REPLAY_TIMEOUT_SECS: &str = "TILLSYNC_REPLAY_TIMEOUT_SECS";
pub const ENV_START_ONLINE: &str = "TILLSYNC_START_ONLINE";

/// Storage key holding the serialized cache map
pub const DEFAULT_CACHE_KEY: &str = "tillsync_offline_cache";
/// Storage key holding the serialized pending-action queue
pub const DEFAULT_QUEUE_KEY: &str = "tillsync_pending_actions";

/// Configuration for the offline queue
#[derive(Debug, Clone)]
pub struct OfflineConfig {
    /// Cached entries older than this are treated as absent
    pub cache_ttl: Duration,
    /// How often the background sweeper evicts expired entries
    pub sweep_interval: Duration,
    /// Backend key for the cache map
    pub cache_key: String,
    /// Backend key for the pending-action queue
    pub queue_key: String,
    /// On-disk location for RocksDB; `None` keeps everything in memory
    pub data_dir: Option<PathBuf>,
    /// Remote endpoint for the built-in HTTP replayer
    pub remote_url: Option<String>,
    /// Upper bound for a single replayer; `None` waits indefinitely
    pub replay_timeout: Option<Duration>,
    /// Reachability assumed before the first connectivity event
    pub start_online: bool,
    /// Capacity of the notification broadcast channel
    pub notification_capacity: usize,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Duration::from_secs(60 * 60),
            cache_key: DEFAULT_CACHE_KEY.to_string(),
            queue_key: DEFAULT_QUEUE_KEY.to_string(),
            data_dir: None,
            remote_url: None,
            replay_timeout: None,
            start_online: true,
            notification_capacity: 64,
        }
    }
}

impl OfflineConfig {
    /// Load defaults, then `.env` from `dir` if present, then environment overrides
    pub fn load(dir: &Path) -> Self {
        let env_path = dir.join(".env");
        if env_path.exists() {
            if let Err(e) = dotenvy::from_path(&env_path) {
                tracing::warn!("Failed to read {}: {}", env_path.display(), e);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides to the configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            if !dir.is_empty() {
                self.data_dir = Some(PathBuf::from(dir));
            }
        }

        if let Some(secs) = env_secs(ENV_CACHE_TTL_SECS) {
            self.cache_ttl = secs;
        }

        if let Some(secs) = env_secs(ENV_SWEEP_INTERVAL_SECS) {
            self.set_sweep_interval(secs);
        }

        if let Ok(url) = std::env::var(ENV_REMOTE_URL) {
            if !url.is_empty() {
                self.remote_url = Some(url);
            }
        }

        if let Some(secs) = env_secs(ENV_REPLAY_TIMEOUT_SECS) {
            self.replay_timeout = Some(secs);
        }

        if let Ok(flag) = std::env::var(ENV_START_ONLINE) {
            if let Ok(online) = flag.parse::<bool>() {
                self.start_online = online;
            }
        }
    }

    /// Zero is rejected with a warning and the current interval kept.
    /// Returns true if the interval was applied.
    pub fn set_sweep_interval(&mut self, interval: Duration) -> bool {
        if interval.is_zero() {
            tracing::warn!(
                "Cache sweep interval must be non-zero, keeping {:?}",
                self.sweep_interval
            );
            return false;
        }
        self.sweep_interval = interval;
        true
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_replay_timeout(mut self, timeout: Duration) -> Self {
        self.replay_timeout = Some(timeout);
        self
    }

    pub fn with_start_online(mut self, online: bool) -> Self {
        self.start_online = online;
        self
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}
