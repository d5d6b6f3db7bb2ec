use crate::store::LocalStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Cache sweeper - background task that evicts expired cache entries
/// from the local store
pub struct CacheSweeper {
    store: Arc<LocalStore>,
    interval: Duration,
}

impl CacheSweeper {
    /// Create a new sweeper for the given store
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            store,
            interval: Duration::from_secs(60 * 60), // Default: sweep hourly
        }
    }

    /// A zero interval is ignored and the current one kept
    pub fn with_interval(mut self, interval: Duration) -> Self {
        if interval.is_zero() {
            tracing::warn!(
                "Ignoring zero cache sweep interval, keeping {:?}",
                self.interval
            );
        } else {
            self.interval = interval;
        }
        self
    }

    /// Sweep once at startup, then on every interval until `shutdown` flips to true
    pub async fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Starting cache sweeper (interval: {:?})", self.interval);
        self.sweep().await;

        let mut ticker = tokio::time::interval(self.interval);
        // First tick completes immediately; the startup sweep already covered it
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Cache sweeper stopped");
    }

    /// Evict expired entries (runs the blocking store work off the runtime threads)
    pub async fn sweep(&self) -> usize {
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.clear_expired_cache()).await {
            Ok(removed) => {
                if removed > 0 {
                    tracing::debug!("Cache sweep complete: {} entries evicted", removed);
                }
                removed
            }
            Err(e) => {
                tracing::error!("Cache sweep task panicked: {}", e);
                0
            }
        }
    }
}
