//! Offline context
//!
//! One `OfflineContext` is built per application instance and handed to every
//! consumer. It owns the shared status, the durable store, the reconciler and
//! the notification channel, so nothing in the crate relies on global state.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::clock::{ClockRef, SystemClock};
use crate::config::OfflineConfig;
use crate::connectivity::{ConnectivityMonitor, ConnectivitySource, MonitorHandle};
use crate::error::{OfflineResult, ReplayError};
use crate::notify::{Notification, Notifier};
use crate::status::{SharedStatus, StatusRef, StatusSnapshot};
use crate::storage::{BackendRef, MemoryBackend, RocksBackend};
use crate::store::{CachedEntry, LocalStore, PendingAction};
use crate::sync::{HttpReplayer, Reconciler, ReplayerRef, SyncReport};
use crate::ttl::CacheSweeper;

#[derive(Clone)]
pub struct OfflineContext {
    config: Arc<OfflineConfig>,
    status: StatusRef,
    notifier: Notifier,
    clock: ClockRef,
    store: Arc<LocalStore>,
    reconciler: Arc<Reconciler>,
}

impl std::fmt::Debug for OfflineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineContext")
            .field("store", &self.store)
            .field("status", &self.status.snapshot())
            .finish()
    }
}

impl OfflineContext {
    /// Build a context over `backend` using the system clock
    pub fn new(config: OfflineConfig, backend: BackendRef) -> Self {
        Self::with_clock(config, backend, Arc::new(SystemClock))
    }

    pub fn with_clock(config: OfflineConfig, backend: BackendRef, clock: ClockRef) -> Self {
        let status = Arc::new(SharedStatus::new(config.start_online));
        let notifier = Notifier::new(config.notification_capacity);
        let store = Arc::new(LocalStore::new(
            backend,
            clock.clone(),
            status.clone(),
            &config,
        ));
        let reconciler = Arc::new(Reconciler::new(
            store.clone(),
            status.clone(),
            notifier.clone(),
            clock.clone(),
            config.replay_timeout,
        ));

        Self {
            config: Arc::new(config),
            status,
            notifier,
            clock,
            store,
            reconciler,
        }
    }

    /// Build a context with the backend selected by `config.data_dir`,
    /// registering the HTTP replayer when a remote URL is configured
    pub fn open(config: OfflineConfig) -> OfflineResult<Self> {
        let backend: BackendRef = match &config.data_dir {
            Some(dir) => Arc::new(RocksBackend::open(dir)?),
            None => {
                tracing::warn!("No data directory configured, offline data will not survive restarts");
                Arc::new(MemoryBackend::new())
            }
        };

        let remote_url = config.remote_url.clone();
        let ctx = Self::new(config, backend);
        if let Some(url) = remote_url {
            tracing::info!("Replaying pending actions to {}", url);
            ctx.register_sync_callback(
                "remote",
                Arc::new(HttpReplayer::new(ctx.store.clone(), url)),
            );
        }
        Ok(ctx)
    }

    pub fn config(&self) -> &OfflineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<LocalStore> {
        &self.store
    }

    pub fn reconciler(&self) -> &Arc<Reconciler> {
        &self.reconciler
    }

    pub fn status_ref(&self) -> &StatusRef {
        &self.status
    }

    pub fn clock(&self) -> &ClockRef {
        &self.clock
    }

    pub fn is_online(&self) -> bool {
        self.status.is_online()
    }

    pub fn is_syncing(&self) -> bool {
        self.status.is_syncing()
    }

    pub fn pending_actions_count(&self) -> usize {
        self.status.pending_actions_count()
    }

    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.status.last_sync_time()
    }

    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifier.subscribe()
    }

    pub fn save_to_local<T: Serialize + ?Sized>(&self, key: &str, data: &T) -> bool {
        self.store.save_to_local(key, data)
    }

    pub fn get_from_local<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.store.get_from_local(key)
    }

    pub fn get_entry(&self, key: &str) -> Option<CachedEntry> {
        self.store.get_entry(key)
    }

    pub fn add_pending_action<T: Serialize + ?Sized>(
        &self,
        action: &str,
        table: &str,
        data: &T,
    ) -> bool {
        self.store.add_pending_action(action, table, data)
    }

    pub fn pending_actions(&self) -> Vec<PendingAction> {
        self.store.pending_actions()
    }

    pub fn clear_expired_cache(&self) -> usize {
        self.store.clear_expired_cache()
    }

    pub fn register_sync_callback(
        &self,
        key: impl Into<String>,
        replayer: ReplayerRef,
    ) -> Option<ReplayerRef> {
        self.reconciler.register_sync_callback(key, replayer)
    }

    pub fn register_sync_fn<F, Fut>(&self, key: impl Into<String>, f: F) -> Option<ReplayerRef>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ReplayError>> + Send + 'static,
    {
        self.reconciler.register_sync_fn(key, f)
    }

    pub fn unregister_sync_callback(&self, key: &str) -> bool {
        self.reconciler.unregister_sync_callback(key)
    }

    pub async fn sync_pending_actions(&self) -> SyncReport {
        self.reconciler.sync_pending_actions().await
    }

    /// Start watching `source`; the returned handle unsubscribes on shutdown
    pub fn start_monitor(&self, source: Arc<dyn ConnectivitySource>) -> MonitorHandle {
        ConnectivityMonitor::new(
            source,
            self.status.clone(),
            self.notifier.clone(),
            self.reconciler.clone(),
        )
        .start()
    }

    /// Sweeper over this context's store using the configured interval
    pub fn sweeper(&self) -> CacheSweeper {
        CacheSweeper::new(self.store.clone()).with_interval(self.config.sweep_interval)
    }

    pub fn cache_ttl(&self) -> Duration {
        self.config.cache_ttl
    }
}
