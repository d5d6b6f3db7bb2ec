use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::replayer::{FnReplayer, ReplayerRef};
use crate::clock::ClockRef;
use crate::error::{OfflineError, ReplayError};
use crate::notify::{Notification, Notifier};
use crate::status::{StatusRef, SyncGuard};
use crate::store::LocalStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    Offline,
    AlreadySyncing,
}

/// What a call to [`Reconciler::sync_pending_actions`] did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncReport {
    Skipped {
        reason: SkipReason,
    },
    Completed {
        succeeded: Vec<String>,
        failed: Vec<String>,
        cleared_actions: usize,
        finished_at: DateTime<Utc>,
    },
    /// The pass ran but could not be finalized
    Failed {
        succeeded: Vec<String>,
        failed: Vec<String>,
        error: String,
    },
}

impl SyncReport {
    pub fn is_skipped(&self) -> bool {
        matches!(self, SyncReport::Skipped { .. })
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, SyncReport::Completed { .. })
    }
}

/// Replays queued offline work through registered replayers
pub struct Reconciler {
    store: Arc<LocalStore>,
    status: StatusRef,
    notifier: Notifier,
    clock: ClockRef,
    replayers: RwLock<BTreeMap<String, ReplayerRef>>,
    replay_timeout: Option<Duration>,
}

impl Reconciler {
    pub fn new(
        store: Arc<LocalStore>,
        status: StatusRef,
        notifier: Notifier,
        clock: ClockRef,
        replay_timeout: Option<Duration>,
    ) -> Self {
        Self {
            store,
            status,
            notifier,
            clock,
            replayers: RwLock::new(BTreeMap::new()),
            replay_timeout,
        }
    }

    /// Register `replayer` under `key`, replacing any previous registration.
    /// Returns the replaced replayer, if any.
    pub fn register_sync_callback(
        &self,
        key: impl Into<String>,
        replayer: ReplayerRef,
    ) -> Option<ReplayerRef> {
        let key = key.into();
        let previous = self.replayers.write().insert(key.clone(), replayer);
        if previous.is_some() {
            debug!("Replaced sync callback '{}'", key);
        } else {
            debug!("Registered sync callback '{}'", key);
        }
        previous
    }

    /// Register an async closure as a replayer
    pub fn register_sync_fn<F, Fut>(&self, key: impl Into<String>, f: F) -> Option<ReplayerRef>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ReplayError>> + Send + 'static,
    {
        self.register_sync_callback(key, Arc::new(FnReplayer::new(f)))
    }

    pub fn unregister_sync_callback(&self, key: &str) -> bool {
        self.replayers.write().remove(key).is_some()
    }

    pub fn registered_keys(&self) -> Vec<String> {
        self.replayers.read().keys().cloned().collect()
    }

    /// Run every registered replayer, then clear the pending queue.
    ///
    /// No-op while offline or while another pass is in flight.
    pub async fn sync_pending_actions(&self) -> SyncReport {
        if !self.status.is_online() {
            debug!("Sync skipped: offline");
            return SyncReport::Skipped {
                reason: SkipReason::Offline,
            };
        }

        let Some(_guard) = SyncGuard::acquire(&self.status) else {
            debug!("Sync skipped: already syncing");
            return SyncReport::Skipped {
                reason: SkipReason::AlreadySyncing,
            };
        };

        // Snapshot so registrations during the pass do not affect it
        let replayers: Vec<(String, ReplayerRef)> = self
            .replayers
            .read()
            .iter()
            .map(|(key, replayer)| (key.clone(), replayer.clone()))
            .collect();

        info!(
            "Syncing {} pending actions through {} replayers",
            self.status.pending_actions_count(),
            replayers.len()
        );

        let (succeeded, failed) = self.run_replayers(replayers).await;

        // FIXME: the queue is dropped even when some replayers failed, so their
        // actions are lost. Actions queued while the replayers were running are
        // dropped too, without ever being replayed. Fixing both needs the clear
        // to remove only the ids each replayer acknowledged.
        match self.store.clear_pending_actions() {
            Ok(cleared_actions) => {
                let finished_at = self.clock.now();
                self.status.set_last_sync_time(finished_at);
                if !failed.is_empty() {
                    warn!(
                        "Sync finished with {} failed replayers; {} actions cleared anyway",
                        failed.len(),
                        cleared_actions
                    );
                }
                self.notifier.notify(Notification::SyncSucceeded);
                SyncReport::Completed {
                    succeeded,
                    failed,
                    cleared_actions,
                    finished_at,
                }
            }
            Err(e) => {
                error!("Sync failed: could not clear pending actions: {}", e);
                self.notifier.notify(Notification::SyncFailed);
                SyncReport::Failed {
                    succeeded,
                    failed,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Fan out to all replayers concurrently; each failure (error, timeout or
    /// panic) is logged and isolated. Returns (succeeded, failed) keys.
    async fn run_replayers(&self, replayers: Vec<(String, ReplayerRef)>) -> (Vec<String>, Vec<String>) {
        let timeout = self.replay_timeout;
        let mut keys = Vec::with_capacity(replayers.len());
        let mut tasks = Vec::with_capacity(replayers.len());

        for (key, replayer) in replayers {
            keys.push(key);
            tasks.push(tokio::spawn(async move {
                match timeout {
                    Some(limit) => tokio::time::timeout(limit, replayer.replay())
                        .await
                        .unwrap_or(Err(ReplayError::Timeout(limit))),
                    None => replayer.replay().await,
                }
            }));
        }

        let results = futures::future::join_all(tasks).await;

        let mut succeeded = Vec::new();
        let mut failed = Vec::new();
        for (key, result) in keys.into_iter().zip(results) {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(join_err) => Err(ReplayError::other(format!("replayer panicked: {}", join_err))),
            };

            match outcome {
                Ok(()) => succeeded.push(key),
                Err(source) => {
                    let err = OfflineError::Replay {
                        key: key.clone(),
                        source,
                    };
                    warn!("{}", err);
                    failed.push(key);
                }
            }
        }
        (succeeded, failed)
    }
}
