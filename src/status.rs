//! Observable offline state shared by the store, monitor and reconciler.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

/// Point-in-time view of [`SharedStatus`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub is_online: bool,
    pub is_syncing: bool,
    pub pending_actions_count: usize,
    pub last_sync_time: Option<DateTime<Utc>>,
}

/// Status flags backed by watch channels so consumers can await changes
#[derive(Debug)]
pub struct SharedStatus {
    online: watch::Sender<bool>,
    syncing: watch::Sender<bool>,
    pending: watch::Sender<usize>,
    last_sync: watch::Sender<Option<DateTime<Utc>>>,
}

pub type StatusRef = Arc<SharedStatus>;

impl SharedStatus {
    pub fn new(online: bool) -> Self {
        Self {
            online: watch::channel(online).0,
            syncing: watch::channel(false).0,
            pending: watch::channel(0).0,
            last_sync: watch::channel(None).0,
        }
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Returns true if the value changed
    pub fn set_online(&self, online: bool) -> bool {
        self.online.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        })
    }

    pub fn is_syncing(&self) -> bool {
        *self.syncing.borrow()
    }

    /// Move Idle -> Syncing. Returns false if a sync is already running.
    pub fn try_begin_sync(&self) -> bool {
        self.syncing.send_if_modified(|syncing| {
            if *syncing {
                false
            } else {
                *syncing = true;
                true
            }
        })
    }

    pub fn end_sync(&self) {
        self.syncing.send_replace(false);
    }

    pub fn pending_actions_count(&self) -> usize {
        *self.pending.borrow()
    }

    pub fn set_pending_actions_count(&self, count: usize) {
        self.pending.send_replace(count);
    }

    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.borrow()
    }

    pub fn set_last_sync_time(&self, at: DateTime<Utc>) {
        self.last_sync.send_replace(Some(at));
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            is_online: self.is_online(),
            is_syncing: self.is_syncing(),
            pending_actions_count: self.pending_actions_count(),
            last_sync_time: self.last_sync_time(),
        }
    }

    pub fn watch_online(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }

    pub fn watch_syncing(&self) -> watch::Receiver<bool> {
        self.syncing.subscribe()
    }

    pub fn watch_pending(&self) -> watch::Receiver<usize> {
        self.pending.subscribe()
    }
}

/// Resets the syncing flag when dropped, including on panic unwinds.
pub(crate) struct SyncGuard<'a> {
    status: &'a SharedStatus,
}

impl<'a> SyncGuard<'a> {
    pub(crate) fn acquire(status: &'a SharedStatus) -> Option<Self> {
        status.try_begin_sync().then_some(Self { status })
    }
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.status.end_sync();
    }
}
