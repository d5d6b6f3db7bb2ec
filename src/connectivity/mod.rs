//! Network reachability
//!
//! A [`ConnectivitySource`] reports the platform's current reachability and
//! broadcasts transitions. The [`ConnectivityMonitor`] turns those transitions
//! into status updates, notifications and sync passes.

pub mod monitor;

use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use monitor::{ConnectivityMonitor, MonitorHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

impl ConnectivityEvent {
    pub fn from_reachable(reachable: bool) -> Self {
        if reachable {
            ConnectivityEvent::Online
        } else {
            ConnectivityEvent::Offline
        }
    }
}

/// Platform reachability signal
pub trait ConnectivitySource: Send + Sync {
    /// Reachability right now
    fn is_reachable(&self) -> bool;

    /// Stream of reachability transitions
    fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent>;
}

/// Source driven explicitly by the embedding application
#[derive(Debug)]
pub struct ManualConnectivity {
    reachable: AtomicBool,
    tx: broadcast::Sender<ConnectivityEvent>,
}

impl ManualConnectivity {
    pub fn new(reachable: bool) -> Self {
        let (tx, _) = broadcast::channel(16);
        Self {
            reachable: AtomicBool::new(reachable),
            tx,
        }
    }

    /// Update reachability, broadcasting only actual transitions.
    /// Returns true if the state changed.
    pub fn set_reachable(&self, reachable: bool) -> bool {
        let previous = self.reachable.swap(reachable, Ordering::SeqCst);
        if previous == reachable {
            return false;
        }
        let _ = self.tx.send(ConnectivityEvent::from_reachable(reachable));
        true
    }

    /// Broadcast `event` unconditionally, as a flaky platform signal would
    pub fn emit(&self, event: ConnectivityEvent) {
        self.reachable
            .store(event == ConnectivityEvent::Online, Ordering::SeqCst);
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl ConnectivitySource for ManualConnectivity {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.tx.subscribe()
    }
}
