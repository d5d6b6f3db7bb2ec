use std::sync::Arc;

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{ConnectivityEvent, ConnectivitySource};
use crate::notify::{Notification, Notifier};
use crate::status::StatusRef;
use crate::sync::Reconciler;

/// Listens for reachability transitions and kicks off a sync when the till
/// comes back online
pub struct ConnectivityMonitor {
    source: Arc<dyn ConnectivitySource>,
    status: StatusRef,
    notifier: Notifier,
    reconciler: Arc<Reconciler>,
}

impl ConnectivityMonitor {
    pub fn new(
        source: Arc<dyn ConnectivitySource>,
        status: StatusRef,
        notifier: Notifier,
        reconciler: Arc<Reconciler>,
    ) -> Self {
        Self {
            source,
            status,
            notifier,
            reconciler,
        }
    }

    /// Seed `is_online` from the source and start listening.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(self) -> MonitorHandle {
        // Subscribe first so a transition between the two calls is not lost
        let mut events = self.source.subscribe();
        let reachable = self.source.is_reachable();
        self.status.set_online(reachable);
        info!(
            "Connectivity monitor started ({})",
            if reachable { "online" } else { "offline" }
        );

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    event = events.recv() => match event {
                        Ok(event) => self.handle_event(event),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("Connectivity monitor missed {} events, resyncing", skipped);
                            let current = ConnectivityEvent::from_reachable(self.source.is_reachable());
                            self.handle_event(current);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            debug!("Connectivity source closed");
                            break;
                        }
                    }
                }
            }
            info!("Connectivity monitor stopped");
        });

        MonitorHandle {
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    fn handle_event(&self, event: ConnectivityEvent) {
        match event {
            ConnectivityEvent::Online => {
                if !self.status.set_online(true) {
                    return;
                }
                self.notifier.notify(Notification::ConnectionRestored);
                let reconciler = self.reconciler.clone();
                tokio::spawn(async move {
                    let report = reconciler.sync_pending_actions().await;
                    debug!("Reconnect sync finished: {:?}", report);
                });
            }
            ConnectivityEvent::Offline => {
                if self.status.set_online(false) {
                    self.notifier.notify(Notification::OfflineActivated);
                }
            }
        }
    }
}

/// Owns the listener task; dropping it unsubscribes
pub struct MonitorHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Stop listening and wait for the listener to exit
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Connectivity monitor task failed: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
