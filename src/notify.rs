//! User-visible notifications (toast messages) for the till UI.

use serde::Serialize;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Warning,
    Success,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Notification {
    ConnectionRestored,
    OfflineActivated,
    SyncSucceeded,
    SyncFailed,
}

impl Notification {
    pub fn message(&self) -> &'static str {
        match self {
            Notification::ConnectionRestored => "Connection restored, syncing...",
            Notification::OfflineActivated => "Offline mode active, data saved locally",
            Notification::SyncSucceeded => "Offline changes synchronized",
            Notification::SyncFailed => "Synchronization failed",
        }
    }

    pub fn kind(&self) -> NotificationKind {
        match self {
            Notification::ConnectionRestored => NotificationKind::Info,
            Notification::OfflineActivated => NotificationKind::Warning,
            Notification::SyncSucceeded => NotificationKind::Success,
            Notification::SyncFailed => NotificationKind::Error,
        }
    }
}

/// Fan-out of notifications to any number of UI subscribers
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn notify(&self, notification: Notification) {
        match notification.kind() {
            NotificationKind::Error => tracing::error!("{}", notification.message()),
            NotificationKind::Warning => tracing::warn!("{}", notification.message()),
            _ => tracing::info!("{}", notification.message()),
        }
        // No subscribers is fine
        let _ = self.tx.send(notification);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(64)
    }
}
