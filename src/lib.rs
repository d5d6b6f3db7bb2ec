pub mod clock;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod notify;
pub mod offline;
pub mod server;
pub mod status;
pub mod storage;
pub mod store;
pub mod sync;
pub mod ttl;

pub use config::OfflineConfig;
pub use connectivity::{ConnectivityEvent, ConnectivitySource, ManualConnectivity, MonitorHandle};
pub use error::{OfflineError, OfflineResult, ReplayError};
pub use notify::{Notification, Notifier};
pub use offline::OfflineContext;
pub use server::create_router;
pub use status::StatusSnapshot;
pub use storage::{KvBackend, MemoryBackend, RocksBackend};
pub use store::{CachedEntry, LocalStore, PendingAction};
pub use sync::{FnReplayer, HttpReplayer, Reconciler, Replayer, SyncReport};
