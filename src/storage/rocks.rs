use std::path::{Path, PathBuf};
use std::sync::Arc;

use rocksdb::{Options, DB};

use super::KvBackend;
use crate::error::{OfflineError, OfflineResult};

const KEY_PREFIX: &str = "offline:";

/// On-disk backend backed by RocksDB
#[derive(Clone)]
pub struct RocksBackend {
    db: Arc<DB>,
    path: PathBuf,
}

impl std::fmt::Debug for RocksBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksBackend")
            .field("path", &self.path)
            .finish()
    }
}

impl RocksBackend {
    /// Open (or create) the store under `data_dir`
    pub fn open<P: AsRef<Path>>(data_dir: P) -> OfflineResult<Self> {
        let path = data_dir.as_ref().join("offline_store");

        let mut opts = Options::default();
        opts.create_if_missing(true);
        // Two small JSON blobs; keep RocksDB housekeeping files minimal
        opts.set_keep_log_file_num(2);
        opts.set_max_total_wal_size(8 * 1024 * 1024);

        let db = DB::open(&opts, &path).map_err(|e| {
            OfflineError::Storage(format!("Failed to open RocksDB at {}: {}", path.display(), e))
        })?;

        tracing::info!("Offline store opened at {}", path.display());
        Ok(Self {
            db: Arc::new(db),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn storage_key(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }
}

impl KvBackend for RocksBackend {
    fn get(&self, key: &str) -> OfflineResult<Option<String>> {
        match self.db.get(Self::storage_key(key))? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| OfflineError::Storage(format!("Invalid UTF-8 under '{}': {}", key, e))),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str) -> OfflineResult<()> {
        self.db.put(Self::storage_key(key), value.as_bytes())?;
        Ok(())
    }

    fn delete(&self, key: &str) -> OfflineResult<()> {
        self.db.delete(Self::storage_key(key))?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "rocksdb"
    }
}
