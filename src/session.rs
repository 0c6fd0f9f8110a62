use crate::cache::MetadataCache;
use crate::error::Error;
use crate::model::FileRecord;
use crate::similarity::PairMemo;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Explicit session object owning the process-wide mutable state: the
/// persistent metadata cache and the in-session pair-score memo.
///
/// The cache survives across scans via `load`/`flush`; the memo lives only
/// as long as the session (or until `clear_pair_memo`), and its entries
/// are fingerprint-tagged so an edited document never resurrects an old
/// score.
#[derive(Debug, Default)]
pub struct ScanSession {
    pub cache: MetadataCache,
    pub(crate) memo: PairMemo,
    snapshot_path: Option<PathBuf>,
}

impl ScanSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache snapshot from `path`. A missing file is a cold
    /// cache; an unparseable one is treated the same way, never an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let cache = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, FileRecord>>(&raw) {
                Ok(snapshot) => {
                    debug!(
                        "Loaded {} cache entries from {}",
                        snapshot.len(),
                        path.display()
                    );
                    MetadataCache::from_snapshot(snapshot)
                }
                Err(err) => {
                    warn!(
                        "Cache snapshot {} unreadable ({}), starting cold",
                        path.display(),
                        err
                    );
                    MetadataCache::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => MetadataCache::new(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            cache,
            memo: PairMemo::default(),
            snapshot_path: Some(path),
        })
    }

    /// Write the cache back to the snapshot file it was loaded from.
    /// A session constructed without a snapshot path flushes nowhere.
    pub fn flush(&self) -> Result<(), Error> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let serialized = serde_json::to_string_pretty(self.cache.snapshot())
            .map_err(|e| Error::Cache(format!("Serialize error: {}", e)))?;
        fs::write(path, serialized)?;
        info!(
            "Flushed {} cache entries to {}",
            self.cache.len(),
            path.display()
        );
        Ok(())
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    pub fn clear_pair_memo(&mut self) {
        self.memo.clear();
    }

    pub fn memo_size(&self) -> usize {
        self.memo.len()
    }
}
