use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::SystemTime;

use super::error::DashboardError;
use super::loader::load_file;
use super::model::Table;

/// Identity of a source file: if any of these change the file was replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceKey {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
    pub len: u64,
}

impl SourceKey {
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(SourceKey {
            path: path.canonicalize()?,
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

struct Entry {
    key: SourceKey,
    table: Arc<Table>,
}

/// Memoised dataset load.
///
/// Readers get a shared `Arc<Table>`; a reload swaps the whole entry, so a
/// table handed out earlier stays valid and unchanged.
#[derive(Default)]
pub struct DatasetCache {
    entry: RwLock<Option<Entry>>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached table for `path`, loading it on a miss or when the
    /// file on disk no longer matches the cached identity.
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<Table>, DashboardError> {
        let key = SourceKey::of(path).map_err(|e| DashboardError::DataUnavailable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if let Ok(guard) = self.entry.read() {
            if let Some(entry) = guard.as_ref().filter(|e| e.key == key) {
                return Ok(Arc::clone(&entry.table));
            }
        }

        let table = Arc::new(load_file(path)?);
        log::info!("Dataset cache refreshed from {}", key.path.display());
        let mut guard = self.entry.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(Entry {
            key,
            table: Arc::clone(&table),
        });
        Ok(table)
    }

    /// Drop the cached table; the next `get_or_load` re-reads the file.
    pub fn invalidate(&self) {
        let mut guard = self.entry.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.take().is_some() {
            log::info!("Dataset cache invalidated");
        }
    }

    /// The currently cached table, if any.
    pub fn current(&self) -> Option<Arc<Table>> {
        let guard = self.entry.read().ok()?;
        guard.as_ref().map(|e| Arc::clone(&e.table))
    }
}
