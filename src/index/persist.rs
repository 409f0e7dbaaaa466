//! Offline cache collaborator: JSON file and in-memory implementations.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::error::StoreError;
use crate::state::PackageRecord;

/// What: Locally persisted snapshot of the last known package list.
///
/// Details:
/// - `load` is synchronous and local; the collection runs it on a blocking
///   task so it can be tracked like any other fetch.
/// - Implementations must be shareable across tasks.
pub trait OfflineCache: Send + Sync {
    /// Read the cached records. A missing cache is an empty list, not an error.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the cache exists but cannot be read or parsed.
    fn load(&self) -> Result<Vec<PackageRecord>, StoreError>;

    /// Replace the cached records.
    ///
    /// # Errors
    /// Returns [`StoreError`] when the snapshot cannot be written.
    fn save(&self, records: &[PackageRecord]) -> Result<(), StoreError>;
}

/// On-disk layout of the offline cache file.
#[derive(serde::Serialize, serde::Deserialize, Default)]
struct CacheFile {
    /// Cached package records.
    #[serde(default)]
    pkgs: Vec<PackageRecord>,
}

/// JSON file backed [`OfflineCache`].
#[derive(Clone, Debug)]
pub struct JsonOfflineCache {
    /// Location of the cache file.
    path: PathBuf,
}

impl JsonOfflineCache {
    /// Cache stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the user cache directory.
    #[must_use]
    pub fn default_location() -> Self {
        Self::new(crate::util::cache_dir().join("packages.json"))
    }
}

impl OfflineCache for JsonOfflineCache {
    /// What: Load the offline snapshot from disk.
    ///
    /// Output:
    /// - `Ok(vec![])` when the file does not exist yet (first run).
    fn load(&self) -> Result<Vec<PackageRecord>, StoreError> {
        let s = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "[Persist] no offline cache yet");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let file: CacheFile = serde_json::from_str(&s)?;
        tracing::debug!(
            path = %self.path.display(),
            package_count = file.pkgs.len(),
            "[Persist] offline cache loaded"
        );
        Ok(file.pkgs)
    }

    /// What: Persist records as JSON, creating the parent directory if needed.
    ///
    /// Details:
    /// - Warns when asked to save an empty snapshot but still writes it.
    fn save(&self, records: &[PackageRecord]) -> Result<(), StoreError> {
        if records.is_empty() {
            tracing::warn!(
                path = %self.path.display(),
                "[Persist] Attempting to save empty offline cache"
            );
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string(&CacheFile {
            pkgs: records.to_vec(),
        })?;
        fs::write(&self.path, body)?;
        tracing::debug!(
            path = %self.path.display(),
            package_count = records.len(),
            "[Persist] offline cache saved"
        );
        Ok(())
    }
}

/// In-memory [`OfflineCache`], used when persistence is disabled and in tests.
#[derive(Debug, Default)]
pub struct MemoryOfflineCache {
    /// Current snapshot.
    records: Mutex<Vec<PackageRecord>>,
}

impl MemoryOfflineCache {
    /// Cache pre-seeded with `records`.
    #[must_use]
    pub const fn with_records(records: Vec<PackageRecord>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl OfflineCache for MemoryOfflineCache {
    fn load(&self) -> Result<Vec<PackageRecord>, StoreError> {
        Ok(self
            .records
            .lock()
            .map(|g| g.clone())
            .unwrap_or_default())
    }

    fn save(&self, records: &[PackageRecord]) -> Result<(), StoreError> {
        if let Ok(mut g) = self.records.lock() {
            *g = records.to_vec();
        }
        Ok(())
    }
}
