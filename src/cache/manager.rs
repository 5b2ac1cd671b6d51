//! Filesystem-backed store for rendered artifacts.
//!
//! The cache is a flat directory of `<digest>.jpg` files. There is no index:
//! freshness comes from each file's modification time. All directory access
//! goes through one reader/writer lock shared across keys, so lookups run
//! concurrently while a store, sweep or clear holds the directory
//! exclusively. The lock is blocking, not advisory.

use super::{CacheError, CacheKey};
use crate::metrics::WatermarkMetrics;
use parking_lot::RwLock;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Prefix of in-progress writes; never matches a digest file name.
const TEMP_FILE_PREFIX: &str = ".tmp-";

/// Outcome of one cleanup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Files deleted because they outlived the TTL
    pub removed: u64,
    /// Bytes left in the cache after the pass
    pub remaining_bytes: u64,
}

/// Aggregate size of the cache directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub files: u64,
    pub bytes: u64,
}

#[derive(Debug)]
pub struct CacheManager {
    root: PathBuf,
    ttl: Duration,
    lock: RwLock<()>,
}

impl CacheManager {
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            ttl,
            lock: RwLock::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Path the artifact for `key` lives at, whether or not it exists.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Return the cached artifact for `key` if it exists, is non-empty and
    /// was written within the TTL.
    ///
    /// Any failure to stat the file counts as a miss; lookups never error.
    pub fn lookup(&self, key: &CacheKey) -> Option<PathBuf> {
        let _guard = self.lock.read();
        let path = self.path_for(key);

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    tracing::debug!(path = %path.display(), error = %e, "Cache stat failed, treating as miss");
                }
                return None;
            }
        };

        if !metadata.is_file() || metadata.len() == 0 {
            return None;
        }

        match metadata.modified() {
            Ok(modified) if self.is_fresh(modified) => Some(path),
            _ => None,
        }
    }

    /// Write `bytes` as the artifact for `key` and return its path.
    ///
    /// The data goes to a uniquely named file in the cache root first and is
    /// renamed over the final name, so readers never observe a partial file.
    pub fn store(&self, key: &CacheKey, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        if bytes.is_empty() {
            return Err(CacheError::EmptyEntry {
                key: key.to_string(),
            });
        }

        let _guard = self.lock.write();
        self.ensure_root()?;

        let path = self.path_for(key);
        let temp_path = self
            .root
            .join(format!("{}{}", TEMP_FILE_PREFIX, uuid::Uuid::new_v4()));

        if let Err(e) = write_file(&temp_path, bytes) {
            let _ = fs::remove_file(&temp_path);
            return Err(CacheError::io_at(&temp_path, e));
        }
        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(CacheError::io_at(&path, e));
        }

        WatermarkMetrics::global().cache_stores.inc();
        tracing::debug!(cache_key = %key, bytes = bytes.len(), "Stored watermark artifact");
        Ok(path)
    }

    /// Delete every regular file older than the TTL.
    ///
    /// Subdirectories are skipped. A file that cannot be inspected or deleted
    /// is logged and the pass continues; only failing to list the root is an
    /// error. A missing root is an empty cache.
    pub fn sweep(&self) -> Result<SweepReport, CacheError> {
        let _guard = self.lock.write();

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SweepReport::default()),
            Err(e) => return Err(CacheError::io_at(&self.root, e)),
        };

        let mut report = SweepReport::default();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read cache directory entry");
                    continue;
                }
            };
            let path = entry.path();
            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to stat cache file");
                    continue;
                }
            };
            if metadata.is_dir() {
                continue;
            }

            let expired = match metadata.modified() {
                Ok(modified) => !self.is_fresh(modified),
                Err(_) => false,
            };
            if !expired {
                report.remaining_bytes += metadata.len();
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to delete expired cache file");
                    report.remaining_bytes += metadata.len();
                }
            }
        }

        let metrics = WatermarkMetrics::global();
        metrics.expired_removed.inc_by(report.removed);
        metrics.set_cache_size(report.remaining_bytes);

        Ok(report)
    }

    /// Total bytes held in the cache.
    pub fn size(&self) -> Result<u64, CacheError> {
        Ok(self.stats()?.bytes)
    }

    /// File count and total bytes of the regular files in the cache root.
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let _guard = self.lock.read();

        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CacheStats::default()),
            Err(e) => return Err(CacheError::io_at(&self.root, e)),
        };

        let mut stats = CacheStats::default();
        for entry in entries.flatten() {
            if let Ok(metadata) = entry.metadata() {
                if metadata.is_file() {
                    stats.files += 1;
                    stats.bytes += metadata.len();
                }
            }
        }
        Ok(stats)
    }

    /// Remove the whole cache root. It is re-created by the next store.
    pub fn clear(&self) -> Result<(), CacheError> {
        let _guard = self.lock.write();
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::io_at(&self.root, e)),
        }
    }

    fn ensure_root(&self) -> Result<(), CacheError> {
        match fs::metadata(&self.root) {
            Ok(metadata) if metadata.is_dir() => Ok(()),
            Ok(_) => Err(CacheError::NotADirectory(self.root.clone())),
            Err(_) => fs::create_dir_all(&self.root).map_err(|e| CacheError::io_at(&self.root, e)),
        }
    }

    /// Files stamped in the future (clock skew) are treated as fresh.
    fn is_fresh(&self, modified: SystemTime) -> bool {
        match SystemTime::now().duration_since(modified) {
            Ok(age) => age < self.ttl,
            Err(_) => true,
        }
    }
}

fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
