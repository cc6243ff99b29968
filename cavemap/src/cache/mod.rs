//! Disk cache for rendered map tiles.
//!
//! Tiles are stored flat under the cache root as `<cache_key>.<ext>`, where
//! the key comes from [`cache_key`](crate::grid::cache_key). Writes go to a
//! uniquely named temp file first and are renamed into place, so readers
//! never see a partial tile and concurrent writers of the same key resolve
//! to whichever rename lands last.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::{debug, info, warn};

/// Suffix of in-flight writes.
const TEMP_SUFFIX: &str = "tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Errors from the tile cache.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O failure on a cache path.
    #[error("cache I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Key that would escape the cache root.
    #[error("invalid cache key '{0}'")]
    InvalidKey(String),
}

impl CacheError {
    fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Size of the cache on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub files: usize,
    pub total_bytes: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} tiles, {}", self.files, format_size(self.total_bytes))
    }
}

/// Outcome of clearing the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearResult {
    pub files_removed: usize,
    pub bytes_freed: u64,
}

impl fmt::Display for ClearResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "removed {} files, freed {}",
            self.files_removed,
            format_size(self.bytes_freed)
        )
    }
}

/// Flat on-disk tile store.
#[derive(Debug, Clone)]
pub struct TileDiskCache {
    root: PathBuf,
}

impl TileDiskCache {
    /// Creates a cache rooted at `root`. The directory is created lazily.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path where a tile with this key is stored.
    pub fn path_for(&self, key: &str, extension: &str) -> Result<PathBuf, CacheError> {
        let escapes = key.contains(|c: char| c == '/' || c == '\\');
        if key.is_empty() || escapes || key.starts_with('.') {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{}.{}", key, extension)))
    }

    /// Reads a cached tile. Missing or unreadable entries are misses.
    pub fn get(&self, key: &str, extension: &str) -> Option<Vec<u8>> {
        let path = self.path_for(key, extension).ok()?;
        match fs::read(&path) {
            Ok(bytes) => {
                debug!(key = %key, bytes = bytes.len(), "Tile cache hit");
                Some(bytes)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable cache entry");
                None
            }
        }
    }

    /// Returns true if a tile with this key is cached.
    pub fn contains(&self, key: &str, extension: &str) -> bool {
        self.path_for(key, extension)
            .map(|p| p.is_file())
            .unwrap_or(false)
    }

    /// Stores a tile, replacing any existing entry.
    pub fn put(&self, key: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf, CacheError> {
        let path = self.path_for(key, extension)?;
        fs::create_dir_all(&self.root).map_err(|e| CacheError::io(&self.root, e))?;

        let temp_path = self.root.join(format!(
            "{}.{}.{}-{}.{}",
            key,
            extension,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed),
            TEMP_SUFFIX
        ));

        if let Err(e) = fs::write(&temp_path, bytes) {
            let _ = fs::remove_file(&temp_path);
            return Err(CacheError::io(&temp_path, e));
        }
        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(CacheError::io(&path, e));
        }

        debug!(key = %key, bytes = bytes.len(), "Stored tile");
        Ok(path)
    }

    /// Counts cached tiles and their total size.
    pub fn stats(&self) -> Result<CacheStats, CacheError> {
        let mut stats = CacheStats::default();
        for (_, len) in self.entries()? {
            stats.files += 1;
            stats.total_bytes += len;
        }
        Ok(stats)
    }

    /// Removes every cached tile and leftover temp file.
    pub fn clear(&self) -> Result<ClearResult, CacheError> {
        let mut result = ClearResult::default();
        for (path, len) in self.entries()? {
            match fs::remove_file(&path) {
                Ok(()) => {
                    result.files_removed += 1;
                    result.bytes_freed += len;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(CacheError::io(&path, e)),
            }
        }
        info!(
            root = %self.root.display(),
            files = result.files_removed,
            bytes = result.bytes_freed,
            "Cleared tile cache"
        );
        Ok(result)
    }

    fn entries(&self) -> Result<Vec<(PathBuf, u64)>, CacheError> {
        let dir = match fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CacheError::io(&self.root, e)),
        };

        let mut entries = Vec::new();
        for entry in dir.flatten() {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            if metadata.is_file() {
                entries.push((entry.path(), metadata.len()));
            }
        }
        Ok(entries)
    }
}

/// Formats a byte count with binary units.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
