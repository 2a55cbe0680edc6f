//! Cache manager for persisting the paper feed to disk
//!
//! Provides a `CacheManager` that owns a single JSON file. Freshness is decided
//! by the file's modification time plus a TTL; nothing inside the file records
//! when it was written.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::debug;

/// Indentation used for the pretty-printed cache file
const CACHE_INDENT: &[u8] = b"    ";

/// Errors that can occur when reading or writing the cache file
#[derive(Debug, Error)]
pub enum CacheError {
    /// Filesystem access failed
    #[error("cache I/O failed: {0}")]
    Io(#[from] io::Error),

    /// Cache contents could not be encoded or decoded
    #[error("cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Manages a single cache file gated by a time-to-live
///
/// The file is overwritten wholesale on every write and is never locked, so two
/// processes writing the same path race with last-writer-wins semantics.
#[derive(Debug, Clone)]
pub struct CacheManager {
    /// Absolute path of the cache file
    path: PathBuf,
    /// How long after its last modification the file counts as fresh
    ttl: Duration,
}

impl CacheManager {
    /// Creates a CacheManager for the given file path and TTL
    pub fn new(path: PathBuf, ttl: Duration) -> Self {
        Self { path, ttl }
    }

    /// Returns the path of the cache file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the modification time of the cache file, or `None` if it doesn't exist
    pub fn modified_at(&self) -> io::Result<Option<SystemTime>> {
        match fs::metadata(&self.path) {
            Ok(metadata) => metadata.modified().map(Some),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Returns the modification time as a UTC timestamp, for display
    pub fn modified_at_utc(&self) -> io::Result<Option<DateTime<Utc>>> {
        Ok(self.modified_at()?.map(DateTime::<Utc>::from))
    }

    /// Checks whether the cache file exists and is still fresh right now
    pub fn is_fresh(&self) -> io::Result<bool> {
        self.is_fresh_at(SystemTime::now())
    }

    /// Checks whether the cache file is fresh at the given instant
    ///
    /// The file is fresh iff `mtime + ttl > now`. A missing file is never fresh.
    pub fn is_fresh_at(&self, now: SystemTime) -> io::Result<bool> {
        let Some(modified) = self.modified_at()? else {
            debug!(path = %self.path.display(), "cache file missing");
            return Ok(false);
        };

        // An expiry past the representable range never arrives
        let fresh = modified
            .checked_add(self.ttl)
            .map_or(true, |expires_at| expires_at > now);

        debug!(path = %self.path.display(), fresh, "checked cache freshness");
        Ok(fresh)
    }

    /// Reads and decodes the cache file
    pub fn read<T: DeserializeOwned>(&self) -> Result<T, CacheError> {
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Serializes `data` as indented JSON and overwrites the cache file
    ///
    /// Parent directories are created when missing. The write is not atomic: an
    /// interrupted write can leave a truncated file behind.
    pub fn write<T: Serialize>(&self, data: &T) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(CACHE_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        data.serialize(&mut serializer)?;

        fs::write(&self.path, buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestData {
        name: String,
        value: i32,
    }

    fn create_test_cache(ttl_secs: u64) -> (CacheManager, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let cache = CacheManager::new(
            temp_dir.path().join("papers.pkl"),
            Duration::from_secs(ttl_secs),
        );
        (cache, temp_dir)
    }

    fn sample() -> TestData {
        TestData {
            name: "test".to_string(),
            value: 42,
        }
    }

    #[test]
    fn test_missing_file_is_not_fresh() {
        let (cache, _temp_dir) = create_test_cache(1000);

        assert!(cache.modified_at().unwrap().is_none());
        assert!(!cache.is_fresh().unwrap(), "Missing cache should not be fresh");
    }

    #[test]
    fn test_write_then_read() {
        let (cache, _temp_dir) = create_test_cache(1000);

        cache.write(&sample()).expect("Write should succeed");
        let read: TestData = cache.read().expect("Read should succeed");

        assert_eq!(read, sample());
    }

    #[test]
    fn test_write_uses_four_space_indent() {
        let (cache, _temp_dir) = create_test_cache(1000);

        cache.write(&sample()).expect("Write should succeed");
        let content = fs::read_to_string(cache.path()).unwrap();

        assert!(content.contains("\n    \"name\": \"test\""), "got: {}", content);
        assert!(!content.contains("\n      \"name\""));
    }

    #[test]
    fn test_fresh_just_before_expiry() {
        let (cache, _temp_dir) = create_test_cache(1000);
        cache.write(&sample()).unwrap();

        let modified = cache.modified_at().unwrap().unwrap();
        let now = modified + Duration::from_secs(999);

        assert!(cache.is_fresh_at(now).unwrap());
    }

    #[test]
    fn test_stale_at_and_after_expiry() {
        let (cache, _temp_dir) = create_test_cache(1000);
        cache.write(&sample()).unwrap();

        let modified = cache.modified_at().unwrap().unwrap();

        assert!(!cache.is_fresh_at(modified + Duration::from_secs(1000)).unwrap());
        assert!(!cache.is_fresh_at(modified + Duration::from_secs(1001)).unwrap());
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let (cache, _temp_dir) = create_test_cache(0);
        cache.write(&sample()).unwrap();

        let modified = cache.modified_at().unwrap().unwrap();
        assert!(!cache.is_fresh_at(modified).unwrap());
    }

    #[test]
    fn test_write_creates_directory_if_missing() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("nested").join("dir");
        let cache = CacheManager::new(nested.join("papers.pkl"), Duration::from_secs(10));

        cache.write(&sample()).expect("Write should succeed");

        assert!(nested.join("papers.pkl").exists());
    }

    #[test]
    fn test_overwrite_replaces_contents() {
        let (cache, _temp_dir) = create_test_cache(1000);
        let second = TestData {
            name: "second".to_string(),
            value: 2,
        };

        cache.write(&sample()).unwrap();
        cache.write(&second).unwrap();

        let read: TestData = cache.read().unwrap();
        assert_eq!(read, second);
    }

    #[test]
    fn test_read_truncated_file_is_serialization_error() {
        let (cache, _temp_dir) = create_test_cache(1000);
        fs::write(cache.path(), "{\"name\": \"tru").unwrap();

        let result: Result<TestData, CacheError> = cache.read();
        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_modified_at_utc_matches_system_time() {
        let (cache, _temp_dir) = create_test_cache(1000);
        cache.write(&sample()).unwrap();

        let system = cache.modified_at().unwrap().unwrap();
        let utc = cache.modified_at_utc().unwrap().unwrap();
        assert_eq!(utc, DateTime::<Utc>::from(system));
    }
}
