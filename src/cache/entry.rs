//! Cache entry definitions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::scanner::Fingerprint;

/// Represents a single file entry in the fingerprint cache.
///
/// Size and modification time are recorded when the fingerprint is computed.
/// They are used to detect changed files (when revalidation is enabled) and to
/// verify a file is untouched before it is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Content fingerprint
    pub fingerprint: Fingerprint,
    /// File size in bytes at fingerprint time
    pub size: u64,
    /// Modification time at fingerprint time, if the platform reports one
    #[serde(default)]
    pub modified: Option<SystemTime>,
}

impl CacheEntry {
    /// Create a new entry.
    #[must_use]
    pub fn new(fingerprint: Fingerprint, size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            fingerprint,
            size,
            modified,
        }
    }

    /// Whether the file at `path` still has the recorded size and mtime.
    ///
    /// A missing or unreadable file is never considered matching.
    #[must_use]
    pub fn matches_metadata(&self, path: &Path) -> bool {
        match std::fs::metadata(path) {
            Ok(meta) => meta.len() == self.size && meta.modified().ok() == self.modified,
            Err(_) => false,
        }
    }
}

/// A fingerprinted file, keyed by its absolute path within one scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute path to the file
    pub path: PathBuf,
    /// Content fingerprint
    pub fingerprint: Fingerprint,
    /// File size in bytes at fingerprint time
    pub size: u64,
    /// Modification time at fingerprint time
    #[serde(default)]
    pub modified: Option<SystemTime>,
}

impl FileRecord {
    /// Create a record with no recorded metadata.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, fingerprint: Fingerprint) -> Self {
        Self {
            path: path.into(),
            fingerprint,
            size: 0,
            modified: None,
        }
    }

    /// Build a record from a cache entry.
    #[must_use]
    pub fn from_entry(path: PathBuf, entry: &CacheEntry) -> Self {
        Self {
            path,
            fingerprint: entry.fingerprint.clone(),
            size: entry.size,
            modified: entry.modified,
        }
    }
}
