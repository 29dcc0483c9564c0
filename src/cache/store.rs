//! JSON-backed per-root fingerprint store.
//!
//! The cache lives at `<root>/.dupfind-cache.json` inside an envelope carrying
//! a schema version and a SHA-256 checksum of the payload. Anything that does
//! not load cleanly (missing file, bad JSON, other version, wrong checksum,
//! different root) is logged and replaced by an empty cache, which simply
//! means a full re-hash.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::entry::{CacheEntry, FileRecord};
use crate::scanner::{CACHE_FILE_NAME, CACHE_TEMP_FILE_NAME};

/// Current cache schema version. Bump on any change to the on-disk shape.
pub const CACHE_VERSION: u32 = 1;

/// Errors that can occur while loading or persisting the cache.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// Reading or writing the cache file failed.
    #[error("Cache I/O error for {path}: {source}")]
    Io {
        /// Cache file path
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The cache file is not valid JSON for the expected shape.
    #[error("Cache file is corrupted: {0}")]
    Parse(#[from] serde_json::Error),

    /// The cache file was written by a different schema version.
    #[error("Unsupported cache version {found} (expected {expected})")]
    VersionMismatch {
        /// Version found on disk
        found: u32,
        /// Version this build understands
        expected: u32,
    },

    /// The payload does not match its checksum.
    #[error("Cache integrity check failed: checksum mismatch")]
    ChecksumMismatch,

    /// The cache was written for another root.
    #[error("Cache belongs to {found}, not {expected}")]
    RootMismatch {
        /// Root recorded in the cache
        found: PathBuf,
        /// Root being scanned
        expected: PathBuf,
    },
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// In-memory fingerprint cache for one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintCache {
    /// Root directory this cache belongs to
    pub root: PathBuf,
    /// When the cache was last written
    pub generated_at: DateTime<Utc>,
    /// Entries keyed by absolute path
    pub entries: BTreeMap<PathBuf, CacheEntry>,
}

impl FingerprintCache {
    /// Create an empty cache for a root.
    #[must_use]
    pub fn empty(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            generated_at: Utc::now(),
            entries: BTreeMap::new(),
        }
    }

    /// Number of cached fingerprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no fingerprints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get the entry for a path.
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<&CacheEntry> {
        self.entries.get(path)
    }

    /// Paths of the universe that have no cached fingerprint.
    ///
    /// These are the only paths that need fingerprinting.
    #[must_use]
    pub fn pending(&self, universe: &BTreeSet<PathBuf>) -> Vec<PathBuf> {
        universe
            .iter()
            .filter(|p| !self.entries.contains_key(*p))
            .cloned()
            .collect()
    }

    /// Drop entries whose file no longer has the recorded size and mtime.
    ///
    /// Returns the number of entries dropped.
    pub fn invalidate_changed(&mut self, universe: &BTreeSet<PathBuf>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|path, entry| {
            let keep = !universe.contains(path) || entry.matches_metadata(path);
            if !keep {
                log::debug!("Fingerprint outdated: {}", path.display());
            }
            keep
        });
        before - self.entries.len()
    }

    /// Insert freshly computed entries, overwriting existing ones.
    ///
    /// Nothing is dropped. Used on its own when the universe is incomplete.
    pub fn merge<I>(&mut self, computed: I)
    where
        I: IntoIterator<Item = (PathBuf, CacheEntry)>,
    {
        self.entries.extend(computed);
    }

    /// Merge freshly computed entries and drop paths outside the universe.
    ///
    /// Computed entries overwrite existing ones. Returns the number of stale
    /// entries dropped.
    pub fn reconcile<I>(&mut self, universe: &BTreeSet<PathBuf>, computed: I) -> usize
    where
        I: IntoIterator<Item = (PathBuf, CacheEntry)>,
    {
        self.merge(computed);

        let before = self.entries.len();
        self.entries.retain(|path, _| universe.contains(path));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            log::debug!("Dropped {} fingerprints of vanished files", dropped);
        }
        dropped
    }

    /// All entries as records, in path order.
    #[must_use]
    pub fn records(&self) -> Vec<FileRecord> {
        self.entries
            .iter()
            .map(|(path, entry)| FileRecord::from_entry(path.clone(), entry))
            .collect()
    }
}

/// Envelope for cache files to include version and integrity checks.
#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope {
    /// Schema version of the payload.
    version: u32,
    /// SHA256 checksum of the compact JSON of `cache`.
    checksum: String,
    /// The actual cache data.
    cache: FingerprintCache,
}

/// Only the version, read before the payload so other schemas fail closed.
#[derive(Debug, Deserialize)]
struct VersionHeader {
    version: u32,
}

fn checksum_of(cache: &FingerprintCache) -> CacheResult<String> {
    let json = serde_json::to_string(cache)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Loads and persists the fingerprint cache of one root.
#[derive(Debug, Clone)]
pub struct FingerprintStore {
    root: PathBuf,
}

impl FingerprintStore {
    /// Open the store for the given root. Nothing is read until [`load`](Self::load).
    #[must_use]
    pub fn open(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Path of the cache file.
    #[must_use]
    pub fn cache_path(&self) -> PathBuf {
        self.root.join(CACHE_FILE_NAME)
    }

    fn temp_path(&self) -> PathBuf {
        self.root.join(CACHE_TEMP_FILE_NAME)
    }

    /// Load the cache, falling back to an empty one on any problem.
    #[must_use]
    pub fn load(&self) -> FingerprintCache {
        match self.try_load() {
            Ok(Some(cache)) => {
                log::debug!(
                    "Loaded {} cached fingerprints from {}",
                    cache.len(),
                    self.cache_path().display()
                );
                cache
            }
            Ok(None) => {
                log::debug!("No cache at {}, starting fresh", self.cache_path().display());
                FingerprintCache::empty(&self.root)
            }
            Err(e) => {
                log::warn!(
                    "Discarding cache {}: {}. All files will be re-hashed.",
                    self.cache_path().display(),
                    e
                );
                FingerprintCache::empty(&self.root)
            }
        }
    }

    /// Load the cache, reporting why it could not be used.
    ///
    /// Returns `Ok(None)` when no cache file exists.
    ///
    /// # Errors
    ///
    /// Any read, parse, version, checksum or root problem.
    pub fn try_load(&self) -> CacheResult<Option<FingerprintCache>> {
        let path = self.cache_path();
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Io { path, source: e }),
        };

        let header: VersionHeader = serde_json::from_str(&content)?;
        if header.version != CACHE_VERSION {
            return Err(CacheError::VersionMismatch {
                found: header.version,
                expected: CACHE_VERSION,
            });
        }

        let envelope: CacheEnvelope = serde_json::from_str(&content)?;
        if checksum_of(&envelope.cache)? != envelope.checksum {
            return Err(CacheError::ChecksumMismatch);
        }
        if envelope.cache.root != self.root {
            return Err(CacheError::RootMismatch {
                found: envelope.cache.root,
                expected: self.root.clone(),
            });
        }

        Ok(Some(envelope.cache))
    }

    /// Write the cache next to its final location, then rename it into place.
    ///
    /// Entries whose path is not valid UTF-8 cannot be represented as JSON
    /// keys and are left out; they are re-hashed on the next scan.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError`] if serialization or any file operation fails.
    pub fn persist(&self, cache: &FingerprintCache) -> CacheResult<()> {
        let mut cache = cache.clone();
        cache.generated_at = Utc::now();
        cache.entries.retain(|path, _| {
            let ok = path.to_str().is_some();
            if !ok {
                log::debug!("Not caching non UTF-8 path: {}", path.display());
            }
            ok
        });

        let envelope = CacheEnvelope {
            version: CACHE_VERSION,
            checksum: checksum_of(&cache)?,
            cache,
        };
        let json = serde_json::to_string_pretty(&envelope)?;

        let temp = self.temp_path();
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| CacheError::Io { path, source }
        };

        let mut file = File::create(&temp).map_err(io_err(&temp))?;
        file.write_all(json.as_bytes()).map_err(io_err(&temp))?;
        file.sync_all().map_err(io_err(&temp))?;
        drop(file);

        let target = self.cache_path();
        fs::rename(&temp, &target).map_err(io_err(&target))?;

        log::debug!(
            "Persisted {} fingerprints to {}",
            envelope.cache.len(),
            target.display()
        );
        Ok(())
    }
}
