//! Scanner module for directory traversal and file fingerprinting.
//!
//! This module provides functionality for:
//! - Directory walking with exclusion rules and hidden/system pruning
//! - Exact content digests with BLAKE3
//! - Perceptual hashing of images
//! - The incremental, cache-backed corpus scan that ties them together
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`attributes`]: Platform oracle for hidden/system directories
//! - [`walker`]: Directory traversal producing the candidate path universe
//! - [`hasher`]: Streaming BLAKE3 file digests
//! - [`perceptual`]: Perceptual image hashes
//! - [`fingerprint`]: The per-path fingerprint computation
//! - [`corpus`]: Enumerate, fingerprint in parallel, reconcile and persist
//!
//! # Example
//!
//! ```no_run
//! use dupfind::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! for path in walker.enumerate().unwrap() {
//!     println!("{}", path.display());
//! }
//! ```

pub mod attributes;
pub mod corpus;
pub mod fingerprint;
pub mod hasher;
pub mod perceptual;
pub mod walker;

use std::path::PathBuf;

// Re-export main types
pub use attributes::{platform_oracle, AttributeOracle, DotPrefixOracle};
pub use corpus::{overlapping_paths, resolve_root, CorpusError, CorpusScanner, ScanStats};
pub use fingerprint::{compute_fingerprint, is_image_path, Fingerprint, FingerprintOutcome};
pub use hasher::{hash_to_hex, hex_to_hash, Digest, Hasher, CHUNK_SIZE};
pub use perceptual::{PerceptualAlgorithm, PerceptualError, PerceptualHasher};
pub use walker::Walker;

/// File name of the per-root fingerprint cache.
pub const CACHE_FILE_NAME: &str = ".dupfind-cache.json";

/// Temporary name the cache is written to before being renamed into place.
pub const CACHE_TEMP_FILE_NAME: &str = ".dupfind-cache.json.tmp";

/// Reserved operating-system folder names that are never scanned.
pub const RESERVED_NAMES: &[&str] = &[
    "$RECYCLE.BIN",
    "System Volume Information",
    ".Trashes",
    ".Spotlight-V100",
    ".fseventsd",
];

/// Configuration for directory walking.
///
/// Controls which names and patterns are excluded from the candidate universe.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// File or directory names excluded wherever they appear below the root.
    pub excluded_names: Vec<String>,

    /// Glob patterns to ignore (gitignore-style), relative to the root.
    pub ignore_patterns: Vec<String>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        let mut excluded_names: Vec<String> = vec![
            CACHE_FILE_NAME.to_string(),
            CACHE_TEMP_FILE_NAME.to_string(),
        ];
        excluded_names.extend(RESERVED_NAMES.iter().map(|s| (*s).to_string()));
        Self {
            excluded_names,
            ignore_patterns: Vec::new(),
        }
    }
}

impl WalkerConfig {
    /// Add extra excluded names on top of the built-in set.
    #[must_use]
    pub fn with_excluded_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.excluded_names.contains(&name) {
                self.excluded_names.push(name);
            }
        }
        self
    }

    /// Set the gitignore-style ignore patterns.
    #[must_use]
    pub fn with_ignore_patterns(mut self, patterns: Vec<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing the root.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur during file hashing.
///
/// Only errors that are not recovered as a failed fingerprint end up here.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The file disappeared between enumeration and hashing.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Build a `HashError` from an I/O error, classifying `NotFound`.
    pub(crate) fn from_io(path: &std::path::Path, error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}
