//! Directory walker producing the candidate path universe of a corpus.
//!
//! # Overview
//!
//! [`Walker`] traverses a root with [`jwalk`] and returns the set of regular
//! files below it. Exclusion happens while reading each directory, so an
//! excluded or hidden directory is never descended into:
//!
//! - names in [`WalkerConfig::excluded_names`] (the cache file, reserved OS
//!   folders) are dropped wherever they appear below the root
//! - gitignore-style [`WalkerConfig::ignore_patterns`] are matched relative
//!   to the root
//! - directories the [`AttributeOracle`] flags as hidden/system are pruned
//!
//! Unreadable directories are logged and skipped. Symlinks are never followed
//! and are not candidates.
//!
//! # Example
//!
//! ```no_run
//! use dupfind::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Pictures"), WalkerConfig::default());
//! let universe = walker.enumerate().unwrap();
//! println!("{} candidate files", universe.len());
//! ```

use std::collections::{BTreeSet, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use jwalk::WalkDir;

use super::attributes::{platform_oracle, AttributeOracle};
use super::{ScanError, WalkerConfig};

/// Directory walker for file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
    /// Hidden/system attribute oracle
    oracle: Arc<dyn AttributeOracle>,
    /// Optional shutdown flag for graceful termination
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker for the given root using the platform oracle.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
            oracle: platform_oracle(),
            shutdown_flag: None,
        }
    }

    /// Replace the hidden/system oracle.
    #[must_use]
    pub fn with_oracle(mut self, oracle: Arc<dyn AttributeOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set, enumeration stops and returns what it has seen.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// The root this walker enumerates.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build the gitignore matcher from the configured patterns.
    fn build_gitignore(&self) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if !gitignore.is_empty() => Some(gitignore),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Enumerate every candidate file below the root.
    ///
    /// # Errors
    ///
    /// Fails only if the root does not exist or is not a directory. Errors
    /// below the root are logged and the affected subtree is skipped.
    pub fn enumerate(&self) -> Result<BTreeSet<PathBuf>, ScanError> {
        let root_meta = std::fs::metadata(&self.root).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScanError::NotFound(self.root.clone()),
            _ => ScanError::Io {
                path: self.root.clone(),
                source: e,
            },
        })?;
        if !root_meta.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }

        let excluded: Arc<HashSet<OsString>> = Arc::new(
            self.config
                .excluded_names
                .iter()
                .map(OsString::from)
                .collect(),
        );
        let gitignore = Arc::new(self.build_gitignore());
        let oracle = Arc::clone(&self.oracle);
        let root = self.root.clone();

        let walk_dir = WalkDir::new(&self.root)
            .follow_links(false)
            .skip_hidden(false)
            .process_read_dir(move |depth, _path, _state, children| {
                // The root is handed in as its own only child; it is never pruned.
                if depth.is_none() {
                    return;
                }
                children.retain(|entry| {
                    let Ok(entry) = entry else {
                        // Keep errors so they are reported by the iterator
                        return true;
                    };
                    let path = entry.path();
                    let is_dir = entry.file_type().is_dir();

                    if excluded.contains(entry.file_name()) {
                        log::trace!("Excluding by name: {}", path.display());
                        return false;
                    }
                    if let Some(gi) = gitignore.as_ref() {
                        let relative = path.strip_prefix(&root).unwrap_or(path.as_path());
                        if gi.matched(relative, is_dir).is_ignore() {
                            log::trace!("Ignoring by pattern: {}", path.display());
                            return false;
                        }
                    }
                    if is_dir && oracle.is_hidden_or_system(&path) {
                        log::debug!("Pruning hidden/system directory: {}", path.display());
                        return false;
                    }
                    true
                });
                children.sort_by(|a, b| match (a, b) {
                    (Ok(a), Ok(b)) => a.file_name().cmp(b.file_name()),
                    (Ok(_), Err(_)) => std::cmp::Ordering::Less,
                    (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
                    (Err(_), Err(_)) => std::cmp::Ordering::Equal,
                });
            });

        let mut universe = BTreeSet::new();
        for entry in walk_dir {
            if self.is_shutdown_requested() {
                log::debug!("Walker: Shutdown requested, stopping enumeration");
                break;
            }

            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() {
                        universe.insert(entry.path());
                    }
                }
                Err(e) => {
                    let path = e
                        .path()
                        .map_or_else(|| self.root.clone(), Path::to_path_buf);
                    log::warn!("Skipping unreadable entry {}: {}", path.display(), e);
                }
            }
        }

        log::debug!(
            "Enumerated {} candidate files under {}",
            universe.len(),
            self.root.display()
        );
        Ok(universe)
    }
}
