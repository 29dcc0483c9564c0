//! Incremental, cache-backed fingerprinting of one root.
//!
//! [`CorpusScanner::hash_files`] is the single entry point the application
//! uses per root. It runs the whole incremental pipeline:
//!
//! 1. canonicalize the root and enumerate its candidate universe
//! 2. load the root's cache and work out which paths are pending
//! 3. fingerprint pending paths on a bounded [`TaskPool`]
//! 4. reconcile the cache with the results and persist it once
//!
//! Workers never touch the cache; results are merged by path on the calling
//! thread. Per-file failures are counted and logged, never fatal.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;

use super::attributes::{platform_oracle, AttributeOracle};
use super::fingerprint::{compute_fingerprint, FingerprintOutcome};
use super::hasher::Hasher;
use super::perceptual::{PerceptualAlgorithm, PerceptualHasher};
use super::walker::Walker;
use super::{HashError, ScanError, WalkerConfig};
use crate::cache::{CacheEntry, FileRecord, FingerprintStore};
use crate::pool::{default_worker_count, PoolError, TaskPool};
use crate::progress::{hashing_phase, ProgressCallback};

/// Errors that stop a corpus scan entirely.
#[derive(thiserror::Error, Debug)]
pub enum CorpusError {
    /// The root could not be enumerated.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The worker pool could not be created.
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Counters describing one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// Candidate files found by enumeration
    pub universe: usize,
    /// Files served from the cache
    pub cache_hits: usize,
    /// Files fingerprinted in this scan
    pub computed: usize,
    /// Files that could not be fingerprinted (corrupt image, permission)
    pub failed: usize,
    /// Files skipped because of an unexpected I/O error
    pub errors: usize,
    /// Cache entries dropped because their file is gone
    pub dropped_stale: usize,
    /// Cache entries dropped because their file changed (revalidation)
    pub invalidated: usize,
    /// Whether the scan stopped early on a shutdown request
    pub interrupted: bool,
    /// Whether the cache was written back successfully
    pub persisted: bool,
}

/// Result of fingerprinting one pending path on a worker.
enum WorkResult {
    Computed(PathBuf, CacheEntry),
    Failed(PathBuf, String),
    Error(HashError),
}

/// Fingerprints one root incrementally.
pub struct CorpusScanner {
    root: PathBuf,
    walker_config: WalkerConfig,
    oracle: Arc<dyn AttributeOracle>,
    workers: usize,
    algorithm: PerceptualAlgorithm,
    revalidate: bool,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for CorpusScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorpusScanner")
            .field("root", &self.root)
            .field("walker_config", &self.walker_config)
            .field("workers", &self.workers)
            .field("algorithm", &self.algorithm)
            .field("revalidate", &self.revalidate)
            .finish_non_exhaustive()
    }
}

impl CorpusScanner {
    /// Create a scanner for a root with default settings.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            walker_config: WalkerConfig::default(),
            oracle: platform_oracle(),
            workers: default_worker_count(),
            algorithm: PerceptualAlgorithm::default(),
            revalidate: false,
            shutdown_flag: None,
            progress: None,
        }
    }

    /// Set the walker configuration.
    #[must_use]
    pub fn with_walker_config(mut self, config: WalkerConfig) -> Self {
        self.walker_config = config;
        self
    }

    /// Replace the hidden/system oracle.
    #[must_use]
    pub fn with_oracle(mut self, oracle: Arc<dyn AttributeOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Set the number of worker threads.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the perceptual hashing algorithm.
    #[must_use]
    pub fn with_algorithm(mut self, algorithm: PerceptualAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Recompute cached fingerprints whose file size or mtime changed.
    #[must_use]
    pub fn with_revalidate(mut self, revalidate: bool) -> Self {
        self.revalidate = revalidate;
        self
    }

    /// Share a shutdown flag with the walker, workers and hasher.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Report progress to a callback.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Fingerprint every candidate file under the root.
    ///
    /// Returns one record per file with a valid fingerprint, in path order,
    /// along with the scan counters. Paths are absolute.
    ///
    /// # Errors
    ///
    /// Fails only if the root is missing or not a directory, or the worker
    /// pool cannot be built. A cache that cannot be written is logged and
    /// reported through [`ScanStats::persisted`].
    pub fn hash_files(&self) -> Result<(Vec<FileRecord>, ScanStats), CorpusError> {
        let root = canonical_root(&self.root)?;
        let mut stats = ScanStats::default();

        let mut walker = Walker::new(&root, self.walker_config.clone())
            .with_oracle(Arc::clone(&self.oracle));
        if let Some(flag) = &self.shutdown_flag {
            walker = walker.with_shutdown_flag(Arc::clone(flag));
        }
        let universe = walker.enumerate()?;
        stats.universe = universe.len();

        let store = FingerprintStore::open(&root);
        let mut cache = store.load();
        if self.revalidate {
            stats.invalidated = cache.invalidate_changed(&universe);
        }

        let pending = cache.pending(&universe);
        stats.cache_hits = universe.len() - pending.len();
        log::debug!(
            "{}: {} files, {} cached, {} to fingerprint",
            root.display(),
            universe.len(),
            stats.cache_hits,
            pending.len()
        );

        let results = self.fingerprint_pending(&root, pending)?;

        let mut computed = Vec::with_capacity(results.len());
        for result in results {
            match result {
                WorkResult::Computed(path, entry) => computed.push((path, entry)),
                WorkResult::Failed(path, reason) => {
                    log::debug!("Not caching {}: {}", path.display(), reason);
                    stats.failed += 1;
                }
                WorkResult::Error(e) => {
                    if !self.is_shutdown_requested() {
                        log::warn!("Skipping file: {}", e);
                    }
                    stats.errors += 1;
                }
            }
        }
        stats.computed = computed.len();
        stats.interrupted = self.is_shutdown_requested();

        // An interrupted walk saw only part of the tree, so nothing is pruned.
        if stats.interrupted {
            cache.merge(computed);
        } else {
            stats.dropped_stale = cache.reconcile(&universe, computed);
        }

        stats.persisted = match store.persist(&cache) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Could not save cache for {}: {}", root.display(), e);
                false
            }
        };

        let records: Vec<FileRecord> = cache
            .records()
            .into_iter()
            .filter(|r| universe.contains(&r.path))
            .collect();

        log::info!(
            "{}: {} files fingerprinted ({} cached, {} computed, {} failed)",
            root.display(),
            records.len(),
            stats.cache_hits,
            stats.computed,
            stats.failed + stats.errors
        );

        Ok((records, stats))
    }

    fn fingerprint_pending(
        &self,
        root: &Path,
        pending: Vec<PathBuf>,
    ) -> Result<Vec<WorkResult>, CorpusError> {
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let mut pool = TaskPool::new(self.workers)?;
        let mut hasher = Hasher::new();
        if let Some(flag) = &self.shutdown_flag {
            pool = pool.with_shutdown_flag(Arc::clone(flag));
            hasher = hasher.with_shutdown_flag(Arc::clone(flag));
        }

        let phase = hashing_phase(root);
        if let Some(progress) = &self.progress {
            progress.on_phase_start(&phase, pending.len());
        }

        let done = AtomicUsize::new(0);
        let algorithm = self.algorithm;
        let progress = self.progress.as_deref();

        let results = pool.map_init(
            pending,
            || (hasher.clone(), PerceptualHasher::new(algorithm)),
            |(hasher, perceptual), path| {
                let result = fingerprint_one(path, hasher, perceptual);
                if let Some(progress) = progress {
                    let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                    if let WorkResult::Computed(path, entry) = &result {
                        progress.on_progress(current, &path.to_string_lossy());
                        progress.on_item_completed(entry.size);
                    } else {
                        progress.on_progress(current, "");
                    }
                }
                result
            },
        );

        if let Some(progress) = &self.progress {
            progress.on_phase_end(&phase);
        }
        Ok(results)
    }
}

/// Fingerprint one path, recording the metadata it was computed against.
fn fingerprint_one(path: PathBuf, hasher: &Hasher, perceptual: &PerceptualHasher) -> WorkResult {
    let metadata = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) => return WorkResult::Error(HashError::from_io(&path, e)),
    };

    match compute_fingerprint(&path, hasher, perceptual) {
        Ok(FingerprintOutcome::Computed(fingerprint)) => {
            log::trace!("Fingerprinted {}", path.display());
            let entry = CacheEntry::new(fingerprint, metadata.len(), metadata.modified().ok());
            WorkResult::Computed(path, entry)
        }
        Ok(FingerprintOutcome::Failed(reason)) => WorkResult::Failed(path, reason),
        Err(e) => WorkResult::Error(e),
    }
}

fn canonical_root(root: &Path) -> Result<PathBuf, ScanError> {
    std::fs::canonicalize(root).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ScanError::NotFound(root.to_path_buf()),
        _ => ScanError::Io {
            path: root.to_path_buf(),
            source: e,
        },
    })
}

/// Canonical form of the paths a scan of `root` would report.
///
/// # Errors
///
/// Returns [`ScanError`] if the root cannot be resolved.
pub fn resolve_root(root: &Path) -> Result<PathBuf, ScanError> {
    canonical_root(root)
}

/// Universe paths shared by two scans (nested or identical roots).
#[must_use]
pub fn overlapping_paths(a: &[FileRecord], b: &[FileRecord]) -> BTreeSet<PathBuf> {
    let b_paths: BTreeSet<&Path> = b.iter().map(|r| r.path.as_path()).collect();
    a.iter()
        .filter(|r| b_paths.contains(r.path.as_path()))
        .map(|r| r.path.clone())
        .collect()
}
