//! Fingerprint caching.
//!
//! Each scanned root keeps its fingerprints in a single JSON file so that a
//! later scan only fingerprints paths it has not seen before.
//!
//! # Architecture
//!
//! * [`store`]: On-disk envelope, loading with fail-closed validation,
//!   reconciliation against the current path universe, and atomic persistence.
//! * [`entry`]: The per-path entry and the [`FileRecord`] handed to grouping.
//!
//! # Cache Invalidation
//!
//! An entry is keyed by absolute path alone. Paths that disappear are dropped
//! on reconcile. Entries whose size or mtime changed are only recomputed when
//! revalidation is enabled.

pub mod entry;
pub mod store;

pub use entry::{CacheEntry, FileRecord};
pub use store::{CacheError, CacheResult, FingerprintCache, FingerprintStore, CACHE_VERSION};
