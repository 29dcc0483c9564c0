//! Partitioning fingerprinted files into duplicate groups.
//!
//! # Overview
//!
//! [`group`] turns a flat list of [`FileRecord`]s into equivalence classes:
//!
//! - [`Similarity::Exact`] buckets records whose fingerprints are identical.
//! - [`Similarity::Perceptual`] buckets exact digests the same way, and joins
//!   perceptual codes into connected components where an edge exists iff the
//!   Hamming distance is strictly below the cutoff. Membership is transitive:
//!   two images far apart can share a group through a chain of close ones.
//!
//! Output is deterministic. Members of a group are in path order (so the
//! first member is the lexicographically smallest path) and groups are
//! ordered by their first member. Singletons are not duplicates and are only
//! counted in [`GroupingStats`].
//!
//! # Example
//!
//! ```
//! use dupfind::cache::FileRecord;
//! use dupfind::duplicates::{group, Similarity};
//! use dupfind::scanner::Fingerprint;
//!
//! let x = Fingerprint::Exact { digest: [1; 32] };
//! let y = Fingerprint::Exact { digest: [2; 32] };
//! let records = vec![
//!     FileRecord::new("/d/b", x.clone()),
//!     FileRecord::new("/d/a", x),
//!     FileRecord::new("/d/c", y),
//! ];
//!
//! let (groups, stats) = group(records, Similarity::Exact);
//!
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].files[0].path.to_str(), Some("/d/a"));
//! assert_eq!(stats.singletons, 1);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::similarity::connected_codes;
use crate::cache::FileRecord;
use crate::scanner::Fingerprint;

/// How two fingerprints are judged equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Similarity {
    /// Identical fingerprints only.
    Exact,
    /// Perceptual codes closer than `cutoff` (exclusive); digests must match.
    Perceptual {
        /// Exclusive Hamming distance bound
        cutoff: u32,
    },
}

impl std::fmt::Display for Similarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Perceptual { cutoff } => write!(f, "perceptual (distance < {})", cutoff),
        }
    }
}

/// A set of files sharing an equivalence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    /// Members in path order; the first one is the one that is kept
    pub files: Vec<FileRecord>,
    /// Whether membership came from perceptual distance rather than identity
    #[serde(default)]
    pub is_similar: bool,
}

impl DuplicateGroup {
    /// Create a group, sorting members by path.
    #[must_use]
    pub fn new(mut files: Vec<FileRecord>, is_similar: bool) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Self { files, is_similar }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// The member that a dedup run keeps.
    #[must_use]
    pub fn keeper(&self) -> Option<&FileRecord> {
        self.files.first()
    }

    /// Bytes freed by removing everything but the keeper.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.files.iter().skip(1).map(|f| f.size).sum()
    }
}

/// Statistics from the grouping phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GroupingStats {
    /// Total number of records processed
    pub total_files: usize,
    /// Records carrying an exact digest
    pub exact_records: usize,
    /// Records carrying a perceptual code
    pub perceptual_records: usize,
    /// Number of groups with 2+ members
    pub duplicate_groups: usize,
    /// Files in those groups
    pub grouped_files: usize,
    /// Records that matched nothing
    pub singletons: usize,
}

/// Partition records into duplicate groups.
///
/// Returns only groups with at least two members, ordered by first member.
#[must_use]
pub fn group(
    records: impl IntoIterator<Item = FileRecord>,
    similarity: Similarity,
) -> (Vec<DuplicateGroup>, GroupingStats) {
    let mut records: Vec<FileRecord> = records.into_iter().collect();
    records.sort_by(|a, b| a.path.cmp(&b.path));
    records.dedup_by(|a, b| a.path == b.path);

    let mut stats = GroupingStats {
        total_files: records.len(),
        ..GroupingStats::default()
    };
    stats.perceptual_records = records
        .iter()
        .filter(|r| r.fingerprint.is_perceptual())
        .count();
    stats.exact_records = stats.total_files - stats.perceptual_records;

    let classes = match similarity {
        Similarity::Exact => bucket_identical(records, false),
        Similarity::Perceptual { cutoff } => {
            let (perceptual, exact): (Vec<_>, Vec<_>) = records
                .into_iter()
                .partition(|r| r.fingerprint.is_perceptual());
            let mut classes = bucket_identical(exact, false);
            classes.extend(connect_perceptual(perceptual, cutoff));
            classes
        }
    };

    let mut groups: Vec<DuplicateGroup> = Vec::new();
    for class in classes {
        if class.len() < 2 {
            stats.singletons += class.len();
            continue;
        }
        log::debug!(
            "Group of {} files ({})",
            class.len(),
            class.files[0].fingerprint.short()
        );
        stats.grouped_files += class.len();
        groups.push(class);
    }
    groups.sort_by(|a, b| a.files[0].path.cmp(&b.files[0].path));
    stats.duplicate_groups = groups.len();

    log::info!(
        "Grouping ({}): {} files → {} duplicate groups, {} unique",
        similarity,
        stats.total_files,
        stats.duplicate_groups,
        stats.singletons
    );

    (groups, stats)
}

/// Bucket records by fingerprint equality. Input must be in path order.
fn bucket_identical(records: Vec<FileRecord>, is_similar: bool) -> Vec<DuplicateGroup> {
    let mut order: Vec<Fingerprint> = Vec::new();
    let mut buckets: HashMap<Fingerprint, Vec<FileRecord>> = HashMap::new();

    for record in records {
        let bucket = buckets.entry(record.fingerprint.clone()).or_default();
        if bucket.is_empty() {
            order.push(record.fingerprint.clone());
        }
        bucket.push(record);
    }

    order
        .into_iter()
        .filter_map(|fp| buckets.remove(&fp))
        .map(|files| DuplicateGroup::new(files, is_similar))
        .collect()
}

/// Connected components of perceptual records under `distance < cutoff`.
fn connect_perceptual(records: Vec<FileRecord>, cutoff: u32) -> Vec<DuplicateGroup> {
    if cutoff == 0 {
        return records
            .into_iter()
            .map(|r| DuplicateGroup::new(vec![r], true))
            .collect();
    }

    // Identical codes collapse into one node before the distance search.
    let nodes = bucket_identical(records, true);
    let codes: Vec<Vec<u8>> = nodes
        .iter()
        .map(|node| match &node.files[0].fingerprint {
            Fingerprint::Perceptual { code } => code.clone(),
            Fingerprint::Exact { digest } => digest.to_vec(),
        })
        .collect();

    let mut nodes: Vec<Option<DuplicateGroup>> = nodes.into_iter().map(Some).collect();
    connected_codes(&codes, cutoff)
        .into_iter()
        .map(|component| {
            let files: Vec<FileRecord> = component
                .into_iter()
                .filter_map(|id| nodes[id].take())
                .flat_map(|node| node.files)
                .collect();
            DuplicateGroup::new(files, true)
        })
        .collect()
}
