//! Deciding which files to remove.
//!
//! Two plans exist:
//!
//! - [`plan_dedup`] works inside one corpus: every duplicate group keeps its
//!   first member (the smallest path) and loses the rest.
//! - [`plan_prune`] works across two corpora: every file of A that has a match
//!   in B is removed from A. B is only read.
//! - [`plan_prune_by_name`] is the same across corpora, but a match is any
//!   file of B with the same file name, whatever its content.
//!
//! When the roots overlap, files that belong to B are never removed, even
//! when they were also scanned as part of A.
//!
//! Plans are plain data. Nothing touches the filesystem until
//! [`execute`](super::delete::execute) runs them.

use std::collections::{BTreeSet, HashMap};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;

use crate::cache::FileRecord;
use crate::duplicates::{CodeIndex, DuplicateGroup, Similarity};
use crate::scanner::Fingerprint;

/// Whether an action is reported or carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Describe the removal, change nothing.
    DryRun,
    /// Delete the file.
    Applied,
}

impl Mode {
    /// Pick the mode from a dry-run flag.
    #[must_use]
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            Self::DryRun
        } else {
            Self::Applied
        }
    }
}

/// Why a file is scheduled for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// Identical to another file of the same corpus.
    Duplicate,
    /// Perceptually similar to another file of the same corpus.
    Similar,
    /// Identical to a file of the comparison corpus.
    PresentInComparison,
    /// Perceptually similar to a file of the comparison corpus.
    SimilarInComparison,
    /// Same file name as a file of the comparison corpus.
    NameInComparison,
}

/// What makes a file of A match a file of B when pruning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneMatch {
    /// Fingerprints, exact or perceptual.
    #[default]
    Content,
    /// File names only.
    Name,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Duplicate => "duplicate of",
            Self::Similar => "similar to",
            Self::PresentInComparison => "also in",
            Self::SimilarInComparison => "similar to",
            Self::NameInComparison => "same name as",
        };
        f.write_str(text)
    }
}

/// One file to remove and the files that justify it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalAction {
    /// File to remove
    pub path: PathBuf,
    /// Why it is removed
    pub reason: RemovalReason,
    /// Matching files that remain (never empty)
    pub peers: Vec<PathBuf>,
    /// Dry run or applied
    pub mode: Mode,
    /// Size recorded at scan time
    pub size: u64,
    /// Modification time recorded at scan time
    #[serde(skip)]
    pub modified: Option<SystemTime>,
}

impl RemovalAction {
    fn new(record: &FileRecord, reason: RemovalReason, peers: Vec<PathBuf>, mode: Mode) -> Self {
        Self {
            path: record.path.clone(),
            reason,
            peers,
            mode,
            size: record.size,
            modified: record.modified,
        }
    }
}

/// Remove every group member except the first.
///
/// Each action lists the other members of its group as peers, keeper first.
#[must_use]
pub fn plan_dedup(groups: &[DuplicateGroup], mode: Mode) -> Vec<RemovalAction> {
    let mut actions = Vec::new();
    for group in groups {
        let Some(keeper) = group.keeper() else {
            continue;
        };
        let reason = if group.is_similar {
            RemovalReason::Similar
        } else {
            RemovalReason::Duplicate
        };

        for record in group.files.iter().skip(1) {
            let mut peers = vec![keeper.path.clone()];
            peers.extend(
                group
                    .files
                    .iter()
                    .skip(1)
                    .filter(|f| f.path != record.path)
                    .map(|f| f.path.clone()),
            );
            actions.push(RemovalAction::new(record, reason, peers, mode));
        }
    }

    log::debug!("Dedup plan: {} removals", actions.len());
    actions
}

/// Lookup over the comparison corpus.
struct ComparisonIndex<'a> {
    by_fingerprint: HashMap<&'a Fingerprint, Vec<&'a PathBuf>>,
    codes: Vec<Vec<u8>>,
    code_paths: Vec<Vec<&'a PathBuf>>,
    index: Option<CodeIndex>,
}

impl<'a> ComparisonIndex<'a> {
    fn new(corpus: &'a [FileRecord], similarity: Similarity) -> Self {
        let mut by_fingerprint: HashMap<&Fingerprint, Vec<&PathBuf>> = HashMap::new();
        for record in corpus {
            by_fingerprint
                .entry(&record.fingerprint)
                .or_default()
                .push(&record.path);
        }

        let mut codes = Vec::new();
        let mut code_paths = Vec::new();
        let index = match similarity {
            Similarity::Exact => None,
            Similarity::Perceptual { .. } => {
                for (fingerprint, paths) in &by_fingerprint {
                    if let Fingerprint::Perceptual { code } = fingerprint {
                        codes.push(code.clone());
                        code_paths.push(paths.clone());
                    }
                }
                Some(CodeIndex::new(&codes))
            }
        };

        Self {
            by_fingerprint,
            codes,
            code_paths,
            index,
        }
    }

    /// Paths in the comparison corpus matching a fingerprint, and whether the
    /// match is by similarity rather than identity.
    fn matches(&self, fingerprint: &Fingerprint, similarity: Similarity) -> (Vec<&'a PathBuf>, bool) {
        match (similarity, fingerprint, &self.index) {
            (Similarity::Perceptual { cutoff }, Fingerprint::Perceptual { code }, Some(index)) => {
                let mut paths = Vec::new();
                let mut similar = false;
                for id in index.within(code, cutoff) {
                    if self.codes[id] != *code {
                        similar = true;
                    }
                    paths.extend(self.code_paths[id].iter().copied());
                }
                (paths, similar)
            }
            _ => (
                self.by_fingerprint
                    .get(fingerprint)
                    .cloned()
                    .unwrap_or_default(),
                false,
            ),
        }
    }
}

/// Remove every file of `corpus_a` that has a match in `corpus_b`.
///
/// Files that are themselves part of `corpus_b` (nested or identical roots)
/// are never removed, so a path is never matched with itself.
#[must_use]
pub fn plan_prune(
    corpus_a: &[FileRecord],
    corpus_b: &[FileRecord],
    similarity: Similarity,
    mode: Mode,
) -> Vec<RemovalAction> {
    let index = ComparisonIndex::new(corpus_b, similarity);

    let actions = prune_with(corpus_a, corpus_b, mode, |record| {
        let (candidates, similar) = index.matches(&record.fingerprint, similarity);
        let reason = if similar {
            RemovalReason::SimilarInComparison
        } else {
            RemovalReason::PresentInComparison
        };
        (candidates.into_iter().cloned().collect(), reason)
    });

    log::debug!(
        "Prune plan: {} of {} files have a match in the comparison corpus",
        actions.len(),
        corpus_a.len()
    );
    actions
}

/// Remove every file of `corpus_a` whose file name occurs in `corpus_b`.
///
/// Names are compared exactly. Content is not looked at, so this is only as
/// safe as the naming scheme of the two trees.
#[must_use]
pub fn plan_prune_by_name(
    corpus_a: &[FileRecord],
    corpus_b: &[FileRecord],
    mode: Mode,
) -> Vec<RemovalAction> {
    let mut by_name: HashMap<&OsStr, Vec<&PathBuf>> = HashMap::new();
    for record in corpus_b {
        if let Some(name) = record.path.file_name() {
            by_name.entry(name).or_default().push(&record.path);
        }
    }

    let actions = prune_with(corpus_a, corpus_b, mode, |record| {
        let peers: Vec<PathBuf> = record
            .path
            .file_name()
            .and_then(|name| by_name.get(name))
            .map(|paths| paths.iter().map(|p| (*p).clone()).collect())
            .unwrap_or_default();
        (peers, RemovalReason::NameInComparison)
    });

    log::debug!(
        "Name prune plan: {} of {} files share a name with the comparison corpus",
        actions.len(),
        corpus_a.len()
    );
    actions
}

/// Walk A in path order, skipping files that belong to B, and turn every
/// record with at least one peer into an action.
fn prune_with<F>(
    corpus_a: &[FileRecord],
    corpus_b: &[FileRecord],
    mode: Mode,
    mut peers_of: F,
) -> Vec<RemovalAction>
where
    F: FnMut(&FileRecord) -> (Vec<PathBuf>, RemovalReason),
{
    let protected: BTreeSet<&Path> = corpus_b.iter().map(|r| r.path.as_path()).collect();

    let mut ordered: Vec<&FileRecord> = corpus_a.iter().collect();
    ordered.sort_by(|a, b| a.path.cmp(&b.path));

    let mut actions = Vec::new();
    for record in ordered {
        if protected.contains(record.path.as_path()) {
            log::trace!("Keeping {}: it belongs to the comparison corpus", record.path.display());
            continue;
        }
        let (mut peers, reason) = peers_of(record);
        if peers.is_empty() {
            continue;
        }
        peers.sort();
        peers.dedup();
        actions.push(RemovalAction::new(record, reason, peers, mode));
    }
    actions
}
