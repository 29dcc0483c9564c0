//! Run summaries in text and JSON form.
//!
//! Text mode prints one line per action (written by the executor) followed
//! by a closing line such as `Removed 3 files.`. JSON mode prints a single
//! document instead:
//!
//! ```json
//! {
//!   "actions": [
//!     {
//!       "path": "/photos/b.jpg",
//!       "reason": "duplicate",
//!       "peers": ["/photos/a.jpg"],
//!       "mode": "dry_run",
//!       "size": 1024
//!     }
//!   ],
//!   "summary": {
//!     "dry_run": true,
//!     "similarity": { "mode": "exact" },
//!     "roots": [{ "root": "/photos", "stats": { "universe": 2, "...": 0 } }],
//!     "duplicate_groups": 1,
//!     "planned": 1,
//!     "removed": 1,
//!     "reclaimable_bytes": 1024,
//!     "interrupted": false,
//!     "elapsed_ms": 12
//!   }
//! }
//! ```

use std::io::{self, Write};
use std::path::PathBuf;

use bytesize::ByteSize;
use serde::Serialize;

use crate::actions::{PruneMatch, RemovalAction};
use crate::duplicates::Similarity;
use crate::scanner::ScanStats;

/// Scan counters of one root.
#[derive(Debug, Clone, Serialize)]
pub struct RootSummary {
    /// Canonical root path
    pub root: PathBuf,
    /// Counters from the scan
    pub stats: ScanStats,
}

/// Outcome of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Whether nothing was deleted on purpose
    pub dry_run: bool,
    /// Similarity used for matching
    pub similarity: Similarity,
    /// Per-root scan counters
    pub roots: Vec<RootSummary>,
    /// Duplicate groups found (dedup runs only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_groups: Option<usize>,
    /// How A was matched against B (prune runs only)
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub matched_by: Option<PruneMatch>,
    /// Actions in the plan
    pub planned: usize,
    /// Actions completed (reported, for a dry run)
    pub removed: usize,
    /// Bytes the completed actions free
    pub reclaimable_bytes: u64,
    /// Whether the run stopped on a shutdown request
    pub interrupted: bool,
    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// The closing line of a text run.
    #[must_use]
    pub fn closing_line(&self) -> String {
        let noun = if self.removed == 1 { "file" } else { "files" };
        if self.dry_run {
            format!("Would remove {} {}.", self.removed, noun)
        } else {
            format!("Removed {} {}.", self.removed, noun)
        }
    }

    /// Write the human-readable summary.
    ///
    /// # Errors
    ///
    /// Propagates write errors.
    pub fn write_text<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for root in &self.roots {
            writeln!(
                writer,
                "Scanned {}: {} files ({} cached, {} fingerprinted, {} failed)",
                root.root.display(),
                root.stats.universe,
                root.stats.cache_hits,
                root.stats.computed,
                root.stats.failed + root.stats.errors
            )?;
        }
        if let Some(groups) = self.duplicate_groups {
            let kind = match self.similarity {
                Similarity::Exact => "duplicate",
                Similarity::Perceptual { .. } => "similarity",
            };
            writeln!(writer, "Found {} {} groups.", groups, kind)?;
        }
        if self.reclaimable_bytes > 0 {
            let verb = if self.dry_run { "Would free" } else { "Freed" };
            writeln!(writer, "{} {}.", verb, ByteSize::b(self.reclaimable_bytes))?;
        }
        if self.interrupted {
            writeln!(writer, "Interrupted before finishing.")?;
        }
        writeln!(writer, "{}", self.closing_line())
    }
}

/// JSON document for a run.
#[derive(Debug, Serialize)]
pub struct JsonOutput<'a> {
    /// Planned actions
    pub actions: &'a [RemovalAction],
    /// Run summary
    pub summary: &'a RunSummary,
}

impl<'a> JsonOutput<'a> {
    /// Create a JSON output from a plan and summary.
    #[must_use]
    pub fn new(actions: &'a [RemovalAction], summary: &'a RunSummary) -> Self {
        Self { actions, summary }
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty-printed JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writeln!(writer)
    }
}
