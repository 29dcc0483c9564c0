//! Command-line interface definitions for dupfind.
//!
//! The CLI is a single command. `--dir-a` is the corpus to clean. Without
//! `--dir-b` duplicates inside it are removed, keeping one copy; with
//! `--dir-b` every file of A that also exists in B is removed from A.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates inside one directory without touching anything
//! dupfind --dir-a ~/Pictures --dry-run
//!
//! # Remove images from an import folder that are already in the library
//! dupfind --dir-a ~/Import --dir-b ~/Pictures --cutoff 10
//!
//! # Remove files whose name already appears somewhere in the archive
//! dupfind --dir-a ~/Export --dir-b ~/Archive --match name --dry-run
//!
//! # Verbose mode for debugging
//! dupfind -v --dir-a ~/Downloads --dry-run
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::actions::PruneMatch;
use crate::scanner::PerceptualAlgorithm;

/// Find and remove duplicate and near-duplicate files.
///
/// Files are fingerprinted with BLAKE3, images with a perceptual hash, and
/// fingerprints are cached per directory so repeated runs only look at new
/// files.
#[derive(Debug, Parser)]
#[command(name = "dupfind")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory to remove files from
    #[arg(long = "dir-a", value_name = "DIR")]
    pub dir_a: PathBuf,

    /// Directory to compare against (never modified)
    #[arg(long = "dir-b", value_name = "DIR")]
    pub dir_b: Option<PathBuf>,

    /// Report what would be removed without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Group images whose perceptual distance is below N (enables perceptual mode)
    #[arg(long, value_name = "N")]
    pub cutoff: Option<u32>,

    /// How files of A are matched against B: by content or by file name
    #[arg(long = "match", value_enum, value_name = "BY", requires = "dir_b")]
    pub match_by: Option<MatchArg>,

    /// Perceptual hash algorithm for images
    #[arg(long, value_enum)]
    pub algorithm: Option<AlgorithmArg>,

    /// Number of worker threads for fingerprinting (default: CPUs - 1)
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Move files to the system trash instead of deleting them
    #[arg(long)]
    pub trash: bool,

    /// Re-fingerprint cached files whose size or mtime changed
    #[arg(long)]
    pub revalidate: bool,

    /// Output format for the plan and summary
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,

    /// Configuration file to use instead of the default location
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as JSON
    #[arg(long)]
    pub json_errors: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per action plus a summary
    #[default]
    Text,
    /// Plan and summary as a JSON document
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Perceptual hash algorithm choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlgorithmArg {
    /// DCT based, most resilient
    Phash,
    /// Gradient based, fast
    Dhash,
    /// Mean based, fastest
    Ahash,
}

impl From<AlgorithmArg> for PerceptualAlgorithm {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Phash => Self::Phash,
            AlgorithmArg::Dhash => Self::Dhash,
            AlgorithmArg::Ahash => Self::Ahash,
        }
    }
}

/// Matching choices for `--match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MatchArg {
    /// Exact digests or perceptual codes
    Content,
    /// File names, regardless of content
    Name,
}

impl From<MatchArg> for PruneMatch {
    fn from(arg: MatchArg) -> Self {
        match arg {
            MatchArg::Content => Self::Content,
            MatchArg::Name => Self::Name,
        }
    }
}
