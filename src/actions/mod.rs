//! File actions module.
//!
//! This module provides functionality for:
//! - Planning removals from duplicate groups or against a comparison corpus
//! - Executing plans as a dry-run report or real deletions
//!
//! # Deletion
//!
//! Deletion is permanent by default and can go to the system trash instead.
//! Every deletion is preceded by a check that the file is unchanged since the
//! scan and that one of its matches is still present.
//!
//! ```no_run
//! use dupfind::actions::{execute, plan_dedup, ExecuteConfig, Mode};
//! use dupfind::duplicates::{group, Similarity};
//!
//! let (groups, _) = group(Vec::new(), Similarity::Exact);
//! let actions = plan_dedup(&groups, Mode::DryRun);
//! let removed = execute(&actions, &ExecuteConfig::default(), &mut std::io::stdout(), None);
//! ```

pub mod delete;
pub mod plan;

pub use delete::{
    delete_to_trash, execute, permanent_delete, verify_peers, DeleteError, ExecuteConfig,
    FileSnapshot, RemovalError,
};
pub use plan::{
    plan_dedup, plan_prune, plan_prune_by_name, Mode, PruneMatch, RemovalAction, RemovalReason,
};
