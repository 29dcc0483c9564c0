//! Executing a removal plan.
//!
//! # Overview
//!
//! [`execute`] walks a list of [`RemovalAction`]s in order:
//! - dry-run actions write one report line and touch nothing
//! - applied actions are verified, then deleted permanently or moved to the
//!   system trash
//!
//! # Safety
//!
//! Before a file is deleted it must still have the size and mtime recorded
//! at scan time, and at least one of its peers must still exist. The first
//! failure stops the run; files already removed stay removed.
//!
//! # Example
//!
//! ```no_run
//! use dupfind::actions::{execute, ExecuteConfig};
//!
//! let mut report = std::io::stdout();
//! let removed = execute(&[], &ExecuteConfig::default(), &mut report, None).unwrap();
//! assert_eq!(removed, 0);
//! ```

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;

use super::plan::{Mode, RemovalAction};
use crate::progress::{ProgressCallback, PHASE_REMOVING};

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File was modified since scan.
    #[error("file modified since scan: {0}")]
    Modified(PathBuf),

    /// None of the matching files exist any more.
    #[error("no remaining copy of {0} exists, refusing to delete it")]
    NoRemainingPeer(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// Permanent delete operation failed.
    #[error("permanent delete failed for {path}: {message}")]
    PermanentDeleteFailed { path: PathBuf, message: String },

    /// Shutdown was requested before this file was processed.
    #[error("interrupted before {0}")]
    Interrupted(PathBuf),

    /// The report could not be written.
    #[error("failed to write report: {0}")]
    Report(#[source] io::Error),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Modified(p)
            | Self::NoRemainingPeer(p)
            | Self::Interrupted(p)
            | Self::TrashFailed { path: p, .. }
            | Self::PermanentDeleteFailed { path: p, .. }
            | Self::Io { path: p, .. } => Some(p),
            Self::Report(_) => None,
        }
    }

    fn from_io(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// A removal run that stopped before finishing.
#[derive(Debug, Error)]
#[error("removal stopped after {completed} file(s): {source}")]
pub struct RemovalError {
    /// Actions completed before the failure
    pub completed: usize,
    /// What went wrong
    #[source]
    pub source: DeleteError,
}

impl RemovalError {
    /// Whether the run stopped because of a shutdown request.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self.source, DeleteError::Interrupted(_))
    }
}

/// Configuration for executing a plan.
#[derive(Debug, Clone, Default)]
pub struct ExecuteConfig {
    /// Move files to the system trash instead of deleting them.
    pub use_trash: bool,
    /// Stop between actions once raised.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
}

impl ExecuteConfig {
    /// Create config for trash or permanent deletion.
    #[must_use]
    pub fn new(use_trash: bool) -> Self {
        Self {
            use_trash,
            shutdown_flag: None,
        }
    }

    /// Stop between actions when the flag is raised.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// File metadata snapshot taken at scan time.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    /// Path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time.
    pub mtime: Option<SystemTime>,
}

impl FileSnapshot {
    /// Create a snapshot of a file's current state.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist or can't be accessed.
    pub fn capture(path: &Path) -> Result<Self, DeleteError> {
        let metadata = fs::metadata(path).map_err(|e| DeleteError::from_io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            mtime: metadata.modified().ok(),
        })
    }

    /// The state recorded for an action at scan time.
    #[must_use]
    pub fn recorded(action: &RemovalAction) -> Self {
        Self {
            path: action.path.clone(),
            size: action.size,
            mtime: action.modified,
        }
    }

    /// Verify that the file still matches this snapshot.
    ///
    /// # Errors
    ///
    /// Returns error if file was modified, deleted, or can't be accessed.
    pub fn verify(&self) -> Result<(), DeleteError> {
        let current = Self::capture(&self.path)?;

        if let (Some(orig), Some(curr)) = (self.mtime, current.mtime) {
            if orig != curr {
                log::warn!(
                    "File modified since scan: {} (mtime changed)",
                    self.path.display()
                );
                return Err(DeleteError::Modified(self.path.clone()));
            }
        }

        if self.size != current.size {
            log::warn!(
                "File modified since scan: {} (size changed from {} to {})",
                self.path.display(),
                self.size,
                current.size
            );
            return Err(DeleteError::Modified(self.path.clone()));
        }

        Ok(())
    }
}

/// Move a single file to the system trash.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `TrashFailed` if the trash operation fails
pub fn delete_to_trash(path: &Path) -> Result<(), DeleteError> {
    if !path.exists() {
        return Err(DeleteError::NotFound(path.to_path_buf()));
    }

    trash::delete(path).map_err(|e| {
        log::error!("Trash operation failed for {}: {}", path.display(), e);
        DeleteError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::debug!("Moved to trash: {}", path.display());
    Ok(())
}

/// Permanently delete a single file.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if deletion is not allowed
/// - `PermanentDeleteFailed` if the delete operation fails
pub fn permanent_delete(path: &Path) -> Result<(), DeleteError> {
    fs::remove_file(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            DeleteError::from_io(path, e)
        }
        _ => {
            log::error!("Permanent delete failed for {}: {}", path.display(), e);
            DeleteError::PermanentDeleteFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        }
    })?;

    log::debug!("Permanently deleted: {}", path.display());
    Ok(())
}

/// Check that at least one peer of an action still exists.
///
/// # Errors
///
/// `NoRemainingPeer` if every peer is gone.
pub fn verify_peers(action: &RemovalAction) -> Result<(), DeleteError> {
    if action.peers.iter().any(|p| p != &action.path && p.exists()) {
        Ok(())
    } else {
        Err(DeleteError::NoRemainingPeer(action.path.clone()))
    }
}

fn report_line(action: &RemovalAction) -> String {
    let peers: Vec<String> = action
        .peers
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    let verb = match action.mode {
        Mode::DryRun => "Would remove",
        Mode::Applied => "Removed",
    };
    format!(
        "{} {} ({} {})",
        verb,
        action.path.display(),
        action.reason,
        peers.join(", ")
    )
}

fn apply(action: &RemovalAction, config: &ExecuteConfig) -> Result<(), DeleteError> {
    FileSnapshot::recorded(action).verify()?;
    verify_peers(action)?;
    if config.use_trash {
        delete_to_trash(&action.path)
    } else {
        permanent_delete(&action.path)
    }
}

/// Run a plan in order, stopping at the first failure.
///
/// Returns the number of actions completed. Dry-run actions count as
/// completed once reported.
///
/// # Errors
///
/// [`RemovalError`] carrying the number of actions completed before the
/// failure or the shutdown request. Completed deletions are not rolled back.
pub fn execute<W: Write>(
    actions: &[RemovalAction],
    config: &ExecuteConfig,
    report: &mut W,
    progress: Option<&dyn ProgressCallback>,
) -> Result<usize, RemovalError> {
    if let Some(progress) = progress {
        progress.on_phase_start(PHASE_REMOVING, actions.len());
    }

    let mut completed = 0;
    let result = actions.iter().try_for_each(|action| {
        if config.is_shutdown_requested() {
            log::info!("Shutdown requested, stopping after {} removals", completed);
            return Err(DeleteError::Interrupted(action.path.clone()));
        }

        if action.mode == Mode::Applied {
            apply(action, config)?;
        }

        // Counted before reporting: a deleted file stays deleted even if
        // the report cannot be written.
        completed += 1;
        if let Some(progress) = progress {
            progress.on_progress(completed, &action.path.to_string_lossy());
            progress.on_item_completed(action.size);
        }
        writeln!(report, "{}", report_line(action)).map_err(DeleteError::Report)
    });

    if let Some(progress) = progress {
        progress.on_phase_end(PHASE_REMOVING);
    }

    match result {
        Ok(()) => Ok(completed),
        Err(source) => {
            log::error!("Removal stopped after {} file(s): {}", completed, source);
            Err(RemovalError { completed, source })
        }
    }
}
