//! Progress reporting utilities using indicatif.
//!
//! The pipeline reports through the [`ProgressCallback`] trait; [`Progress`]
//! renders it as terminal progress bars. Reporting is purely observational:
//! nothing in the pipeline depends on what a callback does.
//!
//! Phases are reported by name:
//! - `hashing <root>`: fingerprinting the pending paths of one root
//! - `grouping`: partitioning records into duplicate groups
//! - `removing`: executing the removal plan

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Phase name prefix used while fingerprinting a root.
pub const PHASE_HASHING: &str = "hashing";
/// Phase name used while grouping.
pub const PHASE_GROUPING: &str = "grouping";
/// Phase name used while removing files.
pub const PHASE_REMOVING: &str = "removing";

/// Build the phase name for fingerprinting one root.
#[must_use]
pub fn hashing_phase(root: &std::path::Path) -> String {
    format!("{} {}", PHASE_HASHING, root.display())
}

/// Progress callback for the scan, grouping and removal phases.
///
/// Implementations must be cheap and thread-safe: `on_progress` and
/// `on_item_completed` are called from worker threads.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (e.g., "grouping")
    /// * `total` - Total number of items to process
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Number of items done so far (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when an item has been processed, providing its size.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Called to show a free-form status message.
    fn on_message(&self, _message: &str) {}
}

/// Progress reporter using indicatif.
///
/// Phases run one after another, so a single bar is active at a time.
pub struct Progress {
    multi: MultiProgress,
    active: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("quiet", &self.quiet)
            .finish_non_exhaustive()
    }
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use dupfind::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            active: Mutex::new(None),
            quiet,
        }
    }

    fn active(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = if phase == PHASE_GROUPING {
            let pb = self.multi.add(ProgressBar::new_spinner());
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = self.multi.add(ProgressBar::new(total as u64));
            pb.set_style(Self::bar_style());
            pb
        };
        pb.set_message(phase.to_string());

        if let Some(previous) = self.active().replace(pb) {
            previous.finish_and_clear();
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *self.active() {
            pb.set_position(current as u64);
            pb.set_message(truncate_path(path, 40));
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        if let Some(pb) = self.active().take() {
            pb.finish_with_message(format!("{} complete", phase));
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *self.active() {
            pb.set_message(message.to_string());
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len + 4 > max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{}", tail);
    }

    format!(".../{}", file_name)
}
