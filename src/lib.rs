//! dupfind - incremental duplicate and near-duplicate file remover
//!
//! dupfind fingerprints every file under a directory (BLAKE3 digests, or
//! perceptual hashes for images), keeps the fingerprints in a cache file at
//! the root so later runs only fingerprint new files, and then removes either
//! the duplicates within one tree or the files of one tree that also exist in
//! another.
//!
//! The pipeline, leaves first:
//!
//! - [`scanner`]: enumerate candidate paths and fingerprint them in parallel
//! - [`cache`]: the per-root fingerprint cache
//! - [`duplicates`]: exact and perceptual grouping
//! - [`actions`]: removal planning and execution
//!
//! [`run_app`] ties them together for the command-line binary.

pub mod actions;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod pool;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::actions::{
    execute, plan_dedup, plan_prune, plan_prune_by_name, ExecuteConfig, Mode, PruneMatch,
    RemovalError,
};
use crate::cache::FileRecord;
use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::duplicates::{group, Similarity};
use crate::error::{AppError, ExitCode};
use crate::output::{JsonOutput, RootSummary, RunSummary};
use crate::progress::{Progress, ProgressCallback, PHASE_GROUPING};
use crate::scanner::{
    overlapping_paths, resolve_root, CorpusScanner, ScanStats, WalkerConfig,
};
use crate::signal::{install_handler, ShutdownHandler};

/// Run the command-line application.
///
/// Sets up logging, configuration and the Ctrl+C handler, then runs the scan
/// and removal with output on stdout.
///
/// # Errors
///
/// Returns an error for invalid configuration, a missing root, a failed
/// removal or an interruption. [`error::exit_code_for`] maps it to the exit
/// code.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let config = Config::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_cli_overrides(&cli);
    log::debug!("Effective configuration: {:?}", config);

    let handler = install_handler().context("Failed to install Ctrl+C handler")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&cli, &config, &handler, &mut out)
}

/// Scan, plan and execute one run, writing the report to `out`.
///
/// # Errors
///
/// See [`run_app`].
pub fn run<W: Write>(
    cli: &Cli,
    config: &Config,
    handler: &ShutdownHandler,
    out: &mut W,
) -> Result<ExitCode> {
    let started = Instant::now();
    let json = cli.output == OutputFormat::Json;
    let progress: Arc<dyn ProgressCallback> = Arc::new(Progress::new(cli.quiet || json));

    let walker_config = WalkerConfig::default()
        .with_excluded_names(config.excluded_names.iter().cloned())
        .with_ignore_patterns(config.ignore_patterns.clone());
    let similarity = cli
        .cutoff
        .map_or(Similarity::Exact, |cutoff| Similarity::Perceptual { cutoff });
    let mode = Mode::from_dry_run(cli.dry_run);
    let prune_match = cli.match_by.map(PruneMatch::from).unwrap_or_default();

    let scan = |root: &Path| -> Result<(Vec<FileRecord>, RootSummary)> {
        let (records, stats) = CorpusScanner::new(root)
            .with_walker_config(walker_config.clone())
            .with_workers(config.effective_workers())
            .with_algorithm(config.algorithm)
            .with_revalidate(config.revalidate)
            .with_shutdown_flag(handler.flag())
            .with_progress(Arc::clone(&progress))
            .hash_files()
            .with_context(|| format!("Failed to scan {}", root.display()))?;
        log_scan(root, &stats);
        let root = resolve_root(root)?;
        Ok((records, RootSummary { root, stats }))
    };

    let (records_a, summary_a) = scan(&cli.dir_a)?;
    let mut roots = vec![summary_a];
    let records_b = match &cli.dir_b {
        Some(dir_b) => {
            let (records, summary) = scan(dir_b)?;
            roots.push(summary);
            Some(records)
        }
        None => None,
    };
    let scan_interrupted = roots.iter().any(|r| r.stats.interrupted);

    let mut duplicate_groups = None;
    let mut matched_by = None;
    let actions = if scan_interrupted {
        log::warn!("Scan interrupted, nothing will be removed");
        Vec::new()
    } else if let Some(records_b) = records_b {
        let shared = overlapping_paths(&records_a, &records_b);
        if !shared.is_empty() {
            log::warn!(
                "{} files are under both roots; they belong to the comparison corpus and are kept",
                shared.len()
            );
        }
        matched_by = Some(prune_match);
        match prune_match {
            PruneMatch::Content => plan_prune(&records_a, &records_b, similarity, mode),
            PruneMatch::Name => {
                if cli.cutoff.is_some() {
                    log::warn!("--cutoff has no effect when matching by name");
                }
                plan_prune_by_name(&records_a, &records_b, mode)
            }
        }
    } else {
        progress.on_phase_start(PHASE_GROUPING, records_a.len());
        let (groups, stats) = group(records_a, similarity);
        progress.on_phase_end(PHASE_GROUPING);
        log::info!(
            "{} duplicate groups over {} files ({} singletons)",
            stats.duplicate_groups,
            stats.total_files,
            stats.singletons
        );
        duplicate_groups = Some(stats.duplicate_groups);
        plan_dedup(&groups, mode)
    };

    let execute_config = ExecuteConfig::new(config.use_trash).with_shutdown_flag(handler.flag());
    let outcome = if json {
        execute(&actions, &execute_config, &mut io::sink(), Some(progress.as_ref()))
    } else {
        execute(&actions, &execute_config, &mut *out, Some(progress.as_ref()))
    };
    let removed = match &outcome {
        Ok(count) => *count,
        Err(err) => err.completed,
    };

    let summary = RunSummary {
        dry_run: cli.dry_run,
        similarity,
        roots,
        duplicate_groups,
        matched_by,
        planned: actions.len(),
        removed,
        reclaimable_bytes: actions.iter().take(removed).map(|a| a.size).sum(),
        interrupted: scan_interrupted || outcome.as_ref().is_err_and(RemovalError::is_interrupted),
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
    };
    let written = if json {
        JsonOutput::new(&actions, &summary).write_to(out)
    } else {
        summary.write_text(out)
    };

    if scan_interrupted {
        return Err(AppError::Interrupted { completed: 0 }.into());
    }
    // A removal failure outranks a failed summary write.
    match outcome {
        Ok(_) => {
            written.context("Failed to write output")?;
            Ok(ExitCode::Success)
        }
        Err(err) if err.is_interrupted() => Err(AppError::Interrupted {
            completed: err.completed,
        }
        .into()),
        Err(err) if err.completed == 0 => {
            Err(anyhow::Error::new(err.source).context("Removal failed"))
        }
        Err(err) => Err(AppError::PartialRemoval {
            completed: err.completed,
            reason: err.source.to_string(),
        }
        .into()),
    }
}

fn log_scan(root: &Path, stats: &ScanStats) {
    log::info!(
        "Scanned {}: {} files, {} cached, {} fingerprinted, {} failed",
        root.display(),
        stats.universe,
        stats.cache_hits,
        stats.computed,
        stats.failed + stats.errors
    );
    if !stats.persisted {
        log::warn!("Fingerprint cache for {} was not saved", root.display());
    }
}
