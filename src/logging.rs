//! Logging setup.
//!
//! dupfind logs through the `log` facade with an `env_logger` backend. The
//! level comes from, in priority order:
//!
//! 1. the `RUST_LOG` environment variable
//! 2. `--quiet` (errors only) or `-v`/`-vv` (debug/trace)
//! 3. info
//!
//! Debug builds prefix each line with a timestamp (and the module path once
//! verbose); release builds print level and message only.

use env_logger::Builder;
use log::LevelFilter;
use std::io::Write;

/// Initialize logging from the CLI verbosity flags.
///
/// Calling this more than once is harmless: later calls are ignored.
///
/// # Example
///
/// ```rust,no_run
/// use dupfind::logging::init_logging;
///
/// init_logging(1, false);
/// log::debug!("visible with -v");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) {
    let from_env = std::env::var_os("RUST_LOG").is_some();

    let mut builder = Builder::new();
    if from_env {
        builder.parse_default_env();
    } else {
        builder.filter_level(level_for(verbose, quiet));
    }
    configure_format(&mut builder, verbose);

    if builder.try_init().is_ok() {
        log::debug!(
            "Logging initialized at {} ({})",
            log::max_level(),
            if from_env { "RUST_LOG" } else { "flags" }
        );
    }
}

/// Log level for the given CLI flags; quiet wins over verbose.
#[must_use]
pub fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => LevelFilter::Info,
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

#[cfg(debug_assertions)]
fn configure_format(builder: &mut Builder, verbose: u8) {
    builder.format(move |buf, record| {
        let timestamp = buf.timestamp_seconds();
        let level = record.level();
        let style = buf.default_level_style(level);
        if verbose >= 1 {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] {}",
                timestamp,
                level,
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} {}",
                timestamp,
                level,
                record.args()
            )
        }
    });
}

#[cfg(not(debug_assertions))]
fn configure_format(builder: &mut Builder, _verbose: u8) {
    builder.format(|buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
    });
}
