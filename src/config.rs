//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. built-in defaults
//! 2. `config.toml` in the platform config directory, or the file given with
//!    `--config`
//! 3. `DUPFIND_*` environment variables
//! 4. command-line flags
//!
//! ```toml
//! worker_threads = 4
//! excluded_names = ["node_modules"]
//! ignore_patterns = ["*.tmp"]
//! algorithm = "dhash"
//! revalidate = true
//! use_trash = true
//! ```

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::pool::default_worker_count;
use crate::scanner::PerceptualAlgorithm;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "DUPFIND_";

/// Errors that can occur while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// The merged configuration is invalid.
    #[error("Invalid configuration ({origin}): {source}")]
    Invalid {
        /// Where the configuration came from
        origin: String,
        /// The underlying figment error
        #[source]
        source: Box<figment::Error>,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Worker threads for fingerprinting; 0 picks CPUs - 1.
    pub worker_threads: usize,
    /// Names excluded on top of the built-in set.
    pub excluded_names: Vec<String>,
    /// Gitignore-style patterns excluded from scans.
    pub ignore_patterns: Vec<String>,
    /// Perceptual hash algorithm for images.
    pub algorithm: PerceptualAlgorithm,
    /// Re-fingerprint cached files whose size or mtime changed.
    pub revalidate: bool,
    /// Move removed files to the trash instead of deleting them.
    pub use_trash: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            excluded_names: Vec::new(),
            ignore_patterns: Vec::new(),
            algorithm: PerceptualAlgorithm::default(),
            revalidate: false,
            use_trash: false,
        }
    }
}

impl Config {
    /// Load configuration from defaults, a config file and the environment.
    ///
    /// With `explicit` set, that file must exist and replaces the default
    /// location. A missing default file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit file is missing or the merged
    /// configuration cannot be parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path(),
        };

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = &file {
            log::debug!("Reading configuration from {}", file.display());
            figment = figment.merge(Toml::file(file));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        figment.extract().map_err(|e| ConfigError::Invalid {
            origin: file.map_or_else(
                || "environment".to_string(),
                |f| f.display().to_string(),
            ),
            source: Box::new(e),
        })
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "dupfind", "dupfind")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply command-line flags on top of the loaded configuration.
    #[must_use]
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if let Some(threads) = cli.threads {
            self.worker_threads = threads;
        }
        if let Some(algorithm) = cli.algorithm {
            self.algorithm = algorithm.into();
        }
        if cli.revalidate {
            self.revalidate = true;
        }
        if cli.trash {
            self.use_trash = true;
        }
        self
    }

    /// Worker count to use, resolving 0 to the default.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.worker_threads == 0 {
            default_worker_count()
        } else {
            self.worker_threads
        }
    }
}
