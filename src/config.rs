//! Application configuration management.
//!
//! Settings are layered, later layers winning:
//!
//! 1. built-in defaults
//! 2. a TOML file (`--config PATH`, or `config.toml` in the platform
//!    config directory when present)
//! 3. `TREEDUPE_*` environment variables (`TREEDUPE_IO_THREADS=4`,
//!    `TREEDUPE_FILTERS__PDF='["pdftotext - -"]'`)
//! 4. command-line flags
//!
//! ```toml
//! hash_algorithm = "blake3"
//! io_threads = 1
//! child_order = "name"
//! use_trash = false
//!
//! [filters]
//! pdf = ["pdftotext - -"]
//! mp3 = ["id3strip", "head -c 1000000"]
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::{HashingArgs, ScanArgs};
use crate::duplicates::{FilterTable, FinderConfig};
use crate::scanner::{ChildOrder, HashAlgorithm};

/// Prefix of environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "TREEDUPE_";

/// Errors from loading or printing the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer held a value of the wrong shape.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// The effective configuration could not be rendered as TOML.
    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Invalid(Box::new(e))
    }
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Digest algorithm for content hashes.
    pub hash_algorithm: HashAlgorithm,
    /// Threads reading files during leaf hashing.
    pub io_threads: usize,
    /// Directory listing order used for hashing.
    pub child_order: ChildOrder,
    /// Move deleted entries to the trash instead of unlinking them.
    pub use_trash: bool,
    /// Filter commands per extension.
    pub filters: FilterTable,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::default(),
            io_threads: 1,
            child_order: ChildOrder::default(),
            use_trash: false,
            filters: FilterTable::new(),
        }
    }
}

impl Config {
    /// Default platform-specific config file path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "treedupe").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Defaults merged with the TOML file and the environment.
    ///
    /// A missing default file is skipped; a missing explicit file is not
    /// checked here (see [`Config::load`]).
    #[must_use]
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = explicit.map(Path::to_path_buf).or_else(Self::default_path) {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load the file and environment layers.
    ///
    /// # Errors
    ///
    /// Fails if `explicit` names a file that does not exist, or if any
    /// layer holds a value of the wrong type.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
        }
        let config: Self = Self::figment(explicit).extract()?;
        log::debug!("Effective configuration: {config:?}");
        Ok(config)
    }

    /// Apply the hashing flags shared by `scan` and `cat`.
    ///
    /// CLI filters are appended after the configured ones for the same
    /// extension.
    pub fn apply_hashing_args(&mut self, args: &HashingArgs) {
        if let Some(algorithm) = args.hash_algorithm {
            self.hash_algorithm = algorithm.into();
        }
        if let Some(order) = args.child_order {
            self.child_order = order.into();
        }
        for (ext, command) in &args.filters {
            self.filters
                .entry(ext.clone())
                .or_default()
                .push(command.clone());
        }
    }

    /// Apply the `scan` flags on top of the loaded layers.
    pub fn apply_scan_args(&mut self, args: &ScanArgs) {
        self.apply_hashing_args(&args.hashing);
        if let Some(threads) = args.io_threads {
            self.io_threads = threads;
        }
        if args.trash {
            self.use_trash = true;
        }
    }

    /// Finder configuration for these settings.
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_filters(self.filters.clone())
            .with_algorithm(self.hash_algorithm)
            .with_io_threads(self.io_threads)
            .with_child_order(self.child_order)
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
