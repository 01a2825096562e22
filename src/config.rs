//! Project configuration (`pastry.toml`)
//!
//! Every key is optional; a missing file means all defaults.
//!
//! ```toml
//! results_dir = "results"
//! cache_path = ".pastry/display.txt"
//! max_workers = 4
//! max_param_bytes = 1000
//! display_limit = 10
//! ```

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "pastry.toml";

/// Hyperparameters whose JSON encoding exceeds this many bytes are dropped
pub const DEFAULT_MAX_PARAM_BYTES: usize = 1000;

/// Rows printed when neither the command line nor the config sets a limit
pub const DEFAULT_DISPLAY_LIMIT: usize = 5;

/// Pastry project configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PastryConfig {
    /// Directory holding one JSON record per run
    pub results_dir: PathBuf,
    /// Pre-rendered results table used by the fast display path
    pub cache_path: PathBuf,
    /// Worker threads for fold evaluation; `None` uses rayon's global pool
    pub max_workers: Option<usize>,
    /// Size cap for recorded hyperparameter values
    pub max_param_bytes: usize,
    /// Default number of rows printed
    pub display_limit: Option<usize>,
}

impl Default for PastryConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            cache_path: PathBuf::from(".pastry/display.txt"),
            max_workers: None,
            max_param_bytes: DEFAULT_MAX_PARAM_BYTES,
            display_limit: Some(DEFAULT_DISPLAY_LIMIT),
        }
    }
}

impl PastryConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    /// Returns `Config` on syntax errors, unknown keys, or `max_workers = 0`.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        if config.max_workers == Some(0) {
            return Err(Error::Config("max_workers must be at least 1".to_string()));
        }
        Ok(config)
    }

    /// Load from `path`, falling back to defaults if the file does not exist.
    ///
    /// # Errors
    /// Returns `Config` if the file exists but cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::Config(format!("Failed to read {}: {e}", path.display()))),
        }
    }
}
