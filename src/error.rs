//! Error types for pastry
//!
//! Every failure surfaces to the immediate caller. Nothing in the evaluation
//! pipeline retries: a broken fold or a failed write ends the run.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Pastry error types
#[derive(Error, Debug)]
pub enum Error {
    /// Experiment was built with conflicting or missing options
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Repository has uncommitted changes and the run was not forced
    #[error(
        "Repository has uncommitted changes.\n\
         Commit your changes and run again, or force the run.\n\
         Forced runs are recorded with a dirty revision: the stored commit \
         no longer identifies the code and data that produced the results."
    )]
    DirtyState,

    /// Fitting or scoring failed inside a fold; the whole evaluation is aborted
    #[error("Fold {fold} failed: {source}")]
    FoldExecution {
        /// Index of the failing fold
        fold: usize,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Result record could not be written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Stored result record could not be read back
    #[error("Corrupt result record {}: {reason}\nFix or remove the file before listing results.", path.display())]
    CorruptRecord {
        /// Offending file
        path: PathBuf,
        /// Parse or read failure
        reason: String,
    },

    /// Invalid input data or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet encoding error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap a failure raised while evaluating `fold`.
    #[must_use]
    pub fn in_fold(fold: usize, source: Self) -> Self {
        Self::FoldExecution {
            fold,
            source: Box::new(source),
        }
    }
}
