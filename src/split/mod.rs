//! Fold splitting: cross-validators and the held-out partition
//!
//! A [`CrossValidator`] turns `n_samples` rows (plus labels and optional group
//! keys) into train/test index pairs. [`FoldSplitter`] picks between a
//! cross-validator and the single predefined held-out split, and checks
//! that explicit groups never leak across a fold boundary.

mod group;
mod kfold;
mod shuffle;

pub use group::{GroupKFold, GroupShuffleSplit};
pub use kfold::{KFold, StratifiedKFold};
pub use shuffle::{ShuffleSplit, StratifiedShuffleSplit};

use crate::{Error, Result};
use arrow::array::ArrayRef;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::fmt;

/// One train/test partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Position of this fold in the split sequence
    pub index: usize,
    /// Row indices used for fitting
    pub train: Vec<usize>,
    /// Row indices used for scoring
    pub test: Vec<usize>,
}

impl Fold {
    /// Create a fold.
    #[must_use]
    pub const fn new(index: usize, train: Vec<usize>, test: Vec<usize>) -> Self {
        Self { index, train, test }
    }
}

/// Cross-validation protocol.
///
/// Implementations must be deterministic for a fixed seed and must cover
/// only indices in `0..n_samples`.
pub trait CrossValidator: Send + Sync + fmt::Debug {
    /// Produce the folds for `n_samples` rows.
    ///
    /// `y` is the label column (used by stratified splitters) and `groups`
    /// holds one key per row when grouping is active.
    ///
    /// # Errors
    /// Returns `InvalidInput` if the protocol cannot be applied to the data.
    fn split(&self, n_samples: usize, y: &ArrayRef, groups: Option<&[String]>)
        -> Result<Vec<Fold>>;

    /// Number of folds this protocol produces.
    fn n_splits(&self) -> usize;

    /// Short protocol name for logs and error messages.
    fn name(&self) -> &'static str;
}

/// How instances are grouped for splitting and scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grouping {
    /// Every fold is scored as a whole
    None,
    /// Keys read from the experiment's group column
    Column(Vec<String>),
    /// One synthetic group per instance
    PerInstance(Vec<String>),
}

impl Grouping {
    /// Synthesize one group per row, keyed by row index.
    #[must_use]
    pub fn per_instance(n_samples: usize) -> Self {
        Self::PerInstance((0..n_samples).map(|i| i.to_string()).collect())
    }

    /// Group keys, if any.
    #[must_use]
    pub fn keys(&self) -> Option<&[String]> {
        match self {
            Self::None => None,
            Self::Column(keys) | Self::PerInstance(keys) => Some(keys),
        }
    }
}

/// Resolved fold source for an experiment.
#[derive(Debug, Clone, Copy)]
pub enum FoldSplitter<'a> {
    /// Delegate to a cross-validation protocol
    CrossValidation(&'a dyn CrossValidator),
    /// Single predefined split: the first `train_rows` rows train, the rest test
    HeldOut {
        /// Rows originating from the dataset (the remainder come from the test set)
        train_rows: usize,
    },
}

impl FoldSplitter<'_> {
    /// Produce folds for the design rows.
    ///
    /// # Errors
    /// - Propagates cross-validator failures
    /// - `InvalidInput` if no folds are produced or a fold has an empty side
    /// - `Configuration` if an explicit group appears on both sides of a fold
    pub fn split(&self, n_samples: usize, y: &ArrayRef, grouping: &Grouping) -> Result<Vec<Fold>> {
        let folds = match self {
            Self::CrossValidation(cv) => cv.split(n_samples, y, grouping.keys())?,
            Self::HeldOut { train_rows } => {
                vec![Fold::new(
                    0,
                    (0..*train_rows).collect(),
                    (*train_rows..n_samples).collect(),
                )]
            }
        };

        if folds.is_empty() {
            return Err(Error::InvalidInput(format!(
                "{} produced no folds (n_splits = {})",
                self.name(),
                self.n_splits()
            )));
        }

        for fold in &folds {
            if fold.train.is_empty() || fold.test.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "Fold {} has {} train and {} test rows; both sides must be non-empty",
                    fold.index,
                    fold.train.len(),
                    fold.test.len()
                )));
            }
        }

        if let Grouping::Column(keys) = grouping {
            self.check_group_leakage(&folds, keys)?;
        }

        Ok(folds)
    }

    fn check_group_leakage(&self, folds: &[Fold], keys: &[String]) -> Result<()> {
        for fold in folds {
            let train: HashSet<&str> = fold.train.iter().map(|&i| keys[i].as_str()).collect();
            if let Some(&leaked) = fold.test.iter().find(|&&i| train.contains(keys[i].as_str())) {
                return Err(Error::Configuration(format!(
                    "{} placed group '{}' in both train and test of fold {}; \
                     use a group-aware cross-validator",
                    self.name(),
                    keys[leaked],
                    fold.index
                )));
            }
        }
        Ok(())
    }

    /// Number of folds the split is expected to produce.
    #[must_use]
    pub fn n_splits(&self) -> usize {
        match self {
            Self::CrossValidation(cv) => cv.n_splits(),
            Self::HeldOut { .. } => 1,
        }
    }

    /// Protocol name for logs and error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CrossValidation(cv) => cv.name(),
            Self::HeldOut { .. } => "HeldOut",
        }
    }
}

/// Seeded RNG, or one drawn from OS entropy when no seed is configured.
pub(crate) fn rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

/// Number of test items for a fractional test size (at least one, never all).
pub(crate) fn test_count(n: usize, test_size: f64) -> Result<usize> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(Error::InvalidInput(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }
    if n < 2 {
        return Err(Error::InvalidInput(format!(
            "Need at least 2 items to split, got {n}"
        )));
    }
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    let count = (test_size * n as f64).ceil() as usize;
    Ok(count.clamp(1, n - 1))
}

/// Repeated random splitters need at least one iteration.
pub(crate) fn check_iterations(n_splits: usize) -> Result<()> {
    if n_splits == 0 {
        return Err(Error::InvalidInput(
            "n_splits must be at least 1 for a shuffle splitter".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_n_splits(n_splits: usize, n_items: usize, what: &str) -> Result<()> {
    if n_splits < 2 {
        return Err(Error::InvalidInput(format!(
            "n_splits must be at least 2, got {n_splits}"
        )));
    }
    if n_splits > n_items {
        return Err(Error::InvalidInput(format!(
            "Cannot make {n_splits} splits from {n_items} {what}"
        )));
    }
    Ok(())
}
