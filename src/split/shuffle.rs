//! Random permutation splitters (Monte Carlo cross-validation)

use super::{check_iterations, rng, test_count, CrossValidator, Fold};
use crate::dataset::value_keys;
use crate::{Error, Result};
use arrow::array::ArrayRef;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

/// Independent random train/test splits.
///
/// Unlike [`super::KFold`], test sets of different splits may overlap.
#[derive(Clone, Debug)]
pub struct ShuffleSplit {
    n_splits: usize,
    test_size: f64,
    seed: Option<u64>,
}

impl ShuffleSplit {
    /// Create a splitter producing `n_splits` splits with `test_size` of the rows held out
    #[must_use]
    pub const fn new(n_splits: usize, test_size: f64) -> Self {
        Self {
            n_splits,
            test_size,
            seed: None,
        }
    }

    /// Set random seed
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl CrossValidator for ShuffleSplit {
    fn split(
        &self,
        n_samples: usize,
        _y: &ArrayRef,
        _groups: Option<&[String]>,
    ) -> Result<Vec<Fold>> {
        check_iterations(self.n_splits)?;
        let n_test = test_count(n_samples, self.test_size)?;
        let mut rng = rng(self.seed);

        Ok((0..self.n_splits)
            .map(|k| {
                let mut indices: Vec<usize> = (0..n_samples).collect();
                indices.shuffle(&mut rng);
                let mut test = indices[..n_test].to_vec();
                let mut train = indices[n_test..].to_vec();
                test.sort_unstable();
                train.sort_unstable();
                Fold::new(k, train, test)
            })
            .collect())
    }

    fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn name(&self) -> &'static str {
        "ShuffleSplit"
    }
}

/// Random splits that keep each class's share of the test set.
///
/// Each class contributes `round(class_size * test_size)` rows to the test
/// side, capped so that at least one row of every class stays in training.
#[derive(Clone, Debug)]
pub struct StratifiedShuffleSplit {
    n_splits: usize,
    test_size: f64,
    seed: Option<u64>,
}

impl StratifiedShuffleSplit {
    /// Create a stratified splitter
    #[must_use]
    pub const fn new(n_splits: usize, test_size: f64) -> Self {
        Self {
            n_splits,
            test_size,
            seed: None,
        }
    }

    /// Set random seed
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl CrossValidator for StratifiedShuffleSplit {
    fn split(
        &self,
        n_samples: usize,
        y: &ArrayRef,
        _groups: Option<&[String]>,
    ) -> Result<Vec<Fold>> {
        check_iterations(self.n_splits)?;
        // Validates test_size and n_samples
        test_count(n_samples, self.test_size)?;

        let mut by_class: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, key) in value_keys(y)?.into_iter().enumerate().take(n_samples) {
            by_class.entry(key).or_default().push(i);
        }
        if let Some((class, members)) = by_class.iter().find(|(_, m)| m.len() < 2) {
            return Err(Error::InvalidInput(format!(
                "The least populated class '{class}' has only {} member; \
                 stratification needs at least 2 per class",
                members.len()
            )));
        }

        let mut rng = rng(self.seed);
        Ok((0..self.n_splits)
            .map(|k| {
                let mut train = Vec::with_capacity(n_samples);
                let mut test = Vec::new();
                for members in by_class.values() {
                    let mut shuffled = members.clone();
                    shuffled.shuffle(&mut rng);
                    #[allow(clippy::cast_precision_loss)]
                    #[allow(clippy::cast_possible_truncation)]
                    #[allow(clippy::cast_sign_loss)]
                    let n_test = ((shuffled.len() as f64 * self.test_size).round() as usize)
                        .min(shuffled.len() - 1);
                    test.extend_from_slice(&shuffled[..n_test]);
                    train.extend_from_slice(&shuffled[n_test..]);
                }
                test.sort_unstable();
                train.sort_unstable();
                Fold::new(k, train, test)
            })
            .collect())
    }

    fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn name(&self) -> &'static str {
        "StratifiedShuffleSplit"
    }
}
