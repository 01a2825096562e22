//! K-Fold cross-validation splitters

use super::{check_n_splits, rng, CrossValidator, Fold};
use crate::dataset::value_keys;
use crate::Result;
use arrow::array::ArrayRef;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;

/// K-Fold cross-validation splitter
///
/// Every row lands in exactly one test fold. The first `n % k` folds get one
/// extra row.
#[derive(Clone, Debug)]
pub struct KFold {
    n_splits: usize,
    shuffle: bool,
    seed: Option<u64>,
}

impl KFold {
    /// Create a new shuffling `KFold` splitter
    #[must_use]
    pub const fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: true,
            seed: None,
        }
    }

    /// Set random seed for shuffling
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Disable shuffling
    #[must_use]
    pub const fn without_shuffle(mut self) -> Self {
        self.shuffle = false;
        self
    }
}

impl CrossValidator for KFold {
    fn split(
        &self,
        n_samples: usize,
        _y: &ArrayRef,
        _groups: Option<&[String]>,
    ) -> Result<Vec<Fold>> {
        check_n_splits(self.n_splits, n_samples, "samples")?;

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            indices.shuffle(&mut rng(self.seed));
        }

        let fold_size = n_samples / self.n_splits;
        let remainder = n_samples % self.n_splits;

        let mut folds = Vec::with_capacity(self.n_splits);
        let mut start = 0;
        for i in 0..self.n_splits {
            let end = start + fold_size + usize::from(i < remainder);
            let test = indices[start..end].to_vec();
            let train = indices[..start]
                .iter()
                .chain(indices[end..].iter())
                .copied()
                .collect();
            folds.push(Fold::new(i, train, test));
            start = end;
        }

        Ok(folds)
    }

    fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn name(&self) -> &'static str {
        "KFold"
    }
}

/// K-Fold variant that preserves class proportions in every test fold.
///
/// Rows of each class are dealt round-robin across folds, continuing where
/// the previous class stopped so fold sizes stay balanced.
#[derive(Clone, Debug)]
pub struct StratifiedKFold {
    n_splits: usize,
    shuffle: bool,
    seed: Option<u64>,
}

impl StratifiedKFold {
    /// Create a non-shuffling stratified splitter
    #[must_use]
    pub const fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            seed: None,
        }
    }

    /// Shuffle within each class using `seed`
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.shuffle = true;
        self.seed = Some(seed);
        self
    }
}

impl CrossValidator for StratifiedKFold {
    fn split(
        &self,
        n_samples: usize,
        y: &ArrayRef,
        _groups: Option<&[String]>,
    ) -> Result<Vec<Fold>> {
        check_n_splits(self.n_splits, n_samples, "samples")?;

        let mut by_class: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (i, key) in value_keys(y)?.into_iter().enumerate().take(n_samples) {
            by_class.entry(key).or_default().push(i);
        }

        let mut rng = rng(self.seed);
        let mut assignment = vec![0usize; n_samples];
        let mut next_fold = 0;
        for members in by_class.values_mut() {
            if self.shuffle {
                members.shuffle(&mut rng);
            }
            for &i in members.iter() {
                assignment[i] = next_fold;
                next_fold = (next_fold + 1) % self.n_splits;
            }
        }

        Ok((0..self.n_splits)
            .map(|k| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..n_samples).partition(|&i| assignment[i] == k);
                Fold::new(k, train, test)
            })
            .collect())
    }

    fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn name(&self) -> &'static str {
        "StratifiedKFold"
    }
}
