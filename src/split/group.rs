//! Group-aware splitters: instances sharing a group key stay on one side.

use super::{check_iterations, check_n_splits, rng, test_count, CrossValidator, Fold};
use crate::{Error, Result};
use arrow::array::ArrayRef;
use rand::seq::SliceRandom;
use std::collections::{BTreeMap, HashSet};

fn require_groups<'a>(groups: Option<&'a [String]>, name: &str) -> Result<&'a [String]> {
    groups.ok_or_else(|| {
        Error::InvalidInput(format!(
            "{name} needs a group column; set one on the experiment"
        ))
    })
}

/// Rows per group key, in key order.
fn members_by_group(groups: &[String], n_samples: usize) -> BTreeMap<&str, Vec<usize>> {
    let mut members: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, key) in groups.iter().enumerate().take(n_samples) {
        members.entry(key.as_str()).or_default().push(i);
    }
    members
}

/// K-Fold over groups.
///
/// Groups are assigned largest first to the currently lightest fold, which
/// keeps fold sizes close without splitting any group. Deterministic.
#[derive(Clone, Debug)]
pub struct GroupKFold {
    n_splits: usize,
}

impl GroupKFold {
    /// Create a group K-Fold splitter
    #[must_use]
    pub const fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }
}

impl CrossValidator for GroupKFold {
    fn split(
        &self,
        n_samples: usize,
        _y: &ArrayRef,
        groups: Option<&[String]>,
    ) -> Result<Vec<Fold>> {
        let groups = require_groups(groups, self.name())?;
        let members = members_by_group(groups, n_samples);
        check_n_splits(self.n_splits, members.len(), "groups")?;

        let mut ordered: Vec<&Vec<usize>> = members.values().collect();
        // Stable sort keeps key order among equal sizes
        ordered.sort_by(|a, b| b.len().cmp(&a.len()));

        let mut fold_rows = vec![0usize; self.n_splits];
        let mut assignment = vec![0usize; n_samples];
        for rows in ordered {
            let lightest = (0..self.n_splits)
                .min_by_key(|&k| fold_rows[k])
                .unwrap_or_default();
            fold_rows[lightest] += rows.len();
            for &i in rows {
                assignment[i] = lightest;
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
        "GroupKFold"
    }
}

/// Random splits over groups: `test_size` is a fraction of the groups.
#[derive(Clone, Debug)]
pub struct GroupShuffleSplit {
    n_splits: usize,
    test_size: f64,
    seed: Option<u64>,
}

impl GroupShuffleSplit {
    /// Create a group shuffle splitter
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

impl CrossValidator for GroupShuffleSplit {
    fn split(
        &self,
        n_samples: usize,
        _y: &ArrayRef,
        groups: Option<&[String]>,
    ) -> Result<Vec<Fold>> {
        check_iterations(self.n_splits)?;
        let groups = require_groups(groups, self.name())?;
        let keys: Vec<&str> = members_by_group(groups, n_samples).into_keys().collect();
        let n_test = test_count(keys.len(), self.test_size)?;
        let mut rng = rng(self.seed);

        Ok((0..self.n_splits)
            .map(|k| {
                let mut shuffled = keys.clone();
                shuffled.shuffle(&mut rng);
                let test_groups: HashSet<&str> = shuffled[..n_test].iter().copied().collect();
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..n_samples).partition(|&i| test_groups.contains(groups[i].as_str()));
                Fold::new(k, train, test)
            })
            .collect())
    }

    fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn name(&self) -> &'static str {
        "GroupShuffleSplit"
    }
}
