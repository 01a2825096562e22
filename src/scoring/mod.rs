//! Scorers and per-fold fit-and-score
//!
//! A [`Scorer`] pairs a raw metric with a sign so that every scorer ranks
//! "higher is better". Recorded numbers always have the sign undone: a mean
//! squared error is stored as a positive error, not as its negation.

pub mod metrics;
mod summary;

pub use summary::{mean, standard_error, summarize, ScoreSummary};

use crate::dataset::{take_rows, take_values, to_f64};
use crate::predictor::Predictor;
use crate::split::Fold;
use crate::{Error, Result};
use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Raw metric: `(y_true, y_pred) -> value`
pub type MetricFn = Arc<dyn Fn(&[f64], &[f64]) -> Result<f64> + Send + Sync>;

/// Metric name to value
pub type Scores = BTreeMap<String, f64>;

/// Named, signed scoring function.
#[derive(Clone)]
pub struct Scorer {
    name: String,
    sign: f64,
    metric: MetricFn,
}

impl fmt::Debug for Scorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scorer")
            .field("name", &self.name)
            .field("sign", &self.sign)
            .finish_non_exhaustive()
    }
}

impl Scorer {
    /// Wrap a metric. `greater_is_better = false` flips the sign for ranking.
    pub fn new<F>(name: impl Into<String>, metric: F, greater_is_better: bool) -> Self
    where
        F: Fn(&[f64], &[f64]) -> Result<f64> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            sign: if greater_is_better { 1.0 } else { -1.0 },
            metric: Arc::new(metric),
        }
    }

    /// `accuracy_score`
    #[must_use]
    pub fn accuracy() -> Self {
        Self::new("accuracy_score", metrics::accuracy_score, true)
    }

    /// `precision_score` (positive label 1)
    #[must_use]
    pub fn precision() -> Self {
        Self::new("precision_score", metrics::precision_score, true)
    }

    /// `recall_score` (positive label 1)
    #[must_use]
    pub fn recall() -> Self {
        Self::new("recall_score", metrics::recall_score, true)
    }

    /// `f1_score` (positive label 1)
    #[must_use]
    pub fn f1() -> Self {
        Self::new("f1_score", metrics::f1_score, true)
    }

    /// `mean_absolute_error` (lower is better)
    #[must_use]
    pub fn mean_absolute_error() -> Self {
        Self::new("mean_absolute_error", metrics::mean_absolute_error, false)
    }

    /// `mean_squared_error` (lower is better)
    #[must_use]
    pub fn mean_squared_error() -> Self {
        Self::new("mean_squared_error", metrics::mean_squared_error, false)
    }

    /// `r2_score`
    #[must_use]
    pub fn r2() -> Self {
        Self::new("r2_score", metrics::r2_score, true)
    }

    /// Rename, keeping metric and sign.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Metric name used as the key in recorded scores.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// +1 if higher raw values are better, -1 otherwise.
    #[must_use]
    pub const fn sign(&self) -> f64 {
        self.sign
    }

    /// Signed score for ranking: `sign * metric(y, predictor.predict(x))`.
    ///
    /// # Errors
    /// Propagates prediction and metric failures.
    pub fn score(&self, predictor: &dyn Predictor, x: &RecordBatch, y: &ArrayRef) -> Result<f64> {
        let y_pred = to_f64(&predictor.predict(x)?)?;
        let y_true = to_f64(y)?;
        Ok(self.sign * (self.metric)(&y_true, &y_pred)?)
    }

    /// Metric as measured, with the ranking sign undone.
    ///
    /// # Errors
    /// Propagates prediction and metric failures.
    pub fn measure(&self, predictor: &dyn Predictor, x: &RecordBatch, y: &ArrayRef) -> Result<f64> {
        Ok(self.sign * self.score(predictor, x, y)?)
    }
}

/// Scores for one scoring unit: a whole fold, or one group within a fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupScores {
    /// Fold the scores came from
    pub fold: usize,
    /// Group key, `None` when the fold is scored as a whole
    pub group: Option<String>,
    /// Metric name to measured value
    pub scores: Scores,
}

/// Result of fitting and scoring one fold.
#[derive(Debug)]
pub struct FoldOutcome {
    /// One entry per scoring unit
    pub entries: Vec<GroupScores>,
    /// The predictor fitted on this fold's training rows
    pub predictor: Box<dyn Predictor>,
}

fn measure_all(
    scorers: &[Scorer],
    predictor: &dyn Predictor,
    x: &RecordBatch,
    y: &ArrayRef,
) -> Result<Scores> {
    scorers
        .iter()
        .map(|s| {
            let value = s.measure(predictor, x, y)?;
            if !value.is_finite() {
                return Err(Error::InvalidInput(format!(
                    "Metric '{}' produced a non-finite value ({value})",
                    s.name()
                )));
            }
            Ok((s.name().to_string(), value))
        })
        .collect()
}

/// Fit a fresh clone of `predictor` on the fold's train rows and score its
/// test rows.
///
/// Without `groups` the test partition yields a single entry keyed `None`.
/// With `groups` the test rows are partitioned by key and each group is
/// scored separately, in key order. Failures propagate unchanged.
///
/// # Errors
/// Returns the first fit, predict or metric failure, or `InvalidInput` if a
/// metric yields NaN or an infinity.
pub fn fit_and_score(
    predictor: &dyn Predictor,
    x: &RecordBatch,
    y: &ArrayRef,
    fold: &Fold,
    groups: Option<&[String]>,
    scorers: &[Scorer],
) -> Result<FoldOutcome> {
    let mut fitted = predictor.clone_unfitted();
    fitted.fit(&take_rows(x, &fold.train)?, &take_values(y, &fold.train)?)?;

    let entries = match groups {
        None => {
            let x_test = take_rows(x, &fold.test)?;
            let y_test = take_values(y, &fold.test)?;
            vec![GroupScores {
                fold: fold.index,
                group: None,
                scores: measure_all(scorers, fitted.as_ref(), &x_test, &y_test)?,
            }]
        }
        Some(keys) => {
            let mut by_group: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
            for &i in &fold.test {
                by_group.entry(keys[i].as_str()).or_default().push(i);
            }
            by_group
                .into_iter()
                .map(|(key, rows)| {
                    let x_group = take_rows(x, &rows)?;
                    let y_group = take_values(y, &rows)?;
                    Ok(GroupScores {
                        fold: fold.index,
                        group: Some(key.to_string()),
                        scores: measure_all(scorers, fitted.as_ref(), &x_group, &y_group)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?
        }
    };

    Ok(FoldOutcome {
        entries,
        predictor: fitted,
    })
}
