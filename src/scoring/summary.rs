//! Mean and standard error of the mean over scoring units

use super::{GroupScores, Scores};
use std::collections::BTreeMap;

/// Per-metric mean and SEM.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreSummary {
    /// Metric name to mean
    pub mean: Scores,
    /// Metric name to standard error of the mean
    pub sem: Scores,
}

/// Arithmetic mean; `NaN` for no values.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1) divided by `sqrt(n)`.
///
/// Fewer than two observations carry no spread information and give 0.0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn standard_error(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - 1) as f64;
    (variance / n as f64).sqrt()
}

/// Fold all scoring units into one summary.
///
/// Every entry is an equally weighted observation: a fold with ten groups
/// contributes ten observations, not one fold average.
#[must_use]
pub fn summarize(entries: &[GroupScores]) -> ScoreSummary {
    let mut observations: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for entry in entries {
        for (metric, &value) in &entry.scores {
            observations.entry(metric.as_str()).or_default().push(value);
        }
    }

    let mut summary = ScoreSummary::default();
    for (metric, values) in observations {
        summary.mean.insert(metric.to_string(), mean(&values));
        summary.sem.insert(metric.to_string(), standard_error(&values));
    }
    summary
}
