//! Baseline predictor that ignores its features

use super::{Params, Predictor};
use crate::dataset::label_values;
use crate::{Error, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::record_batch::RecordBatch;
use serde_json::json;
use std::any::Any;
use std::sync::Arc;

/// Prediction rule for [`DummyPredictor`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DummyStrategy {
    /// Always predict the given value
    Constant(f64),
    /// Predict the most frequent training target (smallest on ties)
    MostFrequent,
    /// Predict the mean training target
    Mean,
}

/// Baseline model: predicts one value for every row.
#[derive(Debug, Clone)]
pub struct DummyPredictor {
    strategy: DummyStrategy,
    fitted: Option<f64>,
}

impl DummyPredictor {
    /// Create an unfitted baseline
    #[must_use]
    pub const fn new(strategy: DummyStrategy) -> Self {
        Self {
            strategy,
            fitted: None,
        }
    }

    /// Shorthand for [`DummyStrategy::Constant`]
    #[must_use]
    pub const fn constant(value: f64) -> Self {
        Self::new(DummyStrategy::Constant(value))
    }

    /// Value predicted after fitting
    #[must_use]
    pub const fn fitted_value(&self) -> Option<f64> {
        self.fitted
    }
}

impl Predictor for DummyPredictor {
    fn type_name(&self) -> &str {
        "DummyPredictor"
    }

    fn params(&self) -> Params {
        let mut params = Params::new();
        let (strategy, constant) = match self.strategy {
            DummyStrategy::Constant(v) => ("constant", json!(v)),
            DummyStrategy::MostFrequent => ("most_frequent", json!(null)),
            DummyStrategy::Mean => ("mean", json!(null)),
        };
        params.insert("strategy".to_string(), json!(strategy));
        params.insert("constant".to_string(), constant);
        params
    }

    fn fit(&mut self, _x: &RecordBatch, y: &ArrayRef) -> Result<()> {
        let values = label_values(y)?;
        if values.is_empty() {
            return Err(Error::InvalidInput("Cannot fit on zero rows".to_string()));
        }

        let fitted = match self.strategy {
            DummyStrategy::Constant(v) => v,
            DummyStrategy::Mean => {
                #[allow(clippy::cast_precision_loss)]
                let n = values.len() as f64;
                values.iter().sum::<f64>() / n
            }
            DummyStrategy::MostFrequent => {
                let mut sorted = values;
                sorted.sort_by(f64::total_cmp);
                let mut best = (sorted[0], 0usize);
                let mut run = (sorted[0], 0usize);
                for v in sorted {
                    if v.total_cmp(&run.0).is_eq() {
                        run.1 += 1;
                    } else {
                        run = (v, 1);
                    }
                    if run.1 > best.1 {
                        best = run;
                    }
                }
                best.0
            }
        };
        self.fitted = Some(fitted);
        Ok(())
    }

    fn predict(&self, x: &RecordBatch) -> Result<ArrayRef> {
        let value = self
            .fitted
            .ok_or_else(|| Error::InvalidInput("DummyPredictor is not fitted".to_string()))?;
        Ok(Arc::new(Float64Array::from(vec![value; x.num_rows()])))
    }

    fn clone_unfitted(&self) -> Box<dyn Predictor> {
        Box::new(Self::new(self.strategy))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
