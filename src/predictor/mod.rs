//! Predictor capability trait and reference adapters
//!
//! The evaluation pipeline treats models as opaque: it needs to clone an
//! unfitted copy per fold, fit it, predict, and report hyperparameters.
//! Anything implementing [`Predictor`] can be evaluated.

mod dummy;
mod tree;

pub use dummy::{DummyPredictor, DummyStrategy};
pub use tree::DecisionTreeClassifier;

use crate::Result;
use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;
use std::any::Any;
use std::fmt;

/// Hyperparameter map reported in `model_info`
pub type Params = serde_json::Map<String, serde_json::Value>;

/// A fittable model.
///
/// `Send + Sync` because folds are fitted on worker threads, each with its
/// own clone from [`Predictor::clone_unfitted`].
pub trait Predictor: Send + Sync + fmt::Debug {
    /// Model type name recorded with every run (e.g. `DecisionTreeClassifier`).
    fn type_name(&self) -> &str;

    /// Constructor hyperparameters.
    fn params(&self) -> Params;

    /// Fit on features `x` and targets `y`.
    ///
    /// # Errors
    /// Returns error if the data cannot be used for fitting.
    fn fit(&mut self, x: &RecordBatch, y: &ArrayRef) -> Result<()>;

    /// Predict one target per row of `x`.
    ///
    /// # Errors
    /// Returns error if the model is unfitted or `x` does not match the
    /// training features.
    fn predict(&self, x: &RecordBatch) -> Result<ArrayRef>;

    /// Fresh copy with the same hyperparameters and no fitted state.
    fn clone_unfitted(&self) -> Box<dyn Predictor>;

    /// Downcasting hook for additional-info extractors.
    fn as_any(&self) -> &dyn Any;
}
