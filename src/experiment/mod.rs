//! Experiment tracking
//!
//! An [`Experiment`] describes one evaluation. [`evaluate`] produces a
//! [`RunRecord`]; [`ExperimentRunner`] adds the dirty-repository guard,
//! durable storage through a [`ResultsStore`], and a [`ResultsDisplay`]
//! refresh.
//!
//! ```text
//! ExperimentRunner::run_experiment
//!   ├─ RepoState::is_dirty          (abort unless forced)
//!   ├─ evaluate_with                (folds in parallel)
//!   ├─ ResultsStore::save           (one JSON file per run)
//!   └─ ResultsDisplay::refresh/print
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use pastry::experiment::{evaluate, Experiment};
//! use pastry::predictor::DummyPredictor;
//! use pastry::scoring::Scorer;
//! use pastry::split::KFold;
//! use arrow::array::{ArrayRef, Int64Array};
//! use arrow::record_batch::RecordBatch;
//! use std::sync::Arc;
//!
//! let data = RecordBatch::try_from_iter(vec![
//!     ("x", Arc::new(Int64Array::from(vec![1, 2, 3, 4])) as ArrayRef),
//!     ("y", Arc::new(Int64Array::from(vec![0, 1, 0, 1])) as ArrayRef),
//! ])?;
//!
//! let experiment = Experiment::builder(data, "y", DummyPredictor::constant(1.0))
//!     .cross_validator(KFold::new(2).with_seed(0))
//!     .scorer(Scorer::accuracy())
//!     .build()?;
//!
//! let evaluation = evaluate(&experiment)?;
//! assert!(evaluation.record.results().test_score.contains_key("accuracy_score"));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod display;
mod evaluation;
#[allow(clippy::module_inception)]
mod experiment;
mod repo_state;
mod results;
mod run_record;

pub use display::{CacheDisplay, ResultsDisplay};
pub use evaluation::{
    evaluate, evaluate_with, Evaluation, EvaluationSettings, ExperimentRunner, RunOutcome,
};
pub use experiment::{AdditionalInfoFn, Design, Experiment, ExperimentBuilder};
pub use repo_state::RepoState;
pub use results::{ResultIter, ResultsRepo, ResultsStore, RunResult};
pub use run_record::{
    DatasetInfo, ModelInfo, RepoInfo, RunRecord, RunRecordBuilder, RunResults, DIRTY_PREFIX,
};
