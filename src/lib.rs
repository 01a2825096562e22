//! # Pastry: lightweight experiment tracking for tabular predictors
//!
//! **Version**: 0.1.0
//!
//! Pastry evaluates one predictor per call on an Arrow dataset, using
//! cross-validation or a held-out test set, and records every run as a
//! uniquely named JSON file next to a content fingerprint of the data and
//! the repository revision that produced it.
//!
//! ## Design Principles
//!
//! - **Reproducible by construction**: runs against uncommitted code are
//!   refused unless forced, and forced runs are tagged dirty
//! - **Content-addressed data**: the dataset hash comes from a canonical
//!   Parquet encoding, never from text formatting
//! - **Nothing half-written**: result files appear atomically or not at all
//! - **Fold-parallel**: folds are fitted and scored on a rayon pool
//!
//! ## Example Usage
//!
//! ```rust
//! use pastry::experiment::{evaluate, Experiment};
//! use pastry::predictor::DecisionTreeClassifier;
//! use pastry::scoring::Scorer;
//! use pastry::split::StratifiedKFold;
//! use arrow::array::{ArrayRef, Float64Array, Int64Array};
//! use arrow::record_batch::RecordBatch;
//! use std::sync::Arc;
//!
//! let data = RecordBatch::try_from_iter(vec![
//!     ("x", Arc::new(Float64Array::from(vec![0.1, 0.2, 0.3, 0.7, 0.8, 0.9])) as ArrayRef),
//!     ("y", Arc::new(Int64Array::from(vec![0, 0, 0, 1, 1, 1])) as ArrayRef),
//! ])?;
//!
//! let experiment = Experiment::builder(data, "y", DecisionTreeClassifier::new())
//!     .cross_validator(StratifiedKFold::new(3).with_seed(42))
//!     .scorers([Scorer::accuracy(), Scorer::f1()])
//!     .build()?;
//!
//! let evaluation = evaluate(&experiment)?;
//! println!("{:?}", evaluation.record.results().test_score);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod experiment;
pub mod predictor;
pub mod scoring;
pub mod split;

pub use error::{Error, Result};
