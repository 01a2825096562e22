//! Grouped Evaluation: end-to-end tracked run
//!
//! Evaluates a decision tree on synthetic data where rows come in groups
//! (e.g. several measurements per patient). `GroupKFold` keeps each group
//! on one side of every fold, and each test group is scored separately.
//!
//! The run is persisted to a temporary results directory and the cached
//! results table is printed.
//!
//! Run with: cargo run --example grouped_evaluation

use arrow::array::{ArrayRef, Float64Array, Int64Array};
use arrow::record_batch::RecordBatch;
use pastry::experiment::{CacheDisplay, Experiment, ExperimentRunner, RepoState, ResultsRepo};
use pastry::predictor::{DecisionTreeClassifier, Predictor};
use pastry::scoring::Scorer;
use pastry::split::GroupKFold;
use std::sync::Arc;

/// Repository that is always clean at a fixed revision.
struct CleanRepo;

impl RepoState for CleanRepo {
    fn is_dirty(&self) -> pastry::Result<bool> {
        Ok(false)
    }

    fn current_revision_id(&self) -> pastry::Result<String> {
        Ok("3f9a2c7e1b".to_string())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Pastry Grouped Evaluation ===\n");

    let n = 120_i64;
    let feature: Vec<f64> = (0..n).map(|i| ((i * 37) % 100) as f64 / 100.0).collect();
    let label: Vec<i64> = feature.iter().map(|&v| i64::from(v > 0.45)).collect();
    let patient: Vec<i64> = (0..n).map(|i| i / 6).collect();

    let data = RecordBatch::try_from_iter(vec![
        ("reading", Arc::new(Float64Array::from(feature)) as ArrayRef),
        ("diagnosis", Arc::new(Int64Array::from(label)) as ArrayRef),
        ("patient", Arc::new(Int64Array::from(patient)) as ArrayRef),
    ])?;
    println!("Dataset: {} rows, 20 patients", data.num_rows());

    let experiment = Experiment::builder(
        data,
        "diagnosis",
        DecisionTreeClassifier::new().with_max_depth(3),
    )
    .cross_validator(GroupKFold::new(5))
    .group_column("patient")
    .scorers([Scorer::accuracy(), Scorer::f1()])
    .additional_info(|fitted: &dyn Predictor| {
        let tree = fitted.as_any().downcast_ref::<DecisionTreeClassifier>();
        serde_json::json!({ "leaves": tree.and_then(DecisionTreeClassifier::leaf_count) })
    })
    .build()?;

    let workspace = tempfile::tempdir()?;
    let runner = ExperimentRunner::new(
        CleanRepo,
        ResultsRepo::new(workspace.path().join("results")),
        CacheDisplay::new(workspace.path().join(".pastry/display.txt")),
    );

    let outcome = runner.run_experiment(
        &experiment,
        "Depth-3 tree, grouped by patient",
        false,
        Some(5),
        true,
    )?;

    println!("\nFitted {} fold models", outcome.predictors.len());
    println!("Record written to {}", outcome.location.display());
    println!("\n{}", std::fs::read_to_string(&outcome.location)?);

    Ok(())
}
