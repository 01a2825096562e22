//! Held-Out Evaluation: train on the dataset, score on a test set
//!
//! With a test set instead of a cross-validator there is exactly one fold:
//! every dataset row trains and every test-set row scores. The fingerprint
//! covers both tables.
//!
//! Run with: cargo run --example held_out_evaluation

use arrow::array::{ArrayRef, Float64Array};
use arrow::record_batch::RecordBatch;
use pastry::dataset::fingerprint;
use pastry::experiment::{evaluate, Experiment};
use pastry::predictor::{DummyPredictor, DummyStrategy};
use pastry::scoring::Scorer;
use std::sync::Arc;

fn table(x: Vec<f64>, y: Vec<f64>) -> Result<RecordBatch, arrow::error::ArrowError> {
    RecordBatch::try_from_iter(vec![
        ("x", Arc::new(Float64Array::from(x)) as ArrayRef),
        ("y", Arc::new(Float64Array::from(y)) as ArrayRef),
    ])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Pastry Held-Out Evaluation ===\n");

    let train = table(vec![1.0, 2.0, 3.0, 4.0], vec![10.0, 12.0, 14.0, 16.0])?;
    let test = table(vec![5.0, 6.0], vec![18.0, 20.0])?;

    println!("Dataset hash: {}", fingerprint(&train, Some(&test))?);

    let experiment = Experiment::builder(train, "y", DummyPredictor::new(DummyStrategy::Mean))
        .test_set(test)
        .scorers([
            Scorer::mean_absolute_error(),
            Scorer::mean_squared_error(),
            Scorer::r2(),
        ])
        .build()?;

    let evaluation = evaluate(&experiment)?;
    let results = evaluation.record.results();

    println!("\nBaseline (predict training mean):");
    for (metric, value) in &results.test_score {
        println!("  {metric:<22} {value:>8.3}");
    }
    println!("\nModel info: {}", serde_json::to_string(evaluation.record.model_info())?);

    Ok(())
}
