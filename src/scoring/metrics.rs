//! Raw metric functions over `(y_true, y_pred)` slices.
//!
//! Classification metrics are binary with positive label `1.0`. A zero
//! denominator yields `0.0` instead of an error.

use crate::{Error, Result};

fn check(y_true: &[f64], y_pred: &[f64]) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(Error::InvalidInput(format!(
            "Got {} targets and {} predictions",
            y_true.len(),
            y_pred.len()
        )));
    }
    if y_true.is_empty() {
        return Err(Error::InvalidInput(
            "Cannot score an empty partition".to_string(),
        ));
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

struct Confusion {
    tp: usize,
    fp: usize,
    fn_: usize,
}

fn confusion(y_true: &[f64], y_pred: &[f64]) -> Confusion {
    let positive = |v: f64| (v - 1.0).abs() < f64::EPSILON;
    let mut c = Confusion { tp: 0, fp: 0, fn_: 0 };
    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (positive(t), positive(p)) {
            (true, true) => c.tp += 1,
            (false, true) => c.fp += 1,
            (true, false) => c.fn_ += 1,
            (false, false) => {}
        }
    }
    c
}

/// Fraction of exact matches.
///
/// # Errors
/// Returns `InvalidInput` on empty or mismatched inputs.
pub fn accuracy_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check(y_true, y_pred)?;
    let hits = y_true
        .iter()
        .zip(y_pred)
        .filter(|(t, p)| t.total_cmp(p).is_eq())
        .count();
    Ok(ratio(hits, y_true.len()))
}

/// TP / (TP + FP).
///
/// # Errors
/// Returns `InvalidInput` on empty or mismatched inputs.
pub fn precision_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check(y_true, y_pred)?;
    let c = confusion(y_true, y_pred);
    Ok(ratio(c.tp, c.tp + c.fp))
}

/// TP / (TP + FN).
///
/// # Errors
/// Returns `InvalidInput` on empty or mismatched inputs.
pub fn recall_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check(y_true, y_pred)?;
    let c = confusion(y_true, y_pred);
    Ok(ratio(c.tp, c.tp + c.fn_))
}

/// Harmonic mean of precision and recall.
///
/// # Errors
/// Returns `InvalidInput` on empty or mismatched inputs.
pub fn f1_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check(y_true, y_pred)?;
    let c = confusion(y_true, y_pred);
    Ok(ratio(2 * c.tp, 2 * c.tp + c.fp + c.fn_))
}

/// Mean of `|y_true - y_pred|`.
///
/// # Errors
/// Returns `InvalidInput` on empty or mismatched inputs.
#[allow(clippy::cast_precision_loss)]
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check(y_true, y_pred)?;
    let total: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum();
    Ok(total / y_true.len() as f64)
}

/// Mean of `(y_true - y_pred)^2`.
///
/// # Errors
/// Returns `InvalidInput` on empty or mismatched inputs.
#[allow(clippy::cast_precision_loss)]
pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check(y_true, y_pred)?;
    let total: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    Ok(total / y_true.len() as f64)
}

/// Coefficient of determination.
///
/// A constant target scores 1.0 for a perfect fit and 0.0 otherwise.
///
/// # Errors
/// Returns `InvalidInput` on empty or mismatched inputs.
#[allow(clippy::cast_precision_loss)]
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> Result<f64> {
    check(y_true, y_pred)?;
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}
