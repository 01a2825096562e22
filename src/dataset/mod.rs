//! Tabular dataset helpers (Arrow `RecordBatch`)
//!
//! Experiments hold their data as Arrow record batches: rows are instances,
//! columns are features, the label, and optionally a group column. This module
//! provides the row selection and numeric views the fold runner needs, plus
//! the content fingerprint stored with every run.

pub mod fingerprint;

pub use fingerprint::{fingerprint, fingerprint_with_block_size, BLOCK_SIZE};

use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, Float64Array, UInt64Array};
use arrow::compute;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;

/// Look up a column by name.
///
/// # Errors
/// Returns `InvalidInput` if the column does not exist.
pub fn column(batch: &RecordBatch, name: &str) -> Result<ArrayRef> {
    batch
        .column_by_name(name)
        .cloned()
        .ok_or_else(|| Error::InvalidInput(format!("Column not found: {name}")))
}

/// Column names in schema order.
#[must_use]
pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}

/// Project away the named columns, keeping the remaining order.
///
/// # Errors
/// Returns error if the projection cannot be built.
pub fn drop_columns(batch: &RecordBatch, names: &[&str]) -> Result<RecordBatch> {
    let keep: Vec<usize> = batch
        .schema()
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !names.contains(&f.name().as_str()))
        .map(|(i, _)| i)
        .collect();
    Ok(batch.project(&keep)?)
}

fn take_indices(indices: &[usize]) -> UInt64Array {
    UInt64Array::from_iter_values(indices.iter().map(|&i| i as u64))
}

/// Select rows of a batch by position.
///
/// # Errors
/// Returns error if an index is out of bounds.
pub fn take_rows(batch: &RecordBatch, indices: &[usize]) -> Result<RecordBatch> {
    Ok(compute::take_record_batch(batch, &take_indices(indices))?)
}

/// Select values of an array by position.
///
/// # Errors
/// Returns error if an index is out of bounds.
pub fn take_values(array: &ArrayRef, indices: &[usize]) -> Result<ArrayRef> {
    Ok(compute::take(array.as_ref(), &take_indices(indices), None)?)
}

/// Cast an array to `f64` values.
///
/// Booleans map to 0.0/1.0; integer and float types are widened.
///
/// # Errors
/// Returns `InvalidInput` for non-numeric types or null entries.
pub fn to_f64(array: &ArrayRef) -> Result<Vec<f64>> {
    if matches!(
        array.data_type(),
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View
    ) {
        return Err(Error::InvalidInput(format!(
            "Expected a numeric column, got {}",
            array.data_type()
        )));
    }
    if array.null_count() > 0 {
        return Err(Error::InvalidInput(format!(
            "Column contains {} null values",
            array.null_count()
        )));
    }

    let cast = compute::cast(array.as_ref(), &DataType::Float64)?;
    let values = cast
        .as_any()
        .downcast_ref::<Float64Array>()
        .ok_or_else(|| Error::Other("Failed to downcast to Float64Array".to_string()))?;
    Ok(values.values().to_vec())
}

/// Numeric view of a label column.
///
/// # Errors
/// Returns `InvalidInput` if the labels are not numeric or contain nulls.
pub fn label_values(y: &ArrayRef) -> Result<Vec<f64>> {
    to_f64(y).map_err(|e| match e {
        Error::InvalidInput(msg) => Error::InvalidInput(format!("Label: {msg}")),
        other => other,
    })
}

/// Numeric view of every column in `batch`, column-major.
///
/// # Errors
/// Returns `InvalidInput` naming the first column that cannot be cast.
pub fn feature_columns(batch: &RecordBatch) -> Result<Vec<Vec<f64>>> {
    let schema = batch.schema();
    batch
        .columns()
        .iter()
        .zip(schema.fields())
        .map(|(col, field)| {
            to_f64(col).map_err(|e| match e {
                Error::InvalidInput(msg) => {
                    Error::InvalidInput(format!("Feature '{}': {msg}", field.name()))
                }
                other => other,
            })
        })
        .collect()
}

/// Render every cell of `array` as a string key (group ids, class labels).
///
/// # Errors
/// Returns error if a value cannot be formatted.
pub fn value_keys(array: &ArrayRef) -> Result<Vec<String>> {
    (0..array.len())
        .map(|i| array_value_to_string(array, i).map_err(Error::from))
        .collect()
}

/// Stack `test_set` under `dataset`.
///
/// # Errors
/// Returns error if the schemas differ.
pub fn concat(dataset: &RecordBatch, test_set: &RecordBatch) -> Result<RecordBatch> {
    if dataset.schema() != test_set.schema() {
        return Err(Error::InvalidInput(format!(
            "Schema mismatch: expected {:?}, got {:?}",
            dataset.schema(),
            test_set.schema()
        )));
    }
    Ok(compute::concat_batches(&dataset.schema(), [dataset, test_set])?)
}
