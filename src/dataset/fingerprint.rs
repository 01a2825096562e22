//! Content-addressed dataset fingerprints
//!
//! The dataset (and optional held-out test set) is encoded with the Parquet
//! `ArrowWriter` into a single in-memory buffer. Parquet keeps the schema and
//! stores floats in binary, so the digest never depends on text formatting.
//! The buffer is hashed with SHA-1 in fixed-size blocks.
//!
//! Digests are stored in full (40 hex chars). Shortening to 8 characters
//! happens only when rendering the display table.

use crate::{Error, Result};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use sha1::{Digest, Sha1};

/// Default streaming block size (64 KiB)
pub const BLOCK_SIZE: usize = 64 * 1024;

/// Fingerprint a dataset and optional test set with the default block size.
///
/// # Errors
/// Returns error if the Parquet encoding fails.
///
/// # Example
///
/// ```rust
/// use arrow::array::{ArrayRef, Int64Array};
/// use arrow::record_batch::RecordBatch;
/// use std::sync::Arc;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let batch = RecordBatch::try_from_iter(vec![
///     ("a", Arc::new(Int64Array::from(vec![1, 1, 0, 0])) as ArrayRef),
/// ])?;
/// let digest = pastry::dataset::fingerprint(&batch, None)?;
/// assert_eq!(digest.len(), 40);
/// assert_eq!(digest, pastry::dataset::fingerprint(&batch, None)?);
/// # Ok(())
/// # }
/// ```
pub fn fingerprint(dataset: &RecordBatch, test_set: Option<&RecordBatch>) -> Result<String> {
    fingerprint_with_block_size(dataset, test_set, BLOCK_SIZE)
}

/// Fingerprint with an explicit streaming block size.
///
/// The block size changes how the bytes are fed to the hasher, never the
/// digest itself.
///
/// # Errors
/// Returns `InvalidInput` if `block_size` is zero, or a Parquet error if the
/// encoding fails.
pub fn fingerprint_with_block_size(
    dataset: &RecordBatch,
    test_set: Option<&RecordBatch>,
    block_size: usize,
) -> Result<String> {
    if block_size == 0 {
        return Err(Error::InvalidInput(
            "block_size must be greater than 0".to_string(),
        ));
    }

    let mut buffer = Vec::new();
    encode_parquet(dataset, &mut buffer)?;
    if let Some(test_set) = test_set {
        encode_parquet(test_set, &mut buffer)?;
    }

    Ok(bytes_digest(&buffer, block_size))
}

/// Append the Parquet encoding of `batch` to `buffer`.
fn encode_parquet(batch: &RecordBatch, buffer: &mut Vec<u8>) -> Result<()> {
    let mut writer = ArrowWriter::try_new(buffer, batch.schema(), None)?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// SHA-1 of `data`, fed in `block_size` chunks, hex-encoded.
fn bytes_digest(data: &[u8], block_size: usize) -> String {
    let mut hasher = Sha1::new();
    for block in data.chunks(block_size) {
        hasher.update(block);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_data::ints;

    #[test]
    fn test_bytes_digest_known_vector() {
        // SHA-1("abc")
        assert_eq!(
            bytes_digest(b"abc", BLOCK_SIZE),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn test_bytes_digest_block_size_independent() {
        let data: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let reference = bytes_digest(&data, BLOCK_SIZE);
        for block in [1, 7, 64, 4096] {
            assert_eq!(bytes_digest(&data, block), reference);
        }
    }

    #[test]
    fn test_fingerprint_deterministic() {
        let batch = ints(&[("a", vec![1, 1, 0, 0]), ("b", vec![1, 1, 0, 0])]);
        let first = fingerprint(&batch, None).unwrap();
        let second = fingerprint(&batch, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 40);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_sensitive_to_cell_change() {
        let a = ints(&[("a", vec![1, 1, 0, 0])]);
        let b = ints(&[("a", vec![1, 1, 0, 1])]);
        assert_ne!(fingerprint(&a, None).unwrap(), fingerprint(&b, None).unwrap());
    }

    #[test]
    fn test_fingerprint_sensitive_to_column_order() {
        let a = ints(&[("a", vec![1, 2]), ("b", vec![3, 4])]);
        let b = ints(&[("b", vec![3, 4]), ("a", vec![1, 2])]);
        assert_ne!(fingerprint(&a, None).unwrap(), fingerprint(&b, None).unwrap());
    }

    #[test]
    fn test_fingerprint_includes_test_set() {
        let train = ints(&[("a", vec![1, 2])]);
        let test = ints(&[("a", vec![3])]);
        let without = fingerprint(&train, None).unwrap();
        let with = fingerprint(&train, Some(&test)).unwrap();
        assert_ne!(without, with);
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let batch = ints(&[("a", vec![1])]);
        assert!(fingerprint_with_block_size(&batch, None, 0).is_err());
    }
}
