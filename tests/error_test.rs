//! Tests for error types

use pastry::Error;
use std::error::Error as _;
use std::path::PathBuf;

#[test]
fn test_configuration_error() {
    let error = Error::Configuration("both set".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Configuration error"));
    assert!(error_str.contains("both set"));
}

#[test]
fn test_dirty_state_names_remediations() {
    let error_str = format!("{}", Error::DirtyState);
    assert!(error_str.contains("uncommitted changes"));
    assert!(error_str.contains("Commit"));
    assert!(error_str.contains("force"));
    assert!(error_str.contains("dirty revision"));
}

#[test]
fn test_fold_execution_keeps_source() {
    let error = Error::in_fold(3, Error::InvalidInput("NaN in feature".to_string()));
    let error_str = format!("{error}");
    assert!(error_str.contains("Fold 3 failed"));
    assert!(error_str.contains("NaN in feature"));

    let source = error.source().expect("fold errors carry their cause");
    assert!(source.to_string().contains("Invalid input"));
}

#[test]
fn test_persistence_error() {
    let error = Error::Persistence("disk full".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Persistence error"));
    assert!(error_str.contains("disk full"));
}

#[test]
fn test_corrupt_record_names_file() {
    let error = Error::CorruptRecord {
        path: PathBuf::from("results/result-1.json"),
        reason: "EOF while parsing".to_string(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("results/result-1.json"));
    assert!(error_str.contains("EOF while parsing"));
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("n_splits must be at least 2".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Invalid input"));
    assert!(error_str.contains("n_splits"));
}

#[test]
fn test_config_error() {
    let error = Error::Config("unknown field".to_string());
    assert!(format!("{error}").contains("Config error"));
}

#[test]
fn test_io_error_conversion() {
    let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let error: Error = io_error.into();
    let error_str = format!("{error}");
    assert!(error_str.contains("IO error"));
    assert!(error_str.contains("file not found"));
}

#[test]
fn test_json_error_conversion() {
    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_error.into();
    assert!(format!("{error}").contains("JSON error"));
}

#[test]
fn test_other_error() {
    let error = Error::Other("custom error message".to_string());
    assert_eq!(format!("{error}"), "custom error message");
}

#[test]
fn test_error_debug() {
    let error = Error::DirtyState;
    assert!(format!("{error:?}").contains("DirtyState"));
}
