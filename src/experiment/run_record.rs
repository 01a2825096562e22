//! Run Record - one evaluation of one predictor

use super::Experiment;
use crate::dataset::{column_names, fingerprint};
use crate::predictor::{Params, Predictor};
use crate::scoring::{GroupScores, ScoreSummary, Scores};
use crate::Result;
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix marking a revision recorded from a dirty working tree
pub const DIRTY_PREFIX: &str = "dirty-";

/// Aggregated scores of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResults {
    /// Metric name to mean over all scoring units
    pub test_score: Scores,
    /// Metric name to standard error of the mean
    pub test_score_sem: Scores,
    /// Raw scores, one entry per fold or per group within a fold
    #[serde(default)]
    pub detail: Vec<GroupScores>,
}

/// Predictor type and hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Predictor type name
    #[serde(rename = "type")]
    pub type_name: String,
    /// Hyperparameters (oversized values dropped)
    #[serde(flatten)]
    pub params: Params,
}

impl ModelInfo {
    /// Capture `predictor`'s type and parameters, dropping any parameter whose
    /// JSON encoding is longer than `max_param_bytes`.
    #[must_use]
    pub fn capture(predictor: &dyn Predictor, max_param_bytes: usize) -> Self {
        let params = predictor
            .params()
            .into_iter()
            .filter(|(name, value)| {
                let size = value.to_string().len();
                let keep = size <= max_param_bytes;
                if !keep {
                    debug!(param = %name, size, max_param_bytes, "Dropping oversized hyperparameter");
                }
                keep
            })
            .collect();

        Self {
            type_name: predictor.type_name().to_string(),
            params,
        }
    }
}

/// Content fingerprint and shape of the evaluated data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetInfo {
    /// Full SHA-1 hex digest of dataset (and test set)
    pub hash: String,
    /// Dataset column names in schema order
    pub columns: Vec<String>,
    /// Total rows evaluated (dataset plus test set)
    pub rows: usize,
}

impl DatasetInfo {
    /// Fingerprint the experiment's dataset and test set.
    ///
    /// # Errors
    /// Returns error if the data cannot be encoded for hashing.
    pub fn from_experiment(experiment: &Experiment) -> Result<Self> {
        let dataset = experiment.dataset();
        let test_set = experiment.test_set();
        Ok(Self {
            hash: fingerprint(dataset, test_set)?,
            columns: column_names(dataset),
            rows: dataset.num_rows() + test_set.map_or(0, RecordBatch::num_rows),
        })
    }
}

/// Version-control provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    /// Revision identifier, prefixed with [`DIRTY_PREFIX`] for dirty trees
    pub revision: String,
    /// Whether the working tree had uncommitted changes
    pub dirty: bool,
    /// Free-text summary (the run message)
    pub summary: String,
}

impl RepoInfo {
    /// Build provenance, tagging the revision when the tree is dirty.
    #[must_use]
    pub fn new(revision: impl Into<String>, dirty: bool, summary: impl Into<String>) -> Self {
        let revision = revision.into();
        let revision = if dirty {
            format!("{DIRTY_PREFIX}{revision}")
        } else {
            revision
        };
        Self {
            revision,
            dirty,
            summary: summary.into(),
        }
    }
}

/// Run Record represents a single evaluation run.
///
/// The orchestrator assembles it once per evaluation; the results store
/// attaches dataset and repository provenance plus its own location when
/// persisting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    run_start: DateTime<Utc>,
    run_end: DateTime<Utc>,
    run_seconds: f64,
    results: RunResults,
    model_info: ModelInfo,
    additional_info: Vec<Option<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dataset: Option<DatasetInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    repo: Option<RepoInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
}

impl RunRecord {
    /// Create a builder for a run that started at `run_start`.
    #[must_use]
    pub fn builder(run_start: DateTime<Utc>, model_info: ModelInfo) -> RunRecordBuilder {
        RunRecordBuilder::new(run_start, model_info)
    }

    /// Get the start timestamp.
    #[must_use]
    pub const fn run_start(&self) -> DateTime<Utc> {
        self.run_start
    }

    /// Get the end timestamp.
    #[must_use]
    pub const fn run_end(&self) -> DateTime<Utc> {
        self.run_end
    }

    /// Get the elapsed wall-clock seconds.
    #[must_use]
    pub const fn run_seconds(&self) -> f64 {
        self.run_seconds
    }

    /// Get the aggregated scores.
    #[must_use]
    pub const fn results(&self) -> &RunResults {
        &self.results
    }

    /// Get the predictor type and hyperparameters.
    #[must_use]
    pub const fn model_info(&self) -> &ModelInfo {
        &self.model_info
    }

    /// Get the per-fold diagnostic payloads.
    #[must_use]
    pub fn additional_info(&self) -> &[Option<serde_json::Value>] {
        &self.additional_info
    }

    /// Get the dataset fingerprint, once attached.
    #[must_use]
    pub const fn dataset(&self) -> Option<&DatasetInfo> {
        self.dataset.as_ref()
    }

    /// Get the repository provenance, once attached.
    #[must_use]
    pub const fn repo(&self) -> Option<&RepoInfo> {
        self.repo.as_ref()
    }

    /// Get the persisted location, once saved.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Attach dataset and repository provenance.
    pub fn attach_provenance(&mut self, dataset: DatasetInfo, repo: RepoInfo) {
        self.dataset = Some(dataset);
        self.repo = Some(repo);
    }

    /// Record where this run is stored.
    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }
}

/// Builder for `RunRecord`.
#[derive(Debug)]
pub struct RunRecordBuilder {
    run_start: DateTime<Utc>,
    model_info: ModelInfo,
    summary: ScoreSummary,
    detail: Vec<GroupScores>,
    additional_info: Vec<Option<serde_json::Value>>,
}

impl RunRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(run_start: DateTime<Utc>, model_info: ModelInfo) -> Self {
        Self {
            run_start,
            model_info,
            summary: ScoreSummary::default(),
            detail: Vec::new(),
            additional_info: Vec::new(),
        }
    }

    /// Set the aggregated mean/SEM scores.
    #[must_use]
    pub fn summary(mut self, summary: ScoreSummary) -> Self {
        self.summary = summary;
        self
    }

    /// Set the raw per-unit scores.
    #[must_use]
    pub fn detail(mut self, detail: Vec<GroupScores>) -> Self {
        self.detail = detail;
        self
    }

    /// Set the per-fold diagnostic payloads.
    #[must_use]
    pub fn additional_info(mut self, info: Vec<Option<serde_json::Value>>) -> Self {
        self.additional_info = info;
        self
    }

    /// Build the `RunRecord`, closing the run at `run_end`.
    #[must_use]
    pub fn finish(self, run_end: DateTime<Utc>) -> RunRecord {
        let run_seconds = (run_end - self.run_start)
            .to_std()
            .map_or(0.0, |d| d.as_secs_f64());

        RunRecord {
            run_start: self.run_start,
            run_end,
            run_seconds,
            results: RunResults {
                test_score: self.summary.mean,
                test_score_sem: self.summary.sem,
                detail: self.detail,
            },
            model_info: self.model_info,
            additional_info: self.additional_info,
            dataset: None,
            repo: None,
            path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::DecisionTreeClassifier;
    use chrono::{Duration, TimeZone};

    fn model_info() -> ModelInfo {
        ModelInfo::capture(&DecisionTreeClassifier::new(), 1000)
    }

    #[test]
    fn test_run_seconds_from_bracketing_timestamps() {
        let start = Utc.with_ymd_and_hms(2020, 1, 31, 9, 19, 44).unwrap();
        let record = RunRecord::builder(start, model_info())
            .finish(start + Duration::milliseconds(4482));
        assert!((record.run_seconds() - 4.482).abs() < 1e-9);
        assert!(record.dataset().is_none());
        assert!(record.path().is_none());
    }

    #[test]
    fn test_model_info_serializes_type_and_flattened_params() {
        let json = serde_json::to_value(model_info()).unwrap();
        assert_eq!(json["type"], "DecisionTreeClassifier");
        assert_eq!(json["min_samples_split"], 2);
    }

    #[test]
    fn test_oversized_param_dropped() {
        #[derive(Debug)]
        struct Wide;
        impl Predictor for Wide {
            fn type_name(&self) -> &str {
                "Wide"
            }
            fn params(&self) -> Params {
                let mut p = Params::new();
                p.insert("small".into(), serde_json::json!(1));
                p.insert("huge".into(), serde_json::json!("x".repeat(5000)));
                p
            }
            fn fit(&mut self, _: &arrow::record_batch::RecordBatch, _: &arrow::array::ArrayRef) -> crate::Result<()> {
                Ok(())
            }
            fn predict(&self, _: &arrow::record_batch::RecordBatch) -> crate::Result<arrow::array::ArrayRef> {
                unimplemented!()
            }
            fn clone_unfitted(&self) -> Box<dyn Predictor> {
                Box::new(Wide)
            }
            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }

        let info = ModelInfo::capture(&Wide, 1000);
        assert!(info.params.contains_key("small"));
        assert!(!info.params.contains_key("huge"));
    }

    #[test]
    fn test_dirty_revision_tagged() {
        let clean = RepoInfo::new("abc123", false, "msg");
        let dirty = RepoInfo::new("abc123", true, "msg");
        assert_eq!(clean.revision, "abc123");
        assert_eq!(dirty.revision, "dirty-abc123");
    }

    #[test]
    fn test_record_serialization_roundtrip_keeps_provenance() {
        let start = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let mut record = RunRecord::builder(start, model_info())
            .additional_info(vec![None])
            .finish(start);
        record.attach_provenance(
            DatasetInfo {
                hash: "998c9dea0afb12d91a8c67f256f80b0a603dd59b".into(),
                columns: vec!["a".into(), "b".into()],
                rows: 4,
            },
            RepoInfo::new("abc123", false, "first run"),
        );
        record.set_path("results/result-x.json");

        let json = serde_json::to_string(&record).unwrap();
        let back: RunRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.repo().unwrap().summary, "first run");
    }
}
