//! End-to-end evaluation tests
//!
//! Collaborators are replaced by in-memory fakes that count their calls.

use arrow::array::{ArrayRef, Int64Array};
use arrow::record_batch::RecordBatch;
use pastry::experiment::{
    evaluate, CacheDisplay, DatasetInfo, Experiment, ExperimentRunner, RepoInfo, RepoState,
    ResultIter, ResultsDisplay, ResultsRepo, ResultsStore, RunRecord, RunResult,
};
use pastry::predictor::{DecisionTreeClassifier, DummyPredictor, Predictor};
use pastry::scoring::{Scorer, Scores};
use pastry::split::{GroupShuffleSplit, KFold, ShuffleSplit, StratifiedShuffleSplit};
use pastry::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Fakes
// ============================================================================

struct FakeRepo {
    dirty: bool,
}

impl RepoState for FakeRepo {
    fn is_dirty(&self) -> pastry::Result<bool> {
        Ok(self.dirty)
    }

    fn current_revision_id(&self) -> pastry::Result<String> {
        Ok("abc123".to_string())
    }
}

#[derive(Default)]
struct MemoryStore {
    saved: Mutex<Vec<RunRecord>>,
}

impl MemoryStore {
    fn save_count(&self) -> usize {
        self.saved.lock().unwrap().len()
    }

    fn last(&self) -> RunRecord {
        self.saved.lock().unwrap().last().cloned().unwrap()
    }
}

impl ResultsStore for MemoryStore {
    fn save(
        &self,
        mut record: RunRecord,
        dataset: DatasetInfo,
        repo: RepoInfo,
    ) -> pastry::Result<PathBuf> {
        let mut saved = self.saved.lock().unwrap();
        let path = PathBuf::from(format!("memory/{}.json", saved.len()));
        record.attach_provenance(dataset, repo);
        record.set_path(&path);
        saved.push(record);
        Ok(path)
    }

    fn list(&self) -> pastry::Result<ResultIter<'_>> {
        let records = self.saved.lock().unwrap().clone();
        Ok(Box::new(records.into_iter().map(|record| {
            let path = record.path().map(PathBuf::from).unwrap_or_default();
            Ok(RunResult { record, path })
        })))
    }
}

#[derive(Default)]
struct CountingDisplay {
    refreshed_with: AtomicUsize,
    refreshes: AtomicUsize,
    prints: Mutex<Vec<Option<usize>>>,
}

impl ResultsDisplay for CountingDisplay {
    fn refresh(&self, results: ResultIter<'_>) -> pastry::Result<()> {
        let count = results.collect::<pastry::Result<Vec<_>>>()?.len();
        self.refreshed_with.store(count, Ordering::SeqCst);
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn print(&self, limit: Option<usize>) -> pastry::Result<()> {
        self.prints.lock().unwrap().push(limit);
        Ok(())
    }
}

fn runner(dirty: bool) -> ExperimentRunner<FakeRepo, MemoryStore, CountingDisplay> {
    ExperimentRunner::new(
        FakeRepo { dirty },
        MemoryStore::default(),
        CountingDisplay::default(),
    )
}

// ============================================================================
// Data
// ============================================================================

fn table(columns: Vec<(&str, Vec<i64>)>) -> RecordBatch {
    RecordBatch::try_from_iter(
        columns
            .into_iter()
            .map(|(name, values)| (name, Arc::new(Int64Array::from(values)) as ArrayRef)),
    )
    .unwrap()
}

fn alternating(n: i64) -> RecordBatch {
    table(vec![
        ("feature", vec![0; n as usize]),
        ("label", (0..n).map(|i| i % 2).collect()),
    ])
}

fn simple_experiment() -> Experiment {
    Experiment::builder(alternating(10), "label", DummyPredictor::constant(1.0))
        .cross_validator(KFold::new(2).with_seed(1))
        .scorer(Scorer::accuracy())
        .build()
        .unwrap()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_protocol_options_are_mutually_exclusive() {
    let both = Experiment::builder(alternating(4), "label", DummyPredictor::constant(1.0))
        .cross_validator(KFold::new(2))
        .test_set(alternating(4))
        .scorer(Scorer::accuracy())
        .build();
    assert!(matches!(both, Err(Error::Configuration(_))));

    let neither = Experiment::builder(alternating(4), "label", DummyPredictor::constant(1.0))
        .scorer(Scorer::accuracy())
        .build();
    assert!(matches!(neither, Err(Error::Configuration(_))));
}

// ============================================================================
// Aggregation
// ============================================================================

#[test]
fn test_perfect_single_fold_has_zero_sem() {
    let data = table(vec![("feature", vec![0; 8]), ("label", vec![1; 8])]);
    let exp = Experiment::builder(data, "label", DummyPredictor::constant(1.0))
        .cross_validator(ShuffleSplit::new(1, 0.25).with_seed(3))
        .scorer(Scorer::accuracy())
        .build()
        .unwrap();

    let evaluation = evaluate(&exp).unwrap();
    let results = evaluation.record.results();
    assert_eq!(results.test_score["accuracy_score"], 1.0);
    assert_eq!(results.test_score_sem["accuracy_score"], 0.0);
}

#[test]
fn test_multiple_scorers_aggregate_independently() {
    let data = table(vec![("feature", vec![0; 4]), ("label", vec![1, 0, 1, 0])]);
    let exp = Experiment::builder(data, "label", DummyPredictor::constant(1.0))
        .cross_validator(KFold::new(2).without_shuffle())
        .scorers([Scorer::accuracy(), Scorer::precision()])
        .build()
        .unwrap();

    let results = evaluate(&exp).unwrap().record.results().clone();
    let expected_mean = [("accuracy_score".to_string(), 0.5), ("precision_score".to_string(), 0.5)];
    let expected_sem = [("accuracy_score".to_string(), 0.0), ("precision_score".to_string(), 0.0)];
    assert_eq!(results.test_score, expected_mean.into_iter().collect::<Scores>());
    assert_eq!(results.test_score_sem, expected_sem.into_iter().collect::<Scores>());
}

#[test]
fn test_grouped_scores_weight_each_group() {
    // 50 groups of two rows each; every group holds one 0 and one 1 label
    let n = 100;
    let data = table(vec![
        ("feature", vec![0; n]),
        ("label", (0..n as i64).map(|i| i % 2).collect()),
        ("group", (0..n as i64).map(|i| i / 2).collect()),
    ]);
    let exp = Experiment::builder(data, "label", DummyPredictor::constant(1.0))
        .cross_validator(GroupShuffleSplit::new(1, 0.5).with_seed(11))
        .group_column("group")
        .scorer(Scorer::accuracy())
        .build()
        .unwrap();

    let evaluation = evaluate(&exp).unwrap();
    let results = evaluation.record.results();
    assert_eq!(results.detail.len(), 25);
    assert!(results.detail.iter().all(|entry| entry.group.is_some()));
    assert!((results.test_score["accuracy_score"] - 0.5).abs() < 1e-12);
    assert_eq!(results.test_score_sem["accuracy_score"], 0.0);
}

#[test]
fn test_leaky_splitter_rejected_for_group_column() {
    let data = table(vec![
        ("feature", vec![0; 8]),
        ("label", vec![0, 1, 0, 1, 0, 1, 0, 1]),
        ("group", vec![0, 0, 1, 1, 2, 2, 3, 3]),
    ]);
    let exp = Experiment::builder(data, "label", DummyPredictor::constant(1.0))
        .cross_validator(KFold::new(8).without_shuffle())
        .group_column("group")
        .scorer(Scorer::accuracy())
        .build()
        .unwrap();

    assert!(matches!(evaluate(&exp), Err(Error::Configuration(_))));
}

#[test]
fn test_instance_averaging_scores_every_row() {
    let exp = Experiment::builder(alternating(6), "label", DummyPredictor::constant(1.0))
        .cross_validator(KFold::new(3).with_seed(5))
        .average_scores_on_instances(true)
        .scorer(Scorer::accuracy())
        .build()
        .unwrap();

    let results = evaluate(&exp).unwrap().record.results().clone();
    assert_eq!(results.detail.len(), 6);
    // Per-row accuracy is 0 or 1; three of six rows are labelled 1
    assert!((results.test_score["accuracy_score"] - 0.5).abs() < 1e-12);
    let expected_sem = (0.3_f64).sqrt() / 6.0_f64.sqrt();
    assert!((results.test_score_sem["accuracy_score"] - expected_sem).abs() < 1e-12);
}

#[test]
fn test_held_out_mode_uses_single_fold() {
    let train = table(vec![("a", vec![0, 0, 1, 1]), ("b", vec![0, 0, 1, 1])]);
    let test = table(vec![("a", vec![0, 1]), ("b", vec![0, 1])]);
    let exp = Experiment::builder(train, "b", DecisionTreeClassifier::new())
        .test_set(test)
        .scorer(Scorer::accuracy())
        .build()
        .unwrap();

    let evaluation = evaluate(&exp).unwrap();
    assert_eq!(evaluation.predictors.len(), 1);
    assert_eq!(evaluation.record.results().detail.len(), 1);
    assert_eq!(evaluation.record.results().test_score["accuracy_score"], 1.0);
}

#[test]
fn test_additional_info_one_entry_per_fold() {
    let exp = Experiment::builder(alternating(12), "label", DecisionTreeClassifier::new())
        .cross_validator(KFold::new(3).with_seed(2))
        .scorer(Scorer::accuracy())
        .additional_info(|fitted: &dyn Predictor| {
            let tree = fitted
                .as_any()
                .downcast_ref::<DecisionTreeClassifier>()
                .unwrap();
            serde_json::json!({ "leaves": tree.leaf_count() })
        })
        .build()
        .unwrap();

    let record = evaluate(&exp).unwrap().record;
    assert_eq!(record.additional_info().len(), 3);
    assert!(record
        .additional_info()
        .iter()
        .all(|info| info.as_ref().is_some_and(|v| v["leaves"].is_number())));
}

// ============================================================================
// Runner
// ============================================================================

#[test]
fn test_dirty_repo_aborts_before_saving() {
    let runner = runner(true);
    let result = runner.run_experiment(&simple_experiment(), "msg", false, None, true);

    assert!(matches!(result, Err(Error::DirtyState)));
    assert_eq!(runner.store().save_count(), 0);
    assert_eq!(runner.display().refreshes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failing_fold_persists_nothing() {
    let exp = Experiment::builder(alternating(10), "label", DummyPredictor::constant(1.0))
        .cross_validator(KFold::new(2).with_seed(1))
        .scorer(Scorer::new(
            "broken",
            |_: &[f64], _: &[f64]| Err(Error::Other("metric exploded".into())),
            true,
        ))
        .build()
        .unwrap();

    let runner = runner(false);
    let result = runner.run_experiment(&exp, "msg", false, None, true);

    assert!(matches!(result, Err(Error::FoldExecution { .. })));
    assert_eq!(runner.store().save_count(), 0);
    assert_eq!(runner.display().refreshes.load(Ordering::SeqCst), 0);
    assert!(runner.display().prints.lock().unwrap().is_empty());
}

#[test]
fn test_zero_iteration_protocol_persists_nothing() {
    let exp = Experiment::builder(alternating(10), "label", DummyPredictor::constant(1.0))
        .cross_validator(ShuffleSplit::new(0, 0.5))
        .scorer(Scorer::accuracy())
        .build()
        .unwrap();

    assert!(matches!(evaluate(&exp), Err(Error::InvalidInput(_))));

    let runner = runner(false);
    assert!(runner
        .run_experiment(&exp, "msg", false, None, false)
        .is_err());
    assert_eq!(runner.store().save_count(), 0);
}

#[test]
fn test_forced_dirty_run_is_tagged() {
    let runner = runner(true);
    runner
        .run_experiment(&simple_experiment(), "try something", true, None, false)
        .unwrap();

    let repo = runner.store().last().repo().cloned().unwrap();
    assert_eq!(repo.revision, "dirty-abc123");
    assert!(repo.dirty);
    assert_eq!(repo.summary, "try something");
}

#[test]
fn test_clean_run_saves_refreshes_and_prints() {
    let runner = runner(false);
    let outcome = runner
        .run_experiment(&simple_experiment(), "baseline", false, Some(3), true)
        .unwrap();
    runner
        .run_experiment(&simple_experiment(), "again", false, None, false)
        .unwrap();

    assert_eq!(outcome.location, PathBuf::from("memory/0.json"));
    assert_eq!(outcome.predictors.len(), 2);
    assert_eq!(runner.store().save_count(), 2);

    let display = runner.display();
    assert_eq!(display.refreshes.load(Ordering::SeqCst), 2);
    assert_eq!(display.refreshed_with.load(Ordering::SeqCst), 2);
    assert_eq!(*display.prints.lock().unwrap(), vec![Some(3)]);

    let record = runner.store().last();
    assert_eq!(record.repo().unwrap().revision, "abc123");
    let dataset = record.dataset().unwrap();
    assert_eq!(dataset.hash.len(), 40);
    assert_eq!(dataset.columns, vec!["feature", "label"]);
    assert_eq!(dataset.rows, 10);
}

#[test]
fn test_end_to_end_persisted_record() {
    let workspace = tempfile::tempdir().unwrap();
    let data = table(vec![("a", vec![1, 1, 0, 0]), ("b", vec![1, 1, 0, 0])]);
    let exp = Experiment::builder(data, "b", DecisionTreeClassifier::new())
        .cross_validator(StratifiedShuffleSplit::new(1, 0.5).with_seed(0))
        .scorer(Scorer::accuracy())
        .build()
        .unwrap();

    let runner = ExperimentRunner::new(
        FakeRepo { dirty: false },
        ResultsRepo::new(workspace.path().join("results")),
        CacheDisplay::new(workspace.path().join("display.txt")),
    );
    let outcome = runner
        .run_experiment(&exp, "tree", false, None, false)
        .unwrap();

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&outcome.location).unwrap()).unwrap();
    assert_eq!(stored["results"]["test_score"]["accuracy_score"], 1.0);
    assert_eq!(stored["model_info"]["type"], "DecisionTreeClassifier");
    assert_eq!(stored["repo"]["revision"], "abc123");
    assert_eq!(
        stored["path"].as_str().map(PathBuf::from),
        Some(outcome.location.clone())
    );

    let table = std::fs::read_to_string(workspace.path().join("display.txt")).unwrap();
    assert_eq!(table.lines().count(), 2);
    assert!(table.contains("1.000 ± 0.000"));
}
