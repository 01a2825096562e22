//! Evaluation orchestration
//!
//! [`evaluate`] turns an [`Experiment`] into a [`RunRecord`]: split, fit and
//! score every fold in parallel, then aggregate. [`ExperimentRunner`] wraps
//! that with the dirty-repository guard, persistence and display refresh.

use super::display::ResultsDisplay;
use super::repo_state::RepoState;
use super::results::ResultsStore;
use super::run_record::{DatasetInfo, ModelInfo, RepoInfo, RunRecord};
use super::Experiment;
use crate::config::{PastryConfig, DEFAULT_MAX_PARAM_BYTES};
use crate::predictor::Predictor;
use crate::scoring::{fit_and_score, summarize, FoldOutcome};
use crate::split::{Fold, FoldSplitter};
use crate::{Error, Result};
use chrono::Utc;
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runtime knobs for an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationSettings {
    /// Dedicated worker pool size; `None` uses rayon's global pool
    pub max_workers: Option<usize>,
    /// Size cap for recorded hyperparameter values
    pub max_param_bytes: usize,
}

impl Default for EvaluationSettings {
    fn default() -> Self {
        Self {
            max_workers: None,
            max_param_bytes: DEFAULT_MAX_PARAM_BYTES,
        }
    }
}

impl From<&PastryConfig> for EvaluationSettings {
    fn from(config: &PastryConfig) -> Self {
        Self {
            max_workers: config.max_workers,
            max_param_bytes: config.max_param_bytes,
        }
    }
}

/// Outcome of evaluating an experiment.
#[derive(Debug)]
pub struct Evaluation {
    /// Scores and metadata, not yet persisted
    pub record: RunRecord,
    /// One fitted predictor per fold, in fold order
    pub predictors: Vec<Box<dyn Predictor>>,
}

/// Evaluate with default settings.
///
/// # Errors
/// See [`evaluate_with`].
pub fn evaluate(experiment: &Experiment) -> Result<Evaluation> {
    evaluate_with(experiment, &EvaluationSettings::default())
}

/// Split, fit and score every fold, then aggregate mean and SEM per metric.
///
/// Folds run in parallel. The first failing fold aborts the evaluation and
/// is reported as [`Error::FoldExecution`].
///
/// # Errors
/// - Design or split failures (including group leakage)
/// - `FoldExecution` wrapping any fit, predict or metric failure
/// - `Other` if the worker pool cannot be created
pub fn evaluate_with(experiment: &Experiment, settings: &EvaluationSettings) -> Result<Evaluation> {
    let run_start = Utc::now();

    let design = experiment.design()?;
    let splitter = FoldSplitter::for_experiment(experiment, &design);
    let folds = splitter.split(design.n_rows(), &design.y, &design.grouping)?;
    info!(
        rows = design.n_rows(),
        protocol = splitter.name(),
        folds = splitter.n_splits(),
        predictor = experiment.predictor().type_name(),
        "Evaluating experiment"
    );

    let run_fold = |fold: &Fold| -> Result<FoldOutcome> {
        let started = Instant::now();
        let outcome = fit_and_score(
            experiment.predictor(),
            &design.x,
            &design.y,
            fold,
            design.grouping.keys(),
            experiment.scorers(),
        )
        .map_err(|e| Error::in_fold(fold.index, e))?;
        debug!(
            fold = fold.index,
            train = fold.train.len(),
            test = fold.test.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Fold scored"
        );
        Ok(outcome)
    };
    let run_all = || folds.par_iter().map(run_fold).collect::<Result<Vec<_>>>();

    let outcomes = match settings.max_workers {
        Some(workers) => rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .map_err(|e| Error::Other(format!("Failed to build worker pool: {e}")))?
            .install(run_all)?,
        None => run_all()?,
    };

    let mut detail = Vec::new();
    let mut additional_info = Vec::with_capacity(outcomes.len());
    let mut predictors = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        additional_info.push(
            experiment
                .additional_info()
                .map(|extract| extract(outcome.predictor.as_ref())),
        );
        detail.extend(outcome.entries);
        predictors.push(outcome.predictor);
    }

    let record = RunRecord::builder(
        run_start,
        ModelInfo::capture(experiment.predictor(), settings.max_param_bytes),
    )
    .summary(summarize(&detail))
    .detail(detail)
    .additional_info(additional_info)
    .finish(Utc::now());

    info!(
        seconds = record.run_seconds(),
        scores = ?record.results().test_score,
        "Evaluation finished"
    );
    Ok(Evaluation { record, predictors })
}

/// Result of a tracked run.
#[derive(Debug)]
pub struct RunOutcome {
    /// One fitted predictor per fold
    pub predictors: Vec<Box<dyn Predictor>>,
    /// Where the run record was stored
    pub location: PathBuf,
}

/// Runs experiments end to end: guard, evaluate, persist, display.
#[derive(Debug)]
pub struct ExperimentRunner<R, S, D> {
    repo: R,
    store: S,
    display: D,
    settings: EvaluationSettings,
}

impl<R: RepoState, S: ResultsStore, D: ResultsDisplay> ExperimentRunner<R, S, D> {
    /// Create a runner with default evaluation settings.
    #[must_use]
    pub fn new(repo: R, store: S, display: D) -> Self {
        Self {
            repo,
            store,
            display,
            settings: EvaluationSettings::default(),
        }
    }

    /// Replace the evaluation settings.
    #[must_use]
    pub const fn with_settings(mut self, settings: EvaluationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Get the repository state.
    #[must_use]
    pub const fn repo(&self) -> &R {
        &self.repo
    }

    /// Get the results store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Get the display.
    #[must_use]
    pub const fn display(&self) -> &D {
        &self.display
    }

    /// Evaluate `experiment` and record the run.
    ///
    /// A dirty repository aborts before any evaluation unless `force` is
    /// set; forced runs record the revision as `dirty-<revision>`. After
    /// saving, the display is refreshed from the full result listing and,
    /// if `show_results`, the last `limit` rows are printed.
    ///
    /// # Errors
    /// - `DirtyState` if the tree is dirty and `force` is false
    /// - Any evaluation, persistence or display failure
    pub fn run_experiment(
        &self,
        experiment: &Experiment,
        message: &str,
        force: bool,
        limit: Option<usize>,
        show_results: bool,
    ) -> Result<RunOutcome> {
        let dirty = self.repo.is_dirty()?;
        if dirty {
            if !force {
                return Err(Error::DirtyState);
            }
            warn!("Running with uncommitted changes; the recorded revision will be marked dirty");
        }

        let Evaluation { record, predictors } = evaluate_with(experiment, &self.settings)?;

        let repo_info = RepoInfo::new(self.repo.current_revision_id()?, dirty, message);
        let dataset_info = DatasetInfo::from_experiment(experiment)?;
        let location = self.store.save(record, dataset_info, repo_info)?;

        self.display.refresh(self.store.list()?)?;
        if show_results {
            self.display.print(limit)?;
        }

        Ok(RunOutcome {
            predictors,
            location,
        })
    }
}
