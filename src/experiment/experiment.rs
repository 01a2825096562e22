//! Experiment - immutable description of one evaluation

use crate::dataset::{column, concat, drop_columns, value_keys};
use crate::predictor::Predictor;
use crate::scoring::Scorer;
use crate::split::{CrossValidator, FoldSplitter, Grouping};
use crate::{Error, Result};
use arrow::array::ArrayRef;
use arrow::record_batch::RecordBatch;
use std::fmt;
use std::sync::Arc;

/// Extracts per-fold diagnostics from a fitted predictor
pub type AdditionalInfoFn = Arc<dyn Fn(&dyn Predictor) -> serde_json::Value + Send + Sync>;

/// Experiment: dataset, predictor, protocol and scorers.
///
/// Built once with [`Experiment::builder`], which validates every
/// combination of options; nothing can be changed afterwards.
pub struct Experiment {
    dataset: RecordBatch,
    label_column: String,
    predictor: Box<dyn Predictor>,
    cross_validator: Option<Box<dyn CrossValidator>>,
    test_set: Option<RecordBatch>,
    scorers: Vec<Scorer>,
    group_column: Option<String>,
    average_scores_on_instances: bool,
    additional_info: Option<AdditionalInfoFn>,
}

impl fmt::Debug for Experiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Experiment")
            .field("rows", &self.dataset.num_rows())
            .field("label_column", &self.label_column)
            .field("predictor", &self.predictor.type_name())
            .field("cross_validator", &self.cross_validator)
            .field("test_rows", &self.test_set.as_ref().map(RecordBatch::num_rows))
            .field("scorers", &self.scorers)
            .field("group_column", &self.group_column)
            .field("average_scores_on_instances", &self.average_scores_on_instances)
            .field("additional_info", &self.additional_info.is_some())
            .finish()
    }
}

/// Evaluation view of an experiment's data.
#[derive(Debug, Clone)]
pub struct Design {
    /// Feature columns (label and group columns removed)
    pub x: RecordBatch,
    /// Label column
    pub y: ArrayRef,
    /// Resolved grouping
    pub grouping: Grouping,
    /// Rows originating from the dataset; any remainder came from the test set
    pub dataset_rows: usize,
}

impl Design {
    /// Total rows across dataset and test set.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.x.num_rows()
    }
}

impl Experiment {
    /// Start building an experiment over `dataset`, predicting `label_column`.
    #[must_use]
    pub fn builder(
        dataset: RecordBatch,
        label_column: impl Into<String>,
        predictor: impl Predictor + 'static,
    ) -> ExperimentBuilder {
        ExperimentBuilder::new(dataset, label_column, Box::new(predictor))
    }

    /// Get the dataset.
    #[must_use]
    pub const fn dataset(&self) -> &RecordBatch {
        &self.dataset
    }

    /// Get the label column name.
    #[must_use]
    pub fn label_column(&self) -> &str {
        &self.label_column
    }

    /// Get the predictor template (never fitted itself).
    #[must_use]
    pub fn predictor(&self) -> &dyn Predictor {
        self.predictor.as_ref()
    }

    /// Get the cross-validation protocol, if any.
    #[must_use]
    pub fn cross_validator(&self) -> Option<&dyn CrossValidator> {
        self.cross_validator.as_deref()
    }

    /// Get the held-out test set, if any.
    #[must_use]
    pub const fn test_set(&self) -> Option<&RecordBatch> {
        self.test_set.as_ref()
    }

    /// Get the scorers.
    #[must_use]
    pub fn scorers(&self) -> &[Scorer] {
        &self.scorers
    }

    /// Get the group column name, if any.
    #[must_use]
    pub fn group_column(&self) -> Option<&str> {
        self.group_column.as_deref()
    }

    /// Whether every instance is scored as its own group.
    #[must_use]
    pub const fn average_scores_on_instances(&self) -> bool {
        self.average_scores_on_instances
    }

    /// Get the additional-info extractor, if any.
    #[must_use]
    pub fn additional_info(&self) -> Option<&AdditionalInfoFn> {
        self.additional_info.as_ref()
    }

    /// Build the evaluation view: the dataset followed by the test set,
    /// split into features, labels and groups.
    ///
    /// # Errors
    /// Returns error if the tables cannot be combined or projected.
    pub fn design(&self) -> Result<Design> {
        let data = match &self.test_set {
            Some(test_set) => concat(&self.dataset, test_set)?,
            None => self.dataset.clone(),
        };

        let y = column(&data, &self.label_column)?;

        let mut dropped = vec![self.label_column.as_str()];
        let grouping = if let Some(group_column) = &self.group_column {
            dropped.push(group_column);
            Grouping::Column(value_keys(&column(&data, group_column)?)?)
        } else if self.average_scores_on_instances {
            Grouping::per_instance(data.num_rows())
        } else {
            Grouping::None
        };

        Ok(Design {
            x: drop_columns(&data, &dropped)?,
            y,
            grouping,
            dataset_rows: self.dataset.num_rows(),
        })
    }
}

impl<'a> FoldSplitter<'a> {
    /// Choose the fold source for `experiment` over its `design`.
    ///
    /// Exactly one of cross-validator and test set is present on a built
    /// experiment; the test set wins only when there is no cross-validator,
    /// and its rows are the ones after `design.dataset_rows`.
    #[must_use]
    pub fn for_experiment(experiment: &'a Experiment, design: &Design) -> Self {
        experiment.cross_validator().map_or(
            Self::HeldOut {
                train_rows: design.dataset_rows,
            },
            Self::CrossValidation,
        )
    }
}

/// Builder for `Experiment`.
pub struct ExperimentBuilder {
    dataset: RecordBatch,
    label_column: String,
    predictor: Box<dyn Predictor>,
    cross_validator: Option<Box<dyn CrossValidator>>,
    test_set: Option<RecordBatch>,
    scorers: Vec<Scorer>,
    group_column: Option<String>,
    average_scores_on_instances: bool,
    additional_info: Option<AdditionalInfoFn>,
}

impl fmt::Debug for ExperimentBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExperimentBuilder")
            .field("label_column", &self.label_column)
            .field("predictor", &self.predictor.type_name())
            .field("scorers", &self.scorers.len())
            .finish_non_exhaustive()
    }
}

impl ExperimentBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(
        dataset: RecordBatch,
        label_column: impl Into<String>,
        predictor: Box<dyn Predictor>,
    ) -> Self {
        Self {
            dataset,
            label_column: label_column.into(),
            predictor,
            cross_validator: None,
            test_set: None,
            scorers: Vec::new(),
            group_column: None,
            average_scores_on_instances: false,
            additional_info: None,
        }
    }

    /// Evaluate with a cross-validation protocol.
    #[must_use]
    pub fn cross_validator(mut self, cv: impl CrossValidator + 'static) -> Self {
        self.cross_validator = Some(Box::new(cv));
        self
    }

    /// Evaluate on a held-out test set with the dataset's schema.
    #[must_use]
    pub fn test_set(mut self, test_set: RecordBatch) -> Self {
        self.test_set = Some(test_set);
        self
    }

    /// Add a scorer.
    #[must_use]
    pub fn scorer(mut self, scorer: Scorer) -> Self {
        self.scorers.push(scorer);
        self
    }

    /// Add several scorers.
    #[must_use]
    pub fn scorers(mut self, scorers: impl IntoIterator<Item = Scorer>) -> Self {
        self.scorers.extend(scorers);
        self
    }

    /// Group instances by this column for splitting and scoring.
    #[must_use]
    pub fn group_column(mut self, name: impl Into<String>) -> Self {
        self.group_column = Some(name.into());
        self
    }

    /// Score each test instance as its own group.
    #[must_use]
    pub const fn average_scores_on_instances(mut self, enabled: bool) -> Self {
        self.average_scores_on_instances = enabled;
        self
    }

    /// Record `extract(fitted_predictor)` for every fold.
    #[must_use]
    pub fn additional_info<F>(mut self, extract: F) -> Self
    where
        F: Fn(&dyn Predictor) -> serde_json::Value + Send + Sync + 'static,
    {
        self.additional_info = Some(Arc::new(extract));
        self
    }

    /// Validate and build the `Experiment`.
    ///
    /// # Errors
    /// Returns `Configuration` when:
    /// - both or neither of cross-validator and test set are set
    /// - no scorer is given
    /// - the label or group column is missing, or they coincide
    /// - a group column is combined with per-instance averaging
    /// - the test set schema differs from the dataset schema
    pub fn build(self) -> Result<Experiment> {
        match (&self.cross_validator, &self.test_set) {
            (Some(_), Some(_)) => {
                return Err(Error::Configuration(
                    "Specify either a cross validator or a test set, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(Error::Configuration(
                    "Either a cross validator or a test set must be specified".to_string(),
                ))
            }
            _ => {}
        }

        if self.scorers.is_empty() {
            return Err(Error::Configuration(
                "At least one scorer is required".to_string(),
            ));
        }

        let schema = self.dataset.schema();
        if schema.field_with_name(&self.label_column).is_err() {
            return Err(Error::Configuration(format!(
                "Label column '{}' not found in dataset",
                self.label_column
            )));
        }

        if let Some(group_column) = &self.group_column {
            if self.average_scores_on_instances {
                return Err(Error::Configuration(
                    "A group column cannot be combined with averaging scores on instances"
                        .to_string(),
                ));
            }
            if *group_column == self.label_column {
                return Err(Error::Configuration(format!(
                    "Group column '{group_column}' is also the label column"
                )));
            }
            if schema.field_with_name(group_column).is_err() {
                return Err(Error::Configuration(format!(
                    "Group column '{group_column}' not found in dataset"
                )));
            }
        }

        if let Some(test_set) = &self.test_set {
            if test_set.schema() != schema {
                return Err(Error::Configuration(
                    "Test set columns must match the dataset columns".to_string(),
                ));
            }
        }

        Ok(Experiment {
            dataset: self.dataset,
            label_column: self.label_column,
            predictor: self.predictor,
            cross_validator: self.cross_validator,
            test_set: self.test_set,
            scorers: self.scorers,
            group_column: self.group_column,
            average_scores_on_instances: self.average_scores_on_instances,
            additional_info: self.additional_info,
        })
    }
}
