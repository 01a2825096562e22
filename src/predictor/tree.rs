//! CART decision tree classifier (Gini impurity)
//!
//! Features are cast to `f64`; class labels are compared by value. Candidate
//! thresholds are midpoints between consecutive distinct feature values.

use super::{Params, Predictor};
use crate::dataset::{feature_columns, label_values};
use crate::{Error, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::record_batch::RecordBatch;
use serde_json::json;
use std::any::Any;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        class: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone)]
struct FittedTree {
    root: Node,
    n_features: usize,
    importances: Vec<f64>,
}

/// Decision tree classifier.
#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier {
    max_depth: Option<usize>,
    min_samples_split: usize,
    tree: Option<FittedTree>,
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeClassifier {
    /// Unbounded depth, splits any node with at least two rows
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            tree: None,
        }
    }

    /// Limit tree depth
    #[must_use]
    pub const fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    /// Minimum rows a node needs before it may split (at least 2)
    #[must_use]
    pub const fn with_min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.min_samples_split = if min_samples_split < 2 { 2 } else { min_samples_split };
        self
    }

    /// Normalized impurity decrease per feature, if fitted.
    #[must_use]
    pub fn feature_importances(&self) -> Option<&[f64]> {
        self.tree.as_ref().map(|t| t.importances.as_slice())
    }

    /// Depth of the fitted tree (a single leaf has depth 0).
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        self.tree.as_ref().map(|t| node_depth(&t.root))
    }

    /// Number of leaves in the fitted tree.
    #[must_use]
    pub fn leaf_count(&self) -> Option<usize> {
        self.tree.as_ref().map(|t| node_leaves(&t.root))
    }

    fn grow(
        &self,
        features: &[Vec<f64>],
        labels: &[f64],
        rows: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> Node {
        let counts = class_counts(labels, rows);
        let class = majority(&counts);

        let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
        if counts.len() < 2 || rows.len() < self.min_samples_split || depth_reached {
            return Node::Leaf { class };
        }

        let Some(best) = best_split(features, labels, rows) else {
            return Node::Leaf { class };
        };

        importances[best.feature] += best.gain;
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&i| features[best.feature][i] <= best.threshold);

        Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(self.grow(features, labels, &left_rows, depth + 1, importances)),
            right: Box::new(self.grow(features, labels, &right_rows, depth + 1, importances)),
        }
    }
}

struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// (class, count) pairs sorted by class value
fn class_counts(labels: &[f64], rows: &[usize]) -> Vec<(f64, usize)> {
    let mut values: Vec<f64> = rows.iter().map(|&i| labels[i]).collect();
    values.sort_by(f64::total_cmp);
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for v in values {
        match counts.last_mut() {
            Some((class, n)) if class.total_cmp(&v).is_eq() => *n += 1,
            _ => counts.push((v, 1)),
        }
    }
    counts
}

/// Most frequent class; ties resolve to the smallest class value.
fn majority(counts: &[(f64, usize)]) -> f64 {
    counts
        .iter()
        .fold(None::<(f64, usize)>, |best, &(class, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((class, n)),
        })
        .map_or(0.0, |(class, _)| class)
}

#[allow(clippy::cast_precision_loss)]
fn gini(counts: &[(f64, usize)], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&(_, n)| {
            let p = n as f64 / total;
            p * p
        })
        .sum::<f64>()
}

#[allow(clippy::cast_precision_loss)]
fn best_split(features: &[Vec<f64>], labels: &[f64], rows: &[usize]) -> Option<Candidate> {
    let parent = gini(&class_counts(labels, rows), rows.len());
    let n = rows.len() as f64;
    let mut best: Option<Candidate> = None;

    for (feature, column) in features.iter().enumerate() {
        let mut ordered: Vec<usize> = rows.to_vec();
        ordered.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

        for cut in 1..ordered.len() {
            let lo = column[ordered[cut - 1]];
            let hi = column[ordered[cut]];
            if lo.total_cmp(&hi).is_eq() {
                continue;
            }
            let (left, right) = ordered.split_at(cut);
            let weighted = gini(&class_counts(labels, left), left.len()) * left.len() as f64 / n
                + gini(&class_counts(labels, right), right.len()) * right.len() as f64 / n;
            let gain = parent - weighted;
            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(Candidate {
                    feature,
                    threshold: lo + (hi - lo) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}

fn node_depth(node: &Node) -> usize {
    match node {
        Node::Leaf { .. } => 0,
        Node::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
    }
}

fn node_leaves(node: &Node) -> usize {
    match node {
        Node::Leaf { .. } => 1,
        Node::Split { left, right, .. } => node_leaves(left) + node_leaves(right),
    }
}

fn predict_row(node: &Node, features: &[Vec<f64>], row: usize) -> f64 {
    match node {
        Node::Leaf { class } => *class,
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if features[*feature][row] <= *threshold {
                predict_row(left, features, row)
            } else {
                predict_row(right, features, row)
            }
        }
    }
}

impl Predictor for DecisionTreeClassifier {
    fn type_name(&self) -> &str {
        "DecisionTreeClassifier"
    }

    fn params(&self) -> Params {
        let mut params = Params::new();
        params.insert("max_depth".to_string(), json!(self.max_depth));
        params.insert("min_samples_split".to_string(), json!(self.min_samples_split));
        params.insert("criterion".to_string(), json!("gini"));
        params
    }

    fn fit(&mut self, x: &RecordBatch, y: &ArrayRef) -> Result<()> {
        let features = feature_columns(x)?;
        let labels = label_values(y)?;
        if labels.is_empty() {
            return Err(Error::InvalidInput("Cannot fit on zero rows".to_string()));
        }
        if labels.len() != x.num_rows() {
            return Err(Error::InvalidInput(format!(
                "Got {} labels for {} rows",
                labels.len(),
                x.num_rows()
            )));
        }

        let rows: Vec<usize> = (0..labels.len()).collect();
        let mut importances = vec![0.0; features.len()];
        let root = self.grow(&features, &labels, &rows, 0, &mut importances);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }

        self.tree = Some(FittedTree {
            root,
            n_features: features.len(),
            importances,
        });
        Ok(())
    }

    fn predict(&self, x: &RecordBatch) -> Result<ArrayRef> {
        let tree = self.tree.as_ref().ok_or_else(|| {
            Error::InvalidInput("DecisionTreeClassifier is not fitted".to_string())
        })?;
        let features = feature_columns(x)?;
        if features.len() != tree.n_features {
            return Err(Error::InvalidInput(format!(
                "Model was fitted on {} features, got {}",
                tree.n_features,
                features.len()
            )));
        }

        let predictions: Vec<f64> = (0..x.num_rows())
            .map(|row| predict_row(&tree.root, &features, row))
            .collect();
        Ok(Arc::new(Float64Array::from(predictions)))
    }

    fn clone_unfitted(&self) -> Box<dyn Predictor> {
        Box::new(Self {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            tree: None,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
