//! CART decision tree
//!
//! Classification trees carry class-index leaves; regression trees (mean
//! leaves, MSE splits) exist as the base learner for gradient boosting.

use crate::error::{HarbenchError, Result};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Split impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Entropy (classification)
    Entropy,
    /// Mean squared error (regression, used by boosting)
    Mse,
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub criterion: Criterion,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
    is_classification: bool,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::Gini,
            n_features: 0,
            feature_importances: None,
            is_classification: true,
        }
    }

    pub fn new_regressor() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::Mse,
            n_features: 0,
            feature_importances: None,
            is_classification: false,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Fit the tree to training data.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(HarbenchError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples < self.min_samples_split {
            return Err(HarbenchError::TrainingError(format!(
                "need at least {} samples, got {}",
                self.min_samples_split, n_samples
            )));
        }

        self.n_features = n_features;

        let mut importances = vec![0.0; n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();

        let should_stop = n_samples < self.min_samples_split
            || n_samples <= self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || self.is_pure(&y_subset);

        if should_stop {
            return TreeNode::Leaf {
                value: self.compute_leaf_value(&y_subset),
                n_samples,
            };
        }

        if let Some((best_feature, best_threshold, best_gain)) = self.find_best_split(x, y, indices)
        {
            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .partition(|&&i| x[[i, best_feature]] <= best_threshold);

            if left_indices.len() < self.min_samples_leaf
                || right_indices.len() < self.min_samples_leaf
            {
                return TreeNode::Leaf {
                    value: self.compute_leaf_value(&y_subset),
                    n_samples,
                };
            }

            let parent_impurity = self.compute_impurity(&y_subset);
            let left_y: Vec<f64> = left_indices.iter().map(|&i| y[i]).collect();
            let right_y: Vec<f64> = right_indices.iter().map(|&i| y[i]).collect();
            let weighted_child_impurity = (left_indices.len() as f64
                * self.compute_impurity(&left_y)
                + right_indices.len() as f64 * self.compute_impurity(&right_y))
                / n_samples as f64;
            importances[best_feature] +=
                n_samples as f64 * (parent_impurity - weighted_child_impurity);

            let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances));
            let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances));

            TreeNode::Split {
                feature_idx: best_feature,
                threshold: best_threshold,
                left,
                right,
                n_samples,
                impurity: best_gain,
            }
        } else {
            TreeNode::Leaf {
                value: self.compute_leaf_value(&y_subset),
                n_samples,
            }
        }
    }

    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
    ) -> Option<(usize, f64, f64)> {
        let n_features = x.ncols();

        let y_subset: Vec<f64> = indices.iter().map(|&i| y[i]).collect();
        let parent_impurity = self.compute_impurity(&y_subset);

        // Each feature independently finds its best split; scan in parallel.
        let feature_results: Vec<Option<(usize, f64, f64)>> = (0..n_features)
            .into_par_iter()
            .map(|feature_idx| {
                let mut values: Vec<f64> =
                    indices.iter().map(|&i| x[[i, feature_idx]]).collect();
                values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                values.dedup();

                let mut best_gain = 0.0f64;
                let mut best_threshold = 0.0f64;

                for window in values.windows(2) {
                    let threshold = (window[0] + window[1]) / 2.0;

                    let mut left_count = 0usize;
                    let mut right_count = 0usize;
                    let mut left_sum = 0.0f64;
                    let mut right_sum = 0.0f64;
                    let mut left_sq_sum = 0.0f64;
                    let mut right_sq_sum = 0.0f64;
                    let mut left_class_counts: HashMap<i64, usize> = HashMap::new();
                    let mut right_class_counts: HashMap<i64, usize> = HashMap::new();

                    for &idx in indices {
                        let yi = y[idx];
                        if x[[idx, feature_idx]] <= threshold {
                            left_count += 1;
                            left_sum += yi;
                            left_sq_sum += yi * yi;
                            *left_class_counts.entry(yi.round() as i64).or_insert(0) += 1;
                        } else {
                            right_count += 1;
                            right_sum += yi;
                            right_sq_sum += yi * yi;
                            *right_class_counts.entry(yi.round() as i64).or_insert(0) += 1;
                        }
                    }

                    if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                        continue;
                    }

                    let left_impurity = self.impurity_from_stats(
                        left_count,
                        left_sum,
                        left_sq_sum,
                        &left_class_counts,
                    );
                    let right_impurity = self.impurity_from_stats(
                        right_count,
                        right_sum,
                        right_sq_sum,
                        &right_class_counts,
                    );

                    let n = indices.len() as f64;
                    let weighted_impurity =
                        (left_count as f64 * left_impurity + right_count as f64 * right_impurity)
                            / n;

                    let gain = parent_impurity - weighted_impurity;
                    if gain > best_gain {
                        best_gain = gain;
                        best_threshold = threshold;
                    }
                }

                if best_gain > 0.0 {
                    Some((feature_idx, best_threshold, best_gain))
                } else {
                    None
                }
            })
            .collect();

        feature_results
            .into_iter()
            .flatten()
            .max_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal))
    }

    /// Impurity from pre-accumulated split statistics.
    fn impurity_from_stats(
        &self,
        count: usize,
        sum: f64,
        sq_sum: f64,
        class_counts: &HashMap<i64, usize>,
    ) -> f64 {
        if count == 0 {
            return 0.0;
        }
        let n = count as f64;
        match self.criterion {
            Criterion::Gini => {
                let mut gini = 1.0;
                for &c in class_counts.values() {
                    let p = c as f64 / n;
                    gini -= p * p;
                }
                gini
            }
            Criterion::Entropy => {
                let mut entropy = 0.0;
                for &c in class_counts.values() {
                    if c > 0 {
                        let p = c as f64 / n;
                        entropy -= p * p.ln();
                    }
                }
                entropy
            }
            Criterion::Mse => sq_sum / n - (sum / n).powi(2),
        }
    }

    fn compute_impurity(&self, y: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        let n = y.len() as f64;
        match self.criterion {
            Criterion::Gini | Criterion::Entropy => {
                let mut counts: HashMap<i64, usize> = HashMap::new();
                for &val in y {
                    *counts.entry(val.round() as i64).or_insert(0) += 1;
                }
                if self.criterion == Criterion::Gini {
                    1.0 - counts
                        .values()
                        .map(|&c| (c as f64 / n).powi(2))
                        .sum::<f64>()
                } else {
                    -counts
                        .values()
                        .map(|&c| {
                            let p = c as f64 / n;
                            if p > 0.0 {
                                p * p.ln()
                            } else {
                                0.0
                            }
                        })
                        .sum::<f64>()
                }
            }
            Criterion::Mse => {
                let mean = y.iter().sum::<f64>() / n;
                y.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n
            }
        }
    }

    fn is_pure(&self, y: &[f64]) -> bool {
        if y.is_empty() {
            return true;
        }
        let first = y[0];
        y.iter().all(|&v| (v - first).abs() < 1e-10)
    }

    fn compute_leaf_value(&self, y: &[f64]) -> f64 {
        if y.is_empty() {
            return 0.0;
        }
        if self.is_classification {
            let mut counts: HashMap<i64, usize> = HashMap::new();
            for &val in y {
                *counts.entry(val.round() as i64).or_insert(0) += 1;
            }
            counts
                .into_iter()
                .max_by_key(|(_, count)| *count)
                .map(|(class, _)| class as f64)
                .unwrap_or(0.0)
        } else {
            y.iter().sum::<f64>() / y.len() as f64
        }
    }

    /// Make predictions.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(HarbenchError::ModelNotFitted)?;

        let predictions: Vec<f64> = (0..x.nrows())
            .map(|i| {
                let sample = x.row(i);
                self.predict_sample(root, &sample.to_vec())
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn predict_sample(&self, node: &TreeNode, sample: &[f64]) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    self.predict_sample(left, sample)
                } else {
                    self.predict_sample(right, sample)
                }
            }
        }
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn get_depth(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => self.node_depth(node),
        }
    }

    fn node_depth(&self, node: &TreeNode) -> usize {
        match node {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => {
                1 + self.node_depth(left).max(self.node_depth(right))
            }
        }
    }

    pub fn get_n_leaves(&self) -> usize {
        match &self.root {
            None => 0,
            Some(node) => self.count_leaves(node),
        }
    }

    fn count_leaves(&self, node: &TreeNode) -> usize {
        match node {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => {
                self.count_leaves(left) + self.count_leaves(right)
            }
        }
    }

    /// Render the upper part of the tree as a text diagram for the report.
    ///
    /// `decode_leaf` maps a leaf value to a display string (class labels for
    /// classification trees).
    pub fn render<F>(&self, feature_names: &[String], max_depth: usize, decode_leaf: F) -> Result<String>
    where
        F: Fn(f64) -> String,
    {
        let root = self.root.as_ref().ok_or(HarbenchError::ModelNotFitted)?;
        let mut out = String::new();
        self.render_node(root, feature_names, &decode_leaf, "", 0, max_depth, &mut out);
        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn render_node<F>(
        &self,
        node: &TreeNode,
        feature_names: &[String],
        decode_leaf: &F,
        prefix: &str,
        depth: usize,
        max_depth: usize,
        out: &mut String,
    ) where
        F: Fn(f64) -> String,
    {
        match node {
            TreeNode::Leaf { value, n_samples } => {
                let _ = writeln!(out, "{prefix}-> {} (n={n_samples})", decode_leaf(*value));
            }
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                n_samples,
                ..
            } => {
                if depth >= max_depth {
                    let _ = writeln!(out, "{prefix}... (n={n_samples})");
                    return;
                }
                let name = feature_names
                    .get(*feature_idx)
                    .map(|s| s.as_str())
                    .unwrap_or("?");
                let _ = writeln!(out, "{prefix}{name} <= {threshold:.3} (n={n_samples})");
                let child_prefix = format!("{prefix}  ");
                self.render_node(
                    left,
                    feature_names,
                    decode_leaf,
                    &child_prefix,
                    depth + 1,
                    max_depth,
                    out,
                );
                let _ = writeln!(out, "{prefix}{name} > {threshold:.3}");
                self.render_node(
                    right,
                    feature_names,
                    decode_leaf,
                    &child_prefix,
                    depth + 1,
                    max_depth,
                    out,
                );
            }
        }
    }
}
