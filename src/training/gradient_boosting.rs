//! Gradient-boosted trees
//!
//! Multiclass boosting via one-vs-rest: each class gets its own log-odds
//! booster over shallow regression trees, and prediction takes the argmax of
//! the per-class probabilities. Boosters are independent, so they train in
//! parallel with class-offset seeds.

use super::decision_tree::DecisionTree;
use crate::error::{HarbenchError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Gradient boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds per class
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Row subsample ratio per round
    pub subsample: f64,
    /// Column subsample ratio per round
    pub colsample: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            min_samples_leaf: 1,
            subsample: 0.8,
            colsample: 0.8,
            random_state: Some(42),
        }
    }
}

/// One binary log-odds booster for a single class.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ClassBooster {
    class: i64,
    trees: Vec<DecisionTree>,
    col_indices_per_tree: Vec<Vec<usize>>,
    initial_log_odds: f64,
}

impl ClassBooster {
    fn fit(
        class: i64,
        config: &GradientBoostingConfig,
        x: &Array2<f64>,
        y: &Array1<f64>,
        seed: u64,
    ) -> Result<Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        // Indicator target: 1 for this class, 0 otherwise.
        let target: Array1<f64> = y
            .iter()
            .map(|&v| if v.round() as i64 == class { 1.0 } else { 0.0 })
            .collect();

        let p = target.mean().unwrap_or(0.5).clamp(1e-10, 1.0 - 1e-10);
        let initial_log_odds = (p / (1.0 - p)).ln();

        let mut log_odds = Array1::from_elem(n_samples, initial_log_odds);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);

        let mut trees = Vec::with_capacity(config.n_estimators);
        let mut col_indices_per_tree = Vec::with_capacity(config.n_estimators);

        for _ in 0..config.n_estimators {
            let probs: Array1<f64> = log_odds.iter().map(|&lo| sigmoid(lo)).collect();

            // Gradient of the log loss.
            let residuals: Array1<f64> = target
                .iter()
                .zip(probs.iter())
                .map(|(ti, pi)| ti - pi)
                .collect();

            let sample_indices = subsample_indices(n_samples, config.subsample, &mut rng);
            let col_indices = subsample_indices(n_features, config.colsample, &mut rng);

            let x_rows = x.select(ndarray::Axis(0), &sample_indices);
            let x_sub = x_rows.select(ndarray::Axis(1), &col_indices);
            let y_sub: Array1<f64> =
                Array1::from_vec(sample_indices.iter().map(|&i| residuals[i]).collect());

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(config.max_depth)
                .with_min_samples_leaf(config.min_samples_leaf);
            tree.fit(&x_sub, &y_sub)?;

            let tree_pred = tree.predict(&x_sub)?;
            for (i, &idx) in sample_indices.iter().enumerate() {
                log_odds[idx] += config.learning_rate * tree_pred[i];
            }

            trees.push(tree);
            col_indices_per_tree.push(col_indices);
        }

        Ok(Self {
            class,
            trees,
            col_indices_per_tree,
            initial_log_odds,
        })
    }

    /// Per-sample probability of belonging to this booster's class.
    fn score(&self, x: &Array2<f64>, learning_rate: f64) -> Result<Array1<f64>> {
        let n = x.nrows();
        let mut log_odds = Array1::from_elem(n, self.initial_log_odds);

        for (tree, col_indices) in self.trees.iter().zip(self.col_indices_per_tree.iter()) {
            let x_sub = x.select(ndarray::Axis(1), col_indices);
            let tree_pred = tree.predict(&x_sub)?;
            for i in 0..n {
                log_odds[i] += learning_rate * tree_pred[i];
            }
        }

        Ok(log_odds.iter().map(|&lo| sigmoid(lo)).collect())
    }

    fn accumulate_importances(&self, into: &mut [f64]) {
        for (tree, col_indices) in self.trees.iter().zip(self.col_indices_per_tree.iter()) {
            if let Some(imp) = tree.feature_importances() {
                for (j, &col_idx) in col_indices.iter().enumerate() {
                    if j < imp.len() {
                        into[col_idx] += imp[j];
                    }
                }
            }
        }
    }
}

/// Multiclass gradient boosting classifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    boosters: Vec<ClassBooster>,
    feature_importances: Vec<f64>,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            boosters: Vec::new(),
            feature_importances: Vec::new(),
        }
    }

    /// Fit one booster per class.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(HarbenchError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        let mut classes: Vec<i64> = y.iter().map(|&v| v.round() as i64).collect();
        classes.sort_unstable();
        classes.dedup();

        if classes.len() < 2 {
            return Err(HarbenchError::TrainingError(
                "gradient boosting needs at least two classes".to_string(),
            ));
        }

        let base_seed = self.config.random_state.unwrap_or(42);
        let config = &self.config;

        self.boosters = classes
            .par_iter()
            .enumerate()
            .map(|(class_idx, &class)| {
                let seed = base_seed.wrapping_add(class_idx as u64);
                ClassBooster::fit(class, config, x, y, seed)
            })
            .collect::<Result<Vec<ClassBooster>>>()?;

        let mut importances = vec![0.0; n_features];
        for booster in &self.boosters {
            booster.accumulate_importances(&mut importances);
        }
        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = importances;

        Ok(())
    }

    /// Predict class labels (argmax of per-class probabilities).
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let proba = self.predict_proba(x)?;
        let n = x.nrows();

        let predictions: Vec<f64> = (0..n)
            .map(|i| {
                let mut best = 0usize;
                let mut best_p = f64::NEG_INFINITY;
                for (k, booster) in self.boosters.iter().enumerate() {
                    if proba[[i, k]] > best_p {
                        best_p = proba[[i, k]];
                        best = booster.class as usize;
                    }
                }
                best as f64
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    /// Per-class probabilities, normalized across the one-vs-rest scores.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.boosters.is_empty() {
            return Err(HarbenchError::ModelNotFitted);
        }

        let n = x.nrows();
        let k = self.boosters.len();
        let mut proba = Array2::zeros((n, k));

        for (col, booster) in self.boosters.iter().enumerate() {
            let scores = booster.score(x, self.config.learning_rate)?;
            for i in 0..n {
                proba[[i, col]] = scores[i];
            }
        }

        for i in 0..n {
            let row_sum: f64 = proba.row(i).sum();
            if row_sum > 0.0 {
                for j in 0..k {
                    proba[[i, j]] /= row_sum;
                }
            }
        }

        Ok(proba)
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_classes(&self) -> usize {
        self.boosters.len()
    }
}

fn sigmoid(v: f64) -> f64 {
    1.0 / (1.0 + (-v).exp())
}

fn subsample_indices(n: usize, ratio: f64, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let sample_size = ((n as f64) * ratio).ceil() as usize;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(sample_size.max(1));
    indices.sort_unstable();
    indices
}
