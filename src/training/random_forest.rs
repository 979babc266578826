//! Random forest classifier
//!
//! Bagged CART trees, each fit on a bootstrap sample and a random feature
//! subspace; trees are built in parallel with deterministic per-tree seeds,
//! so a fixed seed reproduces the forest regardless of thread count.

use super::decision_tree::{Criterion, DecisionTree};
use crate::error::{HarbenchError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Strategy for the number of features sampled per tree
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Fixed number
    Fixed(usize),
    /// All features
    All,
}

/// Random forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    /// Original-coordinate feature indices each tree was fit on.
    feature_indices_per_tree: Vec<Vec<usize>>,
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub criterion: Criterion,
    pub random_state: Option<u64>,
    feature_importances: Option<Array1<f64>>,
    n_features: usize,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new_classifier(100)
    }
}

impl RandomForest {
    pub fn new_classifier(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            feature_indices_per_tree: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: None,
            feature_importances: None,
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().ceil() as usize,
            MaxFeatures::Fixed(n) => n.min(n_features),
            MaxFeatures::All => n_features,
        }
        .max(1)
    }

    /// Fit the forest to training data.
    ///
    /// Any tree failing to fit aborts the whole forest.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(HarbenchError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        self.n_features = n_features;
        let max_features = self.compute_max_features(n_features);
        let base_seed = self.random_state.unwrap_or(42);

        let fitted: Vec<(DecisionTree, Vec<usize>)> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<(DecisionTree, Vec<usize>)> {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples)
                        .map(|_| (rng.next_u64() as usize) % n_samples)
                        .collect()
                } else {
                    (0..n_samples).collect()
                };

                // Each tree sees its own random feature subspace.
                let mut feature_indices: Vec<usize> = (0..n_features).collect();
                feature_indices.shuffle(&mut rng);
                feature_indices.truncate(max_features);
                feature_indices.sort_unstable();

                let x_rows = x.select(Axis(0), &sample_indices);
                let x_boot = x_rows.select(Axis(1), &feature_indices);
                let y_boot: Array1<f64> =
                    Array1::from_vec(sample_indices.iter().map(|&i| y[i]).collect());

                let mut tree = DecisionTree::new_classifier()
                    .with_min_samples_split(self.min_samples_split)
                    .with_min_samples_leaf(self.min_samples_leaf)
                    .with_criterion(self.criterion);
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }
                tree.fit(&x_boot, &y_boot)?;

                Ok((tree, feature_indices))
            })
            .collect::<Result<Vec<(DecisionTree, Vec<usize>)>>>()?;

        let (trees, feature_indices_per_tree): (Vec<_>, Vec<_>) = fitted.into_iter().unzip();
        self.trees = trees;
        self.feature_indices_per_tree = feature_indices_per_tree;
        self.compute_feature_importances();

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        if self.trees.is_empty() {
            return;
        }

        let mut total = vec![0.0; self.n_features];
        for (tree, feature_indices) in self.trees.iter().zip(&self.feature_indices_per_tree) {
            if let Some(imp) = tree.feature_importances() {
                for (j, &col_idx) in feature_indices.iter().enumerate() {
                    if j < imp.len() {
                        total[col_idx] += imp[j];
                    }
                }
            }
        }

        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }
        self.feature_importances = Some(Array1::from_vec(total));
    }

    /// Majority vote over all trees.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(HarbenchError::ModelNotFitted);
        }

        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .zip(self.feature_indices_per_tree.par_iter())
            .map(|(tree, feature_indices)| {
                let x_sub = x.select(Axis(1), feature_indices);
                tree.predict(&x_sub)
            })
            .collect::<Result<Vec<Array1<f64>>>>()?;

        let n_samples = x.nrows();
        let predictions: Vec<f64> = (0..n_samples)
            .map(|i| {
                let mut votes: HashMap<i64, usize> = HashMap::new();
                for preds in &all_predictions {
                    *votes.entry(preds[i].round() as i64).or_insert(0) += 1;
                }
                votes
                    .into_iter()
                    .max_by_key(|(_, count)| *count)
                    .map(|(class, _)| class as f64)
                    .unwrap_or(0.0)
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier_accuracy() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
            [2.0, 2.0],
            [2.1, 2.1],
            [2.2, 2.2],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0];

        let mut rf = RandomForest::new_classifier(20).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let accuracy = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count() as f64
            / y.len() as f64;
        assert!(accuracy >= 0.8, "accuracy too low: {}", accuracy);
    }

    #[test]
    fn test_sqrt_sampling_reaches_late_features() {
        // Only the last of four features is informative; with sqrt sampling
        // (2 of 4 per tree) enough trees must still see it for the forest to
        // beat chance by a wide margin.
        let n = 90;
        let x = Array2::from_shape_fn((n, 4), |(i, j)| {
            if j == 3 {
                (i / 30) as f64 * 5.0 + (((i * 31) % 10) as f64) * 0.1
            } else {
                (((i * 13 + j * 7) % 17) as f64) * 0.3
            }
        });
        let y: Array1<f64> = (0..n).map(|i| (i / 30) as f64).collect();

        let mut rf = RandomForest::new_classifier(30).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();
        let accuracy = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count() as f64
            / y.len() as f64;
        assert!(accuracy > 0.9, "accuracy too low: {}", accuracy);

        let importances = rf.feature_importances().unwrap();
        let max_idx = (0..4)
            .max_by(|&a, &b| importances[a].partial_cmp(&importances[b]).unwrap())
            .unwrap();
        assert_eq!(max_idx, 3, "importances: {:?}", importances);
    }

    #[test]
    fn test_failed_tree_fit_aborts_forest() {
        let x = array![[0.0, 1.0], [1.0, 0.0], [2.0, 2.0], [3.0, 1.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut rf = RandomForest::new_classifier(5).with_random_state(42);
        // More samples required per split than any bootstrap can provide.
        rf.min_samples_split = 100;
        assert!(rf.fit(&x, &y).is_err());
        assert_eq!(rf.n_trees(), 0);
    }

    #[test]
    fn test_fixed_seed_is_reproducible() {
        let x = array![
            [0.0, 1.0],
            [0.3, 0.7],
            [0.9, 0.2],
            [1.2, 1.4],
            [1.8, 1.1],
            [2.2, 2.3],
        ];
        let y = array![0.0, 0.0, 1.0, 1.0, 2.0, 2.0];

        let mut a = RandomForest::new_classifier(15).with_random_state(7);
        a.fit(&x, &y).unwrap();
        let mut b = RandomForest::new_classifier(15).with_random_state(7);
        b.fit(&x, &y).unwrap();

        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn test_feature_importances_normalized() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0], [4.0, 0.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];

        let mut rf = RandomForest::new_classifier(10)
            .with_random_state(42)
            .with_max_features(MaxFeatures::All);
        rf.fit(&x, &y).unwrap();

        let importances = rf.feature_importances().unwrap();
        assert_eq!(importances.len(), 2);
        assert!(importances[0] >= importances[1]);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let rf = RandomForest::new_classifier(5);
        let x = array![[1.0]];
        assert!(matches!(rf.predict(&x), Err(HarbenchError::ModelNotFitted)));
    }
}
