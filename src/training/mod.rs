//! Model training
//!
//! Three classifiers compete on the same cleaned feature matrix: a random
//! forest, a single CART tree, and a gradient boosting ensemble. Each is
//! scored with stratified k-fold cross-validation on the training subset
//! before the final refit on the full subset.

pub mod cross_validation;
pub mod decision_tree;
pub mod gradient_boosting;
pub mod random_forest;

pub use cross_validation::{CVResults, CVSplit, CVStrategy, CrossValidator};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
pub use random_forest::{MaxFeatures, RandomForest};

use crate::error::{HarbenchError, Result};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// The model families in the benchmark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelKind {
    RandomForest,
    DecisionTree,
    GradientBoosting,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::RandomForest => "random_forest",
            ModelKind::DecisionTree => "decision_tree",
            ModelKind::GradientBoosting => "gradient_boosting",
        }
    }

    pub fn all() -> [ModelKind; 3] {
        [
            ModelKind::RandomForest,
            ModelKind::DecisionTree,
            ModelKind::GradientBoosting,
        ]
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Shared hyperparameters for the benchmark models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Trees in the forest / boosting rounds per class
    pub n_estimators: usize,
    /// Depth cap for every tree
    pub max_depth: usize,
    /// Boosting learning rate
    pub learning_rate: f64,
    /// Cross-validation folds
    pub cv_folds: usize,
    /// Base random seed
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 12,
            learning_rate: 0.1,
            cv_folds: 5,
            seed: 1813,
        }
    }
}

impl TrainerConfig {
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// A fitted classifier of any benchmarked family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FittedClassifier {
    RandomForest(RandomForest),
    DecisionTree(DecisionTree),
    GradientBoosting(GradientBoostingClassifier),
}

impl FittedClassifier {
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            FittedClassifier::RandomForest(m) => m.predict(x),
            FittedClassifier::DecisionTree(m) => m.predict(x),
            FittedClassifier::GradientBoosting(m) => m.predict(x),
        }
    }

    /// The underlying tree, when this classifier is a single tree.
    pub fn as_decision_tree(&self) -> Option<&DecisionTree> {
        match self {
            FittedClassifier::DecisionTree(m) => Some(m),
            _ => None,
        }
    }
}

/// One trained benchmark entry: the refit model plus its CV estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    pub kind: ModelKind,
    pub classifier: FittedClassifier,
    pub cv: CVResults,
    pub training_time_secs: f64,
}

fn fit_classifier(
    kind: ModelKind,
    config: &TrainerConfig,
    x: &Array2<f64>,
    y: &Array1<f64>,
) -> Result<FittedClassifier> {
    match kind {
        ModelKind::RandomForest => {
            let mut model = RandomForest::new_classifier(config.n_estimators)
                .with_max_depth(config.max_depth)
                .with_random_state(config.seed);
            model.fit(x, y)?;
            Ok(FittedClassifier::RandomForest(model))
        }
        ModelKind::DecisionTree => {
            let mut model = DecisionTree::new_classifier().with_max_depth(config.max_depth);
            model.fit(x, y)?;
            Ok(FittedClassifier::DecisionTree(model))
        }
        ModelKind::GradientBoosting => {
            let gb_config = GradientBoostingConfig {
                n_estimators: config.n_estimators,
                learning_rate: config.learning_rate,
                max_depth: config.max_depth.min(6),
                random_state: Some(config.seed),
                ..Default::default()
            };
            let mut model = GradientBoostingClassifier::new(gb_config);
            model.fit(x, y)?;
            Ok(FittedClassifier::GradientBoosting(model))
        }
    }
}

fn fold_accuracy(predictions: &Array1<f64>, actual: &Array1<f64>) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let correct = predictions
        .iter()
        .zip(actual.iter())
        .filter(|(p, a)| (p.round() - a.round()).abs() < 0.5)
        .count();
    correct as f64 / actual.len() as f64
}

/// Train one model kind with a stratified CV estimate and a final refit.
///
/// The folds run in parallel; the reported training time covers the refit on
/// the full training subset only, which is what a deployment would pay.
pub fn train_model(
    kind: ModelKind,
    config: &TrainerConfig,
    x: &Array2<f64>,
    y: &Array1<f64>,
) -> Result<TrainedModel> {
    if x.nrows() != y.len() {
        return Err(HarbenchError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }

    let cv = CrossValidator::new(CVStrategy::StratifiedKFold {
        n_splits: config.cv_folds,
        shuffle: true,
    })
    .with_random_state(config.seed);

    let splits = cv.split(x.nrows(), Some(y))?;

    let fold_scores: Vec<f64> = splits
        .par_iter()
        .map(|split| -> Result<f64> {
            let x_train = x.select(Axis(0), &split.train_indices);
            let y_train: Array1<f64> =
                Array1::from_vec(split.train_indices.iter().map(|&i| y[i]).collect());
            let x_test = x.select(Axis(0), &split.test_indices);
            let y_test: Array1<f64> =
                Array1::from_vec(split.test_indices.iter().map(|&i| y[i]).collect());

            let model = fit_classifier(kind, config, &x_train, &y_train)?;
            let predictions = model.predict(&x_test)?;
            Ok(fold_accuracy(&predictions, &y_test))
        })
        .collect::<Result<Vec<f64>>>()?;

    let cv_results = CVResults::from_scores(fold_scores);

    let started = Instant::now();
    let classifier = fit_classifier(kind, config, x, y)?;
    let training_time_secs = started.elapsed().as_secs_f64();

    info!(
        model = kind.name(),
        cv_accuracy = cv_results.mean_score,
        cv_std = cv_results.std_score,
        training_secs = training_time_secs,
        "trained model"
    );

    Ok(TrainedModel {
        kind,
        classifier,
        cv: cv_results,
        training_time_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn clustered_data() -> (Array2<f64>, Array1<f64>) {
        let n = 100;
        let x = Array2::from_shape_fn((n, 3), |(i, j)| {
            let cluster = (i % 5) as f64;
            cluster * 4.0 + (((i * 13 + j * 7) % 8) as f64) * 0.1
        });
        let y: Array1<f64> = (0..n).map(|i| (i % 5) as f64).collect();
        (x, y)
    }

    fn fast_config() -> TrainerConfig {
        TrainerConfig::default()
            .with_n_estimators(10)
            .with_max_depth(5)
            .with_cv_folds(3)
            .with_seed(42)
    }

    #[test]
    fn test_train_each_kind() {
        let (x, y) = clustered_data();
        for kind in ModelKind::all() {
            let trained = train_model(kind, &fast_config(), &x, &y).unwrap();
            assert_eq!(trained.kind, kind);
            assert_eq!(trained.cv.fold_scores.len(), 3);
            assert!(trained.cv.mean_score > 0.5, "{} cv too low", kind);
            assert!(trained.training_time_secs >= 0.0);

            let predictions = trained.classifier.predict(&x).unwrap();
            assert_eq!(predictions.len(), y.len());
        }
    }

    #[test]
    fn test_decision_tree_accessor() {
        let (x, y) = clustered_data();
        let trained = train_model(ModelKind::DecisionTree, &fast_config(), &x, &y).unwrap();
        assert!(trained.classifier.as_decision_tree().is_some());

        let forest = train_model(ModelKind::RandomForest, &fast_config(), &x, &y).unwrap();
        assert!(forest.classifier.as_decision_tree().is_none());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let (x, _) = clustered_data();
        let y = Array1::from_elem(10, 0.0);
        assert!(train_model(ModelKind::DecisionTree, &fast_config(), &x, &y).is_err());
    }

    #[test]
    fn test_model_kind_names() {
        assert_eq!(ModelKind::RandomForest.name(), "random_forest");
        assert_eq!(format!("{}", ModelKind::GradientBoosting), "gradient_boosting");
    }
}
