//! harbench - Human activity recognition model benchmark
//!
//! Benchmarks three classifiers (random forest, decision tree, gradient
//! boosting) on the weight lifting exercise dataset: wearable-sensor
//! measurements labeled with how well the exercise was performed (classes
//! A through E).
//!
//! # Modules
//!
//! - [`data`] - Dataset fetching, CSV parsing, stratified splitting
//! - [`cleaning`] - Identifier / near-zero-variance / missing-column pruning
//! - [`explore`] - Correlation analysis over the cleaned predictors
//! - [`training`] - The three model families plus cross-validation
//! - [`evaluate`] - Confusion matrices and accuracy on the validation set
//! - [`report`] - Model ranking and markdown report rendering
//! - [`pipeline`] - End-to-end orchestration
//! - [`cli`] - Command-line interface

pub mod error;

pub mod cleaning;
pub mod data;
pub mod evaluate;
pub mod explore;
pub mod pipeline;
pub mod report;
pub mod training;

pub mod cli;

pub use error::{HarbenchError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{HarbenchError, Result};

    pub use crate::cleaning::{CleaningConfig, ColumnSelection};
    pub use crate::data::{stratified_split, DatasetSource, LabelEncoding, SplitSummary};
    pub use crate::evaluate::{ConfusionMatrix, ModelEvaluation};
    pub use crate::explore::{correlation_matrix, top_correlated_pairs, CorrelatedPair};
    pub use crate::pipeline::{run, run_on_frames, PipelineConfig, PipelineOutcome};
    pub use crate::report::{rank_models, select_winner, Report};
    pub use crate::training::{
        CVResults, CVStrategy, CrossValidator, DecisionTree, FittedClassifier,
        GradientBoostingClassifier, ModelKind, RandomForest, TrainedModel, TrainerConfig,
    };
}
