//! End-to-end benchmark pipeline
//!
//! Fetch, split, clean, explore, train, evaluate, rank, report. Every stage
//! logs its headline numbers; the returned [`PipelineOutcome`] carries the
//! rendered report plus the winning model for further predictions.

use crate::cleaning::{CleaningConfig, ColumnSelection};
use crate::data::{
    columns_to_array2, load_csv, stratified_split, validate_quiz_schema,
    validate_training_schema, DatasetSource, LabelEncoding, QUIZ_URL, TRAINING_URL,
};
use crate::error::{HarbenchError, Result};
use crate::evaluate::{ConfusionMatrix, ModelEvaluation};
use crate::explore::{correlation_matrix, top_correlated_pairs};
use crate::report::{rank_models, select_winner, Report};
use crate::training::{train_model, ModelKind, TrainedModel, TrainerConfig};
use chrono::Utc;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Everything a pipeline run needs to know.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub training_url: String,
    pub quiz_url: String,
    pub cache_dir: PathBuf,
    /// Label column name.
    pub label: String,
    /// Training share of the labeled data.
    pub train_fraction: f64,
    /// Seed for the split and every model.
    pub seed: u64,
    pub cleaning: CleaningConfig,
    pub trainer: TrainerConfig,
    /// |r| threshold for the correlation highlights.
    pub correlation_threshold: f64,
    /// Cap on reported correlated pairs.
    pub max_correlated_pairs: usize,
    /// Depth shown in the rendered tree diagram.
    pub tree_render_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            training_url: TRAINING_URL.to_string(),
            quiz_url: QUIZ_URL.to_string(),
            cache_dir: PathBuf::from("data"),
            label: "classe".to_string(),
            train_fraction: 0.75,
            seed: 1813,
            cleaning: CleaningConfig::default(),
            trainer: TrainerConfig::default(),
            correlation_threshold: 0.8,
            max_correlated_pairs: 20,
            tree_render_depth: 4,
        }
    }
}

impl PipelineConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self.trainer.seed = seed;
        self
    }

    pub fn with_train_fraction(mut self, fraction: f64) -> Self {
        self.train_fraction = fraction;
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn with_trainer(mut self, trainer: TrainerConfig) -> Self {
        self.trainer = trainer;
        self
    }

    fn source(&self) -> DatasetSource {
        DatasetSource {
            training_url: self.training_url.clone(),
            quiz_url: self.quiz_url.clone(),
            cache_dir: self.cache_dir.clone(),
        }
    }
}

/// What a finished run hands back.
pub struct PipelineOutcome {
    pub report: Report,
    pub winner: TrainedModel,
    pub encoding: LabelEncoding,
    pub selection: ColumnSelection,
}

/// Fetch both datasets and run the benchmark on them.
pub fn run(config: &PipelineConfig) -> Result<PipelineOutcome> {
    let (training_path, quiz_path) = config.source().ensure_local()?;
    let training = load_csv(&training_path)?;
    let quiz = load_csv(&quiz_path)?;
    run_on_frames(config, &training, &quiz)
}

/// Run the benchmark on already-loaded tables.
pub fn run_on_frames(
    config: &PipelineConfig,
    training: &DataFrame,
    quiz: &DataFrame,
) -> Result<PipelineOutcome> {
    validate_training_schema(training, &config.label)?;
    validate_quiz_schema(quiz, &config.label)?;

    // Split before any cleaning statistic is computed.
    let (train_df, val_df, split_summary) =
        stratified_split(training, &config.label, config.train_fraction, config.seed)?;
    info!(
        train_rows = split_summary.train_rows,
        validation_rows = split_summary.validation_rows,
        "split labeled data"
    );

    let selection = ColumnSelection::fit(&train_df, &config.label, &config.cleaning)?;
    let train_clean = selection.apply(&train_df)?;
    let val_clean = selection.apply(&val_df)?;
    let quiz_clean = selection.apply(quiz)?;

    let encoding = LabelEncoding::from_column(&train_clean, &config.label)?;
    let feature_names: Vec<String> = selection.kept().to_vec();

    let x_train = columns_to_array2(&train_clean, &feature_names)?;
    let y_train = encoding.encode(&train_clean, &config.label)?;
    let x_val = columns_to_array2(&val_clean, &feature_names)?;
    let y_val = encoding.encode(&val_clean, &config.label)?;
    let x_quiz = columns_to_array2(&quiz_clean, &feature_names)?;

    let corr = correlation_matrix(&x_train);
    let correlated_pairs = top_correlated_pairs(
        &corr,
        &feature_names,
        config.correlation_threshold,
        config.max_correlated_pairs,
    );
    info!(
        pairs = correlated_pairs.len(),
        threshold = config.correlation_threshold,
        "correlation pass"
    );

    let mut trained = Vec::new();
    let mut evaluations = Vec::new();
    let mut tree_diagram = None;

    for kind in ModelKind::all() {
        let model = train_model(kind, &config.trainer, &x_train, &y_train)?;

        let predictions = model.classifier.predict(&x_val)?;
        let confusion =
            ConfusionMatrix::from_predictions(encoding.classes(), &y_val, &predictions)?;
        let accuracy = confusion.accuracy();

        info!(
            model = kind.name(),
            validation_accuracy = accuracy,
            "evaluated model"
        );

        if let Some(tree) = model.classifier.as_decision_tree() {
            tree_diagram = Some(tree.render(&feature_names, config.tree_render_depth, |v| {
                encoding.decode(v).to_string()
            })?);
        }

        evaluations.push(ModelEvaluation {
            model_name: kind.name().to_string(),
            accuracy,
            cv_accuracy: model.cv.mean_score,
            cv_std: model.cv.std_score,
            training_time_secs: model.training_time_secs,
            confusion,
        });
        trained.push(model);
    }

    let evaluations = rank_models(evaluations);
    let winner_name = select_winner(&evaluations)?.model_name.clone();
    info!(winner = winner_name.as_str(), "selected model");

    let winner = trained
        .into_iter()
        .find(|m| m.kind.name() == winner_name)
        .ok_or_else(|| {
            HarbenchError::EvaluationError(format!("winner '{winner_name}' not among trained models"))
        })?;

    let quiz_predictions: Vec<String> = winner
        .classifier
        .predict(&x_quiz)?
        .iter()
        .map(|&v| encoding.decode(v).to_string())
        .collect();

    let report = Report {
        generated_at: Utc::now(),
        split: split_summary,
        selection: selection.clone(),
        correlated_pairs,
        tree_diagram,
        evaluations,
        winner: winner_name,
        quiz_predictions,
    };

    Ok(PipelineOutcome {
        report,
        winner,
        encoding,
        selection,
    })
}
