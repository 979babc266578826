//! Ranking and report rendering
//!
//! The selector orders candidates by validation accuracy; a tie goes to the
//! cheaper model to train. The report is a single markdown document with the
//! cleaning summary, the correlation highlights, the tree diagram, every
//! confusion matrix, and the ranked accuracy table.

use crate::cleaning::ColumnSelection;
use crate::data::SplitSummary;
use crate::error::{HarbenchError, Result};
use crate::evaluate::ModelEvaluation;
use crate::explore::CorrelatedPair;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::Write as _;

/// Sort evaluations best-first: accuracy descending, ties broken by lower
/// training time.
pub fn rank_models(mut evaluations: Vec<ModelEvaluation>) -> Vec<ModelEvaluation> {
    evaluations.sort_by(|a, b| {
        b.accuracy
            .partial_cmp(&a.accuracy)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                a.training_time_secs
                    .partial_cmp(&b.training_time_secs)
                    .unwrap_or(Ordering::Equal)
            })
    });
    evaluations
}

/// The winner is the head of the ranked list.
pub fn select_winner(ranked: &[ModelEvaluation]) -> Result<&ModelEvaluation> {
    ranked.first().ok_or_else(|| {
        HarbenchError::EvaluationError("no models were evaluated".to_string())
    })
}

/// Everything the rendered report needs, already computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub split: SplitSummary,
    pub selection: ColumnSelection,
    pub correlated_pairs: Vec<CorrelatedPair>,
    pub tree_diagram: Option<String>,
    /// Ranked best-first.
    pub evaluations: Vec<ModelEvaluation>,
    pub winner: String,
    pub quiz_predictions: Vec<String>,
}

impl Report {
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "# Exercise quality model benchmark");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Generated {} (seed {}).",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.split.seed
        );
        let _ = writeln!(out);

        self.render_data_section(&mut out);
        self.render_correlation_section(&mut out);
        self.render_tree_section(&mut out);
        self.render_model_sections(&mut out);
        self.render_ranking_section(&mut out);
        self.render_quiz_section(&mut out);

        out
    }

    fn render_data_section(&self, out: &mut String) {
        let _ = writeln!(out, "## Data");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Stratified split: {} training rows, {} validation rows ({:.0}% / {:.0}%).",
            self.split.train_rows,
            self.split.validation_rows,
            self.split.train_fraction * 100.0,
            (1.0 - self.split.train_fraction) * 100.0
        );
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Column cleaning kept {} predictors and dropped {}: \
             {} identifier columns, {} near-zero-variance, {} with missing values.",
            self.selection.kept().len(),
            self.selection.dropped_total(),
            self.selection.dropped_identifiers.len(),
            self.selection.dropped_near_zero.len(),
            self.selection.dropped_missing.len()
        );
        let _ = writeln!(out);
    }

    fn render_correlation_section(&self, out: &mut String) {
        let _ = writeln!(out, "## Highly correlated predictors");
        let _ = writeln!(out);
        if self.correlated_pairs.is_empty() {
            let _ = writeln!(out, "No predictor pairs above the correlation threshold.");
            let _ = writeln!(out);
            return;
        }
        let _ = writeln!(out, "| predictor | predictor | r |");
        let _ = writeln!(out, "|---|---|---|");
        for pair in &self.correlated_pairs {
            let _ = writeln!(out, "| {} | {} | {:+.3} |", pair.left, pair.right, pair.r);
        }
        let _ = writeln!(out);
    }

    fn render_tree_section(&self, out: &mut String) {
        let Some(diagram) = &self.tree_diagram else {
            return;
        };
        let _ = writeln!(out, "## Decision tree");
        let _ = writeln!(out);
        let _ = writeln!(out, "```");
        let _ = write!(out, "{}", diagram);
        if !diagram.ends_with('\n') {
            out.push('\n');
        }
        let _ = writeln!(out, "```");
        let _ = writeln!(out);
    }

    fn render_model_sections(&self, out: &mut String) {
        for eval in &self.evaluations {
            let _ = writeln!(out, "## {}", eval.model_name);
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "Validation accuracy {:.4} (CV estimate {:.4} ± {:.4}), \
                 trained in {:.2}s.",
                eval.accuracy, eval.cv_accuracy, eval.cv_std, eval.training_time_secs
            );
            let _ = writeln!(out);
            let _ = write!(out, "{}", eval.confusion.render());
            let _ = writeln!(out);
        }
    }

    fn render_ranking_section(&self, out: &mut String) {
        let _ = writeln!(out, "## Ranking");
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "| rank | model | validation accuracy | CV accuracy | training time (s) |"
        );
        let _ = writeln!(out, "|---|---|---|---|---|");
        for (i, eval) in self.evaluations.iter().enumerate() {
            let _ = writeln!(
                out,
                "| {} | {} | {:.4} | {:.4} | {:.2} |",
                i + 1,
                eval.model_name,
                eval.accuracy,
                eval.cv_accuracy,
                eval.training_time_secs
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "**Selected model: {}**", self.winner);
        let _ = writeln!(out);
    }

    fn render_quiz_section(&self, out: &mut String) {
        if self.quiz_predictions.is_empty() {
            return;
        }
        let _ = writeln!(out, "## Quiz predictions");
        let _ = writeln!(out);
        let _ = writeln!(out, "| case | prediction |");
        let _ = writeln!(out, "|---|---|");
        for (i, prediction) in self.quiz_predictions.iter().enumerate() {
            let _ = writeln!(out, "| {} | {} |", i + 1, prediction);
        }
        let _ = writeln!(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::{CleaningConfig, ColumnSelection};
    use crate::evaluate::ConfusionMatrix;
    use ndarray::array;
    use polars::prelude::*;

    fn evaluation(name: &str, accuracy: f64, time: f64) -> ModelEvaluation {
        let labels = vec!["A".to_string(), "B".to_string()];
        let actual = array![0.0, 1.0];
        let confusion = ConfusionMatrix::from_predictions(&labels, &actual, &actual).unwrap();
        ModelEvaluation {
            model_name: name.to_string(),
            accuracy,
            cv_accuracy: accuracy,
            cv_std: 0.01,
            training_time_secs: time,
            confusion,
        }
    }

    #[test]
    fn test_rank_by_accuracy() {
        let ranked = rank_models(vec![
            evaluation("decision_tree", 0.75, 0.1),
            evaluation("random_forest", 0.99, 5.0),
            evaluation("gradient_boosting", 0.96, 9.0),
        ]);
        let names: Vec<&str> = ranked.iter().map(|e| e.model_name.as_str()).collect();
        assert_eq!(names, ["random_forest", "gradient_boosting", "decision_tree"]);
    }

    #[test]
    fn test_tie_goes_to_faster_model() {
        let ranked = rank_models(vec![
            evaluation("gradient_boosting", 0.95, 9.0),
            evaluation("random_forest", 0.95, 2.0),
        ]);
        assert_eq!(ranked[0].model_name, "random_forest");
    }

    #[test]
    fn test_select_winner() {
        let ranked = rank_models(vec![
            evaluation("decision_tree", 0.7, 0.1),
            evaluation("random_forest", 0.99, 5.0),
        ]);
        assert_eq!(select_winner(&ranked).unwrap().model_name, "random_forest");
        assert!(select_winner(&[]).is_err());
    }

    #[test]
    fn test_render_mentions_every_section() {
        let df = df!(
            "x" => &[1.0, 2.0, 3.0, 4.0],
            "classe" => &["A", "B", "A", "B"]
        )
        .unwrap();
        let config = CleaningConfig {
            identifier_columns: 0,
            ..Default::default()
        };
        let selection = ColumnSelection::fit(&df, "classe", &config).unwrap();

        let evaluations = rank_models(vec![
            evaluation("random_forest", 0.99, 5.0),
            evaluation("decision_tree", 0.75, 0.1),
        ]);

        let report = Report {
            generated_at: Utc::now(),
            split: SplitSummary {
                train_rows: 3,
                validation_rows: 1,
                train_fraction: 0.75,
                seed: 1813,
            },
            selection,
            correlated_pairs: vec![CorrelatedPair {
                left: "roll_belt".to_string(),
                right: "accel_belt_z".to_string(),
                r: -0.992,
            }],
            tree_diagram: Some("x <= 2.5 (n=4)\n".to_string()),
            winner: "random_forest".to_string(),
            evaluations,
            quiz_predictions: vec!["B".to_string(), "A".to_string()],
        };

        let text = report.render();
        assert!(text.contains("## Data"));
        assert!(text.contains("roll_belt"));
        assert!(text.contains("## Decision tree"));
        assert!(text.contains("## Ranking"));
        assert!(text.contains("**Selected model: random_forest**"));
        assert!(text.contains("## Quiz predictions"));
        assert!(text.contains("| 1 | B |"));
    }
}
