//! Held-out evaluation
//!
//! Every candidate model predicts the validation subset exactly once; the
//! confusion matrix and its derived accuracy are the only numbers that feed
//! the final ranking.

use crate::error::{HarbenchError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Class-by-class confusion counts, rows = actual, columns = predicted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    labels: Vec<String>,
    counts: Array2<u64>,
}

impl ConfusionMatrix {
    /// Tally predictions against actuals; both are class indices into `labels`.
    pub fn from_predictions(
        labels: &[String],
        actual: &Array1<f64>,
        predicted: &Array1<f64>,
    ) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(HarbenchError::ShapeError {
                expected: format!("{} predictions", actual.len()),
                actual: format!("{} predictions", predicted.len()),
            });
        }

        let k = labels.len();
        let mut counts = Array2::zeros((k, k));

        for (a, p) in actual.iter().zip(predicted.iter()) {
            let a = a.round();
            let p = p.round();
            // Negative values would saturate to 0 through the cast.
            if a < 0.0 || p < 0.0 || a as usize >= k || p as usize >= k {
                return Err(HarbenchError::EvaluationError(format!(
                    "class index out of range: actual {} predicted {} with {} classes",
                    a, p, k
                )));
            }
            counts[[a as usize, p as usize]] += 1;
        }

        Ok(Self {
            labels: labels.to_vec(),
            counts,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn counts(&self) -> &Array2<u64> {
        &self.counts
    }

    /// Total observations tallied.
    pub fn total(&self) -> u64 {
        self.counts.sum()
    }

    /// Diagonal fraction.
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let correct: u64 = (0..self.labels.len()).map(|i| self.counts[[i, i]]).sum();
        correct as f64 / total as f64
    }

    /// Per-class recall (diagonal over row total), None for empty rows.
    pub fn recall(&self, class_idx: usize) -> Option<f64> {
        let row_total: u64 = self.counts.row(class_idx).sum();
        if row_total == 0 {
            None
        } else {
            Some(self.counts[[class_idx, class_idx]] as f64 / row_total as f64)
        }
    }

    /// Markdown table: actual classes as rows, predicted as columns.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = write!(out, "| actual \\ predicted |");
        for label in &self.labels {
            let _ = write!(out, " {} |", label);
        }
        out.push('\n');
        let _ = write!(out, "|---|");
        for _ in &self.labels {
            let _ = write!(out, "---|");
        }
        out.push('\n');
        for (i, label) in self.labels.iter().enumerate() {
            let _ = write!(out, "| **{}** |", label);
            for j in 0..self.labels.len() {
                let _ = write!(out, " {} |", self.counts[[i, j]]);
            }
            out.push('\n');
        }
        out
    }
}

/// One model's full validation scorecard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEvaluation {
    pub model_name: String,
    pub accuracy: f64,
    pub cv_accuracy: f64,
    pub cv_std: f64,
    pub training_time_secs: f64,
    pub confusion: ConfusionMatrix,
}

impl ModelEvaluation {
    /// Estimated out-of-sample error rate.
    pub fn error_rate(&self) -> f64 {
        1.0 - self.accuracy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn labels() -> Vec<String> {
        vec!["A".to_string(), "B".to_string(), "C".to_string()]
    }

    #[test]
    fn test_perfect_predictions() {
        let actual = array![0.0, 1.0, 2.0, 0.0, 1.0, 2.0];
        let cm = ConfusionMatrix::from_predictions(&labels(), &actual, &actual).unwrap();

        assert_eq!(cm.total(), 6);
        assert_eq!(cm.accuracy(), 1.0);
        for i in 0..3 {
            assert_eq!(cm.counts()[[i, i]], 2);
            assert_eq!(cm.recall(i), Some(1.0));
        }
    }

    #[test]
    fn test_off_diagonal_counts() {
        let actual = array![0.0, 0.0, 1.0, 1.0];
        let predicted = array![0.0, 1.0, 1.0, 1.0];
        let cm = ConfusionMatrix::from_predictions(&labels(), &actual, &predicted).unwrap();

        assert_eq!(cm.counts()[[0, 1]], 1);
        assert_eq!(cm.accuracy(), 0.75);
        assert_eq!(cm.recall(0), Some(0.5));
        assert_eq!(cm.recall(2), None);
    }

    #[test]
    fn test_total_matches_observations() {
        let actual = array![0.0, 1.0, 2.0, 2.0, 1.0];
        let predicted = array![2.0, 1.0, 0.0, 2.0, 0.0];
        let cm = ConfusionMatrix::from_predictions(&labels(), &actual, &predicted).unwrap();
        assert_eq!(cm.total(), 5);
    }

    #[test]
    fn test_out_of_range_class_rejected() {
        let actual = array![0.0, 5.0];
        let predicted = array![0.0, 0.0];
        assert!(ConfusionMatrix::from_predictions(&labels(), &actual, &predicted).is_err());
    }

    #[test]
    fn test_negative_class_rejected() {
        let actual = array![0.0, 1.0];
        let negative = array![0.0, -1.0];
        // Must error, not silently tally the -1 as class 0.
        assert!(ConfusionMatrix::from_predictions(&labels(), &actual, &negative).is_err());
        assert!(ConfusionMatrix::from_predictions(&labels(), &negative, &actual).is_err());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let actual = array![0.0, 1.0];
        let predicted = array![0.0];
        assert!(ConfusionMatrix::from_predictions(&labels(), &actual, &predicted).is_err());
    }

    #[test]
    fn test_render_contains_labels_and_counts() {
        let actual = array![0.0, 1.0, 1.0];
        let predicted = array![0.0, 1.0, 0.0];
        let cm = ConfusionMatrix::from_predictions(&labels(), &actual, &predicted).unwrap();

        let table = cm.render();
        assert!(table.contains("**A**"));
        assert!(table.contains("**B**"));
        assert!(table.contains("| 1 |"));
    }

    #[test]
    fn test_error_rate() {
        let actual = array![0.0, 0.0, 0.0, 1.0];
        let predicted = array![0.0, 0.0, 1.0, 1.0];
        let cm = ConfusionMatrix::from_predictions(&labels(), &actual, &predicted).unwrap();
        let eval = ModelEvaluation {
            model_name: "random_forest".to_string(),
            accuracy: cm.accuracy(),
            cv_accuracy: 0.8,
            cv_std: 0.01,
            training_time_secs: 0.5,
            confusion: cm,
        };
        assert!((eval.error_rate() - 0.25).abs() < 1e-12);
    }
}
