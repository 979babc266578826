//! Cross-validation splitters
//!
//! The accuracy estimate reported for each model comes from stratified
//! k-fold: every fold keeps the class mix of the full training subset.

use crate::error::{HarbenchError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cross-validation strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CVStrategy {
    /// K-Fold cross-validation
    KFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold {
            n_splits: 5,
            shuffle: true,
        }
    }
}

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: Option<u64>,
}

impl CrossValidator {
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: None,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Generate train/test splits
    pub fn split(&self, n_samples: usize, y: Option<&Array1<f64>>) -> Result<Vec<CVSplit>> {
        match &self.strategy {
            CVStrategy::KFold { n_splits, shuffle } => {
                self.k_fold_split(n_samples, *n_splits, *shuffle)
            }
            CVStrategy::StratifiedKFold { n_splits, shuffle } => {
                let y = y.ok_or_else(|| {
                    HarbenchError::ValidationError(
                        "StratifiedKFold requires target array".to_string(),
                    )
                })?;
                self.stratified_k_fold_split(y, *n_splits, *shuffle)
            }
        }
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    fn k_fold_split(
        &self,
        n_samples: usize,
        n_splits: usize,
        shuffle: bool,
    ) -> Result<Vec<CVSplit>> {
        if n_splits < 2 {
            return Err(HarbenchError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }
        if n_samples < n_splits {
            return Err(HarbenchError::ValidationError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if shuffle {
            indices.shuffle(&mut self.rng());
        }

        let fold_sizes: Vec<usize> = (0..n_splits)
            .map(|i| {
                let base = n_samples / n_splits;
                let remainder = n_samples % n_splits;
                if i < remainder {
                    base + 1
                } else {
                    base
                }
            })
            .collect();

        let mut splits = Vec::with_capacity(n_splits);
        let mut current = 0;

        for fold_idx in 0..n_splits {
            let fold_size = fold_sizes[fold_idx];
            let test_indices: Vec<usize> = indices[current..current + fold_size].to_vec();
            let train_indices: Vec<usize> = indices[..current]
                .iter()
                .chain(indices[current + fold_size..].iter())
                .copied()
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });

            current += fold_size;
        }

        Ok(splits)
    }

    fn stratified_k_fold_split(
        &self,
        y: &Array1<f64>,
        n_splits: usize,
        shuffle: bool,
    ) -> Result<Vec<CVSplit>> {
        if n_splits < 2 {
            return Err(HarbenchError::ValidationError(
                "n_splits must be at least 2".to_string(),
            ));
        }

        // BTreeMap keeps class iteration order deterministic.
        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        for indices in class_indices.values() {
            if indices.len() < n_splits {
                return Err(HarbenchError::ValidationError(format!(
                    "class with {} samples cannot fill {} folds",
                    indices.len(),
                    n_splits
                )));
            }
        }

        if shuffle {
            let mut rng = self.rng();
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // Deal each class round-robin across the folds.
        let mut folds: Vec<Vec<usize>> = vec![Vec::new(); n_splits];
        for indices in class_indices.values() {
            for (i, &idx) in indices.iter().enumerate() {
                folds[i % n_splits].push(idx);
            }
        }

        let mut splits = Vec::with_capacity(n_splits);
        for fold_idx in 0..n_splits {
            let test_indices = folds[fold_idx].clone();
            let train_indices: Vec<usize> = folds
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != fold_idx)
                .flat_map(|(_, f)| f.iter().copied())
                .collect();

            splits.push(CVSplit {
                train_indices,
                test_indices,
                fold_idx,
            });
        }

        Ok(splits)
    }
}

/// Aggregated fold scores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

impl CVResults {
    pub fn from_scores(fold_scores: Vec<f64>) -> Self {
        let n = fold_scores.len() as f64;
        let mean_score = if n > 0.0 {
            fold_scores.iter().sum::<f64>() / n
        } else {
            0.0
        };
        let variance = if n > 1.0 {
            fold_scores
                .iter()
                .map(|s| (s - mean_score).powi(2))
                .sum::<f64>()
                / (n - 1.0)
        } else {
            0.0
        };
        Self {
            fold_scores,
            mean_score,
            std_score: variance.sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced_labels(n: usize, k: usize) -> Array1<f64> {
        (0..n).map(|i| (i % k) as f64).collect()
    }

    #[test]
    fn test_k_fold_covers_every_sample_once() {
        let cv = CrossValidator::new(CVStrategy::KFold {
            n_splits: 5,
            shuffle: true,
        })
        .with_random_state(42);

        let splits = cv.split(103, None).unwrap();
        assert_eq!(splits.len(), 5);

        let mut seen = vec![0usize; 103];
        for split in &splits {
            assert_eq!(split.train_indices.len() + split.test_indices.len(), 103);
            for &idx in &split.test_indices {
                seen[idx] += 1;
            }
        }
        assert!(seen.iter().all(|&c| c == 1));
    }

    #[test]
    fn test_stratified_folds_keep_class_mix() {
        let y = balanced_labels(100, 5);
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: 5,
            shuffle: true,
        })
        .with_random_state(1813);

        let splits = cv.split(100, Some(&y)).unwrap();
        for split in &splits {
            assert_eq!(split.test_indices.len(), 20);
            let mut counts = [0usize; 5];
            for &idx in &split.test_indices {
                counts[y[idx] as usize] += 1;
            }
            // 4 of each class per fold
            assert!(counts.iter().all(|&c| c == 4), "counts: {:?}", counts);
        }
    }

    #[test]
    fn test_stratified_requires_target() {
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: 5,
            shuffle: false,
        });
        assert!(cv.split(100, None).is_err());
    }

    #[test]
    fn test_tiny_class_rejected() {
        let mut y: Vec<f64> = vec![0.0; 30];
        y.extend_from_slice(&[1.0, 1.0]);
        let y = Array1::from_vec(y);

        let cv = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: 5,
            shuffle: false,
        });
        assert!(cv.split(32, Some(&y)).is_err());
    }

    #[test]
    fn test_seeded_splits_are_reproducible() {
        let y = balanced_labels(60, 3);
        let make = || {
            CrossValidator::new(CVStrategy::StratifiedKFold {
                n_splits: 4,
                shuffle: true,
            })
            .with_random_state(7)
            .split(60, Some(&y))
            .unwrap()
        };

        let a = make();
        let b = make();
        for (sa, sb) in a.iter().zip(b.iter()) {
            assert_eq!(sa.test_indices, sb.test_indices);
        }
    }

    #[test]
    fn test_cv_results_stats() {
        let results = CVResults::from_scores(vec![0.9, 0.95, 0.85, 0.9, 0.9]);
        assert!((results.mean_score - 0.9).abs() < 1e-12);
        assert!(results.std_score > 0.0);
    }
}
