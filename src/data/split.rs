//! Stratified train/validation partitioning

use crate::error::{HarbenchError, Result};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Sizes produced by a split, kept for the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitSummary {
    pub train_rows: usize,
    pub validation_rows: usize,
    pub train_fraction: f64,
    pub seed: u64,
}

/// Partition `df` into train/validation subsets, stratified on the label.
///
/// Each class contributes `train_fraction` of its rows (floor) to the
/// training subset; the remainder goes to validation. Shuffling within each
/// class uses a seeded ChaCha8 generator, so a fixed seed reproduces the
/// exact partition.
pub fn stratified_split(
    df: &DataFrame,
    label: &str,
    train_fraction: f64,
    seed: u64,
) -> Result<(DataFrame, DataFrame, SplitSummary)> {
    if !(0.0..1.0).contains(&train_fraction) || train_fraction == 0.0 {
        return Err(HarbenchError::ValidationError(format!(
            "train_fraction must be in (0, 1), got {train_fraction}"
        )));
    }

    let series = df
        .column(label)
        .map_err(|_| HarbenchError::ColumnNotFound(label.to_string()))?;
    let ca = series
        .str()
        .map_err(|_| HarbenchError::SchemaError(format!("label column '{label}' is not categorical")))?;

    // BTreeMap keeps class iteration order deterministic.
    let mut class_indices: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    for (idx, value) in ca.into_iter().enumerate() {
        let value = value.ok_or_else(|| {
            HarbenchError::SchemaError(format!("label column '{label}' contains missing values"))
        })?;
        class_indices
            .entry(value.to_string())
            .or_default()
            .push(idx as u32);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train_indices: Vec<u32> = Vec::new();
    let mut val_indices: Vec<u32> = Vec::new();

    for (class, indices) in class_indices.iter_mut() {
        indices.shuffle(&mut rng);
        let n_train = ((indices.len() as f64) * train_fraction).floor() as usize;
        if n_train == 0 || n_train == indices.len() {
            return Err(HarbenchError::ValidationError(format!(
                "class '{class}' has too few rows ({}) for a {train_fraction} split",
                indices.len()
            )));
        }
        train_indices.extend_from_slice(&indices[..n_train]);
        val_indices.extend_from_slice(&indices[n_train..]);
        debug!(
            class = class.as_str(),
            total = indices.len(),
            train = n_train,
            "stratum split"
        );
    }

    // Restore row order within each subset so downstream stages see the
    // original record ordering rather than shuffle order.
    train_indices.sort_unstable();
    val_indices.sort_unstable();

    let train = df.take(&IdxCa::from_vec("idx".into(), train_indices))?;
    let validation = df.take(&IdxCa::from_vec("idx".into(), val_indices))?;

    let summary = SplitSummary {
        train_rows: train.height(),
        validation_rows: validation.height(),
        train_fraction,
        seed,
    };

    Ok((train, validation, summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced_frame(per_class: usize) -> DataFrame {
        let classes = ["A", "B", "C", "D", "E"];
        let mut x = Vec::new();
        let mut y = Vec::new();
        for (c, class) in classes.iter().enumerate() {
            for i in 0..per_class {
                x.push((c * per_class + i) as f64);
                y.push(*class);
            }
        }
        df!("x" => &x, "classe" => &y).unwrap()
    }

    #[test]
    fn test_split_fraction_within_rounding() {
        let df = balanced_frame(20);
        let (train, val, summary) = stratified_split(&df, "classe", 0.75, 1813).unwrap();

        assert_eq!(train.height() + val.height(), 100);
        // 0.75 of each 20-row class: exactly 15 train / 5 validation.
        assert_eq!(train.height(), 75);
        assert_eq!(val.height(), 25);
        assert_eq!(summary.train_rows, 75);
    }

    #[test]
    fn test_split_is_reproducible() {
        let df = balanced_frame(12);
        let (t1, v1, _) = stratified_split(&df, "classe", 0.75, 42).unwrap();
        let (t2, v2, _) = stratified_split(&df, "classe", 0.75, 42).unwrap();

        assert!(t1.equals(&t2));
        assert!(v1.equals(&v2));
    }

    #[test]
    fn test_split_preserves_strata() {
        let df = balanced_frame(16);
        let (train, _, _) = stratified_split(&df, "classe", 0.75, 7).unwrap();

        let ca = train.column("classe").unwrap().str().unwrap().clone();
        let mut counts = std::collections::HashMap::new();
        for v in ca.into_iter().flatten() {
            *counts.entry(v.to_string()).or_insert(0usize) += 1;
        }
        // 12 of 16 rows per class land in training.
        for class in ["A", "B", "C", "D", "E"] {
            assert_eq!(counts[class], 12);
        }
    }

    #[test]
    fn test_tiny_class_rejected() {
        let df = df!(
            "x" => &[1.0, 2.0],
            "classe" => &["A", "B"]
        )
        .unwrap();
        assert!(stratified_split(&df, "classe", 0.75, 1).is_err());
    }

    #[test]
    fn test_invalid_fraction_rejected() {
        let df = balanced_frame(8);
        assert!(stratified_split(&df, "classe", 0.0, 1).is_err());
        assert!(stratified_split(&df, "classe", 1.0, 1).is_err());
    }
}
