//! Column pruning
//!
//! The raw tables carry identifier columns, hundreds of summary columns that
//! are almost entirely missing, and a handful of near-constant predictors.
//! The drop set is computed from the training subset only and then applied
//! verbatim to the validation and quiz tables, so no validation statistic can
//! influence which columns survive.

use crate::error::{HarbenchError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Cleaning thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Number of leading identifier columns to drop unconditionally
    /// (row id, subject name, timestamps, window markers).
    pub identifier_columns: usize,
    /// A column is near-zero-variance when its frequency ratio is at least
    /// this value and its unique percentage is below `unique_cut`.
    pub freq_cut: f64,
    /// Unique-value percentage threshold for the near-zero-variance test.
    pub unique_cut: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            identifier_columns: 7,
            freq_cut: 19.0,
            unique_cut: 10.0,
        }
    }
}

/// The fitted keep/drop decision, with the reason for every drop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSelection {
    label: String,
    kept: Vec<String>,
    pub dropped_identifiers: Vec<String>,
    pub dropped_near_zero: Vec<String>,
    pub dropped_missing: Vec<String>,
}

impl ColumnSelection {
    /// Compute the drop set from the training subset.
    pub fn fit(df: &DataFrame, label: &str, config: &CleaningConfig) -> Result<Self> {
        let all_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        if !all_names.iter().any(|n| n == label) {
            return Err(HarbenchError::ColumnNotFound(label.to_string()));
        }

        let mut dropped_identifiers = Vec::new();
        let mut dropped_near_zero = Vec::new();
        let mut dropped_missing = Vec::new();
        let mut kept = Vec::new();

        for (position, name) in all_names.iter().enumerate() {
            if name == label {
                // The label is exempt from every heuristic, but it must be
                // usable: a label with missing values is a schema defect.
                let nulls = df.column(name)?.null_count();
                if position < config.identifier_columns || nulls > 0 {
                    return Err(HarbenchError::CleaningError(format!(
                        "label column '{label}' would be dropped (position {position}, {nulls} nulls)"
                    )));
                }
                continue;
            }

            if position < config.identifier_columns {
                dropped_identifiers.push(name.clone());
                continue;
            }

            let column = df.column(name)?;

            if column.null_count() > 0 {
                dropped_missing.push(name.clone());
                continue;
            }

            let freq = column_frequencies(column)?;
            if freq.is_near_zero_variance(config) {
                debug!(
                    column = name.as_str(),
                    freq_ratio = freq.freq_ratio(),
                    unique_pct = freq.unique_pct(),
                    "near-zero-variance predictor"
                );
                dropped_near_zero.push(name.clone());
                continue;
            }

            kept.push(name.clone());
        }

        if kept.is_empty() {
            return Err(HarbenchError::CleaningError(
                "no predictor columns survived cleaning".to_string(),
            ));
        }

        info!(
            kept = kept.len(),
            identifiers = dropped_identifiers.len(),
            near_zero = dropped_near_zero.len(),
            missing = dropped_missing.len(),
            "fitted column selection"
        );

        Ok(Self {
            label: label.to_string(),
            kept,
            dropped_identifiers,
            dropped_near_zero,
            dropped_missing,
        })
    }

    /// Predictor columns that survived, in original order.
    pub fn kept(&self) -> &[String] {
        &self.kept
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn dropped_total(&self) -> usize {
        self.dropped_identifiers.len() + self.dropped_near_zero.len() + self.dropped_missing.len()
    }

    /// Apply the fitted selection to any table with the same schema.
    ///
    /// The label column rides along when present (training/validation) and is
    /// simply absent for the quiz set.
    pub fn apply(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut cols: Vec<String> = self.kept.clone();
        if df.column(&self.label).is_ok() {
            cols.push(self.label.clone());
        }
        df.select(cols).map_err(HarbenchError::from)
    }
}

/// Value-frequency statistics for one column.
struct FrequencyStats {
    non_null: usize,
    distinct: usize,
    top: usize,
    second: usize,
}

impl FrequencyStats {
    fn freq_ratio(&self) -> f64 {
        if self.second == 0 {
            f64::INFINITY
        } else {
            self.top as f64 / self.second as f64
        }
    }

    fn unique_pct(&self) -> f64 {
        if self.non_null == 0 {
            0.0
        } else {
            100.0 * self.distinct as f64 / self.non_null as f64
        }
    }

    fn is_near_zero_variance(&self, config: &CleaningConfig) -> bool {
        if self.distinct <= 1 {
            return true;
        }
        self.freq_ratio() >= config.freq_cut && self.unique_pct() < config.unique_cut
    }
}

fn column_frequencies(column: &Column) -> Result<FrequencyStats> {
    let mut non_null = 0usize;
    let mut freqs: Vec<usize>;

    if let Ok(ca) = column.str() {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for value in ca.into_iter().flatten() {
            non_null += 1;
            *counts.entry(value).or_insert(0) += 1;
        }
        freqs = counts.into_values().collect();
    } else {
        let casted = column
            .cast(&DataType::Float64)
            .map_err(|e| HarbenchError::DataError(e.to_string()))?;
        let ca = casted
            .f64()
            .map_err(|e| HarbenchError::DataError(e.to_string()))?;
        let mut counts: HashMap<u64, usize> = HashMap::new();
        for value in ca.into_iter().flatten() {
            non_null += 1;
            *counts.entry(value.to_bits()).or_insert(0) += 1;
        }
        freqs = counts.into_values().collect();
    }

    freqs.sort_unstable_by(|a, b| b.cmp(a));

    Ok(FrequencyStats {
        non_null,
        distinct: freqs.len(),
        top: freqs.first().copied().unwrap_or(0),
        second: freqs.get(1).copied().unwrap_or(0),
    })
}
