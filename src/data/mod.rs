//! Dataset loading and partitioning
//!
//! The pipeline works on two tables: a labeled training set and a 20-row
//! unlabeled quiz set. Both are Polars DataFrames; models consume them as
//! `ndarray` matrices produced by the helpers here.

mod loader;
mod split;

pub use loader::{
    fetch_dataset, load_csv, validate_quiz_schema, validate_training_schema, DatasetSource,
    QUIZ_URL, TRAINING_URL,
};
pub use split::{stratified_split, SplitSummary};

use crate::error::{HarbenchError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Mapping between label strings and the class indices models train on.
///
/// Classes are stored sorted, so index order is stable across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoding {
    classes: Vec<String>,
}

impl LabelEncoding {
    /// Build an encoding from the distinct values of a label column.
    pub fn from_column(df: &DataFrame, label: &str) -> Result<Self> {
        let series = df
            .column(label)
            .map_err(|_| HarbenchError::ColumnNotFound(label.to_string()))?;

        let ca = series
            .str()
            .map_err(|_| HarbenchError::SchemaError(format!("label column '{label}' is not categorical")))?;

        let mut classes: Vec<String> = ca
            .into_iter()
            .flatten()
            .map(|s| s.to_string())
            .collect();
        classes.sort();
        classes.dedup();

        if classes.is_empty() {
            return Err(HarbenchError::SchemaError(format!(
                "label column '{label}' has no values"
            )));
        }

        Ok(Self { classes })
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Encode a label column as class indices.
    pub fn encode(&self, df: &DataFrame, label: &str) -> Result<Array1<f64>> {
        let series = df
            .column(label)
            .map_err(|_| HarbenchError::ColumnNotFound(label.to_string()))?;
        let ca = series
            .str()
            .map_err(|_| HarbenchError::SchemaError(format!("label column '{label}' is not categorical")))?;

        let mut out = Vec::with_capacity(ca.len());
        for value in ca.into_iter() {
            let value = value.ok_or_else(|| {
                HarbenchError::SchemaError(format!("label column '{label}' contains missing values"))
            })?;
            let idx = self
                .classes
                .iter()
                .position(|c| c == value)
                .ok_or_else(|| {
                    HarbenchError::SchemaError(format!("unknown label value '{value}' in '{label}'"))
                })?;
            out.push(idx as f64);
        }

        Ok(Array1::from_vec(out))
    }

    /// Map a class index back to its label string.
    pub fn decode(&self, class_idx: f64) -> &str {
        let idx = (class_idx.round() as usize).min(self.classes.len().saturating_sub(1));
        &self.classes[idx]
    }
}

/// Extract named columns from a DataFrame into a row-major `Array2<f64>`.
///
/// Columns are cast to Float64 first; the cleaner guarantees no nulls reach
/// this point, so a residual null is a hard error rather than a silent zero.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let series = df
                .column(col_name)
                .map_err(|_| HarbenchError::ColumnNotFound(col_name.clone()))?;
            let series_f64 = series
                .cast(&DataType::Float64)
                .map_err(|e| HarbenchError::DataError(e.to_string()))?;
            let values: Vec<f64> = series_f64
                .f64()
                .map_err(|e| HarbenchError::DataError(e.to_string()))?
                .into_iter()
                .map(|v| {
                    v.ok_or_else(|| {
                        HarbenchError::DataError(format!(
                            "column '{col_name}' contains missing values after cleaning"
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_refs[c][r]
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label_frame() -> DataFrame {
        df!(
            "roll" => &[1.0, 2.0, 3.0, 4.0],
            "classe" => &["B", "A", "B", "C"]
        )
        .unwrap()
    }

    #[test]
    fn test_encoding_is_sorted() {
        let df = label_frame();
        let encoding = LabelEncoding::from_column(&df, "classe").unwrap();
        assert_eq!(encoding.classes(), &["A", "B", "C"]);
        assert_eq!(encoding.n_classes(), 3);
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let df = label_frame();
        let encoding = LabelEncoding::from_column(&df, "classe").unwrap();
        let y = encoding.encode(&df, "classe").unwrap();
        assert_eq!(y.to_vec(), vec![1.0, 0.0, 1.0, 2.0]);
        assert_eq!(encoding.decode(y[0]), "B");
        assert_eq!(encoding.decode(y[3]), "C");
    }

    #[test]
    fn test_unknown_label_rejected() {
        let train = label_frame();
        let encoding = LabelEncoding::from_column(&train, "classe").unwrap();
        let other = df!(
            "roll" => &[1.0],
            "classe" => &["Z"]
        )
        .unwrap();
        assert!(encoding.encode(&other, "classe").is_err());
    }

    #[test]
    fn test_columns_to_array2() {
        let df = df!(
            "a" => &[1.0, 2.0],
            "b" => &[3.0, 4.0]
        )
        .unwrap();
        let x = columns_to_array2(&df, &["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(x.shape(), &[2, 2]);
        assert_eq!(x[[0, 1]], 3.0);
        assert_eq!(x[[1, 0]], 2.0);
    }

    #[test]
    fn test_columns_to_array2_rejects_nulls() {
        let df = df!(
            "a" => &[Some(1.0), None]
        )
        .unwrap();
        assert!(columns_to_array2(&df, &["a".to_string()]).is_err());
    }
}
