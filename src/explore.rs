//! Correlation exploration over the cleaned predictors

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// One highly-correlated predictor pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelatedPair {
    pub left: String,
    pub right: String,
    pub r: f64,
}

/// Pearson correlation matrix of the feature columns.
///
/// Constant columns get zero correlation with everything (the cleaner should
/// have removed them, but the matrix must still be well defined).
pub fn correlation_matrix(x: &Array2<f64>) -> Array2<f64> {
    let n_rows = x.nrows();
    let n_cols = x.ncols();
    let n = n_rows as f64;

    let means: Vec<f64> = (0..n_cols).map(|j| x.column(j).sum() / n).collect();
    let stds: Vec<f64> = (0..n_cols)
        .map(|j| {
            let m = means[j];
            (x.column(j).iter().map(|v| (v - m).powi(2)).sum::<f64>() / n).sqrt()
        })
        .collect();

    let mut corr = Array2::zeros((n_cols, n_cols));
    // Upper triangle in parallel, mirrored afterwards.
    let entries: Vec<(usize, usize, f64)> = (0..n_cols)
        .into_par_iter()
        .flat_map_iter(|i| {
            let means = &means;
            let stds = &stds;
            (i..n_cols).map(move |j| {
                if stds[i] == 0.0 || stds[j] == 0.0 {
                    return (i, j, if i == j { 1.0 } else { 0.0 });
                }
                let cov = x
                    .column(i)
                    .iter()
                    .zip(x.column(j).iter())
                    .map(|(a, b)| (a - means[i]) * (b - means[j]))
                    .sum::<f64>()
                    / n;
                (i, j, cov / (stds[i] * stds[j]))
            })
        })
        .collect();

    for (i, j, r) in entries {
        corr[[i, j]] = r;
        corr[[j, i]] = r;
    }
    corr
}

/// Off-diagonal pairs with |r| at or above `threshold`, strongest first.
pub fn top_correlated_pairs(
    corr: &Array2<f64>,
    names: &[String],
    threshold: f64,
    limit: usize,
) -> Vec<CorrelatedPair> {
    let n = corr.nrows();
    let mut pairs = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            let r = corr[[i, j]];
            if r.abs() >= threshold {
                pairs.push(CorrelatedPair {
                    left: names[i].clone(),
                    right: names[j].clone(),
                    r,
                });
            }
        }
    }
    pairs.sort_by(|a, b| {
        b.r.abs()
            .partial_cmp(&a.r.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    pairs.truncate(limit);
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn sample_matrix() -> Array2<f64> {
        // col1 = i, col2 = -2*i (perfectly anti-correlated), col3 = noiseish
        Array2::from_shape_fn((50, 3), |(i, j)| match j {
            0 => i as f64,
            1 => -2.0 * i as f64,
            _ => ((i * 7919) % 13) as f64,
        })
    }

    #[test]
    fn test_diagonal_is_one() {
        let corr = correlation_matrix(&sample_matrix());
        for i in 0..3 {
            assert!((corr[[i, i]] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_perfect_anticorrelation() {
        let corr = correlation_matrix(&sample_matrix());
        assert!((corr[[0, 1]] + 1.0).abs() < 1e-9);
        assert_eq!(corr[[0, 1]], corr[[1, 0]]);
    }

    #[test]
    fn test_constant_column_is_zero() {
        let x = Array2::from_shape_fn((20, 2), |(i, j)| if j == 0 { i as f64 } else { 3.0 });
        let corr = correlation_matrix(&x);
        assert_eq!(corr[[0, 1]], 0.0);
        assert_eq!(corr[[1, 1]], 1.0);
    }

    #[test]
    fn test_top_pairs_threshold_and_order() {
        let corr = correlation_matrix(&sample_matrix());
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let pairs = top_correlated_pairs(&corr, &names, 0.8, 10);

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].left, "a");
        assert_eq!(pairs[0].right, "b");
        assert!(pairs[0].r < -0.99);
    }
}
