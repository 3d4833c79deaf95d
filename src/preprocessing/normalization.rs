//! Column-wise feature standardisation.
//!
//! [`FeatureScaler`] is an explicit, caller-owned object: fit it on the rows
//! you choose (normally the training split), then transform any rows with
//! the fitted statistics. There is no module-level scaler, so concurrent
//! experiments on different datasets never share fitted state.
//!
//! ```text
//! normalized[i, j] = (x[i, j] - mean[j]) / std[j]
//! ```
//!
//! Constant columns (std below `min_std`) use std = 1 so they map to 0
//! instead of dividing by zero.
//!
//! # Usage
//!
//! ```
//! use pu_feature_prep::preprocessing::FeatureScaler;
//!
//! let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0]];
//! let mut scaler = FeatureScaler::new();
//! scaler.fit(rows.iter().map(|r| r.as_slice())).unwrap();
//!
//! let z = scaler.transform(&[2.0, 10.0]).unwrap();
//! assert_eq!(z, vec![0.0, 0.0]);
//! ```

use crate::error::{PrepError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Default floor below which a column is treated as constant.
pub const DEFAULT_MIN_STD: f64 = 1e-8;

/// Per-feature z-score scaler with explicit `fit` / `transform`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
    min_std: f64,
    n_samples: usize,
}

impl Default for FeatureScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureScaler {
    /// Create an unfitted scaler.
    pub fn new() -> Self {
        Self::with_min_std(DEFAULT_MIN_STD)
    }

    /// Create an unfitted scaler with a custom constant-column threshold.
    pub fn with_min_std(min_std: f64) -> Self {
        Self {
            means: Vec::new(),
            stds: Vec::new(),
            min_std,
            n_samples: 0,
        }
    }

    /// Whether `fit` has been called successfully.
    pub fn is_fitted(&self) -> bool {
        self.n_samples > 0
    }

    /// Number of rows the scaler was fitted on.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of columns (0 before fitting).
    pub fn feature_count(&self) -> usize {
        self.means.len()
    }

    /// Fitted column means.
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Fitted column standard deviations (constant columns report 1).
    pub fn stds(&self) -> &[f64] {
        &self.stds
    }

    /// (mean, std) of one column.
    pub fn feature_stats(&self, index: usize) -> Option<(f64, f64)> {
        Some((*self.means.get(index)?, *self.stds.get(index)?))
    }

    /// Fit column statistics, replacing any previous fit.
    ///
    /// # Errors
    ///
    /// [`PrepError::Validation`] for an empty input,
    /// [`PrepError::FeatureCount`] for rows of unequal length.
    pub fn fit<'a, I>(&mut self, rows: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        let rows: Vec<&[f64]> = rows.into_iter().collect();
        let first = rows
            .first()
            .ok_or_else(|| PrepError::Validation("cannot fit scaler on zero rows".to_string()))?;
        let n_features = first.len();

        if let Some(bad) = rows.iter().find(|r| r.len() != n_features) {
            return Err(PrepError::FeatureCount {
                expected: n_features,
                actual: bad.len(),
            });
        }

        let n = rows.len() as f64;
        let mut means = vec![0.0; n_features];
        for row in &rows {
            for (m, &x) in means.iter_mut().zip(row.iter()) {
                *m += x;
            }
        }
        for m in &mut means {
            *m /= n;
        }

        let mut stds = vec![0.0; n_features];
        for row in &rows {
            for ((s, &x), &m) in stds.iter_mut().zip(row.iter()).zip(means.iter()) {
                *s += (x - m).powi(2);
            }
        }
        for s in &mut stds {
            *s = (*s / n).sqrt();
            if !(*s >= self.min_std) {
                *s = 1.0;
            }
        }

        self.means = means;
        self.stds = stds;
        self.n_samples = rows.len();
        Ok(())
    }

    /// Standardise one row with the fitted statistics.
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.check_row(row)?;
        Ok(row
            .iter()
            .zip(self.means.iter().zip(self.stds.iter()))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect())
    }

    /// Standardise many rows.
    pub fn transform_batch<'a, I>(&self, rows: I) -> Result<Vec<Vec<f64>>>
    where
        I: IntoIterator<Item = &'a [f64]>,
    {
        rows.into_iter().map(|r| self.transform(r)).collect()
    }

    /// Standardise a `[N, F]` matrix.
    pub fn transform_matrix(&self, matrix: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted() {
            return Err(PrepError::Validation("scaler is not fitted".to_string()));
        }
        if matrix.ncols() != self.feature_count() {
            return Err(PrepError::FeatureCount {
                expected: self.feature_count(),
                actual: matrix.ncols(),
            });
        }
        let mut out = matrix.clone();
        for mut row in out.outer_iter_mut() {
            for ((x, &m), &s) in row.iter_mut().zip(self.means.iter()).zip(self.stds.iter()) {
                *x = (*x - m) / s;
            }
        }
        Ok(out)
    }

    /// Fit on `rows` and return them standardised.
    pub fn fit_transform<'a, I>(&mut self, rows: I) -> Result<Vec<Vec<f64>>>
    where
        I: IntoIterator<Item = &'a [f64]> + Clone,
    {
        self.fit(rows.clone())?;
        self.transform_batch(rows)
    }

    fn check_row(&self, row: &[f64]) -> Result<()> {
        if !self.is_fitted() {
            return Err(PrepError::Validation("scaler is not fitted".to_string()));
        }
        if row.len() != self.feature_count() {
            return Err(PrepError::FeatureCount {
                expected: self.feature_count(),
                actual: row.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn rows() -> Vec<Vec<f64>> {
        vec![
            vec![10.0, 5.0, 1.0],
            vec![20.0, 5.0, 2.0],
            vec![30.0, 5.0, 3.0],
            vec![40.0, 5.0, 4.0],
            vec![50.0, 5.0, 5.0],
        ]
    }

    #[test]
    fn test_fit_statistics() {
        let data = rows();
        let mut scaler = FeatureScaler::new();
        scaler.fit(data.iter().map(|r| r.as_slice())).unwrap();

        assert!(scaler.is_fitted());
        assert_eq!(scaler.n_samples(), 5);
        let (mean, std) = scaler.feature_stats(0).unwrap();
        assert!((mean - 30.0).abs() < 1e-10);
        assert!((std - 14.142135).abs() < 0.01);
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let data = rows();
        let mut scaler = FeatureScaler::new();
        let out = scaler.fit_transform(data.iter().map(|r| r.as_slice())).unwrap();

        assert_eq!(scaler.stds()[1], 1.0);
        assert!(out.iter().all(|r| r[1] == 0.0));
    }

    #[test]
    fn test_transformed_columns_standardised() {
        let data = rows();
        let mut scaler = FeatureScaler::new();
        let out = scaler.fit_transform(data.iter().map(|r| r.as_slice())).unwrap();

        let col: Vec<f64> = out.iter().map(|r| r[2]).collect();
        let mean = col.iter().sum::<f64>() / col.len() as f64;
        let var = col.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / col.len() as f64;
        assert!(mean.abs() < 1e-10);
        assert!((var - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_unfitted_and_mismatched_rows() {
        let scaler = FeatureScaler::new();
        assert!(matches!(
            scaler.transform(&[1.0]),
            Err(PrepError::Validation(_))
        ));

        let mut scaler = FeatureScaler::new();
        let bad = [vec![1.0, 2.0], vec![1.0]];
        assert!(matches!(
            scaler.fit(bad.iter().map(|r| r.as_slice())),
            Err(PrepError::FeatureCount { .. })
        ));

        assert!(scaler.fit(std::iter::empty::<&[f64]>()).is_err());
    }

    #[test]
    fn test_transform_matrix_matches_rows() {
        let data = rows();
        let mut scaler = FeatureScaler::new();
        scaler.fit(data.iter().map(|r| r.as_slice())).unwrap();

        let m = array![[10.0, 5.0, 1.0], [50.0, 5.0, 5.0]];
        let z = scaler.transform_matrix(&m).unwrap();
        let r = scaler.transform(&[50.0, 5.0, 5.0]).unwrap();
        assert_eq!(z.row(1).to_vec(), r);
    }

    #[test]
    fn test_independent_scalers_do_not_share_state() {
        let mut a = FeatureScaler::new();
        let mut b = FeatureScaler::new();
        a.fit([[0.0, 0.0].as_slice(), [2.0, 2.0].as_slice()]).unwrap();
        b.fit([[100.0, 100.0].as_slice(), [300.0, 300.0].as_slice()]).unwrap();
        assert_ne!(a.means(), b.means());
    }

    #[test]
    fn test_serde_roundtrip_keeps_fit() {
        let data = rows();
        let mut scaler = FeatureScaler::new();
        scaler.fit(data.iter().map(|r| r.as_slice())).unwrap();

        let json = serde_json::to_string(&scaler).unwrap();
        let loaded: FeatureScaler = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.n_samples(), scaler.n_samples());
        for (a, b) in loaded.stds().iter().zip(scaler.stds()) {
            assert!((a - b).abs() < 1e-12);
        }
    }
}
