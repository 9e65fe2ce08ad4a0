//! Standard scaler (z-score normalisation).
//!
//! `z = (x - mean) / std`, with the population standard deviation learned
//! per feature. Constant features get a scale of 1 so they map to 0.

use serde::Serialize;

use super::matrix::FeatureMatrix;
use crate::error::{OfferError, Result};
use crate::state::FitState;

/// Per-feature statistics learned by [`StandardScaler::fit`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    state: FitState<ScalerParams>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    pub fn params(&self) -> Option<&ScalerParams> {
        self.state.as_option()
    }

    pub fn fit(&mut self, x: &FeatureMatrix) -> Result<()> {
        let n = x.n_rows();
        if n == 0 {
            return Err(OfferError::EmptyData(
                "Cannot fit StandardScaler on empty data".to_string(),
            ));
        }

        let mut mean = Vec::with_capacity(x.n_features());
        let mut std = Vec::with_capacity(x.n_features());

        for j in 0..x.n_features() {
            let column = x.column(j);
            let m = column.iter().sum::<f64>() / n as f64;
            let var = column.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n as f64;
            let s = var.sqrt();
            mean.push(m);
            std.push(if s == 0.0 { 1.0 } else { s });
        }

        self.state = FitState::Fitted(ScalerParams { mean, std });
        Ok(())
    }

    pub fn transform(&self, x: &FeatureMatrix) -> Result<FeatureMatrix> {
        let params = self.state.get("StandardScaler")?;
        if x.n_features() != params.mean.len() {
            return Err(OfferError::FeatureMismatch {
                expected: params.mean.len(),
                got: x.n_features(),
            });
        }

        let mut scaled = x.clone();
        for row in scaled.rows_mut() {
            for (j, value) in row.iter_mut().enumerate() {
                *value = (*value - params.mean[j]) / params.std[j];
            }
        }
        Ok(scaled)
    }

    pub fn fit_transform(&mut self, x: &FeatureMatrix) -> Result<FeatureMatrix> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
        let names = (0..rows[0].len()).map(|i| format!("f{}", i)).collect();
        FeatureMatrix::from_rows(names, rows).unwrap()
    }

    #[test]
    fn test_scaled_columns_have_zero_mean_unit_variance() {
        let x = matrix(vec![
            vec![1.0, 10.0],
            vec![2.0, 20.0],
            vec![3.0, 30.0],
            vec![4.0, 40.0],
        ]);
        let mut scaler = StandardScaler::new();
        let z = scaler.fit_transform(&x).unwrap();

        for j in 0..2 {
            let col = z.column(j);
            let mean = col.iter().sum::<f64>() / col.len() as f64;
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / col.len() as f64;
            assert!(mean.abs() < 1e-12);
            assert!((var - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_constant_feature_maps_to_zero() {
        let x = matrix(vec![vec![5.0], vec![5.0], vec![5.0]]);
        let mut scaler = StandardScaler::new();
        let z = scaler.fit_transform(&x).unwrap();
        assert!(z.column(0).iter().all(|v| *v == 0.0));
        assert_eq!(scaler.params().unwrap().std, vec![1.0]);
    }

    #[test]
    fn test_transform_before_fit_errors() {
        let scaler = StandardScaler::new();
        let err = scaler.transform(&matrix(vec![vec![1.0]])).unwrap_err();
        assert!(matches!(err, OfferError::NotFitted { .. }));
    }

    #[test]
    fn test_width_mismatch_errors() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&matrix(vec![vec![1.0, 2.0], vec![2.0, 3.0]])).unwrap();
        let err = scaler.transform(&matrix(vec![vec![1.0]])).unwrap_err();
        assert!(matches!(err, OfferError::FeatureMismatch { expected: 2, got: 1 }));
    }
}
