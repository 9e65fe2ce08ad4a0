//! Classifier trait and hyperparameter values
//!
//! Any binary classifier can be tuned and trained by the predictive model
//! as long as it exposes its hyperparameters by name and can hand out an
//! unfitted copy of itself.

use std::collections::BTreeMap;
use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use super::matrix::FeatureMatrix;
use crate::error::{OfferError, Result};

/// A single hyperparameter value.
///
/// Deserializes from a bare JSON number: integers become `Int`, anything
/// with a fraction or exponent becomes `Float`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
}

impl ParamValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            ParamValue::Int(v) => *v as f64,
            ParamValue::Float(v) => *v,
        }
    }

    /// Interpret as a non-negative count. Integral floats such as `3.0` are
    /// accepted.
    pub fn as_usize(&self, name: &str) -> Result<usize> {
        match *self {
            ParamValue::Int(v) if v >= 0 => Ok(v as usize),
            ParamValue::Float(v) if v >= 0.0 && v.fract() == 0.0 => Ok(v as usize),
            other => Err(OfferError::InvalidParameter(format!(
                "'{}' must be a non-negative integer, got {}",
                name, other
            ))),
        }
    }
}

impl std::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// One concrete hyperparameter configuration.
pub type ParamSet = BTreeMap<String, ParamValue>;

/// Render a parameter set as `name=value, ...`.
pub fn format_params(params: &ParamSet) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Binary classifier with named hyperparameters.
pub trait Classifier: Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Current hyperparameters.
    fn params(&self) -> ParamSet;

    /// Set one hyperparameter; unknown names are an `InvalidParameter` error.
    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()>;

    fn set_params(&mut self, params: &ParamSet) -> Result<()> {
        for (name, value) in params {
            self.set_param(name, *value)?;
        }
        Ok(())
    }

    /// Train on `x` with labels in {0, 1}.
    fn fit(&mut self, x: &FeatureMatrix, y: &[usize]) -> Result<()>;

    /// Probability of class 1 for each row.
    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>>;

    /// Class with the higher probability; ties go to class 0.
    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<usize>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| usize::from(p > 0.5))
            .collect())
    }

    /// Normalised feature importances, if the model defines them.
    fn feature_importances(&self) -> Option<Vec<f64>>;

    /// Copy with the same hyperparameters and no learned state.
    fn clone_unfitted(&self) -> Box<dyn Classifier>;
}

/// Check shapes and label values before fitting.
pub fn validate_fit_inputs(x: &FeatureMatrix, y: &[usize]) -> Result<()> {
    if x.n_rows() == 0 {
        return Err(OfferError::EmptyData("Cannot fit with 0 samples".to_string()));
    }
    if x.n_rows() != y.len() {
        return Err(OfferError::LabelMismatch {
            expected: x.n_rows(),
            got: y.len(),
        });
    }
    if let Some(bad) = y.iter().find(|&&label| label > 1) {
        return Err(OfferError::InvalidParameter(format!(
            "labels must be 0 or 1, got {}",
            bad
        )));
    }
    Ok(())
}
