//! Per-label distribution summaries of feature columns
//!
//! Five-number summaries (plus mean) of a feature split by the positive and
//! negative class, used to show how the most important features differ
//! between completed and not-completed offers.

use polars::prelude::*;
use serde::Serialize;

use super::label::label_mask;
use super::preparation::require_columns;
use crate::error::Result;

/// Summary of the non-missing values of one feature within one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantileSummary {
    pub count: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
}

impl QuantileSummary {
    /// `None` when there are no non-missing values.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));

        Some(Self {
            count: sorted.len(),
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
        })
    }
}

/// Distribution of one feature for each class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureDistribution {
    pub feature: String,
    pub positive: Option<QuantileSummary>,
    pub negative: Option<QuantileSummary>,
}

/// Linear-interpolated quantile of sorted, non-empty values.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Summarise each of `features` separately for rows whose label matches
/// `positive_value` and rows whose label does not. Rows with a null label
/// are ignored, as are missing feature values.
pub fn feature_distributions(
    df: &DataFrame,
    features: &[String],
    label_column: &str,
    positive_value: &str,
) -> Result<Vec<FeatureDistribution>> {
    let names: Vec<&str> = features.iter().map(String::as_str).collect();
    require_columns(df, &names)?;
    let mask = label_mask(df, label_column, positive_value)?;

    let mut distributions = Vec::with_capacity(features.len());
    for feature in features {
        let values = df.column(feature)?.cast(&DataType::Float64)?;
        let mut positive = Vec::new();
        let mut negative = Vec::new();

        for (value, class) in values.f64()?.into_iter().zip(mask.iter()) {
            match (value, class) {
                (Some(v), Some(true)) => positive.push(v),
                (Some(v), Some(false)) => negative.push(v),
                _ => {}
            }
        }

        distributions.push(FeatureDistribution {
            feature: feature.clone(),
            positive: QuantileSummary::from_values(&positive),
            negative: QuantileSummary::from_values(&negative),
        });
    }

    Ok(distributions)
}
