//! Binary classification metrics.
//!
//! Class 1 is the positive class. Any ratio with a zero denominator is
//! reported as 0.0.

use serde::Serialize;

use crate::error::{OfferError, Result};

/// Confusion matrix counts for a binary problem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionCounts {
    pub fn from_labels(y_true: &[usize], y_pred: &[usize]) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(OfferError::LabelMismatch {
                expected: y_true.len(),
                got: y_pred.len(),
            });
        }

        let mut counts = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t == 1, p == 1) {
                (true, true) => counts.true_positive += 1,
                (false, true) => counts.false_positive += 1,
                (false, false) => counts.true_negative += 1,
                (true, false) => counts.false_negative += 1,
            }
        }
        Ok(counts)
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn precision(y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
    Ok(ConfusionCounts::from_labels(y_true, y_pred)?.precision())
}

pub fn recall(y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
    Ok(ConfusionCounts::from_labels(y_true, y_pred)?.recall())
}

pub fn f1_score(y_true: &[usize], y_pred: &[usize]) -> Result<f64> {
    Ok(ConfusionCounts::from_labels(y_true, y_pred)?.f1())
}

/// Test-set evaluation returned by `PredictiveModel::test_model`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: ConfusionCounts,
}

impl EvaluationMetrics {
    pub fn evaluate(y_true: &[usize], y_pred: &[usize]) -> Result<Self> {
        let confusion = ConfusionCounts::from_labels(y_true, y_pred)?;
        Ok(Self {
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
            confusion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hand_computed_counts() {
        let y_true = [1, 1, 1, 0, 0, 0, 1, 0];
        let y_pred = [1, 0, 1, 1, 0, 0, 1, 0];
        let c = ConfusionCounts::from_labels(&y_true, &y_pred).unwrap();
        assert_eq!(
            c,
            ConfusionCounts {
                true_positive: 3,
                false_positive: 1,
                true_negative: 3,
                false_negative: 1,
            }
        );
        assert!((c.precision() - 0.75).abs() < 1e-12);
        assert!((c.recall() - 0.75).abs() < 1e-12);
        assert!((c.f1() - 0.75).abs() < 1e-12);
        assert!((c.accuracy() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_zero_division_is_zero() {
        let y_true = [1, 1, 0];
        let y_pred = [0, 0, 0];
        assert_eq!(precision(&y_true, &y_pred).unwrap(), 0.0);
        assert_eq!(recall(&y_true, &y_pred).unwrap(), 0.0);
        assert_eq!(f1_score(&y_true, &y_pred).unwrap(), 0.0);
    }

    #[test]
    fn test_f1_is_harmonic_mean() {
        let y_true = [1, 1, 1, 1, 0];
        let y_pred = [1, 0, 0, 0, 0];
        // precision 1.0, recall 0.25
        let f1 = f1_score(&y_true, &y_pred).unwrap();
        assert!((f1 - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            precision(&[1, 0], &[1]),
            Err(OfferError::LabelMismatch { expected: 2, got: 1 })
        ));
    }
}
