//! Gradient Boosting Classifier.
//!
//! Binary log-loss boosting with regression trees as weak learners:
//!
//! 1. Start from the log-odds of the positive class.
//! 2. Each round, fit a tree to the pseudo-residuals `y - p`.
//! 3. Replace each leaf value with a Newton step
//!    `sum(y - p) / sum(p * (1 - p))` over the leaf's samples.
//! 4. Add `learning_rate * tree(x)` to the raw scores.
//!
//! Probabilities are `sigmoid(raw score)`.

use std::collections::BTreeMap;

use super::estimator::{validate_fit_inputs, Classifier, ParamSet, ParamValue};
use super::matrix::FeatureMatrix;
use super::tree::{RegressionTree, TreeParams};
use crate::error::{OfferError, Result};
use crate::state::FitState;

/// Denominator below which a Newton step is treated as zero
const NEWTON_EPS: f64 = 1e-150;

#[derive(Debug, Clone)]
struct BoostedTrees {
    init_score: f64,
    trees: Vec<RegressionTree>,
    importances: Vec<f64>,
    n_features: usize,
}

#[derive(Debug, Clone)]
pub struct GradientBoostingClassifier {
    n_estimators: usize,
    learning_rate: f64,
    tree: TreeParams,
    state: FitState<BoostedTrees>,
}

impl Default for GradientBoostingClassifier {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            tree: TreeParams::default(),
            state: FitState::Unfitted,
        }
    }
}

impl GradientBoostingClassifier {
    /// Defaults: 100 trees, learning rate 0.1, depth 3.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_estimators(mut self, n_estimators: usize) -> Self {
        self.n_estimators = n_estimators;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.tree.max_depth = max_depth;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.tree.min_samples_leaf = min_samples_leaf.max(1);
        self
    }

    /// Number of fitted trees (0 before fit).
    pub fn n_trees(&self) -> usize {
        self.state.as_option().map_or(0, |m| m.trees.len())
    }

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }

    fn raw_scores(&self, model: &BoostedTrees, x: &FeatureMatrix) -> Vec<f64> {
        x.rows()
            .iter()
            .map(|row| {
                model.init_score
                    + self.learning_rate * model.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
            })
            .collect()
    }
}

impl Classifier for GradientBoostingClassifier {
    fn name(&self) -> &'static str {
        "GradientBoostingClassifier"
    }

    fn params(&self) -> ParamSet {
        let mut params = ParamSet::new();
        params.insert("n_estimators".into(), ParamValue::Int(self.n_estimators as i64));
        params.insert("learning_rate".into(), ParamValue::Float(self.learning_rate));
        self.tree.to_param_set(&mut params);
        params
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        match name {
            "n_estimators" => {
                let n = value.as_usize(name)?;
                if n == 0 {
                    return Err(OfferError::InvalidParameter(
                        "'n_estimators' must be at least 1".to_string(),
                    ));
                }
                self.n_estimators = n;
            }
            "learning_rate" => {
                let lr = value.as_f64();
                if !(lr > 0.0 && lr.is_finite()) {
                    return Err(OfferError::InvalidParameter(format!(
                        "'learning_rate' must be positive, got {}",
                        lr
                    )));
                }
                self.learning_rate = lr;
            }
            _ => {
                if !self.tree.set(name, value)? {
                    return Err(OfferError::InvalidParameter(format!(
                        "{} has no parameter '{}'",
                        self.name(),
                        name
                    )));
                }
            }
        }
        Ok(())
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &[usize]) -> Result<()> {
        validate_fit_inputs(x, y)?;

        let n = x.n_rows();
        let targets: Vec<f64> = y.iter().map(|&label| label as f64).collect();
        let positives = targets.iter().sum::<f64>();
        if positives == 0.0 || positives == n as f64 {
            return Err(OfferError::InvalidParameter(
                "training labels contain a single class".to_string(),
            ));
        }

        let p = positives / n as f64;
        let init_score = (p / (1.0 - p)).ln();
        let mut raw = vec![init_score; n];
        let indices: Vec<usize> = (0..n).collect();

        let mut trees = Vec::with_capacity(self.n_estimators);
        let mut importance_sum = vec![0.0; x.n_features()];
        let mut informative_trees = 0usize;

        for _ in 0..self.n_estimators {
            let probs: Vec<f64> = raw.iter().map(|&r| Self::sigmoid(r)).collect();
            let residuals: Vec<f64> = targets
                .iter()
                .zip(probs.iter())
                .map(|(t, p)| t - p)
                .collect();

            let mut tree = RegressionTree::fit(x, &residuals, &indices, &self.tree);

            // Newton step per leaf
            let mut sums: BTreeMap<usize, (f64, f64)> = BTreeMap::new();
            for i in 0..n {
                let leaf = tree.leaf_index(x.row(i));
                let entry = sums.entry(leaf).or_insert((0.0, 0.0));
                entry.0 += residuals[i];
                entry.1 += probs[i] * (1.0 - probs[i]);
            }
            let leaf_values: BTreeMap<usize, f64> = sums
                .into_iter()
                .map(|(leaf, (num, den))| {
                    let value = if den.abs() < NEWTON_EPS { 0.0 } else { num / den };
                    (leaf, value)
                })
                .collect();
            tree.set_leaf_values(&leaf_values);

            for (score, row) in raw.iter_mut().zip(x.rows()) {
                *score += self.learning_rate * tree.predict_row(row);
            }

            let tree_importance = tree.normalized_importances();
            if tree_importance.iter().any(|v| *v > 0.0) {
                informative_trees += 1;
                for (acc, v) in importance_sum.iter_mut().zip(tree_importance) {
                    *acc += v;
                }
            }
            trees.push(tree);
        }

        let importances = if informative_trees > 0 {
            let total: f64 = importance_sum.iter().sum();
            importance_sum.iter().map(|v| v / total).collect()
        } else {
            vec![0.0; x.n_features()]
        };

        self.state = FitState::Fitted(BoostedTrees {
            init_score,
            trees,
            importances,
            n_features: x.n_features(),
        });
        Ok(())
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let model = self.state.get(self.name())?;
        if x.n_features() != model.n_features {
            return Err(OfferError::FeatureMismatch {
                expected: model.n_features,
                got: x.n_features(),
            });
        }
        Ok(self
            .raw_scores(model, x)
            .into_iter()
            .map(Self::sigmoid)
            .collect())
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.state.as_option().map(|m| m.importances.clone())
    }

    fn clone_unfitted(&self) -> Box<dyn Classifier> {
        Box::new(Self {
            n_estimators: self.n_estimators,
            learning_rate: self.learning_rate,
            tree: self.tree,
            state: FitState::Unfitted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (FeatureMatrix, Vec<usize>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let signal = i as f64;
            let noise = ((i * 7) % 11) as f64;
            rows.push(vec![signal, noise]);
            labels.push(usize::from(i >= 28));
        }
        let x = FeatureMatrix::from_rows(vec!["signal".into(), "noise".into()], rows).unwrap();
        (x, labels)
    }

    #[test]
    fn test_fit_predicts_training_labels() {
        let (x, y) = separable();
        let mut gb = GradientBoostingClassifier::new().with_n_estimators(30);
        gb.fit(&x, &y).unwrap();

        assert_eq!(gb.n_trees(), 30);
        assert_eq!(gb.predict(&x).unwrap(), y);

        let probs = gb.predict_proba(&x).unwrap();
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
        assert!(probs[39] > probs[0]);
    }

    #[test]
    fn test_importances_favor_signal() {
        let (x, y) = separable();
        let mut gb = GradientBoostingClassifier::new().with_n_estimators(10);
        gb.fit(&x, &y).unwrap();

        let imp = gb.feature_importances().unwrap();
        assert!((imp.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(imp[0] > imp[1]);
    }

    #[test]
    fn test_single_class_errors() {
        let (x, _) = separable();
        let y = vec![0; x.n_rows()];
        let mut gb = GradientBoostingClassifier::new();
        assert!(matches!(gb.fit(&x, &y), Err(OfferError::InvalidParameter(_))));
    }

    #[test]
    fn test_predict_before_fit_errors() {
        let (x, _) = separable();
        let gb = GradientBoostingClassifier::new();
        assert!(matches!(gb.predict_proba(&x), Err(OfferError::NotFitted { .. })));
    }

    #[test]
    fn test_set_params_round_trip() {
        let mut gb = GradientBoostingClassifier::new();
        let mut params = ParamSet::new();
        params.insert("n_estimators".into(), ParamValue::Int(7));
        params.insert("learning_rate".into(), ParamValue::Float(0.5));
        params.insert("max_depth".into(), ParamValue::Int(2));
        gb.set_params(&params).unwrap();

        let current = gb.params();
        assert_eq!(current["n_estimators"], ParamValue::Int(7));
        assert_eq!(current["learning_rate"], ParamValue::Float(0.5));
        assert_eq!(current["max_depth"], ParamValue::Int(2));

        let copy = gb.clone_unfitted();
        assert_eq!(copy.params(), current);
    }

    #[test]
    fn test_rejects_bad_params() {
        let mut gb = GradientBoostingClassifier::new();
        assert!(gb.set_param("n_estimators", ParamValue::Int(0)).is_err());
        assert!(gb.set_param("learning_rate", ParamValue::Float(-0.1)).is_err());
        assert!(gb.set_param("colour", ParamValue::Int(1)).is_err());
    }
}
