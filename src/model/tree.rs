//! CART regression tree
//!
//! Exact-greedy splits minimising the squared error of the targets. Used as
//! the weak learner for gradient boosting and, on 0/1 targets, as a
//! standalone classification tree (squared error on 0/1 is proportional to
//! Gini impurity).

use std::collections::BTreeMap;

use super::estimator::{validate_fit_inputs, Classifier, ParamSet, ParamValue};
use super::matrix::FeatureMatrix;
use crate::error::{OfferError, Result};
use crate::state::FitState;

/// Minimum squared-error reduction for a split to count
const MIN_GAIN: f64 = 1e-12;

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl TreeParams {
    pub(crate) fn to_param_set(self, params: &mut ParamSet) {
        params.insert("max_depth".into(), ParamValue::Int(self.max_depth as i64));
        params.insert(
            "min_samples_split".into(),
            ParamValue::Int(self.min_samples_split as i64),
        );
        params.insert(
            "min_samples_leaf".into(),
            ParamValue::Int(self.min_samples_leaf as i64),
        );
    }

    /// Set a tree parameter by name; returns `Ok(false)` if `name` is not one.
    pub(crate) fn set(&mut self, name: &str, value: ParamValue) -> Result<bool> {
        match name {
            "max_depth" => self.max_depth = value.as_usize(name)?,
            "min_samples_split" => {
                let v = value.as_usize(name)?;
                if v < 2 {
                    return Err(OfferError::InvalidParameter(format!(
                        "'min_samples_split' must be at least 2, got {}",
                        v
                    )));
                }
                self.min_samples_split = v;
            }
            "min_samples_leaf" => {
                let v = value.as_usize(name)?;
                if v < 1 {
                    return Err(OfferError::InvalidParameter(
                        "'min_samples_leaf' must be at least 1".to_string(),
                    ));
                }
                self.min_samples_leaf = v;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// A fitted regression tree.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    /// Squared-error reduction credited to each feature
    impurity_decrease: Vec<f64>,
}

impl RegressionTree {
    /// Grow a tree on the rows of `x` listed in `indices`.
    pub fn fit(x: &FeatureMatrix, targets: &[f64], indices: &[usize], params: &TreeParams) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            impurity_decrease: vec![0.0; x.n_features()],
        };
        let mut samples = indices.to_vec();
        tree.build_node(x, targets, &mut samples, 0, params);
        tree
    }

    /// Value of the leaf `row` falls into.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        match &self.nodes[self.leaf_index(row)] {
            Node::Leaf { value } => *value,
            Node::Split { .. } => 0.0,
        }
    }

    /// Node index of the leaf `row` falls into.
    pub fn leaf_index(&self, row: &[f64]) -> usize {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return idx,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Overwrite the leaf values, e.g. with Newton steps during boosting.
    /// `values` maps leaf node index to its new value.
    pub fn set_leaf_values(&mut self, values: &BTreeMap<usize, f64>) {
        for (&idx, &new_value) in values {
            if let Some(Node::Leaf { value }) = self.nodes.get_mut(idx) {
                *value = new_value;
            }
        }
    }

    /// Width of the matrix the tree was grown on.
    pub fn n_features(&self) -> usize {
        self.impurity_decrease.len()
    }

    #[cfg(test)]
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    /// Importances normalised to sum to 1 (all zero for a single leaf).
    pub fn normalized_importances(&self) -> Vec<f64> {
        normalize(&self.impurity_decrease)
    }

    fn build_node(
        &mut self,
        x: &FeatureMatrix,
        targets: &[f64],
        samples: &mut [usize],
        depth: usize,
        params: &TreeParams,
    ) -> usize {
        let current = self.nodes.len();
        let value = mean(targets, samples);
        self.nodes.push(Node::Leaf { value });

        if depth >= params.max_depth
            || samples.len() < params.min_samples_split
            || samples.len() < 2 * params.min_samples_leaf
        {
            return current;
        }

        let split = match find_best_split(x, targets, samples, params.min_samples_leaf) {
            Some(s) => s,
            None => return current,
        };

        self.impurity_decrease[split.feature] += split.gain;

        // Partition in place: left rows first
        samples.sort_by(|&a, &b| {
            let a_left = x.row(a)[split.feature] <= split.threshold;
            let b_left = x.row(b)[split.feature] <= split.threshold;
            b_left.cmp(&a_left)
        });
        let n_left = samples
            .iter()
            .take_while(|&&i| x.row(i)[split.feature] <= split.threshold)
            .count();
        let (left_samples, right_samples) = samples.split_at_mut(n_left);

        let left = self.build_node(x, targets, left_samples, depth + 1, params);
        let right = self.build_node(x, targets, right_samples, depth + 1, params);

        self.nodes[current] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        current
    }
}

fn mean(targets: &[f64], samples: &[usize]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().map(|&i| targets[i]).sum::<f64>() / samples.len() as f64
}

fn normalize(values: &[f64]) -> Vec<f64> {
    let total: f64 = values.iter().sum();
    if total > 0.0 {
        values.iter().map(|v| v / total).collect()
    } else {
        vec![0.0; values.len()]
    }
}

/// Squared error of a group from its running sums.
fn sse(sum: f64, sum_sq: f64, n: f64) -> f64 {
    if n == 0.0 {
        0.0
    } else {
        (sum_sq - sum * sum / n).max(0.0)
    }
}

/// Best split over all features; the first feature wins equal gains.
fn find_best_split(
    x: &FeatureMatrix,
    targets: &[f64],
    samples: &[usize],
    min_samples_leaf: usize,
) -> Option<SplitCandidate> {
    let n = samples.len();
    let total_sum: f64 = samples.iter().map(|&i| targets[i]).sum();
    let total_sq: f64 = samples.iter().map(|&i| targets[i] * targets[i]).sum();
    let parent_sse = sse(total_sum, total_sq, n as f64);

    if parent_sse <= MIN_GAIN {
        return None;
    }

    let mut best: Option<SplitCandidate> = None;
    let mut order = samples.to_vec();

    for feature in 0..x.n_features() {
        order.sort_by(|&a, &b| x.row(a)[feature].total_cmp(&x.row(b)[feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;

        for k in 0..n - 1 {
            let t = targets[order[k]];
            left_sum += t;
            left_sq += t * t;

            let left_n = k + 1;
            let right_n = n - left_n;
            if left_n < min_samples_leaf || right_n < min_samples_leaf {
                continue;
            }

            let here = x.row(order[k])[feature];
            let next = x.row(order[k + 1])[feature];
            if next <= here {
                continue;
            }

            let gain = parent_sse
                - sse(left_sum, left_sq, left_n as f64)
                - sse(total_sum - left_sum, total_sq - left_sq, right_n as f64);

            if gain > MIN_GAIN && best.map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: here + (next - here) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}

/// Single classification tree; leaves hold the share of class 1.
#[derive(Debug, Clone)]
pub struct DecisionTreeClassifier {
    params: TreeParams,
    state: FitState<RegressionTree>,
}

impl Default for DecisionTreeClassifier {
    fn default() -> Self {
        Self {
            params: TreeParams {
                max_depth: 8,
                ..TreeParams::default()
            },
            state: FitState::Unfitted,
        }
    }
}

impl DecisionTreeClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.params.max_depth = max_depth;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.params.min_samples_leaf = min_samples_leaf.max(1);
        self
    }
}

impl Classifier for DecisionTreeClassifier {
    fn name(&self) -> &'static str {
        "DecisionTreeClassifier"
    }

    fn params(&self) -> ParamSet {
        let mut params = ParamSet::new();
        self.params.to_param_set(&mut params);
        params
    }

    fn set_param(&mut self, name: &str, value: ParamValue) -> Result<()> {
        if self.params.set(name, value)? {
            Ok(())
        } else {
            Err(OfferError::InvalidParameter(format!(
                "{} has no parameter '{}'",
                self.name(),
                name
            )))
        }
    }

    fn fit(&mut self, x: &FeatureMatrix, y: &[usize]) -> Result<()> {
        validate_fit_inputs(x, y)?;
        let targets: Vec<f64> = y.iter().map(|&label| label as f64).collect();
        let indices: Vec<usize> = (0..x.n_rows()).collect();
        self.state = FitState::Fitted(RegressionTree::fit(x, &targets, &indices, &self.params));
        Ok(())
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let tree = self.state.get(self.name())?;
        if x.n_features() != tree.n_features() {
            return Err(OfferError::FeatureMismatch {
                expected: tree.n_features(),
                got: x.n_features(),
            });
        }
        Ok(x.rows().iter().map(|row| tree.predict_row(row)).collect())
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        self.state.as_option().map(|tree| tree.normalized_importances())
    }

    fn clone_unfitted(&self) -> Box<dyn Classifier> {
        Box::new(Self {
            params: self.params,
            state: FitState::Unfitted,
        })
    }
}
