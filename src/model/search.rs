//! Hyperparameter search with stratified k-fold cross-validation
//!
//! Every candidate parameter set is scored by the mean precision of the
//! positive class across folds. Candidates are evaluated in parallel; the
//! best one is refit on all of the data.

use std::collections::BTreeMap;
use std::path::Path;

use indicatif::ProgressBar;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::estimator::{Classifier, ParamSet, ParamValue};
use super::matrix::FeatureMatrix;
use super::metrics::precision;
use crate::error::{OfferError, Result};
use crate::utils::progress::{create_progress_bar, finish_with_success};

pub const DEFAULT_CV_FOLDS: usize = 5;

/// Candidate values for each parameter name.
pub type ParamSpace = BTreeMap<String, Vec<ParamValue>>;

/// Search space: one or more parameter spaces, each expanded to the
/// cartesian product of its value lists.
///
/// Deserializes from either a single JSON object or a list of objects:
///
/// ```json
/// {"n_estimators": [50, 100], "learning_rate": [0.1, 0.5]}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "GridRepr", into = "Vec<ParamSpace>")]
pub struct ParamGrid {
    spaces: Vec<ParamSpace>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GridRepr {
    One(ParamSpace),
    Many(Vec<ParamSpace>),
}

impl From<GridRepr> for ParamGrid {
    fn from(repr: GridRepr) -> Self {
        match repr {
            GridRepr::One(space) => Self { spaces: vec![space] },
            GridRepr::Many(spaces) => Self { spaces },
        }
    }
}

impl From<ParamGrid> for Vec<ParamSpace> {
    fn from(grid: ParamGrid) -> Self {
        grid.spaces
    }
}

impl Default for ParamGrid {
    /// Small boosting grid used when no grid file is given.
    fn default() -> Self {
        let mut space = ParamSpace::new();
        space.insert(
            "n_estimators".into(),
            vec![ParamValue::Int(50), ParamValue::Int(100)],
        );
        space.insert(
            "learning_rate".into(),
            vec![ParamValue::Float(0.1), ParamValue::Float(0.5)],
        );
        space.insert(
            "max_depth".into(),
            vec![ParamValue::Int(2), ParamValue::Int(3)],
        );
        Self::single(space)
    }
}

impl ParamGrid {
    /// Small decision-tree grid.
    pub fn default_tree() -> Self {
        let mut space = ParamSpace::new();
        space.insert(
            "max_depth".into(),
            vec![ParamValue::Int(2), ParamValue::Int(4), ParamValue::Int(8)],
        );
        space.insert(
            "min_samples_leaf".into(),
            vec![ParamValue::Int(1), ParamValue::Int(5)],
        );
        Self::single(space)
    }

    pub fn single(space: ParamSpace) -> Self {
        Self { spaces: vec![space] }
    }

    pub fn new(spaces: Vec<ParamSpace>) -> Self {
        Self { spaces }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| OfferError::InvalidParameter(format!("invalid parameter grid: {}", e)))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            OfferError::InvalidParameter(format!(
                "cannot read parameter grid {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&json)
    }

    pub fn spaces(&self) -> &[ParamSpace] {
        &self.spaces
    }

    /// Expand to concrete parameter sets, in grid order.
    ///
    /// An empty space yields one empty candidate (the estimator's own
    /// parameters). An empty value list is an error.
    pub fn candidates(&self) -> Result<Vec<ParamSet>> {
        if self.spaces.is_empty() {
            return Ok(vec![ParamSet::new()]);
        }

        let mut all = Vec::new();
        for space in &self.spaces {
            let mut expanded = vec![ParamSet::new()];
            for (name, values) in space {
                if values.is_empty() {
                    return Err(OfferError::InvalidParameter(format!(
                        "parameter '{}' has no candidate values",
                        name
                    )));
                }
                expanded = expanded
                    .into_iter()
                    .flat_map(|partial| {
                        values.iter().map(move |value| {
                            let mut next = partial.clone();
                            next.insert(name.clone(), *value);
                            next
                        })
                    })
                    .collect();
            }
            all.extend(expanded);
        }
        Ok(all)
    }
}

/// How candidates are drawn from the grid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SearchStrategy {
    /// Every candidate.
    #[default]
    Exhaustive,
    /// `n_iter` candidates sampled without replacement.
    Randomized { n_iter: usize, seed: Option<u64> },
}

/// Test-fold row indices for stratified k-fold.
///
/// Rows of each class are dealt to folds round-robin in their original
/// order, so every fold holds roughly the same class ratio.
pub fn stratified_k_fold(y: &[usize], k: usize) -> Result<Vec<Vec<usize>>> {
    if k < 2 {
        return Err(OfferError::InvalidSplit(format!(
            "cross-validation needs at least 2 folds, got {}",
            k
        )));
    }
    if y.len() < k {
        return Err(OfferError::InvalidSplit(format!(
            "cannot make {} folds from {} rows",
            k,
            y.len()
        )));
    }

    let mut folds = vec![Vec::new(); k];
    let mut next_fold = 0;
    for class in [0usize, 1] {
        for (i, _) in y.iter().enumerate().filter(|(_, label)| **label == class) {
            folds[next_fold % k].push(i);
            next_fold += 1;
        }
    }
    for fold in &mut folds {
        fold.sort_unstable();
    }
    Ok(folds)
}

/// Cross-validation outcome for one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct CvResult {
    pub params: ParamSet,
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
    pub rank: usize,
}

#[derive(Debug)]
pub struct GridSearchResult {
    pub best_params: ParamSet,
    pub best_score: f64,
    pub cv_results: Vec<CvResult>,
    /// Best candidate refit on all of the search data.
    pub best_estimator: Box<dyn Classifier>,
}

#[derive(Debug, Clone)]
pub struct GridSearch {
    grid: ParamGrid,
    cv_folds: usize,
    strategy: SearchStrategy,
    show_progress: bool,
}

impl GridSearch {
    pub fn new(grid: ParamGrid) -> Self {
        Self {
            grid,
            cv_folds: DEFAULT_CV_FOLDS,
            strategy: SearchStrategy::Exhaustive,
            show_progress: false,
        }
    }

    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn cv_folds(&self) -> usize {
        self.cv_folds
    }

    fn select_candidates(&self) -> Result<Vec<ParamSet>> {
        let all = self.grid.candidates()?;
        match self.strategy {
            SearchStrategy::Exhaustive => Ok(all),
            SearchStrategy::Randomized { n_iter, seed } => {
                if n_iter == 0 {
                    return Err(OfferError::InvalidParameter(
                        "'n_iter' must be at least 1".to_string(),
                    ));
                }
                if n_iter >= all.len() {
                    return Ok(all);
                }
                let mut rng = match seed {
                    Some(s) => StdRng::seed_from_u64(s),
                    None => StdRng::from_entropy(),
                };
                let mut picked = sample(&mut rng, all.len(), n_iter).into_vec();
                picked.sort_unstable();
                Ok(picked.into_iter().map(|i| all[i].clone()).collect())
            }
        }
    }

    /// Cross-validate every candidate and refit the winner on `x`.
    pub fn fit(
        &self,
        estimator: &dyn Classifier,
        x: &FeatureMatrix,
        y: &[usize],
    ) -> Result<GridSearchResult> {
        if x.n_rows() != y.len() {
            return Err(OfferError::LabelMismatch {
                expected: x.n_rows(),
                got: y.len(),
            });
        }

        let candidates = self.select_candidates()?;
        let folds = stratified_k_fold(y, self.cv_folds)?;

        // (train, test) row indices per fold
        let splits: Vec<(Vec<usize>, Vec<usize>)> = folds
            .iter()
            .enumerate()
            .map(|(f, test)| {
                let train = folds
                    .iter()
                    .enumerate()
                    .filter(|(g, _)| *g != f)
                    .flat_map(|(_, rows)| rows.iter().copied())
                    .collect::<Vec<_>>();
                (train, test.clone())
            })
            .collect();

        let pb = if self.show_progress {
            create_progress_bar((candidates.len() * splits.len()) as u64, "Cross-validating")
        } else {
            ProgressBar::hidden()
        };

        let scored: Vec<(ParamSet, Vec<f64>)> = candidates
            .par_iter()
            .map(|params| {
                let mut fold_scores = Vec::with_capacity(splits.len());
                for (train, test) in &splits {
                    let mut model = estimator.clone_unfitted();
                    model.set_params(params)?;

                    let train_y: Vec<usize> = train.iter().map(|&i| y[i]).collect();
                    let test_y: Vec<usize> = test.iter().map(|&i| y[i]).collect();
                    model.fit(&x.select_rows(train), &train_y)?;
                    let predicted = model.predict(&x.select_rows(test))?;
                    fold_scores.push(precision(&test_y, &predicted)?);

                    pb.inc(1);
                }
                Ok((params.clone(), fold_scores))
            })
            .collect::<Result<Vec<_>>>()?;

        finish_with_success(
            &pb,
            &format!(
                "Evaluated {} candidates over {} folds",
                candidates.len(),
                splits.len()
            ),
        );

        let mut cv_results: Vec<CvResult> = scored
            .into_iter()
            .map(|(params, fold_scores)| {
                let n = fold_scores.len() as f64;
                let mean_score = fold_scores.iter().sum::<f64>() / n;
                let std_score = (fold_scores
                    .iter()
                    .map(|s| (s - mean_score).powi(2))
                    .sum::<f64>()
                    / n)
                    .sqrt();
                CvResult {
                    params,
                    fold_scores,
                    mean_score,
                    std_score,
                    rank: 0,
                }
            })
            .collect();

        // Stable sort keeps grid order among equal scores
        let mut order: Vec<usize> = (0..cv_results.len()).collect();
        order.sort_by(|&a, &b| {
            cv_results[b]
                .mean_score
                .total_cmp(&cv_results[a].mean_score)
        });
        for (rank, &i) in order.iter().enumerate() {
            cv_results[i].rank = rank + 1;
        }

        let best = &cv_results[order[0]];
        let best_params = best.params.clone();
        let best_score = best.mean_score;

        let mut best_estimator = estimator.clone_unfitted();
        best_estimator.set_params(&best_params)?;
        best_estimator.fit(x, y)?;

        Ok(GridSearchResult {
            best_params,
            best_score,
            cv_results,
            best_estimator,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_expands_cartesian_product() {
        let grid =
            ParamGrid::from_json(r#"{"max_depth": [2, 3, 4], "learning_rate": [0.1, 0.5]}"#)
                .unwrap();
        let candidates = grid.candidates().unwrap();
        assert_eq!(candidates.len(), 6);
        assert_eq!(candidates[0]["learning_rate"], ParamValue::Float(0.1));
        assert_eq!(candidates[0]["max_depth"], ParamValue::Int(2));
        assert_eq!(candidates[5]["learning_rate"], ParamValue::Float(0.5));
        assert_eq!(candidates[5]["max_depth"], ParamValue::Int(4));
    }

    #[test]
    fn test_grid_list_of_spaces() {
        let grid = ParamGrid::from_json(
            r#"[{"max_depth": [2]}, {"n_estimators": [10, 20]}]"#,
        )
        .unwrap();
        assert_eq!(grid.spaces().len(), 2);
        assert_eq!(grid.candidates().unwrap().len(), 3);
    }

    #[test]
    fn test_empty_value_list_errors() {
        let grid = ParamGrid::from_json(r#"{"max_depth": []}"#).unwrap();
        assert!(matches!(
            grid.candidates(),
            Err(OfferError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_malformed_json_errors() {
        assert!(ParamGrid::from_json(r#"{"max_depth": "deep"}"#).is_err());
    }

    #[test]
    fn test_stratified_folds_balance_classes() {
        let y: Vec<usize> = (0..20).map(|i| usize::from(i < 5)).collect();
        let folds = stratified_k_fold(&y, 5).unwrap();

        assert_eq!(folds.len(), 5);
        let mut seen: Vec<usize> = folds.iter().flatten().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..20).collect::<Vec<_>>());

        for fold in &folds {
            assert_eq!(fold.len(), 4);
            assert_eq!(fold.iter().filter(|&&i| y[i] == 1).count(), 1);
        }
    }

    #[test]
    fn test_stratified_folds_reject_bad_k() {
        assert!(stratified_k_fold(&[0, 1, 0], 1).is_err());
        assert!(stratified_k_fold(&[0, 1, 0], 4).is_err());
    }

    #[test]
    fn test_randomized_is_subset_and_reproducible() {
        let grid = ParamGrid::from_json(
            r#"{"max_depth": [1, 2, 3, 4], "n_estimators": [5, 10, 20]}"#,
        )
        .unwrap();
        let strategy = SearchStrategy::Randomized {
            n_iter: 4,
            seed: Some(7),
        };
        let search = GridSearch::new(grid.clone()).with_strategy(strategy);

        let a = search.select_candidates().unwrap();
        let b = search.select_candidates().unwrap();
        assert_eq!(a.len(), 4);
        assert_eq!(a, b);

        let all = grid.candidates().unwrap();
        assert!(a.iter().all(|c| all.contains(c)));
    }
}
