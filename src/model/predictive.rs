//! Predictive model: preparation, scaling, tuning and evaluation
//!
//! `PredictiveModel` owns the fitted pieces of a training run. Everything
//! learned in `train_model` (imputation statistics, scaler parameters, the
//! tuned classifier and the feature column order) is reused unchanged by
//! `test_model` and `predict`.

use polars::prelude::*;
use serde::Serialize;

use super::estimator::{Classifier, ParamSet};
use super::matrix::FeatureMatrix;
use super::metrics::EvaluationMetrics;
use super::scaler::StandardScaler;
use super::search::{CvResult, GridSearch, GridSearchResult, ParamGrid, SearchStrategy, DEFAULT_CV_FOLDS};
use crate::error::{OfferError, Result};
use crate::pipeline::distribution::{feature_distributions, FeatureDistribution};
use crate::pipeline::label::{count_label_classes, split_features_and_label};
use crate::pipeline::preparation::{require_columns, DataPreparation};
use crate::pipeline::split::{customize_train_test_split_with, SplitOptions};
use crate::state::FitState;

/// Number of top features summarised by label in a full run
pub const DEFAULT_TOP_FEATURES: usize = 6;

/// One row of the feature-importance table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Options for [`PredictiveModel::train_full`].
#[derive(Debug, Clone, Copy)]
pub struct TrainFullOptions {
    pub split: SplitOptions,
    pub top_features: usize,
}

impl Default for TrainFullOptions {
    fn default() -> Self {
        Self {
            split: SplitOptions::default(),
            top_features: DEFAULT_TOP_FEATURES,
        }
    }
}

/// Row and positive-class counts of one side of the split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SplitSummary {
    pub rows: usize,
    pub positives: usize,
}

/// Everything a full training run produces.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub estimator: String,
    pub best_params: ParamSet,
    pub best_cv_precision: f64,
    pub cv_folds: usize,
    pub cv_results: Vec<CvResult>,
    pub train: SplitSummary,
    pub test: SplitSummary,
    pub test_metrics: EvaluationMetrics,
    pub feature_importance: Vec<FeatureImportance>,
    pub distributions: Vec<FeatureDistribution>,
}

#[derive(Debug)]
pub struct PredictiveModel {
    preparation: DataPreparation,
    scaler: StandardScaler,
    feature_names: Option<Vec<String>>,
    search: FitState<GridSearchResult>,
    cv_folds: usize,
    strategy: SearchStrategy,
    show_progress: bool,
}

impl Default for PredictiveModel {
    fn default() -> Self {
        Self {
            preparation: DataPreparation::new(),
            scaler: StandardScaler::new(),
            feature_names: None,
            search: FitState::Unfitted,
            cv_folds: DEFAULT_CV_FOLDS,
            strategy: SearchStrategy::Exhaustive,
            show_progress: false,
        }
    }
}

impl PredictiveModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cv_folds(mut self, cv_folds: usize) -> Self {
        self.cv_folds = cv_folds;
        self
    }

    pub fn with_strategy(mut self, strategy: SearchStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Show a progress bar while cross-validating.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn is_trained(&self) -> bool {
        self.search.is_fitted()
    }

    pub fn preparation(&self) -> &DataPreparation {
        &self.preparation
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Feature columns in the order the model was trained on.
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    pub fn search_result(&self) -> Option<&GridSearchResult> {
        self.search.as_option()
    }

    /// Class-balanced split; see
    /// [`customize_train_test_split`](crate::pipeline::split::customize_train_test_split).
    pub fn customize_train_test_split(
        data: &DataFrame,
        label_column: &str,
        minority_value: &str,
    ) -> Result<(DataFrame, DataFrame)> {
        crate::pipeline::split::customize_train_test_split(data, label_column, minority_value)
    }

    /// Prepare `x`, fit the scaler, and tune `estimator` over `param_grid`
    /// by cross-validated precision. The best candidate is refit on all of
    /// `x` and kept for testing and prediction.
    pub fn train_model(
        &mut self,
        x: DataFrame,
        y: &[usize],
        estimator: &dyn Classifier,
        param_grid: &ParamGrid,
    ) -> Result<&GridSearchResult> {
        if x.height() != y.len() {
            return Err(OfferError::LabelMismatch {
                expected: x.height(),
                got: y.len(),
            });
        }

        let mut preparation = DataPreparation::new();
        let prepared = preparation.fit_transform(x)?;
        let matrix = FeatureMatrix::from_dataframe(&prepared)?;

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&matrix)?;

        let search = GridSearch::new(param_grid.clone())
            .with_cv_folds(self.cv_folds)
            .with_strategy(self.strategy)
            .with_progress(self.show_progress);
        let result = search.fit(estimator, &scaled, y)?;

        self.preparation = preparation;
        self.scaler = scaler;
        self.feature_names = Some(matrix.feature_names().to_vec());
        self.search = FitState::Fitted(result);

        self.search.get("PredictiveModel")
    }

    /// Precision, recall and F1 of the tuned classifier on `x`.
    pub fn test_model(&self, x: DataFrame, y: &[usize]) -> Result<EvaluationMetrics> {
        let result = self.search.get("PredictiveModel")?;
        let matrix = self.prepared_matrix(x)?;
        if matrix.n_rows() != y.len() {
            return Err(OfferError::LabelMismatch {
                expected: matrix.n_rows(),
                got: y.len(),
            });
        }

        let predicted = result.best_estimator.predict(&matrix)?;
        EvaluationMetrics::evaluate(y, &predicted)
    }

    /// Train a fresh copy of `estimator` and rank features by importance,
    /// highest first.
    ///
    /// Preparation and scaler are reused when already fitted; otherwise
    /// they are fitted on `x` and kept.
    pub fn feature_importance(
        &mut self,
        estimator: &dyn Classifier,
        x: DataFrame,
        y: &[usize],
    ) -> Result<Vec<FeatureImportance>> {
        let prepared = if self.preparation.is_fitted() {
            self.preparation.transform(x)?
        } else {
            self.preparation.fit_transform(x)?
        };

        let prepared = match &self.feature_names {
            Some(names) => select_features(&prepared, names)?,
            None => prepared,
        };
        let matrix = FeatureMatrix::from_dataframe(&prepared)?;

        let scaled = if self.scaler.is_fitted() {
            self.scaler.transform(&matrix)?
        } else {
            let scaled = self.scaler.fit_transform(&matrix)?;
            self.feature_names = Some(matrix.feature_names().to_vec());
            scaled
        };

        let mut model = estimator.clone_unfitted();
        model.fit(&scaled, y)?;
        let importances = model.feature_importances().ok_or_else(|| {
            OfferError::UnsupportedOperation(format!(
                "{} does not expose feature importances",
                model.name()
            ))
        })?;

        let mut ranked: Vec<FeatureImportance> = scaled
            .feature_names()
            .iter()
            .zip(importances)
            .map(|(feature, importance)| FeatureImportance {
                feature: feature.clone(),
                importance,
            })
            .collect();
        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        Ok(ranked)
    }

    /// Positive-class probability for each row of `test_data`.
    pub fn predict(&self, test_data: DataFrame) -> Result<Vec<f64>> {
        let result = self.search.get("PredictiveModel")?;
        let matrix = self.prepared_matrix(test_data)?;
        result.best_estimator.predict_proba(&matrix)
    }

    /// Split, tune, evaluate on the held-out rows, rank features, and
    /// summarise the top features by label.
    pub fn train_full(
        &mut self,
        data: &DataFrame,
        label_column: &str,
        positive_value: &str,
        estimator: &dyn Classifier,
        param_grid: &ParamGrid,
        options: TrainFullOptions,
    ) -> Result<TrainingReport> {
        let (train, test) =
            customize_train_test_split_with(data, label_column, positive_value, options.split)?;

        let (train_x, train_y) = split_features_and_label(&train, label_column, positive_value)?;
        let (test_x, test_y) = split_features_and_label(&test, label_column, positive_value)?;

        let result = self.train_model(train_x.clone(), &train_y, estimator, param_grid)?;
        let best_params = result.best_params.clone();
        let best_cv_precision = result.best_score;
        let cv_results = result.cv_results.clone();
        let estimator_name = result.best_estimator.name().to_string();

        let test_metrics = self.test_model(test_x, &test_y)?;
        let feature_importance = self.feature_importance(estimator, train_x, &train_y)?;

        let top: Vec<String> = feature_importance
            .iter()
            .take(options.top_features)
            .map(|f| f.feature.clone())
            .collect();
        let distributions = feature_distributions(&train, &top, label_column, positive_value)?;

        Ok(TrainingReport {
            estimator: estimator_name,
            best_params,
            best_cv_precision,
            cv_folds: self.cv_folds,
            cv_results,
            train: split_summary(&train, label_column, positive_value)?,
            test: split_summary(&test, label_column, positive_value)?,
            test_metrics,
            feature_importance,
            distributions,
        })
    }

    /// Prepare and scale `data` with the fitted pieces, in training column
    /// order.
    fn prepared_matrix(&self, data: DataFrame) -> Result<FeatureMatrix> {
        let prepared = self.preparation.transform(data)?;
        let prepared = match &self.feature_names {
            Some(names) => select_features(&prepared, names)?,
            None => prepared,
        };
        let matrix = FeatureMatrix::from_dataframe(&prepared)?;
        self.scaler.transform(&matrix)
    }
}

fn select_features(df: &DataFrame, names: &[String]) -> Result<DataFrame> {
    let columns: Vec<&str> = names.iter().map(String::as_str).collect();
    require_columns(df, &columns)?;
    Ok(df.select(columns)?)
}

fn split_summary(df: &DataFrame, label_column: &str, positive_value: &str) -> Result<SplitSummary> {
    let (positives, _, _) = count_label_classes(df, label_column, positive_value)?;
    Ok(SplitSummary {
        rows: df.height(),
        positives,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tree::DecisionTreeClassifier;

    fn offers() -> DataFrame {
        let n = 20;
        let age: Vec<Option<f64>> = (0..n)
            .map(|i| if i % 7 == 3 { None } else { Some(20.0 + (i * 3) as f64) })
            .collect();
        let income: Vec<Option<f64>> = (0..n)
            .map(|i| if i % 5 == 1 { None } else { Some(30_000.0 + (i * 1_000) as f64) })
            .collect();
        let viewed: Vec<Option<f64>> = (0..n).map(|i| if i % 4 == 0 { None } else { Some(i as f64) }).collect();
        let completed_before: Vec<Option<f64>> = (0..n).map(|i| Some((i % 3) as f64)).collect();
        let hours_viewed: Vec<Option<f64>> = (0..n).map(|i| if i % 6 == 2 { None } else { Some(i as f64 * 2.0) }).collect();
        let hours_completed: Vec<Option<f64>> = (0..n).map(|_| None).collect();
        let reward: Vec<f64> = (0..n).map(|i| if i >= 12 { 10.0 } else { 2.0 }).collect();

        df! {
            "age" => age,
            "income" => income,
            "offers_viewed_before" => viewed,
            "offers_completed_before" => completed_before,
            "hours_since_last_viewed" => hours_viewed,
            "hours_since_last_completed" => hours_completed,
            "reward" => reward,
        }
        .unwrap()
    }

    fn labels() -> Vec<usize> {
        (0..20).map(|i| usize::from(i >= 12)).collect()
    }

    fn small_grid() -> ParamGrid {
        ParamGrid::from_json(r#"{"max_depth": [1, 2]}"#).unwrap()
    }

    #[test]
    fn test_test_model_before_training_is_not_fitted() {
        let model = PredictiveModel::new();
        let err = model.test_model(offers(), &labels()).unwrap_err();
        assert!(matches!(err, OfferError::NotFitted { .. }));
    }

    #[test]
    fn test_predict_before_training_is_not_fitted() {
        let model = PredictiveModel::new();
        assert!(matches!(
            model.predict(offers()),
            Err(OfferError::NotFitted { .. })
        ));
    }

    #[test]
    fn test_train_then_test_and_predict() {
        let mut model = PredictiveModel::new().with_cv_folds(4);
        let estimator = DecisionTreeClassifier::new();
        let result = model
            .train_model(offers(), &labels(), &estimator, &small_grid())
            .unwrap();
        assert_eq!(result.cv_results.len(), 2);
        assert!(model.is_trained());
        assert!(model.preparation().is_fitted());
        assert!(model.scaler().is_fitted());

        let metrics = model.test_model(offers(), &labels()).unwrap();
        assert_eq!(metrics.precision, 1.0);
        assert_eq!(metrics.recall, 1.0);

        let probs = model.predict(offers()).unwrap();
        assert_eq!(probs.len(), 20);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_predict_uses_training_column_order() {
        let mut model = PredictiveModel::new().with_cv_folds(4);
        let estimator = DecisionTreeClassifier::new();
        model
            .train_model(offers(), &labels(), &estimator, &small_grid())
            .unwrap();

        let original = model.predict(offers()).unwrap();
        let reordered = offers().select(["reward", "income", "age", "offers_viewed_before",
            "offers_completed_before", "hours_since_last_viewed", "hours_since_last_completed"])
            .unwrap();
        assert_eq!(model.predict(reordered).unwrap(), original);
    }

    #[test]
    fn test_feature_importance_sorted_descending() {
        let mut model = PredictiveModel::new();
        let estimator = DecisionTreeClassifier::new();
        let ranked = model.feature_importance(&estimator, offers(), &labels()).unwrap();

        assert_eq!(ranked.len(), 7);
        assert!(ranked.windows(2).all(|w| w[0].importance >= w[1].importance));
        assert!((ranked.iter().map(|f| f.importance).sum::<f64>() - 1.0).abs() < 1e-9);

        // Fitted on the way
        assert!(model.preparation().is_fitted());
        assert!(model.scaler().is_fitted());
    }
}
