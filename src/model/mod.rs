//! Model module - scaling, classifiers, metrics, tuning and the predictive model

pub mod boosting;
pub mod estimator;
pub mod matrix;
pub mod metrics;
pub mod predictive;
pub mod scaler;
pub mod search;
pub mod tree;

pub use boosting::GradientBoostingClassifier;
pub use estimator::{format_params, Classifier, ParamSet, ParamValue};
pub use matrix::FeatureMatrix;
pub use metrics::{f1_score, precision, recall, ConfusionCounts, EvaluationMetrics};
pub use predictive::{
    FeatureImportance, PredictiveModel, SplitSummary, TrainFullOptions, TrainingReport,
    DEFAULT_TOP_FEATURES,
};
pub use scaler::{ScalerParams, StandardScaler};
pub use search::{
    stratified_k_fold, CvResult, GridSearch, GridSearchResult, ParamGrid, ParamSpace,
    SearchStrategy, DEFAULT_CV_FOLDS,
};
pub use tree::{DecisionTreeClassifier, RegressionTree, TreeParams};
