//! Command-line argument definitions using clap

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use crate::model::{
    Classifier, DecisionTreeClassifier, GradientBoostingClassifier, ParamGrid, SearchStrategy,
};

/// offerlift - Train and evaluate an offer-completion classifier
#[derive(Parser, Debug)]
#[command(name = "offerlift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Training data (CSV or Parquet)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Label column name
    #[arg(short, long, default_value = "completed")]
    pub target: String,

    /// Label value that marks the positive (minority) class.
    /// Compared as text, so boolean labels use "true".
    #[arg(long, default_value = "true")]
    pub positive_value: String,

    /// Classification algorithm to tune
    #[arg(long, value_enum, default_value_t = EstimatorKind::GradientBoosting)]
    pub estimator: EstimatorKind,

    /// JSON file with the hyperparameter search space: an object mapping
    /// parameter names to candidate lists, or a list of such objects.
    /// Defaults to a small built-in grid for the chosen estimator.
    #[arg(long)]
    pub param_grid: Option<PathBuf>,

    /// Number of stratified cross-validation folds
    #[arg(long, default_value = "5", value_parser = validate_cv_folds)]
    pub cv_folds: usize,

    /// Evaluate only this many randomly chosen candidates from the grid
    #[arg(long)]
    pub n_iter: Option<usize>,

    /// Random seed for the train/test split and candidate sampling
    #[arg(long)]
    pub seed: Option<u64>,

    /// Share of each class held out for testing (0 to 1, exclusive)
    #[arg(long, default_value = "0.2", value_parser = validate_test_size)]
    pub test_size: f64,

    /// Number of top features shown and summarised by label
    #[arg(long, default_value = "6")]
    pub top_features: usize,

    /// File to score with the trained model (CSV or Parquet)
    #[arg(long)]
    pub score: Option<PathBuf>,

    /// Output path for scored rows.
    /// Defaults to the score file's directory with a '_scored' suffix.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the training report as JSON to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Columns to drop before training (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub drop_columns: Vec<String>,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

/// Classifiers available from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EstimatorKind {
    /// Gradient boosted trees
    #[value(name = "gbdt")]
    GradientBoosting,
    /// Single decision tree
    #[value(name = "tree")]
    DecisionTree,
}

impl EstimatorKind {
    pub fn build(self) -> Box<dyn Classifier> {
        match self {
            EstimatorKind::GradientBoosting => Box::new(GradientBoostingClassifier::new()),
            EstimatorKind::DecisionTree => Box::new(DecisionTreeClassifier::new()),
        }
    }

    /// Search space used when no grid file is given
    pub fn default_grid(self) -> ParamGrid {
        match self {
            EstimatorKind::GradientBoosting => ParamGrid::default(),
            EstimatorKind::DecisionTree => ParamGrid::default_tree(),
        }
    }
}

impl Cli {
    /// Candidate selection implied by `--n-iter` and `--seed`.
    pub fn search_strategy(&self) -> SearchStrategy {
        match self.n_iter {
            Some(n_iter) => SearchStrategy::Randomized {
                n_iter,
                seed: self.seed,
            },
            None => SearchStrategy::Exhaustive,
        }
    }

    /// Scored output path, derived from `--score` when `--output` is absent.
    pub fn scored_output_path(&self) -> Option<PathBuf> {
        let score = self.score.as_ref()?;
        Some(
            self.output
                .clone()
                .unwrap_or_else(|| derive_scored_path(score)),
        )
    }
}

/// `dir/name.ext` becomes `dir/name_scored.ext`.
pub fn derive_scored_path(input: &Path) -> PathBuf {
    let parent = input.parent().unwrap_or_else(|| Path::new("."));
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("csv");
    parent.join(format!("{}_scored.{}", stem, extension))
}

/// Validator for test_size parameter
fn validate_test_size(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!("test_size must be between 0 and 1, got {}", value))
    }
}

/// Validator for cv_folds parameter
fn validate_cv_folds(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid fold count", s))?;

    if value < 2 {
        Err(format!("cv_folds must be at least 2, got {}", value))
    } else {
        Ok(value)
    }
}
