//! Error types for data preparation and model training.
//!
//! Every failure in the library surfaces as an [`OfferError`]. The binary
//! wraps these in `anyhow` with file-level context.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T, E = OfferError> = std::result::Result<T, E>;

/// Errors that can occur while preparing data or training a model.
#[derive(Debug, Error)]
pub enum OfferError {
    /// A row needing income imputation falls in an age bucket that had no
    /// observed income when the statistics were fitted.
    #[error("Unseen age bucket '{bucket}': no median income was learned for it during fit")]
    UnseenCategory { bucket: String },

    /// A component was used before its fit step ran.
    #[error("{component} must be fitted before use")]
    NotFitted { component: &'static str },

    /// A required column is absent from the input table.
    #[error("Required column '{column}' not found. Available columns: {available:?}")]
    MissingColumn {
        column: String,
        available: Vec<String>,
    },

    /// A statistic was requested over a column with no non-null values.
    #[error("Column '{column}' has no non-null values to learn from")]
    NoObservedValues { column: String },

    /// A feature column still contains nulls when a model needs a dense matrix.
    #[error("Column '{column}' contains {count} missing value(s)")]
    MissingValues { column: String, count: usize },

    /// A feature column cannot be interpreted as a number.
    #[error("Column '{column}' has non-numeric type {dtype}")]
    NonNumericColumn { column: String, dtype: String },

    /// Input width differs from the width seen at fit time.
    #[error("Feature mismatch: expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    /// Labels and rows disagree in length.
    #[error("Label mismatch: expected {expected} labels, got {got}")]
    LabelMismatch { expected: usize, got: usize },

    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

impl OfferError {
    /// Build a [`OfferError::MissingColumn`] listing the columns that do exist.
    pub fn missing_column(column: &str, available: &[String]) -> Self {
        OfferError::MissingColumn {
            column: column.to_string(),
            available: available.to_vec(),
        }
    }
}
