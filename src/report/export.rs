//! Training report JSON export

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::model::TrainingReport;
use crate::pipeline::ImputationStatistics;

/// Metadata about the training run
#[derive(Serialize)]
pub struct RunMetadata {
    /// Timestamp of the run (ISO 8601 format)
    pub timestamp: String,
    pub offerlift_version: String,
    pub input_file: String,
    pub label_column: String,
    pub positive_value: String,
    pub test_size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// Learned imputation statistics in a JSON-friendly shape
#[derive(Serialize)]
pub struct PreparationExport {
    pub mode_age: f64,
    /// Median income keyed by age bucket label
    pub median_income: Vec<(String, f64)>,
}

impl From<&ImputationStatistics> for PreparationExport {
    fn from(stats: &ImputationStatistics) -> Self {
        Self {
            mode_age: stats.mode_age,
            median_income: stats
                .median_income
                .iter()
                .map(|(bucket, income)| (bucket.label().to_string(), *income))
                .collect(),
        }
    }
}

/// Complete export of one training run
#[derive(Serialize)]
pub struct TrainingExport<'a> {
    pub metadata: RunMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preparation: Option<PreparationExport>,
    #[serde(flatten)]
    pub report: &'a TrainingReport,
}

/// Parameters recorded in the export metadata
pub struct ExportParams<'a> {
    pub input_file: &'a str,
    pub label_column: &'a str,
    pub positive_value: &'a str,
    pub test_size: f64,
    pub seed: Option<u64>,
}

/// Write `report` and the learned statistics to `output_path` as JSON.
pub fn export_training_report(
    report: &TrainingReport,
    statistics: Option<&ImputationStatistics>,
    output_path: &Path,
    params: &ExportParams,
) -> Result<()> {
    let export = TrainingExport {
        metadata: RunMetadata {
            timestamp: Utc::now().to_rfc3339(),
            offerlift_version: env!("CARGO_PKG_VERSION").to_string(),
            input_file: params.input_file.to_string(),
            label_column: params.label_column.to_string(),
            positive_value: params.positive_value.to_string(),
            test_size: params.test_size,
            seed: params.seed,
        },
        preparation: statistics.map(PreparationExport::from),
        report,
    };

    let json = serde_json::to_string_pretty(&export)
        .context("Failed to serialize training report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write training report to {}", output_path.display()))?;

    Ok(())
}
