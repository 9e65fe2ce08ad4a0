//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a customer/offer DataFrame with known characteristics
///
/// - 60 rows, 15 with `completed == true` (every fourth row)
/// - `reward` separates the classes perfectly
/// - `noise` carries no signal
/// - every treated column has some missing values
/// - incomes are observed in every age bucket
pub fn create_offer_dataframe() -> DataFrame {
    let n = 60usize;
    let completed: Vec<bool> = (0..n).map(|i| i % 4 == 0).collect();

    let age: Vec<Option<f64>> = (0..n)
        .map(|i| (i % 9 != 4).then(|| 18.0 + ((i * 7) % 70) as f64))
        .collect();
    let income: Vec<Option<f64>> = (0..n)
        .map(|i| (i % 8 != 5).then(|| 30_000.0 + ((i * 1_700) % 90_000) as f64))
        .collect();
    let viewed: Vec<Option<f64>> = (0..n)
        .map(|i| (i % 5 != 2).then(|| (i % 6) as f64))
        .collect();
    let completed_before: Vec<Option<f64>> = (0..n)
        .map(|i| (i % 7 != 1).then(|| (i % 3) as f64))
        .collect();
    let hours_viewed: Vec<Option<f64>> = (0..n)
        .map(|i| (i % 6 != 3).then(|| i as f64 * 1.5))
        .collect();
    let hours_completed: Vec<Option<f64>> = (0..n)
        .map(|i| (i % 4 != 2).then(|| i as f64 * 2.0))
        .collect();
    let reward: Vec<f64> = (0..n)
        .map(|i| {
            let base = (i % 3) as f64;
            if completed[i] {
                5.0 + base
            } else {
                base
            }
        })
        .collect();
    let noise: Vec<f64> = (0..n).map(|i| ((i * 13) % 17) as f64).collect();

    df! {
        "age" => age,
        "income" => income,
        "offers_viewed_before" => viewed,
        "offers_completed_before" => completed_before,
        "hours_since_last_viewed" => hours_viewed,
        "hours_since_last_completed" => hours_completed,
        "reward" => reward,
        "noise" => noise,
        "completed" => completed,
    }
    .unwrap()
}

/// Minimal table with every treated column and a label
pub fn create_small_offer_dataframe() -> DataFrame {
    df! {
        "age" => [Some(22.0f64), None, Some(40.0), Some(40.0), Some(70.0)],
        "income" => [Some(30_000.0f64), Some(45_000.0), None, Some(60_000.0), Some(80_000.0)],
        "offers_viewed_before" => [Some(1.0f64), None, Some(3.0), None, Some(0.0)],
        "offers_completed_before" => [None, Some(1.0f64), Some(2.0), None, Some(0.0)],
        "hours_since_last_viewed" => [Some(5.0f64), None, Some(12.0), Some(48.0), None],
        "hours_since_last_completed" => [None, None, Some(24.0f64), Some(6.0), Some(1.0)],
        "completed" => [true, false, true, false, false],
    }
    .unwrap()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that none of `columns` has a null or NaN value
pub fn assert_no_missing(df: &DataFrame, columns: &[&str]) {
    for name in columns {
        let col = df.column(name).unwrap().cast(&DataType::Float64).unwrap();
        let missing = col
            .f64()
            .unwrap()
            .into_iter()
            .filter(|v| v.map_or(true, f64::is_nan))
            .count();
        assert_eq!(missing, 0, "Column '{}' still has {} missing values", name, missing);
    }
}

/// Values of a float column, nulls as `None`
pub fn float_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}
