//! Label column handling
//!
//! Labels may be boolean, 0/1 numeric, or arbitrary strings. They are
//! compared as strings against the value that denotes the positive
//! (minority) class.

use polars::prelude::*;

use super::preparation::require_columns;
use crate::error::{OfferError, Result};

/// Split a table into its feature columns and binary labels.
///
/// Rows whose label equals `positive_value` get class 1, all others class 0.
pub fn split_features_and_label(
    df: &DataFrame,
    label_column: &str,
    positive_value: &str,
) -> Result<(DataFrame, Vec<usize>)> {
    let labels = binary_labels(df, label_column, positive_value)?;
    let features = df.drop(label_column)?;
    Ok((features, labels))
}

/// Binary class per row. Null labels are an error.
pub fn binary_labels(df: &DataFrame, label_column: &str, positive_value: &str) -> Result<Vec<usize>> {
    let mask = label_mask(df, label_column, positive_value)?;

    let missing = mask.iter().filter(|v| v.is_none()).count();
    if missing > 0 {
        return Err(OfferError::MissingValues {
            column: label_column.to_string(),
            count: missing,
        });
    }

    Ok(mask.into_iter().flatten().map(usize::from).collect())
}

/// Per-row positive-class membership; `None` for null labels.
pub fn label_mask(df: &DataFrame, label_column: &str, positive_value: &str) -> Result<Vec<Option<bool>>> {
    require_columns(df, &[label_column])?;
    let column = df.column(label_column)?;
    let boolean = column.dtype() == &DataType::Boolean;
    let values = column_to_string_vec(column)?;

    Ok(values
        .iter()
        .map(|v| v.as_deref().map(|s| matches_label(s, positive_value, boolean)))
        .collect())
}

/// Sorted distinct non-null label values, rendered as strings.
pub fn unique_label_values(df: &DataFrame, label_column: &str) -> Result<Vec<String>> {
    require_columns(df, &[label_column])?;
    let mut values: Vec<String> = column_to_string_vec(df.column(label_column)?)?
        .into_iter()
        .flatten()
        .collect();
    values.sort();
    values.dedup();
    Ok(values)
}

/// Count (positive, negative, null) labels.
pub fn count_label_classes(
    df: &DataFrame,
    label_column: &str,
    positive_value: &str,
) -> Result<(usize, usize, usize)> {
    let mask = label_mask(df, label_column, positive_value)?;

    let positives = mask.iter().filter(|v| **v == Some(true)).count();
    let negatives = mask.iter().filter(|v| **v == Some(false)).count();
    let nulls = mask.iter().filter(|v| v.is_none()).count();

    Ok((positives, negatives, nulls))
}

/// Boolean labels render as "true"/"false"; for those, "True"/"TRUE" match too.
/// Every other label is compared exactly.
fn matches_label(value: &str, positive_value: &str, boolean: bool) -> bool {
    value == positive_value || (boolean && value.eq_ignore_ascii_case(positive_value))
}

/// Convert a column to a Vec of Option<String> for comparison
pub(crate) fn column_to_string_vec(col: &Column) -> Result<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|n| format!("{}", n)))
                .collect()
        }
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => {
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}
