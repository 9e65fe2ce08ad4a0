//! Dense feature matrix built from a cleaned table

use polars::prelude::*;

use crate::error::{OfferError, Result};

/// Row-major dense matrix with named columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    feature_names: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build from rows that must all have one value per feature name.
    pub fn from_rows(feature_names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let width = feature_names.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(OfferError::FeatureMismatch {
                expected: width,
                got: bad.len(),
            });
        }
        Ok(Self { feature_names, rows })
    }

    /// Convert every column of `df` to `f64`.
    ///
    /// Columns must be numeric or boolean and contain no missing values, so
    /// run preparation first.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let height = df.height();
        let mut feature_names = Vec::with_capacity(df.width());
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(df.width());

        for col in df.get_columns() {
            let dtype = col.dtype();
            if !(dtype.is_primitive_numeric() || matches!(dtype, DataType::Boolean)) {
                return Err(OfferError::NonNumericColumn {
                    column: col.name().to_string(),
                    dtype: dtype.to_string(),
                });
            }

            let cast = col.cast(&DataType::Float64)?;
            let values: Vec<Option<f64>> = cast
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect();

            let missing = values.iter().filter(|v| v.is_none()).count();
            if missing > 0 {
                return Err(OfferError::MissingValues {
                    column: col.name().to_string(),
                    count: missing,
                });
            }

            feature_names.push(col.name().to_string());
            columns.push(values.into_iter().flatten().collect());
        }

        let rows = (0..height)
            .map(|i| columns.iter().map(|c| c[i]).collect())
            .collect();

        Ok(Self { feature_names, rows })
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    pub fn column(&self, j: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[j]).collect()
    }

    /// New matrix holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [Vec<f64>] {
        &mut self.rows
    }
}
