//! Missing value imputation for customer/offer tables
//!
//! Learns the most common age and the median income of each age bucket
//! from a training table, then fills gaps in that table and in any later
//! table with exactly those statistics.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::Serialize;

use super::age::{bucket_age, AgeBucket};
use crate::error::{OfferError, Result};
use crate::state::FitState;

pub const AGE: &str = "age";
pub const INCOME: &str = "income";
pub const OFFERS_VIEWED_BEFORE: &str = "offers_viewed_before";
pub const OFFERS_COMPLETED_BEFORE: &str = "offers_completed_before";
pub const HOURS_SINCE_LAST_VIEWED: &str = "hours_since_last_viewed";
pub const HOURS_SINCE_LAST_COMPLETED: &str = "hours_since_last_completed";

/// Counters where a missing value means "none so far".
pub const COUNTER_COLUMNS: [&str; 2] = [OFFERS_VIEWED_BEFORE, OFFERS_COMPLETED_BEFORE];

/// Elapsed-time columns where a missing value means "never happened".
pub const HOURS_COLUMNS: [&str; 2] = [HOURS_SINCE_LAST_VIEWED, HOURS_SINCE_LAST_COMPLETED];

/// Every column preparation reads or writes.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    AGE,
    INCOME,
    OFFERS_VIEWED_BEFORE,
    OFFERS_COMPLETED_BEFORE,
    HOURS_SINCE_LAST_VIEWED,
    HOURS_SINCE_LAST_COMPLETED,
];

/// Fill value for missing counters
const COUNTER_FILL: f64 = 0.0;

/// Fill value for missing elapsed times. Distinct from 0, which would mean
/// the event just happened.
const NEVER_HAPPENED: f64 = -1.0;

/// Statistics learned at fit time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImputationStatistics {
    /// Most frequent age in the training table (smallest value on ties)
    pub mode_age: f64,
    /// Median income of each age bucket that had at least one income
    pub median_income: BTreeMap<AgeBucket, f64>,
}

impl ImputationStatistics {
    /// Median income learned for `bucket`, or `UnseenCategory` if none was.
    pub fn income_for(&self, bucket: AgeBucket) -> Result<f64> {
        self.median_income
            .get(&bucket)
            .copied()
            .ok_or_else(|| OfferError::UnseenCategory {
                bucket: bucket.label().to_string(),
            })
    }
}

/// Fits imputation statistics and applies them to tables.
#[derive(Debug, Clone, Default)]
pub struct DataPreparation {
    state: FitState<ImputationStatistics>,
}

impl DataPreparation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an already-fitted preparation from known statistics.
    pub fn from_statistics(statistics: ImputationStatistics) -> Self {
        Self {
            state: FitState::Fitted(statistics),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_fitted()
    }

    pub fn statistics(&self) -> Option<&ImputationStatistics> {
        self.state.as_option()
    }

    /// Learn statistics from `data` and fill its missing values in place.
    ///
    /// On error `data` is left unchanged and the previous state is kept.
    pub fn fit(&mut self, data: &mut DataFrame) -> Result<()> {
        validate_required_columns(data)?;

        let ages = float_values(data, AGE)?;
        let mode_age = mode(&ages).ok_or_else(|| OfferError::NoObservedValues {
            column: AGE.to_string(),
        })?;

        let filled_ages: Vec<f64> = ages.iter().map(|a| a.unwrap_or(mode_age)).collect();
        let buckets = buckets_for(&filled_ages)?;
        let incomes = float_values(data, INCOME)?;
        let median_income = median_by_bucket(&buckets, &incomes);

        let statistics = ImputationStatistics {
            mode_age,
            median_income,
        };

        apply_statistics(&statistics, data)?;
        self.state = FitState::Fitted(statistics);
        Ok(())
    }

    /// Fit on `data` and return the cleaned table.
    pub fn fit_transform(&mut self, mut data: DataFrame) -> Result<DataFrame> {
        self.fit(&mut data)?;
        Ok(data)
    }

    /// Fill missing values in `new_data` with the statistics learned at fit
    /// time. Nothing is recomputed.
    pub fn transform(&self, mut new_data: DataFrame) -> Result<DataFrame> {
        let statistics = self.state.get("DataPreparation")?;
        validate_required_columns(&new_data)?;
        apply_statistics(statistics, &mut new_data)?;
        Ok(new_data)
    }
}

/// Fail with `MissingColumn` unless every column preparation needs exists.
pub fn validate_required_columns(df: &DataFrame) -> Result<()> {
    require_columns(df, &REQUIRED_COLUMNS)
}

/// Fail with `MissingColumn` for the first of `columns` absent from `df`.
pub fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<()> {
    let available: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    for column in columns {
        if !available.iter().any(|name| name == column) {
            return Err(OfferError::missing_column(column, &available));
        }
    }
    Ok(())
}

/// Apply every fill rule using `statistics`. All replacement columns are
/// built before any is written, so a failure leaves `data` untouched.
fn apply_statistics(statistics: &ImputationStatistics, data: &mut DataFrame) -> Result<()> {
    let mut replacements: Vec<Series> = Vec::with_capacity(REQUIRED_COLUMNS.len());

    for name in COUNTER_COLUMNS {
        replacements.push(filled_series(data, name, COUNTER_FILL)?);
    }
    for name in HOURS_COLUMNS {
        replacements.push(filled_series(data, name, NEVER_HAPPENED)?);
    }

    let ages: Vec<f64> = float_values(data, AGE)?
        .into_iter()
        .map(|a| a.unwrap_or(statistics.mode_age))
        .collect();
    let buckets = buckets_for(&ages)?;

    let incomes = float_values(data, INCOME)?
        .into_iter()
        .zip(buckets.iter())
        .map(|(income, bucket)| match income {
            Some(value) => Ok(value),
            None => statistics.income_for(*bucket),
        })
        .collect::<Result<Vec<f64>>>()?;

    replacements.push(Series::new(AGE.into(), ages));
    replacements.push(Series::new(INCOME.into(), incomes));

    for series in replacements {
        data.with_column(series)?;
    }
    Ok(())
}

/// Column values as `f64`, with NaN treated as missing.
fn float_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df.column(name)?;
    let cast = column.cast(&DataType::Float64)?;
    let values = cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(values)
}

fn filled_series(df: &DataFrame, name: &str, fill: f64) -> Result<Series> {
    let values: Vec<f64> = float_values(df, name)?
        .into_iter()
        .map(|v| v.unwrap_or(fill))
        .collect();
    Ok(Series::new(name.into(), values))
}

fn buckets_for(ages: &[f64]) -> Result<Vec<AgeBucket>> {
    ages.iter()
        .map(|a| bucket_age(Some(*a)))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| OfferError::NoObservedValues {
            column: AGE.to_string(),
        })
}

/// Most frequent value; the smallest wins a tie.
fn mode(values: &[Option<f64>]) -> Option<f64> {
    let mut observed: Vec<f64> = values.iter().flatten().copied().collect();
    observed.sort_by(|a, b| a.total_cmp(b));

    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < observed.len() {
        let value = observed[i];
        let run = observed[i..].iter().take_while(|v| **v == value).count();
        if best.map_or(true, |(_, count)| run > count) {
            best = Some((value, run));
        }
        i += run;
    }

    best.map(|(value, _)| value)
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 0 {
        Some((values[n / 2 - 1] + values[n / 2]) / 2.0)
    } else {
        Some(values[n / 2])
    }
}

/// Median of the observed incomes within each bucket. Buckets with no
/// observed income are left out.
fn median_by_bucket(buckets: &[AgeBucket], incomes: &[Option<f64>]) -> BTreeMap<AgeBucket, f64> {
    let mut grouped: BTreeMap<AgeBucket, Vec<f64>> = BTreeMap::new();
    for (bucket, income) in buckets.iter().zip(incomes.iter()) {
        if let Some(value) = income {
            grouped.entry(*bucket).or_default().push(*value);
        }
    }

    grouped
        .into_iter()
        .filter_map(|(bucket, mut values)| median(&mut values).map(|m| (bucket, m)))
        .collect()
}
