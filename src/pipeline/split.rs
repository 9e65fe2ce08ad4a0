//! Class-balanced train/test split
//!
//! The minority and majority classes are split separately so the test set
//! keeps the original class ratio, then each side is shuffled.

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::label::label_mask;
use crate::error::{OfferError, Result};

/// Default share of each class sent to the test set
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Options for [`customize_train_test_split_with`].
#[derive(Debug, Clone, Copy)]
pub struct SplitOptions {
    /// Share of each class placed in the test set, in (0, 1)
    pub test_size: f64,
    /// Seed for reproducible splits; a fresh random split when `None`
    pub seed: Option<u64>,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            test_size: DEFAULT_TEST_SIZE,
            seed: None,
        }
    }
}

/// Split `data` 80/20 within the minority class and within the majority
/// class, returning shuffled `(train, test)` tables. No columns are dropped.
pub fn customize_train_test_split(
    data: &DataFrame,
    label_column: &str,
    minority_value: &str,
) -> Result<(DataFrame, DataFrame)> {
    customize_train_test_split_with(data, label_column, minority_value, SplitOptions::default())
}

/// [`customize_train_test_split`] with an explicit test share and seed.
pub fn customize_train_test_split_with(
    data: &DataFrame,
    label_column: &str,
    minority_value: &str,
    options: SplitOptions,
) -> Result<(DataFrame, DataFrame)> {
    if !(options.test_size > 0.0 && options.test_size < 1.0) {
        return Err(OfferError::InvalidParameter(format!(
            "test_size must be between 0 and 1, got {}",
            options.test_size
        )));
    }

    let mask = label_mask(data, label_column, minority_value)?;

    // Null labels are not the minority value, so they follow the majority.
    let (minority, majority): (Vec<usize>, Vec<usize>) =
        (0..mask.len()).partition(|&i| mask[i] == Some(true));

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let (mut train_idx, mut test_idx) = split_indices(&minority, options.test_size, "minority", &mut rng)?;
    let (major_train, major_test) = split_indices(&majority, options.test_size, "majority", &mut rng)?;
    train_idx.extend(major_train);
    test_idx.extend(major_test);

    train_idx.shuffle(&mut rng);
    test_idx.shuffle(&mut rng);

    Ok((take_rows(data, &train_idx)?, take_rows(data, &test_idx)?))
}

/// Number of rows sent to the test set out of `n`: ceil(n * test_size).
pub fn test_count(n: usize, test_size: f64) -> usize {
    (n as f64 * test_size).ceil() as usize
}

fn split_indices(
    indices: &[usize],
    test_size: f64,
    class_name: &str,
    rng: &mut StdRng,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let n_test = test_count(indices.len(), test_size);
    let n_train = indices.len().saturating_sub(n_test);

    if n_test == 0 || n_train == 0 {
        return Err(OfferError::InvalidSplit(format!(
            "{} class has {} row(s); need at least one train and one test row (n_train={}, n_test={})",
            class_name,
            indices.len(),
            n_train,
            n_test
        )));
    }

    let mut shuffled = indices.to_vec();
    shuffled.shuffle(rng);
    let test = shuffled.split_off(n_train);
    Ok((shuffled, test))
}

fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec("idx".into(), rows.iter().map(|&i| i as IdxSize).collect());
    Ok(df.take(&idx)?)
}
