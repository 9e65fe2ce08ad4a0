//! Tests for missing value imputation

use offerlift::pipeline::*;
use offerlift::OfferError;
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_fit_transform_leaves_no_missing_values() {
    let df = create_offer_dataframe();
    let mut prep = DataPreparation::new();
    let cleaned = prep.fit_transform(df).unwrap();

    assert_no_missing(&cleaned, &REQUIRED_COLUMNS);
    assert_shape(&cleaned, 60, 9);
}

#[test]
fn test_fill_rules_on_small_table() {
    let df = create_small_offer_dataframe();
    let mut prep = DataPreparation::new();
    let cleaned = prep.fit_transform(df).unwrap();

    let stats = prep.statistics().unwrap();
    assert_eq!(stats.mode_age, 40.0);
    assert_eq!(stats.median_income.get(&AgeBucket::UpTo24), Some(&30_000.0));
    assert_eq!(stats.median_income.get(&AgeBucket::From35To44), Some(&52_500.0));
    assert_eq!(stats.median_income.get(&AgeBucket::From65), Some(&80_000.0));
    assert!(!stats.median_income.contains_key(&AgeBucket::From25To34));

    assert_eq!(
        float_column(&cleaned, AGE),
        vec![Some(22.0), Some(40.0), Some(40.0), Some(40.0), Some(70.0)]
    );
    assert_eq!(
        float_column(&cleaned, INCOME),
        vec![Some(30_000.0), Some(45_000.0), Some(52_500.0), Some(60_000.0), Some(80_000.0)]
    );
    assert_eq!(
        float_column(&cleaned, OFFERS_VIEWED_BEFORE),
        vec![Some(1.0), Some(0.0), Some(3.0), Some(0.0), Some(0.0)]
    );
    assert_eq!(
        float_column(&cleaned, HOURS_SINCE_LAST_COMPLETED),
        vec![Some(-1.0), Some(-1.0), Some(24.0), Some(6.0), Some(1.0)]
    );
}

#[test]
fn test_transform_reproduces_fit_transform() {
    let raw = create_offer_dataframe();
    let mut prep = DataPreparation::new();
    let cleaned = prep.fit_transform(raw.clone()).unwrap();

    let again = prep.transform(raw).unwrap();
    assert!(again.equals_missing(&cleaned));

    // Cleaned data has nothing left to fill
    let twice = prep.transform(cleaned.clone()).unwrap();
    assert!(twice.equals_missing(&cleaned));
}

#[test]
fn test_transform_does_not_refit() {
    let mut prep = DataPreparation::new();
    prep.fit_transform(create_small_offer_dataframe()).unwrap();
    let before = prep.statistics().unwrap().clone();

    let other = df! {
        "age" => [None::<f64>, Some(41.0)],
        "income" => [None::<f64>, None],
        "offers_viewed_before" => [Some(9.0f64), Some(9.0)],
        "offers_completed_before" => [Some(9.0f64), Some(9.0)],
        "hours_since_last_viewed" => [Some(1.0f64), Some(1.0)],
        "hours_since_last_completed" => [Some(1.0f64), Some(1.0)],
    }
    .unwrap();
    let out = prep.transform(other).unwrap();

    assert_eq!(prep.statistics().unwrap(), &before);
    assert_eq!(float_column(&out, AGE), vec![Some(40.0), Some(41.0)]);
    assert_eq!(float_column(&out, INCOME), vec![Some(52_500.0), Some(52_500.0)]);
}

#[test]
fn test_unseen_bucket_errors_only_when_income_missing() {
    let train = df! {
        "age" => [20.0f64, 22.0, 30.0],
        "income" => [10_000.0f64, 20_000.0, 30_000.0],
        "offers_viewed_before" => [1.0f64, 2.0, 3.0],
        "offers_completed_before" => [0.0f64, 1.0, 0.0],
        "hours_since_last_viewed" => [1.0f64, 2.0, 3.0],
        "hours_since_last_completed" => [1.0f64, 2.0, 3.0],
    }
    .unwrap();
    let mut prep = DataPreparation::new();
    prep.fit_transform(train).unwrap();

    let unseen = |income: Option<f64>| {
        df! {
            "age" => [70.0f64],
            "income" => [income],
            "offers_viewed_before" => [1.0f64],
            "offers_completed_before" => [1.0f64],
            "hours_since_last_viewed" => [1.0f64],
            "hours_since_last_completed" => [1.0f64],
        }
        .unwrap()
    };

    match prep.transform(unseen(None)) {
        Err(OfferError::UnseenCategory { bucket }) => assert_eq!(bucket, "65~"),
        other => panic!("Expected UnseenCategory, got {:?}", other),
    }
    assert!(prep.transform(unseen(Some(55_000.0))).is_ok());
}

#[test]
fn test_missing_column_is_reported() {
    let df = create_small_offer_dataframe().drop("income").unwrap();
    let mut prep = DataPreparation::new();

    match prep.fit_transform(df) {
        Err(OfferError::MissingColumn { column, .. }) => assert_eq!(column, INCOME),
        other => panic!("Expected MissingColumn, got {:?}", other),
    }
    assert!(!prep.is_fitted());
}

#[test]
fn test_transform_before_fit_is_not_fitted() {
    let prep = DataPreparation::new();
    assert!(matches!(
        prep.transform(create_small_offer_dataframe()),
        Err(OfferError::NotFitted { .. })
    ));
}

#[test]
fn test_all_missing_age_cannot_fit() {
    let df = df! {
        "age" => [None::<f64>, None],
        "income" => [Some(1.0f64), Some(2.0)],
        "offers_viewed_before" => [1.0f64, 2.0],
        "offers_completed_before" => [1.0f64, 2.0],
        "hours_since_last_viewed" => [1.0f64, 2.0],
        "hours_since_last_completed" => [1.0f64, 2.0],
    }
    .unwrap();
    let mut prep = DataPreparation::new();
    assert!(matches!(
        prep.fit_transform(df),
        Err(OfferError::NoObservedValues { .. })
    ));
}

#[test]
fn test_pass_through_columns_untouched() {
    let df = create_offer_dataframe();
    let reward_before = float_column(&df, "reward");
    let labels_before = df.column("completed").unwrap().clone();

    let mut prep = DataPreparation::new();
    let cleaned = prep.fit_transform(df).unwrap();

    assert_eq!(float_column(&cleaned, "reward"), reward_before);
    assert!(cleaned
        .column("completed")
        .unwrap()
        .as_materialized_series()
        .equals_missing(labels_before.as_materialized_series()));
    assert_has_columns(&cleaned, &["reward", "noise", "completed"]);
}
