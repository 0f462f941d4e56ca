//! Integration tests for the preprocessing stages

use hotel_cancellation::preprocessing::features::{TOTAL_GUESTS, TOTAL_STAY_NIGHTS};
use hotel_cancellation::preprocessing::{
    cleaner, CategoricalEncoder, Cleaner, DataPreprocessor, FeatureDeriver, MissingColumnPolicy,
    OutlierCapper, PreprocessingConfig, SchemaAdapter,
};
use polars::prelude::*;

fn long_schema() -> DataFrame {
    df!(
        "Booking_ID" => &["A1", "A2", "A3"],
        "adults" => &[2i64, 1, 2],
        "children" => &[0i64, 1, 2],
        "stays_in_weekend_nights" => &[1i64, 0, 2],
        "stays_in_week_nights" => &[2i64, 3, 5],
        "adr" => &[100.0, 80.0, 120.0],
        "lead_time" => &[5i64, 20, 90],
    )
    .unwrap()
}

fn abbreviated_schema() -> DataFrame {
    df!(
        "Booking_ID" => &["A1", "A2", "A3"],
        "no_of_adults" => &[2i64, 1, 2],
        "no_of_children" => &[0i64, 1, 2],
        "no_of_weekend_nights" => &[1i64, 0, 2],
        "no_of_week_nights" => &[2i64, 3, 5],
        "avg_price_per_room" => &[100.0, 80.0, 120.0],
        "lead_time" => &[5i64, 20, 90],
    )
    .unwrap()
}

fn f64_column(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

// ============================================================================
// Schema and features
// ============================================================================

#[test]
fn test_both_schemas_derive_same_features() {
    let adapter = SchemaAdapter::new();
    let deriver = FeatureDeriver::new();

    let long = deriver.derive(adapter.adapt(long_schema()).unwrap()).unwrap();
    let short = deriver.derive(adapter.adapt(abbreviated_schema()).unwrap()).unwrap();

    assert_eq!(f64_column(&long, TOTAL_STAY_NIGHTS), vec![3.0, 3.0, 7.0]);
    assert_eq!(
        f64_column(&long, TOTAL_STAY_NIGHTS),
        f64_column(&short, TOTAL_STAY_NIGHTS)
    );
    assert_eq!(f64_column(&long, TOTAL_GUESTS), f64_column(&short, TOTAL_GUESTS));
}

#[test]
fn test_derive_skips_missing_inputs() {
    let df = df!("lead_time" => &[1i64, 2]).unwrap();
    let derived = FeatureDeriver::new().derive(df).unwrap();
    assert!(derived.column(TOTAL_STAY_NIGHTS).is_err());
    assert_eq!(derived.height(), 2);
}

// ============================================================================
// Cleaning
// ============================================================================

#[test]
fn test_cleaner_leaves_no_duplicates_or_nulls() {
    let df = df!(
        "lead_time" => &[Some(10i64), Some(10), None, Some(40), None],
        "meal" => &[Some("BB"), Some("BB"), Some("SC"), None, Some("BB")],
        "adr" => &[Some(90.0), Some(90.0), Some(70.0), Some(110.0), None],
    )
    .unwrap();

    let cleaned = Cleaner::new(MissingColumnPolicy::ZeroFill)
        .fit_transform(&df)
        .unwrap();

    assert_eq!(cleaned.height(), 4);
    assert_eq!(cleaner::duplicate_count(&cleaned).unwrap(), 0);
    for col in cleaned.get_columns() {
        assert_eq!(col.null_count(), 0, "column {} still has nulls", col.name());
    }
}

#[test]
fn test_cleaner_all_null_column_policies() {
    let df = df!(
        "lead_time" => &[1i64, 2, 3],
        "company" => &[None::<f64>, None, None],
    )
    .unwrap();

    let zero = Cleaner::new(MissingColumnPolicy::ZeroFill).fit_transform(&df).unwrap();
    assert_eq!(f64_column(&zero, "company"), vec![0.0, 0.0, 0.0]);

    let dropped = Cleaner::new(MissingColumnPolicy::Drop).fit_transform(&df).unwrap();
    assert!(dropped.column("company").is_err());

    assert!(Cleaner::new(MissingColumnPolicy::Fail).fit_transform(&df).is_err());
}

// ============================================================================
// Outliers
// ============================================================================

#[test]
fn test_capper_stays_within_bounds() {
    let df = df!(
        "lead_time" => &[1i64, 3, 4, 5, 6, 8, 9, 400],
        "adr" => &[-50.0, 80.0, 85.0, 90.0, 95.0, 100.0, 105.0, 5400.0],
    )
    .unwrap();

    let mut capper = OutlierCapper::new(vec!["lead_time".into(), "adr".into()], 1.5);
    let capped = capper.fit_transform(&df).unwrap();

    assert_eq!(capped.height(), df.height());
    for (name, bounds) in capper.bounds() {
        for v in f64_column(&capped, name) {
            assert!(v >= bounds.lower && v <= bounds.upper, "{} = {} out of bounds", name, v);
        }
    }
    let adr = f64_column(&capped, "adr");
    assert!(adr[7] < 5400.0);
    assert!(adr[0] > -50.0);
}

#[test]
fn test_capper_ignores_absent_columns() {
    let df = df!("lead_time" => &[1i64, 2, 3, 4]).unwrap();
    let mut capper = OutlierCapper::new(vec!["lead_time".into(), "adr".into()], 1.5);
    let capped = capper.fit_transform(&df).unwrap();
    assert!(capper.bounds().contains_key("lead_time"));
    assert!(!capper.bounds().contains_key("adr"));
    assert_eq!(capped.height(), 4);
}

// ============================================================================
// Encoding
// ============================================================================

#[test]
fn test_encoder_noop_on_numeric_table() {
    let df = df!(
        "lead_time" => &[1i64, 2, 3],
        "adr" => &[80.0, 90.0, 100.0],
    )
    .unwrap();

    let mut encoder = CategoricalEncoder::new("booking_status", "Booking_ID", "Canceled", "Not_Canceled");
    let encoded = encoder.fit_transform(&df).unwrap();
    assert!(encoder.mappings().is_empty());
    assert!(encoded.equals(&df));
}

#[test]
fn test_preprocessor_output_is_numeric() {
    let df = df!(
        "Booking_ID" => &["A", "B", "C", "D"],
        "no_of_adults" => &[2i64, 1, 2, 2],
        "no_of_children" => &[0i64, 0, 1, 0],
        "no_of_weekend_nights" => &[1i64, 0, 2, 1],
        "no_of_week_nights" => &[2i64, 3, 5, 1],
        "avg_price_per_room" => &[100.0, 80.0, 120.0, 95.0],
        "lead_time" => &[5i64, 20, 90, 200],
        "type_of_meal_plan" => &["Meal Plan 1", "Not Selected", "Meal Plan 1", "Meal Plan 2"],
        "booking_status" => &["Not_Canceled", "Canceled", "Not_Canceled", "Canceled"],
    )
    .unwrap();

    let (encoded, fitted) = DataPreprocessor::with_config(PreprocessingConfig::default())
        .fit_transform(&df)
        .unwrap();

    assert!(!fitted.feature_columns().iter().any(|c| c == "Booking_ID" || c == "booking_status"));
    let x = fitted.feature_matrix(&encoded).unwrap();
    assert_eq!(x.nrows(), 4);
    assert_eq!(x.ncols(), fitted.feature_columns().len());
    assert!(x.iter().all(|v| v.is_finite()));

    let target = encoded.column("booking_status").unwrap().i64().unwrap();
    assert_eq!(target.into_no_null_iter().collect::<Vec<_>>(), vec![0, 1, 0, 1]);
}
