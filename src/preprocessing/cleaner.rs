//! Duplicate removal and missing value imputation

use super::config::MissingColumnPolicy;
use crate::error::{PipelineError, Result};
use crate::utils::frame::{is_numeric_dtype, string_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, info_span, warn, Span};

/// Placeholder written into an entirely-missing categorical column
pub const UNKNOWN_CATEGORY: &str = "unknown";

/// Value substituted for missing entries of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FillValue {
    Numeric(f64),
    Categorical(String),
}

/// Removes duplicate rows and imputes missing values.
///
/// Numeric columns are filled with the median and every other column with
/// the mode. Fill values are learned once by [`Cleaner::fit_transform`] and
/// replayed unchanged by [`Cleaner::transform`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cleaner {
    policy: MissingColumnPolicy,
    fill_values: BTreeMap<String, FillValue>,
    dropped_columns: Vec<String>,
    is_fitted: bool,
    #[serde(skip, default = "cleaner_span")]
    span: Span,
}

fn cleaner_span() -> Span {
    info_span!("cleaner")
}

impl Cleaner {
    /// Create a new cleaner
    pub fn new(policy: MissingColumnPolicy) -> Self {
        Self {
            policy,
            fill_values: BTreeMap::new(),
            dropped_columns: Vec::new(),
            is_fitted: false,
            span: cleaner_span(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Learned fill value per column
    pub fn fill_values(&self) -> &BTreeMap<String, FillValue> {
        &self.fill_values
    }

    /// Columns removed under [`MissingColumnPolicy::Drop`]
    pub fn dropped_columns(&self) -> &[String] {
        &self.dropped_columns
    }

    /// Deduplicate, learn fill values from the deduplicated rows, then impute
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        let span = self.span.clone();
        let _enter = span.enter();

        let (deduped, rows_dropped) = drop_duplicates(df)?;
        info!(rows_dropped, "Removed duplicates");

        self.fit(&deduped)?;
        self.impute(deduped)
    }

    /// Deduplicate and impute with the fill values learned at fit time
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let _enter = self.span.enter();
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        let (deduped, rows_dropped) = drop_duplicates(df)?;
        info!(rows_dropped, "Removed duplicates");
        self.impute(deduped)
    }

    fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        self.fill_values.clear();
        self.dropped_columns.clear();

        for col in df.get_columns() {
            let name = col.name().to_string();
            let series = col.as_materialized_series();
            let numeric = is_numeric_dtype(series.dtype());

            if !series.is_empty() && series.null_count() == series.len() {
                match self.policy {
                    MissingColumnPolicy::ZeroFill => {
                        warn!(column = %name, "Column has no observed values, zero-filling");
                        let fill = if numeric {
                            FillValue::Numeric(0.0)
                        } else {
                            FillValue::Categorical(UNKNOWN_CATEGORY.to_string())
                        };
                        self.fill_values.insert(name, fill);
                    }
                    MissingColumnPolicy::Drop => {
                        warn!(column = %name, "Column has no observed values, dropping it");
                        self.dropped_columns.push(name);
                    }
                    MissingColumnPolicy::Fail => {
                        return Err(PipelineError::PreprocessingError(format!(
                            "Column '{}' has no observed values",
                            name
                        )));
                    }
                }
                continue;
            }

            let fill = if numeric {
                let median = series.cast(&DataType::Float64)?.f64()?.median().unwrap_or(0.0);
                FillValue::Numeric(median)
            } else {
                FillValue::Categorical(
                    mode(&string_values(df, &name)?).unwrap_or_else(|| UNKNOWN_CATEGORY.to_string()),
                )
            };
            debug!(column = %name, fill = ?fill, "Learned fill value");
            self.fill_values.insert(name, fill);
        }

        self.is_fitted = true;
        Ok(self)
    }

    fn impute(&self, mut df: DataFrame) -> Result<DataFrame> {
        for name in &self.dropped_columns {
            if df.column(name).is_ok() {
                df = df.drop(name)?;
            }
        }

        let missing: Vec<(String, usize)> = df
            .get_columns()
            .iter()
            .filter(|c| c.null_count() > 0)
            .map(|c| (c.name().to_string(), c.null_count()))
            .collect();

        let mut values_imputed = 0usize;
        for (name, nulls) in missing {
            match self.fill_values.get(&name) {
                Some(fill) => {
                    let filled = fill_column(df.column(&name)?.as_materialized_series(), fill)?;
                    df.with_column(filled)?;
                    values_imputed += nulls;
                }
                None => warn!(column = %name, nulls, "No fill value learned for column"),
            }
        }

        if values_imputed > 0 {
            info!(values_imputed, "Missing values handled");
        } else {
            info!("No missing values found");
        }
        Ok(df)
    }
}

/// Remove exact-duplicate rows, keeping the first occurrence in table order.
///
/// Returns the deduplicated table and the number of rows removed.
pub fn drop_duplicates(df: &DataFrame) -> Result<(DataFrame, usize)> {
    if df.width() == 0 {
        return Ok((df.clone(), 0));
    }
    let deduped = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
    let dropped = df.height() - deduped.height();
    Ok((deduped, dropped))
}

/// Number of rows that repeat an earlier row
pub fn duplicate_count(df: &DataFrame) -> Result<usize> {
    Ok(drop_duplicates(df)?.1)
}

/// Most frequent non-missing value; ties go to the smallest value
fn mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_insert(0) += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(v, _)| v.to_string())
}

fn fill_column(series: &Series, fill: &FillValue) -> Result<Series> {
    match fill {
        FillValue::Numeric(val) => {
            let dtype = series.dtype().clone();
            // integer columns keep their dtype
            let val = if dtype.is_integer() { val.round() } else { *val };
            let filled = series
                .cast(&DataType::Float64)?
                .f64()?
                .fill_null_with_values(val)?
                .into_series();
            if is_numeric_dtype(&dtype) {
                Ok(filled.cast(&dtype)?)
            } else {
                Ok(filled)
            }
        }
        FillValue::Categorical(val) => {
            let cast = series.cast(&DataType::String)?;
            let ca = cast.str()?;
            let fill = StringChunked::full(ca.name().clone(), val.as_str(), ca.len());
            Ok(ca.zip_with(&ca.is_not_null(), &fill)?.into_series())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df!(
            "lead_time" => &[Some(10i64), Some(10), None, Some(30), Some(50)],
            "meal" => &[Some("BB"), Some("BB"), Some("SC"), None, Some("HB")],
            "status" => &["a", "a", "b", "a", "b"],
        )
        .unwrap()
    }

    #[test]
    fn test_duplicates_removed_first_kept() {
        let (out, dropped) = drop_duplicates(&sample()).unwrap();
        assert_eq!(dropped, 1);
        assert_eq!(out.height(), 4);
    }

    #[test]
    fn test_null_rows_compare_equal() {
        let df = df!(
            "a" => &[None, None, Some(1.0)],
            "b" => &["x", "x", "x"],
        )
        .unwrap();
        assert_eq!(duplicate_count(&df).unwrap(), 1);
    }

    #[test]
    fn test_fit_transform_imputes_median_and_mode() {
        let mut cleaner = Cleaner::new(MissingColumnPolicy::ZeroFill);
        let out = cleaner.fit_transform(&sample()).unwrap();

        assert_eq!(out.height(), 4);
        assert!(out.get_columns().iter().all(|c| c.null_count() == 0));

        // median of [10, 30, 50] after dedup
        assert_eq!(cleaner.fill_values()["lead_time"], FillValue::Numeric(30.0));
        // BB, HB and SC tie after dedup, the smaller wins
        assert_eq!(
            cleaner.fill_values()["meal"],
            FillValue::Categorical("BB".to_string())
        );
    }

    #[test]
    fn test_transform_reuses_fitted_values() {
        let mut cleaner = Cleaner::new(MissingColumnPolicy::ZeroFill);
        cleaner.fit_transform(&sample()).unwrap();

        let batch = df!(
            "lead_time" => &[None, Some(1000i64)],
            "meal" => &[None, Some("SC")],
            "status" => &["a", "b"],
        )
        .unwrap();
        let out = cleaner.transform(&batch).unwrap();
        let lead: Vec<Option<i64>> = out.column("lead_time").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(lead, vec![Some(30), Some(1000)]);
    }

    #[test]
    fn test_imputation_keeps_integer_dtype() {
        let df = df!(
            "adults" => &[Some(1i64), Some(2), None, Some(2)],
            "adr" => &[Some(80.5), None, Some(99.5), Some(120.0)],
            "booking_id" => &["INN1", "INN2", "INN3", "INN4"],
        )
        .unwrap();
        let out = Cleaner::new(MissingColumnPolicy::ZeroFill).fit_transform(&df).unwrap();

        assert_eq!(out.column("adults").unwrap().dtype(), &DataType::Int64);
        assert_eq!(out.column("adr").unwrap().dtype(), &DataType::Float64);
        let adults: Vec<Option<i64>> = out.column("adults").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(adults, vec![Some(1), Some(2), Some(2), Some(2)]);
        assert_eq!(out.column("adr").unwrap().f64().unwrap().get(1), Some(99.5));
    }

    #[test]
    fn test_entirely_missing_policies() {
        let df = df!(
            "a" => &[1.0, 2.0],
            "empty" => &[None::<f64>, None],
        )
        .unwrap();

        let out = Cleaner::new(MissingColumnPolicy::ZeroFill).fit_transform(&df).unwrap();
        let empty: Vec<Option<f64>> = out.column("empty").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(empty, vec![Some(0.0), Some(0.0)]);

        let out = Cleaner::new(MissingColumnPolicy::Drop).fit_transform(&df).unwrap();
        assert!(out.column("empty").is_err());

        let err = Cleaner::new(MissingColumnPolicy::Fail).fit_transform(&df).unwrap_err();
        assert!(matches!(err, PipelineError::PreprocessingError(_)));
    }

    #[test]
    fn test_transform_requires_fit() {
        let cleaner = Cleaner::new(MissingColumnPolicy::ZeroFill);
        assert!(matches!(
            cleaner.transform(&sample()),
            Err(PipelineError::ModelNotFitted)
        ));
    }
}
