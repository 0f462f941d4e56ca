//! IQR-based outlier capping

use crate::error::{PipelineError, Result};
use crate::utils::frame::{has_column, numeric_values, series};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, info_span, warn, Span};

/// Fitted bounds for a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    /// Bounds `Q1 - factor*IQR` and `Q3 + factor*IQR` over the non-missing values
    pub fn from_series(series: &Series, factor: f64) -> Result<Option<Self>> {
        let casted = series.cast(&DataType::Float64)?;
        let ca = casted.f64()?;
        let values = ca.filter(&ca.is_not_nan())?;

        let (Some(q1), Some(q3)) = (
            values.quantile(0.25, QuantileMethod::Linear)?,
            values.quantile(0.75, QuantileMethod::Linear)?,
        ) else {
            return Ok(None);
        };
        let iqr = q3 - q1;
        Ok(Some(Self {
            q1,
            q3,
            lower: q1 - factor * iqr,
            upper: q3 + factor * iqr,
        }))
    }

    pub fn clamp(&self, v: f64) -> f64 {
        v.max(self.lower).min(self.upper)
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lower && v <= self.upper
    }
}

/// Clamps configured numeric columns to their IQR bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierCapper {
    columns: Vec<String>,
    factor: f64,
    bounds: BTreeMap<String, OutlierBounds>,
    is_fitted: bool,
    #[serde(skip, default = "capper_span")]
    span: Span,
}

fn capper_span() -> Span {
    info_span!("outlier_capper")
}

impl OutlierCapper {
    pub fn new(columns: Vec<String>, factor: f64) -> Self {
        Self {
            columns,
            factor,
            bounds: BTreeMap::new(),
            is_fitted: false,
            span: capper_span(),
        }
    }

    /// Get the computed bounds
    pub fn bounds(&self) -> &BTreeMap<String, OutlierBounds> {
        &self.bounds
    }

    /// Compute bounds for every configured column present in `df`
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let span = self.span.clone();
        let _enter = span.enter();
        self.bounds.clear();

        for name in &self.columns {
            if !has_column(df, name) {
                warn!(column = %name, "Column not found for outlier treatment");
                continue;
            }
            match OutlierBounds::from_series(series(df, name)?, self.factor)? {
                Some(bounds) => {
                    self.bounds.insert(name.clone(), bounds);
                }
                None => warn!(column = %name, "Column has no values, skipping outlier treatment"),
            }
        }

        self.is_fitted = true;
        Ok(self)
    }

    /// Clamp values outside the fitted bounds; row count is unchanged
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let _enter = self.span.enter();
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (name, bounds) in &self.bounds {
            if !has_column(df, name) {
                warn!(column = %name, "Column not found for outlier treatment");
                continue;
            }

            let values = numeric_values(df, name)?;
            let outliers = values
                .iter()
                .flatten()
                .filter(|v| !bounds.contains(**v))
                .count();
            let capped: Float64Chunked = values
                .into_iter()
                .map(|v| v.map(|v| bounds.clamp(v)))
                .collect();
            result.with_column(capped.with_name(name.as_str().into()).into_series())?;

            info!(
                column = %name,
                outliers,
                lower = bounds.lower,
                upper = bounds.upper,
                "Outliers capped"
            );
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantiles_interpolate_linearly() {
        let s = Series::new("adr".into(), &[Some(4i64), None, Some(1), Some(3), Some(2)]);
        let bounds = OutlierBounds::from_series(&s, 1.5).unwrap().unwrap();
        assert!((bounds.q1 - 1.75).abs() < 1e-12);
        assert!((bounds.q3 - 3.25).abs() < 1e-12);

        let single = Series::new("adr".into(), &[5.0]);
        assert_eq!(OutlierBounds::from_series(&single, 1.5).unwrap().unwrap().q1, 5.0);
    }

    #[test]
    fn test_all_missing_has_no_bounds() {
        let s = Series::new("adr".into(), &[None::<f64>, None]);
        assert!(OutlierBounds::from_series(&s, 1.5).unwrap().is_none());
    }

    #[test]
    fn test_bounds_computation() {
        let s = Series::new("lead_time".into(), &[1.0, 2.0, 3.0, 4.0, 100.0]);
        let bounds = OutlierBounds::from_series(&s, 1.5).unwrap().unwrap();
        assert_eq!(bounds.q1, 2.0);
        assert_eq!(bounds.q3, 4.0);
        assert_eq!(bounds.lower, -1.0);
        assert_eq!(bounds.upper, 7.0);
    }

    #[test]
    fn test_capping_clamps_and_keeps_rows() {
        let df = df!(
            "lead_time" => &[1i64, 2, 3, 4, 100],
            "other" => &[1i64, 2, 3, 4, 5],
        )
        .unwrap();

        let mut capper = OutlierCapper::new(vec!["lead_time".into(), "adr".into()], 1.5);
        let out = capper.fit_transform(&df).unwrap();

        assert_eq!(out.height(), 5);
        let lead: Vec<Option<f64>> = out.column("lead_time").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(lead, vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), Some(7.0)]);
        // absent configured column is skipped
        assert!(!capper.bounds().contains_key("adr"));
        assert_eq!(out.column("other").unwrap().dtype(), &DataType::Int64);
    }

    #[test]
    fn test_constant_column_passes_through() {
        let df = df!("adr" => &[50.0, 50.0, 50.0]).unwrap();
        let mut capper = OutlierCapper::new(vec!["adr".into()], 1.5);
        let out = capper.fit_transform(&df).unwrap();

        let adr: Vec<Option<f64>> = out.column("adr").unwrap().f64().unwrap().into_iter().collect();
        assert_eq!(adr, vec![Some(50.0); 3]);
    }

    #[test]
    fn test_fitted_bounds_reused() {
        let train = df!("adr" => &[10.0, 20.0, 30.0, 40.0]).unwrap();
        let mut capper = OutlierCapper::new(vec!["adr".into()], 1.5);
        capper.fit(&train).unwrap();

        let batch = df!("adr" => &[1000.0]).unwrap();
        let out = capper.transform(&batch).unwrap();
        let upper = capper.bounds()["adr"].upper;
        assert_eq!(out.column("adr").unwrap().f64().unwrap().get(0), Some(upper));
    }
}
