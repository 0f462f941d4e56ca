//! Data preprocessing module
//!
//! Turns the raw reservation table into a fully numeric table:
//! - Schema normalization of abbreviated column names
//! - Duplicate removal and missing value imputation
//! - Derived reservation features
//! - IQR outlier capping
//! - Categorical and target encoding

mod config;
pub mod cleaner;
pub mod encoder;
pub mod features;
pub mod outlier;
mod pipeline;
pub mod schema;

pub use cleaner::{Cleaner, FillValue};
pub use config::{MissingColumnPolicy, PreprocessingConfig};
pub use encoder::{CategoricalEncoder, TargetEncoding};
pub use features::FeatureDeriver;
pub use outlier::{OutlierBounds, OutlierCapper};
pub use pipeline::{DataPreprocessor, FittedPreprocessor};
pub use schema::SchemaAdapter;

use crate::error::Result;
use crate::utils::frame::is_numeric_dtype;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Column data type for preprocessing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

impl ColumnType {
    pub fn of(dtype: &DataType) -> Self {
        if is_numeric_dtype(dtype) {
            ColumnType::Numeric
        } else {
            ColumnType::Categorical
        }
    }
}

/// Per-column statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureStats {
    pub name: String,
    pub dtype: ColumnType,
    pub count: usize,
    pub null_count: usize,
    pub unique_count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub median: Option<f64>,
    pub max: Option<f64>,
}

impl FeatureStats {
    /// Compute statistics from a series
    pub fn from_series(series: &Series) -> Result<Self> {
        let dtype = ColumnType::of(series.dtype());
        let mut stats = Self {
            name: series.name().to_string(),
            dtype: dtype.clone(),
            count: series.len(),
            null_count: series.null_count(),
            unique_count: series.n_unique()?,
            mean: None,
            std: None,
            min: None,
            median: None,
            max: None,
        };

        if dtype == ColumnType::Numeric {
            let casted = series.cast(&DataType::Float64)?;
            let ca = casted.f64()?;
            stats.mean = ca.mean();
            stats.std = ca.std(1);
            stats.min = ca.min();
            stats.median = ca.median();
            stats.max = ca.max();
        }

        Ok(stats)
    }
}

/// Shape and column profile of a raw table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: usize,
    pub duplicate_rows: usize,
    pub features: Vec<FeatureStats>,
}

impl DatasetSummary {
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let features = df
            .get_columns()
            .iter()
            .map(|c| FeatureStats::from_series(c.as_materialized_series()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rows: df.height(),
            columns: df.width(),
            duplicate_rows: cleaner::duplicate_count(df)?,
            features,
        })
    }

    pub fn missing_values(&self) -> usize {
        self.features.iter().map(|f| f.null_count).sum()
    }
}
