//! Data preprocessing pipeline

use super::{
    cleaner::Cleaner, config::PreprocessingConfig, encoder::CategoricalEncoder,
    features::FeatureDeriver, outlier::OutlierCapper, schema::SchemaAdapter,
};
use crate::error::Result;
use crate::utils::frame::{column_names, columns_to_array2, has_column};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, info_span, Span};

/// Runs schema adaptation, cleaning, feature derivation, outlier capping
/// and encoding in that order, learning the state inference needs.
pub struct DataPreprocessor {
    config: PreprocessingConfig,
    span: Span,
}

impl Default for DataPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DataPreprocessor {
    /// Create a new preprocessor with default configuration
    pub fn new() -> Self {
        Self::with_config(PreprocessingConfig::default())
    }

    /// Create a new preprocessor with custom configuration
    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self {
            config,
            span: info_span!("preprocessor"),
        }
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    /// Preprocess a training table, returning the encoded table and the
    /// fitted state needed to repeat the same steps on new data
    pub fn fit_transform(&self, df: &DataFrame) -> Result<(DataFrame, FittedPreprocessor)> {
        let _enter = self.span.enter();
        let start = Instant::now();
        let config = &self.config;

        let df = SchemaAdapter::new().adapt(df.clone())?;

        let mut cleaner = Cleaner::new(config.missing_column_policy);
        let df = cleaner.fit_transform(&df)?;

        let df = FeatureDeriver::new().derive(df)?;

        let mut capper = OutlierCapper::new(config.outlier_columns.clone(), config.iqr_factor);
        let df = capper.fit_transform(&df)?;

        let mut encoder = CategoricalEncoder::new(
            config.target_column.as_str(),
            config.identifier_column.as_str(),
            config.positive_label.as_str(),
            config.negative_label.as_str(),
        );
        let df = encoder.fit_transform(&df)?;

        let feature_columns: Vec<String> = column_names(&df)
            .into_iter()
            .filter(|c| *c != config.target_column && *c != config.identifier_column)
            .collect();

        info!(
            rows = df.height(),
            features = feature_columns.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Preprocessing fitted"
        );

        let fitted = FittedPreprocessor {
            config: config.clone(),
            cleaner,
            capper,
            encoder,
            feature_columns,
            span: fitted_span(),
        };
        Ok((df, fitted))
    }
}

/// Preprocessing state learned on the training table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    config: PreprocessingConfig,
    cleaner: Cleaner,
    capper: OutlierCapper,
    encoder: CategoricalEncoder,
    feature_columns: Vec<String>,
    #[serde(skip, default = "fitted_span")]
    span: Span,
}

fn fitted_span() -> Span {
    info_span!("fitted_preprocessor")
}

impl FittedPreprocessor {
    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    pub fn encoder(&self) -> &CategoricalEncoder {
        &self.encoder
    }

    /// Model input columns, in training order
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Repeat the fitted preprocessing steps on a new table
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let _enter = self.span.enter();
        let start = Instant::now();

        let df = SchemaAdapter::new().adapt(df.clone())?;
        let df = self.cleaner.transform(&df)?;
        let df = FeatureDeriver::new().derive(df)?;
        let df = self.capper.transform(&df)?;
        let df = self.encoder.transform(&df)?;

        info!(
            rows = df.height(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Preprocessing applied"
        );
        Ok(df)
    }

    /// Feature matrix in training column order
    pub fn feature_matrix(&self, df: &DataFrame) -> Result<Array2<f64>> {
        columns_to_array2(df, &self.feature_columns)
    }

    /// Whether the table still carries the target column
    pub fn has_target(&self, df: &DataFrame) -> bool {
        has_column(df, &self.config.target_column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw() -> DataFrame {
        df!(
            "Booking_ID" => &["INN1", "INN2", "INN3", "INN4", "INN4"],
            "no_of_adults" => &[2i64, 1, 2, 3, 3],
            "no_of_children" => &[0i64, 0, 1, 0, 0],
            "no_of_weekend_nights" => &[1i64, 0, 2, 1, 1],
            "no_of_week_nights" => &[2i64, 3, 1, 4, 4],
            "lead_time" => &[Some(10i64), None, Some(45), Some(400), Some(400)],
            "avg_price_per_room" => &[80.0, 95.0, 120.0, 60.0, 60.0],
            "room_type_reserved" => &["Room_Type 1", "Room_Type 4", "Room_Type 1", "Room_Type 2", "Room_Type 2"],
            "booking_status" => &["Not_Canceled", "Canceled", "Not_Canceled", "Canceled", "Canceled"],
        )
        .unwrap()
    }

    #[test]
    fn test_fit_transform_produces_numeric_features() {
        let (df, fitted) = DataPreprocessor::new().fit_transform(&raw()).unwrap();

        assert_eq!(df.height(), 4);
        assert!(!fitted.feature_columns().contains(&"Booking_ID".to_string()));
        assert!(!fitted.feature_columns().contains(&"booking_status".to_string()));
        assert!(fitted.feature_columns().contains(&"total_stay_nights".to_string()));

        let x = fitted.feature_matrix(&df).unwrap();
        assert_eq!(x.dim(), (4, fitted.feature_columns().len()));
    }

    #[test]
    fn test_transform_matches_training_schema() {
        let (train, fitted) = DataPreprocessor::new().fit_transform(&raw()).unwrap();

        let batch = raw().drop("booking_status").unwrap();
        let out = fitted.transform(&batch).unwrap();
        assert!(!fitted.has_target(&out));

        let x_train = fitted.feature_matrix(&train).unwrap();
        let x_batch = fitted.feature_matrix(&out).unwrap();
        assert_eq!(x_train, x_batch);
    }

    #[test]
    fn test_fitted_state_serializes() {
        let (_, fitted) = DataPreprocessor::new().fit_transform(&raw()).unwrap();
        let json = serde_json::to_string(&fitted).unwrap();
        let restored: FittedPreprocessor = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.feature_columns(), fitted.feature_columns());

        let batch = raw().drop("booking_status").unwrap();
        let expected = fitted.feature_matrix(&fitted.transform(&batch).unwrap()).unwrap();
        let replayed = restored.feature_matrix(&restored.transform(&batch).unwrap()).unwrap();
        assert_eq!(replayed, expected);
    }
}
