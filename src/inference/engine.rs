//! Inference engine implementation
//!
//! Repeats the fitted preprocessing on a new table and applies the
//! persisted model.

use crate::error::{PipelineError, Result};
use crate::export::ModelArtifact;
use crate::utils::frame::{has_column, string_values};
use crate::utils::{DataLoader, DataSaver};
use polars::prelude::*;
use std::path::Path;
use std::time::Instant;
use tracing::{info, info_span, warn, Span};

/// Output column names
pub const PREDICTED_STATUS: &str = "Predicted_Status";
pub const CANCELLATION_PROBABILITY: &str = "Cancellation_Probability";
pub const PREDICTED_LABEL: &str = "Predicted_Label";

/// Applies a persisted model artifact to new reservations
pub struct InferenceRunner {
    artifact: ModelArtifact,
    span: Span,
}

impl std::fmt::Debug for InferenceRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceRunner")
            .field("model", &self.artifact.model_name)
            .field("features", &self.artifact.feature_names.len())
            .finish()
    }
}

impl InferenceRunner {
    pub fn new(artifact: ModelArtifact) -> Self {
        Self {
            artifact,
            span: info_span!("inference"),
        }
    }

    /// Load the artifact at `path`
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(ModelArtifact::load(path)?))
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Predict every row of a raw table.
    ///
    /// Duplicate rows are removed by the cleaner first, so the output has
    /// one row per distinct input row.
    pub fn predict(&self, df: &DataFrame) -> Result<DataFrame> {
        let _enter = self.span.enter();
        let start = Instant::now();
        let preprocessor = &self.artifact.preprocessor;
        let config = preprocessor.config();

        if !has_column(df, &config.identifier_column) {
            return Err(PipelineError::InferenceError(format!(
                "Identifier column '{}' not found in input",
                config.identifier_column
            )));
        }

        info!("Preprocessing data");
        let mut processed = preprocessor.transform(df)?;

        for name in &self.artifact.feature_names {
            if !has_column(&processed, name) {
                warn!(column = %name, "Feature missing from input, filling with 0");
                processed.with_column(Series::new(
                    name.as_str().into(),
                    vec![0.0f64; processed.height()],
                ))?;
            }
        }

        let x = preprocessor.feature_matrix(&processed)?;
        let labels = self.artifact.model.predict(&x)?;
        let probabilities = self
            .artifact
            .model
            .predict_proba(&x)?
            .unwrap_or_else(|| labels.mapv(|_| 0.0));

        let status: Vec<i64> = labels.iter().map(|&v| if v > 0.5 { 1 } else { 0 }).collect();
        let names: Vec<&str> = status.iter().map(|&s| self.class_label(s)).collect();
        let ids: StringChunked = string_values(&processed, &config.identifier_column)?
            .into_iter()
            .collect();

        let out = DataFrame::new(vec![
            ids.with_name(config.identifier_column.as_str().into()).into_series().into(),
            Column::new(PREDICTED_STATUS.into(), status),
            Column::new(CANCELLATION_PROBABILITY.into(), probabilities.to_vec()),
            Column::new(PREDICTED_LABEL.into(), names),
        ])?;

        info!(
            rows = out.height(),
            model = %self.artifact.model_name,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Predictions generated"
        );
        Ok(out)
    }

    /// Raw target label fitted for a class code; a numeric target falls
    /// back to the configured labels
    fn class_label(&self, code: i64) -> &str {
        let preprocessor = &self.artifact.preprocessor;
        if let Some(label) = preprocessor
            .encoder()
            .target_encoding()
            .and_then(|target| target.label(code))
        {
            return label;
        }
        let config = preprocessor.config();
        if code == 1 {
            &config.positive_label
        } else {
            &config.negative_label
        }
    }

    /// Load `data_path`, predict and write the predictions CSV
    pub fn run(&self, data_path: impl AsRef<Path>, output_path: impl AsRef<Path>) -> Result<DataFrame> {
        let df = DataLoader::new().load_csv(data_path)?;
        let mut predictions = self.predict(&df)?;
        DataSaver::save_csv(&mut predictions, output_path.as_ref())?;
        info!(path = %output_path.as_ref().display(), "Predictions saved");
        Ok(predictions)
    }
}
