//! End-to-end training pipeline
//!
//! Load → preprocess → train → evaluate → persist the best model.

use crate::error::{PipelineError, Result};
use crate::evaluation::{EvaluationReport, Evaluator};
use crate::export::ModelArtifact;
use crate::preprocessing::{DataPreprocessor, DatasetSummary, PreprocessingConfig};
use crate::training::{Trainer, TrainingConfig};
use crate::utils::DataLoader;
use crate::visualization::{ChartWriter, PlotSink};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, info_span, Span};

/// Where the pipeline writes its files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the best model artifact
    pub model_dir: PathBuf,
    /// Directory receiving chart JSON files
    pub plot_dir: PathBuf,
    /// Model comparison CSV; unset writes it inside `model_dir`
    pub report_path: Option<PathBuf>,
    /// Inference output CSV
    pub predictions_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            plot_dir: PathBuf::from("plots"),
            report_path: None,
            predictions_path: PathBuf::from("data/predictions.csv"),
        }
    }
}

impl OutputConfig {
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    pub fn with_plot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plot_dir = dir.into();
        self
    }

    pub fn with_predictions_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.predictions_path = path.into();
        self
    }

    /// Resolved location of the model comparison CSV
    pub fn report_path(&self) -> PathBuf {
        self.report_path
            .clone()
            .unwrap_or_else(|| self.model_dir.join("evaluation_results.csv"))
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub preprocessing: PreprocessingConfig,
    pub training: TrainingConfig,
    pub output: OutputConfig,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file; absent fields keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::InputNotFound(path.to_path_buf()));
        }
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data)
            .map_err(|e| PipelineError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    pub fn with_preprocessing(mut self, config: PreprocessingConfig) -> Self {
        self.preprocessing = config;
        self
    }

    pub fn with_training(mut self, config: TrainingConfig) -> Self {
        self.training = config;
        self
    }

    pub fn with_output(mut self, config: OutputConfig) -> Self {
        self.output = config;
        self
    }
}

/// Result of a training run
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub report: EvaluationReport,
    pub best_model: String,
    pub artifact: ModelArtifact,
    pub artifact_path: PathBuf,
    pub summary: DatasetSummary,
    pub total_time_secs: f64,
}

/// Runs every training stage in order
pub struct TrainingPipeline {
    config: PipelineConfig,
    span: Span,
}

impl TrainingPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            span: info_span!("pipeline"),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Train from a CSV file, writing charts to the configured plot directory
    pub fn run(&self, data_path: impl AsRef<Path>) -> Result<PipelineResult> {
        let df = DataLoader::new().load_csv(data_path)?;
        let mut charts = ChartWriter::new(&self.config.output.plot_dir);
        self.run_frame(&df, &mut charts)
    }

    /// Train from an in-memory raw table
    pub fn run_frame(&self, df: &DataFrame, plots: &mut dyn PlotSink) -> Result<PipelineResult> {
        let _enter = self.span.enter();
        let start = Instant::now();
        let config = &self.config;

        let summary = DatasetSummary::from_frame(df)?;
        info!(
            rows = summary.rows,
            columns = summary.columns,
            duplicate_rows = summary.duplicate_rows,
            missing_values = summary.missing_values(),
            "Dataset summary"
        );

        let (encoded, fitted) = DataPreprocessor::with_config(config.preprocessing.clone()).fit_transform(df)?;
        info!("Preprocessing completed. Starting model training");

        let outcome = Trainer::new(config.training.clone()).train(
            &encoded,
            fitted.feature_columns(),
            &config.preprocessing.target_column,
        )?;

        let evaluation = Evaluator::new(fitted.feature_columns().to_vec()).evaluate(
            &outcome.models,
            &outcome.x_test,
            &outcome.y_test,
            plots,
        )?;
        evaluation.report.write_csv(config.output.report_path())?;

        let best = &outcome.models[evaluation.best_index];
        let artifact = ModelArtifact::new(
            best.name.clone(),
            best.model.clone(),
            fitted,
            evaluation.report.rows[evaluation.best_index].clone(),
        );
        let artifact_path = artifact.save(&config.output.model_dir)?;

        let total_time_secs = start.elapsed().as_secs_f64();
        info!(
            best_model = %evaluation.best_name,
            elapsed_secs = total_time_secs,
            "Pipeline complete"
        );

        Ok(PipelineResult {
            report: evaluation.report,
            best_model: evaluation.best_name,
            artifact,
            artifact_path,
            summary,
            total_time_secs,
        })
    }
}
