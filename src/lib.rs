//! Hotel booking cancellation pipeline
//!
//! This crate trains and serves a binary classifier predicting whether a
//! hotel reservation will be canceled:
//! - Data loading, cleaning and feature derivation
//! - Outlier capping and categorical encoding
//! - Stratified splitting with SMOTE on the training partition
//! - Logistic regression, random forest and gradient boosting, plus a
//!   grid-searched random forest
//! - Held-out evaluation, best-model selection and batch inference
//!
//! # Modules
//!
//! ## Core
//! - [`preprocessing`] - Schema adaptation, cleaning, features, outliers, encoding
//! - [`synthetic`] - SMOTE oversampling
//! - [`training`] - Split, models and grid search
//! - [`evaluation`] - Metrics and model comparison
//! - [`inference`] - Predictions with a persisted model
//!
//! ## Supporting
//! - [`pipeline`] - End-to-end training run and configuration
//! - [`export`] - Model artifact persistence
//! - [`visualization`] - Chart output
//! - [`cli`] - Command-line interface
//! - [`utils`] - CSV IO and frame helpers

// Core error handling
pub mod error;

// Core ML modules
pub mod preprocessing;
pub mod synthetic;
pub mod training;
pub mod evaluation;
pub mod inference;

// Orchestration and IO
pub mod pipeline;
pub mod export;
pub mod visualization;
pub mod utils;

// Services
pub mod cli;

pub use error::{PipelineError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{PipelineError, Result};

    // Preprocessing
    pub use crate::preprocessing::{
        DataPreprocessor, DatasetSummary, FittedPreprocessor, MissingColumnPolicy,
        PreprocessingConfig,
    };

    // Training
    pub use crate::training::{NamedModel, TrainedModel, Trainer, TrainingConfig, TrainingOutcome};

    // Evaluation
    pub use crate::evaluation::{EvaluationReport, EvaluationRow, Evaluator};

    // Inference and export
    pub use crate::export::{find_best_artifact, ModelArtifact};
    pub use crate::inference::InferenceRunner;

    // Pipeline
    pub use crate::pipeline::{OutputConfig, PipelineConfig, PipelineResult, TrainingPipeline};

    // Charts
    pub use crate::visualization::{ChartWriter, NullPlotSink, PlotSink};

    // IO
    pub use crate::utils::{DataLoader, DataSaver};
}
