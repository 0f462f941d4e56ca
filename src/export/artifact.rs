//! Persisted best-model artifact
//!
//! One JSON file per training run holding the selected model together with
//! the fitted preprocessing state it expects its inputs to go through.

use crate::error::{PipelineError, Result};
use crate::evaluation::EvaluationRow;
use crate::preprocessing::FittedPreprocessor;
use crate::training::TrainedModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

/// File name prefix shared by every artifact
pub const ARTIFACT_PREFIX: &str = "best_model_";

/// Selected model plus everything inference needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Display name, e.g. "Random Forest Tuned"
    pub model_name: String,
    pub model: TrainedModel,
    pub preprocessor: FittedPreprocessor,
    /// Feature matrix column order
    pub feature_names: Vec<String>,
    /// Test-set scores of the model
    pub metrics: EvaluationRow,
    pub created_at: DateTime<Utc>,
}

impl ModelArtifact {
    pub fn new(
        model_name: impl Into<String>,
        model: TrainedModel,
        preprocessor: FittedPreprocessor,
        metrics: EvaluationRow,
    ) -> Self {
        let feature_names = preprocessor.feature_columns().to_vec();
        Self {
            model_name: model_name.into(),
            model,
            preprocessor,
            feature_names,
            metrics,
            created_at: Utc::now(),
        }
    }

    /// `best_model_<name>.json` with spaces replaced by underscores
    pub fn file_name(model_name: &str) -> String {
        format!("{}{}.json", ARTIFACT_PREFIX, model_name.replace(' ', "_"))
    }

    /// Write into `dir`, creating it if needed; returns the file path.
    ///
    /// Artifacts left by earlier runs are removed so `dir` holds one model.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(Self::file_name(&self.model_name));

        for stale in artifact_files(dir)?.into_iter().filter(|p| *p != path) {
            fs::remove_file(&stale)?;
            info!(path = %stale.display(), "Removed previous model artifact");
        }

        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, self)?;

        info!(path = %path.display(), model = %self.model_name, "Best model saved");
        Ok(path)
    }

    /// Read an artifact written by [`ModelArtifact::save`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::InputNotFound(path.to_path_buf()));
        }
        let reader = BufReader::new(File::open(path)?);
        let artifact: Self = serde_json::from_reader(reader)?;
        info!(path = %path.display(), model = %artifact.model_name, "Model loaded");
        Ok(artifact)
    }
}

/// Every `best_model_*.json` in `dir`, sorted by file name
fn artifact_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(ARTIFACT_PREFIX) && n.ends_with(".json"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// First `best_model_*.json` in `dir` by file name
pub fn find_best_artifact(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(PipelineError::InputNotFound(dir.to_path_buf()));
    }

    artifact_files(dir)?.into_iter().next().ok_or_else(|| {
        PipelineError::InferenceError(format!(
            "No trained model found in {}; run training first",
            dir.display()
        ))
    })
}
