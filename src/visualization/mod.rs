//! Visualization module: chart data for model evaluation.
//!
//! Charts are emitted as JSON specs that any plotting front end can render.

use crate::error::Result;
use crate::evaluation::metrics::ConfusionMatrix;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Number of features shown in the importance chart
pub const TOP_FEATURES: usize = 10;

/// Confusion matrix heatmap data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrixChart {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// Rows are actual labels, columns predicted labels
    pub cells: [[usize; 2]; 2],
}

/// One bar of the feature importance chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Horizontal bar chart of the most important features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureImportanceChart {
    pub title: String,
    pub bars: Vec<FeatureImportance>,
}

/// Sort importances descending (stable for ties) and keep the top `n`
pub fn rank_importances(features: &[String], importances: &[f64], n: usize) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = features
        .iter()
        .zip(importances.iter())
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    ranked.truncate(n);
    ranked
}

/// Receiver of evaluation charts
pub trait PlotSink {
    /// Confusion matrix of one model on the test partition
    fn confusion_matrix(&mut self, model_name: &str, matrix: &ConfusionMatrix) -> Result<()>;

    /// Ranked importances of the selected model
    fn feature_importance(&mut self, model_name: &str, ranked: &[FeatureImportance]) -> Result<()>;
}

/// Discards every chart
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPlotSink;

impl PlotSink for NullPlotSink {
    fn confusion_matrix(&mut self, _model_name: &str, _matrix: &ConfusionMatrix) -> Result<()> {
        Ok(())
    }

    fn feature_importance(&mut self, _model_name: &str, _ranked: &[FeatureImportance]) -> Result<()> {
        Ok(())
    }
}

/// Writes chart specs as JSON files into a plot directory
#[derive(Debug, Clone)]
pub struct ChartWriter {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl ChartWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Files written so far, in order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn write_json<T: Serialize>(&mut self, file_name: &str, chart: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        let writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(writer, chart)?;
        debug!(path = %path.display(), "Chart written");
        self.written.push(path);
        Ok(())
    }
}

impl PlotSink for ChartWriter {
    fn confusion_matrix(&mut self, model_name: &str, matrix: &ConfusionMatrix) -> Result<()> {
        let chart = ConfusionMatrixChart {
            title: format!("Confusion Matrix - {}", model_name),
            x_label: "Predicted".to_string(),
            y_label: "Actual".to_string(),
            cells: matrix.as_rows(),
        };
        let file_name = format!("confusion_matrix_{}.json", model_name.replace(' ', "_"));
        self.write_json(&file_name, &chart)
    }

    fn feature_importance(&mut self, model_name: &str, ranked: &[FeatureImportance]) -> Result<()> {
        info!("Generating feature importance chart");
        let chart = FeatureImportanceChart {
            title: format!("Top {} Features - {}", TOP_FEATURES, model_name),
            bars: ranked.to_vec(),
        };
        self.write_json("feature_importance.json", &chart)
    }
}
