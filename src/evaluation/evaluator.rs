//! Held-out scoring and best-model selection

use super::metrics::{accuracy, f1_score, precision, recall, roc_auc, ConfusionMatrix};
use crate::error::{PipelineError, Result};
use crate::training::NamedModel;
use crate::utils::DataSaver;
use crate::visualization::{rank_importances, PlotSink, TOP_FEATURES};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, info_span, warn, Span};

/// Column headers of the comparison report
pub const REPORT_COLUMNS: [&str; 6] = ["Model", "Accuracy", "Precision", "Recall", "F1 Score", "ROC AUC"];

/// Test-set scores of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRow {
    pub model: String,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// NaN when the test labels hold a single class
    #[serde(with = "nan_as_null")]
    pub roc_auc: f64,
}

/// serde_json writes NaN as null; read it back the same way
mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

/// Model comparison table, in training order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub rows: Vec<EvaluationRow>,
}

impl EvaluationReport {
    /// Index of the strictly highest F1; the earlier row wins ties
    pub fn best_index(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, row) in self.rows.iter().enumerate() {
            match best {
                Some(b) if row.f1 <= self.rows[b].f1 => {}
                _ => best = Some(i),
            }
        }
        best
    }

    pub fn row(&self, model: &str) -> Option<&EvaluationRow> {
        self.rows.iter().find(|r| r.model == model)
    }

    /// Report as a table with the published column names
    pub fn to_frame(&self) -> Result<DataFrame> {
        let column = |f: fn(&EvaluationRow) -> f64| -> Vec<f64> { self.rows.iter().map(f).collect() };
        let df = DataFrame::new(vec![
            Column::new(
                REPORT_COLUMNS[0].into(),
                self.rows.iter().map(|r| r.model.clone()).collect::<Vec<_>>(),
            ),
            Column::new(REPORT_COLUMNS[1].into(), column(|r| r.accuracy)),
            Column::new(REPORT_COLUMNS[2].into(), column(|r| r.precision)),
            Column::new(REPORT_COLUMNS[3].into(), column(|r| r.recall)),
            Column::new(REPORT_COLUMNS[4].into(), column(|r| r.f1)),
            // undefined AUC is written as an empty cell
            Column::new(
                REPORT_COLUMNS[5].into(),
                self.rows
                    .iter()
                    .map(|r| Some(r.roc_auc).filter(|v| !v.is_nan()))
                    .collect::<Vec<Option<f64>>>(),
            ),
        ])?;
        Ok(df)
    }

    /// Write the report as CSV, replacing any previous file
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut df = self.to_frame()?;
        DataSaver::save_csv(&mut df, path.as_ref())?;
        info!(path = %path.as_ref().display(), "Evaluation report saved");
        Ok(())
    }
}

/// Result of evaluating every trained model
#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub report: EvaluationReport,
    /// Position of the selected model in the evaluated slice
    pub best_index: usize,
    pub best_name: String,
}

/// Scores models on the held-out partition and picks the best by F1
pub struct Evaluator {
    feature_names: Vec<String>,
    span: Span,
}

impl Evaluator {
    /// `feature_names` label the columns of the test matrix
    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            feature_names,
            span: info_span!("evaluator"),
        }
    }

    /// Score one model
    pub fn score(&self, model: &NamedModel, x_test: &Array2<f64>, y_test: &Array1<f64>) -> Result<(EvaluationRow, ConfusionMatrix)> {
        let y_pred = model.model.predict(x_test)?;
        // models without probabilities rank every row equally
        let scores = model
            .model
            .predict_proba(x_test)?
            .unwrap_or_else(|| Array1::zeros(y_test.len()));

        let row = EvaluationRow {
            model: model.name.clone(),
            accuracy: accuracy(y_test, &y_pred),
            precision: precision(y_test, &y_pred),
            recall: recall(y_test, &y_pred),
            f1: f1_score(y_test, &y_pred),
            roc_auc: roc_auc(y_test, &scores),
        };
        Ok((row, ConfusionMatrix::from_labels(y_test, &y_pred)))
    }

    /// Evaluate all models, emit charts and select the best
    pub fn evaluate(
        &self,
        models: &[NamedModel],
        x_test: &Array2<f64>,
        y_test: &Array1<f64>,
        plots: &mut dyn PlotSink,
    ) -> Result<EvaluationOutcome> {
        let _enter = self.span.enter();
        info!("Starting model evaluation");

        if models.is_empty() {
            return Err(PipelineError::EvaluationError("No models to evaluate".to_string()));
        }
        if x_test.nrows() != y_test.len() {
            return Err(PipelineError::ShapeError {
                expected: format!("{} labels", x_test.nrows()),
                actual: format!("{} labels", y_test.len()),
            });
        }

        let positives = y_test.iter().filter(|&&v| v > 0.5).count();
        if positives == 0 || positives == y_test.len() {
            warn!("Test labels hold a single class; ROC AUC is undefined");
        }

        let mut report = EvaluationReport::default();
        for model in models {
            info!(model = %model.name, "Evaluating model");
            let (row, matrix) = self.score(model, x_test, y_test)?;
            plots.confusion_matrix(&model.name, &matrix)?;
            report.rows.push(row);
        }

        let best_index = report
            .best_index()
            .ok_or_else(|| PipelineError::EvaluationError("Empty evaluation report".to_string()))?;
        let best = &models[best_index];
        info!(model = %best.name, f1 = report.rows[best_index].f1, "Best model selected");

        if let Some(importances) = best.model.feature_importances() {
            if importances.len() == self.feature_names.len() {
                let values = importances.to_vec();
                let ranked = rank_importances(&self.feature_names, &values, TOP_FEATURES);
                plots.feature_importance(&best.name, &ranked)?;
            } else {
                warn!(
                    importances = importances.len(),
                    features = self.feature_names.len(),
                    "Feature names do not match importances; skipping chart"
                );
            }
        }

        Ok(EvaluationOutcome {
            best_name: best.name.clone(),
            report,
            best_index,
        })
    }
}
