//! Model evaluation on the held-out partition

pub mod evaluator;
pub mod metrics;

pub use evaluator::{EvaluationOutcome, EvaluationReport, EvaluationRow, Evaluator, REPORT_COLUMNS};
pub use metrics::{accuracy, f1_score, precision, recall, roc_auc, ConfusionMatrix};
