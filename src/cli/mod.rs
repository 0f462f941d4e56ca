//! Hotel cancellation CLI module
//!
//! Command-line interface for training, prediction, and data inspection.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::evaluation::EvaluationReport;
use crate::export::find_best_artifact;
use crate::inference::{InferenceRunner, PREDICTED_LABEL};
use crate::pipeline::{PipelineConfig, TrainingPipeline};
use crate::preprocessing::{ColumnType, DatasetSummary};
use crate::utils::DataLoader;

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn fmt_metric(v: f64) -> String {
    if v.is_nan() { "n/a".to_string() } else { format!("{:.4}", v) }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "hotel-cancellation")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train and apply a hotel booking cancellation classifier")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full training pipeline and persist the best model
    Train {
        /// Input reservations CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Pipeline configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory for the model artifact and evaluation report
        #[arg(long)]
        model_dir: Option<PathBuf>,

        /// Directory for chart files
        #[arg(long)]
        plot_dir: Option<PathBuf>,
    },

    /// Predict cancellations with a trained model
    Predict {
        /// Input reservations CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Model artifact (defaults to the first best_model_*.json in the model directory)
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Output predictions CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pipeline configuration JSON
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show dataset summary
    Info {
        /// Input data file
        #[arg(short, long)]
        data: PathBuf,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    Ok(match path {
        Some(p) => PipelineConfig::from_file(p)?,
        None => PipelineConfig::default(),
    })
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(
    data_path: &Path,
    config_path: Option<&Path>,
    model_dir: Option<&Path>,
    plot_dir: Option<&Path>,
) -> anyhow::Result<()> {
    section("Train");

    let mut config = load_config(config_path)?;
    if let Some(dir) = model_dir {
        config.output = config.output.with_model_dir(dir);
    }
    if let Some(dir) = plot_dir {
        config.output = config.output.with_plot_dir(dir);
    }

    step_run("Running pipeline");
    let start = Instant::now();
    let result = TrainingPipeline::new(config).run(data_path)?;
    step_done(&format!("{:.2?}", start.elapsed()));

    print_report(&result.report, &result.best_model);

    step_ok(&format!("Best model {}", result.best_model.cyan()));
    step_ok(&format!("Saved to {}", result.artifact_path.display()));
    println!();
    Ok(())
}

pub fn print_report(report: &EvaluationReport, best: &str) {
    println!();
    println!(
        "  {:<22} {:>9} {:>9} {:>9} {:>9} {:>9}",
        muted("Model"), muted("Accuracy"), muted("Precision"), muted("Recall"), muted("F1"), muted("ROC AUC")
    );
    println!("  {}", dim(&"─".repeat(72)));

    for row in &report.rows {
        let name = if row.model == best {
            row.model.white().bold()
        } else {
            row.model.normal()
        };
        println!(
            "  {:<22} {:>9} {:>9} {:>9} {:>9} {:>9}",
            name,
            fmt_metric(row.accuracy),
            fmt_metric(row.precision),
            fmt_metric(row.recall),
            fmt_metric(row.f1),
            fmt_metric(row.roc_auc)
        );
    }
    println!();
}

pub fn cmd_predict(
    data_path: &Path,
    model_path: Option<&Path>,
    output: Option<&Path>,
    config_path: Option<&Path>,
) -> anyhow::Result<()> {
    section("Predict");

    let config = load_config(config_path)?;
    let model_path = match model_path {
        Some(p) => p.to_path_buf(),
        None => find_best_artifact(&config.output.model_dir)?,
    };
    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.output.predictions_path.clone());

    step_run(&format!("Loading {}", model_path.display()));
    let runner = InferenceRunner::from_path(&model_path)?;
    step_done(&runner.artifact().model_name);

    step_run("Predicting");
    let start = Instant::now();
    let predictions = runner.run(data_path, &output)?;
    step_done(&format!("{} rows in {:.2?}", predictions.height(), start.elapsed()));

    println!();
    println!("{}", predictions.head(Some(10)));

    let canceled = predictions
        .column(PREDICTED_LABEL)?
        .str()?
        .into_iter()
        .filter(|v| *v == Some(config.preprocessing.positive_label.as_str()))
        .count();
    step_ok(&format!("{} of {} predicted {}", canceled, predictions.height(), config.preprocessing.positive_label));
    step_ok(&format!("Saved to {}", output.display()));
    println!();
    Ok(())
}

pub fn cmd_info(data_path: &Path) -> anyhow::Result<()> {
    section("Data Info");

    let df = DataLoader::new().load_csv(data_path)?;
    let summary = DatasetSummary::from_frame(&df)?;

    println!("  {:<16} {}", muted("File"), data_path.display());
    println!("  {:<16} {}", muted("Rows"), summary.rows);
    println!("  {:<16} {}", muted("Columns"), summary.columns);
    println!("  {:<16} {}", muted("Duplicate rows"), summary.duplicate_rows);
    println!("  {:<16} {}", muted("Missing values"), summary.missing_values());
    println!();

    println!(
        "  {:<28} {:<12} {:>6} {:>7} {:>10} {:>10} {:>10} {:>10} {:>10}",
        muted("Column"), muted("Type"), muted("Nulls"), muted("Unique"),
        muted("Mean"), muted("Std"), muted("Min"), muted("Median"), muted("Max")
    );
    println!("  {}", dim(&"─".repeat(110)));

    let num = |v: Option<f64>| v.map(|x| format!("{:.2}", x)).unwrap_or_else(|| "-".to_string());
    for f in &summary.features {
        let kind = match f.dtype {
            ColumnType::Numeric => "numeric",
            ColumnType::Categorical => "categorical",
        };
        println!(
            "  {:<28} {:<12} {:>6} {:>7} {:>10} {:>10} {:>10} {:>10} {:>10}",
            f.name,
            kind.truecolor(140, 140, 140),
            f.null_count,
            f.unique_count,
            num(f.mean),
            num(f.std),
            num(f.min),
            num(f.median),
            num(f.max)
        );
    }

    println!();
    Ok(())
}
