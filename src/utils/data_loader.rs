//! CSV loading and saving

use crate::error::{PipelineError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{error, info, info_span, Span};

/// Reads the raw reservation table from disk
pub struct DataLoader {
    /// Rows used for dtype inference (None = scan the whole file)
    infer_schema_length: Option<usize>,
    span: Span,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: None,
            span: info_span!("data_loader"),
        }
    }

    /// Limit dtype inference to the first `n` rows
    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = Some(n);
        self
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let _enter = self.span.enter();
        let path = path.as_ref();

        if !path.exists() {
            error!(path = %path.display(), "File not found");
            return Err(PipelineError::InputNotFound(path.to_path_buf()));
        }

        info!(path = %path.display(), "Loading data");
        let start = Instant::now();

        let file = File::open(path)?;
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| {
                error!(error = %e, "Error loading data");
                PipelineError::DataError(e.to_string())
            })?;

        info!(
            rows = df.height(),
            columns = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Data loaded successfully"
        );
        Ok(df)
    }
}

/// Writes tables back to disk
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV, replacing any existing file and creating parent directories
    pub fn save_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| PipelineError::DataError(e.to_string()))
    }
}
