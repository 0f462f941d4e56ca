//! Preprocessing configuration

use serde::{Deserialize, Serialize};

/// What the cleaner does with a column that has no observed values at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MissingColumnPolicy {
    /// Numeric columns become 0.0, categorical columns become "unknown"
    #[default]
    ZeroFill,
    /// Remove the column from the table
    Drop,
    /// Abort preprocessing
    Fail,
}

/// Configuration for data preprocessing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Binary label column
    pub target_column: String,

    /// Row identifier, never encoded and never used as a feature
    pub identifier_column: String,

    /// Raw target label mapped to 1
    pub positive_label: String,

    /// Raw target label mapped to 0
    pub negative_label: String,

    /// Columns clamped with the IQR rule
    pub outlier_columns: Vec<String>,

    /// IQR multiplier for the capping bounds
    pub iqr_factor: f64,

    /// Handling of entirely-missing columns
    pub missing_column_policy: MissingColumnPolicy,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            target_column: "booking_status".to_string(),
            identifier_column: "Booking_ID".to_string(),
            positive_label: "Canceled".to_string(),
            negative_label: "Not_Canceled".to_string(),
            outlier_columns: vec!["lead_time".to_string(), "adr".to_string()],
            iqr_factor: 1.5,
            missing_column_policy: MissingColumnPolicy::default(),
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the target column
    pub fn with_target_column(mut self, name: impl Into<String>) -> Self {
        self.target_column = name.into();
        self
    }

    /// Builder method to set the identifier column
    pub fn with_identifier_column(mut self, name: impl Into<String>) -> Self {
        self.identifier_column = name.into();
        self
    }

    /// Builder method to set the columns treated for outliers
    pub fn with_outlier_columns(mut self, columns: Vec<String>) -> Self {
        self.outlier_columns = columns;
        self
    }

    /// Builder method to set the IQR factor
    pub fn with_iqr_factor(mut self, factor: f64) -> Self {
        self.iqr_factor = factor;
        self
    }

    /// Builder method to set the entirely-missing column policy
    pub fn with_missing_column_policy(mut self, policy: MissingColumnPolicy) -> Self {
        self.missing_column_policy = policy;
        self
    }
}
