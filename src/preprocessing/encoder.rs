//! Integer encoding of categorical columns and the binary target

use crate::error::{PipelineError, Result};
use crate::utils::frame::{has_column, is_numeric_dtype, string_values};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, info_span, warn, Span};

/// Code written for a category that was not seen at fit time
pub const UNSEEN_CODE: i64 = -1;

/// How the target column was encoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetEncoding {
    /// Target was already numeric and is left untouched
    Numeric,
    /// Raw label to class code
    Labels(BTreeMap<String, i64>),
}

impl TargetEncoding {
    /// Raw label fitted for a class code; `None` for a numeric target
    pub fn label(&self, code: i64) -> Option<&str> {
        match self {
            TargetEncoding::Numeric => None,
            TargetEncoding::Labels(mapping) => mapping
                .iter()
                .find(|(_, c)| **c == code)
                .map(|(label, _)| label.as_str()),
        }
    }
}

/// Label encoder for every non-numeric column except the identifier.
///
/// The target must hold exactly two labels. The configured positive label
/// owns code 1 and the negative label code 0; when only one of them is
/// present the other label takes the remaining code, and when neither is
/// present codes follow sorted label order. Other columns always use
/// sorted distinct-value order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalEncoder {
    target_column: String,
    identifier_column: String,
    positive_label: String,
    negative_label: String,
    target: Option<TargetEncoding>,
    mappings: BTreeMap<String, BTreeMap<String, i64>>,
    is_fitted: bool,
    #[serde(skip, default = "encoder_span")]
    span: Span,
}

fn encoder_span() -> Span {
    info_span!("encoder")
}

impl CategoricalEncoder {
    pub fn new(
        target_column: impl Into<String>,
        identifier_column: impl Into<String>,
        positive_label: impl Into<String>,
        negative_label: impl Into<String>,
    ) -> Self {
        Self {
            target_column: target_column.into(),
            identifier_column: identifier_column.into(),
            positive_label: positive_label.into(),
            negative_label: negative_label.into(),
            target: None,
            mappings: BTreeMap::new(),
            is_fitted: false,
            span: encoder_span(),
        }
    }

    pub fn target_encoding(&self) -> Option<&TargetEncoding> {
        self.target.as_ref()
    }

    /// Category to code per encoded feature column
    pub fn mappings(&self) -> &BTreeMap<String, BTreeMap<String, i64>> {
        &self.mappings
    }

    /// Learn code mappings from `df`
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let span = self.span.clone();
        let _enter = span.enter();
        self.mappings.clear();
        self.target = None;

        for col in df.get_columns() {
            let name = col.name().as_str();
            if name == self.identifier_column {
                continue;
            }

            if name == self.target_column {
                self.target = Some(self.fit_target(df)?);
                continue;
            }

            if is_numeric_dtype(col.dtype()) {
                continue;
            }

            let categories: BTreeSet<String> =
                string_values(df, name)?.into_iter().flatten().collect();
            let mapping: BTreeMap<String, i64> = categories
                .into_iter()
                .enumerate()
                .map(|(code, category)| (category, code as i64))
                .collect();
            info!(column = name, categories = mapping.len(), "Encoded column");
            self.mappings.insert(name.to_string(), mapping);
        }

        self.is_fitted = true;
        Ok(self)
    }

    fn fit_target(&self, df: &DataFrame) -> Result<TargetEncoding> {
        let column = df.column(&self.target_column)?;
        if is_numeric_dtype(column.dtype()) {
            return Ok(TargetEncoding::Numeric);
        }

        let labels: BTreeSet<String> = string_values(df, &self.target_column)?
            .into_iter()
            .flatten()
            .collect();
        info!(target = %self.target_column, labels = ?labels, "Encoding target variable");

        if labels.len() != 2 {
            return Err(PipelineError::PreprocessingError(format!(
                "Target '{}' must hold exactly two labels, found {:?}",
                self.target_column, labels
            )));
        }

        let has_positive = labels.contains(&self.positive_label);
        let has_negative = labels.contains(&self.negative_label);
        let mapping: BTreeMap<String, i64> = labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| {
                let code = if has_positive {
                    i64::from(label == self.positive_label)
                } else if has_negative {
                    i64::from(label != self.negative_label)
                } else {
                    i as i64
                };
                (label, code)
            })
            .collect();

        if !(has_positive && has_negative) {
            warn!(
                positive = %self.positive_label,
                negative = %self.negative_label,
                mapping = ?mapping,
                "Expected target labels not found, using fallback encoding"
            );
        }
        Ok(TargetEncoding::Labels(mapping))
    }

    /// Replace categories with their fitted codes
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let _enter = self.span.enter();
        if !self.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }

        let mut result = df.clone();

        if let Some(TargetEncoding::Labels(mapping)) = &self.target {
            if has_column(df, &self.target_column) {
                let codes = string_values(df, &self.target_column)?
                    .into_iter()
                    .map(|label| match label {
                        Some(l) => mapping.get(&l).copied().ok_or_else(|| {
                            PipelineError::PreprocessingError(format!("Unknown target label '{}'", l))
                        }),
                        None => Err(PipelineError::PreprocessingError(
                            "Missing target label".to_string(),
                        )),
                    })
                    .collect::<Result<Vec<i64>>>()?;
                result.with_column(Series::new(self.target_column.as_str().into(), codes))?;
            }
        }

        for (name, mapping) in &self.mappings {
            if !has_column(df, name) {
                continue;
            }
            let mut unseen = 0usize;
            let codes: Vec<i64> = string_values(df, name)?
                .into_iter()
                .map(|value| {
                    match value.as_ref().and_then(|v| mapping.get(v)) {
                        Some(code) => *code,
                        None => {
                            unseen += 1;
                            UNSEEN_CODE
                        }
                    }
                })
                .collect();
            if unseen > 0 {
                warn!(column = %name, unseen, "Categories not seen during training");
            }
            result.with_column(Series::new(name.as_str().into(), codes))?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<DataFrame> {
        self.fit(df)?;
        self.transform(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> CategoricalEncoder {
        CategoricalEncoder::new("booking_status", "Booking_ID", "Canceled", "Not_Canceled")
    }

    fn i64_column(df: &DataFrame, name: &str) -> Vec<Option<i64>> {
        df.column(name).unwrap().i64().unwrap().into_iter().collect()
    }

    #[test]
    fn test_label_encoding() {
        let df = df!(
            "Booking_ID" => &["INN1", "INN2", "INN3"],
            "meal" => &["SC", "BB", "SC"],
            "booking_status" => &["Canceled", "Not_Canceled", "Not_Canceled"],
        )
        .unwrap();

        let out = encoder().fit_transform(&df).unwrap();

        assert_eq!(i64_column(&out, "meal"), vec![Some(1), Some(0), Some(1)]);
        assert_eq!(i64_column(&out, "booking_status"), vec![Some(1), Some(0), Some(0)]);
        assert_eq!(out.column("Booking_ID").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_target_fallback_sorted_order() {
        let df = df!("booking_status" => &["yes", "no", "yes"]).unwrap();
        let mut enc = encoder();
        let out = enc.fit_transform(&df).unwrap();

        assert_eq!(i64_column(&out, "booking_status"), vec![Some(1), Some(0), Some(1)]);
        match enc.target_encoding() {
            Some(TargetEncoding::Labels(m)) => assert_eq!(m["no"], 0),
            other => panic!("unexpected target encoding {:?}", other),
        }
    }

    #[test]
    fn test_target_fallback_keeps_known_label_code() {
        let df = df!("booking_status" => &["Cancelled", "Not_Canceled", "Not_Canceled"]).unwrap();
        let mut enc = encoder();
        let out = enc.fit_transform(&df).unwrap();

        assert_eq!(i64_column(&out, "booking_status"), vec![Some(1), Some(0), Some(0)]);
        let target = enc.target_encoding().unwrap();
        assert_eq!(target.label(1), Some("Cancelled"));
        assert_eq!(target.label(0), Some("Not_Canceled"));

        let df = df!("booking_status" => &["Canceled", "Kept"]).unwrap();
        let out = enc.fit_transform(&df).unwrap();
        assert_eq!(i64_column(&out, "booking_status"), vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_target_with_three_labels_rejected() {
        let df = df!("booking_status" => &["a", "c", "b", "a", "b", "b"]).unwrap();
        let err = encoder().fit(&df).unwrap_err();
        assert!(matches!(err, PipelineError::PreprocessingError(_)));

        let df = df!("booking_status" => &["Canceled", "Canceled"]).unwrap();
        assert!(encoder().fit(&df).is_err());
    }

    #[test]
    fn test_unseen_category_maps_to_sentinel() {
        let train = df!("meal" => &["BB", "HB"]).unwrap();
        let mut enc = encoder();
        enc.fit(&train).unwrap();

        let batch = df!("meal" => &["HB", "FB"]).unwrap();
        let out = enc.transform(&batch).unwrap();
        assert_eq!(i64_column(&out, "meal"), vec![Some(1), Some(UNSEEN_CODE)]);
    }

    #[test]
    fn test_numeric_table_unchanged() {
        let df = df!(
            "lead_time" => &[1i64, 2],
            "booking_status" => &[0i64, 1],
        )
        .unwrap();

        let mut enc = encoder();
        let out = enc.fit_transform(&df).unwrap();
        assert!(out.equals(&df));
        assert_eq!(enc.target_encoding(), Some(&TargetEncoding::Numeric));
    }
}
