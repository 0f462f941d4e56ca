//! Derived reservation features

use crate::error::Result;
use crate::utils::frame::{has_column, numeric_values};
use polars::prelude::*;
use tracing::{info, info_span, warn, Span};

pub const TOTAL_STAY_NIGHTS: &str = "total_stay_nights";
pub const TOTAL_GUESTS: &str = "total_guests";
pub const LEAD_TIME_CATEGORY: &str = "booking_lead_time_category";
pub const AVG_ADR_PER_PERSON: &str = "avg_adr_per_person";
pub const WEEKEND_BOOKING_FLAG: &str = "weekend_booking_flag";

/// Bucket for `lead_time`: up to a week is short, up to a month is medium
pub fn lead_time_category(lead_time: f64) -> &'static str {
    if lead_time <= 7.0 {
        "short"
    } else if lead_time <= 30.0 {
        "medium"
    } else {
        "long"
    }
}

/// Adds derived columns computed from canonical reservation columns.
///
/// A feature whose inputs are absent is skipped with a warning.
#[derive(Debug, Clone)]
pub struct FeatureDeriver {
    span: Span,
}

impl Default for FeatureDeriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureDeriver {
    pub fn new() -> Self {
        Self {
            span: info_span!("feature_deriver"),
        }
    }

    /// Append every derivable feature to `df`
    pub fn derive(&self, mut df: DataFrame) -> Result<DataFrame> {
        let _enter = self.span.enter();
        let mut added = Vec::new();

        if self.requires(&df, TOTAL_STAY_NIGHTS, &["stays_in_weekend_nights", "stays_in_week_nights"]) {
            let weekend = numeric_values(&df, "stays_in_weekend_nights")?;
            let week = numeric_values(&df, "stays_in_week_nights")?;
            let total: Float64Chunked = weekend
                .iter()
                .zip(&week)
                .map(|(a, b)| Some((*a)? + (*b)?))
                .collect();
            df.with_column(total.with_name(TOTAL_STAY_NIGHTS.into()).into_series())?;
            added.push(TOTAL_STAY_NIGHTS);
        }

        if self.requires(&df, TOTAL_GUESTS, &["adults", "children"]) {
            let adults = numeric_values(&df, "adults")?;
            let children = numeric_values(&df, "children")?;
            let babies = if has_column(&df, "babies") {
                numeric_values(&df, "babies")?
            } else {
                vec![Some(0.0); df.height()]
            };
            let total: Float64Chunked = adults
                .iter()
                .zip(&children)
                .zip(&babies)
                .map(|((a, c), b)| Some((*a)? + (*c)? + (*b)?))
                .collect();
            df.with_column(total.with_name(TOTAL_GUESTS.into()).into_series())?;
            added.push(TOTAL_GUESTS);
        }

        if self.requires(&df, LEAD_TIME_CATEGORY, &["lead_time"]) {
            let category: StringChunked = numeric_values(&df, "lead_time")?
                .into_iter()
                .map(|v| v.map(lead_time_category))
                .collect();
            df.with_column(category.with_name(LEAD_TIME_CATEGORY.into()).into_series())?;
            added.push(LEAD_TIME_CATEGORY);
        }

        if self.requires(&df, AVG_ADR_PER_PERSON, &["adr", TOTAL_GUESTS]) {
            let adr = numeric_values(&df, "adr")?;
            let guests = numeric_values(&df, TOTAL_GUESTS)?;
            let per_person: Float64Chunked = adr
                .iter()
                .zip(&guests)
                .map(|(a, g)| {
                    let g = (*g)?;
                    Some((*a)? / if g == 0.0 { 1.0 } else { g })
                })
                .collect();
            df.with_column(per_person.with_name(AVG_ADR_PER_PERSON.into()).into_series())?;
            added.push(AVG_ADR_PER_PERSON);
        }

        if self.requires(&df, WEEKEND_BOOKING_FLAG, &["stays_in_weekend_nights"]) {
            let flag: Int64Chunked = numeric_values(&df, "stays_in_weekend_nights")?
                .into_iter()
                .map(|v| v.map(|n| i64::from(n > 0.0)))
                .collect();
            df.with_column(flag.with_name(WEEKEND_BOOKING_FLAG.into()).into_series())?;
            added.push(WEEKEND_BOOKING_FLAG);
        }

        info!(new_columns = ?added, "Feature engineering completed");
        Ok(df)
    }

    fn requires(&self, df: &DataFrame, feature: &str, inputs: &[&str]) -> bool {
        let missing: Vec<&str> = inputs
            .iter()
            .copied()
            .filter(|c| !has_column(df, c))
            .collect();
        if missing.is_empty() {
            true
        } else {
            warn!(feature, missing = ?missing, "Input columns not found, skipping feature");
            false
        }
    }
}
