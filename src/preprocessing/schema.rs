//! Normalization of the two raw column-naming conventions

use crate::error::Result;
use crate::utils::frame::has_column;
use polars::prelude::*;
use tracing::{debug, info_span, warn, Span};

/// Abbreviated raw name and the canonical name it is renamed to
pub const COLUMN_ALIASES: [(&str, &str); 5] = [
    ("no_of_adults", "adults"),
    ("no_of_children", "children"),
    ("no_of_weekend_nights", "stays_in_weekend_nights"),
    ("no_of_week_nights", "stays_in_week_nights"),
    ("avg_price_per_room", "adr"),
];

/// Renames abbreviated columns so downstream stages see a single schema
#[derive(Debug, Clone)]
pub struct SchemaAdapter {
    span: Span,
}

impl Default for SchemaAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaAdapter {
    pub fn new() -> Self {
        Self {
            span: info_span!("schema_adapter"),
        }
    }

    /// Rename every alias present in `df` to its canonical name.
    ///
    /// If both the alias and the canonical column exist, the canonical one is
    /// kept and the alias is left in place.
    pub fn adapt(&self, mut df: DataFrame) -> Result<DataFrame> {
        let _enter = self.span.enter();

        for (alias, canonical) in COLUMN_ALIASES {
            if !has_column(&df, alias) {
                continue;
            }
            if has_column(&df, canonical) {
                warn!(alias, canonical, "Both naming conventions present, keeping canonical column");
                continue;
            }
            df.rename(alias, canonical.into())?;
            debug!(alias, canonical, "Renamed column");
        }

        Ok(df)
    }
}
