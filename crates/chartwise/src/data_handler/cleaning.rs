// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Projection and cleaning steps. Each step takes a frame by reference and
//! returns a new one, so the pipeline composes them left to right.

use crate::data_handler::column::{Column, ColumnData};
use crate::data_handler::dataframe::DataFrame;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const TOP10_LABEL: &str = "Top 10";
pub const OTHER_LABEL: &str = "Other";

/// Restricts `frame` to `columns`, in the requested order.
pub fn project<S: AsRef<str>>(frame: &DataFrame, columns: &[S]) -> Result<DataFrame> {
    frame.select(columns)
}

/// Converts the listed columns to numbers. Unparseable cells become missing;
/// numeric columns pass through untouched.
pub fn coerce<S: AsRef<str>>(frame: &DataFrame, numeric_columns: &[S]) -> Result<DataFrame> {
    let coerced = frame.map_columns(numeric_columns, "coerced", Column::coerce_numeric)?;
    for name in numeric_columns {
        let name = name.as_ref();
        let before = frame.require_column(name)?.null_count();
        let after = coerced.require_column(name)?.null_count();
        if after > before {
            debug!(column = name, demoted = after - before, "Unparseable values coerced to missing");
        }
    }
    Ok(coerced)
}

/// Drops rows with a missing value in any of `required_columns`.
pub fn filter_complete<S: AsRef<str>>(frame: &DataFrame, required_columns: &[S]) -> Result<DataFrame> {
    frame.require_columns(required_columns)?;
    let required: Vec<&Column> = required_columns
        .iter()
        .map(|name| frame.require_column(name.as_ref()))
        .collect::<Result<_>>()?;
    frame.filter("complete", |i| required.iter().all(|column| !column.is_missing(i)))
}

/// Drops rows equal on every field to an earlier row.
pub fn dedupe(frame: &DataFrame) -> Result<DataFrame> {
    frame.drop_duplicates(None)
}

/// Adds a text column labelling rows ranked at or above `threshold`.
pub fn derive_top10(
    frame: &DataFrame,
    ranking_column: &str,
    label_column: &str,
    threshold: f64,
) -> Result<DataFrame> {
    let ranking = frame.require_column(ranking_column)?;
    let labels: Vec<Option<&str>> = (0..frame.row_count())
        .map(|i| {
            ranking.to_f64(i).map(|rank| {
                if rank <= threshold {
                    TOP10_LABEL
                } else {
                    OTHER_LABEL
                }
            })
        })
        .collect();
    frame.with_column(label_column, Column::from_text(&labels))
}

/// Row counts around one cleaning step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CleaningStep {
    pub step: String,
    pub rows_before: usize,
    pub rows_after: usize,
}

impl CleaningStep {
    pub fn new(step: &str, before: &DataFrame, after: &DataFrame) -> Self {
        Self {
            step: step.to_string(),
            rows_before: before.row_count(),
            rows_after: after.row_count(),
        }
    }

    pub fn rows_dropped(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}
