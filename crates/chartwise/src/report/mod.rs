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

pub mod charts;
pub mod tables;

pub use charts::{
    box_chart, correlation_heatmap, scatter_chart, yearly_trend_chart, BoxGroup, ChartData, ChartKind,
    ChartSpec, Series,
};
pub use tables::{format_correlation_matrix, format_regression, format_summary_table, format_yearly_table};

use crate::data_handler::cleaning::CleaningStep;
use crate::data_handler::column::ColumnData;
use crate::data_handler::common::{ColumnMetadata, DatasetMetadata};
use crate::data_handler::dataframe::DataFrame;
use crate::error::{ExportError, Result};
use crate::stats::correlation::CorrelationMatrix;
use crate::stats::describe::ColumnSummary;
use crate::stats::regression::LinearModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct YearlyAggregate {
    pub year: f64,
    pub count: usize,
    /// Metric name to mean; `None` when every value in the year was missing.
    pub means: BTreeMap<String, Option<f64>>,
}

impl YearlyAggregate {
    /// Reads the rows of a frame produced by `aggregate_by_year`.
    pub fn from_frame<S: AsRef<str>>(frame: &DataFrame, year_column: &str, metrics: &[S]) -> Result<Vec<Self>> {
        let years = frame.require_column(year_column)?.numeric_values(year_column)?;
        let counts = frame.require_column("count")?;
        let mean_columns = metrics
            .iter()
            .map(|metric| {
                let name = format!("mean_{}", metric.as_ref());
                let column = frame.require_column(&name)?;
                Ok((metric.as_ref().to_string(), column))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(years
            .iter()
            .enumerate()
            .filter_map(|(i, year)| {
                Some(Self {
                    year: (*year)?,
                    count: counts.to_f64(i).map_or(0, |c| c as usize),
                    means: mean_columns
                        .iter()
                        .map(|(metric, column)| (metric.clone(), column.to_f64(i)))
                        .collect(),
                })
            })
            .collect())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedCorrelation {
    pub left: String,
    pub right: String,
    pub value: Option<f64>,
    pub pairs: usize,
}

/// Everything one analysis run produced, ready for text or JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub generated_at: DateTime<Utc>,
    pub source: DatasetMetadata,
    pub cleaned: DatasetMetadata,
    pub columns: Vec<ColumnMetadata>,
    pub cleaning_steps: Vec<CleaningStep>,
    pub summary: Vec<ColumnSummary>,
    pub yearly: Vec<YearlyAggregate>,
    pub focus_correlation: NamedCorrelation,
    pub correlation_matrix: CorrelationMatrix,
    pub regression: Option<LinearModel>,
    /// Why the regression was not fitted, when it was not.
    pub regression_error: Option<String>,
    pub top10_counts: BTreeMap<String, usize>,
}

impl AnalysisReport {
    pub fn rows_dropped(&self) -> usize {
        self.cleaning_steps.iter().map(CleaningStep::rows_dropped).sum()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }
}

/// Pretty-printed JSON of any report artifact. Non-finite numbers become `null`.
pub fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|source| ExportError::Create {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), value).map_err(|source| ExportError::Serialise {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "Wrote JSON artifact");
    Ok(())
}

pub fn render_report(report: &AnalysisReport) -> String {
    let mut out = String::new();
    out.push_str("== Dataset ==\n");
    out.push_str(&format!(
        "{}: {} rows x {} columns loaded, {} rows x {} columns after cleaning\n",
        report.source.name,
        report.source.row_count,
        report.source.column_count,
        report.cleaned.row_count,
        report.cleaned.column_count
    ));
    if let Some(path) = &report.source.source_path {
        out.push_str(&format!("source: {}\n", path.display()));
    }

    out.push_str("\n== Cleaning ==\n");
    for step in &report.cleaning_steps {
        out.push_str(&format!(
            "{:<16} {:>8} -> {:>8} ({} dropped)\n",
            step.step,
            step.rows_before,
            step.rows_after,
            step.rows_dropped()
        ));
    }
    if !report.top10_counts.is_empty() {
        let counts: Vec<String> = report
            .top10_counts
            .iter()
            .map(|(label, count)| format!("{label}: {count}"))
            .collect();
        out.push_str(&format!("groups: {}\n", counts.join(", ")));
    }

    out.push_str("\n== Summary statistics ==\n");
    out.push_str(&format_summary_table(&report.summary));

    out.push_str("\n== Yearly means ==\n");
    out.push_str(&format_yearly_table(&report.yearly));

    out.push_str("\n== Correlation ==\n");
    let focus = &report.focus_correlation;
    out.push_str(&format!(
        "{} vs {}: {} over {} complete pairs\n",
        focus.left,
        focus.right,
        tables::format_value(focus.value),
        focus.pairs
    ));
    out.push('\n');
    out.push_str(&format_correlation_matrix(&report.correlation_matrix));

    out.push_str("\n== Regression ==\n");
    match (&report.regression, &report.regression_error) {
        (Some(model), _) => out.push_str(&format_regression(model)),
        (None, Some(reason)) => out.push_str(&format!("not fitted: {reason}\n")),
        (None, None) => out.push_str("not fitted\n"),
    }
    out
}
