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

//! Chart specifications. Nothing here draws; each `ChartSpec` carries the
//! data and channel mappings an external renderer needs.

use crate::data_handler::column::ColumnData;
use crate::data_handler::dataframe::DataFrame;
use crate::error::Result;
use crate::stats::correlation::CorrelationMatrix;
use crate::stats::describe::FiveNumberSummary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Line,
    Scatter,
    Box,
    Heatmap,
}

/// A labelled numeric series of `(x, y)` points; `y` may be missing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Series {
    pub label: String,
    pub points: Vec<(f64, Option<f64>)>,
}

impl Series {
    pub fn new(label: impl Into<String>, points: Vec<(f64, Option<f64>)>) -> Self {
        Self {
            label: label.into(),
            points,
        }
    }

    /// Points where both coordinates are present, from two columns of `frame`.
    pub fn from_columns(frame: &DataFrame, label: &str, x_column: &str, y_column: &str) -> Result<Self> {
        let x = frame.require_column(x_column)?;
        let y = frame.require_column(y_column)?;
        let points = (0..frame.row_count())
            .filter_map(|i| Some((x.to_f64(i)?, y.to_f64(i))))
            .collect();
        Ok(Self::new(label, points))
    }

    pub fn present_values(&self) -> Vec<f64> {
        self.points.iter().filter_map(|(_, y)| *y).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoxGroup {
    pub label: String,
    pub count: usize,
    pub summary: FiveNumberSummary,
    pub outliers: Vec<f64>,
}

impl BoxGroup {
    pub fn from_values(label: impl Into<String>, values: &[f64]) -> Option<Self> {
        let summary = FiveNumberSummary::from_values(values)?;
        let (lower, upper) = summary.fences();
        let outliers = values.iter().copied().filter(|&v| v < lower || v > upper).collect();
        Some(Self {
            label: label.into(),
            count: values.len(),
            summary,
            outliers,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartData {
    Series { series: Vec<Series> },
    Box { groups: Vec<BoxGroup> },
    Heatmap {
        labels: Vec<String>,
        values: Vec<Vec<Option<f64>>>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSpec {
    pub chart_name: String,
    pub kind: ChartKind,
    pub title: String,
    /// Visual channel to column name, e.g. `x -> year`.
    pub mappings: BTreeMap<String, String>,
    pub data: ChartData,
}

impl ChartSpec {
    fn new(chart_name: &str, kind: ChartKind, title: String, data: ChartData) -> Self {
        Self {
            chart_name: chart_name.to_string(),
            kind,
            title,
            mappings: BTreeMap::new(),
            data,
        }
    }

    pub fn with_mapping(mut self, channel: &str, column: &str) -> Self {
        self.mappings.insert(channel.to_string(), column.to_string());
        self
    }

    /// A line, scatter or box chart of one labelled series.
    pub fn from_series(kind: ChartKind, title: &str, series: Series) -> Self {
        let data = match kind {
            ChartKind::Box => {
                let values = series.present_values();
                ChartData::Box {
                    groups: BoxGroup::from_values(series.label, &values).into_iter().collect(),
                }
            }
            _ => ChartData::Series { series: vec![series] },
        };
        Self::new(&title.to_lowercase().replace(' ', "_"), kind, title.to_string(), data)
    }

    pub fn series_count(&self) -> usize {
        match &self.data {
            ChartData::Series { series } => series.len(),
            ChartData::Box { groups } => groups.len(),
            ChartData::Heatmap { labels, .. } => labels.len(),
        }
    }
}

/// One line per metric over the yearly aggregate frame.
pub fn yearly_trend_chart<S: AsRef<str>>(yearly: &DataFrame, year_column: &str, metrics: &[S]) -> Result<ChartSpec> {
    let series = metrics
        .iter()
        .map(|metric| {
            let column = format!("mean_{}", metric.as_ref());
            Series::from_columns(yearly, metric.as_ref(), year_column, &column)
        })
        .collect::<Result<Vec<_>>>()?;
    let title = format!("Yearly mean of {}", join_names(metrics));
    Ok(ChartSpec::new("yearly_trends", ChartKind::Line, title, ChartData::Series { series })
        .with_mapping("x", year_column)
        .with_mapping("y", "mean"))
}

pub fn scatter_chart(frame: &DataFrame, x_column: &str, y_column: &str) -> Result<ChartSpec> {
    let mut series = Series::from_columns(frame, y_column, x_column, y_column)?;
    series.points.retain(|(_, y)| y.is_some());
    let title = format!("{y_column} vs {x_column}");
    Ok(ChartSpec::new(
        &format!("{x_column}_vs_{y_column}"),
        ChartKind::Scatter,
        title,
        ChartData::Series { series: vec![series] },
    )
    .with_mapping("x", x_column)
    .with_mapping("y", y_column))
}

/// Box per distinct value of `group_column`, ordered by label.
/// Rows missing either field are left out.
pub fn box_chart(frame: &DataFrame, value_column: &str, group_column: &str) -> Result<ChartSpec> {
    let values = frame.require_column(value_column)?;
    let groups_column = frame.require_column(group_column)?;
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for i in 0..frame.row_count() {
        if let (Some(label), Some(value)) = (groups_column.get_string(i), values.to_f64(i)) {
            grouped.entry(label).or_default().push(value);
        }
    }
    let groups = grouped
        .into_iter()
        .filter_map(|(label, values)| BoxGroup::from_values(label, &values))
        .collect();
    Ok(ChartSpec::new(
        &format!("{value_column}_by_{group_column}"),
        ChartKind::Box,
        format!("{value_column} by {group_column}"),
        ChartData::Box { groups },
    )
    .with_mapping("x", group_column)
    .with_mapping("y", value_column))
}

pub fn correlation_heatmap(matrix: &CorrelationMatrix) -> ChartSpec {
    ChartSpec::new(
        "correlation_heatmap",
        ChartKind::Heatmap,
        "Pairwise correlation".to_string(),
        ChartData::Heatmap {
            labels: matrix.columns.clone(),
            values: matrix.values.clone(),
        },
    )
    .with_mapping("color", "pearson_r")
}

fn join_names<S: AsRef<str>>(names: &[S]) -> String {
    names.iter().map(|n| n.as_ref()).collect::<Vec<_>>().join(", ")
}
