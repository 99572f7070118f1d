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

use crate::data_handler::column::{Column, ColumnData};
use crate::data_handler::dataframe::DataFrame;
use crate::error::Result;
use crate::stats::describe::quantile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AggregateFunction {
    Count,
    Sum,
    Mean,
    Min,
    Max,
    Median,
    StdDev,
    Variance,
}

impl AggregateFunction {
    pub fn prefix(&self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Mean => "mean",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Median => "median",
            AggregateFunction::StdDev => "std",
            AggregateFunction::Variance => "var",
        }
    }

    /// Applies the function to the non-missing values of a group.
    /// `group_size` counts rows including missing ones.
    pub fn apply(&self, values: &[f64], group_size: usize) -> Option<f64> {
        match self {
            AggregateFunction::Count => Some(group_size as f64),
            AggregateFunction::Sum => Some(values.iter().sum()),
            AggregateFunction::Mean => {
                if values.is_empty() {
                    None
                } else {
                    Some(values.iter().sum::<f64>() / values.len() as f64)
                }
            }
            AggregateFunction::Min => values.iter().copied().reduce(f64::min),
            AggregateFunction::Max => values.iter().copied().reduce(f64::max),
            AggregateFunction::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(f64::total_cmp);
                quantile(&sorted, 0.5)
            }
            AggregateFunction::StdDev | AggregateFunction::Variance => {
                if values.len() < 2 {
                    return None;
                }
                let mean = values.iter().sum::<f64>() / values.len() as f64;
                let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>()
                    / (values.len() - 1) as f64;
                match self {
                    AggregateFunction::Variance => Some(variance),
                    _ => Some(variance.sqrt()),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateOperation {
    pub column: String,
    pub function: AggregateFunction,
    pub alias: Option<String>,
}

impl AggregateOperation {
    pub fn new(column: &str, function: AggregateFunction) -> Self {
        Self {
            column: column.to_string(),
            function,
            alias: None,
        }
    }

    pub fn output_name(&self) -> String {
        self.alias
            .clone()
            .unwrap_or_else(|| format!("{}_{}", self.function.prefix(), self.column))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupByOperation {
    pub group_column: String,
    pub aggregations: Vec<AggregateOperation>,
}

/// Normalises the sign of zero so `-0.0` and `0.0` share a group.
fn group_key(value: f64) -> u64 {
    if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

#[derive(Debug, Default)]
pub struct TransformationEngine;

impl TransformationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Groups on exact value equality of a numeric column and emits one row
    /// per group in ascending key order. Rows with a missing key join no group.
    pub fn group_by(&self, dataframe: &DataFrame, operation: &GroupByOperation) -> Result<DataFrame> {
        let key_values = dataframe
            .require_column(&operation.group_column)?
            .numeric_values(&operation.group_column)?;
        let mut groups: HashMap<u64, (f64, Vec<usize>)> = HashMap::new();
        let mut skipped = 0usize;
        for (i, key) in key_values.iter().enumerate() {
            match key {
                Some(value) => groups
                    .entry(group_key(*value))
                    .or_insert_with(|| (*value, Vec::new()))
                    .1
                    .push(i),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            debug!(
                column = %operation.group_column,
                skipped,
                "Rows with a missing group key were left out of the aggregation"
            );
        }
        let mut ordered: Vec<(f64, Vec<usize>)> = groups.into_values().collect();
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut sources = Vec::with_capacity(operation.aggregations.len());
        for agg in &operation.aggregations {
            let column = dataframe.require_column(&agg.column)?;
            if agg.function != AggregateFunction::Count {
                column.numeric_values(&agg.column)?;
            }
            sources.push(column);
        }

        let keys: Vec<Option<f64>> = ordered.iter().map(|(key, _)| Some(*key)).collect();
        let mut result = DataFrame::new(dataframe.metadata.derive("grouped"));
        result.add_column(operation.group_column.clone(), Column::from_f64(keys))?;
        for (agg, column) in operation.aggregations.iter().zip(sources) {
            let values: Vec<Option<f64>> = ordered
                .iter()
                .map(|(_, indices)| {
                    let present: Vec<f64> = indices.iter().filter_map(|&i| column.to_f64(i)).collect();
                    agg.function.apply(&present, indices.len())
                })
                .collect();
            result.add_column(agg.output_name(), Column::from_f64(values))?;
        }
        Ok(result)
    }
}

/// Per-year means of `metrics`, ascending by year, with a `count` column.
/// A year whose values for a metric are all missing gets a missing mean.
pub fn aggregate_by_year<S: AsRef<str>>(
    frame: &DataFrame,
    year_column: &str,
    metrics: &[S],
) -> Result<DataFrame> {
    let mut aggregations = vec![AggregateOperation {
        column: year_column.to_string(),
        function: AggregateFunction::Count,
        alias: Some("count".to_string()),
    }];
    aggregations.extend(
        metrics
            .iter()
            .map(|metric| AggregateOperation::new(metric.as_ref(), AggregateFunction::Mean)),
    );
    let operation = GroupByOperation {
        group_column: year_column.to_string(),
        aggregations,
    };
    TransformationEngine::new().group_by(frame, &operation)
}
