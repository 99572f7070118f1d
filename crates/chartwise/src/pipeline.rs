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

use crate::config::AnalysisConfig;
use crate::data_handler::cleaning::{coerce, dedupe, derive_top10, filter_complete, project, CleaningStep};
use crate::data_handler::column::ColumnData;
use crate::data_handler::dataframe::DataFrame;
use crate::data_handler::io::{CsvReader, CsvWriter};
use crate::data_handler::transformation::aggregate_by_year;
use crate::error::Result;
use crate::report::charts::{box_chart, correlation_heatmap, scatter_chart, yearly_trend_chart, ChartSpec};
use crate::report::{AnalysisReport, NamedCorrelation, YearlyAggregate};
use crate::stats::correlation::{correlation_matrix, pairwise_correlation};
use crate::stats::describe::describe;
use crate::stats::regression::{fit_linear_model, LinearModel};
use chrono::Utc;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Everything a run produces besides the cleaned CSV on disk.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub report: AnalysisReport,
    /// Cleaned rows with the top-10 label column.
    pub cleaned: DataFrame,
    pub yearly: DataFrame,
    pub charts: Vec<ChartSpec>,
}

pub struct DataPipeline {
    config: AnalysisConfig,
    reader: CsvReader,
    writer: CsvWriter,
}

impl DataPipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            reader: CsvReader::new(),
            writer: CsvWriter::new(),
        }
    }

    pub fn with_reader(mut self, reader: CsvReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_writer(mut self, writer: CsvWriter) -> Self {
        self.writer = writer;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn load(&self, input: &Path) -> Result<DataFrame> {
        let raw = self.reader.read_file(input, self.config.dataset_name.clone())?;
        for column in raw.column_metadata() {
            debug!(column = %column.name, nulls = column.null_count, "Loaded column");
        }
        Ok(raw)
    }

    /// Project, coerce, drop incomplete rows, dedupe.
    pub fn clean(&self, raw: &DataFrame) -> Result<(DataFrame, Vec<CleaningStep>)> {
        let config = &self.config;
        let projected = project(raw, &config.columns)?;
        let coerced = coerce(&projected, &config.numeric_columns)?;
        let complete = filter_complete(&coerced, &config.required_columns)?;
        let unique = dedupe(&complete)?;
        let steps = vec![
            CleaningStep::new("project", raw, &projected),
            CleaningStep::new("coerce", &projected, &coerced),
            CleaningStep::new("filter_complete", &coerced, &complete),
            CleaningStep::new("dedupe", &complete, &unique),
        ];
        for step in &steps {
            info!(
                step = %step.step,
                rows_before = step.rows_before,
                rows_after = step.rows_after,
                "Cleaning step"
            );
        }
        Ok((unique, steps))
    }

    pub fn run(&self, input: &Path) -> Result<PipelineOutput> {
        let raw = self.load(input)?;
        self.run_frame(raw)
    }

    /// Runs every stage after loading. The cleaned CSV is written before the
    /// top-10 label is added, and only once cleaning has succeeded.
    pub fn run_frame(&self, raw: DataFrame) -> Result<PipelineOutput> {
        let config = &self.config;
        let (clean, cleaning_steps) = self.clean(&raw)?;
        self.writer.write_file(&clean, &config.output_path)?;

        let labelled = derive_top10(&clean, &config.ranking_column, &config.top10_column, config.top10_threshold)?;
        let yearly_frame = aggregate_by_year(&labelled, &config.year_column, &config.aggregate_metrics)?;
        info!(years = yearly_frame.row_count(), "Aggregated by year");
        let yearly = YearlyAggregate::from_frame(&yearly_frame, &config.year_column, &config.aggregate_metrics)?;

        let summary = describe(&labelled, &config.numeric_columns)?;
        let focus_correlation = self.focus_correlation(&labelled)?;
        let matrix = correlation_matrix(&labelled, &config.correlation_columns)?;
        let undefined = matrix.values.iter().flatten().filter(|v| v.is_none()).count();
        if undefined > 0 {
            warn!(cells = undefined, "Correlation matrix has undefined cells");
        }
        let (regression, regression_error) = self.regression(&labelled)?;

        let charts = vec![
            yearly_trend_chart(&yearly_frame, &config.year_column, &config.aggregate_metrics)?,
            scatter_chart(&labelled, &config.focus_metric, &config.ranking_column)?,
            box_chart(&labelled, &config.focus_metric, &config.top10_column)?,
            correlation_heatmap(&matrix),
        ];

        let report = AnalysisReport {
            generated_at: Utc::now(),
            source: raw.metadata.clone(),
            cleaned: clean.metadata.clone(),
            columns: labelled.column_metadata(),
            cleaning_steps,
            summary,
            yearly,
            focus_correlation,
            correlation_matrix: matrix,
            regression,
            regression_error,
            top10_counts: label_counts(&labelled, &config.top10_column)?,
        };
        info!(
            rows = labelled.row_count(),
            dropped = report.rows_dropped(),
            "Analysis complete"
        );
        Ok(PipelineOutput {
            report,
            cleaned: labelled,
            yearly: yearly_frame,
            charts,
        })
    }

    fn focus_correlation(&self, frame: &DataFrame) -> Result<NamedCorrelation> {
        let config = &self.config;
        let focus = frame
            .require_column(&config.focus_metric)?
            .numeric_values(&config.focus_metric)?;
        let ranking = frame
            .require_column(&config.ranking_column)?
            .numeric_values(&config.ranking_column)?;
        let (value, pairs) = pairwise_correlation(focus, ranking);
        match value {
            Some(r) => info!(metric = %config.focus_metric, r, pairs, "Correlation with ranking"),
            None => warn!(metric = %config.focus_metric, pairs, "Correlation with ranking is undefined"),
        }
        Ok(NamedCorrelation {
            left: config.focus_metric.clone(),
            right: config.ranking_column.clone(),
            value,
            pairs,
        })
    }

    /// Statistical failures are reported rather than aborting the run.
    fn regression(&self, frame: &DataFrame) -> Result<(Option<LinearModel>, Option<String>)> {
        let config = &self.config;
        match fit_linear_model(frame, &config.regression_target, &config.regression_predictors) {
            Ok(model) => {
                info!(
                    n_obs = model.n_obs,
                    r_squared = model.r_squared,
                    f_p_value = model.f_p_value,
                    "Fitted regression"
                );
                Ok((Some(model), None))
            }
            Err(error) if !error.is_fatal() => {
                warn!(%error, "Regression not fitted");
                Ok((None, Some(error.to_string())))
            }
            Err(error) => Err(error),
        }
    }
}

fn label_counts(frame: &DataFrame, column: &str) -> Result<BTreeMap<String, usize>> {
    let labels = frame.require_column(column)?;
    let mut counts = BTreeMap::new();
    for i in 0..frame.row_count() {
        if let Some(label) = labels.get_string(i) {
            *counts.entry(label).or_insert(0) += 1;
        }
    }
    Ok(counts)
}
