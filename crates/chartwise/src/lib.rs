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

pub mod config;
pub mod data_handler;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod stats;

pub use config::AnalysisConfig;
pub use data_handler::{Column, ColumnData, CsvReader, CsvWriter, DataFrame, DataType, DatasetMetadata};
pub use error::{
    AnalysisError, ConfigError, ErrorReporter, ErrorSeverity, ExportError, LoadError, Result, SchemaError,
    StatsError,
};
pub use pipeline::{DataPipeline, PipelineOutput};
pub use report::{render_report, AnalysisReport, ChartSpec};
pub use stats::{correlation, correlation_matrix, describe, fit_linear_model, CorrelationMatrix, LinearModel};

use std::path::Path;

/// Runs the full analysis of `input` under `config`.
pub fn analyse_csv(input: &Path, config: AnalysisConfig) -> Result<PipelineOutput> {
    config.validate()?;
    DataPipeline::new(config).run(input)
}
