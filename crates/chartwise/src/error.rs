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

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Load error: {0}")]
    Load(#[from] LoadError),
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to open data file '{path}': {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse data file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Data file '{path}' has no header row")]
    EmptyFile { path: PathBuf },
    #[error("Data file '{path}' declares column '{column}' more than once")]
    DuplicateHeader { path: PathBuf, column: String },
    #[error("Data file '{path}' line {line}: expected at most {expected} fields, got {found}")]
    TooManyFields {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("Field on line {line} exceeds the size limit of {limit} bytes")]
    FieldTooLarge { line: u64, limit: usize },
}

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Missing columns: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },
    #[error("Column '{column}' has type {found}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: String,
    },
    #[error("Column length mismatch for '{column}': expected {expected}, got {found}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("Row index {index} out of bounds for {len} rows")]
    RowOutOfBounds { index: usize, len: usize },
}

#[derive(Error, Debug)]
pub enum StatsError {
    #[error("Insufficient data: {rows} complete rows, need more than {required}")]
    InsufficientData { rows: usize, required: usize },
    #[error("Design matrix is singular: {reason}")]
    SingularDesign { reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Configuration validation failed: {reason}")]
    ValidationFailed { reason: String },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to create '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write CSV to '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Failed to serialise '{path}': {source}")]
    Serialise {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

impl AnalysisError {
    pub fn category(&self) -> &'static str {
        match self {
            AnalysisError::Load(_) => "Load",
            AnalysisError::Schema(_) => "Schema",
            AnalysisError::Stats(_) => "Statistics",
            AnalysisError::Config(_) => "Configuration",
            AnalysisError::Export(_) => "Export",
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AnalysisError::Stats(_) => ErrorSeverity::Warning,
            AnalysisError::Load(LoadError::FileOpen { .. }) => ErrorSeverity::Critical,
            _ => ErrorSeverity::Error,
        }
    }

    /// Errors that abort the run before the cleaned data is exported.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, AnalysisError::Stats(_))
    }

    pub fn suggestions(&self) -> Vec<String> {
        match self {
            AnalysisError::Load(LoadError::FileOpen { .. }) => vec![
                "Check the input path and file permissions".to_string(),
            ],
            AnalysisError::Load(LoadError::TooManyFields { .. })
            | AnalysisError::Load(LoadError::Parse { .. }) => vec![
                "Check the delimiter with --delimiter".to_string(),
                "Look for unbalanced quotes in the reported line".to_string(),
            ],
            AnalysisError::Schema(SchemaError::MissingColumns { .. }) => vec![
                "Column names are case-sensitive and must match exactly".to_string(),
                "Adjust the column list in the analysis configuration".to_string(),
            ],
            AnalysisError::Stats(StatsError::InsufficientData { .. }) => vec![
                "Fewer predictors or a larger dataset are required".to_string(),
            ],
            AnalysisError::Stats(StatsError::SingularDesign { .. }) => vec![
                "Remove predictors that are constant or perfectly collinear".to_string(),
            ],
            AnalysisError::Config(_) => vec![
                "Validate the YAML file against the documented keys".to_string(),
            ],
            _ => vec!["Check the error message for specific guidance".to_string()],
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Load(LoadError::EmptyFile { path }) => format!(
                "The file '{}' is empty. Please provide a CSV file with a header row.",
                path.display()
            ),
            AnalysisError::Schema(SchemaError::MissingColumns { columns }) => format!(
                "The dataset is missing required columns: {}.",
                columns.join(", ")
            ),
            _ => self.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl ErrorSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "INFO",
            ErrorSeverity::Warning => "WARNING",
            ErrorSeverity::Error => "ERROR",
            ErrorSeverity::Critical => "CRITICAL",
        }
    }

    pub fn color_code(&self) -> &'static str {
        match self {
            ErrorSeverity::Info => "\x1b[36m",
            ErrorSeverity::Warning => "\x1b[33m",
            ErrorSeverity::Error => "\x1b[31m",
            ErrorSeverity::Critical => "\x1b[35m",
        }
    }
}

pub struct ErrorReporter {
    pub show_suggestions: bool,
    pub colored_output: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            show_suggestions: true,
            colored_output: true,
        }
    }

    pub fn report(&self, error: &AnalysisError) -> String {
        let severity = error.severity();
        let mut output = String::new();
        if self.colored_output {
            output.push_str(severity.color_code());
        }
        output.push_str(&format!(
            "[{}] {}: {}\n",
            severity.as_str(),
            error.category(),
            error.user_message()
        ));
        if self.colored_output {
            output.push_str("\x1b[0m");
        }
        if self.show_suggestions {
            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                output.push_str("\nSuggestions:\n");
                for suggestion in suggestions {
                    output.push_str(&format!("  • {suggestion}\n"));
                }
            }
        }
        output
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
