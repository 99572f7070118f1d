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

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Column roles and parameters for one analysis run.
/// Any key missing from a YAML file falls back to the default value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub dataset_name: String,
    /// Columns kept by the projection, in output order.
    pub columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    /// A row missing any of these after coercion is dropped.
    pub required_columns: Vec<String>,
    pub year_column: String,
    pub ranking_column: String,
    pub aggregate_metrics: Vec<String>,
    pub regression_target: String,
    pub regression_predictors: Vec<String>,
    pub correlation_columns: Vec<String>,
    pub top10_column: String,
    pub top10_threshold: f64,
    /// Box-plot and scatter feature.
    pub focus_metric: String,
    pub output_path: PathBuf,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            dataset_name: "music_charts".to_string(),
            columns: strings(&[
                "ranking",
                "year",
                "song",
                "band_singer",
                "danceability",
                "energy",
                "valence",
                "tempo",
                "loudness",
                "acousticness",
                "speechiness",
                "instrumentalness",
                "liveness",
                "duration_ms",
            ]),
            numeric_columns: strings(&[
                "ranking",
                "year",
                "danceability",
                "energy",
                "valence",
                "tempo",
                "loudness",
                "acousticness",
                "speechiness",
                "instrumentalness",
                "liveness",
                "duration_ms",
            ]),
            required_columns: strings(&["ranking", "year", "danceability", "energy", "valence"]),
            year_column: "year".to_string(),
            ranking_column: "ranking".to_string(),
            aggregate_metrics: strings(&["danceability", "energy", "valence"]),
            regression_target: "ranking".to_string(),
            regression_predictors: strings(&["danceability", "energy", "valence", "tempo"]),
            correlation_columns: strings(&[
                "ranking",
                "danceability",
                "energy",
                "valence",
                "tempo",
                "loudness",
                "acousticness",
                "speechiness",
                "duration_ms",
            ]),
            top10_column: "top10".to_string(),
            top10_threshold: 10.0,
            focus_metric: "danceability".to_string(),
            output_path: PathBuf::from("music_clean.csv"),
        }
    }
}

impl AnalysisConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        info!(path = %path.display(), "Loaded analysis configuration");
        Ok(config)
    }

    /// Reads `path` when given, otherwise the built-in configuration.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| -> Result<()> { Err(ConfigError::ValidationFailed { reason }.into()) };
        if self.columns.is_empty() {
            return fail("at least one column must be selected".to_string());
        }
        let mut seen = HashSet::new();
        if let Some(duplicate) = self.columns.iter().find(|c| !seen.insert(c.as_str())) {
            return fail(format!("column '{duplicate}' is selected twice"));
        }
        let selected: HashSet<&str> = self.columns.iter().map(String::as_str).collect();
        let must_be_selected = [
            ("numeric_columns", &self.numeric_columns),
            ("required_columns", &self.required_columns),
            ("aggregate_metrics", &self.aggregate_metrics),
            ("regression_predictors", &self.regression_predictors),
            ("correlation_columns", &self.correlation_columns),
        ];
        for (key, names) in must_be_selected {
            if let Some(name) = names.iter().find(|n| !selected.contains(n.as_str())) {
                return fail(format!("{key} names '{name}', which is not among the selected columns"));
            }
        }
        let numeric: HashSet<&str> = self.numeric_columns.iter().map(String::as_str).collect();
        let single = [
            ("year_column", &self.year_column),
            ("ranking_column", &self.ranking_column),
            ("regression_target", &self.regression_target),
            ("focus_metric", &self.focus_metric),
        ];
        for (key, name) in single {
            if !numeric.contains(name.as_str()) {
                return fail(format!("{key} '{name}' must be a numeric selected column"));
            }
        }
        let numeric_uses = self
            .aggregate_metrics
            .iter()
            .chain(&self.regression_predictors)
            .chain(&self.correlation_columns);
        for name in numeric_uses {
            if !numeric.contains(name.as_str()) {
                return fail(format!("'{name}' is used numerically but is not in numeric_columns"));
            }
        }
        if self.regression_predictors.is_empty() {
            return fail("regression_predictors must not be empty".to_string());
        }
        if self.regression_predictors.contains(&self.regression_target) {
            return fail(format!(
                "regression target '{}' is also listed as a predictor",
                self.regression_target
            ));
        }
        if selected.contains(self.top10_column.as_str()) {
            return fail(format!("top10_column '{}' collides with a selected column", self.top10_column));
        }
        if !self.top10_threshold.is_finite() {
            return fail("top10_threshold must be finite".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_configuration_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.columns.len(), 14);
        assert_eq!(config.regression_predictors.len(), 4);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "top10_threshold: 5\noutput_path: cleaned.csv").unwrap();
        let config = AnalysisConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.top10_threshold, 5.0);
        assert_eq!(config.output_path, PathBuf::from("cleaned.csv"));
        assert_eq!(config.year_column, "year");
    }

    #[test]
    fn target_among_predictors_is_rejected() {
        let mut config = AnalysisConfig::default();
        config.regression_predictors.push("ranking".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn unselected_required_column_is_rejected() {
        let config = AnalysisConfig {
            required_columns: vec!["popularity".to_string()],
            ..AnalysisConfig::default()
        };
        let message = config.validate().unwrap_err().to_string();
        assert!(message.contains("popularity"));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "columns: [unclosed").unwrap();
        let err = AnalysisConfig::load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, crate::AnalysisError::Config(ConfigError::Parse { .. })));
    }
}
