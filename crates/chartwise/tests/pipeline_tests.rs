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

mod common;

use chartwise::report::ChartKind;
use chartwise::{analyse_csv, render_report, AnalysisConfig, AnalysisError, DataPipeline, SchemaError};
use common::*;
use std::fs;
use tempfile::TempDir;

fn config_in(dir: &TempDir) -> AnalysisConfig {
    AnalysisConfig {
        output_path: dir.path().join("music_clean.csv"),
        ..AnalysisConfig::default()
    }
}

#[test]
fn cleans_exports_and_analyses_the_chart_file() {
    let dir = TempDir::new().unwrap();
    let input = write_file(dir.path(), "charts.csv", &chart_csv());
    let config = config_in(&dir);
    let output = DataPipeline::new(config.clone()).run(&input).unwrap();
    let report = &output.report;

    let steps: Vec<(&str, usize, usize)> = report
        .cleaning_steps
        .iter()
        .map(|s| (s.step.as_str(), s.rows_before, s.rows_after))
        .collect();
    assert_eq!(
        steps,
        [
            ("project", 10, 10),
            ("coerce", 10, 10),
            ("filter_complete", 10, 8),
            ("dedupe", 8, 7),
        ]
    );
    assert_eq!(report.rows_dropped(), 3);
    assert_eq!(report.source.row_count, 10);
    assert_eq!(report.source.column_count, 15);
    assert_eq!(report.cleaned.row_count, 7);
    assert_eq!(report.cleaned.column_count, 14);

    let years: Vec<f64> = report.yearly.iter().map(|y| y.year).collect();
    assert_eq!(years, [2020.0, 2021.0, 2022.0]);
    let first = &report.yearly[0];
    assert_eq!(first.count, 2);
    assert_close(first.means["danceability"].unwrap(), 0.7, 1e-12);
    assert_close(first.means["energy"].unwrap(), 0.6, 1e-12);
    assert_close(first.means["valence"].unwrap(), 0.5, 1e-12);
    assert_close(report.yearly[2].means["danceability"].unwrap(), 1.75 / 3.0, 1e-12);

    assert_eq!(report.top10_counts.get("Top 10"), Some(&4));
    assert_eq!(report.top10_counts.get("Other"), Some(&3));
    assert_eq!(output.cleaned.column_names().last().map(String::as_str), Some("top10"));

    assert!(report.focus_correlation.value.is_some());
    assert_eq!(report.focus_correlation.pairs, 7);
    assert_eq!(report.correlation_matrix.size(), config.correlation_columns.len());

    let model = report.regression.as_ref().expect("regression fitted");
    assert_eq!(model.n_obs, 7);
    assert_eq!(model.df_resid, 2);
    assert_eq!(model.terms.len(), 5);
    assert!(report.regression_error.is_none());

    let kinds: Vec<ChartKind> = output.charts.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        [ChartKind::Line, ChartKind::Scatter, ChartKind::Box, ChartKind::Heatmap]
    );
    assert_eq!(output.charts[0].series_count(), 3);
    assert_eq!(output.charts[2].series_count(), 2);
}

#[test]
fn exported_csv_has_the_cleaned_columns_only() {
    let dir = TempDir::new().unwrap();
    let input = write_file(dir.path(), "charts.csv", &chart_csv());
    let config = config_in(&dir);
    DataPipeline::new(config.clone()).run(&input).unwrap();

    let exported = fs::read_to_string(&config.output_path).unwrap();
    let lines: Vec<&str> = exported.lines().collect();
    assert_eq!(lines.len(), 8);
    assert_eq!(lines[0], config.columns.join(","));
    assert_eq!(lines[1], "1,2020,Song A,Artist A,0.8,0.5,0.6,120,-5.1,0.1,0.05,0,0.1,200000");
    assert!(exported.contains("\"Song, E\""));
    assert!(!exported.contains("top10"));
    assert!(!exported.contains("N/A"));
}

#[test]
fn missing_required_column_aborts_before_export() {
    let dir = TempDir::new().unwrap();
    let content = chart_csv().replace("valence", "mood");
    let input = write_file(dir.path(), "charts.csv", &content);
    let config = config_in(&dir);
    let err = DataPipeline::new(config.clone()).run(&input).unwrap_err();
    match &err {
        AnalysisError::Schema(SchemaError::MissingColumns { columns }) => assert_eq!(columns, &["valence"]),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_fatal());
    assert!(!config.output_path.exists());
}

#[test]
fn too_few_rows_skip_the_regression_but_finish() {
    let dir = TempDir::new().unwrap();
    let content: String = chart_csv().lines().take(4).map(|line| format!("{line}\n")).collect();
    let input = write_file(dir.path(), "charts.csv", &content);
    let output = DataPipeline::new(config_in(&dir)).run(&input).unwrap();
    assert_eq!(output.report.cleaned.row_count, 2);
    assert!(output.report.regression.is_none());
    let reason = output.report.regression_error.as_deref().unwrap();
    assert!(reason.contains("Insufficient data"), "{reason}");
    assert!(render_report(&output.report).contains("not fitted"));
}

#[test]
fn report_renders_and_serialises() {
    let dir = TempDir::new().unwrap();
    let input = write_file(dir.path(), "charts.csv", &chart_csv());
    let output = analyse_csv(&input, config_in(&dir)).unwrap();

    let text = render_report(&output.report);
    assert!(text.contains("== Yearly means =="));
    assert!(text.contains("Linear model: ranking ~ danceability + energy + valence + tempo"));
    assert!(text.contains("mean_danceability"));

    let json_path = dir.path().join("report.json");
    output.report.write_json(&json_path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["cleaning_steps"].as_array().map(Vec::len), Some(4));
    assert_eq!(json["yearly"][0]["year"], 2020.0);
    assert_eq!(json["regression"]["terms"][0]["term"], "(Intercept)");

    let charts_path = dir.path().join("charts.json");
    chartwise::report::write_json(&output.charts, &charts_path).unwrap();
    let charts: serde_json::Value = serde_json::from_str(&fs::read_to_string(&charts_path).unwrap()).unwrap();
    assert_eq!(charts[3]["data"]["type"], "heatmap");
}

#[test]
fn invalid_configuration_is_rejected_up_front() {
    let dir = TempDir::new().unwrap();
    let input = write_file(dir.path(), "charts.csv", &chart_csv());
    let config = AnalysisConfig {
        regression_predictors: Vec::new(),
        ..config_in(&dir)
    };
    let err = analyse_csv(&input, config).unwrap_err();
    assert!(matches!(err, AnalysisError::Config(_)));
}

#[test]
fn semicolon_input_through_configured_reader() {
    let dir = TempDir::new().unwrap();
    let content = chart_csv()
        .lines()
        .map(|line| {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .from_reader(line.as_bytes());
            let record = reader.records().next().unwrap().unwrap();
            format!("{}\n", record.iter().collect::<Vec<_>>().join(";"))
        })
        .collect::<String>();
    let input = write_file(dir.path(), "charts.csv", &content);
    let pipeline = DataPipeline::new(config_in(&dir)).with_reader(chartwise::CsvReader::new().with_delimiter(b';'));
    let output = pipeline.run(&input).unwrap();
    assert_eq!(output.report.cleaned.row_count, 7);
}
