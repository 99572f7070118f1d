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

#![allow(dead_code)]

use chartwise::{Column, DataFrame};
use std::fs;
use std::path::{Path, PathBuf};

pub const CHART_HEADER: &str = "ranking,year,song,genre,band_singer,danceability,energy,valence,tempo,loudness,acousticness,speechiness,instrumentalness,liveness,duration_ms";

/// Ten rows: one exact duplicate, one unparseable danceability and one
/// missing ranking. Seven rows survive cleaning.
pub fn chart_csv() -> String {
    let rows = [
        "1,2020,Song A,pop,Artist A,0.8,0.5,0.6,120,-5.1,0.1,0.05,0,0.1,200000",
        "2,2020,Song B,rock,Artist B,0.6,0.7,0.4,100,-6,0.2,0.04,0,0.2,210000",
        "2,2020,Song B,rock,Artist B,0.6,0.7,0.4,100,-6,0.2,0.04,0,0.2,210000",
        "15,2021,Song C,pop,Artist C,N/A,0.6,0.5,90,-7,0.3,0.03,0,0.15,190000",
        "12,2021,Song D,soul,Artist D,0.7,0.8,0.7,130,-4,0.05,0.06,0.01,0.12,220000",
        "3,2021,\"Song, E\",pop,Artist E,0.9,0.4,0.3,110,-5,0.15,0.07,0,0.11,180000",
        ",2021,Song F,jazz,Artist F,0.5,0.5,0.5,95,-8,0.4,0.02,0,0.3,230000",
        "25,2022,Song G,pop,Artist G,0.55,0.65,0.45,105,-6.5,0.25,0.05,0.02,0.14,205000",
        "7,2022,Song H,rock,Artist H,0.75,0.55,0.65,125,-5.5,0.12,0.04,0,0.09,195000",
        "40,2022,Song I,pop,Artist I,0.45,0.9,0.2,140,-3,0.02,0.08,0.1,0.25,240000",
    ];
    let mut content = String::from(CHART_HEADER);
    content.push('\n');
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    content
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write test input");
    path
}

pub fn numbers(values: &[Option<f64>]) -> Column {
    Column::from_f64(values.to_vec())
}

pub fn texts(values: &[Option<&str>]) -> Column {
    Column::from_text(values)
}

pub fn frame(columns: Vec<(&str, Column)>) -> DataFrame {
    DataFrame::from_columns("test", columns).expect("columns of equal length")
}

pub fn float_values(frame: &DataFrame, column: &str) -> Vec<Option<f64>> {
    frame
        .get_column(column)
        .and_then(Column::as_f64_slice)
        .expect("numeric column")
        .to_vec()
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual} (tolerance {tolerance})"
    );
}
