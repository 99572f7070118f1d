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

use chartwise::data_handler::cleaning::{OTHER_LABEL, TOP10_LABEL};
use chartwise::data_handler::{
    aggregate_by_year, coerce, dedupe, derive_top10, filter_complete, project, CleaningStep,
};
use chartwise::{AnalysisError, ColumnData, DataType, SchemaError};
use common::*;

fn raw_scores() -> chartwise::DataFrame {
    frame(vec![
        ("ranking", texts(&[Some("1"), Some("2"), Some(" 3 ")])),
        ("year", texts(&[Some("2020"), Some("2020"), Some("2021")])),
        ("danceability", texts(&[Some("0.8"), Some("N/A"), Some("0.4")])),
        ("energy", texts(&[Some("0.5"), Some("0.7"), None])),
        ("song", texts(&[Some("A"), Some("B"), Some("C")])),
    ])
}

#[test]
fn project_keeps_requested_order() {
    let df = project(&raw_scores(), &["song", "ranking"]).unwrap();
    assert_eq!(df.column_names(), ["song", "ranking"]);
    assert_eq!(df.row_count(), 3);
    assert!(df.metadata.name.ends_with("_projected"));
}

#[test]
fn project_lists_every_absent_column() {
    let err = project(&raw_scores(), &["song", "tempo", "liveness"]).unwrap_err();
    match err {
        AnalysisError::Schema(SchemaError::MissingColumns { columns }) => {
            assert_eq!(columns, ["tempo", "liveness"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn coerce_demotes_unparseable_values_to_missing() {
    let df = coerce(&raw_scores(), &["ranking", "danceability"]).unwrap();
    assert_eq!(float_values(&df, "ranking"), [Some(1.0), Some(2.0), Some(3.0)]);
    assert_eq!(float_values(&df, "danceability"), [Some(0.8), None, Some(0.4)]);
    assert_eq!(df.get_column("song").unwrap().data_type(), DataType::Text);
}

#[test]
fn coerce_is_idempotent() {
    let once = coerce(&raw_scores(), &["ranking", "danceability"]).unwrap();
    let twice = coerce(&once, &["ranking", "danceability"]).unwrap();
    for name in once.column_names() {
        assert_eq!(once.get_column(name), twice.get_column(name));
    }
}

#[test]
fn coerce_of_absent_column_fails() {
    let err = coerce(&raw_scores(), &["tempo"]).unwrap_err();
    assert!(matches!(err, AnalysisError::Schema(SchemaError::MissingColumns { .. })));
}

#[test]
fn unparseable_value_dropped_only_when_required() {
    let coerced = coerce(&raw_scores(), &["ranking", "danceability"]).unwrap();
    let strict = filter_complete(&coerced, &["ranking", "danceability"]).unwrap();
    assert_eq!(strict.row_count(), 1);
    assert_eq!(strict.get_column("song").unwrap().get_string(0).as_deref(), Some("A"));

    let lenient = filter_complete(&coerced, &["ranking"]).unwrap();
    assert_eq!(lenient.row_count(), 3);
    assert!(lenient.get_column("danceability").unwrap().is_missing(1));
}

#[test]
fn filter_complete_applies_to_text_columns_too() {
    let df = filter_complete(&raw_scores(), &["energy"]).unwrap();
    assert_eq!(df.row_count(), 2);
}

#[test]
fn dedupe_keeps_first_occurrence() {
    let df = frame(vec![
        ("song", texts(&[Some("A"), Some("B"), Some("A"), None, None])),
        ("ranking", numbers(&[Some(1.0), Some(2.0), Some(1.0), None, None])),
        ("label", texts(&[Some("first"), Some("x"), Some("first"), None, None])),
    ]);
    let unique = dedupe(&df).unwrap();
    assert_eq!(unique.row_count(), 3);
    assert_eq!(float_values(&unique, "ranking"), [Some(1.0), Some(2.0), None]);
    let again = dedupe(&unique).unwrap();
    assert_eq!(again.row_count(), 3);
}

#[test]
fn dedupe_distinguishes_rows_differing_in_one_field() {
    let df = frame(vec![
        ("song", texts(&[Some("A"), Some("A")])),
        ("ranking", numbers(&[Some(1.0), Some(2.0)])),
    ]);
    assert_eq!(dedupe(&df).unwrap().row_count(), 2);
}

#[test]
fn dedupe_treats_signed_zeros_as_equal() {
    let raw = frame(vec![
        ("year", texts(&[Some("2020"), Some("2020")])),
        ("energy", texts(&[Some("0"), Some("-0")])),
    ]);
    let coerced = coerce(&raw, &["year", "energy"]).unwrap();
    let unique = dedupe(&coerced).unwrap();
    assert_eq!(unique.row_count(), 1);
    let yearly = aggregate_by_year(&coerced, "year", &["energy"]).unwrap();
    assert_eq!(yearly.row_count(), unique.row_count());
}

#[test]
fn top10_label_follows_threshold() {
    let df = frame(vec![("ranking", numbers(&[Some(1.0), Some(10.0), Some(10.5), None]))]);
    let labelled = derive_top10(&df, "ranking", "top10", 10.0).unwrap();
    let labels = labelled.get_column("top10").unwrap();
    assert_eq!(labels.get_string(0).as_deref(), Some(TOP10_LABEL));
    assert_eq!(labels.get_string(1).as_deref(), Some(TOP10_LABEL));
    assert_eq!(labels.get_string(2).as_deref(), Some(OTHER_LABEL));
    assert!(labels.is_missing(3));
    assert_eq!(labelled.column_names(), ["ranking", "top10"]);
    assert!(df.get_column("top10").is_none());
}

#[test]
fn cleaning_step_counts_dropped_rows() {
    let before = raw_scores();
    let after = filter_complete(&before, &["energy"]).unwrap();
    let step = CleaningStep::new("filter_complete", &before, &after);
    assert_eq!(step.rows_before, 3);
    assert_eq!(step.rows_after, 2);
    assert_eq!(step.rows_dropped(), 1);
}
