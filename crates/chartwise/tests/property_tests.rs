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

use chartwise::data_handler::{aggregate_by_year, coerce, dedupe, filter_complete, project};
use chartwise::stats::{correlation, correlation_matrix};
use chartwise::{ColumnData, DataFrame};
use common::*;
use proptest::prelude::*;
use std::collections::HashSet;

const NAMES: [&str; 5] = ["ranking", "year", "song", "energy", "valence"];

fn cell() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        (0u8..5).prop_map(|v| Some(v.to_string())),
        Just(Some("N/A".to_string())),
        (-100.0f64..100.0).prop_map(|v| Some(format!("{v:.2}"))),
    ]
}

fn raw_frame() -> impl Strategy<Value = DataFrame> {
    (0usize..30).prop_flat_map(|rows| {
        prop::collection::vec(prop::collection::vec(cell(), rows), NAMES.len()).prop_map(|columns| {
            let columns = NAMES
                .iter()
                .zip(columns)
                .map(|(name, values)| (*name, chartwise::Column::from_text(&values)))
                .collect();
            frame(columns)
        })
    })
}

fn row_keys(df: &DataFrame) -> Vec<Vec<Option<String>>> {
    (0..df.row_count())
        .map(|i| df.row_key(i, df.column_names()))
        .collect()
}

proptest! {
    /// Projection returns exactly the requested names in the requested order.
    #[test]
    fn project_returns_requested_columns(
        df in raw_frame(),
        order in Just(NAMES.to_vec()).prop_shuffle(),
        keep in 1usize..=NAMES.len(),
    ) {
        let wanted = &order[..keep];
        let projected = project(&df, wanted).unwrap();
        prop_assert_eq!(projected.column_names(), wanted);
        prop_assert_eq!(projected.row_count(), df.row_count());
    }

    #[test]
    fn coerce_is_idempotent(df in raw_frame()) {
        let numeric = ["ranking", "energy", "valence"];
        let once = coerce(&df, &numeric).unwrap();
        let twice = coerce(&once, &numeric).unwrap();
        for name in once.column_names() {
            prop_assert_eq!(once.get_column(name), twice.get_column(name));
        }
    }

    #[test]
    fn filter_complete_only_removes_incomplete_rows(df in raw_frame()) {
        let required = ["ranking", "energy"];
        let coerced = coerce(&df, &required).unwrap();
        let complete = filter_complete(&coerced, &required).unwrap();
        prop_assert!(complete.row_count() <= coerced.row_count());
        for name in required {
            prop_assert_eq!(complete.get_column(name).unwrap().null_count(), 0);
        }
        let expected = (0..coerced.row_count())
            .filter(|&i| required.iter().all(|c| !coerced.get_column(c).unwrap().is_missing(i)))
            .count();
        prop_assert_eq!(complete.row_count(), expected);
    }

    #[test]
    fn dedupe_leaves_distinct_rows_and_is_idempotent(df in raw_frame()) {
        let once = dedupe(&df).unwrap();
        let keys = row_keys(&once);
        let distinct: HashSet<_> = keys.iter().collect();
        prop_assert_eq!(distinct.len(), keys.len());
        let original: HashSet<_> = row_keys(&df).into_iter().collect();
        prop_assert_eq!(original.len(), once.row_count());
        let twice = dedupe(&once).unwrap();
        prop_assert_eq!(row_keys(&twice), keys);
    }

    /// One output row per distinct year; counts add up to the input rows.
    #[test]
    fn yearly_groups_partition_the_rows(
        rows in prop::collection::vec((1990u16..2000, prop::option::of(0.0f64..1.0)), 1..60),
    ) {
        let years: Vec<Option<f64>> = rows.iter().map(|(y, _)| Some(f64::from(*y))).collect();
        let energy: Vec<Option<f64>> = rows.iter().map(|(_, e)| *e).collect();
        let df = frame(vec![("year", numbers(&years)), ("energy", numbers(&energy))]);
        let yearly = aggregate_by_year(&df, "year", &["energy"]).unwrap();
        let distinct: HashSet<u16> = rows.iter().map(|(y, _)| *y).collect();
        prop_assert_eq!(yearly.row_count(), distinct.len());
        let total: f64 = float_values(&yearly, "count").iter().flatten().sum();
        prop_assert_eq!(total as usize, rows.len());
        let ordered = float_values(&yearly, "year");
        prop_assert!(ordered.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn self_correlation_is_one(values in prop::collection::vec(-1000.0f64..1000.0, 2..50)) {
        let first = values[0];
        prop_assume!(values.iter().any(|v| *v != first));
        let x: Vec<Option<f64>> = values.iter().map(|&v| Some(v)).collect();
        prop_assert_eq!(correlation(&x, &x), Some(1.0));
    }

    #[test]
    fn correlation_matrix_is_symmetric(
        rows in prop::collection::vec(
            (prop::option::of(-10.0f64..10.0), prop::option::of(-10.0f64..10.0), prop::option::of(-10.0f64..10.0)),
            0..40,
        ),
    ) {
        let a: Vec<Option<f64>> = rows.iter().map(|r| r.0).collect();
        let b: Vec<Option<f64>> = rows.iter().map(|r| r.1).collect();
        let c: Vec<Option<f64>> = rows.iter().map(|r| r.2).collect();
        let df = frame(vec![("a", numbers(&a)), ("b", numbers(&b)), ("c", numbers(&c))]);
        let matrix = correlation_matrix(&df, &["a", "b", "c"]).unwrap();
        for i in 0..3 {
            prop_assert!(matrix.get(i, i).map_or(true, |r| r == 1.0));
            for j in 0..3 {
                prop_assert_eq!(matrix.get(i, j), matrix.get(j, i));
                if let Some(r) = matrix.get(i, j) {
                    prop_assert!((-1.0..=1.0).contains(&r));
                }
            }
        }
    }
}
