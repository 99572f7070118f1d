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
use crate::data_handler::common::{ColumnMetadata, DatasetMetadata};
use crate::error::{Result, SchemaError};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Immutable-by-convention table: every transformation returns a new frame
/// that shares untouched columns with its source.
#[derive(Debug, Clone)]
pub struct DataFrame {
    columns: HashMap<String, Arc<Column>>,
    pub metadata: DatasetMetadata,
    column_order: Vec<String>,
}

impl DataFrame {
    pub fn new(metadata: DatasetMetadata) -> Self {
        Self {
            columns: HashMap::new(),
            metadata,
            column_order: Vec::new(),
        }
    }

    /// Builds a frame from `(name, column)` pairs in order.
    pub fn from_columns<I, S>(name: &str, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Column)>,
        S: Into<String>,
    {
        let mut frame = Self::new(DatasetMetadata::named(name));
        for (column_name, column) in columns {
            frame.add_column(column_name.into(), column)?;
        }
        Ok(frame)
    }

    /// Adds or replaces a column. Replacing keeps the original position.
    pub fn add_column(&mut self, name: String, column: Column) -> Result<()> {
        self.add_shared_column(name, Arc::new(column))
    }

    fn add_shared_column(&mut self, name: String, column: Arc<Column>) -> Result<()> {
        if !self.columns.is_empty() && column.len() != self.row_count() {
            return Err(SchemaError::LengthMismatch {
                column: name,
                expected: self.row_count(),
                found: column.len(),
            }
            .into());
        }
        if !self.columns.contains_key(&name) {
            self.column_order.push(name.clone());
        }
        self.metadata.row_count = column.len();
        self.columns.insert(name, column);
        self.metadata.column_count = self.columns.len();
        Ok(())
    }

    pub fn row_count(&self) -> usize {
        self.metadata.row_count
    }

    pub fn column_count(&self) -> usize {
        self.metadata.column_count
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_order
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name).map(|arc| arc.as_ref())
    }

    /// Like [`get_column`](Self::get_column) but absent columns are a schema error.
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.get_column(name).ok_or_else(|| {
            SchemaError::MissingColumns {
                columns: vec![name.to_string()],
            }
            .into()
        })
    }

    /// Fails with every absent name listed, not just the first.
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<()> {
        let missing: Vec<String> = names
            .iter()
            .map(|name| name.as_ref())
            .filter(|name| !self.columns.contains_key(*name))
            .map(str::to_string)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::MissingColumns { columns: missing }.into())
        }
    }

    pub fn column_metadata(&self) -> Vec<ColumnMetadata> {
        self.column_order
            .par_iter()
            .map(|name| {
                let column = &self.columns[name];
                ColumnMetadata {
                    name: name.clone(),
                    data_type: column.data_type(),
                    null_count: column.null_count(),
                }
            })
            .collect()
    }

    /// New frame holding only `column_names`, in that order.
    pub fn select<S: AsRef<str>>(&self, column_names: &[S]) -> Result<DataFrame> {
        self.require_columns(column_names)?;
        let mut new_df = DataFrame::new(self.metadata.derive("projected"));
        for name in column_names {
            let name = name.as_ref();
            new_df.add_shared_column(name.to_string(), Arc::clone(&self.columns[name]))?;
        }
        new_df.metadata.row_count = self.row_count();
        Ok(new_df)
    }

    /// New frame with the named columns replaced by `transform` of themselves.
    pub fn map_columns<S, F>(&self, names: &[S], operation: &str, transform: F) -> Result<DataFrame>
    where
        S: AsRef<str>,
        F: Fn(&Column) -> Column,
    {
        self.require_columns(names)?;
        let mut new_df = self.with_metadata(self.metadata.derive(operation));
        for name in names {
            let name = name.as_ref();
            let replaced = transform(&self.columns[name]);
            new_df.add_column(name.to_string(), replaced)?;
        }
        Ok(new_df)
    }

    pub fn with_column(&self, name: &str, column: Column) -> Result<DataFrame> {
        let mut new_df = self.with_metadata(self.metadata.derive(&format!("with_{name}")));
        new_df.add_column(name.to_string(), column)?;
        Ok(new_df)
    }

    fn with_metadata(&self, metadata: DatasetMetadata) -> DataFrame {
        let mut copy = self.clone();
        copy.metadata = DatasetMetadata {
            row_count: self.row_count(),
            column_count: self.column_count(),
            ..metadata
        };
        copy
    }

    pub fn filter<P>(&self, operation: &str, predicate: P) -> Result<DataFrame>
    where
        P: Fn(usize) -> bool + Send + Sync,
    {
        let indices: Vec<usize> = (0..self.row_count())
            .into_par_iter()
            .filter(|&i| predicate(i))
            .collect();
        self.select_rows(&indices, operation)
    }

    pub fn select_rows(&self, indices: &[usize], operation: &str) -> Result<DataFrame> {
        let mut new_df = DataFrame::new(self.metadata.derive(operation));
        for name in &self.column_order {
            let column = &self.columns[name];
            let new_column = column.select_rows(indices)?;
            new_df.add_column(name.clone(), new_column)?;
        }
        new_df.metadata.row_count = indices.len();
        Ok(new_df)
    }

    /// Cell values of row `index` in column order, as comparable keys.
    pub fn row_key(&self, index: usize, subset: &[String]) -> Vec<Option<String>> {
        subset
            .iter()
            .map(|col| {
                self.get_column(col).and_then(|column| match column {
                    // -0.0 and 0.0 are the same value
                    Column::Float64(data) => data
                        .get(index)
                        .copied()
                        .flatten()
                        .map(|v| (if v == 0.0 { 0.0f64 } else { v }).to_string()),
                    Column::Text(_) => column.get_string(index),
                })
            })
            .collect()
    }

    /// Keeps the first occurrence of each distinct row; missing equals missing.
    pub fn drop_duplicates(&self, subset: Option<&[String]>) -> Result<DataFrame> {
        let columns_to_check = subset.unwrap_or(&self.column_order);
        self.require_columns(columns_to_check)?;
        let mut seen = HashSet::new();
        let mut unique_indices = Vec::new();
        for i in 0..self.row_count() {
            if seen.insert(self.row_key(i, columns_to_check)) {
                unique_indices.push(i);
            }
        }
        self.select_rows(&unique_indices, "deduplicated")
    }

    /// Plain-text preview of the first `limit` rows.
    pub fn format_sample(&self, limit: usize) -> String {
        let sample_size = std::cmp::min(limit, self.row_count());
        let header = self.column_order.join(" | ");
        let mut out = String::new();
        out.push_str(&header);
        out.push('\n');
        out.push_str(&"-".repeat(header.len()));
        out.push('\n');
        for i in 0..sample_size {
            let row: Vec<String> = self
                .column_order
                .iter()
                .map(|name| {
                    self.columns[name]
                        .get_string(i)
                        .unwrap_or_else(|| "NA".to_string())
                })
                .collect();
            out.push_str(&row.join(" | "));
            out.push('\n');
        }
        if self.row_count() > sample_size {
            out.push_str(&format!("... ({} more rows)\n", self.row_count() - sample_size));
        }
        out
    }
}
