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

use crate::data_handler::common::DataType;
use crate::error::{Result, SchemaError};
use rayon::prelude::*;
use std::sync::Arc;

pub const MAX_STRING_LENGTH: usize = 1024 * 1024;

pub trait ColumnData: Send + Sync + std::fmt::Debug {
    fn len(&self) -> usize;
    fn data_type(&self) -> DataType;
    fn null_count(&self) -> usize;
    fn get_string(&self, index: usize) -> Option<String>;
    fn to_f64(&self, index: usize) -> Option<f64>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn is_missing(&self, index: usize) -> bool {
        self.get_string(index).is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Float64(Arc<[Option<f64>]>),
    Text(Arc<[Option<Arc<str>>]>),
}

impl ColumnData for Column {
    fn len(&self) -> usize {
        match self {
            Column::Float64(data) => data.len(),
            Column::Text(data) => data.len(),
        }
    }
    fn data_type(&self) -> DataType {
        match self {
            Column::Float64(_) => DataType::Float64,
            Column::Text(_) => DataType::Text,
        }
    }
    fn null_count(&self) -> usize {
        match self {
            Column::Float64(data) => data.par_iter().filter(|v| v.is_none()).count(),
            Column::Text(data) => data.par_iter().filter(|v| v.is_none()).count(),
        }
    }
    fn get_string(&self, index: usize) -> Option<String> {
        match self {
            Column::Float64(data) => data.get(index)?.as_ref().map(|v| v.to_string()),
            Column::Text(data) => data.get(index)?.as_ref().map(|s| s.to_string()),
        }
    }
    fn to_f64(&self, index: usize) -> Option<f64> {
        match self {
            Column::Float64(data) => data.get(index).copied()?,
            Column::Text(data) => data
                .get(index)
                .and_then(|opt| opt.as_deref().and_then(parse_numeric)),
        }
    }
    fn is_missing(&self, index: usize) -> bool {
        match self {
            Column::Float64(data) => data.get(index).map_or(true, Option::is_none),
            Column::Text(data) => data.get(index).map_or(true, Option::is_none),
        }
    }
}

/// Lenient numeric parse: surrounding whitespace is ignored and anything
/// that is not a number, including `NaN`, yields `None`.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

impl Column {
    pub fn from_f64(values: Vec<Option<f64>>) -> Self {
        Column::Float64(
            values
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect::<Vec<_>>()
                .into(),
        )
    }

    pub fn from_text<S: AsRef<str>>(values: &[Option<S>]) -> Self {
        let strings: Vec<Option<Arc<str>>> = values
            .iter()
            .map(|opt| {
                opt.as_ref().map(|s| {
                    let s: &str = s.as_ref();
                    if s.len() > MAX_STRING_LENGTH {
                        Arc::from(truncate_on_char_boundary(s, MAX_STRING_LENGTH))
                    } else {
                        Arc::from(s)
                    }
                })
            })
            .collect();
        Column::Text(strings.into())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_f64_slice(&self) -> Option<&[Option<f64>]> {
        match self {
            Column::Float64(data) => Some(data.as_ref()),
            Column::Text(_) => None,
        }
    }

    /// Values of a numeric column, or a type mismatch naming `column`.
    pub fn numeric_values(&self, column: &str) -> Result<&[Option<f64>]> {
        self.as_f64_slice().ok_or_else(|| {
            SchemaError::TypeMismatch {
                column: column.to_string(),
                expected: DataType::Float64.to_string(),
                found: self.data_type().to_string(),
            }
            .into()
        })
    }

    /// Converts to `Float64`; unparseable text becomes missing.
    pub fn coerce_numeric(&self) -> Column {
        match self {
            Column::Float64(_) => self.clone(),
            Column::Text(data) => Column::Float64(
                data.par_iter()
                    .map(|opt| opt.as_deref().and_then(parse_numeric))
                    .collect::<Vec<_>>()
                    .into(),
            ),
        }
    }

    pub fn select_rows(&self, indices: &[usize]) -> Result<Column> {
        let len = self.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(SchemaError::RowOutOfBounds { index, len }.into());
        }
        Ok(match self {
            Column::Float64(data) => {
                Column::Float64(indices.iter().map(|&i| data[i]).collect::<Vec<_>>().into())
            }
            Column::Text(data) => Column::Text(
                indices
                    .iter()
                    .map(|&i| data[i].clone())
                    .collect::<Vec<_>>()
                    .into(),
            ),
        })
    }
}

fn truncate_on_char_boundary(s: &str, max: usize) -> &str {
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Accumulates raw cells while a file is read; builds a text column.
#[derive(Debug)]
pub struct ColumnBuilder {
    values: Vec<Option<String>>,
}

impl ColumnBuilder {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }
    pub fn push(&mut self, value: Option<String>) {
        self.values.push(value.filter(|s| !s.trim().is_empty()));
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn build(self) -> Column {
        Column::from_text(&self.values)
    }
}

impl Default for ColumnBuilder {
    fn default() -> Self {
        Self::new()
    }
}
