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

use crate::data_handler::column::{ColumnBuilder, ColumnData};
use crate::data_handler::common::DatasetMetadata;
use crate::data_handler::dataframe::DataFrame;
use crate::error::{ExportError, LoadError, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

const MAX_FIELD_SIZE: usize = 1024 * 1024;
const WRITE_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct CsvReader {
    has_headers: bool,
    delimiter: u8,
    quote_char: u8,
    max_field_size: usize,
}

impl CsvReader {
    pub fn new() -> Self {
        Self {
            has_headers: true,
            delimiter: b',',
            quote_char: b'"',
            max_field_size: MAX_FIELD_SIZE,
        }
    }
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
    pub fn with_max_field_size(mut self, max_field_size: usize) -> Self {
        self.max_field_size = max_field_size;
        self
    }

    pub fn read_file(&self, path: &Path, dataset_name: String) -> Result<DataFrame> {
        let file = File::open(path).map_err(|source| LoadError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        let mut dataframe = self.read_from(BufReader::new(file), path, dataset_name)?;
        dataframe.metadata.source_path = Some(path.to_path_buf());
        info!(
            path = %path.display(),
            rows = dataframe.row_count(),
            columns = dataframe.column_count(),
            "Loaded dataset"
        );
        Ok(dataframe)
    }

    /// Reads every field as text. `origin` is only used in error messages.
    pub fn read_from<R: Read>(&self, source: R, origin: &Path, dataset_name: String) -> Result<DataFrame> {
        let parse_error = |source: csv::Error| LoadError::Parse {
            path: origin.to_path_buf(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .quote(self.quote_char)
            .trim(csv::Trim::All)
            .from_reader(source);
        let mut records = reader.records();
        let headers: Vec<String> = match records.next() {
            Some(first) => {
                let first = first.map_err(parse_error)?;
                if self.has_headers {
                    first.iter().map(str::to_string).collect()
                } else {
                    let names = (0..first.len()).map(|i| format!("column_{i}")).collect();
                    return self.build_frame(names, std::iter::once(Ok(first)).chain(records), origin, dataset_name);
                }
            }
            None => Vec::new(),
        };
        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Err(LoadError::EmptyFile {
                path: origin.to_path_buf(),
            }
            .into());
        }
        self.build_frame(headers, records, origin, dataset_name)
    }

    fn build_frame<I>(
        &self,
        headers: Vec<String>,
        records: I,
        origin: &Path,
        dataset_name: String,
    ) -> Result<DataFrame>
    where
        I: Iterator<Item = std::result::Result<csv::StringRecord, csv::Error>>,
    {
        let mut seen = HashSet::new();
        if let Some(duplicate) = headers.iter().find(|h| !seen.insert(h.as_str())) {
            return Err(LoadError::DuplicateHeader {
                path: origin.to_path_buf(),
                column: duplicate.clone(),
            }
            .into());
        }
        let mut builders: Vec<ColumnBuilder> = headers.iter().map(|_| ColumnBuilder::new()).collect();
        let mut padded_rows = 0usize;
        for record in records {
            let record = record.map_err(|source| LoadError::Parse {
                path: origin.to_path_buf(),
                source,
            })?;
            let line = record.position().map_or(0, csv::Position::line);
            if record.len() > headers.len() {
                return Err(LoadError::TooManyFields {
                    path: origin.to_path_buf(),
                    line,
                    expected: headers.len(),
                    found: record.len(),
                }
                .into());
            }
            if record.len() < headers.len() {
                padded_rows += 1;
            }
            for (i, builder) in builders.iter_mut().enumerate() {
                let value = record.get(i);
                if value.is_some_and(|v| v.len() > self.max_field_size) {
                    return Err(LoadError::FieldTooLarge {
                        line,
                        limit: self.max_field_size,
                    }
                    .into());
                }
                builder.push(value.map(str::to_string));
            }
        }
        if padded_rows > 0 {
            debug!(padded_rows, "Rows shorter than the header were padded with missing values");
        }
        let mut dataframe = DataFrame::new(DatasetMetadata::named(dataset_name));
        for (header, builder) in headers.into_iter().zip(builders) {
            dataframe.add_column(header, builder.build())?;
        }
        Ok(dataframe)
    }
}

impl Default for CsvReader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct CsvWriter {
    delimiter: u8,
    quote_all: bool,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            quote_all: false,
        }
    }
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }
    pub fn with_quote_all(mut self, quote_all: bool) -> Self {
        self.quote_all = quote_all;
        self
    }

    /// Overwrites `path`. Missing cells are written as empty fields.
    pub fn write_file(&self, dataframe: &DataFrame, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| ExportError::Create {
            path: path.to_path_buf(),
            source,
        })?;
        self.write_to(dataframe, BufWriter::with_capacity(WRITE_BUFFER_SIZE, file), path)?;
        info!(path = %path.display(), rows = dataframe.row_count(), "Exported dataset");
        Ok(())
    }

    pub fn write_to<W: Write>(&self, dataframe: &DataFrame, sink: W, origin: &Path) -> Result<()> {
        let csv_error = |source: csv::Error| ExportError::Csv {
            path: origin.to_path_buf(),
            source,
        };
        let quote_style = if self.quote_all {
            csv::QuoteStyle::Always
        } else {
            csv::QuoteStyle::Necessary
        };
        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(quote_style)
            .from_writer(sink);
        writer.write_record(dataframe.column_names()).map_err(csv_error)?;
        let columns: Vec<_> = dataframe
            .column_names()
            .iter()
            .filter_map(|name| dataframe.get_column(name))
            .collect();
        for i in 0..dataframe.row_count() {
            let row = columns
                .iter()
                .map(|column| column.get_string(i).unwrap_or_default());
            writer.write_record(row).map_err(csv_error)?;
        }
        writer.flush().map_err(|source| ExportError::Create {
            path: origin.to_path_buf(),
            source,
        })?;
        Ok(())
    }
}

impl Default for CsvWriter {
    fn default() -> Self {
        Self::new()
    }
}
