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

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "chart-eda",
    version,
    about = "Clean a music chart CSV and report yearly trends, correlations and a ranking regression"
)]
pub struct Args {
    #[arg(help = "Delimited input file with a header row")]
    pub input: PathBuf,
    #[arg(long = "config", help = "YAML analysis configuration (built-in defaults when omitted)")]
    pub config: Option<PathBuf>,
    #[arg(long = "output", help = "Cleaned CSV path [default: music_clean.csv]")]
    pub output: Option<PathBuf>,
    #[arg(long = "report-json", help = "Write the full analysis report as JSON")]
    pub report_json: Option<PathBuf>,
    #[arg(long = "charts-json", help = "Write chart specifications as JSON")]
    pub charts_json: Option<PathBuf>,
    #[arg(long = "delimiter", default_value_t = ',', help = "Input field delimiter")]
    pub delimiter: char,
    #[arg(long = "sample", default_value_t = 5, help = "Rows of the cleaned data to print")]
    pub sample: usize,
    #[arg(long = "json-logs", action, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
    #[arg(long = "debug", action, help = "Enable debug logging")]
    pub debug: bool,
}

impl Args {
    pub fn delimiter_byte(&self) -> anyhow::Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| anyhow::anyhow!("Delimiter '{}' must be a single ASCII character", self.delimiter))
    }
}
