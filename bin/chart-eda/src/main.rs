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

pub mod args;

use anyhow::{Context, Result};
use args::Args;
use chartwise::report::{render_report, write_json};
use chartwise::{AnalysisConfig, AnalysisError, CsvReader, DataPipeline, ErrorReporter};
use clap::Parser;
use std::io::IsTerminal;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_logging(args: &Args) {
    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if args.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = AnalysisConfig::load_or_default(args.config.as_deref())?;
    if let Some(output) = &args.output {
        config.output_path = output.clone();
    }
    config.validate()?;
    info!(input = %args.input.display(), output = %config.output_path.display(), "Starting analysis");

    let reader = CsvReader::new().with_delimiter(args.delimiter_byte()?);
    let pipeline = DataPipeline::new(config).with_reader(reader);
    let output = pipeline.run(&args.input)?;

    println!("Cleaned data ({})", output.cleaned.metadata.name);
    println!("{}", "=".repeat(50));
    print!("{}", output.cleaned.format_sample(args.sample));
    println!();
    print!("{}", render_report(&output.report));

    if let Some(path) = &args.report_json {
        output
            .report
            .write_json(path)
            .with_context(|| format!("writing report to {}", path.display()))?;
    }
    if let Some(path) = &args.charts_json {
        write_json(&output.charts, path).with_context(|| format!("writing charts to {}", path.display()))?;
    }
    info!(
        output = %pipeline.config().output_path.display(),
        charts = output.charts.len(),
        "Done"
    );
    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(&args);
    if let Err(error) = run(&args) {
        let rendered = match error.downcast_ref::<AnalysisError>() {
            Some(analysis_error) => {
                let reporter = ErrorReporter {
                    colored_output: std::io::stderr().is_terminal(),
                    ..ErrorReporter::new()
                };
                reporter.report(analysis_error)
            }
            None => format!("{error:#}\n"),
        };
        eprint!("{rendered}");
        std::process::exit(1);
    }
}
