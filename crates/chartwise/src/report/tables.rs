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

use crate::report::YearlyAggregate;
use crate::stats::correlation::CorrelationMatrix;
use crate::stats::describe::ColumnSummary;
use crate::stats::regression::LinearModel;

const P_VALUE_FLOOR: f64 = 2.2e-16;

/// Missing values print as `NaN`.
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() && v != 0.0 && (v.abs() >= 1e6 || v.abs() < 1e-4) => format!("{v:.4e}"),
        Some(v) if v.is_finite() => format!("{v:.4}"),
        Some(v) => v.to_string(),
        None => "NaN".to_string(),
    }
}

pub fn format_p_value(p: f64) -> String {
    if p.is_nan() {
        "NaN".to_string()
    } else if p < P_VALUE_FLOOR {
        format!("< {P_VALUE_FLOOR:e}")
    } else if p < 1e-4 {
        format!("{p:.2e}")
    } else {
        format!("{p:.4}")
    }
}

/// Aligned plain-text table; the first column is left aligned, the rest right.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(i, (cell, &width))| {
                if i == 0 {
                    format!("{cell:<width$}")
                } else {
                    format!("{cell:>width$}")
                }
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    let mut out = line(headers);
    out.push('\n');
    out.push_str(&"-".repeat(widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1)));
    out.push('\n');
    for row in rows {
        out.push_str(&line(row.as_slice()));
        out.push('\n');
    }
    out
}

pub fn format_summary_table(summaries: &[ColumnSummary]) -> String {
    let headers: Vec<String> = ["column", "count", "missing", "mean", "std", "min", "25%", "50%", "75%", "max"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    let rows: Vec<Vec<String>> = summaries
        .iter()
        .map(|s| {
            vec![
                s.column.clone(),
                s.count.to_string(),
                s.missing.to_string(),
                format_value(s.mean),
                format_value(s.std),
                format_value(s.min),
                format_value(s.q25),
                format_value(s.median),
                format_value(s.q75),
                format_value(s.max),
            ]
        })
        .collect();
    render_table(&headers, &rows)
}

pub fn format_yearly_table(yearly: &[YearlyAggregate]) -> String {
    let metrics: Vec<&String> = yearly.first().map(|y| y.means.keys().collect()).unwrap_or_default();
    let mut headers = vec!["year".to_string(), "count".to_string()];
    headers.extend(metrics.iter().map(|m| format!("mean_{m}")));
    let rows: Vec<Vec<String>> = yearly
        .iter()
        .map(|y| {
            let mut row = vec![format!("{}", y.year), y.count.to_string()];
            row.extend(metrics.iter().map(|m| format_value(y.means.get(*m).copied().flatten())));
            row
        })
        .collect();
    render_table(&headers, &rows)
}

pub fn format_correlation_matrix(matrix: &CorrelationMatrix) -> String {
    let mut headers = vec![String::new()];
    headers.extend(matrix.columns.iter().cloned());
    let rows: Vec<Vec<String>> = matrix
        .columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let mut row = vec![name.clone()];
            row.extend((0..matrix.size()).map(|j| match matrix.get(i, j) {
                Some(r) => format!("{r:.3}"),
                None => "NaN".to_string(),
            }));
            row
        })
        .collect();
    render_table(&headers, &rows)
}

/// Coefficient table with fit statistics, in the layout of a classic
/// regression summary.
pub fn format_regression(model: &LinearModel) -> String {
    let predictors: Vec<&str> = model.terms.iter().skip(1).map(|t| t.term.as_str()).collect();
    let level = model.confidence_level * 100.0;
    let lower = format!("{:.1}%", (100.0 - level) / 2.0);
    let upper = format!("{:.1}%", 100.0 - (100.0 - level) / 2.0);
    let headers: Vec<String> = vec![
        "term".to_string(),
        "estimate".to_string(),
        "std.error".to_string(),
        "t value".to_string(),
        "Pr(>|t|)".to_string(),
        lower,
        upper,
    ];
    let rows: Vec<Vec<String>> = model
        .terms
        .iter()
        .map(|t| {
            vec![
                t.term.clone(),
                format_value(Some(t.estimate)),
                format_value(Some(t.std_error)),
                format!("{:.3}", t.t_value),
                format_p_value(t.p_value),
                format_value(Some(t.ci_lower)),
                format_value(Some(t.ci_upper)),
            ]
        })
        .collect();

    let mut out = format!("Linear model: {} ~ {}\n", model.target, predictors.join(" + "));
    out.push_str(&format!(
        "Observations: {} ({} incomplete rows excluded)\n\n",
        model.n_obs, model.rows_dropped
    ));
    out.push_str(&render_table(&headers, &rows));
    out.push('\n');
    out.push_str(&format!(
        "Residual standard error: {} on {} degrees of freedom\n",
        format_value(Some(model.residual_std_error)),
        model.df_resid
    ));
    out.push_str(&format!(
        "Multiple R-squared: {:.4}, Adjusted R-squared: {:.4}\n",
        model.r_squared, model.adj_r_squared
    ));
    out.push_str(&format!(
        "F-statistic: {:.3} on {} and {} DF, p-value: {}\n",
        model.f_statistic,
        model.df_model,
        model.df_resid,
        format_p_value(model.f_p_value)
    ));
    out
}
