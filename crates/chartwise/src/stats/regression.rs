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

//! Ordinary least squares with an intercept.
//!
//! The normal equations are solved on centred predictors scaled to unit
//! diagonal, which keeps the Gauss-Jordan inverse well conditioned for
//! features on very different scales (tempo vs. danceability) and turns
//! the collinearity check into a scale-free pivot threshold.

use crate::data_handler::dataframe::DataFrame;
use crate::error::{Result, StatsError};
use crate::stats::distribution::{FisherSnedecor, StudentT};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const INTERCEPT: &str = "(Intercept)";
pub const CONFIDENCE_LEVEL: f64 = 0.95;

const PIVOT_TOLERANCE: f64 = 1e-10;
const CONSTANT_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegressionTerm {
    pub term: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinearModel {
    pub target: String,
    /// Intercept first, then predictors in the order requested.
    pub terms: Vec<RegressionTerm>,
    pub n_obs: usize,
    pub rows_dropped: usize,
    pub df_model: usize,
    pub df_resid: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
    pub residual_std_error: f64,
    pub confidence_level: f64,
}

impl LinearModel {
    pub fn term(&self, name: &str) -> Option<&RegressionTerm> {
        self.terms.iter().find(|t| t.term == name)
    }

    pub fn intercept(&self) -> f64 {
        self.terms[0].estimate
    }

    /// Fitted value for one row of predictor values, in fitting order.
    pub fn predict(&self, predictors: &[f64]) -> Option<f64> {
        if predictors.len() + 1 != self.terms.len() {
            return None;
        }
        let slopes = self.terms[1..].iter().zip(predictors);
        Some(self.intercept() + slopes.map(|(term, x)| term.estimate * x).sum::<f64>())
    }
}

/// Fits `target ~ predictors` on the rows complete across all of them.
pub fn fit_linear_model<S: AsRef<str>>(
    frame: &DataFrame,
    target: &str,
    predictors: &[S],
) -> Result<LinearModel> {
    let predictor_names: Vec<&str> = predictors.iter().map(|p| p.as_ref()).collect();
    let mut wanted = vec![target];
    wanted.extend(&predictor_names);
    frame.require_columns(&wanted)?;
    let y_all = frame.require_column(target)?.numeric_values(target)?;
    let x_all = predictor_names
        .iter()
        .map(|&name| frame.require_column(name)?.numeric_values(name))
        .collect::<Result<Vec<_>>>()?;

    let rows: Vec<usize> = (0..frame.row_count())
        .filter(|&i| y_all[i].is_some() && x_all.iter().all(|x| x[i].is_some()))
        .collect();
    let n = rows.len();
    let k = predictor_names.len();
    let rows_dropped = frame.row_count() - n;
    if rows_dropped > 0 {
        debug!(rows_dropped, "Incomplete rows excluded from the regression");
    }
    if n <= k + 1 {
        return Err(StatsError::InsufficientData { rows: n, required: k + 1 }.into());
    }

    let y: Vec<f64> = rows.iter().filter_map(|&i| y_all[i]).collect();
    let x: Vec<Vec<f64>> = x_all
        .iter()
        .map(|column| rows.iter().filter_map(|&i| column[i]).collect())
        .collect();

    let nf = n as f64;
    let y_mean = y.iter().sum::<f64>() / nf;
    let x_means: Vec<f64> = x.iter().map(|col| col.iter().sum::<f64>() / nf).collect();
    let yc: Vec<f64> = y.iter().map(|v| v - y_mean).collect();
    let xc: Vec<Vec<f64>> = x
        .iter()
        .zip(&x_means)
        .map(|(col, mean)| col.iter().map(|v| v - mean).collect())
        .collect();

    let mut cross = vec![vec![0.0; k]; k];
    for i in 0..k {
        for j in i..k {
            let s = dot(&xc[i], &xc[j]);
            cross[i][j] = s;
            cross[j][i] = s;
        }
    }
    for (i, name) in predictor_names.iter().enumerate() {
        let raw_scale = dot(&x[i], &x[i]).max(f64::MIN_POSITIVE);
        if cross[i][i] <= CONSTANT_TOLERANCE * raw_scale {
            return Err(StatsError::SingularDesign {
                reason: format!("predictor '{name}' is constant over the {n} complete rows"),
            }
            .into());
        }
    }

    let scale: Vec<f64> = (0..k).map(|i| cross[i][i].sqrt()).collect();
    let scaled: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| cross[i][j] / (scale[i] * scale[j])).collect())
        .collect();
    let scaled_inverse = invert(scaled).ok_or_else(|| StatsError::SingularDesign {
        reason: format!("predictors {} are perfectly collinear", predictor_names.join(", ")),
    })?;
    let inverse: Vec<Vec<f64>> = (0..k)
        .map(|i| {
            (0..k)
                .map(|j| scaled_inverse[i][j] / (scale[i] * scale[j]))
                .collect()
        })
        .collect();

    let xty: Vec<f64> = xc.iter().map(|col| dot(col, &yc)).collect();
    let slopes: Vec<f64> = inverse.iter().map(|row| dot(row, &xty)).collect();
    let intercept = y_mean - dot(&slopes, &x_means);

    let ss_total = dot(&yc, &yc);
    let ss_resid: f64 = (0..n)
        .map(|r| {
            let fitted: f64 = (0..k).map(|j| slopes[j] * xc[j][r]).sum();
            (yc[r] - fitted).powi(2)
        })
        .sum();
    let df_resid = n - k - 1;
    let sigma2 = ss_resid / df_resid as f64;

    let slope_variances: Vec<f64> = (0..k).map(|j| sigma2 * inverse[j][j]).collect();
    let intercept_variance = sigma2 / nf
        + (0..k)
            .map(|i| {
                (0..k)
                    .map(|j| x_means[i] * sigma2 * inverse[i][j] * x_means[j])
                    .sum::<f64>()
            })
            .sum::<f64>();

    // df_resid >= 1 here, so the distribution always exists.
    let t_dist = StudentT::new(df_resid as f64);
    let critical = t_dist.map_or(f64::NAN, |t| t.ppf(0.5 + CONFIDENCE_LEVEL / 2.0));
    let make_term = |term: &str, estimate: f64, variance: f64| {
        let std_error = variance.max(0.0).sqrt();
        let t_value = estimate / std_error;
        RegressionTerm {
            term: term.to_string(),
            estimate,
            std_error,
            t_value,
            p_value: t_dist.map_or(f64::NAN, |t| t.two_sided_p(t_value)),
            ci_lower: estimate - critical * std_error,
            ci_upper: estimate + critical * std_error,
        }
    };
    let mut terms = Vec::with_capacity(k + 1);
    terms.push(make_term(INTERCEPT, intercept, intercept_variance));
    for (j, name) in predictor_names.iter().enumerate() {
        terms.push(make_term(*name, slopes[j], slope_variances[j]));
    }

    let r_squared = if ss_total > 0.0 {
        1.0 - ss_resid / ss_total
    } else {
        f64::NAN
    };
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (nf - 1.0) / df_resid as f64;
    let f_statistic = if k > 0 {
        ((ss_total - ss_resid) / k as f64) / sigma2
    } else {
        f64::NAN
    };
    let f_p_value = FisherSnedecor::new(k as f64, df_resid as f64).map_or(f64::NAN, |f| f.sf(f_statistic));

    debug!(dependent = target, n_obs = n, r_squared, "Fitted linear model");
    Ok(LinearModel {
        target: target.to_string(),
        terms,
        n_obs: n,
        rows_dropped,
        df_model: k,
        df_resid,
        r_squared,
        adj_r_squared,
        f_statistic,
        f_p_value,
        residual_std_error: sigma2.sqrt(),
        confidence_level: CONFIDENCE_LEVEL,
    })
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Gauss-Jordan inverse with partial pivoting; `None` when a pivot falls
/// under the tolerance.
fn invert(mut matrix: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    let mut inverse: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();
    for col in 0..n {
        let pivot_row = (col..n).max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))?;
        if matrix[pivot_row][col].abs() < PIVOT_TOLERANCE {
            return None;
        }
        matrix.swap(col, pivot_row);
        inverse.swap(col, pivot_row);
        let pivot = matrix[col][col];
        for j in 0..n {
            matrix[col][j] /= pivot;
            inverse[col][j] /= pivot;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = matrix[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                matrix[row][j] -= factor * matrix[col][j];
                inverse[row][j] -= factor * inverse[col][j];
            }
        }
    }
    Some(inverse)
}
