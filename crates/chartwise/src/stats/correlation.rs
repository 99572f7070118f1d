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

use crate::data_handler::dataframe::DataFrame;
use crate::error::Result;
use itertools::Itertools;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Pearson correlation over the positions where both values are present.
/// `None` with fewer than two such pairs or when either side is constant.
pub fn correlation(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    pairwise_correlation(a, b).0
}

/// Correlation and the number of complete pairs it was computed from.
pub fn pairwise_correlation(a: &[Option<f64>], b: &[Option<f64>]) -> (Option<f64>, usize) {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    (pearson(&pairs), pairs.len())
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    // Deviations are scaled to at most 1 in magnitude so the sums of squares
    // stay within [0, n] whatever the scale of the data.
    let scale_x = pairs.iter().map(|(x, _)| (x - mean_x).abs()).fold(0.0, f64::max);
    let scale_y = pairs.iter().map(|(_, y)| (y - mean_y).abs()).fold(0.0, f64::max);
    if scale_x == 0.0 || scale_y == 0.0 || !scale_x.is_finite() || !scale_y.is_finite() {
        return None;
    }
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = (x - mean_x) / scale_x;
        let dy = (y - mean_y) / scale_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let r = sxy / (sxx * syy).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Symmetric matrix of pairwise correlations. Each cell uses its own set of
/// complete pairs, so cells may be computed from different row subsets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
    pub pair_counts: Vec<Vec<usize>>,
}

impl CorrelationMatrix {
    pub fn size(&self) -> usize {
        self.columns.len()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row)?.get(col).copied().flatten()
    }

    pub fn get_by_name(&self, a: &str, b: &str) -> Option<f64> {
        let row = self.columns.iter().position(|c| c == a)?;
        let col = self.columns.iter().position(|c| c == b)?;
        self.get(row, col)
    }

    /// Off-diagonal pairs ordered by descending absolute correlation.
    pub fn strongest_pairs(&self, limit: usize) -> Vec<(String, String, f64)> {
        (0..self.size())
            .tuple_combinations()
            .filter_map(|(i, j)| {
                self.get(i, j)
                    .map(|r| (self.columns[i].clone(), self.columns[j].clone(), r))
            })
            .sorted_by(|a, b| b.2.abs().total_cmp(&a.2.abs()))
            .take(limit)
            .collect()
    }
}

/// Pairwise correlation of every pair of `columns`, which must be numeric.
pub fn correlation_matrix<S: AsRef<str>>(frame: &DataFrame, columns: &[S]) -> Result<CorrelationMatrix> {
    frame.require_columns(columns)?;
    let series = columns
        .iter()
        .map(|name| frame.require_column(name.as_ref())?.numeric_values(name.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    let n = series.len();

    let cells: Vec<((usize, usize), (Option<f64>, usize))> = (0..n)
        .flat_map(|i| (i..n).map(move |j| (i, j)))
        .collect::<Vec<_>>()
        .into_par_iter()
        .map(|(i, j)| {
            let cell = if i == j {
                let (r, count) = pairwise_correlation(series[i], series[i]);
                (r.map(|_| 1.0), count)
            } else {
                pairwise_correlation(series[i], series[j])
            };
            ((i, j), cell)
        })
        .collect();

    let mut values = vec![vec![None; n]; n];
    let mut pair_counts = vec![vec![0; n]; n];
    for ((i, j), (r, count)) in cells {
        values[i][j] = r;
        values[j][i] = r;
        pair_counts[i][j] = count;
        pair_counts[j][i] = count;
    }
    Ok(CorrelationMatrix {
        columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        values,
        pair_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().map(|&v| Some(v)).collect()
    }

    #[test]
    fn perfect_linear_relationships() {
        let x = some(&[1.0, 2.0, 3.0, 4.0]);
        let y = some(&[2.0, 4.0, 6.0, 8.0]);
        let z = some(&[8.0, 6.0, 4.0, 2.0]);
        assert!((correlation(&x, &y).unwrap() - 1.0).abs() < 1e-12);
        assert!((correlation(&x, &z).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pairwise_deletion_skips_incomplete_pairs() {
        let x = vec![Some(1.0), None, Some(3.0), Some(4.0)];
        let y = vec![Some(1.0), Some(100.0), None, Some(4.0)];
        let (r, count) = pairwise_correlation(&x, &y);
        assert_eq!(count, 2);
        assert!((r.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn undefined_cases_yield_none() {
        assert_eq!(correlation(&some(&[1.0]), &some(&[2.0])), None);
        assert_eq!(correlation(&some(&[1.0, 1.0, 1.0]), &some(&[1.0, 2.0, 3.0])), None);
        assert_eq!(correlation(&[None, None], &[Some(1.0), Some(2.0)]), None);
    }

    #[test]
    fn known_value() {
        let x = some(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let y = some(&[2.0, 4.0, 5.0, 4.0, 5.0]);
        // r = 6 / sqrt(10 * 6)
        let expected = 6.0 / 60f64.sqrt();
        assert!((correlation(&x, &y).unwrap() - expected).abs() < 1e-12);
    }
}
