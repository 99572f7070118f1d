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
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Linear-interpolation quantile of already sorted values
/// (position `q·(n-1)`, the default of most dataframe libraries).
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FiveNumberSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl FiveNumberSummary {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            min: *sorted.first()?,
            q1: quantile(&sorted, 0.25)?,
            median: quantile(&sorted, 0.5)?,
            q3: quantile(&sorted, 0.75)?,
            max: *sorted.last()?,
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }

    /// Tukey fences at 1.5 IQR.
    pub fn fences(&self) -> (f64, f64) {
        let spread = 1.5 * self.iqr();
        (self.q1 - spread, self.q3 + spread)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
    pub outlier_count: usize,
}

impl ColumnSummary {
    pub fn from_values(column: &str, values: &[Option<f64>]) -> Self {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let count = present.len();
        let mean = (count > 0).then(|| present.iter().sum::<f64>() / count as f64);
        let std = mean.filter(|_| count > 1).map(|mean| {
            let ss: f64 = present.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        });
        let five = FiveNumberSummary::from_values(&present);
        let outlier_count = five.as_ref().map_or(0, |five| {
            let (lower, upper) = five.fences();
            present.iter().filter(|&&v| v < lower || v > upper).count()
        });
        Self {
            column: column.to_string(),
            count,
            missing: values.len() - count,
            mean,
            std,
            min: five.as_ref().map(|f| f.min),
            q25: five.as_ref().map(|f| f.q1),
            median: five.as_ref().map(|f| f.median),
            q75: five.as_ref().map(|f| f.q3),
            max: five.as_ref().map(|f| f.max),
            outlier_count,
        }
    }
}

/// Summary statistics for each numeric column in `columns`.
pub fn describe<S: AsRef<str>>(frame: &DataFrame, columns: &[S]) -> Result<Vec<ColumnSummary>> {
    frame.require_columns(columns)?;
    let sources = columns
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let values = frame.require_column(name)?.numeric_values(name)?;
            Ok((name, values))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(sources
        .par_iter()
        .map(|(name, values)| ColumnSummary::from_values(name, values))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile(&sorted, 0.25), Some(1.75));
        assert_eq!(quantile(&sorted, 1.0), Some(4.0));
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(quantile(&sorted, 1.5), None);
    }

    #[test]
    fn summary_excludes_missing_values() {
        let summary = ColumnSummary::from_values("x", &[Some(2.0), None, Some(4.0), Some(6.0)]);
        assert_eq!(summary.count, 3);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.mean, Some(4.0));
        assert_eq!(summary.std, Some(2.0));
        assert_eq!(summary.median, Some(4.0));
        assert_eq!(summary.min, Some(2.0));
        assert_eq!(summary.max, Some(6.0));
    }

    #[test]
    fn summary_of_single_value_has_no_spread() {
        let summary = ColumnSummary::from_values("x", &[Some(3.0)]);
        assert_eq!(summary.mean, Some(3.0));
        assert_eq!(summary.std, None);
        let empty = ColumnSummary::from_values("x", &[None, None]);
        assert_eq!(empty.count, 0);
        assert_eq!(empty.mean, None);
        assert_eq!(empty.median, None);
    }

    #[test]
    fn outliers_use_tukey_fences() {
        let values: Vec<Option<f64>> = [1.0, 2.0, 3.0, 4.0, 100.0].iter().map(|&v| Some(v)).collect();
        let summary = ColumnSummary::from_values("x", &values);
        assert_eq!(summary.outlier_count, 1);
    }
}
