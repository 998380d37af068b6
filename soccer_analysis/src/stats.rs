//! Descriptive statistics, correlation and kernel density estimates over polars frames.

use std::collections::BTreeMap;

use ndarray::Array2;
use ndarray_stats::CorrelationExt;
use polars::prelude::*;
use statrs::distribution::{Continuous, Normal};

use crate::helper_functions::{
    column_f64, column_str, ensure_columns, numeric_column_names, string_column_names,
};
use crate::models::polars_err;

pub const NUMERIC_STATISTICS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];
pub const CATEGORICAL_STATISTICS: [&str; 4] = ["count", "unique", "top", "freq"];

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (ddof = 1).
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Linear-interpolated quantile of an ascending slice.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    let pos = (n as f64 - 1.0) * p.clamp(0.0, 1.0);
    let idx = pos.floor() as usize;
    let frac = pos - idx as f64;
    if idx + 1 < n {
        sorted[idx] * (1.0 - frac) + sorted[idx + 1] * frac
    } else {
        sorted[idx]
    }
}

fn numeric_summary(values: &mut [f64]) -> [f64; 8] {
    values.sort_by(|a, b| a.total_cmp(b));
    let count = values.len() as f64;
    if values.is_empty() {
        return [0.0, f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN];
    }
    [
        count,
        mean(values).unwrap_or(f64::NAN),
        sample_std(values).unwrap_or(f64::NAN),
        values[0],
        quantile(values, 0.25),
        quantile(values, 0.5),
        quantile(values, 0.75),
        values[values.len() - 1],
    ]
}

fn statistic_column(names: &[&str]) -> Column {
    Column::from(Series::new(PlSmallStr::from("statistic"), names.to_vec()))
}

/// `count, mean, std, min, quartiles, max` for every numeric column, one output column each.
pub fn describe_numeric(df: &DataFrame) -> PolarsResult<DataFrame> {
    let mut columns = vec![statistic_column(&NUMERIC_STATISTICS)];
    for name in numeric_column_names(df) {
        let mut values: Vec<f64> = column_f64(df, &name)?.into_iter().flatten().collect();
        let summary = numeric_summary(&mut values);
        columns.push(Column::from(Series::new(PlSmallStr::from(name.as_str()), summary.to_vec())));
    }
    DataFrame::new(columns)
}

/// `count, unique, top, freq` for every string column. Ties for `top` go to the
/// lexicographically smallest value.
pub fn describe_categorical(df: &DataFrame) -> PolarsResult<DataFrame> {
    let mut columns = vec![statistic_column(&CATEGORICAL_STATISTICS)];
    for name in string_column_names(df) {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for value in column_str(df, &name)?.into_iter().flatten() {
            *counts.entry(value).or_default() += 1;
        }
        let count: usize = counts.values().sum();
        let top = counts
            .iter()
            .fold(None::<(&String, usize)>, |best, (value, &n)| match best {
                Some((_, best_n)) if best_n >= n => best,
                _ => Some((value, n)),
            });

        let cells: Vec<Option<String>> = vec![
            Some(count.to_string()),
            Some(counts.len().to_string()),
            top.map(|(value, _)| value.clone()),
            top.map(|(_, n)| n.to_string()),
        ];
        columns.push(Column::from(Series::new(PlSmallStr::from(name.as_str()), cells)));
    }
    DataFrame::new(columns)
}

/// Pearson correlation between the given columns. Each entry uses the rows where both of
/// its columns are present, so a null in one column does not drop the row from the
/// other pairs. Pairs with fewer than two shared rows are NaN.
pub fn correlation_matrix(df: &DataFrame, columns: &[&str]) -> PolarsResult<Array2<f64>> {
    ensure_columns(df, columns)?;
    let raw: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|&name| column_f64(df, name))
        .collect::<PolarsResult<_>>()?;

    let k = columns.len();
    let mut matrix = Array2::<f64>::from_elem((k, k), f64::NAN);
    for a in 0..k {
        for b in a..k {
            let r = pairwise_pearson(&raw[a], &raw[b])?;
            matrix[[a, b]] = r;
            matrix[[b, a]] = r;
        }
    }
    Ok(matrix)
}

fn pairwise_pearson(x: &[Option<f64>], y: &[Option<f64>]) -> PolarsResult<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|pair| match pair {
            (Some(a), Some(b)) => Some((*a, *b)),
            _ => None,
        })
        .collect();
    if pairs.len() < 2 {
        return Ok(f64::NAN);
    }

    // One variable per row, observations along the columns.
    let observations = Array2::from_shape_fn((2, pairs.len()), |(v, j)| {
        if v == 0 { pairs[j].0 } else { pairs[j].1 }
    });
    let corr = observations
        .pearson_correlation()
        .map_err(|e| polars_err(Box::new(e)))?;
    Ok(corr[[0, 1]])
}

/// Scott's rule of thumb bandwidth, `σ · n^(-1/5)`.
pub fn scott_bandwidth(values: &[f64]) -> Option<f64> {
    let std = sample_std(values)?;
    if std <= 0.0 {
        return None;
    }
    Some(std * (values.len() as f64).powf(-0.2))
}

/// Gaussian kernel density of `values` evaluated at each point of `grid`.
/// `None` when the sample is too small or has no spread.
pub fn gaussian_kde(values: &[f64], grid: &[f64]) -> PolarsResult<Option<Vec<f64>>> {
    let bandwidth = match scott_bandwidth(values) {
        Some(h) => h,
        None => return Ok(None),
    };
    let kernel = Normal::new(0.0, 1.0).map_err(|e| polars_err(Box::new(e)))?;
    let norm = values.len() as f64 * bandwidth;

    let density = grid
        .iter()
        .map(|&x| {
            values
                .iter()
                .map(|&xi| kernel.pdf((x - xi) / bandwidth))
                .sum::<f64>()
                / norm
        })
        .collect();
    Ok(Some(density))
}
