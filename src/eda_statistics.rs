use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use csv::WriterBuilder;
use ndarray::{Array1, Array2, ArrayView1};
use ordered_float::NotNan;
use serde::Serialize;
use statrs::statistics::{Data, Distribution};

use crate::error::AnalysisError;
use crate::load_clean::Table;

/// Pandas-style `describe()` of one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Summary {
    pub(crate) count: usize,
    pub(crate) mean: f64,
    pub(crate) std: f64,
    pub(crate) min: f64,
    pub(crate) q1: f64,
    pub(crate) median: f64,
    pub(crate) q3: f64,
    pub(crate) max: f64,
}

fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().filter(|v| !v.is_nan()).collect()
}

// Linear interpolation between closest ranks, on sorted input.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

pub(crate) fn describe(values: &[Option<f64>]) -> Summary {
    let mut sorted = present(values);
    sorted.sort_by(|a, b| a.total_cmp(b));

    if sorted.is_empty() {
        return Summary {
            count: 0,
            mean: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            q1: f64::NAN,
            median: f64::NAN,
            q3: f64::NAN,
            max: f64::NAN,
        };
    }

    let data = Data::new(sorted.clone());
    Summary {
        count: sorted.len(),
        mean: data.mean().unwrap_or(f64::NAN),
        std: data.std_dev().unwrap_or(f64::NAN),
        min: sorted[0],
        q1: quantile(&sorted, 0.25),
        median: quantile(&sorted, 0.5),
        q3: quantile(&sorted, 0.75),
        max: sorted[sorted.len() - 1],
    }
}

/// Every value sharing the highest frequency, ascending.
pub(crate) fn mode(values: &[Option<f64>]) -> Vec<f64> {
    let mut counts: BTreeMap<NotNan<f64>, usize> = BTreeMap::new();
    for value in present(values) {
        if let Ok(key) = NotNan::new(value) {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    let top = counts.values().copied().max().unwrap_or(0);
    counts
        .into_iter()
        .filter(|&(_, count)| count == top)
        .map(|(value, _)| value.into_inner())
        .collect()
}

fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let (m2, m3, m4) = values.iter().fold((0.0, 0.0, 0.0), |(m2, m3, m4), &v| {
        let d = v - mean;
        (m2 + d * d, m3 + d * d * d, m4 + d * d * d * d)
    });
    (m2 / n, m3 / n, m4 / n)
}

/// Adjusted Fisher-Pearson coefficient (G1).
pub(crate) fn skewness(values: &[Option<f64>]) -> f64 {
    let values = present(values);
    let n = values.len() as f64;
    if values.len() < 3 {
        return f64::NAN;
    }
    let (m2, m3, _) = central_moments(&values);
    if m2 == 0.0 {
        return 0.0;
    }
    let g1 = m3 / m2.powf(1.5);
    (n * (n - 1.0)).sqrt() / (n - 2.0) * g1
}

/// Adjusted excess kurtosis (G2).
pub(crate) fn kurtosis(values: &[Option<f64>]) -> f64 {
    let values = present(values);
    let n = values.len() as f64;
    if values.len() < 4 {
        return f64::NAN;
    }
    let (m2, _, m4) = central_moments(&values);
    if m2 == 0.0 {
        return 0.0;
    }
    let g2 = m4 / (m2 * m2) - 3.0;
    (n - 1.0) / ((n - 2.0) * (n - 3.0)) * ((n + 1.0) * g2 + 6.0)
}

// Helper function to calculate correlation
fn calculate_correlation(x: &ArrayView1<f64>, y: &ArrayView1<f64>) -> Option<f64> {
    if x.len() < 2 || x.len() != y.len() {
        return None;
    }
    let x_mean = x.mean()?;
    let y_mean = y.mean()?;
    let numerator = x.iter().zip(y.iter()).map(|(&xi, &yi)| (xi - x_mean) * (yi - y_mean)).sum::<f64>();
    let denominator_x = x.iter().map(|&xi| (xi - x_mean).powi(2)).sum::<f64>().sqrt();
    let denominator_y = y.iter().map(|&yi| (yi - y_mean).powi(2)).sum::<f64>().sqrt();
    if denominator_x > 0.0 && denominator_y > 0.0 {
        Some(numerator / (denominator_x * denominator_y))
    } else {
        None
    }
}

/// Pearson correlation per column pair over the rows where both are present.
pub(crate) fn correlation_matrix(table: &Table, columns: &[&str]) -> Result<Array2<f64>, AnalysisError> {
    let series = columns
        .iter()
        .map(|column| table.numeric(column))
        .collect::<Result<Vec<_>, _>>()?;

    let n = series.len();
    let mut matrix = Array2::from_elem((n, n), f64::NAN);
    for i in 0..n {
        for j in i..n {
            let (xs, ys): (Vec<f64>, Vec<f64>) = series[i]
                .iter()
                .zip(&series[j])
                .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
                .unzip();
            let (x, y) = (Array1::from(xs), Array1::from(ys));
            let r = calculate_correlation(&x.view(), &y.view()).unwrap_or(f64::NAN);
            matrix[(i, j)] = r;
            matrix[(j, i)] = r;
        }
    }
    Ok(matrix)
}

#[derive(Debug, Serialize)]
struct StatisticRow<'a> {
    column: &'a str,
    statistic: &'a str,
    value: f64,
}

/// Describe, mode, skewness and kurtosis of a single column.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ColumnReport {
    pub(crate) column: String,
    pub(crate) summary: Summary,
    pub(crate) modes: Vec<f64>,
    pub(crate) skewness: f64,
    pub(crate) kurtosis: f64,
}

impl ColumnReport {
    pub(crate) fn from_table(table: &Table, column: &str) -> Result<Self, AnalysisError> {
        let values = table.numeric(column)?;
        Ok(ColumnReport {
            column: column.to_string(),
            summary: describe(&values),
            modes: mode(&values),
            skewness: skewness(&values),
            kurtosis: kurtosis(&values),
        })
    }

    pub(crate) fn write_csv<P: AsRef<Path>>(&self, output_file: P) -> Result<(), AnalysisError> {
        let mut wtr = WriterBuilder::new().has_headers(true).from_path(output_file)?;
        let s = &self.summary;
        let described = [
            ("count", s.count as f64),
            ("mean", s.mean),
            ("std", s.std),
            ("min", s.min),
            ("25%", s.q1),
            ("50%", s.median),
            ("75%", s.q3),
            ("max", s.max),
        ];
        for (statistic, value) in described {
            wtr.serialize(StatisticRow { column: &self.column, statistic, value })?;
        }
        for &value in &self.modes {
            wtr.serialize(StatisticRow { column: &self.column, statistic: "mode", value })?;
        }
        wtr.serialize(StatisticRow { column: &self.column, statistic: "skewness", value: self.skewness })?;
        wtr.serialize(StatisticRow { column: &self.column, statistic: "kurtosis", value: self.kurtosis })?;
        wtr.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "count    {:.6}", self.count as f64)?;
        writeln!(f, "mean     {:.6}", self.mean)?;
        writeln!(f, "std      {:.6}", self.std)?;
        writeln!(f, "min      {:.6}", self.min)?;
        writeln!(f, "25%      {:.6}", self.q1)?;
        writeln!(f, "50%      {:.6}", self.median)?;
        writeln!(f, "75%      {:.6}", self.q3)?;
        write!(f, "max      {:.6}", self.max)
    }
}

impl fmt::Display for ColumnReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "1. Describe")?;
        writeln!(f, "{}", self.summary)?;
        writeln!(f, "Name: {}", self.column)?;
        writeln!(f, "2. Mode")?;
        for (i, value) in self.modes.iter().enumerate() {
            writeln!(f, "{}    {}", i, value)?;
        }
        writeln!(f, "3. Skewness")?;
        writeln!(f, "{}", self.skewness)?;
        writeln!(f, "4. Kurtosis")?;
        write!(f, "{}", self.kurtosis)
    }
}
