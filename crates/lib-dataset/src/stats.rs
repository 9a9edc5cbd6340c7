//! Descriptive statistics over numeric columns.

use serde::Serialize;
use std::fmt;

use crate::error::{DatasetError, DatasetResult};

/// Arithmetic mean. `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Standard deviation with `ddof` degrees of freedom removed.
///
/// `ddof = 0` is the population STD, `ddof = 1` the sample STD.
/// `None` when fewer than `ddof + 1` values are given.
pub fn std_dev(values: &[f64], ddof: usize) -> Option<f64> {
    if values.len() <= ddof {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - ddof) as f64).sqrt())
}

/// Percentile `q` in [0, 100] of ascending-sorted values.
///
/// Linear interpolation between the two closest ranks, so the 0th and
/// 100th percentiles are the minimum and maximum.
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Copy and sort ascending, NaN last.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Summary of one numeric column.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub range: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; 0 for a single value.
    pub std: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
}

/// Summarise a column of values. Missing values must be filtered out first.
pub fn describe(values: &[f64]) -> DatasetResult<ColumnSummary> {
    if values.is_empty() {
        return Err(DatasetError::insufficient("describe", 1, 0));
    }
    let s = sorted(values);
    let n = s.len();
    let q = |p: f64| percentile_sorted(&s, p).unwrap_or(f64::NAN);

    let q1 = q(25.0);
    let q3 = q(75.0);
    Ok(ColumnSummary {
        count: n,
        min: s[0],
        max: s[n - 1],
        range: s[n - 1] - s[0],
        mean: mean(&s).unwrap_or(f64::NAN),
        median: q(50.0),
        std: std_dev(&s, 1).unwrap_or(0.0),
        q1,
        q3,
        iqr: q3 - q1,
    })
}

impl fmt::Display for ColumnSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Count:     {}", self.count)?;
        writeln!(f, "Minimum:   {:.4}", self.min)?;
        writeln!(f, "Maximum:   {:.4}", self.max)?;
        writeln!(f, "Range:     {:.4}", self.range)?;
        writeln!(f, "Mean:      {:.4}", self.mean)?;
        writeln!(f, "Median:    {:.4}", self.median)?;
        writeln!(f, "Std dev:   {:.4}", self.std)?;
        writeln!(f, "Q1 (25%):  {:.4}", self.q1)?;
        writeln!(f, "Q3 (75%):  {:.4}", self.q3)?;
        write!(f, "IQR:       {:.4}", self.iqr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let s = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_sorted(&s, 0.0), Some(1.0));
        assert_eq!(percentile_sorted(&s, 100.0), Some(4.0));
        assert_eq!(percentile_sorted(&s, 50.0), Some(2.5));
        // rank 0.3 -> 1.3
        assert!((percentile_sorted(&s, 10.0).unwrap() - 1.3).abs() < 1e-12);
        assert_eq!(percentile_sorted(&[], 50.0), None);
    }

    #[test]
    fn test_std_ddof() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(std_dev(&v, 0), Some(2.0));
        assert!((std_dev(&v, 1).unwrap() - 2.138089935).abs() < 1e-8);
        assert_eq!(std_dev(&[1.0], 1), None);
    }

    #[test]
    fn test_describe() {
        let summary = describe(&[5.0, 1.0, 3.0, 2.0, 4.0]).unwrap();
        assert_eq!(summary.count, 5);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 5.0);
        assert_eq!(summary.range, 4.0);
        assert_eq!(summary.median, 3.0);
        assert_eq!(summary.q1, 2.0);
        assert_eq!(summary.q3, 4.0);
        assert_eq!(summary.iqr, 2.0);
        assert!((summary.std - 2.5_f64.sqrt()).abs() < 1e-12);
        assert!(describe(&[]).is_err());
    }
}
