//! Regression metrics.

use ndarray::ArrayView1;
use std::fmt;

/// Mean squared error. Zero for empty input.
pub fn mse(truth: ArrayView1<'_, f64>, pred: ArrayView1<'_, f64>) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    truth
        .iter()
        .zip(pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / truth.len() as f64
}

pub fn rmse(truth: ArrayView1<'_, f64>, pred: ArrayView1<'_, f64>) -> f64 {
    mse(truth, pred).sqrt()
}

/// Coefficient of determination.
///
/// A constant target scores 1.0 when predicted exactly and 0.0 otherwise.
pub fn r2(truth: ArrayView1<'_, f64>, pred: ArrayView1<'_, f64>) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let mean = truth.mean().unwrap_or(0.0);
    let ss_res: f64 = truth.iter().zip(pred.iter()).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = truth.iter().map(|t| (t - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

/// Train/test scores for one target.
#[derive(Clone, Debug, PartialEq)]
pub struct RegressionMetrics {
    pub target: String,
    pub train_mse: f64,
    pub test_mse: f64,
    pub train_r2: f64,
    pub test_r2: f64,
    pub test_rmse: f64,
}

impl RegressionMetrics {
    pub fn evaluate(
        target: impl Into<String>,
        train: (ArrayView1<'_, f64>, ArrayView1<'_, f64>),
        test: (ArrayView1<'_, f64>, ArrayView1<'_, f64>),
    ) -> Self {
        Self {
            target: target.into(),
            train_mse: mse(train.0, train.1),
            test_mse: mse(test.0, test.1),
            train_r2: r2(train.0, train.1),
            test_r2: r2(test.0, test.1),
            test_rmse: rmse(test.0, test.1),
        }
    }
}

impl fmt::Display for RegressionMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Target: {}", self.target)?;
        writeln!(f, "  Train MSE: {:.6}  Train R2: {:.4}", self.train_mse, self.train_r2)?;
        write!(
            f,
            "  Test MSE:  {:.6}  Test R2:  {:.4}  Test RMSE: {:.6}",
            self.test_mse, self.test_r2, self.test_rmse
        )
    }
}
