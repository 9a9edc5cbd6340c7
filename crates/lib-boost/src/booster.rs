//! Gradient-boosted regression with squared loss.

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::seq::index::sample;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{BoostError, BoostResult};
use crate::metrics::mse;
use crate::tree::{BinnedMatrix, RegressionTree, TreeParams};

/// Boosting hyperparameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Fraction of rows sampled per tree.
    pub subsample: f64,
    /// Fraction of features sampled per tree.
    pub colsample_bytree: f64,
    /// L2 penalty on leaf weights.
    pub reg_lambda: f64,
    /// L1 penalty on leaf weights.
    pub reg_alpha: f64,
    pub min_child_weight: f64,
    pub max_bins: usize,
    pub seed: u64,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_estimators: 300,
            learning_rate: 0.07,
            max_depth: 6,
            subsample: 0.8,
            colsample_bytree: 0.8,
            reg_lambda: 2.0,
            reg_alpha: 1.0,
            min_child_weight: 1.0,
            max_bins: 64,
            seed: 42,
        }
    }
}

impl BoostParams {
    pub fn validate(&self) -> BoostResult<()> {
        if self.n_estimators == 0 {
            return Err(BoostError::parameter("n_estimators", "must be at least 1"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(BoostError::parameter("learning_rate", "must be in (0, 1]"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(BoostError::parameter("subsample", "must be in (0, 1]"));
        }
        if !(self.colsample_bytree > 0.0 && self.colsample_bytree <= 1.0) {
            return Err(BoostError::parameter("colsample_bytree", "must be in (0, 1]"));
        }
        if self.reg_lambda < 0.0 || self.reg_alpha < 0.0 || self.min_child_weight < 0.0 {
            return Err(BoostError::parameter("regularization", "penalties must be non-negative"));
        }
        if !(2..=256).contains(&self.max_bins) {
            return Err(BoostError::parameter("max_bins", "must be in 2..=256"));
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            lambda: self.reg_lambda,
            alpha: self.reg_alpha,
            min_child_weight: self.min_child_weight,
            shrinkage: self.learning_rate,
        }
    }
}

/// A fitted ensemble: base score plus the sum of tree outputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    pub base_score: f64,
    pub n_features: usize,
    pub trees: Vec<RegressionTree>,
}

impl GradientBoostedRegressor {
    /// Fit on `x` (rows are samples) against `y`.
    pub fn fit(x: ArrayView2<'_, f64>, y: ArrayView1<'_, f64>, params: &BoostParams) -> BoostResult<Self> {
        params.validate()?;
        let (n_rows, n_features) = x.dim();
        if n_rows == 0 {
            return Err(BoostError::EmptyTrainingSet);
        }
        if y.len() != n_rows {
            return Err(BoostError::dimension("target length", n_rows, y.len()));
        }

        info!(
            rows = n_rows,
            features = n_features,
            trees = params.n_estimators,
            "Fitting gradient-boosted trees"
        );

        let data = BinnedMatrix::new(x, params.max_bins);
        let tree_params = params.tree_params();
        let mut rng = ChaCha8Rng::seed_from_u64(params.seed);

        let base_score = y.mean().unwrap_or(0.0);
        let mut pred = Array1::from_elem(n_rows, base_score);
        let hess = vec![1.0; n_rows];
        let n_cols = ((params.colsample_bytree * n_features as f64).round() as usize).clamp(1, n_features.max(1));

        let mut trees = Vec::with_capacity(params.n_estimators);
        for round in 0..params.n_estimators {
            let grad: Vec<f64> = pred.iter().zip(y.iter()).map(|(p, t)| p - t).collect();
            let rows = sample_rows(&mut rng, n_rows, params.subsample);
            let mut features: Vec<usize> = sample(&mut rng, n_features.max(1), n_cols).into_vec();
            features.retain(|&f| f < n_features);
            features.sort_unstable();

            let tree = RegressionTree::grow(&data, &grad, &hess, rows, &features, &tree_params);
            for (i, p) in pred.iter_mut().enumerate() {
                *p += tree.predict_row(x.row(i));
            }
            trees.push(tree);

            if (round + 1) % 50 == 0 {
                debug!(round = round + 1, train_mse = mse(y, pred.view()), "Boosting progress");
            }
        }

        Ok(Self {
            base_score,
            n_features,
            trees,
        })
    }

    /// Predict one row.
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> BoostResult<f64> {
        if row.len() != self.n_features {
            return Err(BoostError::dimension("feature count", self.n_features, row.len()));
        }
        Ok(self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>())
    }

    /// Predict every row of `x`.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> BoostResult<Array1<f64>> {
        if x.ncols() != self.n_features {
            return Err(BoostError::dimension("feature count", self.n_features, x.ncols()));
        }
        Ok(x.rows()
            .into_iter()
            .map(|row| self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>())
            .collect())
    }
}

/// Bernoulli row sample; falls back to every row if none is drawn.
fn sample_rows<R: Rng + ?Sized>(rng: &mut R, n_rows: usize, fraction: f64) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..n_rows).collect();
    }
    let rows: Vec<usize> = (0..n_rows).filter(|_| rng.gen::<f64>() < fraction).collect();
    if rows.is_empty() {
        (0..n_rows).collect()
    } else {
        rows
    }
}
