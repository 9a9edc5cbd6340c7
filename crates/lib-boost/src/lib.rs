//! # lib-boost
//!
//! Gradient-boosted regression trees for downlink recommendations.
//!
//! - **Trees**: histogram-binned split search with L1/L2 leaf regularisation
//! - **Booster**: squared-loss boosting with row and column subsampling
//! - **Artifacts**: JSON models carrying their target and feature order
//! - **Metrics**: MSE, RMSE, R²
//! - **Advisor**: send-all threshold and compression-ratio clamp

pub mod advisor;
pub mod artifact;
pub mod booster;
pub mod error;
pub mod metrics;
pub mod tree;

pub use advisor::{DownlinkAdvisor, Recommendation};
pub use artifact::ModelArtifact;
pub use booster::{BoostParams, GradientBoostedRegressor};
pub use error::{BoostError, BoostResult};
pub use metrics::{mse, r2, rmse, RegressionMetrics};
pub use tree::RegressionTree;
