//! Persisted models.
//!
//! An artifact pairs a fitted regressor with the target it predicts and
//! the ordered feature names it was trained on, so inference can realign
//! an arbitrary feature map to the training layout.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::booster::GradientBoostedRegressor;
use crate::error::{BoostError, BoostResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub target: String,
    pub feature_names: Vec<String>,
    pub model: GradientBoostedRegressor,
}

impl ModelArtifact {
    pub fn new(
        target: impl Into<String>,
        feature_names: Vec<String>,
        model: GradientBoostedRegressor,
    ) -> BoostResult<Self> {
        let target = target.into();
        if feature_names.len() != model.n_features {
            return Err(BoostError::Incompatible {
                target,
                reason: format!(
                    "{} feature names for a model of {} features",
                    feature_names.len(),
                    model.n_features
                ),
            });
        }
        Ok(Self {
            target,
            feature_names,
            model,
        })
    }

    /// Conventional file name for a target's artifact.
    pub fn file_name(target: &str) -> String {
        format!("gbrt_{}_model.json", target)
    }

    /// Path of a target's artifact inside `dir`.
    pub fn path_in(dir: &Path, target: &str) -> PathBuf {
        dir.join(Self::file_name(target))
    }

    pub fn save(&self, path: &Path) -> BoostResult<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        info!(target_name = %self.target, path = %path.display(), "Saved model artifact");
        Ok(())
    }

    pub fn load(path: &Path) -> BoostResult<Self> {
        let reader = BufReader::new(File::open(path)?);
        let artifact: Self = serde_json::from_reader(reader)?;
        if artifact.feature_names.len() != artifact.model.n_features {
            return Err(BoostError::Incompatible {
                target: artifact.target,
                reason: "feature names do not match model width".into(),
            });
        }
        Ok(artifact)
    }

    /// Align a named feature map to the training order. Absent features are 0.
    pub fn reindex(&self, features: &HashMap<String, f64>) -> Vec<f64> {
        self.feature_names
            .iter()
            .map(|name| features.get(name).copied().unwrap_or(0.0))
            .collect()
    }

    pub fn predict_map(&self, features: &HashMap<String, f64>) -> BoostResult<f64> {
        let row = self.reindex(features);
        self.model.predict_row(ArrayView1::from(&row[..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booster::BoostParams;
    use ndarray::{array, Array2};
    use tempfile::tempdir;

    fn artifact() -> ModelArtifact {
        let x = Array2::from_shape_vec((4, 2), vec![0.0, 1.0, 1.0, 1.0, 2.0, 0.0, 3.0, 0.0]).unwrap();
        let y = array![0.0, 0.0, 1.0, 1.0];
        let params = BoostParams {
            n_estimators: 20,
            subsample: 1.0,
            colsample_bytree: 1.0,
            ..Default::default()
        };
        let model = GradientBoostedRegressor::fit(x.view(), y.view(), &params).unwrap();
        ModelArtifact::new("can_send_all", vec!["a".into(), "b".into()], model).unwrap()
    }

    #[test]
    fn test_file_name() {
        assert_eq!(ModelArtifact::file_name("can_send_all"), "gbrt_can_send_all_model.json");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let a = artifact();
        let path = ModelArtifact::path_in(dir.path(), &a.target);
        a.save(&path).unwrap();
        let b = ModelArtifact::load(&path).unwrap();
        assert_eq!(b.feature_names, a.feature_names);
        let mut map = HashMap::new();
        map.insert("a".to_string(), 2.5);
        assert!((a.predict_map(&map).unwrap() - b.predict_map(&map).unwrap()).abs() < 1e-12);
    }

    #[test]
    fn test_reindex_fills_zero() {
        let a = artifact();
        let mut map = HashMap::new();
        map.insert("b".to_string(), 7.0);
        map.insert("unused".to_string(), 9.0);
        assert_eq!(a.reindex(&map), vec![0.0, 7.0]);
    }

    #[test]
    fn test_width_mismatch() {
        let a = artifact();
        assert!(ModelArtifact::new("x", vec!["only".into()], a.model).is_err());
    }
}
