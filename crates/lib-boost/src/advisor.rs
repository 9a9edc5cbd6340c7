//! Turning model outputs into a downlink decision.

use std::collections::HashMap;
use std::fmt;

use crate::artifact::ModelArtifact;
use crate::error::BoostResult;

/// Raw `can_send_all` prediction at or above which data goes uncompressed.
pub const SEND_ALL_THRESHOLD: f64 = 0.5;
pub const MIN_COMPRESSION_RATIO: f64 = 0.05;
pub const MAX_COMPRESSION_RATIO: f64 = 1.0;

/// Outcome for one pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Recommendation {
    pub can_send_raw: f64,
    pub can_send_all: bool,
    /// Present only when compression is needed.
    pub compression_ratio: Option<f64>,
}

impl Recommendation {
    /// Decide from raw predictions.
    pub fn from_predictions(can_send_raw: f64, ratio_raw: f64) -> Self {
        let can_send_all = can_send_raw >= SEND_ALL_THRESHOLD;
        let compression_ratio = if can_send_all {
            None
        } else if ratio_raw.is_nan() {
            Some(MIN_COMPRESSION_RATIO)
        } else {
            Some(ratio_raw.clamp(MIN_COMPRESSION_RATIO, MAX_COMPRESSION_RATIO))
        };
        Self {
            can_send_raw,
            can_send_all,
            compression_ratio,
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.compression_ratio {
            None => write!(f, "Can send all data: yes (score {:.3})", self.can_send_raw),
            Some(r) => write!(
                f,
                "Can send all data: no (score {:.3}); recommended compression ratio {:.4}",
                self.can_send_raw, r
            ),
        }
    }
}

/// The pair of models behind a recommendation.
pub struct DownlinkAdvisor {
    can_send: ModelArtifact,
    ratio: ModelArtifact,
}

impl DownlinkAdvisor {
    pub fn new(can_send: ModelArtifact, ratio: ModelArtifact) -> Self {
        Self { can_send, ratio }
    }

    pub fn recommend(&self, features: &HashMap<String, f64>) -> BoostResult<Recommendation> {
        let can_send_raw = self.can_send.predict_map(features)?;
        let ratio_raw = self.ratio.predict_map(features)?;
        Ok(Recommendation::from_predictions(can_send_raw, ratio_raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booster::GradientBoostedRegressor;

    fn constant(target: &str, value: f64) -> ModelArtifact {
        let model = GradientBoostedRegressor {
            base_score: value,
            n_features: 1,
            trees: Vec::new(),
        };
        ModelArtifact::new(target, vec!["snr_mean".into()], model).unwrap()
    }

    #[test]
    fn test_threshold() {
        assert!(Recommendation::from_predictions(0.5, 0.2).can_send_all);
        let r = Recommendation::from_predictions(0.49, 0.2);
        assert!(!r.can_send_all);
        assert_eq!(r.compression_ratio, Some(0.2));
    }

    #[test]
    fn test_ratio_clamped() {
        assert_eq!(Recommendation::from_predictions(0.0, -0.3).compression_ratio, Some(0.05));
        assert_eq!(Recommendation::from_predictions(0.0, 1.7).compression_ratio, Some(1.0));
    }

    #[test]
    fn test_advisor() {
        let advisor = DownlinkAdvisor::new(constant("can_send_all", 0.1), constant("recommended_compression_ratio", 0.42));
        let rec = advisor.recommend(&HashMap::new()).unwrap();
        assert_eq!(rec.compression_ratio, Some(0.42));
        assert!(rec.to_string().contains("0.4200"));
    }
}
