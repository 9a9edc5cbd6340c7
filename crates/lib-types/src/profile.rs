//! Per-pass time-series profiles and the features extracted from them.
//!
//! # Sample Semantics
//!
//! A profile is an ordered list of point measurements taken at a fixed
//! interval from the start of the pass. Sample `i` is taken at
//! `t_s = i * interval`; the last sample is strictly before the pass end.

use serde::{Deserialize, Serialize};

/// One measurement inside a pass.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfilePoint {
    /// Seconds since the start of the pass.
    pub t_s: f64,
    pub snr_db: f64,
    pub range_km: f64,
    pub elev_deg: f64,
}

/// A complete time-series profile for one pass.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct TimeSeriesProfile {
    pub pass_id: String,
    pub points: Vec<ProfilePoint>,
}

impl TimeSeriesProfile {
    pub fn new(pass_id: impl Into<String>, points: Vec<ProfilePoint>) -> Self {
        Self {
            pass_id: pass_id.into(),
            points,
        }
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// SNR trace in sample order.
    pub fn snr_trace(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.snr_db).collect()
    }

    /// Flatten into CSV rows.
    pub fn to_rows(&self) -> Vec<ProfileRow> {
        self.points
            .iter()
            .map(|p| ProfileRow {
                pass_id: self.pass_id.clone(),
                t_s: p.t_s,
                snr_db: p.snr_db,
                range_km: p.range_km,
                elev_deg: p.elev_deg,
            })
            .collect()
    }
}

/// Long-format CSV row of `timeseries_passes_profiles.csv`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileRow {
    pub pass_id: String,
    pub t_s: f64,
    pub snr_db: f64,
    pub range_km: f64,
    pub elev_deg: f64,
}

impl ProfileRow {
    pub fn point(&self) -> ProfilePoint {
        ProfilePoint {
            t_s: self.t_s,
            snr_db: self.snr_db,
            range_km: self.range_km,
            elev_deg: self.elev_deg,
        }
    }
}

/// Fixed-size statistical descriptor of one profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub pass_id: String,
    pub snr_mean: f64,
    pub snr_min: f64,
    pub snr_max: f64,
    pub snr_std: f64,
    pub snr_p10: f64,
    pub snr_p25: f64,
    pub snr_p50: f64,
    pub snr_p75: f64,
    pub snr_p90: f64,
    /// Samples below 0 dB.
    pub fade_count: u32,
    /// Time spent below -2 dB.
    pub outage_time_s: f64,
    /// End-to-end SNR slope (dB/s).
    pub snr_slope: f64,
}

impl FeatureVector {
    /// Feature column names, identifier excluded, in CSV order.
    pub const FEATURE_COLUMNS: [&'static str; 12] = [
        "snr_mean",
        "snr_min",
        "snr_max",
        "snr_std",
        "snr_p10",
        "snr_p25",
        "snr_p50",
        "snr_p75",
        "snr_p90",
        "fade_count",
        "outage_time_s",
        "snr_slope",
    ];
}
