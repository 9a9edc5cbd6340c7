//! Time-series feature extraction.
//!
//! Reduces each pass profile to a fixed set of SNR statistics. Extraction
//! is deterministic: the same profile always yields the same vector.
//!
//! # Degenerate Profiles
//!
//! - An empty profile is rejected with [`DatasetError::InsufficientSamples`].
//! - A single-sample profile has well-defined level statistics, but no
//!   interval or run, so outage time and slope are both 0.
//! - The sampling interval is the gap between the first two samples after
//!   sorting by time. Irregular sampling is not detected.

use lib_types::profile::{FeatureVector, ProfilePoint, ProfileRow, TimeSeriesProfile};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::{DatasetError, DatasetResult};
use crate::stats::{mean, percentile_sorted, sorted, std_dev};

/// SNR below which a sample counts as a fade (dB).
pub const FADE_THRESHOLD_DB: f64 = 0.0;

/// SNR below which a sample counts as an outage (dB).
pub const OUTAGE_THRESHOLD_DB: f64 = -2.0;

/// Guard on the slope denominator (seconds).
const SLOPE_EPSILON_S: f64 = 1e-6;

/// Extract the feature vector of one profile.
pub fn extract_features(profile: &TimeSeriesProfile) -> DatasetResult<FeatureVector> {
    extract_points(&profile.pass_id, &profile.points)
}

fn extract_points(pass_id: &str, points: &[ProfilePoint]) -> DatasetResult<FeatureVector> {
    if points.is_empty() {
        return Err(DatasetError::insufficient(
            format!("features of {}", pass_id),
            1,
            0,
        ));
    }

    let mut ordered = points.to_vec();
    ordered.sort_by(|a, b| a.t_s.total_cmp(&b.t_s));

    let snr: Vec<f64> = ordered.iter().map(|p| p.snr_db).collect();
    let snr_sorted = sorted(&snr);
    let pct = |q: f64| percentile_sorted(&snr_sorted, q).unwrap_or(f64::NAN);

    let fade_count = snr.iter().filter(|&&s| s < FADE_THRESHOLD_DB).count() as u32;
    let outage_samples = snr.iter().filter(|&&s| s < OUTAGE_THRESHOLD_DB).count();

    let (outage_time_s, snr_slope) = match (ordered.first(), ordered.get(1), ordered.last()) {
        (Some(first), Some(second), Some(last)) => {
            let interval = second.t_s - first.t_s;
            let run = last.t_s - first.t_s + SLOPE_EPSILON_S;
            (
                outage_samples as f64 * interval,
                (last.snr_db - first.snr_db) / run,
            )
        }
        _ => (0.0, 0.0),
    };

    Ok(FeatureVector {
        pass_id: pass_id.to_string(),
        snr_mean: mean(&snr).unwrap_or(f64::NAN),
        snr_min: snr_sorted[0],
        snr_max: snr_sorted[snr_sorted.len() - 1],
        snr_std: std_dev(&snr, 0).unwrap_or(0.0),
        snr_p10: pct(10.0),
        snr_p25: pct(25.0),
        snr_p50: pct(50.0),
        snr_p75: pct(75.0),
        snr_p90: pct(90.0),
        fade_count,
        outage_time_s,
        snr_slope,
    })
}

/// Group long-format profile rows by pass and extract every pass.
///
/// Output is ordered by pass identifier; row order within the input does
/// not matter.
pub fn extract_all(rows: &[ProfileRow]) -> DatasetResult<Vec<FeatureVector>> {
    let mut groups: BTreeMap<&str, Vec<ProfilePoint>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.pass_id.as_str()).or_default().push(row.point());
    }
    info!(passes = groups.len(), samples = rows.len(), "Extracting time-series features");

    let features = groups
        .into_iter()
        .map(|(pass_id, points)| extract_points(pass_id, &points))
        .collect::<DatasetResult<Vec<_>>>()?;

    debug!(count = features.len(), "Features extracted");
    Ok(features)
}

/// Extract features for already-assembled profiles, in the given order.
pub fn extract_profiles(profiles: &[TimeSeriesProfile]) -> DatasetResult<Vec<FeatureVector>> {
    profiles.iter().map(extract_features).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(t: f64, snr: f64) -> ProfilePoint {
        ProfilePoint {
            t_s: t,
            snr_db: snr,
            range_km: 800.0,
            elev_deg: 30.0,
        }
    }

    fn row(id: &str, t: f64, snr: f64) -> ProfileRow {
        ProfileRow {
            pass_id: id.to_string(),
            t_s: t,
            snr_db: snr,
            range_km: 800.0,
            elev_deg: 30.0,
        }
    }

    #[test]
    fn test_fade_outage_slope_scenario() {
        let profile = TimeSeriesProfile::new(
            "P",
            vec![point(0.0, 5.0), point(1.0, -3.0), point(2.0, -3.0), point(3.0, 5.0)],
        );
        let f = extract_features(&profile).unwrap();
        assert_eq!(f.fade_count, 2);
        assert_eq!(f.outage_time_s, 2.0);
        assert!(f.snr_slope.abs() < 1e-9);
        assert_eq!(f.snr_mean, 1.0);
        assert_eq!(f.snr_min, -3.0);
        assert_eq!(f.snr_max, 5.0);
        assert_eq!(f.snr_std, 4.0);
        assert_eq!(f.snr_p50, 1.0);
    }

    #[test]
    fn test_outage_scales_with_interval() {
        let profile = TimeSeriesProfile::new(
            "P",
            vec![point(0.0, -5.0), point(5.0, -5.0), point(10.0, 1.0)],
        );
        let f = extract_features(&profile).unwrap();
        assert_eq!(f.outage_time_s, 10.0);
        assert!((f.snr_slope - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let profile = TimeSeriesProfile::new(
            "P",
            (0..60).map(|i| point(i as f64 * 5.0, ((i * 37) % 23) as f64 - 8.0)).collect(),
        );
        assert_eq!(extract_features(&profile).unwrap(), extract_features(&profile).unwrap());
    }

    #[test]
    fn test_unsorted_input_is_time_ordered() {
        let shuffled = TimeSeriesProfile::new(
            "P",
            vec![point(3.0, 5.0), point(0.0, 1.0), point(2.0, -3.0), point(1.0, 2.0)],
        );
        let f = extract_features(&shuffled).unwrap();
        assert!((f.snr_slope - 4.0 / (3.0 + 1e-6)).abs() < 1e-12);
        assert_eq!(f.outage_time_s, 1.0);
    }

    #[test]
    fn test_single_sample_profile() {
        let f = extract_features(&TimeSeriesProfile::new("P", vec![point(0.0, -4.0)])).unwrap();
        assert_eq!(f.snr_mean, -4.0);
        assert_eq!(f.snr_std, 0.0);
        assert_eq!(f.fade_count, 1);
        assert_eq!(f.outage_time_s, 0.0);
        assert_eq!(f.snr_slope, 0.0);
    }

    #[test]
    fn test_empty_profile_rejected() {
        let err = extract_features(&TimeSeriesProfile::new("P", vec![])).unwrap_err();
        assert!(matches!(err, DatasetError::InsufficientSamples { .. }));
    }

    #[test]
    fn test_extract_all_groups_by_pass() {
        let rows = vec![
            row("B", 5.0, 2.0),
            row("A", 0.0, 1.0),
            row("B", 0.0, 4.0),
            row("A", 5.0, 3.0),
        ];
        let features = extract_all(&rows).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].pass_id, "A");
        assert_eq!(features[1].pass_id, "B");
        assert_eq!(features[0].snr_mean, 2.0);
        assert!(features[1].snr_slope < 0.0);
    }
}
