//! Time-series profile generation.
//!
//! Each profile starts from the same baseline SNR as an aggregated pass and
//! adds a parabolic elevation bump peaking at mid-pass, per-sample jitter,
//! and rare deep fades when the pass sees interference. Transferable bytes
//! are integrated over the per-sample SNR so fades cost throughput.

use lib_types::pass::{round_to, DownlinkLabels, TimeSeriesMeta};
use lib_types::profile::{ProfilePoint, TimeSeriesProfile};
use lib_types::units::Seconds;
use rand::Rng;
use rayon::prelude::*;
use tracing::info;

use crate::budget::payload_bitrate;
use crate::error::{LinkError, LinkResult};
use crate::pass_gen::SimulatedPass;
use crate::sampling::{gaussian, stream_rng, PassSampler};

/// Default sampling interval (seconds).
pub const DEFAULT_SAMPLING_INTERVAL_S: u32 = 5;

/// Peak SNR gain of the elevation bump (dB).
const ELEVATION_BUMP_DB: f64 = 2.5;

/// Per-sample SNR jitter (dB).
const SAMPLE_JITTER_STD_DB: f64 = 1.5;

/// Per-sample fade probability on passes with interference.
const FADE_PROBABILITY: f64 = 0.02;

/// Fade depth range (dB).
const FADE_DEPTH_DB: (f64, f64) = (3.0, 12.0);

const RANGE_JITTER_STD_KM: f64 = 20.0;
const ELEVATION_JITTER_STD_DEG: f64 = 3.0;
const MIN_ELEVATION_DEG: f64 = 0.1;

/// A generated pass: summary record plus its sample trace.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratedProfile {
    pub meta: TimeSeriesMeta,
    pub profile: TimeSeriesProfile,
}

/// SNR gain from elevation at offset `t` into a pass of length `duration`.
///
/// Parabolic in the normalised offset from mid-pass: full gain at the
/// midpoint, zero at both edges.
pub fn elevation_bump_db(t: f64, duration: f64) -> f64 {
    let half = duration / 2.0;
    if half <= 0.0 {
        return 0.0;
    }
    let frac = (t - half) / half;
    ELEVATION_BUMP_DB * (1.0 - frac * frac).max(0.0)
}

/// SNR offset of a deep fade for one sample (dB, zero or negative).
///
/// Only passes with interference fade. No randomness is consumed otherwise.
pub fn fade_db<R: Rng + ?Sized>(rng: &mut R, rfi: bool) -> f64 {
    if rfi && rng.gen_bool(FADE_PROBABILITY) {
        -rng.gen_range(FADE_DEPTH_DB.0..=FADE_DEPTH_DB.1)
    } else {
        0.0
    }
}

/// Generator for time-series passes.
#[derive(Clone, Debug)]
pub struct ProfileGenerator {
    sampler: PassSampler,
    system_temp_k: f64,
    interval_s: u32,
}

impl ProfileGenerator {
    pub fn new(system_temp_k: f64, interval_s: u32) -> LinkResult<Self> {
        if interval_s == 0 {
            return Err(LinkError::parameter("interval_s", "sampling interval must be non-zero"));
        }
        if !(system_temp_k.is_finite() && system_temp_k > 0.0) {
            return Err(LinkError::parameter(
                "system_temp_k",
                format!("must be positive, got {}", system_temp_k),
            ));
        }

        Ok(Self {
            sampler: PassSampler::new()?,
            system_temp_k,
            interval_s,
        })
    }

    pub fn interval(&self) -> Seconds {
        Seconds(f64::from(self.interval_s))
    }

    /// Generate pass `index` (zero-based; ids start at `TS_PASS_00000`).
    pub fn generate<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> GeneratedProfile {
        let pass = SimulatedPass::sample(&self.sampler, self.system_temp_k, rng);
        let pass_id = format!("TS_PASS_{:05}", index);

        let duration_s = pass.geometry.duration_s();
        let duration = f64::from(duration_s);
        let rfi = pass.environment.rfi;

        let mut points = Vec::with_capacity((duration_s / self.interval_s + 1) as usize);
        for t in (0..duration_s).step_by(self.interval_s as usize) {
            let t = f64::from(t);
            let bump = elevation_bump_db(t, duration);
            let fade = fade_db(rng, rfi);
            let jitter = gaussian(rng, 0.0, SAMPLE_JITTER_STD_DB);
            let snr = pass.snr_db + bump + jitter + fade;

            let range = pass.geometry.range_at_max.0 + gaussian(rng, 0.0, RANGE_JITTER_STD_KM);
            let elev = (pass.geometry.mean_elevation.0
                + gaussian(rng, 0.0, ELEVATION_JITTER_STD_DEG))
            .max(MIN_ELEVATION_DEG);

            points.push(ProfilePoint {
                t_s: t,
                snr_db: round_to(snr, 3),
                range_km: round_to(range, 2),
                elev_deg: round_to(elev, 2),
            });
        }

        let max_bytes = self.transferable_bytes(&pass, &points);
        let payload = self.sampler.profile_payload(rng);
        let labels = DownlinkLabels::derive(max_bytes, payload);

        let meta = TimeSeriesMeta {
            pass_id: pass_id.clone(),
            pass_duration_s: duration_s,
            max_elevation_deg: pass.geometry.max_elevation.0,
            tx_freq_hz: pass.radio.carrier.0,
            tx_power_dbm: pass.radio.tx_power_dbm,
            modem_bandwidth_hz: pass.radio.bandwidth.0 as u32,
            recent_mean_snr_db: pass.onboard.recent_mean_snr_db,
            rain_rate_mmhr_at_gs: pass.environment.rain_rate_mm_hr,
            battery_voltage_v: pass.onboard.battery_voltage_v,
            pa_temperature_c: pass.onboard.pa_temperature_c,
            payload_size_bytes: payload,
            max_bytes_transferable: max_bytes,
            can_send_all: u8::from(labels.can_send_all),
            recommended_compression_ratio: round_to(labels.compression_ratio, 4),
        };

        GeneratedProfile {
            meta,
            profile: TimeSeriesProfile::new(pass_id, points),
        }
    }

    /// Bytes carried over the profile, integrating per-sample bitrate.
    fn transferable_bytes(&self, pass: &SimulatedPass, points: &[ProfilePoint]) -> u64 {
        let bits: f64 = points
            .iter()
            .map(|p| {
                payload_bitrate(p.snr_db, pass.radio.bandwidth, pass.radio.modcod)
                    .bits_over(self.interval())
            })
            .sum();
        (bits / 8.0).floor().max(0.0) as u64
    }

    /// Generate `count` profiles in parallel, one random stream per pass.
    pub fn generate_batch(&self, count: usize, seed: u64) -> Vec<GeneratedProfile> {
        info!(count, seed, interval_s = self.interval_s, "Generating time-series passes");

        (0..count)
            .into_par_iter()
            .map(|i| {
                let mut rng = stream_rng(seed, i as u64);
                self.generate(i, &mut rng)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::DEFAULT_SYSTEM_TEMP_K;

    fn generator() -> ProfileGenerator {
        ProfileGenerator::new(DEFAULT_SYSTEM_TEMP_K, DEFAULT_SAMPLING_INTERVAL_S).unwrap()
    }

    #[test]
    fn test_bump_shape() {
        assert_eq!(elevation_bump_db(0.0, 300.0), 0.0);
        assert_eq!(elevation_bump_db(300.0, 300.0), 0.0);
        assert!((elevation_bump_db(150.0, 300.0) - 2.5).abs() < 1e-12);
        assert!((elevation_bump_db(75.0, 300.0) - 1.875).abs() < 1e-12);
        assert_eq!(elevation_bump_db(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_no_fades_without_interference() {
        let mut rng = stream_rng(5, 0);
        assert!((0..10_000).all(|_| fade_db(&mut rng, false) == 0.0));
    }

    #[test]
    fn test_interference_fades_are_rare_and_deep() {
        let mut rng = stream_rng(5, 1);
        let fades: Vec<f64> = (0..10_000)
            .map(|_| fade_db(&mut rng, true))
            .filter(|&f| f != 0.0)
            .collect();
        // 2% of 10k draws.
        assert!((120..=280).contains(&fades.len()), "got {} fades", fades.len());
        assert!(fades.iter().all(|f| (-12.0..=-3.0).contains(f)));
    }

    #[test]
    fn test_rejects_zero_interval() {
        assert!(ProfileGenerator::new(500.0, 0).is_err());
    }

    #[test]
    fn test_profile_sampling_grid() {
        let gen = generator();
        let profiles = gen.generate_batch(20, 3);
        for (i, g) in profiles.iter().enumerate() {
            assert_eq!(g.profile.pass_id, format!("TS_PASS_{:05}", i));
            assert_eq!(g.meta.pass_id, g.profile.pass_id);

            let duration = g.meta.pass_duration_s;
            let expected = ((duration + 4) / 5) as usize;
            assert_eq!(g.profile.len(), expected);
            for (k, p) in g.profile.points.iter().enumerate() {
                assert_eq!(p.t_s, (k * 5) as f64);
                assert!(p.t_s < f64::from(duration));
                assert!(p.elev_deg >= 0.1);
            }
        }
    }

    #[test]
    fn test_meta_labels() {
        let gen = generator();
        for g in gen.generate_batch(200, 11) {
            let m = &g.meta;
            assert!((0.0..=1.0).contains(&m.recommended_compression_ratio));
            assert_eq!(m.can_send_all == 1, m.max_bytes_transferable >= m.payload_size_bytes);
            if m.can_send_all == 1 {
                assert_eq!(m.recommended_compression_ratio, 1.0);
            }
        }
    }

    #[test]
    fn test_bytes_follow_sample_snr() {
        let gen = generator();
        let mut rng = stream_rng(5, 0);
        let pass = SimulatedPass::sample(&gen.sampler, 500.0, &mut rng);
        let strong = vec![ProfilePoint { t_s: 0.0, snr_db: 10.0, range_km: 0.0, elev_deg: 0.0 }; 10];
        let mut faded = strong.clone();
        faded[3].snr_db = -10.0;
        assert!(gen.transferable_bytes(&pass, &strong) > gen.transferable_bytes(&pass, &faded));
    }
}
