//! Aggregated pass row generation.
//!
//! One row per simulated contact: the sampled parameter groups, the
//! link-budget SNR at the pass-mean geometry, the bytes the pass can carry,
//! and the two supervised targets derived from them.

use chrono::{DateTime, Duration, Utc};
use lib_types::pass::{
    round_to, DownlinkLabels, EnvironmentSample, OnboardState, PassGeometry, PassRow, RadioConfig,
};
use rand::Rng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::budget::{payload_bitrate, LinkBudget, DEFAULT_SYSTEM_TEMP_K};
use crate::error::{LinkError, LinkResult};
use crate::sampling::{gaussian, stream_rng, PassSampler};

/// Window after the epoch in which pass starts are drawn (seconds).
const START_OFFSET_RANGE_S: (f64, f64) = (60.0, 200_000.0);

/// Multiplicative jitter on the transferable bit count.
const BITS_JITTER_STD: f64 = 0.05;

/// Sampled parameters and link estimate for one pass.
#[derive(Clone, Copy, Debug)]
pub struct SimulatedPass {
    pub geometry: PassGeometry,
    pub radio: RadioConfig,
    pub environment: EnvironmentSample,
    pub onboard: OnboardState,
    pub budget: LinkBudget,
    /// Perturbed, clamped SNR at the pass-mean geometry (dB).
    pub snr_db: f64,
}

impl SimulatedPass {
    /// Sample every parameter group, then estimate the baseline SNR.
    pub fn sample<R: Rng + ?Sized>(sampler: &PassSampler, system_temp_k: f64, rng: &mut R) -> Self {
        let geometry = sampler.geometry(rng);
        let radio = sampler.radio(rng);
        let environment = sampler.environment(rng);
        let onboard = sampler.onboard(rng);

        let budget = LinkBudget::for_pass(&geometry, &radio, &environment, &onboard, system_temp_k);
        let snr_db = budget.estimate_snr_db(rng);

        Self {
            geometry,
            radio,
            environment,
            onboard,
            budget,
            snr_db,
        }
    }
}

/// Placeholder history column: recent SNR / 10 scaled by this pass's bytes.
///
/// Carries no physical meaning and is derived from the outcome, so it must
/// never be used as a model input.
pub fn historical_max_bytes(recent_mean_snr_db: f64, max_bytes: u64) -> i64 {
    if max_bytes == 0 {
        return 0;
    }
    ((recent_mean_snr_db / 10.0) * max_bytes as f64) as i64
}

/// Generator for the aggregated pass table.
#[derive(Clone, Debug)]
pub struct PassRowGenerator {
    sampler: PassSampler,
    system_temp_k: f64,
    epoch: DateTime<Utc>,
}

impl PassRowGenerator {
    /// Create a generator whose pass starts are offset from `epoch`.
    pub fn new(system_temp_k: f64, epoch: DateTime<Utc>) -> LinkResult<Self> {
        if !(system_temp_k.is_finite() && system_temp_k > 0.0) {
            return Err(LinkError::parameter(
                "system_temp_k",
                format!("must be positive, got {}", system_temp_k),
            ));
        }

        Ok(Self {
            sampler: PassSampler::new()?,
            system_temp_k,
            epoch,
        })
    }

    /// Generator at the default 500 K system temperature.
    pub fn with_epoch(epoch: DateTime<Utc>) -> LinkResult<Self> {
        Self::new(DEFAULT_SYSTEM_TEMP_K, epoch)
    }

    pub fn sampler(&self) -> &PassSampler {
        &self.sampler
    }

    pub fn system_temp_k(&self) -> f64 {
        self.system_temp_k
    }

    /// Generate the row for pass `index` (zero-based; ids start at `PASS_000001`).
    pub fn generate<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> PassRow {
        let pass = SimulatedPass::sample(&self.sampler, self.system_temp_k, rng);
        let SimulatedPass {
            geometry,
            radio,
            environment,
            onboard,
            snr_db,
            ..
        } = pass;

        let bitrate = payload_bitrate(snr_db, radio.bandwidth, radio.modcod);
        let bits = bitrate.bits_over(geometry.duration) * gaussian(rng, 1.0, BITS_JITTER_STD);
        let max_bytes = (bits / 8.0).floor().max(0.0) as u64;

        let payload = self.sampler.pass_payload(rng);
        let labels = DownlinkLabels::derive(max_bytes, payload);

        let offset = rng.gen_range(START_OFFSET_RANGE_S.0..START_OFFSET_RANGE_S.1) as i64;
        let start = self.epoch + Duration::seconds(offset);
        let end = start + Duration::seconds(i64::from(geometry.duration_s()));

        let priority = self.sampler.priority(rng);
        let local_time_of_day = rng.gen_range(0.0..23.0_f64) as u32;
        let day_of_year = rng.gen_range(1.0..365.0_f64) as u32;

        PassRow {
            pass_id: format!("PASS_{:06}", index + 1),
            pass_start_utc: start,
            pass_end_utc: end,
            pass_duration_s: geometry.duration_s(),
            max_elevation_deg: geometry.max_elevation.0,
            mean_elevation_deg: geometry.mean_elevation.0,
            range_km_at_max: geometry.range_at_max.0,
            mean_range_km: geometry.mean_range.0,
            doppler_rate_hz_s: geometry.doppler_rate_hz_s,
            tx_freq_hz: radio.carrier.0,
            tx_power_dbm: radio.tx_power_dbm,
            antenna_gain_tx_db: radio.tx_gain_db,
            antenna_gain_rx_db: radio.rx_gain_db,
            pointing_error_deg: onboard.pointing_error.0,
            modem_bandwidth_hz: radio.bandwidth.0 as u32,
            modem_modcod: radio.modcod,
            recent_mean_snr_db: onboard.recent_mean_snr_db,
            recent_snr_std_db: onboard.recent_snr_std_db,
            last_pass_packet_loss: onboard.last_pass_packet_loss,
            battery_voltage_v: onboard.battery_voltage_v,
            pa_temperature_c: onboard.pa_temperature_c,
            payload_size_bytes: payload,
            payload_priority_pct: priority,
            local_time_of_day,
            day_of_year,
            rain_rate_mmhr_at_gs: environment.rain_rate_mm_hr,
            cloud_cover_pct: environment.cloud_cover_pct,
            tec_total: environment.tec_total,
            kp_index: environment.kp_index,
            rfi_flag: u8::from(environment.rfi),
            historical_max_bytes: historical_max_bytes(onboard.recent_mean_snr_db, max_bytes),
            max_bytes_transferable: max_bytes,
            can_send_all: u8::from(labels.can_send_all),
            recommended_compression_ratio: round_to(labels.compression_ratio, 4),
            predicted_mean_snr_db: snr_db,
        }
    }

    /// Generate `count` rows in parallel, one random stream per pass.
    pub fn generate_batch(&self, count: usize, seed: u64) -> Vec<PassRow> {
        info!(count, seed, "Generating aggregated passes");

        let rows: Vec<PassRow> = (0..count)
            .into_par_iter()
            .map(|i| {
                let mut rng = stream_rng(seed, i as u64);
                self.generate(i, &mut rng)
            })
            .collect();

        let full = rows.iter().filter(|r| r.sends_all()).count();
        debug!(full, partial = count - full, "Aggregated passes generated");
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_rejects_nonpositive_temperature() {
        assert!(PassRowGenerator::new(0.0, epoch()).is_err());
        assert!(PassRowGenerator::new(f64::NAN, epoch()).is_err());
    }

    #[test]
    fn test_labels_consistent_for_all_rows() {
        let gen = PassRowGenerator::with_epoch(epoch()).unwrap();
        let rows = gen.generate_batch(2000, 42);
        assert_eq!(rows.len(), 2000);
        for row in &rows {
            assert!(row.labels_consistent(), "{}", row.pass_id);
            assert_eq!(row.can_send_all == 1, row.max_bytes_transferable >= row.payload_size_bytes);
            assert!((-15.0..=30.0).contains(&row.predicted_mean_snr_db));
        }
        // Both classes show up in a batch of this size.
        assert!(rows.iter().any(|r| r.sends_all()));
        assert!(rows.iter().any(|r| !r.sends_all()));
    }

    #[test]
    fn test_ids_and_timestamps() {
        let gen = PassRowGenerator::with_epoch(epoch()).unwrap();
        let rows = gen.generate_batch(3, 1);
        assert_eq!(rows[0].pass_id, "PASS_000001");
        assert_eq!(rows[2].pass_id, "PASS_000003");
        for row in &rows {
            let offset = (row.pass_start_utc - epoch()).num_seconds();
            assert!((60..200_000).contains(&offset));
            let length = (row.pass_end_utc - row.pass_start_utc).num_seconds();
            assert_eq!(length, i64::from(row.pass_duration_s));
        }
    }

    #[test]
    fn test_batch_is_deterministic() {
        let gen = PassRowGenerator::with_epoch(epoch()).unwrap();
        assert_eq!(gen.generate_batch(50, 7), gen.generate_batch(50, 7));
        assert_ne!(gen.generate_batch(5, 7), gen.generate_batch(5, 8));
    }

    #[test]
    fn test_historical_max_bytes() {
        assert_eq!(historical_max_bytes(8.0, 0), 0);
        assert_eq!(historical_max_bytes(5.0, 1000), 500);
        assert_eq!(historical_max_bytes(-2.5, 1000), -250);
    }
}
