//! Stochastic parameter samplers.
//!
//! Each sampler draws one parameter group from fixed distributions and
//! clamps every field into a plausible band. Samplers read nothing but the
//! random source passed to them.

use lib_types::pass::{EnvironmentSample, Modcod, OnboardState, PassGeometry, RadioConfig};
use lib_types::units::{Degrees, Hertz, Kilometers, Seconds};
use rand::distributions::Slice;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Beta, Distribution, StandardNormal, WeightedIndex};

use crate::error::{LinkError, LinkResult};

/// Carrier frequencies: UHF and S-band.
pub const CARRIER_FREQUENCIES_HZ: [f64; 2] = [437e6, 2.2e9];

/// Channel bandwidths (Hz).
pub const CHANNEL_BANDWIDTHS_HZ: [f64; 3] = [125e3, 250e3, 500e3];

/// Payload sizes for aggregated passes (bytes).
pub const PASS_PAYLOAD_SIZES: [u64; 5] = [
    10_000_000,
    100_000_000,
    1_000_000_000,
    5_000_000_000,
    10_000_000_000,
];

/// Payload sizes for time-series passes (bytes).
pub const PROFILE_PAYLOAD_SIZES: [u64; 4] =
    [10_000_000, 100_000_000, 1_000_000_000, 5_000_000_000];

/// Payload priority shares.
pub const PAYLOAD_PRIORITIES: [f64; 4] = [0.1, 0.2, 0.3, 0.5];

/// Rain intensity categories (mm/hr) and their weights.
const RAIN_RATES: [f64; 7] = [0.0, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0];
const RAIN_WEIGHTS: [f64; 7] = [0.55, 0.15, 0.10, 0.08, 0.06, 0.04, 0.02];

/// Kp index weights for 0..=4.
const KP_WEIGHTS: [f64; 5] = [0.4, 0.3, 0.2, 0.08, 0.02];

/// Probability that a pass sees interference.
const RFI_PROBABILITY: f64 = 0.03;

/// Draw from N(mean, std) using the standard normal.
#[inline]
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: f64, std: f64) -> f64 {
    let z: f64 = StandardNormal.sample(rng);
    mean + std * z
}

/// Independent random stream for one pass of a seeded batch.
///
/// Streams share the seed and differ only in the stream number, so a batch
/// is reproducible regardless of how passes are spread across threads.
pub fn stream_rng(seed: u64, stream: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

/// Samplers for every parameter group of a pass.
///
/// Distributions with parameters are built once; the sampler itself is
/// immutable and can be shared across threads.
#[derive(Clone, Debug)]
pub struct PassSampler {
    elevation_shape: Beta<f64>,
    packet_loss: Beta<f64>,
    rain: WeightedIndex<f64>,
    kp: WeightedIndex<f64>,
    carrier: Slice<'static, f64>,
    bandwidth: Slice<'static, f64>,
    modcod: Slice<'static, Modcod>,
    pass_payload: Slice<'static, u64>,
    profile_payload: Slice<'static, u64>,
    priority: Slice<'static, f64>,
}

impl PassSampler {
    pub fn new() -> LinkResult<Self> {
        Ok(Self {
            elevation_shape: Beta::new(2.0, 2.0)
                .map_err(|e| LinkError::distribution("elevation beta", e))?,
            packet_loss: Beta::new(1.5, 30.0)
                .map_err(|e| LinkError::distribution("packet loss beta", e))?,
            rain: WeightedIndex::new(RAIN_WEIGHTS)
                .map_err(|e| LinkError::distribution("rain rate", e))?,
            kp: WeightedIndex::new(KP_WEIGHTS).map_err(|e| LinkError::distribution("kp index", e))?,
            carrier: choice("carrier", &CARRIER_FREQUENCIES_HZ)?,
            bandwidth: choice("bandwidth", &CHANNEL_BANDWIDTHS_HZ)?,
            modcod: choice("modcod", &Modcod::ALL)?,
            pass_payload: choice("pass payload", &PASS_PAYLOAD_SIZES)?,
            profile_payload: choice("profile payload", &PROFILE_PAYLOAD_SIZES)?,
            priority: choice("payload priority", &PAYLOAD_PRIORITIES)?,
        })
    }

    /// Payload size for an aggregated pass (bytes).
    pub fn pass_payload<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        *self.pass_payload.sample(rng)
    }

    /// Payload size for a time-series pass (bytes).
    pub fn profile_payload<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        *self.profile_payload.sample(rng)
    }

    pub fn priority<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        *self.priority.sample(rng)
    }

    /// Pass geometry.
    ///
    /// Range at maximum elevation falls linearly with elevation (1200 km at
    /// the horizon, 300 km overhead) plus 50 km of scatter.
    pub fn geometry<R: Rng + ?Sized>(&self, rng: &mut R) -> PassGeometry {
        let duration = rng.gen_range(180.0..600.0_f64).trunc();

        let max_elev = (self.elevation_shape.sample(rng) * 80.0 + 5.0).clamp(5.0, 90.0);
        // max_elev >= 5, so the inclusive range is never empty.
        let mean_elev = rng.gen_range(5.0..=max_elev);

        let range_at_max =
            (1200.0 - (max_elev / 90.0) * 900.0 + gaussian(rng, 0.0, 50.0)).clamp(300.0, 1400.0);
        let mean_range = (range_at_max + gaussian(rng, 50.0, 75.0)).clamp(300.0, 1700.0);
        let doppler = gaussian(rng, 0.0, 200.0);

        PassGeometry {
            duration: Seconds(duration),
            max_elevation: Degrees(max_elev),
            mean_elevation: Degrees(mean_elev),
            range_at_max: Kilometers(round2(range_at_max)),
            mean_range: Kilometers(round2(mean_range)),
            doppler_rate_hz_s: round2(doppler),
        }
    }

    /// Radio and antenna configuration.
    pub fn radio<R: Rng + ?Sized>(&self, rng: &mut R) -> RadioConfig {
        RadioConfig {
            carrier: Hertz(*self.carrier.sample(rng)),
            tx_power_dbm: rng.gen_range(12.0..28.0),
            tx_gain_db: rng.gen_range(3.0..8.0),
            rx_gain_db: rng.gen_range(10.0..18.0),
            bandwidth: Hertz(*self.bandwidth.sample(rng)),
            modcod: *self.modcod.sample(rng),
        }
    }

    /// Ground weather and space weather. Cloud cover and TEC rise with rain.
    pub fn environment<R: Rng + ?Sized>(&self, rng: &mut R) -> EnvironmentSample {
        let rain = RAIN_RATES[self.rain.sample(rng)];
        let cloud = gaussian(rng, 50.0 + rain * 5.0, 20.0).clamp(0.0, 100.0);
        let tec = gaussian(rng, 10.0 + rain * 0.5, 5.0).clamp(1.0, 80.0);
        let kp = self.kp.sample(rng) as u8;
        let rfi = rng.gen_bool(RFI_PROBABILITY);

        EnvironmentSample {
            rain_rate_mm_hr: rain,
            cloud_cover_pct: cloud,
            tec_total: tec,
            kp_index: kp,
            rfi,
        }
    }

    /// Spacecraft state, each field independent.
    pub fn onboard<R: Rng + ?Sized>(&self, rng: &mut R) -> OnboardState {
        OnboardState {
            battery_voltage_v: gaussian(rng, 7.4, 0.3).clamp(6.6, 8.6),
            pa_temperature_c: gaussian(rng, 45.0, 12.0).clamp(-10.0, 90.0),
            pointing_error: Degrees(gaussian(rng, 0.8, 0.9).clamp(0.0, 6.0)),
            recent_mean_snr_db: gaussian(rng, 8.0, 4.5).clamp(-5.0, 25.0),
            recent_snr_std_db: gaussian(rng, 1.8, 1.2).clamp(0.1, 8.0),
            last_pass_packet_loss: self.packet_loss.sample(rng).clamp(0.0, 0.4),
        }
    }
}

fn choice<T>(name: &'static str, items: &'static [T]) -> LinkResult<Slice<'static, T>> {
    Slice::new(items).map_err(|e| LinkError::distribution(name, e))
}

#[inline]
fn round2(value: f64) -> f64 {
    lib_types::pass::round_to(value, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (PassSampler, ChaCha8Rng) {
        (PassSampler::new().unwrap(), ChaCha8Rng::seed_from_u64(42))
    }

    #[test]
    fn test_geometry_bounds() {
        let (sampler, mut rng) = fixture();
        for _ in 0..2000 {
            let g = sampler.geometry(&mut rng);
            assert!((180.0..600.0).contains(&g.duration.0));
            assert_eq!(g.duration.0.fract(), 0.0);
            assert!((5.0..=90.0).contains(&g.max_elevation.0));
            assert!(g.mean_elevation.0 >= 5.0 && g.mean_elevation.0 <= g.max_elevation.0);
            assert!((300.0..=1400.0).contains(&g.range_at_max.0));
            assert!((300.0..=1700.0).contains(&g.mean_range.0));
        }
    }

    #[test]
    fn test_range_falls_with_elevation() {
        let (sampler, mut rng) = fixture();
        let mut low = (0.0, 0usize);
        let mut high = (0.0, 0usize);
        for _ in 0..5000 {
            let g = sampler.geometry(&mut rng);
            if g.max_elevation.0 < 30.0 {
                low = (low.0 + g.range_at_max.0, low.1 + 1);
            } else if g.max_elevation.0 > 60.0 {
                high = (high.0 + g.range_at_max.0, high.1 + 1);
            }
        }
        assert!(low.1 > 0 && high.1 > 0);
        assert!(low.0 / low.1 as f64 > high.0 / high.1 as f64);
    }

    #[test]
    fn test_radio_draws_from_fixed_sets() {
        let (sampler, mut rng) = fixture();
        for _ in 0..500 {
            let r = sampler.radio(&mut rng);
            assert!(CARRIER_FREQUENCIES_HZ.contains(&r.carrier.0));
            assert!(CHANNEL_BANDWIDTHS_HZ.contains(&r.bandwidth.0));
            assert!((12.0..28.0).contains(&r.tx_power_dbm));
            assert!((3.0..8.0).contains(&r.tx_gain_db));
            assert!((10.0..18.0).contains(&r.rx_gain_db));
        }
    }

    #[test]
    fn test_payload_choices() {
        let (sampler, mut rng) = fixture();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            let payload = sampler.pass_payload(&mut rng);
            assert!(PASS_PAYLOAD_SIZES.contains(&payload));
            seen.insert(payload);
            assert!(PROFILE_PAYLOAD_SIZES.contains(&sampler.profile_payload(&mut rng)));
            assert!(PAYLOAD_PRIORITIES.contains(&sampler.priority(&mut rng)));
        }
        assert_eq!(seen.len(), PASS_PAYLOAD_SIZES.len());
    }

    #[test]
    fn test_environment_bounds() {
        let (sampler, mut rng) = fixture();
        let mut dry = 0;
        for _ in 0..2000 {
            let e = sampler.environment(&mut rng);
            assert!(RAIN_RATES.contains(&e.rain_rate_mm_hr));
            assert!((0.0..=100.0).contains(&e.cloud_cover_pct));
            assert!((1.0..=80.0).contains(&e.tec_total));
            assert!(e.kp_index <= 4);
            if e.rain_rate_mm_hr == 0.0 {
                dry += 1;
            }
        }
        // Weight 0.55 for a dry station.
        assert!((900..1300).contains(&dry));
    }

    #[test]
    fn test_onboard_bounds() {
        let (sampler, mut rng) = fixture();
        for _ in 0..2000 {
            let o = sampler.onboard(&mut rng);
            assert!((6.6..=8.6).contains(&o.battery_voltage_v));
            assert!((-10.0..=90.0).contains(&o.pa_temperature_c));
            assert!((0.0..=6.0).contains(&o.pointing_error.0));
            assert!((-5.0..=25.0).contains(&o.recent_mean_snr_db));
            assert!((0.1..=8.0).contains(&o.recent_snr_std_db));
            assert!((0.0..=0.4).contains(&o.last_pass_packet_loss));
        }
    }

    #[test]
    fn test_same_seed_same_draws() {
        let sampler = PassSampler::new().unwrap();
        let mut a = ChaCha8Rng::seed_from_u64(9);
        let mut b = ChaCha8Rng::seed_from_u64(9);
        assert_eq!(sampler.geometry(&mut a), sampler.geometry(&mut b));
        assert_eq!(sampler.onboard(&mut a), sampler.onboard(&mut b));
    }

    #[test]
    fn test_streams_are_independent() {
        let a: u64 = stream_rng(42, 0).gen();
        let b: u64 = stream_rng(42, 1).gen();
        let a_again: u64 = stream_rng(42, 0).gen();
        assert_ne!(a, b);
        assert_eq!(a, a_again);
    }
}
