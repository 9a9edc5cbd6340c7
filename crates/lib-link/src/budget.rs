//! Radio link budget.
//!
//! Free-space path loss, rain and pointing losses, thermal noise, and the
//! Shannon-style conversion from SNR to an achievable bitrate. The
//! constants are illustrative rather than a validated RF model.
//!
//! The estimated SNR is clamped to `[SNR_FLOOR_DB, SNR_CEILING_DB]`. The
//! clamp stands in for receiver dropout and saturation; it is a modelling
//! choice, not a physical law.

use lib_types::pass::{EnvironmentSample, Modcod, OnboardState, PassGeometry, RadioConfig};
use lib_types::units::{db_to_linear, BitsPerSecond, Degrees, Hertz, Kilometers, SPEED_OF_LIGHT};
use rand::Rng;

use crate::sampling::gaussian;

/// Default system noise temperature (K).
pub const DEFAULT_SYSTEM_TEMP_K: f64 = 500.0;

/// Reference temperature for the thermal noise density (K).
const REFERENCE_TEMP_K: f64 = 290.0;

/// Thermal noise density at the reference temperature (dBm/Hz).
const THERMAL_NOISE_DBM_HZ: f64 = -174.0;

/// Lower bound on the estimated SNR (dB).
pub const SNR_FLOOR_DB: f64 = -15.0;

/// Upper bound on the estimated SNR (dB).
pub const SNR_CEILING_DB: f64 = 30.0;

/// Cap on the coded spectral efficiency (bits/s/Hz).
pub const MAX_SPECTRAL_EFFICIENCY: f64 = 6.0;

/// Fraction of the physical-layer rate left after protocol overhead.
pub const PROTOCOL_EFFICIENCY: f64 = 0.9;

/// Elevation band used for the rain slant-path secant (degrees).
const RAIN_ELEVATION_BAND: (f64, f64) = (1.0, 89.0);

/// Specific rain attenuation coefficient and frequency exponent.
const RAIN_COEFFICIENT: f64 = 0.02;
const RAIN_FREQUENCY_EXPONENT: f64 = 1.2;

/// Pointing loss per squared degree of error (dB/deg^2).
const POINTING_LOSS_PER_DEG2: f64 = 0.12;

/// SNR perturbation: Gaussian spread and pull towards the recent history.
const SNR_JITTER_STD_DB: f64 = 1.8;
const RECENT_SNR_WEIGHT: f64 = 0.3;
const RECENT_SNR_REFERENCE_DB: f64 = 8.0;

/// Free-space path loss in dB.
///
/// FSPL = 20*log10(4π d f / c), with d in metres.
#[inline]
pub fn free_space_path_loss_db(range: Kilometers, carrier: Hertz) -> f64 {
    20.0 * (4.0 * std::f64::consts::PI * range.as_meters() * carrier.0 / SPEED_OF_LIGHT).log10()
}

/// Rain attenuation along the slant path in dB.
///
/// Exactly zero for a dry ground station. Otherwise a power law in the
/// carrier frequency (GHz), linear in rain rate, scaled by the secant of
/// the elevation clamped to [1°, 89°].
pub fn rain_attenuation_db(rain_mm_hr: f64, carrier: Hertz, elevation: Degrees) -> f64 {
    if rain_mm_hr <= 0.0 {
        return 0.0;
    }

    let specific = RAIN_COEFFICIENT * carrier.as_ghz().powf(RAIN_FREQUENCY_EXPONENT) * rain_mm_hr;
    let elev = elevation.clamped(RAIN_ELEVATION_BAND.0, RAIN_ELEVATION_BAND.1);
    specific / elev.to_radians().cos()
}

/// Antenna mispointing loss in dB.
#[inline]
pub fn pointing_loss_db(error: Degrees) -> f64 {
    POINTING_LOSS_PER_DEG2 * error.0 * error.0
}

/// Thermal noise density in dBm/Hz for a system temperature.
#[inline]
pub fn noise_floor_dbhz(system_temp_k: f64) -> f64 {
    THERMAL_NOISE_DBM_HZ + 10.0 * (system_temp_k / REFERENCE_TEMP_K).log10()
}

/// Total noise power over a channel bandwidth in dBm.
#[inline]
pub fn noise_power_dbm(system_temp_k: f64, bandwidth: Hertz) -> f64 {
    noise_floor_dbhz(system_temp_k) + 10.0 * bandwidth.0.log10()
}

/// Achievable bitrate for an SNR, channel bandwidth and coding scheme.
///
/// Spectral efficiency is log2(1 + SNR) scaled by the coding efficiency and
/// capped at [`MAX_SPECTRAL_EFFICIENCY`]. Non-positive linear SNR (including
/// `-inf` dB) and NaN give a zero rate.
pub fn snr_to_bitrate(snr_db: f64, bandwidth: Hertz, modcod: Modcod) -> BitsPerSecond {
    let snr_linear = db_to_linear(snr_db);
    let shannon = if snr_linear > 0.0 {
        (1.0 + snr_linear).log2()
    } else {
        0.0
    };

    let coded = (shannon * modcod.coding_efficiency()).min(MAX_SPECTRAL_EFFICIENCY);
    BitsPerSecond(coded * bandwidth.0)
}

/// Bitrate left after protocol overhead.
#[inline]
pub fn payload_bitrate(snr_db: f64, bandwidth: Hertz, modcod: Modcod) -> BitsPerSecond {
    snr_to_bitrate(snr_db, bandwidth, modcod) * PROTOCOL_EFFICIENCY
}

/// Link budget for one pass, evaluated at the pass-mean geometry.
#[derive(Clone, Copy, Debug)]
pub struct LinkBudget {
    pub tx_power_dbm: f64,
    pub tx_gain_db: f64,
    pub rx_gain_db: f64,
    pub path_loss_db: f64,
    pub pointing_loss_db: f64,
    pub rain_loss_db: f64,
    pub noise_power_dbm: f64,
    /// Mean SNR seen over recent passes (dB).
    pub recent_mean_snr_db: f64,
}

impl LinkBudget {
    /// Build the budget from sampled pass parameters.
    ///
    /// Path loss uses the mean slant range and rain loss the mean elevation.
    pub fn for_pass(
        geometry: &PassGeometry,
        radio: &RadioConfig,
        environment: &EnvironmentSample,
        onboard: &OnboardState,
        system_temp_k: f64,
    ) -> Self {
        Self {
            tx_power_dbm: radio.tx_power_dbm,
            tx_gain_db: radio.tx_gain_db,
            rx_gain_db: radio.rx_gain_db,
            path_loss_db: free_space_path_loss_db(geometry.mean_range, radio.carrier),
            pointing_loss_db: pointing_loss_db(onboard.pointing_error),
            rain_loss_db: rain_attenuation_db(
                environment.rain_rate_mm_hr,
                radio.carrier,
                geometry.mean_elevation,
            ),
            noise_power_dbm: noise_power_dbm(system_temp_k, radio.bandwidth),
            recent_mean_snr_db: onboard.recent_mean_snr_db,
        }
    }

    /// Deterministic SNR before perturbation and clamping (dB).
    pub fn nominal_snr_db(&self) -> f64 {
        self.tx_power_dbm + self.tx_gain_db + self.rx_gain_db
            - self.path_loss_db
            - self.pointing_loss_db
            - self.rain_loss_db
            - self.noise_power_dbm
    }

    /// Perturbed and clamped SNR estimate for the pass (dB).
    pub fn estimate_snr_db<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let jitter = gaussian(rng, 0.0, SNR_JITTER_STD_DB);
        let history = RECENT_SNR_WEIGHT * (self.recent_mean_snr_db - RECENT_SNR_REFERENCE_DB);
        (self.nominal_snr_db() + jitter + history).clamp(SNR_FLOOR_DB, SNR_CEILING_DB)
    }
}
