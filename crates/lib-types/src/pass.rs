//! Pass-level records: sampled parameter groups and the aggregated pass row.
//!
//! Field names on the serialisable rows are the CSV column names consumed by
//! the training step, so renames here are breaking changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::units::{Degrees, Hertz, Kilometers, Seconds};

/// Modulation and coding scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Modcod {
    #[serde(rename = "BPSK-1/2")]
    BpskHalf,
    #[serde(rename = "QPSK-1/2")]
    QpskHalf,
    #[serde(rename = "QPSK-3/4")]
    QpskThreeQuarters,
}

impl Modcod {
    /// All schemes, in lexicographic order of their labels.
    pub const ALL: [Modcod; 3] = [Modcod::BpskHalf, Modcod::QpskHalf, Modcod::QpskThreeQuarters];

    /// Label as written to CSV.
    pub fn label(&self) -> &'static str {
        match self {
            Self::BpskHalf => "BPSK-1/2",
            Self::QpskHalf => "QPSK-1/2",
            Self::QpskThreeQuarters => "QPSK-3/4",
        }
    }

    /// Parse a CSV label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label() == label)
    }

    /// Whether this scheme belongs to the BPSK family.
    pub fn is_bpsk(&self) -> bool {
        matches!(self, Self::BpskHalf)
    }

    /// Fraction of Shannon capacity the scheme realises.
    pub fn coding_efficiency(&self) -> f64 {
        if self.is_bpsk() {
            0.45
        } else {
            0.6
        }
    }

    /// Integer code used when the scheme is fed to a model as a numeric feature.
    pub fn category_code(&self) -> u8 {
        match self {
            Self::BpskHalf => 0,
            Self::QpskHalf => 1,
            Self::QpskThreeQuarters => 2,
        }
    }
}

impl fmt::Display for Modcod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Geometry of a single contact window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PassGeometry {
    pub duration: Seconds,
    pub max_elevation: Degrees,
    pub mean_elevation: Degrees,
    /// Slant range at maximum elevation.
    pub range_at_max: Kilometers,
    pub mean_range: Kilometers,
    /// Doppler rate in Hz/s.
    pub doppler_rate_hz_s: f64,
}

impl PassGeometry {
    /// Duration in whole seconds.
    pub fn duration_s(&self) -> u32 {
        self.duration.0 as u32
    }
}

/// Radio and antenna configuration for a pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RadioConfig {
    pub carrier: Hertz,
    pub tx_power_dbm: f64,
    pub tx_gain_db: f64,
    pub rx_gain_db: f64,
    pub bandwidth: Hertz,
    pub modcod: Modcod,
}

/// Ground-station weather and space-weather sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnvironmentSample {
    /// Rain rate at the ground station (mm/hr).
    pub rain_rate_mm_hr: f64,
    pub cloud_cover_pct: f64,
    /// Total electron content (TECU).
    pub tec_total: f64,
    /// Geomagnetic Kp index, 0..=4.
    pub kp_index: u8,
    /// Radio-frequency interference present.
    pub rfi: bool,
}

/// Spacecraft state at the start of a pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OnboardState {
    pub battery_voltage_v: f64,
    pub pa_temperature_c: f64,
    pub pointing_error: Degrees,
    pub recent_mean_snr_db: f64,
    pub recent_snr_std_db: f64,
    pub last_pass_packet_loss: f64,
}

/// One aggregated record per simulated contact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassRow {
    pub pass_id: String,
    pub pass_start_utc: DateTime<Utc>,
    pub pass_end_utc: DateTime<Utc>,
    pub pass_duration_s: u32,
    pub max_elevation_deg: f64,
    pub mean_elevation_deg: f64,
    pub range_km_at_max: f64,
    pub mean_range_km: f64,
    pub doppler_rate_hz_s: f64,
    pub tx_freq_hz: f64,
    pub tx_power_dbm: f64,
    pub antenna_gain_tx_db: f64,
    pub antenna_gain_rx_db: f64,
    pub pointing_error_deg: f64,
    pub modem_bandwidth_hz: u32,
    pub modem_modcod: Modcod,
    pub recent_mean_snr_db: f64,
    pub recent_snr_std_db: f64,
    pub last_pass_packet_loss: f64,
    pub battery_voltage_v: f64,
    #[serde(rename = "pa_temperature_C")]
    pub pa_temperature_c: f64,
    pub payload_size_bytes: u64,
    pub payload_priority_pct: f64,
    pub local_time_of_day: u32,
    pub day_of_year: u32,
    #[serde(rename = "rain_rate_mmhr_at_GS")]
    pub rain_rate_mmhr_at_gs: f64,
    pub cloud_cover_pct: f64,
    #[serde(rename = "TEC_total")]
    pub tec_total: f64,
    pub kp_index: u8,
    pub rfi_flag: u8,
    pub historical_max_bytes: i64,
    pub max_bytes_transferable: u64,
    pub can_send_all: u8,
    pub recommended_compression_ratio: f64,
    pub predicted_mean_snr_db: f64,
}

impl PassRow {
    /// Whether the whole payload fits in the pass.
    pub fn sends_all(&self) -> bool {
        self.can_send_all == 1
    }

    /// Check the label invariants: ratio in [0, 1], binary flag, and a
    /// full-send pass never recommends compression.
    pub fn labels_consistent(&self) -> bool {
        let ratio_ok = (0.0..=1.0).contains(&self.recommended_compression_ratio);
        let flag_ok = self.can_send_all <= 1;
        let implied = !self.sends_all() || self.recommended_compression_ratio == 1.0;
        ratio_ok && flag_ok && implied
    }
}

/// Summary record for a pass that also has a time-series profile.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesMeta {
    pub pass_id: String,
    pub pass_duration_s: u32,
    pub max_elevation_deg: f64,
    pub tx_freq_hz: f64,
    pub tx_power_dbm: f64,
    pub modem_bandwidth_hz: u32,
    pub recent_mean_snr_db: f64,
    #[serde(rename = "rain_rate_mmhr_at_GS")]
    pub rain_rate_mmhr_at_gs: f64,
    pub battery_voltage_v: f64,
    #[serde(rename = "pa_temperature_C")]
    pub pa_temperature_c: f64,
    pub payload_size_bytes: u64,
    pub max_bytes_transferable: u64,
    pub can_send_all: u8,
    pub recommended_compression_ratio: f64,
}

/// Downlink labels derived from transferable bytes and payload size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DownlinkLabels {
    pub can_send_all: bool,
    /// Unrounded `min(1, max_bytes / payload)`.
    pub compression_ratio: f64,
}

impl DownlinkLabels {
    /// Derive the supervised-learning targets for a pass.
    pub fn derive(max_bytes: u64, payload_bytes: u64) -> Self {
        let ratio = if payload_bytes == 0 {
            1.0
        } else {
            (max_bytes as f64 / payload_bytes as f64).min(1.0)
        };
        Self {
            can_send_all: max_bytes >= payload_bytes,
            compression_ratio: ratio,
        }
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10.0_f64.powi(places);
    (value * scale).round() / scale
}
