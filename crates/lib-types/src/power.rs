//! Power-subsystem and battery telemetry records.

use serde::{Deserialize, Serialize};

/// One step of the orbital power simulation, with engineered features.
///
/// `soc` is the state of charge at the *start* of the step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowerRecord {
    pub orb_phase: f64,
    pub eclipse_flag: u8,
    pub sun_incidence_cos: f64,
    #[serde(rename = "solar_irradiance_Wm2")]
    pub solar_irradiance_wm2: f64,
    #[serde(rename = "panel_temp_C")]
    pub panel_temp_c: f64,
    pub mppt_eff: f64,
    #[serde(rename = "P_panel_pred")]
    pub p_panel_pred: f64,
    #[serde(rename = "SoC")]
    pub soc: f64,
    #[serde(rename = "battery_temp_C")]
    pub battery_temp_c: f64,
    #[serde(rename = "P_base_pred")]
    pub p_base_pred: f64,
    pub payload_flag: u8,
    #[serde(rename = "P_payload_pred")]
    pub p_payload_pred: f64,
    #[serde(rename = "P_net_current")]
    pub p_net_current: f64,
    #[serde(rename = "P_future_720s")]
    pub p_future_720s: f64,
    #[serde(rename = "P_panel_pred_rolling_mean")]
    pub p_panel_pred_rolling_mean: f64,
    #[serde(rename = "P_panel_pred_rolling_std")]
    pub p_panel_pred_rolling_std: f64,
    #[serde(rename = "panel_temp_C_rolling_mean")]
    pub panel_temp_c_rolling_mean: f64,
    pub irradiance_x_mppt: f64,
}

/// One step of the battery telemetry random walk with next-step targets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub timestamp: f64,
    pub temperature: f64,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub delta_temp: f64,
    pub delta_voltage: f64,
    pub delta_current: f64,
    pub temperature_next: f64,
    pub voltage_next: f64,
    pub current_next: f64,
}
