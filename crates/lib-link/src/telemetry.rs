//! Battery telemetry random walk for next-step prediction datasets.

use lib_types::power::TelemetryRecord;
use rand::Rng;
use tracing::info;

use crate::error::{LinkError, LinkResult};
use crate::sampling::gaussian;

/// Telemetry walk parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetryConfig {
    pub samples: usize,
    /// Seconds per step.
    pub dt_s: f64,
    pub initial: TelemetryState,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            samples: 2000,
            dt_s: 1.0,
            initial: TelemetryState {
                temperature: 25.0,
                voltage: 4.2,
                current: 0.5,
            },
        }
    }
}

/// Instantaneous battery readings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetryState {
    /// Cell temperature (°C).
    pub temperature: f64,
    pub voltage: f64,
    pub current: f64,
}

impl TelemetryState {
    /// Draw the reading for step `i`.
    ///
    /// Temperature follows a slow sinusoid with noise, voltage drifts down,
    /// current wanders. Each is clamped to its operating band.
    pub fn step<R: Rng + ?Sized>(self, rng: &mut R, i: usize) -> Self {
        let trend = 25.0 + 10.0 * (i as f64 / 200.0).sin();
        let temperature = (trend + gaussian(rng, 0.0, 0.2)).clamp(20.0, 60.0);
        let voltage = (self.voltage - 0.0005 + gaussian(rng, 0.0, 0.0005)).clamp(3.0, 4.2);
        let current = (self.current + gaussian(rng, 0.0, 0.02)).clamp(0.1, 2.0);
        Self {
            temperature,
            voltage,
            current,
        }
    }
}

/// Generate the walk with first differences and next-step targets.
///
/// The final reading has no successor and is dropped, so `samples` steps
/// yield `samples - 1` records.
pub fn simulate_telemetry<R: Rng + ?Sized>(
    config: &TelemetryConfig,
    rng: &mut R,
) -> LinkResult<Vec<TelemetryRecord>> {
    if config.samples < 2 {
        return Err(LinkError::parameter("samples", "need at least two steps"));
    }
    info!(samples = config.samples, "Simulating battery telemetry");

    let walk = (1..config.samples).scan(config.initial, |state, i| {
        *state = state.step(rng, i);
        Some(*state)
    });
    let states: Vec<TelemetryState> = std::iter::once(config.initial).chain(walk).collect();

    let records = states
        .windows(2)
        .enumerate()
        .map(|(i, pair)| {
            let (cur, next) = (pair[0], pair[1]);
            let prev = if i == 0 { cur } else { states[i - 1] };
            TelemetryRecord {
                timestamp: i as f64 * config.dt_s,
                temperature: cur.temperature,
                voltage: cur.voltage,
                current: cur.current,
                power: cur.voltage * cur.current,
                delta_temp: cur.temperature - prev.temperature,
                delta_voltage: cur.voltage - prev.voltage,
                delta_current: cur.current - prev.current,
                temperature_next: next.temperature,
                voltage_next: next.voltage,
                current_next: next.current,
            }
        })
        .collect();

    Ok(records)
}
