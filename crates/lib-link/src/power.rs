//! Orbital power and battery simulation.
//!
//! Unlike the pass generators this simulator is sequential: each step's
//! energy balance moves the battery state of charge seen by the next step.
//! The state is threaded explicitly through a fold over [`BatteryState`],
//! so the whole run is a function of the seed and the step count.

use lib_types::power::PowerRecord;
use rand::Rng;
use tracing::{debug, info};

use crate::error::{LinkError, LinkResult};
use crate::sampling::gaussian;

/// Solar constant at 1 AU (W/m^2).
const SOLAR_CONSTANT_WM2: f64 = 1361.0;

/// Peak panel output at normal incidence before MPPT losses (W).
const PANEL_PEAK_W: f64 = 40.0;

/// Incidence cosine below which the spacecraft is treated as eclipsed.
const ECLIPSE_THRESHOLD: f64 = 0.1;

/// Window for the rolling features.
pub const ROLLING_WINDOW: usize = 5;

/// Power simulation parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerSimConfig {
    pub samples: usize,
    /// Step length (seconds).
    pub step_s: f64,
    pub battery_capacity_wh: f64,
}

impl Default for PowerSimConfig {
    fn default() -> Self {
        Self {
            samples: 10_000,
            step_s: 720.0,
            battery_capacity_wh: 30.0,
        }
    }
}

impl PowerSimConfig {
    pub fn validate(&self) -> LinkResult<()> {
        if self.samples == 0 {
            return Err(LinkError::parameter("samples", "must be non-zero"));
        }
        if !self.step_s.is_finite() || self.step_s <= 0.0 {
            return Err(LinkError::parameter("step_s", "must be positive"));
        }
        if !self.battery_capacity_wh.is_finite() || self.battery_capacity_wh <= 0.0 {
            return Err(LinkError::parameter("battery_capacity_wh", "must be positive"));
        }
        Ok(())
    }

    fn capacity_joules(&self) -> f64 {
        self.battery_capacity_wh * 3600.0
    }
}

/// State carried from one step to the next.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatteryState {
    /// Fraction of capacity remaining, in [0, 1].
    pub state_of_charge: f64,
}

impl BatteryState {
    /// Apply a net power over a step and return the new state.
    pub fn advance(self, net_power_w: f64, step_s: f64, capacity_j: f64) -> Self {
        let soc = self.state_of_charge + net_power_w * step_s / capacity_j;
        Self {
            state_of_charge: soc.clamp(0.0, 1.0),
        }
    }
}

/// Draws for one step, before the state-dependent target is computed.
struct StepDraw {
    orb_phase: f64,
    sun_incidence_cos: f64,
    eclipse: bool,
    irradiance: f64,
    panel_temp_c: f64,
    mppt_eff: f64,
    p_panel: f64,
    p_base: f64,
    payload_on: bool,
    p_payload: f64,
    battery_temp_c: f64,
}

impl StepDraw {
    fn sample<R: Rng + ?Sized>(rng: &mut R, index: usize, samples: usize) -> Self {
        let orb_phase = 2.0 * std::f64::consts::PI * index as f64 / samples as f64;
        let cos = rng.gen::<f64>();
        let panel_temp_c = 20.0 + 30.0 * cos - gaussian(rng, 0.0, 2.0);
        let mppt_eff = (0.85 + 0.1 * cos - 0.02 * (panel_temp_c - 25.0) / 25.0).clamp(0.7, 0.95);

        let p_base = rng.gen_range(3.0..6.0);
        let payload_on = rng.gen_bool(0.5);
        let p_payload = if payload_on { rng.gen_range(2.0..8.0) } else { 0.0 };
        let battery_temp_c = 10.0 + 15.0 * rng.gen::<f64>();

        Self {
            orb_phase,
            sun_incidence_cos: cos,
            eclipse: cos < ECLIPSE_THRESHOLD,
            irradiance: SOLAR_CONSTANT_WM2 * cos,
            panel_temp_c,
            mppt_eff,
            p_panel: PANEL_PEAK_W * cos * mppt_eff,
            p_base,
            payload_on,
            p_payload,
            battery_temp_c,
        }
    }

    fn net_power(&self) -> f64 {
        self.p_panel - (self.p_base + self.p_payload)
    }

    /// Net power expected one step ahead, clamped to [-5, 40] W.
    fn future_power<R: Rng + ?Sized>(&self, rng: &mut R, state: BatteryState) -> f64 {
        let eclipse = if self.eclipse { 1.0 } else { 0.0 };
        (self.net_power() + gaussian(rng, 0.0, 2.0) + 5.0 * (state.state_of_charge - 0.5)
            - 6.0 * eclipse
            + 2.0 * (self.orb_phase + std::f64::consts::FRAC_PI_4).sin()
            + 0.15 * (25.0 - self.battery_temp_c))
            .clamp(-5.0, 40.0)
    }
}

/// Run the power simulation and attach the rolling features.
pub fn simulate_power<R: Rng + ?Sized>(
    config: &PowerSimConfig,
    rng: &mut R,
) -> LinkResult<Vec<PowerRecord>> {
    config.validate()?;
    info!(samples = config.samples, step_s = config.step_s, "Simulating power subsystem");

    let capacity_j = config.capacity_joules();
    let initial = BatteryState {
        state_of_charge: rng.gen_range(0.5..0.9),
    };

    let (final_state, mut records) = (0..config.samples).fold(
        (initial, Vec::with_capacity(config.samples)),
        |(state, mut records), i| {
            let draw = StepDraw::sample(rng, i, config.samples);
            let future = draw.future_power(rng, state);
            records.push(record(&draw, state, future));
            (state.advance(draw.net_power(), config.step_s, capacity_j), records)
        },
    );

    debug!(final_soc = final_state.state_of_charge, "Power simulation finished");
    add_rolling_features(&mut records);
    Ok(records)
}

fn record(draw: &StepDraw, state: BatteryState, future: f64) -> PowerRecord {
    PowerRecord {
        orb_phase: draw.orb_phase,
        eclipse_flag: u8::from(draw.eclipse),
        sun_incidence_cos: draw.sun_incidence_cos,
        solar_irradiance_wm2: draw.irradiance,
        panel_temp_c: draw.panel_temp_c,
        mppt_eff: draw.mppt_eff,
        p_panel_pred: draw.p_panel,
        soc: state.state_of_charge,
        battery_temp_c: draw.battery_temp_c,
        p_base_pred: draw.p_base,
        payload_flag: u8::from(draw.payload_on),
        p_payload_pred: draw.p_payload,
        p_net_current: draw.net_power(),
        p_future_720s: future,
        p_panel_pred_rolling_mean: 0.0,
        p_panel_pred_rolling_std: 0.0,
        panel_temp_c_rolling_mean: 0.0,
        irradiance_x_mppt: draw.irradiance * draw.mppt_eff,
    }
}

fn add_rolling_features(records: &mut [PowerRecord]) {
    let panel: Vec<f64> = records.iter().map(|r| r.p_panel_pred).collect();
    let temp: Vec<f64> = records.iter().map(|r| r.panel_temp_c).collect();

    let panel_mean = rolling_mean(&panel, ROLLING_WINDOW);
    let panel_std = rolling_std(&panel, ROLLING_WINDOW);
    let temp_mean = rolling_mean(&temp, ROLLING_WINDOW);

    for (i, r) in records.iter_mut().enumerate() {
        r.p_panel_pred_rolling_mean = panel_mean[i];
        r.p_panel_pred_rolling_std = panel_std[i];
        r.panel_temp_c_rolling_mean = temp_mean[i];
    }
}

/// Trailing mean over up to `window` samples (at least one).
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let slice = &values[trailing_start(i, window)..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

/// Trailing sample standard deviation; 0 where fewer than two samples exist.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    (0..values.len())
        .map(|i| {
            let slice = &values[trailing_start(i, window)..=i];
            if slice.len() < 2 {
                return 0.0;
            }
            let n = slice.len() as f64;
            let mean = slice.iter().sum::<f64>() / n;
            let ss: f64 = slice.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        })
        .collect()
}

#[inline]
fn trailing_start(i: usize, window: usize) -> usize {
    (i + 1).saturating_sub(window.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_battery_advance_clamps() {
        let s = BatteryState { state_of_charge: 0.95 };
        assert_eq!(s.advance(1000.0, 720.0, 108_000.0).state_of_charge, 1.0);
        assert_eq!(s.advance(-1000.0, 720.0, 108_000.0).state_of_charge, 0.0);
        let mid = s.advance(-15.0, 720.0, 108_000.0).state_of_charge;
        assert!((mid - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_soc_carried_between_steps() {
        let config = PowerSimConfig { samples: 500, ..Default::default() };
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let records = simulate_power(&config, &mut rng).unwrap();
        assert_eq!(records.len(), 500);

        let capacity = config.battery_capacity_wh * 3600.0;
        for pair in records.windows(2) {
            let expected = BatteryState { state_of_charge: pair[0].soc }
                .advance(pair[0].p_net_current, config.step_s, capacity);
            assert_eq!(pair[1].soc, expected.state_of_charge);
        }
    }

    #[test]
    fn test_record_bounds() {
        let config = PowerSimConfig { samples: 1000, ..Default::default() };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for r in simulate_power(&config, &mut rng).unwrap() {
            assert!((0.0..=1.0).contains(&r.soc));
            assert!((0.7..=0.95).contains(&r.mppt_eff));
            assert!((-5.0..=40.0).contains(&r.p_future_720s));
            assert_eq!(r.eclipse_flag == 1, r.sun_incidence_cos < 0.1);
            if r.payload_flag == 0 {
                assert_eq!(r.p_payload_pred, 0.0);
            }
        }
    }

    #[test]
    fn test_rolling_windows() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let mean = rolling_mean(&values, 5);
        assert_eq!(mean[0], 1.0);
        assert_eq!(mean[1], 1.5);
        assert_eq!(mean[5], 4.0);

        let std = rolling_std(&values, 5);
        assert_eq!(std[0], 0.0);
        assert!((std[1] - 0.5_f64.sqrt()).abs() < 1e-12);
        assert!((std[5] - 2.5_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_empty_run() {
        let config = PowerSimConfig { samples: 0, ..Default::default() };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(simulate_power(&config, &mut rng).is_err());
    }
}
