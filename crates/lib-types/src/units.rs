//! Physical units with type safety.
//!
//! These newtypes keep link-budget inputs from being mixed up
//! (e.g., passing a range in metres where kilometres are expected).

use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// Speed of light in vacuum (m/s).
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// Time duration in seconds.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Seconds(pub f64);

/// Frequency in Hertz.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Hertz(pub f64);

impl Hertz {
    #[inline]
    pub fn from_khz(khz: f64) -> Self {
        Self(khz * 1e3)
    }

    #[inline]
    pub fn from_mhz(mhz: f64) -> Self {
        Self(mhz * 1e6)
    }

    #[inline]
    pub fn from_ghz(ghz: f64) -> Self {
        Self(ghz * 1e9)
    }

    #[inline]
    pub fn as_ghz(&self) -> f64 {
        self.0 * 1e-9
    }
}

/// Distance in kilometres.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Kilometers(pub f64);

impl Kilometers {
    #[inline]
    pub fn as_meters(&self) -> f64 {
        self.0 * 1e3
    }
}

/// Angle in degrees.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Degrees(pub f64);

impl Degrees {
    #[inline]
    pub fn to_radians(&self) -> f64 {
        self.0.to_radians()
    }

    /// Clamp into `[lo, hi]` degrees.
    #[inline]
    pub fn clamped(&self, lo: f64, hi: f64) -> Self {
        Self(self.0.clamp(lo, hi))
    }
}

/// Data rate in bits per second.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct BitsPerSecond(pub f64);

impl BitsPerSecond {
    /// Bits carried over a duration at this rate.
    #[inline]
    pub fn bits_over(&self, duration: Seconds) -> f64 {
        self.0 * duration.0
    }
}

impl Mul<f64> for BitsPerSecond {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self(self.0 * rhs)
    }
}

/// Convert a decibel ratio to linear scale.
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_constructors() {
        assert_eq!(Hertz::from_khz(250.0), Hertz(250e3));
        assert_eq!(Hertz::from_mhz(437.0), Hertz(437e6));
        assert!((Hertz::from_ghz(2.2).as_ghz() - 2.2).abs() < 1e-12);
    }

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(10.0) - 10.0).abs() < 1e-12);
        assert!((db_to_linear(-3.0) - 0.501187).abs() < 1e-6);
        assert_eq!(db_to_linear(f64::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_bits_over_duration() {
        let rate = BitsPerSecond(250e3) * 0.5;
        assert_eq!(rate.bits_over(Seconds(4.0)), 500_000.0);
    }
}
