//! # lib-types
//!
//! Core type definitions for the CubeSat downlink planning workspace.
//!
//! This crate provides foundational types used throughout the workspace:
//! - Physical units with compile-time safety
//! - Sampled pass parameters and the aggregated pass row
//! - Time-series profiles and their feature vectors
//! - Power and battery telemetry records

pub mod units;
pub mod pass;
pub mod profile;
pub mod power;

pub use units::*;
pub use pass::*;
pub use profile::*;
pub use power::*;
