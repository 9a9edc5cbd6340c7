//! # lib-link
//!
//! Synthetic ground-contact simulation for CubeSat downlink planning.
//!
//! - **Link Budget**: path loss, rain and pointing losses, noise floor, SNR to bitrate
//! - **Samplers**: pass geometry, radio, environment and onboard state
//! - **Pass Rows**: one aggregated record per contact with downlink targets
//! - **Profiles**: per-interval SNR/range/elevation traces with fades
//! - **Power**: sequential orbital power and battery state-of-charge simulation
//! - **Telemetry**: battery temperature/voltage/current random walk

pub mod budget;
pub mod error;
pub mod pass_gen;
pub mod power;
pub mod profile_gen;
pub mod sampling;
pub mod telemetry;

pub use budget::LinkBudget;
pub use error::{LinkError, LinkResult};
pub use pass_gen::{PassRowGenerator, SimulatedPass};
pub use power::{simulate_power, BatteryState, PowerSimConfig};
pub use profile_gen::{GeneratedProfile, ProfileGenerator};
pub use sampling::{stream_rng, PassSampler};
pub use telemetry::{simulate_telemetry, TelemetryConfig};
