//! # lib-compress
//!
//! Payload compression ahead of a downlink pass.
//!
//! - **Classification**: data type by file extension, codec family per type
//! - **Settings**: target compression ratio to JPEG quality, Zstd/LZ4 level, video bitrate
//! - **Engines**: JPEG re-encode, Zstd and LZ4 frames, external H.264 encoder
//! - **Dispatch**: per-file compression with size accounting

pub mod classify;
pub mod compressor;
pub mod engine;
pub mod error;
pub mod samples;
pub mod settings;

pub use classify::{DataType, Protocol};
pub use compressor::{megabytes, CompressionOutcome, Compressor};
pub use engine::VideoEncoder;
pub use error::{CompressError, CompressResult};
pub use samples::write_sample_files;
pub use settings::Settings;
