//! Error types for compression.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

/// Errors that can occur while compressing a file.
#[derive(Debug, Error)]
pub enum CompressError {
    /// Input file does not exist.
    #[error("Input file not found: {0}")]
    NotFound(PathBuf),

    /// Reading the input or writing the output failed.
    #[error("IO error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Image could not be decoded or re-encoded.
    #[error("Image error on '{path}': {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// External encoder could not be started.
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// External encoder exited unsuccessfully.
    #[error("'{program}' exited with {status}")]
    EncoderFailed { program: String, status: ExitStatus },

    /// Compression ratio outside (0, 1].
    #[error("Invalid compression ratio {0}")]
    InvalidRatio(f64),
}

impl CompressError {
    /// Create an IO error tagged with a path.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Create an image error tagged with a path.
    pub fn image(path: &Path, source: image::ImageError) -> Self {
        Self::Image {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Check if the failure is due to the input file rather than a codec.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Image { .. } | Self::InvalidRatio(_)
        )
    }
}

/// Result type for compression operations.
pub type CompressResult<T> = Result<T, CompressError>;
