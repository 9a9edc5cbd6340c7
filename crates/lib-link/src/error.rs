//! Error types for link simulation.

use thiserror::Error;

/// Errors that can occur while configuring or running a simulation.
#[derive(Debug, Error)]
pub enum LinkError {
    /// A sampling distribution could not be built from its parameters.
    #[error("Invalid {name} distribution: {message}")]
    InvalidDistribution { name: &'static str, message: String },

    /// A simulation parameter is out of range.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl LinkError {
    /// Create an invalid distribution error.
    pub fn distribution(name: &'static str, err: impl std::fmt::Display) -> Self {
        Self::InvalidDistribution {
            name,
            message: err.to_string(),
        }
    }

    /// Create an invalid parameter error.
    pub fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Result type for link simulation operations.
pub type LinkResult<T> = Result<T, LinkError>;
