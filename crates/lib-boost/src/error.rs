//! Error types for model training and inference.

use thiserror::Error;

/// Errors that can occur while fitting, loading or applying a model.
#[derive(Debug, Error)]
pub enum BoostError {
    /// I/O error reading or writing a model artifact.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Artifact serialisation failure.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Training data has inconsistent dimensions.
    #[error("Dimension mismatch: {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },

    /// No rows to train on.
    #[error("Empty training set")]
    EmptyTrainingSet,

    /// Hyperparameter out of range.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Artifact cannot be applied to this input.
    #[error("Incompatible model '{target}': {reason}")]
    Incompatible { target: String, reason: String },
}

impl BoostError {
    /// Create an invalid parameter error.
    pub fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Create a dimension mismatch error.
    pub fn dimension(context: &'static str, expected: usize, got: usize) -> Self {
        Self::DimensionMismatch {
            context,
            expected,
            got,
        }
    }
}

/// Result type for boosting operations.
pub type BoostResult<T> = Result<T, BoostError>;
