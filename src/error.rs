//! Error types for microforest

use thiserror::Error;

/// Result type alias for microforest operations
pub type Result<T> = std::result::Result<T, MicroforestError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum MicroforestError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Unsupported model for export: {0}")]
    UnsupportedModel(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<polars::error::PolarsError> for MicroforestError {
    fn from(err: polars::error::PolarsError) -> Self {
        MicroforestError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for MicroforestError {
    fn from(err: serde_json::Error) -> Self {
        MicroforestError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for MicroforestError {
    fn from(err: ndarray::ShapeError) -> Self {
        MicroforestError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MicroforestError::DataError("missing column".to_string());
        assert_eq!(err.to_string(), "Data error: missing column");

        let err = MicroforestError::InvalidParameter {
            name: "train_ratio".to_string(),
            value: "1.5".to_string(),
            reason: "must lie in (0, 1)".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid parameter: train_ratio = 1.5, must lie in (0, 1)"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: MicroforestError = io_err.into();
        assert!(matches!(err, MicroforestError::IoError(_)));
    }
}
