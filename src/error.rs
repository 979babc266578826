//! Error types for the harbench pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, HarbenchError>;

/// Main error type; one variant per pipeline stage plus shared plumbing
#[derive(Error, Debug)]
pub enum HarbenchError {
    #[error("Fetch error: {0}")]
    FetchError(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Cleaning error: {0}")]
    CleaningError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<polars::error::PolarsError> for HarbenchError {
    fn from(err: polars::error::PolarsError) -> Self {
        HarbenchError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for HarbenchError {
    fn from(err: serde_json::Error) -> Self {
        HarbenchError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for HarbenchError {
    fn from(err: ndarray::ShapeError) -> Self {
        HarbenchError::ShapeError {
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
        let err = HarbenchError::CleaningError("label column would be dropped".to_string());
        assert_eq!(
            err.to_string(),
            "Cleaning error: label column would be dropped"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HarbenchError = io_err.into();
        assert!(matches!(err, HarbenchError::IoError(_)));
    }
}
