//! Error types for the tabprep kernel

use thiserror::Error;

/// Result type alias for tabprep operations
pub type Result<T> = std::result::Result<T, PrepError>;

/// Main error type for the tabprep kernel
#[derive(Error, Debug)]
pub enum PrepError {
    /// Contradictory or invalid construction options. Raised at
    /// configuration time and never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation was invoked before the required `fit` / `reset`.
    #[error("'{0}' called before fit")]
    NotFitted(&'static str),

    /// Degenerate fit input, e.g. an all-missing column block or a single
    /// unique label.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// A stratified split cannot guarantee at least one sample per label.
    #[error("at least {required} samples are required because we have {required} unique labels, but {requested} were requested")]
    InsufficientLabels { required: usize, requested: usize },

    /// An inverse was requested on a one-way transform.
    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Data error: {0}")]
    Data(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PrepError::Config("replace cannot be true for time series".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: replace cannot be true for time series"
        );
    }

    #[test]
    fn test_insufficient_labels_display() {
        let err = PrepError::InsufficientLabels { required: 3, requested: 2 };
        assert!(err.to_string().contains("3 unique labels"));
        assert!(err.to_string().contains("2 were requested"));
    }

    #[test]
    fn test_error_from_serde() {
        let bad = serde_json::from_str::<serde_json::Value>("{not json");
        let err: PrepError = bad.unwrap_err().into();
        assert!(matches!(err, PrepError::Serialization(_)));
    }
}
