//! Model Layer Error Types

use thiserror::Error;

/// Result type for traction-model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Model layer errors
///
/// Ingestion-path validation failures are typed variants so callers cannot
/// mistake them for infrastructure errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Norm rejected: not enough points survived validation
    #[error("Norm rejected: {kept} valid point(s), at least {minimum} required")]
    TooFewPoints { kept: usize, minimum: usize },

    /// Unknown norm kind string
    #[error("Unknown norm kind: {0}")]
    UnknownKind(String),

    /// Unknown deviation band string
    #[error("Unknown deviation band: {0}")]
    UnknownBand(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err.to_string())
    }
}

// Helper methods
impl ModelError {
    pub fn too_few_points(kept: usize) -> Self {
        ModelError::TooFewPoints {
            kept,
            minimum: crate::validation::MIN_POINTS,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ModelError::Validation(msg.into())
    }
}
