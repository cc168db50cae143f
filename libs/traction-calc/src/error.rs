//! Error types for traction-calc

use thiserror::Error;

/// Curve construction errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CalcError {
    #[error("Curve construction error: {0}")]
    Construction(String),

    #[error("Loads not strictly ascending: {0}")]
    NonAscending(String),
}

impl CalcError {
    pub fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    pub fn non_ascending(msg: impl Into<String>) -> Self {
        Self::NonAscending(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CalcError>;
