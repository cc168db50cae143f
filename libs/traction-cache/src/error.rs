//! Error types for traction-cache

use thiserror::Error;
use traction_calc::CalcError;
use traction_model::ModelError;
use traction_store::StoreError;

/// Engine layer errors
///
/// Validation rejections stay typed through the `Model` variant so callers
/// can match on [`ModelError::TooFewPoints`] without string inspection.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Norm validation failed: {0}")]
    Model(#[from] ModelError),

    #[error("Curve construction failed: {0}")]
    Calc(#[from] CalcError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Common(#[from] traction_common::Error),

    /// An analysis computation handed to the engine failed
    #[error("Analysis computation failed: {0}")]
    Analysis(String),
}

// Transactions composed in this crate touch sqlx directly
impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Store(StoreError::from(err))
    }
}

impl EngineError {
    pub fn analysis(err: &anyhow::Error) -> Self {
        // {:#} renders the whole cause chain on one line
        EngineError::Analysis(format!("{err:#}"))
    }

    /// True when the error is a norm rejection rather than an infrastructure
    /// failure
    pub fn is_rejection(&self) -> bool {
        matches!(self, EngineError::Model(ModelError::TooFewPoints { .. }))
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
