//! Traction Model Library
//!
//! Core domain types and pure logic for TractionNorm.
//! This library provides business entities without storage dependencies.
//!
//! # Modules
//!
//! - `norm`: norm entities (points, kinds, stored norms)
//! - `validation`: norm point validation with drop diagnostics
//! - `deviation`: deviation percentage and seven-band classification
//! - `analysis`: analysis parameters, route outcomes, cached results

pub mod analysis;
pub mod deviation;
pub mod error;
pub mod norm;
pub mod validation;

// Re-exports for convenience
pub use analysis::{AnalysisOutcome, AnalysisParams, AnalysisResult, AnalysisStats, RouteOutcome};
pub use deviation::{deviation_percent, DeviationBand};
pub use error::{ModelError, Result};
pub use norm::{Norm, NormKind, NormPoint};
pub use validation::{validate_points, ValidatedPoints, MIN_POINTS};
