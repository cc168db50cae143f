//! traction-calc - Interpolation library for TractionNorm
//!
//! Builds interpolation functions over norm points and evaluates them:
//! piecewise-linear for small point sets, Akima-blended cubic for four or
//! more points, with clamp-at-boundary behavior outside the data range.
//!
//! # Example
//!
//! ```
//! use traction_calc::NormCurve;
//! use traction_model::NormPoint;
//!
//! let points = [
//!     NormPoint { load: 10.0, consumption: 100.0, order: 0 },
//!     NormPoint { load: 40.0, consumption: 500.0, order: 1 },
//! ];
//! let curve = NormCurve::build(&points).unwrap();
//!
//! let eval = curve.value_at(25.0).unwrap();
//! assert_eq!(eval.value, 300.0);
//! assert!(!eval.clamped);
//!
//! // Below the data range the boundary value is returned, flagged
//! let eval = curve.value_at(5.0).unwrap();
//! assert_eq!(eval.value, 100.0);
//! assert!(eval.clamped);
//! ```

pub mod curve;
pub mod error;

// Re-exports for convenience
pub use curve::{CurveKind, Evaluation, NormCurve, RANGE_TOLERANCE};
pub use error::{CalcError, Result};
