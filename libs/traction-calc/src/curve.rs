//! Norm Curve Construction and Evaluation
//!
//! Builds an interpolation function over a norm's (load, consumption)
//! points and evaluates it at arbitrary loads:
//!
//! - 2 or 3 points: piecewise-linear between the bracketing knots,
//!   `y = y_0 + alpha * (y_1 - y_0)` with `alpha = (x - x_0) / (x_1 - x_0)`.
//! - 4 or more points: cubic Hermite segments with Akima-blended knot
//!   derivatives, which keeps overshoot between knots low on monotone data.
//!
//! Outside the data range the curve does not extrapolate; the boundary
//! ordinate is returned and the evaluation is flagged as clamped.

use crate::error::{CalcError, Result};
use traction_model::NormPoint;

/// Queries within the data range widened by this absolute amount still
/// count as in-range (no clamp flag)
pub const RANGE_TOLERANCE: f64 = 0.01;

/// Slope-difference weights below this are treated as zero
const SLOPE_EPSILON: f64 = 1e-12;

/// Interpolation method a curve was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    Linear,
    Cubic,
}

/// Result of evaluating a curve at one load
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub value: f64,
    /// True when the query fell outside the data range and the boundary
    /// ordinate was returned instead
    pub clamped: bool,
}

/// Immutable interpolation function over one norm's points
#[derive(Debug, Clone)]
pub struct NormCurve {
    kind: CurveKind,
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Knot derivatives, one per knot; empty for the linear kind
    derivs: Vec<f64>,
}

impl NormCurve {
    /// Build a curve from norm points
    ///
    /// Points are sorted by load here as well, so the function is safe to
    /// call with any point order. Loads must be distinct.
    pub fn build(points: &[NormPoint]) -> Result<Self> {
        if points.len() < 2 {
            return Err(CalcError::construction(format!(
                "at least 2 points required, got {}",
                points.len()
            )));
        }

        let mut pairs: Vec<(f64, f64)> = points.iter().map(|p| (p.load, p.consumption)).collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        for w in pairs.windows(2) {
            if w[1].0 - w[0].0 <= 0.0 {
                return Err(CalcError::non_ascending(format!(
                    "duplicate load {} in point set",
                    w[1].0
                )));
            }
        }

        let xs: Vec<f64> = pairs.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();

        let (kind, derivs) = if xs.len() >= 4 {
            (CurveKind::Cubic, akima_derivatives(&xs, &ys))
        } else {
            (CurveKind::Linear, Vec::new())
        };

        Ok(Self {
            kind,
            xs,
            ys,
            derivs,
        })
    }

    pub fn kind(&self) -> CurveKind {
        self.kind
    }

    pub fn knot_count(&self) -> usize {
        self.xs.len()
    }

    pub fn min_load(&self) -> f64 {
        self.xs[0]
    }

    pub fn max_load(&self) -> f64 {
        self.xs[self.xs.len() - 1]
    }

    /// Evaluate the curve at a load
    ///
    /// Returns `None` for a non-finite query or when the computed value is
    /// not a usable consumption (NaN, infinite, or negative). Queries
    /// outside the data range return the boundary ordinate, flagged as
    /// clamped unless they are within [`RANGE_TOLERANCE`] of the range.
    pub fn value_at(&self, x: f64) -> Option<Evaluation> {
        if !x.is_finite() {
            return None;
        }

        let min = self.min_load();
        let max = self.max_load();
        let clamped = x < min - RANGE_TOLERANCE || x > max + RANGE_TOLERANCE;
        let x_eff = x.clamp(min, max);

        // The last knot is returned directly; segment evaluation at d = h
        // reproduces it only up to rounding
        let value = if x_eff >= max {
            self.ys[self.ys.len() - 1]
        } else {
            match self.kind {
                CurveKind::Linear => self.eval_linear(x_eff),
                CurveKind::Cubic => self.eval_cubic(x_eff),
            }
        };

        if !value.is_finite() || value < 0.0 {
            return None;
        }

        Some(Evaluation { value, clamped })
    }

    /// Rightmost segment whose left knot is at or below `x`
    fn segment_index(&self, x: f64) -> usize {
        let upper = self.xs.partition_point(|&v| v <= x);
        upper.saturating_sub(1).min(self.xs.len() - 2)
    }

    fn eval_linear(&self, x: f64) -> f64 {
        let i = self.segment_index(x);
        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let alpha = (x - x0) / (x1 - x0);
        y0 + alpha * (y1 - y0)
    }

    fn eval_cubic(&self, x: f64) -> f64 {
        let i = self.segment_index(x);
        let h = self.xs[i + 1] - self.xs[i];
        let d = x - self.xs[i];
        let s = (self.ys[i + 1] - self.ys[i]) / h;
        let t0 = self.derivs[i];
        let t1 = self.derivs[i + 1];
        let c2 = (3.0 * s - 2.0 * t0 - t1) / h;
        let c3 = (t0 + t1 - 2.0 * s) / (h * h);
        self.ys[i] + t0 * d + c2 * d * d + c3 * d * d * d
    }
}

/// Akima knot derivatives for strictly ascending xs, `xs.len() >= 4`
///
/// Segment slopes are extended with two mirrored ghost slopes at each end
/// (`m[-1] = 2m[0] - m[1]`, `m[-2] = 2m[-1] - m[0]`, symmetric on the
/// right). The derivative at a knot blends its neighbor slopes weighted by
/// how much the slopes change on the far sides; where both weights vanish
/// (locally linear data) the arithmetic mean of the neighbor slopes is used.
fn akima_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();

    // m[2..=n] hold the real segment slopes, the rest are ghosts
    let mut m = vec![0.0; 2];
    for i in 0..n - 1 {
        m.push((ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i]));
    }
    m[1] = 2.0 * m[2] - m[3];
    m[0] = 2.0 * m[1] - m[2];
    let right1 = 2.0 * m[n] - m[n - 1];
    m.push(right1);
    m.push(2.0 * right1 - m[n]);

    let mut derivs = Vec::with_capacity(n);
    for i in 0..n {
        let w_left = (m[i + 3] - m[i + 2]).abs();
        let w_right = (m[i + 1] - m[i]).abs();
        let denom = w_left + w_right;
        let t = if denom < SLOPE_EPSILON {
            (m[i + 1] + m[i + 2]) / 2.0
        } else {
            (w_left * m[i + 1] + w_right * m[i + 2]) / denom
        };
        derivs.push(t);
    }
    derivs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(pairs: &[(f64, f64)]) -> Vec<NormPoint> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, &(load, consumption))| NormPoint {
                load,
                consumption,
                order: i as u32,
            })
            .collect()
    }

    fn spec_curve() -> NormCurve {
        NormCurve::build(&pts(&[
            (10.0, 100.0),
            (20.0, 180.0),
            (30.0, 300.0),
            (40.0, 500.0),
        ]))
        .unwrap()
    }

    #[test]
    fn test_build_rejects_too_few_points() {
        assert!(NormCurve::build(&pts(&[(10.0, 100.0)])).is_err());
        assert!(NormCurve::build(&[]).is_err());
    }

    #[test]
    fn test_build_rejects_duplicate_loads() {
        let err = NormCurve::build(&pts(&[(10.0, 100.0), (10.0, 120.0), (20.0, 180.0)]))
            .unwrap_err();
        assert!(matches!(err, CalcError::NonAscending(_)));
    }

    #[test]
    fn test_two_points_linear() {
        let curve = NormCurve::build(&pts(&[(10.0, 100.0), (40.0, 500.0)])).unwrap();
        assert_eq!(curve.kind(), CurveKind::Linear);

        let eval = curve.value_at(25.0).unwrap();
        assert!(!eval.clamped);
        assert!((eval.value - 300.0).abs() < 1e-9);
    }

    #[test]
    fn test_three_points_linear() {
        let curve =
            NormCurve::build(&pts(&[(10.0, 100.0), (20.0, 180.0), (30.0, 300.0)])).unwrap();
        assert_eq!(curve.kind(), CurveKind::Linear);

        let eval = curve.value_at(25.0).unwrap();
        assert!((eval.value - 240.0).abs() < 1e-9);
    }

    #[test]
    fn test_cubic_passes_through_knots() {
        let curve = spec_curve();
        assert_eq!(curve.kind(), CurveKind::Cubic);

        for (x, y) in [(10.0, 100.0), (20.0, 180.0), (30.0, 300.0), (40.0, 500.0)] {
            let eval = curve.value_at(x).unwrap();
            assert!(!eval.clamped);
            assert!((eval.value - y).abs() < 1e-9, "knot at {} drifted", x);
        }
    }

    #[test]
    fn test_cubic_interpolates_between_knots() {
        let curve = spec_curve();
        let eval = curve.value_at(25.0).unwrap();

        assert!(!eval.clamped);
        assert!(eval.value > 180.0 && eval.value < 300.0);
        // Akima blend for this point set gives exactly 700/3
        assert!((eval.value - 700.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_cubic_stays_between_knots_on_monotone_data() {
        let curve = spec_curve();
        for (lo, hi, y_lo, y_hi) in [
            (10.0, 20.0, 100.0, 180.0),
            (20.0, 30.0, 180.0, 300.0),
            (30.0, 40.0, 300.0, 500.0),
        ] {
            let mid = (lo + hi) / 2.0;
            let eval = curve.value_at(mid).unwrap();
            assert!(
                eval.value > y_lo && eval.value < y_hi,
                "midpoint of [{}, {}] overshot: {}",
                lo,
                hi,
                eval.value
            );
        }
    }

    #[test]
    fn test_clamps_below_range() {
        let curve = spec_curve();
        let eval = curve.value_at(5.0).unwrap();
        assert!(eval.clamped);
        assert_eq!(eval.value, 100.0);
    }

    #[test]
    fn test_clamps_above_range() {
        let curve = spec_curve();
        let eval = curve.value_at(45.0).unwrap();
        assert!(eval.clamped);
        assert_eq!(eval.value, 500.0);
    }

    #[test]
    fn test_range_tolerance_suppresses_clamp_flag() {
        let curve = spec_curve();

        // Just inside the widened range: boundary value, not flagged
        let eval = curve.value_at(10.0 - 0.005).unwrap();
        assert!(!eval.clamped);
        assert_eq!(eval.value, 100.0);

        // Beyond the tolerance: flagged
        let eval = curve.value_at(10.0 - 0.02).unwrap();
        assert!(eval.clamped);
        assert_eq!(eval.value, 100.0);
    }

    #[test]
    fn test_non_finite_query_yields_none() {
        let curve = spec_curve();
        assert!(curve.value_at(f64::NAN).is_none());
        assert!(curve.value_at(f64::INFINITY).is_none());
        assert!(curve.value_at(f64::NEG_INFINITY).is_none());
    }

    #[test]
    fn test_negative_result_is_rejected() {
        // Build bypasses ingestion validation, so a curve over raw points
        // can dip below zero; the evaluation guard must refuse it
        let curve = NormCurve::build(&pts(&[(10.0, -50.0), (20.0, 50.0)])).unwrap();
        assert!(curve.value_at(12.0).is_none());
        // Positive stretch still evaluates
        assert!(curve.value_at(18.0).is_some());
    }

    #[test]
    fn test_locally_linear_data_uses_mean_slope() {
        // Equal slopes make every Akima weight zero; the fallback keeps
        // the interpolant exactly linear
        let curve = NormCurve::build(&pts(&[
            (10.0, 100.0),
            (20.0, 200.0),
            (30.0, 300.0),
            (40.0, 400.0),
        ]))
        .unwrap();
        assert_eq!(curve.kind(), CurveKind::Cubic);

        let eval = curve.value_at(25.0).unwrap();
        assert!((eval.value - 250.0).abs() < 1e-9);
    }

    #[test]
    fn test_evaluation_is_pure() {
        let curve = spec_curve();
        let first = curve.value_at(22.5).unwrap();
        for _ in 0..10 {
            assert_eq!(curve.value_at(22.5).unwrap(), first);
        }
    }
}
