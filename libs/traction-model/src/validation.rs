//! Norm Point Validation
//!
//! Pure validation logic for norm ingestion.
//! No database or IO dependencies.

use crate::error::{ModelError, Result};
use crate::norm::NormPoint;
use rustc_hash::FxHashSet;
use traction_common::config::ValidationConfig;

/// Minimum number of valid points a norm must keep to be interpolatable
pub const MIN_POINTS: usize = 2;

/// Outcome of point validation with drop diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPoints {
    /// Surviving points, sorted by ascending load, `order` assigned from 0
    pub points: Vec<NormPoint>,
    /// Points dropped for non-finite or out-of-bounds coordinates
    pub dropped_out_of_range: usize,
    /// Points dropped as duplicate loads (first occurrence kept)
    pub dropped_duplicates: usize,
}

/// Validate raw (load, consumption) pairs against the configured limits
///
/// Rules, applied in order:
/// 1. Drop pairs with a non-finite coordinate or one outside the limits.
/// 2. Reject the whole set when fewer than [`MIN_POINTS`] survive.
/// 3. Drop pairs whose load collides with an earlier one after rounding to
///    `load_precision` decimal places; the first occurrence in input order
///    wins. Reject again if the survivors fall below [`MIN_POINTS`].
/// 4. Sort by ascending load and assign `order`.
///
/// Rejection is a typed [`ModelError::TooFewPoints`]; dropped-point counts
/// come back in [`ValidatedPoints`] for the caller to log.
pub fn validate_points(raw: &[(f64, f64)], limits: &ValidationConfig) -> Result<ValidatedPoints> {
    let mut dropped_out_of_range = 0usize;
    let mut in_range: Vec<(f64, f64)> = Vec::with_capacity(raw.len());

    for &(load, consumption) in raw {
        let finite = load.is_finite() && consumption.is_finite();
        if !finite
            || load < limits.load_min
            || load > limits.load_max
            || consumption < limits.consumption_min
            || consumption > limits.consumption_max
        {
            dropped_out_of_range += 1;
            continue;
        }
        in_range.push((load, consumption));
    }

    if in_range.len() < MIN_POINTS {
        return Err(ModelError::too_few_points(in_range.len()));
    }

    // Duplicate loads collapse onto the same rounded key
    let scale = 10f64.powi(limits.load_precision as i32);
    let mut seen: FxHashSet<i64> = FxHashSet::default();
    let mut dropped_duplicates = 0usize;
    let mut unique: Vec<(f64, f64)> = Vec::with_capacity(in_range.len());

    for (load, consumption) in in_range {
        let key = (load * scale).round() as i64;
        if seen.insert(key) {
            unique.push((load, consumption));
        } else {
            dropped_duplicates += 1;
        }
    }

    if unique.len() < MIN_POINTS {
        return Err(ModelError::too_few_points(unique.len()));
    }

    unique.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let points = unique
        .into_iter()
        .enumerate()
        .map(|(i, (load, consumption))| NormPoint {
            load,
            consumption,
            order: i as u32,
        })
        .collect();

    Ok(ValidatedPoints {
        points,
        dropped_out_of_range,
        dropped_duplicates,
    })
}
