//! Deviation Classification
//!
//! Maps the percentage deviation of actual from normed consumption into
//! seven ordered bands: three economy grades, normal, three overrun grades.

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Deviations within ±5% count as normal
pub const WEAK_LIMIT_PERCENT: f64 = 5.0;

/// Weak economy/overrun ends at ±10%
pub const MEDIUM_LIMIT_PERCENT: f64 = 10.0;

/// Medium economy/overrun ends at ±15%; beyond is strong
pub const STRONG_LIMIT_PERCENT: f64 = 15.0;

/// Deviation band, ordered from strongest economy to strongest overrun
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DeviationBand {
    EconomyStrong,
    EconomyMedium,
    EconomyWeak,
    Normal,
    OverrunWeak,
    OverrunMedium,
    OverrunStrong,
}

impl DeviationBand {
    /// Classify a deviation percentage
    ///
    /// Total over all finite inputs and monotonic in `percent`. Band edges:
    /// -15 is economy-medium, -10 economy-weak, -5 and 5 normal,
    /// 10 overrun-weak, 15 overrun-medium.
    pub fn classify(percent: f64) -> Self {
        // Unmeasurable deviation counts as normal; upstream guards keep
        // NaN from reaching here in the first place.
        if percent.is_nan() {
            return DeviationBand::Normal;
        }

        if percent < -STRONG_LIMIT_PERCENT {
            DeviationBand::EconomyStrong
        } else if percent < -MEDIUM_LIMIT_PERCENT {
            DeviationBand::EconomyMedium
        } else if percent < -WEAK_LIMIT_PERCENT {
            DeviationBand::EconomyWeak
        } else if percent <= WEAK_LIMIT_PERCENT {
            DeviationBand::Normal
        } else if percent <= MEDIUM_LIMIT_PERCENT {
            DeviationBand::OverrunWeak
        } else if percent <= STRONG_LIMIT_PERCENT {
            DeviationBand::OverrunMedium
        } else {
            DeviationBand::OverrunStrong
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeviationBand::EconomyStrong => "economy_strong",
            DeviationBand::EconomyMedium => "economy_medium",
            DeviationBand::EconomyWeak => "economy_weak",
            DeviationBand::Normal => "normal",
            DeviationBand::OverrunWeak => "overrun_weak",
            DeviationBand::OverrunMedium => "overrun_medium",
            DeviationBand::OverrunStrong => "overrun_strong",
        }
    }

    /// Stable position of the band, 0 (strongest economy) to 6
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn is_economy(&self) -> bool {
        matches!(
            self,
            DeviationBand::EconomyStrong | DeviationBand::EconomyMedium | DeviationBand::EconomyWeak
        )
    }

    pub fn is_overrun(&self) -> bool {
        matches!(
            self,
            DeviationBand::OverrunWeak | DeviationBand::OverrunMedium | DeviationBand::OverrunStrong
        )
    }
}

impl FromStr for DeviationBand {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "economy_strong" => Ok(DeviationBand::EconomyStrong),
            "economy_medium" => Ok(DeviationBand::EconomyMedium),
            "economy_weak" => Ok(DeviationBand::EconomyWeak),
            "normal" => Ok(DeviationBand::Normal),
            "overrun_weak" => Ok(DeviationBand::OverrunWeak),
            "overrun_medium" => Ok(DeviationBand::OverrunMedium),
            "overrun_strong" => Ok(DeviationBand::OverrunStrong),
            other => Err(ModelError::UnknownBand(other.to_string())),
        }
    }
}

impl fmt::Display for DeviationBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentage deviation of actual from normed consumption
///
/// Returns `None` when the norm value is non-positive or either input is
/// non-finite; the caller treats that as "no deviation available".
pub fn deviation_percent(fact: f64, norm: f64) -> Option<f64> {
    if !fact.is_finite() || !norm.is_finite() || norm <= 0.0 {
        return None;
    }
    Some((fact - norm) / norm * 100.0)
}
