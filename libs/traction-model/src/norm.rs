//! Norm Entities
//!
//! A norm is a set of (load, consumption) points describing the expected
//! specific energy consumption of a locomotive series over a section,
//! either per axle load or per train mass.

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One point of a norm characteristic
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormPoint {
    /// Load value the consumption was normed at
    pub load: f64,
    /// Normed consumption at that load
    pub consumption: f64,
    /// Position after sorting by ascending load, starting at 0
    pub order: u32,
}

/// Kind of characteristic a norm is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormKind {
    /// Consumption per axle load (t/axle)
    AxleLoad,
    /// Consumption per full train mass (t)
    TrainMass,
}

impl NormKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormKind::AxleLoad => "axle_load",
            NormKind::TrainMass => "train_mass",
        }
    }
}

impl FromStr for NormKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "axle_load" => Ok(NormKind::AxleLoad),
            "train_mass" => Ok(NormKind::TrainMass),
            other => Err(ModelError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for NormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored norm with its validated point set
///
/// Points are sorted by ascending load. A norm is usable for interpolation
/// only when it holds at least two points; validation maintains that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Norm {
    pub norm_id: String,
    pub kind: NormKind,
    pub points: Vec<NormPoint>,
    /// Last mutation timestamp, milliseconds since Unix epoch
    pub updated_at_ms: i64,
}

impl Norm {
    /// Whether the norm carries enough points to interpolate
    pub fn is_usable(&self) -> bool {
        self.points.len() >= crate::validation::MIN_POINTS
    }

    /// Smallest and largest load of the point set
    pub fn load_span(&self) -> Option<(f64, f64)> {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => Some((first.load, last.load)),
            _ => None,
        }
    }
}
