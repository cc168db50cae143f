//! Analysis Result Entities
//!
//! A consumption analysis runs over one section (or a section group) and
//! produces per-route outcomes plus aggregate statistics. Results are
//! cached keyed by a deterministic hash of the request parameters.

use crate::deviation::DeviationBand;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Parameters identifying one analysis request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnalysisParams {
    /// Section (route segment) the analysis covers
    pub section: String,
    /// Restrict to a single norm; `None` analyzes against all matching norms
    pub norm_id: Option<String>,
    /// Treat the section in isolation instead of merging adjacent ones
    pub single_section: bool,
    /// Apply seasonal/profile correction coefficients to norm values
    pub use_coefficients: bool,
}

impl AnalysisParams {
    /// Deterministic cache key over all parameters
    ///
    /// Equal parameters always produce the same hash, across processes and
    /// restarts. Lowercase hex SHA-256; free-form fields are length-prefixed
    /// so distinct parameter sets can never render to the same bytes.
    pub fn fingerprint(&self) -> String {
        fn push(hasher: &mut Sha256, bytes: &[u8]) {
            hasher.update((bytes.len() as u64).to_le_bytes());
            hasher.update(bytes);
        }

        let mut hasher = Sha256::new();
        push(&mut hasher, self.section.as_bytes());
        match &self.norm_id {
            Some(norm_id) => {
                hasher.update([1u8]);
                push(&mut hasher, norm_id.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        hasher.update([self.single_section as u8, self.use_coefficients as u8]);
        format!("{:x}", hasher.finalize())
    }
}

/// Outcome of one route (trip) within an analysis
///
/// Results embed copies of these rows; nothing is shared with live data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteOutcome {
    /// Route (trip) identifier
    pub route: String,
    /// Load the norm was interpolated at
    pub axle_load: f64,
    /// Actual consumption recorded for the route
    pub fact_consumption: f64,
    /// Normed consumption for the route's work
    pub norm_consumption: f64,
    /// Raw interpolated norm value the norm consumption was derived from
    pub interpolated_norm: f64,
    /// Deviation of fact from norm, percent
    pub deviation_percent: f64,
    /// Band the deviation falls into
    pub band: DeviationBand,
}

/// Aggregate statistics of an analysis
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub route_count: u32,
    pub total_fact: f64,
    pub total_norm: f64,
    pub mean_deviation_percent: f64,
    pub economy_routes: u32,
    pub normal_routes: u32,
    pub overrun_routes: u32,
}

impl AnalysisStats {
    /// Derive aggregate statistics from per-route outcomes
    pub fn from_routes(routes: &[RouteOutcome]) -> Self {
        if routes.is_empty() {
            return Self::default();
        }

        let route_count = routes.len() as u32;
        let total_fact = routes.iter().map(|r| r.fact_consumption).sum();
        let total_norm = routes.iter().map(|r| r.norm_consumption).sum();
        let mean_deviation_percent =
            routes.iter().map(|r| r.deviation_percent).sum::<f64>() / routes.len() as f64;
        let economy_routes = routes.iter().filter(|r| r.band.is_economy()).count() as u32;
        let overrun_routes = routes.iter().filter(|r| r.band.is_overrun()).count() as u32;
        let normal_routes = route_count - economy_routes - overrun_routes;

        Self {
            route_count,
            total_fact,
            total_norm,
            mean_deviation_percent,
            economy_routes,
            normal_routes,
            overrun_routes,
        }
    }
}

/// What an analysis computation produces, before caching metadata is added
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub routes: Vec<RouteOutcome>,
    pub stats: AnalysisStats,
}

impl AnalysisOutcome {
    /// Build an outcome, deriving the statistics from the routes
    pub fn from_routes(routes: Vec<RouteOutcome>) -> Self {
        let stats = AnalysisStats::from_routes(&routes);
        Self { routes, stats }
    }
}

/// A cached analysis result with its bookkeeping timestamps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Cache key, `AnalysisParams::fingerprint()` of `params`
    pub analysis_hash: String,
    pub params: AnalysisParams,
    pub routes: Vec<RouteOutcome>,
    pub stats: AnalysisStats,
    /// When this entry (or its current content) was created
    pub created_at_ms: i64,
    /// Last read or write touch
    pub last_used_ms: i64,
    /// When the underlying computation finished
    pub completed_at_ms: i64,
}
