//! TractionNorm Engine - caching interpolation engine for consumption norms
//!
//! Ties the other TractionNorm crates together:
//! - Validated norm ingestion with transactional cache invalidation
//! - Two-tier interpolation: persistent value rows over an in-process
//!   curve cache with TTL, LRU eviction, and generation fencing
//! - Persistent analysis result cache with read-side expiry and batched
//!   background sweeps
//! - Engine counters for cache monitoring
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────── NormEngine ──────────────────────┐
//! │                                                        │
//! │  NormStore          Interpolator         AnalysisCache │
//! │  (validate,         (value rows →        (fingerprint, │
//! │   invalidate)        curves → build)      TTL, sweeps) │
//! │       │                   │                    │       │
//! │       ▼                   ▼                    │       │
//! │  ┌─────────┐        ┌────────────┐             │       │
//! │  │ SQLite  │◀──────▶│ CurveCache │             │       │
//! │  │ (store) │        │ (Tier A)   │             │       │
//! │  └─────────┘◀───────┴────────────┴─────────────┘       │
//! └────────────────────────────────────────────────────────┘
//! ```

mod analysis_cache;
mod curve_cache;
mod engine;
mod error;
mod interpolator;
mod norm_store;
mod stats;

// Re-export public API
pub use analysis_cache::AnalysisCache;
pub use curve_cache::CurveCache;
pub use engine::NormEngine;
pub use error::{EngineError, Result};
pub use interpolator::{InterpolatedValue, Interpolator};
pub use norm_store::{NormStore, PutOutcome};
pub use stats::{EngineStats, EngineStatsSnapshot};
