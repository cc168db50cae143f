//! Validated norm ingestion with cache invalidation
//!
//! Every mutation runs as one transaction over the norm row, its points,
//! the persistent value cache, and pinned analyses. The in-process curve
//! generation is bumped only after commit, so readers can never cache a
//! curve built from rows that were about to change.

use crate::curve_cache::CurveCache;
use crate::error::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use traction_common::config::ValidationConfig;
use traction_common::TimeProvider;
use traction_model::{validate_points, Norm, NormKind};
use traction_store::{analysis, norms, values};
use tracing::{info, warn};

/// Counts from a successful norm ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOutcome {
    /// Points stored after validation
    pub kept: usize,
    pub dropped_out_of_range: usize,
    pub dropped_duplicates: usize,
}

/// Norm persistence front, owning validation and invalidation
pub struct NormStore {
    pool: SqlitePool,
    curves: Arc<CurveCache>,
    limits: ValidationConfig,
    time: Arc<dyn TimeProvider>,
}

impl NormStore {
    pub fn new(
        pool: SqlitePool,
        curves: Arc<CurveCache>,
        limits: ValidationConfig,
        time: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            pool,
            curves,
            limits,
            time,
        }
    }

    /// Validate and store a norm, replacing any existing point set
    ///
    /// Rejects the whole set when fewer than two points survive validation;
    /// the typed error carries the surviving count. Dropped points are
    /// logged and reported in the outcome, never silently discarded.
    pub async fn put(
        &self,
        norm_id: &str,
        kind: NormKind,
        raw_points: &[(f64, f64)],
    ) -> Result<PutOutcome> {
        let validated = validate_points(raw_points, &self.limits)?;
        if validated.dropped_out_of_range > 0 || validated.dropped_duplicates > 0 {
            warn!(
                norm_id,
                out_of_range = validated.dropped_out_of_range,
                duplicates = validated.dropped_duplicates,
                "Dropped invalid norm points"
            );
        }

        let norm = Norm {
            norm_id: norm_id.to_string(),
            kind,
            points: validated.points,
            updated_at_ms: self.time.now_millis(),
        };

        let mut tx = self.pool.begin().await?;
        norms::upsert_norm_tx(&mut tx, &norm).await?;
        let purged_values = values::purge_norm_tx(&mut tx, norm_id).await?;
        let purged_analyses = analysis::purge_norm_tx(&mut tx, norm_id).await?;
        tx.commit().await?;

        // Only after the rows are durable
        self.curves.invalidate(norm_id);

        info!(
            norm_id,
            kind = kind.as_str(),
            points = norm.points.len(),
            purged_values,
            purged_analyses,
            "Norm stored"
        );

        Ok(PutOutcome {
            kept: norm.points.len(),
            dropped_out_of_range: validated.dropped_out_of_range,
            dropped_duplicates: validated.dropped_duplicates,
        })
    }

    /// Delete a norm and every cache entry derived from it
    ///
    /// Returns whether the norm existed. Purges run either way; they are
    /// no-ops for an unknown id.
    pub async fn delete(&self, norm_id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let removed = norms::delete_norm_tx(&mut tx, norm_id).await?;
        values::purge_norm_tx(&mut tx, norm_id).await?;
        analysis::purge_norm_tx(&mut tx, norm_id).await?;
        tx.commit().await?;

        self.curves.invalidate(norm_id);

        if removed {
            info!(norm_id, "Norm deleted");
        }
        Ok(removed)
    }

    /// Fetch a stored norm with its validated points
    pub async fn get(&self, norm_id: &str) -> Result<Option<Norm>> {
        Ok(norms::fetch_norm(&self.pool, norm_id).await?)
    }

    /// Ids of all stored norms
    pub async fn list_ids(&self) -> Result<Vec<String>> {
        Ok(norms::list_norm_ids(&self.pool).await?)
    }
}
