//! Two-tier interpolation read path
//!
//! `interpolate` answers from the persistent value cache when a row lies
//! within tolerance of the query, otherwise evaluates a curve from the
//! in-process cache (building it from stored points on a miss) and writes
//! the result back best-effort.

use crate::curve_cache::CurveCache;
use crate::error::Result;
use crate::stats::EngineStats;
use sqlx::SqlitePool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use traction_calc::{Evaluation, NormCurve};
use traction_common::TimeProvider;
use traction_store::{norms, values, CachedValue};
use tracing::{debug, warn};

/// Rebuild retries when the norm mutates mid-build
const MAX_BUILD_ATTEMPTS: u32 = 3;

/// One interpolated consumption value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolatedValue {
    pub value: f64,
    /// True when the query fell outside the norm's load range and the
    /// boundary value was returned
    pub clamped: bool,
    /// True when the value came from the persistent cache
    pub cached: bool,
}

/// Interpolation front over both cache tiers
pub struct Interpolator {
    pool: SqlitePool,
    curves: Arc<CurveCache>,
    /// Persistent-cache match tolerance on the load axis
    tolerance: f64,
    time: Arc<dyn TimeProvider>,
    stats: Arc<EngineStats>,
}

impl Interpolator {
    pub fn new(
        pool: SqlitePool,
        curves: Arc<CurveCache>,
        tolerance: f64,
        time: Arc<dyn TimeProvider>,
        stats: Arc<EngineStats>,
    ) -> Self {
        Self {
            pool,
            curves,
            tolerance,
            time,
            stats,
        }
    }

    /// Interpolate a norm's consumption at `parameter`
    ///
    /// Returns `Ok(None)` for an unknown norm and for evaluations the
    /// numeric guard rejects. Cache failures on this path degrade to
    /// recomputation or a skipped write; they never fail the request.
    pub async fn interpolate(
        &self,
        norm_id: &str,
        parameter: f64,
    ) -> Result<Option<InterpolatedValue>> {
        let now = self.time.now_millis();

        match values::find_within(&self.pool, norm_id, parameter, self.tolerance).await {
            Ok(Some(cached)) => {
                self.stats.value_hits.fetch_add(1, Ordering::Relaxed);
                if let Err(e) = values::touch(&self.pool, norm_id, cached.parameter, now).await {
                    self.stats.cache_write_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(norm_id, error = %e, "Value cache touch failed");
                }
                return Ok(Some(InterpolatedValue {
                    value: cached.value,
                    clamped: cached.clamped,
                    cached: true,
                }));
            }
            Ok(None) => {}
            Err(e) => {
                warn!(norm_id, error = %e, "Value cache read failed, recomputing");
            }
        }
        self.stats.value_misses.fetch_add(1, Ordering::Relaxed);

        let Some((curve, generation)) = self.curve_for(norm_id).await? else {
            return Ok(None);
        };

        let Some(eval) = curve.value_at(parameter) else {
            self.stats.numeric_rejections.fetch_add(1, Ordering::Relaxed);
            warn!(norm_id, parameter, "Evaluation rejected by numeric guard");
            return Ok(None);
        };

        if eval.clamped {
            self.stats.clamped_evaluations.fetch_add(1, Ordering::Relaxed);
            debug!(norm_id, parameter, "Query outside norm range, clamped");
        }

        self.write_back(norm_id, parameter, &eval, generation, now)
            .await;

        Ok(Some(InterpolatedValue {
            value: eval.value,
            clamped: eval.clamped,
            cached: false,
        }))
    }

    /// Best-effort persistence of a freshly computed value
    ///
    /// Skipped when the norm's generation moved past the one the curve was
    /// built under: the mutation's purge already cleared this norm's rows,
    /// and writing would resurrect a pre-replacement value. The value itself
    /// is still fine for the caller; it was correct when evaluated.
    async fn write_back(
        &self,
        norm_id: &str,
        parameter: f64,
        eval: &Evaluation,
        generation: u64,
        now: i64,
    ) {
        if self.curves.generation(norm_id) != generation {
            self.stats.stale_write_skips.fetch_add(1, Ordering::Relaxed);
            debug!(norm_id, parameter, "Norm changed after evaluation, skipping cache write");
            return;
        }

        let row = CachedValue {
            parameter,
            value: eval.value,
            clamped: eval.clamped,
        };
        if let Err(e) = values::upsert(&self.pool, norm_id, &row, now).await {
            self.stats.cache_write_failures.fetch_add(1, Ordering::Relaxed);
            warn!(norm_id, parameter, error = %e, "Value cache write failed");
        }
    }

    /// Cached or freshly built curve for a norm, with the generation it
    /// was built under
    ///
    /// Concurrent misses serialize on a per-norm lock so the points are
    /// read and the curve built once. A build whose generation went stale
    /// retries with fresh points; after the retry limit the last curve is
    /// served without being cached, still tagged with its (stale) build
    /// generation so the caller skips the value-cache write too.
    async fn curve_for(&self, norm_id: &str) -> Result<Option<(Arc<NormCurve>, u64)>> {
        if let Some(hit) = self.curves.get_fresh(norm_id) {
            self.stats.curve_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(hit));
        }

        let lock = self.curves.build_lock(norm_id);
        let _guard = lock.lock().await;

        // Another task may have built while we waited
        if let Some(hit) = self.curves.get_fresh(norm_id) {
            self.stats.curve_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(hit));
        }

        let mut attempt = 1;
        loop {
            let generation = self.curves.generation(norm_id);
            let Some(norm) = norms::fetch_norm(&self.pool, norm_id).await? else {
                debug!(norm_id, "No stored norm to build a curve from");
                return Ok(None);
            };
            let curve = Arc::new(NormCurve::build(&norm.points)?);
            self.stats.curve_builds.fetch_add(1, Ordering::Relaxed);

            if self.curves.insert_if_current(norm_id, curve.clone(), generation) {
                return Ok(Some((curve, generation)));
            }
            if attempt >= MAX_BUILD_ATTEMPTS {
                warn!(
                    norm_id,
                    attempts = attempt,
                    "Norm kept changing during rebuild, serving uncached curve"
                );
                return Ok(Some((curve, generation)));
            }
            attempt += 1;
            debug!(norm_id, attempt, "Norm changed during rebuild, retrying");
        }
    }
}
