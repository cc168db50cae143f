//! Persistent analysis result cache
//!
//! Completed analyses are cached under a deterministic fingerprint of
//! their parameters. Retention is enforced twice: entries past their
//! maximum age are dropped on read, and every Nth put schedules a batched
//! background sweep that honors cancellation between batches.

use crate::error::{EngineError, Result};
use crate::stats::EngineStats;
use sqlx::SqlitePool;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use traction_common::config::AnalysisCacheConfig;
use traction_common::TimeProvider;
use traction_model::{AnalysisOutcome, AnalysisParams, AnalysisResult};
use traction_store::analysis;
use tracing::{debug, info, warn};

/// Cache of completed analyses, keyed by parameter fingerprint
pub struct AnalysisCache {
    pool: SqlitePool,
    config: AnalysisCacheConfig,
    time: Arc<dyn TimeProvider>,
    stats: Arc<EngineStats>,
    /// Successful puts since startup, drives the periodic sweep
    puts: AtomicU64,
    cancel: CancellationToken,
}

impl AnalysisCache {
    pub fn new(
        pool: SqlitePool,
        config: AnalysisCacheConfig,
        time: Arc<dyn TimeProvider>,
        stats: Arc<EngineStats>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            pool,
            config,
            time,
            stats,
            puts: AtomicU64::new(0),
            cancel,
        }
    }

    /// Cache key for a parameter set
    pub fn hash(params: &AnalysisParams) -> String {
        params.fingerprint()
    }

    /// Cached result for `params`, if present and not expired
    ///
    /// Expiry is enforced here as well, so a stale entry is dropped on
    /// first read even when no sweep ran since it aged out.
    pub async fn get(&self, params: &AnalysisParams) -> Result<Option<AnalysisResult>> {
        let hash = params.fingerprint();
        let Some(mut result) = analysis::fetch(&self.pool, &hash).await? else {
            self.stats.analysis_misses.fetch_add(1, Ordering::Relaxed);
            return Ok(None);
        };

        let now = self.time.now_millis();
        let max_age_ms = self.config.max_age().as_millis() as i64;
        if now.saturating_sub(result.created_at_ms) > max_age_ms {
            if let Err(e) = analysis::delete(&self.pool, &hash).await {
                self.stats.cache_write_failures.fetch_add(1, Ordering::Relaxed);
                warn!(analysis_hash = %hash, error = %e, "Failed to drop expired analysis");
            }
            self.stats.analysis_expired.fetch_add(1, Ordering::Relaxed);
            debug!(analysis_hash = %hash, "Expired analysis dropped on read");
            return Ok(None);
        }

        result.last_used_ms = now;
        // Entries written under a larger cap still come back bounded
        result.routes.truncate(self.config.route_cap);
        if let Err(e) = analysis::touch(&self.pool, &hash, now).await {
            self.stats.cache_write_failures.fetch_add(1, Ordering::Relaxed);
            warn!(analysis_hash = %hash, error = %e, "Analysis touch failed");
        }
        self.stats.analysis_hits.fetch_add(1, Ordering::Relaxed);
        Ok(Some(result))
    }

    /// Cache a computed analysis under its parameter fingerprint
    ///
    /// Overwrites any previous entry for the same parameters and refreshes
    /// `created_at`, so a renewed entry lives a full retention period.
    pub async fn put(
        &self,
        params: &AnalysisParams,
        outcome: AnalysisOutcome,
    ) -> Result<AnalysisResult> {
        let result = self.assemble(params, outcome);
        self.persist(&result).await?;
        Ok(result)
    }

    /// Cached result for `params`, computing and caching it on a miss
    ///
    /// Cache read failures degrade to recomputation, write failures to
    /// returning the uncached result. Only the computation itself fails
    /// the call.
    pub async fn get_or_compute<F, Fut>(
        &self,
        params: &AnalysisParams,
        compute: F,
    ) -> Result<AnalysisResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<AnalysisOutcome>>,
    {
        match self.get(params).await {
            Ok(Some(result)) => return Ok(result),
            Ok(None) => {}
            Err(e) => {
                warn!(section = %params.section, error = %e, "Analysis cache read failed, recomputing");
            }
        }

        let outcome = compute().await.map_err(|e| EngineError::analysis(&e))?;
        let result = self.assemble(params, outcome);
        if let Err(e) = self.persist(&result).await {
            self.stats.cache_write_failures.fetch_add(1, Ordering::Relaxed);
            warn!(
                analysis_hash = %result.analysis_hash,
                error = %e,
                "Analysis cache write failed, returning uncached result"
            );
        }
        Ok(result)
    }

    /// Remove expired entries in batches until none remain or `cancel` fires
    ///
    /// Cancellation is honored between batches; batches already committed
    /// stay deleted.
    pub async fn cleanup(&self, cancel: &CancellationToken) -> Result<u64> {
        let cutoff = self.cutoff();
        sweep(
            &self.pool,
            cutoff,
            self.config.cleanup_batch as u32,
            &self.stats,
            cancel,
        )
        .await
    }

    /// Drop every cached analysis
    pub async fn clear(&self) -> Result<u64> {
        let removed = analysis::clear(&self.pool).await?;
        info!(removed, "Analysis cache cleared");
        Ok(removed)
    }

    /// Number of cached analyses
    pub async fn count(&self) -> Result<i64> {
        Ok(analysis::count(&self.pool).await?)
    }

    fn assemble(&self, params: &AnalysisParams, outcome: AnalysisOutcome) -> AnalysisResult {
        let now = self.time.now_millis();
        let AnalysisOutcome { mut routes, stats } = outcome;
        if routes.len() > self.config.route_cap {
            warn!(
                section = %params.section,
                total = routes.len(),
                cap = self.config.route_cap,
                "Analysis route rows truncated for caching"
            );
            routes.truncate(self.config.route_cap);
        }

        AnalysisResult {
            analysis_hash: params.fingerprint(),
            params: params.clone(),
            routes,
            stats,
            created_at_ms: now,
            last_used_ms: now,
            completed_at_ms: now,
        }
    }

    async fn persist(&self, result: &AnalysisResult) -> Result<()> {
        analysis::upsert(&self.pool, result).await?;

        let puts = self.puts.fetch_add(1, Ordering::Relaxed) + 1;
        if self.config.cleanup_every_puts > 0 && puts % self.config.cleanup_every_puts == 0 {
            self.spawn_cleanup();
        }
        Ok(())
    }

    fn spawn_cleanup(&self) {
        let pool = self.pool.clone();
        let stats = self.stats.clone();
        let cancel = self.cancel.child_token();
        let cutoff = self.cutoff();
        let batch_size = self.config.cleanup_batch as u32;

        tokio::spawn(async move {
            match sweep(&pool, cutoff, batch_size, &stats, &cancel).await {
                Ok(removed) if removed > 0 => {
                    info!(removed, "Analysis cache cleanup finished");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Analysis cache cleanup failed"),
            }
        });
    }

    fn cutoff(&self) -> i64 {
        self.time
            .now_millis()
            .saturating_sub(self.config.max_age().as_millis() as i64)
    }
}

/// One expiry pass over entries created before `cutoff_ms`
async fn sweep(
    pool: &SqlitePool,
    cutoff_ms: i64,
    batch_size: u32,
    stats: &EngineStats,
    cancel: &CancellationToken,
) -> Result<u64> {
    let mut total = 0u64;
    loop {
        if cancel.is_cancelled() {
            debug!(removed = total, "Analysis cleanup cancelled at batch boundary");
            break;
        }

        let hashes = analysis::stale_hashes(pool, cutoff_ms, batch_size).await?;
        if hashes.is_empty() {
            break;
        }
        let last_batch = hashes.len() < batch_size as usize;

        let removed = analysis::delete_batch(pool, &hashes).await?;
        stats.cleanup_removed.fetch_add(removed, Ordering::Relaxed);
        total += removed;

        if last_batch {
            break;
        }
    }
    Ok(total)
}
