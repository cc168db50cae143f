//! Engine facade wiring storage, caches, and interpolation together

use crate::analysis_cache::AnalysisCache;
use crate::curve_cache::CurveCache;
use crate::error::Result;
use crate::interpolator::{InterpolatedValue, Interpolator};
use crate::norm_store::{NormStore, PutOutcome};
use crate::stats::{EngineStats, EngineStatsSnapshot};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use traction_common::{EngineConfig, SystemTimeProvider, TimeProvider};
use traction_model::{AnalysisOutcome, AnalysisParams, AnalysisResult, Norm, NormKind};
use traction_store::{init_schema, StoreClient};
use tracing::info;

/// Single entry point for norm storage, interpolation, and analysis caching
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct NormEngine {
    client: StoreClient,
    norms: NormStore,
    interpolator: Interpolator,
    analyses: AnalysisCache,
    curves: Arc<CurveCache>,
    stats: Arc<EngineStats>,
    cancel: CancellationToken,
}

impl NormEngine {
    /// Open the configured database file and assemble the engine
    pub async fn connect(config: &EngineConfig) -> Result<Self> {
        let client =
            StoreClient::new(&config.database.path, config.database.max_connections).await?;
        Self::with_client(client, config, Arc::new(SystemTimeProvider)).await
    }

    /// Engine over an in-memory database
    pub async fn in_memory(config: &EngineConfig) -> Result<Self> {
        let client = StoreClient::in_memory().await?;
        Self::with_client(client, config, Arc::new(SystemTimeProvider)).await
    }

    /// Assemble the engine over an existing client and time source
    pub async fn with_client(
        client: StoreClient,
        config: &EngineConfig,
        time: Arc<dyn TimeProvider>,
    ) -> Result<Self> {
        init_schema(client.pool()).await?;

        let stats = Arc::new(EngineStats::default());
        let cancel = CancellationToken::new();
        let curves = Arc::new(CurveCache::new(
            &config.curve_cache,
            time.clone(),
            stats.clone(),
        ));

        let norms = NormStore::new(
            client.pool().clone(),
            curves.clone(),
            config.validation.clone(),
            time.clone(),
        );
        let interpolator = Interpolator::new(
            client.pool().clone(),
            curves.clone(),
            config.value_cache.tolerance,
            time.clone(),
            stats.clone(),
        );
        let analyses = AnalysisCache::new(
            client.pool().clone(),
            config.analysis_cache.clone(),
            time,
            stats.clone(),
            cancel.child_token(),
        );

        info!(path = client.path(), "Norm engine ready");

        Ok(Self {
            client,
            norms,
            interpolator,
            analyses,
            curves,
            stats,
            cancel,
        })
    }

    // ========================================================================
    // Norms
    // ========================================================================

    /// Validate and store a norm, replacing any existing point set
    pub async fn put_norm(
        &self,
        norm_id: &str,
        kind: NormKind,
        points: &[(f64, f64)],
    ) -> Result<PutOutcome> {
        self.norms.put(norm_id, kind, points).await
    }

    /// Fetch a stored norm
    pub async fn get_norm(&self, norm_id: &str) -> Result<Option<Norm>> {
        self.norms.get(norm_id).await
    }

    /// Delete a norm and everything cached from it
    pub async fn delete_norm(&self, norm_id: &str) -> Result<bool> {
        self.norms.delete(norm_id).await
    }

    /// Ids of all stored norms
    pub async fn list_norm_ids(&self) -> Result<Vec<String>> {
        self.norms.list_ids().await
    }

    // ========================================================================
    // Interpolation
    // ========================================================================

    /// Interpolate a norm's consumption at `parameter`
    pub async fn interpolate(
        &self,
        norm_id: &str,
        parameter: f64,
    ) -> Result<Option<InterpolatedValue>> {
        self.interpolator.interpolate(norm_id, parameter).await
    }

    // ========================================================================
    // Analyses
    // ========================================================================

    /// Cached analysis for `params`, if present and not expired
    pub async fn analysis(&self, params: &AnalysisParams) -> Result<Option<AnalysisResult>> {
        self.analyses.get(params).await
    }

    /// Cache an already computed analysis
    pub async fn put_analysis(
        &self,
        params: &AnalysisParams,
        outcome: AnalysisOutcome,
    ) -> Result<AnalysisResult> {
        self.analyses.put(params, outcome).await
    }

    /// Cached analysis for `params`, computing and caching it on a miss
    pub async fn analyze<F, Fut>(&self, params: &AnalysisParams, compute: F) -> Result<AnalysisResult>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<AnalysisOutcome>>,
    {
        self.analyses.get_or_compute(params, compute).await
    }

    /// Run one expiry sweep over the analysis cache
    pub async fn cleanup_analyses(&self) -> Result<u64> {
        let token = self.cancel.child_token();
        self.analyses.cleanup(&token).await
    }

    /// Drop every cached analysis
    pub async fn clear_analyses(&self) -> Result<u64> {
        self.analyses.clear().await
    }

    // ========================================================================
    // Engine
    // ========================================================================

    /// Snapshot of engine counters
    pub fn stats(&self) -> EngineStatsSnapshot {
        self.stats.snapshot()
    }

    /// Number of curves currently held in memory
    pub fn cached_curves(&self) -> usize {
        self.curves.len()
    }

    /// Underlying storage client
    pub fn client(&self) -> &StoreClient {
        &self.client
    }

    /// Stop background work; a running sweep exits at its next batch boundary
    pub fn shutdown(&self) {
        self.cancel.cancel();
        info!("Norm engine shut down");
    }
}
