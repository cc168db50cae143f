//! In-process curve cache (Tier A)
//!
//! Caches built interpolation curves per norm with a build-time TTL and
//! LRU eviction over capacity. A per-norm generation counter fences
//! rebuilds against concurrent norm mutations: `invalidate` bumps the
//! generation before removing the entry, and `insert_if_current` refuses
//! curves that were built under an older generation.

use crate::stats::EngineStats;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use traction_calc::NormCurve;
use traction_common::config::CurveCacheConfig;
use traction_common::TimeProvider;

struct CurveEntry {
    curve: Arc<NormCurve>,
    /// Generation the curve's points were read under
    generation: u64,
    built_at_ms: i64,
    last_used_ms: AtomicI64,
}

/// Shared cache of built curves, keyed by norm id
pub struct CurveCache {
    entries: DashMap<String, CurveEntry>,
    /// Monotonic per-norm counters, bumped on every mutation
    generations: DashMap<String, u64>,
    /// Per-norm build serialization so concurrent misses build once
    build_locks: DashMap<String, Arc<Mutex<()>>>,
    /// Held by whichever thread is evicting over-capacity entries
    prune_lock: parking_lot::Mutex<()>,
    ttl_ms: i64,
    max_entries: usize,
    time: Arc<dyn TimeProvider>,
    stats: Arc<EngineStats>,
}

impl CurveCache {
    pub fn new(
        config: &CurveCacheConfig,
        time: Arc<dyn TimeProvider>,
        stats: Arc<EngineStats>,
    ) -> Self {
        Self {
            entries: DashMap::new(),
            generations: DashMap::new(),
            build_locks: DashMap::new(),
            prune_lock: parking_lot::Mutex::new(()),
            ttl_ms: config.ttl().as_millis() as i64,
            max_entries: config.max_entries,
            time,
            stats,
        }
    }

    /// Current generation for a norm; zero until the first invalidation
    pub fn generation(&self, norm_id: &str) -> u64 {
        self.generations.get(norm_id).map(|g| *g).unwrap_or(0)
    }

    /// Bump the norm's generation, then drop its cached curve
    ///
    /// The bump must happen first: a rebuild racing with this call holds a
    /// generation captured before the mutation, which `insert_if_current`
    /// rejects. The build lock is reaped too; a racing builder keeps its
    /// clone and the next miss creates a fresh one.
    pub fn invalidate(&self, norm_id: &str) {
        *self.generations.entry(norm_id.to_string()).or_insert(0) += 1;
        self.entries.remove(norm_id);
        self.build_locks.remove(norm_id);
    }

    /// Fresh cached curve for a norm with the generation it was built
    /// under, touching its LRU timestamp
    pub fn get_fresh(&self, norm_id: &str) -> Option<(Arc<NormCurve>, u64)> {
        let now = self.time.now_millis();
        let current_gen = self.generation(norm_id);

        let entry = self.entries.get(norm_id)?;
        if entry.generation != current_gen {
            drop(entry);
            if self
                .entries
                .remove_if(norm_id, |_, e| e.generation != current_gen)
                .is_some()
            {
                self.stats.stale_discards.fetch_add(1, Ordering::Relaxed);
            }
            return None;
        }
        if now.saturating_sub(entry.built_at_ms) > self.ttl_ms {
            drop(entry);
            if self
                .entries
                .remove_if(norm_id, |_, e| {
                    now.saturating_sub(e.built_at_ms) > self.ttl_ms
                })
                .is_some()
            {
                self.stats.curve_expired.fetch_add(1, Ordering::Relaxed);
            }
            return None;
        }

        entry.last_used_ms.store(now, Ordering::Relaxed);
        Some((entry.curve.clone(), entry.generation))
    }

    /// Insert a curve built under `generation`, unless the norm moved on
    ///
    /// Returns false when the generation no longer matches. The caller's
    /// curve is still valid for its own evaluation but must not be cached.
    pub fn insert_if_current(&self, norm_id: &str, curve: Arc<NormCurve>, generation: u64) -> bool {
        if self.generation(norm_id) != generation {
            self.stats.stale_discards.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let now = self.time.now_millis();
        self.entries.insert(
            norm_id.to_string(),
            CurveEntry {
                curve,
                generation,
                built_at_ms: now,
                last_used_ms: AtomicI64::new(now),
            },
        );
        self.prune();
        true
    }

    /// Per-norm build lock
    pub fn build_lock(&self, norm_id: &str) -> Arc<Mutex<()>> {
        self.build_locks
            .entry(norm_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Number of cached curves
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evict least-recently-used entries until the cache fits its capacity
    fn prune(&self) {
        if self.entries.len() <= self.max_entries {
            return;
        }
        // One pruner at a time; concurrent inserts skip and let it finish
        let Some(_guard) = self.prune_lock.try_lock() else {
            return;
        };

        let over = self.entries.len().saturating_sub(self.max_entries);
        if over == 0 {
            return;
        }

        let mut ages: Vec<(String, i64)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().last_used_ms.load(Ordering::Relaxed)))
            .collect();
        ages.sort_by_key(|(_, used)| *used);

        for (norm_id, _) in ages.into_iter().take(over) {
            if self.entries.remove(&norm_id).is_some() {
                self.build_locks.remove(&norm_id);
                self.stats.curve_evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}
