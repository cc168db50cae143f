//! Time provider abstraction for cache bookkeeping
//!
//! TTL checks and last-used stamps go through a provider instead of the
//! system clock directly, so expiry behavior stays deterministic in tests.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Time provider trait for generating timestamps
pub trait TimeProvider: Send + Sync + 'static {
    /// Get current timestamp in milliseconds since Unix epoch
    fn now_millis(&self) -> i64;
}

/// System time provider using the local clock
///
/// Default implementation for production use.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Manually driven time provider for testing
///
/// Starts at a given timestamp and only moves when told to, which makes
/// TTL expiry and last-used ordering reproducible.
#[derive(Debug, Default)]
pub struct ManualTimeProvider {
    now_ms: AtomicI64,
}

impl ManualTimeProvider {
    /// Create a provider starting at the given timestamp
    pub fn new(start_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(start_ms),
        }
    }

    /// Advance the clock by the given number of milliseconds
    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }

    /// Jump the clock to an absolute timestamp
    pub fn set(&self, now_ms: i64) {
        self.now_ms.store(now_ms, Ordering::SeqCst);
    }
}

impl TimeProvider for ManualTimeProvider {
    fn now_millis(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
