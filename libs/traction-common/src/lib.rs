//! TractionNorm common library
//!
//! Shared configuration, logging, time, and error types used across the
//! TractionNorm crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

// Re-exports for convenience
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use time::{ManualTimeProvider, SystemTimeProvider, TimeProvider};

/// Common prelude for TractionNorm crates
pub mod prelude {
    pub use crate::config::EngineConfig;
    pub use crate::error::{Error, Result};
    pub use crate::logging::init_logging;
    pub use crate::time::{SystemTimeProvider, TimeProvider};
    pub use tracing::{debug, error, info, trace, warn};
}
