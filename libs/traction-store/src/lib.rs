//! TractionNorm Store - SQLite persistence layer
//!
//! Provides:
//! - Pooled SQLite client with WAL and tuned pragmas
//! - Schema bootstrap shared by tests and production
//! - Norm repository (norms + point sets, replaced wholesale)
//! - Persistent interpolated-value cache rows (Tier B)
//! - Persistent analysis result cache with batched expiry sweeps
//!
//! Repositories are free async functions over `&SqlitePool`. Mutations
//! that must be atomic across tables come in `*_tx` variants that run
//! inside a caller-owned transaction.

pub mod analysis;
mod client;
mod error;
pub mod norms;
pub mod schema;
pub mod values;

pub use client::StoreClient;
pub use error::{Result, StoreError};
pub use schema::init_schema;
pub use values::CachedValue;
