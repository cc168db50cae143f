//! Database schema for TractionNorm
//!
//! DDL constants plus a bootstrap that creates all tables and indexes.
//! Tests and production go through the same `init_schema`.

use crate::error::Result;
use sqlx::SqlitePool;

// ============================================================================
// Norm tables
// ============================================================================

/// Norms table DDL
pub const NORMS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS norms (
        norm_id TEXT NOT NULL PRIMARY KEY,
        kind TEXT NOT NULL,
        updated_at INTEGER NOT NULL
    )
"#;

/// Norm points table DDL; points are replaced wholesale on every put
pub const NORM_POINTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS norm_points (
        norm_id TEXT NOT NULL REFERENCES norms(norm_id) ON DELETE CASCADE,
        ord INTEGER NOT NULL,
        load REAL NOT NULL,
        consumption REAL NOT NULL,
        PRIMARY KEY (norm_id, ord)
    )
"#;

// ============================================================================
// Cache tables
// ============================================================================

/// Persistent interpolated-value cache (Tier B)
pub const VALUE_CACHE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS value_cache (
        norm_id TEXT NOT NULL,
        parameter REAL NOT NULL,
        value REAL NOT NULL,
        clamped INTEGER NOT NULL DEFAULT 0,
        last_used INTEGER NOT NULL,
        PRIMARY KEY (norm_id, parameter)
    )
"#;

/// Persistent analysis result cache, keyed by parameter fingerprint
pub const ANALYSIS_CACHE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS analysis_cache (
        analysis_hash TEXT NOT NULL PRIMARY KEY,
        section TEXT NOT NULL,
        norm_id TEXT,
        single_section INTEGER NOT NULL,
        use_coefficients INTEGER NOT NULL,
        stats_json TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        last_used INTEGER NOT NULL,
        completed_at INTEGER NOT NULL
    )
"#;

/// Expiry sweeps scan by creation time
pub const ANALYSIS_CREATED_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_analysis_cache_created ON analysis_cache(created_at)";

/// Norm mutations purge matching analyses by norm id
pub const ANALYSIS_NORM_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_analysis_cache_norm ON analysis_cache(norm_id)";

/// Route rows embedded in an analysis result
pub const ANALYSIS_ROUTES_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS analysis_routes (
        analysis_hash TEXT NOT NULL REFERENCES analysis_cache(analysis_hash) ON DELETE CASCADE,
        ord INTEGER NOT NULL,
        route TEXT NOT NULL,
        axle_load REAL NOT NULL,
        fact_consumption REAL NOT NULL,
        norm_consumption REAL NOT NULL,
        interpolated_norm REAL NOT NULL,
        deviation_percent REAL NOT NULL,
        band TEXT NOT NULL,
        PRIMARY KEY (analysis_hash, ord)
    )
"#;

/// Create all tables and indexes
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for ddl in [
        NORMS_TABLE,
        NORM_POINTS_TABLE,
        VALUE_CACHE_TABLE,
        ANALYSIS_CACHE_TABLE,
        ANALYSIS_CREATED_INDEX,
        ANALYSIS_NORM_INDEX,
        ANALYSIS_ROUTES_TABLE,
    ] {
        sqlx::query(ddl).execute(pool).await?;
    }
    Ok(())
}
