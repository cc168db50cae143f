//! Interpolated Value Repository - persistent (norm, parameter) -> value rows
//!
//! Lookups match within a tolerance window and prefer the row whose
//! parameter is closest to the query. Writes are upserts keyed by the
//! exact parameter value.

use crate::error::Result;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

/// A persisted interpolation result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedValue {
    /// Parameter the value was computed for (may differ from the query
    /// by up to the match tolerance)
    pub parameter: f64,
    pub value: f64,
    pub clamped: bool,
}

/// Find the closest cached value within `tolerance` of `parameter`
pub async fn find_within(
    pool: &SqlitePool,
    norm_id: &str,
    parameter: f64,
    tolerance: f64,
) -> Result<Option<CachedValue>> {
    let row = sqlx::query(
        r#"
        SELECT parameter, value, clamped
        FROM value_cache
        WHERE norm_id = ? AND parameter BETWEEN ? AND ?
        ORDER BY ABS(parameter - ?) ASC
        LIMIT 1
        "#,
    )
    .bind(norm_id)
    .bind(parameter - tolerance)
    .bind(parameter + tolerance)
    .bind(parameter)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let clamped: i64 = row.try_get("clamped")?;
    Ok(Some(CachedValue {
        parameter: row.try_get("parameter")?,
        value: row.try_get("value")?,
        clamped: clamped != 0,
    }))
}

/// Insert or refresh a cached value at its exact parameter
pub async fn upsert(
    pool: &SqlitePool,
    norm_id: &str,
    cached: &CachedValue,
    now_ms: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO value_cache (norm_id, parameter, value, clamped, last_used)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(norm_id, parameter) DO UPDATE SET
            value = excluded.value,
            clamped = excluded.clamped,
            last_used = excluded.last_used
        "#,
    )
    .bind(norm_id)
    .bind(cached.parameter)
    .bind(cached.value)
    .bind(cached.clamped as i64)
    .bind(now_ms)
    .execute(pool)
    .await?;

    Ok(())
}

/// Refresh the last-used timestamp of a cached value
pub async fn touch(pool: &SqlitePool, norm_id: &str, parameter: f64, now_ms: i64) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE value_cache
        SET last_used = ?
        WHERE norm_id = ? AND parameter = ?
        "#,
    )
    .bind(now_ms)
    .bind(norm_id)
    .bind(parameter)
    .execute(pool)
    .await?;

    Ok(())
}

/// Remove every cached value for a norm, inside the caller's transaction
pub async fn purge_norm_tx(tx: &mut Transaction<'_, Sqlite>, norm_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM value_cache WHERE norm_id = ?")
        .bind(norm_id)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected())
}

/// Count cached values across all norms
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS cnt FROM value_cache")
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("cnt")?)
}
