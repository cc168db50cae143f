//! Analysis Result Repository - persistent cache of completed analyses
//!
//! One cache row per parameter fingerprint, route rows alongside. Writes
//! replace the whole result; sweeps work in hash batches so a cancelled
//! pass leaves committed batches in place.

use crate::error::Result;
use sqlx::{sqlite::SqliteRow, Row, Sqlite, SqlitePool, Transaction};
use traction_model::{AnalysisParams, AnalysisResult, AnalysisStats, DeviationBand, RouteOutcome};

/// Fetch a cached analysis with its routes ordered by `ord`
///
/// Header and routes are read in one transaction so a concurrent replace
/// cannot pair old statistics with a new route list.
pub async fn fetch(pool: &SqlitePool, analysis_hash: &str) -> Result<Option<AnalysisResult>> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        SELECT analysis_hash, section, norm_id, single_section, use_coefficients,
               stats_json, created_at, last_used, completed_at
        FROM analysis_cache
        WHERE analysis_hash = ?
        "#,
    )
    .bind(analysis_hash)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        tx.commit().await?;
        return Ok(None);
    };

    let route_rows = sqlx::query(
        r#"
        SELECT route, axle_load, fact_consumption, norm_consumption,
               interpolated_norm, deviation_percent, band
        FROM analysis_routes
        WHERE analysis_hash = ?
        ORDER BY ord ASC
        "#,
    )
    .bind(analysis_hash)
    .fetch_all(&mut *tx)
    .await?;
    tx.commit().await?;

    let mut routes = Vec::with_capacity(route_rows.len());
    for route_row in route_rows {
        routes.push(hydrate_route(route_row)?);
    }

    Ok(Some(hydrate_result(row, routes)?))
}

/// Insert or replace a cached analysis and all its routes, in one transaction
pub async fn upsert(pool: &SqlitePool, result: &AnalysisResult) -> Result<()> {
    let stats_json = serde_json::to_string(&result.stats)?;
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO analysis_cache
            (analysis_hash, section, norm_id, single_section, use_coefficients,
             stats_json, created_at, last_used, completed_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(analysis_hash) DO UPDATE SET
            section = excluded.section,
            norm_id = excluded.norm_id,
            single_section = excluded.single_section,
            use_coefficients = excluded.use_coefficients,
            stats_json = excluded.stats_json,
            created_at = excluded.created_at,
            last_used = excluded.last_used,
            completed_at = excluded.completed_at
        "#,
    )
    .bind(&result.analysis_hash)
    .bind(&result.params.section)
    .bind(result.params.norm_id.as_deref())
    .bind(result.params.single_section as i64)
    .bind(result.params.use_coefficients as i64)
    .bind(&stats_json)
    .bind(result.created_at_ms)
    .bind(result.last_used_ms)
    .bind(result.completed_at_ms)
    .execute(&mut *tx)
    .await?;

    sqlx::query("DELETE FROM analysis_routes WHERE analysis_hash = ?")
        .bind(&result.analysis_hash)
        .execute(&mut *tx)
        .await?;

    for (ord, route) in result.routes.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO analysis_routes
                (analysis_hash, ord, route, axle_load, fact_consumption,
                 norm_consumption, interpolated_norm, deviation_percent, band)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&result.analysis_hash)
        .bind(ord as i64)
        .bind(&route.route)
        .bind(route.axle_load)
        .bind(route.fact_consumption)
        .bind(route.norm_consumption)
        .bind(route.interpolated_norm)
        .bind(route.deviation_percent)
        .bind(route.band.as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Refresh the last-used timestamp of a cached analysis
pub async fn touch(pool: &SqlitePool, analysis_hash: &str, now_ms: i64) -> Result<()> {
    sqlx::query("UPDATE analysis_cache SET last_used = ? WHERE analysis_hash = ?")
        .bind(now_ms)
        .bind(analysis_hash)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete one cached analysis; routes cascade
///
/// Returns whether a row was actually removed.
pub async fn delete(pool: &SqlitePool, analysis_hash: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM analysis_cache WHERE analysis_hash = ?")
        .bind(analysis_hash)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Hashes of entries created before `cutoff_ms`, oldest first, at most `limit`
pub async fn stale_hashes(pool: &SqlitePool, cutoff_ms: i64, limit: u32) -> Result<Vec<String>> {
    let rows = sqlx::query(
        r#"
        SELECT analysis_hash
        FROM analysis_cache
        WHERE created_at < ?
        ORDER BY created_at ASC
        LIMIT ?
        "#,
    )
    .bind(cutoff_ms)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    let mut hashes = Vec::with_capacity(rows.len());
    for row in rows {
        hashes.push(row.try_get("analysis_hash")?);
    }
    Ok(hashes)
}

/// Delete a batch of cached analyses in one transaction
pub async fn delete_batch(pool: &SqlitePool, hashes: &[String]) -> Result<u64> {
    if hashes.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut removed = 0u64;
    for hash in hashes {
        let result = sqlx::query("DELETE FROM analysis_cache WHERE analysis_hash = ?")
            .bind(hash)
            .execute(&mut *tx)
            .await?;
        removed += result.rows_affected();
    }
    tx.commit().await?;

    Ok(removed)
}

/// Remove every cached analysis pinned to a norm, inside the caller's
/// transaction; analyses with no norm restriction are left alone
pub async fn purge_norm_tx(tx: &mut Transaction<'_, Sqlite>, norm_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM analysis_cache WHERE norm_id = ?")
        .bind(norm_id)
        .execute(&mut **tx)
        .await?;
    Ok(result.rows_affected())
}

/// Drop the whole analysis cache
pub async fn clear(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM analysis_cache")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Count cached analyses
pub async fn count(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS cnt FROM analysis_cache")
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("cnt")?)
}

fn hydrate_result(row: SqliteRow, routes: Vec<RouteOutcome>) -> Result<AnalysisResult> {
    let stats_json: String = row.try_get("stats_json")?;
    let stats: AnalysisStats = serde_json::from_str(&stats_json)?;
    let single_section: i64 = row.try_get("single_section")?;
    let use_coefficients: i64 = row.try_get("use_coefficients")?;

    Ok(AnalysisResult {
        analysis_hash: row.try_get("analysis_hash")?,
        params: AnalysisParams {
            section: row.try_get("section")?,
            norm_id: row.try_get("norm_id")?,
            single_section: single_section != 0,
            use_coefficients: use_coefficients != 0,
        },
        routes,
        stats,
        created_at_ms: row.try_get("created_at")?,
        last_used_ms: row.try_get("last_used")?,
        completed_at_ms: row.try_get("completed_at")?,
    })
}

fn hydrate_route(row: SqliteRow) -> Result<RouteOutcome> {
    let band_str: String = row.try_get("band")?;
    let band: DeviationBand = band_str.parse()?;

    Ok(RouteOutcome {
        route: row.try_get("route")?,
        axle_load: row.try_get("axle_load")?,
        fact_consumption: row.try_get("fact_consumption")?,
        norm_consumption: row.try_get("norm_consumption")?,
        interpolated_norm: row.try_get("interpolated_norm")?,
        deviation_percent: row.try_get("deviation_percent")?,
        band,
    })
}
