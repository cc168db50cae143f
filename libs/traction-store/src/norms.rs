//! Norm Repository - SQLite persistence for norms and their points
//!
//! Point sets are replaced wholesale on every write; callers compose the
//! transaction-aware functions with the cache purges that belong to the
//! same mutation.

use crate::error::Result;
use sqlx::{sqlite::SqliteRow, Row, Sqlite, SqlitePool, Transaction};
use traction_model::{Norm, NormKind, NormPoint};

/// Fetch a norm with its points ordered by `ord`
///
/// Header and points are read in one transaction so a concurrent replace
/// cannot pair stale metadata with a new point set.
pub async fn fetch_norm(pool: &SqlitePool, norm_id: &str) -> Result<Option<Norm>> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(
        r#"
        SELECT norm_id, kind, updated_at
        FROM norms
        WHERE norm_id = ?
        "#,
    )
    .bind(norm_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        tx.commit().await?;
        return Ok(None);
    };

    let point_rows = sqlx::query(
        r#"
        SELECT ord, load, consumption
        FROM norm_points
        WHERE norm_id = ?
        ORDER BY ord ASC
        "#,
    )
    .bind(norm_id)
    .fetch_all(&mut *tx)
    .await?;
    tx.commit().await?;

    let mut points = Vec::with_capacity(point_rows.len());
    for point_row in point_rows {
        points.push(hydrate_point(point_row)?);
    }

    Ok(Some(hydrate_norm(row, points)?))
}

/// List all stored norm ids
pub async fn list_norm_ids(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT norm_id FROM norms ORDER BY norm_id ASC")
        .fetch_all(pool)
        .await?;

    let mut ids = Vec::with_capacity(rows.len());
    for row in rows {
        ids.push(row.try_get("norm_id")?);
    }
    Ok(ids)
}

/// Upsert a norm and replace its point set, inside the caller's transaction
pub async fn upsert_norm_tx(tx: &mut Transaction<'_, Sqlite>, norm: &Norm) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO norms (norm_id, kind, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(norm_id) DO UPDATE SET
            kind = excluded.kind,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&norm.norm_id)
    .bind(norm.kind.as_str())
    .bind(norm.updated_at_ms)
    .execute(&mut **tx)
    .await?;

    sqlx::query("DELETE FROM norm_points WHERE norm_id = ?")
        .bind(&norm.norm_id)
        .execute(&mut **tx)
        .await?;

    for point in &norm.points {
        sqlx::query(
            r#"
            INSERT INTO norm_points (norm_id, ord, load, consumption)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&norm.norm_id)
        .bind(point.order as i64)
        .bind(point.load)
        .bind(point.consumption)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Delete a norm, inside the caller's transaction; points cascade
///
/// Returns whether a row was actually removed.
pub async fn delete_norm_tx(tx: &mut Transaction<'_, Sqlite>, norm_id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM norms WHERE norm_id = ?")
        .bind(norm_id)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn hydrate_norm(row: SqliteRow, points: Vec<NormPoint>) -> Result<Norm> {
    let norm_id: String = row.try_get("norm_id")?;
    let kind_str: String = row.try_get("kind")?;
    let updated_at_ms: i64 = row.try_get("updated_at")?;
    let kind: NormKind = kind_str.parse()?;

    Ok(Norm {
        norm_id,
        kind,
        points,
        updated_at_ms,
    })
}

fn hydrate_point(row: SqliteRow) -> Result<NormPoint> {
    let ord: i64 = row.try_get("ord")?;
    let load: f64 = row.try_get("load")?;
    let consumption: f64 = row.try_get("consumption")?;

    Ok(NormPoint {
        load,
        consumption,
        order: ord as u32,
    })
}
