//! Integration tests for the persistent interpolated-value cache
//!
//! Covers tolerance-window matching, nearest-row preference, refresh on
//! conflict, and per-norm purges.

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use sqlx::Row;
use traction_store::{init_schema, values, CachedValue, StoreClient};

const TOLERANCE: f64 = 0.001;

async fn setup() -> StoreClient {
    let client = StoreClient::in_memory()
        .await
        .expect("Failed to open in-memory database");
    init_schema(client.pool())
        .await
        .expect("Failed to create schema");
    client
}

fn cached(parameter: f64, value: f64) -> CachedValue {
    CachedValue {
        parameter,
        value,
        clamped: false,
    }
}

#[tokio::test]
async fn test_find_within_tolerance() {
    let client = setup().await;
    values::upsert(client.pool(), "N1", &cached(25.0, 233.33), 100)
        .await
        .unwrap();

    let hit = values::find_within(client.pool(), "N1", 25.0004, TOLERANCE)
        .await
        .unwrap()
        .expect("value within tolerance should match");

    assert_eq!(hit.parameter, 25.0);
    assert_eq!(hit.value, 233.33);
    assert!(!hit.clamped);
}

#[tokio::test]
async fn test_find_outside_tolerance_returns_none() {
    let client = setup().await;
    values::upsert(client.pool(), "N1", &cached(25.0, 233.33), 100)
        .await
        .unwrap();

    let miss = values::find_within(client.pool(), "N1", 25.1, TOLERANCE)
        .await
        .unwrap();
    assert!(miss.is_none());

    // Other norms never match
    let miss = values::find_within(client.pool(), "N2", 25.0, TOLERANCE)
        .await
        .unwrap();
    assert!(miss.is_none());
}

#[tokio::test]
async fn test_find_prefers_nearest_row() {
    let client = setup().await;
    values::upsert(client.pool(), "N1", &cached(24.9995, 1.0), 100)
        .await
        .unwrap();
    values::upsert(client.pool(), "N1", &cached(25.0008, 2.0), 100)
        .await
        .unwrap();

    let hit = values::find_within(client.pool(), "N1", 25.0, TOLERANCE)
        .await
        .unwrap()
        .unwrap();

    // 24.9995 is 0.0005 away, 25.0008 is 0.0008 away
    assert_eq!(hit.parameter, 24.9995);
    assert_eq!(hit.value, 1.0);
}

#[tokio::test]
async fn test_upsert_refreshes_existing_row() {
    let client = setup().await;
    values::upsert(client.pool(), "N1", &cached(25.0, 1.0), 100)
        .await
        .unwrap();
    let refreshed = CachedValue {
        parameter: 25.0,
        value: 2.0,
        clamped: true,
    };
    values::upsert(client.pool(), "N1", &refreshed, 200)
        .await
        .unwrap();

    assert_eq!(values::count(client.pool()).await.unwrap(), 1);

    let hit = values::find_within(client.pool(), "N1", 25.0, TOLERANCE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(hit.value, 2.0);
    assert!(hit.clamped);
}

#[tokio::test]
async fn test_touch_updates_last_used() {
    let client = setup().await;
    values::upsert(client.pool(), "N1", &cached(25.0, 1.0), 100)
        .await
        .unwrap();

    values::touch(client.pool(), "N1", 25.0, 250).await.unwrap();

    let row = sqlx::query("SELECT last_used FROM value_cache WHERE norm_id = 'N1'")
        .fetch_one(client.pool())
        .await
        .unwrap();
    let last_used: i64 = row.try_get("last_used").unwrap();
    assert_eq!(last_used, 250);
}

#[tokio::test]
async fn test_purge_norm_keeps_other_norms() {
    let client = setup().await;
    values::upsert(client.pool(), "N1", &cached(25.0, 1.0), 100)
        .await
        .unwrap();
    values::upsert(client.pool(), "N1", &cached(30.0, 2.0), 100)
        .await
        .unwrap();
    values::upsert(client.pool(), "N2", &cached(25.0, 3.0), 100)
        .await
        .unwrap();

    let mut tx = client.pool().begin().await.unwrap();
    let purged = values::purge_norm_tx(&mut tx, "N1").await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(purged, 2);
    assert_eq!(values::count(client.pool()).await.unwrap(), 1);
    assert!(values::find_within(client.pool(), "N2", 25.0, TOLERANCE)
        .await
        .unwrap()
        .is_some());
}
