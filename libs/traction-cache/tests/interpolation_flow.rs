//! Integration tests for the end-to-end interpolation flow
//!
//! Covers ingestion, both cache tiers, invalidation on norm mutation, and
//! the engine counters, all over in-memory SQLite.

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use std::sync::Arc;
use traction_cache::{EngineError, NormEngine};
use traction_common::EngineConfig;
use traction_model::{ModelError, NormKind};

const BASE_POINTS: [(f64, f64); 4] = [
    (10.0, 100.0),
    (20.0, 180.0),
    (30.0, 300.0),
    (40.0, 500.0),
];

async fn engine() -> NormEngine {
    let config = EngineConfig::default();
    NormEngine::in_memory(&config)
        .await
        .expect("Failed to assemble in-memory engine")
}

#[tokio::test]
async fn test_put_then_interpolate_midpoint() {
    let engine = engine().await;

    let outcome = engine
        .put_norm("N1", NormKind::AxleLoad, &BASE_POINTS)
        .await
        .unwrap();
    assert_eq!(outcome.kept, 4);
    assert_eq!(outcome.dropped_out_of_range, 0);
    assert_eq!(outcome.dropped_duplicates, 0);

    let value = engine
        .interpolate("N1", 25.0)
        .await
        .unwrap()
        .expect("value for known norm");

    // Local cubic through (20,180) and (30,300)
    assert!((value.value - 700.0 / 3.0).abs() < 1e-9);
    assert!(value.value > 180.0 && value.value < 300.0);
    assert!(!value.clamped);
    assert!(!value.cached);
}

#[tokio::test]
async fn test_clamp_below_and_above_range() {
    let engine = engine().await;
    engine
        .put_norm("N1", NormKind::AxleLoad, &BASE_POINTS)
        .await
        .unwrap();

    let below = engine.interpolate("N1", 5.0).await.unwrap().unwrap();
    assert_eq!(below.value, 100.0);
    assert!(below.clamped);

    let above = engine.interpolate("N1", 45.0).await.unwrap().unwrap();
    assert_eq!(above.value, 500.0);
    assert!(above.clamped);

    // Just under the lower bound, inside the range tolerance: boundary
    // value without the clamped flag
    let near = engine.interpolate("N1", 9.995).await.unwrap().unwrap();
    assert_eq!(near.value, 100.0);
    assert!(!near.clamped);

    assert_eq!(engine.stats().clamped_evaluations, 2);
}

#[tokio::test]
async fn test_repeat_query_hits_value_cache() {
    let engine = engine().await;
    engine
        .put_norm("N1", NormKind::AxleLoad, &BASE_POINTS)
        .await
        .unwrap();

    let first = engine.interpolate("N1", 25.0).await.unwrap().unwrap();
    assert!(!first.cached);

    let second = engine.interpolate("N1", 25.0).await.unwrap().unwrap();
    assert!(second.cached);
    assert_eq!(second.value, first.value);
    assert_eq!(second.clamped, first.clamped);

    // Within the value tolerance the persisted row still answers
    let near = engine.interpolate("N1", 25.0004).await.unwrap().unwrap();
    assert!(near.cached);
    assert_eq!(near.value, first.value);

    // Outside it the engine computes a fresh value
    let far = engine.interpolate("N1", 25.01).await.unwrap().unwrap();
    assert!(!far.cached);

    let stats = engine.stats();
    assert_eq!(stats.value_hits, 2);
    assert_eq!(stats.value_misses, 2);
    assert_eq!(stats.curve_builds, 1);
    assert_eq!(stats.curve_hits, 1);
}

#[tokio::test]
async fn test_cached_clamped_flag_round_trips() {
    let engine = engine().await;
    engine
        .put_norm("N1", NormKind::AxleLoad, &BASE_POINTS)
        .await
        .unwrap();

    let first = engine.interpolate("N1", 5.0).await.unwrap().unwrap();
    assert!(first.clamped && !first.cached);

    let second = engine.interpolate("N1", 5.0).await.unwrap().unwrap();
    assert!(second.clamped && second.cached);
    assert_eq!(second.value, 100.0);
}

#[tokio::test]
async fn test_put_replaces_points_and_invalidates_caches() {
    let engine = engine().await;
    engine
        .put_norm("N1", NormKind::AxleLoad, &BASE_POINTS)
        .await
        .unwrap();

    let original = engine.interpolate("N1", 25.0).await.unwrap().unwrap();
    assert!(engine.interpolate("N1", 25.0).await.unwrap().unwrap().cached);

    // Same loads, consumption raised 10 percent
    let scaled: Vec<(f64, f64)> = BASE_POINTS.iter().map(|&(x, y)| (x, y * 1.1)).collect();
    engine
        .put_norm("N1", NormKind::AxleLoad, &scaled)
        .await
        .unwrap();

    let updated = engine.interpolate("N1", 25.0).await.unwrap().unwrap();
    assert!(!updated.cached, "persistent rows must not survive a put");
    assert!((updated.value - original.value * 1.1).abs() < 1e-9);

    // The curve was rebuilt from the new points, not served from memory
    assert_eq!(engine.stats().curve_builds, 2);
}

#[tokio::test]
async fn test_delete_norm_clears_everything() {
    let engine = engine().await;
    engine
        .put_norm("N1", NormKind::AxleLoad, &BASE_POINTS)
        .await
        .unwrap();
    engine.interpolate("N1", 25.0).await.unwrap().unwrap();

    assert!(engine.delete_norm("N1").await.unwrap());
    assert!(!engine.delete_norm("N1").await.unwrap());

    assert!(engine.get_norm("N1").await.unwrap().is_none());
    assert!(engine.interpolate("N1", 25.0).await.unwrap().is_none());
    assert_eq!(engine.cached_curves(), 0);
}

#[tokio::test]
async fn test_unrelated_norm_survives_mutations() {
    let engine = engine().await;
    engine
        .put_norm("N1", NormKind::AxleLoad, &BASE_POINTS)
        .await
        .unwrap();
    engine
        .put_norm("N2", NormKind::TrainMass, &BASE_POINTS)
        .await
        .unwrap();

    engine.interpolate("N2", 25.0).await.unwrap().unwrap();

    let scaled: Vec<(f64, f64)> = BASE_POINTS.iter().map(|&(x, y)| (x, y * 1.1)).collect();
    engine
        .put_norm("N1", NormKind::AxleLoad, &scaled)
        .await
        .unwrap();
    engine.delete_norm("N1").await.unwrap();

    // N2's persisted value is untouched by N1's lifecycle
    let value = engine.interpolate("N2", 25.0).await.unwrap().unwrap();
    assert!(value.cached);

    let ids = engine.list_norm_ids().await.unwrap();
    assert_eq!(ids, vec!["N2"]);
}

#[tokio::test]
async fn test_validation_rejection_is_typed() {
    let engine = engine().await;

    let err = engine
        .put_norm("N1", NormKind::AxleLoad, &[(10.0, 100.0)])
        .await
        .unwrap_err();
    assert!(err.is_rejection());
    match err {
        EngineError::Model(ModelError::TooFewPoints { kept, minimum }) => {
            assert_eq!(kept, 1);
            assert_eq!(minimum, 2);
        }
        other => panic!("expected TooFewPoints, got {other:?}"),
    }
    assert!(engine.get_norm("N1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_rejected_put_leaves_existing_norm_intact() {
    let engine = engine().await;
    engine
        .put_norm("N1", NormKind::AxleLoad, &BASE_POINTS)
        .await
        .unwrap();

    let err = engine
        .put_norm("N1", NormKind::AxleLoad, &[(10.0, f64::NAN), (20.0, f64::NAN)])
        .await
        .unwrap_err();
    assert!(err.is_rejection());

    let norm = engine.get_norm("N1").await.unwrap().unwrap();
    assert_eq!(norm.points.len(), 4);
}

#[tokio::test]
async fn test_dropped_points_are_counted() {
    let engine = engine().await;

    let raw = [
        (10.0, 100.0),
        (20.0, 180.0),
        (150.0, 500.0),   // load above limit
        (30.0, f64::NAN), // non-finite consumption
        (20.0001, 999.0), // duplicate of 20.0 after rounding
        (40.0, 500.0),
    ];
    let outcome = engine
        .put_norm("N1", NormKind::AxleLoad, &raw)
        .await
        .unwrap();
    assert_eq!(outcome.kept, 3);
    assert_eq!(outcome.dropped_out_of_range, 2);
    assert_eq!(outcome.dropped_duplicates, 1);

    let norm = engine.get_norm("N1").await.unwrap().unwrap();
    let loads: Vec<f64> = norm.points.iter().map(|p| p.load).collect();
    assert_eq!(loads, vec![10.0, 20.0, 40.0]);
    let orders: Vec<u32> = norm.points.iter().map(|p| p.order).collect();
    assert_eq!(orders, vec![0, 1, 2]);
}

#[tokio::test]
async fn test_unknown_norm_returns_none() {
    let engine = engine().await;

    assert!(engine.interpolate("missing", 25.0).await.unwrap().is_none());
    assert!(engine.get_norm("missing").await.unwrap().is_none());
    assert_eq!(engine.stats().value_misses, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_interpolations_build_once() {
    let engine = Arc::new(engine().await);
    engine
        .put_norm("N1", NormKind::AxleLoad, &BASE_POINTS)
        .await
        .unwrap();

    let mut tasks = tokio::task::JoinSet::new();
    for i in 0..8 {
        let engine = engine.clone();
        let parameter = 12.0 + i as f64;
        tasks.spawn(async move { engine.interpolate("N1", parameter).await });
    }
    while let Some(joined) = tasks.join_next().await {
        let value = joined.unwrap().unwrap().expect("value for known norm");
        assert!(value.value >= 100.0);
    }

    assert_eq!(engine.stats().curve_builds, 1);
}
