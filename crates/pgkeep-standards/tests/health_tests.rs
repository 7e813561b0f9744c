//! Health checks against an in-memory database

mod common;

use common::{FakeDatabase, engine};
use pgkeep_standards::{HealthCheckKind, HealthStatus};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

fn troubled_db() -> Arc<FakeDatabase> {
    Arc::new(
        FakeDatabase::new()
            .with_table("orders", &[("id", "bigint"), ("updated_at", "timestamp")])
            .with_sequence("orders_id_seq", "orders", Some("id"), 1)
            .with_max("orders", "id", 1000)
            .with_table("widgets", &[("id", "bigint"), ("updated_at", "timestamp")])
            .with_sequence("widgets_id_seq", "widgets", Some("id"), 0)
            .with_table("role_types", &[("id", "bigint")])
            .with_large_table("orders", "2 GB")
            .with_unused_index("orders", "orders_legacy_index")
            .with_duplicate_indexes("widgets", &["widgets_a_index", "widgets_b_index"]),
    )
}

#[tokio::test]
async fn test_missing_trigger_is_never_healthy() {
    let db = Arc::new(
        FakeDatabase::new()
            .with_table("widgets", &[("id", "bigint"), ("updated_at", "timestamp")]),
    );

    let result = engine(&db).health().check_triggers().await.unwrap();

    assert_ne!(result.status, HealthStatus::Healthy);
    assert!(result.missing_triggers().contains(&"widgets".to_string()));
    assert_eq!(result.score, 0);
}

#[tokio::test]
async fn test_sequence_check_flags_uncalled_and_behind() {
    let db = troubled_db();
    let result = engine(&db).health().check_sequences().await.unwrap();

    assert_eq!(result.problem_sequences(), &["orders_id_seq", "widgets_id_seq"]);
    assert_eq!(result.status, HealthStatus::Warning);
    assert_eq!(result.score, 0);
}

#[tokio::test]
async fn test_overall_is_rounded_mean_within_bounds() {
    let db = troubled_db();
    let engine = engine(&db);

    let health = engine.run_health_check().await.unwrap();

    assert_eq!(
        health.checks.keys().copied().collect::<Vec<_>>(),
        HealthCheckKind::ALL.to_vec()
    );
    let scores: Vec<u8> = health.checks.values().map(|c| c.score).collect();
    assert!(scores.iter().all(|s| *s <= 100));
    let mean = scores.iter().map(|s| f64::from(*s)).sum::<f64>() / scores.len() as f64;
    assert!((f64::from(health.overall_score) - mean).abs() <= 1.0);
    assert!(health.overall_score <= 100);
}

#[tokio::test]
async fn test_recommendations_follow_check_order() {
    let db = troubled_db();
    let health = engine(&db).run_health_check().await.unwrap();

    let expected: Vec<String> = HealthCheckKind::ALL
        .iter()
        .filter_map(|kind| health.check(*kind))
        .filter(|c| c.score < 80)
        .filter_map(|c| c.recommendation.clone())
        .collect();
    assert_eq!(health.recommendations, expected);
    assert!(!health.recommendations.is_empty());
}

#[tokio::test]
async fn test_health_after_repair() {
    let db = troubled_db();
    let engine = engine(&db);
    engine.fix_all().await.unwrap();

    let health = engine.run_health_check().await.unwrap();

    assert_eq!(health.check(HealthCheckKind::Sequences).unwrap().score, 100);
    assert_eq!(health.check(HealthCheckKind::Triggers).unwrap().status, HealthStatus::Healthy);
    assert!(db.data_mutations().iter().all(|m| !m.contains("role_types")));
}

#[tokio::test]
async fn test_index_and_performance_checks() {
    let db = troubled_db();
    let engine = engine(&db);

    let indexes = engine.health().check_indexes().await.unwrap();
    assert_eq!(indexes.score, 75);
    assert_eq!(indexes.message, "1 unused indexes consuming space, 1 duplicate indexes found");

    engine.stats().record("fixAll", Duration::from_millis(2500), &serde_json::json!({}), true);
    let performance = engine.health().check_performance().await.unwrap();
    // one slow operation and one large table
    assert_eq!(performance.score, 70);
    assert_eq!(performance.status, HealthStatus::Warning);
}

#[tokio::test]
async fn test_empty_schema_is_healthy() {
    let db = Arc::new(FakeDatabase::new());
    let health = engine(&db).run_health_check().await.unwrap();

    assert_eq!(health.overall_score, 100);
    assert!(health.recommendations.is_empty());
    assert!(health.checks.values().all(|c| c.status == HealthStatus::Healthy));
}

#[tokio::test]
async fn test_failed_check_is_timed() {
    let db = troubled_db();
    let engine = engine(&db);
    db.set_failing(true);

    assert!(engine.run_health_check().await.is_err());
    assert_eq!(engine.operation_stats().operations["runHealthCheck"].count, 1);
}
