//! Generated standards migrations

mod common;

use common::{FakeDatabase, engine};
use pretty_assertions::assert_eq;
use std::sync::Arc;

#[tokio::test]
async fn test_migration_lists_tables_needing_work() {
    let db = Arc::new(
        FakeDatabase::new()
            .with_table("orders", &[("id", "bigint")])
            .with_sequence("orders_id_seq", "orders", Some("id"), 1)
            .with_max("orders", "id", 10)
            .with_table("widgets", &[("updated_at", "timestamp")])
            .with_table("clean", &[("id", "bigint")]),
    );
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("database").join("migrations");

    let generated = engine(&db)
        .generate_standards_migration(&target)
        .await
        .unwrap()
        .expect("tables need standards");

    assert_eq!(generated.tables, vec!["orders", "widgets"]);
    assert!(generated.path.starts_with(&target));
    let name = generated.path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.ends_with("_apply_postgresql_standards.sql"));

    let content = std::fs::read_to_string(&generated.path).unwrap();
    assert!(content.contains("fix_sequence_for_table('public', 'orders')"));
    assert!(content.contains("fix_sequence_for_table('public', 'widgets')"));
    assert!(!content.contains("'clean'"));
    assert!(content.trim_end().ends_with("left in place."));
    assert!(db.mutations().is_empty());
}

#[tokio::test]
async fn test_nothing_written_when_all_tables_are_clean() {
    let db = Arc::new(
        FakeDatabase::new()
            .with_table("widgets", &[("updated_at", "timestamp")])
            .with_trigger("widgets"),
    );
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("migrations");

    let generated = engine(&db).generate_standards_migration(&target).await.unwrap();

    assert!(generated.is_none());
    assert!(!target.exists());
}

#[tokio::test]
async fn test_migration_defines_the_routines_it_calls() {
    let db = Arc::new(FakeDatabase::new().with_table("widgets", &[("updated_at", "timestamp")]));
    let dir = tempfile::tempdir().unwrap();

    let generated = engine(&db)
        .generate_standards_migration(dir.path())
        .await
        .unwrap()
        .expect("widgets needs a trigger");

    let content = std::fs::read_to_string(&generated.path).unwrap();
    let up = content
        .split("-- migrate:down")
        .next()
        .expect("up section");
    let updated_at = up.find("-- update_updated_at_column.sql").expect("trigger function");
    let fix_db = up.find("-- fix_db.sql").expect("repair routines");
    let first_call = up.find("PERFORM public.fix_sequence_for_table").expect("repair call");
    assert!(updated_at < fix_db);
    assert!(fix_db < first_call);
    assert!(up.contains("CREATE OR REPLACE FUNCTION"));
    assert!(db.installed().is_empty());
}

#[tokio::test]
async fn test_migration_uses_configured_schema() {
    let db = Arc::new(
        FakeDatabase::new()
            .with_schema("app")
            .with_table("orders", &[("id", "bigint")])
            .with_sequence("orders_id_seq", "orders", Some("id"), 1)
            .with_max("orders", "id", 10),
    );
    let dir = tempfile::tempdir().unwrap();

    let generated = engine(&db)
        .generate_standards_migration(dir.path())
        .await
        .unwrap()
        .expect("orders needs a sequence reset");

    let content = std::fs::read_to_string(&generated.path).unwrap();
    assert!(content.contains("fix_sequence_for_table('app', 'orders')"));
    assert!(content.contains("SELECT public.fix_db('app');"));
    assert!(!content.contains("fix_sequence_for_table('public'"));
}
