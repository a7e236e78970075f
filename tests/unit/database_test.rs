//! Unit tests for the database layer and the SQLite-backed settings store.

use achroma_reader::database::migrations::{get_schema_version, CURRENT_SCHEMA_VERSION};
use achroma_reader::database::Database;
use achroma_reader::services::storage::{
    domain_key, AreaName, ChangeFeed, FallbackStore, SqliteStore, StorageArea, DEFAULTS_KEY,
};
use serde_json::json;
use tempfile::TempDir;

#[test]
fn test_open_in_memory_succeeds() {
    let db = Database::open_in_memory();
    assert!(db.is_ok(), "open_in_memory should succeed");
}

#[test]
fn test_migrations_create_kv_store() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let conn = db.connection();
    let exists: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='kv_store'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(false);
    assert!(exists, "kv_store should exist after migrations");

    let index: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='index' AND name='idx_kv_store_updated'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(false);
    assert!(index, "idx_kv_store_updated should exist after migrations");
}

#[test]
fn test_schema_version_is_current() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_reopen_is_idempotent() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("achroma.db");
    {
        let db = Database::open(&path).unwrap();
        assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
    }
    let db = Database::open(&path).unwrap();
    let versions: i64 = db
        .connection()
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(versions, i64::from(CURRENT_SCHEMA_VERSION));
}

#[test]
fn test_sqlite_store_persists_across_reopen() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("achroma.db");
    let key = domain_key("example.com");
    {
        let store = SqliteStore::open(&path, ChangeFeed::new()).unwrap();
        store.set(AreaName::Local, &key, &json!({"enabled": true})).unwrap();
        store.set(AreaName::Sync, DEFAULTS_KEY, &json!({"adaptiveMode": false})).unwrap();
    }
    let store = SqliteStore::open(&path, ChangeFeed::new()).unwrap();
    assert_eq!(store.get(AreaName::Local, &key).unwrap(), Some(json!({"enabled": true})));
    assert_eq!(store.get(AreaName::Sync, DEFAULTS_KEY).unwrap(), Some(json!({"adaptiveMode": false})));
    assert_eq!(store.get(AreaName::Local, DEFAULTS_KEY).unwrap(), None);
}

#[test]
fn test_areas_are_separate() {
    let store = SqliteStore::open_in_memory(ChangeFeed::new()).unwrap();
    store.set(AreaName::Local, DEFAULTS_KEY, &json!(1)).unwrap();
    store.set(AreaName::Sync, DEFAULTS_KEY, &json!(2)).unwrap();
    store.remove(AreaName::Local, DEFAULTS_KEY).unwrap();
    assert_eq!(store.get(AreaName::Local, DEFAULTS_KEY).unwrap(), None);
    assert_eq!(store.get(AreaName::Sync, DEFAULTS_KEY).unwrap(), Some(json!(2)));
}

#[test]
fn test_writes_publish_changes() {
    let feed = ChangeFeed::new();
    let mut rx = feed.subscribe();
    let store = SqliteStore::open_in_memory(feed).unwrap();
    store.set(AreaName::Local, "achromatopsia:a.test", &json!({"enabled": true})).unwrap();
    store.remove(AreaName::Local, "achromatopsia:a.test").unwrap();

    let first = rx.try_recv().unwrap();
    assert_eq!(first.key, "achromatopsia:a.test");
    assert_eq!(first.new_value, Some(json!({"enabled": true})));
    let second = rx.try_recv().unwrap();
    assert_eq!(second.new_value, None);
}

#[test]
fn test_fallback_over_sqlite_is_not_degraded() {
    let feed = ChangeFeed::new();
    let primary = SqliteStore::open_in_memory(feed.clone()).unwrap();
    let store = FallbackStore::new(Box::new(primary), feed);
    store.set(AreaName::Local, DEFAULTS_KEY, &json!({"enabled": false})).unwrap();
    assert!(!store.is_degraded());
    assert_eq!(store.get(AreaName::Local, DEFAULTS_KEY).unwrap(), Some(json!({"enabled": false})));
}
