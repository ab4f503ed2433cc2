use storage::repository::{KeyValueStore, Storage};
use storage::sqlite::SqliteStore;

#[tokio::test]
async fn sqlite_round_trips_and_overwrites_values() {
    let repo = SqliteStore::connect("sqlite:file:memdb_kv_roundtrip?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    assert_eq!(repo.get("ielts_user").await.unwrap(), None);

    repo.set("ielts_user", r#"{"name":"Jane"}"#).await.unwrap();
    repo.set("ielts_user", r#"{"name":"Jane Doe"}"#).await.unwrap();
    assert_eq!(
        repo.get("ielts_user").await.unwrap().as_deref(),
        Some(r#"{"name":"Jane Doe"}"#)
    );

    assert!(repo.remove("ielts_user").await.unwrap());
    assert!(!repo.remove("ielts_user").await.unwrap());
    assert_eq!(repo.get("ielts_user").await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_lists_keys_by_prefix_in_order() {
    let repo = SqliteStore::connect("sqlite:file:memdb_kv_prefix?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");

    for key in ["ielts_test_3", "ielts_test_1", "pendingSubmissions", "ielts_user"] {
        repo.set(key, "{}").await.unwrap();
    }

    let keys = repo.keys_with_prefix("ielts_test_").await.unwrap();
    assert_eq!(keys, vec!["ielts_test_1", "ielts_test_3"]);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = SqliteStore::connect("sqlite:file:memdb_kv_migrate?mode=memory&cache=shared")
        .await
        .expect("connect");
    repo.migrate().await.expect("first migrate");
    repo.migrate().await.expect("second migrate");
}

#[tokio::test]
async fn storage_facade_uses_sqlite_backend() {
    let storage = Storage::sqlite("sqlite:file:memdb_kv_facade?mode=memory&cache=shared")
        .await
        .expect("storage");
    storage.kv.set("lastSync", "2024-01-15T10:30:00Z").await.unwrap();
    assert_eq!(
        storage.kv.get("lastSync").await.unwrap().as_deref(),
        Some("2024-01-15T10:30:00Z")
    );
}

#[tokio::test]
async fn plain_memory_url_keeps_entries_between_queries() {
    let store = SqliteStore::open("sqlite::memory:").await.expect("open");

    store.set("ielts_test_1", r#"{"answers":{"1":"A"}}"#).await.unwrap();
    store.set("pendingSubmissions", "[]").await.unwrap();

    assert_eq!(
        store.get("ielts_test_1").await.unwrap().as_deref(),
        Some(r#"{"answers":{"1":"A"}}"#)
    );
    assert_eq!(store.keys_with_prefix("").await.unwrap().len(), 2);
}
