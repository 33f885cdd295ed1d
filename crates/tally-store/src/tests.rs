//! Tests for store persistence and record mutation invariants.

use std::collections::HashMap;
use std::sync::Arc;

use tempfile::tempdir;

use super::*;

fn fields(origin: Option<&str>, game_name: &str, game_id: &str) -> ExecutionFields {
    ExecutionFields {
        origin: origin.map(str::to_string),
        user: Some("alice".to_string()),
        display_name: Some("Alice".to_string()),
        created_timestamp: Some("1700000000".to_string()),
        game_name: Some(game_name.to_string()),
        game_id: Some(game_id.to_string()),
    }
}

#[test]
fn unit_file_backend_load_returns_empty_map_when_file_is_missing() {
    let temp = tempdir().expect("tempdir");
    let backend = FileBackend::new(temp.path().join("missing.json"));
    let records = backend.load().expect("load");
    assert!(records.is_empty());
}

#[test]
fn unit_file_backend_round_trips_camel_case_document() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("executionData.json");
    let backend = FileBackend::new(path.clone());

    let mut records = HashMap::new();
    records.insert(
        "HW1-S1".to_string(),
        ExecutionRecord {
            executions: 2,
            origins: vec!["http://x.test".to_string()],
            user: Some("alice".to_string()),
            display_name: Some("Alice".to_string()),
            ..ExecutionRecord::default()
        },
    );
    backend.save(&records).expect("save");

    let raw = std::fs::read_to_string(&path).expect("read raw");
    assert!(raw.contains("\"displayName\""));
    assert!(raw.contains("\"executions\": 2"));

    let loaded = backend.load().expect("load");
    assert_eq!(loaded, records);
}

#[test]
fn unit_file_backend_fails_loudly_on_malformed_document() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("executionData.json");
    std::fs::write(&path, "{ not json").expect("write corrupt file");

    let backend = FileBackend::new(path);
    let error = backend.load().expect_err("malformed document must not load");
    assert!(matches!(error, StoreError::Malformed { .. }));
    assert!(error.to_string().contains("malformed"));
}

#[test]
fn unit_legacy_document_with_missing_fields_loads_with_defaults() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("executionData.json");
    std::fs::write(&path, r#"{"HW1-S1":{"executions":3}}"#).expect("write legacy file");

    let backend = FileBackend::new(path);
    let records = backend.load().expect("load");
    let record = records.get("HW1-S1").expect("record");
    assert_eq!(record.executions, 3);
    assert!(record.origins.is_empty());
    assert!(record.games.is_empty());
    assert!(record.category_id.is_none());
}

#[tokio::test]
async fn functional_record_execution_counts_accepted_requests() {
    let backend = Arc::new(MemoryBackend::new());
    let store = ExecutionStore::load(backend.clone()).expect("load");

    let first = store
        .record_execution("HW1-S1", &fields(Some("http://x.test"), "Obby", "42"))
        .await
        .expect("first");
    assert_eq!(first.executions, 1);
    assert_eq!(first.origins, vec!["http://x.test".to_string()]);
    assert_eq!(first.games.get("Obby, 42"), Some(&1));
    assert_eq!(first.user.as_deref(), Some("alice"));
    assert_eq!(first.display_name.as_deref(), Some("Alice"));

    let second = store
        .record_execution("HW1-S1", &fields(Some("http://x.test"), "Obby", "99"))
        .await
        .expect("second");
    assert_eq!(second.executions, 2);
    assert_eq!(second.origins, vec!["http://x.test".to_string()]);
    assert_eq!(second.games.get("Obby, 42"), Some(&1));
    assert_eq!(second.games.get("Obby, 99"), Some(&1));

    // Every mutation is persisted through the backend.
    let saved = backend.saved_records();
    assert_eq!(saved.get("HW1-S1").expect("saved record").executions, 2);
}

#[tokio::test]
async fn functional_origins_dedupe_and_preserve_insertion_order() {
    let store = ExecutionStore::load(Arc::new(MemoryBackend::new())).expect("load");

    for origin in ["http://a.test", "http://b.test", "http://a.test"] {
        store
            .record_execution("HW1-S1", &fields(Some(origin), "Obby", "42"))
            .await
            .expect("record");
    }
    let record = store.snapshot("HW1-S1").await.expect("record");
    assert_eq!(
        record.origins,
        vec!["http://a.test".to_string(), "http://b.test".to_string()]
    );
}

#[tokio::test]
async fn functional_identity_fields_are_captured_only_on_first_request() {
    let store = ExecutionStore::load(Arc::new(MemoryBackend::new())).expect("load");

    store
        .record_execution("HW1-S1", &fields(None, "Obby", "42"))
        .await
        .expect("first");

    let mut changed = fields(None, "Obby", "42");
    changed.user = Some("mallory".to_string());
    changed.display_name = Some("Mallory".to_string());
    changed.created_timestamp = Some("1800000000".to_string());
    store
        .record_execution("HW1-S1", &changed)
        .await
        .expect("second");

    let record = store.snapshot("HW1-S1").await.expect("record");
    assert_eq!(record.user.as_deref(), Some("alice"));
    assert_eq!(record.display_name.as_deref(), Some("Alice"));
    assert_eq!(record.created_timestamp.as_deref(), Some("1700000000"));
}

#[tokio::test]
async fn functional_request_without_game_fields_counts_under_unknown_key() {
    let store = ExecutionStore::load(Arc::new(MemoryBackend::new())).expect("load");

    store
        .record_execution("HW1-S1", &ExecutionFields::default())
        .await
        .expect("record");
    let record = store.snapshot("HW1-S1").await.expect("record");
    assert_eq!(record.games.get("unknown, unknown"), Some(&1));
    assert!(record.origins.is_empty());
    assert!(record.user.is_none());
}

#[tokio::test]
async fn functional_remote_identifiers_are_write_once() {
    let backend = Arc::new(MemoryBackend::new());
    let store = ExecutionStore::load(backend.clone()).expect("load");
    store
        .record_execution("HW1-S1", &fields(None, "Obby", "42"))
        .await
        .expect("record");

    store.set_category_id("HW1-S1", "cat-1").await.expect("set");
    store
        .set_category_id("HW1-S1", "cat-2")
        .await
        .expect("second set is a no-op");
    store.set_channel_id("HW1-S1", "chan-1").await.expect("set");
    store.set_message_id("HW1-S1", "msg-1").await.expect("set");
    store
        .set_game_message_id("HW1-S1", "msg-2")
        .await
        .expect("set");

    let record = store.snapshot("HW1-S1").await.expect("record");
    assert_eq!(record.category_id.as_deref(), Some("cat-1"));
    assert_eq!(record.channel_id.as_deref(), Some("chan-1"));
    assert_eq!(record.message_id.as_deref(), Some("msg-1"));
    assert_eq!(record.game_message_id.as_deref(), Some("msg-2"));

    let saved = backend.saved_records();
    assert_eq!(
        saved.get("HW1-S1").expect("saved").category_id.as_deref(),
        Some("cat-1")
    );
}

#[tokio::test]
async fn regression_set_remote_id_for_unknown_key_is_a_no_op() {
    let store = ExecutionStore::load(Arc::new(MemoryBackend::new())).expect("load");
    store
        .set_category_id("never-seen", "cat-1")
        .await
        .expect("no-op");
    assert!(store.snapshot("never-seen").await.is_none());
}

#[tokio::test]
async fn integration_store_survives_reload_from_file() {
    let temp = tempdir().expect("tempdir");
    let path = temp.path().join("executionData.json");

    {
        let store =
            ExecutionStore::load(Arc::new(FileBackend::new(path.clone()))).expect("load empty");
        store
            .record_execution("HW1-S1", &fields(Some("http://x.test"), "Obby", "42"))
            .await
            .expect("record");
        store.set_category_id("HW1-S1", "cat-1").await.expect("set");
    }

    let reloaded = ExecutionStore::load(Arc::new(FileBackend::new(path))).expect("reload");
    let record = reloaded.snapshot("HW1-S1").await.expect("record");
    assert_eq!(record.executions, 1);
    assert_eq!(record.category_id.as_deref(), Some("cat-1"));
}

#[test]
fn unit_game_key_renders_unknown_for_missing_fields() {
    assert_eq!(ExecutionFields::default().game_key(), "unknown, unknown");
    let mut partial = ExecutionFields::default();
    partial.game_name = Some("Obby".to_string());
    assert_eq!(partial.game_key(), "Obby, unknown");
}
