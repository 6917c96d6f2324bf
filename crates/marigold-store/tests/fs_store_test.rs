//! Integration tests for the filesystem store.

use std::path::Path;

use marigold_store::{
  CollectionStore, EnvironmentStore, FsStore, GlobalVariableStore, StoreError,
};
use serde_json::json;

fn write_json(path: &Path, value: serde_json::Value) {
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  std::fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

fn seed(root: &Path) {
  write_json(
    &root.join("workspaces/ws/collections/orders.json"),
    json!({
      "info": { "id": "orders", "name": "Orders API", "version": "1.0.0" },
      "protocol": "http",
      "auth": { "type": "bearer", "data": { "token": "{{token}}" } },
      "items": [
        { "type": "folder", "id": "f1", "name": "Create", "items": [
          { "type": "request", "id": "r1", "name": "Create order", "data": { "method": "POST" } }
        ]}
      ]
    }),
  );

  write_json(
    &root.join("workspaces/ws/environments/dev.json"),
    json!({
      "name": "dev",
      "variables": [
        { "key": "host", "value": "localhost" },
        { "key": "token", "value": "dev-token", "enabled": false }
      ]
    }),
  );

  write_json(
    &root.join("globals.json"),
    json!({ "variables": [{ "key": "region", "value": "eu" }] }),
  );
}

#[tokio::test]
async fn test_load_collection() {
  let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
  seed(temp_dir.path());
  let store = FsStore::new(temp_dir.path());

  let collection = store.load_collection("ws", "orders").await.unwrap();
  assert_eq!(collection.info.name, "Orders API");
  assert_eq!(collection.request_count(), 1);
  assert!(collection.find_request("r1").is_some());
}

#[tokio::test]
async fn test_unknown_collection_is_not_found() {
  let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
  seed(temp_dir.path());
  let store = FsStore::new(temp_dir.path());

  let err = store.load_collection("ws", "missing").await.unwrap_err();
  assert!(matches!(err, StoreError::CollectionNotFound { .. }));

  let err = store.load_collection("other", "orders").await.unwrap_err();
  assert!(matches!(err, StoreError::CollectionNotFound { .. }));
}

#[tokio::test]
async fn test_traversal_ids_are_rejected() {
  let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
  let store = FsStore::new(temp_dir.path());

  let err = store.load_collection("..", "orders").await.unwrap_err();
  assert!(matches!(err, StoreError::InvalidId(_)));
}

#[tokio::test]
async fn test_environment_filters_disabled() {
  let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
  seed(temp_dir.path());
  let store = FsStore::new(temp_dir.path());

  let vars = store.load_environment("ws", "dev").await.unwrap();
  assert_eq!(vars.len(), 1);
  assert_eq!(vars["host"], "localhost");
}

#[tokio::test]
async fn test_malformed_environment() {
  let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
  let path = temp_dir.path().join("workspaces/ws/environments/broken.json");
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  std::fs::write(&path, "{ not json").unwrap();
  let store = FsStore::new(temp_dir.path());

  let err = store.load_environment("ws", "broken").await.unwrap_err();
  assert!(matches!(err, StoreError::Json(_)));
}

#[tokio::test]
async fn test_globals() {
  let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
  let store = FsStore::new(temp_dir.path());
  assert!(store.load_globals().await.unwrap().is_empty());

  seed(temp_dir.path());
  let globals = store.load_globals().await.unwrap();
  assert_eq!(globals["region"], "eu");
}

#[tokio::test]
async fn test_list_collections() {
  let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
  let store = FsStore::new(temp_dir.path());
  assert!(store.list_collections("ws").await.unwrap().is_empty());

  seed(temp_dir.path());
  assert_eq!(store.list_collections("ws").await.unwrap(), vec!["orders"]);
}
