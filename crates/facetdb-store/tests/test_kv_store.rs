//! KvStore point operations, queries and pagination against the in-memory backend.

use facetdb_commons::{Item, ItemKey};
use facetdb_store::test_utils::InMemoryBackend;
use facetdb_store::{CursorError, KvStore, QueryOptions, StorageError};
use serde_json::{json, Value};
use std::sync::Arc;

fn item(value: Value) -> Item {
    value.as_object().expect("object literal").clone()
}

fn sort_keys(items: &[Item]) -> Vec<&str> {
    items.iter().map(|i| i["sk"].as_str().unwrap()).collect()
}

async fn seeded_store() -> KvStore {
    let store = KvStore::with_defaults(Arc::new(InMemoryBackend::new()));
    let rows = vec![
        json!({"pk": "user#1", "sk": "order#001", "status": "open", "total": 10}),
        json!({"pk": "user#1", "sk": "order#002", "status": "closed", "total": 25}),
        json!({"pk": "user#1", "sk": "order#003", "status": "open", "total": 40}),
        json!({"pk": "user#1", "sk": "order#004", "status": "open", "total": 5}),
        json!({"pk": "user#1", "sk": "profile", "name": "Ann"}),
        json!({"pk": "user#2", "sk": "order#001", "status": "open", "total": 99}),
    ];
    store
        .batch_write(rows.into_iter().map(item).collect())
        .await
        .expect("seed");
    store
}

#[tokio::test]
async fn test_put_get_delete() {
    let store = KvStore::with_defaults(Arc::new(InMemoryBackend::new()));
    let key = ItemKey::new("user#42", "profile");

    let previous = store
        .put(item(json!({"pk": "user#42", "sk": "profile", "name": "Ann"})))
        .await
        .unwrap();
    assert!(previous.is_none());

    let previous = store
        .put(item(json!({"pk": "user#42", "sk": "profile", "name": "Bea"})))
        .await
        .unwrap();
    assert_eq!(previous.unwrap()["name"], "Ann");

    assert_eq!(store.get(&key).await.unwrap().unwrap()["name"], "Bea");

    store.delete(&key).await.unwrap();
    assert!(store.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_put_requires_key_fields() {
    let store = KvStore::with_defaults(Arc::new(InMemoryBackend::new()));
    let err = store.put(item(json!({"pk": "a", "x": 1}))).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidKey(_)));
}

#[tokio::test]
async fn test_update_never_touches_key_fields() {
    let store = KvStore::with_defaults(Arc::new(InMemoryBackend::new()));
    let key = ItemKey::new("user#42", "profile");
    store
        .put(item(json!({"pk": "user#42", "sk": "profile", "name": "Ann", "age": 30})))
        .await
        .unwrap();

    let updated = store
        .update(&key, item(json!({"sk": "hijack", "age": 31})))
        .await
        .unwrap();
    assert_eq!(
        Value::Object(updated),
        json!({"pk": "user#42", "sk": "profile", "name": "Ann", "age": 31})
    );
    assert!(store.get(&ItemKey::new("user#42", "hijack")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_with_only_key_fields_is_rejected() {
    let store = KvStore::with_defaults(Arc::new(InMemoryBackend::new()));
    let err = store
        .update(&ItemKey::new("a", "b"), item(json!({"pk": "c"})))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidUpdate(_)));
}

#[tokio::test]
async fn test_query_prefix_filters_and_reverse() {
    let store = seeded_store().await;

    let page = store.query("user#1", Some("order#"), QueryOptions::new()).await.unwrap();
    assert_eq!(
        sort_keys(&page.items),
        vec!["order#001", "order#002", "order#003", "order#004"]
    );
    assert!(page.cursor.is_none());

    let page = store
        .query(
            "user#1",
            Some("order#"),
            QueryOptions::new().filter("status = open").filter("total >= 10").reverse(),
        )
        .await
        .unwrap();
    assert_eq!(sort_keys(&page.items), vec!["order#003", "order#001"]);

    let page = store.query("user#1", None, QueryOptions::new()).await.unwrap();
    assert_eq!(page.items.len(), 5);
}

#[tokio::test]
async fn test_query_pagination_with_cursor() {
    let store = seeded_store().await;
    let options = QueryOptions::new().limit(2);

    let first = store.query("user#1", Some("order#"), options.clone()).await.unwrap();
    assert_eq!(sort_keys(&first.items), vec!["order#001", "order#002"]);
    let cursor = first.cursor.expect("more pages");

    let second = store
        .query("user#1", Some("order#"), options.clone().cursor(cursor))
        .await
        .unwrap();
    assert_eq!(sort_keys(&second.items), vec!["order#003", "order#004"]);
    assert!(second.cursor.is_none(), "exact fit must not return a cursor");
}

#[tokio::test]
async fn test_query_reverse_pagination() {
    let store = seeded_store().await;
    let options = QueryOptions::new().limit(3).reverse();

    let first = store.query("user#1", Some("order#"), options.clone()).await.unwrap();
    assert_eq!(sort_keys(&first.items), vec!["order#004", "order#003", "order#002"]);

    let second = store
        .query("user#1", Some("order#"), options.cursor(first.cursor.unwrap()))
        .await
        .unwrap();
    assert_eq!(sort_keys(&second.items), vec!["order#001"]);
    assert!(second.cursor.is_none());
}

#[tokio::test]
async fn test_query_all_follows_cursors() {
    let store = seeded_store().await;
    let items = store
        .query_all("user#1", Some("order#"), QueryOptions::new().limit(1).filter("status = open"))
        .await
        .unwrap();
    assert_eq!(sort_keys(&items), vec!["order#001", "order#003", "order#004"]);
}

#[tokio::test]
async fn test_cursor_errors() {
    let store = seeded_store().await;

    let err = store
        .query("user#1", None, QueryOptions::new().cursor("%%%"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Cursor(CursorError::Encoding(_))));

    let page = store.query("user#1", None, QueryOptions::new().limit(1)).await.unwrap();
    let err = store
        .query("user#2", None, QueryOptions::new().cursor(page.cursor.unwrap()))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Cursor(CursorError::ShapeMismatch(_))));
}

#[tokio::test]
async fn test_invalid_filter_is_reported() {
    let store = seeded_store().await;
    let err = store
        .query("user#1", None, QueryOptions::new().filter("status"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::InvalidFilter { .. }));
}

#[tokio::test]
async fn test_batch_get_keeps_order_and_skips_missing() {
    let store = seeded_store().await;
    let items = store
        .batch_get(&[
            ItemKey::new("user#2", "order#001"),
            ItemKey::new("user#1", "missing"),
            ItemKey::new("user#1", "profile"),
        ])
        .await
        .unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["total"], 99);
    assert_eq!(items[1]["name"], "Ann");
}
