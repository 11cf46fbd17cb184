//! Truncate / export / import against the in-memory backend.

use facetdb_commons::Item;
use facetdb_store::test_utils::InMemoryBackend;
use facetdb_store::{KvStore, StoreOptions};
use serde_json::json;
use std::sync::Arc;

fn rows(count: usize) -> Vec<Item> {
    (0..count)
        .map(|i| {
            json!({"pk": format!("tenant#{}", i % 4), "sk": format!("{:04}", i), "i": i})
                .as_object()
                .unwrap()
                .clone()
        })
        .collect()
}

#[tokio::test]
async fn test_export_pages_through_everything() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = KvStore::new(backend, StoreOptions::default().with_page_size(7));
    store.import(rows(50)).await.unwrap();

    let exported = store.export().await.unwrap();
    assert_eq!(exported.len(), 50);

    // exported in key order: grouped by partition
    let pks: Vec<&str> = exported.iter().map(|i| i["pk"].as_str().unwrap()).collect();
    let mut sorted = pks.clone();
    sorted.sort();
    assert_eq!(pks, sorted);
}

#[tokio::test]
async fn test_export_import_into_fresh_store() {
    let source = KvStore::with_defaults(Arc::new(InMemoryBackend::new()));
    source.import(rows(30)).await.unwrap();
    let dump = source.export().await.unwrap();

    let target_backend = Arc::new(InMemoryBackend::new());
    let target = KvStore::with_defaults(target_backend.clone());
    target.import(dump.clone()).await.unwrap();

    assert_eq!(target_backend.len(), 30);
    assert_eq!(target.export().await.unwrap(), dump);
}

#[tokio::test]
async fn test_truncate_exact_page_multiple() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = KvStore::new(backend.clone(), StoreOptions::default().with_page_size(5));
    store.import(rows(20)).await.unwrap();

    assert_eq!(store.truncate().await.unwrap(), 20);
    assert!(backend.is_empty());
    assert_eq!(store.truncate().await.unwrap(), 0);
}
