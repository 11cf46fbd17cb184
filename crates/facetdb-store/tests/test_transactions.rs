//! Writes: conflict retry bound and chunking at the ceilings.

use facetdb_commons::{Item, ItemKey, Operation};
use facetdb_store::test_utils::{ConflictingBackend, InMemoryBackend, RecordingBackend};
use facetdb_store::{KvStore, NoBackoff, StorageBackend, StorageError, StoreOptions};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

fn put_item(pk: &str, sk: &str) -> Item {
    json!({"pk": pk, "sk": sk}).as_object().unwrap().clone()
}

fn put(pk: &str, sk: &str) -> Operation {
    Operation::put(put_item(pk, sk))
}

fn options() -> StoreOptions {
    StoreOptions::default().with_backoff(Arc::new(NoBackoff))
}

#[tokio::test]
async fn test_conflict_retry_succeeds_at_ceiling() {
    // Conflicts on attempts 1..19, succeeds on attempt 20 == ceiling
    let backend = Arc::new(ConflictingBackend::new(19));
    let store = KvStore::new(backend.clone(), options().with_max_attempts(20));

    store.transact_write(vec![put("a", "1")]).await.unwrap();

    assert_eq!(backend.transact_calls(), 20);
    assert!(backend.get(&ItemKey::new("a", "1")).unwrap().is_some());
}

#[tokio::test]
async fn test_conflict_retry_fails_past_ceiling() {
    // Would succeed on attempt 21, one past the ceiling
    let backend = Arc::new(ConflictingBackend::new(20));
    let store = KvStore::new(backend.clone(), options().with_max_attempts(20));

    let err = store.transact_write(vec![put("a", "1")]).await.unwrap_err();

    assert!(matches!(err, StorageError::RetriesExhausted { attempts: 20, .. }));
    assert_eq!(backend.transact_calls(), 20);
    assert!(backend.get(&ItemKey::new("a", "1")).unwrap().is_none());
}

#[tokio::test]
async fn test_chunking_covers_every_operation_once() {
    let backend = Arc::new(RecordingBackend::new());
    let store = KvStore::new(backend.clone(), options().with_transact_ceiling(10));

    let operations: Vec<Operation> = (0..25).map(|i| put("p", &format!("{:03}", i))).collect();
    store.transact_write(operations.clone()).await.unwrap();

    let mut sizes = backend.transaction_sizes();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![5, 10, 10]);
    assert!(sizes.iter().all(|size| *size <= 10));

    let seen: Vec<ItemKey> = backend
        .transactions()
        .into_iter()
        .flatten()
        .map(|op| op.key().unwrap())
        .collect();
    let unique: HashSet<&ItemKey> = seen.iter().collect();
    assert_eq!(seen.len(), 25);
    assert_eq!(unique.len(), 25);
}

#[tokio::test]
async fn test_empty_transaction_never_reaches_backend() {
    let backend = Arc::new(RecordingBackend::new());
    let store = KvStore::new(backend.clone(), options());

    store.transact_write(Vec::new()).await.unwrap();

    assert!(backend.transactions().is_empty());
}

#[tokio::test]
async fn test_transaction_keeps_operation_order() {
    let backend = Arc::new(InMemoryBackend::new());
    let store = KvStore::new(backend.clone(), options());
    let key = ItemKey::new("a", "1");

    store
        .transact_write(vec![
            put("a", "1"),
            Operation::delete(key.clone()),
            Operation::update(key.clone(), json!({"n": 1}).as_object().unwrap().clone()),
        ])
        .await
        .unwrap();

    let stored = backend.get(&key).unwrap().unwrap();
    assert_eq!(serde_json::Value::Object(stored), json!({"pk": "a", "sk": "1", "n": 1}));
}

#[tokio::test]
async fn test_batch_write_chunks_at_batch_ceiling() {
    let backend = Arc::new(RecordingBackend::new());
    let store = KvStore::new(backend.clone(), options().with_batch_ceiling(4));

    let items: Vec<Item> = (0..11)
        .map(|i| json!({"pk": "p", "sk": format!("{:02}", i)}).as_object().unwrap().clone())
        .collect();
    store.batch_write(items).await.unwrap();

    let mut sizes = backend.batch_sizes();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![3, 4, 4]);

    let seen: Vec<ItemKey> = backend
        .batches()
        .iter()
        .flatten()
        .map(|item| ItemKey::from_item(item).unwrap())
        .collect();
    let unique: HashSet<&ItemKey> = seen.iter().collect();
    assert_eq!(seen.len(), 11);
    assert_eq!(unique.len(), 11);
    assert!(backend.transactions().is_empty());
}

#[tokio::test]
async fn test_put_retries_write_conflicts() {
    let backend = Arc::new(ConflictingBackend::new(3));
    let store = KvStore::new(backend.clone(), options());

    store.put(put_item("a", "1")).await.unwrap();

    assert_eq!(backend.write_calls(), 4);
    assert!(backend.get(&ItemKey::new("a", "1")).unwrap().is_some());
}

#[tokio::test]
async fn test_update_retries_write_conflicts() {
    let backend = Arc::new(ConflictingBackend::new(2));
    let store = KvStore::new(backend.clone(), options());
    let key = ItemKey::new("a", "1");

    let updated = store
        .update(&key, json!({"n": 2}).as_object().unwrap().clone())
        .await
        .unwrap();

    assert_eq!(updated["n"], 2);
    assert_eq!(backend.write_calls(), 3);
}

#[tokio::test]
async fn test_batch_write_retries_conflicting_chunk() {
    let backend = Arc::new(ConflictingBackend::new(1));
    let store = KvStore::new(backend.clone(), options().with_batch_ceiling(25));

    let items: Vec<Item> = (0..5).map(|i| put_item("p", &i.to_string())).collect();
    store.batch_write(items).await.unwrap();

    assert_eq!(backend.write_calls(), 2);
    assert_eq!(backend.inner().len(), 5);
}

#[tokio::test]
async fn test_put_gives_up_at_attempt_ceiling() {
    let backend = Arc::new(ConflictingBackend::new(u32::MAX));
    let store = KvStore::new(backend.clone(), options().with_max_attempts(5));

    let err = store.put(put_item("a", "1")).await.unwrap_err();

    assert!(matches!(err, StorageError::RetriesExhausted { attempts: 5, .. }));
    assert_eq!(backend.write_calls(), 5);
}
