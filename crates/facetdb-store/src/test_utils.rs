//! Test utilities for facetdb-store.
//!
//! - [`InMemoryBackend`]: ordered map behind a lock, atomic and conflict-free
//! - [`ConflictingBackend`]: reports a conflict for the first N writes
//! - [`RecordingBackend`]: records every transaction and batch it receives
//! - [`TestDb`]: RocksDB backend in a temporary directory

use crate::error::{Result, StorageError};
use crate::rocksdb_impl::RocksDBBackend;
use crate::rocksdb_init::RocksDbInit;
use crate::storage_trait::{apply_changes, ItemIterator, KeyRange, StorageBackend};
use facetdb_commons::{Item, ItemKey, Operation};
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// In-memory StorageBackend keyed by `(pk, sk)`.
#[derive(Default)]
pub struct InMemoryBackend {
    items: RwLock<BTreeMap<ItemKey, Item>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

fn apply(items: &mut BTreeMap<ItemKey, Item>, key: ItemKey, op: Operation) {
    match op {
        Operation::Put { item } => {
            items.insert(key, item);
        }
        Operation::Update { changes, .. } => {
            let item = items.entry(key.clone()).or_insert_with(|| key.to_item());
            apply_changes(item, &changes);
        }
        Operation::Delete { .. } => {
            items.remove(&key);
        }
    }
}

impl StorageBackend for InMemoryBackend {
    fn get(&self, key: &ItemKey) -> Result<Option<Item>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn put(&self, item: Item) -> Result<Option<Item>> {
        let key = ItemKey::from_item(&item)?;
        Ok(self.items.write().insert(key, item))
    }

    fn update(&self, key: &ItemKey, changes: &Item) -> Result<Item> {
        let mut items = self.items.write();
        let item = items.entry(key.clone()).or_insert_with(|| key.to_item());
        apply_changes(item, changes);
        Ok(item.clone())
    }

    fn delete(&self, key: &ItemKey) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }

    fn transact(&self, operations: Vec<Operation>) -> Result<()> {
        // Resolve every key before touching the map so a bad operation
        // leaves nothing applied.
        let keyed = operations
            .into_iter()
            .map(|op| -> Result<(ItemKey, Operation)> { Ok((op.key()?, op)) })
            .collect::<Result<Vec<_>>>()?;

        let mut items = self.items.write();
        for (key, op) in keyed {
            apply(&mut items, key, op);
        }
        Ok(())
    }

    fn batch_put(&self, items: Vec<Item>) -> Result<()> {
        let operations = items.into_iter().map(Operation::put).collect();
        self.transact(operations)
    }

    fn scan(&self, range: &KeyRange) -> Result<ItemIterator<'_>> {
        let start = ItemKey::new(range.pk.clone(), range.sk_prefix.clone().unwrap_or_default());
        let items = self.items.read();
        let mut matched: Vec<Item> = items
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(|(key, _)| key.pk == range.pk)
            .filter(|(key, _)| range.admits(&key.sk))
            .map(|(_, item)| item.clone())
            .collect();
        if range.reverse {
            matched.reverse();
        }
        Ok(Box::new(matched.into_iter().map(Ok)))
    }

    fn scan_table(&self, start_after: Option<&ItemKey>, limit: usize) -> Result<Vec<Item>> {
        let lower = match start_after {
            Some(key) => Bound::Excluded(key.clone()),
            None => Bound::Unbounded,
        };
        Ok(self
            .items
            .read()
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, item)| item.clone())
            .collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Backend that fails the first `conflicts` writes (`put`, `update`,
/// `batch_put` or `transact`) with a [`StorageError::TransactionConflict`],
/// then delegates.
pub struct ConflictingBackend {
    inner: InMemoryBackend,
    remaining_conflicts: AtomicU32,
    write_calls: AtomicU32,
    transact_calls: AtomicU32,
}

impl ConflictingBackend {
    pub fn new(conflicts: u32) -> Self {
        Self {
            inner: InMemoryBackend::new(),
            remaining_conflicts: AtomicU32::new(conflicts),
            write_calls: AtomicU32::new(0),
            transact_calls: AtomicU32::new(0),
        }
    }

    pub fn transact_calls(&self) -> u32 {
        self.transact_calls.load(Ordering::SeqCst)
    }

    /// Calls to any write method, conflicted or not.
    pub fn write_calls(&self) -> u32 {
        self.write_calls.load(Ordering::SeqCst)
    }

    fn conflict(&self) -> Result<()> {
        let call = self.write_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let conflicted = self
            .remaining_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if conflicted {
            return Err(StorageError::TransactionConflict(format!(
                "simulated conflict on write {}",
                call
            )));
        }
        Ok(())
    }

    pub fn inner(&self) -> &InMemoryBackend {
        &self.inner
    }
}

/// Backend that records every transaction and batch it receives.
#[derive(Default)]
pub struct RecordingBackend {
    inner: InMemoryBackend,
    transactions: Mutex<Vec<Vec<Operation>>>,
    batches: Mutex<Vec<Vec<Item>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations of each `transact` call, in arrival order.
    pub fn transactions(&self) -> Vec<Vec<Operation>> {
        self.transactions.lock().clone()
    }

    pub fn transaction_sizes(&self) -> Vec<usize> {
        self.transactions.lock().iter().map(Vec::len).collect()
    }

    /// Items of each `batch_put` call, in arrival order.
    pub fn batches(&self) -> Vec<Vec<Item>> {
        self.batches.lock().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().iter().map(Vec::len).collect()
    }
}

// Both wrappers forward reads and deletes to `self.inner`.
macro_rules! delegate_to_inner {
    () => {
        fn get(&self, key: &ItemKey) -> Result<Option<Item>> {
            self.inner.get(key)
        }

        fn delete(&self, key: &ItemKey) -> Result<()> {
            self.inner.delete(key)
        }

        fn scan(&self, range: &KeyRange) -> Result<ItemIterator<'_>> {
            self.inner.scan(range)
        }

        fn scan_table(&self, start_after: Option<&ItemKey>, limit: usize) -> Result<Vec<Item>> {
            self.inner.scan_table(start_after, limit)
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }
    };
}

impl StorageBackend for ConflictingBackend {
    delegate_to_inner!();

    fn put(&self, item: Item) -> Result<Option<Item>> {
        self.conflict()?;
        self.inner.put(item)
    }

    fn update(&self, key: &ItemKey, changes: &Item) -> Result<Item> {
        self.conflict()?;
        self.inner.update(key, changes)
    }

    fn batch_put(&self, items: Vec<Item>) -> Result<()> {
        self.conflict()?;
        self.inner.batch_put(items)
    }

    fn transact(&self, operations: Vec<Operation>) -> Result<()> {
        self.transact_calls.fetch_add(1, Ordering::SeqCst);
        self.conflict()?;
        self.inner.transact(operations)
    }

    fn name(&self) -> &'static str {
        "conflicting-memory"
    }
}

impl StorageBackend for RecordingBackend {
    delegate_to_inner!();

    fn put(&self, item: Item) -> Result<Option<Item>> {
        self.inner.put(item)
    }

    fn update(&self, key: &ItemKey, changes: &Item) -> Result<Item> {
        self.inner.update(key, changes)
    }

    fn batch_put(&self, items: Vec<Item>) -> Result<()> {
        self.batches.lock().push(items.clone());
        self.inner.batch_put(items)
    }

    fn transact(&self, operations: Vec<Operation>) -> Result<()> {
        self.transactions.lock().push(operations.clone());
        self.inner.transact(operations)
    }

    fn name(&self) -> &'static str {
        "recording-memory"
    }
}

/// Test database wrapper that automatically cleans up on drop.
pub struct TestDb {
    pub backend: Arc<RocksDBBackend>,
    /// Temporary directory (kept alive for the duration of the test)
    #[allow(dead_code)]
    temp_dir: TempDir,
}

impl TestDb {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = TempDir::new()?;
        let db = RocksDbInit::with_defaults(temp_dir.path().join("rocksdb")).open()?;
        Ok(Self {
            backend: Arc::new(RocksDBBackend::new(db)),
            temp_dir,
        })
    }

    /// The backend as a trait object, ready for `KvStore::new`.
    pub fn backend(&self) -> Arc<dyn StorageBackend> {
        self.backend.clone()
    }
}
