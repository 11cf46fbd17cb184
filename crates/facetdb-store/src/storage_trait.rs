//! Storage backend abstraction for pluggable item stores.
//!
//! Backends speak in whole items (flat JSON objects carrying the reserved
//! `pk`/`sk` fields). Everything above this trait (chunking, conflict retry,
//! cursors, filters) lives in [`KvStore`](crate::KvStore), so a backend only
//! has to provide point access, an ordered partition scan, and an atomic
//! multi-item write.
//!
//! ## Implementations
//!
//! - [`RocksDBBackend`](crate::RocksDBBackend): RocksDB optimistic transactions
//! - [`InMemoryBackend`](crate::test_utils::InMemoryBackend): `BTreeMap` behind a lock
//!
//! ## Implementing a Custom Backend
//!
//! ```rust,ignore
//! impl StorageBackend for MyBackend {
//!     fn get(&self, key: &ItemKey) -> Result<Option<Item>> { todo!() }
//!     fn transact(&self, operations: Vec<Operation>) -> Result<()> {
//!         // Apply all operations or none. Report lost write races as
//!         // StorageError::TransactionConflict so callers retry.
//!         todo!()
//!     }
//!     // ... remaining methods
//! }
//! ```

use crate::error::{Result, StorageError};
use crate::filter::Filter;
use facetdb_commons::{Item, ItemKey, Operation};
use std::any::Any;
use std::sync::Arc;

/// Lazy stream of items produced by a partition scan.
pub type ItemIterator<'a> = Box<dyn Iterator<Item = Result<Item>> + 'a>;

/// Sort-key range inside a single partition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyRange {
    pub pk: String,
    /// Only sort keys starting with this prefix
    pub sk_prefix: Option<String>,
    /// Resume strictly after this sort key (in iteration order)
    pub start_after: Option<String>,
    /// Iterate sort keys in descending order
    pub reverse: bool,
}

impl KeyRange {
    pub fn partition(pk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            ..Default::default()
        }
    }

    /// True if `sk` lies inside the range bounds (prefix and resume point).
    pub fn admits(&self, sk: &str) -> bool {
        if let Some(prefix) = &self.sk_prefix {
            if !sk.starts_with(prefix.as_str()) {
                return false;
            }
        }
        match &self.start_after {
            Some(after) if self.reverse => sk < after.as_str(),
            Some(after) => sk > after.as_str(),
            None => true,
        }
    }
}

/// One page of filtered scan results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Another matching item exists after the last one returned
    pub has_more: bool,
}

/// Trait for pluggable storage backend implementations.
///
/// Implementations must be thread-safe (Send + Sync) to allow concurrent access.
///
/// ## Error Handling
///
/// - `transact` reports a lost write race as `TransactionConflict`
/// - Engine failures map to `IoError`
/// - Undecodable values map to `SerializationError`
pub trait StorageBackend: Send + Sync {
    /// Point lookup; `Ok(None)` when absent.
    fn get(&self, key: &ItemKey) -> Result<Option<Item>>;

    /// Lookup of several keys, in request order.
    fn get_many(&self, keys: &[ItemKey]) -> Result<Vec<Option<Item>>> {
        keys.iter().map(|key| self.get(key)).collect()
    }

    /// Unconditional upsert; returns the replaced item if there was one.
    fn put(&self, item: Item) -> Result<Option<Item>>;

    /// Merges `changes` into the item at `key` (creating it if absent) and
    /// returns the resulting item. Key fields in `changes` are ignored.
    fn update(&self, key: &ItemKey, changes: &Item) -> Result<Item>;

    /// Deletes the item at `key`. Idempotent.
    fn delete(&self, key: &ItemKey) -> Result<()>;

    /// Applies every operation, in order, atomically.
    fn transact(&self, operations: Vec<Operation>) -> Result<()>;

    /// Non-atomic bulk upsert.
    fn batch_put(&self, items: Vec<Item>) -> Result<()>;

    /// Ordered scan of one partition.
    fn scan(&self, range: &KeyRange) -> Result<ItemIterator<'_>>;

    /// Full-table scan in key order, for maintenance tooling.
    fn scan_table(&self, start_after: Option<&ItemKey>, limit: usize) -> Result<Vec<Item>>;

    /// Engine name for log lines.
    fn name(&self) -> &'static str;

    /// Downcast support for tests and tooling that need the concrete backend.
    fn as_any(&self) -> &dyn Any;
}

/// Merges `changes` into `item`, leaving the reserved key fields untouched.
pub fn apply_changes(item: &mut Item, changes: &Item) {
    for (field, value) in changes {
        if !ItemKey::is_key_field(field) {
            item.insert(field.clone(), value.clone());
        }
    }
}

/// Drains `items` into a page of at most `limit` entries that pass every filter.
pub fn collect_page(items: ItemIterator<'_>, filters: &[Filter], limit: Option<usize>) -> Result<ScanPage> {
    let mut page = ScanPage::default();
    for entry in items {
        let item = entry?;
        if !filters.iter().all(|filter| filter.matches(&item)) {
            continue;
        }
        if limit == Some(page.items.len()) {
            page.has_more = true;
            break;
        }
        page.items.push(item);
    }
    Ok(page)
}

/// Extension trait providing async versions of StorageBackend methods.
///
/// These methods use `tokio::task::spawn_blocking` so engine calls never block
/// the async runtime.
#[async_trait::async_trait]
pub trait StorageBackendAsync: Send + Sync {
    async fn get_async(&self, key: &ItemKey) -> Result<Option<Item>>;

    async fn get_many_async(&self, keys: Vec<ItemKey>) -> Result<Vec<Option<Item>>>;

    async fn put_async(&self, item: Item) -> Result<Option<Item>>;

    async fn update_async(&self, key: &ItemKey, changes: Item) -> Result<Item>;

    async fn delete_async(&self, key: &ItemKey) -> Result<()>;

    async fn transact_async(&self, operations: Vec<Operation>) -> Result<()>;

    async fn batch_put_async(&self, items: Vec<Item>) -> Result<()>;

    /// Scan plus filtering, collected on the blocking pool since iterators
    /// can't cross the spawn_blocking boundary.
    async fn scan_page_async(
        &self,
        range: KeyRange,
        filters: Vec<Filter>,
        limit: Option<usize>,
    ) -> Result<ScanPage>;

    async fn scan_table_async(&self, start_after: Option<ItemKey>, limit: usize) -> Result<Vec<Item>>;
}

async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StorageError::Other(format!("spawn_blocking join error: {}", e)))?
}

// Blanket implementation for Arc<dyn StorageBackend>
#[async_trait::async_trait]
impl StorageBackendAsync for Arc<dyn StorageBackend> {
    async fn get_async(&self, key: &ItemKey) -> Result<Option<Item>> {
        let backend = self.clone();
        let key = key.clone();
        run_blocking(move || backend.get(&key)).await
    }

    async fn get_many_async(&self, keys: Vec<ItemKey>) -> Result<Vec<Option<Item>>> {
        let backend = self.clone();
        run_blocking(move || backend.get_many(&keys)).await
    }

    async fn put_async(&self, item: Item) -> Result<Option<Item>> {
        let backend = self.clone();
        run_blocking(move || backend.put(item)).await
    }

    async fn update_async(&self, key: &ItemKey, changes: Item) -> Result<Item> {
        let backend = self.clone();
        let key = key.clone();
        run_blocking(move || backend.update(&key, &changes)).await
    }

    async fn delete_async(&self, key: &ItemKey) -> Result<()> {
        let backend = self.clone();
        let key = key.clone();
        run_blocking(move || backend.delete(&key)).await
    }

    async fn transact_async(&self, operations: Vec<Operation>) -> Result<()> {
        let backend = self.clone();
        run_blocking(move || backend.transact(operations)).await
    }

    async fn batch_put_async(&self, items: Vec<Item>) -> Result<()> {
        let backend = self.clone();
        run_blocking(move || backend.batch_put(items)).await
    }

    async fn scan_page_async(
        &self,
        range: KeyRange,
        filters: Vec<Filter>,
        limit: Option<usize>,
    ) -> Result<ScanPage> {
        let backend = self.clone();
        run_blocking(move || {
            let items = backend.scan(&range)?;
            collect_page(items, &filters, limit)
        })
        .await
    }

    async fn scan_table_async(&self, start_after: Option<ItemKey>, limit: usize) -> Result<Vec<Item>> {
        let backend = self.clone();
        run_blocking(move || backend.scan_table(start_after.as_ref(), limit)).await
    }
}
