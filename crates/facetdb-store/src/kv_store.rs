//! Async item store over a [`StorageBackend`].
//!
//! `KvStore` is what the rest of FacetDB talks to. It adds to the raw backend:
//!
//! - validation of item keys and update change sets
//! - cursor-based pagination with filters and reverse order
//! - chunking of bulk writes at the batch/transaction ceilings, chunks issued
//!   concurrently
//! - retry of writes that lose a race, whole batch at a time
//!
//! ```text
//! transact_write(ops)
//!     │
//!     ├── chunk 1 (≤ ceiling) ──► retry_on_conflict ──► backend.transact
//!     ├── chunk 2 (≤ ceiling) ──► retry_on_conflict ──► backend.transact
//!     └── ...                     (concurrently)
//! ```
//!
//! Atomicity holds per chunk only. A caller submitting more operations than
//! the transaction ceiling can observe a partially applied batch if a later
//! chunk fails.

use crate::cursor::{from_cursor, to_cursor, CursorError};
use crate::error::{Result, StorageError};
use crate::filter::Filter;
use crate::retry::{retry_on_conflict, Backoff, RetryPolicy};
use crate::storage_trait::{KeyRange, StorageBackend, StorageBackendAsync};
use facetdb_commons::{Item, ItemKey, Operation};
use facetdb_configs::LimitsSettings;
use futures_util::future::try_join_all;
use std::sync::Arc;

/// Ceilings and retry policy for a [`KvStore`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub batch_write_ceiling: usize,
    pub transact_write_ceiling: usize,
    pub maintenance_page_size: usize,
    pub retry: RetryPolicy,
}

impl StoreOptions {
    pub fn from_limits(limits: &LimitsSettings) -> Self {
        Self {
            batch_write_ceiling: limits.batch_write_ceiling.max(1),
            transact_write_ceiling: limits.transact_write_ceiling.max(1),
            maintenance_page_size: limits.maintenance_page_size.max(1),
            retry: RetryPolicy::from_limits(limits),
        }
    }

    /// Replaces the delay source, keeping the attempt ceiling.
    pub fn with_backoff(mut self, backoff: Arc<dyn Backoff>) -> Self {
        self.retry = RetryPolicy::new(self.retry.max_attempts, backoff);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry = RetryPolicy::new(max_attempts, self.retry.backoff.clone());
        self
    }

    pub fn with_transact_ceiling(mut self, ceiling: usize) -> Self {
        self.transact_write_ceiling = ceiling.max(1);
        self
    }

    pub fn with_batch_ceiling(mut self, ceiling: usize) -> Self {
        self.batch_write_ceiling = ceiling.max(1);
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.maintenance_page_size = page_size.max(1);
        self
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::from_limits(&LimitsSettings::default())
    }
}

/// Pagination and filtering options for [`KvStore::query`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Maximum items per page; `None` (or 0) returns everything
    pub limit: Option<usize>,
    /// Cursor returned by the previous page of the same query
    pub cursor: Option<String>,
    /// `"field operator value"` expressions, ANDed
    pub filters: Vec<String>,
    /// Descending sort-key order
    pub reverse: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn filter(mut self, expr: impl Into<String>) -> Self {
        self.filters.push(expr.into());
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub items: Vec<Item>,
    /// Present only when more matching items remain
    pub cursor: Option<String>,
}

/// Shared, stateless handle to an item store.
///
/// Cloning is cheap; clones share the backend.
#[derive(Clone)]
pub struct KvStore {
    backend: Arc<dyn StorageBackend>,
    options: Arc<StoreOptions>,
}

impl KvStore {
    pub fn new(backend: Arc<dyn StorageBackend>, options: StoreOptions) -> Self {
        Self {
            backend,
            options: Arc::new(options),
        }
    }

    pub fn with_defaults(backend: Arc<dyn StorageBackend>) -> Self {
        Self::new(backend, StoreOptions::default())
    }

    pub fn backend(&self) -> &Arc<dyn StorageBackend> {
        &self.backend
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub async fn get(&self, key: &ItemKey) -> Result<Option<Item>> {
        self.backend.get_async(key).await
    }

    /// Point lookups for many keys. Absent keys are omitted; present items keep
    /// request order.
    pub async fn batch_get(&self, keys: &[ItemKey]) -> Result<Vec<Item>> {
        let chunks = keys
            .chunks(self.options.batch_write_ceiling)
            .map(|chunk| self.backend.get_many_async(chunk.to_vec()));
        let results = try_join_all(chunks).await?;
        Ok(results.into_iter().flatten().flatten().collect())
    }

    /// Unconditional upsert; returns the previous attributes, if any.
    ///
    /// A write race on the same key is retried like a transaction.
    pub async fn put(&self, item: Item) -> Result<Option<Item>> {
        ItemKey::from_item(&item)?;
        retry_on_conflict(&self.options.retry, |_attempt| {
            self.backend.put_async(item.clone())
        })
        .await
    }

    /// Partial update built only from the fields in `changes`. Key fields are
    /// never mutated. Returns the item after the update.
    pub async fn update(&self, key: &ItemKey, changes: Item) -> Result<Item> {
        let changes: Item = changes
            .into_iter()
            .filter(|(field, _)| !ItemKey::is_key_field(field))
            .collect();
        if changes.is_empty() {
            return Err(StorageError::InvalidUpdate(format!(
                "no non-key fields to update for {}",
                key
            )));
        }
        retry_on_conflict(&self.options.retry, |_attempt| {
            self.backend.update_async(key, changes.clone())
        })
        .await
    }

    pub async fn delete(&self, key: &ItemKey) -> Result<()> {
        self.backend.delete_async(key).await
    }

    /// Items under `pk` whose sort key begins with `sk_prefix` (all items of
    /// the partition when `None`), filtered and paginated.
    pub async fn query(
        &self,
        pk: &str,
        sk_prefix: Option<&str>,
        options: QueryOptions,
    ) -> Result<QueryPage> {
        let filters = Filter::parse_all(&options.filters)?;

        let start_after = match options.cursor.as_deref() {
            Some(cursor) => Some(resume_point(cursor, pk, sk_prefix)?),
            None => None,
        };

        let range = KeyRange {
            pk: pk.to_string(),
            sk_prefix: sk_prefix.map(str::to_string),
            start_after,
            reverse: options.reverse,
        };
        let limit = options.limit.filter(|limit| *limit > 0);

        let page = self.backend.scan_page_async(range, filters, limit).await?;

        let cursor = match (page.has_more, page.items.last()) {
            (true, Some(last)) => Some(to_cursor(&ItemKey::from_item(last)?)?),
            _ => None,
        };

        Ok(QueryPage {
            items: page.items,
            cursor,
        })
    }

    /// Follows cursors until the query is exhausted.
    pub async fn query_all(
        &self,
        pk: &str,
        sk_prefix: Option<&str>,
        options: QueryOptions,
    ) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        let mut options = options;
        loop {
            let page = self.query(pk, sk_prefix, options.clone()).await?;
            items.extend(page.items);
            match page.cursor {
                Some(cursor) => options.cursor = Some(cursor),
                None => return Ok(items),
            }
        }
    }

    /// Non-atomic bulk upsert, chunked at the batch ceiling. Each chunk is
    /// retried on conflict; succeeds only if every chunk succeeds.
    pub async fn batch_write(&self, items: Vec<Item>) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        for item in &items {
            ItemKey::from_item(item)?;
        }

        let chunks = chunk(items, self.options.batch_write_ceiling);
        log::debug!(
            "batch_write: {} chunk(s) of at most {} item(s) on {}",
            chunks.len(),
            self.options.batch_write_ceiling,
            self.backend.name()
        );

        try_join_all(chunks.into_iter().map(|chunk| self.batch_chunk(chunk))).await?;
        Ok(())
    }

    async fn batch_chunk(&self, items: Vec<Item>) -> Result<()> {
        retry_on_conflict(&self.options.retry, |_attempt| {
            self.backend.batch_put_async(items.clone())
        })
        .await
    }

    /// Atomic multi-item write with conflict retry.
    ///
    /// Lists longer than the transaction ceiling are split into chunks that
    /// are each atomic and retried independently; there is no atomicity
    /// across chunks.
    pub async fn transact_write(&self, operations: Vec<Operation>) -> Result<()> {
        if operations.is_empty() {
            return Ok(());
        }

        let ceiling = self.options.transact_write_ceiling;
        if operations.len() > ceiling {
            log::warn!(
                "transact_write: {} operations exceed the ceiling of {}; atomicity holds per chunk only",
                operations.len(),
                ceiling
            );
        }

        let chunks = chunk(operations, ceiling);
        try_join_all(chunks.into_iter().map(|chunk| self.transact_chunk(chunk))).await?;
        Ok(())
    }

    async fn transact_chunk(&self, operations: Vec<Operation>) -> Result<()> {
        log::debug!(
            "transact: {} operation(s) on {}",
            operations.len(),
            self.backend.name()
        );
        retry_on_conflict(&self.options.retry, |_attempt| {
            self.backend.transact_async(operations.clone())
        })
        .await
    }
}

/// Decodes a cursor and checks it belongs to the query being resumed.
fn resume_point(cursor: &str, pk: &str, sk_prefix: Option<&str>) -> Result<String> {
    let key: ItemKey = from_cursor(cursor)?;
    if key.pk != pk {
        return Err(CursorError::ShapeMismatch(format!(
            "cursor partition '{}' does not match '{}'",
            key.pk, pk
        ))
        .into());
    }
    if let Some(prefix) = sk_prefix {
        if !key.sk.starts_with(prefix) {
            return Err(CursorError::ShapeMismatch(format!(
                "cursor sort key '{}' is outside prefix '{}'",
                key.sk, prefix
            ))
            .into());
        }
    }
    Ok(key.sk)
}

fn chunk<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut iter = items.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(size).collect());
    }
    chunks
}
