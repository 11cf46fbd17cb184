//! Full-table maintenance operations used by tooling, never by the request path.
//!
//! Each operation pages through the whole table with
//! [`StorageBackend::scan_table`](crate::StorageBackend::scan_table) until a
//! short page signals there is nothing left.

use crate::error::Result;
use crate::kv_store::KvStore;
use crate::storage_trait::StorageBackendAsync;
use facetdb_commons::{Item, ItemKey, Operation};

/// Item counts reported by [`KvStore::stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStats {
    pub items: usize,
    pub partitions: usize,
}

impl KvStore {
    /// Deletes every item. Returns the number of items removed.
    pub async fn truncate(&self) -> Result<usize> {
        let page_size = self.options().maintenance_page_size;
        let mut removed = 0;

        loop {
            // Always restart from the beginning: the previous page is gone.
            let page = self.backend().scan_table_async(None, page_size).await?;
            if page.is_empty() {
                break;
            }

            let deletes = page
                .iter()
                .map(|item| ItemKey::from_item(item).map(Operation::delete))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            removed += deletes.len();
            self.transact_write(deletes).await?;

            if page.len() < page_size {
                break;
            }
        }

        log::info!("Truncated {} item(s) from {}", removed, self.backend().name());
        Ok(removed)
    }

    /// Reads every item in key order.
    pub async fn export(&self) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        self.for_each_page(|page| items.extend_from_slice(page)).await?;
        log::info!("Exported {} item(s) from {}", items.len(), self.backend().name());
        Ok(items)
    }

    /// Writes every item with [`KvStore::batch_write`]. Returns the count.
    pub async fn import(&self, items: Vec<Item>) -> Result<usize> {
        let count = items.len();
        self.batch_write(items).await?;
        log::info!("Imported {} item(s) into {}", count, self.backend().name());
        Ok(count)
    }

    /// Counts items and distinct partition keys.
    pub async fn stats(&self) -> Result<TableStats> {
        let mut stats = TableStats::default();
        let mut last_pk: Option<String> = None;
        let mut key_error = None;

        self.for_each_page(|page| {
            for item in page {
                match ItemKey::from_item(item) {
                    Ok(key) => {
                        stats.items += 1;
                        if last_pk.as_deref() != Some(key.pk.as_str()) {
                            stats.partitions += 1;
                            last_pk = Some(key.pk);
                        }
                    }
                    Err(e) => key_error = Some(e),
                }
            }
        })
        .await?;

        match key_error {
            Some(e) => Err(e.into()),
            None => Ok(stats),
        }
    }

    async fn for_each_page<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&[Item]),
    {
        let page_size = self.options().maintenance_page_size;
        let mut start_after: Option<ItemKey> = None;

        loop {
            let page = self
                .backend()
                .scan_table_async(start_after.clone(), page_size)
                .await?;
            visit(&page);

            match page.last() {
                Some(last) if page.len() == page_size => {
                    start_after = Some(ItemKey::from_item(last)?);
                }
                _ => return Ok(()),
            }
        }
    }
}
