//! RocksDB implementation of the StorageBackend trait.
//!
//! Items are stored as JSON values under `{pk}\0{sk}` keys (see
//! [`key_encoding`](crate::key_encoding)) in an `OptimisticTransactionDB`.
//! Every multi-key or read-modify-write operation runs inside an optimistic
//! transaction; a commit that loses a race fails with `Busy`/`TryAgain`, which
//! is reported as [`StorageError::TransactionConflict`].

use crate::error::{Result, StorageError};
use crate::key_encoding::{encode_key, encode_prefix, prefix_upper_bound};
use crate::storage_trait::{apply_changes, ItemIterator, KeyRange, StorageBackend};
use facetdb_commons::{Item, ItemKey, Operation};
use rocksdb::{Direction, ErrorKind, IteratorMode, OptimisticTransactionDB};
use std::sync::Arc;

/// RocksDB implementation of the StorageBackend trait.
///
/// ## Example
///
/// ```rust,ignore
/// use facetdb_store::{RocksDBBackend, RocksDbInit};
///
/// let db = RocksDbInit::with_defaults("/tmp/facetdb").open()?;
/// let backend = RocksDBBackend::new(db);
/// ```
pub struct RocksDBBackend {
    db: Arc<OptimisticTransactionDB>,
}

impl RocksDBBackend {
    /// Creates a new RocksDB backend with the given database handle.
    pub fn new(db: Arc<OptimisticTransactionDB>) -> Self {
        Self { db }
    }

    /// Returns a reference to the underlying database.
    pub fn db(&self) -> &Arc<OptimisticTransactionDB> {
        &self.db
    }
}

fn map_rocksdb_error(e: rocksdb::Error) -> StorageError {
    match e.kind() {
        ErrorKind::Busy | ErrorKind::TryAgain => StorageError::TransactionConflict(e.to_string()),
        _ => StorageError::IoError(e.to_string()),
    }
}

fn encode_item(item: &Item) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(item)?)
}

fn decode_item(bytes: &[u8]) -> Result<Item> {
    Ok(serde_json::from_slice(bytes)?)
}

impl StorageBackend for RocksDBBackend {
    fn get(&self, key: &ItemKey) -> Result<Option<Item>> {
        let raw = encode_key(key)?;
        match self.db.get(raw).map_err(map_rocksdb_error)? {
            Some(bytes) => Ok(Some(decode_item(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put(&self, item: Item) -> Result<Option<Item>> {
        let raw = encode_key(&ItemKey::from_item(&item)?)?;
        let txn = self.db.transaction();
        let previous = txn.get_for_update(&raw, true).map_err(map_rocksdb_error)?;
        txn.put(&raw, encode_item(&item)?).map_err(map_rocksdb_error)?;
        txn.commit().map_err(map_rocksdb_error)?;
        previous.map(|bytes| decode_item(&bytes)).transpose()
    }

    fn update(&self, key: &ItemKey, changes: &Item) -> Result<Item> {
        let raw = encode_key(key)?;
        let txn = self.db.transaction();
        let mut item = match txn.get_for_update(&raw, true).map_err(map_rocksdb_error)? {
            Some(bytes) => decode_item(&bytes)?,
            None => key.to_item(),
        };
        apply_changes(&mut item, changes);
        txn.put(&raw, encode_item(&item)?).map_err(map_rocksdb_error)?;
        txn.commit().map_err(map_rocksdb_error)?;
        Ok(item)
    }

    fn delete(&self, key: &ItemKey) -> Result<()> {
        self.db.delete(encode_key(key)?).map_err(map_rocksdb_error)
    }

    fn transact(&self, operations: Vec<Operation>) -> Result<()> {
        // Dropping the transaction on an early return rolls it back.
        let txn = self.db.transaction();
        for op in operations {
            match op {
                Operation::Put { item } => {
                    let raw = encode_key(&ItemKey::from_item(&item)?)?;
                    txn.put(&raw, encode_item(&item)?).map_err(map_rocksdb_error)?;
                }
                Operation::Update { key, changes } => {
                    let raw = encode_key(&key)?;
                    // Reads its own earlier writes in this transaction.
                    let mut item = match txn.get_for_update(&raw, true).map_err(map_rocksdb_error)? {
                        Some(bytes) => decode_item(&bytes)?,
                        None => key.to_item(),
                    };
                    apply_changes(&mut item, &changes);
                    txn.put(&raw, encode_item(&item)?).map_err(map_rocksdb_error)?;
                }
                Operation::Delete { key } => {
                    txn.delete(encode_key(&key)?).map_err(map_rocksdb_error)?;
                }
            }
        }
        txn.commit().map_err(map_rocksdb_error)
    }

    fn batch_put(&self, items: Vec<Item>) -> Result<()> {
        let txn = self.db.transaction();
        for item in &items {
            let raw = encode_key(&ItemKey::from_item(item)?)?;
            txn.put(&raw, encode_item(item)?).map_err(map_rocksdb_error)?;
        }
        txn.commit().map_err(map_rocksdb_error)
    }

    fn scan(&self, range: &KeyRange) -> Result<ItemIterator<'_>> {
        let prefix = encode_prefix(&range.pk, range.sk_prefix.as_deref().unwrap_or(""))?;
        let resume = match &range.start_after {
            Some(sk) => Some(encode_key(&ItemKey::new(range.pk.clone(), sk.clone()))?),
            None => None,
        };

        let inner = match (&resume, range.reverse) {
            (Some(start), false) => self.db.iterator(IteratorMode::From(start, Direction::Forward)),
            (Some(start), true) => self.db.iterator(IteratorMode::From(start, Direction::Reverse)),
            (None, false) => self.db.iterator(IteratorMode::From(&prefix, Direction::Forward)),
            (None, true) => {
                let upper = prefix_upper_bound(&prefix);
                self.db.iterator(IteratorMode::From(&upper, Direction::Reverse))
            }
        };

        let iter = inner
            .map(|entry| entry.map_err(map_rocksdb_error))
            .skip_while(move |entry| {
                matches!(entry, Ok((k, _)) if resume.as_deref() == Some(&k[..]))
            })
            .take_while(move |entry| match entry {
                Ok((k, _)) => k.starts_with(&prefix),
                Err(_) => true,
            })
            .map(|entry| entry.and_then(|(_, v)| decode_item(&v)));

        Ok(Box::new(iter))
    }

    fn scan_table(&self, start_after: Option<&ItemKey>, limit: usize) -> Result<Vec<Item>> {
        let resume = start_after.map(encode_key).transpose()?;
        let inner = match &resume {
            Some(start) => self.db.iterator(IteratorMode::From(start, Direction::Forward)),
            None => self.db.iterator(IteratorMode::Start),
        };

        let mut items = Vec::with_capacity(limit);
        for entry in inner {
            let (k, v) = entry.map_err(map_rocksdb_error)?;
            if resume.as_deref() == Some(&k[..]) {
                continue;
            }
            if items.len() == limit {
                break;
            }
            items.push(decode_item(&v)?);
        }
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "rocksdb"
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
