//! # facetdb-store
//!
//! Transactional item store underneath FacetDB's access-pattern collections.
//!
//! ## Architecture
//!
//! ```text
//! facetdb-views (Collection)
//!     ↓
//! KvStore            ← chunking, conflict retry, cursors, filters (kv_store.rs)
//!     ↓
//! StorageBackend     ← point ops, ordered scan, atomic transact (storage_trait.rs)
//!     ↓
//! RocksDB / in-memory
//! ```

pub mod cursor;
pub mod error;
pub mod filter;
pub mod key_encoding;
pub mod kv_store;
pub mod maintenance;
pub mod retry;
pub mod rocksdb_impl;
pub mod rocksdb_init;
pub mod storage_trait;

// Make test_utils available for testing in dependent crates
pub mod test_utils;

pub use cursor::{from_cursor, to_cursor, CursorError};
pub use error::{Result, StorageError};
pub use filter::{Filter, FilterOp};
pub use kv_store::{KvStore, QueryOptions, QueryPage, StoreOptions};
pub use maintenance::TableStats;
pub use retry::{retry_on_conflict, Backoff, JitterBackoff, NoBackoff, RetryPolicy};
pub use rocksdb_impl::RocksDBBackend;
pub use rocksdb_init::RocksDbInit;
pub use storage_trait::{KeyRange, ScanPage, StorageBackend, StorageBackendAsync};

use facetdb_configs::FacetConfig;
use std::sync::Arc;

/// Opens the backend selected by `config.storage.engine`.
pub fn open_backend(config: &FacetConfig) -> anyhow::Result<Arc<dyn StorageBackend>> {
    match config.storage.engine.as_str() {
        "rocksdb" => {
            let db = RocksDbInit::new(config.storage.rocksdb_dir(), config.storage.rocksdb.clone())
                .open()?;
            Ok(Arc::new(RocksDBBackend::new(db)))
        }
        "memory" => Ok(Arc::new(test_utils::InMemoryBackend::new())),
        other => Err(anyhow::anyhow!("Unknown storage engine '{}'", other)),
    }
}

/// Builds a [`KvStore`] from configuration: backend plus limits.
pub fn open_store(config: &FacetConfig) -> anyhow::Result<KvStore> {
    let backend = open_backend(config)?;
    Ok(KvStore::new(backend, StoreOptions::from_limits(&config.limits)))
}
