//! RocksDB initialization utilities for FacetDB.

use anyhow::Result;
use facetdb_configs::RocksDbSettings;
use rocksdb::{OptimisticTransactionDB, Options};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// RocksDB initializer for creating/opening a database.
pub struct RocksDbInit {
    db_path: PathBuf,
    settings: RocksDbSettings,
}

impl RocksDbInit {
    /// Create a new initializer for the given path with custom settings.
    pub fn new(db_path: impl Into<PathBuf>, settings: RocksDbSettings) -> Self {
        Self {
            db_path: db_path.into(),
            settings,
        }
    }

    /// Create a new initializer with default settings.
    pub fn with_defaults(db_path: impl Into<PathBuf>) -> Self {
        Self::new(db_path, RocksDbSettings::default())
    }

    /// Open or create the database.
    pub fn open(&self) -> Result<Arc<OptimisticTransactionDB>> {
        let path: &Path = &self.db_path;
        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.set_write_buffer_size(self.settings.write_buffer_size);
        db_opts.set_max_write_buffer_number(self.settings.max_write_buffers);
        db_opts.set_max_background_jobs(self.settings.max_background_jobs);
        db_opts.increase_parallelism(self.settings.max_background_jobs);
        // Limit open files to prevent "Too many open files" errors
        db_opts.set_max_open_files(self.settings.max_open_files);

        let db = OptimisticTransactionDB::open(&db_opts, path)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB at {}: {}", path.display(), e))?;

        log::info!("Opened RocksDB at {}", path.display());
        Ok(Arc::new(db))
    }
}
