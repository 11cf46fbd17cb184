use super::defaults::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level FacetDB configuration (`facetdb.toml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FacetConfig {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub limits: LimitsSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Storage engine selection and location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Backend engine: "rocksdb" or "memory"
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Base directory for on-disk data
    #[serde(default = "default_data_path")]
    pub data_path: String,

    #[serde(default)]
    pub rocksdb: RocksDbSettings,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            data_path: default_data_path(),
            rocksdb: RocksDbSettings::default(),
        }
    }
}

impl StorageSettings {
    /// Get RocksDB directory path (data_path/rocksdb)
    pub fn rocksdb_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_path).join("rocksdb")
    }
}

/// RocksDB tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbSettings {
    /// Write buffer size in bytes (default: 4MB)
    #[serde(default = "default_rocksdb_write_buffer_size")]
    pub write_buffer_size: usize,

    /// Maximum number of write buffers (default: 2)
    #[serde(default = "default_rocksdb_max_write_buffers")]
    pub max_write_buffers: i32,

    /// Maximum number of background jobs (default: 2)
    #[serde(default = "default_rocksdb_max_background_jobs")]
    pub max_background_jobs: i32,

    /// Maximum number of open files (default: 512)
    #[serde(default = "default_rocksdb_max_open_files")]
    pub max_open_files: i32,
}

impl Default for RocksDbSettings {
    fn default() -> Self {
        Self {
            write_buffer_size: default_rocksdb_write_buffer_size(),
            max_write_buffers: default_rocksdb_max_write_buffers(),
            max_background_jobs: default_rocksdb_max_background_jobs(),
            max_open_files: default_rocksdb_max_open_files(),
        }
    }
}

/// Batch ceilings and transactional retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsSettings {
    #[serde(default = "default_batch_write_ceiling")]
    pub batch_write_ceiling: usize,

    #[serde(default = "default_transact_write_ceiling")]
    pub transact_write_ceiling: usize,

    /// Attempts per transaction chunk before a conflict becomes fatal
    #[serde(default = "default_max_transaction_attempts")]
    pub max_transaction_attempts: u32,

    #[serde(default = "default_max_retry_jitter_ms")]
    pub max_retry_jitter_ms: u64,

    /// Page size used by truncate/export scans
    #[serde(default = "default_maintenance_page_size")]
    pub maintenance_page_size: usize,
}

impl Default for LimitsSettings {
    fn default() -> Self {
        Self {
            batch_write_ceiling: default_batch_write_ceiling(),
            transact_write_ceiling: default_transact_write_ceiling(),
            max_transaction_attempts: default_max_transaction_attempts(),
            max_retry_jitter_ms: default_max_retry_jitter_ms(),
            maintenance_page_size: default_maintenance_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// "compact" or "json" (file layer only)
    #[serde(default = "default_log_format")]
    pub format: String,

    #[serde(default = "default_true")]
    pub log_to_console: bool,

    /// Optional log file; no file layer when absent
    #[serde(default)]
    pub file_path: Option<String>,

    /// Per-target level overrides, e.g. `facetdb_store = "debug"`
    #[serde(default)]
    pub targets: HashMap<String, String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_to_console: true,
            file_path: None,
            targets: HashMap::new(),
        }
    }
}
