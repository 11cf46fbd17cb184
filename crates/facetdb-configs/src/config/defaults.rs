// Default value functions

pub fn default_engine() -> String {
    "rocksdb".to_string()
}

pub fn default_data_path() -> String {
    "./data".to_string()
}

pub fn default_rocksdb_write_buffer_size() -> usize {
    4 * 1024 * 1024 // 4MB
}

pub fn default_rocksdb_max_write_buffers() -> i32 {
    2
}

pub fn default_rocksdb_max_background_jobs() -> i32 {
    2
}

pub fn default_rocksdb_max_open_files() -> i32 {
    512
}

/// Maximum items per non-transactional batch write chunk.
pub fn default_batch_write_ceiling() -> usize {
    25
}

/// Maximum operations per atomic transaction chunk.
pub fn default_transact_write_ceiling() -> usize {
    100
}

pub fn default_max_transaction_attempts() -> u32 {
    20
}

/// Upper bound of the uniform retry jitter window, in milliseconds.
pub fn default_max_retry_jitter_ms() -> u64 {
    20
}

pub fn default_maintenance_page_size() -> usize {
    100
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_log_format() -> String {
    "compact".to_string()
}

pub fn default_true() -> bool {
    true
}
