use serde::{Deserialize, Serialize};

/// Query log persistence and retention.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Bounded channel between the handler and the writer workers.
    /// When full, new records are dropped and counted.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,

    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    #[serde(default = "default_retention_interval_secs")]
    pub retention_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            buffer_size: default_buffer_size(),
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            workers: default_workers(),
            retention_days: default_retention_days(),
            retention_interval_secs: default_retention_interval_secs(),
        }
    }
}

fn default_database_url() -> String {
    "sqlite://gloryhole.db?mode=rwc".to_string()
}

fn default_buffer_size() -> usize {
    10_000
}

fn default_batch_size() -> usize {
    500
}

fn default_flush_interval_ms() -> u64 {
    100
}

fn default_workers() -> usize {
    1
}

fn default_retention_days() -> u32 {
    90
}

fn default_retention_interval_secs() -> u64 {
    86_400
}
