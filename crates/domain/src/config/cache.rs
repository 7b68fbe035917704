use serde::{Deserialize, Serialize};

/// Response cache sizing and TTL bounds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Rounded up to the next power of two.
    #[serde(default = "default_shard_count")]
    pub shard_count: usize,

    /// Positive answers are clamped into `[min_ttl, max_ttl]`.
    #[serde(default = "default_min_ttl")]
    pub min_ttl: u32,

    #[serde(default = "default_max_ttl")]
    pub max_ttl: u32,

    /// NXDOMAIN/NODATA and blocked answers.
    #[serde(default = "default_negative_ttl")]
    pub negative_ttl: u32,

    /// Policy REDIRECT answers.
    #[serde(default = "default_redirect_ttl")]
    pub redirect_ttl: u32,

    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: default_max_entries(),
            shard_count: default_shard_count(),
            min_ttl: default_min_ttl(),
            max_ttl: default_max_ttl(),
            negative_ttl: default_negative_ttl(),
            redirect_ttl: default_redirect_ttl(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> usize {
    100_000
}

fn default_shard_count() -> usize {
    64
}

fn default_min_ttl() -> u32 {
    60
}

fn default_max_ttl() -> u32 {
    86_400
}

fn default_negative_ttl() -> u32 {
    300
}

fn default_redirect_ttl() -> u32 {
    300
}

fn default_cleanup_interval_secs() -> u64 {
    300
}
