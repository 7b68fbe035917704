use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};

/// What to do with a rate-limited query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitAction {
    /// No response at all.
    Drop,
    /// Answer REFUSED.
    Refuse,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Sustained refill rate, tokens per second per client.
    #[serde(default = "default_rps")]
    pub rps: f64,

    /// Bucket capacity.
    #[serde(default = "default_burst")]
    pub burst: f64,

    #[serde(default = "default_action")]
    pub action: RateLimitAction,

    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,

    /// Entries unseen for this long are removed by the sweep.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// Upper bound on tracked clients; LRU-evicted beyond this.
    #[serde(default = "default_max_tracked")]
    pub max_tracked: usize,

    /// Clients inside these networks are never rate limited.
    #[serde(default)]
    pub trusted_proxy_cidrs: Vec<IpNetwork>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rps: default_rps(),
            burst: default_burst(),
            action: default_action(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            max_tracked: default_max_tracked(),
            trusted_proxy_cidrs: vec![],
        }
    }
}

fn default_rps() -> f64 {
    50.0
}

fn default_burst() -> f64 {
    100.0
}

fn default_action() -> RateLimitAction {
    RateLimitAction::Refuse
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_max_tracked() -> usize {
    10_000
}
