use crate::forwarding::ForwardingRule;
use serde::{Deserialize, Serialize};

/// Default upstream pool plus the conditional forwarding rule set.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ForwarderConfig {
    #[serde(default = "default_upstreams")]
    pub default_upstreams: Vec<String>,

    /// Per-attempt timeout against one upstream.
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Extra attempts after the first; total attempts ≤ 1 + retries.
    #[serde(default = "default_retries")]
    pub default_retries: u32,

    /// Advance to the next upstream on SERVFAIL.
    #[serde(default = "default_failover")]
    pub default_failover: bool,

    #[serde(default)]
    pub rules: Vec<ForwardingRule>,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            default_upstreams: default_upstreams(),
            default_timeout_ms: default_timeout_ms(),
            default_retries: default_retries(),
            default_failover: default_failover(),
            rules: vec![],
        }
    }
}

fn default_upstreams() -> Vec<String> {
    vec!["1.1.1.1:53".to_string(), "9.9.9.9:53".to_string()]
}

fn default_timeout_ms() -> u64 {
    2000
}

fn default_retries() -> u32 {
    2
}

fn default_failover() -> bool {
    true
}
