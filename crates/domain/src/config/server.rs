use serde::{Deserialize, Serialize};

/// Listener and request-handling settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_true")]
    pub udp_enabled: bool,

    #[serde(default = "default_true")]
    pub tcp_enabled: bool,

    /// Idle timeout for persistent TCP connections.
    #[serde(default = "default_tcp_idle_timeout_ms")]
    pub tcp_idle_timeout_ms: u64,

    /// Total deadline for one query, forwarding included.
    #[serde(default = "default_query_deadline_ms")]
    pub query_deadline_ms: u64,

    /// How long shutdown waits for in-flight handlers before closing.
    #[serde(default = "default_shutdown_drain_ms")]
    pub shutdown_drain_ms: u64,

    /// Attach the per-stage trace to persisted decision records.
    #[serde(default = "default_true")]
    pub decision_trace: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            udp_enabled: true,
            tcp_enabled: true,
            tcp_idle_timeout_ms: default_tcp_idle_timeout_ms(),
            query_deadline_ms: default_query_deadline_ms(),
            shutdown_drain_ms: default_shutdown_drain_ms(),
            decision_trace: true,
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:53".to_string()
}

fn default_true() -> bool {
    true
}

fn default_tcp_idle_timeout_ms() -> u64 {
    10_000
}

fn default_query_deadline_ms() -> u64 {
    10_000
}

fn default_shutdown_drain_ms() -> u64 {
    5_000
}
