use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gloryhole_domain::{DomainError, QueryDecision};
use std::net::IpAddr;

/// A decision record as read back from the store.
#[derive(Debug, Clone)]
pub struct StoredDecision {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub client_ip: String,
    pub domain: String,
    pub record_type: String,
    pub response_code: String,
    pub blocked: bool,
    pub cached: bool,
    pub response_time_ms: f64,
    pub upstream: Option<String>,
    pub trace_json: Option<String>,
}

/// Filter for `query_range`. Unset fields do not constrain.
#[derive(Debug, Clone, Default)]
pub struct QueryLogFilter {
    pub domain_contains: Option<String>,
    pub client_ip: Option<IpAddr>,
    pub blocked_only: bool,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Persistent query log, consumed by the buffered writer and the retention
/// job. One `insert_batch` call commits in a single transaction.
#[async_trait]
pub trait QueryLogStore: Send + Sync {
    async fn insert_batch(&self, records: &[QueryDecision]) -> Result<(), DomainError>;

    /// Delete records older than `cutoff`; returns the deleted count.
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError>;

    async fn query_range(
        &self,
        filter: &QueryLogFilter,
    ) -> Result<Vec<StoredDecision>, DomainError>;
}
