use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use gloryhole_application::ports::{QueryLogFilter, QueryLogStore, StoredDecision};
use gloryhole_domain::{DomainError, QueryDecision};
use sqlx::{Row, SqlitePool};
use tracing::debug;

const DEFAULT_QUERY_LIMIT: usize = 100;

/// SQLite-backed query log. `insert_batch` commits one multi-row INSERT
/// per call; timestamps are RFC 3339 UTC with fixed precision so string
/// comparison orders correctly.
pub struct SqliteQueryLogStore {
    pool: SqlitePool,
}

impl SqliteQueryLogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl QueryLogStore for SqliteQueryLogStore {
    async fn insert_batch(&self, records: &[QueryDecision]) -> Result<(), DomainError> {
        if records.is_empty() {
            return Ok(());
        }

        let mut sql = String::from(
            "INSERT INTO query_log (timestamp, client_ip, domain, record_type, response_code, \
             blocked, cached, response_time_ms, upstream, trace_json) VALUES ",
        );
        for i in 0..records.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str("(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)");
        }

        let now = format_timestamp(Utc::now());
        let mut query = sqlx::query(&sql);
        for record in records {
            query = query
                .bind(&now)
                .bind(record.client_ip.to_string())
                .bind(record.domain.to_string())
                .bind(record.record_type.as_str())
                .bind(record.response_code)
                .bind(record.blocked)
                .bind(record.cached)
                .bind(record.response_time_ms)
                .bind(record.upstream.as_deref().map(str::to_string))
                .bind(record.trace.to_json());
        }

        query
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

        debug!(count = records.len(), "Query log batch inserted");
        Ok(())
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query("DELETE FROM query_log WHERE timestamp < ?")
            .bind(format_timestamp(cutoff))
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?;
        Ok(result.rows_affected())
    }

    async fn query_range(
        &self,
        filter: &QueryLogFilter,
    ) -> Result<Vec<StoredDecision>, DomainError> {
        let mut sql = String::from(
            "SELECT id, timestamp, client_ip, domain, record_type, response_code, blocked, \
             cached, response_time_ms, upstream, trace_json FROM query_log WHERE 1=1",
        );

        if filter.domain_contains.is_some() {
            sql.push_str(" AND domain LIKE ?");
        }
        if filter.client_ip.is_some() {
            sql.push_str(" AND client_ip = ?");
        }
        if filter.blocked_only {
            sql.push_str(" AND blocked = 1");
        }
        if filter.since.is_some() {
            sql.push_str(" AND timestamp >= ?");
        }
        if filter.until.is_some() {
            sql.push_str(" AND timestamp < ?");
        }
        sql.push_str(" ORDER BY timestamp DESC, id DESC LIMIT ?");

        let mut query = sqlx::query(&sql);
        if let Some(needle) = &filter.domain_contains {
            query = query.bind(format!("%{needle}%"));
        }
        if let Some(client) = filter.client_ip {
            query = query.bind(client.to_string());
        }
        if let Some(since) = filter.since {
            query = query.bind(format_timestamp(since));
        }
        if let Some(until) = filter.until {
            query = query.bind(format_timestamp(until));
        }
        query = query.bind(filter.limit.unwrap_or(DEFAULT_QUERY_LIMIT) as i64);

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

        let mut decisions = Vec::with_capacity(rows.len());
        for row in rows {
            let timestamp: String = row.get("timestamp");
            let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|e| DomainError::DatabaseError(format!("bad timestamp: {e}")))?
                .with_timezone(&Utc);

            decisions.push(StoredDecision {
                id: row.get("id"),
                timestamp,
                client_ip: row.get("client_ip"),
                domain: row.get("domain"),
                record_type: row.get("record_type"),
                response_code: row.get("response_code"),
                blocked: row.get("blocked"),
                cached: row.get("cached"),
                response_time_ms: row.get("response_time_ms"),
                upstream: row.get("upstream"),
                trace_json: row.get("trace_json"),
            });
        }
        Ok(decisions)
    }
}
