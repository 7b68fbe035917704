use gloryhole_domain::DomainError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::info;

/// Open (and create if needed) the SQLite database and ensure the schema.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DomainError> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| DomainError::DatabaseError(format!("'{database_url}': {e}")))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

    init_schema(&pool).await?;
    info!(database_url, "Database ready");
    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS query_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            client_ip TEXT NOT NULL,
            domain TEXT NOT NULL,
            record_type TEXT NOT NULL,
            response_code TEXT NOT NULL,
            blocked INTEGER NOT NULL DEFAULT 0,
            cached INTEGER NOT NULL DEFAULT 0,
            response_time_ms REAL NOT NULL DEFAULT 0,
            upstream TEXT,
            trace_json TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_query_log_timestamp ON query_log(timestamp)")
        .execute(pool)
        .await
        .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_query_log_domain ON query_log(domain)")
        .execute(pool)
        .await
        .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

    Ok(())
}
