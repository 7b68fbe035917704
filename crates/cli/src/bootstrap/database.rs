use gloryhole_domain::DomainError;
use sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<SqlitePool, DomainError> {
    gloryhole_infrastructure::database::create_pool(database_url).await
}
