use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;

use wardline_core::config::DatabaseConfig;

pub type DbPool = sqlx::SqlitePool;

/// Open a SQLite pool from the application's database configuration.
/// The config is validated upstream, so sizes and timeouts arrive > 0.
///
/// Every connection enables foreign keys, switches to WAL so readers
/// do not block the writer, and sets a busy timeout so short write
/// contention retries instead of failing.
pub async fn connect(database: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(database.max_connections)
        .acquire_timeout(Duration::from_secs(database.timeout_secs))
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&database.url)
        .await
}

/// Single-connection in-memory pool for tests. One connection keeps
/// the in-memory database alive for the pool's lifetime.
pub async fn connect_memory() -> Result<DbPool, sqlx::Error> {
    connect(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        timeout_secs: 30,
    })
    .await
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::connect_memory;

    #[tokio::test]
    async fn pool_connections_enforce_foreign_keys() {
        let pool = connect_memory().await.expect("connect");

        let row = sqlx::query("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .expect("pragma query");
        let enabled: i64 = row.get(0);
        assert_eq!(enabled, 1);
    }
}
