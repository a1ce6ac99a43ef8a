use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Create a PostgreSQL connection pool.
///
/// `connect` establishes one connection up front, so a bad DSN fails
/// here instead of on the first request.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(25)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Run the embedded schema migrations (snippet and user tables).
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
