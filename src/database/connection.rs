use crate::config::DatabaseConfig;
use crate::error::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::info;

/// Migrations embedded from the crate's `migrations/` directory.
///
/// ```rust,ignore
/// #[sqlx::test(migrator = "pokeapi_qa::database::MIGRATOR")]
/// async fn test_feature(pool: PgPool) { /* ... */ }
/// ```
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: PgPool,
}

impl DatabaseConnection {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.url())
            .await?;

        info!(
            host = %config.host,
            database = %config.database,
            max_connections = config.max_connections,
            "Connected to response cache database"
        );

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<bool> {
        let row = sqlx::query("SELECT 1 as health")
            .fetch_one(&self.pool)
            .await?;

        let health: i32 = row.try_get("health")?;
        Ok(health == 1)
    }

    /// Apply pending migrations
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        info!("Response cache migrations complete");
        Ok(())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
