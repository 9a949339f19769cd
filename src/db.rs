//! Connection pooling and schema setup. Handlers check connections out of
//! the shared deadpool; migrations run once at boot.

use crate::config::Config;
use anyhow::Result;
use diesel::{Connection, PgConnection};
use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

pub type DbPool = Pool<AsyncPgConnection>;
pub type DbConnection = Object<AsyncPgConnection>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Build the pool from the configured URL, verify the database is
    /// reachable, and bring the schema up to date.
    pub async fn new() -> Result<Self> {
        let config = Config::get();
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database.url);

        let pool = DbPool::builder(manager)
            .max_size(config.database.max_connections as usize)
            .build()?;

        let db = Self { pool };

        // Fail at boot rather than on the first request
        let _conn = db.get_connection().await?;
        info!("Successfully connected to the database");

        db.run_migrations()?;

        Ok(db)
    }

    /// Apply pending migrations. diesel_migrations drives a synchronous
    /// connection, so this opens one outside the async pool.
    fn run_migrations(&self) -> Result<()> {
        let config = Config::get();
        let mut conn = PgConnection::establish(&config.database.url)?;

        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
        info!("Database migrations applied successfully");

        Ok(())
    }

    /// Check a connection out of the pool
    pub async fn get_connection(&self) -> Result<DbConnection> {
        self.pool
            .get()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to get database connection: {}", e))
    }

    pub fn get_pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Initialize database connection pool and run migrations
pub async fn init_database() -> Result<Database> {
    Database::new().await
}
