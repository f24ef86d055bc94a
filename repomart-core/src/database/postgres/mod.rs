//! PostgreSQL adapters for every repository port.
//!
//! Queries are runtime-checked (`sqlx::query` / `query_as` + `FromRow`), so
//! the crate builds without a live database. Multi-step operations run in one
//! transaction and lock the rows they read with `FOR UPDATE`.

mod catalog;
mod comments;
mod orders;
mod payouts;
mod reports;
mod reviews;
mod rows;
mod search_history;
mod sellers;
mod sessions;
mod users;

use std::fmt;
use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::error::{CoreError, Result};

pub use catalog::PostgresCatalogRepository;
pub use comments::PostgresCommentsRepository;
pub use orders::PostgresOrdersRepository;
pub use payouts::PostgresPayoutsRepository;
pub use reports::PostgresReportsRepository;
pub use reviews::PostgresReviewsRepository;
pub use search_history::PostgresSearchHistoryRepository;
pub use sellers::PostgresSellersRepository;
pub use sessions::PostgresSessionsRepository;
pub use users::PostgresUsersRepository;

/// Statistics about the connection pool
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub size: u32,
    pub idle: u32,
    pub max_size: u32,
    pub min_idle: u32,
}

#[derive(Clone)]
pub struct PostgresDatabase {
    pool: PgPool,
    max_connections: u32,
    min_connections: u32,
}

impl fmt::Debug for PostgresDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresDatabase")
            .field("pool_size", &self.pool.size())
            .field("idle_connections", &self.pool.num_idle())
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .finish()
    }
}

fn env_u32(name: &str) -> Option<u32> {
    std::env::var(name).ok().and_then(|s| s.parse::<u32>().ok())
}

impl PostgresDatabase {
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let max_connections = env_u32("DB_MAX_CONNECTIONS").unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get() as u32)
                .unwrap_or(4)
                .max(4)
        });
        let min_connections = env_u32("DB_MIN_CONNECTIONS")
            .unwrap_or(2)
            .min(max_connections);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .max_lifetime(Duration::from_secs(1800))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(connection_string)
            .await
            .map_err(|e| {
                CoreError::Database(format!("Database connection failed: {e}"))
            })?;

        info!(
            max_connections,
            min_connections, "database pool initialized"
        );

        Ok(Self::from_pool(pool, max_connections, min_connections))
    }

    pub fn from_pool(pool: PgPool, max_connections: u32, min_connections: u32) -> Self {
        Self {
            pool,
            max_connections,
            min_connections,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        crate::MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::Database(format!("Migration failed: {e}")))?;
        info!("database migrations applied");
        Ok(())
    }

    /// Get connection pool statistics for monitoring
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            size: self.pool.size(),
            idle: self.pool.num_idle() as u32,
            max_size: self.max_connections,
            min_idle: self.min_connections,
        }
    }

    pub fn users_repository(&self) -> PostgresUsersRepository {
        PostgresUsersRepository::new(self.pool.clone())
    }

    pub fn sessions_repository(&self) -> PostgresSessionsRepository {
        PostgresSessionsRepository::new(self.pool.clone())
    }

    pub fn sellers_repository(&self) -> PostgresSellersRepository {
        PostgresSellersRepository::new(self.pool.clone())
    }

    pub fn catalog_repository(&self) -> PostgresCatalogRepository {
        PostgresCatalogRepository::new(self.pool.clone())
    }

    pub fn search_history_repository(&self) -> PostgresSearchHistoryRepository {
        PostgresSearchHistoryRepository::new(self.pool.clone())
    }

    pub fn orders_repository(&self) -> PostgresOrdersRepository {
        PostgresOrdersRepository::new(self.pool.clone())
    }

    pub fn payouts_repository(&self) -> PostgresPayoutsRepository {
        PostgresPayoutsRepository::new(self.pool.clone())
    }

    pub fn comments_repository(&self) -> PostgresCommentsRepository {
        PostgresCommentsRepository::new(self.pool.clone())
    }

    pub fn reviews_repository(&self) -> PostgresReviewsRepository {
        PostgresReviewsRepository::new(self.pool.clone())
    }

    pub fn reports_repository(&self) -> PostgresReportsRepository {
        PostgresReportsRepository::new(self.pool.clone())
    }
}
