//! PostgreSQL storage for playoff brackets.
//!
//! [`Database`] owns the connection pool and applies the bundled migration,
//! which creates four tables:
//!
//! * `teams` - team ids and unique names
//! * `standings` - final rank of each team per season and division
//! * `matches` - fixtures with scores, status and forfeiting team
//! * `bracket_slots` - one row per bracket position, either seeded (two seed
//!   numbers) or fed by two earlier slots, never both
//!
//! Slots reference matches and each other without cascading deletes, so
//! removal order is owned by the engine. The engine itself only sees the
//! traits in [`repository`]; [`postgres`] implements them over this schema and
//! [`memory`] implements them in-process for tests and benchmarks.

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

pub mod config;
pub mod memory;
pub mod postgres;
pub mod repository;

pub use config::DatabaseConfig;
pub use memory::{InMemoryBracketStore, InMemoryMatchService, InMemoryStandings, InMemoryTeamDirectory};
pub use postgres::{PgBracketStore, PgMatchService, PgStandingsProvider, PgTeamDirectory};
pub use repository::{BracketStore, MatchService, StandingsProvider, TeamDirectory};

/// Tables created by the bundled migration, in dependency order
pub const BRACKET_TABLES: [&str; 4] = ["teams", "standings", "matches", "bracket_slots"];

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bracket_engine::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = DatabaseConfig::from_env()?;
    ///     let db = Database::new(&config).await?;
    ///     db.migrate().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect(&config.database_url)
            .await?;

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Bracket tables not present in the connected database.
    ///
    /// Empty once [`Database::migrate`] has run.
    pub async fn missing_tables(&self) -> Result<Vec<&'static str>, sqlx::Error> {
        let present: Vec<String> = sqlx::query_scalar(
            "SELECT table_name::TEXT FROM information_schema.tables WHERE table_schema = current_schema()",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(BRACKET_TABLES
            .into_iter()
            .filter(|table| !present.iter().any(|p| p == table))
            .collect())
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
