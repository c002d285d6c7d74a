//! Database module for fileshelf.
//!
//! This module provides database connectivity and migration management.
//! The backend is chosen at compile time: SQLite by default, PostgreSQL
//! with the `postgres` feature, MySQL with the `mysql` feature.

mod schema;

pub use schema::MIGRATIONS;

use std::borrow::Cow;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{DatabaseConfig, DatabaseDialect};
use crate::{Result, ShelfError};

#[cfg(all(feature = "postgres", feature = "mysql"))]
compile_error!("features `postgres` and `mysql` are mutually exclusive");

/// Connection pool type for the compiled backend.
#[cfg(not(any(feature = "postgres", feature = "mysql")))]
pub type DbPool = sqlx::SqlitePool;

/// Connection pool type for the compiled backend.
#[cfg(feature = "postgres")]
pub type DbPool = sqlx::PgPool;

/// Connection pool type for the compiled backend.
#[cfg(feature = "mysql")]
pub type DbPool = sqlx::MySqlPool;

/// Adapt a query written with `$n` placeholders to the compiled backend.
///
/// Placeholders must appear in ascending order.
pub(crate) fn sql(query: &str) -> Cow<'_, str> {
    #[cfg(feature = "mysql")]
    {
        Cow::Owned(positional_placeholders(query))
    }
    #[cfg(not(feature = "mysql"))]
    {
        Cow::Borrowed(query)
    }
}

/// Rewrite `$1`, `$2`, ... as `?`.
#[cfg_attr(not(feature = "mysql"), allow(dead_code))]
fn positional_placeholders(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    let mut chars = query.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek().is_some_and(char::is_ascii_digit) {
            while chars.peek().is_some_and(char::is_ascii_digit) {
                chars.next();
            }
            out.push('?');
        } else {
            out.push(c);
        }
    }

    out
}

/// Database wrapper owning the connection pool.
///
/// Cloning is cheap; clones share the same pool.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Connect to the configured database and apply pending migrations.
    #[cfg(not(any(feature = "postgres", feature = "mysql")))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        use std::str::FromStr;

        use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

        let path = std::path::Path::new(&config.path);
        info!("Opening database at {:?}", path);

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(&config.url())
            .map_err(|e| ShelfError::DatabaseConnection(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(|e| ShelfError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Connect to the configured database and apply pending migrations.
    #[cfg(feature = "postgres")]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        use sqlx::postgres::PgPoolOptions;

        info!(
            "Connecting to postgres at {}:{}/{}",
            config.host,
            config.port(),
            config.name
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.url())
            .await
            .map_err(|e| ShelfError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Connect to the configured database and apply pending migrations.
    #[cfg(feature = "mysql")]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        use sqlx::mysql::MySqlPoolOptions;

        info!(
            "Connecting to mysql at {}:{}/{}",
            config.host,
            config.port(),
            config.name
        );

        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(&config.url())
            .await
            .map_err(|e| ShelfError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Open an in-memory database for testing.
    ///
    /// The pool is limited to a single connection so every query sees the
    /// same in-memory database.
    #[cfg(not(any(feature = "postgres", feature = "mysql")))]
    pub async fn open_in_memory() -> Result<Self> {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

        debug!("Opening in-memory database");
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| ShelfError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Get a reference to the underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Name of the compiled backend.
    pub fn backend_name(&self) -> &'static str {
        DatabaseDialect::compiled().as_str()
    }

    /// Get the current schema version.
    pub async fn schema_version(&self) -> Result<i64> {
        if !self.table_exists("schema_version").await? {
            return Ok(0);
        }

        let version: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(&self.pool)
            .await?;

        Ok(version.unwrap_or(0))
    }

    /// Apply pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        let current_version = self.schema_version().await?;
        let migrations = MIGRATIONS;

        if current_version as usize >= migrations.len() {
            debug!("Database is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating database from version {} to {}",
            current_version,
            migrations.len()
        );

        sqlx::query(schema::SCHEMA_VERSION_TABLE)
            .execute(&self.pool)
            .await?;

        // Apply each pending migration in a transaction
        for (i, migration) in migrations.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            info!("Applying migration v{}", version);

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration).execute(&mut *tx).await?;
            sqlx::query(&sql("INSERT INTO schema_version (version) VALUES ($1)"))
                .bind(version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            debug!("Migration v{} applied successfully", version);
        }

        info!(
            "Database migration complete (now at version {})",
            migrations.len()
        );
        Ok(())
    }

    /// Check if a table exists.
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        #[cfg(not(any(feature = "postgres", feature = "mysql")))]
        let query = "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1";
        #[cfg(feature = "postgres")]
        let query = "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = $1";
        #[cfg(feature = "mysql")]
        let query = "SELECT COUNT(*) FROM information_schema.tables \
                     WHERE table_schema = DATABASE() AND table_name = $1";

        let count: i64 = sqlx::query_scalar(&sql(query))
            .bind(table_name)
            .fetch_one(&self.pool)
            .await?;
        let exists = count > 0;
        Ok(exists)
    }

    /// Close the pool, waiting for connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.backend_name())
            .finish()
    }
}
