//! # Database Module
//!
//! The Dialect Driver: a single dependency-injected handle to the database
//! that hides dialect variance (SQLite, PostgreSQL, MySQL) from every other
//! component. Built on `sqlx::Any`, which lets one connection pool type serve
//! all three backends through a single query path.
//!
//! Dialect detection follows the order documented in the spec: URL scheme,
//! then DSN keyword sniffing, then file suffix. A connection string that
//! matches none of these fails fast with [`Error::Configuration`].

use std::time::{Duration, Instant};

use sqlx::any::{AnyArguments, AnyPoolOptions};
use sqlx::{AnyPool, Arguments, Row};

use crate::errors::{classify_database_error, Error};

/// The SQL dialect of the underlying database, detected once at connect time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dialect {
    Sqlite,
    Postgres,
    MySql,
}

impl Dialect {
    /// Detects a dialect from a connection string.
    ///
    /// Order: URL scheme (`sqlite://`, `postgres://`/`postgresql://`, `mysql://`)
    /// → DSN keyword sniffing (`host=`/`sslmode=` ⇒ postgres; `@tcp(`/`charset=` ⇒
    /// mysql) → file suffix (`.db`, `.sqlite`, `.sqlite3` ⇒ sqlite).
    pub fn detect(conn_str: &str) -> Result<Self, Error> {
        if let Some((scheme, _)) = conn_str.split_once("://") {
            match scheme {
                "sqlite" => return Ok(Dialect::Sqlite),
                "postgres" | "postgresql" => return Ok(Dialect::Postgres),
                "mysql" => return Ok(Dialect::MySql),
                _ => {}
            }
        }

        let lower = conn_str.to_lowercase();
        if lower.contains("host=") || lower.contains("sslmode=") {
            return Ok(Dialect::Postgres);
        }
        if lower.contains("@tcp(") || lower.contains("charset=") {
            return Ok(Dialect::MySql);
        }
        if lower.ends_with(".db") || lower.ends_with(".sqlite") || lower.ends_with(".sqlite3") {
            return Ok(Dialect::Sqlite);
        }

        Err(Error::Configuration(format!(
            "could not determine SQL dialect from connection string '{conn_str}'"
        )))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Sqlite => "sqlite",
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
        }
    }

    /// Opening quote character for identifiers (closing is symmetric, except
    /// for MySQL's backtick which is its own closing character too).
    pub fn quote_identifier(&self, ident: &str) -> String {
        match self {
            Dialect::Postgres => format!("\"{ident}\""),
            Dialect::MySql => format!("`{ident}`"),
            Dialect::Sqlite => ident.to_string(),
        }
    }
}

/// Builder for configuring connection-pool options before connecting.
pub struct DatabaseBuilder {
    options: AnyPoolOptions,
    slow_query_threshold: Duration,
}

impl DatabaseBuilder {
    pub fn max_connections(mut self, max: u32) -> Self {
        self.options = self.options.max_connections(max);
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.options = self.options.min_connections(min);
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.acquire_timeout(timeout);
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.idle_timeout(Some(timeout));
        self
    }

    pub fn slow_query_threshold(mut self, threshold: Duration) -> Self {
        self.slow_query_threshold = threshold;
        self
    }

    pub async fn connect(self, url: &str) -> Result<Database, Error> {
        sqlx::any::install_default_drivers();
        let dialect = Dialect::detect(url)?;
        let pool = self.options.connect(url).await.map_err(|e| classify_database_error(e, dialect))?;
        Ok(Database { pool, dialect, slow_query_threshold: self.slow_query_threshold })
    }
}

/// The Dialect Driver itself: the single handle every other component uses
/// to reach the database. Cheaply `Clone`-able; the underlying `AnyPool` is
/// reference-counted and thread-safe.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: AnyPool,
    dialect: Dialect,
    slow_query_threshold: Duration,
}

impl Database {
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder { options: AnyPoolOptions::new(), slow_query_threshold: Duration::from_millis(250) }
    }

    pub async fn connect(url: &str) -> Result<Self, Error> {
        Self::builder().max_connections(10).connect(url).await
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Verifies the pool can reach the database.
    pub async fn ping(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await.map_err(|e| classify_database_error(e, self.dialect))?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Executes a statement that returns no rows, logging a warning if it
    /// exceeds the configured slow-query threshold.
    pub async fn exec(&self, sql: &str, args: AnyArguments<'_>) -> Result<u64, Error> {
        let start = Instant::now();
        let result = sqlx::query_with(sql, args).execute(&self.pool).await;
        self.log_if_slow(sql, start.elapsed());
        result.map(|r| r.rows_affected()).map_err(|e| classify_database_error(e, self.dialect))
    }

    /// Executes a query and returns every matching row.
    pub async fn query(&self, sql: &str, args: AnyArguments<'_>) -> Result<Vec<sqlx::any::AnyRow>, Error> {
        let start = Instant::now();
        let result = sqlx::query_with(sql, args).fetch_all(&self.pool).await;
        self.log_if_slow(sql, start.elapsed());
        result.map_err(|e| classify_database_error(e, self.dialect))
    }

    /// Executes a query and returns the first row, if any.
    pub async fn query_row(&self, sql: &str, args: AnyArguments<'_>) -> Result<Option<sqlx::any::AnyRow>, Error> {
        let start = Instant::now();
        let result = sqlx::query_with(sql, args).fetch_optional(&self.pool).await;
        self.log_if_slow(sql, start.elapsed());
        result.map_err(|e| classify_database_error(e, self.dialect))
    }

    /// Starts a new transaction. Every consistency-affecting operation
    /// (collection create/alter/drop, bootstrap, key rotation) must run
    /// inside one of these.
    pub async fn begin(&self) -> Result<crate::transaction::Transaction<'_>, Error> {
        let tx = self.pool.begin().await.map_err(|e| classify_database_error(e, self.dialect))?;
        Ok(crate::transaction::Transaction::new(tx, self.dialect))
    }

    fn log_if_slow(&self, sql: &str, elapsed: Duration) {
        if elapsed >= self.slow_query_threshold {
            log::warn!("slow query ({}ms): {}", elapsed.as_millis(), sql);
        }
    }

    /// Enumerates the non-system tables physically present in the current
    /// schema, per dialect. Used by the consistency reconciler.
    pub async fn list_physical_tables(&self) -> Result<Vec<String>, Error> {
        let sql = match self.dialect {
            Dialect::Sqlite => "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            Dialect::Postgres => "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public'",
            Dialect::MySql => "SELECT table_name FROM information_schema.tables WHERE table_schema = DATABASE()",
        };
        let rows = self.query(sql, AnyArguments::default()).await?;
        Ok(rows.iter().filter_map(|r| r.try_get::<String, _>(0).ok()).collect())
    }

    /// Enumerates the column names physically present on `table`, per dialect.
    pub async fn list_physical_columns(&self, table: &str) -> Result<Vec<String>, Error> {
        match self.dialect {
            Dialect::Sqlite => {
                let sql = format!("PRAGMA table_info({table})");
                let rows = self.query(&sql, AnyArguments::default()).await?;
                Ok(rows.iter().filter_map(|r| r.try_get::<String, _>("name").ok()).collect())
            }
            Dialect::Postgres => {
                let sql = "SELECT column_name FROM information_schema.columns WHERE table_name = $1";
                let mut args = AnyArguments::default();
                let _ = args.add(table.to_string());
                let rows = self.query(sql, args).await?;
                Ok(rows.iter().filter_map(|r| r.try_get::<String, _>(0).ok()).collect())
            }
            Dialect::MySql => {
                let sql = "SELECT column_name FROM information_schema.columns WHERE table_name = ?";
                let mut args = AnyArguments::default();
                let _ = args.add(table.to_string());
                let rows = self.query(sql, args).await?;
                Ok(rows.iter().filter_map(|r| r.try_get::<String, _>(0).ok()).collect())
            }
        }
    }
}

