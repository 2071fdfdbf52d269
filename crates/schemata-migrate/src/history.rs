//! Migration bookkeeping.
//!
//! Executed migrations are recorded in the [`HISTORY_TABLE`] table as
//! `{name, executed_at, running_time}`. The comparator never reports this
//! table, and the introspector leaves it out.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::sqlite::SqlitePool;

pub use schemata_core::HISTORY_TABLE;

use crate::error::Result;

/// SQL creating the bookkeeping table (SQLite).
pub const CREATE_HISTORY_TABLE_SQL: &str = r"
CREATE TABLE IF NOT EXISTS schemata_migrations (
    name TEXT PRIMARY KEY NOT NULL,
    executed_at TEXT NOT NULL DEFAULT (datetime('now')),
    running_time INTEGER NOT NULL
)
";

/// One executed migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedMigration {
    /// Migration name.
    pub name: String,
    /// When it ran.
    pub executed_at: DateTime<Utc>,
    /// How long it ran, in milliseconds.
    pub running_time: i64,
}

/// Reads and writes the bookkeeping table.
pub struct MigrationHistory {
    pool: SqlitePool,
}

impl MigrationHistory {
    /// Creates a history manager over a pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the bookkeeping table if missing.
    ///
    /// # Errors
    ///
    /// Returns the database error.
    pub async fn ensure_table(&self) -> Result<()> {
        sqlx::query(CREATE_HISTORY_TABLE_SQL)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Records an executed migration.
    ///
    /// # Errors
    ///
    /// Returns the database error, including a duplicate name.
    pub async fn record(&self, name: &str, running_time: i64) -> Result<()> {
        sqlx::query("INSERT INTO schemata_migrations (name, running_time) VALUES (?, ?)")
            .bind(name)
            .bind(running_time)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Removes a migration from the history after it was rolled back.
    ///
    /// Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Returns the database error.
    pub async fn forget(&self, name: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM schemata_migrations WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns whether a migration has been executed.
    ///
    /// # Errors
    ///
    /// Returns the database error.
    pub async fn is_executed(&self, name: &str) -> Result<bool> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM schemata_migrations WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    /// Lists executed migrations, oldest first.
    ///
    /// # Errors
    ///
    /// Returns the database error.
    pub async fn executed(&self) -> Result<Vec<ExecutedMigration>> {
        let rows: Vec<(String, String, i64)> = sqlx::query_as(
            "SELECT name, executed_at, running_time FROM schemata_migrations \
             ORDER BY executed_at, name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, executed_at, running_time)| ExecutedMigration {
                name,
                executed_at: parse_timestamp(&executed_at),
                running_time,
            })
            .collect())
    }
}

// SQLite's datetime('now') has no offset; anything unparsable sorts first.
fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc()))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
