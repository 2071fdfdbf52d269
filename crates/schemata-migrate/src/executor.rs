//! Plan executor.
//!
//! Runs a generated [`MigrationPlan`] against a SQLite database and keeps the
//! bookkeeping table in sync.

use std::time::Instant;

use schemata_core::types::DialectKind;
use schemata_core::MigrationPlan;
use sqlx::sqlite::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DriverError, Result};
use crate::history::MigrationHistory;

/// Executes migration plans against a SQLite database.
pub struct PlanExecutor {
    pool: SqlitePool,
    history: MigrationHistory,
}

impl PlanExecutor {
    /// Creates a new executor.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        let history = MigrationHistory::new(pool.clone());
        Self { pool, history }
    }

    /// Ensures the bookkeeping table exists.
    ///
    /// # Errors
    ///
    /// Returns the database error.
    pub async fn init(&self) -> Result<()> {
        self.history.ensure_table().await
    }

    /// Returns the migration history.
    #[must_use]
    pub const fn history(&self) -> &MigrationHistory {
        &self.history
    }

    /// Applies a plan's forward statements and records the run.
    ///
    /// Returns `false` when a run with this name was already executed.
    ///
    /// # Errors
    ///
    /// Fails when the plan targets another dialect or a statement fails. A
    /// failed run leaves the database and the history untouched.
    pub async fn apply(&self, name: &str, plan: &MigrationPlan) -> Result<bool> {
        ensure_sqlite(plan)?;
        if self.history.is_executed(name).await? {
            warn!(name = %name, "Migration already executed, skipping");
            return Ok(false);
        }

        info!(name = %name, tables = plan.entries.len(), "Applying migration");
        let started = Instant::now();
        let statements = plan.entries.iter().flat_map(|entry| entry.up.iter());
        self.execute(statements).await?;
        let running_time = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

        self.history.record(name, running_time).await?;
        info!(name = %name, running_time, "Migration applied");
        Ok(true)
    }

    /// Executes a plan's rollback statements and forgets the run.
    ///
    /// Returns `false` when no run with this name was executed.
    ///
    /// # Errors
    ///
    /// Fails when the plan targets another dialect or a statement fails.
    pub async fn rollback(&self, name: &str, plan: &MigrationPlan) -> Result<bool> {
        ensure_sqlite(plan)?;
        if !self.history.is_executed(name).await? {
            warn!(name = %name, "Migration not executed, skipping rollback");
            return Ok(false);
        }

        info!(name = %name, "Rolling back migration");
        let statements = plan.entries.iter().rev().flat_map(|entry| entry.down.iter());
        self.execute(statements).await?;
        self.history.forget(name).await?;
        info!(name = %name, "Migration rolled back");
        Ok(true)
    }

    async fn execute<'a>(&self, statements: impl Iterator<Item = &'a String>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for sql in statements {
            if sql.starts_with("--") {
                warn!(comment = %sql, "Skipping comment");
                continue;
            }
            debug!(sql = %sql, "Executing SQL");
            sqlx::query(sql).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn ensure_sqlite(plan: &MigrationPlan) -> Result<()> {
    if plan.dialect == DialectKind::Sqlite {
        Ok(())
    } else {
        Err(DriverError::DialectMismatch {
            expected: DialectKind::Sqlite,
            actual: plan.dialect,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemata_core::result::CompareOperation;
    use schemata_core::MigrationSql;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap()
    }

    fn create_post_plan() -> MigrationPlan {
        MigrationPlan {
            dialect: DialectKind::Sqlite,
            entries: vec![MigrationSql {
                table: "post".into(),
                operation: CompareOperation::Create,
                up: vec!["CREATE TABLE \"post\" (\n  \"id\" INTEGER NOT NULL\n)".into()],
                down: vec!["DROP TABLE \"post\"".into()],
            }],
        }
    }

    async fn table_count(pool: &SqlitePool) -> i64 {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'post'")
                .fetch_one(pool)
                .await
                .unwrap();
        count
    }

    #[tokio::test]
    async fn test_apply_then_rollback() {
        let pool = create_test_pool().await;
        let executor = PlanExecutor::new(pool.clone());
        executor.init().await.unwrap();
        let plan = create_post_plan();

        assert!(executor.apply("0001_post", &plan).await.unwrap());
        assert_eq!(table_count(&pool).await, 1);
        assert!(!executor.apply("0001_post", &plan).await.unwrap());
        assert_eq!(executor.history().executed().await.unwrap().len(), 1);

        assert!(executor.rollback("0001_post", &plan).await.unwrap());
        assert_eq!(table_count(&pool).await, 0);
        assert!(executor.history().executed().await.unwrap().is_empty());
        assert!(!executor.rollback("0001_post", &plan).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_statement_rolls_back_transaction() {
        let pool = create_test_pool().await;
        let executor = PlanExecutor::new(pool.clone());
        executor.init().await.unwrap();
        let mut plan = create_post_plan();
        plan.entries[0].up.push("CREATE TABLE \"post\" (\"id\" INTEGER)".into());

        assert!(executor.apply("0001_post", &plan).await.is_err());
        assert_eq!(table_count(&pool).await, 0);
        assert!(!executor.history().is_executed("0001_post").await.unwrap());
    }

    #[tokio::test]
    async fn test_comments_are_skipped() {
        let pool = create_test_pool().await;
        let executor = PlanExecutor::new(pool);
        executor.init().await.unwrap();
        let mut plan = create_post_plan();
        plan.entries[0].down =
            vec!["-- Table 'post' was dropped without a recorded definition; restore it manually".into()];

        executor.apply("0001_post", &plan).await.unwrap();
        assert!(executor.rollback("0001_post", &plan).await.unwrap());
    }

    #[tokio::test]
    async fn test_other_dialect_is_rejected() {
        let executor = PlanExecutor::new(create_test_pool().await);
        executor.init().await.unwrap();
        let plan = MigrationPlan {
            dialect: DialectKind::MySql,
            entries: Vec::new(),
        };

        let err = executor.apply("0001_post", &plan).await.unwrap_err();
        assert!(matches!(err, DriverError::DialectMismatch { .. }));
    }
}
