//! SQLite schema introspection.
//!
//! The comparator reads through the synchronous [`SchemaReader`] trait, so
//! the introspector captures a [`LiveSchema`] snapshot up front and the
//! comparison runs against that.
//!
//! [`SchemaReader`]: schemata_core::SchemaReader

use indexmap::IndexMap;
use schemata_core::reader::{ColumnFact, ForeignKeyFact, IndexFact, LiveTable};
use schemata_core::schema::foreign_key_name;
use schemata_core::{LiveSchema, SchemaReadError, HISTORY_TABLE};
use sqlx::sqlite::SqlitePool;
use tracing::debug;

/// Reads table structure from a SQLite database.
pub struct SqliteIntrospector {
    pool: SqlitePool,
}

impl SqliteIntrospector {
    /// Creates an introspector over a pool.
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Lists user tables, leaving out SQLite internals and the bookkeeping
    /// table.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaReadError`] wrapping the database failure.
    pub async fn list_tables(&self) -> Result<Vec<String>, SchemaReadError> {
        let names: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != ? \
             ORDER BY name",
        )
        .bind(HISTORY_TABLE)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SchemaReadError::new("list tables", e))?;

        Ok(names.into_iter().map(|(name,)| name).collect())
    }

    /// Lists the columns of a table, in table order.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaReadError`] wrapping the database failure.
    pub async fn columns(&self, table: &str) -> Result<Vec<ColumnFact>, SchemaReadError> {
        let read_error = |e: sqlx::Error| SchemaReadError::for_table("columns", table, e);

        let definition: Option<(Option<String>,)> =
            sqlx::query_as("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?")
                .bind(table)
                .fetch_optional(&self.pool)
                .await
                .map_err(read_error)?;
        let autoincrement = definition
            .and_then(|(sql,)| sql)
            .is_some_and(|sql| sql.to_ascii_uppercase().contains("AUTOINCREMENT"));

        let rows: Vec<(String, String, i64, Option<String>, i64)> = sqlx::query_as(
            r#"SELECT name, type, "notnull", dflt_value, pk FROM pragma_table_info(?) ORDER BY cid"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error)?;

        Ok(rows
            .into_iter()
            .map(|(name, physical_type, not_null, default, pk)| ColumnFact {
                name,
                physical_type,
                nullable: not_null == 0,
                default,
                primary_key: pk > 0,
                auto_increment: autoincrement && pk > 0,
            })
            .collect())
    }

    /// Lists the explicit indexes of a table.
    ///
    /// Indexes SQLite creates for the primary key are skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaReadError`] wrapping the database failure.
    pub async fn indexes(&self, table: &str) -> Result<IndexMap<String, IndexFact>, SchemaReadError> {
        let read_error = |e: sqlx::Error| SchemaReadError::for_table("indexes", table, e);

        let listed: Vec<(String, i64, String)> = sqlx::query_as(
            r#"SELECT name, "unique", origin FROM pragma_index_list(?) ORDER BY name"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error)?;

        let mut indexes = IndexMap::new();
        for (name, unique, origin) in listed {
            if origin == "pk" {
                continue;
            }
            let columns: Vec<(String,)> =
                sqlx::query_as("SELECT name FROM pragma_index_info(?) ORDER BY seqno")
                    .bind(&name)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(read_error)?;
            indexes.insert(
                name.clone(),
                IndexFact {
                    name,
                    columns: columns.into_iter().map(|(column,)| column).collect(),
                    unique: unique != 0,
                    primary: false,
                },
            );
        }
        Ok(indexes)
    }

    /// Lists the foreign keys of a table.
    ///
    /// SQLite does not keep constraint names, so keys are named by the
    /// `fk_<table>_<referenced table>_<column>` convention. A key declared
    /// without a target column references the target's primary key.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaReadError`] wrapping the database failure.
    pub async fn foreign_keys(
        &self,
        table: &str,
    ) -> Result<IndexMap<String, ForeignKeyFact>, SchemaReadError> {
        let read_error = |e: sqlx::Error| SchemaReadError::for_table("foreign keys", table, e);

        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            r#"SELECT "table", "from", "to" FROM pragma_foreign_key_list(?) ORDER BY id, seq"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await
        .map_err(read_error)?;

        let mut foreign_keys = IndexMap::new();
        for (referenced_table, column, to) in rows {
            let referenced_column = match to {
                Some(to) => to,
                None => self
                    .primary_key_of(&referenced_table)
                    .await
                    .map_err(read_error)?
                    .unwrap_or_else(|| "rowid".to_string()),
            };
            let name = foreign_key_name(table, &referenced_table, &column);
            foreign_keys.insert(
                name.clone(),
                ForeignKeyFact {
                    name,
                    column,
                    referenced_table,
                    referenced_column,
                },
            );
        }
        Ok(foreign_keys)
    }

    /// Captures every table into a snapshot the comparator can read.
    ///
    /// # Errors
    ///
    /// Propagates the first read failure.
    pub async fn snapshot(&self) -> Result<LiveSchema, SchemaReadError> {
        let mut snapshot = LiveSchema::new();
        for name in self.list_tables().await? {
            let table = LiveTable {
                columns: self.columns(&name).await?,
                indexes: self.indexes(&name).await?,
                foreign_keys: self.foreign_keys(&name).await?,
            };
            debug!(
                table = %name,
                columns = table.columns.len(),
                indexes = table.indexes.len(),
                foreign_keys = table.foreign_keys.len(),
                "Introspected table"
            );
            snapshot.tables.insert(name, table);
        }
        Ok(snapshot)
    }

    async fn primary_key_of(&self, table: &str) -> Result<Option<String>, sqlx::Error> {
        let column: Option<(String,)> =
            sqlx::query_as("SELECT name FROM pragma_table_info(?) WHERE pk = 1")
                .bind(table)
                .fetch_optional(&self.pool)
                .await?;
        Ok(column.map(|(name,)| name))
    }
}
