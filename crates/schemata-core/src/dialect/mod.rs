//! Dialect-specific migration SQL generation.
//!
//! [`MigrationDialect`] carries the shared algorithm as default methods and
//! leaves the primitives (quoting, identity syntax, drop syntax, ALTER
//! support) to each dialect.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::result::{ColumnCompareResult, CompareOperation, TableCompareResult};
use crate::schema::{ColumnDefinition, ForeignKeyDefinition, IndexDefinition};
use crate::types::{DialectKind, TypeMapper};

/// Generates forward and rollback SQL for one dialect.
pub trait MigrationDialect: Send + Sync {
    /// Returns the dialect kind.
    fn kind(&self) -> DialectKind;

    /// Returns the type mapper used for column types and defaults.
    fn type_mapper(&self) -> &TypeMapper;

    /// Returns the dialect name.
    fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Quotes an identifier.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Returns whether columns, indexes and foreign keys can be altered in
    /// place.
    fn supports_alter_table(&self) -> bool {
        true
    }

    /// Returns whether the primary key is declared on its column rather
    /// than as a table constraint.
    fn inlines_primary_key(&self, _result: &TableCompareResult) -> bool {
        false
    }

    /// Returns the clause making the database generate the column's value.
    fn generated_value_clause(
        &self,
        table: &str,
        column: &ColumnDefinition,
        sole_primary_key: bool,
    ) -> Option<String>;

    /// Statements that must run before a column is created.
    fn before_create(&self, _table: &str, _columns: &[&ColumnDefinition]) -> Vec<String> {
        Vec::new()
    }

    /// Statements that must run after a column is dropped.
    fn after_drop(&self, _table: &str, _columns: &[&ColumnDefinition]) -> Vec<String> {
        Vec::new()
    }

    /// Clause dropping a foreign key, relative to `ALTER TABLE <table>`.
    fn drop_foreign_key_clause(&self, foreign_key: &ForeignKeyDefinition) -> String;

    /// Statement dropping an index.
    fn drop_index_statement(&self, table: &str, index: &IndexDefinition) -> String;

    /// Clauses turning the existing column into the declared one, relative
    /// to `ALTER TABLE <table>`.
    fn modify_column_clauses(&self, table: &str, change: &ColumnCompareResult) -> Vec<String>;

    /// Returns the physical type of a column.
    fn column_type(&self, column: &ColumnDefinition) -> String {
        self.type_mapper().column_type(column)
    }

    /// Renders a column definition.
    fn column_definition(
        &self,
        table: &str,
        column: &ColumnDefinition,
        sole_primary_key: bool,
    ) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_identifier(&column.name),
            self.column_type(column)
        );
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(clause) = self.generated_value_clause(table, column, sole_primary_key) {
            sql.push(' ');
            sql.push_str(&clause);
        } else if let Some(default) = self.type_mapper().stored_default(column) {
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql());
        }
        sql
    }

    /// Renders a foreign key constraint.
    fn foreign_key_constraint(&self, foreign_key: &ForeignKeyDefinition) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.quote_identifier(&foreign_key.name),
            self.quote_identifier(&foreign_key.column),
            self.quote_identifier(&foreign_key.referenced_table),
            self.quote_identifier(&foreign_key.referenced_column)
        )
    }

    /// Renders a `CREATE INDEX` statement.
    fn create_index_statement(&self, table: &str, index: &IndexDefinition) -> String {
        format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.quote_identifier(&index.name),
            self.quote_identifier(table),
            self.quote_list(&index.columns)
        )
    }

    /// Quotes and joins a column list.
    fn quote_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|column| self.quote_identifier(column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Renders a `CREATE TABLE` with its indexes.
    ///
    /// # Errors
    ///
    /// Fails when the result carries no column.
    fn create_table(&self, result: &TableCompareResult) -> Result<Vec<String>, GenerationError> {
        let columns: Vec<&ColumnDefinition> = result
            .columns
            .iter()
            .filter_map(|change| change.declared.as_ref())
            .collect();
        if columns.is_empty() {
            return Err(GenerationError::EmptyTable {
                dialect: self.name(),
                table: result.name.clone(),
            });
        }

        let mut statements = self.before_create(&result.name, &columns);
        let mut lines: Vec<String> = columns
            .iter()
            .map(|column| {
                self.column_definition(&result.name, column, is_sole_primary_key(result, column))
            })
            .collect();
        if !result.primary_columns.is_empty() && !self.inlines_primary_key(result) {
            lines.push(format!(
                "PRIMARY KEY ({})",
                self.quote_list(&result.primary_columns)
            ));
        }
        lines.extend(
            result
                .foreign_keys
                .iter()
                .filter_map(|change| change.declared.as_ref())
                .map(|foreign_key| self.foreign_key_constraint(foreign_key)),
        );

        statements.push(format!(
            "CREATE TABLE {} (\n  {}\n)",
            self.quote_identifier(&result.name),
            lines.join(",\n  ")
        ));
        statements.extend(
            result
                .indexes
                .iter()
                .filter_map(|change| change.declared.as_ref())
                .map(|index| self.create_index_statement(&result.name, index)),
        );
        Ok(statements)
    }

    /// Renders a `DROP TABLE`.
    fn drop_table(&self, result: &TableCompareResult) -> Vec<String> {
        let columns: Vec<&ColumnDefinition> = result
            .columns
            .iter()
            .filter_map(|change| change.existing.as_ref())
            .collect();
        let mut statements = vec![format!("DROP TABLE {}", self.quote_identifier(&result.name))];
        statements.extend(self.after_drop(&result.name, &columns));
        statements
    }

    /// Renders the ordered `ALTER TABLE` statements of an update: foreign
    /// keys are dropped first and added last.
    ///
    /// # Errors
    ///
    /// Fails when the dialect cannot alter tables in place.
    fn alter_table(&self, result: &TableCompareResult) -> Result<Vec<String>, GenerationError> {
        if !self.supports_alter_table() {
            let operation = describe_changes(result);
            warn!(table = %result.name, dialect = self.name(), %operation, "Cannot alter table in place");
            return Err(GenerationError::AlterTableUnsupported {
                dialect: self.name(),
                table: result.name.clone(),
                operation,
            });
        }

        let alter = |clause: String| {
            format!("ALTER TABLE {} {clause}", self.quote_identifier(&result.name))
        };
        let mut statements = Vec::new();

        for change in &result.foreign_keys {
            if change.operation != CompareOperation::Create {
                if let Some(existing) = &change.existing {
                    statements.push(alter(self.drop_foreign_key_clause(existing)));
                }
            }
        }
        for change in &result.indexes {
            if change.operation == CompareOperation::Delete {
                if let Some(existing) = &change.existing {
                    statements.push(self.drop_index_statement(&result.name, existing));
                }
            }
        }

        let dropped: Vec<&ColumnDefinition> = columns_with(result, CompareOperation::Delete)
            .filter_map(|change| change.existing.as_ref())
            .collect();
        let added: Vec<&ColumnDefinition> = columns_with(result, CompareOperation::Create)
            .filter_map(|change| change.declared.as_ref())
            .collect();

        for column in &dropped {
            statements.push(alter(format!(
                "DROP COLUMN {}",
                self.quote_identifier(&column.name)
            )));
        }
        statements.extend(self.after_drop(&result.name, &dropped));
        statements.extend(self.before_create(&result.name, &added));
        for column in &added {
            statements.push(alter(format!(
                "ADD COLUMN {}",
                self.column_definition(&result.name, column, is_sole_primary_key(result, column))
            )));
        }
        for change in columns_with(result, CompareOperation::Update) {
            statements.extend(
                self.modify_column_clauses(&result.name, change)
                    .into_iter()
                    .map(alter),
            );
        }

        for change in &result.indexes {
            if change.operation == CompareOperation::Create {
                if let Some(declared) = &change.declared {
                    statements.push(self.create_index_statement(&result.name, declared));
                }
            }
        }
        for change in &result.foreign_keys {
            if change.operation != CompareOperation::Delete {
                if let Some(declared) = &change.declared {
                    statements.push(alter(format!(
                        "ADD {}",
                        self.foreign_key_constraint(declared)
                    )));
                }
            }
        }
        Ok(statements)
    }

    /// Renders the forward statements of a result.
    ///
    /// # Errors
    ///
    /// Fails when the dialect cannot express the change.
    fn forward(&self, result: &TableCompareResult) -> Result<Vec<String>, GenerationError> {
        match result.operation {
            CompareOperation::Create => self.create_table(result),
            CompareOperation::Delete => Ok(self.drop_table(result)),
            CompareOperation::Update => self.alter_table(result),
        }
    }

    /// Renders the statements undoing a result.
    ///
    /// An orphaned table drop carries no definition to restore, so its
    /// rollback is a comment.
    ///
    /// # Errors
    ///
    /// Fails when the dialect cannot express the inverse change.
    fn rollback(&self, result: &TableCompareResult) -> Result<Vec<String>, GenerationError> {
        if result.operation == CompareOperation::Delete && !result.is_recoverable() {
            return Ok(vec![format!(
                "-- Table '{}' was dropped without a recorded definition; restore it manually",
                result.name
            )]);
        }
        self.forward(&result.reversed())
    }

    /// Renders both directions of a result.
    ///
    /// # Errors
    ///
    /// Fails when either direction cannot be expressed.
    fn generate(&self, result: &TableCompareResult) -> Result<MigrationSql, GenerationError> {
        let sql = MigrationSql {
            table: result.name.clone(),
            operation: result.operation,
            up: self.forward(result)?,
            down: self.rollback(result)?,
        };
        debug!(
            table = %sql.table,
            up = sql.up.len(),
            down = sql.down.len(),
            "Generated migration SQL"
        );
        Ok(sql)
    }
}

/// Forward and rollback statements of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationSql {
    /// Table name.
    pub table: String,
    /// Operation of the forward direction.
    pub operation: CompareOperation,
    /// Forward statements.
    pub up: Vec<String>,
    /// Rollback statements.
    pub down: Vec<String>,
}

impl MigrationSql {
    /// Returns the forward statements as one script.
    #[must_use]
    pub fn up_script(&self) -> String {
        render_script(&self.up)
    }

    /// Returns the rollback statements as one script.
    #[must_use]
    pub fn down_script(&self) -> String {
        render_script(&self.down)
    }
}

/// The generated SQL of a whole comparison run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationPlan {
    /// Target dialect.
    pub dialect: DialectKind,
    /// One entry per compare result, in yield order.
    pub entries: Vec<MigrationSql>,
}

impl MigrationPlan {
    /// Generates SQL for every result.
    ///
    /// # Errors
    ///
    /// Stops at the first result the dialect cannot express.
    pub fn build(
        dialect: &dyn MigrationDialect,
        results: &[TableCompareResult],
    ) -> Result<Self, GenerationError> {
        let entries = results
            .iter()
            .map(|result| dialect.generate(result))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            dialect: dialect.kind(),
            entries,
        })
    }

    /// Returns whether nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forward script, in yield order.
    #[must_use]
    pub fn up_sql(&self) -> String {
        self.entries
            .iter()
            .map(MigrationSql::up_script)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Rollback script; tables are undone in reverse yield order.
    #[must_use]
    pub fn down_sql(&self) -> String {
        self.entries
            .iter()
            .rev()
            .map(MigrationSql::down_script)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Returns the generator for a dialect with its built-in type mapper.
#[must_use]
pub fn dialect_for(kind: DialectKind) -> Box<dyn MigrationDialect> {
    match kind {
        DialectKind::MySql => Box::new(MySqlDialect::new()),
        DialectKind::Postgres => Box::new(PostgresDialect::new()),
        DialectKind::Sqlite => Box::new(SqliteDialect::new()),
    }
}

fn render_script(statements: &[String]) -> String {
    statements
        .iter()
        .map(|statement| {
            if statement.starts_with("--") {
                statement.clone()
            } else {
                format!("{statement};")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_sole_primary_key(result: &TableCompareResult, column: &ColumnDefinition) -> bool {
    matches!(result.primary_columns.as_slice(), [only] if *only == column.name)
}

fn columns_with(
    result: &TableCompareResult,
    operation: CompareOperation,
) -> impl Iterator<Item = &ColumnCompareResult> {
    result
        .columns
        .iter()
        .filter(move |change| change.operation == operation)
}

fn describe_changes(result: &TableCompareResult) -> String {
    let mut parts = Vec::new();
    for change in &result.columns {
        let verb = match change.operation {
            CompareOperation::Create => "add",
            CompareOperation::Update => "modify",
            CompareOperation::Delete => "drop",
        };
        parts.push(format!("{verb} column '{}'", change.name));
    }
    for change in &result.indexes {
        let verb = match change.operation {
            CompareOperation::Delete => "drop",
            _ => "create",
        };
        parts.push(format!("{verb} index '{}'", change.name));
    }
    for change in &result.foreign_keys {
        let verb = match change.operation {
            CompareOperation::Create => "add",
            CompareOperation::Update => "replace",
            CompareOperation::Delete => "drop",
        };
        parts.push(format!("{verb} foreign key '{}'", change.name));
    }
    parts.join(", ")
}
