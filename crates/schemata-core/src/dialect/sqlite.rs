//! SQLite dialect.
//!
//! SQLite cannot alter columns, indexes or foreign keys of an existing
//! table in any useful way: the table has to be recreated, copied and
//! renamed. That strategy is out of reach here, so every update is
//! reported as a [`GenerationError`](crate::error::GenerationError).

use super::MigrationDialect;
use crate::result::{ColumnCompareResult, TableCompareResult};
use crate::schema::{ColumnDefinition, ForeignKeyDefinition, GeneratorStrategy, IndexDefinition};
use crate::types::{DialectKind, TypeMapper};

/// SQLite migration dialect.
#[derive(Debug, Clone)]
pub struct SqliteDialect {
    mapper: TypeMapper,
}

impl SqliteDialect {
    /// Creates the dialect with the built-in SQLite affinities.
    #[must_use]
    pub fn new() -> Self {
        Self::with_type_mapper(TypeMapper::for_dialect(DialectKind::Sqlite))
    }

    /// Creates the dialect with a customized mapper.
    #[must_use]
    pub const fn with_type_mapper(mapper: TypeMapper) -> Self {
        Self { mapper }
    }
}

impl Default for SqliteDialect {
    fn default() -> Self {
        Self::new()
    }
}

fn autoincrements(column: &ColumnDefinition) -> bool {
    column.primary_key
        && matches!(
            column.generator_strategy(),
            Some(GeneratorStrategy::AutoIncrement | GeneratorStrategy::Serial)
        )
}

impl MigrationDialect for SqliteDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Sqlite
    }

    fn type_mapper(&self) -> &TypeMapper {
        &self.mapper
    }

    fn supports_alter_table(&self) -> bool {
        false
    }

    // AUTOINCREMENT only exists on a single-column INTEGER PRIMARY KEY.
    fn inlines_primary_key(&self, result: &TableCompareResult) -> bool {
        let [only] = result.primary_columns.as_slice() else {
            return false;
        };
        result
            .columns
            .iter()
            .filter_map(|change| change.declared.as_ref())
            .any(|column| column.name == *only && autoincrements(column))
    }

    fn generated_value_clause(
        &self,
        _table: &str,
        column: &ColumnDefinition,
        sole_primary_key: bool,
    ) -> Option<String> {
        (sole_primary_key && autoincrements(column)).then(|| "PRIMARY KEY AUTOINCREMENT".to_string())
    }

    fn drop_foreign_key_clause(&self, foreign_key: &ForeignKeyDefinition) -> String {
        format!(
            "DROP CONSTRAINT {}",
            self.quote_identifier(&foreign_key.name)
        )
    }

    fn drop_index_statement(&self, _table: &str, index: &IndexDefinition) -> String {
        format!("DROP INDEX IF EXISTS {}", self.quote_identifier(&index.name))
    }

    fn modify_column_clauses(&self, _table: &str, _change: &ColumnCompareResult) -> Vec<String> {
        Vec::new()
    }
}
