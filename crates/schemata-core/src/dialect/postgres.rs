//! PostgreSQL dialect.

use super::MigrationDialect;
use crate::result::ColumnCompareResult;
use crate::schema::{ColumnDefinition, ForeignKeyDefinition, GeneratorStrategy, IndexDefinition};
use crate::types::{DialectKind, TypeMapper};

/// PostgreSQL migration dialect.
///
/// Auto-increment keys become identity columns. The `serial` strategy keeps
/// an explicit sequence so its name stays under our control.
#[derive(Debug, Clone)]
pub struct PostgresDialect {
    mapper: TypeMapper,
}

impl PostgresDialect {
    /// Creates the dialect with the built-in PostgreSQL types.
    #[must_use]
    pub fn new() -> Self {
        Self::with_type_mapper(TypeMapper::for_dialect(DialectKind::Postgres))
    }

    /// Creates the dialect with a customized mapper.
    #[must_use]
    pub const fn with_type_mapper(mapper: TypeMapper) -> Self {
        Self { mapper }
    }

    fn sequences(&self, table: &str, columns: &[&ColumnDefinition]) -> Vec<String> {
        columns
            .iter()
            .filter_map(|column| column.sequence_for(table))
            .map(|sequence| self.quote_identifier(&sequence))
            .collect()
    }
}

impl Default for PostgresDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationDialect for PostgresDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Postgres
    }

    fn type_mapper(&self) -> &TypeMapper {
        &self.mapper
    }

    fn generated_value_clause(
        &self,
        table: &str,
        column: &ColumnDefinition,
        _sole_primary_key: bool,
    ) -> Option<String> {
        match column.generator_strategy()? {
            GeneratorStrategy::AutoIncrement if column.primary_key => {
                Some("GENERATED ALWAYS AS IDENTITY".to_string())
            }
            GeneratorStrategy::Serial => column
                .sequence_for(table)
                .map(|sequence| format!("DEFAULT nextval('{}')", sequence.replace('\'', "''"))),
            _ => None,
        }
    }

    fn before_create(&self, table: &str, columns: &[&ColumnDefinition]) -> Vec<String> {
        self.sequences(table, columns)
            .into_iter()
            .map(|sequence| format!("CREATE SEQUENCE IF NOT EXISTS {sequence}"))
            .collect()
    }

    fn after_drop(&self, table: &str, columns: &[&ColumnDefinition]) -> Vec<String> {
        self.sequences(table, columns)
            .into_iter()
            .map(|sequence| format!("DROP SEQUENCE IF EXISTS {sequence}"))
            .collect()
    }

    fn create_index_statement(&self, table: &str, index: &IndexDefinition) -> String {
        format!(
            "CREATE {}INDEX {}{} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            if index.concurrent { "CONCURRENTLY " } else { "" },
            self.quote_identifier(&index.name),
            self.quote_identifier(table),
            self.quote_list(&index.columns)
        )
    }

    fn drop_foreign_key_clause(&self, foreign_key: &ForeignKeyDefinition) -> String {
        format!(
            "DROP CONSTRAINT {}",
            self.quote_identifier(&foreign_key.name)
        )
    }

    fn drop_index_statement(&self, _table: &str, index: &IndexDefinition) -> String {
        format!("DROP INDEX {}", self.quote_identifier(&index.name))
    }

    fn modify_column_clauses(&self, _table: &str, change: &ColumnCompareResult) -> Vec<String> {
        let Some(column) = &change.declared else {
            return Vec::new();
        };
        let name = self.quote_identifier(&column.name);
        let mut clauses = Vec::new();
        if !change.type_matches {
            clauses.push(format!(
                "ALTER COLUMN {name} TYPE {}",
                self.column_type(column)
            ));
        }
        if !change.nullable_matches {
            clauses.push(if column.nullable {
                format!("ALTER COLUMN {name} DROP NOT NULL")
            } else {
                format!("ALTER COLUMN {name} SET NOT NULL")
            });
        }
        clauses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{CompareOperation, IndexCompareResult, TableCompareResult};
    use crate::schema::{LogicalType, TableSchema};

    #[test]
    fn test_identity_primary_key() {
        let table = TableSchema::new("post").column(
            ColumnDefinition::new("id", LogicalType::BigInt)
                .primary_key()
                .auto_increment()
                .physical("BIGINT"),
        );

        let sql = PostgresDialect::new()
            .generate(&TableCompareResult::create(&table))
            .unwrap();
        assert_eq!(
            sql.up,
            ["CREATE TABLE \"post\" (\n  \"id\" BIGINT NOT NULL GENERATED ALWAYS AS IDENTITY,\n  PRIMARY KEY (\"id\")\n)"]
        );
        assert_eq!(sql.down, ["DROP TABLE \"post\""]);
    }

    #[test]
    fn test_serial_sequence_lifecycle() {
        let table = TableSchema::new("invoice").column(
            ColumnDefinition::new("number", LogicalType::BigInt)
                .primary_key()
                .generator(GeneratorStrategy::Serial)
                .physical("BIGINT"),
        );

        let sql = PostgresDialect::new()
            .generate(&TableCompareResult::create(&table))
            .unwrap();
        assert_eq!(
            sql.up[0],
            "CREATE SEQUENCE IF NOT EXISTS \"invoice_number_seq\""
        );
        assert!(sql.up[1].contains("\"number\" BIGINT NOT NULL DEFAULT nextval('invoice_number_seq')"));
        assert_eq!(
            sql.down,
            [
                "DROP TABLE \"invoice\"",
                "DROP SEQUENCE IF EXISTS \"invoice_number_seq\"",
            ]
        );
    }

    #[test]
    fn test_alter_type_and_nullability() {
        let mut result = TableCompareResult::new("post", CompareOperation::Update);
        result.columns.push(ColumnCompareResult::updated(
            ColumnDefinition::new("title", LogicalType::String)
                .not_null()
                .physical("VARCHAR(255)"),
            ColumnDefinition::new("title", LogicalType::Text).physical("TEXT"),
            false,
            false,
        ));

        let dialect = PostgresDialect::new();
        assert_eq!(
            dialect.forward(&result).unwrap(),
            [
                "ALTER TABLE \"post\" ALTER COLUMN \"title\" TYPE VARCHAR(255)",
                "ALTER TABLE \"post\" ALTER COLUMN \"title\" SET NOT NULL",
            ]
        );
        assert_eq!(
            dialect.rollback(&result).unwrap(),
            [
                "ALTER TABLE \"post\" ALTER COLUMN \"title\" TYPE TEXT",
                "ALTER TABLE \"post\" ALTER COLUMN \"title\" DROP NOT NULL",
            ]
        );
    }

    #[test]
    fn test_concurrent_index() {
        let mut result = TableCompareResult::new("post", CompareOperation::Update);
        result.indexes.push(IndexCompareResult::created(
            IndexDefinition::for_columns("post", &["slug"], true).concurrent(),
        ));

        assert_eq!(
            PostgresDialect::new().forward(&result).unwrap(),
            ["CREATE UNIQUE INDEX CONCURRENTLY \"uniq_post_slug\" ON \"post\" (\"slug\")"]
        );
        assert_eq!(
            PostgresDialect::new().rollback(&result).unwrap(),
            ["DROP INDEX \"uniq_post_slug\""]
        );
    }
}
