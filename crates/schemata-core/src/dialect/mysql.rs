//! MySQL / MariaDB dialect.

use super::MigrationDialect;
use crate::result::ColumnCompareResult;
use crate::schema::{ColumnDefinition, ForeignKeyDefinition, GeneratorStrategy, IndexDefinition};
use crate::types::{DialectKind, TypeMapper};

/// MySQL migration dialect.
#[derive(Debug, Clone)]
pub struct MySqlDialect {
    mapper: TypeMapper,
}

impl MySqlDialect {
    /// Creates the dialect with the built-in MySQL types.
    #[must_use]
    pub fn new() -> Self {
        Self::with_type_mapper(TypeMapper::for_dialect(DialectKind::MySql))
    }

    /// Creates the dialect with a customized mapper.
    #[must_use]
    pub const fn with_type_mapper(mapper: TypeMapper) -> Self {
        Self { mapper }
    }
}

impl Default for MySqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationDialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::MySql
    }

    fn type_mapper(&self) -> &TypeMapper {
        &self.mapper
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn generated_value_clause(
        &self,
        _table: &str,
        column: &ColumnDefinition,
        _sole_primary_key: bool,
    ) -> Option<String> {
        match column.generator_strategy()? {
            GeneratorStrategy::AutoIncrement | GeneratorStrategy::Serial if column.primary_key => {
                Some("AUTO_INCREMENT".to_string())
            }
            _ => None,
        }
    }

    fn drop_foreign_key_clause(&self, foreign_key: &ForeignKeyDefinition) -> String {
        format!(
            "DROP FOREIGN KEY {}",
            self.quote_identifier(&foreign_key.name)
        )
    }

    fn drop_index_statement(&self, table: &str, index: &IndexDefinition) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.quote_identifier(&index.name),
            self.quote_identifier(table)
        )
    }

    fn modify_column_clauses(&self, table: &str, change: &ColumnCompareResult) -> Vec<String> {
        change
            .declared
            .iter()
            .map(|column| {
                format!(
                    "MODIFY COLUMN {}",
                    self.column_definition(table, column, false)
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::{CompareOperation, IndexCompareResult, TableCompareResult};
    use crate::schema::{DefaultValue, LogicalType, TableSchema};

    #[test]
    fn test_create_table_with_auto_increment() {
        let table = TableSchema::new("post")
            .column(
                ColumnDefinition::new("id", LogicalType::Integer)
                    .primary_key()
                    .auto_increment()
                    .physical("INT"),
            )
            .column(
                ColumnDefinition::new("published", LogicalType::Boolean)
                    .not_null()
                    .default(DefaultValue::Bool(false))
                    .physical("TINYINT(1)"),
            );

        let statements = MySqlDialect::new()
            .forward(&TableCompareResult::create(&table))
            .unwrap();
        assert_eq!(
            statements,
            ["CREATE TABLE `post` (\n  `id` INT NOT NULL AUTO_INCREMENT,\n  `published` TINYINT(1) NOT NULL DEFAULT 0,\n  PRIMARY KEY (`id`)\n)"]
        );
    }

    #[test]
    fn test_update_drops_before_adding() {
        let mut result = TableCompareResult::new("post", CompareOperation::Update);
        result.indexes.push(IndexCompareResult::deleted(IndexDefinition::named(
            "idx_post_title",
            &["title"],
        )));
        result.columns.push(ColumnCompareResult::updated(
            ColumnDefinition::new("title", LogicalType::String)
                .not_null()
                .physical("VARCHAR(255)"),
            ColumnDefinition::new("title", LogicalType::Text).physical("TEXT"),
            false,
            false,
        ));

        let statements = MySqlDialect::new().forward(&result).unwrap();
        assert_eq!(
            statements,
            [
                "DROP INDEX `idx_post_title` ON `post`",
                "ALTER TABLE `post` MODIFY COLUMN `title` VARCHAR(255) NOT NULL",
            ]
        );

        let rollback = MySqlDialect::new().rollback(&result).unwrap();
        assert_eq!(rollback[0], "ALTER TABLE `post` MODIFY COLUMN `title` TEXT");
        assert_eq!(
            rollback[1],
            "CREATE INDEX `idx_post_title` ON `post` (`title`)"
        );
    }

    #[test]
    fn test_quote_escapes_backtick() {
        assert_eq!(MySqlDialect::new().quote_identifier("we`ird"), "`we``ird`");
    }
}
