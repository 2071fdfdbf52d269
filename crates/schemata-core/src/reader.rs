//! Live schema reader trait.
//!
//! Driver crates implement [`SchemaReader`] to expose what the database
//! currently holds. The core only defines the trait and an in-memory
//! [`LiveSchema`] snapshot so it stays driver-agnostic.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::SchemaReadError;
use crate::schema::{ColumnDefinition, DefaultValue, ForeignKeyDefinition, IndexDefinition, LogicalType};

/// A column as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFact {
    /// Column name.
    pub name: String,
    /// Physical type as spelled by the catalog.
    pub physical_type: String,
    /// Whether the column allows NULL.
    pub nullable: bool,
    /// Raw default expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Whether the column is part of the primary key.
    #[serde(default)]
    pub primary_key: bool,
    /// Whether the column auto-increments.
    #[serde(default)]
    pub auto_increment: bool,
}

impl ColumnFact {
    /// Creates a fact for a plain column.
    #[must_use]
    pub fn new(name: impl Into<String>, physical_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            physical_type: physical_type.into(),
            nullable,
            default: None,
            primary_key: false,
            auto_increment: false,
        }
    }

    /// Marks the column as part of the primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Converts the fact into a column definition.
    ///
    /// The logical type is the raw physical type, so rendering it again
    /// reproduces exactly what the database holds.
    #[must_use]
    pub fn to_definition(&self) -> ColumnDefinition {
        let mut column = ColumnDefinition::new(
            &self.name,
            LogicalType::Custom(self.physical_type.clone()),
        )
        .physical(&self.physical_type);
        column.nullable = self.nullable;
        column.primary_key = self.primary_key;
        column.auto_increment = self.auto_increment;
        column.default = self.default.clone().map(DefaultValue::Expression);
        column
    }
}

/// An index as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFact {
    /// Index name.
    pub name: String,
    /// Indexed columns, in order.
    pub columns: Vec<String>,
    /// Whether the index is unique.
    #[serde(default)]
    pub unique: bool,
    /// Whether the index backs the primary key.
    #[serde(default)]
    pub primary: bool,
}

impl IndexFact {
    /// Converts the fact into an index definition.
    #[must_use]
    pub fn to_definition(&self) -> IndexDefinition {
        IndexDefinition {
            name: self.name.clone(),
            columns: self.columns.clone(),
            unique: self.unique,
            concurrent: false,
        }
    }
}

/// A single-column foreign key as reported by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyFact {
    /// Constraint name.
    pub name: String,
    /// Referencing column.
    pub column: String,
    /// Referenced table.
    pub referenced_table: String,
    /// Referenced column.
    pub referenced_column: String,
}

impl ForeignKeyFact {
    /// Converts the fact into a foreign key definition.
    #[must_use]
    pub fn to_definition(&self) -> ForeignKeyDefinition {
        ForeignKeyDefinition {
            name: self.name.clone(),
            column: self.column.clone(),
            referenced_table: self.referenced_table.clone(),
            referenced_column: self.referenced_column.clone(),
        }
    }
}

/// Reads the live database structure.
///
/// Implementations must leave the engine's bookkeeping table out of
/// [`SchemaReader::list_tables`].
pub trait SchemaReader {
    /// Lists table names.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaReadError`] wrapping the driver failure.
    fn list_tables(&self) -> Result<Vec<String>, SchemaReadError>;

    /// Lists the columns of a table, in table order.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaReadError`] wrapping the driver failure.
    fn columns(&self, table: &str) -> Result<Vec<ColumnFact>, SchemaReadError>;

    /// Lists the indexes of a table, keyed by name.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaReadError`] wrapping the driver failure.
    fn indexes(&self, table: &str) -> Result<IndexMap<String, IndexFact>, SchemaReadError>;

    /// Lists the foreign keys of a table, keyed by name.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaReadError`] wrapping the driver failure.
    fn foreign_keys(&self, table: &str)
        -> Result<IndexMap<String, ForeignKeyFact>, SchemaReadError>;
}

/// Facts of one live table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveTable {
    /// Columns in table order.
    #[serde(default)]
    pub columns: Vec<ColumnFact>,
    /// Indexes keyed by name.
    #[serde(default)]
    pub indexes: IndexMap<String, IndexFact>,
    /// Foreign keys keyed by name.
    #[serde(default)]
    pub foreign_keys: IndexMap<String, ForeignKeyFact>,
}

impl LiveTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column.
    #[must_use]
    pub fn column(mut self, column: ColumnFact) -> Self {
        self.columns.push(column);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexFact) -> Self {
        self.indexes.insert(index.name.clone(), index);
        self
    }

    /// Adds a foreign key.
    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKeyFact) -> Self {
        self.foreign_keys
            .insert(foreign_key.name.clone(), foreign_key);
        self
    }
}

/// Serializable snapshot of a live schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveSchema {
    /// Tables keyed by name.
    #[serde(default)]
    pub tables: IndexMap<String, LiveTable>,
}

impl LiveSchema {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table.
    #[must_use]
    pub fn table(mut self, name: impl Into<String>, table: LiveTable) -> Self {
        self.tables.insert(name.into(), table);
        self
    }

    /// Captures everything another reader reports.
    ///
    /// # Errors
    ///
    /// Propagates the first read failure.
    pub fn capture<R: SchemaReader + ?Sized>(reader: &R) -> Result<Self, SchemaReadError> {
        let mut snapshot = Self::new();
        for name in reader.list_tables()? {
            let table = LiveTable {
                columns: reader.columns(&name)?,
                indexes: reader.indexes(&name)?,
                foreign_keys: reader.foreign_keys(&name)?,
            };
            snapshot.tables.insert(name, table);
        }
        Ok(snapshot)
    }

    fn get(&self, operation: &str, table: &str) -> Result<&LiveTable, SchemaReadError> {
        self.tables.get(table).ok_or_else(|| {
            SchemaReadError::for_table(operation, table, format!("table '{table}' is not in the snapshot"))
        })
    }
}

impl SchemaReader for LiveSchema {
    fn list_tables(&self) -> Result<Vec<String>, SchemaReadError> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnFact>, SchemaReadError> {
        Ok(self.get("columns", table)?.columns.clone())
    }

    fn indexes(&self, table: &str) -> Result<IndexMap<String, IndexFact>, SchemaReadError> {
        Ok(self.get("indexes", table)?.indexes.clone())
    }

    fn foreign_keys(
        &self,
        table: &str,
    ) -> Result<IndexMap<String, ForeignKeyFact>, SchemaReadError> {
        Ok(self.get("foreign keys", table)?.foreign_keys.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_from_json() {
        let snapshot: LiveSchema = serde_json::from_str(
            r#"{"tables": {"post": {
                "columns": [
                    {"name": "id", "physical_type": "INTEGER", "nullable": false, "primary_key": true},
                    {"name": "title", "physical_type": "TEXT", "nullable": false}
                ]
            }}}"#,
        )
        .unwrap();

        assert_eq!(snapshot.list_tables().unwrap(), ["post"]);
        let columns = snapshot.columns("post").unwrap();
        assert_eq!(columns.len(), 2);
        assert!(columns[0].primary_key);
        assert!(snapshot.indexes("post").unwrap().is_empty());
    }

    #[test]
    fn test_missing_table_is_read_error() {
        let err = LiveSchema::new().columns("ghost").unwrap_err();
        assert_eq!(err.table.as_deref(), Some("ghost"));
    }

    #[test]
    fn test_fact_to_definition_keeps_physical_type() {
        let column = ColumnFact::new("price", "numeric(10, 2)", true).to_definition();
        assert_eq!(column.physical_type.as_deref(), Some("numeric(10, 2)"));
        assert_eq!(column.logical_type, LogicalType::Custom("numeric(10, 2)".into()));
        assert!(column.nullable);
    }
}
