//! Comparison results.
//!
//! One [`TableCompareResult`] per table that differs. Every sub-result keeps
//! both the declared and the existing definition so the whole result can be
//! turned around into its structural inverse for rollbacks.

use serde::{Deserialize, Serialize};

use crate::schema::{ColumnDefinition, ForeignKeyDefinition, IndexDefinition, TableSchema};

/// Direction of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompareOperation {
    /// Something new.
    Create,
    /// Something changed.
    Update,
    /// Something gone.
    Delete,
}

impl CompareOperation {
    /// Returns the operation that undoes this one.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Create => Self::Delete,
            Self::Update => Self::Update,
            Self::Delete => Self::Create,
        }
    }
}

/// Difference of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnCompareResult {
    /// Column name.
    pub name: String,
    /// What happens to the column.
    pub operation: CompareOperation,
    /// Declared definition; absent on delete.
    pub declared: Option<ColumnDefinition>,
    /// Existing definition; absent on create.
    pub existing: Option<ColumnDefinition>,
    /// Whether the physical types agree.
    pub type_matches: bool,
    /// Whether nullability agrees.
    pub nullable_matches: bool,
}

impl ColumnCompareResult {
    /// A column to add.
    #[must_use]
    pub fn created(declared: ColumnDefinition) -> Self {
        Self {
            name: declared.name.clone(),
            operation: CompareOperation::Create,
            declared: Some(declared),
            existing: None,
            type_matches: false,
            nullable_matches: false,
        }
    }

    /// A column to drop.
    #[must_use]
    pub fn deleted(existing: ColumnDefinition) -> Self {
        Self {
            name: existing.name.clone(),
            operation: CompareOperation::Delete,
            declared: None,
            existing: Some(existing),
            type_matches: false,
            nullable_matches: false,
        }
    }

    /// A column to modify.
    #[must_use]
    pub fn updated(
        declared: ColumnDefinition,
        existing: ColumnDefinition,
        type_matches: bool,
        nullable_matches: bool,
    ) -> Self {
        Self {
            name: declared.name.clone(),
            operation: CompareOperation::Update,
            declared: Some(declared),
            existing: Some(existing),
            type_matches,
            nullable_matches,
        }
    }

    /// Returns the change that undoes this one.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            name: self.name.clone(),
            operation: self.operation.inverse(),
            declared: self.existing.clone(),
            existing: self.declared.clone(),
            type_matches: self.type_matches,
            nullable_matches: self.nullable_matches,
        }
    }
}

/// Difference of one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexCompareResult {
    /// Index name.
    pub name: String,
    /// What happens to the index.
    pub operation: CompareOperation,
    /// Declared definition; absent on delete.
    pub declared: Option<IndexDefinition>,
    /// Existing definition; absent on create.
    pub existing: Option<IndexDefinition>,
}

impl IndexCompareResult {
    /// An index to create.
    #[must_use]
    pub fn created(declared: IndexDefinition) -> Self {
        Self {
            name: declared.name.clone(),
            operation: CompareOperation::Create,
            declared: Some(declared),
            existing: None,
        }
    }

    /// An index to drop.
    #[must_use]
    pub fn deleted(existing: IndexDefinition) -> Self {
        Self {
            name: existing.name.clone(),
            operation: CompareOperation::Delete,
            declared: None,
            existing: Some(existing),
        }
    }

    /// Returns the change that undoes this one.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            name: self.name.clone(),
            operation: self.operation.inverse(),
            declared: self.existing.clone(),
            existing: self.declared.clone(),
        }
    }
}

/// Difference of one foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyCompareResult {
    /// Constraint name.
    pub name: String,
    /// What happens to the key.
    pub operation: CompareOperation,
    /// Declared definition; absent on delete.
    pub declared: Option<ForeignKeyDefinition>,
    /// Existing definition; absent on create.
    pub existing: Option<ForeignKeyDefinition>,
}

impl ForeignKeyCompareResult {
    /// A key to add.
    #[must_use]
    pub fn created(declared: ForeignKeyDefinition) -> Self {
        Self {
            name: declared.name.clone(),
            operation: CompareOperation::Create,
            declared: Some(declared),
            existing: None,
        }
    }

    /// A key to drop.
    #[must_use]
    pub fn deleted(existing: ForeignKeyDefinition) -> Self {
        Self {
            name: existing.name.clone(),
            operation: CompareOperation::Delete,
            declared: None,
            existing: Some(existing),
        }
    }

    /// A key that now points elsewhere; dropped and re-added.
    #[must_use]
    pub fn updated(declared: ForeignKeyDefinition, existing: ForeignKeyDefinition) -> Self {
        Self {
            name: declared.name.clone(),
            operation: CompareOperation::Update,
            declared: Some(declared),
            existing: Some(existing),
        }
    }

    /// Returns the change that undoes this one.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            name: self.name.clone(),
            operation: self.operation.inverse(),
            declared: self.existing.clone(),
            existing: self.declared.clone(),
        }
    }
}

/// Difference of one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCompareResult {
    /// Table name.
    pub name: String,
    /// What happens to the table.
    pub operation: CompareOperation,
    /// Column changes, in declaration order followed by dropped columns.
    pub columns: Vec<ColumnCompareResult>,
    /// Index changes.
    pub indexes: Vec<IndexCompareResult>,
    /// Foreign key changes.
    pub foreign_keys: Vec<ForeignKeyCompareResult>,
    /// Primary-key columns, sorted.
    pub primary_columns: Vec<String>,
}

impl TableCompareResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new(name: impl Into<String>, operation: CompareOperation) -> Self {
        Self {
            name: name.into(),
            operation,
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            primary_columns: Vec::new(),
        }
    }

    /// A table to create from its declared schema.
    #[must_use]
    pub fn create(table: &TableSchema) -> Self {
        Self {
            name: table.name.clone(),
            operation: CompareOperation::Create,
            columns: table
                .columns
                .values()
                .cloned()
                .map(ColumnCompareResult::created)
                .collect(),
            indexes: table
                .indexes
                .values()
                .cloned()
                .map(IndexCompareResult::created)
                .collect(),
            foreign_keys: table
                .foreign_keys
                .values()
                .cloned()
                .map(ForeignKeyCompareResult::created)
                .collect(),
            primary_columns: table.primary_key_columns().to_vec(),
        }
    }

    /// An orphaned table to drop. Carries no detail.
    #[must_use]
    pub fn delete(name: impl Into<String>) -> Self {
        Self::new(name, CompareOperation::Delete)
    }

    /// Returns whether no column, index or foreign key changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.indexes.is_empty() && self.foreign_keys.is_empty()
    }

    /// Returns whether the result describes the table well enough to
    /// recreate it.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Returns the structural inverse: creates become deletes and back,
    /// updates swap their declared and existing definitions.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self {
            name: self.name.clone(),
            operation: self.operation.inverse(),
            columns: self.columns.iter().map(ColumnCompareResult::reversed).collect(),
            indexes: self.indexes.iter().map(IndexCompareResult::reversed).collect(),
            foreign_keys: self
                .foreign_keys
                .iter()
                .map(ForeignKeyCompareResult::reversed)
                .collect(),
            primary_columns: self.primary_columns.clone(),
        }
    }
}
