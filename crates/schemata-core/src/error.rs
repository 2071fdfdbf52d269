//! Error types for schema comparison and SQL generation.
//!
//! Three failure families are kept apart so callers can react to each one
//! differently: a broken mapping declaration, a live schema that could not be
//! read, and a change set a dialect cannot express.

/// Invalid entity or relation metadata.
///
/// Raised by the relation validators and the mapping-table collector. Any of
/// these aborts a comparison run before a single table is inspected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// Two entity descriptors share a name.
    #[error("Entity '{entity}' is registered more than once")]
    DuplicateEntity {
        /// The duplicated entity name.
        entity: String,
    },

    /// No validator in the dispatch list accepts the relation.
    #[error("No validator accepts {kind} relation '{entity}::{property}'")]
    NoValidator {
        /// Declaring entity.
        entity: String,
        /// Relation property.
        property: String,
        /// Relation kind name.
        kind: &'static str,
    },

    /// A relation that needs a target names none.
    #[error("Relation '{entity}::{property}' does not name a target entity")]
    MissingTargetEntity {
        /// Declaring entity.
        entity: String,
        /// Relation property.
        property: String,
    },

    /// The relation target is not a registered entity.
    #[error("Relation '{entity}::{property}' targets unknown entity '{target}'")]
    UnknownTargetEntity {
        /// Declaring entity.
        entity: String,
        /// Relation property.
        property: String,
        /// The target that could not be resolved.
        target: String,
    },

    /// Both `mapped_by` and `inversed_by` are set on one side.
    #[error("Relation '{entity}::{property}' sets both mapped_by and inversed_by")]
    ConflictingOwnershipMarkers {
        /// Declaring entity.
        entity: String,
        /// Relation property.
        property: String,
    },

    /// The named inverse or owning property does not exist on the target.
    #[error("Relation '{entity}::{property}' refers to '{target}::{inverse}', which does not exist")]
    MissingInverseProperty {
        /// Declaring entity.
        entity: String,
        /// Relation property.
        property: String,
        /// Target entity.
        target: String,
        /// Property looked up on the target.
        inverse: String,
    },

    /// The counterpart relation has the wrong kind.
    #[error(
        "Relation '{entity}::{property}' expects '{target}::{inverse}' to be {expected}, found {found}"
    )]
    InverseKindMismatch {
        /// Declaring entity.
        entity: String,
        /// Relation property.
        property: String,
        /// Target entity.
        target: String,
        /// Counterpart property.
        inverse: String,
        /// Expected kind name.
        expected: &'static str,
        /// Actual kind name.
        found: &'static str,
    },

    /// The counterpart does not point back at this relation.
    #[error(
        "Relation '{entity}::{property}' and '{target}::{inverse}' do not reference each other"
    )]
    InverseReferenceMismatch {
        /// Declaring entity.
        entity: String,
        /// Relation property.
        property: String,
        /// Target entity.
        target: String,
        /// Counterpart property.
        inverse: String,
    },

    /// Both sides of a one-to-one relation claim the foreign key.
    #[error(
        "Relation '{entity}::{property}' and '{target}::{inverse}' both require the foreign key"
    )]
    ConflictingForeignKeyOwner {
        /// Declaring entity.
        entity: String,
        /// Relation property.
        property: String,
        /// Target entity.
        target: String,
        /// Counterpart property.
        inverse: String,
    },

    /// The relation lacks the marker that ties it to its owning side.
    #[error("Relation '{entity}::{property}' must declare {marker}")]
    MissingOwningReference {
        /// Declaring entity.
        entity: String,
        /// Relation property.
        property: String,
        /// The missing marker (`mapped_by` or `inversed_by`).
        marker: &'static str,
    },

    /// The inverse side of a mapping relation declares extra properties.
    #[error("Inverse relation '{entity}::{property}' must not declare mapping-table properties")]
    InverseDeclaresExtraProperties {
        /// Declaring entity.
        entity: String,
        /// Relation property.
        property: String,
    },

    /// Both sides name a mapping table and the names disagree.
    #[error(
        "Relation '{entity}::{property}' uses mapping table '{table}' but its counterpart uses '{other}'"
    )]
    MappingTableNameMismatch {
        /// Declaring entity.
        entity: String,
        /// Relation property.
        property: String,
        /// Table named by this side.
        table: String,
        /// Table named by the counterpart.
        other: String,
    },

    /// A morph column name still contains a template placeholder.
    #[error("Polymorphic relation '{entity}::{property}' has unresolved column name '{column}'")]
    UnresolvedMorphColumns {
        /// Declaring entity.
        entity: String,
        /// Relation property.
        property: String,
        /// The offending column name.
        column: String,
    },

    /// The target has no polymorphic counterpart with the expected name.
    #[error(
        "Polymorphic relation '{entity}::{property}' expects a {expected} named '{morph_name}' on '{target}'"
    )]
    MissingMorphInverse {
        /// Declaring entity.
        entity: String,
        /// Relation property.
        property: String,
        /// Target entity.
        target: String,
        /// Expected morph name.
        morph_name: String,
        /// Expected counterpart kind.
        expected: &'static str,
    },

    /// A referenced column is not declared on the referenced entity.
    #[error("Entity '{entity}' has no column '{column}' to reference")]
    UnknownReferencedColumn {
        /// Referenced entity.
        entity: String,
        /// Column that could not be found.
        column: String,
    },

    /// No referenced column was given and the primary key is not a single column.
    #[error(
        "Entity '{entity}' has a primary key of {count} columns; name the referenced column explicitly"
    )]
    AmbiguousReferencedColumn {
        /// Referenced entity.
        entity: String,
        /// Number of primary-key columns.
        count: usize,
    },

    /// Relations sharing a mapping table disagree on join or referenced columns.
    #[error("Mapping table '{table}' has conflicting {role}: '{first}' vs '{second}'")]
    JoinColumnMismatch {
        /// Mapping table.
        table: String,
        /// Which column pair disagrees.
        role: &'static str,
        /// Value already recorded.
        first: String,
        /// Value from the later relation.
        second: String,
    },

    /// Both join columns of a mapping table resolve to the same name.
    #[error("Mapping table '{table}' resolves both join columns to '{column}'")]
    DuplicateJoinColumns {
        /// Mapping table.
        table: String,
        /// The duplicated column name.
        column: String,
    },

    /// Extra properties with the same name disagree on type, length or default.
    #[error("Mapping table '{table}' declares property '{property}' inconsistently: {detail}")]
    ExtraPropertyConflict {
        /// Mapping table.
        table: String,
        /// Property name.
        property: String,
        /// What differs.
        detail: String,
    },

    /// Morph-to-many relations sharing a table use different morph names.
    #[error("Mapping table '{table}' is shared by morph names '{first}' and '{second}'")]
    MorphNameMismatch {
        /// Mapping table.
        table: String,
        /// Morph name already recorded.
        first: String,
        /// Morph name from the later relation.
        second: String,
    },

    /// A table name is claimed by both a many-to-many and a morph-to-many mapping.
    #[error("Table '{table}' is claimed by both a many-to-many and a morph-to-many mapping")]
    MappingTableCollision {
        /// The contested table name.
        table: String,
    },

    /// Entities sharing a table disagree on a column's physical type.
    #[error("Shared table '{table}' declares column '{column}' as both {first} and {second}")]
    SharedColumnConflict {
        /// Shared table.
        table: String,
        /// Column name.
        column: String,
        /// Type already recorded.
        first: String,
        /// Type from the later entity.
        second: String,
    },

    /// Two entities registered the same morph alias.
    #[error("Morph alias '{alias}' is registered for both '{existing}' and '{entity}'")]
    DuplicateMorphAlias {
        /// The alias.
        alias: String,
        /// Entity holding the alias.
        existing: String,
        /// Entity trying to claim it.
        entity: String,
    },
}

/// Failure while reading the live database structure.
///
/// Wraps whatever the reader's transport or driver reported so the cause is
/// never lost.
#[derive(Debug, thiserror::Error)]
#[error("Failed to read live schema ({operation}): {source}")]
pub struct SchemaReadError {
    /// What was being read, e.g. `columns of 'post'`.
    pub operation: String,
    /// Table being read, when the failure is table-scoped.
    pub table: Option<String>,
    /// Underlying driver error.
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl SchemaReadError {
    /// Creates an error for a schema-wide read.
    pub fn new(
        operation: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            operation: operation.into(),
            table: None,
            source: source.into(),
        }
    }

    /// Creates an error scoped to one table.
    pub fn for_table(
        operation: &str,
        table: &str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            operation: format!("{operation} of '{table}'"),
            table: Some(table.to_string()),
            source: source.into(),
        }
    }
}

/// A change set the target dialect cannot express.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    /// The dialect has no usable ALTER TABLE for this change.
    #[error(
        "{dialect} cannot alter table '{table}' in place ({operation}); table recreation required"
    )]
    AlterTableUnsupported {
        /// Dialect name.
        dialect: &'static str,
        /// Table being altered.
        table: String,
        /// The alteration that was requested.
        operation: String,
    },

    /// A CREATE was requested for a table with no columns.
    #[error("{dialect} cannot create table '{table}' without columns")]
    EmptyTable {
        /// Dialect name.
        dialect: &'static str,
        /// Table name.
        table: String,
    },
}

impl GenerationError {
    /// Returns the table the failure concerns.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::AlterTableUnsupported { table, .. } | Self::EmptyTable { table, .. } => table,
        }
    }
}

/// Any failure surfaced by a comparison or generation run.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Invalid mapping metadata.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The live schema could not be read.
    #[error(transparent)]
    SchemaRead(#[from] SchemaReadError),

    /// The dialect cannot express a change.
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Result type for comparison and generation runs.
pub type Result<T> = std::result::Result<T, MigrateError>;
