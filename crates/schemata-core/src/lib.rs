//! Schema comparison and migration generation for entity-mapped databases.
//!
//! `schemata-core` takes declarative entity descriptors, checks that their
//! relations agree with each other, resolves the tables those entities and
//! their mapping relations need, diffs them against a live database, and
//! renders forward and rollback SQL for MySQL, PostgreSQL and SQLite.
//!
//! # Architecture
//!
//! - **Schema model** - columns, indexes, foreign keys and tables
//! - **Entities** - descriptors, relations and the [`EntityRegistry`]
//! - **Validators** - one [`RelationValidator`] per relation kind, tried in a
//!   fixed order
//! - **Mapping collector** - many-to-many and morph-to-many tables merged
//!   across every contributing relation
//! - **Comparator** - diffs declared tables against a [`SchemaReader`]
//! - **Dialects** - turn each [`TableCompareResult`] into SQL
//!
//! # Example
//!
//! ```rust,ignore
//! use schemata_core::prelude::*;
//!
//! let registry = EntityRegistry::from_entities([EntityDescriptor::new("Post", "post")
//!     .column(ColumnDefinition::new("id", LogicalType::Integer).primary_key().auto_increment())
//!     .column(ColumnDefinition::new("title", LogicalType::String).length(255).not_null())])?;
//!
//! let dialect = dialect_for(DialectKind::Postgres);
//! let results = SchemaComparator::new(&registry, dialect.type_mapper())
//!     .compare_all(&LiveSchema::new())?;
//! let plan = MigrationPlan::build(dialect.as_ref(), &results)?;
//! println!("{}", plan.up_sql());
//! ```

pub mod compare;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod mapping;
pub mod morph;
pub mod reader;
pub mod relation;
pub mod result;
pub mod schema;
pub mod types;
pub mod validate;

pub use compare::{ComparatorOptions, DeclaredTable, SchemaComparator, TableOrigin, HISTORY_TABLE};
pub use dialect::{dialect_for, MigrationDialect, MigrationPlan, MigrationSql};
pub use entity::{EntityDescriptor, EntityMetadataProvider, EntityRegistry};
pub use error::{ConfigurationError, GenerationError, MigrateError, Result, SchemaReadError};
pub use reader::{LiveSchema, SchemaReader};
pub use result::{CompareOperation, TableCompareResult};
pub use validate::{RelationValidator, ValidatorSet};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::compare::{ComparatorOptions, SchemaComparator, HISTORY_TABLE};
    pub use crate::dialect::{
        dialect_for, MigrationDialect, MigrationPlan, MigrationSql, MySqlDialect,
        PostgresDialect, SqliteDialect,
    };
    pub use crate::entity::{EntityDescriptor, EntityMetadataProvider, EntityRegistry};
    pub use crate::error::{
        ConfigurationError, GenerationError, MigrateError, Result, SchemaReadError,
    };
    pub use crate::mapping::{MappingCollector, MappingTableDefinition};
    pub use crate::morph::MorphMap;
    pub use crate::reader::{ColumnFact, ForeignKeyFact, IndexFact, LiveSchema, LiveTable, SchemaReader};
    pub use crate::relation::{
        JoinColumn, MappingTableProperty, MappingTableSpec, MorphColumns, MorphMapping,
        RelationDescriptor, RelationKind,
    };
    pub use crate::result::{
        ColumnCompareResult, CompareOperation, ForeignKeyCompareResult, IndexCompareResult,
        TableCompareResult,
    };
    pub use crate::schema::{
        ColumnDefinition, DefaultValue, ForeignKeyDefinition, GeneratorStrategy,
        IndexDefinition, LogicalType, TableSchema,
    };
    pub use crate::types::{DialectKind, TypeMapper, ValueConverter};
    pub use crate::validate::{RelationValidator, ValidatorSet};
}
