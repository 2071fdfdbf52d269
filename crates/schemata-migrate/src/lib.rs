//! SQLite driver and command-line front end for `schemata-core`.
//!
//! `schemata-migrate` reads entity descriptors from JSON, captures the live
//! schema of a SQLite database (or loads a JSON snapshot for any dialect),
//! and turns the comparison into a [`MigrationPlan`] it can print or apply.
//!
//! # Example
//!
//! ```rust,ignore
//! use schemata_migrate::prelude::*;
//!
//! let (registry, morph_map) = load_entities(Path::new("entities.json"))?;
//! let live = SqliteIntrospector::new(pool.clone()).snapshot().await?;
//! let plan = build_plan(&registry, morph_map, DialectKind::Sqlite, &live, ComparatorOptions::new())?;
//!
//! let executor = PlanExecutor::new(pool);
//! executor.init().await?;
//! executor.apply("20240301_initial", &plan).await?;
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Show the forward SQL for a SQLite database
//! schemata --entities entities.json plan
//!
//! # Show the rollback SQL against a PostgreSQL snapshot
//! schemata --entities entities.json --dialect postgres --live live.json plan --rollback
//!
//! # Fail when the database is out of date
//! schemata --entities entities.json check
//!
//! # Apply and record the plan
//! schemata --entities entities.json apply --name 20240301_initial
//! ```

pub mod descriptors;
pub mod error;
pub mod executor;
pub mod history;
pub mod introspect;

use schemata_core::morph::MorphMap;
use schemata_core::types::DialectKind;
use schemata_core::{
    dialect_for, ComparatorOptions, EntityRegistry, LiveSchema, MigrateError, MigrationPlan,
    SchemaComparator,
};
use tracing::info;

pub use descriptors::{load_entities, load_live, DescriptorFile};
pub use error::{DriverError, Result};
pub use executor::PlanExecutor;
pub use history::{ExecutedMigration, MigrationHistory, CREATE_HISTORY_TABLE_SQL};
pub use introspect::SqliteIntrospector;

/// Compares the entities against a live snapshot and renders the SQL.
///
/// # Errors
///
/// Fails on invalid metadata or when the dialect cannot express a change.
pub fn build_plan(
    registry: &EntityRegistry,
    morph_map: MorphMap,
    dialect: DialectKind,
    live: &LiveSchema,
    options: ComparatorOptions,
) -> Result<MigrationPlan> {
    let dialect = dialect_for(dialect);
    let results = SchemaComparator::new(registry, dialect.type_mapper())
        .with_morph_map(morph_map)
        .with_options(options)
        .compare_all(live)?;
    let plan = MigrationPlan::build(dialect.as_ref(), &results).map_err(MigrateError::from)?;
    info!(dialect = %plan.dialect, changes = plan.entries.len(), "Built migration plan");
    Ok(plan)
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::descriptors::{load_entities, load_live, DescriptorFile};
    pub use crate::error::{DriverError, Result};
    pub use crate::executor::PlanExecutor;
    pub use crate::history::{ExecutedMigration, MigrationHistory, HISTORY_TABLE};
    pub use crate::introspect::SqliteIntrospector;
    pub use crate::build_plan;
    pub use schemata_core::prelude::*;
}
