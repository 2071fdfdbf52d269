//! Schema comparator.
//!
//! Turns entity metadata into declared tables and diffs them against what a
//! [`SchemaReader`] reports. Results come out in a fixed order: entity tables,
//! many-to-many tables, morph-to-many tables, then orphaned live tables.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::entity::{EntityDescriptor, EntityMetadataProvider};
use crate::error::{ConfigurationError, Result, SchemaReadError};
use crate::mapping::{MappingCollector, MappingKind};
use crate::morph::MorphMap;
use crate::reader::SchemaReader;
use crate::relation::{JoinColumn, MorphColumns, RelationDescriptor, RelationKind};
use crate::result::{
    ColumnCompareResult, CompareOperation, ForeignKeyCompareResult, IndexCompareResult,
    TableCompareResult,
};
use crate::schema::{
    ColumnDefinition, ForeignKeyDefinition, IndexDefinition, LogicalType, TableSchema,
};
use crate::types::{TypeMapper, DEFAULT_STRING_LENGTH};
use crate::validate::{target_entity, ValidatorSet};

/// Name of the bookkeeping table recording executed migrations.
pub const HISTORY_TABLE: &str = "schemata_migrations";

/// Options for the comparator.
#[derive(Debug, Clone)]
pub struct ComparatorOptions {
    /// Live tables the comparator never touches.
    pub ignored_tables: BTreeSet<String>,
    /// Whether live tables nobody declares are dropped.
    pub drop_orphaned_tables: bool,
}

impl ComparatorOptions {
    /// Creates default options: orphans are dropped and only the
    /// bookkeeping table is ignored.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ignored_tables: BTreeSet::from([HISTORY_TABLE.to_string()]),
            drop_orphaned_tables: true,
        }
    }

    /// Ignores another live table.
    #[must_use]
    pub fn ignore_table(mut self, name: impl Into<String>) -> Self {
        self.ignored_tables.insert(name.into());
        self
    }

    /// Keeps orphaned live tables instead of dropping them.
    #[must_use]
    pub fn keep_orphaned_tables(mut self) -> Self {
        self.drop_orphaned_tables = false;
        self
    }
}

impl Default for ComparatorOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a declared table comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOrigin {
    /// One or more entities sharing the table.
    Entity(Vec<String>),
    /// A many-to-many mapping table.
    ManyToMany,
    /// A morph-to-many mapping table.
    MorphToMany,
}

/// A table the metadata declares.
#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredTable {
    /// Fully resolved schema.
    pub schema: TableSchema,
    /// Origin of the declaration.
    pub origin: TableOrigin,
}

/// Diffs declared metadata against a live schema.
pub struct SchemaComparator<'a> {
    entities: &'a dyn EntityMetadataProvider,
    mapper: &'a TypeMapper,
    morph_map: MorphMap,
    validators: ValidatorSet,
    options: ComparatorOptions,
}

impl<'a> SchemaComparator<'a> {
    /// Creates a comparator with the standard validators and default options.
    #[must_use]
    pub fn new(entities: &'a dyn EntityMetadataProvider, mapper: &'a TypeMapper) -> Self {
        Self {
            entities,
            mapper,
            morph_map: MorphMap::new(),
            validators: ValidatorSet::standard(),
            options: ComparatorOptions::new(),
        }
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: ComparatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses a morph alias map for this run.
    #[must_use]
    pub fn with_morph_map(mut self, morph_map: MorphMap) -> Self {
        self.morph_map = morph_map;
        self
    }

    /// Replaces the validator list.
    #[must_use]
    pub fn with_validators(mut self, validators: ValidatorSet) -> Self {
        self.validators = validators;
        self
    }

    /// Validates the metadata and resolves every declared table.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found.
    pub fn declared_tables(&self) -> std::result::Result<Vec<DeclaredTable>, ConfigurationError> {
        self.validators.validate_all(self.entities)?;
        let mappings = MappingCollector::new(self.entities, &self.morph_map).collect()?;

        let mut groups: IndexMap<String, DeclaredTable> = IndexMap::new();
        for entity in self.entities.entities().iter().filter(|e| e.is_entity) {
            let table = self.entity_table(entity)?;
            match groups.get_mut(&entity.table_name) {
                Some(group) => {
                    self.merge_shared(&mut group.schema, table)?;
                    if let TableOrigin::Entity(names) = &mut group.origin {
                        names.push(entity.name.clone());
                    }
                }
                None => {
                    groups.insert(
                        entity.table_name.clone(),
                        DeclaredTable {
                            schema: table,
                            origin: TableOrigin::Entity(vec![entity.name.clone()]),
                        },
                    );
                }
            }
        }

        let mut tables: Vec<DeclaredTable> = groups.into_values().collect();
        for definition in mappings.iter() {
            let mut schema = definition.to_table_schema();
            self.resolve_types(&mut schema);
            let origin = match definition.kind {
                MappingKind::ManyToMany => TableOrigin::ManyToMany,
                MappingKind::MorphToMany { .. } => TableOrigin::MorphToMany,
            };
            tables.push(DeclaredTable { schema, origin });
        }
        Ok(tables)
    }

    /// Compares every declared table against the live schema.
    ///
    /// # Errors
    ///
    /// Fails on invalid metadata before any table is read, and on any reader
    /// failure.
    pub fn compare_all<R: SchemaReader + ?Sized>(
        &self,
        reader: &R,
    ) -> Result<Vec<TableCompareResult>> {
        let live: BTreeSet<String> = reader
            .list_tables()?
            .into_iter()
            .filter(|name| !self.options.ignored_tables.contains(name))
            .collect();
        let mut to_remove = live.clone();

        let declared = self.declared_tables()?;
        let mut results = Vec::new();
        for table in &declared {
            to_remove.remove(&table.schema.name);
            let result = if live.contains(&table.schema.name) {
                self.diff_table(&table.schema, reader)?
            } else {
                debug!(table = %table.schema.name, "Table missing, will create");
                Some(TableCompareResult::create(&table.schema))
            };
            results.extend(result);
        }

        for orphan in to_remove {
            if self.options.drop_orphaned_tables {
                debug!(table = %orphan, "Table no longer declared, will drop");
                results.push(TableCompareResult::delete(orphan));
            } else {
                warn!(table = %orphan, "Table no longer declared, keeping it");
            }
        }

        info!(
            declared = declared.len(),
            changed = results.len(),
            "Schema comparison finished"
        );
        Ok(results)
    }

    fn diff_table<R: SchemaReader + ?Sized>(
        &self,
        declared: &TableSchema,
        reader: &R,
    ) -> std::result::Result<Option<TableCompareResult>, SchemaReadError> {
        let live_columns = reader.columns(&declared.name)?;
        let live_indexes = reader.indexes(&declared.name)?;
        let live_foreign_keys = reader.foreign_keys(&declared.name)?;

        let mut result = TableCompareResult::new(&declared.name, CompareOperation::Update);
        result.primary_columns = declared.primary_key_columns().to_vec();

        for column in declared.columns.values() {
            let Some(fact) = live_columns.iter().find(|c| c.name == column.name) else {
                result.columns.push(ColumnCompareResult::created(column.clone()));
                continue;
            };
            let declared_type = self.mapper.column_type(column);
            let type_matches = self.mapper.types_match(&declared_type, &fact.physical_type);
            let nullable_matches = column.nullable == fact.nullable;
            if !type_matches || !nullable_matches {
                result.columns.push(ColumnCompareResult::updated(
                    column.clone(),
                    fact.to_definition(),
                    type_matches,
                    nullable_matches,
                ));
            }
        }
        for fact in &live_columns {
            if !declared.columns.contains_key(&fact.name) {
                result.columns.push(ColumnCompareResult::deleted(fact.to_definition()));
            }
        }

        let existing_indexes: Vec<IndexDefinition> = live_indexes
            .values()
            .filter(|index| !index.primary)
            .map(|index| index.to_definition())
            .collect();
        for index in declared.indexes.values() {
            if !existing_indexes.iter().any(|live| live.same_shape(index)) {
                result.indexes.push(IndexCompareResult::created(index.clone()));
            }
        }
        for live in existing_indexes {
            if !declared.indexes.values().any(|index| index.same_shape(&live)) {
                result.indexes.push(IndexCompareResult::deleted(live));
            }
        }

        for foreign_key in declared.foreign_keys.values() {
            match live_foreign_keys.get(&foreign_key.name) {
                None => result
                    .foreign_keys
                    .push(ForeignKeyCompareResult::created(foreign_key.clone())),
                Some(live) => {
                    let live = live.to_definition();
                    if !live.same_target(foreign_key) {
                        result
                            .foreign_keys
                            .push(ForeignKeyCompareResult::updated(foreign_key.clone(), live));
                    }
                }
            }
        }
        for (name, live) in &live_foreign_keys {
            if !declared.foreign_keys.contains_key(name) {
                result
                    .foreign_keys
                    .push(ForeignKeyCompareResult::deleted(live.to_definition()));
            }
        }

        if result.is_empty() {
            return Ok(None);
        }
        debug!(
            table = %declared.name,
            columns = result.columns.len(),
            indexes = result.indexes.len(),
            foreign_keys = result.foreign_keys.len(),
            "Table differs"
        );
        Ok(Some(result))
    }

    fn entity_table(
        &self,
        entity: &EntityDescriptor,
    ) -> std::result::Result<TableSchema, ConfigurationError> {
        let mut table = TableSchema::new(&entity.table_name);
        for column in &entity.columns {
            table.add_column(column.clone());
        }
        table.set_primary_key(&entity.primary_key_columns());
        for index in &entity.indexes {
            table.indexes.insert(index.name.clone(), index.clone());
        }

        for relation in &entity.relations {
            match &relation.kind {
                RelationKind::ManyToOne(join) => {
                    self.add_join_column(&mut table, relation, join, false)?;
                }
                RelationKind::OneToOne(join)
                    if relation.owning_side && relation.foreign_key_required =>
                {
                    self.add_join_column(&mut table, relation, join, true)?;
                }
                RelationKind::MorphTo(columns) => add_morph_columns(&mut table, columns),
                _ => {}
            }
        }

        self.resolve_types(&mut table);
        Ok(table)
    }

    fn add_join_column(
        &self,
        table: &mut TableSchema,
        relation: &RelationDescriptor,
        join: &JoinColumn,
        unique: bool,
    ) -> std::result::Result<(), ConfigurationError> {
        let target = target_entity(relation, self.entities)?;
        let referenced = target.referenced_column(join.referenced_column.as_deref())?;
        let name = join
            .name
            .clone()
            .unwrap_or_else(|| format!("{}_{}", relation.property_name, referenced.name));

        if !table.columns.contains_key(&name) {
            let mut column = ColumnDefinition::referencing(&name, referenced);
            column.nullable = join.nullable;
            table.add_column(column);
        }
        if unique {
            let index = IndexDefinition::for_columns(&table.name, &[&name], true);
            table.indexes.insert(index.name.clone(), index);
        }
        let foreign_key =
            ForeignKeyDefinition::new(&table.name, &name, &target.table_name, &referenced.name);
        table
            .foreign_keys
            .insert(foreign_key.name.clone(), foreign_key);
        Ok(())
    }

    fn merge_shared(
        &self,
        group: &mut TableSchema,
        incoming: TableSchema,
    ) -> std::result::Result<(), ConfigurationError> {
        let incoming_primary = incoming.primary_key_columns().to_vec();
        for (name, column) in incoming.columns {
            let Some(existing) = group.columns.get_mut(&name) else {
                group.add_column(column);
                continue;
            };
            let first = self.mapper.column_type(existing);
            let second = self.mapper.column_type(&column);
            if !self.mapper.types_match(&first, &second) {
                return Err(ConfigurationError::SharedColumnConflict {
                    table: group.name.clone(),
                    column: name,
                    first,
                    second,
                });
            }
            if column.nullable && !existing.primary_key {
                existing.nullable = true;
            }
        }
        for (name, index) in incoming.indexes {
            group.indexes.entry(name).or_insert(index);
        }
        for (name, foreign_key) in incoming.foreign_keys {
            group.foreign_keys.entry(name).or_insert(foreign_key);
        }

        let mut primary: Vec<String> = group.primary_key_columns().to_vec();
        primary.extend(incoming_primary);
        group.set_primary_key(&primary);
        Ok(())
    }

    fn resolve_types(&self, table: &mut TableSchema) {
        for column in table.columns.values_mut() {
            if column.physical_type.is_none() {
                column.physical_type = Some(self.mapper.column_type(column));
            }
        }
    }
}

fn add_morph_columns(table: &mut TableSchema, columns: &MorphColumns) {
    if !table.columns.contains_key(&columns.type_column) {
        table.add_column(
            ColumnDefinition::new(&columns.type_column, LogicalType::String)
                .length(DEFAULT_STRING_LENGTH)
                .not_null(),
        );
    }
    if !table.columns.contains_key(&columns.id_column) {
        table.add_column(ColumnDefinition::new(&columns.id_column, columns.id_type.clone()).not_null());
    }
    let index = IndexDefinition::for_columns(
        &table.name,
        &[&columns.type_column, &columns.id_column],
        false,
    );
    table.indexes.insert(index.name.clone(), index);
}
