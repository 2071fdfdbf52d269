//! Mapping-table collector.
//!
//! Walks every owning many-to-many and every morph-to-many relation and
//! produces one table definition per resolved mapping-table name. Relations
//! that land on the same table are merged; any disagreement on join columns
//! or extra-property shape is a configuration error.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entity::{EntityDescriptor, EntityMetadataProvider};
use crate::error::ConfigurationError;
use crate::morph::MorphMap;
use crate::relation::{
    MappingTableProperty, MappingTableSpec, MorphMapping, RelationDescriptor, RelationKind,
};
use crate::schema::{ColumnDefinition, ForeignKeyDefinition, LogicalType, TableSchema};
use crate::types::DEFAULT_STRING_LENGTH;
use crate::validate::target_entity;

/// Kind of a collected mapping table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MappingKind {
    /// Plain many-to-many.
    ManyToMany,
    /// Polymorphic many-to-many.
    MorphToMany {
        /// Shared morph name.
        morph_name: String,
        /// Column storing the morph type alias.
        type_column: String,
        /// Aliases of every contributing morphable entity.
        morph_types: Vec<String>,
    },
}

/// Resolved definition of one mapping table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingTableDefinition {
    /// Table name.
    pub name: String,
    /// Plain or polymorphic.
    pub kind: MappingKind,
    /// Table of the first owning entity.
    pub owner_table: String,
    /// Table of the target entity.
    pub target_table: String,
    /// Column referencing the owner (the morph id column for morph tables).
    pub owner_join_column: ColumnDefinition,
    /// Column referencing the target.
    pub target_join_column: ColumnDefinition,
    /// Owner column referenced by the owner join column.
    pub owner_referenced_column: String,
    /// Target column referenced by the target join column.
    pub target_referenced_column: String,
    /// Extra columns keyed by name.
    pub extra_properties: IndexMap<String, MappingTableProperty>,
    /// Contributing relations as `Entity::property`.
    pub sources: Vec<String>,
}

impl MappingTableDefinition {
    /// Returns the primary-key columns, sorted.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<String> {
        let mut columns = vec![
            self.owner_join_column.name.clone(),
            self.target_join_column.name.clone(),
        ];
        if let MappingKind::MorphToMany { type_column, .. } = &self.kind {
            columns.push(type_column.clone());
        }
        columns.sort();
        columns
    }

    /// Builds the declared table.
    ///
    /// Morph tables carry no foreign key on the polymorphic side.
    #[must_use]
    pub fn to_table_schema(&self) -> TableSchema {
        let mut table = TableSchema::new(&self.name);
        table.add_column(self.owner_join_column.clone().not_null());
        if let MappingKind::MorphToMany { type_column, .. } = &self.kind {
            table.add_column(
                ColumnDefinition::new(type_column, LogicalType::String)
                    .length(DEFAULT_STRING_LENGTH)
                    .not_null(),
            );
        }
        table.add_column(self.target_join_column.clone().not_null());
        for property in self.extra_properties.values() {
            let mut column = ColumnDefinition::new(&property.name, property.logical_type.clone());
            column.nullable = property.nullable;
            column.length = property.length;
            column.default.clone_from(&property.default);
            table.add_column(column);
        }
        table.set_primary_key(&self.primary_key_columns());

        if self.kind == MappingKind::ManyToMany {
            table = table.foreign_key(ForeignKeyDefinition::new(
                &self.name,
                &self.owner_join_column.name,
                &self.owner_table,
                &self.owner_referenced_column,
            ));
        }
        table.foreign_key(ForeignKeyDefinition::new(
            &self.name,
            &self.target_join_column.name,
            &self.target_table,
            &self.target_referenced_column,
        ))
    }

    fn join_columns(&self) -> HashSet<&str> {
        let mut columns = HashSet::from([
            self.owner_join_column.name.as_str(),
            self.target_join_column.name.as_str(),
        ]);
        if let MappingKind::MorphToMany { type_column, .. } = &self.kind {
            columns.insert(type_column.as_str());
        }
        columns
    }

    fn merge(&mut self, incoming: Self) -> Result<(), ConfigurationError> {
        match (&self.kind, &incoming.kind) {
            (
                MappingKind::MorphToMany {
                    morph_name,
                    type_column,
                    ..
                },
                MappingKind::MorphToMany {
                    morph_name: other_name,
                    type_column: other_column,
                    ..
                },
            ) => {
                if morph_name != other_name {
                    return Err(ConfigurationError::MorphNameMismatch {
                        table: self.name.clone(),
                        first: morph_name.clone(),
                        second: other_name.clone(),
                    });
                }
                if type_column != other_column {
                    return Err(ConfigurationError::JoinColumnMismatch {
                        table: self.name.clone(),
                        role: "morph type column",
                        first: type_column.clone(),
                        second: other_column.clone(),
                    });
                }
            }
            (MappingKind::ManyToMany, MappingKind::ManyToMany) => {}
            _ => {
                return Err(ConfigurationError::MappingTableCollision {
                    table: self.name.clone(),
                });
            }
        }

        let pairs = [
            (
                "owner join column",
                &self.owner_join_column.name,
                &incoming.owner_join_column.name,
            ),
            (
                "target join column",
                &self.target_join_column.name,
                &incoming.target_join_column.name,
            ),
            (
                "owner referenced column",
                &self.owner_referenced_column,
                &incoming.owner_referenced_column,
            ),
            (
                "target referenced column",
                &self.target_referenced_column,
                &incoming.target_referenced_column,
            ),
        ];
        for (role, first, second) in pairs {
            if first != second {
                return Err(ConfigurationError::JoinColumnMismatch {
                    table: self.name.clone(),
                    role,
                    first: first.clone(),
                    second: second.clone(),
                });
            }
        }

        if let (
            MappingKind::MorphToMany { morph_types, .. },
            MappingKind::MorphToMany {
                morph_types: other_types,
                ..
            },
        ) = (&mut self.kind, incoming.kind)
        {
            for alias in other_types {
                if !morph_types.contains(&alias) {
                    morph_types.push(alias);
                }
            }
        }

        for property in incoming.extra_properties.into_values() {
            self.add_property(property)?;
        }
        self.sources.extend(incoming.sources);
        Ok(())
    }

    fn add_property(&mut self, property: MappingTableProperty) -> Result<(), ConfigurationError> {
        if self.join_columns().contains(property.name.as_str()) {
            return Err(self.property_conflict(&property.name, "collides with a join column".into()));
        }
        if !self.extra_properties.contains_key(&property.name) {
            self.extra_properties
                .insert(property.name.clone(), property);
            return Ok(());
        }
        let existing = &self.extra_properties[&property.name];

        let detail = if existing.logical_type != property.logical_type {
            Some(format!(
                "type {} vs {}",
                existing.logical_type.key(),
                property.logical_type.key()
            ))
        } else if existing.length != property.length {
            Some(format!(
                "length {:?} vs {:?}",
                existing.length, property.length
            ))
        } else if existing.default != property.default {
            Some(format!(
                "default {:?} vs {:?}",
                existing.default, property.default
            ))
        } else {
            None
        };
        if let Some(detail) = detail {
            return Err(self.property_conflict(&property.name, detail));
        }

        // Nullability only ever widens.
        if property.nullable {
            if let Some(existing) = self.extra_properties.get_mut(&property.name) {
                existing.nullable = true;
            }
        }
        Ok(())
    }

    fn property_conflict(&self, property: &str, detail: String) -> ConfigurationError {
        ConfigurationError::ExtraPropertyConflict {
            table: self.name.clone(),
            property: property.to_string(),
            detail,
        }
    }
}

/// Collected mapping tables, each map in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedMappings {
    /// Many-to-many tables.
    pub many_to_many: IndexMap<String, MappingTableDefinition>,
    /// Morph-to-many tables.
    pub morph_to_many: IndexMap<String, MappingTableDefinition>,
}

impl CollectedMappings {
    /// Iterates many-to-many tables, then morph-to-many tables.
    pub fn iter(&self) -> impl Iterator<Item = &MappingTableDefinition> {
        self.many_to_many.values().chain(self.morph_to_many.values())
    }
}

/// Default many-to-many table name: both table names, sorted, joined by `_`.
#[must_use]
pub fn default_mapping_table_name(owner_table: &str, target_table: &str) -> String {
    let mut tables = [owner_table, target_table];
    tables.sort_unstable();
    tables.join("_")
}

/// Resolves mapping-table definitions from entity metadata.
pub struct MappingCollector<'a> {
    entities: &'a dyn EntityMetadataProvider,
    morph_map: &'a MorphMap,
}

impl<'a> MappingCollector<'a> {
    /// Creates a collector over an entity set.
    #[must_use]
    pub fn new(entities: &'a dyn EntityMetadataProvider, morph_map: &'a MorphMap) -> Self {
        Self {
            entities,
            morph_map,
        }
    }

    /// Collects every mapping table.
    ///
    /// The result depends only on the entity set and its order, so repeated
    /// runs produce identical output.
    ///
    /// # Errors
    ///
    /// Fails on unresolved targets or referenced columns, on relations that
    /// disagree about a shared table, and on table-name collisions.
    pub fn collect(&self) -> Result<CollectedMappings, ConfigurationError> {
        let mut collected = CollectedMappings::default();

        for entity in self.entities.entities().iter().filter(|e| e.is_entity) {
            for relation in &entity.relations {
                match &relation.kind {
                    RelationKind::ManyToMany(spec)
                        if relation.owning_side && relation.mapped_by.is_none() =>
                    {
                        let definition = self.many_to_many(entity, relation, spec)?;
                        merge_into(&mut collected.many_to_many, definition)?;
                    }
                    RelationKind::MorphToMany(morph) => {
                        let definition = self.morph_to_many(entity, relation, morph)?;
                        merge_into(&mut collected.morph_to_many, definition)?;
                    }
                    _ => {}
                }
            }
        }

        let entity_tables: HashSet<&str> = self
            .entities
            .entities()
            .iter()
            .filter(|e| e.is_entity)
            .map(|e| e.table_name.as_str())
            .collect();
        for name in collected.many_to_many.keys() {
            if collected.morph_to_many.contains_key(name) || entity_tables.contains(name.as_str()) {
                return Err(ConfigurationError::MappingTableCollision {
                    table: name.clone(),
                });
            }
        }
        if let Some(name) = collected
            .morph_to_many
            .keys()
            .find(|name| entity_tables.contains(name.as_str()))
        {
            return Err(ConfigurationError::MappingTableCollision {
                table: name.clone(),
            });
        }

        for definition in collected.iter() {
            debug!(
                table = %definition.name,
                sources = definition.sources.len(),
                "Mapping table collected"
            );
        }
        Ok(collected)
    }

    fn many_to_many(
        &self,
        owner: &EntityDescriptor,
        relation: &RelationDescriptor,
        spec: &MappingTableSpec,
    ) -> Result<MappingTableDefinition, ConfigurationError> {
        let target = target_entity(relation, self.entities)?;
        let owner_ref = owner.referenced_column(spec.owner_referenced_column.as_deref())?;
        let target_ref = target.referenced_column(spec.target_referenced_column.as_deref())?;

        let name = spec
            .table_name
            .clone()
            .unwrap_or_else(|| default_mapping_table_name(&owner.table_name, &target.table_name));
        let owner_join = spec
            .owner_join_column
            .clone()
            .unwrap_or_else(|| format!("{}_{}", owner.table_name, owner_ref.name));
        let target_join = spec
            .target_join_column
            .clone()
            .unwrap_or_else(|| format!("{}_{}", target.table_name, target_ref.name));

        seed_definition(
            name,
            MappingKind::ManyToMany,
            (owner, owner_ref, owner_join),
            (target, target_ref, target_join),
            relation,
            &spec.extra_properties,
        )
    }

    fn morph_to_many(
        &self,
        owner: &EntityDescriptor,
        relation: &RelationDescriptor,
        morph: &MorphMapping,
    ) -> Result<MappingTableDefinition, ConfigurationError> {
        let spec = &morph.mapping;
        let target = target_entity(relation, self.entities)?;
        let owner_ref = owner.referenced_column(spec.owner_referenced_column.as_deref())?;
        let target_ref = target.referenced_column(spec.target_referenced_column.as_deref())?;
        let target_join = spec
            .target_join_column
            .clone()
            .unwrap_or_else(|| format!("{}_{}", target.table_name, target_ref.name));

        let kind = MappingKind::MorphToMany {
            morph_name: morph.morph_name.clone(),
            type_column: morph.type_column(),
            morph_types: vec![self.morph_map.alias_for(&owner.name).to_string()],
        };
        seed_definition(
            morph.table_name(),
            kind,
            (owner, owner_ref, morph.id_column()),
            (target, target_ref, target_join),
            relation,
            &spec.extra_properties,
        )
    }
}

fn seed_definition(
    name: String,
    kind: MappingKind,
    (owner, owner_ref, owner_join): (&EntityDescriptor, &ColumnDefinition, String),
    (target, target_ref, target_join): (&EntityDescriptor, &ColumnDefinition, String),
    relation: &RelationDescriptor,
    extra_properties: &[MappingTableProperty],
) -> Result<MappingTableDefinition, ConfigurationError> {
    if owner_join == target_join {
        return Err(ConfigurationError::DuplicateJoinColumns {
            table: name,
            column: owner_join,
        });
    }
    let mut definition = MappingTableDefinition {
        owner_table: owner.table_name.clone(),
        target_table: target.table_name.clone(),
        owner_join_column: ColumnDefinition::referencing(owner_join, owner_ref).not_null(),
        target_join_column: ColumnDefinition::referencing(target_join, target_ref).not_null(),
        owner_referenced_column: owner_ref.name.clone(),
        target_referenced_column: target_ref.name.clone(),
        extra_properties: IndexMap::new(),
        sources: vec![format!(
            "{}::{}",
            relation.declaring_entity, relation.property_name
        )],
        kind,
        name,
    };
    for property in extra_properties {
        definition.add_property(property.clone())?;
    }
    Ok(definition)
}

fn merge_into(
    tables: &mut IndexMap<String, MappingTableDefinition>,
    definition: MappingTableDefinition,
) -> Result<(), ConfigurationError> {
    match tables.get_mut(&definition.name) {
        Some(existing) => existing.merge(definition),
        None => {
            tables.insert(definition.name.clone(), definition);
            Ok(())
        }
    }
}
