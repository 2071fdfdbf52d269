//! Entity descriptors and the metadata provider seam.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::relation::RelationDescriptor;
use crate::schema::{ColumnDefinition, IndexDefinition};

const fn entity_by_default() -> bool {
    true
}

/// Persistence metadata of one class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    /// Entity name.
    pub name: String,
    /// Whether the class maps to a table. Embeddables and mapped
    /// superclasses set this to false.
    #[serde(default = "entity_by_default")]
    pub is_entity: bool,
    /// Backing table name.
    pub table_name: String,
    /// Primary-key column names.
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Declared columns, in order.
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
    /// Declared indexes.
    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,
    /// Declared relations, in order.
    #[serde(default)]
    pub relations: Vec<RelationDescriptor>,
}

impl EntityDescriptor {
    /// Creates an entity mapped to `table_name`.
    #[must_use]
    pub fn new(name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_entity: true,
            table_name: table_name.into(),
            primary_key: Vec::new(),
            columns: Vec::new(),
            indexes: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Adds a column. Primary-key columns join the primary key.
    #[must_use]
    pub fn column(mut self, column: ColumnDefinition) -> Self {
        if column.primary_key && !self.primary_key.contains(&column.name) {
            self.primary_key.push(column.name.clone());
        }
        self.columns.push(column);
        self
    }

    /// Adds an index.
    #[must_use]
    pub fn index(mut self, index: IndexDefinition) -> Self {
        self.indexes.push(index);
        self
    }

    /// Adds a relation, stamping this entity as its declarer.
    #[must_use]
    pub fn relation(mut self, mut relation: RelationDescriptor) -> Self {
        relation.declaring_entity.clone_from(&self.name);
        self.relations.push(relation);
        self
    }

    /// Marks this descriptor as a non-entity (embeddable, mapped superclass).
    #[must_use]
    pub fn not_entity(mut self) -> Self {
        self.is_entity = false;
        self
    }

    /// Looks up a relation by property name.
    #[must_use]
    pub fn find_relation(&self, property: &str) -> Option<&RelationDescriptor> {
        self.relations.iter().find(|r| r.property_name == property)
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns the primary-key columns sorted by name, including columns
    /// flagged as primary key but missing from the list.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<String> {
        let mut columns = self.primary_key.clone();
        columns.extend(
            self.columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.name.clone()),
        );
        columns.sort();
        columns.dedup();
        columns
    }

    /// Resolves the column other tables reference: the explicit one, or the
    /// single primary-key column.
    ///
    /// # Errors
    ///
    /// Fails when the column is not declared, or when no column is given and
    /// the primary key does not have exactly one column.
    pub fn referenced_column(
        &self,
        explicit: Option<&str>,
    ) -> Result<&ColumnDefinition, ConfigurationError> {
        let name = match explicit {
            Some(name) => name.to_string(),
            None => {
                let primary = self.primary_key_columns();
                let [single] = primary.as_slice() else {
                    return Err(ConfigurationError::AmbiguousReferencedColumn {
                        entity: self.name.clone(),
                        count: primary.len(),
                    });
                };
                single.clone()
            }
        };
        self.find_column(&name)
            .ok_or(ConfigurationError::UnknownReferencedColumn {
                entity: self.name.clone(),
                column: name,
            })
    }
}

/// Source of entity metadata.
pub trait EntityMetadataProvider {
    /// Returns every known descriptor in a stable order.
    fn entities(&self) -> &[EntityDescriptor];

    /// Looks up a descriptor by entity name.
    fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.entities().iter().find(|e| e.name == name)
    }
}

/// In-memory, registration-ordered entity metadata.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: Vec<EntityDescriptor>,
    by_name: HashMap<String, usize>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from descriptors, in order.
    ///
    /// # Errors
    ///
    /// Fails on a duplicated entity name.
    pub fn from_entities(
        entities: impl IntoIterator<Item = EntityDescriptor>,
    ) -> Result<Self, ConfigurationError> {
        let mut registry = Self::new();
        for entity in entities {
            registry.register(entity)?;
        }
        Ok(registry)
    }

    /// Registers a descriptor.
    ///
    /// Relations are stamped with the entity name so descriptors loaded from
    /// files need not repeat it.
    ///
    /// # Errors
    ///
    /// Fails when an entity with the same name is already registered.
    pub fn register(&mut self, mut entity: EntityDescriptor) -> Result<(), ConfigurationError> {
        if self.by_name.contains_key(&entity.name) {
            return Err(ConfigurationError::DuplicateEntity {
                entity: entity.name,
            });
        }
        for relation in &mut entity.relations {
            relation.declaring_entity.clone_from(&entity.name);
        }
        self.by_name.insert(entity.name.clone(), self.entities.len());
        self.entities.push(entity);
        Ok(())
    }

    /// Returns the number of registered descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl EntityMetadataProvider for EntityRegistry {
    fn entities(&self) -> &[EntityDescriptor] {
        &self.entities
    }

    fn entity(&self, name: &str) -> Option<&EntityDescriptor> {
        self.by_name.get(name).map(|&index| &self.entities[index])
    }
}
