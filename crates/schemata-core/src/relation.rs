//! Relation descriptors.
//!
//! A relation is declared on one entity and points at another. Ownership is
//! explicit: the owning side carries the join column or mapping table, the
//! inverse side names the owning property through `mapped_by`.

use serde::{Deserialize, Serialize};

use crate::schema::{DefaultValue, LogicalType};

/// One declared relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    /// Entity declaring the relation. Filled in on registration.
    #[serde(default)]
    pub declaring_entity: String,
    /// Property name on the declaring entity.
    pub property_name: String,
    /// Target entity; absent for morph-to relations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_entity: Option<String>,
    /// Whether this side owns the relation.
    #[serde(default)]
    pub owning_side: bool,
    /// Owning property on the target, when this is the inverse side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_by: Option<String>,
    /// Inverse property on the target, when this is the owning side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inversed_by: Option<String>,
    /// Whether this side must carry the foreign key.
    #[serde(default)]
    pub foreign_key_required: bool,
    /// Kind-specific data.
    pub kind: RelationKind,
}

/// Relation kind with its kind-specific mapping data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelationKind {
    /// One-to-one.
    OneToOne(JoinColumn),
    /// Many-to-one; always owning.
    ManyToOne(JoinColumn),
    /// One-to-many; always the inverse of a many-to-one.
    OneToMany,
    /// Many-to-many through a mapping table.
    ManyToMany(MappingTableSpec),
    /// Polymorphic one-to-one inverse.
    MorphOne(MorphInverse),
    /// Polymorphic one-to-many inverse.
    MorphMany(MorphInverse),
    /// Polymorphic owning side; stores a type and an id column.
    MorphTo(MorphColumns),
    /// Polymorphic many-to-many, declared on the morphable entity.
    MorphToMany(MorphMapping),
    /// Inverse of [`RelationKind::MorphToMany`], declared on the related entity.
    MorphedByMany(MorphMapping),
}

impl RelationKind {
    /// Returns a stable kind name for diagnostics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::OneToOne(_) => "one-to-one",
            Self::ManyToOne(_) => "many-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToMany(_) => "many-to-many",
            Self::MorphOne(_) => "morph-one",
            Self::MorphMany(_) => "morph-many",
            Self::MorphTo(_) => "morph-to",
            Self::MorphToMany(_) => "morph-to-many",
            Self::MorphedByMany(_) => "morphed-by-many",
        }
    }
}

const fn nullable_by_default() -> bool {
    true
}

/// Join column of a to-one relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinColumn {
    /// Column name; defaults to `<property>_<referenced column>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Referenced column; defaults to the target's single primary key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referenced_column: Option<String>,
    /// Whether the join column allows NULL.
    #[serde(default = "nullable_by_default")]
    pub nullable: bool,
}

impl Default for JoinColumn {
    fn default() -> Self {
        Self {
            name: None,
            referenced_column: None,
            nullable: true,
        }
    }
}

/// Mapping table of a many-to-many relation.
///
/// Every name left unset is derived by the collector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingTableSpec {
    /// Mapping table name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    /// Column referencing the owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_join_column: Option<String>,
    /// Column referencing the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_join_column: Option<String>,
    /// Owner column referenced by the owner join column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_referenced_column: Option<String>,
    /// Target column referenced by the target join column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_referenced_column: Option<String>,
    /// Additional mapping-table columns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_properties: Vec<MappingTableProperty>,
}

impl MappingTableSpec {
    /// Returns whether the mapping table carries extra columns.
    #[must_use]
    pub fn has_extra_properties(&self) -> bool {
        !self.extra_properties.is_empty()
    }
}

/// Names a polymorphic counterpart on the target entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphInverse {
    /// Name of the morph-to property on the target.
    pub morph_name: String,
}

/// Columns of a morph-to relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MorphColumns {
    /// Column storing the related type alias.
    pub type_column: String,
    /// Column storing the related id.
    pub id_column: String,
    /// Logical type of the id column.
    #[serde(default = "default_morph_id_type")]
    pub id_type: LogicalType,
}

const fn default_morph_id_type() -> LogicalType {
    LogicalType::BigInt
}

/// Mapping of a polymorphic many-to-many relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MorphMapping {
    /// Morph name; prefixes the type and id columns and defaults the table name.
    pub morph_name: String,
    /// Type column; defaults to `<morph_name>_type`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_column: Option<String>,
    /// Shared mapping table columns. The owner join column is the morph id
    /// column, defaulting to `<morph_name>_id`.
    #[serde(default)]
    pub mapping: MappingTableSpec,
}

impl MorphMapping {
    /// Returns the resolved type column name.
    #[must_use]
    pub fn type_column(&self) -> String {
        self.type_column
            .clone()
            .unwrap_or_else(|| format!("{}_type", self.morph_name))
    }

    /// Returns the resolved id column name.
    #[must_use]
    pub fn id_column(&self) -> String {
        self.mapping
            .owner_join_column
            .clone()
            .unwrap_or_else(|| format!("{}_id", self.morph_name))
    }

    /// Returns the resolved mapping table name, `<morph_name>s` by default.
    #[must_use]
    pub fn table_name(&self) -> String {
        self.mapping
            .table_name
            .clone()
            .unwrap_or_else(|| format!("{}s", self.morph_name))
    }
}

/// Additional column on a mapping table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingTableProperty {
    /// Column name.
    pub name: String,
    /// Logical type.
    pub logical_type: LogicalType,
    /// Whether the column allows NULL.
    #[serde(default = "nullable_by_default")]
    pub nullable: bool,
    /// Length for bounded types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
}

impl MappingTableProperty {
    /// Creates a nullable property.
    #[must_use]
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
            nullable: true,
            length: None,
            default: None,
        }
    }

    /// Sets the property as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets the length.
    #[must_use]
    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: DefaultValue) -> Self {
        self.default = Some(value);
        self
    }
}

impl RelationDescriptor {
    fn base(declaring: &str, property: &str, target: Option<&str>, kind: RelationKind) -> Self {
        Self {
            declaring_entity: declaring.to_string(),
            property_name: property.to_string(),
            target_entity: target.map(ToString::to_string),
            owning_side: false,
            mapped_by: None,
            inversed_by: None,
            foreign_key_required: false,
            kind,
        }
    }

    /// Owning one-to-one relation carrying the foreign key.
    #[must_use]
    pub fn one_to_one(declaring: &str, property: &str, target: &str) -> Self {
        let mut relation = Self::base(
            declaring,
            property,
            Some(target),
            RelationKind::OneToOne(JoinColumn::default()),
        );
        relation.owning_side = true;
        relation.foreign_key_required = true;
        relation
    }

    /// Many-to-one relation. Always owning.
    #[must_use]
    pub fn many_to_one(declaring: &str, property: &str, target: &str) -> Self {
        let mut relation = Self::base(
            declaring,
            property,
            Some(target),
            RelationKind::ManyToOne(JoinColumn::default()),
        );
        relation.owning_side = true;
        relation.foreign_key_required = true;
        relation
    }

    /// One-to-many relation, the inverse of `target::mapped_by`.
    #[must_use]
    pub fn one_to_many(declaring: &str, property: &str, target: &str, mapped_by: &str) -> Self {
        Self::base(declaring, property, Some(target), RelationKind::OneToMany).mapped_by(mapped_by)
    }

    /// Owning many-to-many relation.
    #[must_use]
    pub fn many_to_many(declaring: &str, property: &str, target: &str) -> Self {
        let mut relation = Self::base(
            declaring,
            property,
            Some(target),
            RelationKind::ManyToMany(MappingTableSpec::default()),
        );
        relation.owning_side = true;
        relation
    }

    /// Polymorphic one-to-one inverse of `target::morph_name`.
    #[must_use]
    pub fn morph_one(declaring: &str, property: &str, target: &str, morph_name: &str) -> Self {
        Self::base(
            declaring,
            property,
            Some(target),
            RelationKind::MorphOne(MorphInverse {
                morph_name: morph_name.to_string(),
            }),
        )
    }

    /// Polymorphic one-to-many inverse of `target::morph_name`.
    #[must_use]
    pub fn morph_many(declaring: &str, property: &str, target: &str, morph_name: &str) -> Self {
        Self::base(
            declaring,
            property,
            Some(target),
            RelationKind::MorphMany(MorphInverse {
                morph_name: morph_name.to_string(),
            }),
        )
    }

    /// Polymorphic owning side with `<property>_type` and `<property>_id` columns.
    #[must_use]
    pub fn morph_to(declaring: &str, property: &str) -> Self {
        let mut relation = Self::base(
            declaring,
            property,
            None,
            RelationKind::MorphTo(MorphColumns {
                type_column: format!("{property}_type"),
                id_column: format!("{property}_id"),
                id_type: default_morph_id_type(),
            }),
        );
        relation.owning_side = true;
        relation
    }

    /// Polymorphic many-to-many, declared on the morphable entity.
    #[must_use]
    pub fn morph_to_many(declaring: &str, property: &str, target: &str, morph_name: &str) -> Self {
        let mut relation = Self::base(
            declaring,
            property,
            Some(target),
            RelationKind::MorphToMany(MorphMapping {
                morph_name: morph_name.to_string(),
                type_column: None,
                mapping: MappingTableSpec::default(),
            }),
        );
        relation.owning_side = true;
        relation
    }

    /// Inverse of a morph-to-many, declared on the related entity.
    #[must_use]
    pub fn morphed_by_many(declaring: &str, property: &str, target: &str, morph_name: &str) -> Self {
        Self::base(
            declaring,
            property,
            Some(target),
            RelationKind::MorphedByMany(MorphMapping {
                morph_name: morph_name.to_string(),
                type_column: None,
                mapping: MappingTableSpec::default(),
            }),
        )
    }

    /// Marks this side as the inverse of `target::property`.
    #[must_use]
    pub fn mapped_by(mut self, property: &str) -> Self {
        self.owning_side = false;
        self.foreign_key_required = false;
        self.mapped_by = Some(property.to_string());
        self
    }

    /// Names the inverse property on the target.
    #[must_use]
    pub fn inversed_by(mut self, property: &str) -> Self {
        self.inversed_by = Some(property.to_string());
        self
    }

    /// Sets whether this side carries the foreign key.
    #[must_use]
    pub fn foreign_key(mut self, required: bool) -> Self {
        self.foreign_key_required = required;
        self
    }

    /// Replaces the join column of a to-one relation.
    #[must_use]
    pub fn join_column(mut self, join: JoinColumn) -> Self {
        if let RelationKind::OneToOne(current) | RelationKind::ManyToOne(current) = &mut self.kind {
            *current = join;
        }
        self
    }

    /// Replaces the mapping spec of a (morph) many-to-many relation.
    #[must_use]
    pub fn mapping(mut self, spec: MappingTableSpec) -> Self {
        match &mut self.kind {
            RelationKind::ManyToMany(current) => *current = spec,
            RelationKind::MorphToMany(morph) | RelationKind::MorphedByMany(morph) => {
                morph.mapping = spec;
            }
            _ => {}
        }
        self
    }

    /// Replaces the columns of a morph-to relation.
    #[must_use]
    pub fn morph_columns(mut self, columns: MorphColumns) -> Self {
        if let RelationKind::MorphTo(current) = &mut self.kind {
            *current = columns;
        }
        self
    }

    /// Returns the kind name.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    /// Returns the mapping spec of a (morph) many-to-many relation.
    #[must_use]
    pub fn mapping_spec(&self) -> Option<&MappingTableSpec> {
        match &self.kind {
            RelationKind::ManyToMany(spec) => Some(spec),
            RelationKind::MorphToMany(morph) | RelationKind::MorphedByMany(morph) => {
                Some(&morph.mapping)
            }
            _ => None,
        }
    }

    /// Returns the target entity name, or an empty string.
    #[must_use]
    pub fn target(&self) -> &str {
        self.target_entity.as_deref().unwrap_or_default()
    }
}
