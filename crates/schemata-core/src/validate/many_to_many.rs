use super::{
    counterpart, kind_mismatch, reference_mismatch, require_exclusive_markers, target_entity,
    RelationValidator,
};
use crate::entity::EntityMetadataProvider;
use crate::error::ConfigurationError;
use crate::relation::{RelationDescriptor, RelationKind};

/// Validates many-to-many relations from either side.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManyToManyValidator;

impl RelationValidator for ManyToManyValidator {
    fn name(&self) -> &'static str {
        "many-to-many"
    }

    fn validate(
        &self,
        relation: &RelationDescriptor,
        entities: &dyn EntityMetadataProvider,
    ) -> Result<(), ConfigurationError> {
        require_exclusive_markers(relation)?;
        let target = target_entity(relation, entities)?;
        let RelationKind::ManyToMany(spec) = &relation.kind else {
            return Ok(());
        };

        let other = if relation.owning_side {
            let Some(inverse_name) = relation.inversed_by.as_deref() else {
                return Err(missing_marker(relation, "inversed_by"));
            };
            let inverse = counterpart(relation, target, inverse_name)?;
            if !matches!(inverse.kind, RelationKind::ManyToMany(_)) {
                return Err(kind_mismatch(
                    relation,
                    inverse,
                    "many-to-many",
                    inverse.kind_name(),
                ));
            }
            if inverse.mapped_by.as_deref() != Some(relation.property_name.as_str()) {
                return Err(reference_mismatch(relation, inverse));
            }
            inverse
        } else {
            if spec.has_extra_properties() {
                return Err(ConfigurationError::InverseDeclaresExtraProperties {
                    entity: relation.declaring_entity.clone(),
                    property: relation.property_name.clone(),
                });
            }
            let Some(owner_name) = relation.mapped_by.as_deref() else {
                return Err(missing_marker(relation, "mapped_by"));
            };
            let owner = counterpart(relation, target, owner_name)?;
            if !matches!(owner.kind, RelationKind::ManyToMany(_)) {
                return Err(kind_mismatch(
                    relation,
                    owner,
                    "many-to-many",
                    owner.kind_name(),
                ));
            }
            if owner.inversed_by.as_deref() != Some(relation.property_name.as_str()) {
                return Err(reference_mismatch(relation, owner));
            }
            owner
        };

        let other_table = other
            .mapping_spec()
            .and_then(|other_spec| other_spec.table_name.as_deref());
        if let (Some(table), Some(other_table)) = (spec.table_name.as_deref(), other_table) {
            if table != other_table {
                return Err(ConfigurationError::MappingTableNameMismatch {
                    entity: relation.declaring_entity.clone(),
                    property: relation.property_name.clone(),
                    table: table.to_string(),
                    other: other_table.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn missing_marker(relation: &RelationDescriptor, marker: &'static str) -> ConfigurationError {
    ConfigurationError::MissingOwningReference {
        entity: relation.declaring_entity.clone(),
        property: relation.property_name.clone(),
        marker,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityDescriptor, EntityRegistry};
    use crate::relation::{MappingTableProperty, MappingTableSpec};
    use crate::schema::{ColumnDefinition, LogicalType};

    fn registry(post: RelationDescriptor, tag: RelationDescriptor) -> EntityRegistry {
        let id = || ColumnDefinition::new("id", LogicalType::BigInt).primary_key();
        EntityRegistry::from_entities([
            EntityDescriptor::new("Post", "post").column(id()).relation(post),
            EntityDescriptor::new("Tag", "tag").column(id()).relation(tag),
        ])
        .unwrap()
    }

    fn check(registry: &EntityRegistry, entity: &str) -> Result<(), ConfigurationError> {
        let relation = &registry.entity(entity).unwrap().relations[0];
        ManyToManyValidator.validate(relation, registry)
    }

    #[test]
    fn test_valid_pair() {
        let registry = registry(
            RelationDescriptor::many_to_many("Post", "tags", "Tag").inversed_by("posts"),
            RelationDescriptor::many_to_many("Tag", "posts", "Post").mapped_by("tags"),
        );
        assert!(check(&registry, "Post").is_ok());
        assert!(check(&registry, "Tag").is_ok());
    }

    #[test]
    fn test_both_markers_conflict() {
        let registry = registry(
            RelationDescriptor::many_to_many("Post", "tags", "Tag").inversed_by("posts"),
            RelationDescriptor::many_to_many("Tag", "posts", "Post")
                .mapped_by("tags")
                .inversed_by("tags"),
        );
        assert!(matches!(
            check(&registry, "Tag"),
            Err(ConfigurationError::ConflictingOwnershipMarkers { .. })
        ));
    }

    #[test]
    fn test_owning_side_names_inverse() {
        let registry = registry(
            RelationDescriptor::many_to_many("Post", "tags", "Tag"),
            RelationDescriptor::many_to_many("Tag", "posts", "Post").mapped_by("tags"),
        );
        assert!(matches!(
            check(&registry, "Post"),
            Err(ConfigurationError::MissingOwningReference { marker: "inversed_by", .. })
        ));
        assert!(matches!(
            check(&registry, "Tag"),
            Err(ConfigurationError::InverseReferenceMismatch { .. })
        ));
    }

    #[test]
    fn test_inverse_rejects_extra_properties() {
        let registry = registry(
            RelationDescriptor::many_to_many("Post", "tags", "Tag").inversed_by("posts"),
            RelationDescriptor::many_to_many("Tag", "posts", "Post")
                .mapped_by("tags")
                .mapping(MappingTableSpec {
                    extra_properties: vec![MappingTableProperty::new("position", LogicalType::Integer)],
                    ..MappingTableSpec::default()
                }),
        );
        assert!(matches!(
            check(&registry, "Tag"),
            Err(ConfigurationError::InverseDeclaresExtraProperties { .. })
        ));
    }

    #[test]
    fn test_explicit_table_names_must_match() {
        let named = |name: &str| MappingTableSpec {
            table_name: Some(name.to_string()),
            ..MappingTableSpec::default()
        };
        let registry = registry(
            RelationDescriptor::many_to_many("Post", "tags", "Tag")
                .inversed_by("posts")
                .mapping(named("post_tags")),
            RelationDescriptor::many_to_many("Tag", "posts", "Post")
                .mapped_by("tags")
                .mapping(named("tagging")),
        );
        assert!(matches!(
            check(&registry, "Post"),
            Err(ConfigurationError::MappingTableNameMismatch { table, other, .. })
                if table == "post_tags" && other == "tagging"
        ));
    }
}
