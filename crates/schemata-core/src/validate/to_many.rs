use super::{
    counterpart, kind_mismatch, reference_mismatch, require_exclusive_markers, target_entity,
    RelationValidator,
};
use crate::entity::EntityMetadataProvider;
use crate::error::ConfigurationError;
use crate::relation::{RelationDescriptor, RelationKind};

/// Validates many-to-one relations and their optional one-to-many inverse.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManyToOneValidator;

impl RelationValidator for ManyToOneValidator {
    fn name(&self) -> &'static str {
        "many-to-one"
    }

    fn validate(
        &self,
        relation: &RelationDescriptor,
        entities: &dyn EntityMetadataProvider,
    ) -> Result<(), ConfigurationError> {
        require_exclusive_markers(relation)?;
        let target = target_entity(relation, entities)?;

        let Some(inverse_name) = relation.inversed_by.as_deref() else {
            return Ok(());
        };
        let inverse = counterpart(relation, target, inverse_name)?;
        if !matches!(inverse.kind, RelationKind::OneToMany) {
            return Err(kind_mismatch(
                relation,
                inverse,
                "one-to-many",
                inverse.kind_name(),
            ));
        }
        let points_back = inverse.mapped_by.as_deref() == Some(relation.property_name.as_str());
        let targets_us = inverse.target_entity.as_deref() == Some(relation.declaring_entity.as_str());
        if !points_back || !targets_us {
            return Err(reference_mismatch(relation, inverse));
        }
        Ok(())
    }
}

/// Validates one-to-many relations, which are always inverse.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneToManyValidator;

impl RelationValidator for OneToManyValidator {
    fn name(&self) -> &'static str {
        "one-to-many"
    }

    fn validate(
        &self,
        relation: &RelationDescriptor,
        entities: &dyn EntityMetadataProvider,
    ) -> Result<(), ConfigurationError> {
        require_exclusive_markers(relation)?;
        let target = target_entity(relation, entities)?;

        let Some(owner_name) = relation.mapped_by.as_deref() else {
            return Err(ConfigurationError::MissingOwningReference {
                entity: relation.declaring_entity.clone(),
                property: relation.property_name.clone(),
                marker: "mapped_by",
            });
        };
        let owner = counterpart(relation, target, owner_name)?;
        if !matches!(owner.kind, RelationKind::ManyToOne(_)) {
            return Err(kind_mismatch(relation, owner, "many-to-one", owner.kind_name()));
        }
        if owner.mapped_by.is_some() {
            return Err(kind_mismatch(
                relation,
                owner,
                "owning many-to-one",
                "inverse many-to-one",
            ));
        }
        if owner
            .inversed_by
            .as_deref()
            .is_some_and(|name| name != relation.property_name)
        {
            return Err(reference_mismatch(relation, owner));
        }
        Ok(())
    }
}
