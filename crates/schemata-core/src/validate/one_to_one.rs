use super::{
    counterpart, kind_mismatch, reference_mismatch, require_exclusive_markers, target_entity,
    RelationValidator,
};
use crate::entity::EntityMetadataProvider;
use crate::error::ConfigurationError;
use crate::relation::{RelationDescriptor, RelationKind};

/// Validates one-to-one relations.
///
/// Only one side may carry the foreign key. The owning side must find its
/// inverse, and the inverse must point back through `mapped_by`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OneToOneValidator;

impl RelationValidator for OneToOneValidator {
    fn name(&self) -> &'static str {
        "one-to-one"
    }

    fn validate(
        &self,
        relation: &RelationDescriptor,
        entities: &dyn EntityMetadataProvider,
    ) -> Result<(), ConfigurationError> {
        require_exclusive_markers(relation)?;
        let target = target_entity(relation, entities)?;

        if relation.owning_side && relation.foreign_key_required {
            let Some(inverse_name) = relation.inversed_by.as_deref() else {
                return Ok(());
            };
            let inverse = counterpart(relation, target, inverse_name)?;
            if !matches!(inverse.kind, RelationKind::OneToOne(_)) {
                return Err(kind_mismatch(
                    relation,
                    inverse,
                    "one-to-one",
                    inverse.kind_name(),
                ));
            }
            if inverse.mapped_by.as_deref() != Some(relation.property_name.as_str()) {
                return Err(reference_mismatch(relation, inverse));
            }
            if inverse.foreign_key_required {
                return Err(conflicting_owner(relation, inverse));
            }
            return Ok(());
        }

        if let Some(owner_name) = relation.mapped_by.as_deref() {
            let owner = counterpart(relation, target, owner_name)?;
            if !matches!(owner.kind, RelationKind::OneToOne(_)) {
                return Err(kind_mismatch(relation, owner, "one-to-one", owner.kind_name()));
            }
            if owner
                .inversed_by
                .as_deref()
                .is_some_and(|name| name != relation.property_name)
            {
                return Err(reference_mismatch(relation, owner));
            }
            if relation.foreign_key_required && owner.foreign_key_required {
                return Err(conflicting_owner(relation, owner));
            }
        }
        Ok(())
    }
}

fn conflicting_owner(relation: &RelationDescriptor, other: &RelationDescriptor) -> ConfigurationError {
    ConfigurationError::ConflictingForeignKeyOwner {
        entity: relation.declaring_entity.clone(),
        property: relation.property_name.clone(),
        target: other.declaring_entity.clone(),
        inverse: other.property_name.clone(),
    }
}
