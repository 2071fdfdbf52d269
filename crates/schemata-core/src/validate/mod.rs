//! Relation validators.
//!
//! Every relation is checked by exactly one validator, picked by walking an
//! explicit list of `(predicate, validator)` pairs in priority order. The
//! first predicate that accepts the relation wins; a relation nothing accepts
//! is a configuration error.

mod many_to_many;
mod morph;
mod one_to_one;
mod to_many;

pub use many_to_many::ManyToManyValidator;
pub use morph::{MorphToManyValidator, PolymorphicValidator};
pub use one_to_one::OneToOneValidator;
pub use to_many::{ManyToOneValidator, OneToManyValidator};

use tracing::debug;

use crate::entity::{EntityDescriptor, EntityMetadataProvider};
use crate::error::ConfigurationError;
use crate::relation::{RelationDescriptor, RelationKind};

/// Checks one relation kind.
pub trait RelationValidator {
    /// Returns the validator name, for diagnostics.
    fn name(&self) -> &'static str;

    /// Validates a relation against the full entity set.
    ///
    /// # Errors
    ///
    /// Returns the first rule the relation violates.
    fn validate(
        &self,
        relation: &RelationDescriptor,
        entities: &dyn EntityMetadataProvider,
    ) -> Result<(), ConfigurationError>;
}

/// Decides whether a validator handles a relation.
pub type RelationPredicate = fn(&RelationDescriptor) -> bool;

/// A validator and the predicate that selects it.
pub struct ValidatorEntry {
    predicate: RelationPredicate,
    validator: Box<dyn RelationValidator>,
}

impl ValidatorEntry {
    /// Pairs a predicate with a validator.
    pub fn new(predicate: RelationPredicate, validator: impl RelationValidator + 'static) -> Self {
        Self {
            predicate,
            validator: Box::new(validator),
        }
    }

    /// Returns whether this entry handles the relation.
    #[must_use]
    pub fn supports(&self, relation: &RelationDescriptor) -> bool {
        (self.predicate)(relation)
    }

    /// Returns the validator.
    #[must_use]
    pub fn validator(&self) -> &dyn RelationValidator {
        self.validator.as_ref()
    }
}

impl std::fmt::Debug for ValidatorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorEntry")
            .field("validator", &self.validator.name())
            .finish_non_exhaustive()
    }
}

/// Validates `relation` with the first entry that supports it.
///
/// # Errors
///
/// Returns [`ConfigurationError::NoValidator`] when no entry matches, or the
/// selected validator's error.
pub fn dispatch(
    entries: &[ValidatorEntry],
    relation: &RelationDescriptor,
    entities: &dyn EntityMetadataProvider,
) -> Result<(), ConfigurationError> {
    let Some(entry) = entries.iter().find(|entry| entry.supports(relation)) else {
        return Err(ConfigurationError::NoValidator {
            entity: relation.declaring_entity.clone(),
            property: relation.property_name.clone(),
            kind: relation.kind_name(),
        });
    };
    entry.validator().validate(relation, entities)?;
    debug!(
        entity = %relation.declaring_entity,
        property = %relation.property_name,
        validator = entry.validator().name(),
        "Relation validated"
    );
    Ok(())
}

/// Ordered validator list.
#[derive(Debug)]
pub struct ValidatorSet {
    entries: Vec<ValidatorEntry>,
}

impl ValidatorSet {
    /// Creates a set from explicit entries, tried in the given order.
    #[must_use]
    pub fn new(entries: Vec<ValidatorEntry>) -> Self {
        Self { entries }
    }

    /// The built-in set: one-to-one, many-to-one, one-to-many, many-to-many,
    /// polymorphic, then morph-to-many.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            ValidatorEntry::new(
                |r| matches!(r.kind, RelationKind::OneToOne(_)),
                OneToOneValidator,
            ),
            ValidatorEntry::new(
                |r| matches!(r.kind, RelationKind::ManyToOne(_)),
                ManyToOneValidator,
            ),
            ValidatorEntry::new(
                |r| matches!(r.kind, RelationKind::OneToMany),
                OneToManyValidator,
            ),
            ValidatorEntry::new(
                |r| matches!(r.kind, RelationKind::ManyToMany(_)),
                ManyToManyValidator,
            ),
            ValidatorEntry::new(
                |r| {
                    matches!(
                        r.kind,
                        RelationKind::MorphOne(_)
                            | RelationKind::MorphMany(_)
                            | RelationKind::MorphTo(_)
                    )
                },
                PolymorphicValidator,
            ),
            ValidatorEntry::new(
                |r| {
                    matches!(
                        r.kind,
                        RelationKind::MorphToMany(_) | RelationKind::MorphedByMany(_)
                    )
                },
                MorphToManyValidator,
            ),
        ])
    }

    /// Returns the entries in priority order.
    #[must_use]
    pub fn entries(&self) -> &[ValidatorEntry] {
        &self.entries
    }

    /// Returns the validator that would handle a relation.
    #[must_use]
    pub fn select(&self, relation: &RelationDescriptor) -> Option<&dyn RelationValidator> {
        self.entries
            .iter()
            .find(|entry| entry.supports(relation))
            .map(ValidatorEntry::validator)
    }

    /// Validates one relation.
    ///
    /// # Errors
    ///
    /// See [`dispatch`].
    pub fn validate(
        &self,
        relation: &RelationDescriptor,
        entities: &dyn EntityMetadataProvider,
    ) -> Result<(), ConfigurationError> {
        dispatch(&self.entries, relation, entities)
    }

    /// Validates every relation of every entity, stopping at the first error.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate_all(
        &self,
        entities: &dyn EntityMetadataProvider,
    ) -> Result<(), ConfigurationError> {
        for entity in entities.entities().iter().filter(|e| e.is_entity) {
            for relation in &entity.relations {
                self.validate(relation, entities)?;
            }
        }
        Ok(())
    }
}

impl Default for ValidatorSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Resolves the relation's target to a mapped entity.
pub(crate) fn target_entity<'a>(
    relation: &RelationDescriptor,
    entities: &'a dyn EntityMetadataProvider,
) -> Result<&'a EntityDescriptor, ConfigurationError> {
    let Some(target) = relation.target_entity.as_deref() else {
        return Err(ConfigurationError::MissingTargetEntity {
            entity: relation.declaring_entity.clone(),
            property: relation.property_name.clone(),
        });
    };
    entities
        .entity(target)
        .filter(|entity| entity.is_entity)
        .ok_or_else(|| ConfigurationError::UnknownTargetEntity {
            entity: relation.declaring_entity.clone(),
            property: relation.property_name.clone(),
            target: target.to_string(),
        })
}

/// Looks up the counterpart property on the target.
pub(crate) fn counterpart<'a>(
    relation: &RelationDescriptor,
    target: &'a EntityDescriptor,
    property: &str,
) -> Result<&'a RelationDescriptor, ConfigurationError> {
    target
        .find_relation(property)
        .ok_or_else(|| ConfigurationError::MissingInverseProperty {
            entity: relation.declaring_entity.clone(),
            property: relation.property_name.clone(),
            target: target.name.clone(),
            inverse: property.to_string(),
        })
}

pub(crate) fn kind_mismatch(
    relation: &RelationDescriptor,
    other: &RelationDescriptor,
    expected: &'static str,
    found: &'static str,
) -> ConfigurationError {
    ConfigurationError::InverseKindMismatch {
        entity: relation.declaring_entity.clone(),
        property: relation.property_name.clone(),
        target: other.declaring_entity.clone(),
        inverse: other.property_name.clone(),
        expected,
        found,
    }
}

pub(crate) fn reference_mismatch(
    relation: &RelationDescriptor,
    other: &RelationDescriptor,
) -> ConfigurationError {
    ConfigurationError::InverseReferenceMismatch {
        entity: relation.declaring_entity.clone(),
        property: relation.property_name.clone(),
        target: other.declaring_entity.clone(),
        inverse: other.property_name.clone(),
    }
}

pub(crate) fn require_exclusive_markers(
    relation: &RelationDescriptor,
) -> Result<(), ConfigurationError> {
    let both_markers = relation.mapped_by.is_some() && relation.inversed_by.is_some();
    let owning_and_mapped = relation.owning_side && relation.mapped_by.is_some();
    if both_markers || owning_and_mapped {
        return Err(ConfigurationError::ConflictingOwnershipMarkers {
            entity: relation.declaring_entity.clone(),
            property: relation.property_name.clone(),
        });
    }
    Ok(())
}
