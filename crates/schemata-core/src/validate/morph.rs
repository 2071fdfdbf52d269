use super::{require_exclusive_markers, target_entity, RelationValidator};
use crate::entity::EntityMetadataProvider;
use crate::error::ConfigurationError;
use crate::relation::{RelationDescriptor, RelationKind};

/// Validates morph-one, morph-many and morph-to relations.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolymorphicValidator;

impl RelationValidator for PolymorphicValidator {
    fn name(&self) -> &'static str {
        "polymorphic"
    }

    fn validate(
        &self,
        relation: &RelationDescriptor,
        entities: &dyn EntityMetadataProvider,
    ) -> Result<(), ConfigurationError> {
        require_exclusive_markers(relation)?;
        match &relation.kind {
            RelationKind::MorphTo(columns) => {
                require_resolved(relation, &columns.type_column)?;
                require_resolved(relation, &columns.id_column)
            }
            RelationKind::MorphOne(inverse) | RelationKind::MorphMany(inverse) => {
                let target = target_entity(relation, entities)?;
                let resolves = !inverse.morph_name.is_empty()
                    && target
                        .find_relation(&inverse.morph_name)
                        .is_some_and(|other| matches!(other.kind, RelationKind::MorphTo(_)));
                if resolves {
                    Ok(())
                } else {
                    Err(ConfigurationError::MissingMorphInverse {
                        entity: relation.declaring_entity.clone(),
                        property: relation.property_name.clone(),
                        target: target.name.clone(),
                        morph_name: inverse.morph_name.clone(),
                        expected: "morph-to",
                    })
                }
            }
            _ => Ok(()),
        }
    }
}

/// Validates morph-to-many relations and their morphed-by-many inverses.
///
/// Each side needs a counterpart with the same morph name on its target.
#[derive(Debug, Clone, Copy, Default)]
pub struct MorphToManyValidator;

impl RelationValidator for MorphToManyValidator {
    fn name(&self) -> &'static str {
        "morph-to-many"
    }

    fn validate(
        &self,
        relation: &RelationDescriptor,
        entities: &dyn EntityMetadataProvider,
    ) -> Result<(), ConfigurationError> {
        require_exclusive_markers(relation)?;
        let target = target_entity(relation, entities)?;

        let (morph, expected) = match &relation.kind {
            RelationKind::MorphToMany(morph) => {
                require_resolved(relation, &morph.type_column())?;
                require_resolved(relation, &morph.id_column())?;
                (morph, "morphed-by-many")
            }
            RelationKind::MorphedByMany(morph) => {
                if morph.mapping.has_extra_properties() {
                    return Err(ConfigurationError::InverseDeclaresExtraProperties {
                        entity: relation.declaring_entity.clone(),
                        property: relation.property_name.clone(),
                    });
                }
                (morph, "morph-to-many")
            }
            _ => return Ok(()),
        };

        let matched = target.relations.iter().any(|other| match (&relation.kind, &other.kind) {
            (RelationKind::MorphToMany(_), RelationKind::MorphedByMany(theirs))
            | (RelationKind::MorphedByMany(_), RelationKind::MorphToMany(theirs)) => {
                theirs.morph_name == morph.morph_name
            }
            _ => false,
        });
        if matched {
            Ok(())
        } else {
            Err(ConfigurationError::MissingMorphInverse {
                entity: relation.declaring_entity.clone(),
                property: relation.property_name.clone(),
                target: target.name.clone(),
                morph_name: morph.morph_name.clone(),
                expected,
            })
        }
    }
}

/// Rejects empty names and leftover `{...}` / `%...%` placeholders.
fn require_resolved(relation: &RelationDescriptor, column: &str) -> Result<(), ConfigurationError> {
    let unresolved = column.trim().is_empty() || column.contains(['{', '}', '%']);
    if unresolved {
        return Err(ConfigurationError::UnresolvedMorphColumns {
            entity: relation.declaring_entity.clone(),
            property: relation.property_name.clone(),
            column: column.to_string(),
        });
    }
    Ok(())
}
