mod common;

use common::{blog, post, registry};
use schemata_core::mapping::{CollectedMappings, MappingKind};
use schemata_core::prelude::*;
use std::result::Result;

fn tag() -> EntityDescriptor {
    EntityDescriptor::new("Tag", "tag")
        .column(ColumnDefinition::new("id", LogicalType::Integer).primary_key())
}

fn spec(extra: Vec<MappingTableProperty>) -> MappingTableSpec {
    MappingTableSpec {
        table_name: Some("post_tag".into()),
        extra_properties: extra,
        ..MappingTableSpec::default()
    }
}

fn collect(entities: &EntityRegistry) -> Result<CollectedMappings, ConfigurationError> {
    MappingCollector::new(entities, &MorphMap::new()).collect()
}

#[test]
fn test_blog_mapping_tables() {
    let entities = blog();
    let collected = collect(&entities).unwrap();

    let post_tag = &collected.many_to_many["post_tag"];
    assert_eq!(post_tag.owner_join_column.name, "post_id");
    assert_eq!(post_tag.target_join_column.name, "tag_id");
    assert_eq!(post_tag.sources, ["Post::tags"]);

    let taggables = &collected.morph_to_many["taggables"];
    assert_eq!(
        taggables.kind,
        MappingKind::MorphToMany {
            morph_name: "taggable".into(),
            type_column: "taggable_type".into(),
            morph_types: vec!["Video".into()],
        }
    );
    let schema = taggables.to_table_schema();
    assert_eq!(
        schema.columns.keys().collect::<Vec<_>>(),
        ["taggable_id", "taggable_type", "tag_id"]
    );
    assert_eq!(schema.foreign_keys.len(), 1);
}

#[test]
fn test_collection_is_deterministic() {
    let entities = blog();
    assert_eq!(collect(&entities).unwrap(), collect(&entities).unwrap());
}

#[test]
fn test_different_join_columns_conflict() {
    let entities = registry([
        post()
            .relation(RelationDescriptor::many_to_many("Post", "tags", "Tag").mapping(spec(vec![])))
            .relation(
                RelationDescriptor::many_to_many("Post", "labels", "Tag").mapping(MappingTableSpec {
                    target_join_column: Some("label_id".into()),
                    ..spec(vec![])
                }),
            ),
        tag(),
    ]);

    let err = collect(&entities).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::JoinColumnMismatch {
            table: "post_tag".into(),
            role: "target join column",
            first: "tag_id".into(),
            second: "label_id".into(),
        }
    );
}

#[test]
fn test_extra_property_type_conflict() {
    let entities = registry([
        post()
            .relation(
                RelationDescriptor::many_to_many("Post", "tags", "Tag").mapping(spec(vec![
                    MappingTableProperty::new("weight", LogicalType::Integer),
                ])),
            )
            .relation(
                RelationDescriptor::many_to_many("Post", "labels", "Tag").mapping(spec(vec![
                    MappingTableProperty::new("weight", LogicalType::String),
                ])),
            ),
        tag(),
    ]);

    let err = collect(&entities).unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::ExtraPropertyConflict { ref property, .. } if property == "weight"
    ));
}

#[test]
fn test_extra_property_nullability_widens() {
    let entities = registry([
        post()
            .relation(
                RelationDescriptor::many_to_many("Post", "tags", "Tag").mapping(spec(vec![
                    MappingTableProperty::new("note", LogicalType::String).not_null(),
                ])),
            )
            .relation(
                RelationDescriptor::many_to_many("Post", "labels", "Tag").mapping(spec(vec![
                    MappingTableProperty::new("note", LogicalType::String),
                ])),
            ),
        tag(),
    ]);

    let collected = collect(&entities).unwrap();
    let post_tag = &collected.many_to_many["post_tag"];
    assert!(post_tag.extra_properties["note"].nullable);
    assert_eq!(post_tag.sources, ["Post::tags", "Post::labels"]);
}

#[test]
fn test_morph_tables_merge_aliases() {
    let video = EntityDescriptor::new("Video", "video")
        .column(ColumnDefinition::new("id", LogicalType::Integer).primary_key())
        .relation(RelationDescriptor::morph_to_many("Video", "tags", "Tag", "taggable"));
    let entities = registry([
        post().relation(RelationDescriptor::morph_to_many("Post", "tags", "Tag", "taggable")),
        video,
        tag(),
    ]);
    let morph_map = MorphMap::new()
        .with("Post", "post")
        .and_then(|map| map.with("Video", "video"))
        .unwrap();

    let collected = MappingCollector::new(&entities, &morph_map).collect().unwrap();
    let MappingKind::MorphToMany { morph_types, .. } = &collected.morph_to_many["taggables"].kind
    else {
        panic!("Expected a morph-to-many table");
    };
    assert_eq!(morph_types, &["post", "video"]);
}

#[test]
fn test_mapping_table_cannot_shadow_entity_table() {
    let entities = registry([
        post().relation(RelationDescriptor::many_to_many("Post", "tags", "Tag").mapping(
            MappingTableSpec {
                table_name: Some("tag".into()),
                ..MappingTableSpec::default()
            },
        )),
        tag(),
    ]);

    let err = collect(&entities).unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::MappingTableCollision {
            table: "tag".into()
        }
    );
}
