#![allow(dead_code)]

use std::io::Write;

use schemata_migrate::prelude::*;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub async fn create_test_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

pub async fn execute(pool: &SqlitePool, sql: &str) {
    sqlx::query(sql)
        .execute(pool)
        .await
        .unwrap_or_else(|e| panic!("Failed to execute `{sql}`: {e}"));
}

/// User, Post, Tag and Comment: a many-to-one, a many-to-many and a
/// morph-to in one schema.
pub fn blog_entities() -> Vec<EntityDescriptor> {
    let user = EntityDescriptor::new("User", "user")
        .column(
            ColumnDefinition::new("id", LogicalType::BigInt)
                .primary_key()
                .auto_increment(),
        )
        .column(
            ColumnDefinition::new("email", LogicalType::String)
                .length(255)
                .not_null(),
        )
        .index(IndexDefinition::for_columns("user", &["email"], true))
        .relation(RelationDescriptor::one_to_many("User", "posts", "Post", "author"));

    let post = EntityDescriptor::new("Post", "post")
        .column(
            ColumnDefinition::new("id", LogicalType::Integer)
                .primary_key()
                .auto_increment(),
        )
        .column(
            ColumnDefinition::new("title", LogicalType::String)
                .length(255)
                .not_null(),
        )
        .column(ColumnDefinition::new("published", LogicalType::Boolean).not_null())
        .relation(RelationDescriptor::many_to_one("Post", "author", "User").inversed_by("posts"))
        .relation(RelationDescriptor::many_to_many("Post", "tags", "Tag").inversed_by("posts"))
        .relation(RelationDescriptor::morph_many(
            "Post",
            "comments",
            "Comment",
            "commentable",
        ));

    let tag = EntityDescriptor::new("Tag", "tag")
        .column(ColumnDefinition::new("id", LogicalType::Integer).primary_key())
        .column(
            ColumnDefinition::new("name", LogicalType::String)
                .length(64)
                .not_null(),
        )
        .relation(RelationDescriptor::many_to_many("Tag", "posts", "Post").mapped_by("tags"));

    let comment = EntityDescriptor::new("Comment", "comment")
        .column(ColumnDefinition::new("id", LogicalType::Integer).primary_key())
        .column(ColumnDefinition::new("body", LogicalType::Text).not_null())
        .relation(RelationDescriptor::morph_to("Comment", "commentable"));

    vec![user, post, tag, comment]
}

pub fn blog_registry() -> EntityRegistry {
    EntityRegistry::from_entities(blog_entities())
        .unwrap_or_else(|e| panic!("Failed to build registry: {e}"))
}

/// Writes a descriptor file for the blog entities.
pub fn blog_descriptor_file() -> tempfile::NamedTempFile {
    let file = DescriptorFile {
        entities: blog_entities(),
        morph_map: [("Post".to_string(), "post".to_string())].into_iter().collect(),
    };
    write_json(&serde_json::to_string_pretty(&file).unwrap())
}

pub fn write_json(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

pub async fn sqlite_plan(pool: &SqlitePool, registry: &EntityRegistry) -> MigrationPlan {
    let live = SqliteIntrospector::new(pool.clone()).snapshot().await.unwrap();
    build_plan(
        registry,
        MorphMap::new(),
        DialectKind::Sqlite,
        &live,
        ComparatorOptions::new(),
    )
    .unwrap()
}
