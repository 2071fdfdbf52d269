#![allow(dead_code)]

use std::cell::Cell;
use std::result::Result;

use indexmap::IndexMap;
use schemata_core::compare::DeclaredTable;
use schemata_core::prelude::*;

pub fn post() -> EntityDescriptor {
    EntityDescriptor::new("Post", "post")
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
}

pub fn registry(entities: impl IntoIterator<Item = EntityDescriptor>) -> EntityRegistry {
    EntityRegistry::from_entities(entities)
        .unwrap_or_else(|e| panic!("Failed to build registry: {e}"))
}

/// User, Post, Tag, Comment and Video with every relation kind wired
/// correctly in both directions.
pub fn blog() -> EntityRegistry {
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

    let post = post()
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
        .relation(RelationDescriptor::many_to_many("Tag", "posts", "Post").mapped_by("tags"))
        .relation(RelationDescriptor::morphed_by_many(
            "Tag", "videos", "Video", "taggable",
        ));

    let comment = EntityDescriptor::new("Comment", "comment")
        .column(ColumnDefinition::new("id", LogicalType::Integer).primary_key())
        .column(ColumnDefinition::new("body", LogicalType::Text).not_null())
        .relation(RelationDescriptor::morph_to("Comment", "commentable"));

    let video = EntityDescriptor::new("Video", "video")
        .column(ColumnDefinition::new("id", LogicalType::Integer).primary_key())
        .relation(RelationDescriptor::morph_to_many(
            "Video", "tags", "Tag", "taggable",
        ));

    registry([user, post, tag, comment, video])
}

/// Builds a live snapshot matching the declared tables exactly.
pub fn live_from(tables: &[DeclaredTable], mapper: &TypeMapper) -> LiveSchema {
    let mut live = LiveSchema::new();
    for declared in tables {
        let schema = &declared.schema;
        let mut table = LiveTable::new();
        for column in schema.columns.values() {
            let mut fact = ColumnFact::new(&column.name, mapper.column_type(column), column.nullable);
            fact.primary_key = column.primary_key;
            table = table.column(fact);
        }
        for index in schema.indexes.values() {
            table = table.index(IndexFact {
                name: index.name.clone(),
                columns: index.columns.clone(),
                unique: index.unique,
                primary: false,
            });
        }
        for foreign_key in schema.foreign_keys.values() {
            table = table.foreign_key(ForeignKeyFact {
                name: foreign_key.name.clone(),
                column: foreign_key.column.clone(),
                referenced_table: foreign_key.referenced_table.clone(),
                referenced_column: foreign_key.referenced_column.clone(),
            });
        }
        live = live.table(&schema.name, table);
    }
    live
}

/// Reader that fails on every table read.
pub struct FailingReader {
    pub tables: Vec<String>,
}

impl SchemaReader for FailingReader {
    fn list_tables(&self) -> Result<Vec<String>, SchemaReadError> {
        Ok(self.tables.clone())
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnFact>, SchemaReadError> {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "connection reset");
        Err(SchemaReadError::for_table("columns", table, io))
    }

    fn indexes(&self, _table: &str) -> Result<IndexMap<String, IndexFact>, SchemaReadError> {
        Ok(IndexMap::new())
    }

    fn foreign_keys(
        &self,
        _table: &str,
    ) -> Result<IndexMap<String, ForeignKeyFact>, SchemaReadError> {
        Ok(IndexMap::new())
    }
}

/// Reader that records how many tables were inspected.
pub struct CountingReader {
    pub inner: LiveSchema,
    pub column_reads: Cell<usize>,
}

impl CountingReader {
    pub fn new(inner: LiveSchema) -> Self {
        Self {
            inner,
            column_reads: Cell::new(0),
        }
    }
}

impl SchemaReader for CountingReader {
    fn list_tables(&self) -> Result<Vec<String>, SchemaReadError> {
        self.inner.list_tables()
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnFact>, SchemaReadError> {
        self.column_reads.set(self.column_reads.get() + 1);
        self.inner.columns(table)
    }

    fn indexes(&self, table: &str) -> Result<IndexMap<String, IndexFact>, SchemaReadError> {
        self.inner.indexes(table)
    }

    fn foreign_keys(
        &self,
        table: &str,
    ) -> Result<IndexMap<String, ForeignKeyFact>, SchemaReadError> {
        self.inner.foreign_keys(table)
    }
}
