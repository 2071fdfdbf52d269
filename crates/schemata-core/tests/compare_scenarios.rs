mod common;

use common::{blog, live_from, post, registry, CountingReader, FailingReader};
use schemata_core::compare::TableOrigin;
use schemata_core::prelude::*;

fn sqlite() -> TypeMapper {
    TypeMapper::for_dialect(DialectKind::Sqlite)
}

#[test]
fn test_new_table_is_single_create() {
    let entities = registry([post()]);
    let mapper = sqlite();

    let results = SchemaComparator::new(&entities, &mapper)
        .compare_all(&LiveSchema::new())
        .unwrap();

    assert_eq!(results.len(), 1);
    let post = &results[0];
    assert_eq!(post.name, "post");
    assert_eq!(post.operation, CompareOperation::Create);
    assert_eq!(post.columns.len(), 2);
    assert!(post
        .columns
        .iter()
        .all(|c| c.operation == CompareOperation::Create));
    assert_eq!(post.primary_columns, ["id"]);
}

#[test]
fn test_dropped_column_is_single_delete() {
    let entities = registry([post()]);
    let mapper = sqlite();
    let live = LiveSchema::new().table(
        "post",
        LiveTable::new()
            .column(ColumnFact::new("id", "INTEGER", false).primary_key())
            .column(ColumnFact::new("title", "TEXT", false))
            .column(ColumnFact::new("legacy_flag", "INTEGER", true)),
    );

    let results = SchemaComparator::new(&entities, &mapper)
        .compare_all(&live)
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].operation, CompareOperation::Update);
    assert_eq!(results[0].columns.len(), 1);
    let dropped = &results[0].columns[0];
    assert_eq!(dropped.name, "legacy_flag");
    assert_eq!(dropped.operation, CompareOperation::Delete);
    assert!(dropped.declared.is_none());
    assert_eq!(
        dropped.existing.as_ref().and_then(|c| c.physical_type.as_deref()),
        Some("INTEGER")
    );
}

#[test]
fn test_orphan_table_is_bare_delete() {
    let entities = registry([post()]);
    let mapper = sqlite();
    let declared = SchemaComparator::new(&entities, &mapper)
        .declared_tables()
        .unwrap();
    let live = live_from(&declared, &mapper).table(
        "obsolete_cache",
        LiveTable::new().column(ColumnFact::new("key", "TEXT", false)),
    );

    let results = SchemaComparator::new(&entities, &mapper)
        .compare_all(&live)
        .unwrap();

    assert_eq!(results.len(), 1);
    let orphan = &results[0];
    assert_eq!(orphan.name, "obsolete_cache");
    assert_eq!(orphan.operation, CompareOperation::Delete);
    assert!(orphan.columns.is_empty());
    assert!(orphan.indexes.is_empty());
    assert!(orphan.foreign_keys.is_empty());
}

#[test]
fn test_matching_schema_is_idempotent() {
    let entities = blog();
    for dialect in [DialectKind::MySql, DialectKind::Postgres, DialectKind::Sqlite] {
        let mapper = TypeMapper::for_dialect(dialect);
        let comparator = SchemaComparator::new(&entities, &mapper);
        let live = live_from(&comparator.declared_tables().unwrap(), &mapper);

        assert!(comparator.compare_all(&live).unwrap().is_empty());
        assert!(comparator.compare_all(&live).unwrap().is_empty());
    }
}

#[test]
fn test_introspected_spelling_differences_match() {
    let entities = registry([post()]);
    let mapper = TypeMapper::for_dialect(DialectKind::Postgres);
    let live = LiveSchema::new().table(
        "post",
        LiveTable::new()
            .column(ColumnFact::new("id", "integer", false).primary_key())
            .column(ColumnFact::new("title", "character varying(255)", false)),
    );

    let results = SchemaComparator::new(&entities, &mapper)
        .compare_all(&live)
        .unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_type_and_nullability_update() {
    let entities = registry([post()]);
    let mapper = TypeMapper::for_dialect(DialectKind::Postgres);
    let live = LiveSchema::new().table(
        "post",
        LiveTable::new()
            .column(ColumnFact::new("id", "INTEGER", false).primary_key())
            .column(ColumnFact::new("title", "TEXT", true)),
    );

    let results = SchemaComparator::new(&entities, &mapper)
        .compare_all(&live)
        .unwrap();
    let title = &results[0].columns[0];
    assert_eq!(title.operation, CompareOperation::Update);
    assert!(!title.type_matches);
    assert!(!title.nullable_matches);
}

#[test]
fn test_primary_key_columns_are_sorted() {
    let entities = registry([EntityDescriptor::new("Country", "country")
        .column(ColumnDefinition::new("name", LogicalType::String).primary_key())
        .column(ColumnDefinition::new("id", LogicalType::Integer).primary_key())]);
    let mapper = sqlite();

    let results = SchemaComparator::new(&entities, &mapper)
        .compare_all(&LiveSchema::new())
        .unwrap();
    assert_eq!(results[0].primary_columns, ["id", "name"]);
}

#[test]
fn test_results_follow_declaration_order() {
    let entities = blog();
    let mapper = sqlite();
    let live = LiveSchema::new()
        .table("zeta_cache", LiveTable::new())
        .table("alpha_cache", LiveTable::new());

    let results = SchemaComparator::new(&entities, &mapper)
        .compare_all(&live)
        .unwrap();
    let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "user",
            "post",
            "tag",
            "comment",
            "video",
            "post_tag",
            "taggables",
            "alpha_cache",
            "zeta_cache",
        ]
    );
}

#[test]
fn test_relation_owned_columns() {
    let entities = blog();
    let mapper = sqlite();
    let tables = SchemaComparator::new(&entities, &mapper)
        .declared_tables()
        .unwrap();

    let post = &tables[1].schema;
    let author = post.get_column("author_id").unwrap();
    assert_eq!(author.logical_type, LogicalType::BigInt);
    assert!(author.nullable);
    assert!(post.foreign_keys.contains_key("fk_post_user_author_id"));

    let comment = &tables[3].schema;
    assert!(!comment.get_column("commentable_type").unwrap().nullable);
    assert!(comment
        .indexes
        .contains_key("idx_comment_commentable_type_commentable_id"));

    assert_eq!(tables[5].origin, TableOrigin::ManyToMany);
    assert_eq!(tables[6].origin, TableOrigin::MorphToMany);
    assert_eq!(
        tables[6].schema.primary_key_columns(),
        ["tag_id", "taggable_id", "taggable_type"]
    );
}

#[test]
fn test_read_failure_is_schema_read_error() {
    let entities = registry([post()]);
    let mapper = sqlite();
    let reader = FailingReader {
        tables: vec!["post".to_string()],
    };

    let err = SchemaComparator::new(&entities, &mapper)
        .compare_all(&reader)
        .unwrap_err();
    match err {
        MigrateError::SchemaRead(err) => assert_eq!(err.table.as_deref(), Some("post")),
        other => panic!("Expected a schema read error, got {other:?}"),
    }
}

#[test]
fn test_one_to_one_conflict_blocks_comparison() {
    let user = EntityDescriptor::new("User", "user")
        .column(ColumnDefinition::new("id", LogicalType::Integer).primary_key())
        .relation(RelationDescriptor::one_to_one("User", "profile", "Profile").inversed_by("user"));
    let profile = EntityDescriptor::new("Profile", "profile")
        .column(ColumnDefinition::new("id", LogicalType::Integer).primary_key())
        .relation(
            RelationDescriptor::one_to_one("Profile", "user", "User")
                .mapped_by("profile")
                .foreign_key(true),
        );
    let entities = registry([user, profile]);
    let mapper = sqlite();
    let reader = CountingReader::new(LiveSchema::new().table(
        "user",
        LiveTable::new().column(ColumnFact::new("id", "INTEGER", false).primary_key()),
    ));

    let err = SchemaComparator::new(&entities, &mapper)
        .compare_all(&reader)
        .unwrap_err();
    assert!(matches!(
        err,
        MigrateError::Configuration(ConfigurationError::ConflictingForeignKeyOwner { .. })
    ));
    assert_eq!(reader.column_reads.get(), 0);
}

#[test]
fn test_shared_table_is_unioned() {
    let person = EntityDescriptor::new("Person", "person")
        .column(ColumnDefinition::new("id", LogicalType::Integer).primary_key())
        .column(ColumnDefinition::new("name", LogicalType::String).not_null());
    let employee = EntityDescriptor::new("Employee", "person")
        .column(ColumnDefinition::new("id", LogicalType::Integer).primary_key())
        .column(ColumnDefinition::new("name", LogicalType::String))
        .column(ColumnDefinition::new("salary", LogicalType::Integer));
    let entities = registry([person, employee]);
    let mapper = sqlite();

    let tables = SchemaComparator::new(&entities, &mapper)
        .declared_tables()
        .unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(
        tables[0].origin,
        TableOrigin::Entity(vec!["Person".into(), "Employee".into()])
    );
    let schema = &tables[0].schema;
    assert_eq!(
        schema.columns.keys().collect::<Vec<_>>(),
        ["id", "name", "salary"]
    );
    assert!(schema.get_column("name").unwrap().nullable);
    assert_eq!(schema.primary_key_columns(), ["id"]);
}

#[test]
fn test_shared_table_type_conflict() {
    let person = EntityDescriptor::new("Person", "person")
        .column(ColumnDefinition::new("id", LogicalType::Integer).primary_key())
        .column(ColumnDefinition::new("name", LogicalType::String));
    let robot = EntityDescriptor::new("Robot", "person")
        .column(ColumnDefinition::new("id", LogicalType::Integer).primary_key())
        .column(ColumnDefinition::new("name", LogicalType::Integer));
    let entities = registry([person, robot]);
    let mapper = sqlite();

    let err = SchemaComparator::new(&entities, &mapper)
        .declared_tables()
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigurationError::SharedColumnConflict { ref column, .. } if column == "name"
    ));
}

#[test]
fn test_ignored_tables_are_never_dropped() {
    let entities = registry([post()]);
    let mapper = sqlite();
    let declared = SchemaComparator::new(&entities, &mapper)
        .declared_tables()
        .unwrap();
    let live = live_from(&declared, &mapper)
        .table(HISTORY_TABLE, LiveTable::new())
        .table("sessions", LiveTable::new());

    let results = SchemaComparator::new(&entities, &mapper)
        .with_options(ComparatorOptions::new().ignore_table("sessions"))
        .compare_all(&live)
        .unwrap();
    assert!(results.is_empty());
}
