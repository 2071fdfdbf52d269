mod common;

use common::{blog, live_from, post, registry};
use schemata_core::prelude::*;

fn plan_for(kind: DialectKind, entities: &EntityRegistry, live: &LiveSchema) -> MigrationPlan {
    let dialect = dialect_for(kind);
    let results = SchemaComparator::new(entities, dialect.type_mapper())
        .compare_all(live)
        .unwrap();
    MigrationPlan::build(dialect.as_ref(), &results).unwrap()
}

#[test]
fn test_new_post_table_per_dialect() {
    let entities = registry([post()]);

    let mysql = plan_for(DialectKind::MySql, &entities, &LiveSchema::new());
    assert_eq!(
        mysql.up_sql(),
        "CREATE TABLE `post` (\n  `id` INT NOT NULL AUTO_INCREMENT,\n  `title` VARCHAR(255) NOT NULL,\n  PRIMARY KEY (`id`)\n);"
    );
    assert_eq!(mysql.down_sql(), "DROP TABLE `post`;");

    let postgres = plan_for(DialectKind::Postgres, &entities, &LiveSchema::new());
    assert_eq!(
        postgres.up_sql(),
        "CREATE TABLE \"post\" (\n  \"id\" INTEGER NOT NULL GENERATED ALWAYS AS IDENTITY,\n  \"title\" VARCHAR(255) NOT NULL,\n  PRIMARY KEY (\"id\")\n);"
    );

    let sqlite = plan_for(DialectKind::Sqlite, &entities, &LiveSchema::new());
    assert_eq!(
        sqlite.up_sql(),
        "CREATE TABLE \"post\" (\n  \"id\" INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,\n  \"title\" TEXT NOT NULL\n);"
    );
}

#[test]
fn test_blog_plan_inlines_foreign_keys() {
    let plan = plan_for(DialectKind::Postgres, &blog(), &LiveSchema::new());
    let post = plan.entries.iter().find(|e| e.table == "post").unwrap();

    assert!(post.up[0].contains(
        "CONSTRAINT \"fk_post_user_author_id\" FOREIGN KEY (\"author_id\") REFERENCES \"user\" (\"id\")"
    ));

    let post_tag = plan.entries.iter().find(|e| e.table == "post_tag").unwrap();
    assert!(post_tag.up[0].contains("PRIMARY KEY (\"post_id\", \"tag_id\")"));
    assert_eq!(post_tag.down, ["DROP TABLE \"post_tag\""]);

    let user = plan.entries.iter().find(|e| e.table == "user").unwrap();
    assert_eq!(
        user.up[1],
        "CREATE UNIQUE INDEX \"uniq_user_email\" ON \"user\" (\"email\")"
    );
}

#[test]
fn test_update_rollback_restores_existing_definitions() {
    let entities = registry([post()]);
    let live = LiveSchema::new().table(
        "post",
        LiveTable::new()
            .column(ColumnFact::new("id", "INT", false).primary_key())
            .column(ColumnFact::new("title", "TEXT", true))
            .column(ColumnFact::new("legacy_flag", "TINYINT(1)", true))
            .index(IndexFact {
                name: "idx_post_legacy_flag".into(),
                columns: vec!["legacy_flag".into()],
                unique: false,
                primary: false,
            }),
    );

    let plan = plan_for(DialectKind::MySql, &entities, &live);
    let entry = &plan.entries[0];
    assert_eq!(entry.operation, CompareOperation::Update);
    assert_eq!(
        entry.up,
        [
            "DROP INDEX `idx_post_legacy_flag` ON `post`",
            "ALTER TABLE `post` DROP COLUMN `legacy_flag`",
            "ALTER TABLE `post` MODIFY COLUMN `title` VARCHAR(255) NOT NULL",
        ]
    );
    assert_eq!(
        entry.down,
        [
            "ALTER TABLE `post` ADD COLUMN `legacy_flag` TINYINT(1)",
            "ALTER TABLE `post` MODIFY COLUMN `title` TEXT",
            "CREATE INDEX `idx_post_legacy_flag` ON `post` (`legacy_flag`)",
        ]
    );
}

#[test]
fn test_sqlite_update_is_generation_error() {
    let entities = registry([post()]);
    let live = LiveSchema::new().table(
        "post",
        LiveTable::new()
            .column(ColumnFact::new("id", "INTEGER", false).primary_key())
            .column(ColumnFact::new("title", "TEXT", false))
            .column(ColumnFact::new("legacy_flag", "INTEGER", true)),
    );
    let dialect = SqliteDialect::new();
    let results = SchemaComparator::new(&entities, dialect.type_mapper())
        .compare_all(&live)
        .unwrap();

    let err = MigrationPlan::build(&dialect, &results).unwrap_err();
    assert_eq!(err.table(), "post");
    assert!(err.to_string().contains("table recreation required"));
}

#[test]
fn test_up_to_date_schema_plans_nothing() {
    let entities = blog();
    let dialect = dialect_for(DialectKind::MySql);
    let comparator = SchemaComparator::new(&entities, dialect.type_mapper());
    let live = live_from(&comparator.declared_tables().unwrap(), dialect.type_mapper());

    let results = comparator.compare_all(&live).unwrap();
    let plan = MigrationPlan::build(dialect.as_ref(), &results).unwrap();
    assert!(plan.is_empty());
    assert_eq!(plan.up_sql(), "");
}

#[test]
fn test_plan_serializes_to_json() {
    let plan = plan_for(DialectKind::Sqlite, &registry([post()]), &LiveSchema::new());
    let json = serde_json::to_value(&plan).unwrap();

    assert_eq!(json["dialect"], "sqlite");
    assert_eq!(json["entries"][0]["operation"], "CREATE");
    assert_eq!(json["entries"][0]["table"], "post");
}
