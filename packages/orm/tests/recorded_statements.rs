use std::sync::Arc;

use pretty_assertions::assert_eq;
use switchy_database::{
    Database, DatabaseValue, Row,
    recording::{RecordedStatement, RecordingDatabase},
};
use switchy_orm::{CatalogKeyResolver, FieldValues, Filter, Orm, OrmError};

fn key_row(key: &str) -> Row {
    Row {
        columns: vec![(
            "COLUMN_NAME".to_string(),
            DatabaseValue::String(key.to_string()),
        )],
    }
}

fn handle(db: &RecordingDatabase) -> Arc<Box<dyn Database>> {
    Arc::new(Box::new(db.clone()))
}

#[test_log::test]
fn person_insert_binds_in_insertion_order() {
    let db = RecordingDatabase::new();
    let orm = Orm::new(handle(&db));

    orm.insert_values(
        "person",
        &FieldValues::new().value("name", "Ann").value("age", 30),
    )
    .unwrap();

    assert_eq!(
        db.statements(),
        vec![RecordedStatement {
            sql: "INSERT INTO person (name, age) VALUES (?, ?)".to_string(),
            params: vec![
                DatabaseValue::String("Ann".to_string()),
                DatabaseValue::Int64(30)
            ],
        }]
    );
}

#[test_log::test]
fn key_is_discovered_from_information_schema_once() {
    let db = RecordingDatabase::new()
        .with_catalog("shop")
        .with_rows(vec![key_row("person_id")]);
    let orm = Orm::new(handle(&db));

    orm.update_values(
        "person",
        &FieldValues::new().value("age", 31),
        &Filter::Id(3),
    )
    .unwrap();
    orm.delete_from("person", &Filter::Id(4)).unwrap();

    let statements = db.statements();
    assert_eq!(statements.len(), 3);
    assert!(statements[0].sql.contains("information_schema.KEY_COLUMN_USAGE"));
    assert_eq!(
        statements[0].params,
        vec![
            DatabaseValue::String("shop".to_string()),
            DatabaseValue::String("person".to_string())
        ]
    );
    assert_eq!(
        statements[1],
        RecordedStatement {
            sql: "UPDATE person SET age = ? WHERE person_id = ?".to_string(),
            params: vec![DatabaseValue::Int64(31), DatabaseValue::Int64(3)],
        }
    );
    assert_eq!(
        statements[2],
        RecordedStatement {
            sql: "DELETE FROM person WHERE person_id = ?".to_string(),
            params: vec![DatabaseValue::Int64(4)],
        }
    );
}

#[test_log::test]
fn catalog_resolver_looks_up_key_on_every_call() {
    let db = RecordingDatabase::new()
        .with_rows(vec![key_row("id")])
        .with_rows(vec![key_row("id")]);
    let orm = Orm::with_key_resolver(handle(&db), CatalogKeyResolver);

    orm.delete_from("person", &Filter::Id(1)).unwrap();
    orm.delete_from("person", &Filter::Id(2)).unwrap();

    let sql = db
        .statements()
        .into_iter()
        .map(|statement| statement.sql)
        .filter(|sql| sql.starts_with("DELETE"))
        .collect::<Vec<_>>();
    assert_eq!(db.statements().len(), 4);
    assert_eq!(
        sql,
        vec![
            "DELETE FROM person WHERE id = ?",
            "DELETE FROM person WHERE id = ?"
        ]
    );
}

#[test_log::test]
fn raw_clause_skips_key_lookup() {
    let db = RecordingDatabase::new();
    let orm = Orm::new(handle(&db));

    orm.delete_from("person", &Filter::new(7, "age > 60")).unwrap();

    assert_eq!(
        db.statements(),
        vec![RecordedStatement {
            sql: "DELETE FROM person WHERE age > 60".to_string(),
            params: vec![],
        }]
    );
}

#[test_log::test]
fn unfiltered_delete_issues_no_sql() {
    let db = RecordingDatabase::new();
    let orm = Orm::new(handle(&db));

    assert!(matches!(
        orm.delete_from("person", &Filter::new(0, "")),
        Err(OrmError::MissingFilter { table }) if table == "person"
    ));
    assert!(matches!(
        orm.update_values("person", &FieldValues::new().value("age", 1), &Filter::None),
        Err(OrmError::MissingFilter { .. })
    ));
    assert!(db.statements().is_empty());
}

#[test_log::test]
fn id_filter_on_table_without_key_fails() {
    let db = RecordingDatabase::new();
    let orm = Orm::new(handle(&db));

    assert!(matches!(
        orm.delete_from("audit_log", &Filter::Id(1)),
        Err(OrmError::NoPrimaryKey { table }) if table == "audit_log"
    ));
    assert_eq!(db.statements().len(), 1);
}

#[test_log::test]
fn unsupported_value_issues_no_sql() {
    let db = RecordingDatabase::new();
    let orm = Orm::new(handle(&db));

    assert!(matches!(
        orm.insert_values("person", &FieldValues::new().value("active", true)),
        Err(OrmError::UnsupportedType { type_name }) if type_name == "Bool"
    ));
    assert!(matches!(
        orm.insert_values("person", &FieldValues::new()),
        Err(OrmError::EmptyPayload { table }) if table == "person"
    ));
    assert!(db.statements().is_empty());
}

#[test_log::test]
fn disconnected_database_is_missing() {
    let db = RecordingDatabase::new();
    db.set_connected(false);
    let orm = Orm::new(handle(&db));

    assert!(matches!(
        orm.insert_values("person", &FieldValues::new().value("name", "Ann")),
        Err(OrmError::ConnectionMissing)
    ));
    assert!(db.statements().is_empty());
}
