#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Basic usage example for `switchy_orm`
//!
//! Runs every CRUD family against a throwaway in-memory `SQLite` database: inserting
//! structs and column lists, reading rows back into structs, updating by key and by
//! clause, and deleting. Nullable columns are declared as `Option` fields. Run with
//! `RUST_LOG=debug` to see each statement.

use std::sync::Arc;

use chrono::NaiveDate;
use switchy_database::{Database, simulator::SimulationDatabase};
use switchy_orm::{FieldValues, Filter, Orm, OrmError, entity};

entity! {
    table = "person";
    #[derive(Debug, Clone, PartialEq)]
    pub struct Person {
        pub id: i64,
        pub name: String,
        pub email: Option<String>,
        pub grade: char,
        pub height: f64,
        pub born: Option<NaiveDate>,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let db = SimulationDatabase::new()?;
    db.exec_raw(
        "CREATE TABLE person (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT,
            grade TEXT,
            height REAL,
            born TEXT
        )",
    )?;

    let orm = Orm::new(Arc::new(Box::new(db)));

    println!("=== Insert ===");
    let ann = Person {
        id: 0,
        name: "Ann".to_string(),
        email: Some("ann@example.com".to_string()),
        grade: 'A',
        height: 1.68,
        born: NaiveDate::from_ymd_opt(1990, 5, 17),
    };
    orm.insert(&ann, true)?;
    orm.insert_values(
        "person",
        &FieldValues::new()
            .value("name", "Bob")
            .value("grade", 'C')
            .value("height", 1.91),
    )?;
    println!("inserted Ann and Bob");

    println!("\n=== Select ===");
    for person in orm.select_all::<Person>()? {
        println!("{person:?}");
    }
    let bob = orm
        .select_where::<Person>("name = 'Bob'")?
        .into_iter()
        .next()
        .ok_or("Bob is missing")?;
    println!("found Bob with id {}", bob.id);

    println!("\n=== Update ===");
    let graded = Person {
        grade: 'B',
        ..bob.clone()
    };
    orm.update(&graded)?;
    orm.update_values(
        "person",
        &FieldValues::new().value("email", "bob@example.com"),
        &Filter::Id(bob.id),
    )?;
    println!("{:?}", orm.select_by_id::<Person>(bob.id)?);

    println!("\n=== Delete ===");
    match orm.delete_from("person", &Filter::new(0, "")) {
        Err(OrmError::MissingFilter { table }) => {
            println!("refused to delete every row of {table}");
        }
        other => log::warn!("unexpected result: {other:?}"),
    }
    let removed = orm.delete_where::<Person>("height > 1.8")?;
    println!("deleted {removed} row(s)");

    println!("\nremaining: {:?}", orm.select_all::<Person>()?);

    Ok(())
}
