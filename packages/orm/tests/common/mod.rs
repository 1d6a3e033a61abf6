#![allow(unused)]

use std::sync::Arc;

use chrono::NaiveDate;
use switchy_database::{Database, simulator::SimulationDatabase};
use switchy_orm::{Orm, entity};

entity! {
    table = "person";
    #[derive(Debug, Clone, PartialEq)]
    pub struct Person {
        pub id: i64,
        pub name: String,
        pub nickname: Option<String>,
        pub grade: char,
        pub height: f64,
        pub born: NaiveDate,
    }
}

/// `person` with every nullable column optional.
entity! {
    table = "person";
    #[derive(Debug, Clone, PartialEq)]
    pub struct SparsePerson {
        pub id: i64,
        pub name: String,
        pub nickname: Option<String>,
        pub grade: Option<char>,
        pub height: Option<f64>,
        pub born: Option<NaiveDate>,
    }
}

entity! {
    table = "flagged";
    #[derive(Debug, Clone, PartialEq)]
    pub struct Flagged {
        pub id: i64,
        pub active: bool,
    }
}

pub fn ann() -> Person {
    Person {
        id: 0,
        name: "Ann".to_string(),
        nickname: None,
        grade: 'A',
        height: 1.68,
        born: NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
    }
}

pub fn bob() -> Person {
    Person {
        id: 0,
        name: "Bob".to_string(),
        nickname: Some("Bobby".to_string()),
        grade: 'C',
        height: 1.91,
        born: NaiveDate::from_ymd_opt(1985, 11, 2).unwrap(),
    }
}

/// Fresh in-memory database with the `person` and `flagged` tables.
pub fn setup_db() -> Arc<Box<dyn Database>> {
    let db = SimulationDatabase::new().unwrap();

    db.exec_raw(
        "CREATE TABLE person (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            nickname TEXT,
            grade TEXT,
            height REAL,
            born TEXT
        );
        CREATE TABLE flagged (id INTEGER PRIMARY KEY, active INTEGER);",
    )
    .unwrap();

    Arc::new(Box::new(db))
}

pub fn setup() -> (Orm, Arc<Box<dyn Database>>) {
    let db = setup_db();

    (Orm::new(db.clone()), db)
}
