#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Maps plain structs and column/value lists onto relational tables.
//!
//! There is no schema layer. Table names come from type names, columns from field names,
//! and primary keys are discovered from the database's metadata catalog (or supplied up
//! front with a [`SchemaMap`]).
//!
//! ```
//! use std::sync::Arc;
//!
//! use switchy_database::{Database, simulator::SimulationDatabase};
//! use switchy_orm::{Orm, entity};
//!
//! entity! {
//!     table = "person";
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Person {
//!         pub id: i64,
//!         pub name: String,
//!         pub age: i32,
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = SimulationDatabase::new()?;
//! db.exec_raw("CREATE TABLE person (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, age INTEGER)")?;
//!
//! let orm = Orm::new(Arc::new(Box::new(db)));
//! orm.insert(&Person { id: 0, name: "Ann".into(), age: 30 }, true)?;
//!
//! let ann = orm.select_by_id::<Person>(1)?.unwrap();
//! assert_eq!(ann.name, "Ann");
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod descriptor;
pub mod key;
pub mod orm;
pub mod statement;

pub use descriptor::{ColumnValue, Entity, FieldDescriptor, Kind, TypeDescriptor};
pub use key::{CachedKeyResolver, CatalogKeyResolver, PrimaryKeyResolver, SchemaMap};
pub use orm::Orm;
pub use statement::{FieldValues, Filter, Statement};
pub use switchy_database::{Database, DatabaseError, DatabaseValue, Row};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrmError {
    #[error("Database connection not found, connect first")]
    ConnectionMissing,
    #[error("Unsupported type '{type_name}'")]
    UnsupportedType { type_name: String },
    #[error("No fields to write to table '{table}'")]
    EmptyPayload { table: String },
    #[error("Refusing to modify table '{table}' without an id or filter clause")]
    MissingFilter { table: String },
    #[error("Query on table '{table}' failed")]
    Query {
        table: String,
        #[source]
        source: DatabaseError,
    },
    #[error("No primary key found for table '{table}'")]
    NoPrimaryKey { table: String },
    #[error("Invalid value for field '{field}': {message}")]
    InvalidValue { field: String, message: String },
}
