//! `SQLite` database backend using rusqlite
//!
//! This module provides `SQLite` support through the `rusqlite` crate. A single
//! connection is held behind a mutex; every call prepares its own statement, binds the
//! positional parameters, runs it and drops the statement before returning.
//!
//! # Value Mapping
//!
//! `SQLite` has dynamic typing, so values are written using their natural storage class:
//!
//! - `Int64`/`UInt64` → `INTEGER`
//! - `Real64` → `REAL`
//! - `String` → `TEXT`
//! - `Char` → one character `TEXT`
//! - `Bool` → `INTEGER` 0 or 1
//! - `Date` → `TEXT` formatted as `YYYY-MM-DD`
//! - `DateTime` → `TEXT` formatted as `YYYY-MM-DD HH:MM:SS`
//!
//! Values read back are returned as `Int64`, `Real64`, `String` or `Null`. Interpreting
//! a text column as a date is left to the caller, which knows the declared type.

use std::sync::Mutex;

use rusqlite::{Connection, Row, Rows, Statement, types::Value};
use thiserror::Error;

use crate::{Database, DatabaseError, DatabaseValue, Dialect};

/// `SQLite` connection wrapper implementing [`Database`].
#[allow(clippy::module_name_repetitions)]
#[derive(Debug)]
pub struct RusqliteDatabase {
    connection: Mutex<Option<Connection>>,
}

impl RusqliteDatabase {
    #[must_use]
    pub const fn new(connection: Connection) -> Self {
        Self {
            connection: Mutex::new(Some(connection)),
        }
    }

    fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, RusqliteDatabaseError>,
    ) -> Result<T, DatabaseError> {
        let guard = self
            .connection
            .lock()
            .map_err(|_| RusqliteDatabaseError::Poisoned)?;
        let connection = guard.as_ref().ok_or(DatabaseError::Closed)?;

        Ok(f(connection)?)
    }
}

/// Errors specific to `SQLite` database operations using `rusqlite`
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Error)]
pub enum RusqliteDatabaseError {
    /// Error from the underlying `rusqlite` driver
    #[error(transparent)]
    Rusqlite(#[from] rusqlite::Error),
    /// The connection mutex was poisoned by a panicking holder
    #[error("Connection lock poisoned")]
    Poisoned,
    /// The column holds a storage class that has no [`DatabaseValue`] equivalent
    #[error("Unsupported column type for '{0}'")]
    UnsupportedColumnType(String),
}

impl From<RusqliteDatabaseError> for DatabaseError {
    fn from(value: RusqliteDatabaseError) -> Self {
        Self::Rusqlite(value)
    }
}

impl Database for RusqliteDatabase {
    fn query_raw_params(
        &self,
        query: &str,
        params: &[DatabaseValue],
    ) -> Result<Vec<crate::Row>, DatabaseError> {
        log::trace!("query_raw_params: query:\n'{query}'\nparams: {params:?}");

        self.with_connection(|connection| {
            let mut statement = connection.prepare(query)?;
            let column_names = statement
                .column_names()
                .iter()
                .map(std::string::ToString::to_string)
                .collect::<Vec<_>>();

            bind_values(&mut statement, params)?;

            to_rows(&column_names, statement.raw_query())
        })
    }

    fn exec_raw_params(
        &self,
        query: &str,
        params: &[DatabaseValue],
    ) -> Result<u64, DatabaseError> {
        log::trace!("exec_raw_params: query:\n'{query}'\nparams: {params:?}");

        self.with_connection(|connection| {
            let mut statement = connection.prepare(query)?;

            bind_values(&mut statement, params)?;

            let rows_affected = statement.raw_execute()?;

            Ok(rows_affected as u64)
        })
    }

    fn exec_raw(&self, statement: &str) -> Result<(), DatabaseError> {
        log::trace!("exec_raw: query:\n'{statement}'");

        self.with_connection(|connection| Ok(connection.execute_batch(statement)?))
    }

    fn current_catalog(&self) -> Result<String, DatabaseError> {
        self.with_connection(|_| Ok("main".to_string()))
    }

    fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn close(&self) -> Result<(), DatabaseError> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| RusqliteDatabaseError::Poisoned)?
            .take();

        if let Some(connection) = connection {
            connection
                .close()
                .map_err(|(_, e)| RusqliteDatabaseError::Rusqlite(e))?;
        }

        Ok(())
    }
}

fn bind_values(
    statement: &mut Statement<'_>,
    values: &[DatabaseValue],
) -> Result<usize, RusqliteDatabaseError> {
    for (index, value) in values.iter().enumerate() {
        let i = index + 1;
        match value {
            DatabaseValue::Null => statement.raw_bind_parameter(i, Value::Null)?,
            DatabaseValue::String(value) => statement.raw_bind_parameter(i, value)?,
            DatabaseValue::Int64(value) => statement.raw_bind_parameter(i, *value)?,
            DatabaseValue::UInt64(value) => statement.raw_bind_parameter(i, *value)?,
            DatabaseValue::Real64(value) => statement.raw_bind_parameter(i, *value)?,
            DatabaseValue::Bool(value) => statement.raw_bind_parameter(i, i32::from(*value))?,
            DatabaseValue::Char(value) => statement.raw_bind_parameter(i, value.to_string())?,
            DatabaseValue::Date(value) => {
                statement.raw_bind_parameter(i, value.format("%Y-%m-%d").to_string())?;
            }
            DatabaseValue::DateTime(value) => {
                statement.raw_bind_parameter(i, value.format("%Y-%m-%d %H:%M:%S").to_string())?;
            }
        }
    }

    Ok(values.len())
}

fn from_value(column: &str, value: Value) -> Result<DatabaseValue, RusqliteDatabaseError> {
    Ok(match value {
        Value::Null => DatabaseValue::Null,
        Value::Integer(value) => DatabaseValue::Int64(value),
        Value::Real(value) => DatabaseValue::Real64(value),
        Value::Text(value) => DatabaseValue::String(value),
        Value::Blob(_) => {
            return Err(RusqliteDatabaseError::UnsupportedColumnType(
                column.to_string(),
            ));
        }
    })
}

fn from_row(column_names: &[String], row: &Row<'_>) -> Result<crate::Row, RusqliteDatabaseError> {
    let mut columns = vec![];

    for (index, column) in column_names.iter().enumerate() {
        let value = row.get::<_, Value>(index)?;
        columns.push((column.clone(), from_value(column, value)?));
    }

    Ok(crate::Row { columns })
}

fn to_rows(
    column_names: &[String],
    mut rows: Rows<'_>,
) -> Result<Vec<crate::Row>, RusqliteDatabaseError> {
    let mut results = vec![];

    while let Some(row) = rows.next()? {
        results.push(from_row(column_names, row)?);
    }

    log::trace!(
        "Got {} row{}",
        results.len(),
        if results.len() == 1 { "" } else { "s" }
    );

    Ok(results)
}
