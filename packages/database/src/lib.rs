//! Blocking database connection abstraction.
//!
//! This crate provides the [`Database`] trait consumed by the higher level mapping
//! layers, the [`DatabaseValue`] type used for bind parameters and result columns, and
//! the concrete backends that implement it.
//!
//! Every call blocks the calling thread until the round trip completes. Statements are
//! prepared, bound, executed and released within a single call.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod config;
#[cfg(feature = "recording")]
pub mod recording;
#[cfg(feature = "sqlite-rusqlite")]
pub mod rusqlite;
#[cfg(feature = "simulator")]
pub mod simulator;
#[cfg(feature = "mysql-sqlx")]
pub mod sqlx;

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// A value passed to or read from the database.
///
/// This is intentionally wider than what the mapping layer accepts. Backends can hand
/// back values such as [`DatabaseValue::Bool`] or [`DatabaseValue::UInt64`] and it is up
/// to the consumer to decide whether it supports them.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseValue {
    Null,
    String(String),
    Int64(i64),
    UInt64(u64),
    Real64(f64),
    Bool(bool),
    Char(char),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl DatabaseValue {
    /// Name of the runtime variant, used in error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::String(_) => "String",
            Self::Int64(_) => "Int64",
            Self::UInt64(_) => "UInt64",
            Self::Real64(_) => "Real64",
            Self::Bool(_) => "Bool",
            Self::Char(_) => "Char",
            Self::Date(_) => "Date",
            Self::DateTime(_) => "DateTime",
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int64(value) => Some(*value),
            Self::UInt64(value) => i64::try_from(*value).ok(),
            _ => None,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::missing_const_for_fn)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Real64(value) => Some(*value),
            Self::Int64(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_char(&self) -> Option<char> {
        match self {
            Self::Char(value) => Some(*value),
            Self::String(value) => value.chars().next(),
            _ => None,
        }
    }

    /// Date portion of a date or datetime value.
    #[must_use]
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(value) => Some(*value),
            Self::DateTime(value) => Some(value.date()),
            _ => None,
        }
    }
}

impl std::fmt::Display for DatabaseValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::String(value) => f.write_str(value),
            Self::Int64(value) => write!(f, "{value}"),
            Self::UInt64(value) => write!(f, "{value}"),
            Self::Real64(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Char(value) => write!(f, "{value}"),
            Self::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Self::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl<T: Into<Self>> From<Option<T>> for DatabaseValue {
    fn from(val: Option<T>) -> Self {
        val.map_or(Self::Null, std::convert::Into::into)
    }
}

impl From<bool> for DatabaseValue {
    fn from(val: bool) -> Self {
        Self::Bool(val)
    }
}

impl From<&str> for DatabaseValue {
    fn from(val: &str) -> Self {
        Self::String(val.to_string())
    }
}

impl From<&String> for DatabaseValue {
    fn from(val: &String) -> Self {
        Self::String(val.clone())
    }
}

impl From<String> for DatabaseValue {
    fn from(val: String) -> Self {
        Self::String(val)
    }
}

impl From<char> for DatabaseValue {
    fn from(val: char) -> Self {
        Self::Char(val)
    }
}

impl From<f32> for DatabaseValue {
    fn from(val: f32) -> Self {
        Self::Real64(f64::from(val))
    }
}

impl From<f64> for DatabaseValue {
    fn from(val: f64) -> Self {
        Self::Real64(val)
    }
}

impl From<i8> for DatabaseValue {
    fn from(val: i8) -> Self {
        Self::Int64(i64::from(val))
    }
}

impl From<i16> for DatabaseValue {
    fn from(val: i16) -> Self {
        Self::Int64(i64::from(val))
    }
}

impl From<i32> for DatabaseValue {
    fn from(val: i32) -> Self {
        Self::Int64(i64::from(val))
    }
}

impl From<i64> for DatabaseValue {
    fn from(val: i64) -> Self {
        Self::Int64(val)
    }
}

impl From<u8> for DatabaseValue {
    fn from(val: u8) -> Self {
        Self::UInt64(u64::from(val))
    }
}

impl From<u16> for DatabaseValue {
    fn from(val: u16) -> Self {
        Self::UInt64(u64::from(val))
    }
}

impl From<u32> for DatabaseValue {
    fn from(val: u32) -> Self {
        Self::UInt64(u64::from(val))
    }
}

impl From<u64> for DatabaseValue {
    fn from(val: u64) -> Self {
        Self::UInt64(val)
    }
}

impl From<NaiveDate> for DatabaseValue {
    fn from(val: NaiveDate) -> Self {
        Self::Date(val)
    }
}

impl From<NaiveDateTime> for DatabaseValue {
    fn from(val: NaiveDateTime) -> Self {
        Self::DateTime(val)
    }
}

/// Which metadata catalog a connection exposes.
///
/// Primary key discovery issues a different catalog query per dialect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dialect {
    /// `information_schema` based servers (`MySQL`, `MariaDB`)
    #[default]
    MySql,
    /// `SQLite`, introspected through `pragma_table_info`
    Sqlite,
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[cfg(feature = "sqlite-rusqlite")]
    #[error(transparent)]
    Rusqlite(rusqlite::RusqliteDatabaseError),
    #[cfg(feature = "mysql-sqlx")]
    #[error(transparent)]
    MysqlSqlx(sqlx::mysql::SqlxDatabaseError),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("No row")]
    NoRow,
    #[error("Connection is closed")]
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub columns: Vec<(String, DatabaseValue)>,
}

impl Row {
    /// Looks up a column by name.
    ///
    /// An exact match is preferred; otherwise the first column whose name matches
    /// ignoring ASCII case is returned.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<DatabaseValue> {
        self.columns
            .iter()
            .find(|c| c.0 == column_name)
            .or_else(|| {
                self.columns
                    .iter()
                    .find(|c| c.0.eq_ignore_ascii_case(column_name))
            })
            .map(|c| c.1.clone())
    }

    #[must_use]
    pub fn first(&self) -> Option<&DatabaseValue> {
        self.columns.first().map(|c| &c.1)
    }

    #[must_use]
    pub fn id(&self) -> Option<DatabaseValue> {
        self.get("id")
    }
}

/// A live connection to a relational database.
///
/// Implementations own establishment, credentials and driver selection. Consumers only
/// run statements through it. No implementation is required to be safe for concurrent
/// use of a single statement sequence; callers serialize access when they need to.
pub trait Database: Send + Sync + std::fmt::Debug {
    /// Runs a query with positional `?` parameters and returns every row.
    ///
    /// # Errors
    ///
    /// * If the connection is closed
    /// * If the statement fails to prepare, bind or execute
    fn query_raw_params(
        &self,
        query: &str,
        params: &[DatabaseValue],
    ) -> Result<Vec<Row>, DatabaseError>;

    /// Runs a statement with positional `?` parameters and returns the affected row count.
    ///
    /// # Errors
    ///
    /// * If the connection is closed
    /// * If the statement fails to prepare, bind or execute
    fn exec_raw_params(&self, statement: &str, params: &[DatabaseValue])
    -> Result<u64, DatabaseError>;

    /// Runs one or more parameterless statements.
    ///
    /// # Errors
    ///
    /// * If the connection is closed
    /// * If any statement fails
    fn exec_raw(&self, statement: &str) -> Result<(), DatabaseError>;

    /// Name of the catalog (schema) the connection is currently using.
    ///
    /// # Errors
    ///
    /// * If the connection is closed
    /// * If the catalog name could not be read
    fn current_catalog(&self) -> Result<String, DatabaseError>;

    fn is_connected(&self) -> bool;

    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    /// # Errors
    ///
    /// Will return `Err` if the close failed.
    fn close(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}
