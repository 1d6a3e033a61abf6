//! Primary key discovery.
//!
//! [`CatalogKeyResolver`] asks the database's metadata catalog on every call.
//! [`CachedKeyResolver`] asks once per table and remembers the answer, and [`SchemaMap`]
//! never asks at all: the caller supplies the keys up front or loads them once at
//! startup with [`SchemaMap::load`].
//!
//! An empty string means the table has no primary key.

use std::{
    collections::BTreeMap,
    sync::{PoisonError, RwLock},
};

use switchy_database::{Database, DatabaseValue, Dialect};

use crate::OrmError;

const MYSQL_PRIMARY_KEY_QUERY: &str = "\
    SELECT COLUMN_NAME FROM information_schema.KEY_COLUMN_USAGE \
    WHERE UPPER(CONSTRAINT_NAME) = 'PRIMARY' \
    AND TABLE_SCHEMA = ? \
    AND LOWER(TABLE_NAME) = LOWER(?) \
    ORDER BY ORDINAL_POSITION";

const SQLITE_PRIMARY_KEY_QUERY: &str =
    "SELECT name FROM pragma_table_info(?) WHERE pk > 0 ORDER BY pk";

pub trait PrimaryKeyResolver: Send + Sync + std::fmt::Debug {
    /// Name of the primary key column of `table`, or an empty string if it has none.
    ///
    /// # Errors
    ///
    /// * [`OrmError::ConnectionMissing`] if `db` is not connected
    /// * [`OrmError::Query`] if the metadata query fails
    fn resolve(&self, db: &dyn Database, table: &str) -> Result<String, OrmError>;
}

/// Queries the metadata catalog on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct CatalogKeyResolver;

impl PrimaryKeyResolver for CatalogKeyResolver {
    fn resolve(&self, db: &dyn Database, table: &str) -> Result<String, OrmError> {
        if !db.is_connected() {
            return Err(OrmError::ConnectionMissing);
        }

        let query_error = |source| OrmError::Query {
            table: table.to_string(),
            source,
        };

        let (query, params) = match db.dialect() {
            Dialect::MySql => {
                let catalog = db.current_catalog().map_err(query_error)?;
                (
                    MYSQL_PRIMARY_KEY_QUERY,
                    vec![
                        DatabaseValue::String(catalog),
                        DatabaseValue::String(table.to_string()),
                    ],
                )
            }
            Dialect::Sqlite => (
                SQLITE_PRIMARY_KEY_QUERY,
                vec![DatabaseValue::String(table.to_string())],
            ),
        };

        log::debug!("resolve: looking up primary key of {table}");

        let rows = db.query_raw_params(query, &params).map_err(query_error)?;

        let key = rows
            .first()
            .and_then(|row| row.first())
            .and_then(DatabaseValue::as_str)
            .unwrap_or_default()
            .to_string();

        log::trace!("resolve: table={table} key={key:?}");

        Ok(key)
    }
}

/// Remembers each table's key after the first successful lookup.
///
/// Tables are matched ignoring ASCII case. A lookup that finds no key is not remembered,
/// so a table created later is picked up.
#[derive(Debug)]
pub struct CachedKeyResolver {
    inner: Box<dyn PrimaryKeyResolver>,
    keys: RwLock<BTreeMap<String, String>>,
}

impl Default for CachedKeyResolver {
    fn default() -> Self {
        Self::new(CatalogKeyResolver)
    }
}

impl CachedKeyResolver {
    #[must_use]
    pub fn new(inner: impl PrimaryKeyResolver + 'static) -> Self {
        Self {
            inner: Box::new(inner),
            keys: RwLock::new(BTreeMap::new()),
        }
    }

    /// Forgets every remembered key.
    pub fn clear(&self) {
        self.keys
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl PrimaryKeyResolver for CachedKeyResolver {
    fn resolve(&self, db: &dyn Database, table: &str) -> Result<String, OrmError> {
        let name = table.to_ascii_lowercase();

        let cached = self
            .keys
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name)
            .cloned();

        if let Some(key) = cached {
            return Ok(key);
        }

        let key = self.inner.resolve(db, table)?;

        if !key.is_empty() {
            self.keys
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(name, key.clone());
        }

        Ok(key)
    }
}

/// Caller-supplied table → primary key map.
///
/// Tables are matched ignoring ASCII case. Unknown tables have no key.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchemaMap {
    keys: BTreeMap<String, String>,
}

impl SchemaMap {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            keys: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_key(mut self, table: &str, key: impl Into<String>) -> Self {
        self.keys.insert(table.to_ascii_lowercase(), key.into());
        self
    }

    /// Looks up the key of every table in `tables` once.
    ///
    /// # Errors
    ///
    /// * If any lookup fails
    pub fn load<'a>(
        db: &dyn Database,
        tables: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, OrmError> {
        let mut map = Self::new();

        for table in tables {
            let key = CatalogKeyResolver.resolve(db, table)?;
            map = map.with_key(table, key);
        }

        Ok(map)
    }

    #[must_use]
    pub fn get(&self, table: &str) -> Option<&str> {
        self.keys
            .get(&table.to_ascii_lowercase())
            .map(String::as_str)
    }
}

impl PrimaryKeyResolver for SchemaMap {
    fn resolve(&self, _db: &dyn Database, table: &str) -> Result<String, OrmError> {
        Ok(self.get(table).unwrap_or_default().to_string())
    }
}
