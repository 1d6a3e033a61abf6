//! SQL text and positional parameters for the four statement shapes.
//!
//! Builders never run anything. They return a [`Statement`] whose `params` line up with
//! the `?` placeholders in `sql`, binding every value through
//! [`bind_parameter`](crate::codec::bind_parameter) so unsupported values are rejected
//! before any SQL reaches the database.
//!
//! Raw filter clauses are inserted verbatim. They are not escaped or parameterized, so
//! they must only come from trusted code.

use switchy_database::DatabaseValue;

use crate::{OrmError, codec::bind_parameter};

#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<DatabaseValue>,
}

impl Statement {
    fn bind(&mut self, value: &DatabaseValue) -> Result<(), OrmError> {
        bind_parameter(self, self.params.len() + 1, value)
    }
}

/// Ordered column → value mapping used by the map-based operations.
///
/// Insertion order is the column order of the generated statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldValues {
    values: Vec<(String, DatabaseValue)>,
}

impl FieldValues {
    #[must_use]
    pub const fn new() -> Self {
        Self { values: vec![] }
    }

    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: impl Into<DatabaseValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Appends a column, or replaces the value in place if the column is already present.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<DatabaseValue>) {
        let column = column.into();
        let value = value.into();

        if let Some(existing) = self.values.iter_mut().find(|(name, _)| *name == column) {
            existing.1 = value;
        } else {
            self.values.push((column, value));
        }
    }

    /// Copy without `column`, compared ignoring ASCII case.
    #[must_use]
    pub fn without(&self, column: &str) -> Self {
        Self {
            values: self
                .values
                .iter()
                .filter(|(name, _)| !name.eq_ignore_ascii_case(column))
                .cloned()
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&DatabaseValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatabaseValue)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }
}

impl<K: Into<String>, V: Into<DatabaseValue>> FromIterator<(K, V)> for FieldValues {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut values = Self::new();
        for (column, value) in iter {
            values.insert(column, value);
        }
        values
    }
}

impl<'a> IntoIterator for &'a FieldValues {
    type Item = (&'a str, &'a DatabaseValue);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, (String, DatabaseValue)>,
        fn(&'a (String, DatabaseValue)) -> (&'a str, &'a DatabaseValue),
    >;

    fn into_iter(self) -> Self::IntoIter {
        let pair: fn(&'a (String, DatabaseValue)) -> (&'a str, &'a DatabaseValue) =
            |(name, value)| (name.as_str(), value);

        self.values.iter().map(pair)
    }
}

/// Which rows a select, update or delete targets.
///
/// A raw clause wins over an identifier, and an identifier only counts when it is
/// positive. [`Filter::new`] applies both rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    None,
    /// Primary key equals the identifier.
    Id(i64),
    /// Raw SQL predicate, inserted verbatim after `WHERE`.
    Clause(String),
}

impl Filter {
    #[must_use]
    pub fn new(id: i64, clause: &str) -> Self {
        let clause = clause.trim();

        if !clause.is_empty() {
            Self::Clause(clause.to_string())
        } else if id > 0 {
            Self::Id(id)
        } else {
            Self::None
        }
    }

    #[must_use]
    pub const fn id(id: i64) -> Self {
        if id > 0 { Self::Id(id) } else { Self::None }
    }

    #[must_use]
    pub fn clause(clause: &str) -> Self {
        Self::new(0, clause)
    }

    /// Normalized copy: blank clauses and non-positive ids become [`Filter::None`].
    #[must_use]
    pub fn effective(&self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Id(id) => Self::id(*id),
            Self::Clause(clause) => Self::clause(clause),
        }
    }

    /// Whether building a statement for this filter needs the primary key column.
    #[must_use]
    pub fn needs_key(&self) -> bool {
        matches!(self.effective(), Self::Id(_))
    }
}

/// `INSERT INTO <table> (<c1>, <c2>, ...) VALUES (?, ?, ...)`
///
/// # Errors
///
/// * [`OrmError::EmptyPayload`] if `values` is empty
/// * [`OrmError::UnsupportedType`] if a value is outside the supported kinds
pub fn build_insert(table: &str, values: &FieldValues) -> Result<Statement, OrmError> {
    if values.is_empty() {
        return Err(OrmError::EmptyPayload {
            table: table.to_string(),
        });
    }

    let mut statement = Statement::default();
    for (_, value) in values {
        statement.bind(value)?;
    }

    let columns = values.columns().collect::<Vec<_>>().join(", ");
    let placeholders = vec!["?"; values.len()].join(", ");

    statement.sql = format!("INSERT INTO {table} ({columns}) VALUES ({placeholders})");

    Ok(statement)
}

/// `SELECT * FROM <table>` with an optional `WHERE`.
///
/// # Errors
///
/// * [`OrmError::NoPrimaryKey`] if the filter is an identifier and `key` is empty
pub fn build_select(table: &str, key: &str, filter: &Filter) -> Result<Statement, OrmError> {
    let mut statement = Statement::default();

    let sql = match filter.effective() {
        Filter::None => format!("SELECT * FROM {table}"),
        filter => {
            let condition = condition(&mut statement, table, key, &filter)?;
            format!("SELECT * FROM {table} WHERE {condition}")
        }
    };
    statement.sql = sql;

    Ok(statement)
}

/// `UPDATE <table> SET <c1> = ?, ... WHERE <condition>`
///
/// The identifier, when used, is bound after every `SET` value. `values` should not
/// contain the key column.
///
/// # Errors
///
/// * [`OrmError::EmptyPayload`] if `values` is empty
/// * [`OrmError::MissingFilter`] if the filter selects nothing
/// * [`OrmError::NoPrimaryKey`] if the filter is an identifier and `key` is empty
/// * [`OrmError::UnsupportedType`] if a value is outside the supported kinds
pub fn build_update(
    table: &str,
    key: &str,
    values: &FieldValues,
    filter: &Filter,
) -> Result<Statement, OrmError> {
    if values.is_empty() {
        return Err(OrmError::EmptyPayload {
            table: table.to_string(),
        });
    }

    let mut statement = Statement::default();
    let mut assignments = Vec::with_capacity(values.len());

    for (column, value) in values {
        statement.bind(value)?;
        assignments.push(format!("{column} = ?"));
    }

    let condition = required_condition(&mut statement, table, key, filter)?;

    statement.sql = format!(
        "UPDATE {table} SET {} WHERE {condition}",
        assignments.join(", ")
    );

    Ok(statement)
}

/// `DELETE FROM <table> WHERE <condition>`
///
/// # Errors
///
/// * [`OrmError::MissingFilter`] if the filter selects nothing
/// * [`OrmError::NoPrimaryKey`] if the filter is an identifier and `key` is empty
pub fn build_delete(table: &str, key: &str, filter: &Filter) -> Result<Statement, OrmError> {
    let mut statement = Statement::default();
    let condition = required_condition(&mut statement, table, key, filter)?;

    statement.sql = format!("DELETE FROM {table} WHERE {condition}");

    Ok(statement)
}

fn required_condition(
    statement: &mut Statement,
    table: &str,
    key: &str,
    filter: &Filter,
) -> Result<String, OrmError> {
    match filter.effective() {
        Filter::None => Err(OrmError::MissingFilter {
            table: table.to_string(),
        }),
        filter => condition(statement, table, key, &filter),
    }
}

fn condition(
    statement: &mut Statement,
    table: &str,
    key: &str,
    filter: &Filter,
) -> Result<String, OrmError> {
    match filter {
        Filter::Clause(clause) => Ok(clause.clone()),
        Filter::Id(id) => {
            if key.is_empty() {
                return Err(OrmError::NoPrimaryKey {
                    table: table.to_string(),
                });
            }
            statement.bind(&DatabaseValue::Int64(*id))?;
            Ok(format!("{key} = ?"))
        }
        Filter::None => Ok(String::new()),
    }
}
