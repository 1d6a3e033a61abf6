use std::sync::Arc;

use switchy_database::{Database, DatabaseValue, Row, config};

use crate::{
    OrmError,
    codec::extract_column,
    descriptor::Entity,
    key::{CachedKeyResolver, PrimaryKeyResolver, SchemaMap},
    statement::{
        FieldValues, Filter, Statement, build_delete, build_insert, build_select, build_update,
    },
};

/// CRUD operations against one database connection.
///
/// Each call checks the connection, builds a statement, runs it and releases it before
/// returning. Nothing runs inside a transaction, and concurrent callers sharing a
/// connection must serialize their calls themselves.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug)]
pub struct Orm {
    db: Option<Arc<Box<dyn Database>>>,
    key_resolver: Box<dyn PrimaryKeyResolver>,
}

impl Orm {
    /// Uses a [`CachedKeyResolver`], so each table's key is looked up once.
    #[must_use]
    pub fn new(db: Arc<Box<dyn Database>>) -> Self {
        Self::with_key_resolver(db, CachedKeyResolver::default())
    }

    #[must_use]
    pub fn with_key_resolver(
        db: Arc<Box<dyn Database>>,
        key_resolver: impl PrimaryKeyResolver + 'static,
    ) -> Self {
        Self {
            db: Some(db),
            key_resolver: Box::new(key_resolver),
        }
    }

    /// Resolves keys from `schema` only, never from the catalog.
    #[must_use]
    pub fn with_schema(db: Arc<Box<dyn Database>>, schema: SchemaMap) -> Self {
        Self::with_key_resolver(db, schema)
    }

    /// Uses the process-wide database registered with
    /// [`switchy_database::config::init`].
    ///
    /// If none is registered every operation fails with [`OrmError::ConnectionMissing`].
    #[must_use]
    pub fn from_config() -> Self {
        Self {
            db: config::database().map(Into::into),
            key_resolver: Box::new(CachedKeyResolver::default()),
        }
    }

    fn connection(&self) -> Result<&dyn Database, OrmError> {
        match &self.db {
            Some(db) if db.is_connected() => Ok(&***db),
            _ => Err(OrmError::ConnectionMissing),
        }
    }

    fn primary_key(&self, db: &dyn Database, table: &str) -> Result<String, OrmError> {
        self.key_resolver.resolve(db, table)
    }

    fn required_primary_key(&self, db: &dyn Database, table: &str) -> Result<String, OrmError> {
        let key = self.primary_key(db, table)?;

        if key.is_empty() {
            return Err(OrmError::NoPrimaryKey {
                table: table.to_string(),
            });
        }

        Ok(key)
    }

    fn key_for(&self, db: &dyn Database, table: &str, filter: &Filter) -> Result<String, OrmError> {
        if filter.needs_key() {
            self.primary_key(db, table)
        } else {
            Ok(String::new())
        }
    }

    fn exec(db: &dyn Database, table: &str, statement: &Statement) -> Result<u64, OrmError> {
        log::debug!("exec: {}", statement.sql);
        log::trace!("exec: params={:?}", statement.params);

        let affected = db
            .exec_raw_params(&statement.sql, &statement.params)
            .map_err(|source| OrmError::Query {
                table: table.to_string(),
                source,
            })?;

        log::trace!("exec: table={table} affected={affected}");

        Ok(affected)
    }

    fn query(db: &dyn Database, table: &str, statement: &Statement) -> Result<Vec<Row>, OrmError> {
        log::debug!("query: {}", statement.sql);
        log::trace!("query: params={:?}", statement.params);

        db.query_raw_params(&statement.sql, &statement.params)
            .map_err(|source| OrmError::Query {
                table: table.to_string(),
                source,
            })
    }

    /// Inserts one row built from `values`, in their order.
    ///
    /// # Errors
    ///
    /// * [`OrmError::ConnectionMissing`] if there is no live connection
    /// * [`OrmError::EmptyPayload`] if `values` is empty
    /// * [`OrmError::UnsupportedType`] if a value is outside the supported kinds
    /// * [`OrmError::Query`] if the database rejects the statement
    pub fn insert_values(&self, table: &str, values: &FieldValues) -> Result<u64, OrmError> {
        let db = self.connection()?;
        let statement = build_insert(table, values)?;

        Self::exec(db, table, &statement)
    }

    /// Inserts `entity`, skipping absent fields.
    ///
    /// With `auto_increment` the primary key column is left out so the database assigns
    /// it. A table without a primary key has nothing to leave out.
    ///
    /// # Errors
    ///
    /// * [`OrmError::ConnectionMissing`] if there is no live connection
    /// * [`OrmError::EmptyPayload`] if every field is absent
    /// * [`OrmError::UnsupportedType`] if a field holds an unsupported type
    /// * [`OrmError::Query`] if the key lookup or the insert fails
    pub fn insert<T: Entity>(&self, entity: &T, auto_increment: bool) -> Result<u64, OrmError> {
        let db = self.connection()?;
        let table = T::table_name();

        let mut values = present_values(entity);

        if auto_increment {
            let key = self.primary_key(db, table)?;
            if !key.is_empty() {
                values = values.without(&key);
            }
        }

        let statement = build_insert(table, &values)?;

        Self::exec(db, table, &statement)
    }

    /// Reads every row matching `filter` into a new `T`, in result order.
    ///
    /// Nullable columns must be declared as `Option<T>` fields.
    ///
    /// # Errors
    ///
    /// * [`OrmError::ConnectionMissing`] if there is no live connection
    /// * [`OrmError::NoPrimaryKey`] if filtering by id on a table without a key
    /// * [`OrmError::UnsupportedType`] if `T` declares a field outside the supported kinds
    /// * [`OrmError::InvalidValue`] if a column cannot be read into its field, including
    ///   SQL `NULL` read into a non-optional field
    /// * [`OrmError::Query`] if the key lookup or the select fails
    pub fn select<T: Entity>(&self, filter: &Filter) -> Result<Vec<T>, OrmError> {
        let db = self.connection()?;
        let table = T::table_name();
        let key = self.key_for(db, table, filter)?;
        let statement = build_select(table, &key, filter)?;

        let rows = Self::query(db, table, &statement)?;

        log::trace!("select: table={table} rows={}", rows.len());

        rows.iter().map(to_entity).collect()
    }

    /// # Errors
    ///
    /// * See [`Orm::select`]
    pub fn select_all<T: Entity>(&self) -> Result<Vec<T>, OrmError> {
        self.select(&Filter::None)
    }

    /// The row whose primary key is `id`. Ids below 1 never match.
    ///
    /// # Errors
    ///
    /// * See [`Orm::select`]
    pub fn select_by_id<T: Entity>(&self, id: i64) -> Result<Option<T>, OrmError> {
        self.connection()?;

        if id < 1 {
            return Ok(None);
        }

        Ok(self.select(&Filter::Id(id))?.into_iter().next())
    }

    /// # Errors
    ///
    /// * See [`Orm::select`]
    pub fn select_where<T: Entity>(&self, clause: &str) -> Result<Vec<T>, OrmError> {
        self.select(&Filter::clause(clause))
    }

    /// Untyped read of `table`.
    ///
    /// # Errors
    ///
    /// * [`OrmError::ConnectionMissing`] if there is no live connection
    /// * [`OrmError::NoPrimaryKey`] if filtering by id on a table without a key
    /// * [`OrmError::Query`] if the key lookup or the select fails
    pub fn select_rows(&self, table: &str, filter: &Filter) -> Result<Vec<Row>, OrmError> {
        let db = self.connection()?;
        let key = self.key_for(db, table, filter)?;
        let statement = build_select(table, &key, filter)?;

        Self::query(db, table, &statement)
    }

    /// Updates the row identified by the entity's primary key.
    ///
    /// The key column and every field holding zero are left out of the `SET` list. A
    /// field can therefore not be set to zero this way; use [`Orm::update_fields`].
    ///
    /// # Errors
    ///
    /// * [`OrmError::ConnectionMissing`] if there is no live connection
    /// * [`OrmError::NoPrimaryKey`] if the table has no primary key
    /// * [`OrmError::MissingFilter`] if the entity's key is not a positive integer
    /// * [`OrmError::EmptyPayload`] if no field is left to set
    /// * [`OrmError::Query`] if the key lookup or the update fails
    pub fn update<T: Entity>(&self, entity: &T) -> Result<u64, OrmError> {
        let db = self.connection()?;
        let table = T::table_name();
        let key = self.required_primary_key(db, table)?;
        let filter = key_filter(entity, &key);

        let values = set_values(entity, &key);
        let statement = build_update(table, &key, &values, &filter)?;

        Self::exec(db, table, &statement)
    }

    /// Updates every row matching `clause` with the entity's fields.
    ///
    /// Fields are chosen as in [`Orm::update`].
    ///
    /// # Errors
    ///
    /// * [`OrmError::ConnectionMissing`] if there is no live connection
    /// * [`OrmError::MissingFilter`] if `clause` is blank
    /// * [`OrmError::EmptyPayload`] if no field is left to set
    /// * [`OrmError::Query`] if the key lookup or the update fails
    pub fn update_where<T: Entity>(&self, entity: &T, clause: &str) -> Result<u64, OrmError> {
        let db = self.connection()?;
        let table = T::table_name();
        let filter = Filter::clause(clause);

        if filter == Filter::None {
            return Err(OrmError::MissingFilter {
                table: table.to_string(),
            });
        }

        let key = self.primary_key(db, table)?;
        let values = set_values(entity, &key);
        let statement = build_update(table, &key, &values, &filter)?;

        Self::exec(db, table, &statement)
    }

    /// Updates exactly the named fields of the row identified by the entity's key,
    /// including fields that hold zero. Absent optional fields are skipped.
    ///
    /// # Errors
    ///
    /// * [`OrmError::ConnectionMissing`] if there is no live connection
    /// * [`OrmError::InvalidValue`] if a name is not a field of `T`
    /// * [`OrmError::NoPrimaryKey`] if the table has no primary key
    /// * [`OrmError::MissingFilter`] if the entity's key is not a positive integer
    /// * [`OrmError::EmptyPayload`] if no named field has a value
    /// * [`OrmError::Query`] if the key lookup or the update fails
    pub fn update_fields<T: Entity>(&self, entity: &T, fields: &[&str]) -> Result<u64, OrmError> {
        let db = self.connection()?;
        let table = T::table_name();
        let descriptor = T::descriptor();

        let mut values = FieldValues::new();
        for name in fields {
            let field = descriptor.field(name).ok_or_else(|| OrmError::InvalidValue {
                field: (*name).to_string(),
                message: format!("no such field on {}", descriptor.type_name),
            })?;
            if let Some(value) = entity.value(field.name) {
                values.insert(field.name, value);
            }
        }

        let key = self.required_primary_key(db, table)?;
        let filter = key_filter(entity, &key);
        let statement = build_update(table, &key, &values.without(&key), &filter)?;

        Self::exec(db, table, &statement)
    }

    /// Map-based update. The primary key column is never part of the `SET` list.
    ///
    /// # Errors
    ///
    /// * [`OrmError::ConnectionMissing`] if there is no live connection
    /// * [`OrmError::EmptyPayload`] if no value is left to set
    /// * [`OrmError::MissingFilter`] if the filter selects nothing
    /// * [`OrmError::NoPrimaryKey`] if filtering by id on a table without a key
    /// * [`OrmError::UnsupportedType`] if a value is outside the supported kinds
    /// * [`OrmError::Query`] if the key lookup or the update fails
    pub fn update_values(
        &self,
        table: &str,
        values: &FieldValues,
        filter: &Filter,
    ) -> Result<u64, OrmError> {
        let db = self.connection()?;

        if filter.effective() == Filter::None {
            return Err(OrmError::MissingFilter {
                table: table.to_string(),
            });
        }

        let key = self.primary_key(db, table)?;
        let values = if key.is_empty() {
            values.clone()
        } else {
            values.without(&key)
        };
        let statement = build_update(table, &key, &values, filter)?;

        Self::exec(db, table, &statement)
    }

    /// Deletes the row identified by the entity's primary key.
    ///
    /// # Errors
    ///
    /// * [`OrmError::ConnectionMissing`] if there is no live connection
    /// * [`OrmError::NoPrimaryKey`] if the table has no primary key
    /// * [`OrmError::MissingFilter`] if the entity's key is not a positive integer
    /// * [`OrmError::Query`] if the key lookup or the delete fails
    pub fn delete<T: Entity>(&self, entity: &T) -> Result<u64, OrmError> {
        let db = self.connection()?;
        let table = T::table_name();
        let key = self.required_primary_key(db, table)?;
        let statement = build_delete(table, &key, &key_filter(entity, &key))?;

        Self::exec(db, table, &statement)
    }

    /// # Errors
    ///
    /// * [`OrmError::ConnectionMissing`] if there is no live connection
    /// * [`OrmError::MissingFilter`] if `clause` is blank
    /// * [`OrmError::Query`] if the delete fails
    pub fn delete_where<T: Entity>(&self, clause: &str) -> Result<u64, OrmError> {
        self.delete_from(T::table_name(), &Filter::clause(clause))
    }

    /// Deletes the rows of `table` matching `filter`. An empty filter is refused before
    /// anything is sent to the database.
    ///
    /// # Errors
    ///
    /// * [`OrmError::ConnectionMissing`] if there is no live connection
    /// * [`OrmError::MissingFilter`] if the filter selects nothing
    /// * [`OrmError::NoPrimaryKey`] if filtering by id on a table without a key
    /// * [`OrmError::Query`] if the key lookup or the delete fails
    pub fn delete_from(&self, table: &str, filter: &Filter) -> Result<u64, OrmError> {
        let db = self.connection()?;

        if filter.effective() == Filter::None {
            return Err(OrmError::MissingFilter {
                table: table.to_string(),
            });
        }

        let key = self.key_for(db, table, filter)?;
        let statement = build_delete(table, &key, filter)?;

        Self::exec(db, table, &statement)
    }
}

fn present_values<T: Entity>(entity: &T) -> FieldValues {
    entity
        .values()
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
        .collect()
}

/// Fields for an object-based `SET` list: present, not the key and not zero.
fn set_values<T: Entity>(entity: &T, key: &str) -> FieldValues {
    entity
        .values()
        .into_iter()
        .filter(|(name, _)| !name.eq_ignore_ascii_case(key))
        .filter_map(|(name, value)| value.map(|value| (name, value)))
        .filter(|(_, value)| !is_zero(value))
        .collect()
}

#[allow(clippy::float_cmp)]
fn is_zero(value: &DatabaseValue) -> bool {
    match value {
        DatabaseValue::Int64(value) => *value == 0,
        DatabaseValue::UInt64(value) => *value == 0,
        DatabaseValue::Real64(value) => *value == 0.0,
        _ => false,
    }
}

fn key_filter<T: Entity>(entity: &T, key: &str) -> Filter {
    entity
        .value(key)
        .and_then(|value| value.as_i64())
        .map_or(Filter::None, Filter::id)
}

fn to_entity<T: Entity>(row: &Row) -> Result<T, OrmError> {
    let mut entity = T::default();

    for field in T::descriptor().fields {
        let value = extract_column(row, field)?;
        entity.set_value(field.name, value)?;
    }

    Ok(entity)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use switchy_database::recording::{RecordedStatement, RecordingDatabase};

    use super::*;

    crate::entity! {
        table = "person";
        #[derive(Debug, Clone, PartialEq)]
        struct Person {
            id: i64,
            name: String,
            age: i32,
        }
    }

    fn orm(db: &RecordingDatabase) -> Orm {
        Orm::with_schema(
            Arc::new(Box::new(db.clone())),
            SchemaMap::new().with_key("person", "id"),
        )
    }

    fn ann() -> Person {
        Person {
            id: 1,
            name: "Ann".into(),
            age: 30,
        }
    }

    #[test_log::test]
    fn disconnected_database_fails_before_building_sql() {
        let db = RecordingDatabase::new();
        db.set_connected(false);
        let orm = orm(&db);

        assert!(matches!(
            orm.insert(&ann(), true),
            Err(OrmError::ConnectionMissing)
        ));
        assert!(matches!(
            orm.delete_from("person", &Filter::None),
            Err(OrmError::ConnectionMissing)
        ));
    }

    #[test_log::test]
    fn from_config_without_registration_has_no_connection() {
        // The process-wide slot is never initialized in this test binary.
        let orm = Orm::from_config();

        assert!(matches!(
            orm.select_all::<Person>(),
            Err(OrmError::ConnectionMissing)
        ));
    }

    #[test_log::test]
    fn insert_with_auto_increment_skips_key() {
        let db = RecordingDatabase::new();

        orm(&db).insert(&ann(), true).unwrap();

        assert_eq!(
            db.last_statement().unwrap(),
            RecordedStatement {
                sql: "INSERT INTO person (name, age) VALUES (?, ?)".into(),
                params: vec![DatabaseValue::String("Ann".into()), DatabaseValue::Int64(30)],
            }
        );
    }

    #[test_log::test]
    fn insert_without_auto_increment_keeps_key() {
        let db = RecordingDatabase::new();

        orm(&db).insert(&ann(), false).unwrap();

        assert_eq!(
            db.last_statement().unwrap().sql,
            "INSERT INTO person (id, name, age) VALUES (?, ?, ?)"
        );
    }

    #[test_log::test]
    fn update_skips_key_and_zero_fields() {
        let db = RecordingDatabase::new();
        let person = Person { age: 0, ..ann() };

        orm(&db).update(&person).unwrap();

        assert_eq!(
            db.last_statement().unwrap(),
            RecordedStatement {
                sql: "UPDATE person SET name = ? WHERE id = ?".into(),
                params: vec![DatabaseValue::String("Ann".into()), DatabaseValue::Int64(1)],
            }
        );
    }

    #[test_log::test]
    fn update_fields_can_write_zero() {
        let db = RecordingDatabase::new();
        let person = Person { age: 0, ..ann() };

        orm(&db).update_fields(&person, &["age"]).unwrap();

        assert_eq!(
            db.last_statement().unwrap(),
            RecordedStatement {
                sql: "UPDATE person SET age = ? WHERE id = ?".into(),
                params: vec![DatabaseValue::Int64(0), DatabaseValue::Int64(1)],
            }
        );
    }

    #[test_log::test]
    fn update_fields_rejects_unknown_field() {
        let db = RecordingDatabase::new();

        assert!(matches!(
            orm(&db).update_fields(&ann(), &["height"]),
            Err(OrmError::InvalidValue { field, .. }) if field == "height"
        ));
        assert!(db.statements().is_empty());
    }

    #[test_log::test]
    fn update_of_unsaved_entity_is_missing_filter() {
        let db = RecordingDatabase::new();
        let person = Person { id: 0, ..ann() };

        assert!(matches!(
            orm(&db).update(&person),
            Err(OrmError::MissingFilter { table }) if table == "person"
        ));
        assert!(db.statements().is_empty());
    }

    #[test_log::test]
    fn update_values_drops_key_column_from_set() {
        let db = RecordingDatabase::new();
        let values = FieldValues::new().value("id", 9).value("age", 31);

        orm(&db)
            .update_values("person", &values, &Filter::Id(1))
            .unwrap();

        assert_eq!(
            db.last_statement().unwrap(),
            RecordedStatement {
                sql: "UPDATE person SET age = ? WHERE id = ?".into(),
                params: vec![DatabaseValue::Int64(31), DatabaseValue::Int64(1)],
            }
        );
    }

    #[test_log::test]
    fn delete_uses_entity_key() {
        let db = RecordingDatabase::new();

        orm(&db).delete(&ann()).unwrap();

        assert_eq!(
            db.last_statement().unwrap(),
            RecordedStatement {
                sql: "DELETE FROM person WHERE id = ?".into(),
                params: vec![DatabaseValue::Int64(1)],
            }
        );
    }

    #[test_log::test]
    fn delete_where_blank_clause_issues_nothing() {
        let db = RecordingDatabase::new();

        assert!(matches!(
            orm(&db).delete_where::<Person>("   "),
            Err(OrmError::MissingFilter { .. })
        ));
        assert!(db.statements().is_empty());
    }

    #[test_log::test]
    fn select_builds_entities_from_rows() {
        let db = RecordingDatabase::new().with_rows(vec![Row {
            columns: vec![
                ("id".into(), DatabaseValue::Int64(1)),
                ("name".into(), DatabaseValue::String("Ann".into())),
                ("age".into(), DatabaseValue::Int64(30)),
            ],
        }]);

        let person = orm(&db).select_by_id::<Person>(1).unwrap();

        assert_eq!(person, Some(ann()));
        assert_eq!(
            db.last_statement().unwrap().sql,
            "SELECT * FROM person WHERE id = ?"
        );
    }

    #[test_log::test]
    fn query_failure_names_table() {
        let db = RecordingDatabase::new();
        db.push_failure("syntax error");

        assert!(matches!(
            orm(&db).select_rows("person", &Filter::None),
            Err(OrmError::Query { table, .. }) if table == "person"
        ));
    }
}
