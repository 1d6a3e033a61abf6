//! Conversion between values and bind parameters or result columns.
//!
//! Writes dispatch on the runtime variant of the value, reads on the declared [`Kind`]
//! of the field. Both go through [`Kind::of`] or a `match` on [`Kind`], so supporting
//! another scalar category means extending [`Kind`] and the two matches here.

use chrono::NaiveDate;
use switchy_database::{DatabaseValue, Row};

use crate::{
    OrmError,
    descriptor::{FieldDescriptor, Kind},
    statement::Statement,
};

impl Kind {
    /// Kind of a runtime value.
    ///
    /// # Errors
    ///
    /// * [`OrmError::UnsupportedType`] for `Null`, `Bool` and any other variant outside
    ///   the supported kinds
    pub fn of(value: &DatabaseValue) -> Result<Self, OrmError> {
        Ok(match value {
            DatabaseValue::Int64(_) | DatabaseValue::UInt64(_) => Self::Integer,
            DatabaseValue::String(_) => Self::String,
            DatabaseValue::Real64(_) => Self::Double,
            DatabaseValue::Char(_) => Self::Character,
            DatabaseValue::Date(_) | DatabaseValue::DateTime(_) => Self::Date,
            DatabaseValue::Null | DatabaseValue::Bool(_) => {
                return Err(OrmError::UnsupportedType {
                    type_name: value.type_name().to_string(),
                });
            }
        })
    }
}

/// Binds `value` at the 1-based `position` of `statement`.
///
/// The value is stored in its canonical form: unsigned integers become `Int64` and
/// datetimes lose their time of day.
///
/// # Errors
///
/// * [`OrmError::UnsupportedType`] if the value is not one of the supported kinds
/// * [`OrmError::InvalidValue`] if the position skips a parameter or an unsigned
///   integer does not fit a signed one
pub fn bind_parameter(
    statement: &mut Statement,
    position: usize,
    value: &DatabaseValue,
) -> Result<(), OrmError> {
    let value = match (Kind::of(value)?, value) {
        (Kind::Integer, DatabaseValue::UInt64(number)) => {
            DatabaseValue::Int64(i64::try_from(*number).map_err(|_| OrmError::InvalidValue {
                field: format!("?{position}"),
                message: format!("{number} does not fit a signed 64-bit integer"),
            })?)
        }
        (Kind::Date, DatabaseValue::DateTime(datetime)) => DatabaseValue::Date(datetime.date()),
        (_, value) => value.clone(),
    };

    let params = &mut statement.params;

    match position {
        0 => {
            return Err(OrmError::InvalidValue {
                field: "?0".to_string(),
                message: "parameter positions start at 1".to_string(),
            });
        }
        p if p <= params.len() => params[p - 1] = value,
        p if p == params.len() + 1 => params.push(value),
        p => {
            return Err(OrmError::InvalidValue {
                field: format!("?{p}"),
                message: format!("only {} parameters are bound", params.len()),
            });
        }
    }

    Ok(())
}

/// Reads the column for `field` from `row` as the field's declared kind.
///
/// SQL `NULL` is returned as `None`. Other values come back in the canonical variant for
/// the kind: `Int64`, `String`, `Real64`, `Char` or `Date`.
///
/// # Errors
///
/// * [`OrmError::UnsupportedType`] if the field's declared type has no kind
/// * [`OrmError::InvalidValue`] if the column is missing or cannot be read as the kind
pub fn extract_column(row: &Row, field: &FieldDescriptor) -> Result<Option<DatabaseValue>, OrmError> {
    let kind = field.kind.ok_or_else(|| OrmError::UnsupportedType {
        type_name: field.type_name.to_string(),
    })?;

    let value = row.get(field.name).ok_or_else(|| OrmError::InvalidValue {
        field: field.name.to_string(),
        message: "column not present in result".to_string(),
    })?;

    if value.is_null() {
        return Ok(None);
    }

    let extracted = match kind {
        Kind::Integer => match &value {
            DatabaseValue::String(text) => text.trim().parse::<i64>().ok(),
            value => value.as_i64(),
        }
        .map(DatabaseValue::Int64),
        Kind::String => Some(DatabaseValue::String(value.to_string())),
        Kind::Double => match &value {
            DatabaseValue::String(text) => text.trim().parse::<f64>().ok(),
            value => value.as_f64(),
        }
        .map(DatabaseValue::Real64),
        Kind::Character => value.as_char().map(DatabaseValue::Char),
        Kind::Date => match &value {
            DatabaseValue::String(text) => parse_date(text),
            value => value.as_date(),
        }
        .map(DatabaseValue::Date),
    };

    extracted.map(Some).ok_or_else(|| OrmError::InvalidValue {
        field: field.name.to_string(),
        message: format!("cannot read {} '{value}' as {kind}", value.type_name()),
    })
}

/// Accepts `YYYY-MM-DD` optionally followed by a time of day.
fn parse_date(text: &str) -> Option<NaiveDate> {
    let date = text.trim().get(..10)?;

    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn field(name: &'static str, kind: Option<Kind>) -> FieldDescriptor {
        FieldDescriptor {
            name,
            type_name: "test",
            kind,
        }
    }

    fn row(columns: &[(&str, DatabaseValue)]) -> Row {
        Row {
            columns: columns
                .iter()
                .map(|(name, value)| ((*name).to_string(), value.clone()))
                .collect(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test_log::test]
    fn kind_of_rejects_bool_and_null() {
        assert!(matches!(
            Kind::of(&DatabaseValue::Bool(true)),
            Err(OrmError::UnsupportedType { type_name }) if type_name == "Bool"
        ));
        assert!(matches!(
            Kind::of(&DatabaseValue::Null),
            Err(OrmError::UnsupportedType { type_name }) if type_name == "Null"
        ));
        assert_eq!(Kind::of(&DatabaseValue::Char('x')).unwrap(), Kind::Character);
    }

    #[test_log::test]
    fn bind_parameter_normalizes_datetime_to_date() {
        let mut statement = Statement::default();
        let datetime = date(2020, 1, 2).and_hms_opt(23, 59, 59).unwrap();

        bind_parameter(&mut statement, 1, &DatabaseValue::DateTime(datetime)).unwrap();
        bind_parameter(&mut statement, 2, &DatabaseValue::UInt64(5)).unwrap();

        assert_eq!(
            statement.params,
            vec![
                DatabaseValue::Date(date(2020, 1, 2)),
                DatabaseValue::Int64(5)
            ]
        );
    }

    #[test_log::test]
    fn bind_parameter_replaces_existing_position() {
        let mut statement = Statement::default();

        bind_parameter(&mut statement, 1, &DatabaseValue::Int64(1)).unwrap();
        bind_parameter(&mut statement, 1, &DatabaseValue::Int64(2)).unwrap();

        assert_eq!(statement.params, vec![DatabaseValue::Int64(2)]);
    }

    #[test_log::test]
    fn bind_parameter_rejects_gaps_and_unsupported_values() {
        let mut statement = Statement::default();

        assert!(matches!(
            bind_parameter(&mut statement, 3, &DatabaseValue::Int64(1)),
            Err(OrmError::InvalidValue { .. })
        ));
        assert!(matches!(
            bind_parameter(&mut statement, 1, &DatabaseValue::Bool(false)),
            Err(OrmError::UnsupportedType { .. })
        ));
        assert!(statement.params.is_empty());
    }

    #[test_log::test]
    fn extract_column_dispatches_on_declared_kind() {
        let row = row(&[
            ("id", DatabaseValue::Int64(3)),
            ("grade", DatabaseValue::String("B".into())),
            ("score", DatabaseValue::Int64(7)),
            ("born", DatabaseValue::String("1990-05-17".into())),
            ("seen", DatabaseValue::String("2021-03-04 10:11:12".into())),
            ("name", DatabaseValue::Int64(42)),
        ]);

        assert_eq!(
            extract_column(&row, &field("id", Some(Kind::Integer))).unwrap(),
            Some(DatabaseValue::Int64(3))
        );
        assert_eq!(
            extract_column(&row, &field("grade", Some(Kind::Character))).unwrap(),
            Some(DatabaseValue::Char('B'))
        );
        assert_eq!(
            extract_column(&row, &field("score", Some(Kind::Double))).unwrap(),
            Some(DatabaseValue::Real64(7.0))
        );
        assert_eq!(
            extract_column(&row, &field("born", Some(Kind::Date))).unwrap(),
            Some(DatabaseValue::Date(date(1990, 5, 17)))
        );
        assert_eq!(
            extract_column(&row, &field("seen", Some(Kind::Date))).unwrap(),
            Some(DatabaseValue::Date(date(2021, 3, 4)))
        );
        assert_eq!(
            extract_column(&row, &field("name", Some(Kind::String))).unwrap(),
            Some(DatabaseValue::String("42".into()))
        );
    }

    #[test_log::test]
    fn extract_column_returns_none_for_null() {
        let row = row(&[("nickname", DatabaseValue::Null)]);

        assert_eq!(
            extract_column(&row, &field("nickname", Some(Kind::String))).unwrap(),
            None
        );
    }

    #[test_log::test]
    fn extract_column_rejects_unsupported_declared_kind() {
        let row = row(&[("active", DatabaseValue::Int64(1))]);

        assert!(matches!(
            extract_column(&row, &field("active", None)),
            Err(OrmError::UnsupportedType { type_name }) if type_name == "test"
        ));
    }

    #[test_log::test]
    fn extract_column_rejects_unreadable_values() {
        let row = row(&[
            ("id", DatabaseValue::String("abc".into())),
            ("grade", DatabaseValue::String(String::new())),
        ]);

        assert!(matches!(
            extract_column(&row, &field("id", Some(Kind::Integer))),
            Err(OrmError::InvalidValue { field, .. }) if field == "id"
        ));
        assert!(matches!(
            extract_column(&row, &field("grade", Some(Kind::Character))),
            Err(OrmError::InvalidValue { .. })
        ));
        assert!(matches!(
            extract_column(&row, &field("missing", Some(Kind::Integer))),
            Err(OrmError::InvalidValue { .. })
        ));
    }
}
