//! Static description of the types that map onto tables.
//!
//! A type becomes persistable by implementing [`Entity`], normally through the
//! [`entity!`](crate::entity) macro. The macro lists the fields once at compile time and
//! stores them in a `static` [`TypeDescriptor`], so no per-call introspection happens.
//!
//! Every field type implements [`ColumnValue`], which reports the declared [`Kind`] and
//! converts between the Rust value and a [`DatabaseValue`].

use chrono::NaiveDate;
use switchy_database::DatabaseValue;
use thiserror::Error;

use crate::OrmError;

/// The closed set of scalar categories that can be bound and extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Integer,
    String,
    Double,
    Character,
    Date,
}

impl Kind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::String => "string",
            Self::Double => "double",
            Self::Character => "character",
            Self::Date => "date",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One persisted field of an [`Entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Field name, also used as the column name.
    pub name: &'static str,
    /// Declared Rust type, for error messages.
    pub type_name: &'static str,
    /// `None` when the declared type is outside the supported kinds.
    pub kind: Option<Kind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub type_name: &'static str,
    /// Fields in declaration order.
    pub fields: &'static [FieldDescriptor],
}

impl TypeDescriptor {
    /// Looks up a field ignoring ASCII case.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'static FieldDescriptor> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Failed to convert {found} to type '{type_name}'")]
    ConvertType {
        type_name: &'static str,
        found: &'static str,
    },
    #[error("Value {value} out of range for type '{type_name}'")]
    OutOfRange {
        type_name: &'static str,
        value: i64,
    },
    #[error("NULL cannot be stored in non-optional type '{type_name}'")]
    UnexpectedNull { type_name: &'static str },
}

/// A Rust type that can be stored in a single column.
pub trait ColumnValue: Sized {
    const TYPE_NAME: &'static str;
    const KIND: Option<Kind>;

    /// The value to write, or `None` when the field is absent.
    fn to_value(&self) -> Option<DatabaseValue>;

    /// Converts a column read back from the database.
    ///
    /// `Ok(None)` means there was no value (SQL `NULL`). Only `Option<T>` turns that into
    /// a value of its own.
    ///
    /// # Errors
    ///
    /// * If the value cannot be represented as `Self`
    fn from_value(value: Option<DatabaseValue>) -> Result<Option<Self>, ParseError>;

    /// Stores a column read back from the database into `self`.
    ///
    /// # Errors
    ///
    /// * [`OrmError::InvalidValue`] naming `field` if the value cannot be represented
    ///   as `Self`, including SQL `NULL` read into a non-optional type
    fn assign(&mut self, field: &str, value: Option<DatabaseValue>) -> Result<(), OrmError> {
        *self = Self::from_value(value)
            .and_then(|value| {
                value.ok_or(ParseError::UnexpectedNull {
                    type_name: Self::TYPE_NAME,
                })
            })
            .map_err(|e| OrmError::InvalidValue {
                field: field.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }
}

macro_rules! integer_column {
    ($($ty:ty),* $(,)?) => {$(
        impl ColumnValue for $ty {
            const TYPE_NAME: &'static str = stringify!($ty);
            const KIND: Option<Kind> = Some(Kind::Integer);

            fn to_value(&self) -> Option<DatabaseValue> {
                Some(DatabaseValue::Int64(i64::from(*self)))
            }

            #[allow(clippy::unnecessary_fallible_conversions)]
            fn from_value(value: Option<DatabaseValue>) -> Result<Option<Self>, ParseError> {
                let Some(value) = value else {
                    return Ok(None);
                };
                let number = value.as_i64().ok_or(ParseError::ConvertType {
                    type_name: Self::TYPE_NAME,
                    found: value.type_name(),
                })?;

                Self::try_from(number)
                    .map(Some)
                    .map_err(|_| ParseError::OutOfRange {
                        type_name: Self::TYPE_NAME,
                        value: number,
                    })
            }
        }
    )*};
}

integer_column!(i8, i16, i32, i64, u8, u16, u32);

impl ColumnValue for String {
    const TYPE_NAME: &'static str = "String";
    const KIND: Option<Kind> = Some(Kind::String);

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::String(self.clone()))
    }

    fn from_value(value: Option<DatabaseValue>) -> Result<Option<Self>, ParseError> {
        match value {
            None => Ok(None),
            Some(DatabaseValue::String(value)) => Ok(Some(value)),
            Some(DatabaseValue::Char(value)) => Ok(Some(value.to_string())),
            Some(value) => Err(ParseError::ConvertType {
                type_name: Self::TYPE_NAME,
                found: value.type_name(),
            }),
        }
    }
}

impl ColumnValue for f64 {
    const TYPE_NAME: &'static str = "f64";
    const KIND: Option<Kind> = Some(Kind::Double);

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::Real64(*self))
    }

    fn from_value(value: Option<DatabaseValue>) -> Result<Option<Self>, ParseError> {
        value
            .map(|value| {
                value.as_f64().ok_or(ParseError::ConvertType {
                    type_name: Self::TYPE_NAME,
                    found: value.type_name(),
                })
            })
            .transpose()
    }
}

impl ColumnValue for f32 {
    const TYPE_NAME: &'static str = "f32";
    const KIND: Option<Kind> = Some(Kind::Double);

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::Real64(f64::from(*self)))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Option<DatabaseValue>) -> Result<Option<Self>, ParseError> {
        Ok(f64::from_value(value)?.map(|value| value as Self))
    }
}

impl ColumnValue for char {
    const TYPE_NAME: &'static str = "char";
    const KIND: Option<Kind> = Some(Kind::Character);

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::Char(*self))
    }

    fn from_value(value: Option<DatabaseValue>) -> Result<Option<Self>, ParseError> {
        value
            .map(|value| {
                value.as_char().ok_or(ParseError::ConvertType {
                    type_name: Self::TYPE_NAME,
                    found: value.type_name(),
                })
            })
            .transpose()
    }
}

impl ColumnValue for NaiveDate {
    const TYPE_NAME: &'static str = "NaiveDate";
    const KIND: Option<Kind> = Some(Kind::Date);

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::Date(*self))
    }

    fn from_value(value: Option<DatabaseValue>) -> Result<Option<Self>, ParseError> {
        value
            .map(|value| {
                value.as_date().ok_or(ParseError::ConvertType {
                    type_name: Self::TYPE_NAME,
                    found: value.type_name(),
                })
            })
            .transpose()
    }
}

/// Booleans can be declared on an entity but have no [`Kind`]; writing or reading one
/// fails with [`OrmError::UnsupportedType`].
impl ColumnValue for bool {
    const TYPE_NAME: &'static str = "bool";
    const KIND: Option<Kind> = None;

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::Bool(*self))
    }

    fn from_value(value: Option<DatabaseValue>) -> Result<Option<Self>, ParseError> {
        match value {
            None => Ok(None),
            Some(DatabaseValue::Bool(value)) => Ok(Some(value)),
            Some(DatabaseValue::Int64(value)) => Ok(Some(value != 0)),
            Some(value) => Err(ParseError::ConvertType {
                type_name: Self::TYPE_NAME,
                found: value.type_name(),
            }),
        }
    }
}

impl<T: ColumnValue> ColumnValue for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;
    const KIND: Option<Kind> = T::KIND;

    fn to_value(&self) -> Option<DatabaseValue> {
        self.as_ref().and_then(ColumnValue::to_value)
    }

    fn from_value(value: Option<DatabaseValue>) -> Result<Option<Self>, ParseError> {
        match value {
            None | Some(DatabaseValue::Null) => Ok(Some(None)),
            Some(value) => Ok(Some(T::from_value(Some(value))?)),
        }
    }
}

/// A type persisted as one row of a table.
///
/// Implement through [`entity!`](crate::entity) rather than by hand.
pub trait Entity: Default {
    fn descriptor() -> &'static TypeDescriptor;

    /// Table the type is stored in. Defaults to the type name.
    #[must_use]
    fn table_name() -> &'static str {
        Self::descriptor().type_name
    }

    /// Every field with its current value, in declaration order. Absent values are
    /// `None`.
    fn values(&self) -> Vec<(&'static str, Option<DatabaseValue>)>;

    /// Assigns a column read back from the database.
    ///
    /// # Errors
    ///
    /// * [`OrmError::InvalidValue`] if `field` is not declared on the type or the value
    ///   does not fit the field
    fn set_value(&mut self, field: &str, value: Option<DatabaseValue>) -> Result<(), OrmError>;

    /// Current value of one field, looked up ignoring ASCII case.
    #[must_use]
    fn value(&self, field: &str) -> Option<DatabaseValue> {
        self.values()
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(field))
            .and_then(|(_, value)| value)
    }
}

/// Declares a struct and implements [`Entity`] for it.
///
/// The struct derives `Default`; add any other derives as usual. The table name defaults
/// to the struct name and can be overridden with a leading `table = "...";`.
///
/// ```
/// use switchy_orm::{Entity, entity};
///
/// entity! {
///     table = "person";
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Person {
///         pub id: i64,
///         pub name: String,
///         pub age: i32,
///     }
/// }
///
/// assert_eq!(Person::table_name(), "person");
/// assert_eq!(Person::descriptor().fields.len(), 3);
/// ```
#[macro_export]
macro_rules! entity {
    (
        @impl $table:expr;
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$field_meta:meta])* $field_vis:vis $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Default)]
        $vis struct $name {
            $( $(#[$field_meta])* $field_vis $field: $ty ),*
        }

        impl $crate::Entity for $name {
            fn descriptor() -> &'static $crate::TypeDescriptor {
                static DESCRIPTOR: $crate::TypeDescriptor = $crate::TypeDescriptor {
                    type_name: stringify!($name),
                    fields: &[$(
                        $crate::FieldDescriptor {
                            name: stringify!($field),
                            type_name: <$ty as $crate::ColumnValue>::TYPE_NAME,
                            kind: <$ty as $crate::ColumnValue>::KIND,
                        }
                    ),*],
                };

                &DESCRIPTOR
            }

            fn table_name() -> &'static str {
                $table
            }

            fn values(&self) -> Vec<(&'static str, Option<$crate::DatabaseValue>)> {
                vec![$(
                    (stringify!($field), $crate::ColumnValue::to_value(&self.$field))
                ),*]
            }

            fn set_value(
                &mut self,
                field: &str,
                value: Option<$crate::DatabaseValue>,
            ) -> Result<(), $crate::OrmError> {
                $(
                    if field.eq_ignore_ascii_case(stringify!($field)) {
                        return $crate::ColumnValue::assign(&mut self.$field, stringify!($field), value);
                    }
                )*

                Err($crate::OrmError::InvalidValue {
                    field: field.to_string(),
                    message: format!("no such field on {}", stringify!($name)),
                })
            }
        }
    };
    (
        table = $table:literal;
        $($rest:tt)*
    ) => {
        $crate::entity!(@impl $table; $($rest)*);
    };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident { $($body:tt)* }
    ) => {
        $crate::entity!(@impl stringify!($name); $(#[$meta])* $vis struct $name { $($body)* });
    };
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    crate::entity! {
        #[derive(Debug, Clone, PartialEq)]
        struct Sample {
            id: i64,
            name: String,
            nickname: Option<String>,
            grade: char,
            score: f64,
            born: NaiveDate,
            active: bool,
        }
    }

    #[test_log::test]
    fn descriptor_lists_fields_in_declaration_order() {
        let names = Sample::descriptor()
            .fields
            .iter()
            .map(|field| field.name)
            .collect::<Vec<_>>();

        assert_eq!(
            names,
            vec!["id", "name", "nickname", "grade", "score", "born", "active"]
        );
        assert_eq!(Sample::table_name(), "Sample");
    }

    #[test_log::test]
    fn descriptor_reports_kinds() {
        let descriptor = Sample::descriptor();

        assert_eq!(descriptor.field("ID").unwrap().kind, Some(Kind::Integer));
        assert_eq!(descriptor.field("nickname").unwrap().kind, Some(Kind::String));
        assert_eq!(descriptor.field("grade").unwrap().kind, Some(Kind::Character));
        assert_eq!(descriptor.field("score").unwrap().kind, Some(Kind::Double));
        assert_eq!(descriptor.field("born").unwrap().kind, Some(Kind::Date));
        assert_eq!(descriptor.field("active").unwrap().kind, None);
        assert_eq!(descriptor.field("active").unwrap().type_name, "bool");
        assert!(descriptor.field("missing").is_none());
    }

    #[test_log::test]
    fn values_report_absent_options_as_none() {
        let sample = Sample {
            id: 4,
            name: "Ann".into(),
            ..Sample::default()
        };

        let values = sample.values();
        assert_eq!(values[0], ("id", Some(DatabaseValue::Int64(4))));
        assert_eq!(values[2], ("nickname", None));
        assert_eq!(sample.value("NAME"), Some(DatabaseValue::String("Ann".into())));
    }

    #[test_log::test]
    fn set_value_converts_and_clears_optional_fields() {
        let mut sample = Sample {
            nickname: Some("old".into()),
            ..Sample::default()
        };

        sample.set_value("id", Some(DatabaseValue::Int64(9))).unwrap();
        sample.set_value("nickname", None).unwrap();

        assert_eq!(sample.id, 9);
        assert_eq!(sample.nickname, None);
    }

    #[test_log::test]
    fn set_value_rejects_null_for_required_fields() {
        let mut sample = Sample {
            name: "kept".into(),
            ..Sample::default()
        };

        assert!(matches!(
            sample.set_value("name", None),
            Err(OrmError::InvalidValue { field, message })
                if field == "name" && message.contains("NULL")
        ));
        assert!(matches!(
            sample.set_value("born", None),
            Err(OrmError::InvalidValue { field, .. }) if field == "born"
        ));
        assert_eq!(sample.name, "kept");
    }

    #[test_log::test]
    fn set_value_rejects_unknown_field() {
        let mut sample = Sample::default();

        assert!(matches!(
            sample.set_value("nope", Some(DatabaseValue::Int64(1))),
            Err(OrmError::InvalidValue { field, .. }) if field == "nope"
        ));
    }

    #[test_log::test]
    fn narrow_integer_out_of_range_is_invalid() {
        assert!(matches!(
            i8::from_value(Some(DatabaseValue::Int64(300))),
            Err(ParseError::OutOfRange { type_name: "i8", value: 300 })
        ));
        assert_eq!(u16::from_value(Some(DatabaseValue::Int64(300))).unwrap(), Some(300));
    }

    #[test_log::test]
    fn unsigned_fields_write_signed_integers() {
        assert_eq!(7_u32.to_value(), Some(DatabaseValue::Int64(7)));
    }

    #[test_log::test]
    fn table_name_can_be_overridden() {
        crate::entity! {
            table = "people";
            struct Human {
                id: i64,
            }
        }

        assert_eq!(Human::table_name(), "people");
        assert_eq!(Human::descriptor().type_name, "Human");
    }
}
