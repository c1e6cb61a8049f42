//! Nullable typed values moved across the native boundary.

mod cursor;
mod date;
mod number;
mod text;

use std::fmt;

use chrono::NaiveDateTime;
use serde::ser::{Error as _, Serialize, Serializer};

pub use cursor::Cursor;
pub use date::{Date, DEFAULT_DATE_FORMAT};
pub use number::Number;
pub(crate) use number::{format_decimal, parse_decimal};
pub use text::Varchar;

use crate::{
    options::StatementOptions,
    schema::ColumnSchema,
    wire::{TypeCode, WireBuffer},
    ErrorContext, Result, SqlCallError,
};

/// One scalar datum that may be SQL NULL.
#[derive(Clone, Debug)]
pub enum NullableValue {
    Text(Varchar),
    Number(Number),
    Date(Date),
    Cursor(Cursor),
}

impl NullableValue {
    pub fn null_text(max_size: usize) -> Self {
        Self::Text(Varchar::new(max_size))
    }

    pub fn text(value: impl AsRef<str>) -> Self {
        Self::Text(Varchar::from(value.as_ref()))
    }

    pub fn null_number() -> Self {
        Self::Number(Number::new())
    }

    pub fn integer(value: i64) -> Self {
        Self::Number(Number::from(value))
    }

    pub fn decimal(value: &str) -> Result<Self> {
        Number::parse(value).map(Self::Number)
    }

    pub fn real(value: f64) -> Result<Self> {
        Number::from_f64(value).map(Self::Number)
    }

    pub fn null_date() -> Self {
        Self::Date(Date::new())
    }

    pub fn date(value: &NaiveDateTime) -> Result<Self> {
        let mut date = Date::new();
        date.set(value)?;
        Ok(Self::Date(date))
    }

    pub fn cursor() -> Self {
        Self::Cursor(Cursor::new())
    }

    /// Whether [`for_column`](Self::for_column) has a variant for `type_code`.
    pub fn supports_type(type_code: TypeCode) -> bool {
        matches!(
            type_code,
            TypeCode::VARCHAR2
                | TypeCode::ROWID
                | TypeCode::CHAR
                | TypeCode::NUMBER
                | TypeCode::DATE
                | TypeCode::CURSOR
                | TypeCode::RSET
        )
    }

    /// Creates the NULL container matching a column's engine type.
    pub fn for_column(column: &ColumnSchema, options: &StatementOptions) -> Result<Self> {
        match column.type_code {
            TypeCode::VARCHAR2 | TypeCode::ROWID | TypeCode::CHAR => {
                Ok(Self::null_text(column.size))
            }
            TypeCode::NUMBER => Ok(Self::Number(Number::with_precision(
                column.precision,
                column.scale,
            ))),
            TypeCode::DATE => Ok(Self::Date(Date::with_format(options.date_format.clone()))),
            TypeCode::CURSOR | TypeCode::RSET => Ok(Self::cursor()),
            other => Err(SqlCallError::type_mismatch(
                "NullableValue::for_column",
                format!("unsupported engine data type {other}"),
            )
            .with_context(
                ErrorContext::new()
                    .with("column", &column.name)
                    .with("position", column.position),
            )),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            Self::Text(v) => v.is_null(),
            Self::Number(v) => v.is_null(),
            Self::Date(v) => v.is_null(),
            Self::Cursor(v) => v.is_null(),
        }
    }

    pub fn set_null(&mut self) {
        match self {
            Self::Text(v) => v.set_null(),
            Self::Number(v) => v.set_null(),
            Self::Date(v) => v.set_null(),
            Self::Cursor(v) => v.set_null(),
        }
    }

    pub fn as_string(&self) -> Result<String> {
        match self {
            Self::Text(v) => v.as_string(),
            Self::Number(v) => v.as_string(),
            Self::Date(v) => v.as_string(),
            Self::Cursor(v) => Err(v.scalar_error("NullableValue::as_string")),
        }
    }

    /// Like [`as_string`](Self::as_string) but renders with `format`.
    /// Only dates use the format; other variants ignore it.
    pub fn as_string_fmt(&self, format: &str) -> Result<String> {
        match self {
            Self::Date(v) => v.as_string_fmt(format),
            other => other.as_string(),
        }
    }

    pub fn as_integer(&self) -> Result<i64> {
        match self {
            Self::Text(v) => v.as_integer(),
            Self::Number(v) => v.as_integer(),
            Self::Date(v) => v.as_integer(),
            Self::Cursor(v) => Err(v.scalar_error("NullableValue::as_integer")),
        }
    }

    pub fn as_real(&self) -> Result<f64> {
        match self {
            Self::Text(v) => v.as_real(),
            Self::Number(v) => v.as_real(),
            Self::Date(v) => v.as_real(),
            Self::Cursor(v) => Err(v.scalar_error("NullableValue::as_real")),
        }
    }

    /// Returns `default` when NULL. Never fails on NULL; a non-NULL value
    /// that cannot be converted, or any cursor, still fails.
    pub fn as_string_or(&self, default: &str) -> Result<String> {
        match self {
            Self::Cursor(v) => Err(v.scalar_error("NullableValue::as_string_or")),
            v if v.is_null() => Ok(default.to_owned()),
            v => v.as_string(),
        }
    }

    pub fn as_integer_or(&self, default: i64) -> Result<i64> {
        match self {
            Self::Cursor(v) => Err(v.scalar_error("NullableValue::as_integer_or")),
            v if v.is_null() => Ok(default),
            v => v.as_integer(),
        }
    }

    pub fn as_real_or(&self, default: f64) -> Result<f64> {
        match self {
            Self::Cursor(v) => Err(v.scalar_error("NullableValue::as_real_or")),
            v if v.is_null() => Ok(default),
            v => v.as_real(),
        }
    }

    /// Engine-safe literal text; `NULL` for any NULL scalar.
    pub fn sql_literal(&self) -> Result<String> {
        match self {
            Self::Text(v) => v.sql_literal(),
            Self::Number(v) => v.sql_literal(),
            Self::Date(v) => v.sql_literal(),
            Self::Cursor(v) => v.sql_literal(),
        }
    }

    pub fn type_code(&self) -> TypeCode {
        match self {
            Self::Text(v) => v.type_code(),
            Self::Number(v) => v.type_code(),
            Self::Date(v) => v.type_code(),
            Self::Cursor(v) => v.type_code(),
        }
    }

    pub fn max_wire_size(&self) -> usize {
        match self {
            Self::Text(v) => v.max_wire_size(),
            Self::Number(v) => v.max_wire_size(),
            Self::Date(v) => v.max_wire_size(),
            Self::Cursor(v) => v.max_wire_size(),
        }
    }

    pub(crate) fn wire(&self) -> &WireBuffer {
        match self {
            Self::Text(v) => v.wire(),
            Self::Number(v) => v.wire(),
            Self::Date(v) => v.wire(),
            Self::Cursor(v) => v.wire(),
        }
    }

    pub(crate) fn wire_mut(&mut self) -> &mut WireBuffer {
        match self {
            Self::Text(v) => v.wire_mut(),
            Self::Number(v) => v.wire_mut(),
            Self::Date(v) => v.wire_mut(),
            Self::Cursor(v) => v.wire_mut(),
        }
    }
}

/// SQL equality: NULL equals nothing, cursors compare by handle, other
/// values by content within the same variant.
impl PartialEq for NullableValue {
    fn eq(&self, other: &Self) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a.wire().bytes() == b.wire().bytes(),
            (Self::Number(a), Self::Number(b)) => {
                matches!((a.decimal(), b.decimal()), (Ok(x), Ok(y)) if x == y)
            }
            (Self::Date(a), Self::Date(b)) => {
                matches!((a.value(), b.value()), (Ok(x), Ok(y)) if x == y)
            }
            (Self::Cursor(a), Self::Cursor(b)) => a.handle() == b.handle(),
            _ => false,
        }
    }
}

impl fmt::Display for NullableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cursor(_) => f.write_str("<CURSOR>"),
            value => match value.as_string_or("<NULL>") {
                Ok(text) => f.write_str(&text),
                Err(_) => f.write_str("<INVALID>"),
            },
        }
    }
}

impl Serialize for NullableValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        if let Self::Cursor(_) = self {
            return Err(S::Error::custom("cursor values cannot be serialized"));
        }
        if self.is_null() {
            return serializer.serialize_none();
        }
        let text = self.as_string().map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl From<String> for NullableValue {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<&str> for NullableValue {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<i64> for NullableValue {
    fn from(value: i64) -> Self {
        Self::integer(value)
    }
}

impl From<i32> for NullableValue {
    fn from(value: i32) -> Self {
        Self::integer(value.into())
    }
}

impl From<Varchar> for NullableValue {
    fn from(value: Varchar) -> Self {
        Self::Text(value)
    }
}

impl From<Number> for NullableValue {
    fn from(value: Number) -> Self {
        Self::Number(value)
    }
}

impl From<Date> for NullableValue {
    fn from(value: Date) -> Self {
        Self::Date(value)
    }
}

impl From<Cursor> for NullableValue {
    fn from(value: Cursor) -> Self {
        Self::Cursor(value)
    }
}

impl TryFrom<f64> for NullableValue {
    type Error = SqlCallError;

    fn try_from(value: f64) -> Result<Self> {
        Self::real(value)
    }
}

impl TryFrom<NaiveDateTime> for NullableValue {
    type Error = SqlCallError;

    fn try_from(value: NaiveDateTime) -> Result<Self> {
        Self::date(&value)
    }
}

/// Doubles single quotes so `text` can sit inside a SQL string literal.
pub fn sql_quote(text: &str) -> String {
    text.replace('\'', "''")
}

pub(crate) fn null_error(op: &'static str, target: &str) -> SqlCallError {
    SqlCallError::value(op, format!("cannot convert NULL to {target}"))
}

#[cfg(test)]
mod tests {
    use crate::{
        options::StatementOptions,
        schema::ColumnSchema,
        value::{sql_quote, NullableValue},
        wire::TypeCode,
        ErrorKind,
    };

    fn column(type_code: TypeCode, size: usize) -> ColumnSchema {
        ColumnSchema {
            position: 0,
            name: "C".to_owned(),
            type_code,
            size,
            precision: 0,
            scale: 0,
        }
    }

    #[test]
    fn helper_constructors() {
        assert_eq!(NullableValue::integer(7).as_integer().expect("must convert"), 7);
        assert_eq!(NullableValue::text("abc").as_string().expect("must convert"), "abc");
        assert_eq!(
            NullableValue::decimal("1.25").expect("must parse").as_real().expect("must convert"),
            1.25
        );
        assert!(NullableValue::null_text(10).is_null());
    }

    #[test]
    fn null_conversion_without_default_fails() {
        let mut value = NullableValue::text("hello");
        value.set_null();
        let err = value.as_string().expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::Value);
        assert!(err.to_string().contains("cannot convert NULL"));
        assert!(value.as_integer().is_err());
        assert!(value.as_real().is_err());
    }

    #[test]
    fn null_conversion_with_default_returns_default() {
        let mut value = NullableValue::text("hello");
        value.set_null();
        assert_eq!(value.as_string_or("N/A").expect("must default"), "N/A");
        assert_eq!(NullableValue::null_number().as_integer_or(-1).expect("must default"), -1);
        assert_eq!(NullableValue::null_date().as_real_or(0.5).expect("must default"), 0.5);
    }

    #[test]
    fn null_literal_ignores_variant() {
        assert_eq!(NullableValue::null_text(5).sql_literal().expect("must render"), "NULL");
        assert_eq!(NullableValue::null_number().sql_literal().expect("must render"), "NULL");
        assert_eq!(NullableValue::null_date().sql_literal().expect("must render"), "NULL");
    }

    #[test]
    fn cursor_refuses_even_defaulted_conversions() {
        let cursor = NullableValue::cursor();
        for err in [
            cursor.as_string_or("x").expect_err("must fail"),
            cursor.as_integer_or(1).expect_err("must fail"),
            cursor.as_real_or(1.0).expect_err("must fail"),
            cursor.as_string().expect_err("must fail"),
        ] {
            assert_eq!(err.kind(), ErrorKind::Type);
        }
    }

    #[test]
    fn factory_maps_engine_type_codes() {
        let options = StatementOptions::default();
        let text = NullableValue::for_column(&column(TypeCode::VARCHAR2, 40), &options)
            .expect("must map");
        assert!(matches!(text, NullableValue::Text(_)));
        assert_eq!(text.max_wire_size(), 40);
        assert!(matches!(
            NullableValue::for_column(&column(TypeCode::CHAR, 1), &options),
            Ok(NullableValue::Text(_))
        ));
        assert!(matches!(
            NullableValue::for_column(&column(TypeCode::NUMBER, 22), &options),
            Ok(NullableValue::Number(_))
        ));
        assert!(matches!(
            NullableValue::for_column(&column(TypeCode::DATE, 7), &options),
            Ok(NullableValue::Date(_))
        ));
        let err = NullableValue::for_column(&column(TypeCode(113), 4000), &options)
            .expect_err("must reject");
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(err.context().get("column"), Some("C"));
    }

    #[test]
    fn null_never_equals_null() {
        assert_ne!(NullableValue::null_number(), NullableValue::null_number());
        assert_eq!(NullableValue::integer(42), NullableValue::decimal("42.0").expect("must parse"));
        assert_ne!(NullableValue::integer(42), NullableValue::text("42"));
    }

    #[test]
    fn display_marks_null() {
        assert_eq!(NullableValue::null_text(3).to_string(), "<NULL>");
        assert_eq!(NullableValue::integer(3).to_string(), "3");
    }

    #[test]
    fn quote_doubles_apostrophes() {
        assert_eq!(sql_quote("it's"), "it''s");
    }
}
