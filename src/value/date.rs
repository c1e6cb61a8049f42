use std::fmt::Write as _;

use chrono::{format::StrftimeItems, Datelike, NaiveDateTime};

use crate::{
    value::null_error,
    wire::{self, TypeCode, WireBuffer, DATE_WIRE_SIZE},
    Result, SqlCallError,
};

/// Default text format, the engine's `YYYY/MM/DD HH24:MI:SS`.
pub const DEFAULT_DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Engine-side mask matching [`DEFAULT_DATE_FORMAT`], used in literals.
const ENGINE_DATE_MASK: &str = "YYYY/MM/DD HH24:MI:SS";

/// Days between the Julian day epoch and `0001-01-01` minus one.
const JULIAN_DAY_OFFSET: i64 = 1_721_425;

/// Date and time with second precision, with a configurable text format.
#[derive(Clone, Debug)]
pub struct Date {
    buf: WireBuffer,
    format: String,
}

impl Default for Date {
    fn default() -> Self {
        Self::new()
    }
}

impl Date {
    pub fn new() -> Self {
        Self::with_format(DEFAULT_DATE_FORMAT)
    }

    /// Creates a NULL date that renders and parses text with `format`
    /// (chrono strftime syntax).
    pub fn with_format(format: impl Into<String>) -> Self {
        Self {
            buf: WireBuffer::new(TypeCode::DATE, DATE_WIRE_SIZE),
            format: format.into(),
        }
    }

    /// Parses `text` with `format`, which the date keeps for rendering.
    pub fn parse(text: &str, format: &str) -> Result<Self> {
        let mut date = Self::with_format(format);
        date.set_str(text)?;
        Ok(date)
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn set_format(&mut self, format: impl Into<String>) {
        self.format = format.into();
    }

    pub fn set(&mut self, value: &NaiveDateTime) -> Result<()> {
        let bytes = wire::encode_date(value).ok_or_else(|| {
            SqlCallError::value(
                "Date::set",
                format!("{value} is outside the supported range -4712..9999"),
            )
        })?;
        // Fixed-size encoding always fits the fixed-size buffer.
        let _ = self.buf.write(&bytes);
        Ok(())
    }

    pub fn set_str(&mut self, text: &str) -> Result<()> {
        let value = NaiveDateTime::parse_from_str(text, &self.format).map_err(|err| {
            SqlCallError::value(
                "Date::set_str",
                format!("'{text}' does not match format '{}': {err}", self.format),
            )
        })?;
        self.set(&value)
    }

    pub fn is_null(&self) -> bool {
        self.buf.is_null()
    }

    pub fn set_null(&mut self) {
        self.buf.set_null();
    }

    pub fn value(&self) -> Result<NaiveDateTime> {
        if self.is_null() {
            return Err(null_error("Date::value", "date"));
        }
        wire::decode_date(self.buf.bytes())
            .ok_or_else(|| SqlCallError::value("Date::value", "malformed date in wire buffer"))
    }

    pub fn as_string(&self) -> Result<String> {
        self.as_string_fmt(&self.format)
    }

    pub fn as_string_fmt(&self, format: &str) -> Result<String> {
        format_datetime(&self.value()?, format)
    }

    /// Julian day number.
    pub fn as_integer(&self) -> Result<i64> {
        Ok(i64::from(self.value()?.num_days_from_ce()) + JULIAN_DAY_OFFSET)
    }

    /// Julian day number as a real.
    pub fn as_real(&self) -> Result<f64> {
        self.as_integer().map(|days| days as f64)
    }

    pub fn sql_literal(&self) -> Result<String> {
        if self.is_null() {
            return Ok("NULL".to_owned());
        }
        let text = format_datetime(&self.value()?, DEFAULT_DATE_FORMAT)?;
        Ok(format!("TO_DATE('{text}', '{ENGINE_DATE_MASK}')"))
    }

    pub fn type_code(&self) -> TypeCode {
        self.buf.type_code()
    }

    pub fn max_wire_size(&self) -> usize {
        self.buf.capacity()
    }

    pub(crate) fn wire(&self) -> &WireBuffer {
        &self.buf
    }

    pub(crate) fn wire_mut(&mut self) -> &mut WireBuffer {
        &mut self.buf
    }
}

fn format_datetime(value: &NaiveDateTime, format: &str) -> Result<String> {
    let items = StrftimeItems::new(format);
    let mut out = String::new();
    write!(out, "{}", value.format_with_items(items)).map_err(|_| {
        SqlCallError::value(
            "Date::as_string",
            format!("invalid date format '{format}'"),
        )
    })?;
    Ok(out)
}
