//! Native wire representation of bound and defined values.
//!
//! Every value crosses the driver boundary as a [`WireBuffer`]: a fixed
//! capacity byte buffer, a used length, an external type code and a null
//! indicator. The codecs below define the byte layout per external type.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Engine data type code, either as reported by column metadata or as the
/// external type of a bound/defined buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeCode(pub u16);

impl TypeCode {
    pub const VARCHAR2: Self = Self(1);
    pub const NUMBER: Self = Self(2);
    /// Text terminated by the buffer length (external).
    pub const STRING: Self = Self(5);
    /// Exact decimal: 16-byte little-endian mantissa followed by a scale byte (external).
    pub const VARNUM: Self = Self(6);
    pub const ROWID: Self = Self(11);
    /// Seven-byte date, both internal and external.
    pub const DATE: Self = Self(12);
    pub const CHAR: Self = Self(96);
    pub const CURSOR: Self = Self(102);
    /// Result set handle (external).
    pub const RSET: Self = Self(116);

    pub fn name(self) -> &'static str {
        match self {
            Self::VARCHAR2 => "VARCHAR2",
            Self::NUMBER => "NUMBER",
            Self::STRING => "STRING",
            Self::VARNUM => "VARNUM",
            Self::ROWID => "ROWID",
            Self::DATE => "DATE",
            Self::CHAR => "CHAR",
            Self::CURSOR => "CURSOR",
            Self::RSET => "RSET",
            _ => "UNKNOWN",
        }
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

/// Null indicator. `-1` is NULL, `0` a complete value, a positive value the
/// original length of a truncated value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Indicator(pub i16);

impl Indicator {
    pub const NULL: Self = Self(-1);
    pub const NOT_NULL: Self = Self(0);

    pub fn is_null(self) -> bool {
        self.0 == -1
    }
}

/// Write did not fit into the buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overflow {
    pub needed: usize,
    pub capacity: usize,
}

/// Fixed capacity buffer exchanged with the driver.
///
/// Capacity is decided at construction; only the owning value may grow it,
/// which it can only do while holding `&mut`, i.e. never while a statement
/// has it defined.
#[derive(Clone)]
pub struct WireBuffer {
    type_code: TypeCode,
    indicator: Indicator,
    len: usize,
    data: Box<[u8]>,
}

impl WireBuffer {
    /// Creates a NULL buffer.
    pub fn new(type_code: TypeCode, capacity: usize) -> Self {
        Self {
            type_code,
            indicator: Indicator::NULL,
            len: 0,
            data: vec![0u8; capacity].into_boxed_slice(),
        }
    }

    pub fn type_code(&self) -> TypeCode {
        self.type_code
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    pub fn is_null(&self) -> bool {
        self.indicator.is_null()
    }

    /// Used bytes; empty when NULL.
    pub fn bytes(&self) -> &[u8] {
        if self.is_null() {
            &[]
        } else {
            &self.data[..self.len]
        }
    }

    pub fn set_null(&mut self) {
        self.indicator = Indicator::NULL;
        self.len = 0;
    }

    /// Overwrites the contents in place and clears the NULL indicator.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), Overflow> {
        if bytes.len() > self.data.len() {
            return Err(Overflow {
                needed: bytes.len(),
                capacity: self.data.len(),
            });
        }
        self.data[..bytes.len()].copy_from_slice(bytes);
        self.len = bytes.len();
        self.indicator = Indicator::NOT_NULL;
        Ok(())
    }

    /// Writes as much of `text` as fits and records the original byte length
    /// in the indicator. The cut never falls inside a UTF-8 character.
    pub fn write_truncated(&mut self, text: &str) {
        let bytes = text.as_bytes();
        let mut n = bytes.len().min(self.data.len());
        while !text.is_char_boundary(n) {
            n -= 1;
        }
        self.data[..n].copy_from_slice(&bytes[..n]);
        self.len = n;
        self.indicator = if n < bytes.len() {
            Indicator(i16::try_from(bytes.len()).unwrap_or(i16::MAX))
        } else {
            Indicator::NOT_NULL
        };
    }

    pub(crate) fn grow(&mut self, capacity: usize) {
        if capacity > self.data.len() {
            let mut data = vec![0u8; capacity];
            data[..self.len].copy_from_slice(&self.data[..self.len]);
            self.data = data.into_boxed_slice();
        }
    }
}

impl PartialEq for WireBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.type_code == other.type_code
            && self.indicator == other.indicator
            && self.bytes() == other.bytes()
    }
}

impl Eq for WireBuffer {}

impl fmt::Debug for WireBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireBuffer")
            .field("type_code", &self.type_code)
            .field("indicator", &self.indicator.0)
            .field("len", &self.len)
            .field("capacity", &self.data.len())
            .finish()
    }
}

pub const NUMBER_WIRE_SIZE: usize = 17;
pub const DATE_WIRE_SIZE: usize = 7;
pub const CURSOR_WIRE_SIZE: usize = 8;

/// Largest number of decimal digits a number value may carry.
pub const MAX_NUMBER_DIGITS: u32 = 38;

pub fn encode_number(mantissa: i128, scale: u8) -> [u8; NUMBER_WIRE_SIZE] {
    let mut out = [0u8; NUMBER_WIRE_SIZE];
    out[..16].copy_from_slice(&mantissa.to_le_bytes());
    out[16] = scale;
    out
}

pub fn decode_number(bytes: &[u8]) -> Option<(i128, u8)> {
    if bytes.len() != NUMBER_WIRE_SIZE {
        return None;
    }
    let mut mantissa = [0u8; 16];
    mantissa.copy_from_slice(&bytes[..16]);
    Some((i128::from_le_bytes(mantissa), bytes[16]))
}

/// Seven-byte date: century+100, year-in-century+100, month, day, hour+1,
/// minute+1, second+1.
pub fn encode_date(value: &NaiveDateTime) -> Option<[u8; DATE_WIRE_SIZE]> {
    let year = value.year();
    if !(-4712..=9999).contains(&year) || year == 0 {
        return None;
    }
    let century = year.div_euclid(100);
    let in_century = year.rem_euclid(100);
    Some([
        u8::try_from(century + 100).ok()?,
        u8::try_from(in_century + 100).ok()?,
        u8::try_from(value.month()).ok()?,
        u8::try_from(value.day()).ok()?,
        u8::try_from(value.hour() + 1).ok()?,
        u8::try_from(value.minute() + 1).ok()?,
        u8::try_from(value.second() + 1).ok()?,
    ])
}

pub fn decode_date(bytes: &[u8]) -> Option<NaiveDateTime> {
    if bytes.len() != DATE_WIRE_SIZE {
        return None;
    }
    let year = (i32::from(bytes[0]) - 100) * 100 + (i32::from(bytes[1]) - 100);
    NaiveDate::from_ymd_opt(year, u32::from(bytes[2]), u32::from(bytes[3]))?.and_hms_opt(
        u32::from(bytes[4]).checked_sub(1)?,
        u32::from(bytes[5]).checked_sub(1)?,
        u32::from(bytes[6]).checked_sub(1)?,
    )
}

pub fn encode_cursor(handle: u64) -> [u8; CURSOR_WIRE_SIZE] {
    handle.to_le_bytes()
}

pub fn decode_cursor(bytes: &[u8]) -> Option<u64> {
    let bytes: [u8; CURSOR_WIRE_SIZE] = bytes.try_into().ok()?;
    Some(u64::from_le_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::wire::{self, Indicator, TypeCode, WireBuffer};

    #[test]
    fn new_buffer_is_null() {
        let buf = WireBuffer::new(TypeCode::STRING, 10);
        assert!(buf.is_null());
        assert!(buf.bytes().is_empty());
        assert_eq!(buf.capacity(), 10);
    }

    #[test]
    fn write_rejects_overflow_without_touching_contents() {
        let mut buf = WireBuffer::new(TypeCode::STRING, 3);
        buf.write(b"abc").expect("must fit");
        let err = buf.write(b"abcd").expect_err("must overflow");
        assert_eq!(err.needed, 4);
        assert_eq!(buf.bytes(), b"abc");
    }

    #[test]
    fn truncated_write_records_original_length() {
        let mut buf = WireBuffer::new(TypeCode::STRING, 2);
        buf.write_truncated("hello");
        assert_eq!(buf.bytes(), b"he");
        assert_eq!(buf.indicator(), Indicator(5));
        assert!(!buf.is_null());
    }

    #[test]
    fn truncated_write_keeps_whole_characters() {
        let mut buf = WireBuffer::new(TypeCode::STRING, 2);
        buf.write_truncated("h\u{e9}llo");
        assert_eq!(buf.bytes(), b"h");
        assert_eq!(buf.indicator(), Indicator(6));
        assert!(std::str::from_utf8(buf.bytes()).is_ok());

        let mut buf = WireBuffer::new(TypeCode::STRING, 3);
        buf.write_truncated("h\u{e9}llo");
        assert_eq!(std::str::from_utf8(buf.bytes()), Ok("h\u{e9}"));
    }

    #[test]
    fn date_layout_matches_century_encoding() {
        let dt = NaiveDate::from_ymd_opt(2001, 2, 3)
            .and_then(|d| d.and_hms_opt(4, 5, 6))
            .expect("must build date");
        let bytes = wire::encode_date(&dt).expect("must encode");
        assert_eq!(bytes, [120, 101, 2, 3, 5, 6, 7]);
        assert_eq!(wire::decode_date(&bytes), Some(dt));
    }

    #[test]
    fn date_rejects_year_zero() {
        let dt = NaiveDate::from_ymd_opt(0, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("must build date");
        assert!(wire::encode_date(&dt).is_none());
    }

    #[test]
    fn number_decode_requires_exact_size() {
        assert!(wire::decode_number(&[0u8; 4]).is_none());
        let bytes = wire::encode_number(-1234, 2);
        assert_eq!(wire::decode_number(&bytes), Some((-1234, 2)));
    }
}
