use crate::{
    value::{null_error, sql_quote},
    wire::{TypeCode, WireBuffer},
    Result, SqlCallError,
};

/// Variable-length text bounded by a maximum byte size.
#[derive(Clone, Debug)]
pub struct Varchar {
    buf: WireBuffer,
}

impl Varchar {
    /// Creates a NULL text value able to hold `max_size` bytes.
    pub fn new(max_size: usize) -> Self {
        Self {
            buf: WireBuffer::new(TypeCode::STRING, max_size),
        }
    }

    /// Stores `value`, growing the buffer if it is too small.
    pub fn set(&mut self, value: &str) {
        self.buf.grow(value.len());
        // Cannot overflow after grow.
        let _ = self.buf.write(value.as_bytes());
    }

    pub fn is_null(&self) -> bool {
        self.buf.is_null()
    }

    pub fn set_null(&mut self) {
        self.buf.set_null();
    }

    /// True when the engine had to cut the value to fit the buffer.
    pub fn is_truncated(&self) -> bool {
        self.buf.indicator().0 > 0
    }

    pub fn as_str(&self) -> Result<&str> {
        if self.is_null() {
            return Err(null_error("Varchar::as_str", "string"));
        }
        std::str::from_utf8(self.buf.bytes()).map_err(|err| {
            SqlCallError::value("Varchar::as_str", format!("text is not valid UTF-8: {err}"))
        })
    }

    pub fn as_string(&self) -> Result<String> {
        self.as_str().map(str::to_owned)
    }

    /// Parses a leading integer, ignoring trailing characters.
    pub fn as_integer(&self) -> Result<i64> {
        let text = self.as_str()?;
        leading_integer(text).ok_or_else(|| {
            SqlCallError::value(
                "Varchar::as_integer",
                format!("'{text}' does not contain a valid integer"),
            )
        })
    }

    /// Parses a leading real number, ignoring trailing characters.
    pub fn as_real(&self) -> Result<f64> {
        let text = self.as_str()?;
        leading_real(text).ok_or_else(|| {
            SqlCallError::value(
                "Varchar::as_real",
                format!("'{text}' does not contain a valid real number"),
            )
        })
    }

    pub fn sql_literal(&self) -> Result<String> {
        if self.is_null() {
            return Ok("NULL".to_owned());
        }
        Ok(format!("'{}'", sql_quote(self.as_str()?)))
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

impl From<&str> for Varchar {
    fn from(value: &str) -> Self {
        let mut text = Self::new(value.len());
        text.set(value);
        text
    }
}

fn numeric_prefix_len(text: &str, allow_fraction: bool) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;
    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if !allow_fraction {
        return if digits > 0 { i } else { 0 };
    }
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        digits += j - frac_start;
        i = j;
    }
    if digits == 0 {
        return 0;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    i
}

pub(crate) fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim_start();
    let len = numeric_prefix_len(text, false);
    if len == 0 {
        return None;
    }
    text[..len].parse().ok()
}

pub(crate) fn leading_real(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let len = numeric_prefix_len(text, true);
    if len == 0 {
        return None;
    }
    text[..len].parse().ok()
}

#[cfg(test)]
mod tests {
    use crate::{value::text::Varchar, ErrorKind};

    #[test]
    fn new_text_is_null_with_capacity() {
        let text = Varchar::new(30);
        assert!(text.is_null());
        assert_eq!(text.max_wire_size(), 30);
        assert_eq!(text.sql_literal().expect("must render"), "NULL");
    }

    #[test]
    fn set_grows_small_buffer() {
        let mut text = Varchar::new(2);
        text.set("hello");
        assert_eq!(text.as_str().expect("must read"), "hello");
        assert!(text.max_wire_size() >= 5);
    }

    #[test]
    fn integer_parse_ignores_trailing_text() {
        assert_eq!(Varchar::from("  42abc").as_integer().expect("must parse"), 42);
        assert_eq!(Varchar::from("-7").as_integer().expect("must parse"), -7);
        let err = Varchar::from("abc").as_integer().expect_err("must fail");
        assert_eq!(err.kind(), ErrorKind::Value);
    }

    #[test]
    fn real_parse_accepts_exponent() {
        assert_eq!(Varchar::from("1.5e2x").as_real().expect("must parse"), 150.0);
        assert_eq!(Varchar::from(".25").as_real().expect("must parse"), 0.25);
        assert!(Varchar::from(".").as_real().is_err());
    }

    #[test]
    fn literal_doubles_quotes() {
        assert_eq!(
            Varchar::from("O'Brien").sql_literal().expect("must render"),
            "'O''Brien'"
        );
    }
}
