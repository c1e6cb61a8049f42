use crate::{
    value::null_error,
    wire::{self, TypeCode, WireBuffer, MAX_NUMBER_DIGITS, NUMBER_WIRE_SIZE},
    Result, SqlCallError,
};

const MAX_SCALE: u8 = 127;

/// Exact fixed-precision decimal.
///
/// The value lives in its wire form (mantissa and scale); conversions decode
/// on demand. Precision and scale record the column shape this value was
/// created for, `0`/`0` when unconstrained.
#[derive(Clone, Debug)]
pub struct Number {
    buf: WireBuffer,
    precision: i16,
    scale: i8,
}

impl Default for Number {
    fn default() -> Self {
        Self::new()
    }
}

impl Number {
    pub fn new() -> Self {
        Self::with_precision(0, 0)
    }

    pub fn with_precision(precision: i16, scale: i8) -> Self {
        Self {
            buf: WireBuffer::new(TypeCode::VARNUM, NUMBER_WIRE_SIZE),
            precision,
            scale,
        }
    }

    /// Parses decimal text such as `-12.50` or `1e3`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut number = Self::new();
        number.set_str(text)?;
        Ok(number)
    }

    pub fn from_f64(value: f64) -> Result<Self> {
        let mut number = Self::new();
        number.set_f64(value)?;
        Ok(number)
    }

    pub fn set_i64(&mut self, value: i64) {
        self.store(i128::from(value), 0);
    }

    pub fn set_str(&mut self, text: &str) -> Result<()> {
        let (mantissa, scale) = parse_decimal(text).ok_or_else(|| {
            SqlCallError::value(
                "Number::set_str",
                format!("'{text}' is not a decimal number of at most {MAX_NUMBER_DIGITS} digits"),
            )
        })?;
        self.store(mantissa, scale);
        Ok(())
    }

    pub fn set_f64(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(SqlCallError::value(
                "Number::set_f64",
                format!("non-finite value '{value}' is unsupported"),
            ));
        }
        self.set_str(&value.to_string())
    }

    fn store(&mut self, mantissa: i128, scale: u8) {
        let (mantissa, scale) = normalize(mantissa, scale);
        // Fixed-size encoding always fits the fixed-size buffer.
        let _ = self.buf.write(&wire::encode_number(mantissa, scale));
    }

    pub fn is_null(&self) -> bool {
        self.buf.is_null()
    }

    pub fn set_null(&mut self) {
        self.buf.set_null();
    }

    pub fn precision(&self) -> i16 {
        self.precision
    }

    pub fn scale(&self) -> i8 {
        self.scale
    }

    /// Normalized mantissa and scale.
    pub fn decimal(&self) -> Result<(i128, u8)> {
        if self.is_null() {
            return Err(null_error("Number::decimal", "decimal"));
        }
        let (mantissa, scale) = wire::decode_number(self.buf.bytes()).ok_or_else(|| {
            SqlCallError::value("Number::decimal", "malformed number in wire buffer")
        })?;
        Ok(normalize(mantissa, scale))
    }

    pub fn as_string(&self) -> Result<String> {
        let (mantissa, scale) = self.decimal()?;
        Ok(format_decimal(mantissa, scale))
    }

    /// Integer part, truncated toward zero.
    pub fn as_integer(&self) -> Result<i64> {
        let (mantissa, scale) = self.decimal()?;
        let whole = match 10i128.checked_pow(u32::from(scale)) {
            Some(divisor) => mantissa / divisor,
            None => 0,
        };
        i64::try_from(whole).map_err(|_| {
            SqlCallError::value(
                "Number::as_integer",
                format!("{} does not fit in a 64-bit integer", format_decimal(mantissa, scale)),
            )
        })
    }

    pub fn as_real(&self) -> Result<f64> {
        let text = self.as_string()?;
        text.parse::<f64>().map_err(|err| {
            SqlCallError::value("Number::as_real", format!("cannot convert '{text}': {err}"))
        })
    }

    pub fn sql_literal(&self) -> Result<String> {
        if self.is_null() {
            return Ok("NULL".to_owned());
        }
        self.as_string()
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

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        let mut number = Self::new();
        number.set_i64(value);
        number
    }
}

/// Strips trailing fractional zeros.
pub(crate) fn normalize(mut mantissa: i128, mut scale: u8) -> (i128, u8) {
    while scale > 0 && mantissa % 10 == 0 {
        mantissa /= 10;
        scale -= 1;
    }
    if mantissa == 0 {
        scale = 0;
    }
    (mantissa, scale)
}

fn digit_count(mut value: u128) -> u32 {
    let mut count = 1;
    while value >= 10 {
        value /= 10;
        count += 1;
    }
    count
}

pub(crate) fn parse_decimal(text: &str) -> Option<(i128, u8)> {
    let text = text.trim();
    let (negative, body) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (digits_part, exponent) = match body.find(['e', 'E']) {
        Some(pos) => (&body[..pos], body[pos + 1..].parse::<i32>().ok()?),
        None => (body, 0),
    };
    let (int_part, frac_part) = match digits_part.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (digits_part, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let mut mantissa: i128 = 0;
    for c in int_part.bytes().chain(frac_part.bytes()) {
        if !c.is_ascii_digit() {
            return None;
        }
        mantissa = mantissa.checked_mul(10)?.checked_add(i128::from(c - b'0'))?;
    }
    if mantissa == 0 {
        return Some((0, 0));
    }
    let mut scale = i32::try_from(frac_part.len()).ok()?.checked_sub(exponent)?;
    while scale < 0 {
        mantissa = mantissa.checked_mul(10)?;
        scale += 1;
    }
    let (mut mantissa, mut scale) = (mantissa, scale);
    while scale > i32::from(MAX_SCALE) {
        if mantissa % 10 != 0 {
            return None;
        }
        mantissa /= 10;
        scale -= 1;
    }
    let (mantissa, scale) = normalize(mantissa, u8::try_from(scale).ok()?);
    if digit_count(mantissa.unsigned_abs()) > MAX_NUMBER_DIGITS {
        return None;
    }
    Some((if negative { -mantissa } else { mantissa }, scale))
}

pub(crate) fn format_decimal(mantissa: i128, scale: u8) -> String {
    let digits = mantissa.unsigned_abs().to_string();
    let sign = if mantissa < 0 { "-" } else { "" };
    let scale = usize::from(scale);
    if scale == 0 {
        return format!("{sign}{digits}");
    }
    if digits.len() > scale {
        let (int_part, frac_part) = digits.split_at(digits.len() - scale);
        format!("{sign}{int_part}.{frac_part}")
    } else {
        format!("{sign}0.{}{digits}", "0".repeat(scale - digits.len()))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        value::number::{format_decimal, parse_decimal, Number},
        ErrorKind,
    };

    #[test]
    fn parse_normalizes_trailing_zeros() {
        assert_eq!(parse_decimal("12.500"), Some((125, 1)));
        assert_eq!(parse_decimal("-0.000"), Some((0, 0)));
        assert_eq!(parse_decimal("1e3"), Some((1000, 0)));
        assert_eq!(parse_decimal("25e-3"), Some((25, 3)));
        assert_eq!(parse_decimal(".5"), Some((5, 1)));
    }

    #[test]
    fn parse_rejects_garbage_and_excess_digits() {
        assert_eq!(parse_decimal("12a"), None);
        assert_eq!(parse_decimal("."), None);
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal(&"9".repeat(39)), None);
        assert!(parse_decimal(&"9".repeat(38)).is_some());
    }

    #[test]
    fn parse_handles_extreme_exponents() {
        assert_eq!(parse_decimal("1e-2147483648"), None);
        assert_eq!(parse_decimal("1e2147483647"), None);
        assert_eq!(parse_decimal("1e-2000000000"), None);
        assert_eq!(parse_decimal("0e-2000000000"), Some((0, 0)));
        assert_eq!(parse_decimal("-0.0e2147483647"), Some((0, 0)));
        assert_eq!(parse_decimal("1000e-130"), Some((1, 127)));
    }

    #[test]
    fn format_pads_small_fractions() {
        assert_eq!(format_decimal(5, 3), "0.005");
        assert_eq!(format_decimal(-1234, 2), "-12.34");
        assert_eq!(format_decimal(42, 0), "42");
    }

    #[test]
    fn integer_conversion_truncates_toward_zero() {
        let number = Number::parse("-3.99").expect("must parse");
        assert_eq!(number.as_integer().expect("must convert"), -3);
        assert_eq!(number.as_real().expect("must convert"), -3.99);
    }

    #[test]
    fn integer_conversion_reports_overflow() {
        let number = Number::parse(&"9".repeat(30)).expect("must parse");
        let err = number.as_integer().expect_err("must overflow");
        assert_eq!(err.kind(), ErrorKind::Value);
    }

    #[test]
    fn from_f64_rejects_non_finite() {
        assert!(Number::from_f64(f64::INFINITY).is_err());
        let number = Number::from_f64(0.1).expect("must convert");
        assert_eq!(number.as_string().expect("must format"), "0.1");
    }

    #[test]
    fn null_literal() {
        let number = Number::with_precision(10, 2);
        assert_eq!(number.sql_literal().expect("must render"), "NULL");
        assert_eq!(number.precision(), 10);
        assert_eq!(number.scale(), 2);
        assert_eq!(number.max_wire_size(), 17);
    }
}
