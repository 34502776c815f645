//! Record codec
//!
//! Encodes typed values into, and decodes them out of, a record buffer at a
//! field's `(offset, length)`.
//!
//! ## Storage Encodings
//! Every encoding is order preserving, so comparing raw bytes compares values:
//! ```text
//! UInt8/16/32/64   big-endian
//! Double           IEEE754 bits, sign bit flipped (positives) or all bits
//!                  flipped (negatives)
//! Timestamp        big-endian u64 milliseconds
//! TimestampDesc    big-endian (u64::MAX - millis)
//! FixedHex(n)      n raw bytes
//! FixedString(n)   n raw bytes, zero padded
//! ```

use std::cmp::Ordering;

use crate::error::{RecordKvError, Result};
use crate::schema::{Field, FieldType, Value};

const SIGN_BIT: u64 = 1 << 63;

// =============================================================================
// Encoding / Decoding
// =============================================================================

/// Write `value` into `field` of `buf`
pub fn encode(field: &Field, value: &Value, buf: &mut [u8]) -> Result<()> {
    match field.field_type() {
        FieldType::UInt8
        | FieldType::UInt16
        | FieldType::UInt32
        | FieldType::UInt64
        | FieldType::Timestamp
        | FieldType::TimestampDesc => {
            let v = value.as_u64().ok_or_else(|| mismatch(field, "unsigned integer"))?;
            write_uint(field, v, buf)
        }
        FieldType::Double => {
            let v = match value {
                Value::Double(d) => *d,
                Value::UInt(u) => *u as f64,
                _ => return Err(mismatch(field, "double")),
            };
            write_double(field, v, buf);
            Ok(())
        }
        FieldType::FixedHex(_) => match value {
            Value::Hex(s) => parse_hex(field, s.as_bytes(), buf),
            Value::Bytes(b) if b.len() == field.length() => {
                buf[field.range()].copy_from_slice(b);
                Ok(())
            }
            _ => Err(mismatch(field, "hex string")),
        },
        FieldType::FixedString(_) => match value {
            Value::Bytes(b) => write_padded(field, b, buf),
            _ => Err(mismatch(field, "bytes")),
        },
    }
}

/// Read the value of `field` out of `buf`
pub fn decode(field: &Field, buf: &[u8]) -> Value {
    let bytes = &buf[field.range()];
    match field.field_type() {
        FieldType::UInt8 | FieldType::UInt16 | FieldType::UInt32 | FieldType::UInt64 => {
            Value::UInt(read_be(bytes))
        }
        FieldType::Double => Value::Double(read_double(bytes)),
        FieldType::Timestamp => Value::Timestamp(read_be(bytes)),
        FieldType::TimestampDesc => Value::Timestamp(u64::MAX - read_be(bytes)),
        FieldType::FixedHex(_) => Value::Hex(to_hex(bytes)),
        FieldType::FixedString(_) => {
            let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
            Value::Bytes(bytes[..end].to_vec())
        }
    }
}

/// Integer value of an integer-typed field (logical value for timestamps)
pub fn read_uint(field: &Field, buf: &[u8]) -> Option<u64> {
    let raw = read_be(&buf[field.range()]);
    match field.field_type() {
        FieldType::UInt8
        | FieldType::UInt16
        | FieldType::UInt32
        | FieldType::UInt64
        | FieldType::Timestamp => Some(raw),
        FieldType::TimestampDesc => Some(u64::MAX - raw),
        _ => None,
    }
}

/// Write an integer into an integer-typed field, rejecting out-of-range values
pub fn write_uint(field: &Field, v: u64, buf: &mut [u8]) -> Result<()> {
    let max = field
        .field_type()
        .max_uint()
        .ok_or_else(|| mismatch(field, "integer field"))?;
    if v > max {
        return Err(RecordKvError::Overflow {
            field: field.name().to_string(),
            value: v.to_string(),
        });
    }

    let stored = match field.field_type() {
        FieldType::TimestampDesc => u64::MAX - v,
        _ => v,
    };
    let width = field.length();
    buf[field.range()].copy_from_slice(&stored.to_be_bytes()[8 - width..]);
    Ok(())
}

fn write_double(field: &Field, v: f64, buf: &mut [u8]) {
    let bits = v.to_bits();
    let sortable = if bits & SIGN_BIT != 0 { !bits } else { bits ^ SIGN_BIT };
    buf[field.range()].copy_from_slice(&sortable.to_be_bytes());
}

fn read_double(bytes: &[u8]) -> f64 {
    let sortable = read_be(bytes);
    let bits = if sortable & SIGN_BIT != 0 {
        sortable ^ SIGN_BIT
    } else {
        !sortable
    };
    f64::from_bits(bits)
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

fn write_padded(field: &Field, src: &[u8], buf: &mut [u8]) -> Result<()> {
    if src.len() > field.length() {
        return Err(overflow(field, src));
    }
    let dst = &mut buf[field.range()];
    dst[..src.len()].copy_from_slice(src);
    dst[src.len()..].fill(0);
    Ok(())
}

fn to_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push(DIGITS[(b >> 4) as usize] as char);
        s.push(DIGITS[(b & 0x0F) as usize] as char);
    }
    s
}

// =============================================================================
// Min / Max / Compare
// =============================================================================

/// Write the lowest storage pattern (all `0x00`) into `field`
///
/// For `TimestampDesc` this is the largest logical timestamp.
pub fn set_min(field: &Field, buf: &mut [u8]) {
    buf[field.range()].fill(0x00);
}

/// Write the highest storage pattern (all `0xFF`) into `field`
///
/// For `TimestampDesc` this is logical timestamp zero.
pub fn set_max(field: &Field, buf: &mut [u8]) {
    buf[field.range()].fill(0xFF);
}

/// Byte-wise comparison over the whole record
pub fn compare(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Compare a single field of two records
pub fn compare_field(field: &Field, a: &[u8], b: &[u8]) -> Ordering {
    a[field.range()].cmp(&b[field.range()])
}

/// `a.field += b.field` for numeric fields, wrapping on integer overflow
pub fn add_field(field: &Field, a: &mut [u8], b: &[u8]) -> Result<()> {
    match field.field_type() {
        FieldType::UInt8 | FieldType::UInt16 | FieldType::UInt32 | FieldType::UInt64 => {
            let max = field.field_type().max_uint().unwrap_or(u64::MAX);
            let sum = read_be(&a[field.range()]).wrapping_add(read_be(&b[field.range()])) & max;
            write_uint(field, sum, a)
        }
        FieldType::Double => {
            let sum = read_double(&a[field.range()]) + read_double(&b[field.range()]);
            write_double(field, sum, a);
            Ok(())
        }
        _ => Err(RecordKvError::InvalidAggregate(format!(
            "field {} of type {} cannot be summed",
            field.name(),
            field.field_type().name()
        ))),
    }
}

// =============================================================================
// Parsing From Text
// =============================================================================

/// Parse the textual form of a value straight into `field` of `buf`
pub fn parse(field: &Field, text: &[u8], buf: &mut [u8]) -> Result<()> {
    match field.field_type() {
        FieldType::UInt8 | FieldType::UInt16 | FieldType::UInt32 | FieldType::UInt64 => {
            let v = parse_u64(field, text)?;
            write_uint(field, v, buf)
        }
        FieldType::Timestamp | FieldType::TimestampDesc => {
            let v = parse_timestamp(field, text)?;
            write_uint(field, v, buf)
        }
        FieldType::Double => {
            let v = std::str::from_utf8(text)
                .ok()
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| invalid(field, text))?;
            write_double(field, v, buf);
            Ok(())
        }
        FieldType::FixedHex(_) => parse_hex(field, text, buf),
        FieldType::FixedString(_) => write_padded(field, text, buf),
    }
}

/// Parse `INT[.FRAC]` as a fixed-point integer with `digits` fractional digits
///
/// The fraction is truncated (never rounded) or right-padded with zeros:
/// with `digits = 3`, `"12.3"` is 12300 and `"12.34567"` is 12345.
pub fn parse_fixed_point(field: &Field, text: &[u8], digits: u8, buf: &mut [u8]) -> Result<()> {
    if !field.field_type().is_integer() {
        return Err(mismatch(field, "integer field"));
    }
    let v = parse_decimal(field, text, digits as u32)?;
    write_uint(field, v, buf)
}

fn parse_u64(field: &Field, text: &[u8]) -> Result<u64> {
    if text.is_empty() || !text.iter().all(u8::is_ascii_digit) {
        return Err(invalid(field, text));
    }
    text.iter().try_fold(0u64, |acc, &c| {
        acc.checked_mul(10)
            .and_then(|v| v.checked_add((c - b'0') as u64))
            .ok_or_else(|| overflow(field, text))
    })
}

/// `SECONDS[.FRACTION]` to milliseconds, fraction truncated to 3 digits
fn parse_timestamp(field: &Field, text: &[u8]) -> Result<u64> {
    parse_decimal(field, text, 3)
}

fn parse_decimal(field: &Field, text: &[u8], digits: u32) -> Result<u64> {
    let (int_part, frac_part) = match text.iter().position(|&c| c == b'.') {
        Some(dot) => (&text[..dot], &text[dot + 1..]),
        None => (text, &text[text.len()..]),
    };

    if !frac_part.iter().all(u8::is_ascii_digit) {
        return Err(invalid(field, text));
    }
    let whole = parse_u64(field, int_part).map_err(|e| match e {
        RecordKvError::Overflow { .. } => e,
        _ => invalid(field, text),
    })?;

    let mut frac = 0u64;
    for i in 0..digits as usize {
        let d = frac_part.get(i).map_or(0, |&c| (c - b'0') as u64);
        frac = frac * 10 + d;
    }

    10u64
        .checked_pow(digits)
        .and_then(|scale| whole.checked_mul(scale))
        .and_then(|v| v.checked_add(frac))
        .ok_or_else(|| overflow(field, text))
}

/// Hex digits, left-padded with zeros to the field width
fn parse_hex(field: &Field, text: &[u8], buf: &mut [u8]) -> Result<()> {
    let width = field.length() * 2;
    if text.len() > width {
        return Err(overflow(field, text));
    }

    let mut nibbles = Vec::with_capacity(width);
    nibbles.resize(width - text.len(), 0u8);
    for &c in text {
        let n = (c as char).to_digit(16).ok_or_else(|| invalid(field, text))?;
        nibbles.push(n as u8);
    }

    let dst = &mut buf[field.range()];
    for (i, pair) in nibbles.chunks(2).enumerate() {
        dst[i] = (pair[0] << 4) | pair[1];
    }
    Ok(())
}

// =============================================================================
// Error Helpers
// =============================================================================

fn mismatch(field: &Field, expected: &'static str) -> RecordKvError {
    RecordKvError::TypeMismatch {
        field: field.name().to_string(),
        expected,
    }
}

fn overflow(field: &Field, text: &[u8]) -> RecordKvError {
    RecordKvError::Overflow {
        field: field.name().to_string(),
        value: String::from_utf8_lossy(text).into_owned(),
    }
}

fn invalid(field: &Field, text: &[u8]) -> RecordKvError {
    RecordKvError::InvalidValue {
        field: field.name().to_string(),
        value: String::from_utf8_lossy(text).into_owned(),
    }
}
