//! Field types and typed values
//!
//! `FieldType` is the closed set of storable types. Every codec operation
//! matches on it exhaustively.

use serde::{Deserialize, Serialize};

use crate::error::{RecordKvError, Result};

/// Maximum byte length of a single field
pub const MAX_FIELD_SIZE: usize = 255;

/// Storable field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    /// IEEE754 double, stored sign-flipped so byte order equals numeric order
    Double,
    /// Milliseconds, ascending
    Timestamp,
    /// Milliseconds, stored complemented so ascending bytes mean descending time
    TimestampDesc,
    /// `n` raw bytes, written externally as `2n` hex digits
    FixedHex(u8),
    /// `n` raw bytes, zero padded
    ///
    /// Decoding strips trailing `0x00` bytes, so values that end in NUL do
    /// not round-trip.
    FixedString(u8),
}

impl FieldType {
    /// Byte length of the type
    pub fn size(&self) -> usize {
        match self {
            FieldType::UInt8 => 1,
            FieldType::UInt16 => 2,
            FieldType::UInt32 => 4,
            FieldType::UInt64 => 8,
            FieldType::Double => 8,
            FieldType::Timestamp => 8,
            FieldType::TimestampDesc => 8,
            FieldType::FixedHex(n) => *n as usize,
            FieldType::FixedString(n) => *n as usize,
        }
    }

    /// Resolve a type by its textual name
    ///
    /// Names: `uint8`, `uint16`, `uint32`, `uint64`, `double`, `timestamp`,
    /// `timestamp_desc`, `hexstr`, `string`. Sized types require `size`;
    /// fixed types reject a `size` that differs from their own.
    pub fn from_name(name: &str, size: Option<usize>) -> Result<Self> {
        let fixed = match name {
            "uint8" => Some(FieldType::UInt8),
            "uint16" => Some(FieldType::UInt16),
            "uint32" => Some(FieldType::UInt32),
            "uint64" => Some(FieldType::UInt64),
            "double" => Some(FieldType::Double),
            "timestamp" => Some(FieldType::Timestamp),
            "timestamp_desc" => Some(FieldType::TimestampDesc),
            "hexstr" | "string" => None,
            other => return Err(RecordKvError::UnknownType(other.to_string())),
        };

        if let Some(t) = fixed {
            return match size {
                Some(sz) if sz != t.size() => Err(RecordKvError::FieldSize {
                    field: name.to_string(),
                    reason: format!("type has size {}, got {}", t.size(), sz),
                }),
                _ => Ok(t),
            };
        }

        let sz = size.ok_or_else(|| RecordKvError::FieldSize {
            field: name.to_string(),
            reason: "size required".to_string(),
        })?;
        if sz == 0 || sz > MAX_FIELD_SIZE {
            return Err(RecordKvError::FieldSize {
                field: name.to_string(),
                reason: format!("size must be 1..={}, got {}", MAX_FIELD_SIZE, sz),
            });
        }

        Ok(if name == "hexstr" {
            FieldType::FixedHex(sz as u8)
        } else {
            FieldType::FixedString(sz as u8)
        })
    }

    /// Textual name (inverse of `from_name`)
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::UInt8 => "uint8",
            FieldType::UInt16 => "uint16",
            FieldType::UInt32 => "uint32",
            FieldType::UInt64 => "uint64",
            FieldType::Double => "double",
            FieldType::Timestamp => "timestamp",
            FieldType::TimestampDesc => "timestamp_desc",
            FieldType::FixedHex(_) => "hexstr",
            FieldType::FixedString(_) => "string",
        }
    }

    /// Types that support summation
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::UInt8
                | FieldType::UInt16
                | FieldType::UInt32
                | FieldType::UInt64
                | FieldType::Double
        )
    }

    /// Types holding an unsigned integer (timestamps included)
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldType::UInt8
                | FieldType::UInt16
                | FieldType::UInt32
                | FieldType::UInt64
                | FieldType::Timestamp
                | FieldType::TimestampDesc
        )
    }

    /// Largest integer the type can hold (integer types only)
    pub fn max_uint(&self) -> Option<u64> {
        match self {
            FieldType::UInt8 => Some(u8::MAX as u64),
            FieldType::UInt16 => Some(u16::MAX as u64),
            FieldType::UInt32 => Some(u32::MAX as u64),
            FieldType::UInt64 | FieldType::Timestamp | FieldType::TimestampDesc => Some(u64::MAX),
            _ => None,
        }
    }
}

/// A decoded field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    UInt(u64),
    Double(f64),
    /// Milliseconds
    Timestamp(u64),
    /// Uppercase hex digits, two per byte
    Hex(String),
    /// Raw bytes of a `FixedString` field
    ///
    /// Decoding removes trailing zero padding, so `Bytes(b"ab\0")` reads
    /// back as `Bytes(b"ab")`.
    Bytes(Vec<u8>),
}

impl Value {
    pub fn hex(s: impl Into<String>) -> Self {
        Value::Hex(s.into())
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(b.into())
    }

    pub fn timestamp(millis: u64) -> Self {
        Value::Timestamp(millis)
    }

    /// Integer view of `UInt` and `Timestamp` values
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(v) | Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_hex(&self) -> Option<&str> {
        match self {
            Value::Hex(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}
