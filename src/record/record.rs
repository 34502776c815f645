//! Record implementation
//!
//! A fixed-size byte buffer paired with the schema describing it.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::{RecordKvError, Result};
use crate::schema::{Field, FieldType, Schema, Value};

use super::codec;

/// A single fixed-width record
///
/// Cloning produces an independent copy of the buffer. Ordering is byte-wise
/// over the whole buffer, i.e. field by field in declaration order.
#[derive(Clone)]
pub struct Record {
    schema: Arc<Schema>,
    data: Vec<u8>,
}

impl Record {
    /// Create a record with every field at its default (zero unless declared)
    pub fn new(schema: &Arc<Schema>) -> Self {
        let mut record = Self {
            schema: Arc::clone(schema),
            data: vec![0u8; schema.record_size()],
        };
        record.reset();
        record
    }

    /// Wrap an existing buffer
    pub fn from_bytes(schema: &Arc<Schema>, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != schema.record_size() {
            return Err(RecordKvError::Schema(format!(
                "record size mismatch: expected {} bytes, got {}",
                schema.record_size(),
                bytes.len()
            )));
        }
        Ok(Self {
            schema: Arc::clone(schema),
            data: bytes.to_vec(),
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Overwrite the buffer with `bytes` (must be exactly one record long)
    pub fn load(&mut self, bytes: &[u8]) {
        self.data.copy_from_slice(bytes);
    }

    /// Zero the buffer and re-apply field defaults
    pub fn reset(&mut self) {
        self.data.fill(0);
        for field in self.schema.fields() {
            if let Some(default) = field.default_value() {
                // Defaults were checked when the schema was built
                let _ = codec::encode(field, default, &mut self.data);
            }
        }
    }

    // =========================================================================
    // Typed Access
    // =========================================================================

    pub fn get(&self, name: &str) -> Result<Value> {
        let field = self.schema.field_by_name(name)?;
        Ok(codec::decode(field, &self.data))
    }

    pub fn get_at(&self, idx: usize) -> Result<Value> {
        let field = field_at(&self.schema, idx)?;
        Ok(codec::decode(field, &self.data))
    }

    /// Integer value of an integer or timestamp field
    pub fn get_u64(&self, name: &str) -> Result<u64> {
        let field = self.schema.field_by_name(name)?;
        codec::read_uint(field, &self.data).ok_or_else(|| RecordKvError::TypeMismatch {
            field: name.to_string(),
            expected: "integer field",
        })
    }

    pub fn get_f64(&self, name: &str) -> Result<f64> {
        self.get(name)?
            .as_f64()
            .ok_or_else(|| RecordKvError::TypeMismatch {
                field: name.to_string(),
                expected: "double field",
            })
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let field = self.schema.field_by_name(name)?;
        codec::encode(field, &value.into(), &mut self.data)
    }

    pub fn set_at(&mut self, idx: usize, value: impl Into<Value>) -> Result<()> {
        let field = field_at(&self.schema, idx)?;
        codec::encode(field, &value.into(), &mut self.data)
    }

    /// Parse the textual form of a value into the named field
    pub fn set_from_str(&mut self, name: &str, text: &str) -> Result<()> {
        let field = self.schema.field_by_name(name)?;
        codec::parse(field, text.as_bytes(), &mut self.data)
    }

    pub fn set_from_bytes_at(&mut self, idx: usize, text: &[u8]) -> Result<()> {
        let field = field_at(&self.schema, idx)?;
        codec::parse(field, text, &mut self.data)
    }

    pub(crate) fn set_fixed_point_at(&mut self, idx: usize, text: &[u8], digits: u8) -> Result<()> {
        let field = field_at(&self.schema, idx)?;
        codec::parse_fixed_point(field, text, digits, &mut self.data)
    }

    /// Read a 128-bit value stored as two `UInt64` halves, high half first
    pub fn get_u128(&self, hi: &str, lo: &str) -> Result<u128> {
        let (hi_field, lo_field) = u128_halves(&self.schema, hi, lo)?;
        let hi = codec::read_uint(hi_field, &self.data).unwrap_or(0) as u128;
        let lo = codec::read_uint(lo_field, &self.data).unwrap_or(0) as u128;
        Ok((hi << 64) | lo)
    }

    /// Split a 128-bit value into two `UInt64` halves, high half first
    pub fn set_u128(&mut self, hi: &str, lo: &str, value: u128) -> Result<()> {
        let (hi_field, lo_field) = u128_halves(&self.schema, hi, lo)?;
        codec::write_uint(hi_field, (value >> 64) as u64, &mut self.data)?;
        codec::write_uint(lo_field, value as u64, &mut self.data)
    }

    // =========================================================================
    // Min / Max
    // =========================================================================

    pub fn set_min(&mut self, name: &str) -> Result<()> {
        let field = self.schema.field_by_name(name)?;
        codec::set_min(field, &mut self.data);
        Ok(())
    }

    pub fn set_max(&mut self, name: &str) -> Result<()> {
        let field = self.schema.field_by_name(name)?;
        codec::set_max(field, &mut self.data);
        Ok(())
    }

    pub fn set_min_at(&mut self, idx: usize) -> Result<()> {
        let field = field_at(&self.schema, idx)?;
        codec::set_min(field, &mut self.data);
        Ok(())
    }

    pub fn set_max_at(&mut self, idx: usize) -> Result<()> {
        let field = field_at(&self.schema, idx)?;
        codec::set_max(field, &mut self.data);
        Ok(())
    }

    /// Set every key field to its type minimum
    pub fn set_min_keys(&mut self) {
        for field in self.schema.key_fields() {
            codec::set_min(field, &mut self.data);
        }
    }

    /// Set every key field to its type maximum
    pub fn set_max_keys(&mut self) {
        for field in self.schema.key_fields() {
            codec::set_max(field, &mut self.data);
        }
    }

    // =========================================================================
    // Comparison / Arithmetic
    // =========================================================================

    /// Compare key fields only
    pub fn compare_keys(&self, other: &Record) -> Ordering {
        self.schema.compare_keys(&self.data, &other.data)
    }

    /// Add every numeric value field of `other` into `self`; keys untouched
    pub fn add_values(&mut self, other: &Record) -> Result<()> {
        if self.schema != other.schema {
            return Err(RecordKvError::Schema("record schemas differ".to_string()));
        }
        for field in self.schema.value_fields() {
            if field.field_type().is_numeric() {
                codec::add_field(field, &mut self.data, &other.data)?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    /// `(name, value)` pairs for every field
    pub fn to_map(&self) -> Vec<(String, Value)> {
        self.collect(|_| true)
    }

    pub fn keys_to_map(&self) -> Vec<(String, Value)> {
        self.collect(Field::is_key)
    }

    pub fn values_to_map(&self) -> Vec<(String, Value)> {
        self.collect(|f| !f.is_key())
    }

    fn collect(&self, keep: impl Fn(&Field) -> bool) -> Vec<(String, Value)> {
        self.schema
            .fields()
            .iter()
            .filter(|f| keep(f))
            .map(|f| (f.name().to_string(), codec::decode(f, &self.data)))
            .collect()
    }
}

fn field_at(schema: &Schema, idx: usize) -> Result<&Field> {
    schema
        .field(idx)
        .ok_or_else(|| RecordKvError::UnknownField(format!("#{}", idx)))
}

fn u128_halves<'a>(schema: &'a Schema, hi: &str, lo: &str) -> Result<(&'a Field, &'a Field)> {
    let hi_field = schema.field_by_name(hi)?;
    let lo_field = schema.field_by_name(lo)?;
    for f in [hi_field, lo_field] {
        if f.field_type() != FieldType::UInt64 {
            return Err(RecordKvError::TypeMismatch {
                field: f.name().to_string(),
                expected: "uint64 half of a 128-bit value",
            });
        }
    }
    Ok((hi_field, lo_field))
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Record {}

impl PartialOrd for Record {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Record {
    fn cmp(&self, other: &Self) -> Ordering {
        codec::compare(&self.data, &other.data)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Record");
        for field in self.schema.fields() {
            s.field(field.name(), &codec::decode(field, &self.data));
        }
        s.finish()
    }
}
