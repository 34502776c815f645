//! Schema Module
//!
//! Declarative description of a fixed-width record.
//!
//! ## Responsibilities
//! - Assign byte offsets to fields in declaration order
//! - Validate field names and sizes when the schema is built
//! - Provide key-order comparison used by storage and range scans
//!
//! ## Record Layout
//! ```text
//! offset 0                                                   size
//! ┌──────────┬──────────┬──────────┬──────────────┬──────────┐
//! │ field 0  │ field 1  │ field 2  │     ...      │ field N  │
//! └──────────┴──────────┴──────────┴──────────────┴──────────┘
//!   (key and value fields interleave in declaration order)
//! ```
//!
//! A schema is plain data. Records carry an `Arc<Schema>` next to their
//! buffer instead of being a per-schema type.

mod types;

use std::cmp::Ordering;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{RecordKvError, Result};
use crate::record::codec;

pub use types::{FieldType, Value, MAX_FIELD_SIZE};

/// One field of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    field_type: FieldType,
    is_key: bool,
    offset: usize,
    length: usize,
    default: Option<Value>,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_key(&self) -> bool {
        self.is_key
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    /// Byte range of this field inside a record buffer
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.length
    }
}

/// A fixed-width record schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
    keys: Vec<usize>,
    values: Vec<usize>,
    size: usize,
}

impl Schema {
    /// Create a new schema builder
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Parse a textual schema such as `key:uid:uint64,val:hits:uint32,val:h:hexstr:16`
    pub fn parse_spec(spec: &str) -> Result<Arc<Schema>> {
        let mut builder = Schema::builder();

        for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let items: Vec<&str> = part.split(':').collect();
            if items.len() < 3 || items.len() > 4 {
                return Err(RecordKvError::Schema(format!(
                    "expected kind:name:type[:size], got '{}'",
                    part
                )));
            }

            let size = match items.get(3) {
                Some(s) => Some(s.parse::<usize>().map_err(|_| RecordKvError::FieldSize {
                    field: items[1].to_string(),
                    reason: format!("invalid size '{}'", s),
                })?),
                None => None,
            };
            let field_type = FieldType::from_name(items[2], size)?;

            builder = match items[0] {
                "key" => builder.key(items[1], field_type),
                "val" => builder.val(items[1], field_type),
                other => {
                    return Err(RecordKvError::Schema(format!(
                        "field kind must be 'key' or 'val', got '{}'",
                        other
                    )))
                }
            };
        }

        builder.build()
    }

    /// All fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    /// Index of the field called `name`
    pub fn field_index(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| RecordKvError::UnknownField(name.to_string()))
    }

    pub fn field_by_name(&self, name: &str) -> Result<&Field> {
        let idx = self.field_index(name)?;
        Ok(&self.fields[idx])
    }

    /// Indices of key fields in declaration order
    pub fn key_indices(&self) -> &[usize] {
        &self.keys
    }

    /// Indices of value fields in declaration order
    pub fn value_indices(&self) -> &[usize] {
        &self.values
    }

    pub fn key_fields(&self) -> impl Iterator<Item = &Field> {
        self.keys.iter().map(move |&i| &self.fields[i])
    }

    pub fn value_fields(&self) -> impl Iterator<Item = &Field> {
        self.values.iter().map(move |&i| &self.fields[i])
    }

    /// Total record size in bytes
    pub fn record_size(&self) -> usize {
        self.size
    }

    /// Compare two record buffers by key fields only, in declaration order
    pub fn compare_keys(&self, a: &[u8], b: &[u8]) -> Ordering {
        for field in self.key_fields() {
            let range = field.range();
            match a[range.clone()].cmp(&b[range]) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        Ordering::Equal
    }

    /// True if every key field of `rec` lies within `[from, to]`
    pub fn keys_within(&self, rec: &[u8], from: &[u8], to: &[u8]) -> bool {
        self.key_fields().all(|field| {
            let range = field.range();
            let v = &rec[range.clone()];
            v >= &from[range.clone()] && v <= &to[range]
        })
    }

    /// Fill `buf` with zeros followed by every field default
    pub(crate) fn write_defaults(&self, buf: &mut [u8]) -> Result<()> {
        buf.fill(0);
        for field in &self.fields {
            if let Some(default) = &field.default {
                codec::encode(field, default, buf)?;
            }
        }
        Ok(())
    }
}

/// Builder for Schema
///
/// Offsets are assigned by cumulative size in the order fields are added.
#[derive(Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, FieldType, bool, Option<Value>)>,
}

impl SchemaBuilder {
    /// Add a key field
    pub fn key(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push((name.into(), field_type, true, None));
        self
    }

    /// Add a value field
    pub fn val(mut self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.fields.push((name.into(), field_type, false, None));
        self
    }

    /// Add a key field with a default value
    pub fn key_with_default(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        default: impl Into<Value>,
    ) -> Self {
        self.fields
            .push((name.into(), field_type, true, Some(default.into())));
        self
    }

    /// Add a value field with a default value
    pub fn val_with_default(
        mut self,
        name: impl Into<String>,
        field_type: FieldType,
        default: impl Into<Value>,
    ) -> Self {
        self.fields
            .push((name.into(), field_type, false, Some(default.into())));
        self
    }

    /// Validate and freeze the schema
    pub fn build(self) -> Result<Arc<Schema>> {
        if self.fields.is_empty() {
            return Err(RecordKvError::Schema("schema has no fields".to_string()));
        }

        let mut fields: Vec<Field> = Vec::with_capacity(self.fields.len());
        let mut offset = 0usize;

        for (name, field_type, is_key, default) in self.fields {
            if name.is_empty() {
                return Err(RecordKvError::Schema("empty field name".to_string()));
            }
            if fields.iter().any(|f| f.name == name) {
                return Err(RecordKvError::DuplicateField(name));
            }

            let length = field_type.size();
            if length == 0 || length > MAX_FIELD_SIZE {
                return Err(RecordKvError::FieldSize {
                    field: name,
                    reason: format!("size must be 1..={}, got {}", MAX_FIELD_SIZE, length),
                });
            }

            fields.push(Field {
                name,
                field_type,
                is_key,
                offset,
                length,
                default,
            });
            offset += length;
        }

        let keys = (0..fields.len()).filter(|&i| fields[i].is_key).collect();
        let values = (0..fields.len()).filter(|&i| !fields[i].is_key).collect();

        let schema = Schema {
            fields,
            keys,
            values,
            size: offset,
        };

        // Defaults must encode
        let mut scratch = vec![0u8; schema.size];
        schema.write_defaults(&mut scratch)?;

        Ok(Arc::new(schema))
    }
}
