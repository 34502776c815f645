//! Batch implementation
//!
//! A contiguous, reusable run of same-schema records. The unit of bulk
//! transfer between the parser, the ingestion pipeline and storage.

use std::sync::Arc;

use crate::error::{RecordKvError, Result};
use crate::schema::{Schema, Value};

use super::{codec, Record};

/// A contiguous sequence of fixed-width records
///
/// ```text
/// ┌──────────┬──────────┬──────────┬─────────────────────┐
/// │ record 0 │ record 1 │ record 2 │  (free capacity)    │
/// └──────────┴──────────┴──────────┴─────────────────────┘
///                                  ▲ cursor (len)
/// ```
pub struct Batch {
    schema: Arc<Schema>,
    /// Packed records; `data.len() == len * record_size`
    data: Vec<u8>,
    capacity: usize,
    growable: bool,
}

impl Batch {
    /// Create a batch holding up to `capacity` records
    ///
    /// A growable batch doubles its capacity instead of refusing a push.
    pub fn new(schema: &Arc<Schema>, capacity: usize, growable: bool) -> Self {
        let capacity = capacity.max(1);
        Self {
            schema: Arc::clone(schema),
            data: Vec::with_capacity(capacity * schema.record_size()),
            capacity,
            growable,
        }
    }

    /// Fixed-capacity batch (the pipeline's unit)
    pub fn fixed(schema: &Arc<Schema>, capacity: usize) -> Self {
        Self::new(schema, capacity, false)
    }

    /// Growable batch (query results)
    pub fn growable(schema: &Arc<Schema>, capacity: usize) -> Self {
        Self::new(schema, capacity, true)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.data.len() / self.schema.record_size()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_growable(&self) -> bool {
        self.growable
    }

    /// True when the cursor has reached capacity
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Truncate to zero records, keeping the allocation
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Append a copy of `record`
    pub fn push(&mut self, record: &Record) -> Result<()> {
        if !Arc::ptr_eq(&self.schema, record.schema()) && *self.schema != **record.schema() {
            return Err(RecordKvError::Schema(
                "record schema does not match batch schema".to_string(),
            ));
        }
        self.push_bytes(record.as_bytes())
    }

    /// Append one raw record buffer
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let size = self.schema.record_size();
        if bytes.len() != size {
            return Err(RecordKvError::Schema(format!(
                "record size mismatch: expected {} bytes, got {}",
                size,
                bytes.len()
            )));
        }
        if self.is_full() {
            if !self.growable {
                return Err(RecordKvError::BatchFull(self.capacity));
            }
            self.capacity *= 2;
            self.data.reserve(self.capacity * size - self.data.len());
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// Raw bytes of the record at `idx`
    pub fn get(&self, idx: usize) -> Option<&[u8]> {
        let size = self.schema.record_size();
        self.data.get(idx * size..(idx + 1) * size)
    }

    /// Independent copy of the record at `idx`
    pub fn record(&self, idx: usize) -> Option<Record> {
        self.get(idx)
            .and_then(|bytes| Record::from_bytes(&self.schema, bytes).ok())
    }

    /// Iterate over raw record buffers
    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.schema.record_size())
    }

    /// Iterate over independent record copies
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.iter().map(move |bytes| {
            let mut record = Record::new(&self.schema);
            record.load(bytes);
            record
        })
    }

    /// All packed record bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Stable sort by key fields
    pub fn sort(&mut self) {
        let size = self.schema.record_size();
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| {
            self.schema.compare_keys(
                &self.data[a * size..(a + 1) * size],
                &self.data[b * size..(b + 1) * size],
            )
        });

        let mut sorted = Vec::with_capacity(self.data.capacity());
        for idx in order {
            sorted.extend_from_slice(&self.data[idx * size..(idx + 1) * size]);
        }
        self.data = sorted;
    }

    /// Set `field` to `value` in every record
    pub fn bulk_set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        let field = self.schema.field_by_name(field)?;
        let value = value.into();
        let size = self.schema.record_size();

        for rec in self.data.chunks_exact_mut(size) {
            codec::encode(field, &value, rec)?;
        }
        Ok(())
    }

    /// Hand every record whose `field` equals `value` to `f`, writing back changes
    pub fn update_each<F>(&mut self, field: &str, value: impl Into<Value>, mut f: F) -> Result<()>
    where
        F: FnMut(&mut Record),
    {
        let idx = self.schema.field_index(field)?;
        let field = &self.schema.fields()[idx];

        let mut template = Record::new(&self.schema);
        template.set_at(idx, value)?;
        let wanted = template.as_bytes()[field.range()].to_vec();

        let mut current = Record::new(&self.schema);
        let size = self.schema.record_size();
        for rec in self.data.chunks_exact_mut(size) {
            if rec[field.range()] == wanted[..] {
                current.load(rec);
                f(&mut current);
                rec.copy_from_slice(current.as_bytes());
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("growable", &self.growable)
            .finish()
    }
}
