//! Query range construction
//!
//! Turns per-field constraints into an inclusive `[from, to]` pair of full
//! records.
//!
//! ```text
//! keys:         a        b        c        d
//! constraint:  a = 5                     d in 5..=10
//! from:         5       MIN      MIN       5
//! to:           5       MAX      MAX      10
//! ```
//!
//! Constrained fields need not form a left-aligned prefix of the key order.
//! Such a range is still a valid bound for a lexicographic scan, but it also
//! covers records outside the per-field box; engines that only scan
//! `[from, to]` lexicographically return those extra records. The bundled
//! `SliceStore` filters every key field, so its results stay exact.

use std::ops::{Range, RangeInclusive};
use std::sync::Arc;

use crate::error::{RecordKvError, Result};
use crate::record::Record;
use crate::schema::{FieldType, Schema, Value};

/// Constraint on a single key field
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Field equals the value
    Exact(Value),
    /// Field lies within `[lo, hi]`
    Between(Value, Value),
    /// `[lo, hi)`: always rejected with `InvalidRange`
    HalfOpen(Value, Value),
}

impl From<Value> for Constraint {
    fn from(v: Value) -> Self {
        Constraint::Exact(v)
    }
}

impl From<u64> for Constraint {
    fn from(v: u64) -> Self {
        Constraint::Exact(Value::UInt(v))
    }
}

impl From<RangeInclusive<u64>> for Constraint {
    fn from(r: RangeInclusive<u64>) -> Self {
        let (lo, hi) = r.into_inner();
        Constraint::Between(Value::UInt(lo), Value::UInt(hi))
    }
}

impl From<Range<u64>> for Constraint {
    fn from(r: Range<u64>) -> Self {
        Constraint::HalfOpen(Value::UInt(r.start), Value::UInt(r.end))
    }
}

/// Ordered `(field name, constraint)` pairs describing one range
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    items: Vec<(String, Constraint)>,
}

impl Constraints {
    /// No constraints: every record matches
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constraint on `field`
    pub fn with(mut self, field: impl Into<String>, constraint: impl Into<Constraint>) -> Self {
        self.items.push((field.into(), constraint.into()));
        self
    }

    /// `field == value`
    pub fn exact(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Constraint::Exact(value.into()))
    }

    /// `lo <= field <= hi`
    pub fn between(
        self,
        field: impl Into<String>,
        lo: impl Into<Value>,
        hi: impl Into<Value>,
    ) -> Self {
        self.with(field, Constraint::Between(lo.into(), hi.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.items.iter().map(|(n, c)| (n.as_str(), c))
    }
}

/// Inclusive bounds over full records
#[derive(Debug, Clone)]
pub struct QueryRange {
    pub from: Record,
    pub to: Record,
}

impl QueryRange {
    /// Build the bounds for `constraints`
    ///
    /// Unconstrained key fields get the type minimum in `from` and the type
    /// maximum in `to`. Value fields are left zeroed in both.
    pub fn build(schema: &Arc<Schema>, constraints: &Constraints) -> Result<Self> {
        let mut from = Record::new(schema);
        let mut to = Record::new(schema);
        from.set_min_keys();
        to.set_max_keys();

        for (name, constraint) in constraints.iter() {
            let idx = schema.field_index(name)?;
            let field = &schema.fields()[idx];
            if !field.is_key() {
                return Err(RecordKvError::NotKeyField(name.to_string()));
            }

            match constraint {
                Constraint::Exact(v) => {
                    from.set_at(idx, v.clone())?;
                    to.set_at(idx, v.clone())?;
                }
                Constraint::Between(lo, hi) => {
                    // Descending storage reverses the logical endpoints
                    let (lo, hi) = if field.field_type() == FieldType::TimestampDesc {
                        (hi, lo)
                    } else {
                        (lo, hi)
                    };
                    from.set_at(idx, lo.clone())?;
                    to.set_at(idx, hi.clone())?;
                }
                Constraint::HalfOpen(..) => {
                    return Err(RecordKvError::InvalidRange(name.to_string()));
                }
            }
        }

        Ok(Self { from, to })
    }

    /// True if every key field of `record` lies within the bounds
    pub fn contains(&self, record: &Record) -> bool {
        record
            .schema()
            .keys_within(record.as_bytes(), self.from.as_bytes(), self.to.as_bytes())
    }
}
