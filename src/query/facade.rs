//! Query façade
//!
//! Runs one or more constraint sets against a read view of a partition.
//! Results of separate ranges are concatenated in the order the ranges were
//! given; there is no de-duplication or re-sorting across ranges.

use std::sync::Arc;

use crate::error::{RecordKvError, Result};
use crate::record::{Batch, Record};
use crate::schema::Schema;
use crate::storage::{Reduction, SnapshotId, StorageEngine};

use super::range::{Constraints, QueryRange};

/// Default capacity of the batch created by `into_batch(None)`
pub const DEFAULT_RESULT_CAPACITY: usize = 1024;

/// Something a query can read from: an engine plus a read view
pub trait QuerySource {
    type Engine: StorageEngine;

    fn engine(&self) -> &Self::Engine;

    /// Snapshot to read at; `None` reads the latest state
    fn snapshot_id(&self) -> Option<SnapshotId>;

    fn schema(&self) -> &Arc<Schema> {
        self.engine().schema()
    }
}

/// A prepared multi-range query
pub struct Query<S: QuerySource> {
    source: S,
    ranges: Vec<QueryRange>,
}

impl<S: QuerySource> Query<S> {
    /// Build the ranges for `constraints`; an empty list matches everything
    pub fn new(source: S, constraints: Vec<Constraints>) -> Result<Self> {
        let schema = Arc::clone(source.schema());
        let ranges = if constraints.is_empty() {
            vec![QueryRange::build(&schema, &Constraints::new())?]
        } else {
            constraints
                .iter()
                .map(|c| QueryRange::build(&schema, c))
                .collect::<Result<_>>()?
        };
        Ok(Self { source, ranges })
    }

    pub fn ranges(&self) -> &[QueryRange] {
        &self.ranges
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Stream every match; return `false` from `visitor` to stop
    pub fn each<F>(&self, mut visitor: F) -> Result<()>
    where
        F: FnMut(Record) -> bool,
    {
        let mut scratch = Record::new(self.source.schema());
        let mut stopped = false;
        for range in &self.ranges {
            self.source.engine().query_each(
                &range.from,
                &range.to,
                &mut scratch,
                self.source.snapshot_id(),
                &mut |rec| {
                    if visitor(rec.clone()) {
                        true
                    } else {
                        stopped = true;
                        false
                    }
                },
            )?;
            if stopped {
                break;
            }
        }
        Ok(())
    }

    /// Collect every match
    pub fn to_vec(&self) -> Result<Vec<Record>> {
        let mut out = Vec::new();
        self.each(|rec| {
            out.push(rec);
            true
        })?;
        Ok(out)
    }

    /// Number of matches summed over all ranges
    pub fn count(&self) -> Result<u64> {
        let mut total = 0;
        for range in &self.ranges {
            total += self.source.engine().query_count(
                &range.from,
                &range.to,
                self.source.snapshot_id(),
            )?;
        }
        Ok(total)
    }

    /// Sum (`sum = true`) or minimum (`sum = false`) of `fields` per range
    pub fn aggregate(&self, fields: &[&str], sum: bool) -> Result<Vec<Record>> {
        let reduction = if sum { Reduction::Sum } else { Reduction::Min };
        self.aggregate_with(fields, reduction)
    }

    /// One record per range that matched, with `fields` reduced across matches
    pub fn aggregate_with(&self, fields: &[&str], reduction: Reduction) -> Result<Vec<Record>> {
        let schema = Arc::clone(self.source.schema());
        let mut indices = Vec::with_capacity(fields.len());
        for name in fields {
            let idx = schema.field_index(name)?;
            if reduction == Reduction::Sum && !schema.fields()[idx].field_type().is_numeric() {
                return Err(RecordKvError::InvalidAggregate(format!(
                    "cannot sum non-numeric field '{}'",
                    name
                )));
            }
            indices.push(idx);
        }

        let mut out = Batch::growable(&schema, self.ranges.len());
        let mut scratch = Record::new(&schema);
        for range in &self.ranges {
            self.source.engine().query_aggregate(
                &range.from,
                &range.to,
                &mut scratch,
                &mut out,
                &indices,
                reduction,
                self.source.snapshot_id(),
            )?;
        }
        Ok(out.records().collect())
    }

    /// Copy every match into `batch` (a fresh growable batch when `None`)
    pub fn into_batch(&self, batch: Option<Batch>) -> Result<Batch> {
        let mut batch = batch
            .unwrap_or_else(|| Batch::growable(self.source.schema(), DEFAULT_RESULT_CAPACITY));
        let mut scratch = Record::new(self.source.schema());
        for range in &self.ranges {
            let ok = self.source.engine().query_into(
                &range.from,
                &range.to,
                &mut scratch,
                &mut batch,
                self.source.snapshot_id(),
            )?;
            if !ok {
                return Err(RecordKvError::QueryFailed(format!(
                    "result batch full at {} records",
                    batch.len()
                )));
            }
        }
        Ok(batch)
    }

    /// Lowest match by total record order, if any
    pub fn min(&self) -> Result<Option<Record>> {
        let mut scratch = Record::new(self.source.schema());
        let mut best: Option<Record> = None;
        for range in &self.ranges {
            let found = self.source.engine().query_min(
                &range.from,
                &range.to,
                &mut scratch,
                self.source.snapshot_id(),
            )?;
            best = match (best, found) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            };
        }
        Ok(best)
    }
}
