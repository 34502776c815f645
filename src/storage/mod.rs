//! Storage Module
//!
//! The boundary between the record layer and an ordered storage engine.
//!
//! ## Responsibilities
//! - Define the `StorageEngine` contract partitions are built on
//! - Provide default range operations (into / min / count / aggregate) on
//!   top of `query_each`
//! - Ship `SliceStore`, a file-backed reference engine
//!
//! ## Engine Contract
//! ```text
//! open(options)                              -> engine
//! put / put_bulk                             append records
//! query_each(from, to, scratch, snapshot, f) visit matches in key order
//! commit()                                   -> (slices, records), durable
//! snapshot_num()                             -> read view number
//! close()
//! ```
//! A record matches `[from, to]` when every key field lies within the
//! corresponding fields of `from` and `to`.

mod slice_store;

use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{RecordKvError, Result};
use crate::record::{codec, Batch, Record};
use crate::schema::{Field, Schema};

pub use slice_store::SliceStore;

/// Snapshot number handed out by an engine
pub type SnapshotId = u64;

/// What an engine reports after a durable commit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitStats {
    /// Engine-defined units of committed data
    pub slices: u64,
    /// Committed records
    pub records: u64,
}

/// Parameters for opening one engine handle
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Path prefix; the engine appends its own file names
    pub path_prefix: PathBuf,
    pub schema: Arc<Schema>,
    /// Committed slice count recovered from the commit log
    pub slices: u64,
    /// Committed record count recovered from the commit log
    pub records: u64,
    /// Preallocation hint (slices)
    pub slice_capacity: usize,
    /// Preallocation hint (records)
    pub record_capacity: usize,
    pub readonly: bool,
}

/// How `query_aggregate` folds matching records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Add numeric fields
    Sum,
    /// Keep the smallest value per field
    Min,
    /// Keep the largest value per field
    Max,
}

/// An ordered record store
///
/// Visitors passed to `query_each` must not write to the same engine.
pub trait StorageEngine: Send + Sync + Sized {
    /// Open (or create) the engine described by `options`
    fn open(options: EngineOptions) -> Result<Self>;

    fn schema(&self) -> &Arc<Schema>;

    /// Store a single record
    fn put(&self, record: &Record) -> Result<()>;

    /// Store every record of `batch`
    fn put_bulk(&self, batch: &Batch) -> Result<()>;

    /// Visit records within `[from, to]` in key order
    ///
    /// `scratch` is reused for every match. The visitor returns `false` to
    /// stop early. `snapshot = None` reads the latest state.
    fn query_each(
        &self,
        from: &Record,
        to: &Record,
        scratch: &mut Record,
        snapshot: Option<SnapshotId>,
        visitor: &mut dyn FnMut(&Record) -> bool,
    ) -> Result<()>;

    /// Copy matches into `out`; `Ok(false)` if a fixed-size `out` ran full
    fn query_into(
        &self,
        from: &Record,
        to: &Record,
        scratch: &mut Record,
        out: &mut Batch,
        snapshot: Option<SnapshotId>,
    ) -> Result<bool> {
        let mut ok = true;
        self.query_each(from, to, scratch, snapshot, &mut |rec| {
            if out.push(rec).is_err() {
                ok = false;
                return false;
            }
            true
        })?;
        Ok(ok)
    }

    /// Lowest matching record by total order
    fn query_min(
        &self,
        from: &Record,
        to: &Record,
        scratch: &mut Record,
        snapshot: Option<SnapshotId>,
    ) -> Result<Option<Record>> {
        let mut min: Option<Record> = None;
        self.query_each(from, to, scratch, snapshot, &mut |rec| {
            if min.as_ref().map_or(true, |m| rec < m) {
                min = Some(rec.clone());
            }
            true
        })?;
        Ok(min)
    }

    /// Number of matching records
    fn query_count(
        &self,
        from: &Record,
        to: &Record,
        snapshot: Option<SnapshotId>,
    ) -> Result<u64> {
        let mut scratch = Record::new(self.schema());
        let mut count = 0u64;
        self.query_each(from, to, &mut scratch, snapshot, &mut |_| {
            count += 1;
            true
        })?;
        Ok(count)
    }

    /// Fold `fields` of all matches into one record appended to `out`
    ///
    /// The appended record is the first match with `fields` replaced by
    /// their reduction. Nothing is appended when nothing matches.
    fn query_aggregate(
        &self,
        from: &Record,
        to: &Record,
        scratch: &mut Record,
        out: &mut Batch,
        fields: &[usize],
        reduction: Reduction,
        snapshot: Option<SnapshotId>,
    ) -> Result<()> {
        let schema = Arc::clone(self.schema());
        let targets: Vec<&Field> = fields
            .iter()
            .map(|&i| {
                schema
                    .field(i)
                    .ok_or_else(|| RecordKvError::UnknownField(format!("#{}", i)))
            })
            .collect::<Result<_>>()?;

        let mut acc: Option<Vec<u8>> = None;
        let mut failure: Option<RecordKvError> = None;

        self.query_each(from, to, scratch, snapshot, &mut |rec| {
            let Some(folded) = acc.as_mut() else {
                acc = Some(rec.as_bytes().to_vec());
                return true;
            };
            for field in &targets {
                if let Err(e) = reduce_field(field, reduction, folded, rec.as_bytes()) {
                    failure = Some(e);
                    return false;
                }
            }
            true
        })?;

        if let Some(e) = failure {
            return Err(e);
        }
        if let Some(acc) = acc {
            out.push_bytes(&acc)?;
        }
        Ok(())
    }

    /// Make everything written so far durable and visible to new snapshots
    fn commit(&self) -> Result<CommitStats>;

    /// Number identifying the current read view
    fn snapshot_num(&self) -> SnapshotId;

    fn close(&self) -> Result<()>;
}

/// Fold one field of `rec` into `acc`
pub fn reduce_field(field: &Field, reduction: Reduction, acc: &mut [u8], rec: &[u8]) -> Result<()> {
    match reduction {
        Reduction::Sum => codec::add_field(field, acc, rec),
        Reduction::Min => {
            if codec::compare_field(field, rec, acc).is_lt() {
                acc[field.range()].copy_from_slice(&rec[field.range()]);
            }
            Ok(())
        }
        Reduction::Max => {
            if codec::compare_field(field, rec, acc).is_gt() {
                acc[field.range()].copy_from_slice(&rec[field.range()]);
            }
            Ok(())
        }
    }
}
