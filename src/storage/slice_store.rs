//! SliceStore
//!
//! File-backed reference engine. Every `put_bulk` appends one key-sorted
//! slice; queries merge the visible slices back into key order.
//!
//! ## File Layout
//! ```text
//! <prefix>data_<record size>
//! ┌───────────────────────────┬───────────┬───────────┬─────┐
//! │ magic "RKVS" | ver | size │ slice 0   │ slice 1   │ ... │
//! │  4B          | 2B  | 4B   │ (records) │ (records) │     │
//! └───────────────────────────┴───────────┴───────────┴─────┘
//!
//! <prefix>slices
//! ┌──────────────────┬──────────────────┬─────┐
//! │ len(4) | crc(4)  │ len(4) | crc(4)  │ ... │   one entry per slice
//! └──────────────────┴──────────────────┴─────┘
//! ```
//!
//! On open, both files are cut back to the slice and record counts found in
//! the commit log, which discards anything written after the last commit.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, ErrorKind, Read, Write};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::error::{RecordKvError, Result};
use crate::record::{Batch, Record};
use crate::schema::Schema;

use super::{CommitStats, EngineOptions, SnapshotId, StorageEngine};

/// Magic bytes at the start of every data file
const MAGIC: &[u8; 4] = b"RKVS";

/// Data file format version
const VERSION: u16 = 1;

/// magic(4) + version(2) + record size(4)
const HEADER_SIZE: u64 = 10;

/// len(4) + crc(4)
const SLICE_ENTRY_SIZE: u64 = 8;

#[derive(Debug, Clone, Copy)]
struct SliceMeta {
    /// Index of the first record
    start: usize,
    /// Number of records
    len: usize,
}

/// In-memory image of the committed-or-pending data
struct SliceState {
    slices: Vec<SliceMeta>,
    data: Vec<u8>,
}

struct SliceWriter {
    data: BufWriter<File>,
    slices: BufWriter<File>,
}

impl SliceWriter {
    /// Cut both files back to `data_len` / `slices_len` bytes
    ///
    /// Both handles append, so later writes land at the new ends.
    fn rewind(&mut self, data_len: u64, slices_len: u64) -> io::Result<()> {
        self.data.flush()?;
        self.slices.flush()?;
        self.data.get_ref().set_len(data_len)?;
        self.slices.get_ref().set_len(slices_len)?;
        Ok(())
    }

    /// Drop without flushing buffered bytes
    fn discard(self) {
        let _ = self.data.into_parts();
        let _ = self.slices.into_parts();
    }
}

/// Append-only, slice-structured record store
pub struct SliceStore {
    schema: Arc<Schema>,
    data_path: PathBuf,
    readonly: bool,
    state: RwLock<SliceState>,
    /// `None` when read-only, closed, or after a failed write could not be undone
    writer: Mutex<Option<SliceWriter>>,
}

impl SliceStore {
    /// Path of the data file
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.state.read().data.len() / self.schema.record_size()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().data.is_empty()
    }

    fn load(
        options: &EngineOptions,
        data_path: &Path,
        slices_path: &Path,
    ) -> Result<SliceState> {
        let size = options.schema.record_size();
        let mut state = SliceState {
            slices: Vec::with_capacity(options.slice_capacity),
            data: Vec::with_capacity(options.record_capacity.saturating_mul(size)),
        };

        // Nothing committed: a missing or half-created file is an empty store
        if options.slices == 0 && options.records == 0 {
            let len = match std::fs::metadata(data_path) {
                Ok(meta) => meta.len(),
                Err(e) if e.kind() == ErrorKind::NotFound => 0,
                Err(e) => return Err(e.into()),
            };
            if len < HEADER_SIZE {
                return Ok(state);
            }
        }

        let mut file = File::open(data_path).map_err(|e| {
            RecordKvError::Corrupt(format!("{}: {}", data_path.display(), e))
        })?;
        read_header(&mut file, size)?;

        let mut entries = Vec::new();
        if options.slices > 0 {
            let mut slices = File::open(slices_path).map_err(|e| {
                RecordKvError::Corrupt(format!("{}: {}", slices_path.display(), e))
            })?;
            let wanted = options.slices * SLICE_ENTRY_SIZE;
            if slices.metadata()?.len() < wanted {
                return Err(RecordKvError::Corrupt(format!(
                    "slice index holds fewer than {} committed slices",
                    options.slices
                )));
            }
            entries = vec![0u8; wanted as usize];
            slices.read_exact(&mut entries)?;
        }

        let wanted = options.records as usize * size;
        if file.metadata()?.len() < HEADER_SIZE + wanted as u64 {
            return Err(RecordKvError::Corrupt(format!(
                "data file holds fewer than {} committed records",
                options.records
            )));
        }
        state.data.resize(wanted, 0);
        file.read_exact(&mut state.data)?;

        let mut start = 0usize;
        for (i, entry) in entries.chunks_exact(SLICE_ENTRY_SIZE as usize).enumerate() {
            let len = u32::from_le_bytes([entry[0], entry[1], entry[2], entry[3]]) as usize;
            let crc = u32::from_le_bytes([entry[4], entry[5], entry[6], entry[7]]);

            let bytes = state
                .data
                .get(start * size..(start + len) * size)
                .ok_or_else(|| {
                    RecordKvError::Corrupt(format!("slice {} extends past committed records", i))
                })?;
            if crc32fast::hash(bytes) != crc {
                return Err(RecordKvError::Corrupt(format!("slice {} checksum mismatch", i)));
            }

            state.slices.push(SliceMeta { start, len });
            start += len;
        }

        if start as u64 != options.records {
            return Err(RecordKvError::Corrupt(format!(
                "slices cover {} records, commit log says {}",
                start, options.records
            )));
        }

        Ok(state)
    }

    /// Cut both files back to the committed state and open append handles
    fn open_writer(
        options: &EngineOptions,
        data_path: &Path,
        slices_path: &Path,
    ) -> Result<SliceWriter> {
        let size = options.schema.record_size();

        let mut data = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(data_path)?;
        if data.metadata()?.len() < HEADER_SIZE {
            data.set_len(0)?;
            data.write_all(MAGIC)?;
            data.write_all(&VERSION.to_le_bytes())?;
            data.write_all(&(size as u32).to_le_bytes())?;
            data.sync_all()?;
        }

        let data_len = HEADER_SIZE + options.records * size as u64;
        if data.metadata()?.len() > data_len {
            warn!(
                path = %data_path.display(),
                records = options.records,
                "Discarding uncommitted records"
            );
            data.set_len(data_len)?;
        }

        let slices = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(slices_path)?;
        let slices_len = options.slices * SLICE_ENTRY_SIZE;
        if slices.metadata()?.len() > slices_len {
            slices.set_len(slices_len)?;
        }
        drop(slices);
        drop(data);

        let data = OpenOptions::new().append(true).open(data_path)?;
        let slices = OpenOptions::new().append(true).open(slices_path)?;

        Ok(SliceWriter {
            data: BufWriter::new(data),
            slices: BufWriter::new(slices),
        })
    }

    fn check_schema(&self, schema: &Arc<Schema>) -> Result<()> {
        if Arc::ptr_eq(&self.schema, schema) || *self.schema == **schema {
            Ok(())
        } else {
            Err(RecordKvError::Schema(
                "batch schema does not match store schema".to_string(),
            ))
        }
    }

    /// Append `bytes` (whole records, already key-sorted) as one slice
    fn append_slice(&self, bytes: &[u8]) -> Result<()> {
        if self.readonly {
            return Err(RecordKvError::ReadOnly);
        }
        let size = self.schema.record_size();
        let len = bytes.len() / size;
        if len == 0 {
            return Ok(());
        }
        let len32 = u32::try_from(len)
            .map_err(|_| RecordKvError::Storage(format!("slice of {} records too large", len)))?;

        let mut guard = self.writer.lock();
        let writer = guard.as_mut().ok_or_else(not_writable)?;

        let crc = crc32fast::hash(bytes);
        let written = writer
            .data
            .write_all(bytes)
            .and_then(|_| writer.slices.write_all(&len32.to_le_bytes()))
            .and_then(|_| writer.slices.write_all(&crc.to_le_bytes()));

        if let Err(e) = written {
            // Files must end where the in-memory slices end
            let (data_len, slices_len) = {
                let state = self.state.read();
                (
                    HEADER_SIZE + state.data.len() as u64,
                    state.slices.len() as u64 * SLICE_ENTRY_SIZE,
                )
            };
            match writer.rewind(data_len, slices_len) {
                Ok(()) => warn!(
                    path = %self.data_path.display(),
                    error = %e,
                    "Slice write failed, partial slice removed"
                ),
                Err(undo) => {
                    error!(
                        path = %self.data_path.display(),
                        error = %e,
                        undo_error = %undo,
                        "Slice write failed and could not be undone, store is read-only until reopened"
                    );
                    if let Some(writer) = guard.take() {
                        writer.discard();
                    }
                }
            }
            return Err(e.into());
        }

        let mut state = self.state.write();
        let start = state.data.len() / size;
        state.data.extend_from_slice(bytes);
        state.slices.push(SliceMeta { start, len });
        Ok(())
    }
}

fn not_writable() -> RecordKvError {
    RecordKvError::Storage("store is closed or unwritable, reopen to recover".to_string())
}

fn file_with_prefix(prefix: &Path, name: &str) -> PathBuf {
    let mut path = prefix.as_os_str().to_owned();
    path.push(name);
    PathBuf::from(path)
}

fn read_header(file: &mut File, record_size: usize) -> Result<()> {
    let mut header = [0u8; HEADER_SIZE as usize];
    file.read_exact(&mut header)
        .map_err(|_| RecordKvError::Corrupt("data file header truncated".to_string()))?;

    if &header[0..4] != MAGIC {
        return Err(RecordKvError::Corrupt(format!(
            "invalid data file magic: expected RKVS, got {:?}",
            &header[0..4]
        )));
    }
    let version = u16::from_le_bytes([header[4], header[5]]);
    if version != VERSION {
        return Err(RecordKvError::Corrupt(format!(
            "unsupported data file version: {}",
            version
        )));
    }
    let size = u32::from_le_bytes([header[6], header[7], header[8], header[9]]) as usize;
    if size != record_size {
        return Err(RecordKvError::Corrupt(format!(
            "data file record size {} does not match schema size {}",
            size, record_size
        )));
    }
    Ok(())
}

/// First index in `range` for which `pred` is false
///
/// `pred` must hold for a prefix of the range and fail for the rest.
fn partition_point(range: Range<usize>, pred: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (range.start, range.end);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Merge cursor: (key bytes, slice index, record index)
type Cursor = Reverse<(Vec<u8>, usize, usize)>;

impl StorageEngine for SliceStore {
    fn open(options: EngineOptions) -> Result<Self> {
        let size = options.schema.record_size();
        let data_path = file_with_prefix(&options.path_prefix, &format!("data_{}", size));
        let slices_path = file_with_prefix(&options.path_prefix, "slices");

        let state = Self::load(&options, &data_path, &slices_path)?;
        let writer = if options.readonly {
            None
        } else {
            Some(Self::open_writer(&options, &data_path, &slices_path)?)
        };

        info!(
            path = %data_path.display(),
            slices = state.slices.len(),
            records = options.records,
            readonly = options.readonly,
            "Opened slice store"
        );

        Ok(Self {
            schema: options.schema,
            data_path,
            readonly: options.readonly,
            state: RwLock::new(state),
            writer: Mutex::new(writer),
        })
    }

    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn put(&self, record: &Record) -> Result<()> {
        self.check_schema(record.schema())?;
        self.append_slice(record.as_bytes())
    }

    fn put_bulk(&self, batch: &Batch) -> Result<()> {
        self.check_schema(batch.schema())?;
        if batch.is_empty() {
            return Ok(());
        }

        let size = self.schema.record_size();
        let mut order: Vec<&[u8]> = batch.iter().collect();
        order.sort_by(|a, b| self.schema.compare_keys(a, b));

        let mut sorted = Vec::with_capacity(batch.as_bytes().len());
        for rec in order {
            sorted.extend_from_slice(rec);
        }
        debug!(records = sorted.len() / size, "Appending slice");
        self.append_slice(&sorted)
    }

    fn query_each(
        &self,
        from: &Record,
        to: &Record,
        scratch: &mut Record,
        snapshot: Option<SnapshotId>,
        visitor: &mut dyn FnMut(&Record) -> bool,
    ) -> Result<()> {
        let state = self.state.read();
        let schema = &self.schema;
        let size = schema.record_size();
        let (from, to) = (from.as_bytes(), to.as_bytes());

        let visible = match snapshot {
            Some(n) => (n as usize).min(state.slices.len()),
            None => state.slices.len(),
        };

        let record = |idx: usize| &state.data[idx * size..(idx + 1) * size];
        let key_of = |rec: &[u8]| -> Vec<u8> {
            schema
                .key_fields()
                .flat_map(|f| rec[f.range()].iter().copied())
                .collect()
        };

        // Per slice: [first >= from, first > to)
        let mut ends = Vec::with_capacity(visible);
        let mut heap: BinaryHeap<Cursor> = BinaryHeap::with_capacity(visible);
        for (i, slice) in state.slices[..visible].iter().enumerate() {
            let range = slice.start..slice.start + slice.len;
            let begin = partition_point(range.clone(), |j| {
                schema.compare_keys(record(j), from).is_lt()
            });
            let end = partition_point(range, |j| schema.compare_keys(record(j), to).is_le());
            ends.push(end);
            if begin < end {
                heap.push(Reverse((key_of(record(begin)), i, begin)));
            }
        }

        while let Some(Reverse((_, slice, idx))) = heap.pop() {
            let rec = record(idx);
            if schema.keys_within(rec, from, to) {
                scratch.load(rec);
                if !visitor(scratch) {
                    return Ok(());
                }
            }
            if idx + 1 < ends[slice] {
                heap.push(Reverse((key_of(record(idx + 1)), slice, idx + 1)));
            }
        }
        Ok(())
    }

    fn commit(&self) -> Result<CommitStats> {
        if self.readonly {
            return Err(RecordKvError::ReadOnly);
        }
        let mut writer = self.writer.lock();
        let writer = writer.as_mut().ok_or_else(not_writable)?;

        // Data before the index that points at it
        writer.data.flush()?;
        writer.data.get_ref().sync_all()?;
        writer.slices.flush()?;
        writer.slices.get_ref().sync_all()?;

        let state = self.state.read();
        let stats = CommitStats {
            slices: state.slices.len() as u64,
            records: (state.data.len() / self.schema.record_size()) as u64,
        };
        debug!(slices = stats.slices, records = stats.records, "Committed slice store");
        Ok(stats)
    }

    fn snapshot_num(&self) -> SnapshotId {
        self.state.read().slices.len() as SnapshotId
    }

    fn close(&self) -> Result<()> {
        if let Some(mut writer) = self.writer.lock().take() {
            writer.data.flush()?;
            writer.slices.flush()?;
        }
        Ok(())
    }
}
