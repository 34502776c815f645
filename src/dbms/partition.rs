//! Partition
//!
//! One named, schema-typed storage engine handle inside a DBMS, and the
//! snapshots taken of it.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::error::{RecordKvError, Result};
use crate::ingest::BatchSink;
use crate::query::{Constraints, Query, QuerySource};
use crate::record::{Batch, Record};
use crate::schema::Schema;
use crate::storage::{CommitStats, EngineOptions, SliceStore, SnapshotId, StorageEngine};

/// A named storage engine handle
pub struct Partition<E: StorageEngine = SliceStore> {
    name: String,
    engine: E,
    readonly: bool,
}

impl<E: StorageEngine> Partition<E> {
    /// Open the engine at `path_prefix` with the committed counts from `stats`
    pub fn open(
        name: impl Into<String>,
        path_prefix: &Path,
        schema: &Arc<Schema>,
        stats: CommitStats,
        slice_capacity: usize,
        record_capacity: usize,
        config: &Config,
    ) -> Result<Self> {
        let name = name.into();
        let engine = E::open(EngineOptions {
            path_prefix: path_prefix.to_path_buf(),
            schema: Arc::clone(schema),
            slices: stats.slices,
            records: stats.records,
            slice_capacity,
            record_capacity,
            readonly: config.readonly,
        })?;

        info!(
            partition = %name,
            slices = stats.slices,
            records = stats.records,
            "Opened partition"
        );

        Ok(Self {
            name,
            engine,
            readonly: config.readonly,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.engine.schema()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn put(&self, record: &Record) -> Result<()> {
        self.check_writable()?;
        self.engine.put(record)
    }

    pub fn put_bulk(&self, batch: &Batch) -> Result<()> {
        self.check_writable()?;
        self.engine.put_bulk(batch)
    }

    pub fn commit(&self) -> Result<CommitStats> {
        self.check_writable()?;
        self.engine.commit()
    }

    /// Current snapshot number
    pub fn snapshot_num(&self) -> SnapshotId {
        self.engine.snapshot_num()
    }

    /// Read view frozen at the current snapshot number
    pub fn snapshot(self: &Arc<Self>) -> PartitionSnapshot<E> {
        PartitionSnapshot {
            partition: Arc::clone(self),
            snapshot: self.engine.snapshot_num(),
        }
    }

    /// Query the latest state
    pub fn query(&self, constraints: Vec<Constraints>) -> Result<Query<&Self>> {
        Query::new(self, constraints)
    }

    pub fn close(&self) -> Result<()> {
        self.engine.close()
    }

    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            Err(RecordKvError::ReadOnly)
        } else {
            Ok(())
        }
    }
}

impl<E: StorageEngine> QuerySource for &Partition<E> {
    type Engine = E;

    fn engine(&self) -> &E {
        &self.engine
    }

    fn snapshot_id(&self) -> Option<SnapshotId> {
        None
    }
}

impl<E: StorageEngine> BatchSink for Partition<E> {
    fn put_bulk(&self, batch: &Batch) -> Result<()> {
        Partition::put_bulk(self, batch)
    }
}

impl<E: StorageEngine> std::fmt::Debug for Partition<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Partition")
            .field("name", &self.name)
            .field("record_size", &self.schema().record_size())
            .field("readonly", &self.readonly)
            .finish()
    }
}

/// Immutable read view of one partition
///
/// Writes made after the snapshot was taken are invisible to it.
pub struct PartitionSnapshot<E: StorageEngine = SliceStore> {
    partition: Arc<Partition<E>>,
    snapshot: SnapshotId,
}

impl<E: StorageEngine> PartitionSnapshot<E> {
    pub fn partition(&self) -> &Arc<Partition<E>> {
        &self.partition
    }

    pub fn snapshot_num(&self) -> SnapshotId {
        self.snapshot
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.partition.schema()
    }

    /// Query this read view
    pub fn query(&self, constraints: Vec<Constraints>) -> Result<Query<Self>> {
        Query::new(self.clone(), constraints)
    }
}

impl<E: StorageEngine> Clone for PartitionSnapshot<E> {
    fn clone(&self) -> Self {
        Self {
            partition: Arc::clone(&self.partition),
            snapshot: self.snapshot,
        }
    }
}

impl<E: StorageEngine> QuerySource for PartitionSnapshot<E> {
    type Engine = E;

    fn engine(&self) -> &E {
        &self.partition.engine
    }

    fn snapshot_id(&self) -> Option<SnapshotId> {
        Some(self.snapshot)
    }
}

impl<E: StorageEngine> std::fmt::Debug for PartitionSnapshot<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartitionSnapshot")
            .field("partition", &self.partition.name)
            .field("snapshot", &self.snapshot)
            .finish()
    }
}
