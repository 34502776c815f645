//! DBMS
//!
//! A directory of partitions committed together through one commit log.

use std::fs;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{RecordKvError, Result};
use crate::query::{Constraints, Query};
use crate::record::Batch;
use crate::schema::Schema;
use crate::storage::{SliceStore, StorageEngine};

use super::catalog;
use super::checkpoint::Checkpoint;
use super::commit_log::CommitLog;
use super::partition::{Partition, PartitionSnapshot};

/// Declaration of one partition
#[derive(Debug, Clone)]
pub struct PartitionSpec {
    pub name: String,
    pub schema: Arc<Schema>,
    /// Overrides `Config::slice_capacity_hint`
    pub slice_capacity: Option<usize>,
    /// Overrides `Config::record_capacity_hint`
    pub record_capacity: Option<usize>,
}

impl PartitionSpec {
    pub fn new(name: impl Into<String>, schema: &Arc<Schema>) -> Self {
        Self {
            name: name.into(),
            schema: Arc::clone(schema),
            slice_capacity: None,
            record_capacity: None,
        }
    }

    /// Preallocation hints for this partition only
    pub fn with_capacity_hints(mut self, slices: usize, records: usize) -> Self {
        self.slice_capacity = Some(slices);
        self.record_capacity = Some(records);
        self
    }
}

/// Multi-partition database with atomic commits
///
/// ## Commit Protocol
/// ```text
/// commit(state):
///   for p in partitions:  (slices_p, records_p) = p.commit()   // durable
///   commit_log.append("state,slices_1,records_1,...")          // durable
///   external_state = state
///
/// open():
///   checkpoint = commit_log.last() or zeros
///   for p in partitions:  open p truncated to (slices_p, records_p)
/// ```
/// A crash between the partition commits and the log append leaves the
/// previous checkpoint in force; reopening discards the extra data.
///
/// Writers are not serialized internally: `commit` and `snapshot` must not
/// race with `put_bulk`.
pub struct Dbms<E: StorageEngine = SliceStore> {
    config: Config,
    commit_log: CommitLog,
    partitions: Vec<Arc<Partition<E>>>,
    checkpoint: Checkpoint,
}

impl<E: StorageEngine> Dbms<E> {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const COMMIT_LOG_FILENAME: &'static str = "commit";

    /// Open or create the database under `config.data_dir`
    ///
    /// On startup:
    /// 1. Validate partition declarations
    /// 2. Create the data directory
    /// 3. Read the last commit checkpoint
    /// 4. Check every schema against the catalog
    /// 5. Open every partition at its committed counts
    pub fn open(config: Config, specs: Vec<PartitionSpec>) -> Result<Self> {
        // Step 1: Validate declarations
        if specs.is_empty() {
            return Err(RecordKvError::Config("no partitions declared".to_string()));
        }
        for (i, spec) in specs.iter().enumerate() {
            check_partition_name(&spec.name)?;
            if specs[..i].iter().any(|s| s.name == spec.name) {
                return Err(RecordKvError::Config(format!(
                    "duplicate partition '{}'",
                    spec.name
                )));
            }
        }

        // Step 2: Data directory
        let dir = &config.data_dir;
        if dir.exists() && !dir.is_dir() {
            return Err(RecordKvError::Config(format!(
                "{} exists and is not a directory",
                dir.display()
            )));
        }
        if !config.readonly {
            fs::create_dir_all(dir)?;
        }

        // Step 3: Recover the checkpoint
        let commit_log = CommitLog::new(dir.join(Self::COMMIT_LOG_FILENAME));
        let checkpoint = match commit_log.last()? {
            Some(block) => Checkpoint::parse(&block, specs.len())?,
            None => Checkpoint::empty(specs.len()),
        };
        info!(
            path = %dir.display(),
            partitions = specs.len(),
            external_state = checkpoint.external_state,
            readonly = config.readonly,
            "Recovered commit checkpoint"
        );

        // Steps 4 and 5: Catalog and partitions
        let mut partitions = Vec::with_capacity(specs.len());
        for (spec, stats) in specs.iter().zip(&checkpoint.partitions) {
            catalog::verify_or_record(dir, &spec.name, &spec.schema, config.readonly)?;

            let prefix = dir.join(format!("db_{}_", spec.name));
            let partition = Partition::open(
                spec.name.clone(),
                &prefix,
                &spec.schema,
                *stats,
                spec.slice_capacity.unwrap_or(config.slice_capacity_hint),
                spec.record_capacity.unwrap_or(config.record_capacity_hint),
                &config,
            )?;
            partitions.push(Arc::new(partition));
        }

        Ok(Self {
            config,
            commit_log,
            partitions,
            checkpoint,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_readonly(&self) -> bool {
        self.config.readonly
    }

    /// Caller state stored with the last durable commit
    pub fn external_state(&self) -> u64 {
        self.checkpoint.external_state
    }

    /// The last durable checkpoint (recovered or committed)
    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn commit_log(&self) -> &CommitLog {
        &self.commit_log
    }

    /// Partitions in declaration order
    pub fn partitions(&self) -> &[Arc<Partition<E>>] {
        &self.partitions
    }

    pub fn partition(&self, name: &str) -> Result<&Arc<Partition<E>>> {
        self.partitions
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| RecordKvError::UnknownPartition(name.to_string()))
    }

    pub fn put_bulk(&self, partition: &str, batch: &Batch) -> Result<()> {
        if self.config.readonly {
            return Err(RecordKvError::ReadOnly);
        }
        self.partition(partition)?.put_bulk(batch)
    }

    /// Query a fresh snapshot of `partition`
    pub fn query(
        &self,
        partition: &str,
        constraints: Vec<Constraints>,
    ) -> Result<Query<PartitionSnapshot<E>>> {
        self.partition(partition)?.snapshot().query(constraints)
    }

    /// Durably commit every partition, then record the checkpoint
    pub fn commit(&mut self, external_state: u64) -> Result<Checkpoint> {
        if self.config.readonly {
            return Err(RecordKvError::ReadOnly);
        }

        let mut partitions = Vec::with_capacity(self.partitions.len());
        for partition in &self.partitions {
            let stats = partition.commit()?;
            debug!(
                partition = partition.name(),
                slices = stats.slices,
                records = stats.records,
                "Committed partition"
            );
            partitions.push(stats);
        }

        let checkpoint = Checkpoint {
            external_state,
            partitions,
        };
        self.commit_log.append(checkpoint.encode().as_bytes())?;
        self.checkpoint = checkpoint.clone();

        info!(external_state, "Commit complete");
        Ok(checkpoint)
    }

    /// Read views of every partition
    pub fn snapshot(&self) -> DbmsSnapshot<E> {
        DbmsSnapshot {
            partitions: self.partitions.iter().map(|p| p.snapshot()).collect(),
        }
    }

    /// Close every partition
    ///
    /// All partitions are closed even when one fails; the first error is
    /// returned.
    pub fn close(self) -> Result<()> {
        let mut first_error = None;
        for partition in &self.partitions {
            if let Err(e) = partition.close() {
                warn!(partition = partition.name(), error = %e, "Failed to close partition");
                first_error.get_or_insert(e);
            }
        }
        info!(path = %self.config.data_dir.display(), "Closed database");
        first_error.map_or(Ok(()), Err)
    }
}

/// Partition names become file names inside the data directory
fn check_partition_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RecordKvError::Config("empty partition name".to_string()));
    }
    if name.contains("..") || name.contains(['/', '\\', '\0']) {
        return Err(RecordKvError::Config(format!(
            "invalid partition name '{}'",
            name
        )));
    }
    Ok(())
}

impl<E: StorageEngine> std::fmt::Debug for Dbms<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dbms")
            .field("data_dir", &self.config.data_dir)
            .field("partitions", &self.partitions)
            .field("checkpoint", &self.checkpoint)
            .finish()
    }
}

/// Read views of every partition of a DBMS
pub struct DbmsSnapshot<E: StorageEngine = SliceStore> {
    partitions: Vec<PartitionSnapshot<E>>,
}

impl<E: StorageEngine> DbmsSnapshot<E> {
    pub fn partitions(&self) -> &[PartitionSnapshot<E>] {
        &self.partitions
    }

    pub fn partition(&self, name: &str) -> Result<&PartitionSnapshot<E>> {
        self.partitions
            .iter()
            .find(|s| s.partition().name() == name)
            .ok_or_else(|| RecordKvError::UnknownPartition(name.to_string()))
    }

    pub fn query(
        &self,
        partition: &str,
        constraints: Vec<Constraints>,
    ) -> Result<Query<PartitionSnapshot<E>>> {
        self.partition(partition)?.query(constraints)
    }
}

impl<E: StorageEngine> Clone for DbmsSnapshot<E> {
    fn clone(&self) -> Self {
        Self {
            partitions: self.partitions.clone(),
        }
    }
}
