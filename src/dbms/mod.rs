//! DBMS Module
//!
//! Durable multi-partition storage.
//!
//! ## Responsibilities
//! - Open partitions at their last committed state
//! - Commit all partitions atomically via the commit log
//! - Hand out snapshot read views
//! - Guard against reopening a partition with a different schema
//!
//! ## Directory Layout
//! ```text
//! data_dir/
//!   ├── commit                512-byte checkpoint blocks
//!   ├── schema_<name>         schema catalog
//!   ├── db_<name>_data_<N>    partition records (N = record size)
//!   └── db_<name>_slices      partition slice index
//! ```

pub mod catalog;
mod checkpoint;
mod commit_log;
mod database;
mod partition;

pub use checkpoint::Checkpoint;
pub use commit_log::{CommitLog, BLOCK_SIZE, DEFAULT_FILLER};
pub use database::{Dbms, DbmsSnapshot, PartitionSpec};
pub use partition::{Partition, PartitionSnapshot};
