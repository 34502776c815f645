//! # recordkv
//!
//! An embedded record database layer with:
//! - Fixed-width binary record schemas with order-preserving encodings
//! - Multi-range queries over key fields
//! - Durable multi-partition commits through a block commit log
//! - Snapshot-isolated reads
//! - A double-buffered pipeline for bulk-loading text logs
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────┐
//! │    IngestPipeline    │        │     Query façade     │
//! │ (parse ║ insert)     │        │ (ranges, aggregates) │
//! └──────────┬───────────┘        └──────────┬───────────┘
//!            │ put_bulk                      │ snapshot reads
//! ┌──────────▼───────────────────────────────▼───────────┐
//! │                        DBMS                          │
//! │          (partitions, commit log, catalog)           │
//! └──────────┬───────────────────────────────┬───────────┘
//!            │                               │
//!            ▼                               ▼
//!   ┌─────────────────┐             ┌─────────────────┐
//!   │   Partition 1   │     ...     │   Partition P   │
//!   │ (StorageEngine) │             │ (StorageEngine) │
//!   └─────────────────┘             └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod schema;
pub mod record;
pub mod query;
pub mod storage;
pub mod dbms;
pub mod ingest;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RecordKvError, Result};
pub use config::{Config, IngestConfig, InsertFailurePolicy};
pub use schema::{Field, FieldType, Schema, Value};
pub use record::{Batch, Record};
pub use query::{Constraint, Constraints, Query, QueryRange};
pub use storage::{CommitStats, Reduction, SliceStore, StorageEngine};
pub use dbms::{Checkpoint, CommitLog, Dbms, DbmsSnapshot, Partition, PartitionSnapshot, PartitionSpec};
pub use ingest::{IngestPipeline, IngestReport, ParseDescriptor};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of recordkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
