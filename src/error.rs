//! Error types for RecordKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using RecordKvError
pub type Result<T> = std::result::Result<T, RecordKvError>;

/// Unified error type for RecordKV operations
#[derive(Debug, Error)]
pub enum RecordKvError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Schema Errors (fatal at definition time)
    // -------------------------------------------------------------------------
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Duplicate field: {0}")]
    DuplicateField(String),

    #[error("Unknown field type: {0}")]
    UnknownType(String),

    #[error("Invalid size for field {field}: {reason}")]
    FieldSize { field: String, reason: String },

    // -------------------------------------------------------------------------
    // Record / Codec Errors
    // -------------------------------------------------------------------------
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Type mismatch for field {field}: expected {expected}")]
    TypeMismatch { field: String, expected: &'static str },

    #[error("Value overflows field {field}: {value}")]
    Overflow { field: String, value: String },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Batch is full (capacity {0})")]
    BatchFull(usize),

    // -------------------------------------------------------------------------
    // Query Errors
    // -------------------------------------------------------------------------
    #[error("Field {0} is not a key field")]
    NotKeyField(String),

    #[error("Invalid range for field {0}: ranges must be inclusive")]
    InvalidRange(String),

    #[error("Invalid aggregate: {0}")]
    InvalidAggregate(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    // -------------------------------------------------------------------------
    // Commit Log / DBMS Errors
    // -------------------------------------------------------------------------
    #[error("Corruption detected: {0}")]
    Corrupt(String),

    #[error("Commit log entry too large: {len} bytes (block size {max})")]
    EntryTooLarge { len: usize, max: usize },

    #[error("Database is opened read-only")]
    ReadOnly,

    #[error("Unknown partition: {0}")]
    UnknownPartition(String),

    #[error("Schema mismatch for partition {0}")]
    SchemaMismatch(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Ingestion Errors
    // -------------------------------------------------------------------------
    #[error("Malformed line: {0}")]
    MalformedLine(String),

    #[error("Ingest pipeline already started")]
    AlreadyStarted,

    #[error("Ingest pipeline not started")]
    NotStarted,

    #[error("Batch insert failed: {0}")]
    InsertFailed(String),
}

impl From<bincode::Error> for RecordKvError {
    fn from(e: bincode::Error) -> Self {
        RecordKvError::Serialization(e.to_string())
    }
}
