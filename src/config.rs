//! Configuration for recordkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

/// Main configuration for a DBMS instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── commit                 (commit log)
    ///     ├── schema_<name>          (schema catalog, one per partition)
    ///     ├── db_<name>_data_<size>  (partition records)
    ///     └── db_<name>_slices       (partition slice index)
    pub data_dir: PathBuf,

    /// Open without writing anything to disk
    pub readonly: bool,

    // -------------------------------------------------------------------------
    // Preallocation Hints
    // -------------------------------------------------------------------------
    /// Expected number of slices per partition
    pub slice_capacity_hint: usize,

    /// Expected number of records per partition
    pub record_capacity_hint: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./recordkv_data"),
            readonly: false,
            slice_capacity_hint: 1024,
            record_capacity_hint: 1024 * 1024,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Open read-only
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.config.readonly = readonly;
        self
    }

    /// Set the default slice preallocation hint
    pub fn slice_capacity_hint(mut self, slices: usize) -> Self {
        self.config.slice_capacity_hint = slices;
        self
    }

    /// Set the default record preallocation hint
    pub fn record_capacity_hint(mut self, records: usize) -> Self {
        self.config.record_capacity_hint = records;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

/// What the inserter does when storing a batch fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertFailurePolicy {
    /// Stop storing; `stop()` reports the first failure
    #[default]
    Halt,

    /// Log, count the lost records and keep going
    Drop,

    /// Retry with a fixed backoff, then behave like `Halt`
    Retry { attempts: u32, backoff: Duration },
}

/// Configuration for an ingestion pipeline
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Records per batch (two batches are allocated)
    pub batch_capacity: usize,

    /// Token separator; a space means any run of ASCII whitespace
    pub separator: u8,

    /// Emit a failure event for every line that does not parse
    pub report_failures: bool,

    /// Emit a progress event every N lines read
    pub progress_every: Option<u64>,

    pub failure_policy: InsertFailurePolicy,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_capacity: 1 << 22,
            separator: b' ',
            report_failures: false,
            progress_every: Some(1_000_000),
            failure_policy: InsertFailurePolicy::Halt,
        }
    }
}

impl IngestConfig {
    /// Create a new ingest config builder
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder::default()
    }
}

/// Builder for IngestConfig
#[derive(Default)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn batch_capacity(mut self, records: usize) -> Self {
        self.config.batch_capacity = records;
        self
    }

    pub fn separator(mut self, separator: u8) -> Self {
        self.config.separator = separator;
        self
    }

    pub fn report_failures(mut self, report: bool) -> Self {
        self.config.report_failures = report;
        self
    }

    /// Progress interval in lines; `None` disables progress events
    pub fn progress_every(mut self, lines: Option<u64>) -> Self {
        self.config.progress_every = lines;
        self
    }

    pub fn failure_policy(mut self, policy: InsertFailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    pub fn build(self) -> IngestConfig {
        self.config
    }
}
