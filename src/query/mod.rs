//! Query Module
//!
//! Range queries over partitions.
//!
//! ## Responsibilities
//! - Translate per-field constraints into `[from, to]` record bounds
//! - Run multi-range queries against a partition or snapshot
//!
//! ## Flow
//! ```text
//! Constraints ──► QueryRange::build ──► [from, to]
//!                                           │
//!                      Query::each / count / aggregate / min
//!                                           │
//!                                           ▼
//!                      StorageEngine::query_* (at snapshot)
//! ```

mod facade;
mod range;

pub use facade::{Query, QuerySource, DEFAULT_RESULT_CAPACITY};
pub use range::{Constraint, Constraints, QueryRange};
