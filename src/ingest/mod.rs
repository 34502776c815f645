//! Ingest Module
//!
//! Converts line-oriented text logs into records and bulk-loads them.
//!
//! ## Responsibilities
//! - Open plain, gzip and xz input files by suffix
//! - Describe how tokens map onto fields (`ParseDescriptor`)
//! - Tokenize and parse single lines
//! - Strict bulk parsing with configurable rejection rules
//! - Double-buffered pipeline overlapping parsing with storage

mod bulk;
mod descriptor;
mod input;
mod line;
mod pipeline;

pub use bulk::{bulk_parse, BulkIssue, BulkParseOptions, BulkParseOutcome};
pub use descriptor::{
    ParseDescriptor, ParseDescriptorBuilder, ParseDirective, MAX_FIXED_POINT_DIGITS,
};
pub use input::{open_input, Compression, INPUT_BUFFER_SIZE};
pub use line::{parse_line, parse_tokens, strip_line_end, tokenize, ParsedLine};
pub use pipeline::{BatchSink, IngestEvent, IngestPipeline, IngestReport};
