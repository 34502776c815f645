//! Strict bulk parser
//!
//! Reads lines straight into a batch until it is full or the input ends.
//! Unlike `parse_line`, problems are not errors: each line is kept or
//! rejected according to `BulkParseOptions`, optionally consulting a callback.

use std::io::BufRead;

use crate::error::{RecordKvError, Result};
use crate::record::{Batch, Record};

use super::descriptor::ParseDescriptor;
use super::line::{parse_tokens, strip_line_end};

/// Acceptance rules for `bulk_parse`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkParseOptions {
    /// Drop lines with an unparsable token without asking
    pub reject_token_parse_error: bool,
    /// Drop lines whose token count is out of bounds without asking
    pub reject_invalid_num_tokens: bool,
    pub min_tokens: usize,
    /// 0 = unbounded
    pub max_tokens: usize,
    /// Longer lines count as a token parse error; 0 = unbounded
    pub max_line_len: usize,
}

impl Default for BulkParseOptions {
    fn default() -> Self {
        Self {
            reject_token_parse_error: true,
            reject_invalid_num_tokens: true,
            min_tokens: 1,
            max_tokens: 0,
            max_line_len: 4096,
        }
    }
}

/// A line the rules did not accept outright
#[derive(Debug)]
pub struct BulkIssue<'a> {
    /// Line without its terminator
    pub line: &'a [u8],
    pub tokens: usize,
    /// Set for parse errors, `None` for token count problems
    pub error: Option<&'a RecordKvError>,
    /// The record as parsed so far
    pub record: &'a Record,
}

/// How far one `bulk_parse` call got
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkParseOutcome {
    /// `true` if it stopped because the batch filled up
    pub more: bool,
    pub lines_read: u64,
}

/// Parse lines from `input` into `batch` until it is full or `input` ends
///
/// `on_issue` decides the fate of lines a policy does not reject outright:
/// `true` keeps the record.
pub fn bulk_parse<R, F>(
    input: &mut R,
    batch: &mut Batch,
    record: &mut Record,
    descriptor: &ParseDescriptor,
    sep: u8,
    options: &BulkParseOptions,
    mut on_issue: F,
) -> Result<BulkParseOutcome>
where
    R: BufRead + ?Sized,
    F: FnMut(&BulkIssue<'_>) -> bool,
{
    let mut buf = Vec::with_capacity(options.max_line_len.max(128));
    let mut lines_read = 0u64;

    loop {
        if batch.is_full() {
            return Ok(BulkParseOutcome {
                more: true,
                lines_read,
            });
        }

        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            return Ok(BulkParseOutcome {
                more: false,
                lines_read,
            });
        }
        lines_read += 1;

        let line = strip_line_end(&buf);
        record.reset();

        let (tokens, error) = if options.max_line_len > 0 && line.len() > options.max_line_len {
            let e = RecordKvError::MalformedLine(format!(
                "line of {} bytes exceeds {}",
                line.len(),
                options.max_line_len
            ));
            (0, Some(e))
        } else {
            let parsed = parse_tokens(record, line, descriptor, sep);
            (parsed.tokens, parsed.error)
        };

        let keep = if let Some(e) = &error {
            !options.reject_token_parse_error
                && on_issue(&BulkIssue {
                    line,
                    tokens,
                    error: Some(e),
                    record,
                })
        } else if tokens < options.min_tokens
            || (options.max_tokens > 0 && tokens > options.max_tokens)
        {
            !options.reject_invalid_num_tokens
                && on_issue(&BulkIssue {
                    line,
                    tokens,
                    error: None,
                    record,
                })
        } else {
            true
        };

        if keep {
            batch.push(record)?;
        }
    }
}
