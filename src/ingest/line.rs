//! Line tokenizer and parser
//!
//! ```text
//! "1699999999.5  42  GET  0.250\r\n"
//!        │        │    │     │
//!   Field(ts)  Field(uid) Skip  FixedPoint{latency, 3}
//! ```

use crate::error::{RecordKvError, Result};
use crate::record::Record;

use super::descriptor::{ParseDescriptor, ParseDirective};

/// Strip a trailing `\n` or `\r\n`
pub fn strip_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Split `line` on `sep`
///
/// A space separator splits on runs of ASCII whitespace and skips leading
/// whitespace; any other separator splits on every occurrence.
pub fn tokenize(line: &[u8], sep: u8) -> Box<dyn Iterator<Item = &[u8]> + '_> {
    if sep == b' ' {
        Box::new(
            line.split(u8::is_ascii_whitespace)
                .filter(|token| !token.is_empty()),
        )
    } else {
        Box::new(line.split(move |&c| c == sep))
    }
}

/// Result of parsing one line into a record
#[derive(Debug)]
pub struct ParsedLine {
    /// Tokens found on the line (including ones past the descriptor)
    pub tokens: usize,
    /// First token that failed to parse, if any
    pub error: Option<RecordKvError>,
}

/// Parse tokens into `record`, stopping at the first bad token
///
/// `record` is not reset first; fields without a token keep their value.
pub fn parse_tokens(
    record: &mut Record,
    line: &[u8],
    descriptor: &ParseDescriptor,
    sep: u8,
) -> ParsedLine {
    let line = strip_line_end(line);
    if line.is_empty() {
        return ParsedLine {
            tokens: 0,
            error: None,
        };
    }
    let mut tokens = 0;
    let mut error = None;
    let mut directives = descriptor.directives().iter();

    for token in tokenize(line, sep) {
        tokens += 1;
        if error.is_some() {
            continue;
        }
        let outcome = match directives.next() {
            Some(ParseDirective::Field(idx)) => record.set_from_bytes_at(*idx, token),
            Some(ParseDirective::FixedPoint { field, digits }) => {
                record.set_fixed_point_at(*field, token, *digits)
            }
            Some(ParseDirective::Skip) | None => Ok(()),
        };
        if let Err(e) = outcome {
            error = Some(e);
        }
    }

    ParsedLine { tokens, error }
}

/// Reset `record` and parse `line` into it
///
/// Fewer tokens than directives is accepted. Extra tokens are ignored. A
/// line without any token is rejected.
pub fn parse_line(
    record: &mut Record,
    line: &[u8],
    descriptor: &ParseDescriptor,
    sep: u8,
) -> Result<usize> {
    record.reset();
    let parsed = parse_tokens(record, line, descriptor, sep);
    if let Some(e) = parsed.error {
        return Err(e);
    }
    if parsed.tokens == 0 {
        return Err(RecordKvError::MalformedLine("empty line".to_string()));
    }
    Ok(parsed.tokens)
}
