//! Input files
//!
//! Opens log files for import, decompressing by file name suffix:
//!
//! ```text
//! *.gz   gzip (concatenated members are read in sequence)
//! *.xz   xz   (concatenated streams are read in sequence)
//! other  plain text
//! ```
//! Suffixes are matched case-insensitively.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use tracing::debug;
use xz2::read::XzDecoder;

use crate::error::Result;

/// Read buffer size for input files
pub const INPUT_BUFFER_SIZE: usize = 1 << 16;

/// Compression of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Xz,
}

impl Compression {
    /// Compression implied by the suffix of `path`
    pub fn from_path(path: &Path) -> Self {
        let name = path.as_os_str().to_string_lossy();
        if has_suffix(&name, ".gz") {
            Compression::Gzip
        } else if has_suffix(&name, ".xz") {
            Compression::Xz
        } else {
            Compression::None
        }
    }
}

fn has_suffix(name: &str, suffix: &str) -> bool {
    name.len() >= suffix.len()
        && name.as_bytes()[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix.as_bytes())
}

/// Open `path` as buffered line input, decompressing when its suffix says so
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path)?;
    let compression = Compression::from_path(path);
    debug!(path = %path.display(), ?compression, "Opening input");

    Ok(match compression {
        Compression::None => Box::new(BufReader::with_capacity(INPUT_BUFFER_SIZE, file)),
        Compression::Gzip => Box::new(BufReader::with_capacity(
            INPUT_BUFFER_SIZE,
            MultiGzDecoder::new(BufReader::new(file)),
        )),
        Compression::Xz => Box::new(BufReader::with_capacity(
            INPUT_BUFFER_SIZE,
            XzDecoder::new_multi_decoder(BufReader::new(file)),
        )),
    })
}
