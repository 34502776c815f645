//! Commit Log
//!
//! Append-only file of fixed-size, filler-padded text blocks. The last block
//! is the recovery checkpoint.
//!
//! ```text
//! ┌──────────────────────────┬──────────────────────────┬─────┐
//! │ "7,1,100,2,250      ..." │ "9,2,180,3,400      ..." │ ... │
//! │        512 bytes         │        512 bytes         │     │
//! └──────────────────────────┴──────────────────────────┴─────┘
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{RecordKvError, Result};

/// Size of one commit log block
pub const BLOCK_SIZE: usize = 512;

/// Default padding byte
pub const DEFAULT_FILLER: u8 = b' ';

/// Block-structured append-only log
#[derive(Debug, Clone)]
pub struct CommitLog {
    path: PathBuf,
    filler: u8,
}

impl CommitLog {
    /// Handle for the log at `path`; the file is created by the first append
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            filler: DEFAULT_FILLER,
        }
    }

    /// Use `filler` instead of a space to pad blocks
    pub fn with_filler(mut self, filler: u8) -> Self {
        self.filler = filler;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Pad `entry` to one block and append it durably
    pub fn append(&self, entry: &[u8]) -> Result<()> {
        if entry.len() > BLOCK_SIZE {
            return Err(RecordKvError::EntryTooLarge {
                len: entry.len(),
                max: BLOCK_SIZE,
            });
        }

        let mut block = [self.filler; BLOCK_SIZE];
        block[..entry.len()].copy_from_slice(entry);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&block)?;
        file.sync_all()?;

        debug!(path = %self.path.display(), len = entry.len(), "Appended commit block");
        Ok(())
    }

    /// The last block, or `None` if the log is empty or absent
    pub fn last(&self) -> Result<Option<Vec<u8>>> {
        let Some(mut file) = self.open_existing()? else {
            return Ok(None);
        };
        let size = self.checked_size(&file)?;
        if size == 0 {
            return Ok(None);
        }

        let mut block = vec![0u8; BLOCK_SIZE];
        file.seek(SeekFrom::Start(size - BLOCK_SIZE as u64))?;
        file.read_exact(&mut block)?;
        Ok(Some(block))
    }

    /// Every block, or only the first `n`
    pub fn all(&self, n: Option<usize>) -> Result<Vec<Vec<u8>>> {
        let Some(mut file) = self.open_existing()? else {
            return Ok(Vec::new());
        };
        let blocks = (self.checked_size(&file)? / BLOCK_SIZE as u64) as usize;
        let wanted = match n {
            Some(n) if n > blocks => {
                return Err(RecordKvError::Corrupt(format!(
                    "commit log has {} blocks, {} requested",
                    blocks, n
                )))
            }
            Some(n) => n,
            None => blocks,
        };

        let mut out = Vec::with_capacity(wanted);
        for _ in 0..wanted {
            let mut block = vec![0u8; BLOCK_SIZE];
            file.read_exact(&mut block)?;
            out.push(block);
        }
        Ok(out)
    }

    /// Shrink the log to its first `n` blocks
    pub fn truncate(&self, n: usize) -> Result<()> {
        match OpenOptions::new().write(true).open(&self.path) {
            Ok(file) => {
                file.set_len((n * BLOCK_SIZE) as u64)?;
                file.sync_all()?;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of blocks
    pub fn len(&self) -> Result<usize> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok((self.check(meta.len())? / BLOCK_SIZE as u64) as usize),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn open_existing(&self) -> Result<Option<File>> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn checked_size(&self, file: &File) -> Result<u64> {
        self.check(file.metadata()?.len())
    }

    fn check(&self, size: u64) -> Result<u64> {
        if size % BLOCK_SIZE as u64 != 0 {
            return Err(RecordKvError::Corrupt(format!(
                "commit log size {} is not a multiple of {}",
                size, BLOCK_SIZE
            )));
        }
        Ok(size)
    }
}
