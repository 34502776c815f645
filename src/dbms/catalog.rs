//! Schema catalog
//!
//! Persists each partition's schema next to its data so that reopening with
//! a different schema is caught instead of misreading records.
//!
//! ```text
//! schema_<name>:  [bincode(Schema)][crc32 (4B, LE)]
//! ```

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{RecordKvError, Result};
use crate::schema::Schema;

/// Catalog file for partition `name` inside `dir`
pub fn catalog_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("schema_{}", name))
}

/// Read the stored schema, if any
pub fn load(path: &Path) -> Result<Option<Schema>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if bytes.len() < 4 {
        return Err(RecordKvError::Corrupt(format!(
            "schema catalog {} truncated",
            path.display()
        )));
    }

    let (body, trailer) = bytes.split_at(bytes.len() - 4);
    let stored = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]);
    if crc32fast::hash(body) != stored {
        return Err(RecordKvError::Corrupt(format!(
            "schema catalog {} checksum mismatch",
            path.display()
        )));
    }

    let schema: Schema = bincode::deserialize(body)
        .map_err(|e| RecordKvError::Corrupt(format!("schema catalog {}: {}", path.display(), e)))?;
    Ok(Some(schema))
}

/// Write `schema` durably
pub fn store(path: &Path, schema: &Schema) -> Result<()> {
    let mut bytes = bincode::serialize(schema)?;
    let crc = crc32fast::hash(&bytes);
    bytes.extend_from_slice(&crc.to_le_bytes());

    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    file.write_all(&bytes)?;
    file.sync_all()?;
    Ok(())
}

/// Check `schema` against the catalog for partition `name`, recording it if absent
pub fn verify_or_record(dir: &Path, name: &str, schema: &Schema, readonly: bool) -> Result<()> {
    let path = catalog_path(dir, name);
    match load(&path)? {
        Some(stored) if stored == *schema => Ok(()),
        Some(_) => Err(RecordKvError::SchemaMismatch(name.to_string())),
        None if readonly => Ok(()),
        None => {
            store(&path, schema)?;
            info!(partition = name, record_size = schema.record_size(), "Recorded partition schema");
            Ok(())
        }
    }
}
