//! Tests for input file opening
//!
//! These tests verify:
//! - Compression is chosen by case-insensitive suffix
//! - Plain, gzip and xz files read back the same lines
//! - Concatenated gzip members are read in full
//! - Compressed input feeds bulk parsing directly

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use recordkv::ingest::{bulk_parse, open_input, BulkParseOptions, Compression, ParseDescriptor};
use recordkv::{Batch, Record, RecordKvError, Schema};
use tempfile::TempDir;
use xz2::write::XzEncoder;

// =============================================================================
// Helper Functions
// =============================================================================

const LINES: &str = "1 10\n2 20\n3 30\n";

fn write_gzip(path: &Path, members: &[&str]) {
    let mut bytes = Vec::new();
    for member in members {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(member.as_bytes()).unwrap();
        bytes.extend(encoder.finish().unwrap());
    }
    fs::write(path, bytes).unwrap();
}

fn write_xz(path: &Path, text: &str) {
    let mut encoder = XzEncoder::new(Vec::new(), 6);
    encoder.write_all(text.as_bytes()).unwrap();
    fs::write(path, encoder.finish().unwrap()).unwrap();
}

fn read_all(path: &Path) -> String {
    let mut text = String::new();
    open_input(path).unwrap().read_to_string(&mut text).unwrap();
    text
}

// =============================================================================
// Suffix Tests
// =============================================================================

#[test]
fn test_compression_from_suffix() {
    let cases = [
        ("access.log", Compression::None),
        ("access.log.gz", Compression::Gzip),
        ("ACCESS.LOG.GZ", Compression::Gzip),
        ("access.log.xz", Compression::Xz),
        ("access.log.Xz", Compression::Xz),
        ("access.gzip", Compression::None),
        ("gz", Compression::None),
    ];
    for (name, expected) in cases {
        assert_eq!(Compression::from_path(Path::new(name)), expected, "{}", name);
    }
}

// =============================================================================
// Reading Tests
// =============================================================================

#[test]
fn test_plain_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("events.log");
    fs::write(&path, LINES).unwrap();

    assert_eq!(read_all(&path), LINES);
}

#[test]
fn test_gzip_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("events.LOG.GZ");
    write_gzip(&path, &[LINES]);

    assert_eq!(read_all(&path), LINES);
}

#[test]
fn test_gzip_concatenated_members() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("events.log.gz");
    write_gzip(&path, &["1 10\n", "2 20\n3 30\n"]);

    assert_eq!(read_all(&path), LINES);
}

#[test]
fn test_xz_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("events.log.xz");
    write_xz(&path, LINES);

    assert_eq!(read_all(&path), LINES);
}

#[test]
fn test_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path: PathBuf = temp_dir.path().join("nope.gz");
    assert!(matches!(open_input(&path), Err(RecordKvError::Io(_))));
}

#[test]
fn test_corrupt_gzip_fails_on_read() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("events.log.gz");
    fs::write(&path, b"not gzip at all").unwrap();

    let mut text = String::new();
    assert!(open_input(&path).unwrap().read_to_string(&mut text).is_err());
}

// =============================================================================
// Bulk Parsing Tests
// =============================================================================

#[test]
fn test_bulk_parse_compressed_input() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("events.log.gz");
    write_gzip(&path, &[LINES]);

    let schema = Schema::parse_spec("key:k:uint32,val:v:uint32").unwrap();
    let descriptor = ParseDescriptor::parse_spec(&schema, "k,v").unwrap();
    let mut rec = Record::new(&schema);
    let mut batch = Batch::fixed(&schema, 8);
    let mut input = open_input(&path).unwrap();

    let outcome = bulk_parse(
        &mut input,
        &mut batch,
        &mut rec,
        &descriptor,
        b' ',
        &BulkParseOptions::default(),
        |_| true,
    )
    .unwrap();

    assert_eq!(outcome.lines_read, 3);
    assert_eq!(batch.len(), 3);
    let values: Vec<u64> = batch
        .records()
        .map(|r| r.get_u64("v").unwrap())
        .collect();
    assert_eq!(values, vec![10, 20, 30]);
}
