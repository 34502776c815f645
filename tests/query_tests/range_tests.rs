//! Tests for query range construction
//!
//! These tests verify:
//! - Unconstrained keys span the full type range, including keys between
//!   constrained ones
//! - Exact and inclusive constraints
//! - Descending timestamps swap their endpoints
//! - Rejection of half-open ranges, unknown fields and value fields
//! - Per-field containment

use std::sync::Arc;

use recordkv::{
    Constraint, Constraints, FieldType, QueryRange, Record, RecordKvError, Schema, Value,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_schema() -> Arc<Schema> {
    Schema::builder()
        .key("a", FieldType::UInt8)
        .key("d", FieldType::UInt64)
        .val("n", FieldType::UInt32)
        .build()
        .unwrap()
}

fn make_record(schema: &Arc<Schema>, a: u8, d: u64) -> Record {
    let mut rec = Record::new(schema);
    rec.set("a", a).unwrap();
    rec.set("d", d).unwrap();
    rec
}

// =============================================================================
// Bounds Tests
// =============================================================================

#[test]
fn test_unconstrained_spans_everything() {
    let schema = setup_schema();
    let range = QueryRange::build(&schema, &Constraints::new()).unwrap();

    assert_eq!(range.from.get_u64("a").unwrap(), 0);
    assert_eq!(range.from.get_u64("d").unwrap(), 0);
    assert_eq!(range.to.get_u64("a").unwrap(), 255);
    assert_eq!(range.to.get_u64("d").unwrap(), u64::MAX);
}

#[test]
fn test_exact_and_between() {
    let schema = setup_schema();
    let constraints = Constraints::new().exact("a", 1u8).between("d", 5u64, 10u64);
    let range = QueryRange::build(&schema, &constraints).unwrap();

    assert_eq!(range.from.get_u64("a").unwrap(), 1);
    assert_eq!(range.to.get_u64("a").unwrap(), 1);
    assert_eq!(range.from.get_u64("d").unwrap(), 5);
    assert_eq!(range.to.get_u64("d").unwrap(), 10);
}

#[test]
fn test_range_conversions() {
    let schema = setup_schema();
    let constraints = Constraints::new().with("d", 5u64..=10);
    let range = QueryRange::build(&schema, &constraints).unwrap();
    assert_eq!(range.to.get_u64("d").unwrap(), 10);

    assert_eq!(
        Constraint::from(3u64),
        Constraint::Exact(Value::UInt(3))
    );
}

#[test]
fn test_descending_timestamp_swaps_endpoints() {
    let schema = Schema::parse_spec("key:t:timestamp_desc").unwrap();
    let constraints = Constraints::new().between("t", Value::timestamp(100), Value::timestamp(200));
    let range = QueryRange::build(&schema, &constraints).unwrap();

    // Later timestamp sorts first, so it becomes the lower bound
    assert_eq!(range.from.get_u64("t").unwrap(), 200);
    assert_eq!(range.to.get_u64("t").unwrap(), 100);
    assert!(range.from <= range.to);

    let mut inside = Record::new(&schema);
    inside.set("t", Value::timestamp(150)).unwrap();
    assert!(range.contains(&inside));
}

// =============================================================================
// Rejection Tests
// =============================================================================

#[test]
fn test_half_open_rejected() {
    let schema = setup_schema();
    let result = QueryRange::build(&schema, &Constraints::new().with("d", 5u64..10));
    assert!(matches!(result, Err(RecordKvError::InvalidRange(f)) if f == "d"));
}

#[test]
fn test_unknown_field_rejected() {
    let schema = setup_schema();
    let result = QueryRange::build(&schema, &Constraints::new().exact("zz", 1u64));
    assert!(matches!(result, Err(RecordKvError::UnknownField(_))));
}

#[test]
fn test_value_field_rejected() {
    let schema = setup_schema();
    let result = QueryRange::build(&schema, &Constraints::new().exact("n", 1u64));
    assert!(matches!(result, Err(RecordKvError::NotKeyField(f)) if f == "n"));
}

#[test]
fn test_constraint_value_must_fit() {
    let schema = setup_schema();
    let result = QueryRange::build(&schema, &Constraints::new().exact("a", 300u64));
    assert!(matches!(result, Err(RecordKvError::Overflow { .. })));
}

// =============================================================================
// Containment Tests
// =============================================================================

#[test]
fn test_contains_checks_every_key() {
    let schema = setup_schema();
    let constraints = Constraints::new().between("a", 1u8, 2u8).between("d", 5u64, 10u64);
    let range = QueryRange::build(&schema, &constraints).unwrap();

    assert!(range.contains(&make_record(&schema, 1, 5)));
    assert!(range.contains(&make_record(&schema, 2, 10)));
    // Lexicographically between the bounds but d is out of its box
    assert!(!range.contains(&make_record(&schema, 1, 20)));
    assert!(!range.contains(&make_record(&schema, 3, 7)));
}

#[test]
fn test_gap_keys_span_full_range() {
    let schema = Schema::builder()
        .key("a", FieldType::UInt8)
        .key("b", FieldType::UInt16)
        .key("c", FieldType::TimestampDesc)
        .key("d", FieldType::UInt64)
        .build()
        .unwrap();
    let constraints = Constraints::new().exact("a", 5u8).between("d", 5u64, 10u64);
    let range = QueryRange::build(&schema, &constraints).unwrap();

    assert_eq!(range.from.get_u64("a").unwrap(), 5);
    assert_eq!(range.to.get_u64("a").unwrap(), 5);
    assert_eq!(range.from.get_u64("d").unwrap(), 5);
    assert_eq!(range.to.get_u64("d").unwrap(), 10);

    // Keys between constrained ones are left at their type bounds
    for name in ["b", "c"] {
        let field = schema.field_by_name(name).unwrap();
        assert!(range.from.as_bytes()[field.range()].iter().all(|&b| b == 0x00));
        assert!(range.to.as_bytes()[field.range()].iter().all(|&b| b == 0xFF));
    }
    assert_eq!(range.from.get_u64("b").unwrap(), 0);
    assert_eq!(range.to.get_u64("b").unwrap(), u16::MAX as u64);

    let mut inside = Record::new(&schema);
    inside.set("a", 5u8).unwrap();
    inside.set("b", 999u16).unwrap();
    inside.set("c", Value::timestamp(123)).unwrap();
    inside.set("d", 7u64).unwrap();
    assert!(range.contains(&inside));

    inside.set("d", 11u64).unwrap();
    assert!(!range.contains(&inside));
}
