//! Tests for schema definition
//!
//! These tests verify:
//! - Offsets are cumulative in declaration order
//! - Key / value field bookkeeping
//! - Validation of names and sizes
//! - Textual schema parsing
//! - Key-order comparison

use std::cmp::Ordering;
use std::sync::Arc;

use recordkv::schema::SchemaBuilder;
use recordkv::{FieldType, Record, RecordKvError, Schema};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_schema() -> Arc<Schema> {
    Schema::builder()
        .key("a", FieldType::UInt8)
        .key("b", FieldType::UInt16)
        .key("c", FieldType::UInt32)
        .key("d", FieldType::UInt64)
        .val("e", FieldType::Double)
        .val("f", FieldType::FixedHex(16))
        .key("g", FieldType::Timestamp)
        .build()
        .unwrap()
}

// =============================================================================
// Layout Tests
// =============================================================================

#[test]
fn test_record_size() {
    let schema = setup_schema();
    assert_eq!(schema.record_size(), 47);
    assert_eq!(schema.num_fields(), 7);
}

#[test]
fn test_offsets_are_cumulative() {
    let schema = setup_schema();
    let offsets: Vec<usize> = schema.fields().iter().map(|f| f.offset()).collect();
    assert_eq!(offsets, vec![0, 1, 3, 7, 15, 23, 39]);

    let g = schema.field_by_name("g").unwrap();
    assert_eq!(g.range(), 39..47);
}

#[test]
fn test_key_and_value_indices() {
    let schema = setup_schema();
    assert_eq!(schema.key_indices(), &[0, 1, 2, 3, 6]);
    assert_eq!(schema.value_indices(), &[4, 5]);

    let keys: Vec<&str> = schema.key_fields().map(|f| f.name()).collect();
    assert_eq!(keys, vec!["a", "b", "c", "d", "g"]);
}

#[test]
fn test_field_lookup() {
    let schema = setup_schema();
    assert_eq!(schema.field_index("d").unwrap(), 3);
    assert!(matches!(
        schema.field_index("zz"),
        Err(RecordKvError::UnknownField(name)) if name == "zz"
    ));
    assert!(schema.field(7).is_none());
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_duplicate_field_rejected() {
    let result = Schema::builder()
        .key("a", FieldType::UInt8)
        .val("a", FieldType::UInt32)
        .build();
    assert!(matches!(result, Err(RecordKvError::DuplicateField(name)) if name == "a"));
}

#[test]
fn test_empty_schema_rejected() {
    assert!(matches!(
        SchemaBuilder::default().build(),
        Err(RecordKvError::Schema(_))
    ));
}

#[test]
fn test_field_size_bounds() {
    let zero = Schema::builder().val("s", FieldType::FixedString(0)).build();
    assert!(matches!(zero, Err(RecordKvError::FieldSize { .. })));

    let max = Schema::builder().val("s", FieldType::FixedString(255)).build();
    assert_eq!(max.unwrap().record_size(), 255);
}

#[test]
fn test_default_values_applied() {
    let schema = Schema::builder()
        .key_with_default("id", FieldType::UInt32, 7u32)
        .val("n", FieldType::UInt8)
        .build()
        .unwrap();

    let rec = Record::new(&schema);
    assert_eq!(rec.get_u64("id").unwrap(), 7);
    assert_eq!(rec.get_u64("n").unwrap(), 0);
}

#[test]
fn test_default_value_must_encode() {
    let result = Schema::builder()
        .val_with_default("n", FieldType::UInt8, 300u32)
        .build();
    assert!(matches!(result, Err(RecordKvError::Overflow { .. })));
}

// =============================================================================
// Textual Schema Tests
// =============================================================================

#[test]
fn test_parse_spec() {
    let schema =
        Schema::parse_spec("key:uid:uint64, key:ts:timestamp_desc, val:h:hexstr:4, val:s:string:10")
            .unwrap();

    assert_eq!(schema.record_size(), 8 + 8 + 4 + 10);
    assert_eq!(schema.key_indices(), &[0, 1]);
    assert_eq!(
        schema.field_by_name("ts").unwrap().field_type(),
        FieldType::TimestampDesc
    );
    assert_eq!(
        schema.field_by_name("h").unwrap().field_type(),
        FieldType::FixedHex(4)
    );
}

#[test]
fn test_parse_spec_errors() {
    assert!(matches!(
        Schema::parse_spec("key:a:uint128"),
        Err(RecordKvError::UnknownType(_))
    ));
    assert!(matches!(
        Schema::parse_spec("idx:a:uint8"),
        Err(RecordKvError::Schema(_))
    ));
    assert!(matches!(
        Schema::parse_spec("val:h:hexstr"),
        Err(RecordKvError::FieldSize { .. })
    ));
    assert!(matches!(
        Schema::parse_spec("val:s:string:abc"),
        Err(RecordKvError::FieldSize { .. })
    ));
}

#[test]
fn test_schemas_compare_by_content() {
    assert_eq!(*setup_schema(), *setup_schema());

    let other = Schema::parse_spec("key:a:uint8").unwrap();
    assert_ne!(*setup_schema(), *other);
}

// =============================================================================
// Key Comparison Tests
// =============================================================================

#[test]
fn test_compare_keys_ignores_values() {
    let schema = setup_schema();
    let mut x = Record::new(&schema);
    let mut y = Record::new(&schema);

    x.set("d", 5u64).unwrap();
    y.set("d", 5u64).unwrap();
    x.set("e", 1.0).unwrap();
    y.set("e", 2.0).unwrap();

    assert_eq!(schema.compare_keys(x.as_bytes(), y.as_bytes()), Ordering::Equal);
    assert_eq!(x.cmp(&y), Ordering::Less);
}

#[test]
fn test_compare_keys_declaration_order() {
    let schema = setup_schema();
    let mut x = Record::new(&schema);
    let mut y = Record::new(&schema);

    // a decides before d
    x.set("a", 1u8).unwrap();
    y.set("d", 1_000u64).unwrap();

    assert_eq!(x.compare_keys(&y), Ordering::Greater);
}
