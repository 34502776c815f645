//! Tests for record encoding and decoding
//!
//! These tests verify:
//! - Typed get/set for every field type
//! - Parsing from text (integers, doubles, hex, timestamps, strings)
//! - Overflow and malformed input rejection
//! - Type min/max, including descending timestamps
//! - Byte order equals value order
//! - 128-bit composite values and value summation

use std::sync::Arc;

use recordkv::record::codec;
use recordkv::{FieldType, Record, RecordKvError, Schema, Value};

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

fn setup_record() -> Record {
    Record::new(&setup_schema())
}

fn assert_overflow(rec: &mut Record, field: &str, text: &str) {
    assert!(
        matches!(
            rec.set_from_str(field, text),
            Err(RecordKvError::Overflow { .. })
        ),
        "expected overflow for {}={}",
        field,
        text
    );
}

// =============================================================================
// Initial State Tests
// =============================================================================

#[test]
fn test_new_record_is_zeroed() {
    let rec = setup_record();
    assert_eq!(rec.get_u64("a").unwrap(), 0);
    assert_eq!(rec.get_u64("d").unwrap(), 0);
    assert_eq!(rec.get_f64("e").unwrap(), 0.0);
    assert_eq!(rec.get("f").unwrap(), Value::hex("00".repeat(16)));
    assert_eq!(rec.get_u64("g").unwrap(), 0);
}

// =============================================================================
// Min / Max Tests
// =============================================================================

#[test]
fn test_min_max_integers() {
    let mut rec = setup_record();
    for (name, max) in [
        ("a", u8::MAX as u64),
        ("b", u16::MAX as u64),
        ("c", u32::MAX as u64),
        ("d", u64::MAX),
        ("g", u64::MAX),
    ] {
        rec.set_min(name).unwrap();
        assert_eq!(rec.get_u64(name).unwrap(), 0);
        rec.set_max(name).unwrap();
        assert_eq!(rec.get_u64(name).unwrap(), max);
    }
}

#[test]
fn test_min_max_hex() {
    let mut rec = setup_record();
    rec.set_min("f").unwrap();
    assert_eq!(rec.get("f").unwrap(), Value::hex("00".repeat(16)));
    rec.set_max("f").unwrap();
    assert_eq!(rec.get("f").unwrap(), Value::hex("FF".repeat(16)));
}

#[test]
fn test_min_max_descending_timestamp() {
    let schema = Schema::parse_spec("key:t:timestamp_desc").unwrap();
    let mut rec = Record::new(&schema);

    rec.set_min("t").unwrap();
    assert_eq!(rec.get_u64("t").unwrap(), u64::MAX);
    rec.set_max("t").unwrap();
    assert_eq!(rec.get_u64("t").unwrap(), 0);
}

#[test]
fn test_min_max_all_keys() {
    let mut rec = setup_record();
    rec.set("e", 3.5).unwrap();
    rec.set_max_keys();

    assert_eq!(rec.get_u64("a").unwrap(), 255);
    assert_eq!(rec.get_u64("g").unwrap(), u64::MAX);
    assert_eq!(rec.get_f64("e").unwrap(), 3.5);

    rec.set_min_keys();
    assert_eq!(rec.get_u64("a").unwrap(), 0);
    assert_eq!(rec.get_u64("d").unwrap(), 0);
}

// =============================================================================
// Parsing Tests
// =============================================================================

#[test]
fn test_parse_integers() {
    let mut rec = setup_record();

    rec.set_from_str("a", "255").unwrap();
    assert_eq!(rec.get_u64("a").unwrap(), 255);
    rec.set_from_str("a", "128").unwrap();
    assert_eq!(rec.get_u64("a").unwrap(), 128);
    assert_overflow(&mut rec, "a", "256");

    rec.set_from_str("b", "65535").unwrap();
    assert_eq!(rec.get_u64("b").unwrap(), 65535);
    assert_overflow(&mut rec, "b", "65536");

    rec.set_from_str("c", "4294967295").unwrap();
    assert_eq!(rec.get_u64("c").unwrap(), u32::MAX as u64);
    assert_overflow(&mut rec, "c", "4294967296");

    rec.set_from_str("d", "18446744073709551615").unwrap();
    assert_eq!(rec.get_u64("d").unwrap(), u64::MAX);
    assert_overflow(&mut rec, "d", "18446744073709551616");
}

#[test]
fn test_parse_malformed_integer() {
    let mut rec = setup_record();
    for text in ["", "12a", "-1", "1.5"] {
        assert!(matches!(
            rec.set_from_str("c", text),
            Err(RecordKvError::InvalidValue { .. })
        ));
    }
}

#[test]
fn test_parse_doubles() {
    let mut rec = setup_record();
    for (text, expected) in [
        ("0", 0.0),
        ("0.0", 0.0),
        ("1.2", 1.2),
        ("1000.0", 1000.0),
        ("-1000.0", -1000.0),
    ] {
        rec.set_from_str("e", text).unwrap();
        assert_eq!(rec.get_f64("e").unwrap(), expected);
    }
    assert!(matches!(
        rec.set_from_str("e", "abc"),
        Err(RecordKvError::InvalidValue { .. })
    ));
}

#[test]
fn test_parse_hex() {
    let mut rec = setup_record();

    rec.set_from_str("f", "0").unwrap();
    assert_eq!(rec.get("f").unwrap(), Value::hex("00".repeat(16)));

    rec.set_from_str("f", &"FF".repeat(16)).unwrap();
    assert_eq!(rec.get("f").unwrap(), Value::hex("FF".repeat(16)));

    rec.set_from_str("f", "AD").unwrap();
    assert_eq!(
        rec.get("f").unwrap(),
        Value::hex(format!("{}AD", "00".repeat(15)))
    );

    // odd length is left-padded; lowercase accepted, output uppercase
    rec.set_from_str("f", "abc").unwrap();
    assert_eq!(
        rec.get("f").unwrap(),
        Value::hex(format!("{}0ABC", "00".repeat(14)))
    );

    assert_overflow(&mut rec, "f", &"0".repeat(33));
    assert!(matches!(
        rec.set_from_str("f", "XY"),
        Err(RecordKvError::InvalidValue { .. })
    ));
}

#[test]
fn test_parse_timestamps() {
    let mut rec = setup_record();
    for (text, expected) in [
        ("0", 0),
        ("0.0", 0),
        ("0.000", 0),
        ("0.1", 100),
        ("0.123", 123),
        ("0.1234", 123),
        ("1999.1234", 1_999_123),
    ] {
        rec.set_from_str("g", text).unwrap();
        assert_eq!(rec.get_u64("g").unwrap(), expected, "parsing {}", text);
    }
}

#[test]
fn test_parse_strings() {
    let schema = Schema::parse_spec("val:s:string:4").unwrap();
    let mut rec = Record::new(&schema);

    rec.set_from_str("s", "ab").unwrap();
    assert_eq!(rec.get("s").unwrap(), Value::bytes(b"ab".to_vec()));
    assert_eq!(&rec.as_bytes()[..], b"ab\0\0");

    rec.set_from_str("s", "abcd").unwrap();
    assert_eq!(rec.get("s").unwrap(), Value::bytes(b"abcd".to_vec()));

    assert_overflow(&mut rec, "s", "abcde");
}

#[test]
fn test_string_trailing_nul_not_preserved() {
    let schema = Schema::parse_spec("val:s:string:4").unwrap();
    let mut rec = Record::new(&schema);

    rec.set("s", Value::bytes(b"a\0b\0".to_vec())).unwrap();
    assert_eq!(&rec.as_bytes()[..], b"a\0b\0");
    // Inner NULs survive, trailing ones read back as padding
    assert_eq!(rec.get("s").unwrap(), Value::bytes(b"a\0b".to_vec()));
}

// =============================================================================
// Typed Set Tests
// =============================================================================

#[test]
fn test_set_type_mismatch() {
    let mut rec = setup_record();
    assert!(matches!(
        rec.set("a", Value::hex("AA")),
        Err(RecordKvError::TypeMismatch { .. })
    ));
    assert!(matches!(
        rec.set("f", 5u64),
        Err(RecordKvError::TypeMismatch { .. })
    ));
    assert!(matches!(
        rec.set("zz", 5u64),
        Err(RecordKvError::UnknownField(_))
    ));
}

#[test]
fn test_set_by_index() {
    let mut rec = setup_record();
    rec.set_at(3, 42u64).unwrap();
    assert_eq!(rec.get_at(3).unwrap(), Value::UInt(42));
    assert!(matches!(rec.set_at(9, 1u64), Err(RecordKvError::UnknownField(_))));
}

#[test]
fn test_reset_restores_defaults() {
    let schema = Schema::builder()
        .key("k", FieldType::UInt32)
        .val_with_default("v", FieldType::UInt32, 9u32)
        .build()
        .unwrap();
    let mut rec = Record::new(&schema);
    rec.set("k", 1u32).unwrap();
    rec.set("v", 2u32).unwrap();

    rec.reset();
    assert_eq!(rec.get_u64("k").unwrap(), 0);
    assert_eq!(rec.get_u64("v").unwrap(), 9);
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_double_byte_order_matches_numeric_order() {
    let schema = Schema::parse_spec("key:x:double").unwrap();
    let values = [-1e9, -2.5, -0.5, 0.0, 0.25, 1.0, 3e12];

    let records: Vec<Record> = values
        .iter()
        .map(|&v| {
            let mut r = Record::new(&schema);
            r.set("x", v).unwrap();
            r
        })
        .collect();

    for pair in records.windows(2) {
        assert!(pair[0] < pair[1], "{:?} < {:?}", pair[0], pair[1]);
    }
    assert_eq!(records[1].get_f64("x").unwrap(), -2.5);
}

#[test]
fn test_descending_timestamp_order() {
    let schema = Schema::parse_spec("key:t:timestamp_desc").unwrap();
    let mut earlier = Record::new(&schema);
    let mut later = Record::new(&schema);
    earlier.set("t", Value::timestamp(1_000)).unwrap();
    later.set("t", Value::timestamp(2_000)).unwrap();

    // Later timestamps sort first
    assert!(later < earlier);
    assert_eq!(earlier.get_u64("t").unwrap(), 1_000);
}

#[test]
fn test_record_clone_is_independent() {
    let mut a = setup_record();
    a.set("d", 1u64).unwrap();
    let mut b = a.clone();
    b.set("d", 2u64).unwrap();

    assert_eq!(a.get_u64("d").unwrap(), 1);
    assert_eq!(b.get_u64("d").unwrap(), 2);
    assert!(a < b);
}

// =============================================================================
// Composite / Arithmetic Tests
// =============================================================================

#[test]
fn test_u128_halves() {
    let schema = Schema::parse_spec("key:hi:uint64,key:lo:uint64,val:n:uint8").unwrap();
    let mut rec = Record::new(&schema);
    let v: u128 = (7u128 << 64) | 0xDEAD_BEEF;

    rec.set_u128("hi", "lo", v).unwrap();
    assert_eq!(rec.get_u64("hi").unwrap(), 7);
    assert_eq!(rec.get_u64("lo").unwrap(), 0xDEAD_BEEF);
    assert_eq!(rec.get_u128("hi", "lo").unwrap(), v);

    assert!(matches!(
        rec.set_u128("hi", "n", 1),
        Err(RecordKvError::TypeMismatch { .. })
    ));
}

#[test]
fn test_add_values() {
    let schema = Schema::parse_spec("key:k:uint32,val:n:uint32,val:x:double,val:h:hexstr:2")
        .unwrap();
    let mut a = Record::new(&schema);
    let mut b = Record::new(&schema);
    a.set("k", 1u32).unwrap();
    b.set("k", 2u32).unwrap();
    a.set("n", 10u32).unwrap();
    b.set("n", 5u32).unwrap();
    a.set("x", 0.5).unwrap();
    b.set("x", 1.25).unwrap();

    a.add_values(&b).unwrap();
    assert_eq!(a.get_u64("k").unwrap(), 1);
    assert_eq!(a.get_u64("n").unwrap(), 15);
    assert_eq!(a.get_f64("x").unwrap(), 1.75);
}

#[test]
fn test_add_field_rejects_non_numeric() {
    let schema = setup_schema();
    let field = schema.field_by_name("f").unwrap();
    let mut a = vec![0u8; schema.record_size()];
    let b = vec![0u8; schema.record_size()];
    assert!(matches!(
        codec::add_field(field, &mut a, &b),
        Err(RecordKvError::InvalidAggregate(_))
    ));
}

#[test]
fn test_maps() {
    let schema = Schema::parse_spec("key:k:uint8,val:v:uint16").unwrap();
    let mut rec = Record::new(&schema);
    rec.set("k", 3u8).unwrap();
    rec.set("v", 300u16).unwrap();

    assert_eq!(
        rec.to_map(),
        vec![
            ("k".to_string(), Value::UInt(3)),
            ("v".to_string(), Value::UInt(300))
        ]
    );
    assert_eq!(rec.keys_to_map(), vec![("k".to_string(), Value::UInt(3))]);
    assert_eq!(rec.values_to_map(), vec![("v".to_string(), Value::UInt(300))]);
}
