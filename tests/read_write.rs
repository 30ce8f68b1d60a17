mod common;

use avrojet::{DatumReader, DatumWriter, ErrorKind, Record, Schema, Value};
use common::{read_datum, write_datum, MockSchema, Primitive};
use std::collections::HashMap;
use std::str::FromStr;

///////////////////////////////////////////////////////////////////////////////
/// Primitive schema tests
///////////////////////////////////////////////////////////////////////////////

static PRIMITIVES: [Primitive; 8] = [
    Primitive::Null,
    Primitive::Boolean,
    Primitive::Int,
    Primitive::Long,
    Primitive::Float,
    Primitive::Double,
    Primitive::Bytes,
    Primitive::String,
];

#[test]
fn read_write_primitive() {
    for primitive in PRIMITIVES.iter() {
        let name = &format!("{}", primitive);
        let schema = MockSchema.prim(name);
        let value = match primitive {
            Primitive::Null => Value::Null,
            Primitive::Boolean => Value::Boolean(true),
            Primitive::Int => Value::Int(std::i32::MAX),
            Primitive::Long => Value::Long(std::i64::MAX),
            Primitive::Float => Value::Float(std::f32::MAX),
            Primitive::Double => Value::Double(std::f64::MAX),
            Primitive::Bytes => Value::Bytes(vec![b'a', b'v', b'r', b'o']),
            Primitive::String => Value::from("avrojet"),
        };

        let buf = write_datum(&schema, &value);
        let decoded = read_datum(&schema, &buf).unwrap();
        assert_eq!(decoded, value);
    }
}

#[test]
fn int_and_long_round_trip_at_bounds() {
    let schema = MockSchema.prim("int");
    for i in &[std::i32::MAX, std::i32::MIN, 0, -1, 1] {
        let buf = write_datum(&schema, &Value::Int(*i));
        assert_eq!(read_datum(&schema, &buf).unwrap(), Value::Int(*i));
    }

    let schema = MockSchema.prim("long");
    for l in &[std::i64::MAX, std::i64::MIN, 0, -1, 1] {
        let buf = write_datum(&schema, &Value::Long(*l));
        assert_eq!(read_datum(&schema, &buf).unwrap(), Value::Long(*l));
    }
}

#[test]
fn floats_round_trip_bit_exact() {
    let schema = MockSchema.prim("float");
    for f in &[0.0f32, -0.0, 3.14159, std::f32::MIN_POSITIVE, std::f32::MAX] {
        let buf = write_datum(&schema, &Value::Float(*f));
        match read_datum(&schema, &buf).unwrap() {
            Value::Float(decoded) => assert_eq!(decoded.to_bits(), f.to_bits()),
            other => panic!("expected a float, got {:?}", other),
        }
    }
}

#[test]
fn string_with_embedded_nul_round_trips() {
    let schema = MockSchema.prim("string");
    let value = Value::from("before\0after");
    let buf = write_datum(&schema, &value);
    assert_eq!(read_datum(&schema, &buf).unwrap(), value);
}

#[test]
fn out_of_range_int_fails_corrupt_at_read() {
    // a long outside 32-bit range decoded under an int schema
    let long_schema = MockSchema.prim("long");
    let buf = write_datum(&long_schema, &Value::Long(i64::from(std::i32::MAX) + 1));

    let int_schema = MockSchema.prim("int");
    let err = read_datum(&int_schema, &buf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptData);
}

///////////////////////////////////////////////////////////////////////////////
/// Concrete wire scenarios
///////////////////////////////////////////////////////////////////////////////

#[test]
fn known_byte_vectors() {
    assert!(write_datum(&MockSchema.prim("null"), &Value::Null).is_empty());
    assert_eq!(
        write_datum(&MockSchema.prim("boolean"), &Value::Boolean(true)),
        [0x01]
    );
    assert_eq!(
        write_datum(&MockSchema.prim("boolean"), &Value::Boolean(false)),
        [0x00]
    );
    assert_eq!(
        write_datum(&MockSchema.prim("int"), &Value::Int(150)),
        [0xac, 0x02]
    );
    assert_eq!(write_datum(&MockSchema.prim("int"), &Value::Int(-1)), [0x01]);
    assert_eq!(
        write_datum(&MockSchema.prim("string"), &Value::from("foo")),
        [0x06, 0x66, 0x6f, 0x6f]
    );

    let union = Schema::from_str(r##"["null", "float"]"##).unwrap();
    assert_eq!(
        write_datum(&union, &Value::Float(3.14159)),
        [0x02, 0xd0, 0x0f, 0x49, 0x40]
    );
    // an int promotes onto the float branch when no int branch exists
    assert_eq!(
        write_datum(&union, &Value::Int(150)),
        [0x02, 0x00, 0x00, 0x16, 0x43]
    );

    let record = Schema::from_str(
        r##"{"type": "record", "name": "r", "fields": [
            {"name": "a", "type": "int"},
            {"name": "b", "type": "string"}
        ]}"##,
    )
    .unwrap();
    let mut rec = Record::new("r");
    rec.insert("a", 1).unwrap();
    rec.insert("b", "x").unwrap();
    assert_eq!(write_datum(&record, &rec.into()), [0x02, 0x02, 0x78]);
}

///////////////////////////////////////////////////////////////////////////////
/// Complex schema tests
///////////////////////////////////////////////////////////////////////////////

fn long_list(values: &[i64]) -> Value {
    let mut next = Value::Null;
    for v in values.iter().rev() {
        let mut rec = Record::new("LongList");
        rec.insert("value", *v).unwrap();
        rec.insert("next", next).unwrap();
        next = Value::Record(rec);
    }
    next
}

#[test]
fn read_write_self_referential_record() {
    let schema = MockSchema.record();
    let value = long_list(&[1, 2, 3]);
    let buf = write_datum(&schema, &value);
    assert_eq!(read_datum(&schema, &buf).unwrap(), value);
}

#[test]
fn enum_read_write() {
    let schema = Schema::from_str(
        r##"
        {
            "type": "enum",
            "name": "Suit",
            "symbols" : ["SPADES", "HEARTS", "DIAMONDS", "CLUBS"]
        }
        "##,
    )
    .unwrap();

    let value = Value::Enum("HEARTS".to_string());
    let buf = write_datum(&schema, &value);
    // zero-based position in the symbols list, zig-zag encoded
    assert_eq!(buf, [0x02]);
    assert_eq!(read_datum(&schema, &buf).unwrap(), value);
}

#[test]
fn array_read_write() {
    let schema = Schema::from_str(r##"{"type": "array", "items": "string"}"##).unwrap();
    let value = Value::from(vec!["a", "v", "r", "o"]);
    let buf = write_datum(&schema, &value);
    assert_eq!(read_datum(&schema, &buf).unwrap(), value);
}

#[test]
fn empty_array_and_map_are_a_single_zero_byte() {
    let schema = Schema::from_str(r##"{"type": "array", "items": "string"}"##).unwrap();
    assert_eq!(write_datum(&schema, &Value::Array(vec![])), [0x00]);

    let schema = Schema::from_str(r##"{"type": "map", "values": "long"}"##).unwrap();
    assert_eq!(write_datum(&schema, &Value::Map(HashMap::new())), [0x00]);
}

#[test]
fn map_read_write() {
    let schema = Schema::from_str(r##"{"type": "map", "values": "long"}"##).unwrap();
    let mut map = HashMap::new();
    map.insert("foo".to_string(), 1i64);
    map.insert("bar".to_string(), 2);
    let value = Value::from(map);
    let buf = write_datum(&schema, &value);
    assert_eq!(read_datum(&schema, &buf).unwrap(), value);
}

#[test]
fn union_read_write() {
    let schema = Schema::from_str(r##"["null", "string"]"##).unwrap();

    let buf = write_datum(&schema, &Value::Null);
    assert_eq!(read_datum(&schema, &buf).unwrap(), Value::Null);

    let buf = write_datum(&schema, &Value::from("hello"));
    assert_eq!(read_datum(&schema, &buf).unwrap(), Value::from("hello"));
}

#[test]
fn explicitly_tagged_union_value_unwraps() {
    let schema = Schema::from_str(r##"["null", "string"]"##).unwrap();
    let tagged = Value::Union(Box::new(Value::from("hello")));
    let buf = write_datum(&schema, &tagged);
    assert_eq!(read_datum(&schema, &buf).unwrap(), Value::from("hello"));
}

#[test]
fn fixed_read_write() {
    let schema = Schema::from_str(r##"{"type": "fixed", "size": 16, "name": "md5"}"##).unwrap();
    let value = Value::Fixed(b"0123456789abcdef".to_vec());
    let buf = write_datum(&schema, &value);
    // no length prefix on the wire
    assert_eq!(buf.len(), 16);
    assert_eq!(read_datum(&schema, &buf).unwrap(), value);
}

#[test]
fn fixed_wrong_length_fails() {
    let schema = Schema::from_str(r##"{"type": "fixed", "size": 4, "name": "quad"}"##).unwrap();
    let writer = DatumWriter::new(&schema).unwrap();
    let mut buf = vec![];
    let err = writer
        .write(&Value::Fixed(vec![1, 2, 3]), &mut buf)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueType);
}

#[test]
fn record_with_nested_record_round_trips() {
    let schema = Schema::from_str(
        r##"
        {
            "name": "mentor",
            "type": "record",
            "fields": [
                {"name": "name", "type": "string"},
                {"name": "active", "type": "boolean"},
                {
                    "name": "mentee",
                    "type": {
                        "name": "mentee",
                        "type": "record",
                        "fields": [
                            {"name": "id", "type": "int"},
                            {"name": "username", "type": "string"}
                        ]
                    }
                }
            ]
        }
        "##,
    )
    .unwrap();

    let mut mentee = Record::new("mentee");
    mentee.insert("id", 1).unwrap();
    mentee.insert("username", "alice").unwrap();
    let mut mentor = Record::new("mentor");
    mentor.insert("name", "bob").unwrap();
    mentor.insert("active", true).unwrap();
    mentor.insert("mentee", Value::Record(mentee)).unwrap();

    let value = Value::Record(mentor);
    let buf = write_datum(&schema, &value);
    assert_eq!(read_datum(&schema, &buf).unwrap(), value);
}

#[test]
fn write_invalid_union_data_fails() {
    let schema = Schema::from_str(r##"["int", "float"]"##).unwrap();
    let writer = DatumWriter::new(&schema).unwrap();
    let mut buf = vec![];
    let err = writer.write(&Value::from("string"), &mut buf).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueType);
}

#[test]
fn missing_record_field_encodes_as_null_or_fails() {
    // missing field admitted: its schema has a null branch
    let schema = Schema::from_str(
        r##"{"type": "record", "name": "rec", "fields": [
            {"name": "opt", "type": ["null", "string"]}
        ]}"##,
    )
    .unwrap();
    let buf = write_datum(&schema, &Value::Record(Record::new("rec")));
    let decoded = read_datum(&schema, &buf).unwrap();
    assert_eq!(
        decoded.as_record().unwrap().get("opt"),
        Some(&Value::Null)
    );

    // missing field rejected: the schema requires a string
    let schema = Schema::from_str(
        r##"{"type": "record", "name": "rec", "fields": [
            {"name": "req", "type": "string"}
        ]}"##,
    )
    .unwrap();
    let writer = DatumWriter::new(&schema).unwrap();
    let mut buf = vec![];
    let err = writer
        .write(&Value::Record(Record::new("rec")), &mut buf)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValueType);
}

#[test]
fn writer_output_is_deterministic() {
    let schema = MockSchema.record();
    let value = long_list(&[5, 4, 3, 2, 1]);
    assert_eq!(write_datum(&schema, &value), write_datum(&schema, &value));
}

#[test]
fn compiled_codecs_are_shareable_across_threads() {
    let schema = MockSchema.prim("long");
    let writer = DatumWriter::new(&schema).unwrap();
    let reader = DatumReader::new(&schema).unwrap();

    std::thread::scope(|scope| {
        for i in 0..4i64 {
            let writer = &writer;
            let reader = &reader;
            scope.spawn(move || {
                let value = Value::Long(i * 1000);
                let mut buf = vec![];
                writer.write(&value, &mut buf).unwrap();
                assert_eq!(reader.read(&mut buf.as_slice()).unwrap(), value);
            });
        }
    });
}
