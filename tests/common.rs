#![allow(dead_code)]

use avrojet::{AvroResult, DatumReader, DatumWriter, Schema, Value};
use std::str::FromStr;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Primitive {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl std::fmt::Display for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use Primitive::*;
        let str_repr = match self {
            Null => "null",
            Boolean => "boolean",
            Int => "int",
            Long => "long",
            Float => "float",
            Double => "double",
            Bytes => "bytes",
            String => "string",
        };
        write!(f, "{}", str_repr)
    }
}

pub(crate) fn write_datum(schema: &Schema, value: &Value) -> Vec<u8> {
    let writer = DatumWriter::new(schema).unwrap();
    let mut buf = vec![];
    writer.write(value, &mut buf).unwrap();
    buf
}

pub(crate) fn read_datum(schema: &Schema, bytes: &[u8]) -> AvroResult<Value> {
    let reader = DatumReader::new(schema)?;
    reader.read(&mut &bytes[..])
}

pub(crate) fn read_resolved(
    writer_schema: &Schema,
    reader_schema: &Schema,
    bytes: &[u8],
) -> AvroResult<Value> {
    let reader = DatumReader::with_schemas(writer_schema, reader_schema)?;
    reader.read(&mut &bytes[..])
}

pub(crate) struct MockSchema;

impl MockSchema {
    // creates a primitive schema
    pub fn prim(self, ty: &str) -> Schema {
        let schema_str = format!("{{\"type\": \"{}\"}}", ty);
        Schema::from_str(&schema_str).unwrap()
    }

    pub fn record(self) -> Schema {
        Schema::from_str(
            r#"
        {
            "type": "record",
            "name": "LongList",
            "fields" : [
              {"name": "value", "type": "long"},
              {"name": "next", "type": ["null", "LongList"]}
            ]
        }
        "#,
        )
        .unwrap()
    }

    pub fn record_default(self) -> Schema {
        Schema::from_str(
            r#"
        {
            "type": "record",
            "name": "LongList",
            "fields" : [
              {"name": "value", "type": "long"},
              {"name": "next", "type": ["null", "LongList"]},
              {"name": "other", "type":"long", "default": 1}
            ]
        }
        "#,
        )
        .unwrap()
    }
}
