//! The DatumWriter is the primary interface for serializing values into the
//! avro binary format.

use crate::error::AvroResult;
use crate::fast::{compile_writer, WriteFn};
use crate::schema::Schema;
use crate::value::Value;
use std::io::Write;

/// Serializes values conforming to a schema into a byte sink.
///
/// Construction precompiles the schema into a specialized write routine, so
/// per-value writes perform no schema dispatch. A `DatumWriter` is stateless
/// between calls: it can be shared across threads as long as each call gets
/// exclusive use of its sink.
///
/// ```
/// use avrojet::{DatumWriter, Schema, Value};
/// use std::str::FromStr;
///
/// let schema = Schema::from_str(r##""string""##).unwrap();
/// let writer = DatumWriter::new(&schema).unwrap();
/// let mut buf: Vec<u8> = vec![];
/// writer.write(&Value::from("foo"), &mut buf).unwrap();
/// assert_eq!(buf, &[0x06, b'f', b'o', b'o']);
/// ```
pub struct DatumWriter<'a> {
    schema: &'a Schema,
    write_fn: WriteFn,
}

impl<'a> DatumWriter<'a> {
    /// Creates a writer for the given schema, compiling the schema into its
    /// specialized write routine.
    pub fn new(schema: &'a Schema) -> AvroResult<Self> {
        let write_fn = compile_writer(schema)?;
        Ok(DatumWriter { schema, write_fn })
    }

    /// Returns the writer's schema.
    pub fn schema(&self) -> &Schema {
        self.schema
    }

    /// Serializes one value to the sink. The value is validated against the
    /// schema as it is written; a non-conforming value fails with a
    /// ValueType error and leaves the sink partially written.
    pub fn write<W: Write>(&self, value: &Value, sink: &mut W) -> AvroResult<()> {
        (self.write_fn)(sink, value)
    }

    /// Converts any `Into<Value>` and serializes it to the sink.
    pub fn append<T: Into<Value>, W: Write>(&self, value: T, sink: &mut W) -> AvroResult<()> {
        self.write(&value.into(), sink)
    }
}

#[cfg(test)]
mod tests {
    use super::DatumWriter;
    use crate::error::ErrorKind;
    use crate::{Schema, Value};
    use std::str::FromStr;

    fn written(schema: &str, value: Value) -> Vec<u8> {
        let schema = Schema::from_str(schema).unwrap();
        let writer = DatumWriter::new(&schema).unwrap();
        let mut buf = vec![];
        writer.write(&value, &mut buf).unwrap();
        buf
    }

    #[test]
    fn null_writes_zero_bytes() {
        assert!(written(r##""null""##, Value::Null).is_empty());
    }

    #[test]
    fn booleans_write_one_byte() {
        assert_eq!(written(r##""boolean""##, Value::Boolean(true)), [0x01]);
        assert_eq!(written(r##""boolean""##, Value::Boolean(false)), [0x00]);
    }

    #[test]
    fn int_writes_zig_zag_varint() {
        assert_eq!(written(r##""int""##, Value::Int(150)), [0xac, 0x02]);
        assert_eq!(written(r##""int""##, Value::Int(-1)), [0x01]);
    }

    #[test]
    fn string_writes_length_prefix() {
        assert_eq!(
            written(r##""string""##, Value::from("foo")),
            [0x06, 0x66, 0x6f, 0x6f]
        );
    }

    #[test]
    fn union_tags_branch_index() {
        assert_eq!(
            written(r##"["null", "float"]"##, Value::Float(3.14159)),
            [0x02, 0xd0, 0x0f, 0x49, 0x40]
        );
    }

    #[test]
    fn empty_array_and_map_write_single_terminator() {
        assert_eq!(
            written(r##"{"type": "array", "items": "int"}"##, Value::Array(vec![])),
            [0x00]
        );
        assert_eq!(
            written(
                r##"{"type": "map", "values": "int"}"##,
                Value::Map(Default::default())
            ),
            [0x00]
        );
    }

    #[test]
    fn mismatched_value_fails_with_value_type() {
        let schema = Schema::from_str(r##""int""##).unwrap();
        let writer = DatumWriter::new(&schema).unwrap();
        let mut buf = vec![];
        let err = writer.write(&Value::from("nope"), &mut buf).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueType);
    }
}
