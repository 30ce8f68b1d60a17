//! The DatumReader is the primary interface for deserializing avro binary
//! data back into values.

use crate::error::AvroResult;
use crate::fast::{compile_reader, ReadFn};
use crate::resolve::resolve;
use crate::schema::Schema;
use crate::value::Value;
use std::io::Read;

/// Deserializes avro binary data written with a writer schema into values
/// shaped by a reader schema.
///
/// Construction resolves the writer schema against the reader schema (the
/// reader schema defaults to the writer schema) and compiles the resolved
/// plan into a specialized read routine. Schema resolution failures surface
/// here and never at byte level; byte-level violations during `read` fail
/// with CorruptData errors, after which the source position is undefined.
///
/// ```
/// use avrojet::{DatumReader, DatumWriter, Schema, Value};
/// use std::str::FromStr;
///
/// let schema = Schema::from_str(r##""int""##).unwrap();
/// let writer = DatumWriter::new(&schema).unwrap();
/// let mut buf: Vec<u8> = vec![];
/// writer.write(&Value::Int(150), &mut buf).unwrap();
///
/// let reader = DatumReader::new(&schema).unwrap();
/// assert_eq!(reader.read(&mut buf.as_slice()).unwrap(), Value::Int(150));
/// ```
pub struct DatumReader {
    read_fn: ReadFn,
}

impl std::fmt::Debug for DatumReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatumReader").finish()
    }
}

impl DatumReader {
    /// Creates a reader that decodes with the writer's schema as its own.
    pub fn new(writer_schema: &Schema) -> AvroResult<Self> {
        Self::with_schemas(writer_schema, writer_schema)
    }

    /// Creates a reader that decodes bytes produced under `writer_schema`
    /// into values shaped by `reader_schema`. Fails with a SchemaResolution
    /// error when the two cannot be reconciled.
    pub fn with_schemas(writer_schema: &Schema, reader_schema: &Schema) -> AvroResult<Self> {
        let resolved = resolve(writer_schema, reader_schema)?;
        let read_fn = compile_reader(&resolved)?;
        Ok(DatumReader { read_fn })
    }

    /// Decodes one value from the source.
    pub fn read<R: Read>(&self, source: &mut R) -> AvroResult<Value> {
        (self.read_fn)(source)
    }
}
