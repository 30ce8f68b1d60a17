//! avrojet is a fast engine for the [Apache Avro](https://avro.apache.org/docs/current/spec.html)
//! binary serialization format.
//!
//! The engine has three tightly coupled parts: a validated schema model with
//! named-type resolution, a resolver that merges a writer schema with a
//! reader schema into a single traversal plan, and a codec compiler that
//! turns a (resolved) schema into specialized read/write routines with no
//! per-value schema dispatch.
//!
//! ## Using the library
//!
//! Add avrojet to your `Cargo.toml`:
//!```toml
//! [dependencies]
//! avrojet = "0.1"
//!```
//! ## A hello world example of writing and reading avro binary data
//!
//!```rust
//! use avrojet::{DatumReader, DatumWriter, Record, Schema, Value};
//! use std::str::FromStr;
//! use anyhow::Error;
//!
//! fn main() -> Result<(), Error> {
//!     let schema = Schema::from_str(r##"
//!         {
//!             "type": "record",
//!             "name": "greeting",
//!             "fields": [
//!                 {"name": "subject", "type": "string"},
//!                 {"name": "times", "type": "long"}
//!             ]
//!         }
//!     "##)?;
//!
//!     // Writing data: the writer precompiles the schema once and can then
//!     // serialize any number of values.
//!     let writer = DatumWriter::new(&schema)?;
//!     let mut record = Record::new("greeting");
//!     record.insert("subject", "world")?;
//!     record.insert("times", 1i64)?;
//!     let mut buf: Vec<u8> = vec![];
//!     writer.write(&record.into(), &mut buf)?;
//!
//!     // Reading data: the reader resolves writer and reader schemas at
//!     // construction (they default to the same schema) and decodes values.
//!     let reader = DatumReader::new(&schema)?;
//!     let value = reader.read(&mut buf.as_slice())?;
//!     assert_eq!(value.as_record()?.get("subject"), Some(&Value::from("world")));
//!
//!     Ok(())
//! }
//!```

#![deny(missing_docs)]
#![deny(unused_must_use)]
#![recursion_limit = "1024"]

mod binary;
mod error;
mod fast;
mod reader;
mod resolve;
mod schema;
mod value;
mod writer;

pub use binary::BinaryDecoder;
pub use binary::BinaryEncoder;
pub use error::AvroResult;
pub use error::Error;
pub use error::ErrorKind;
pub use reader::DatumReader;
pub use schema::Schema;
pub use value::Map;
pub use value::Record;
pub use value::Value;
pub use writer::DatumWriter;
