//! Contains routines for parsing and validating an Avro schema.
//! Schemas in avro are written as JSON and can be provided as .avsc files
//! to a DatumWriter or a DatumReader.

pub mod common;
use crate::error::{AvroResult, Error};
pub use common::Order;
mod canonical;
pub mod parser;
pub(crate) use parser::Registry;

use crate::value::Value;
use canonical::normalize_schema;
use canonical::CanonicalSchema;
use common::{Field, Name};
use indexmap::IndexMap;
use serde_json::{self, Value as JsonValue};
use std::fmt::Debug;
use std::fs::OpenOptions;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Variant {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    Str,
    Record {
        name: Name,
        fields: IndexMap<String, Field>,
    },
    Fixed {
        name: Name,
        size: usize,
    },
    Enum {
        name: Name,
        symbols: Vec<String>,
    },
    Map {
        values: Box<Variant>,
    },
    Array {
        items: Box<Variant>,
    },
    Union {
        variants: Vec<Variant>,
    },
    Named(String),
}

/// Represents a parsed avro schema: the canonicalized JSON, the typed
/// variant tree and the registry of named types it defines.
#[derive(Debug)]
pub struct Schema {
    inner: JsonValue,
    // lookup table resolving named schema references
    pub(crate) cxt: Registry,
    // typed and stripped version of the schema used internally
    pub(crate) variant: Variant,
    // canonical form of the schema, used for equality
    pub(crate) canonical: CanonicalSchema,
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl std::str::FromStr for Schema {
    type Err = Error;
    /// Parse an avro schema from a JSON string.
    /// One can use Rust's raw string syntax (r##""##) to pass the schema.
    fn from_str(schema: &str) -> Result<Self, Self::Err> {
        let schema_json =
            serde_json::from_str(schema).map_err(|e| Error::SchemaParse(e.into()))?;
        Schema::parse_imp(schema_json)
    }
}

impl Schema {
    /// Parses an avro schema from a JSON schema in a file.
    /// Alternatively, one can use the [`FromStr`](https://doc.rust-lang.org/std/str/trait.FromStr.html)
    /// impl to create the Schema from a JSON string:
    /// ```
    /// use std::str::FromStr;
    /// use avrojet::Schema;
    ///
    /// let schema = Schema::from_str(r##""null""##).unwrap();
    /// ```
    pub fn from_path<P: AsRef<Path> + Debug>(path: P) -> AvroResult<Self> {
        let schema_file = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(Error::SchemaParse)?;
        let value =
            serde_json::from_reader(schema_file).map_err(|e| Error::SchemaParse(e.into()))?;
        Schema::parse_imp(value)
    }

    /// Parses a schema from an already deserialized `serde_json::Value`.
    pub fn from_json(value: JsonValue) -> AvroResult<Self> {
        Schema::parse_imp(value)
    }

    fn parse_imp(schema_json: JsonValue) -> AvroResult<Self> {
        let mut parser = Registry::new();
        let pcf = CanonicalSchema(normalize_schema(&schema_json)?);
        let variant = parser.parse_schema(&schema_json, None)?;
        Ok(Schema {
            inner: schema_json,
            cxt: parser,
            variant,
            canonical: pcf,
        })
    }

    /// Returns the schema JSON as handed to the parser.
    pub fn json(&self) -> &JsonValue {
        &self.inner
    }

    pub(crate) fn variant(&self) -> &Variant {
        &self.variant
    }

    /// Checks that the given value conforms to this schema. This is the
    /// reference predicate of the engine; the specialized writers fold the
    /// same checks into the write itself.
    #[inline(always)]
    pub fn validate(&self, value: &Value) -> AvroResult<()> {
        self.variant.validate(value, &self.cxt)
    }

    /// Returns the canonical form of this schema.
    /// Example:
    /// ```rust
    /// use avrojet::Schema;
    /// use std::str::FromStr;
    ///
    /// let schema = Schema::from_str(r##"
    ///     {
    ///         "type": "record",
    ///         "name": "LongList",
    ///         "fields" : [
    ///             {"name": "value", "type": "long"},
    ///             {"name": "next", "type": ["null", "LongList"]
    ///         }]
    ///     }
    /// "##).unwrap();
    ///
    /// let canonical = schema.canonical_form();
    /// ```
    pub fn canonical_form(&self) -> &CanonicalSchema {
        &self.canonical
    }
}

impl Variant {
    pub(crate) fn validate(&self, value: &Value, cxt: &Registry) -> AvroResult<()> {
        let variant = self;
        match (value, variant) {
            (Value::Null, Variant::Null)
            | (Value::Boolean(_), Variant::Boolean)
            | (Value::Int(_), Variant::Int)
            // int is promotable to long, float or double
            | (Value::Int(_), Variant::Long)
            | (Value::Int(_), Variant::Float)
            | (Value::Int(_), Variant::Double)
            | (Value::Long(_), Variant::Long)
            // long is promotable to float or double
            | (Value::Long(_), Variant::Float)
            | (Value::Long(_), Variant::Double)
            | (Value::Float(_), Variant::Float)
            // float is promotable to double
            | (Value::Float(_), Variant::Double)
            | (Value::Double(_), Variant::Double)
            // historical permissiveness: booleans validate wherever a
            // numeric type is expected
            | (Value::Boolean(_), Variant::Int)
            | (Value::Boolean(_), Variant::Long)
            | (Value::Boolean(_), Variant::Float)
            | (Value::Boolean(_), Variant::Double)
            | (Value::Str(_), Variant::Str)
            // strings and bytes interchange at validation time
            | (Value::Str(_), Variant::Bytes)
            | (Value::Bytes(_), Variant::Str)
            | (Value::Bytes(_), Variant::Bytes) => {}
            (Value::Fixed(v), Variant::Fixed { size, .. })
            | (Value::Bytes(v), Variant::Fixed { size, .. }) => {
                if v.len() != *size {
                    return Err(Error::FixedValueLenMismatch {
                        found: v.len(),
                        expected: *size,
                    });
                }
            }
            (Value::Record(rec), Variant::Record { fields, .. }) => {
                for (fname, field) in fields {
                    // a field missing from the value is treated as null
                    match rec.fields.get(fname) {
                        Some(fvalue) => field.ty.validate(fvalue, cxt)?,
                        None => field.ty.validate(&Value::Null, cxt)?,
                    }
                }
            }
            (Value::Map(hmap), Variant::Map { values }) => {
                for v in hmap.values() {
                    values.validate(v, cxt)?;
                }
            }
            (Value::Array(items_value), Variant::Array { items }) => {
                for v in items_value {
                    items.validate(v, cxt)?;
                }
            }
            (Value::Enum(sym), Variant::Enum { symbols, .. })
            | (Value::Str(sym), Variant::Enum { symbols, .. }) => {
                if !symbols.contains(sym) {
                    return Err(Error::EnumSymbolNotPresent);
                }
            }
            (v, Variant::Named(name)) => {
                let schema = cxt.get(name).ok_or(Error::NamedSchemaNotFound)?;
                return schema.validate(v, cxt);
            }
            (Value::Union(inner), Variant::Union { .. }) => {
                return variant.validate(inner, cxt);
            }
            (a, Variant::Union { variants }) => {
                for s in variants.iter() {
                    if s.validate(a, cxt).is_ok() {
                        return Ok(());
                    }
                }
                return Err(Error::NotFoundInUnion);
            }
            (v, s) => {
                return Err(Error::ValueMismatch {
                    expected: format!("{:?}", s),
                    found: v.type_name().to_string(),
                })
            }
        }

        Ok(())
    }

    // The fullname of a named type or reference.
    pub(crate) fn fullname(&self) -> Option<String> {
        match self {
            Variant::Record { name, .. }
            | Variant::Fixed { name, .. }
            | Variant::Enum { name, .. } => Some(name.fullname()),
            Variant::Named(name) => Some(name.clone()),
            _ => None,
        }
    }
}
