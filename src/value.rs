//! The in-memory value domain that schemas describe and codecs move.

use crate::error::{AvroResult, Error};
use crate::schema::common::validate_name;
use crate::schema::parser::parse_default;
use crate::schema::Variant;
use crate::Schema;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;

/// Convenient type alias for map initialization.
pub type Map = HashMap<String, Value>;

/// The [Record](https://avro.apache.org/docs/current/spec.html#schema_record) avro type.
/// A labeled collection of fields, kept in insertion order. When a record is
/// decoded, fields appear in the writer's declared order with any
/// reader-defaulted fields after them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub(crate) name: String,
    pub(crate) fields: IndexMap<String, Value>,
}

impl Record {
    /// Creates a new avro record type with the given name.
    pub fn new(name: &str) -> Self {
        Record {
            name: name.to_string(),
            fields: IndexMap::new(),
        }
    }

    /// Adds a field to the record.
    pub fn insert<T: Into<Value>>(&mut self, field_name: &str, value: T) -> AvroResult<()> {
        validate_name(0, field_name)?;
        self.fields.insert(field_name.to_string(), value.into());
        Ok(())
    }

    /// Returns the record's fullname.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field value with the given name, if present.
    pub fn get(&self, field_name: &str) -> Option<&Value> {
        self.fields.get(field_name)
    }

    /// Iterates over the record's (name, value) pairs in order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Creates a record from a [BTreeMap](https://doc.rust-lang.org/std/collections/struct.BTreeMap.html)
    /// by consuming it. The values must implement `Into<Value>`. The `name`
    /// provided must match the name in the record schema being written with.
    pub fn from_btree<K: Into<String> + Ord + Display, V: Into<Value>>(
        name: &str,
        btree: BTreeMap<K, V>,
    ) -> AvroResult<Self> {
        let mut record = Record::new(name);
        for (k, v) in btree {
            record.fields.insert(k.to_string(), v.into());
        }
        Ok(record)
    }

    /// Creates a record from a JSON object (`serde_json` map). A conforming
    /// record schema must be provided; absent keys fall back to the field's
    /// schema default.
    pub fn from_json(
        json: serde_json::Map<String, serde_json::Value>,
        schema: &Schema,
    ) -> AvroResult<Value> {
        if let Variant::Record { name, fields, .. } = schema.variant() {
            let mut values = IndexMap::with_capacity(fields.len());
            'fields: for (fname, field) in fields {
                if let Some(json_value) = json.get(fname) {
                    if let Variant::Union { variants } = &field.ty {
                        for branch in variants {
                            if let Ok(v) = parse_default(json_value, branch) {
                                values.insert(fname.to_string(), v);
                                continue 'fields;
                            }
                        }
                        return Err(Error::FailedDefaultUnion);
                    }
                    let parsed = parse_default(json_value, &field.ty)?;
                    values.insert(fname.to_string(), parsed);
                } else if let Some(default) = &field.default {
                    values.insert(fname.to_string(), default.clone());
                } else {
                    return Err(Error::ValueMismatch {
                        expected: format!("json value for record field `{}`", fname),
                        found: "nothing".to_string(),
                    });
                }
            }

            Ok(Value::Record(Record {
                name: name.fullname(),
                fields: values,
            }))
        } else {
            Err(Error::ValueMismatch {
                expected: "a record schema".to_string(),
                found: format!("{:?}", schema.variant()),
            })
        }
    }
}

/// Represents an Avro value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    /// A null value.
    Null,
    /// A boolean value.
    Boolean(bool),
    /// An i32 integer value.
    Int(i32),
    /// An i64 long value.
    Long(i64),
    /// A f32 float value.
    Float(f32),
    /// A f64 double value.
    Double(f64),
    /// A sequence of u8 bytes.
    Bytes(Vec<u8>),
    /// Rust strings map directly to avro strings.
    Str(String),
    /// A record value.
    Record(Record),
    /// A fixed value: a byte sequence whose length the schema declares.
    Fixed(Vec<u8>),
    /// A map from strings to values.
    Map(Map),
    /// An explicitly tagged union branch. Only meaningful on the encode
    /// side: branch selection happens on the wrapped value, and decoding
    /// always yields the branch value unwrapped.
    Union(Box<Value>),
    /// An enumeration symbol. Unlike Rust enums, enums in avro don't carry
    /// data within their variants.
    Enum(String),
    /// An array of values.
    Array(Vec<Value>),
}

impl Value {
    /// A short description of the value's kind, used in error messages.
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "string",
            Value::Record(_) => "record",
            Value::Fixed(_) => "fixed",
            Value::Map(_) => "map",
            Value::Union(_) => "union",
            Value::Enum(_) => "enum",
            Value::Array(_) => "array",
        }
    }
}

///////////////////////////////////////////////////////////////////////////////
/// From impls for Value
///////////////////////////////////////////////////////////////////////////////

impl From<()> for Value {
    fn from(_v: ()) -> Value {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Value {
        Value::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Value {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Value {
        Value::Long(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Value {
        Value::Long(value as i64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Value {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Value {
        Value::Double(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Value {
        Value::Str(value)
    }
}

impl<'a> From<&'a str> for Value {
    fn from(value: &'a str) -> Value {
        Value::Str(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Value {
        Value::Bytes(value)
    }
}

impl<'a> From<&'a [u8]> for Value {
    fn from(value: &'a [u8]) -> Value {
        Value::Bytes(value.to_vec())
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Value {
        Value::Record(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Value {
        Value::Array(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<HashMap<String, T>> for Value {
    fn from(v: HashMap<String, T>) -> Value {
        let mut map = HashMap::with_capacity(v.len());
        for (k, v) in v.into_iter() {
            map.insert(k, v.into());
        }
        Value::Map(map)
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Value -> Rust value
///////////////////////////////////////////////////////////////////////////////

impl Value {
    fn variant_err(&self, expected: &str) -> Error {
        Error::ValueMismatch {
            expected: expected.to_string(),
            found: self.type_name().to_string(),
        }
    }

    /// Try to retrieve an avro null
    pub fn as_null(&self) -> AvroResult<()> {
        if let Value::Null = self {
            Ok(())
        } else {
            Err(self.variant_err("null"))
        }
    }
    /// Try to retrieve an avro boolean
    pub fn as_boolean(&self) -> AvroResult<bool> {
        if let Value::Boolean(b) = self {
            Ok(*b)
        } else {
            Err(self.variant_err("boolean"))
        }
    }
    /// Try to retrieve an avro int
    pub fn as_int(&self) -> AvroResult<i32> {
        if let Value::Int(v) = self {
            Ok(*v)
        } else {
            Err(self.variant_err("int"))
        }
    }
    /// Try to retrieve an avro long
    pub fn as_long(&self) -> AvroResult<i64> {
        if let Value::Long(v) = self {
            Ok(*v)
        } else {
            Err(self.variant_err("long"))
        }
    }
    /// Try to retrieve an avro float
    pub fn as_float(&self) -> AvroResult<f32> {
        if let Value::Float(v) = self {
            Ok(*v)
        } else {
            Err(self.variant_err("float"))
        }
    }
    /// Try to retrieve an avro double
    pub fn as_double(&self) -> AvroResult<f64> {
        if let Value::Double(v) = self {
            Ok(*v)
        } else {
            Err(self.variant_err("double"))
        }
    }
    /// Try to retrieve an avro bytes
    pub fn as_bytes(&self) -> AvroResult<&[u8]> {
        if let Value::Bytes(v) = self {
            Ok(v)
        } else {
            Err(self.variant_err("bytes"))
        }
    }
    /// Try to retrieve an avro string
    pub fn as_string(&self) -> AvroResult<&str> {
        if let Value::Str(v) = self {
            Ok(v)
        } else {
            Err(self.variant_err("string"))
        }
    }
    /// Try to retrieve an avro record
    pub fn as_record(&self) -> AvroResult<&Record> {
        if let Value::Record(v) = self {
            Ok(v)
        } else {
            Err(self.variant_err("record"))
        }
    }
    /// Try to retrieve the symbol of the enum as a string
    pub fn as_enum(&self) -> AvroResult<&str> {
        if let Value::Enum(v) = self {
            Ok(v)
        } else {
            Err(self.variant_err("enum"))
        }
    }
    /// Try to retrieve an avro array
    pub fn as_array(&self) -> AvroResult<&[Value]> {
        if let Value::Array(v) = self {
            Ok(v)
        } else {
            Err(self.variant_err("array"))
        }
    }
    /// Try to retrieve an avro map
    pub fn as_map(&self) -> AvroResult<&HashMap<String, Value>> {
        if let Value::Map(v) = self {
            Ok(v)
        } else {
            Err(self.variant_err("map"))
        }
    }
    /// Try to retrieve the value within a union
    pub fn as_union(&self) -> AvroResult<&Value> {
        if let Value::Union(v) = self {
            Ok(v)
        } else {
            Err(self.variant_err("union"))
        }
    }
    /// Try to retrieve an avro fixed
    pub fn as_fixed(&self) -> AvroResult<&[u8]> {
        if let Value::Fixed(v) = self {
            Ok(v)
        } else {
            Err(self.variant_err("fixed"))
        }
    }
}
