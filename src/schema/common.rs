// Types shared across the schema implementation: names, namespaces,
// record fields and field ordering.

use crate::error::{AvroResult, Error};
use crate::schema::Variant;
use crate::value::Value;
use serde_json::Value as JsonValue;
use std::fmt::{self, Display};
use std::str::FromStr;

///////////////////////////////////////////////////////////////////////////////
/// Name implementation for named types: record, fixed, enum
///////////////////////////////////////////////////////////////////////////////

pub(crate) fn validate_name(idx: usize, name: &str) -> AvroResult<()> {
    if name.contains('.')
        || (name.starts_with(|a: char| a.is_ascii_digit()) && idx == 0)
        || name.is_empty()
        || !name.chars().any(|a| a.is_ascii_alphanumeric() || a == '_')
    {
        Err(Error::InvalidName)
    } else {
        Ok(())
    }
}

// Follows the grammar: <empty> | <name>[(<dot><name>)*]
pub(crate) fn validate_namespace(s: &str) -> AvroResult<()> {
    for (i, n) in s.split('.').enumerate() {
        validate_name(i, n).map_err(|_| Error::InvalidNamespace)?;
    }
    Ok(())
}

/// Represents the `fullname` attribute
/// of a named avro type i.e. Record, Fixed and Enum.
#[derive(Debug, Clone, Eq, PartialOrd, Ord)]
pub struct Name {
    pub(crate) name: String,
    pub(crate) namespace: Option<String>,
}

impl Name {
    // Creates a new name with validation. This will extract the namespace if a
    // dot is present in `name`. Any further call to set_namespace is a noop if
    // the name already carried a dot.
    pub(crate) fn new(name: &str) -> AvroResult<Self> {
        let mut namespace = None;
        let name = if name.contains('.') {
            validate_namespace(name)?;
            // strip namespace
            let idx = name.rfind('.').unwrap(); // we check for ., so it's okay
            namespace = Some(name[..idx].to_string());
            let name = &name[idx + 1..];
            validate_name(0, name)?;
            name
        } else {
            validate_name(0, name)?;
            name
        };

        Ok(Self {
            name: name.to_string(),
            namespace,
        })
    }

    pub(crate) fn from_json(
        json: &serde_json::map::Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Self> {
        let mut name = if let Some(JsonValue::String(ref s)) = json.get("name") {
            Name::new(s)
        } else {
            return Err(Error::NameParseFailed);
        }?;

        // A dotted name is a fullname and any namespace attribute is ignored.
        // Otherwise the namespace attribute wins over the enclosing namespace.
        // An explicitly empty namespace is the null namespace.
        if name.namespace.is_none() {
            if let Some(JsonValue::String(s)) = json.get("namespace") {
                if !s.is_empty() {
                    validate_namespace(s)?;
                    name.set_namespace(s)?;
                }
            } else if let Some(a) = enclosing_namespace {
                validate_namespace(a)?;
                name.set_namespace(a)?;
            }
        }

        Ok(name)
    }

    // Receives a mutable json map, parses a Name and removes the namespace
    // key. Used for canonicalization.
    pub(crate) fn from_json_mut(
        json: &mut serde_json::map::Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Self> {
        let mut name = if let Some(JsonValue::String(ref s)) = json.get("name") {
            Name::new(s)
        } else {
            return Err(Error::NameParseFailed);
        }?;

        if name.namespace.is_none() {
            if let Some(JsonValue::String(s)) = json.get("namespace").cloned() {
                if !s.is_empty() {
                    validate_namespace(&s)?;
                    name.set_namespace(&s)?;
                }
                json.remove("namespace");
            } else if let Some(a) = enclosing_namespace {
                validate_namespace(a)?;
                name.set_namespace(a)?;
            }
        }

        Ok(name)
    }

    pub(crate) fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub(crate) fn set_namespace(&mut self, namespace: &str) -> AvroResult<()> {
        // empty string is a null namespace
        if namespace.is_empty() {
            return Ok(());
        }

        validate_namespace(namespace)?;
        // noop when a namespace was already extracted from a dotted name
        if self.namespace.is_none() {
            self.namespace = Some(namespace.to_string());
        }
        Ok(())
    }

    pub(crate) fn fullname(&self) -> String {
        match &self.namespace {
            Some(n) if !n.is_empty() => format!("{}.{}", n, self.name),
            _ => self.name.to_string(),
        }
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref namespace) = self.namespace {
            write!(f, "{}.{}", namespace, self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> AvroResult<Self> {
        Name::new(s)
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.fullname() == other.fullname()
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Ordering for record fields
///////////////////////////////////////////////////////////////////////////////

/// The `order` attribute of a record field. Accepted by the parser but
/// ignored by the codec.
#[derive(Debug, PartialEq, Clone)]
pub enum Order {
    Ascending,
    Descending,
    Ignore,
}

impl FromStr for Order {
    type Err = Error;
    fn from_str(s: &str) -> AvroResult<Self> {
        match s {
            "ascending" => Ok(Order::Ascending),
            "descending" => Ok(Order::Descending),
            "ignore" => Ok(Order::Ignore),
            _ => Err(Error::UnknownFieldOrdering),
        }
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Record field definition.
///////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone)]
pub struct Field {
    pub(crate) name: String,
    pub(crate) ty: Variant,
    pub(crate) default: Option<Value>,
    pub(crate) order: Order,
}

impl std::cmp::PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.ty == other.ty
    }
}

impl Field {
    pub(crate) fn new(
        name: &str,
        ty: Variant,
        default: Option<Value>,
        order: Order,
    ) -> AvroResult<Self> {
        // field names must adhere to the same grammar as type names
        validate_name(0, name)?;
        Ok(Field {
            name: name.to_string(),
            ty,
            default,
            order,
        })
    }
}
