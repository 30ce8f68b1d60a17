use super::common::{Field, Name, Order};
use super::Variant;
use crate::error::{io_err, AvroResult, Error};
use crate::schema::common::validate_name;
use crate::value::Value;
use indexmap::IndexMap;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;

// Wraps a { fullname -> schema } lookup table used to resolve named
// references while parsing complex schemas. A record registers itself before
// its fields parse, which is what lets a record reference its own fullname.
#[derive(Debug, Clone)]
pub(crate) struct Registry {
    cxt: HashMap<String, Variant>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            cxt: HashMap::new(),
        }
    }

    pub(crate) fn get<'a>(&'a self, name: &str) -> Option<&'a Variant> {
        self.cxt.get(name)
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.cxt.contains_key(name)
    }

    pub(crate) fn parse_schema(
        &mut self,
        value: &JsonValue,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Variant> {
        match value {
            // Parse a complex schema
            JsonValue::Object(ref schema) => self.parse_object(schema, enclosing_namespace),
            // Parse a primitive schema, could also be a named schema reference
            JsonValue::String(ref schema) => self.parse_primitive(schema, enclosing_namespace),
            // Parse a union schema
            JsonValue::Array(ref schema) => self.parse_union(schema, enclosing_namespace),
            _ => Err(Error::UnknownSchema),
        }
    }

    fn parse_union(
        &mut self,
        schema: &[JsonValue],
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Variant> {
        if schema.is_empty() {
            return Err(Error::EmptyUnion);
        }

        let mut branches: Vec<Variant> = vec![];
        for s in schema {
            let parsed = self.parse_schema(s, enclosing_namespace)?;
            match &parsed {
                Variant::Union { .. } => return Err(Error::NestedUnion),
                other => {
                    let duplicate = branches.iter().any(|b| {
                        match (unnamed_kind(b), unnamed_kind(other)) {
                            // two unnamed branches of the same kind
                            (Some(a), Some(c)) => a == c,
                            // two named branches referring to the same fullname
                            _ => match (b.fullname(), other.fullname()) {
                                (Some(a), Some(c)) => a == c,
                                _ => false,
                            },
                        }
                    });
                    if duplicate {
                        return Err(Error::DuplicateUnionBranch);
                    }
                }
            }
            branches.push(parsed);
        }
        Ok(Variant::Union { variants: branches })
    }

    fn reference_fullname(&self, name: &str, enclosing_namespace: Option<&str>) -> String {
        if name.contains('.') {
            // a dotted reference is already a fullname
            return name.to_string();
        }
        if let Some(namespace) = enclosing_namespace {
            let qualified = format!("{}.{}", namespace, name);
            if self.cxt.contains_key(&qualified) {
                return qualified;
            }
        }
        name.to_string()
    }

    /// Parse a string schema: either a primitive or a reference to a
    /// previously defined named schema.
    fn parse_primitive(
        &mut self,
        schema: &str,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Variant> {
        match schema {
            "null" => Ok(Variant::Null),
            "boolean" => Ok(Variant::Boolean),
            "int" => Ok(Variant::Int),
            "long" => Ok(Variant::Long),
            "double" => Ok(Variant::Double),
            "float" => Ok(Variant::Float),
            "bytes" => Ok(Variant::Bytes),
            "string" => Ok(Variant::Str),
            other if !other.is_empty() => {
                let name = self.reference_fullname(other, enclosing_namespace);
                if self.cxt.contains_key(&name) {
                    Ok(Variant::Named(name))
                } else {
                    Err(Error::UndefinedReference(other.to_string()))
                }
            }
            _ => Err(Error::UnknownType(schema.to_string())),
        }
    }

    fn parse_record_fields(
        &mut self,
        fields: &[JsonValue],
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<IndexMap<String, Field>> {
        let mut fields_parsed = IndexMap::with_capacity(fields.len());
        for field_obj in fields {
            match field_obj {
                JsonValue::Object(o) => {
                    let name = o
                        .get("name")
                        .and_then(|a| a.as_str())
                        .ok_or(Error::InvalidRecordField)?;

                    let ty: &JsonValue = o.get("type").ok_or(Error::InvalidRecordField)?;
                    let ty = self.parse_schema(ty, enclosing_namespace)?;

                    let default = if let Some(v) = o.get("default") {
                        Some(parse_default(v, &ty)?)
                    } else {
                        None
                    };

                    let order = if let Some(order) = o.get("order") {
                        parse_field_order(order)?
                    } else {
                        Order::Ascending
                    };

                    let field = Field::new(name, ty, default, order)?;
                    if fields_parsed.insert(name.to_string(), field).is_some() {
                        return Err(Error::DuplicateField);
                    }
                }
                _ => return Err(Error::InvalidRecordField),
            }
        }

        Ok(fields_parsed)
    }

    fn parse_object(
        &mut self,
        value: &Map<String, JsonValue>,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Variant> {
        match value.get("type") {
            Some(&JsonValue::String(ref s)) if s == "record" => {
                let rec_name = Name::from_json(value, enclosing_namespace)?;
                let fullname = rec_name.fullname();

                if self.cxt.contains_key(&fullname) {
                    return Err(Error::DuplicateSchema(fullname));
                }
                // Insert a named reference so the record's own fields can
                // refer back to it.
                self.cxt
                    .insert(fullname.clone(), Variant::Named(fullname.clone()));

                let fields = if let Some(JsonValue::Array(ref fields_vec)) = value.get("fields") {
                    fields_vec
                } else {
                    return Err(Error::ExpectedFieldsArray);
                };

                let fields = self.parse_record_fields(fields, {
                    if rec_name.namespace().is_some() {
                        // most tightly enclosing namespace, which is this one
                        rec_name.namespace()
                    } else {
                        enclosing_namespace
                    }
                })?;

                let rec = Variant::Record {
                    name: rec_name,
                    fields,
                };

                self.cxt.insert(fullname, rec.clone());

                Ok(rec)
            }
            Some(&JsonValue::String(ref s)) if s == "enum" => {
                let name = Name::from_json(value, enclosing_namespace)?;
                let fullname = name.fullname();
                if self.cxt.contains_key(&fullname) {
                    return Err(Error::DuplicateSchema(fullname));
                }

                let mut symbols: Vec<String> = vec![];
                match value.get("symbols") {
                    Some(JsonValue::Array(sym)) => {
                        for v in sym {
                            let symbol = v.as_str().ok_or(Error::EnumSymbolsMissing)?;
                            validate_name(0, symbol)?;
                            if symbols.iter().any(|s| s == symbol) {
                                return Err(Error::DuplicateEnumSymbol);
                            }
                            symbols.push(symbol.to_string());
                        }
                    }
                    _ => return Err(Error::EnumSymbolsMissing),
                }

                let enum_schema = Variant::Enum { name, symbols };

                self.cxt.insert(fullname, enum_schema.clone());

                Ok(enum_schema)
            }
            Some(&JsonValue::String(ref s)) if s == "array" => {
                let item_missing_err =
                    Error::SchemaParse(io_err("Array schema must have `items` field defined"));
                let items_schema = value.get("items").ok_or(item_missing_err)?;
                let parsed_items = self.parse_schema(items_schema, enclosing_namespace)?;
                Ok(Variant::Array {
                    items: Box::new(parsed_items),
                })
            }
            Some(&JsonValue::String(ref s)) if s == "map" => {
                let values_missing_err =
                    Error::SchemaParse(io_err("Map schema must have `values` field defined"));
                let values_schema = value.get("values").ok_or(values_missing_err)?;
                let parsed_values = self.parse_schema(values_schema, enclosing_namespace)?;
                Ok(Variant::Map {
                    values: Box::new(parsed_values),
                })
            }
            Some(&JsonValue::String(ref s)) if s == "fixed" => {
                let name = Name::from_json(value, enclosing_namespace)?;
                let fullname = name.fullname();
                if self.cxt.contains_key(&fullname) {
                    return Err(Error::DuplicateSchema(fullname));
                }

                let size = value
                    .get("size")
                    .and_then(|s| s.as_u64())
                    .ok_or(Error::InvalidFixedSize)?;

                let fixed_schema = Variant::Fixed {
                    name,
                    size: size as usize,
                };

                self.cxt.insert(fullname, fixed_schema.clone());

                Ok(fixed_schema)
            }
            // an object with a primitive or referential `type` is an
            // annotated schema; everything else in it is ignored
            Some(&JsonValue::String(ref s)) => self.parse_primitive(s, enclosing_namespace),
            _other => Err(Error::SchemaParse(io_err(
                "expecting a required `type` field in schema",
            ))),
        }
    }
}

// Which kinds may not repeat inside a union. Named types repeat as long as
// their fullnames differ, so they report None here.
fn unnamed_kind(variant: &Variant) -> Option<&'static str> {
    match variant {
        Variant::Null => Some("null"),
        Variant::Boolean => Some("boolean"),
        Variant::Int => Some("int"),
        Variant::Long => Some("long"),
        Variant::Float => Some("float"),
        Variant::Double => Some("double"),
        Variant::Bytes => Some("bytes"),
        Variant::Str => Some("string"),
        Variant::Array { .. } => Some("array"),
        Variant::Map { .. } => Some("map"),
        _ => None,
    }
}

// Parses the `order` of a field, defaults to `ascending` order
pub(crate) fn parse_field_order(order: &JsonValue) -> AvroResult<Order> {
    match *order {
        JsonValue::String(ref s) => s.parse(),
        _ => Err(Error::UnknownFieldOrdering),
    }
}

pub(crate) fn parse_default(default_value: &JsonValue, variant: &Variant) -> AvroResult<Value> {
    match (default_value, variant) {
        // a union's default conforms to its first branch
        (d, Variant::Union { variants }) => {
            let first_branch = variants.first().ok_or(Error::FailedDefaultUnion)?;
            parse_default(d, first_branch)
        }
        (JsonValue::Null, Variant::Null) => Ok(Value::Null),
        (JsonValue::Bool(v), Variant::Boolean) => Ok(Value::Boolean(*v)),
        (JsonValue::Number(n), Variant::Int) => Ok(Value::Int(
            n.as_i64().ok_or(Error::DefaultValueParse)? as i32,
        )),
        (JsonValue::Number(n), Variant::Long) => {
            Ok(Value::Long(n.as_i64().ok_or(Error::DefaultValueParse)?))
        }
        (JsonValue::Number(n), Variant::Float) => Ok(Value::Float(
            n.as_f64().ok_or(Error::DefaultValueParse)? as f32,
        )),
        (JsonValue::Number(n), Variant::Double) => {
            Ok(Value::Double(n.as_f64().ok_or(Error::DefaultValueParse)?))
        }
        (JsonValue::String(n), Variant::Bytes) => Ok(Value::Bytes(n.as_bytes().to_vec())),
        (JsonValue::String(n), Variant::Str) => Ok(Value::Str(n.clone())),
        (JsonValue::String(n), Variant::Fixed { .. }) => Ok(Value::Fixed(n.as_bytes().to_vec())),
        (JsonValue::String(n), Variant::Enum { symbols, .. }) => {
            if symbols.contains(n) {
                Ok(Value::Enum(n.clone()))
            } else {
                Err(Error::EnumSymbolNotPresent)
            }
        }
        (JsonValue::Array(arr), Variant::Array { items }) => {
            let mut default_items = Vec::with_capacity(arr.len());
            for v in arr {
                default_items.push(parse_default(v, items)?);
            }
            Ok(Value::Array(default_items))
        }
        (JsonValue::Object(v), Variant::Record { name, fields }) => {
            let mut values = IndexMap::with_capacity(v.len());
            for (k, v) in v {
                let field = fields.get(k).ok_or(Error::DefaultValueParse)?;
                values.insert(k.to_string(), parse_default(v, &field.ty)?);
            }

            Ok(Value::Record(crate::value::Record {
                name: name.fullname(),
                fields: values,
            }))
        }
        (JsonValue::Object(map), Variant::Map { values: value_ty }) => {
            let mut values = std::collections::HashMap::with_capacity(map.len());
            for (k, v) in map {
                values.insert(k.to_string(), parse_default(v, value_ty)?);
            }
            Ok(Value::Map(values))
        }
        (_d, _s) => Err(Error::DefaultValueParse),
    }
}
