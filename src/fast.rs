//! Specializes schemas into straight-line reader and writer routines.
//!
//! The naive path dispatches on the schema for every value it touches. The
//! compiler here walks a schema once and returns closures that already know
//! their shape: a record writer is a fixed sequence of field writers, an enum
//! reader is an index into a captured symbol table, a union writer is a small
//! branch dispatch. After compilation no schema interpretation happens on the
//! hot path.
//!
//! Recursive schemas are handled with forward cells: when a record's own
//! fullname appears inside its fields, the reference compiles to a closure
//! over a cell that is back-patched once the record's field closures exist.
//! The cell can only be observed empty if a recursive codec were invoked
//! during construction, which never happens because records are entered
//! top-down from input bytes.

use crate::binary::{
    decode_bool, decode_bytes, decode_double, decode_fixed, decode_float, decode_int,
    decode_long, decode_string, encode_bool, encode_bytes, encode_double, encode_float,
    encode_int, encode_long, encode_raw_bytes, encode_str, skip_bytes_value, skip_exact,
    skip_varint,
};
use crate::error::{AvroResult, Error};
use crate::resolve::{FieldAction, Promotion, Resolved, ResolvedSchema};
use crate::schema::{Registry, Schema, Variant};
use crate::value::{Record, Value};
use once_cell::sync::OnceCell;
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::sync::Arc;

pub(crate) type WriteFn =
    Arc<dyn Fn(&mut dyn Write, &Value) -> AvroResult<()> + Send + Sync>;
pub(crate) type ReadFn = Arc<dyn Fn(&mut dyn Read) -> AvroResult<Value> + Send + Sync>;
type SkipFn = Arc<dyn Fn(&mut dyn Read) -> AvroResult<()> + Send + Sync>;

fn type_mismatch(expected: &str, found: &Value) -> Error {
    Error::ValueMismatch {
        expected: expected.to_string(),
        found: found.type_name().to_string(),
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Writer compilation
///////////////////////////////////////////////////////////////////////////////

/// Compiles the schema into a writer routine. Validation is folded into the
/// write itself: a value that does not conform fails with a ValueType error
/// at the offending node.
pub(crate) fn compile_writer(schema: &Schema) -> AvroResult<WriteFn> {
    let mut compiler = WriterCompiler {
        cxt: &schema.cxt,
        cells: HashMap::new(),
        building: HashSet::new(),
    };
    compiler.build(schema.variant())
}

struct WriterCompiler<'a> {
    cxt: &'a Registry,
    cells: HashMap<String, Arc<OnceCell<WriteFn>>>,
    building: HashSet<String>,
}

impl<'a> WriterCompiler<'a> {
    fn cell(&mut self, name: &str) -> Arc<OnceCell<WriteFn>> {
        self.cells
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn build(&mut self, variant: &Variant) -> AvroResult<WriteFn> {
        match variant {
            Variant::Named(name) => {
                let cell = self.cell(name);
                if let Some(f) = cell.get() {
                    return Ok(f.clone());
                }
                if self.building.contains(name) {
                    return Ok(Arc::new(move |sink, value| {
                        (cell
                            .get()
                            .expect("recursive writer invoked before construction"))(
                            sink, value,
                        )
                    }));
                }
                let definition = self.cxt.get(name).ok_or(Error::NamedSchemaNotFound)?;
                self.build(definition)
            }
            Variant::Record { name, .. }
            | Variant::Enum { name, .. }
            | Variant::Fixed { name, .. } => {
                let fullname = name.fullname();
                let cell = self.cell(&fullname);
                if let Some(f) = cell.get() {
                    return Ok(f.clone());
                }
                self.building.insert(fullname.clone());
                let built = self.build_body(variant)?;
                self.building.remove(&fullname);
                let _ = cell.set(built.clone());
                Ok(built)
            }
            other => self.build_body(other),
        }
    }

    fn build_body(&mut self, variant: &Variant) -> AvroResult<WriteFn> {
        let f: WriteFn = match variant {
            Variant::Null => Arc::new(|_sink, value| match value {
                Value::Null => Ok(()),
                other => Err(type_mismatch("null", other)),
            }),
            Variant::Boolean => Arc::new(|mut sink, value| match value {
                Value::Boolean(b) => encode_bool(*b, &mut sink),
                other => Err(type_mismatch("boolean", other)),
            }),
            Variant::Int => Arc::new(|mut sink, value| match value {
                Value::Int(i) => encode_int(*i, &mut sink),
                // historical permissiveness: booleans encode as 0/1
                Value::Boolean(b) => encode_int(*b as i32, &mut sink),
                other => Err(type_mismatch("int", other)),
            }),
            Variant::Long => Arc::new(|mut sink, value| match value {
                Value::Long(l) => encode_long(*l, &mut sink),
                Value::Int(i) => encode_long(i64::from(*i), &mut sink),
                Value::Boolean(b) => encode_long(*b as i64, &mut sink),
                other => Err(type_mismatch("long", other)),
            }),
            Variant::Float => Arc::new(|mut sink, value| match value {
                Value::Float(f) => encode_float(*f, &mut sink),
                Value::Int(i) => encode_float(*i as f32, &mut sink),
                Value::Long(l) => encode_float(*l as f32, &mut sink),
                Value::Boolean(b) => encode_float(f32::from(*b as u8), &mut sink),
                other => Err(type_mismatch("float", other)),
            }),
            Variant::Double => Arc::new(|mut sink, value| match value {
                Value::Double(d) => encode_double(*d, &mut sink),
                Value::Float(f) => encode_double(f64::from(*f), &mut sink),
                Value::Int(i) => encode_double(f64::from(*i), &mut sink),
                Value::Long(l) => encode_double(*l as f64, &mut sink),
                Value::Boolean(b) => encode_double(f64::from(*b as u8), &mut sink),
                other => Err(type_mismatch("double", other)),
            }),
            Variant::Bytes => Arc::new(|mut sink, value| match value {
                Value::Bytes(b) => encode_bytes(b, &mut sink),
                // strings encode under a bytes schema unchanged
                Value::Str(s) => encode_bytes(s.as_bytes(), &mut sink),
                other => Err(type_mismatch("bytes", other)),
            }),
            Variant::Str => Arc::new(|mut sink, value| match value {
                Value::Str(s) => encode_str(s, &mut sink),
                Value::Bytes(b) => encode_bytes(b, &mut sink),
                other => Err(type_mismatch("string", other)),
            }),
            Variant::Fixed { size, .. } => {
                let size = *size;
                Arc::new(move |mut sink, value| {
                    let bytes = match value {
                        Value::Fixed(v) | Value::Bytes(v) => v,
                        other => return Err(type_mismatch("fixed", other)),
                    };
                    if bytes.len() != size {
                        return Err(Error::FixedValueLenMismatch {
                            found: bytes.len(),
                            expected: size,
                        });
                    }
                    encode_raw_bytes(bytes, &mut sink)
                })
            }
            Variant::Enum { symbols, .. } => {
                let index: HashMap<String, i32> = symbols
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (s.clone(), i as i32))
                    .collect();
                Arc::new(move |mut sink, value| {
                    let symbol = match value {
                        Value::Enum(s) | Value::Str(s) => s,
                        other => return Err(type_mismatch("enum", other)),
                    };
                    match index.get(symbol) {
                        Some(i) => encode_int(*i, &mut sink),
                        None => Err(Error::EnumSymbolNotPresent),
                    }
                })
            }
            Variant::Array { items } => {
                let item_fn = self.build(items)?;
                Arc::new(move |mut sink, value| match value {
                    Value::Array(values) => {
                        if !values.is_empty() {
                            encode_long(values.len() as i64, &mut sink)?;
                            for v in values {
                                item_fn(&mut *sink, v)?;
                            }
                        }
                        encode_long(0, &mut sink)
                    }
                    other => Err(type_mismatch("array", other)),
                })
            }
            Variant::Map { values } => {
                let value_fn = self.build(values)?;
                Arc::new(move |mut sink, value| match value {
                    Value::Map(map) => {
                        if !map.is_empty() {
                            encode_long(map.len() as i64, &mut sink)?;
                            for (k, v) in map {
                                encode_str(k, &mut sink)?;
                                value_fn(&mut *sink, v)?;
                            }
                        }
                        encode_long(0, &mut sink)
                    }
                    other => Err(type_mismatch("map", other)),
                })
            }
            Variant::Union { variants } => {
                let branch_fns: Vec<WriteFn> = variants
                    .iter()
                    .map(|branch| self.build(branch))
                    .collect::<AvroResult<_>>()?;
                let branches = variants.clone();
                let cxt = self.cxt.clone();
                Arc::new(move |mut sink, value| {
                    // an explicit wrapper tags "this value is for the union"
                    let value = match value {
                        Value::Union(inner) => inner.as_ref(),
                        other => other,
                    };
                    let idx = select_branch(value, &branches, &cxt)?;
                    encode_long(idx as i64, &mut sink)?;
                    branch_fns[idx](sink, value)
                })
            }
            Variant::Record { fields, .. } => {
                let mut field_fns = Vec::with_capacity(fields.len());
                for (fname, field) in fields {
                    field_fns.push((fname.clone(), self.build(&field.ty)?));
                }
                Arc::new(move |sink, value| match value {
                    Value::Record(rec) => {
                        for (fname, field_fn) in &field_fns {
                            // a field absent from the value encodes as null
                            match rec.fields.get(fname) {
                                Some(v) => field_fn(&mut *sink, v)?,
                                None => field_fn(&mut *sink, &Value::Null)?,
                            }
                        }
                        Ok(())
                    }
                    other => Err(type_mismatch("record", other)),
                })
            }
            Variant::Named(_) => unreachable!("named references are compiled in build"),
        };
        Ok(f)
    }
}

/// Picks the union branch a value encodes under: first the branch whose kind
/// matches the value exactly, then the first branch whose validator accepts
/// it. The second pass is what admits promotions such as an int encoding on
/// a float branch when no int branch exists.
fn select_branch(value: &Value, branches: &[Variant], cxt: &Registry) -> AvroResult<usize> {
    for (idx, branch) in branches.iter().enumerate() {
        if kind_matches(value, branch, cxt) {
            return Ok(idx);
        }
    }
    for (idx, branch) in branches.iter().enumerate() {
        if branch.validate(value, cxt).is_ok() {
            return Ok(idx);
        }
    }
    Err(Error::NotFoundInUnion)
}

fn kind_matches(value: &Value, variant: &Variant, cxt: &Registry) -> bool {
    match (value, variant) {
        (Value::Null, Variant::Null)
        | (Value::Boolean(_), Variant::Boolean)
        | (Value::Int(_), Variant::Int)
        | (Value::Long(_), Variant::Long)
        | (Value::Float(_), Variant::Float)
        | (Value::Double(_), Variant::Double)
        | (Value::Bytes(_), Variant::Bytes)
        | (Value::Str(_), Variant::Str)
        | (Value::Array(_), Variant::Array { .. })
        | (Value::Map(_), Variant::Map { .. }) => true,
        (Value::Record(rec), Variant::Record { name, .. }) => {
            rec.name() == name.fullname() || rec.name() == name.name
        }
        (Value::Enum(sym), Variant::Enum { symbols, .. }) => symbols.contains(sym),
        (Value::Fixed(v), Variant::Fixed { size, .. }) => v.len() == *size,
        (v, Variant::Named(n)) => cxt
            .get(n)
            .map(|schema| kind_matches(v, schema, cxt))
            .unwrap_or(false),
        _ => false,
    }
}

///////////////////////////////////////////////////////////////////////////////
/// Reader compilation
///////////////////////////////////////////////////////////////////////////////

enum CompiledAction {
    Field(String, ReadFn),
    Skip(SkipFn),
    Default(String, Value),
}

/// Compiles a resolved traversal plan into a reader routine.
pub(crate) fn compile_reader(resolved: &ResolvedSchema) -> AvroResult<ReadFn> {
    let mut compiler = ReaderCompiler {
        names: &resolved.names,
        skip_names: &resolved.skip_names,
        cells: HashMap::new(),
        building: HashSet::new(),
        skip_cells: HashMap::new(),
        skip_building: HashSet::new(),
    };
    compiler.build(&resolved.root)
}

struct ReaderCompiler<'a> {
    names: &'a HashMap<String, Resolved>,
    skip_names: &'a HashMap<String, Resolved>,
    cells: HashMap<String, Arc<OnceCell<ReadFn>>>,
    building: HashSet<String>,
    skip_cells: HashMap<String, Arc<OnceCell<SkipFn>>>,
    skip_building: HashSet<String>,
}

impl<'a> ReaderCompiler<'a> {
    fn read_cell(&mut self, name: &str) -> Arc<OnceCell<ReadFn>> {
        self.cells
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn skip_cell(&mut self, name: &str) -> Arc<OnceCell<SkipFn>> {
        self.skip_cells
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    fn build(&mut self, node: &Resolved) -> AvroResult<ReadFn> {
        let f: ReadFn = match node {
            Resolved::Null => Arc::new(|_source| Ok(Value::Null)),
            Resolved::Boolean => {
                Arc::new(|mut source| Ok(Value::Boolean(decode_bool(&mut source)?)))
            }
            Resolved::Int => Arc::new(|mut source| Ok(Value::Int(decode_int(&mut source)?))),
            Resolved::Long => Arc::new(|mut source| Ok(Value::Long(decode_long(&mut source)?))),
            Resolved::Float => {
                Arc::new(|mut source| Ok(Value::Float(decode_float(&mut source)?)))
            }
            Resolved::Double => {
                Arc::new(|mut source| Ok(Value::Double(decode_double(&mut source)?)))
            }
            Resolved::Bytes => {
                Arc::new(|mut source| Ok(Value::Bytes(decode_bytes(&mut source)?)))
            }
            Resolved::Str => Arc::new(|mut source| Ok(Value::Str(decode_string(&mut source)?))),
            Resolved::Promote(promotion) => {
                let promotion = *promotion;
                Arc::new(move |mut source| {
                    Ok(match promotion {
                        Promotion::IntToLong => {
                            Value::Long(i64::from(decode_int(&mut source)?))
                        }
                        Promotion::IntToFloat => Value::Float(decode_int(&mut source)? as f32),
                        Promotion::IntToDouble => {
                            Value::Double(f64::from(decode_int(&mut source)?))
                        }
                        Promotion::LongToFloat => Value::Float(decode_long(&mut source)? as f32),
                        Promotion::LongToDouble => {
                            Value::Double(decode_long(&mut source)? as f64)
                        }
                        Promotion::FloatToDouble => {
                            Value::Double(f64::from(decode_float(&mut source)?))
                        }
                    })
                })
            }
            Resolved::Fixed { size } => {
                let size = *size;
                Arc::new(move |mut source| Ok(Value::Fixed(decode_fixed(size, &mut source)?)))
            }
            Resolved::Enum { symbols } => {
                let symbols: Arc<Vec<String>> = Arc::new(symbols.clone());
                Arc::new(move |mut source| {
                    let idx = decode_long(&mut source)?;
                    if idx < 0 || idx as usize >= symbols.len() {
                        return Err(Error::InvalidEnumIndex {
                            idx,
                            count: symbols.len(),
                        });
                    }
                    Ok(Value::Enum(symbols[idx as usize].clone()))
                })
            }
            Resolved::Array(items) => {
                let item_fn = self.build(items)?;
                Arc::new(move |mut source| {
                    let mut out = vec![];
                    loop {
                        let mut count = decode_long(&mut source)?;
                        if count == 0 {
                            break;
                        }
                        if count < 0 {
                            // negative counts carry the block's byte size,
                            // which a reader that wants the items ignores
                            let _block_size = decode_long(&mut source)?;
                            count = count.checked_neg().ok_or(Error::NegativeLength(count))?;
                        }
                        for _ in 0..count {
                            out.push(item_fn(&mut *source)?);
                        }
                    }
                    Ok(Value::Array(out))
                })
            }
            Resolved::Map(values) => {
                let value_fn = self.build(values)?;
                Arc::new(move |mut source| {
                    let mut out = HashMap::new();
                    loop {
                        let mut count = decode_long(&mut source)?;
                        if count == 0 {
                            break;
                        }
                        if count < 0 {
                            let _block_size = decode_long(&mut source)?;
                            count = count.checked_neg().ok_or(Error::NegativeLength(count))?;
                        }
                        for _ in 0..count {
                            let key = decode_string(&mut source)?;
                            out.insert(key, value_fn(&mut *source)?);
                        }
                    }
                    Ok(Value::Map(out))
                })
            }
            Resolved::Union(branches) => {
                let branch_fns: Vec<Option<ReadFn>> = branches
                    .iter()
                    .map(|branch| branch.as_ref().map(|b| self.build(b)).transpose())
                    .collect::<AvroResult<_>>()?;
                Arc::new(move |mut source| {
                    let idx = decode_long(&mut source)?;
                    if idx < 0 || idx as usize >= branch_fns.len() {
                        return Err(Error::InvalidUnionIndex {
                            idx,
                            count: branch_fns.len(),
                        });
                    }
                    match &branch_fns[idx as usize] {
                        Some(f) => f(source),
                        None => Err(Error::UnresolvableBranch(idx as usize)),
                    }
                })
            }
            Resolved::Record { fullname, actions } => {
                let mut compiled = Vec::with_capacity(actions.len());
                for action in actions {
                    compiled.push(match action {
                        FieldAction::Read { name, schema } => {
                            CompiledAction::Field(name.clone(), self.build(schema)?)
                        }
                        FieldAction::Skip { schema } => {
                            CompiledAction::Skip(self.build_skipper(schema)?)
                        }
                        FieldAction::Default { name, value } => {
                            CompiledAction::Default(name.clone(), value.clone())
                        }
                    });
                }
                let fullname = fullname.clone();
                Arc::new(move |source| {
                    let mut fields = indexmap::IndexMap::with_capacity(compiled.len());
                    for action in &compiled {
                        match action {
                            CompiledAction::Field(name, f) => {
                                let value = f(&mut *source)?;
                                fields.insert(name.clone(), value);
                            }
                            CompiledAction::Skip(f) => f(&mut *source)?,
                            CompiledAction::Default(name, value) => {
                                fields.insert(name.clone(), value.clone());
                            }
                        }
                    }
                    Ok(Value::Record(Record {
                        name: fullname.clone(),
                        fields,
                    }))
                })
            }
            Resolved::Named(name) => {
                let cell = self.read_cell(name);
                if let Some(f) = cell.get() {
                    return Ok(f.clone());
                }
                if self.building.contains(name) {
                    return Ok(Arc::new(move |source| {
                        (cell
                            .get()
                            .expect("recursive reader invoked before construction"))(
                            source
                        )
                    }));
                }
                self.building.insert(name.clone());
                let definition = self.names.get(name).ok_or(Error::NamedSchemaNotFound)?;
                let built = self.build(definition)?;
                self.building.remove(name);
                let _ = cell.set(built.clone());
                return Ok(built);
            }
        };
        Ok(f)
    }

    // Builds the discard routine for a writer subtree. Arrays and maps use
    // the block-size shortcut when the writer framed blocks with negative
    // counts; everything else consumes exactly what a reader would.
    fn build_skipper(&mut self, node: &Resolved) -> AvroResult<SkipFn> {
        let f: SkipFn = match node {
            Resolved::Null => Arc::new(|_source| Ok(())),
            Resolved::Boolean => Arc::new(|mut source| skip_exact(&mut source, 1)),
            Resolved::Int | Resolved::Long => Arc::new(|mut source| skip_varint(&mut source)),
            Resolved::Float => Arc::new(|mut source| skip_exact(&mut source, 4)),
            Resolved::Double => Arc::new(|mut source| skip_exact(&mut source, 8)),
            Resolved::Bytes | Resolved::Str => {
                Arc::new(|mut source| skip_bytes_value(&mut source))
            }
            Resolved::Promote(promotion) => {
                // skip what the writer put down, not the promoted form
                let promotion = *promotion;
                Arc::new(move |mut source| match promotion {
                    Promotion::FloatToDouble => skip_exact(&mut source, 4),
                    _ => skip_varint(&mut source),
                })
            }
            Resolved::Fixed { size } => {
                let size = *size as u64;
                Arc::new(move |mut source| skip_exact(&mut source, size))
            }
            Resolved::Enum { .. } => Arc::new(|mut source| skip_varint(&mut source)),
            Resolved::Array(items) => {
                let item_fn = self.build_skipper(items)?;
                Arc::new(move |source| skip_blocks(source, |s| item_fn(s)))
            }
            Resolved::Map(values) => {
                let value_fn = self.build_skipper(values)?;
                Arc::new(move |source| {
                    skip_blocks(source, |mut s| {
                        skip_bytes_value(&mut s)?;
                        value_fn(s)
                    })
                })
            }
            Resolved::Union(branches) => {
                let branch_fns: Vec<Option<SkipFn>> = branches
                    .iter()
                    .map(|branch| branch.as_ref().map(|b| self.build_skipper(b)).transpose())
                    .collect::<AvroResult<_>>()?;
                Arc::new(move |mut source| {
                    let idx = decode_long(&mut source)?;
                    if idx < 0 || idx as usize >= branch_fns.len() {
                        return Err(Error::InvalidUnionIndex {
                            idx,
                            count: branch_fns.len(),
                        });
                    }
                    match &branch_fns[idx as usize] {
                        Some(f) => f(source),
                        None => Err(Error::UnresolvableBranch(idx as usize)),
                    }
                })
            }
            Resolved::Record { actions, .. } => {
                let mut field_fns = Vec::with_capacity(actions.len());
                for action in actions {
                    match action {
                        FieldAction::Read { schema, .. } | FieldAction::Skip { schema } => {
                            field_fns.push(self.build_skipper(schema)?)
                        }
                        FieldAction::Default { .. } => {}
                    }
                }
                Arc::new(move |source| {
                    for f in &field_fns {
                        f(&mut *source)?;
                    }
                    Ok(())
                })
            }
            Resolved::Named(name) => {
                let cell = self.skip_cell(name);
                if let Some(f) = cell.get() {
                    return Ok(f.clone());
                }
                if self.skip_building.contains(name) {
                    return Ok(Arc::new(move |source| {
                        (cell
                            .get()
                            .expect("recursive skipper invoked before construction"))(
                            source
                        )
                    }));
                }
                self.skip_building.insert(name.clone());
                let definition = self
                    .skip_names
                    .get(name)
                    .ok_or(Error::NamedSchemaNotFound)?;
                let built = self.build_skipper(definition)?;
                self.skip_building.remove(name);
                let _ = cell.set(built.clone());
                return Ok(built);
            }
        };
        Ok(f)
    }
}

// Walks array/map block framing, draining whole blocks by their byte size
// when the writer provided one.
fn skip_blocks<F>(mut source: &mut dyn Read, mut skip_item: F) -> AvroResult<()>
where
    F: FnMut(&mut dyn Read) -> AvroResult<()>,
{
    loop {
        let count = decode_long(&mut source)?;
        if count == 0 {
            return Ok(());
        }
        if count < 0 {
            let block_size = decode_long(&mut source)?;
            if block_size < 0 {
                return Err(Error::NegativeLength(block_size));
            }
            skip_exact(&mut source, block_size as u64)?;
        } else {
            for _ in 0..count {
                skip_item(&mut *source)?;
            }
        }
    }
}
