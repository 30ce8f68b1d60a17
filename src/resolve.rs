//! Aligns a writer schema with a reader schema into a single traversal plan.
//!
//! The resolved tree is isomorphic to the writer's traversal of the bytes:
//! every node tells the decoder what the writer put on the wire and what the
//! reader wants back. Two synthetic node kinds exist only here: `Skip`
//! consumes writer data the reader has no field for, and `Default` produces
//! reader data the writer never wrote. Resolution is a one-time cost paid at
//! reader construction; its output feeds the codec compiler.

use crate::error::{AvroResult, Error};
use crate::schema::{Registry, Schema, Variant};
use crate::value::Value;
use std::collections::{HashMap, HashSet};

/// The allowed widening conversions between numeric primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Promotion {
    IntToLong,
    IntToFloat,
    IntToDouble,
    LongToFloat,
    LongToDouble,
    FloatToDouble,
}

/// One node of the merged traversal plan.
#[derive(Debug, Clone)]
pub(crate) enum Resolved {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    Str,
    Promote(Promotion),
    Fixed {
        size: usize,
    },
    /// Carries the writer's symbol list: a decoded index selects the writer's
    /// name, which resolution guarantees is present in the reader's set.
    Enum {
        symbols: Vec<String>,
    },
    Array(Box<Resolved>),
    Map(Box<Resolved>),
    /// Indexed by the writer's branch order. `None` marks a branch the
    /// reader cannot resolve; decoding such an index is corrupt data.
    Union(Vec<Option<Resolved>>),
    Record {
        fullname: String,
        actions: Vec<FieldAction>,
    },
    /// Reference to a named type in the plan's names table.
    Named(String),
}

/// A record's field plan, in writer order with reader-only defaulted fields
/// appended at the end.
#[derive(Debug, Clone)]
pub(crate) enum FieldAction {
    Read { name: String, schema: Resolved },
    Skip { schema: Resolved },
    Default { name: String, value: Value },
}

/// The output of resolution: the root plan plus the tables that `Named`
/// references point into. `skip_names` holds writer-side self-resolutions
/// reachable only from `Skip` subtrees.
#[derive(Debug)]
pub(crate) struct ResolvedSchema {
    pub(crate) root: Resolved,
    pub(crate) names: HashMap<String, Resolved>,
    pub(crate) skip_names: HashMap<String, Resolved>,
}

/// Walks writer and reader schemas in lockstep, enforcing Avro's promotion,
/// default-fill and skip rules.
pub(crate) fn resolve(writer: &Schema, reader: &Schema) -> AvroResult<ResolvedSchema> {
    let mut resolver = Resolver {
        w_cxt: &writer.cxt,
        r_cxt: &reader.cxt,
        names: HashMap::new(),
        in_progress: HashSet::new(),
        skip_names: HashMap::new(),
        skip_in_progress: HashSet::new(),
    };
    let root = resolver.resolve_variants(writer.variant(), reader.variant())?;
    Ok(ResolvedSchema {
        root,
        names: resolver.names,
        skip_names: resolver.skip_names,
    })
}

struct Resolver<'a> {
    w_cxt: &'a Registry,
    r_cxt: &'a Registry,
    names: HashMap<String, Resolved>,
    in_progress: HashSet<String>,
    skip_names: HashMap<String, Resolved>,
    skip_in_progress: HashSet<String>,
}

impl<'a> Resolver<'a> {
    fn resolve_variants(&mut self, writer: &Variant, reader: &Variant) -> AvroResult<Resolved> {
        let writer = deref_named(writer, self.w_cxt)?;
        let reader = deref_named(reader, self.r_cxt)?;

        match (writer, reader) {
            (
                Variant::Union {
                    variants: w_branches,
                },
                Variant::Union {
                    variants: r_branches,
                },
            ) => {
                // every writer branch must find a reader alternative
                let mut resolved = Vec::with_capacity(w_branches.len());
                for w_branch in w_branches {
                    let matched = r_branches
                        .iter()
                        .find_map(|r_branch| self.try_resolve(w_branch, r_branch));
                    match matched {
                        Some(r) => resolved.push(Some(r)),
                        None => return Err(Error::UnionBranchMismatch),
                    }
                }
                Ok(Resolved::Union(resolved))
            }
            (
                Variant::Union {
                    variants: w_branches,
                },
                reader,
            ) => {
                // the decoded index selects a writer branch; a branch no
                // reader schema can take is kept as a hole
                let resolved: Vec<Option<Resolved>> = w_branches
                    .iter()
                    .map(|w_branch| self.try_resolve(w_branch, reader))
                    .collect();
                if resolved.iter().all(Option::is_none) {
                    return Err(Error::UnionBranchMismatch);
                }
                Ok(Resolved::Union(resolved))
            }
            (
                writer,
                Variant::Union {
                    variants: r_branches,
                },
            ) => r_branches
                .iter()
                .find_map(|r_branch| self.try_resolve(writer, r_branch))
                .ok_or(Error::WriterNotInReader),
            (
                Variant::Record {
                    name: w_name,
                    fields: w_fields,
                },
                Variant::Record {
                    name: r_name,
                    fields: r_fields,
                },
            ) => {
                let fullname = r_name.fullname();
                if w_name.fullname() != fullname {
                    return Err(Error::RecordNameMismatch);
                }

                if self.in_progress.contains(&fullname) || self.names.contains_key(&fullname) {
                    return Ok(Resolved::Named(fullname));
                }
                self.in_progress.insert(fullname.clone());

                let mut actions = Vec::with_capacity(r_fields.len());
                for (fname, w_field) in w_fields {
                    if let Some(r_field) = r_fields.get(fname) {
                        let schema = self.resolve_variants(&w_field.ty, &r_field.ty)?;
                        actions.push(FieldAction::Read {
                            name: fname.clone(),
                            schema,
                        });
                    } else {
                        let schema = self.skip_plan(&w_field.ty)?;
                        actions.push(FieldAction::Skip { schema });
                    }
                }
                for (fname, r_field) in r_fields {
                    if !w_fields.contains_key(fname) {
                        match &r_field.default {
                            Some(value) => actions.push(FieldAction::Default {
                                name: fname.clone(),
                                value: value.clone(),
                            }),
                            None => return Err(Error::NoDefaultValue(fname.clone())),
                        }
                    }
                }

                self.in_progress.remove(&fullname);
                self.names.insert(
                    fullname.clone(),
                    Resolved::Record {
                        fullname: fullname.clone(),
                        actions,
                    },
                );
                Ok(Resolved::Named(fullname))
            }
            (
                Variant::Enum {
                    name: w_name,
                    symbols: w_symbols,
                },
                Variant::Enum {
                    name: r_name,
                    symbols: r_symbols,
                },
            ) => {
                if w_name.fullname() != r_name.fullname() {
                    return Err(Error::EnumNameMismatch);
                }
                for symbol in w_symbols {
                    if !r_symbols.contains(symbol) {
                        return Err(Error::SymbolNotInReader(symbol.clone()));
                    }
                }
                Ok(Resolved::Enum {
                    symbols: w_symbols.clone(),
                })
            }
            (
                Variant::Fixed {
                    name: w_name,
                    size: w_size,
                },
                Variant::Fixed {
                    name: r_name,
                    size: r_size,
                },
            ) => {
                if w_name.fullname() != r_name.fullname() || w_size != r_size {
                    return Err(Error::FixedMismatch);
                }
                Ok(Resolved::Fixed { size: *r_size })
            }
            (Variant::Array { items: w_items }, Variant::Array { items: r_items }) => Ok(
                Resolved::Array(Box::new(self.resolve_variants(w_items, r_items)?)),
            ),
            (Variant::Map { values: w_values }, Variant::Map { values: r_values }) => Ok(
                Resolved::Map(Box::new(self.resolve_variants(w_values, r_values)?)),
            ),
            (Variant::Null, Variant::Null) => Ok(Resolved::Null),
            (Variant::Boolean, Variant::Boolean) => Ok(Resolved::Boolean),
            (Variant::Int, Variant::Int) => Ok(Resolved::Int),
            (Variant::Long, Variant::Long) => Ok(Resolved::Long),
            (Variant::Float, Variant::Float) => Ok(Resolved::Float),
            (Variant::Double, Variant::Double) => Ok(Resolved::Double),
            (Variant::Bytes, Variant::Bytes) => Ok(Resolved::Bytes),
            (Variant::Str, Variant::Str) => Ok(Resolved::Str),
            (Variant::Int, Variant::Long) => Ok(Resolved::Promote(Promotion::IntToLong)),
            (Variant::Int, Variant::Float) => Ok(Resolved::Promote(Promotion::IntToFloat)),
            (Variant::Int, Variant::Double) => Ok(Resolved::Promote(Promotion::IntToDouble)),
            (Variant::Long, Variant::Float) => Ok(Resolved::Promote(Promotion::LongToFloat)),
            (Variant::Long, Variant::Double) => Ok(Resolved::Promote(Promotion::LongToDouble)),
            (Variant::Float, Variant::Double) => Ok(Resolved::Promote(Promotion::FloatToDouble)),
            (w, r) => Err(Error::Incompatible(format!("{:?}", w), format!("{:?}", r))),
        }
    }

    // Attempt a resolution that is allowed to fail without corrupting the
    // names table: trial branches roll back anything they registered.
    fn try_resolve(&mut self, writer: &Variant, reader: &Variant) -> Option<Resolved> {
        let names_snapshot = self.names.clone();
        let in_progress_snapshot = self.in_progress.clone();
        match self.resolve_variants(writer, reader) {
            Ok(resolved) => Some(resolved),
            Err(_) => {
                self.names = names_snapshot;
                self.in_progress = in_progress_snapshot;
                None
            }
        }
    }

    // Builds the discard plan for a writer subtree the reader has no
    // counterpart for. This is the writer schema resolved against itself,
    // registered in a separate names table so it cannot collide with the
    // read plan of the same fullname.
    fn skip_plan(&mut self, writer: &Variant) -> AvroResult<Resolved> {
        let writer = deref_named(writer, self.w_cxt)?;
        match writer {
            Variant::Null => Ok(Resolved::Null),
            Variant::Boolean => Ok(Resolved::Boolean),
            Variant::Int => Ok(Resolved::Int),
            Variant::Long => Ok(Resolved::Long),
            Variant::Float => Ok(Resolved::Float),
            Variant::Double => Ok(Resolved::Double),
            Variant::Bytes => Ok(Resolved::Bytes),
            Variant::Str => Ok(Resolved::Str),
            Variant::Fixed { size, .. } => Ok(Resolved::Fixed { size: *size }),
            Variant::Enum { symbols, .. } => Ok(Resolved::Enum {
                symbols: symbols.clone(),
            }),
            Variant::Array { items } => Ok(Resolved::Array(Box::new(self.skip_plan(items)?))),
            Variant::Map { values } => Ok(Resolved::Map(Box::new(self.skip_plan(values)?))),
            Variant::Union { variants } => {
                let mut branches = Vec::with_capacity(variants.len());
                for branch in variants {
                    branches.push(Some(self.skip_plan(branch)?));
                }
                Ok(Resolved::Union(branches))
            }
            Variant::Record { name, fields } => {
                let fullname = name.fullname();
                if self.skip_in_progress.contains(&fullname)
                    || self.skip_names.contains_key(&fullname)
                {
                    return Ok(Resolved::Named(fullname));
                }
                self.skip_in_progress.insert(fullname.clone());

                let mut actions = Vec::with_capacity(fields.len());
                for (fname, field) in fields {
                    actions.push(FieldAction::Read {
                        name: fname.clone(),
                        schema: self.skip_plan(&field.ty)?,
                    });
                }

                self.skip_in_progress.remove(&fullname);
                self.skip_names.insert(
                    fullname.clone(),
                    Resolved::Record {
                        fullname: fullname.clone(),
                        actions,
                    },
                );
                Ok(Resolved::Named(fullname))
            }
            Variant::Named(_) => unreachable!("named references are dereferenced above"),
        }
    }
}

fn deref_named<'v>(variant: &'v Variant, cxt: &'v Registry) -> AvroResult<&'v Variant> {
    let mut current = variant;
    while let Variant::Named(name) = current {
        current = cxt.get(name).ok_or(Error::NamedSchemaNotFound)?;
    }
    Ok(current)
}
