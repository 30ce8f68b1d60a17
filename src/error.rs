#![allow(missing_docs)]

use std::io::{Error as IoError, ErrorKind as IoErrorKind};

#[inline(always)]
pub(crate) fn io_err(msg: &str) -> IoError {
    IoError::new(IoErrorKind::Other, msg)
}

pub type AvroResult<T> = Result<T, Error>;

/// The category an [`Error`](enum.Error.html) belongs to.
///
/// Every error raised by this crate falls in exactly one of these buckets,
/// mirroring the phases of the engine: schema parsing, writer/reader schema
/// resolution, value validation during encode, and wire-format violations
/// during decode. `Io` covers failures of the caller's sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The schema text/tree is ill-formed or violates structural rules.
    SchemaParse,
    /// Writer and reader schemas cannot be reconciled. Raised at reader
    /// construction time, never at byte level.
    SchemaResolution,
    /// A value presented for encoding does not conform to the writer schema.
    ValueType,
    /// The byte stream violates the wire format.
    CorruptData,
    /// The caller's sink failed to accept bytes.
    Io,
}

/// Errors returned from avrojet.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // Schema parse errors
    #[error("failed to parse avro schema")]
    SchemaParse(#[source] IoError),
    #[error("expected the avro schema to be one of json string, object or array")]
    UnknownSchema,
    #[error("unknown type `{0}` in schema")]
    UnknownType(String),
    #[error("named schema `{0}` must be defined before use")]
    UndefinedReference(String),
    #[error("unions must have at least one branch")]
    EmptyUnion,
    #[error("unions must not immediately contain other unions")]
    NestedUnion,
    #[error("unions cannot have multiple branches of the same unnamed kind")]
    DuplicateUnionBranch,
    #[error("duplicate definition of named schema `{0}`")]
    DuplicateSchema(String),
    #[error("duplicate field name in record schema")]
    DuplicateField,
    #[error("duplicate symbol in enum schema")]
    DuplicateEnumSymbol,
    #[error("could not parse name from json value")]
    NameParseFailed,
    #[error("name must be [A-Za-z_] and subsequently contain only [A-Za-z0-9_]")]
    InvalidName,
    #[error("namespaces must either be empty or follow the grammar <name>[(<dot><name>)*]")]
    InvalidNamespace,
    #[error("record schema requires a `fields` json array")]
    ExpectedFieldsArray,
    #[error("record field json schema must be an object with `name` and `type`")]
    InvalidRecordField,
    #[error("enum schema must contain a `symbols` json array of strings")]
    EnumSymbolsMissing,
    #[error("fixed schema requires a non-negative integer `size`")]
    InvalidFixedSize,
    #[error("unknown field ordering value")]
    UnknownFieldOrdering,
    #[error("default value for a union must conform to its first branch")]
    FailedDefaultUnion,
    #[error("invalid default value for given schema")]
    DefaultValueParse,
    #[error("parsing canonical form failed")]
    ParsingCanonicalForm,

    // Schema resolution errors
    #[error("reader's record name does not match writer's record name")]
    RecordNameMismatch,
    #[error("reader's enum name does not match writer's enum name")]
    EnumNameMismatch,
    #[error("writer symbol `{0}` not present in reader's enum")]
    SymbolNotInReader(String),
    #[error("fixed schema names or sizes do not match")]
    FixedMismatch,
    #[error("no default value for reader field `{0}` missing from writer's record")]
    NoDefaultValue(String),
    #[error("writer schema not found in reader's union")]
    WriterNotInReader,
    #[error("no branch of writer's union resolves against the reader schema")]
    UnionBranchMismatch,
    #[error("schema resolution failed. writer: {0}, reader: {1}")]
    Incompatible(String, String),

    // Encode errors
    #[error("write failed")]
    EncodeFailed(#[source] IoError),
    #[error("expected {expected}, found {found}")]
    ValueMismatch { expected: String, found: String },
    #[error("mismatch in fixed bytes length: found {found}, expected {expected}")]
    FixedValueLenMismatch { found: usize, expected: usize },
    #[error("enum value symbol not present in the schema's `symbols` list")]
    EnumSymbolNotPresent,
    #[error("no union branch accepts the value")]
    NotFoundInUnion,
    #[error("named schema was not found in the schema registry")]
    NamedSchemaNotFound,

    // Decode errors
    #[error("read failed")]
    DecodeFailed(#[source] IoError),
    #[error("expecting 0x00 or 0x01 as a byte for boolean value, got {0:#04x}")]
    InvalidBoolean(u8),
    #[error("zig-zag varint exceeds 10 bytes")]
    VarintOverflow,
    #[error("decoded int {0} exceeds 32-bit range")]
    IntOutOfRange(i64),
    #[error("negative length prefix {0}")]
    NegativeLength(i64),
    #[error("bytes are not valid utf-8")]
    InvalidUtf8,
    #[error("enum index {idx} is out of range, schema has {count} symbols")]
    InvalidEnumIndex { idx: i64, count: usize },
    #[error("union index {idx} is out of range, schema has {count} branches")]
    InvalidUnionIndex { idx: i64, count: usize },
    #[error("union branch {0} written with a schema the reader cannot resolve")]
    UnresolvableBranch(usize),
}

impl Error {
    /// Returns the contract category of this error.
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            SchemaParse(_) | UnknownSchema | UnknownType(_) | UndefinedReference(_)
            | EmptyUnion | NestedUnion | DuplicateUnionBranch | DuplicateSchema(_)
            | DuplicateField | DuplicateEnumSymbol | NameParseFailed | InvalidName
            | InvalidNamespace | ExpectedFieldsArray | InvalidRecordField
            | EnumSymbolsMissing | InvalidFixedSize | UnknownFieldOrdering
            | FailedDefaultUnion | DefaultValueParse | ParsingCanonicalForm => {
                ErrorKind::SchemaParse
            }
            RecordNameMismatch | EnumNameMismatch | SymbolNotInReader(_) | FixedMismatch
            | NoDefaultValue(_) | WriterNotInReader | UnionBranchMismatch
            | Incompatible(_, _) => ErrorKind::SchemaResolution,
            ValueMismatch { .. } | FixedValueLenMismatch { .. } | EnumSymbolNotPresent
            | NotFoundInUnion | NamedSchemaNotFound => ErrorKind::ValueType,
            DecodeFailed(_) | InvalidBoolean(_) | VarintOverflow | IntOutOfRange(_)
            | NegativeLength(_) | InvalidUtf8 | InvalidEnumIndex { .. }
            | InvalidUnionIndex { .. } | UnresolvableBranch(_) => ErrorKind::CorruptData,
            EncodeFailed(_) => ErrorKind::Io,
        }
    }
}
