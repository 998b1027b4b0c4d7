use core::fmt;
use std::borrow::Cow;

use thiserror::Error;
use vc_stream::StreamError;

use crate::value::ValueError;

// -----------------------------------------------------------------------------
// TypeKey

/// The key a failed type lookup was made with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKey {
    Id(i32),
    Name(String),
    Type(&'static str),
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "user type id {id}"),
            Self::Name(name) => write!(f, "type name `{name}`"),
            Self::Type(path) => write!(f, "type `{path}`"),
        }
    }
}

// -----------------------------------------------------------------------------
// SchemaError

/// Failure raised by the scanner, the type serializer or the registry.
///
/// None of these are transient; they describe a mismatch between code and
/// data and are never retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("Unknown {0}")]
    UnknownType(TypeKey),

    #[error("Cannot instantiate `{type_name}`: {reason}")]
    InstantiationFailure {
        type_name: &'static str,
        reason: &'static str,
    },

    #[error("Cannot access field `{field}` of `{type_name}`: {source}")]
    FieldAccessFailure {
        type_name: &'static str,
        field: &'static str,
        source: ValueError,
    },

    #[error("Schema conflict in `{type_name}`: {reason}")]
    SchemaConflict {
        type_name: &'static str,
        reason: String,
    },

    #[error("Field `{field}` of `{type_name}` has no codec for `{value_type}`")]
    UnsupportedFieldType {
        type_name: &'static str,
        field: &'static str,
        value_type: &'static str,
    },

    #[error("Expected a `{expected}`, found a `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Object nesting exceeds {limit} levels")]
    NestingTooDeep { limit: usize },

    #[error("Invalid value: {0}")]
    Value(#[from] ValueError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("In nested `{type_name}`: {source}")]
    Nested {
        type_name: &'static str,
        source: Box<SchemaError>,
    },
}

impl SchemaError {
    /// Attaches field context to a bare value error.
    pub(crate) fn at_field(self, type_name: &'static str, field: &'static str) -> Self {
        match self {
            Self::Value(source) => Self::FieldAccessFailure {
                type_name,
                field,
                source,
            },
            other => other,
        }
    }

    pub(crate) fn conflict(type_name: &'static str, reason: impl Into<String>) -> Self {
        Self::SchemaConflict {
            type_name,
            reason: reason.into(),
        }
    }
}

pub type SchemaResult<T> = Result<T, SchemaError>;

// -----------------------------------------------------------------------------
// CodecError

/// The public operation a [`CodecError`] happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Serialize,
    Deserialize,
    RaiseVersion,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Serialize => "serialize",
            Self::Deserialize => "deserialize",
            Self::RaiseVersion => "raise the version of",
        })
    }
}

/// Error returned by [`PortableCodec`](crate::PortableCodec).
///
/// Carries the type being processed and the underlying [`SchemaError`].
#[derive(Debug, Error)]
#[error("Failed to {operation} `{type_name}`: {source}")]
pub struct CodecError {
    operation: Operation,
    type_name: Cow<'static, str>,
    source: SchemaError,
}

impl CodecError {
    pub(crate) fn new(
        operation: Operation,
        type_name: impl Into<Cow<'static, str>>,
        source: SchemaError,
    ) -> Self {
        Self {
            operation,
            type_name: type_name.into(),
            source,
        }
    }

    #[inline]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The underlying failure.
    #[inline]
    pub fn kind(&self) -> &SchemaError {
        &self.source
    }

    #[inline]
    pub fn into_kind(self) -> SchemaError {
        self.source
    }
}
