use core::fmt;
use core::time::Duration;
use std::borrow::Cow;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;

use crate::portable::Portable;
use crate::types::{BigInt, Decimal};

// -----------------------------------------------------------------------------
// ValueError

/// A [`Value`] could not be coerced into a field's declared type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("{value} is out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    #[error("expected {expected} elements, found {found}")]
    Length { expected: usize, found: usize },

    #[error("object of type `{found}` cannot be stored as `{expected}`")]
    ObjectType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("borrowed object cannot be moved into a field")]
    BorrowedObject,

    #[error("no field at position {0}")]
    NoSuchField(usize),
}

impl ValueError {
    #[inline]
    pub fn mismatch(expected: &'static str, found: &Value<'_>) -> Self {
        Self::Mismatch {
            expected,
            found: found.kind_name(),
        }
    }
}

// -----------------------------------------------------------------------------
// Value

/// Dynamic value exchanged between field accessors and field codecs.
///
/// Values written out borrow from the object; values read back own their data.
pub enum Value<'a> {
    Null,
    Bool(bool),
    Char(char),
    Int(i128),
    UInt(u128),
    F32(f32),
    F64(f64),
    String(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
    BigInt(BigInt),
    Decimal(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
    Duration(Duration),
    List(Vec<Value<'a>>),
    Map(Vec<(Value<'a>, Value<'a>)>),
    Object(ObjectValue<'a>),
}

/// A nested object held by a [`Value`].
pub enum ObjectValue<'a> {
    Borrowed(&'a dyn Portable),
    Owned(Box<dyn Portable>),
}

impl ObjectValue<'_> {
    #[inline]
    pub fn as_portable(&self) -> &dyn Portable {
        match self {
            Self::Borrowed(object) => *object,
            Self::Owned(object) => object.as_ref(),
        }
    }

    /// Takes ownership of the object, failing for borrowed objects.
    #[inline]
    pub fn into_owned(self) -> Result<Box<dyn Portable>, ValueError> {
        match self {
            Self::Borrowed(_) => Err(ValueError::BorrowedObject),
            Self::Owned(object) => Ok(object),
        }
    }
}

impl<'a> Value<'a> {
    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Char(_) => "char",
            Self::Int(_) => "signed integer",
            Self::UInt(_) => "unsigned integer",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::BigInt(_) => "big integer",
            Self::Decimal(_) => "decimal",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) => "date-time",
            Self::Timestamp(_) => "timestamp",
            Self::Duration(_) => "duration",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }

    /// Any integer variant widened to `i128`.
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            Self::Int(v) => Some(v),
            Self::UInt(v) => i128::try_from(v).ok(),
            _ => None,
        }
    }

    /// Any non-negative integer variant widened to `u128`.
    pub fn as_u128(&self) -> Option<u128> {
        match *self {
            Self::UInt(v) => Some(v),
            Self::Int(v) => u128::try_from(v).ok(),
            _ => None,
        }
    }

    /// Converts borrowed data into owned data.
    ///
    /// Borrowed objects cannot be detached and produce an error.
    pub fn into_owned(self) -> Result<Value<'static>, ValueError> {
        Ok(match self {
            Self::Null => Value::Null,
            Self::Bool(v) => Value::Bool(v),
            Self::Char(v) => Value::Char(v),
            Self::Int(v) => Value::Int(v),
            Self::UInt(v) => Value::UInt(v),
            Self::F32(v) => Value::F32(v),
            Self::F64(v) => Value::F64(v),
            Self::String(v) => Value::String(Cow::Owned(v.into_owned())),
            Self::Bytes(v) => Value::Bytes(Cow::Owned(v.into_owned())),
            Self::BigInt(v) => Value::BigInt(v),
            Self::Decimal(v) => Value::Decimal(v),
            Self::Date(v) => Value::Date(v),
            Self::Time(v) => Value::Time(v),
            Self::DateTime(v) => Value::DateTime(v),
            Self::Timestamp(v) => Value::Timestamp(v),
            Self::Duration(v) => Value::Duration(v),
            Self::List(items) => Value::List(
                items
                    .into_iter()
                    .map(Value::into_owned)
                    .collect::<Result<_, _>>()?,
            ),
            Self::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| Ok((k.into_owned()?, v.into_owned()?)))
                    .collect::<Result<_, ValueError>>()?,
            ),
            Self::Object(object) => Value::Object(ObjectValue::Owned(object.into_owned()?)),
        })
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Self::Char(v) => f.debug_tuple("Char").field(v).finish(),
            Self::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Self::UInt(v) => f.debug_tuple("UInt").field(v).finish(),
            Self::F32(v) => f.debug_tuple("F32").field(v).finish(),
            Self::F64(v) => f.debug_tuple("F64").field(v).finish(),
            Self::String(v) => f.debug_tuple("String").field(v).finish(),
            Self::Bytes(v) => f.debug_tuple("Bytes").field(v).finish(),
            Self::BigInt(v) => f.debug_tuple("BigInt").field(v).finish(),
            Self::Decimal(v) => f.debug_tuple("Decimal").field(v).finish(),
            Self::Date(v) => f.debug_tuple("Date").field(v).finish(),
            Self::Time(v) => f.debug_tuple("Time").field(v).finish(),
            Self::DateTime(v) => f.debug_tuple("DateTime").field(v).finish(),
            Self::Timestamp(v) => f.debug_tuple("Timestamp").field(v).finish(),
            Self::Duration(v) => f.debug_tuple("Duration").field(v).finish(),
            Self::List(v) => f.debug_list().entries(v).finish(),
            Self::Map(v) => f.debug_map().entries(v.iter().map(|(k, v)| (k, v))).finish(),
            Self::Object(v) => {
                let info = v.as_portable().portable_info();
                write!(f, "Object({})", info.type_path())
            }
        }
    }
}
