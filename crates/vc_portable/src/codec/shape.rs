use serde::Serialize;

// -----------------------------------------------------------------------------
// PrimitiveKind

/// Built-in scalar encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PrimitiveKind {
    Bool,
    Char,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    String,
    Bytes,
    BigInt,
    Decimal,
    Date,
    Time,
    DateTime,
    Timestamp,
    Duration,
}

impl PrimitiveKind {
    /// Inclusive bounds of the fixed-width signed kinds.
    pub(crate) const fn signed_bounds(self) -> Option<(i128, i128)> {
        match self {
            Self::I8 => Some((i8::MIN as i128, i8::MAX as i128)),
            Self::I16 => Some((i16::MIN as i128, i16::MAX as i128)),
            Self::I32 => Some((i32::MIN as i128, i32::MAX as i128)),
            Self::I64 => Some((i64::MIN as i128, i64::MAX as i128)),
            Self::I128 => Some((i128::MIN, i128::MAX)),
            _ => None,
        }
    }

    /// Inclusive upper bound of the unsigned kinds.
    pub(crate) const fn unsigned_bound(self) -> Option<u128> {
        match self {
            Self::U8 => Some(u8::MAX as u128),
            Self::U16 => Some(u16::MAX as u128),
            Self::U32 => Some(u32::MAX as u128),
            Self::U64 => Some(u64::MAX as u128),
            Self::U128 => Some(u128::MAX),
            _ => None,
        }
    }

    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Char => "char",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::I128 => "i128",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::U128 => "u128",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::BigInt => "big integer",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "date-time",
            Self::Timestamp => "timestamp",
            Self::Duration => "duration",
        }
    }
}

// -----------------------------------------------------------------------------
// FieldShape

/// The reflected declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldShape {
    Primitive(PrimitiveKind),
    /// Fixed-length array. `[u8; N]` is an opaque fixed-size blob.
    Array { elem: Box<FieldShape>, len: usize },
    /// Ordered collection.
    Sequence(Box<FieldShape>),
    /// Unordered collection.
    Set(Box<FieldShape>),
    Map(Box<FieldShape>, Box<FieldShape>),
    /// Nullable value.
    Optional(Box<FieldShape>),
    /// Any other portable type, written through the object codec.
    Object,
}

impl FieldShape {
    pub(crate) const U8: FieldShape = FieldShape::Primitive(PrimitiveKind::U8);

    /// Element shape of array, sequence and set shapes.
    pub fn element(&self) -> Option<&FieldShape> {
        match self {
            Self::Array { elem, .. } | Self::Sequence(elem) | Self::Set(elem) => Some(elem),
            _ => None,
        }
    }
}
