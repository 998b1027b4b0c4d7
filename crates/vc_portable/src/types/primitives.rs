use std::borrow::Cow;

use crate::codec::{FieldShape, PrimitiveKind};
use crate::types::FieldType;
use crate::value::{Value, ValueError};

// -----------------------------------------------------------------------------
// Integers

macro_rules! impl_signed {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl FieldType for $ty {
            #[inline]
            fn shape() -> FieldShape {
                FieldShape::Primitive(PrimitiveKind::$kind)
            }

            #[inline]
            fn to_value(&self) -> Value<'_> {
                Value::Int(*self as i128)
            }

            fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
                match value {
                    Value::Int(_) | Value::UInt(_) => value
                        .as_i128()
                        .and_then(|n| <$ty>::try_from(n).ok())
                        .ok_or_else(|| out_of_range(&value, stringify!($ty))),
                    other => Err(ValueError::mismatch(stringify!($ty), &other)),
                }
            }
        }
    )*};
}

macro_rules! impl_unsigned {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl FieldType for $ty {
            #[inline]
            fn shape() -> FieldShape {
                FieldShape::Primitive(PrimitiveKind::$kind)
            }

            #[inline]
            fn to_value(&self) -> Value<'_> {
                Value::UInt(*self as u128)
            }

            fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
                match value {
                    Value::Int(_) | Value::UInt(_) => value
                        .as_u128()
                        .and_then(|n| <$ty>::try_from(n).ok())
                        .ok_or_else(|| out_of_range(&value, stringify!($ty))),
                    other => Err(ValueError::mismatch(stringify!($ty), &other)),
                }
            }
        }
    )*};
}

fn out_of_range(value: &Value<'_>, target: &'static str) -> ValueError {
    let value = match value {
        Value::Int(n) => n.to_string(),
        Value::UInt(n) => n.to_string(),
        other => other.kind_name().to_owned(),
    };
    ValueError::OutOfRange { value, target }
}

impl_signed!(
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    i128 => I128,
    isize => I64,
);

impl_unsigned!(
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    u128 => U128,
    usize => U64,
);

// -----------------------------------------------------------------------------
// Scalars

impl FieldType for bool {
    #[inline]
    fn shape() -> FieldShape {
        FieldShape::Primitive(PrimitiveKind::Bool)
    }

    #[inline]
    fn to_value(&self) -> Value<'_> {
        Value::Bool(*self)
    }

    fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
        match value {
            Value::Bool(v) => Ok(v),
            other => Err(ValueError::mismatch("bool", &other)),
        }
    }
}

impl FieldType for char {
    #[inline]
    fn shape() -> FieldShape {
        FieldShape::Primitive(PrimitiveKind::Char)
    }

    #[inline]
    fn to_value(&self) -> Value<'_> {
        Value::Char(*self)
    }

    fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
        match value {
            Value::Char(v) => Ok(v),
            other => Err(ValueError::mismatch("char", &other)),
        }
    }
}

impl FieldType for f32 {
    #[inline]
    fn shape() -> FieldShape {
        FieldShape::Primitive(PrimitiveKind::F32)
    }

    #[inline]
    fn to_value(&self) -> Value<'_> {
        Value::F32(*self)
    }

    fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
        match value {
            Value::F32(v) => Ok(v),
            other => Err(ValueError::mismatch("f32", &other)),
        }
    }
}

impl FieldType for f64 {
    #[inline]
    fn shape() -> FieldShape {
        FieldShape::Primitive(PrimitiveKind::F64)
    }

    #[inline]
    fn to_value(&self) -> Value<'_> {
        Value::F64(*self)
    }

    fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
        match value {
            Value::F64(v) => Ok(v),
            Value::F32(v) => Ok(v as f64),
            other => Err(ValueError::mismatch("f64", &other)),
        }
    }
}

impl FieldType for String {
    #[inline]
    fn shape() -> FieldShape {
        FieldShape::Primitive(PrimitiveKind::String)
    }

    #[inline]
    fn to_value(&self) -> Value<'_> {
        Value::String(Cow::Borrowed(self))
    }

    fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
        match value {
            Value::String(v) => Ok(v.into_owned()),
            other => Err(ValueError::mismatch("string", &other)),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use crate::types::FieldType;
    use crate::value::{Value, ValueError};

    #[test]
    fn integer_range_checks() {
        assert_eq!(u8::from_value(Value::Int(200)), Ok(200));
        assert_eq!(i16::from_value(Value::UInt(7)), Ok(7));
        assert_eq!(
            u8::from_value(Value::Int(-1)),
            Err(ValueError::OutOfRange {
                value: "-1".into(),
                target: "u8"
            })
        );
        assert!(matches!(
            i32::from_value(Value::Bool(true)),
            Err(ValueError::Mismatch { expected: "i32", .. })
        ));
    }

    #[test]
    fn float_widening() {
        assert_eq!(f64::from_value(Value::F32(1.5)), Ok(1.5));
        assert!(f32::from_value(Value::F64(1.5)).is_err());
    }
}
