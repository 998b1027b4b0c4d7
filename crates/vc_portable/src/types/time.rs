use core::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::codec::{FieldShape, PrimitiveKind};
use crate::types::FieldType;
use crate::value::{Value, ValueError};

macro_rules! impl_time {
    ($($ty:ty => $kind:ident, $variant:ident, $label:literal;)*) => {$(
        impl FieldType for $ty {
            #[inline]
            fn shape() -> FieldShape {
                FieldShape::Primitive(PrimitiveKind::$kind)
            }

            #[inline]
            fn to_value(&self) -> Value<'_> {
                Value::$variant(*self)
            }

            fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(ValueError::mismatch($label, &other)),
                }
            }
        }
    )*};
}

impl_time! {
    NaiveDate => Date, Date, "date";
    NaiveTime => Time, Time, "time";
    NaiveDateTime => DateTime, DateTime, "date-time";
    DateTime<Utc> => Timestamp, Timestamp, "timestamp";
    Duration => Duration, Duration, "duration";
}
