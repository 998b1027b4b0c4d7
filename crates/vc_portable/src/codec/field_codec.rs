use core::time::Duration;
use std::borrow::Cow;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use vc_stream::{ValueReader, ValueWriter};

use crate::codec::PrimitiveKind;
use crate::error::SchemaResult;
use crate::portable::ObjectCodec;
use crate::types::{BigInt, Decimal};
use crate::value::{ObjectValue, Value, ValueError};

// -----------------------------------------------------------------------------
// FieldCodec

/// Stateless strategy reading and writing one field's value.
///
/// Collection and map codecs carry the codecs of their element, key and
/// value types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldCodec {
    Primitive(PrimitiveKind),
    /// `len` elements without a count. `u8` elements are written raw.
    FixedArray { elem: Box<FieldCodec>, len: usize },
    /// Count, then elements.
    Collection(Box<FieldCodec>),
    /// Count, then key/value pairs.
    Map(Box<FieldCodec>, Box<FieldCodec>),
    /// Presence flag, then the value.
    Optional(Box<FieldCodec>),
    /// Re-enters the object codec.
    Delegate,
}

impl FieldCodec {
    pub fn write(
        &self,
        out: &mut ValueWriter,
        value: &Value<'_>,
        objects: &dyn ObjectCodec,
    ) -> SchemaResult<()> {
        match self {
            Self::Primitive(kind) => write_primitive(*kind, out, value)?,
            Self::FixedArray { elem, len } => {
                if **elem == Self::Primitive(PrimitiveKind::U8) {
                    let bytes = byte_string(value)?;
                    check_len(*len, bytes.len())?;
                    out.write_raw(&bytes);
                } else {
                    let items = list(value)?;
                    check_len(*len, items.len())?;
                    for item in items {
                        elem.write(out, item, objects)?;
                    }
                }
            }
            Self::Collection(elem) => {
                let items = list(value)?;
                out.write_var_u64(items.len() as u64);
                for item in items {
                    elem.write(out, item, objects)?;
                }
            }
            Self::Map(key, val) => {
                let Value::Map(entries) = value else {
                    return Err(ValueError::mismatch("map", value).into());
                };
                out.write_var_u64(entries.len() as u64);
                for (k, v) in entries {
                    key.write(out, k, objects)?;
                    val.write(out, v, objects)?;
                }
            }
            Self::Optional(inner) => match value {
                Value::Null => out.write_bool(false),
                other => {
                    out.write_bool(true);
                    inner.write(out, other, objects)?;
                }
            },
            Self::Delegate => match value {
                Value::Object(object) => objects.write_object(out, object.as_portable())?,
                other => return Err(ValueError::mismatch("object", other).into()),
            },
        }
        Ok(())
    }

    pub fn read(
        &self,
        input: &mut ValueReader<'_>,
        objects: &dyn ObjectCodec,
    ) -> SchemaResult<Value<'static>> {
        Ok(match self {
            Self::Primitive(kind) => read_primitive(*kind, input)?,
            Self::FixedArray { elem, len } => {
                if **elem == Self::Primitive(PrimitiveKind::U8) {
                    Value::Bytes(Cow::Owned(input.read_raw(*len)?.to_vec()))
                } else {
                    let mut items = Vec::with_capacity((*len).min(input.remaining()));
                    for _ in 0..*len {
                        items.push(elem.read(input, objects)?);
                    }
                    Value::List(items)
                }
            }
            Self::Collection(elem) => {
                let count = read_count(input)?;
                let mut items = Vec::with_capacity(count.min(input.remaining()));
                for _ in 0..count {
                    items.push(elem.read(input, objects)?);
                }
                Value::List(items)
            }
            Self::Map(key, val) => {
                let count = read_count(input)?;
                let mut entries = Vec::with_capacity(count.min(input.remaining()));
                for _ in 0..count {
                    let k = key.read(input, objects)?;
                    let v = val.read(input, objects)?;
                    entries.push((k, v));
                }
                Value::Map(entries)
            }
            Self::Optional(inner) => {
                if input.read_bool()? {
                    inner.read(input, objects)?
                } else {
                    Value::Null
                }
            }
            Self::Delegate => Value::Object(ObjectValue::Owned(objects.read_object(input)?)),
        })
    }
}

// -----------------------------------------------------------------------------
// Helpers

fn read_count(input: &mut ValueReader<'_>) -> SchemaResult<usize> {
    let count = input.read_var_u64()?;
    usize::try_from(count).map_err(|_| vc_stream::StreamError::LengthOverflow(count).into())
}

#[inline]
fn check_len(expected: usize, found: usize) -> Result<(), ValueError> {
    if expected == found {
        Ok(())
    } else {
        Err(ValueError::Length { expected, found })
    }
}

fn list<'v, 'a>(value: &'v Value<'a>) -> Result<&'v [Value<'a>], ValueError> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(ValueError::mismatch("list", other)),
    }
}

/// Byte strings, or lists of `u8` values.
fn byte_string<'v>(value: &'v Value<'_>) -> Result<Cow<'v, [u8]>, ValueError> {
    match value {
        Value::Bytes(bytes) => Ok(Cow::Borrowed(&**bytes)),
        Value::List(items) => items
            .iter()
            .map(|item| match item.as_u128().map(u8::try_from) {
                Some(Ok(b)) => Ok(b),
                _ => Err(ValueError::mismatch("u8", item)),
            })
            .collect::<Result<Vec<u8>, _>>()
            .map(Cow::Owned),
        other => Err(ValueError::mismatch("bytes", other)),
    }
}

fn out_of_range(value: impl ToString, target: &'static str) -> ValueError {
    ValueError::OutOfRange {
        value: value.to_string(),
        target,
    }
}

fn signed(kind: PrimitiveKind, (min, max): (i128, i128), value: &Value<'_>) -> Result<i128, ValueError> {
    match value {
        Value::Int(_) | Value::UInt(_) => match value.as_i128() {
            Some(n) if (min..=max).contains(&n) => Ok(n),
            _ => Err(out_of_range(format!("{value:?}"), kind.name())),
        },
        other => Err(ValueError::mismatch(kind.name(), other)),
    }
}

fn unsigned(kind: PrimitiveKind, max: u128, value: &Value<'_>) -> Result<u128, ValueError> {
    match value {
        Value::Int(_) | Value::UInt(_) => match value.as_u128() {
            Some(n) if n <= max => Ok(n),
            _ => Err(out_of_range(format!("{value:?}"), kind.name())),
        },
        other => Err(ValueError::mismatch(kind.name(), other)),
    }
}

fn big_int(value: &Value<'_>) -> Result<BigInt, ValueError> {
    match value {
        Value::BigInt(v) => Ok(v.clone()),
        Value::Int(v) => Ok(BigInt::from(*v)),
        Value::UInt(v) => Ok(BigInt::from(*v)),
        other => Err(ValueError::mismatch("big integer", other)),
    }
}

// -----------------------------------------------------------------------------
// Primitive encodings

fn write_primitive(
    kind: PrimitiveKind,
    out: &mut ValueWriter,
    value: &Value<'_>,
) -> Result<(), ValueError> {
    use PrimitiveKind as K;

    if let Some(bounds) = kind.signed_bounds() {
        let n = signed(kind, bounds, value)?;
        match kind {
            K::I128 => out.write_var_i128(n),
            _ => out.write_var_i64(n as i64),
        }
        return Ok(());
    }
    if let Some(max) = kind.unsigned_bound() {
        let n = unsigned(kind, max, value)?;
        match kind {
            K::U8 => out.write_u8(n as u8),
            K::U128 => out.write_var_u128(n),
            _ => out.write_var_u64(n as u64),
        }
        return Ok(());
    }

    match (kind, value) {
        (K::Bool, Value::Bool(v)) => out.write_bool(*v),
        (K::Char, Value::Char(v)) => out.write_char(*v),
        (K::F32, Value::F32(v)) => out.write_f32(*v),
        (K::F64, Value::F64(v)) => out.write_f64(*v),
        (K::F64, Value::F32(v)) => out.write_f64(*v as f64),
        (K::String, Value::String(v)) => out.write_str(v),
        (K::Bytes, _) => out.write_bytes(&byte_string(value)?),
        (K::BigInt, _) => out.write_bytes(big_int(value)?.to_be_bytes()),
        (K::Decimal, Value::Decimal(v)) => {
            out.write_var_i64(v.scale() as i64);
            out.write_bytes(v.unscaled().to_be_bytes());
        }
        (K::Decimal, Value::BigInt(v)) => {
            out.write_var_i64(0);
            out.write_bytes(v.to_be_bytes());
        }
        (K::Date, Value::Date(v)) => out.write_var_i64(v.num_days_from_ce() as i64),
        (K::Time, Value::Time(v)) => {
            out.write_var_u64(v.num_seconds_from_midnight() as u64);
            out.write_var_u64(v.nanosecond() as u64);
        }
        (K::DateTime, Value::DateTime(v)) => write_instant(out, &v.and_utc()),
        (K::Timestamp, Value::Timestamp(v)) => write_instant(out, v),
        (K::Duration, Value::Duration(v)) => {
            out.write_var_u64(v.as_secs());
            out.write_var_u64(v.subsec_nanos() as u64);
        }
        (kind, other) => return Err(ValueError::mismatch(kind.name(), other)),
    }
    Ok(())
}

#[inline]
fn write_instant(out: &mut ValueWriter, v: &DateTime<Utc>) {
    out.write_var_i64(v.timestamp());
    out.write_var_u64(v.timestamp_subsec_nanos() as u64);
}

fn read_u32(input: &mut ValueReader<'_>, target: &'static str) -> SchemaResult<u32> {
    let n = input.read_var_u64()?;
    u32::try_from(n).map_err(|_| out_of_range(n, target).into())
}

fn read_instant(input: &mut ValueReader<'_>) -> SchemaResult<DateTime<Utc>> {
    let secs = input.read_var_i64()?;
    let nanos = read_u32(input, "timestamp")?;
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .ok_or_else(|| out_of_range(format!("{secs}s {nanos}ns"), "timestamp").into())
}

fn read_primitive(kind: PrimitiveKind, input: &mut ValueReader<'_>) -> SchemaResult<Value<'static>> {
    use PrimitiveKind as K;

    Ok(match kind {
        K::Bool => Value::Bool(input.read_bool()?),
        K::Char => Value::Char(input.read_char()?),
        K::I8 | K::I16 | K::I32 | K::I64 => Value::Int(input.read_var_i64()? as i128),
        K::I128 => Value::Int(input.read_var_i128()?),
        K::U8 => Value::UInt(input.read_u8()? as u128),
        K::U16 | K::U32 | K::U64 => Value::UInt(input.read_var_u64()? as u128),
        K::U128 => Value::UInt(input.read_var_u128()?),
        K::F32 => Value::F32(input.read_f32()?),
        K::F64 => Value::F64(input.read_f64()?),
        K::String => Value::String(Cow::Owned(input.read_str()?.to_owned())),
        K::Bytes => Value::Bytes(Cow::Owned(input.read_bytes()?.to_vec())),
        K::BigInt => Value::BigInt(BigInt::from_be_bytes(input.read_bytes()?)),
        K::Decimal => {
            let scale = input.read_var_i64()?;
            let scale = i32::try_from(scale).map_err(|_| out_of_range(scale, "decimal scale"))?;
            Value::Decimal(Decimal::new(BigInt::from_be_bytes(input.read_bytes()?), scale))
        }
        K::Date => {
            let days = input.read_var_i64()?;
            i32::try_from(days)
                .ok()
                .and_then(NaiveDate::from_num_days_from_ce_opt)
                .map(Value::Date)
                .ok_or_else(|| out_of_range(days, "date"))?
        }
        K::Time => {
            let secs = read_u32(input, "time")?;
            let nanos = read_u32(input, "time")?;
            NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
                .map(Value::Time)
                .ok_or_else(|| out_of_range(format!("{secs}s {nanos}ns"), "time"))?
        }
        K::DateTime => Value::DateTime(read_instant(input)?.naive_utc()),
        K::Timestamp => Value::Timestamp(read_instant(input)?),
        K::Duration => {
            let secs = input.read_var_u64()?;
            let nanos = read_u32(input, "duration")?;
            if nanos >= 1_000_000_000 {
                return Err(out_of_range(format!("{nanos}ns"), "duration").into());
            }
            Value::Duration(Duration::new(secs, nanos))
        }
    })
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use chrono::{NaiveDate, TimeZone, Utc};
    use vc_stream::{ValueReader, ValueWriter};

    use super::FieldCodec;
    use crate::codec::PrimitiveKind;
    use crate::error::{SchemaError, SchemaResult};
    use crate::portable::{ObjectCodec, Portable};
    use crate::types::{BigInt, Decimal};
    use crate::value::{Value, ValueError};

    struct NoObjects;

    impl ObjectCodec for NoObjects {
        fn write_object(&self, _: &mut ValueWriter, _: &dyn Portable) -> SchemaResult<()> {
            Err(SchemaError::NestingTooDeep { limit: 0 })
        }

        fn read_object(&self, _: &mut ValueReader<'_>) -> SchemaResult<Box<dyn Portable>> {
            Err(SchemaError::NestingTooDeep { limit: 0 })
        }
    }

    fn round_trip(codec: &FieldCodec, value: &Value<'_>) -> Value<'static> {
        let mut out = ValueWriter::new();
        codec.write(&mut out, value, &NoObjects).unwrap();
        let bytes = out.into_bytes();
        let mut input = ValueReader::new(&bytes);
        let back = codec.read(&mut input, &NoObjects).unwrap();
        assert!(input.is_empty());
        back
    }

    #[test]
    fn fixed_blob_is_raw() {
        let codec = FieldCodec::FixedArray {
            elem: Box::new(FieldCodec::Primitive(PrimitiveKind::U8)),
            len: 4,
        };
        let value = Value::List((1..=4).map(Value::UInt).collect());
        let mut out = ValueWriter::new();
        codec.write(&mut out, &value, &NoObjects).unwrap();
        assert_eq!(out.as_bytes(), &[1, 2, 3, 4]);

        let short = Value::Bytes(Cow::Borrowed(&[1, 2]));
        assert!(matches!(
            codec.write(&mut ValueWriter::new(), &short, &NoObjects),
            Err(SchemaError::Value(ValueError::Length {
                expected: 4,
                found: 2
            }))
        ));
    }

    #[test]
    fn narrow_integers_are_checked() {
        let codec = FieldCodec::Primitive(PrimitiveKind::I8);
        assert!(matches!(
            codec.write(&mut ValueWriter::new(), &Value::Int(300), &NoObjects),
            Err(SchemaError::Value(ValueError::OutOfRange { target: "i8", .. }))
        ));
        assert!(matches!(
            round_trip(&codec, &Value::UInt(12)),
            Value::Int(12)
        ));
    }

    #[test]
    fn temporal_values() {
        let date = NaiveDate::from_ymd_opt(1815, 12, 10).unwrap();
        let back = round_trip(&FieldCodec::Primitive(PrimitiveKind::Date), &Value::Date(date));
        assert!(matches!(back, Value::Date(d) if d == date));

        let stamp = Utc.with_ymd_and_hms(2024, 2, 29, 23, 59, 58).unwrap();
        let back = round_trip(
            &FieldCodec::Primitive(PrimitiveKind::Timestamp),
            &Value::Timestamp(stamp),
        );
        assert!(matches!(back, Value::Timestamp(t) if t == stamp));
    }

    #[test]
    fn numbers_and_maps() {
        let dec = Decimal::new(BigInt::from(-123_456_i64), 3);
        let back = round_trip(&FieldCodec::Primitive(PrimitiveKind::Decimal), &Value::Decimal(dec.clone()));
        assert!(matches!(back, Value::Decimal(d) if d == dec));

        let codec = FieldCodec::Map(
            Box::new(FieldCodec::Primitive(PrimitiveKind::String)),
            Box::new(FieldCodec::Optional(Box::new(FieldCodec::Primitive(PrimitiveKind::U32)))),
        );
        let value = Value::Map(vec![
            (Value::String("a".into()), Value::UInt(1)),
            (Value::String("b".into()), Value::Null),
        ]);
        let Value::Map(entries) = round_trip(&codec, &value) else {
            panic!("expected a map");
        };
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[1].1, Value::Null));
    }

    #[test]
    fn delegate_requires_object() {
        assert!(matches!(
            FieldCodec::Delegate.write(&mut ValueWriter::new(), &Value::Bool(true), &NoObjects),
            Err(SchemaError::Value(ValueError::Mismatch { expected: "object", .. }))
        ));
    }
}
