use crate::codec::{FieldCodec, FieldShape, PrimitiveKind};

/// Selects the codec for a field.
///
/// Without a preferred shape the declared shape decides. With one:
///
/// - arrays, sequences and sets take their element shape from the preferred
///   shape (its element if it is list-like itself);
/// - maps take key and value from a preferred map, otherwise the preferred
///   shape replaces the value shape;
/// - optionals pass the preferred shape to their inner shape;
/// - any other declared shape is replaced by the preferred one.
///
/// Every shape has a codec, the last resort being [`FieldCodec::Delegate`].
///
/// ```
/// use vc_portable::codec::{FieldCodec, FieldShape, PrimitiveKind, resolve};
///
/// let declared = FieldShape::Sequence(Box::new(FieldShape::Object));
/// let preferred = FieldShape::Primitive(PrimitiveKind::I64);
/// assert_eq!(
///     resolve(&declared, Some(&preferred)),
///     FieldCodec::Collection(Box::new(FieldCodec::Primitive(PrimitiveKind::I64))),
/// );
/// ```
pub fn resolve(declared: &FieldShape, preferred: Option<&FieldShape>) -> FieldCodec {
    let Some(preferred) = preferred else {
        return from_shape(declared);
    };
    match declared {
        FieldShape::Array { len, .. } => {
            fixed_array(preferred.element().unwrap_or(preferred), *len)
        }
        FieldShape::Sequence(_) | FieldShape::Set(_) => {
            collection(preferred.element().unwrap_or(preferred))
        }
        FieldShape::Map(key, _) => match preferred {
            FieldShape::Map(pk, pv) => FieldCodec::Map(
                Box::new(from_shape(pk)),
                Box::new(from_shape(pv)),
            ),
            _ => FieldCodec::Map(Box::new(from_shape(key)), Box::new(from_shape(preferred))),
        },
        FieldShape::Optional(inner) => {
            let inner = match preferred {
                FieldShape::Optional(p) => resolve(inner, Some(p)),
                _ => resolve(inner, Some(preferred)),
            };
            FieldCodec::Optional(Box::new(inner))
        }
        FieldShape::Primitive(_) | FieldShape::Object => from_shape(preferred),
    }
}

fn from_shape(shape: &FieldShape) -> FieldCodec {
    match shape {
        FieldShape::Primitive(kind) => FieldCodec::Primitive(*kind),
        FieldShape::Array { elem, len } => fixed_array(elem, *len),
        FieldShape::Sequence(elem) | FieldShape::Set(elem) => collection(elem),
        FieldShape::Map(key, value) => {
            FieldCodec::Map(Box::new(from_shape(key)), Box::new(from_shape(value)))
        }
        FieldShape::Optional(inner) => FieldCodec::Optional(Box::new(from_shape(inner))),
        FieldShape::Object => FieldCodec::Delegate,
    }
}

#[inline]
fn fixed_array(elem: &FieldShape, len: usize) -> FieldCodec {
    FieldCodec::FixedArray {
        elem: Box::new(from_shape(elem)),
        len,
    }
}

/// `u8` sequences are byte strings.
#[inline]
fn collection(elem: &FieldShape) -> FieldCodec {
    if *elem == FieldShape::U8 {
        FieldCodec::Primitive(PrimitiveKind::Bytes)
    } else {
        FieldCodec::Collection(Box::new(from_shape(elem)))
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::resolve;
    use crate::codec::{FieldCodec, FieldShape, PrimitiveKind};
    use crate::types::FieldType;

    fn prim(kind: PrimitiveKind) -> Box<FieldCodec> {
        Box::new(FieldCodec::Primitive(kind))
    }

    #[test]
    fn declared_shapes() {
        assert_eq!(
            resolve(&<Vec<u8>>::shape(), None),
            FieldCodec::Primitive(PrimitiveKind::Bytes)
        );
        assert_eq!(
            resolve(&<[u8; 16]>::shape(), None),
            FieldCodec::FixedArray {
                elem: prim(PrimitiveKind::U8),
                len: 16
            }
        );
        assert_eq!(
            resolve(&<Option<Box<dyn crate::Portable>>>::shape(), None),
            FieldCodec::Optional(Box::new(FieldCodec::Delegate))
        );
    }

    #[test]
    fn preferred_shapes() {
        let i64_shape = <i64>::shape();
        assert_eq!(
            resolve(&<Vec<i32>>::shape(), Some(&<Vec<i64>>::shape())),
            FieldCodec::Collection(prim(PrimitiveKind::I64))
        );
        assert_eq!(
            resolve(
                &<std::collections::BTreeMap<String, i32>>::shape(),
                Some(&i64_shape)
            ),
            FieldCodec::Map(prim(PrimitiveKind::String), prim(PrimitiveKind::I64))
        );
        assert_eq!(
            resolve(&<Option<u16>>::shape(), Some(&i64_shape)),
            FieldCodec::Optional(prim(PrimitiveKind::I64))
        );
        assert_eq!(
            resolve(&FieldShape::Object, Some(&i64_shape)),
            FieldCodec::Primitive(PrimitiveKind::I64)
        );
    }
}
