use crate::codec::FieldShape;
use crate::portable::Portable;
use crate::types::FieldType;
use crate::value::{ObjectValue, Value, ValueError};

/// A field holding any registered portable object.
///
/// The concrete type is resolved from the stream on read.
impl FieldType for Box<dyn Portable> {
    #[inline]
    fn shape() -> FieldShape {
        FieldShape::Object
    }

    #[inline]
    fn to_value(&self) -> Value<'_> {
        Value::Object(ObjectValue::Borrowed(self.as_ref()))
    }

    fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
        match value {
            Value::Object(object) => object.into_owned(),
            other => Err(ValueError::mismatch("object", &other)),
        }
    }
}
