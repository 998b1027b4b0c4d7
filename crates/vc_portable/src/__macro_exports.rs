//! Items used by `#[derive(Portable)]` expansions. Not public API.

use crate::info::PortableInfo;
use crate::portable::Portable;
use crate::value::{ObjectValue, Value, ValueError};

#[cfg(feature = "auto_register")]
pub use inventory;

/// Moves a decoded object into a field of concrete type `T`.
pub fn object_from_value<T: Portable>(value: Value<'static>) -> Result<T, ValueError> {
    let object = match value {
        Value::Object(ObjectValue::Owned(object)) => object,
        Value::Object(ObjectValue::Borrowed(_)) => return Err(ValueError::BorrowedObject),
        other => return Err(ValueError::mismatch("object", &other)),
    };
    object
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|found| ValueError::ObjectType {
            expected: core::any::type_name::<T>(),
            found,
        })
}

/// Value of a nested portable field.
#[inline]
pub fn object_to_value<T: Portable>(object: &T) -> Value<'_> {
    Value::Object(ObjectValue::Borrowed(object))
}

/// A `(user type id, type)` pair submitted by `#[portable(user_type = ..)]`.
pub struct AutoRegistration {
    pub id: i32,
    pub info: fn() -> &'static PortableInfo,
}

#[cfg(feature = "auto_register")]
inventory::collect!(AutoRegistration);

/// All pairs submitted in the final binary.
#[cfg(feature = "auto_register")]
pub fn registrations() -> impl Iterator<Item = &'static AutoRegistration> {
    inventory::iter::<AutoRegistration>.into_iter()
}
