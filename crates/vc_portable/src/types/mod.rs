//! Field types understood by the codec.
//!
//! [`FieldType`] is implemented for the built-in primitives, strings,
//! date/time values, the numeric carriers of this module, `Option`, fixed
//! arrays, the standard collections and maps, and every type deriving
//! [`Portable`](crate::Portable).

use crate::codec::FieldShape;
use crate::value::{Value, ValueError};

// -----------------------------------------------------------------------------
// Modules

mod collections;
mod numeric;
mod object;
mod primitives;
mod time;

// -----------------------------------------------------------------------------
// Exports

pub use numeric::{BigInt, Binary, Decimal};

// -----------------------------------------------------------------------------
// FieldType

/// A type that can be stored in a portable field.
///
/// The declared [`shape`](FieldType::shape) selects the field codec once, at
/// scan time. Values then travel through [`Value`].
///
/// `from_value` receives whatever the selected codec produced, so it accepts
/// the lossless coercions a preferred type may introduce: integer widening
/// and narrowing within range, `f32` to `f64`, byte strings for `u8` lists.
pub trait FieldType: Sized + Send + Sync + 'static {
    fn shape() -> FieldShape;

    fn to_value(&self) -> Value<'_>;

    fn from_value(value: Value<'static>) -> Result<Self, ValueError>;
}

/// Elements of a list-like value, with byte strings expanded to `u8` items.
pub(crate) fn list_items(value: Value<'static>) -> Result<Vec<Value<'static>>, ValueError> {
    match value {
        Value::List(items) => Ok(items),
        Value::Bytes(bytes) => Ok(bytes.iter().map(|b| Value::UInt(*b as u128)).collect()),
        other => Err(ValueError::mismatch("list", &other)),
    }
}
