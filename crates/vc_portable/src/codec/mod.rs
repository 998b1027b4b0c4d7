//! Field Codec Registry.
//!
//! A field's declared [`FieldShape`] (optionally overridden by a preferred
//! shape) is mapped once, at scan time, to a [`FieldCodec`]. The codec is
//! stored on the field slot and reused for every object of that type.

// -----------------------------------------------------------------------------
// Modules

mod field_codec;
mod resolve;
mod shape;

// -----------------------------------------------------------------------------
// Exports

pub use field_codec::FieldCodec;
pub use resolve::resolve;
pub use shape::{FieldShape, PrimitiveKind};
