//! Provide some tools for parsing token stream.

// -----------------------------------------------------------------------------
// Modules

mod field_attributes;
mod portable_derive;
mod type_attributes;

// -----------------------------------------------------------------------------
// Internal API

pub(crate) use field_attributes::{FieldAttributes, FieldRole};
pub(crate) use portable_derive::{PortableDerive, PortableField};
pub(crate) use type_attributes::TypeAttributes;
