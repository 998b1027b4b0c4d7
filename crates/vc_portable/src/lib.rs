//! Reflective, schema-evolving binary codec.
//!
//! A type opts in with `#[derive(Portable)]`. The derive describes its fields
//! statically ([`PortableInfo`]); at runtime the [`schema`] scanner turns that
//! description into a [`TypeSchema`]: one sorted, indexed field list per
//! version. The [`TypeSerializer`] writes and reads objects against those
//! lists, and the [`PortableCodec`] facade ties everything to user type ids.
//!
//! ```
//! use vc_portable::{Portable, PortableCodec, RemainderValue, UserTypeTable};
//!
//! #[derive(Portable, Default, Debug, PartialEq)]
//! #[portable(default)]
//! struct Person {
//!     name: String,
//!     age: u32,
//!     #[portable(since = 1)]
//!     email: Option<String>,
//!     #[portable(remainder)]
//!     rest: Option<RemainderValue>,
//! }
//!
//! let mut ids = UserTypeTable::new();
//! ids.register::<Person>(1001)?;
//! let codec = PortableCodec::new(ids);
//!
//! let ada = Person { name: "Ada".into(), age: 36, ..Default::default() };
//! let bytes = codec.to_bytes(&ada)?;
//! let back: Person = codec.from_bytes_as(&bytes)?;
//! assert_eq!(back.name, ada.name);
//! assert_eq!(back.age, 36);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate self as vc_portable;

// -----------------------------------------------------------------------------
// Modules

mod error;
mod facade;
mod info;
mod portable;
mod remainder;
mod serializer;
mod value;

pub mod codec;
pub mod registry;
pub mod schema;
pub mod types;

#[doc(hidden)]
pub mod __macro_exports;

// -----------------------------------------------------------------------------
// Exports

pub use vc_portable_derive::Portable;

pub use error::{CodecError, Operation, SchemaError, SchemaResult, TypeKey};
pub use facade::{CodecConfig, PortableCodec};
pub use info::{CustomHooks, DeclaredField, FieldFlags, InfoCell, PortableInfo};
pub use portable::{CustomCodec, ObjectCodec, Portable, PortableType};
pub use registry::{TypeRegistry, UserTypeIds, UserTypeTable};
pub use remainder::RemainderValue;
pub use schema::{FieldSlot, TypeSchema};
pub use serializer::TypeSerializer;
pub use types::{BigInt, Binary, Decimal, FieldType};
pub use value::{ObjectValue, Value, ValueError};

pub use vc_stream as stream;
