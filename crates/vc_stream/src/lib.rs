//! Binary record stream used by the portable codec.
//!
//! Two layers:
//!
//! - [`ValueWriter`] / [`ValueReader`]: sequential typed primitives
//!   (varints, zigzag integers, floats, chars, strings, byte strings).
//! - [`RecordWriter`] / [`RecordReader`]: versioned records made of indexed
//!   properties, with nested records and an opaque remainder.
//!
//! # Wire format
//!
//! ```text
//! record   := version:varuint body_len:varuint body
//! body     := property*
//! property := index:varuint len:varuint payload
//! ```
//!
//! Property indices are strictly ascending inside one body. A nested record
//! is a property whose payload is itself a record.
//!
//! # Examples
//!
//! ```
//! use vc_stream::{RecordWriter, StreamError, ValueReader, ValueWriter};
//!
//! let mut record = RecordWriter::new(2);
//! record.write_property(1, |w| {
//!     w.write_str("Ada");
//!     Ok::<_, StreamError>(())
//! })?;
//!
//! let mut out = ValueWriter::new();
//! record.finish_into(&mut out);
//! let bytes = out.into_bytes();
//!
//! let mut reader = ValueReader::new(&bytes);
//! let mut record = reader.read_record()?;
//! assert_eq!(record.version(), 2);
//! assert_eq!(record.read_property(1)?.unwrap().read_str()?, "Ada");
//! # Ok::<_, StreamError>(())
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![no_std]

// -----------------------------------------------------------------------------
// no_std support

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod error;
mod record;
mod value;

// -----------------------------------------------------------------------------
// Exports

pub use error::{StreamError, StreamResult};
pub use record::{RecordReader, RecordWriter};
pub use value::{ValueReader, ValueWriter};
