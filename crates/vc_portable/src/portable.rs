use core::any::Any;

use vc_stream::{RecordReader, RecordWriter, ValueReader, ValueWriter};

use crate::error::SchemaResult;
use crate::info::PortableInfo;
use crate::remainder::RemainderValue;
use crate::value::{Value, ValueError};

// -----------------------------------------------------------------------------
// Portable

/// Object-safe access to a portable object.
///
/// Fields are addressed by their declaration position in
/// [`PortableInfo::fields`]. Usually implemented with `#[derive(Portable)]`.
pub trait Portable: Any + Send + Sync {
    fn portable_info(&self) -> &'static PortableInfo;

    /// Current value of the field at `position`.
    fn field_value(&self, position: usize) -> Option<Value<'_>>;

    /// Stores a decoded value into the field at `position`.
    fn set_field_value(&mut self, position: usize, value: Value<'static>) -> Result<(), ValueError>;

    /// The embedded ancestor value, if the type declares one.
    fn base(&self) -> Option<&dyn Portable> {
        None
    }

    fn base_mut(&mut self) -> Option<&mut dyn Portable> {
        None
    }

    fn remainder(&self) -> Option<&RemainderValue> {
        None
    }

    /// Returns `false` if the type has no remainder field.
    fn set_remainder(&mut self, remainder: Option<RemainderValue>) -> bool {
        let _ = remainder;
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl dyn Portable {
    #[inline]
    pub fn is<T: Portable>(&self) -> bool {
        self.as_any().is::<T>()
    }

    #[inline]
    pub fn downcast_ref<T: Portable>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    #[inline]
    pub fn downcast_mut<T: Portable>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Moves the object out as `T`.
    ///
    /// On failure returns the type path of the actual object.
    pub fn downcast<T: Portable>(self: Box<Self>) -> Result<Box<T>, &'static str> {
        let found = self.portable_info().type_path();
        self.into_any().downcast::<T>().map_err(|_| found)
    }
}

impl core::fmt::Debug for dyn Portable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "dyn Portable<{}>", self.portable_info().type_path())
    }
}

/// Static access to a type's [`PortableInfo`].
pub trait PortableType: Portable + Sized {
    fn type_info() -> &'static PortableInfo;
}

// -----------------------------------------------------------------------------
// Codec seams

/// Whole-object reader and writer, used by delegate fields and custom codecs
/// to embed another portable object.
pub trait ObjectCodec {
    fn write_object(&self, out: &mut ValueWriter, object: &dyn Portable) -> SchemaResult<()>;

    fn read_object(&self, input: &mut ValueReader<'_>) -> SchemaResult<Box<dyn Portable>>;
}

/// A type that encodes itself instead of going through field reflection.
///
/// Enabled with `#[portable(custom)]`. The record handed over is the type's
/// own; its version tag and properties are entirely up to the implementation.
pub trait CustomCodec: Sized {
    fn write_portable(&self, out: &mut RecordWriter, objects: &dyn ObjectCodec) -> SchemaResult<()>;

    fn read_portable(input: &mut RecordReader<'_>, objects: &dyn ObjectCodec) -> SchemaResult<Self>;
}
