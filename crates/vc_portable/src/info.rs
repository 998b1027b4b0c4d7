use core::any::TypeId;
use core::fmt;
use std::sync::OnceLock;

use bitflags::bitflags;
use vc_stream::{RecordReader, RecordWriter};

use crate::codec::FieldShape;
use crate::error::{SchemaError, SchemaResult};
use crate::portable::{CustomCodec, ObjectCodec, Portable, PortableType};
use crate::types::FieldType;

// -----------------------------------------------------------------------------
// FieldFlags

bitflags! {
    /// Declaration-level markers of a field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u8 {
        /// Explicitly ignored.
        const IGNORE = 1;
        /// Implementation-owned runtime state.
        const TRANSIENT = 1 << 1;
        /// Compiler or macro generated, e.g. `PhantomData`.
        const SYNTHETIC = 1 << 2;
        /// Holds the [`RemainderValue`](crate::RemainderValue).
        const REMAINDER = 1 << 3;
        /// Holds the embedded ancestor.
        const BASE = 1 << 4;
    }
}

impl FieldFlags {
    /// Fields carrying any of these flags are never indexed.
    pub const EXCLUDED: Self = Self::IGNORE
        .union(Self::TRANSIENT)
        .union(Self::SYNTHETIC)
        .union(Self::REMAINDER)
        .union(Self::BASE);
}

// -----------------------------------------------------------------------------
// DeclaredField

/// A field as declared in source, before any schema decision.
#[derive(Clone)]
pub struct DeclaredField {
    name: &'static str,
    position: usize,
    rename: Option<&'static str>,
    since: Option<u32>,
    flags: FieldFlags,
    shape: Option<fn() -> FieldShape>,
    preferred: Option<fn() -> FieldShape>,
    value_type: &'static str,
}

impl DeclaredField {
    /// A field whose type implements [`FieldType`].
    pub fn new<F: FieldType>(name: &'static str, position: usize) -> Self {
        Self {
            name,
            position,
            rename: None,
            since: None,
            flags: FieldFlags::empty(),
            shape: Some(F::shape),
            preferred: None,
            value_type: core::any::type_name::<F>(),
        }
    }

    /// A field the codec cannot encode by itself: excluded, remainder or base
    /// fields.
    pub fn opaque(name: &'static str, position: usize, value_type: &'static str) -> Self {
        Self {
            name,
            position,
            rename: None,
            since: None,
            flags: FieldFlags::empty(),
            shape: None,
            preferred: None,
            value_type,
        }
    }

    #[inline]
    pub fn with_rename(mut self, rename: &'static str) -> Self {
        self.rename = Some(rename);
        self
    }

    #[inline]
    pub fn with_since(mut self, since: u32) -> Self {
        self.since = Some(since);
        self
    }

    #[inline]
    pub fn with_flags(mut self, flags: FieldFlags) -> Self {
        self.flags |= flags;
        self
    }

    /// Overrides the type used for codec selection.
    #[inline]
    pub fn with_preferred<P: FieldType>(mut self) -> Self {
        self.preferred = Some(P::shape);
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The external name: the rename if any, else the declared name.
    #[inline]
    pub fn effective_name(&self) -> &'static str {
        self.rename.unwrap_or(self.name)
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn since(&self) -> Option<u32> {
        self.since
    }

    #[inline]
    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    #[inline]
    pub fn shape(&self) -> Option<FieldShape> {
        self.shape.map(|f| f())
    }

    #[inline]
    pub fn preferred(&self) -> Option<FieldShape> {
        self.preferred.map(|f| f())
    }

    #[inline]
    pub fn value_type(&self) -> &'static str {
        self.value_type
    }
}

impl fmt::Debug for DeclaredField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclaredField")
            .field("name", &self.name)
            .field("position", &self.position)
            .field("rename", &self.rename)
            .field("since", &self.since)
            .field("flags", &self.flags)
            .field("value_type", &self.value_type)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// CustomHooks

/// Type-erased [`CustomCodec`] entry points.
#[derive(Clone, Copy)]
pub struct CustomHooks {
    pub write: fn(&dyn Portable, &mut RecordWriter, &dyn ObjectCodec) -> SchemaResult<()>,
    pub read: fn(&mut RecordReader<'_>, &dyn ObjectCodec) -> SchemaResult<Box<dyn Portable>>,
}

fn custom_write<T: PortableType + CustomCodec>(
    object: &dyn Portable,
    out: &mut RecordWriter,
    objects: &dyn ObjectCodec,
) -> SchemaResult<()> {
    match object.as_any().downcast_ref::<T>() {
        Some(object) => object.write_portable(out, objects),
        None => Err(SchemaError::TypeMismatch {
            expected: T::type_info().type_path(),
            found: object.portable_info().type_path(),
        }),
    }
}

fn custom_read<T: PortableType + CustomCodec>(
    input: &mut RecordReader<'_>,
    objects: &dyn ObjectCodec,
) -> SchemaResult<Box<dyn Portable>> {
    Ok(Box::new(T::read_portable(input, objects)?))
}

fn construct<T: PortableType + Default>() -> Box<dyn Portable> {
    Box::new(T::default())
}

// -----------------------------------------------------------------------------
// PortableInfo

/// Static description of a portable type.
///
/// Built once per type, usually by `#[derive(Portable)]`, and stored in an
/// [`InfoCell`].
pub struct PortableInfo {
    type_path: &'static str,
    type_name: &'static str,
    type_id: TypeId,
    fields: Box<[DeclaredField]>,
    version: Option<u32>,
    base: Option<fn() -> &'static PortableInfo>,
    constructor: Option<fn() -> Box<dyn Portable>>,
    custom: Option<CustomHooks>,
}

impl PortableInfo {
    pub fn new<T: PortableType>(
        type_path: &'static str,
        type_name: &'static str,
        fields: Vec<DeclaredField>,
    ) -> Self {
        Self {
            type_path,
            type_name,
            type_id: TypeId::of::<T>(),
            fields: fields.into_boxed_slice(),
            version: None,
            base: None,
            constructor: None,
            custom: None,
        }
    }

    /// Explicit type-level version.
    #[inline]
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    /// Declares `B` as the ancestor embedded in this type.
    #[inline]
    pub fn with_base<B: PortableType>(mut self) -> Self {
        self.base = Some(B::type_info);
        self
    }

    /// Enables instantiation on read through `Default`.
    #[inline]
    pub fn with_default<T: PortableType + Default>(mut self) -> Self {
        self.constructor = Some(construct::<T>);
        self
    }

    #[inline]
    pub fn with_custom_codec<T: PortableType + CustomCodec>(mut self) -> Self {
        self.custom = Some(CustomHooks {
            write: custom_write::<T>,
            read: custom_read::<T>,
        });
        self
    }

    /// Full path, e.g. `my_crate::model::Person`.
    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.type_path
    }

    /// External name, e.g. `Person`.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Declared fields in declaration order.
    #[inline]
    pub fn fields(&self) -> &[DeclaredField] {
        &self.fields
    }

    #[inline]
    pub fn version(&self) -> Option<u32> {
        self.version
    }

    #[inline]
    pub fn base(&self) -> Option<&'static PortableInfo> {
        self.base.map(|f| f())
    }

    #[inline]
    pub fn constructor(&self) -> Option<fn() -> Box<dyn Portable>> {
        self.constructor
    }

    #[inline]
    pub fn custom(&self) -> Option<CustomHooks> {
        self.custom
    }
}

impl fmt::Debug for PortableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortableInfo")
            .field("type_path", &self.type_path)
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .field("version", &self.version)
            .field("base", &self.base().map(PortableInfo::type_path))
            .field("custom", &self.custom.is_some())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// InfoCell

/// Lazily initialized static storage for a [`PortableInfo`].
///
/// ```ignore
/// fn type_info() -> &'static PortableInfo {
///     static CELL: InfoCell = InfoCell::new();
///     CELL.get_or_init(|| PortableInfo::new::<Self>(/* .. */))
/// }
/// ```
pub struct InfoCell(OnceLock<PortableInfo>);

impl InfoCell {
    #[inline]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    #[inline]
    pub fn get_or_init(&self, f: impl FnOnce() -> PortableInfo) -> &PortableInfo {
        self.0.get_or_init(f)
    }
}
