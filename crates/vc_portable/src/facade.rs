use std::borrow::Cow;
use std::sync::Arc;

use vc_stream::{RecordWriter, StreamError, ValueReader, ValueWriter};

use crate::error::{CodecError, Operation, SchemaError, SchemaResult};
use crate::portable::{ObjectCodec, Portable, PortableType};
use crate::registry::{DEFAULT_MAX_INHERITANCE_DEPTH, TypeRegistry, UserTypeIds};
use crate::schema::TypeSchema;
use crate::serializer::TypeSerializer;

// -----------------------------------------------------------------------------
// CodecConfig

/// Runtime limits of a [`PortableCodec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    /// Longest accepted chain of embedded ancestors.
    pub max_inheritance_depth: usize,
    /// Deepest accepted nesting of objects inside object fields.
    pub max_nesting_depth: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_inheritance_depth: DEFAULT_MAX_INHERITANCE_DEPTH,
            max_nesting_depth: 128,
        }
    }
}

// -----------------------------------------------------------------------------
// PortableCodec

/// Entry point: writes and reads whole objects tagged with their user type
/// id.
///
/// An encoded object is the id as a zigzag varint followed by the object's
/// record. Every failure leaves through here as a [`CodecError`] naming the
/// type involved.
#[derive(Debug, Clone)]
pub struct PortableCodec {
    registry: TypeRegistry,
    config: CodecConfig,
}

impl PortableCodec {
    pub fn new(ids: impl UserTypeIds) -> Self {
        Self::with_config(ids, CodecConfig::default())
    }

    pub fn with_config(ids: impl UserTypeIds, config: CodecConfig) -> Self {
        Self {
            registry: TypeRegistry::with_inheritance_limit(ids, config.max_inheritance_depth),
            config,
        }
    }

    #[inline]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    #[inline]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    #[inline]
    fn top_level(&self) -> Nesting<'_> {
        Nesting {
            codec: self,
            depth: 0,
        }
    }

    /// Writes `object` at its type's active version.
    pub fn serialize(&self, out: &mut ValueWriter, object: &dyn Portable) -> Result<(), CodecError> {
        self.serialize_with(out, object, None)
    }

    /// Writes `object` at exactly `version`, e.g. for a peer still on an
    /// older schema.
    pub fn serialize_at(
        &self,
        out: &mut ValueWriter,
        object: &dyn Portable,
        version: u32,
    ) -> Result<(), CodecError> {
        self.serialize_with(out, object, Some(version))
    }

    fn serialize_with(
        &self,
        out: &mut ValueWriter,
        object: &dyn Portable,
        forced: Option<u32>,
    ) -> Result<(), CodecError> {
        let type_name = object.portable_info().type_path();
        log::trace!("serializing `{type_name}`");
        self.top_level()
            .write_tagged(out, object, forced)
            .map_err(|e| CodecError::new(Operation::Serialize, type_name, e))
    }

    /// Reads the next object of whatever type its id names.
    pub fn deserialize(&self, input: &mut ValueReader<'_>) -> Result<Box<dyn Portable>, CodecError> {
        let (schema, object) = self.top_level().read_tagged(input);
        object.map_err(|e| {
            let type_name: Cow<'static, str> = match &schema {
                Some(schema) => schema.type_path().into(),
                None => "unknown type".into(),
            };
            CodecError::new(Operation::Deserialize, type_name, e)
        })
    }

    /// Reads the next object, which must be a `T`.
    pub fn deserialize_as<T: PortableType>(&self, input: &mut ValueReader<'_>) -> Result<T, CodecError> {
        let expected = T::type_info().type_path();
        self.deserialize(input)?
            .downcast::<T>()
            .map(|object| *object)
            .map_err(|found| {
                CodecError::new(
                    Operation::Deserialize,
                    expected,
                    SchemaError::TypeMismatch { expected, found },
                )
            })
    }

    pub fn to_bytes(&self, object: &dyn Portable) -> Result<Vec<u8>, CodecError> {
        let mut out = ValueWriter::new();
        self.serialize(&mut out, object)?;
        Ok(out.into_bytes())
    }

    pub fn to_bytes_at(&self, object: &dyn Portable, version: u32) -> Result<Vec<u8>, CodecError> {
        let mut out = ValueWriter::new();
        self.serialize_at(&mut out, object, version)?;
        Ok(out.into_bytes())
    }

    pub fn from_bytes(&self, bytes: &[u8]) -> Result<Box<dyn Portable>, CodecError> {
        self.deserialize(&mut ValueReader::new(bytes))
    }

    pub fn from_bytes_as<T: PortableType>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        self.deserialize_as(&mut ValueReader::new(bytes))
    }

    /// Raises the active version of `T`. See [`TypeSchema::raise_version`].
    pub fn raise_version<T: PortableType>(&self, version: u32) -> Result<bool, CodecError> {
        let info = T::type_info();
        self.registry
            .raise_version(info, version)
            .map_err(|e| CodecError::new(Operation::RaiseVersion, info.type_path(), e))
    }
}

impl ObjectCodec for PortableCodec {
    fn write_object(&self, out: &mut ValueWriter, object: &dyn Portable) -> SchemaResult<()> {
        self.top_level().write_object(out, object)
    }

    fn read_object(&self, input: &mut ValueReader<'_>) -> SchemaResult<Box<dyn Portable>> {
        self.top_level().read_object(input)
    }
}

// -----------------------------------------------------------------------------
// Nesting

/// [`ObjectCodec`] handed to the serializer. Each nested object is written
/// and read one level deeper than its parent.
struct Nesting<'c> {
    codec: &'c PortableCodec,
    depth: usize,
}

impl Nesting<'_> {
    #[inline]
    fn deeper(&self) -> Nesting<'_> {
        Nesting {
            codec: self.codec,
            depth: self.depth + 1,
        }
    }

    fn check_depth(&self) -> SchemaResult<()> {
        let limit = self.codec.config.max_nesting_depth;
        if self.depth >= limit {
            return Err(SchemaError::NestingTooDeep { limit });
        }
        Ok(())
    }

    fn write_tagged(
        &self,
        out: &mut ValueWriter,
        object: &dyn Portable,
        forced: Option<u32>,
    ) -> SchemaResult<()> {
        let schema = self.codec.registry.ensure_schema(object.portable_info())?;
        out.write_var_i64(schema.user_type_id() as i64);

        let mut record = RecordWriter::new(0);
        TypeSerializer::new(schema).write(&mut record, object, forced, self)?;
        record.finish_into(out);
        Ok(())
    }

    /// Also returns the schema, if it was resolved, for error context.
    fn read_tagged(
        &self,
        input: &mut ValueReader<'_>,
    ) -> (Option<Arc<TypeSchema>>, SchemaResult<Box<dyn Portable>>) {
        let schema = match self.resolve_tag(input) {
            Ok(schema) => schema,
            Err(e) => return (None, Err(e)),
        };
        let object = input
            .read_record()
            .map_err(SchemaError::from)
            .and_then(|mut record| {
                log::trace!(
                    "deserializing `{}` at version {}",
                    schema.type_path(),
                    record.version()
                );
                TypeSerializer::new(schema.clone()).read(&mut record, self)
            });
        (Some(schema), object)
    }

    fn resolve_tag(&self, input: &mut ValueReader<'_>) -> SchemaResult<Arc<TypeSchema>> {
        let id = input.read_var_i64()?;
        let id = i32::try_from(id).map_err(|_| StreamError::VarIntOverflow { bits: 32 })?;
        self.codec.registry.lookup_by_id(id)
    }
}

impl ObjectCodec for Nesting<'_> {
    fn write_object(&self, out: &mut ValueWriter, object: &dyn Portable) -> SchemaResult<()> {
        self.check_depth()?;
        self.deeper()
            .write_tagged(out, object, None)
            .map_err(|e| SchemaError::Nested {
                type_name: object.portable_info().type_path(),
                source: Box::new(e),
            })
    }

    fn read_object(&self, input: &mut ValueReader<'_>) -> SchemaResult<Box<dyn Portable>> {
        self.check_depth()?;
        match self.deeper().read_tagged(input) {
            (_, Ok(object)) => Ok(object),
            (Some(schema), Err(e)) => Err(SchemaError::Nested {
                type_name: schema.type_path(),
                source: Box::new(e),
            }),
            (None, Err(e)) => Err(e),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use vc_stream::ValueWriter;

    use super::{CodecConfig, PortableCodec};
    use crate::serializer::TypeSerializer;
    use crate::error::{Operation, SchemaError, TypeKey};
    use crate::info::{DeclaredField, FieldFlags, InfoCell, PortableInfo};
    use crate::portable::{CustomCodec, ObjectCodec, PortableType};
    use crate::registry::UserTypeTable;
    use crate::remainder::RemainderValue;
    use crate::value::ValueError;
    use crate::{Portable, SchemaResult, stream};

    // Two releases of the same wire type, registered under the same id in
    // two separate codecs.
    mod v1 {
        use crate::{Portable, RemainderValue};

        #[derive(Portable, Default, Debug, Clone, PartialEq)]
        #[portable(default, name = "Contact")]
        pub struct Contact {
            pub a_name: String,
            pub b_age: u32,
            #[portable(remainder)]
            pub rest: Option<RemainderValue>,
        }
    }

    mod v3 {
        use crate::{Portable, RemainderValue};

        #[derive(Portable, Default, Debug, Clone, PartialEq)]
        #[portable(default, name = "Contact")]
        pub struct Contact {
            pub a_name: String,
            pub b_age: u32,
            #[portable(since = 2)]
            pub c_email: Option<String>,
            #[portable(since = 3)]
            pub d_tags: Vec<String>,
            #[portable(remainder)]
            pub rest: Option<RemainderValue>,
        }
    }

    #[derive(Portable, Default, Debug, PartialEq)]
    #[portable(default)]
    struct Animal {
        name: String,
        legs: u8,
    }

    #[derive(Portable, Default, Debug, PartialEq)]
    #[portable(default)]
    struct Dog {
        #[portable(base)]
        animal: Animal,
        breed: String,
        #[portable(skip)]
        cached_bark: Option<String>,
    }

    #[derive(Portable, Default)]
    #[portable(default)]
    struct Kennel {
        resident: Option<Dog>,
        anything: Option<Box<dyn Portable>>,
        #[portable(prefer = Vec<i64>)]
        scores: Vec<i32>,
    }

    #[derive(Portable, Debug, PartialEq)]
    #[portable(custom)]
    struct Rgb {
        packed: u32,
    }

    impl CustomCodec for Rgb {
        fn write_portable(
            &self,
            out: &mut stream::RecordWriter,
            _: &dyn ObjectCodec,
        ) -> SchemaResult<()> {
            out.write_property(7, |w| {
                w.write_var_u64(self.packed as u64);
                Ok(())
            })
        }

        fn read_portable(
            input: &mut stream::RecordReader<'_>,
            _: &dyn ObjectCodec,
        ) -> SchemaResult<Self> {
            let packed = match input.read_property(7)? {
                Some(mut payload) => payload.read_var_u64()?,
                None => 0,
            };
            let packed = u32::try_from(packed).map_err(|_| ValueError::OutOfRange {
                value: packed.to_string(),
                target: "u32",
            })?;
            Ok(Self { packed })
        }
    }

    #[derive(Portable)]
    struct NoDefault {
        value: u8,
    }

    #[derive(Portable, Default)]
    #[portable(default)]
    struct Node {
        next: Option<Box<dyn Portable>>,
    }

    /// Declares a remainder field but keeps the default `set_remainder`.
    #[derive(Default)]
    struct Sealed;

    impl PortableType for Sealed {
        fn type_info() -> &'static PortableInfo {
            static CELL: InfoCell = InfoCell::new();
            CELL.get_or_init(|| {
                PortableInfo::new::<Self>(
                    "tests::Sealed",
                    "Sealed",
                    vec![
                        DeclaredField::opaque("rest", 0, "Option<RemainderValue>")
                            .with_flags(FieldFlags::REMAINDER),
                    ],
                )
                .with_default::<Self>()
            })
        }
    }

    impl Portable for Sealed {
        fn portable_info(&self) -> &'static PortableInfo {
            Self::type_info()
        }

        fn field_value(&self, _: usize) -> Option<crate::Value<'_>> {
            None
        }

        fn set_field_value(&mut self, position: usize, _: crate::Value<'static>) -> Result<(), ValueError> {
            Err(ValueError::NoSuchField(position))
        }

        fn as_any(&self) -> &dyn core::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn core::any::Any {
            self
        }

        fn into_any(self: Box<Self>) -> Box<dyn core::any::Any> {
            self
        }
    }

    fn codec() -> PortableCodec {
        let mut ids = UserTypeTable::new();
        ids.register::<Animal>(1).unwrap();
        ids.register::<Dog>(2).unwrap();
        ids.register::<Kennel>(3).unwrap();
        ids.register::<Rgb>(4).unwrap();
        ids.register::<NoDefault>(5).unwrap();
        ids.register::<Node>(6).unwrap();
        ids.register::<Sealed>(7).unwrap();
        PortableCodec::new(ids)
    }

    fn contact_codecs() -> (PortableCodec, PortableCodec) {
        let mut old = UserTypeTable::new();
        old.register::<v1::Contact>(100).unwrap();
        let mut new = UserTypeTable::new();
        new.register::<v3::Contact>(100).unwrap();
        (PortableCodec::new(old), PortableCodec::new(new))
    }

    fn contact_v3() -> v3::Contact {
        v3::Contact {
            a_name: "Ada".into(),
            b_age: 36,
            c_email: Some("ada@example.org".into()),
            d_tags: vec!["math".into(), "engines".into()],
            rest: None,
        }
    }

    #[test]
    fn round_trip_with_base() {
        let codec = codec();
        let dog = Dog {
            animal: Animal {
                name: "Rex".into(),
                legs: 4,
            },
            breed: "collie".into(),
            cached_bark: Some("woof".into()),
        };
        let back: Dog = codec.from_bytes_as(&codec.to_bytes(&dog).unwrap()).unwrap();
        assert_eq!(back.animal, dog.animal);
        assert_eq!(back.breed, "collie");
        assert_eq!(back.cached_bark, None);
    }

    #[test]
    fn base_record_reads_as_the_ancestor() {
        let codec = codec();
        let dog = Dog {
            animal: Animal {
                name: "Laika".into(),
                legs: 4,
            },
            breed: "mongrel".into(),
            cached_bark: None,
        };
        let bytes = codec.to_bytes(&dog).unwrap();

        let mut input = stream::ValueReader::new(&bytes);
        assert_eq!(input.read_var_i64().unwrap(), 2);
        let mut record = input.read_record().unwrap();
        let mut nested = record.read_nested(0).unwrap().unwrap();

        let animal = TypeSerializer::new(codec.registry().schema_of::<Animal>().unwrap())
            .read(&mut nested, &codec)
            .unwrap();
        assert_eq!(animal.downcast_ref::<Animal>(), Some(&dog.animal));
    }

    #[test]
    fn every_version_round_trips() {
        let (_, new) = contact_codecs();
        let full = contact_v3();
        for version in 0..=3 {
            let bytes = new.to_bytes_at(&full, version).unwrap();
            let back: v3::Contact = new.from_bytes_as(&bytes).unwrap();
            assert_eq!(back.a_name, full.a_name);
            assert_eq!(back.b_age, full.b_age);
            assert_eq!(back.c_email.is_some(), version >= 2);
            assert_eq!(back.d_tags.len(), if version >= 3 { 2 } else { 0 });
        }
    }

    #[test]
    fn older_reader_keeps_unknown_bytes() {
        let (old, new) = contact_codecs();
        let bytes = new.to_bytes(&contact_v3()).unwrap();

        let seen: v1::Contact = old.from_bytes_as(&bytes).unwrap();
        assert_eq!(seen.a_name, "Ada");
        assert_eq!(seen.b_age, 36);
        let rest = seen.rest.as_ref().unwrap();
        assert_eq!(rest.origin_version(), 3);
        assert!(!rest.is_empty());

        // An untouched pass-through is byte-identical.
        assert_eq!(old.to_bytes(&seen).unwrap(), bytes);

        // Edits to known fields keep the unknown ones.
        let mut edited = seen.clone();
        edited.b_age = 37;
        let back: v3::Contact = new.from_bytes_as(&old.to_bytes(&edited).unwrap()).unwrap();
        assert_eq!(back.b_age, 37);
        assert_eq!(back.c_email, contact_v3().c_email);
        assert_eq!(back.d_tags, contact_v3().d_tags);
    }

    #[test]
    fn forced_downgrade_drops_unknown_bytes() {
        let (old, new) = contact_codecs();
        let seen: v1::Contact = old.from_bytes_as(&new.to_bytes(&contact_v3()).unwrap()).unwrap();

        let bytes = old.to_bytes_at(&seen, 0).unwrap();
        let back: v3::Contact = new.from_bytes_as(&bytes).unwrap();
        assert_eq!(back.a_name, "Ada");
        assert_eq!(back.c_email, None);
        assert!(back.d_tags.is_empty());
        assert_eq!(back.rest.unwrap().origin_version(), 0);
    }

    #[test]
    fn newer_reader_defaults_missing_fields() {
        let (old, new) = contact_codecs();
        let v1 = v1::Contact {
            a_name: "Grace".into(),
            b_age: 85,
            rest: None,
        };
        let back: v3::Contact = new.from_bytes_as(&old.to_bytes(&v1).unwrap()).unwrap();
        assert_eq!(back.a_name, "Grace");
        assert_eq!(back.c_email, None);
        assert!(back.d_tags.is_empty());
        let rest = back.rest.unwrap();
        assert_eq!(rest.origin_version(), 0);
        assert!(rest.is_empty());
    }

    #[test]
    fn writing_at_an_older_version() {
        let (_, new) = contact_codecs();
        let bytes = new.to_bytes_at(&contact_v3(), 2).unwrap();
        let back: v3::Contact = new.from_bytes_as(&bytes).unwrap();
        assert_eq!(back.c_email, contact_v3().c_email);
        assert!(back.d_tags.is_empty());
        assert_eq!(back.rest.map(|r| r.origin_version()), Some(2));
    }

    #[test]
    fn nested_and_dynamic_objects() {
        let codec = codec();
        let kennel = Kennel {
            resident: Some(Dog {
                breed: "pug".into(),
                ..Default::default()
            }),
            anything: Some(Box::new(Rgb { packed: 0x00ff_8800 })),
            scores: vec![1, -2, 3],
        };
        let back: Kennel = codec.from_bytes_as(&codec.to_bytes(&kennel).unwrap()).unwrap();
        assert_eq!(back.resident.unwrap().breed, "pug");
        let anything = back.anything.unwrap();
        assert_eq!(anything.downcast_ref::<Rgb>(), Some(&Rgb { packed: 0x00ff_8800 }));
        assert_eq!(back.scores, [1, -2, 3]);
    }

    #[test]
    fn wrong_nested_type_is_a_field_failure() {
        let codec = codec();
        // `Kennel::resident` expects a `Dog`; feed it an `Animal` by hand.
        let mut out = ValueWriter::new();
        out.write_var_i64(3);
        let mut record = stream::RecordWriter::new(0);
        record
            .write_property(2, |w| {
                w.write_bool(true);
                codec.write_object(w, &Animal::default())
            })
            .unwrap();
        record.finish_into(&mut out);

        let err = codec.from_bytes(out.as_bytes()).unwrap_err();
        assert_eq!(err.operation(), Operation::Deserialize);
        assert!(err.type_name().ends_with("Kennel"));
        assert!(matches!(
            err.kind(),
            SchemaError::FieldAccessFailure {
                field: "resident",
                source: ValueError::ObjectType { .. },
                ..
            }
        ));
    }

    #[test]
    fn deserialize_as_checks_the_type() {
        let codec = codec();
        let bytes = codec.to_bytes(&Animal::default()).unwrap();
        let err = codec.from_bytes_as::<Dog>(&bytes).unwrap_err();
        assert!(matches!(err.kind(), SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn unknown_ids_and_types() {
        let codec = codec();
        let err = codec.from_bytes(&[0x7e, 0, 0]).unwrap_err();
        assert!(matches!(err.kind(), SchemaError::UnknownType(TypeKey::Id(63))));

        let err = PortableCodec::new(UserTypeTable::new())
            .to_bytes(&Animal::default())
            .unwrap_err();
        assert_eq!(err.operation(), Operation::Serialize);
        assert!(matches!(err.kind(), SchemaError::UnknownType(TypeKey::Type(_))));
    }

    #[test]
    fn missing_default_is_an_instantiation_failure() {
        let codec = codec();
        let bytes = codec.to_bytes(&NoDefault { value: 1 }).unwrap();
        let err = codec.from_bytes(&bytes).unwrap_err();
        assert!(matches!(err.kind(), SchemaError::InstantiationFailure { .. }));
    }

    #[test]
    fn nesting_is_bounded() {
        let mut ids = UserTypeTable::new();
        ids.register::<Node>(6).unwrap();
        let codec = PortableCodec::with_config(
            ids,
            CodecConfig {
                max_nesting_depth: 3,
                ..Default::default()
            },
        );

        let chain = |len: usize| {
            (0..len).fold(Node::default(), |next, _| Node {
                next: Some(Box::new(next)),
            })
        };
        assert!(codec.to_bytes(&chain(3)).is_ok());
        let err = codec.to_bytes(&chain(4)).unwrap_err();
        let mut kind = err.kind();
        while let SchemaError::Nested { source, .. } = kind {
            kind = source;
        }
        assert!(matches!(kind, SchemaError::NestingTooDeep { limit: 3 }));
    }

    #[test]
    fn raised_versions_are_written() {
        let codec = codec();
        assert!(codec.raise_version::<Animal>(5).unwrap());
        let bytes = codec.to_bytes(&Animal::default()).unwrap();
        // id 1 (zigzag), then the record version.
        assert_eq!(&bytes[..2], &[2, 5]);
        let _: Animal = codec.from_bytes_as(&bytes).unwrap();
    }

    #[test]
    fn raising_an_unknown_type_is_a_codec_error() {
        let err = PortableCodec::new(UserTypeTable::new())
            .raise_version::<Animal>(2)
            .unwrap_err();
        assert_eq!(err.operation(), Operation::RaiseVersion);
        assert!(err.type_name().ends_with("Animal"));
        assert!(matches!(err.kind(), SchemaError::UnknownType(TypeKey::Type(_))));
    }

    #[test]
    fn unwritable_remainder_is_a_conflict() {
        let codec = codec();
        let bytes = codec.to_bytes(&Sealed).unwrap();
        let err = codec.from_bytes(&bytes).unwrap_err();
        assert_eq!(err.operation(), Operation::Deserialize);
        assert!(matches!(
            err.kind(),
            SchemaError::SchemaConflict { type_name: "tests::Sealed", .. }
        ));
    }

    #[test]
    fn dynamic_objects_debug_as_their_type() {
        let codec = codec();
        let object = codec.from_bytes(&codec.to_bytes(&Animal::default()).unwrap()).unwrap();
        assert!(format!("{object:?}").ends_with("Animal>"));
    }

    #[test]
    fn remainder_defaults_to_none_without_a_record() {
        assert_eq!(RemainderValue::default().payload(), None);
    }
}
