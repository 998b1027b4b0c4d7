use std::sync::Arc;

use vc_stream::{RecordReader, RecordWriter};

use crate::error::{SchemaError, SchemaResult};
use crate::portable::{ObjectCodec, Portable};
use crate::remainder::RemainderValue;
use crate::schema::{FieldSlot, TypeSchema};
use crate::value::ValueError;

/// Index of the nested record holding the embedded ancestor.
const BASE_INDEX: u32 = 0;

// -----------------------------------------------------------------------------
// TypeSerializer

/// Writes and reads the record of one type against its [`TypeSchema`].
///
/// Objects embedded in fields go through the [`ObjectCodec`] passed to each
/// call, which is how the facade tracks nesting depth.
#[derive(Debug, Clone)]
pub struct TypeSerializer {
    schema: Arc<TypeSchema>,
}

impl TypeSerializer {
    #[inline]
    pub fn new(schema: Arc<TypeSchema>) -> Self {
        Self { schema }
    }

    #[inline]
    pub fn schema(&self) -> &Arc<TypeSchema> {
        &self.schema
    }

    /// Writes `object` into `out`, setting the record version.
    ///
    /// Without `forced`, fields of the active version are written and the
    /// record is tagged with the active version or the captured remainder's
    /// origin, whichever is higher. The remainder bytes follow the fields.
    ///
    /// With `forced`, the record is tagged and filled with exactly that
    /// version. A captured remainder is dropped if `forced` is lower than the
    /// version it may depend on.
    pub fn write(
        &self,
        out: &mut RecordWriter,
        object: &dyn Portable,
        forced: Option<u32>,
        objects: &dyn ObjectCodec,
    ) -> SchemaResult<()> {
        write_record(&self.schema, out, object, forced, objects)
    }

    /// Instantiates an object and fills it from `input`.
    pub fn read(
        &self,
        input: &mut RecordReader<'_>,
        objects: &dyn ObjectCodec,
    ) -> SchemaResult<Box<dyn Portable>> {
        let schema = &self.schema;
        if let Some(custom) = schema.custom() {
            return (custom.read)(input, objects);
        }
        let Some(construct) = schema.info().constructor() else {
            return Err(SchemaError::InstantiationFailure {
                type_name: schema.type_path(),
                reason: "no default constructor",
            });
        };
        let mut object = construct();
        read_record(schema, input, object.as_mut(), objects)?;
        Ok(object)
    }

    /// Fills an existing object from `input`.
    ///
    /// Fields missing from the record keep their current values.
    pub fn read_into(
        &self,
        input: &mut RecordReader<'_>,
        target: &mut dyn Portable,
        objects: &dyn ObjectCodec,
    ) -> SchemaResult<()> {
        if self.schema.uses_custom_codec() {
            return Err(SchemaError::InstantiationFailure {
                type_name: self.schema.type_path(),
                reason: "custom codecs cannot read into an existing object",
            });
        }
        read_record(&self.schema, input, target, objects)
    }
}

// -----------------------------------------------------------------------------
// Write

fn check_type(schema: &TypeSchema, object: &dyn Portable) -> SchemaResult<()> {
    let info = object.portable_info();
    if info.type_id() == schema.info().type_id() {
        Ok(())
    } else {
        Err(SchemaError::TypeMismatch {
            expected: schema.type_path(),
            found: info.type_path(),
        })
    }
}

fn field_error(schema: &TypeSchema, slot: &FieldSlot, source: ValueError) -> SchemaError {
    SchemaError::FieldAccessFailure {
        type_name: schema.type_path(),
        field: slot.declared_name(),
        source,
    }
}

fn write_record(
    schema: &TypeSchema,
    out: &mut RecordWriter,
    object: &dyn Portable,
    forced: Option<u32>,
    objects: &dyn ObjectCodec,
) -> SchemaResult<()> {
    check_type(schema, object)?;

    if let Some(custom) = schema.custom() {
        out.set_version(forced.unwrap_or_else(|| schema.active_version()));
        return (custom.write)(object, out, objects);
    }

    let remainder = schema.remainder_slot().and_then(|_| object.remainder());
    let origin = remainder.map_or(0, RemainderValue::origin_version);
    let unknown = remainder.and_then(RemainderValue::payload);

    let (version, keep_remainder) = match forced {
        None => (schema.active_version().max(origin), true),
        Some(forced) => {
            let keep = forced >= schema.detected_version().max(origin);
            if !keep && let Some(bytes) = unknown {
                log::warn!(
                    "dropping {} unknown byte(s) of `{}` written at version {forced} \
                     (captured at version {origin})",
                    bytes.len(),
                    schema.type_path()
                );
            }
            (forced, keep)
        }
    };
    let bucket = forced.unwrap_or_else(|| schema.active_version());
    out.set_version(version);

    if let Some(base_schema) = schema.base() {
        let Some(base) = object.base() else {
            return Err(SchemaError::conflict(
                schema.type_path(),
                "object does not expose its base value",
            ));
        };
        out.write_nested(BASE_INDEX, |nested| {
            write_record(base_schema, nested, base, None, objects)
        })?;
    }

    for slot in schema.fields_for(bucket).iter() {
        let Some(value) = object.field_value(slot.position()) else {
            return Err(field_error(schema, slot, ValueError::NoSuchField(slot.position())));
        };
        out.write_property(slot.index(), |payload| {
            slot.codec()
                .write(payload, &value, objects)
                .map_err(|e| e.at_field(schema.type_path(), slot.declared_name()))
        })?;
    }

    if keep_remainder && let Some(bytes) = unknown {
        out.write_remainder(bytes)?;
    }

    log::trace!(
        "wrote `{}` at version {version} (fields of version {bucket})",
        schema.type_path()
    );
    Ok(())
}

// -----------------------------------------------------------------------------
// Read

fn read_record(
    schema: &TypeSchema,
    input: &mut RecordReader<'_>,
    target: &mut dyn Portable,
    objects: &dyn ObjectCodec,
) -> SchemaResult<()> {
    check_type(schema, target)?;

    let version = input.version();
    let bucket = version.min(schema.active_version());

    if let Some(base_schema) = schema.base() {
        let Some(base) = target.base_mut() else {
            return Err(SchemaError::conflict(
                schema.type_path(),
                "object does not expose its base value",
            ));
        };
        if let Some(mut nested) = input.read_nested(BASE_INDEX)? {
            read_record(base_schema, &mut nested, base, objects)?;
        }
    }

    for slot in schema.fields_for(bucket).iter() {
        let Some(mut payload) = input.read_property(slot.index())? else {
            continue;
        };
        let value = slot
            .codec()
            .read(&mut payload, objects)
            .map_err(|e| e.at_field(schema.type_path(), slot.declared_name()))?;
        target
            .set_field_value(slot.position(), value)
            .map_err(|source| field_error(schema, slot, source))?;
    }

    if schema.remainder_slot().is_some() {
        let rest = input.read_remainder();
        if !rest.is_empty() {
            log::trace!(
                "`{}`: keeping {} unknown byte(s) of version {version}",
                schema.type_path(),
                rest.len()
            );
        }
        if !target.set_remainder(Some(RemainderValue::capture(version, rest))) {
            return Err(SchemaError::conflict(
                schema.type_path(),
                "remainder field declared but not writable",
            ));
        }
    }

    Ok(())
}
