use std::sync::Arc;

use crate::codec::resolve;
use crate::error::{SchemaError, SchemaResult};
use crate::info::{FieldFlags, PortableInfo};
use crate::schema::{Candidate, RemainderSlot, TypeSchema};

/// Derives the schema of `info`.
///
/// `base` must be the already published schema of `info.base()`, if any.
/// Types with a custom codec skip field discovery entirely.
pub(crate) fn scan(
    info: &'static PortableInfo,
    user_type_id: i32,
    base: Option<Arc<TypeSchema>>,
) -> SchemaResult<TypeSchema> {
    let type_name = info.type_path();

    if let Some(custom) = info.custom() {
        if info.base().is_some() {
            return Err(SchemaError::conflict(
                type_name,
                "a type with a custom codec cannot embed a base type",
            ));
        }
        let version = info.version().unwrap_or(0);
        return Ok(TypeSchema::new(
            info,
            user_type_id,
            version,
            Box::new([]),
            None,
            Some(custom),
            None,
        ));
    }

    let mut candidates = Vec::with_capacity(info.fields().len());
    let mut remainder: Option<RemainderSlot> = None;
    let mut base_field: Option<&'static str> = None;

    for field in info.fields() {
        let flags = field.flags();

        if flags.contains(FieldFlags::REMAINDER) {
            if let Some(first) = remainder {
                return Err(SchemaError::conflict(
                    type_name,
                    format!(
                        "fields `{}` and `{}` are both remainder fields",
                        first.name,
                        field.name()
                    ),
                ));
            }
            remainder = Some(RemainderSlot {
                position: field.position(),
                name: field.name(),
            });
            continue;
        }

        if flags.contains(FieldFlags::BASE) {
            if let Some(first) = base_field {
                return Err(SchemaError::conflict(
                    type_name,
                    format!("fields `{first}` and `{}` are both base fields", field.name()),
                ));
            }
            base_field = Some(field.name());
            continue;
        }

        if flags.intersects(FieldFlags::EXCLUDED) {
            log::trace!("`{type_name}`: skipping field `{}` ({flags:?})", field.name());
            continue;
        }

        let Some(shape) = field.shape() else {
            return Err(SchemaError::UnsupportedFieldType {
                type_name,
                field: field.name(),
                value_type: field.value_type(),
            });
        };

        candidates.push(Candidate {
            position: field.position(),
            name: field.effective_name(),
            declared_name: field.name(),
            value_type: field.value_type(),
            since: field.since().unwrap_or(0),
            codec: Arc::new(resolve(&shape, field.preferred().as_ref())),
        });
    }

    match (info.base(), base_field, &base) {
        (None, None, None) => {}
        (Some(expected), Some(_), Some(schema)) => {
            if schema.info().type_id() != expected.type_id() {
                return Err(SchemaError::conflict(
                    type_name,
                    format!(
                        "base schema `{}` does not match the declared base `{}`",
                        schema.type_path(),
                        expected.type_path()
                    ),
                ));
            }
            if schema.uses_custom_codec() {
                return Err(SchemaError::conflict(
                    type_name,
                    format!("base type `{}` uses a custom codec", schema.type_path()),
                ));
            }
        }
        (Some(expected), None, _) => {
            return Err(SchemaError::conflict(
                type_name,
                format!("base type `{}` has no base field", expected.type_path()),
            ));
        }
        (None, Some(field), _) => {
            return Err(SchemaError::conflict(
                type_name,
                format!("base field `{field}` without a declared base type"),
            ));
        }
        (Some(expected), Some(_), None) => {
            return Err(SchemaError::conflict(
                type_name,
                format!("base type `{}` was not resolved", expected.type_path()),
            ));
        }
        (None, None, Some(schema)) => {
            return Err(SchemaError::conflict(
                type_name,
                format!("unexpected base schema `{}`", schema.type_path()),
            ));
        }
    }

    candidates.sort_by(|a, b| a.name.cmp(b.name).then(a.position.cmp(&b.position)));

    if let Some(pair) = candidates.windows(2).find(|pair| pair[0].name == pair[1].name) {
        return Err(SchemaError::conflict(
            type_name,
            format!(
                "fields `{}` and `{}` share the name `{}`",
                pair[0].declared_name, pair[1].declared_name, pair[0].name
            ),
        ));
    }

    warn_on_interleaving(type_name, &candidates);

    let max_since = candidates.iter().map(|c| c.since).max().unwrap_or(0);
    let detected = info.version().unwrap_or(max_since);

    log::trace!(
        "scanned `{type_name}`: {} field(s), detected version {detected}",
        candidates.len()
    );

    Ok(TypeSchema::new(
        info,
        user_type_id,
        detected,
        candidates.into_boxed_slice(),
        remainder,
        None,
        base,
    ))
}

/// A later field sorting before an earlier one shifts indices between
/// versions, which breaks readers of the older version.
fn warn_on_interleaving(type_name: &str, candidates: &[Candidate]) {
    let mut latest: Option<&Candidate> = None;
    for candidate in candidates {
        match latest {
            Some(prev) if prev.since > candidate.since => {
                log::warn!(
                    "`{type_name}`: field `{}` (since {}) sorts before `{}` (since {}); \
                     indices differ between versions",
                    prev.name,
                    prev.since,
                    candidate.name,
                    candidate.since
                );
                return;
            }
            Some(prev) if prev.since == candidate.since => {}
            _ => latest = Some(candidate),
        }
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::scan;
    use crate::error::SchemaError;
    use crate::info::{DeclaredField, FieldFlags, InfoCell, PortableInfo};
    use crate::portable::{Portable, PortableType};
    use crate::value::{Value, ValueError};

    macro_rules! bare_type {
        ($name:ident, $info:expr) => {
            #[derive(Default)]
            struct $name;

            impl Portable for $name {
                fn portable_info(&self) -> &'static PortableInfo {
                    <$name as PortableType>::type_info()
                }
                fn field_value(&self, _: usize) -> Option<Value<'_>> {
                    None
                }
                fn set_field_value(&mut self, n: usize, _: Value<'static>) -> Result<(), ValueError> {
                    Err(ValueError::NoSuchField(n))
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

            impl PortableType for $name {
                fn type_info() -> &'static PortableInfo {
                    static CELL: InfoCell = InfoCell::new();
                    CELL.get_or_init(|| $info)
                }
            }
        };
    }

    bare_type!(
        Person,
        PortableInfo::new::<Person>(
            "tests::Person",
            "Person",
            vec![
                DeclaredField::new::<String>("name", 0),
                DeclaredField::new::<u32>("age", 1),
                DeclaredField::new::<String>("email", 2).with_since(1),
                DeclaredField::new::<u64>("cache", 3).with_flags(FieldFlags::TRANSIENT),
            ],
        )
    );

    bare_type!(
        Pinned,
        PortableInfo::new::<Pinned>(
            "tests::Pinned",
            "Pinned",
            vec![
                DeclaredField::new::<u8>("a", 0),
                DeclaredField::new::<u8>("b", 1).with_since(1),
                DeclaredField::new::<u8>("c", 2).with_since(2),
            ],
        )
        .with_version(1)
    );

    bare_type!(
        Clash,
        PortableInfo::new::<Clash>(
            "tests::Clash",
            "Clash",
            vec![
                DeclaredField::new::<u8>("a", 0),
                DeclaredField::new::<u8>("b", 1).with_rename("a"),
            ],
        )
    );

    bare_type!(
        Opaque,
        PortableInfo::new::<Opaque>(
            "tests::Opaque",
            "Opaque",
            vec![DeclaredField::opaque("handle", 0, "Handle")],
        )
    );

    bare_type!(
        Orphan,
        PortableInfo::new::<Orphan>(
            "tests::Orphan",
            "Orphan",
            vec![DeclaredField::opaque("parent", 0, "Parent").with_flags(FieldFlags::BASE)],
        )
    );

    fn names(fields: &[crate::FieldSlot]) -> Vec<(&'static str, u32)> {
        fields.iter().map(|f| (f.name(), f.index())).collect()
    }

    #[test]
    fn buckets_follow_name_order() {
        let schema = scan(Person::type_info(), 1, None).unwrap();
        assert_eq!(schema.detected_version(), 1);
        assert_eq!(schema.active_version(), 1);
        assert_eq!(names(&schema.fields_for(0)), [("age", 1), ("name", 2)]);
        assert_eq!(
            names(&schema.fields_for(1)),
            [("age", 1), ("email", 2), ("name", 3)]
        );
        assert_eq!(names(&schema.fields_for(7)), names(&schema.fields_for(1)));
    }

    #[test]
    fn scanning_is_deterministic() {
        let a = scan(Person::type_info(), 1, None).unwrap();
        let b = scan(Person::type_info(), 1, None).unwrap();
        for v in 0..3 {
            assert_eq!(names(&a.fields_for(v)), names(&b.fields_for(v)));
        }
    }

    #[test]
    fn explicit_version_defers_later_fields() {
        let schema = scan(Pinned::type_info(), 2, None).unwrap();
        assert_eq!(schema.detected_version(), 1);
        assert_eq!(schema.built_buckets(), 2);
        assert_eq!(names(&schema.fields_for(1)), [("a", 1), ("b", 2)]);

        let before = schema.fields_for(1);
        assert!(schema.raise_version(2));
        assert!(!schema.raise_version(1));
        assert_eq!(schema.active_version(), 2);
        assert_eq!(schema.built_buckets(), 3);
        assert!(Arc::ptr_eq(&before, &schema.fields_for(1)));
        assert_eq!(names(&schema.fields_for(2)), [("a", 1), ("b", 2), ("c", 3)]);
    }

    #[test]
    fn conflicts_are_rejected() {
        assert!(matches!(
            scan(Clash::type_info(), 3, None),
            Err(SchemaError::SchemaConflict { .. })
        ));
        assert!(matches!(
            scan(Opaque::type_info(), 4, None),
            Err(SchemaError::UnsupportedFieldType { field: "handle", .. })
        ));
        assert!(matches!(
            scan(Orphan::type_info(), 5, None),
            Err(SchemaError::SchemaConflict { .. })
        ));
    }

    #[test]
    fn describe_lists_versions() {
        let schema = scan(Person::type_info(), 9, None).unwrap();
        let desc = schema.describe();
        assert_eq!(desc.user_type_id, 9);
        assert_eq!(desc.versions.len(), 2);
        assert_eq!(desc.versions[1].fields[1].name, "email");
        assert_eq!(desc.versions[1].fields[1].since, 1);
    }

    #[test]
    fn describe_is_bounded_by_distinct_buckets() {
        let schema = scan(Person::type_info(), 9, None).unwrap();
        assert!(schema.raise_version(u32::MAX));
        assert_eq!(schema.built_buckets(), 2);
        let desc = schema.describe();
        assert_eq!(desc.active_version, u32::MAX);
        assert_eq!(desc.versions.len(), 2);
        assert_eq!(desc.versions[1].version, 1);

        let pinned = scan(Pinned::type_info(), 2, None).unwrap();
        assert_eq!(pinned.describe().versions.len(), 2);
        pinned.raise_version(40);
        assert_eq!(pinned.describe().versions.len(), 3);
    }
}
