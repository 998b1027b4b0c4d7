//! Process-wide cache of type schemas.
//!
//! Schemas are created lazily on first use and published under three keys:
//! the Rust type, the user type id and the external type name. Publication
//! is first-writer-wins: each type is scanned at most once, even when many
//! threads ask for it at the same time, and a published schema is never
//! replaced.

use core::any::TypeId;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use vc_utils::TypeIdMap;
use vc_utils::hash::HashMap;

use crate::error::{SchemaError, SchemaResult, TypeKey};
use crate::info::PortableInfo;
use crate::portable::PortableType;
use crate::schema::{SchemaDescriptor, TypeSchema, scan};

// -----------------------------------------------------------------------------
// Modules

mod ids;

// -----------------------------------------------------------------------------
// Exports

pub use ids::{UserTypeIds, UserTypeTable};

/// Longest accepted chain of embedded ancestors.
pub const DEFAULT_MAX_INHERITANCE_DEPTH: usize = 64;

// -----------------------------------------------------------------------------
// TypeRegistry

#[derive(Default)]
struct Tables {
    by_type: TypeIdMap<Arc<TypeSchema>>,
    by_id: HashMap<i32, Arc<TypeSchema>>,
    by_name: HashMap<&'static str, Arc<TypeSchema>>,
}

struct RegistryInner {
    ids: Box<dyn UserTypeIds>,
    tables: RwLock<Tables>,
    /// One lock per type currently being scanned.
    in_flight: Mutex<TypeIdMap<Arc<Mutex<()>>>>,
    scans: AtomicUsize,
    max_inheritance_depth: usize,
}

/// Shared, thread-safe schema cache.
///
/// Cloning is cheap and yields a handle to the same cache.
#[derive(Clone)]
pub struct TypeRegistry {
    inner: Arc<RegistryInner>,
}

impl TypeRegistry {
    pub fn new(ids: impl UserTypeIds) -> Self {
        Self::with_inheritance_limit(ids, DEFAULT_MAX_INHERITANCE_DEPTH)
    }

    pub fn with_inheritance_limit(ids: impl UserTypeIds, max_inheritance_depth: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                ids: Box::new(ids),
                tables: RwLock::new(Tables::default()),
                in_flight: Mutex::new(TypeIdMap::new()),
                scans: AtomicUsize::new(0),
                max_inheritance_depth,
            }),
        }
    }

    #[inline]
    pub fn ids(&self) -> &dyn UserTypeIds {
        self.inner.ids.as_ref()
    }

    /// Number of schemas scanned so far, failed scans included.
    #[inline]
    pub fn scan_count(&self) -> usize {
        self.inner.scans.load(Ordering::Relaxed)
    }

    /// Number of published schemas.
    pub fn len(&self) -> usize {
        self.read_tables(|tables| tables.by_type.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_tables<R>(&self, f: impl FnOnce(&Tables) -> R) -> R {
        f(&self
            .inner
            .tables
            .read()
            .unwrap_or_else(PoisonError::into_inner))
    }

    fn cached(&self, type_id: TypeId) -> Option<Arc<TypeSchema>> {
        self.read_tables(|tables| tables.by_type.get(&type_id).cloned())
    }

    /// Returns the schema of `info`, scanning and publishing it (and its
    /// ancestors) on first use.
    pub fn ensure_schema(&self, info: &'static PortableInfo) -> SchemaResult<Arc<TypeSchema>> {
        if let Some(schema) = self.cached(info.type_id()) {
            return Ok(schema);
        }
        self.check_ancestry(info)?;
        self.ensure_uncached(info)
    }

    /// Schema of `T`.
    #[inline]
    pub fn schema_of<T: PortableType>(&self) -> SchemaResult<Arc<TypeSchema>> {
        self.ensure_schema(T::type_info())
    }

    /// Rejects cyclic or overly deep ancestor chains before any lock is
    /// taken.
    fn check_ancestry(&self, info: &'static PortableInfo) -> SchemaResult<()> {
        let limit = self.inner.max_inheritance_depth;
        let mut seen = vec![info.type_id()];
        let mut current = info;
        while let Some(base) = current.base() {
            if seen.contains(&base.type_id()) {
                return Err(SchemaError::conflict(
                    info.type_path(),
                    format!("cyclic base chain through `{}`", base.type_path()),
                ));
            }
            if seen.len() > limit {
                return Err(SchemaError::conflict(
                    info.type_path(),
                    format!("base chain is deeper than {limit}"),
                ));
            }
            seen.push(base.type_id());
            current = base;
        }
        Ok(())
    }

    fn ensure_uncached(&self, info: &'static PortableInfo) -> SchemaResult<Arc<TypeSchema>> {
        if let Some(schema) = self.cached(info.type_id()) {
            return Ok(schema);
        }

        let base = match info.base() {
            Some(base) => Some(self.ensure_uncached(base)?),
            None => None,
        };

        let type_id = info.type_id();
        let id = self.id_of(info)?;

        let slot = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(type_id, Default::default)
            .clone();

        let result = {
            let _guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
            match self.cached(type_id) {
                Some(schema) => Ok(schema),
                None => self.scan_and_publish(info, id, base),
            }
        };

        self.inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&type_id);

        result
    }

    fn scan_and_publish(
        &self,
        info: &'static PortableInfo,
        id: i32,
        base: Option<Arc<TypeSchema>>,
    ) -> SchemaResult<Arc<TypeSchema>> {
        self.inner.scans.fetch_add(1, Ordering::Relaxed);
        let schema = Arc::new(scan(info, id, base)?);

        let mut tables = self
            .inner
            .tables
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = tables.by_type.get(&info.type_id()) {
            return Ok(existing.clone());
        }
        if let Some(other) = tables.by_id.get(&id) {
            return Err(SchemaError::conflict(
                info.type_path(),
                format!("user type {id} is already bound to `{}`", other.type_path()),
            ));
        }
        if let Some(other) = tables.by_name.get(info.type_name()) {
            return Err(SchemaError::conflict(
                info.type_path(),
                format!(
                    "name `{}` is already bound to `{}`",
                    info.type_name(),
                    other.type_path()
                ),
            ));
        }

        tables.by_type.insert(info.type_id(), schema.clone());
        tables.by_id.insert(id, schema.clone());
        tables.by_name.insert(info.type_name(), schema.clone());

        log::debug!(
            "published schema of `{}` as user type {id} at version {}",
            info.type_path(),
            schema.active_version()
        );
        Ok(schema)
    }

    /// User type id of `info`, straight from the id source.
    pub fn id_of(&self, info: &PortableInfo) -> SchemaResult<i32> {
        self.inner
            .ids
            .id_of(info.type_id())
            .ok_or(SchemaError::UnknownType(TypeKey::Type(info.type_path())))
    }

    /// Schema of the type registered under `id`.
    pub fn lookup_by_id(&self, id: i32) -> SchemaResult<Arc<TypeSchema>> {
        if let Some(schema) = self.read_tables(|tables| tables.by_id.get(&id).cloned()) {
            return Ok(schema);
        }
        match self.inner.ids.info_of(id) {
            Some(info) => self.ensure_schema(info),
            None => Err(SchemaError::UnknownType(TypeKey::Id(id))),
        }
    }

    /// Schema of the type with external name `name`.
    pub fn lookup_by_name(&self, name: &str) -> SchemaResult<Arc<TypeSchema>> {
        if let Some(schema) = self.read_tables(|tables| tables.by_name.get(name).cloned()) {
            return Ok(schema);
        }
        match self.inner.ids.id_of_name(name) {
            Some(id) => self.lookup_by_id(id),
            None => Err(SchemaError::UnknownType(TypeKey::Name(name.into()))),
        }
    }

    /// Raises the active version of `info`'s schema.
    ///
    /// Returns `true` if the version changed.
    pub fn raise_version(&self, info: &'static PortableInfo, version: u32) -> SchemaResult<bool> {
        Ok(self.ensure_schema(info)?.raise_version(version))
    }

    /// Descriptors of every published schema, ordered by user type id.
    pub fn describe_all(&self) -> Vec<SchemaDescriptor> {
        let mut schemas: Vec<_> = self.read_tables(|tables| tables.by_id.values().cloned().collect());
        schemas.sort_by_key(|schema| schema.user_type_id());
        schemas.iter().map(|schema| schema.describe()).collect()
    }
}

impl core::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("schemas", &self.len())
            .field("scans", &self.scan_count())
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{TypeRegistry, UserTypeTable};
    use crate::error::{SchemaError, TypeKey};
    use crate::info::{InfoCell, PortableInfo};
    use crate::value::{Value, ValueError};
    use crate::{Portable, PortableType};

    #[derive(Portable, Default)]
    #[portable(default)]
    struct Animal {
        name: String,
    }

    #[derive(Portable, Default)]
    #[portable(default)]
    struct Dog {
        #[portable(base)]
        animal: Animal,
        good: bool,
    }

    #[derive(Portable, Default)]
    #[portable(default)]
    struct Beagle {
        #[portable(base)]
        dog: Dog,
        nose: u8,
    }

    // Hand-written pair whose infos name each other as base.
    macro_rules! looped_type {
        ($name:ident, $base:ident) => {
            struct $name;

            impl PortableType for $name {
                fn type_info() -> &'static PortableInfo {
                    static CELL: InfoCell = InfoCell::new();
                    CELL.get_or_init(|| {
                        PortableInfo::new::<$name>(
                            concat!("tests::", stringify!($name)),
                            stringify!($name),
                            Vec::new(),
                        )
                        .with_base::<$base>()
                    })
                }
            }

            impl Portable for $name {
                fn portable_info(&self) -> &'static PortableInfo {
                    Self::type_info()
                }

                fn field_value(&self, _: usize) -> Option<Value<'_>> {
                    None
                }

                fn set_field_value(&mut self, position: usize, _: Value<'static>) -> Result<(), ValueError> {
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
        };
    }

    looped_type!(Ping, Pong);
    looped_type!(Pong, Ping);

    #[derive(Portable, Default)]
    #[portable(default)]
    struct Unlisted {
        value: u8,
    }

    fn registry() -> TypeRegistry {
        let mut ids = UserTypeTable::new();
        ids.register::<Animal>(10).unwrap();
        ids.register::<Dog>(11).unwrap();
        TypeRegistry::new(ids)
    }

    #[test]
    fn concurrent_first_use_scans_once() {
        let registry = registry();
        let schemas: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| registry.schema_of::<Animal>().unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(registry.scan_count(), 1);
        assert!(schemas.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn ancestors_are_published_first() {
        let registry = registry();
        let dog = registry.schema_of::<Dog>().unwrap();
        assert_eq!(registry.len(), 2);
        let animal = registry.lookup_by_id(10).unwrap();
        assert!(Arc::ptr_eq(dog.base().unwrap(), &animal));
        assert!(Arc::ptr_eq(&registry.lookup_by_name("Dog").unwrap(), &dog));
    }

    #[test]
    fn lookups_fall_back_to_ids() {
        let registry = registry();
        assert!(registry.is_empty());
        assert_eq!(registry.lookup_by_name("Animal").unwrap().user_type_id(), 10);
        assert_eq!(registry.scan_count(), 1);
    }

    #[test]
    fn unknown_types() {
        let registry = registry();
        assert!(matches!(
            registry.lookup_by_id(99),
            Err(SchemaError::UnknownType(TypeKey::Id(99)))
        ));
        assert!(registry.id_of(Unlisted::type_info()).is_err());
        assert!(matches!(
            registry.ensure_schema(Unlisted::type_info()),
            Err(SchemaError::UnknownType(TypeKey::Type(_)))
        ));
        assert!(matches!(
            registry.lookup_by_name("Cat"),
            Err(SchemaError::UnknownType(TypeKey::Name(name))) if name == "Cat"
        ));
    }

    #[test]
    fn deep_base_chains_are_conflicts() {
        let mut ids = UserTypeTable::new();
        ids.register::<Animal>(10).unwrap();
        ids.register::<Dog>(11).unwrap();
        ids.register::<Beagle>(12).unwrap();
        let registry = TypeRegistry::with_inheritance_limit(ids, 1);

        assert!(matches!(
            registry.schema_of::<Beagle>(),
            Err(SchemaError::SchemaConflict { reason, .. }) if reason.contains("deeper than 1")
        ));
        assert_eq!(registry.scan_count(), 0);
        assert!(registry.schema_of::<Dog>().is_ok());
        assert!(matches!(
            registry.lookup_by_id(12),
            Err(SchemaError::SchemaConflict { .. })
        ));
    }

    #[test]
    fn cyclic_base_chains_are_conflicts() {
        let mut ids = UserTypeTable::new();
        ids.register::<Ping>(20).unwrap();
        ids.register::<Pong>(21).unwrap();
        let registry = TypeRegistry::new(ids);

        assert!(matches!(
            registry.schema_of::<Ping>(),
            Err(SchemaError::SchemaConflict { type_name: "tests::Ping", reason })
                if reason.contains("cyclic")
        ));
        assert!(registry.is_empty());
        assert_eq!(registry.scan_count(), 0);
    }

    #[test]
    fn raising_is_monotonic() {
        let registry = registry();
        let info = Animal::type_info();
        assert!(registry.raise_version(info, 3).unwrap());
        assert!(!registry.raise_version(info, 2).unwrap());
        assert_eq!(registry.schema_of::<Animal>().unwrap().active_version(), 3);
    }

    #[test]
    fn describe_all_is_ordered() {
        let registry = registry();
        registry.schema_of::<Dog>().unwrap();
        let all = registry.describe_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].type_name, "Animal");
        assert_eq!(all[1].base.as_ref().unwrap().type_name, "Animal");
        let json = serde_json::to_value(&all[1]).unwrap();
        assert_eq!(json["versions"][0]["fields"][0]["name"], "good");
    }
}
