use core::any::TypeId;

use vc_utils::TypeIdMap;
use vc_utils::hash::HashMap;

use crate::error::{SchemaError, SchemaResult};
use crate::info::PortableInfo;
use crate::portable::PortableType;

// -----------------------------------------------------------------------------
// UserTypeIds

/// Source of the integer ids that tag top-level and nested objects on the
/// wire.
///
/// Ids are assigned by the application and must agree between peers.
pub trait UserTypeIds: Send + Sync + 'static {
    fn id_of(&self, type_id: TypeId) -> Option<i32>;

    fn info_of(&self, id: i32) -> Option<&'static PortableInfo>;

    fn name_of(&self, id: i32) -> Option<&'static str> {
        self.info_of(id).map(PortableInfo::type_name)
    }

    /// Id of the type with external name `name`.
    fn id_of_name(&self, name: &str) -> Option<i32>;
}

// -----------------------------------------------------------------------------
// UserTypeTable

/// In-memory [`UserTypeIds`] filled at startup.
///
/// ```
/// use vc_portable::{Portable, UserTypeIds, UserTypeTable};
///
/// #[derive(Portable, Default)]
/// #[portable(default)]
/// struct Point { x: i32, y: i32 }
///
/// let mut ids = UserTypeTable::new();
/// ids.register::<Point>(7)?;
/// assert_eq!(ids.id_of_name("Point"), Some(7));
/// assert!(ids.register::<Point>(8).is_err());
/// # Ok::<_, vc_portable::SchemaError>(())
/// ```
#[derive(Default)]
pub struct UserTypeTable {
    by_type: TypeIdMap<i32>,
    by_id: HashMap<i32, &'static PortableInfo>,
    by_name: HashMap<&'static str, i32>,
}

impl UserTypeTable {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: PortableType>(&mut self, id: i32) -> SchemaResult<()> {
        self.register_info(id, T::type_info())
    }

    /// Binds `id` to `info`.
    ///
    /// Ids, types and external names are all one-to-one; re-registering the
    /// same pair is accepted.
    pub fn register_info(&mut self, id: i32, info: &'static PortableInfo) -> SchemaResult<()> {
        let type_name = info.type_path();

        if let Some(&existing) = self.by_type.get(&info.type_id()) {
            if existing == id {
                return Ok(());
            }
            return Err(SchemaError::conflict(
                type_name,
                format!("already registered as user type {existing}, not {id}"),
            ));
        }
        if let Some(other) = self.by_id.get(&id) {
            return Err(SchemaError::conflict(
                type_name,
                format!("user type {id} is taken by `{}`", other.type_path()),
            ));
        }
        if let Some(other) = self.by_name.get(info.type_name()) {
            return Err(SchemaError::conflict(
                type_name,
                format!(
                    "name `{}` is taken by user type {other}",
                    info.type_name()
                ),
            ));
        }

        self.by_type.insert(info.type_id(), id);
        self.by_id.insert(id, info);
        self.by_name.insert(info.type_name(), id);
        log::trace!("registered `{type_name}` as user type {id}");
        Ok(())
    }

    /// Registers every type declared with `#[portable(user_type = .., auto_register)]`.
    #[cfg(feature = "auto_register")]
    pub fn auto_register(&mut self) -> SchemaResult<usize> {
        let mut count = 0;
        for entry in crate::__macro_exports::registrations() {
            self.register_info(entry.id, (entry.info)())?;
            count += 1;
        }
        log::debug!("auto-registered {count} portable type(s)");
        Ok(count)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl UserTypeIds for UserTypeTable {
    #[inline]
    fn id_of(&self, type_id: TypeId) -> Option<i32> {
        self.by_type.get(&type_id).copied()
    }

    #[inline]
    fn info_of(&self, id: i32) -> Option<&'static PortableInfo> {
        self.by_id.get(&id).copied()
    }

    #[inline]
    fn id_of_name(&self, name: &str) -> Option<i32> {
        self.by_name.get(name).copied()
    }
}

impl core::fmt::Debug for UserTypeTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map()
            .entries(self.by_id.iter().map(|(id, info)| (id, info.type_path())))
            .finish()
    }
}
