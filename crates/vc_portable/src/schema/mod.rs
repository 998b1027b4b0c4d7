//! Derived, cached type schemas.
//!
//! A [`TypeSchema`] is produced once per type by the scanner and then shared
//! read-only. The only mutation after publication is raising the active
//! version, which appends field buckets and never rewrites existing ones.

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::codec::FieldCodec;
use crate::info::{CustomHooks, PortableInfo};

// -----------------------------------------------------------------------------
// Modules

mod descriptor;
mod scanner;

// -----------------------------------------------------------------------------
// Exports

pub use descriptor::{FieldDescriptor, SchemaDescriptor, VersionDescriptor};

pub(crate) use scanner::scan;

// -----------------------------------------------------------------------------
// FieldSlot

/// One included field, paired with its index in one version bucket.
#[derive(Debug, Clone)]
pub struct FieldSlot {
    position: usize,
    index: u32,
    name: &'static str,
    declared_name: &'static str,
    value_type: &'static str,
    since: u32,
    codec: Arc<FieldCodec>,
}

impl FieldSlot {
    /// Declaration position, used to reach the field on an instance.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Wire index, starting at 1. Only meaningful together with a version.
    #[inline]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// External name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Name in source.
    #[inline]
    pub fn declared_name(&self) -> &'static str {
        self.declared_name
    }

    #[inline]
    pub fn value_type(&self) -> &'static str {
        self.value_type
    }

    #[inline]
    pub fn since(&self) -> u32 {
        self.since
    }

    #[inline]
    pub fn codec(&self) -> &FieldCodec {
        &self.codec
    }
}

/// An included field before index assignment.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub position: usize,
    pub name: &'static str,
    pub declared_name: &'static str,
    pub value_type: &'static str,
    pub since: u32,
    pub codec: Arc<FieldCodec>,
}

/// Location of the remainder field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemainderSlot {
    pub position: usize,
    pub name: &'static str,
}

// -----------------------------------------------------------------------------
// TypeSchema

/// Schema of one portable type.
pub struct TypeSchema {
    info: &'static PortableInfo,
    user_type_id: i32,
    detected_version: u32,
    active_version: AtomicU32,
    /// Highest `since` among candidates; buckets above it are identical to it.
    max_since: u32,
    /// Sorted by effective name.
    candidates: Box<[Candidate]>,
    buckets: RwLock<Vec<Arc<[FieldSlot]>>>,
    remainder: Option<RemainderSlot>,
    custom: Option<CustomHooks>,
    base: Option<Arc<TypeSchema>>,
}

impl TypeSchema {
    pub(crate) fn new(
        info: &'static PortableInfo,
        user_type_id: i32,
        detected_version: u32,
        candidates: Box<[Candidate]>,
        remainder: Option<RemainderSlot>,
        custom: Option<CustomHooks>,
        base: Option<Arc<TypeSchema>>,
    ) -> Self {
        let max_since = candidates.iter().map(|c| c.since).max().unwrap_or(0);
        let schema = Self {
            info,
            user_type_id,
            detected_version,
            active_version: AtomicU32::new(detected_version),
            max_since,
            candidates,
            buckets: RwLock::new(Vec::new()),
            remainder,
            custom,
            base,
        };
        schema.fields_for(detected_version);
        schema
    }

    #[inline]
    pub fn info(&self) -> &'static PortableInfo {
        self.info
    }

    #[inline]
    pub fn type_path(&self) -> &'static str {
        self.info.type_path()
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.info.type_name()
    }

    #[inline]
    pub fn user_type_id(&self) -> i32 {
        self.user_type_id
    }

    /// Highest version referenced by a field, or the explicit type version.
    #[inline]
    pub fn detected_version(&self) -> u32 {
        self.detected_version
    }

    /// Version written by default. Starts at the detected version and only
    /// ever grows.
    #[inline]
    pub fn active_version(&self) -> u32 {
        self.active_version.load(Ordering::Acquire)
    }

    #[inline]
    pub fn uses_custom_codec(&self) -> bool {
        self.custom.is_some()
    }

    #[inline]
    pub(crate) fn custom(&self) -> Option<CustomHooks> {
        self.custom
    }

    #[inline]
    pub fn remainder_slot(&self) -> Option<RemainderSlot> {
        self.remainder
    }

    /// Schema of the embedded ancestor.
    #[inline]
    pub fn base(&self) -> Option<&Arc<TypeSchema>> {
        self.base.as_ref()
    }

    fn build_bucket(&self, version: u32) -> Arc<[FieldSlot]> {
        self.candidates
            .iter()
            .filter(|c| c.since <= version)
            .enumerate()
            .map(|(i, c)| FieldSlot {
                position: c.position,
                index: i as u32 + 1,
                name: c.name,
                declared_name: c.declared_name,
                value_type: c.value_type,
                since: c.since,
                codec: c.codec.clone(),
            })
            .collect()
    }

    /// Fields of `version`, in index order.
    ///
    /// Missing buckets are built on demand. A bucket, once built, is never
    /// replaced: concurrent callers all observe the first one stored.
    pub fn fields_for(&self, version: u32) -> Arc<[FieldSlot]> {
        let slot = version.min(self.max_since) as usize;
        {
            let buckets = self.buckets.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(bucket) = buckets.get(slot) {
                return bucket.clone();
            }
        }

        let mut buckets = self.buckets.write().unwrap_or_else(PoisonError::into_inner);
        while buckets.len() <= slot {
            let next = self.build_bucket(buckets.len() as u32);
            buckets.push(next);
        }
        buckets[slot].clone()
    }

    /// Number of distinct buckets built so far.
    pub fn built_buckets(&self) -> usize {
        self.buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Raises the active version. Lower values are ignored.
    ///
    /// Returns `true` if the version changed.
    pub fn raise_version(&self, version: u32) -> bool {
        let previous = self.active_version.fetch_max(version, Ordering::AcqRel);
        if version <= previous {
            return false;
        }
        self.fields_for(version);
        log::debug!(
            "raised `{}` from version {previous} to {version}",
            self.type_path()
        );
        true
    }

    /// Serializable summary of the schema and every distinct bucket up to
    /// the active version.
    ///
    /// Versions above the largest `since` share one bucket, so they are
    /// listed once.
    pub fn describe(&self) -> SchemaDescriptor {
        let active = self.active_version();
        let last = active.max(self.detected_version).min(self.max_since);
        let versions = (0..=last)
            .map(|version| VersionDescriptor {
                version,
                fields: self
                    .fields_for(version)
                    .iter()
                    .map(|slot| FieldDescriptor {
                        name: slot.name,
                        index: slot.index,
                        since: slot.since,
                        value_type: slot.value_type,
                    })
                    .collect(),
            })
            .collect();
        SchemaDescriptor {
            type_path: self.type_path(),
            type_name: self.type_name(),
            user_type_id: self.user_type_id,
            detected_version: self.detected_version,
            active_version: active,
            custom: self.uses_custom_codec(),
            remainder: self.remainder.map(|slot| slot.name),
            base: self.base.as_ref().map(|base| Box::new(base.describe())),
            versions,
        }
    }
}

impl core::fmt::Debug for TypeSchema {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TypeSchema")
            .field("type_path", &self.type_path())
            .field("user_type_id", &self.user_type_id)
            .field("detected_version", &self.detected_version)
            .field("active_version", &self.active_version())
            .field("candidates", &self.candidates)
            .field("remainder", &self.remainder)
            .field("custom", &self.custom.is_some())
            .field("base", &self.base.as_ref().map(|b| b.type_path()))
            .finish()
    }
}
