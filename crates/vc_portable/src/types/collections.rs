use core::hash::{BuildHasher, Hash};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use crate::codec::FieldShape;
use crate::types::{FieldType, list_items};
use crate::value::{Value, ValueError};

// -----------------------------------------------------------------------------
// Option

impl<T: FieldType> FieldType for Option<T> {
    #[inline]
    fn shape() -> FieldShape {
        FieldShape::Optional(Box::new(T::shape()))
    }

    #[inline]
    fn to_value(&self) -> Value<'_> {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

// -----------------------------------------------------------------------------
// Fixed arrays

impl<T: FieldType, const N: usize> FieldType for [T; N] {
    #[inline]
    fn shape() -> FieldShape {
        FieldShape::Array {
            elem: Box::new(T::shape()),
            len: N,
        }
    }

    fn to_value(&self) -> Value<'_> {
        Value::List(self.iter().map(T::to_value).collect())
    }

    fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
        let items = list_items(value)?;
        if items.len() != N {
            return Err(ValueError::Length {
                expected: N,
                found: items.len(),
            });
        }
        let items = items
            .into_iter()
            .map(T::from_value)
            .collect::<Result<Vec<T>, _>>()?;
        items.try_into().map_err(|rest: Vec<T>| ValueError::Length {
            expected: N,
            found: rest.len(),
        })
    }
}

// -----------------------------------------------------------------------------
// Sequences and sets

macro_rules! impl_list_like {
    ($shape:ident, [$($generics:tt)*] $ty:ty) => {
        impl<$($generics)*> FieldType for $ty {
            #[inline]
            fn shape() -> FieldShape {
                FieldShape::$shape(Box::new(T::shape()))
            }

            fn to_value(&self) -> Value<'_> {
                Value::List(self.iter().map(T::to_value).collect())
            }

            fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
                list_items(value)?.into_iter().map(T::from_value).collect()
            }
        }
    };
}

impl_list_like!(Sequence, [T: FieldType] Vec<T>);
impl_list_like!(Sequence, [T: FieldType] VecDeque<T>);
impl_list_like!(Set, [T: FieldType + Ord] BTreeSet<T>);
impl_list_like!(
    Set,
    [T: FieldType + Eq + Hash, S: BuildHasher + Default + Send + Sync + 'static] HashSet<T, S>
);

// -----------------------------------------------------------------------------
// Maps

fn map_entries(value: Value<'static>) -> Result<Vec<(Value<'static>, Value<'static>)>, ValueError> {
    match value {
        Value::Map(entries) => Ok(entries),
        other => Err(ValueError::mismatch("map", &other)),
    }
}

impl<K, V, S> FieldType for HashMap<K, V, S>
where
    K: FieldType + Eq + Hash,
    V: FieldType,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    #[inline]
    fn shape() -> FieldShape {
        FieldShape::Map(Box::new(K::shape()), Box::new(V::shape()))
    }

    fn to_value(&self) -> Value<'_> {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
        map_entries(value)?
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect()
    }
}

impl<K, V> FieldType for BTreeMap<K, V>
where
    K: FieldType + Ord,
    V: FieldType,
{
    #[inline]
    fn shape() -> FieldShape {
        FieldShape::Map(Box::new(K::shape()), Box::new(V::shape()))
    }

    fn to_value(&self) -> Value<'_> {
        Value::Map(self.iter().map(|(k, v)| (k.to_value(), v.to_value())).collect())
    }

    fn from_value(value: Value<'static>) -> Result<Self, ValueError> {
        map_entries(value)?
            .into_iter()
            .map(|(k, v)| Ok((K::from_value(k)?, V::from_value(v)?)))
            .collect()
    }
}

// -----------------------------------------------------------------------------
// Tests
