//! Key/value capabilities a map is parameterised by.

use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

/// Hashing, ordering, validation and ownership hooks for keys and values.
///
/// Only `hash` and `less` are required. Equality is derived from `less`
/// unless overridden. Copy hooks receive the caller's key or value and
/// return the form the map stores (`None` aborts the insert); free hooks
/// receive the stored form when an entry leaves the map.
///
/// The map calls these while its structure may be mid-update. Calling
/// back into the same map from a hook is a bug and panics in debug builds.
pub trait Ops<K, V> {
    fn hash(&self, key: &K) -> u64;

    fn less(&self, left: &K, right: &K) -> bool;

    fn equal(&self, left: &K, right: &K) -> bool {
        !self.less(left, right) && !self.less(right, left)
    }

    fn valid_key(&self, _key: &K) -> bool {
        true
    }

    fn valid_value(&self, _value: &V) -> bool {
        true
    }

    fn copy_key(&self, key: K) -> Option<K> {
        Some(key)
    }

    fn copy_value(&self, value: V) -> Option<V> {
        Some(value)
    }

    fn free_key(&self, key: K) {
        drop(key);
    }

    fn free_value(&self, value: V) {
        drop(value);
    }
}

/// Ops for any `K: Hash + Ord`, hashing through a `BuildHasher`.
#[derive(Clone, Debug, Default)]
pub struct DefaultOps<S = DefaultHashBuilder> {
    hasher: S,
}

impl<S> DefaultOps<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }
}

impl<K, V, S> Ops<K, V> for DefaultOps<S>
where
    K: Hash + Ord,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    #[inline]
    fn less(&self, left: &K, right: &K) -> bool {
        left < right
    }

    #[inline]
    fn equal(&self, left: &K, right: &K) -> bool {
        left == right
    }
}

/// Integer keys that hash to their own value.
pub trait Scalar: Copy + Ord {
    fn raw(self) -> u64;
}

macro_rules! impl_scalar {
    ($($t:ty),*) => {
        $(impl Scalar for $t {
            #[inline]
            fn raw(self) -> u64 {
                self as u64
            }
        })*
    };
}

impl_scalar!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

/// Ops that treat keys as raw scalars: the key is its own hash and
/// comparison is the integer order. Slot placement is predictable, which
/// makes collisions easy to arrange.
#[derive(Copy, Clone, Debug, Default)]
pub struct ScalarOps;

impl<K: Scalar, V> Ops<K, V> for ScalarOps {
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        key.raw()
    }

    #[inline]
    fn less(&self, left: &K, right: &K) -> bool {
        left < right
    }

    #[inline]
    fn equal(&self, left: &K, right: &K) -> bool {
        left == right
    }
}
