//! Entry handles and iterator positions.

use crate::hash_map::HashMap;
use crate::node::NodeKey;
use crate::ops::Ops;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of the map that issued a handle.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct MapId(u64);

impl MapId {
    /// Handles built inside a bucket before the map stamps them.
    pub(crate) const UNOWNED: MapId = MapId(0);

    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        MapId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Generational reference to one entry of a [`HashMap`].
///
/// A handle keeps resolving to the same entry across rehashes and bucket
/// kind switches. Once the entry is erased the handle is stale: accessors
/// return `None` and iteration steps fail with [`Error::StaleHandle`].
/// Passing a handle to a map other than the one that issued it fails with
/// [`Error::Detached`].
///
/// [`Error::StaleHandle`]: crate::Error::StaleHandle
/// [`Error::Detached`]: crate::Error::Detached
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle {
    key: NodeKey,
    owner: MapId,
}

impl Handle {
    pub(crate) fn new(k: NodeKey) -> Self {
        Handle {
            key: k,
            owner: MapId::UNOWNED,
        }
    }
    pub(crate) fn raw_handle(&self) -> NodeKey {
        self.key
    }

    pub(crate) fn owner(&self) -> MapId {
        self.owner
    }

    pub(crate) fn owned_by(self, owner: MapId) -> Self {
        Handle { owner, ..self }
    }

    pub fn key<'a, K, V, O: Ops<K, V>>(&self, map: &'a HashMap<K, V, O>) -> Option<&'a K> {
        map.handle_key(*self)
    }

    pub fn value<'a, K, V, O: Ops<K, V>>(&self, map: &'a HashMap<K, V, O>) -> Option<&'a V> {
        map.handle_value(*self)
    }

    pub fn value_mut<'a, K, V, O: Ops<K, V>>(
        &self,
        map: &'a mut HashMap<K, V, O>,
    ) -> Option<&'a mut V> {
        map.handle_value_mut(*self)
    }

    /// The hash cached when the entry was inserted.
    pub fn hash<K, V, O: Ops<K, V>>(&self, map: &HashMap<K, V, O>) -> Option<u64> {
        map.handle_hash(*self)
    }
}

/// Where an iteration step landed.
///
/// `End` and `Rend` are boundaries, not entries: `End` follows the last
/// entry of a forward walk and `Rend` follows the first entry of a reverse
/// walk. Stepping past a boundary in its own direction stays on it.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Position {
    Entry(Handle),
    End,
    Rend,
}

impl Position {
    #[inline]
    pub fn handle(self) -> Option<Handle> {
        match self {
            Position::Entry(h) => Some(h),
            Position::End | Position::Rend => None,
        }
    }

    #[inline]
    pub fn is_end(self) -> bool {
        self == Position::End
    }

    #[inline]
    pub fn is_rend(self) -> bool {
        self == Position::Rend
    }

    pub(crate) fn owned_by(self, owner: MapId) -> Self {
        match self {
            Position::Entry(h) => Position::Entry(h.owned_by(owner)),
            p => p,
        }
    }

    pub(crate) fn forward(n: Option<NodeKey>) -> Self {
        n.map_or(Position::End, |n| Position::Entry(Handle::new(n)))
    }

    pub(crate) fn reverse(n: Option<NodeKey>) -> Self {
        n.map_or(Position::Rend, |n| Position::Entry(Handle::new(n)))
    }
}

impl From<Handle> for Position {
    fn from(h: Handle) -> Self {
        Position::Entry(h)
    }
}
