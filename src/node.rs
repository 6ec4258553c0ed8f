//! Arena-resident entries and the links bucket structures thread through them.
//!
//! Every entry of a map lives in one `SlotMap`. Buckets never own nodes
//! directly; they own the head of a list or the root of a tree whose links
//! are stored inside the nodes. Moving an entry to another bucket is a
//! relink, so its `DefaultKey` (and any `Handle` built from it) stays valid.

use slotmap::{DefaultKey, SlotMap};

pub(crate) type NodeKey = DefaultKey;
pub(crate) type Nodes<K, V> = SlotMap<NodeKey, Node<K, V>>;

/// Link used by chain and list buckets.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct ListLink {
    pub(crate) prev: Option<NodeKey>,
    pub(crate) next: Option<NodeKey>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Color {
    Red,
    Black,
}

/// Link used by tree buckets.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct TreeLink {
    pub(crate) parent: Option<NodeKey>,
    pub(crate) left: Option<NodeKey>,
    pub(crate) right: Option<NodeKey>,
    pub(crate) color: Color,
}

impl Default for TreeLink {
    fn default() -> Self {
        Self {
            parent: None,
            left: None,
            right: None,
            color: Color::Red,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u64,
    pub(crate) list: ListLink,
    pub(crate) tree: TreeLink,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new(hash: u64, key: K, value: V) -> Self {
        Self {
            key,
            value,
            hash,
            list: ListLink::default(),
            tree: TreeLink::default(),
        }
    }
}

/// Storage the list primitive can walk.
pub(crate) trait ListArena {
    fn list(&self, n: NodeKey) -> &ListLink;
    fn list_mut(&mut self, n: NodeKey) -> &mut ListLink;
}

/// Storage the tree primitive can walk.
pub(crate) trait TreeArena {
    fn tree(&self, n: NodeKey) -> &TreeLink;
    fn tree_mut(&mut self, n: NodeKey) -> &mut TreeLink;
}

impl<K, V> ListArena for SlotMap<NodeKey, Node<K, V>> {
    #[inline]
    fn list(&self, n: NodeKey) -> &ListLink {
        &self[n].list
    }
    #[inline]
    fn list_mut(&mut self, n: NodeKey) -> &mut ListLink {
        &mut self[n].list
    }
}

impl<K, V> TreeArena for SlotMap<NodeKey, Node<K, V>> {
    #[inline]
    fn tree(&self, n: NodeKey) -> &TreeLink {
        &self[n].tree
    }
    #[inline]
    fn tree_mut(&mut self, n: NodeKey) -> &mut TreeLink {
        &mut self[n].tree
    }
}
