//! Collision buckets.
//!
//! A bucket holds the entries of one directory slot under exactly one
//! structure at a time: a hash chain, a doubly linked list or a red-black
//! tree. Linear kinds link new entries at the front; the tree keeps them in
//! key order. Every operation below behaves the same whichever structure is
//! active, which is what lets the map switch kinds underneath iterators.
//! Switching to a linear kind keeps the order the old structure walked in.
//!
//! Entries live in the map's node arena, so every operation takes that
//! arena alongside the bucket. The map validates keys and values before it
//! hashes them, then calls the `*_checked` variants. The validating
//! wrappers exist for the bucket's own tests.

use crate::error::{Error, Result};
use crate::list::{self, ChainHead, ListHead};
use crate::node::{Node, NodeKey, Nodes};
use crate::ops::Ops;
use crate::position::{Handle, Position};
use crate::tree::{self, Side, TreeRoot};

/// Structure a bucket currently uses.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BucketKind {
    /// Singly threaded hash chain; reaching the tail walks it.
    Chain,
    /// Doubly linked list with both ends tracked.
    List,
    /// Red-black tree ordered by `Ops::less`.
    Tree,
}

impl BucketKind {
    #[inline]
    pub fn is_linear(self) -> bool {
        !matches!(self, BucketKind::Tree)
    }
}

#[derive(Debug)]
enum Store {
    Chain(ChainHead),
    List(ListHead),
    Tree(TreeRoot),
}

enum Probe {
    Found(NodeKey),
    /// Where a new entry would be linked. Linear kinds always push at the front.
    Vacant(Option<(NodeKey, Side)>),
}

pub(crate) fn validate_key<K, V, O: Ops<K, V>>(ops: &O, key: &K) -> Result<()> {
    if ops.valid_key(key) {
        Ok(())
    } else {
        Err(Error::InvalidKey)
    }
}

pub(crate) fn validate<K, V, O: Ops<K, V>>(ops: &O, key: &K, value: &V) -> Result<()> {
    validate_key::<K, V, O>(ops, key)?;
    if !ops.valid_value(value) {
        return Err(Error::InvalidValue);
    }
    Ok(())
}

fn allocate<K, V, O: Ops<K, V>>(
    nodes: &mut Nodes<K, V>,
    ops: &O,
    hash: u64,
    key: K,
    value: V,
) -> Result<NodeKey> {
    let key = ops.copy_key(key).ok_or(Error::CopyFailed)?;
    let Some(value) = ops.copy_value(value) else {
        ops.free_key(key);
        return Err(Error::CopyFailed);
    };
    Ok(nodes.insert(Node::new(hash, key, value)))
}

fn release<K, V, O: Ops<K, V>>(nodes: &mut Nodes<K, V>, ops: &O, n: NodeKey) {
    if let Some(Node { key, value, .. }) = nodes.remove(n) {
        ops.free_key(key);
        ops.free_value(value);
    }
}

fn resolve<K, V>(nodes: &Nodes<K, V>, h: Handle) -> Result<NodeKey> {
    let n = h.raw_handle();
    if nodes.contains_key(n) {
        Ok(n)
    } else {
        Err(Error::StaleHandle)
    }
}

#[derive(Debug)]
pub(crate) struct Bucket {
    len: usize,
    store: Store,
}

impl Bucket {
    pub(crate) fn new(kind: BucketKind) -> Self {
        let store = match kind {
            BucketKind::Chain => Store::Chain(ChainHead::default()),
            BucketKind::List => Store::List(ListHead::default()),
            BucketKind::Tree => Store::Tree(TreeRoot::default()),
        };
        Self { len: 0, store }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn kind(&self) -> BucketKind {
        match self.store {
            Store::Chain(_) => BucketKind::Chain,
            Store::List(_) => BucketKind::List,
            Store::Tree(_) => BucketKind::Tree,
        }
    }

    pub(crate) fn first<K, V>(&self, nodes: &Nodes<K, V>) -> Option<NodeKey> {
        match &self.store {
            Store::Chain(h) => h.first(),
            Store::List(h) => h.first(),
            Store::Tree(t) => t.first(nodes),
        }
    }

    pub(crate) fn last<K, V>(&self, nodes: &Nodes<K, V>) -> Option<NodeKey> {
        match &self.store {
            Store::Chain(h) => h.last(nodes),
            Store::List(h) => h.last(),
            Store::Tree(t) => t.last(nodes),
        }
    }

    fn successor<K, V>(&self, nodes: &Nodes<K, V>, n: NodeKey) -> Option<NodeKey> {
        match self.store {
            Store::Chain(_) | Store::List(_) => list::next(nodes, n),
            Store::Tree(_) => tree::next(nodes, n),
        }
    }

    fn predecessor<K, V>(&self, nodes: &Nodes<K, V>, n: NodeKey) -> Option<NodeKey> {
        match self.store {
            Store::Chain(_) | Store::List(_) => list::prev(nodes, n),
            Store::Tree(_) => tree::prev(nodes, n),
        }
    }

    pub(crate) fn begin<K, V>(&self, nodes: &Nodes<K, V>) -> Position {
        Position::forward(self.first(nodes))
    }

    pub(crate) fn rbegin<K, V>(&self, nodes: &Nodes<K, V>) -> Position {
        Position::reverse(self.last(nodes))
    }

    pub(crate) fn next<K, V>(&self, nodes: &Nodes<K, V>, pos: Position) -> Result<Position> {
        match pos {
            Position::End => Ok(Position::End),
            Position::Rend => Err(Error::Sentinel),
            Position::Entry(h) => {
                let n = resolve(nodes, h)?;
                Ok(Position::forward(self.successor(nodes, n)))
            }
        }
    }

    /// `prev(End)` is the last entry; stepping back from the first entry
    /// lands on `End`.
    pub(crate) fn prev<K, V>(&self, nodes: &Nodes<K, V>, pos: Position) -> Result<Position> {
        match pos {
            Position::End => Ok(Position::forward(self.last(nodes))),
            Position::Rend => Err(Error::Sentinel),
            Position::Entry(h) => {
                let n = resolve(nodes, h)?;
                Ok(Position::forward(self.predecessor(nodes, n)))
            }
        }
    }

    pub(crate) fn rnext<K, V>(&self, nodes: &Nodes<K, V>, pos: Position) -> Result<Position> {
        match pos {
            Position::Rend => Ok(Position::Rend),
            Position::End => Err(Error::Sentinel),
            Position::Entry(h) => {
                let n = resolve(nodes, h)?;
                Ok(Position::reverse(self.predecessor(nodes, n)))
            }
        }
    }

    pub(crate) fn rprev<K, V>(&self, nodes: &Nodes<K, V>, pos: Position) -> Result<Position> {
        match pos {
            Position::Rend => Ok(Position::reverse(self.first(nodes))),
            Position::End => Err(Error::Sentinel),
            Position::Entry(h) => {
                let n = resolve(nodes, h)?;
                Ok(Position::reverse(self.successor(nodes, n)))
            }
        }
    }

    fn probe<K, V, O: Ops<K, V>>(&self, nodes: &Nodes<K, V>, ops: &O, key: &K) -> Probe {
        match &self.store {
            Store::Chain(_) | Store::List(_) => {
                let mut cur = self.first(nodes);
                while let Some(n) = cur {
                    if ops.equal(key, &nodes[n].key) {
                        return Probe::Found(n);
                    }
                    cur = list::next(nodes, n);
                }
                Probe::Vacant(None)
            }
            Store::Tree(t) => {
                let mut at = None;
                let mut cur = t.root();
                while let Some(n) = cur {
                    let side = if ops.less(key, &nodes[n].key) {
                        Side::Left
                    } else if ops.less(&nodes[n].key, key) {
                        Side::Right
                    } else {
                        return Probe::Found(n);
                    };
                    at = Some((n, side));
                    cur = tree::child(nodes, n, side);
                }
                Probe::Vacant(at)
            }
        }
    }

    fn attach<K, V>(&mut self, nodes: &mut Nodes<K, V>, n: NodeKey, at: Option<(NodeKey, Side)>) {
        match &mut self.store {
            Store::Chain(h) => h.push_front(nodes, n),
            Store::List(h) => h.push_front(nodes, n),
            Store::Tree(t) => t.link(nodes, n, at),
        }
        self.len += 1;
    }

    fn detach<K, V>(&mut self, nodes: &mut Nodes<K, V>, n: NodeKey) {
        match &mut self.store {
            Store::Chain(h) => h.unlink(nodes, n),
            Store::List(h) => h.unlink(nodes, n),
            Store::Tree(t) => t.erase(nodes, n),
        }
        self.len -= 1;
    }

    #[cfg(test)]
    pub(crate) fn find<K, V, O: Ops<K, V>>(
        &self,
        nodes: &Nodes<K, V>,
        ops: &O,
        key: &K,
    ) -> Result<Position> {
        validate_key::<K, V, O>(ops, key)?;
        Ok(self.find_checked(nodes, ops, key))
    }

    pub(crate) fn find_checked<K, V, O: Ops<K, V>>(
        &self,
        nodes: &Nodes<K, V>,
        ops: &O,
        key: &K,
    ) -> Position {
        match self.probe(nodes, ops, key) {
            Probe::Found(n) => Position::Entry(Handle::new(n)),
            Probe::Vacant(_) => Position::End,
        }
    }

    #[cfg(test)]
    pub(crate) fn insert<K, V, O: Ops<K, V>>(
        &mut self,
        nodes: &mut Nodes<K, V>,
        ops: &O,
        hash: u64,
        key: K,
        value: V,
    ) -> Result<Handle> {
        validate(ops, &key, &value)?;
        self.insert_checked(nodes, ops, hash, key, value)
    }

    /// Fails with `DuplicateKey` before any copy hook runs.
    pub(crate) fn insert_checked<K, V, O: Ops<K, V>>(
        &mut self,
        nodes: &mut Nodes<K, V>,
        ops: &O,
        hash: u64,
        key: K,
        value: V,
    ) -> Result<Handle> {
        let at = match self.probe(nodes, ops, &key) {
            Probe::Found(_) => return Err(Error::DuplicateKey),
            Probe::Vacant(at) => at,
        };
        let n = allocate(nodes, ops, hash, key, value)?;
        self.attach(nodes, n, at);
        Ok(Handle::new(n))
    }

    #[cfg(test)]
    pub(crate) fn insert_replace<K, V, O: Ops<K, V>>(
        &mut self,
        nodes: &mut Nodes<K, V>,
        ops: &O,
        hash: u64,
        key: K,
        value: V,
    ) -> Result<(Handle, bool)> {
        validate(ops, &key, &value)?;
        self.insert_replace_checked(nodes, ops, hash, key, value)
    }

    /// Replaces the value of an existing equal key in place, otherwise
    /// inserts. The flag is `true` when a new entry was created.
    pub(crate) fn insert_replace_checked<K, V, O: Ops<K, V>>(
        &mut self,
        nodes: &mut Nodes<K, V>,
        ops: &O,
        hash: u64,
        key: K,
        value: V,
    ) -> Result<(Handle, bool)> {
        match self.probe(nodes, ops, &key) {
            Probe::Found(n) => {
                let value = ops.copy_value(value).ok_or(Error::CopyFailed)?;
                let old = core::mem::replace(&mut nodes[n].value, value);
                ops.free_value(old);
                Ok((Handle::new(n), false))
            }
            Probe::Vacant(at) => {
                let n = allocate(nodes, ops, hash, key, value)?;
                self.attach(nodes, n, at);
                Ok((Handle::new(n), true))
            }
        }
    }

    /// Removes the entry at `pos` and returns the position that followed it.
    pub(crate) fn erase<K, V, O: Ops<K, V>>(
        &mut self,
        nodes: &mut Nodes<K, V>,
        ops: &O,
        pos: Position,
    ) -> Result<Position> {
        let Position::Entry(h) = pos else {
            return Err(Error::Sentinel);
        };
        if self.is_empty() {
            return Err(Error::Detached);
        }
        let n = resolve(nodes, h)?;
        let next = self.pop(nodes, n);
        release(nodes, ops, n);
        Ok(Position::forward(next))
    }

    #[cfg(test)]
    pub(crate) fn remove<K, V, O: Ops<K, V>>(
        &mut self,
        nodes: &mut Nodes<K, V>,
        ops: &O,
        key: &K,
    ) -> Result<usize> {
        validate_key::<K, V, O>(ops, key)?;
        Ok(self.remove_checked(nodes, ops, key))
    }

    pub(crate) fn remove_checked<K, V, O: Ops<K, V>>(
        &mut self,
        nodes: &mut Nodes<K, V>,
        ops: &O,
        key: &K,
    ) -> usize {
        match self.probe(nodes, ops, key) {
            Probe::Found(n) => {
                self.pop(nodes, n);
                release(nodes, ops, n);
                1
            }
            Probe::Vacant(_) => 0,
        }
    }

    pub(crate) fn clear<K, V, O: Ops<K, V>>(&mut self, nodes: &mut Nodes<K, V>, ops: &O) -> usize {
        let mut cleared = 0;
        while let Some(n) = self.first(nodes) {
            self.detach(nodes, n);
            release(nodes, ops, n);
            cleared += 1;
        }
        cleared
    }

    /// Unlinks `n` but leaves it in the arena, untouched by free hooks.
    /// Returns the entry that followed it.
    pub(crate) fn pop<K, V>(&mut self, nodes: &mut Nodes<K, V>, n: NodeKey) -> Option<NodeKey> {
        let next = self.successor(nodes, n);
        self.detach(nodes, n);
        next
    }

    /// Links an already allocated, unlinked entry whose key is not present.
    pub(crate) fn push<K, V, O: Ops<K, V>>(&mut self, nodes: &mut Nodes<K, V>, ops: &O, n: NodeKey) {
        let at = match &self.store {
            Store::Tree(t) => {
                let mut at = None;
                let mut cur = t.root();
                while let Some(c) = cur {
                    let side = if ops.less(&nodes[n].key, &nodes[c].key) {
                        Side::Left
                    } else {
                        Side::Right
                    };
                    at = Some((c, side));
                    cur = tree::child(nodes, c, side);
                }
                at
            }
            Store::Chain(_) | Store::List(_) => None,
        };
        self.attach(nodes, n, at);
    }

    /// Rebuilds the bucket under `to`, moving every entry.
    pub(crate) fn switch<K, V, O: Ops<K, V>>(
        &mut self,
        nodes: &mut Nodes<K, V>,
        ops: &O,
        to: BucketKind,
    ) {
        if self.kind() == to {
            return;
        }
        let mut target = Bucket::new(to);
        // Linear kinds link at the front, so they are fed from the back to
        // keep the walk order a pending position was computed in.
        loop {
            let n = if to.is_linear() {
                self.last(nodes)
            } else {
                self.first(nodes)
            };
            let Some(n) = n else { break };
            self.detach(nodes, n);
            target.push(nodes, ops, n);
        }
        *self = target;
    }

    #[cfg(test)]
    pub(crate) fn check<K: Ord, V>(&self, nodes: &Nodes<K, V>) {
        let mut seen = 0;
        let mut cur = self.first(nodes);
        while let Some(n) = cur {
            seen += 1;
            cur = self.successor(nodes, n);
        }
        assert_eq!(seen, self.len, "bucket length out of sync");
        if let Store::Tree(t) = &self.store {
            crate::tree::tests::check(nodes, t);
        }
    }
}
