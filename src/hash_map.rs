//! HashMap: a power-of-two slot directory of collision buckets.
//!
//! Each occupied slot owns a bucket. Buckets start linear and turn into
//! red-black trees when they grow past [`TREEIFY_THRESHOLD`] in a directory
//! of at least [`MIN_TREEIFY_CAPACITY`] slots, and turn back when they fall
//! under [`UNTREEIFY_THRESHOLD`]. The directory doubles once the load
//! factor is exceeded; each entry then either stays in its slot or moves
//! `old_capacity` slots up, depending on the newly significant hash bit.
//!
//! Iteration walks slots in index order and each bucket in its own order.
//! Scans are bounded by a cached window of occupied slots that every insert
//! widens and that `begin`/`rbegin` tighten.

use crate::bucket::{self, Bucket, BucketKind};
use crate::config::{Config, MIN_TREEIFY_CAPACITY, TREEIFY_THRESHOLD, UNTREEIFY_THRESHOLD};
use crate::error::{Error, Result};
use crate::node::{Node, NodeKey, Nodes};
use crate::ops::{DefaultOps, Ops};
use crate::position::{Handle, MapId, Position};
use crate::reentrancy::DebugReentrancy;
use core::cell::Cell;
use core::fmt;
use core::hash::{BuildHasher, Hash};

/// Inclusive index bounds containing every occupied slot.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Window {
    lo: usize,
    hi: usize,
}

fn widen(w: Option<Window>, i: usize) -> Option<Window> {
    Some(match w {
        None => Window { lo: i, hi: i },
        Some(w) => Window {
            lo: w.lo.min(i),
            hi: w.hi.max(i),
        },
    })
}

type Directory = Vec<Option<Bucket>>;

#[cfg(test)]
thread_local! {
    // Directory size whose allocation is made to fail.
    static FAIL_DIRECTORY: Cell<Option<usize>> = const { Cell::new(None) };
}

fn directory(capacity: usize) -> Result<Directory> {
    #[cfg(test)]
    if FAIL_DIRECTORY.with(|f| f.get()) == Some(capacity) {
        return Err(Error::AllocFailed);
    }
    let mut slots = Vec::new();
    slots
        .try_reserve_exact(capacity)
        .map_err(|_| Error::AllocFailed)?;
    slots.resize_with(capacity, || None);
    Ok(slots)
}

/// Everything but the hooks and the guard, so guarded entry points can
/// hand `&O` and `&mut Table` out side by side.
struct Table<K, V> {
    // Stamped into every handle this map hands out.
    id: MapId,
    config: Config,
    nodes: Nodes<K, V>,
    // Empty until the first insert.
    slots: Directory,
    bucket_count: usize,
    // None while no slot has been occupied since construction or `clear`.
    window: Cell<Option<Window>>,
}

pub struct HashMap<K, V, O: Ops<K, V> = DefaultOps> {
    ops: O,
    table: Table<K, V>,
    reentrancy: DebugReentrancy,
}

impl<K, V> HashMap<K, V>
where
    K: Hash + Ord,
{
    pub fn new() -> Self {
        Self::with_ops(DefaultOps::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_ops_and_config(DefaultOps::default(), config)
    }
}

impl<K, V> Default for HashMap<K, V>
where
    K: Hash + Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> HashMap<K, V, DefaultOps<S>>
where
    K: Hash + Ord,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_ops(DefaultOps::with_hasher(hasher))
    }
}

/// Iterator over entries in map order.
pub struct Iter<'a, K, V> {
    table: &'a Table<K, V>,
    pos: Position,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Handle, &'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let h = self.pos.handle()?;
        let table = self.table;
        let node = table.node(h)?;
        self.pos = table.step_forward(h).unwrap_or(Position::End);
        self.remaining = self.remaining.saturating_sub(1);
        Some((h, &node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

/// Iterator over mutable values in storage order (not map order).
pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, NodeKey, Node<K, V>>,
    owner: MapId,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (Handle, &'a K, &'a mut V);
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let owner = self.owner;
        self.it
            .next()
            .map(|(k, n)| (Handle::new(k).owned_by(owner), &n.key, &mut n.value))
    }
}

impl<K, V> Table<K, V> {
    fn new(config: Config) -> Self {
        Self {
            id: MapId::fresh(),
            config: config.normalized(),
            nodes: Nodes::with_key(),
            slots: Vec::new(),
            bucket_count: 0,
            window: Cell::new(None),
        }
    }

    #[inline]
    fn slot_of(&self, hash: u64) -> usize {
        debug_assert!(!self.slots.is_empty());
        (hash & (self.slots.len() as u64 - 1)) as usize
    }

    fn occupied_from(&self, start: usize) -> Option<&Bucket> {
        let w = self.window.get()?;
        (start.max(w.lo)..=w.hi).find_map(|i| self.slots[i].as_ref())
    }

    fn occupied_before(&self, end: usize) -> Option<&Bucket> {
        let w = self.window.get()?;
        (w.lo..end.min(w.hi + 1))
            .rev()
            .find_map(|i| self.slots[i].as_ref())
    }

    fn first_node(&self) -> Option<NodeKey> {
        let w = self.window.get()?;
        match (w.lo..=w.hi).find(|&i| self.slots[i].is_some()) {
            Some(i) => {
                self.window.set(Some(Window { lo: i, ..w }));
                self.slots[i].as_ref().and_then(|b| b.first(&self.nodes))
            }
            None => {
                self.window.set(None);
                None
            }
        }
    }

    fn last_node(&self) -> Option<NodeKey> {
        let w = self.window.get()?;
        match (w.lo..=w.hi).rev().find(|&i| self.slots[i].is_some()) {
            Some(i) => {
                self.window.set(Some(Window { hi: i, ..w }));
                self.slots[i].as_ref().and_then(|b| b.last(&self.nodes))
            }
            None => {
                self.window.set(None);
                None
            }
        }
    }

    fn forward(&self, n: Option<NodeKey>) -> Position {
        Position::forward(n).owned_by(self.id)
    }

    fn reverse(&self, n: Option<NodeKey>) -> Position {
        Position::reverse(n).owned_by(self.id)
    }

    /// The live entry behind `h`, if `h` was issued by this map.
    fn node(&self, h: Handle) -> Option<&Node<K, V>> {
        if h.owner() != self.id {
            return None;
        }
        self.nodes.get(h.raw_handle())
    }

    fn node_mut(&mut self, h: Handle) -> Option<&mut Node<K, V>> {
        if h.owner() != self.id {
            return None;
        }
        self.nodes.get_mut(h.raw_handle())
    }

    fn owning_bucket(&self, h: Handle) -> Result<(usize, &Bucket)> {
        if h.owner() != self.id {
            return Err(Error::Detached);
        }
        let node = self.nodes.get(h.raw_handle()).ok_or(Error::StaleHandle)?;
        let index = self.slot_of(node.hash);
        let bucket = self.slots[index].as_ref().ok_or(Error::Detached)?;
        Ok((index, bucket))
    }

    fn step_forward(&self, h: Handle) -> Result<Position> {
        let (index, bucket) = self.owning_bucket(h)?;
        let pos = match bucket.next(&self.nodes, Position::Entry(h))? {
            Position::End => self
                .occupied_from(index + 1)
                .map_or(Position::End, |b| b.begin(&self.nodes)),
            p => p,
        };
        Ok(pos.owned_by(self.id))
    }

    fn step_back(&self, h: Handle) -> Result<Position> {
        let (index, bucket) = self.owning_bucket(h)?;
        let pos = match bucket.prev(&self.nodes, Position::Entry(h))? {
            Position::End => Position::forward(
                self.occupied_before(index)
                    .and_then(|b| b.last(&self.nodes)),
            ),
            p => p,
        };
        Ok(pos.owned_by(self.id))
    }

    fn step_reverse(&self, h: Handle) -> Result<Position> {
        let (index, bucket) = self.owning_bucket(h)?;
        let pos = match bucket.rnext(&self.nodes, Position::Entry(h))? {
            Position::Rend => self
                .occupied_before(index)
                .map_or(Position::Rend, |b| b.rbegin(&self.nodes)),
            p => p,
        };
        Ok(pos.owned_by(self.id))
    }

    fn step_reverse_back(&self, h: Handle) -> Result<Position> {
        let (index, bucket) = self.owning_bucket(h)?;
        let pos = match bucket.rprev(&self.nodes, Position::Entry(h))? {
            Position::Rend => Position::reverse(
                self.occupied_from(index + 1)
                    .and_then(|b| b.first(&self.nodes)),
            ),
            p => p,
        };
        Ok(pos.owned_by(self.id))
    }

    fn lookup<O: Ops<K, V>>(&self, ops: &O, key: &K) -> Result<Position> {
        if self.nodes.is_empty() {
            return Ok(Position::End);
        }
        bucket::validate_key::<K, V, O>(ops, key)?;
        let index = self.slot_of(ops.hash(key));
        let pos = self.slots[index]
            .as_ref()
            .map_or(Position::End, |b| b.find_checked(&self.nodes, ops, key));
        Ok(pos.owned_by(self.id))
    }

    fn kind_of<O: Ops<K, V>>(&self, ops: &O, key: &K) -> Option<BucketKind> {
        if self.slots.is_empty() {
            return None;
        }
        self.slots[self.slot_of(ops.hash(key))]
            .as_ref()
            .map(Bucket::kind)
    }

    /// Links a validated entry. Any failure restores the directory and the
    /// target slot to how they were found.
    fn place<O: Ops<K, V>>(
        &mut self,
        ops: &O,
        key: K,
        value: V,
        replace: bool,
    ) -> Result<(Handle, bool)> {
        let fresh_directory = self.slots.is_empty();
        if fresh_directory {
            self.slots = directory(self.config.capacity_init)?;
            tracing::debug!(capacity = self.slots.len(), "slot directory allocated");
        }
        let hash = ops.hash(&key);
        let index = self.slot_of(hash);
        let fresh_bucket = self.slots[index].is_none();
        let base = self.config.base_kind();
        let bucket = self.slots[index].get_or_insert_with(|| Bucket::new(base));
        let placed = if replace {
            bucket.insert_replace_checked(&mut self.nodes, ops, hash, key, value)
        } else {
            bucket
                .insert_checked(&mut self.nodes, ops, hash, key, value)
                .map(|h| (h, true))
        };
        let (handle, grew) = match placed {
            Ok(p) => p,
            Err(err) => {
                if fresh_bucket {
                    self.slots[index] = None;
                }
                if fresh_directory {
                    self.slots = Vec::new();
                }
                return Err(err);
            }
        };
        if fresh_bucket {
            self.bucket_count += 1;
        }
        if grew {
            self.promote(ops, index);
            self.window.set(widen(self.window.get(), index));
            self.expand(ops);
        }
        Ok((handle.owned_by(self.id), grew))
    }

    fn promote<O: Ops<K, V>>(&mut self, ops: &O, index: usize) {
        if !self.config.adaptive() || self.slots.len() < MIN_TREEIFY_CAPACITY {
            return;
        }
        if let Some(b) = self.slots[index].as_mut() {
            if b.kind().is_linear() && b.len() > TREEIFY_THRESHOLD {
                b.switch(&mut self.nodes, ops, BucketKind::Tree);
                tracing::trace!(slot = index, len = b.len(), "bucket treeified");
            }
        }
    }

    /// Post-removal bookkeeping: drop an emptied bucket or untreeify a small one.
    fn settle<O: Ops<K, V>>(&mut self, ops: &O, index: usize) {
        let Some(b) = self.slots[index].as_mut() else {
            return;
        };
        if b.is_empty() {
            self.slots[index] = None;
            self.bucket_count -= 1;
            return;
        }
        if self.config.adaptive() && b.kind() == BucketKind::Tree && b.len() < UNTREEIFY_THRESHOLD {
            b.switch(&mut self.nodes, ops, self.config.linear.into());
            tracing::trace!(slot = index, len = b.len(), "bucket untreeified");
        }
    }

    fn expand<O: Ops<K, V>>(&mut self, ops: &O) {
        let capacity = self.slots.len();
        let threshold = capacity as f64 * f64::from(self.config.load_factor);
        if self.nodes.len() as f64 <= threshold || capacity >= self.config.capacity_max {
            return;
        }
        if let Err(err) = self.rehash(ops, capacity << 1) {
            tracing::warn!(capacity, %err, "growth failed; keeping the current directory");
        }
    }

    /// Moves every entry into a directory of `new_capacity` slots. The new
    /// directory is fully reserved before anything moves, so a failure
    /// leaves the map untouched.
    fn rehash<O: Ops<K, V>>(&mut self, ops: &O, new_capacity: usize) -> Result<()> {
        let old_capacity = self.slots.len();
        let mut target = directory(new_capacity)?;
        let Some(w) = self.window.get() else {
            self.slots = target;
            return Ok(());
        };

        let adaptive = self.config.adaptive();
        let base = self.config.base_kind();
        let linear: BucketKind = self.config.linear.into();
        let split_bit = old_capacity as u64;
        let mut window = None;
        let mut occupied = 0;
        let mut moved = 0usize;

        for index in w.lo..=w.hi {
            let Some(mut bucket) = self.slots[index].take() else {
                continue;
            };
            let high = index + old_capacity;
            let mut cursor = bucket.first(&self.nodes);
            while let Some(n) = cursor {
                if self.nodes[n].hash & split_bit == 0 {
                    cursor = bucket
                        .next(&self.nodes, Position::Entry(Handle::new(n)))
                        .ok()
                        .and_then(Position::handle)
                        .map(|h| h.raw_handle());
                    continue;
                }
                cursor = bucket.pop(&mut self.nodes, n);
                let dest = target[high].get_or_insert_with(|| {
                    occupied += 1;
                    Bucket::new(base)
                });
                if adaptive
                    && dest.kind().is_linear()
                    && dest.len() + 1 > TREEIFY_THRESHOLD
                    && new_capacity >= MIN_TREEIFY_CAPACITY
                {
                    dest.switch(&mut self.nodes, ops, BucketKind::Tree);
                }
                dest.push(&mut self.nodes, ops, n);
                window = widen(window, high);
                moved += 1;
            }
            if bucket.is_empty() {
                continue;
            }
            if adaptive && bucket.kind() == BucketKind::Tree && bucket.len() < UNTREEIFY_THRESHOLD {
                bucket.switch(&mut self.nodes, ops, linear);
            }
            target[index] = Some(bucket);
            occupied += 1;
            window = widen(window, index);
        }

        self.slots = target;
        self.bucket_count = occupied;
        self.window.set(window);
        tracing::debug!(
            from = old_capacity,
            to = new_capacity,
            moved,
            buckets = occupied,
            window = ?window.map(|w| (w.lo, w.hi)),
            "rehashed"
        );
        Ok(())
    }

    fn erase<O: Ops<K, V>>(&mut self, ops: &O, h: Handle) -> Result<Position> {
        let following = self.step_forward(h)?;
        let index = self.owning_bucket(h)?.0;
        let bucket = self.slots[index].as_mut().ok_or(Error::Detached)?;
        bucket.erase(&mut self.nodes, ops, Position::Entry(h))?;
        self.settle(ops, index);
        Ok(following)
    }

    fn remove<O: Ops<K, V>>(&mut self, ops: &O, key: &K) -> Result<usize> {
        if self.nodes.is_empty() {
            return Ok(0);
        }
        bucket::validate_key::<K, V, O>(ops, key)?;
        let index = self.slot_of(ops.hash(key));
        let Some(bucket) = self.slots[index].as_mut() else {
            return Ok(0);
        };
        let removed = bucket.remove_checked(&mut self.nodes, ops, key);
        self.settle(ops, index);
        Ok(removed)
    }

    fn clear<O: Ops<K, V>>(&mut self, ops: &O) -> usize {
        let count = self.nodes.len();
        if let Some(w) = self.window.take() {
            for slot in &mut self.slots[w.lo..=w.hi] {
                if let Some(mut b) = slot.take() {
                    b.clear(&mut self.nodes, ops);
                    self.bucket_count = self.bucket_count.saturating_sub(1);
                }
            }
        }
        if !self.nodes.is_empty() || self.bucket_count != 0 {
            tracing::error!(
                size = self.nodes.len(),
                bucket_count = self.bucket_count,
                "bookkeeping out of sync after clear; forcing the map empty"
            );
            for (_, node) in self.nodes.drain() {
                ops.free_key(node.key);
                ops.free_value(node.value);
            }
            self.slots.iter_mut().for_each(|s| *s = None);
            self.bucket_count = 0;
        }
        count
    }

    #[cfg(test)]
    fn check_invariants(&self)
    where
        K: Ord,
    {
        if self.slots.is_empty() {
            assert!(self.nodes.is_empty());
            assert_eq!(self.bucket_count, 0);
            return;
        }
        assert!(self.slots.len().is_power_of_two());
        assert!(self.slots.len() >= self.config.capacity_init);
        let mut occupied = 0;
        let mut total = 0;
        for (i, slot) in self.slots.iter().enumerate() {
            let Some(b) = slot else { continue };
            assert!(!b.is_empty(), "empty bucket left in slot {i}");
            let w = self.window.get().expect("occupied slot without a window");
            assert!(w.lo <= i && i <= w.hi, "slot {i} outside {w:?}");
            b.check(&self.nodes);
            let mut pos = b.begin(&self.nodes);
            while let Position::Entry(h) = pos {
                assert_eq!(self.slot_of(self.nodes[h.raw_handle()].hash), i);
                pos = b.next(&self.nodes, pos).expect("live entry");
            }
            if self.config.adaptive() && b.kind() == BucketKind::Tree {
                assert!(b.len() >= UNTREEIFY_THRESHOLD, "small tree in slot {i}");
            }
            occupied += 1;
            total += b.len();
        }
        assert_eq!(occupied, self.bucket_count);
        assert_eq!(total, self.nodes.len());
    }
}

impl<K, V, O: Ops<K, V>> HashMap<K, V, O> {
    pub fn with_ops(ops: O) -> Self {
        Self::with_ops_and_config(ops, Config::default())
    }

    pub fn with_ops_and_config(ops: O, config: Config) -> Self {
        Self {
            ops,
            table: Table::new(config),
            reentrancy: DebugReentrancy::new(),
        }
    }

    pub fn ops(&self) -> &O {
        &self.ops
    }

    /// The configuration after normalisation.
    pub fn config(&self) -> &Config {
        &self.table.config
    }

    pub fn len(&self) -> usize {
        self.table.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.nodes.is_empty()
    }

    /// Slot count; the configured initial capacity until the first insert.
    pub fn capacity(&self) -> usize {
        if self.table.slots.is_empty() {
            self.table.config.capacity_init
        } else {
            self.table.slots.len()
        }
    }

    /// Number of occupied slots.
    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count
    }

    pub fn begin(&self) -> Position {
        let _g = self.reentrancy.enter();
        self.table.forward(self.table.first_node())
    }

    pub fn end(&self) -> Position {
        Position::End
    }

    pub fn rbegin(&self) -> Position {
        let _g = self.reentrancy.enter();
        self.table.reverse(self.table.last_node())
    }

    pub fn rend(&self) -> Position {
        Position::Rend
    }

    /// Forward step. `End` stays `End`; `Rend` is not a forward position.
    pub fn next(&self, pos: Position) -> Result<Position> {
        let _g = self.reentrancy.enter();
        match pos {
            Position::End => Ok(Position::End),
            Position::Rend => Err(Error::Sentinel),
            Position::Entry(h) => self.table.step_forward(h),
        }
    }

    /// Backward step in forward order: `prev(End)` is the last entry and the
    /// first entry steps back to `End`.
    pub fn prev(&self, pos: Position) -> Result<Position> {
        let _g = self.reentrancy.enter();
        match pos {
            Position::End => Ok(self.table.forward(self.table.last_node())),
            Position::Rend => Err(Error::Sentinel),
            Position::Entry(h) => self.table.step_back(h),
        }
    }

    /// Reverse step. `Rend` stays `Rend`; `End` is not a reverse position.
    pub fn rnext(&self, pos: Position) -> Result<Position> {
        let _g = self.reentrancy.enter();
        match pos {
            Position::Rend => Ok(Position::Rend),
            Position::End => Err(Error::Sentinel),
            Position::Entry(h) => self.table.step_reverse(h),
        }
    }

    /// `rprev(Rend)` is the first entry; the last entry steps to `Rend`.
    pub fn rprev(&self, pos: Position) -> Result<Position> {
        let _g = self.reentrancy.enter();
        match pos {
            Position::Rend => Ok(self.table.reverse(self.table.first_node())),
            Position::End => Err(Error::Sentinel),
            Position::Entry(h) => self.table.step_reverse_back(h),
        }
    }

    /// `End` when the key is absent.
    pub fn find(&self, key: &K) -> Result<Position> {
        let _g = self.reentrancy.enter();
        self.table.lookup(&self.ops, key)
    }

    /// 1 if the key is present, 0 otherwise.
    pub fn count(&self, key: &K) -> Result<usize> {
        let _g = self.reentrancy.enter();
        Ok(usize::from(self.table.lookup(&self.ops, key)?.handle().is_some()))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        let _g = self.reentrancy.enter();
        matches!(self.table.lookup(&self.ops, key), Ok(Position::Entry(_)))
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let _g = self.reentrancy.enter();
        let h = self.table.lookup(&self.ops, key).ok()?.handle()?;
        self.table.node(h).map(|n| &n.value)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let _g = self.reentrancy.enter();
        let h = self.table.lookup(&self.ops, key).ok()?.handle()?;
        self.table.node_mut(h).map(|n| &mut n.value)
    }

    /// Structure of the bucket `key` hashes to, if that slot is occupied.
    pub fn bucket_kind(&self, key: &K) -> Option<BucketKind> {
        let _g = self.reentrancy.enter();
        self.table.kind_of(&self.ops, key)
    }

    /// Inserts a new entry. Fails with `DuplicateKey` if an equal key is
    /// present; a failed insert leaves the map exactly as it was.
    pub fn insert(&mut self, key: K, value: V) -> Result<Handle> {
        let _g = self.reentrancy.enter();
        bucket::validate(&self.ops, &key, &value)?;
        self.table
            .place(&self.ops, key, value, false)
            .map(|(h, _)| h)
    }

    /// Inserts, or replaces the value of an existing equal key in place.
    pub fn insert_replace(&mut self, key: K, value: V) -> Result<Handle> {
        let _g = self.reentrancy.enter();
        bucket::validate(&self.ops, &key, &value)?;
        self.table
            .place(&self.ops, key, value, true)
            .map(|(h, _)| h)
    }

    /// Removes the entry at `pos` and returns the position that followed it
    /// in map order.
    pub fn erase(&mut self, pos: Position) -> Result<Position> {
        let _g = self.reentrancy.enter();
        let Position::Entry(h) = pos else {
            return Err(Error::Sentinel);
        };
        self.table.erase(&self.ops, h)
    }

    /// 1 if an entry was removed, 0 if the key was absent.
    pub fn remove(&mut self, key: &K) -> Result<usize> {
        let _g = self.reentrancy.enter();
        self.table.remove(&self.ops, key)
    }

    /// Removes every entry, running free hooks, and returns how many there
    /// were. The directory keeps its capacity.
    pub fn clear(&mut self) -> usize {
        let _g = self.reentrancy.enter();
        self.table.clear(&self.ops)
    }

    pub(crate) fn handle_key(&self, h: Handle) -> Option<&K> {
        let _g = self.reentrancy.enter();
        self.table.node(h).map(|n| &n.key)
    }

    pub(crate) fn handle_value(&self, h: Handle) -> Option<&V> {
        let _g = self.reentrancy.enter();
        self.table.node(h).map(|n| &n.value)
    }

    pub(crate) fn handle_value_mut(&mut self, h: Handle) -> Option<&mut V> {
        let _g = self.reentrancy.enter();
        self.table.node_mut(h).map(|n| &mut n.value)
    }

    pub(crate) fn handle_hash(&self, h: Handle) -> Option<u64> {
        let _g = self.reentrancy.enter();
        self.table.node(h).map(|n| n.hash)
    }

    /// Entries in map order: slot index, then bucket order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        let _g = self.reentrancy.enter();
        Iter {
            table: &self.table,
            pos: self.table.forward(self.table.first_node()),
            remaining: self.len(),
        }
    }

    /// Mutable values in storage order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.table.nodes.iter_mut(),
            owner: self.table.id,
        }
    }

    #[cfg(test)]
    pub(crate) fn check_invariants(&self)
    where
        K: Ord,
    {
        self.table.check_invariants();
    }
}

impl<K, V, O: Ops<K, V>> Drop for HashMap<K, V, O> {
    fn drop(&mut self) {
        self.table.clear(&self.ops);
    }
}

impl<K: fmt::Debug, V: fmt::Debug, O: Ops<K, V>> fmt::Debug for HashMap<K, V, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(_, k, v)| (k, v)))
            .finish()
    }
}
