//! bucket-hashmap: a single-threaded hash map whose collision buckets
//! switch between linked lists and red-black trees, with stable handles
//! and bidirectional cursors.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep lookups O(log n) in the worst case under heavy collisions
//!   while staying as cheap as a chained table in the common case.
//! - Layers:
//!   - node/list/tree: entries live in one `SlotMap` arena; list and tree
//!     links are embedded in the entries, so moving an entry between
//!     structures is a relink and never a copy.
//!   - Bucket: one slot's entries under exactly one structure (chain,
//!     doubly linked list or red-black tree) behind a uniform contract:
//!     find, insert, insert_replace, erase, remove, clear, begin/next/prev
//!     and their reverse counterparts.
//!   - HashMap<K, V, O>: power-of-two slot directory of buckets with
//!     growth, treeify/untreeify and a cached window of occupied slots.
//!   - Ops<K, V>: the capability bundle (hash, order, validation,
//!     copy/free hooks) every key/value pair type is used through.
//!
//! Constraints
//! - Single-threaded: the map is `!Sync` (the window cache is a `Cell`).
//! - Keys are unique; duplicate inserts fail with `Error::DuplicateKey`.
//! - Stable, generational handles: a `Handle` survives rehash and kind
//!   switches and becomes stale once its entry is erased.
//! - A failed operation leaves the map as it was.
//!
//! Bucket policy
//! - A linear bucket holding more than 8 entries becomes a tree once the
//!   directory has at least 64 slots; a tree that drops below 6 entries
//!   becomes linear again. The gap keeps a bucket from flapping.
//! - `Layout::LinearOnly` and `Layout::TreeOnly` pin every bucket to one
//!   structure.
//!
//! Hasher and rehashing invariants
//! - Each entry stores the hash computed at insertion and indexing always
//!   uses it; `Ops::hash` is never invoked after insertion.
//! - Growth doubles the directory. An entry either stays in slot `i` or
//!   moves to `i + old_capacity`, decided by the newly significant bit.
//! - The new directory is reserved before any entry moves. If that fails
//!   the map keeps its current directory and stays fully usable.
//!
//! Reentrancy policy
//! - Public entry points hold a debug-only reentrancy guard. `Ops` hooks
//!   run while buckets may be half rebuilt, so a hook that calls back
//!   into the same map panics in debug builds.
//!
//! Iteration order
//! - Slots in ascending index order; within a slot, linear buckets yield
//!   newest first and trees yield ascending key order. A bucket that turns
//!   back into a list keeps its key order. Reverse iteration is the exact
//!   mirror.
//! - Erasing never reorders the remaining entries, so a walk may continue
//!   from the position `erase` returns. Inserts may reorder.
//! - Handles carry the identity of the map that issued them; any other map
//!   rejects them with `Error::Detached`.
//!
//! Notes and non-goals
//! - No thread safety, persistence or shrinking of the directory.

mod bucket;
pub mod config;
mod error;
pub mod hash_map;
mod hash_map_proptest;
mod list;
mod node;
pub mod ops;
mod position;
mod reentrancy;
pub mod string_ops;
mod tree;

// Public surface
pub use bucket::BucketKind;
pub use config::{Config, Layout, LinearKind};
pub use error::{Error, Result};
pub use hash_map::{HashMap, Iter, IterMut};
pub use ops::{DefaultOps, Ops, Scalar, ScalarOps};
pub use position::{Handle, Position};
pub use string_ops::StringOps;
