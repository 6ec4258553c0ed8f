//! Intrusive linked lists over arena nodes.
//!
//! `ChainHead` only knows its first node, like a classic hash chain, so
//! finding the tail walks the chain. `ListHead` tracks both ends. Both push
//! at the front and share the same embedded `ListLink`.

use crate::node::{ListArena, ListLink, NodeKey};

#[inline]
pub(crate) fn next<A: ListArena>(a: &A, n: NodeKey) -> Option<NodeKey> {
    a.list(n).next
}

#[inline]
pub(crate) fn prev<A: ListArena>(a: &A, n: NodeKey) -> Option<NodeKey> {
    a.list(n).prev
}

/// Detach `n` from its neighbours and return the links it had.
fn splice_out<A: ListArena>(a: &mut A, n: NodeKey) -> ListLink {
    let link = core::mem::take(a.list_mut(n));
    if let Some(p) = link.prev {
        a.list_mut(p).next = link.next;
    }
    if let Some(x) = link.next {
        a.list_mut(x).prev = link.prev;
    }
    link
}

fn link_before<A: ListArena>(a: &mut A, n: NodeKey, first: Option<NodeKey>) {
    *a.list_mut(n) = ListLink {
        prev: None,
        next: first,
    };
    if let Some(f) = first {
        a.list_mut(f).prev = Some(n);
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct ChainHead {
    first: Option<NodeKey>,
}

impl ChainHead {
    #[inline]
    pub(crate) fn first(&self) -> Option<NodeKey> {
        self.first
    }

    pub(crate) fn last<A: ListArena>(&self, a: &A) -> Option<NodeKey> {
        let mut cur = self.first?;
        while let Some(n) = next(a, cur) {
            cur = n;
        }
        Some(cur)
    }

    pub(crate) fn push_front<A: ListArena>(&mut self, a: &mut A, n: NodeKey) {
        link_before(a, n, self.first);
        self.first = Some(n);
    }

    pub(crate) fn unlink<A: ListArena>(&mut self, a: &mut A, n: NodeKey) {
        let link = splice_out(a, n);
        if link.prev.is_none() {
            self.first = link.next;
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct ListHead {
    first: Option<NodeKey>,
    last: Option<NodeKey>,
}

impl ListHead {
    #[inline]
    pub(crate) fn first(&self) -> Option<NodeKey> {
        self.first
    }

    #[inline]
    pub(crate) fn last(&self) -> Option<NodeKey> {
        self.last
    }

    pub(crate) fn push_front<A: ListArena>(&mut self, a: &mut A, n: NodeKey) {
        link_before(a, n, self.first);
        self.first = Some(n);
        if self.last.is_none() {
            self.last = Some(n);
        }
    }

    pub(crate) fn unlink<A: ListArena>(&mut self, a: &mut A, n: NodeKey) {
        let link = splice_out(a, n);
        if link.prev.is_none() {
            self.first = link.next;
        }
        if link.next.is_none() {
            self.last = link.prev;
        }
    }
}
