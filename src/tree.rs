//! Red-black tree over parent-linked arena nodes.
//!
//! The tree never compares keys: callers descend with their own ordering
//! and hand `link` the vacant position they found. Removal relinks nodes
//! instead of swapping payloads, so a node's arena key is stable for as
//! long as it is in the tree.

use crate::node::{Color, NodeKey, TreeArena, TreeLink};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl Side {
    #[inline]
    fn flip(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[inline]
fn parent_of<A: TreeArena>(a: &A, n: NodeKey) -> Option<NodeKey> {
    a.tree(n).parent
}

#[inline]
pub(crate) fn child<A: TreeArena>(a: &A, n: NodeKey, side: Side) -> Option<NodeKey> {
    match side {
        Side::Left => a.tree(n).left,
        Side::Right => a.tree(n).right,
    }
}

#[inline]
fn set_child<A: TreeArena>(a: &mut A, n: NodeKey, side: Side, c: Option<NodeKey>) {
    match side {
        Side::Left => a.tree_mut(n).left = c,
        Side::Right => a.tree_mut(n).right = c,
    }
}

#[inline]
fn is_red<A: TreeArena>(a: &A, n: Option<NodeKey>) -> bool {
    n.is_some_and(|n| a.tree(n).color == Color::Red)
}

#[inline]
fn set_color<A: TreeArena>(a: &mut A, n: NodeKey, color: Color) {
    a.tree_mut(n).color = color;
}

fn side_of<A: TreeArena>(a: &A, parent: NodeKey, n: NodeKey) -> Side {
    if a.tree(parent).left == Some(n) {
        Side::Left
    } else {
        Side::Right
    }
}

fn extreme<A: TreeArena>(a: &A, mut n: NodeKey, side: Side) -> NodeKey {
    while let Some(c) = child(a, n, side) {
        n = c;
    }
    n
}

fn step<A: TreeArena>(a: &A, n: NodeKey, side: Side) -> Option<NodeKey> {
    if let Some(c) = child(a, n, side) {
        return Some(extreme(a, c, side.flip()));
    }
    let mut cur = n;
    while let Some(p) = parent_of(a, cur) {
        if child(a, p, side.flip()) == Some(cur) {
            return Some(p);
        }
        cur = p;
    }
    None
}

/// In-order successor.
pub(crate) fn next<A: TreeArena>(a: &A, n: NodeKey) -> Option<NodeKey> {
    step(a, n, Side::Right)
}

/// In-order predecessor.
pub(crate) fn prev<A: TreeArena>(a: &A, n: NodeKey) -> Option<NodeKey> {
    step(a, n, Side::Left)
}

#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct TreeRoot {
    root: Option<NodeKey>,
}

impl TreeRoot {
    #[inline]
    pub(crate) fn root(&self) -> Option<NodeKey> {
        self.root
    }

    pub(crate) fn first<A: TreeArena>(&self, a: &A) -> Option<NodeKey> {
        self.root.map(|r| extreme(a, r, Side::Left))
    }

    pub(crate) fn last<A: TreeArena>(&self, a: &A) -> Option<NodeKey> {
        self.root.map(|r| extreme(a, r, Side::Right))
    }

    /// Attach `n` as a red leaf at `at` (`None` only for an empty tree) and
    /// restore the red-black properties.
    pub(crate) fn link<A: TreeArena>(&mut self, a: &mut A, n: NodeKey, at: Option<(NodeKey, Side)>) {
        debug_assert!(at.is_some() || self.root.is_none());
        *a.tree_mut(n) = TreeLink {
            parent: at.map(|(p, _)| p),
            ..TreeLink::default()
        };
        match at {
            None => self.root = Some(n),
            Some((p, side)) => set_child(a, p, side, Some(n)),
        }
        self.insert_fixup(a, n);
    }

    /// Unlink `n` and rebalance. `n` comes back with cleared links.
    pub(crate) fn erase<A: TreeArena>(&mut self, a: &mut A, n: NodeKey) {
        let TreeLink {
            parent: np,
            left: nl,
            right: nr,
            color: nc,
        } = *a.tree(n);

        let (x, x_parent, removed) = match (nl, nr) {
            (None, _) => {
                self.transplant(a, n, nr);
                (nr, np, nc)
            }
            (_, None) => {
                self.transplant(a, n, nl);
                (nl, np, nc)
            }
            (Some(l), Some(r)) => {
                let y = extreme(a, r, Side::Left);
                let removed = a.tree(y).color;
                let x = a.tree(y).right;
                let x_parent = if y == r {
                    Some(y)
                } else {
                    let yp = parent_of(a, y);
                    self.transplant(a, y, x);
                    a.tree_mut(y).right = Some(r);
                    a.tree_mut(r).parent = Some(y);
                    yp
                };
                self.transplant(a, n, Some(y));
                a.tree_mut(y).left = Some(l);
                a.tree_mut(l).parent = Some(y);
                set_color(a, y, nc);
                (x, x_parent, removed)
            }
        };

        *a.tree_mut(n) = TreeLink::default();
        if removed == Color::Black {
            self.erase_fixup(a, x, x_parent);
        }
    }

    fn replace_child<A: TreeArena>(
        &mut self,
        a: &mut A,
        parent: Option<NodeKey>,
        old: NodeKey,
        new: Option<NodeKey>,
    ) {
        match parent {
            None => self.root = new,
            Some(p) => {
                let side = side_of(a, p, old);
                set_child(a, p, side, new);
            }
        }
    }

    fn transplant<A: TreeArena>(&mut self, a: &mut A, u: NodeKey, v: Option<NodeKey>) {
        let up = parent_of(a, u);
        self.replace_child(a, up, u, v);
        if let Some(v) = v {
            a.tree_mut(v).parent = up;
        }
    }

    /// Rotate `x` down towards `dir`; its child on the other side takes its place.
    fn rotate<A: TreeArena>(&mut self, a: &mut A, x: NodeKey, dir: Side) {
        let y = child(a, x, dir.flip()).expect("rotation pivot has a child");
        let inner = child(a, y, dir);
        set_child(a, x, dir.flip(), inner);
        if let Some(b) = inner {
            a.tree_mut(b).parent = Some(x);
        }
        let xp = parent_of(a, x);
        a.tree_mut(y).parent = xp;
        self.replace_child(a, xp, x, Some(y));
        set_child(a, y, dir, Some(x));
        a.tree_mut(x).parent = Some(y);
    }

    fn insert_fixup<A: TreeArena>(&mut self, a: &mut A, mut z: NodeKey) {
        while let Some(p) = parent_of(a, z) {
            if !is_red(a, Some(p)) {
                break;
            }
            let g = parent_of(a, p).expect("a red node is never the root");
            let side = side_of(a, g, p);
            let uncle = child(a, g, side.flip());
            if let Some(u) = uncle.filter(|&u| is_red(a, Some(u))) {
                set_color(a, p, Color::Black);
                set_color(a, u, Color::Black);
                set_color(a, g, Color::Red);
                z = g;
                continue;
            }
            let mut p = p;
            if child(a, p, side.flip()) == Some(z) {
                self.rotate(a, p, side);
                z = p;
                p = parent_of(a, z).expect("rotated node has a parent");
            }
            set_color(a, p, Color::Black);
            set_color(a, g, Color::Red);
            self.rotate(a, g, side.flip());
            break;
        }
        if let Some(r) = self.root {
            set_color(a, r, Color::Black);
        }
    }

    fn erase_fixup<A: TreeArena>(
        &mut self,
        a: &mut A,
        mut x: Option<NodeKey>,
        mut parent: Option<NodeKey>,
    ) {
        while x != self.root && !is_red(a, x) {
            let Some(p) = parent else { break };
            let side = if a.tree(p).left == x {
                Side::Left
            } else {
                Side::Right
            };
            let mut w = child(a, p, side.flip()).expect("a short subtree has a sibling");
            if is_red(a, Some(w)) {
                set_color(a, w, Color::Black);
                set_color(a, p, Color::Red);
                self.rotate(a, p, side);
                w = child(a, p, side.flip()).expect("a short subtree has a sibling");
            }
            if !is_red(a, child(a, w, Side::Left)) && !is_red(a, child(a, w, Side::Right)) {
                set_color(a, w, Color::Red);
                x = Some(p);
                parent = parent_of(a, p);
                continue;
            }
            if !is_red(a, child(a, w, side.flip())) {
                if let Some(inner) = child(a, w, side) {
                    set_color(a, inner, Color::Black);
                }
                set_color(a, w, Color::Red);
                self.rotate(a, w, side.flip());
                w = child(a, p, side.flip()).expect("a short subtree has a sibling");
            }
            let pc = a.tree(p).color;
            set_color(a, w, pc);
            set_color(a, p, Color::Black);
            if let Some(outer) = child(a, w, side.flip()) {
                set_color(a, outer, Color::Black);
            }
            self.rotate(a, p, side);
            x = self.root;
            break;
        }
        if let Some(x) = x {
            set_color(a, x, Color::Black);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::node::{Node, Nodes};

    fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
        std::iter::from_fn(move || {
            s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
            Some(s >> 33)
        })
    }

    fn insert(root: &mut TreeRoot, a: &mut Nodes<u32, ()>, k: u32) -> NodeKey {
        let n = a.insert(Node::new(0, k, ()));
        let mut at = None;
        let mut cur = root.root();
        while let Some(c) = cur {
            let side = if k < a[c].key { Side::Left } else { Side::Right };
            at = Some((c, side));
            cur = child(a, c, side);
        }
        root.link(a, n, at);
        n
    }

    /// Walks the whole tree checking parent links, key order and colouring.
    /// Returns the black height.
    pub(crate) fn check<K: Ord, V>(a: &Nodes<K, V>, root: &TreeRoot) -> usize {
        fn walk<K: Ord, V>(a: &Nodes<K, V>, n: Option<NodeKey>, parent: Option<NodeKey>) -> usize {
            let Some(n) = n else { return 1 };
            let t = a.tree(n);
            assert_eq!(t.parent, parent, "parent link mismatch");
            if t.color == Color::Red {
                assert!(!is_red(a, t.left) && !is_red(a, t.right), "red node with red child");
            }
            if let Some(l) = t.left {
                assert!(a[l].key <= a[n].key, "left child out of order");
            }
            if let Some(r) = t.right {
                assert!(a[n].key <= a[r].key, "right child out of order");
            }
            let lh = walk(a, t.left, Some(n));
            let rh = walk(a, t.right, Some(n));
            assert_eq!(lh, rh, "unequal black height");
            lh + usize::from(t.color == Color::Black)
        }
        if let Some(r) = root.root() {
            assert_eq!(a.tree(r).color, Color::Black, "root must be black");
        }
        walk(a, root.root(), None)
    }

    fn in_order(a: &Nodes<u32, ()>, root: &TreeRoot) -> Vec<u32> {
        let mut out = Vec::new();
        let mut cur = root.first(a);
        while let Some(n) = cur {
            out.push(a[n].key);
            cur = next(a, n);
        }
        out
    }

    /// Invariant: ascending, descending and shuffled inserts all keep the
    /// red-black properties and yield sorted in-order traversal.
    #[test]
    fn inserts_stay_balanced() {
        let orders: Vec<Vec<u32>> = vec![
            (0..200).collect(),
            (0..200).rev().collect(),
            lcg(7).take(200).map(|x| (x % 1000) as u32).collect(),
        ];
        for order in orders {
            let mut a = Nodes::with_key();
            let mut root = TreeRoot::default();
            for &k in &order {
                insert(&mut root, &mut a, k);
                check(&a, &root);
            }
            let mut sorted = order.clone();
            sorted.sort();
            assert_eq!(in_order(&a, &root), sorted);
        }
    }

    /// Invariant: erasing in pseudo-random order keeps the tree valid, keeps the
    /// remaining nodes' keys stable and empties the root at the end.
    #[test]
    fn erase_random_order() {
        let mut a = Nodes::with_key();
        let mut root = TreeRoot::default();
        let mut nodes: Vec<NodeKey> = (0..128).map(|k| insert(&mut root, &mut a, k)).collect();
        let mut rng = lcg(42);
        while !nodes.is_empty() {
            let i = rng.next().unwrap() as usize % nodes.len();
            let n = nodes.swap_remove(i);
            root.erase(&mut a, n);
            assert_eq!(*a.tree(n), TreeLink::default());
            check(&a, &root);
            let mut expect: Vec<u32> = nodes.iter().map(|&k| a[k].key).collect();
            expect.sort();
            assert_eq!(in_order(&a, &root), expect);
        }
        assert!(root.root().is_none());
    }

    /// Invariant: `prev` mirrors `next`, and `first`/`last` are the extremes.
    #[test]
    fn traversal_both_directions() {
        let mut a = Nodes::with_key();
        let mut root = TreeRoot::default();
        assert!(root.first(&a).is_none() && root.last(&a).is_none());
        for k in lcg(3).take(64).map(|x| (x % 500) as u32) {
            insert(&mut root, &mut a, k);
        }
        let forward = in_order(&a, &root);
        let mut backward = Vec::new();
        let mut cur = root.last(&a);
        while let Some(n) = cur {
            backward.push(a[n].key);
            cur = prev(&a, n);
        }
        backward.reverse();
        assert_eq!(forward, backward);
        assert_eq!(root.first(&a).map(|n| a[n].key), forward.first().copied());
        assert_eq!(root.last(&a).map(|n| a[n].key), forward.last().copied());
    }
}
