// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tree-shaped buckets.
//!
//! A treeified bucket is a red-black tree ordered primarily by spread
//! hash, with `K: Ord` breaking hash ties. Keys whose `Ord` claims
//! equality without `Eq` agreeing (a broken contract) steer left on
//! insertion and are found again by scanning both subtrees, so lookup
//! stays correct even when balance cannot be guaranteed.
//!
//! Every tree keeps the doubly linked prev/next trail it had as a
//! chain. Iteration and splitting walk the trail, never the tree, so
//! traversal order survives treeify/untreeify transitions.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::mem;

use crate::config::UNTREEIFY_THRESHOLD;
use crate::nodes::chain::InsertOutcome;
use crate::nodes::{Bin, Node, NodeKey, Table};

impl<K, V> Table<K, V> {
    #[inline]
    fn is_red(&self, node: Option<NodeKey>) -> bool {
        node.map_or(false, |nk| self.node(nk).red)
    }

    /// Walk parent links up from any tree node to the root.
    pub(crate) fn tree_root(&self, mut node: NodeKey) -> NodeKey {
        while let Some(parent) = self.node(node).parent {
            node = parent;
        }
        node
    }

    /// Re-anchor the bucket slot at `root` and move `root` to the
    /// front of the prev/next trail.
    ///
    /// Called after any insertion or deletion whose rebalancing may
    /// have rotated a new node into root position. A slot that falls
    /// out of sync with the true root corrupts every future descent,
    /// so this is not optional bookkeeping.
    fn move_root_to_front(&mut self, index: usize, root: NodeKey) {
        let first = self.bins[index]
            .head()
            .expect("nodes::tree: re-anchoring an empty bin");
        if first != root {
            let prev = self.node(root).prev;
            let next = self.node(root).next;
            if let Some(prev) = prev {
                self.node_mut(prev).next = next;
            }
            if let Some(next) = next {
                self.node_mut(next).prev = prev;
            }
            self.node_mut(root).prev = None;
            self.node_mut(root).next = Some(first);
            self.node_mut(first).prev = Some(root);
        }
        self.bins[index] = Bin::Tree(root);
    }

    /// Find `key` in the tree containing `first`.
    pub(crate) fn tree_find<BK>(&self, first: NodeKey, hash: u32, key: &BK) -> Option<NodeKey>
    where
        K: Borrow<BK>,
        BK: Eq + Ord + ?Sized,
    {
        let root = self.tree_root(first);
        self.tree_find_from(root, hash, key)
    }

    /// Binary-search descent from `from`, using the same comparison
    /// rules as insertion.
    fn tree_find_from<BK>(&self, from: NodeKey, hash: u32, key: &BK) -> Option<NodeKey>
    where
        K: Borrow<BK>,
        BK: Eq + Ord + ?Sized,
    {
        let mut p = Some(from);
        while let Some(pk) = p {
            let node = self.node(pk);
            let (pl, pr) = (node.left, node.right);
            if node.hash > hash {
                p = pl;
            } else if node.hash < hash {
                p = pr;
            } else if node.key.borrow() == key {
                return Some(pk);
            } else if pl.is_none() {
                p = pr;
            } else if pr.is_none() {
                p = pl;
            } else {
                match key.cmp(node.key.borrow()) {
                    Ordering::Less => p = pl,
                    Ordering::Greater => p = pr,
                    Ordering::Equal => {
                        // Neither hash nor ordering can separate the
                        // keys. Scan the right subtree, then keep
                        // descending left.
                        if let Some(q) = self.tree_find_from(pr.unwrap(), hash, key) {
                            return Some(q);
                        }
                        p = pl;
                    }
                }
            }
        }
        None
    }

    /// Insert into a tree bin, rebalancing and re-anchoring the root.
    pub(crate) fn tree_insert(
        &mut self,
        first: NodeKey,
        index: usize,
        hash: u32,
        key: K,
        value: V,
    ) -> InsertOutcome<V>
    where
        K: Eq + Ord,
    {
        let root = self.tree_root(first);
        let mut searched = false;
        let mut p = root;
        loop {
            let (p_hash, pl, pr) = {
                let node = self.node(p);
                (node.hash, node.left, node.right)
            };
            let dir = if p_hash > hash {
                Ordering::Less
            } else if p_hash < hash {
                Ordering::Greater
            } else if self.node(p).key == key {
                let old = mem::replace(&mut self.node_mut(p).value, value);
                return InsertOutcome::Replaced { node: p, old };
            } else {
                match key.cmp(&self.node(p).key) {
                    Ordering::Equal => {
                        if !searched {
                            // First full tie on this descent: make
                            // sure the key is not hiding in either
                            // subtree before we commit to a direction.
                            searched = true;
                            let found = pl
                                .and_then(|c| self.tree_find_from(c, hash, &key))
                                .or_else(|| pr.and_then(|c| self.tree_find_from(c, hash, &key)));
                            if let Some(q) = found {
                                let old = mem::replace(&mut self.node_mut(q).value, value);
                                return InsertOutcome::Replaced { node: q, old };
                            }
                        }
                        // Ties steer left. Lookups scan both subtrees
                        // on a full tie, so placement only needs to be
                        // deterministic.
                        Ordering::Less
                    }
                    dir => dir,
                }
            };
            let child = if dir == Ordering::Less {
                self.node(p).left
            } else {
                self.node(p).right
            };
            match child {
                Some(c) => p = c,
                None => {
                    let xp = p;
                    let xpn = self.node(xp).next;
                    let x = self.nodes.insert(Node {
                        hash,
                        key,
                        value,
                        next: xpn,
                        prev: Some(xp),
                        parent: Some(xp),
                        left: None,
                        right: None,
                        red: false,
                    });
                    if dir == Ordering::Less {
                        self.node_mut(xp).left = Some(x);
                    } else {
                        self.node_mut(xp).right = Some(x);
                    }
                    self.node_mut(xp).next = Some(x);
                    if let Some(n) = xpn {
                        self.node_mut(n).prev = Some(x);
                    }
                    let new_root = self.balance_insertion(root, x);
                    self.move_root_to_front(index, new_root);
                    return InsertOutcome::Added {
                        node: x,
                        index,
                        needs_treeify: false,
                    };
                }
            }
        }
    }

    /// Convert the chain at `index` into a tree.
    ///
    /// The caller has already checked the capacity policy; this only
    /// does the conversion.
    pub(crate) fn treeify_bin(&mut self, index: usize)
    where
        K: Ord,
    {
        let head = match self.bins[index] {
            Bin::Chain(head) => head,
            _ => return,
        };
        // Thread the prev links; chains only maintain next.
        let mut prev: Option<NodeKey> = None;
        let mut cursor = Some(head);
        while let Some(nk) = cursor {
            self.node_mut(nk).prev = prev;
            prev = Some(nk);
            cursor = self.node(nk).next;
        }
        let root = self.treeify_list(head);
        self.move_root_to_front(index, root);
    }

    /// Build a fresh red-black tree over a prev/next trail, one
    /// insertion fix-up at a time, and return its root.
    fn treeify_list(&mut self, head: NodeKey) -> NodeKey
    where
        K: Ord,
    {
        let mut root: Option<NodeKey> = None;
        let mut x = Some(head);
        while let Some(xk) = x {
            let next = self.node(xk).next;
            {
                let node = self.node_mut(xk);
                node.parent = None;
                node.left = None;
                node.right = None;
                node.red = false;
            }
            match root {
                None => root = Some(xk),
                Some(r) => {
                    let hash = self.node(xk).hash;
                    let mut p = r;
                    loop {
                        let (p_hash, pl, pr) = {
                            let node = self.node(p);
                            (node.hash, node.left, node.right)
                        };
                        let dir = if p_hash > hash {
                            Ordering::Less
                        } else if p_hash < hash {
                            Ordering::Greater
                        } else {
                            match self.node(xk).key.cmp(&self.node(p).key) {
                                // Ties steer left, as on insertion.
                                Ordering::Equal => Ordering::Less,
                                dir => dir,
                            }
                        };
                        let child = if dir == Ordering::Less { pl } else { pr };
                        match child {
                            Some(c) => p = c,
                            None => {
                                self.node_mut(xk).parent = Some(p);
                                if dir == Ordering::Less {
                                    self.node_mut(p).left = Some(xk);
                                } else {
                                    self.node_mut(p).right = Some(xk);
                                }
                                root = Some(self.balance_insertion(r, xk));
                                break;
                            }
                        }
                    }
                }
            }
            x = next;
        }
        root.expect("nodes::tree: treeifying an empty trail")
    }

    /// Flatten the trail starting at `head` back into a plain chain at
    /// `index`.
    pub(crate) fn untreeify(&mut self, index: usize, head: NodeKey) {
        let mut cursor = Some(head);
        while let Some(nk) = cursor {
            let node = self.node_mut(nk);
            node.prev = None;
            node.parent = None;
            node.left = None;
            node.right = None;
            node.red = false;
            cursor = node.next;
        }
        self.bins[index] = Bin::Chain(head);
    }

    /// Partition the tree whose trail starts at `first` across the
    /// doubled table, re-treeifying or flattening each half.
    ///
    /// The partition walks the trail, not the tree, so relative order
    /// is preserved exactly as for chains.
    pub(crate) fn split_tree(&mut self, first: NodeKey, index: usize, bit: usize)
    where
        K: Ord,
    {
        let mut lo_head: Option<NodeKey> = None;
        let mut lo_tail: Option<NodeKey> = None;
        let mut lo_count = 0;
        let mut hi_head: Option<NodeKey> = None;
        let mut hi_tail: Option<NodeKey> = None;
        let mut hi_count = 0;
        let mut e = Some(first);
        while let Some(nk) = e {
            e = self.node(nk).next;
            self.node_mut(nk).next = None;
            if self.node(nk).hash as usize & bit == 0 {
                self.node_mut(nk).prev = lo_tail;
                match lo_tail {
                    Some(tail) => self.node_mut(tail).next = Some(nk),
                    None => lo_head = Some(nk),
                }
                lo_tail = Some(nk);
                lo_count += 1;
            } else {
                self.node_mut(nk).prev = hi_tail;
                match hi_tail {
                    Some(tail) => self.node_mut(tail).next = Some(nk),
                    None => hi_head = Some(nk),
                }
                hi_tail = Some(nk);
                hi_count += 1;
            }
        }
        if let Some(head) = lo_head {
            if lo_count <= UNTREEIFY_THRESHOLD {
                self.untreeify(index, head);
            } else {
                self.bins[index] = Bin::Tree(head);
                if hi_head.is_some() {
                    let root = self.treeify_list(head);
                    self.move_root_to_front(index, root);
                }
                // If the high half is empty the whole tree moved here
                // intact and needs no rebuild.
            }
        }
        if let Some(head) = hi_head {
            if hi_count <= UNTREEIFY_THRESHOLD {
                self.untreeify(index + bit, head);
            } else {
                self.bins[index + bit] = Bin::Tree(head);
                if lo_head.is_some() {
                    let root = self.treeify_list(head);
                    self.move_root_to_front(index + bit, root);
                }
            }
        }
    }

    /// Unlink `p` from the tree bin at `index`, rebalancing and
    /// untreeifying as needed. The node stays in the arena for the
    /// caller to reclaim.
    pub(crate) fn remove_tree_node(&mut self, p: NodeKey, index: usize, movable: bool) {
        let bin_first = match self.bins[index] {
            Bin::Tree(first) => first,
            _ => panic!("nodes::tree: removing a tree node from a non-tree bin"),
        };
        // Trail unlink comes first; tree surgery below never touches
        // the prev/next links again.
        let succ = self.node(p).next;
        let pred = self.node(p).prev;
        if let Some(pred) = pred {
            self.node_mut(pred).next = succ;
        }
        if let Some(succ) = succ {
            self.node_mut(succ).prev = pred;
        }
        let first = match pred {
            None => match succ {
                Some(succ) => {
                    self.bins[index] = Bin::Tree(succ);
                    succ
                }
                None => {
                    self.bins[index] = Bin::Empty;
                    return;
                }
            },
            Some(_) => bin_first,
        };
        let mut root = self.tree_root(first);
        // Too small to stay a tree? The shape test is a constant-time
        // stand-in for an exact count: it trips somewhere between two
        // and six remaining nodes.
        if movable
            && (self.node(root).right.is_none()
                || self.node(root).left.is_none()
                || self.node(self.node(root).left.unwrap()).left.is_none())
        {
            self.untreeify(index, first);
            return;
        }
        let (pl, pr) = (self.node(p).left, self.node(p).right);
        let replacement;
        if let (Some(pl), Some(pr)) = (pl, pr) {
            // Two children: swap p with its in-order successor, which
            // has at most a right child, and splice p out down there.
            // Node positions are exchanged rather than contents so
            // that outstanding node handles stay attached to their
            // entries.
            let mut s = pr;
            while let Some(sl) = self.node(s).left {
                s = sl;
            }
            let s_red = self.node(s).red;
            let p_red = self.node(p).red;
            self.node_mut(s).red = p_red;
            self.node_mut(p).red = s_red;
            let sr = self.node(s).right;
            let pp = self.node(p).parent;
            if s == pr {
                self.node_mut(p).parent = Some(s);
                self.node_mut(s).right = Some(p);
            } else {
                let sp = self.node(s).parent;
                self.node_mut(p).parent = sp;
                if let Some(sp) = sp {
                    if self.node(sp).left == Some(s) {
                        self.node_mut(sp).left = Some(p);
                    } else {
                        self.node_mut(sp).right = Some(p);
                    }
                }
                self.node_mut(s).right = Some(pr);
                self.node_mut(pr).parent = Some(s);
            }
            self.node_mut(p).left = None;
            self.node_mut(p).right = sr;
            if let Some(sr) = sr {
                self.node_mut(sr).parent = Some(p);
            }
            self.node_mut(s).left = Some(pl);
            self.node_mut(pl).parent = Some(s);
            self.node_mut(s).parent = pp;
            match pp {
                None => root = s,
                Some(pp) => {
                    if self.node(pp).left == Some(p) {
                        self.node_mut(pp).left = Some(s);
                    } else {
                        self.node_mut(pp).right = Some(s);
                    }
                }
            }
            replacement = sr.unwrap_or(p);
        } else if let Some(pl) = pl {
            replacement = pl;
        } else if let Some(pr) = pr {
            replacement = pr;
        } else {
            replacement = p;
        }
        if replacement != p {
            let pp = self.node(p).parent;
            self.node_mut(replacement).parent = pp;
            match pp {
                None => {
                    root = replacement;
                    self.node_mut(replacement).red = false;
                }
                Some(pp) => {
                    if self.node(pp).left == Some(p) {
                        self.node_mut(pp).left = Some(replacement);
                    } else {
                        self.node_mut(pp).right = Some(replacement);
                    }
                }
            }
            let node = self.node_mut(p);
            node.left = None;
            node.right = None;
            node.parent = None;
        }
        let new_root = if self.node(p).red {
            root
        } else {
            self.balance_deletion(root, replacement)
        };
        if replacement == p {
            // p was a leaf: it stayed linked as the fix-up's anchor,
            // so detach it now.
            let pp = self.node(p).parent;
            self.node_mut(p).parent = None;
            if let Some(pp) = pp {
                if self.node(pp).left == Some(p) {
                    self.node_mut(pp).left = None;
                } else {
                    self.node_mut(pp).right = None;
                }
            }
        }
        if movable {
            self.move_root_to_front(index, new_root);
        }
    }

    fn rotate_left(&mut self, mut root: NodeKey, p: NodeKey) -> NodeKey {
        if let Some(r) = self.node(p).right {
            let rl = self.node(r).left;
            self.node_mut(p).right = rl;
            if let Some(rl) = rl {
                self.node_mut(rl).parent = Some(p);
            }
            let pp = self.node(p).parent;
            self.node_mut(r).parent = pp;
            match pp {
                None => {
                    root = r;
                    self.node_mut(r).red = false;
                }
                Some(pp) => {
                    if self.node(pp).left == Some(p) {
                        self.node_mut(pp).left = Some(r);
                    } else {
                        self.node_mut(pp).right = Some(r);
                    }
                }
            }
            self.node_mut(r).left = Some(p);
            self.node_mut(p).parent = Some(r);
        }
        root
    }

    fn rotate_right(&mut self, mut root: NodeKey, p: NodeKey) -> NodeKey {
        if let Some(l) = self.node(p).left {
            let lr = self.node(l).right;
            self.node_mut(p).left = lr;
            if let Some(lr) = lr {
                self.node_mut(lr).parent = Some(p);
            }
            let pp = self.node(p).parent;
            self.node_mut(l).parent = pp;
            match pp {
                None => {
                    root = l;
                    self.node_mut(l).red = false;
                }
                Some(pp) => {
                    if self.node(pp).right == Some(p) {
                        self.node_mut(pp).right = Some(l);
                    } else {
                        self.node_mut(pp).left = Some(l);
                    }
                }
            }
            self.node_mut(l).right = Some(p);
            self.node_mut(p).parent = Some(l);
        }
        root
    }

    /// Classic insertion fix-up: re-color while the uncle is red,
    /// rotate once or twice when it is not, and force the root black.
    fn balance_insertion(&mut self, mut root: NodeKey, mut x: NodeKey) -> NodeKey {
        self.node_mut(x).red = true;
        loop {
            let xp = match self.node(x).parent {
                None => {
                    self.node_mut(x).red = false;
                    return x;
                }
                Some(xp) => xp,
            };
            if !self.node(xp).red {
                return root;
            }
            let xpp = match self.node(xp).parent {
                None => return root,
                Some(xpp) => xpp,
            };
            if self.node(xpp).left == Some(xp) {
                let xppr = self.node(xpp).right;
                if self.is_red(xppr) {
                    self.node_mut(xppr.unwrap()).red = false;
                    self.node_mut(xp).red = false;
                    self.node_mut(xpp).red = true;
                    x = xpp;
                } else {
                    if self.node(xp).right == Some(x) {
                        x = xp;
                        root = self.rotate_left(root, x);
                    }
                    if let Some(xp) = self.node(x).parent {
                        self.node_mut(xp).red = false;
                        if let Some(xpp) = self.node(xp).parent {
                            self.node_mut(xpp).red = true;
                            root = self.rotate_right(root, xpp);
                        }
                    }
                }
            } else {
                let xppl = self.node(xpp).left;
                if self.is_red(xppl) {
                    self.node_mut(xppl.unwrap()).red = false;
                    self.node_mut(xp).red = false;
                    self.node_mut(xpp).red = true;
                    x = xpp;
                } else {
                    if self.node(xp).left == Some(x) {
                        x = xp;
                        root = self.rotate_right(root, x);
                    }
                    if let Some(xp) = self.node(x).parent {
                        self.node_mut(xp).red = false;
                        if let Some(xpp) = self.node(xp).parent {
                            self.node_mut(xpp).red = true;
                            root = self.rotate_left(root, xpp);
                        }
                    }
                }
            }
        }
    }

    /// Deletion fix-up: the spliced-out node was black, so one path is
    /// short a black node until recoloring or rotation restores it.
    fn balance_deletion(&mut self, mut root: NodeKey, x: NodeKey) -> NodeKey {
        let mut x: Option<NodeKey> = Some(x);
        loop {
            let xk = match x {
                None => return root,
                Some(xk) if xk == root => return root,
                Some(xk) => xk,
            };
            let mut xp = match self.node(xk).parent {
                None => {
                    self.node_mut(xk).red = false;
                    return xk;
                }
                Some(xp) => xp,
            };
            if self.node(xk).red {
                self.node_mut(xk).red = false;
                return root;
            }
            if self.node(xp).left == Some(xk) {
                let mut xpr = self.node(xp).right;
                if self.is_red(xpr) {
                    self.node_mut(xpr.unwrap()).red = false;
                    self.node_mut(xp).red = true;
                    root = self.rotate_left(root, xp);
                    match self.node(xk).parent {
                        Some(nxp) => {
                            xp = nxp;
                            xpr = self.node(nxp).right;
                        }
                        None => {
                            x = None;
                            continue;
                        }
                    }
                }
                match xpr {
                    None => x = Some(xp),
                    Some(sib) => {
                        let sl = self.node(sib).left;
                        let sr = self.node(sib).right;
                        if !self.is_red(sl) && !self.is_red(sr) {
                            self.node_mut(sib).red = true;
                            x = Some(xp);
                        } else {
                            let mut xp_opt = Some(xp);
                            let mut sib_opt = Some(sib);
                            if !self.is_red(sr) {
                                if let Some(sl) = sl {
                                    self.node_mut(sl).red = false;
                                }
                                self.node_mut(sib).red = true;
                                root = self.rotate_right(root, sib);
                                xp_opt = self.node(xk).parent;
                                sib_opt = xp_opt.and_then(|k| self.node(k).right);
                            }
                            if let Some(sib) = sib_opt {
                                let inherit = xp_opt.map_or(false, |k| self.node(k).red);
                                self.node_mut(sib).red = inherit;
                                if let Some(sr) = self.node(sib).right {
                                    self.node_mut(sr).red = false;
                                }
                            }
                            if let Some(xp) = xp_opt {
                                self.node_mut(xp).red = false;
                                root = self.rotate_left(root, xp);
                            }
                            x = Some(root);
                        }
                    }
                }
            } else {
                // Mirror image of the case above.
                let mut xpl = self.node(xp).left;
                if self.is_red(xpl) {
                    self.node_mut(xpl.unwrap()).red = false;
                    self.node_mut(xp).red = true;
                    root = self.rotate_right(root, xp);
                    match self.node(xk).parent {
                        Some(nxp) => {
                            xp = nxp;
                            xpl = self.node(nxp).left;
                        }
                        None => {
                            x = None;
                            continue;
                        }
                    }
                }
                match xpl {
                    None => x = Some(xp),
                    Some(sib) => {
                        let sl = self.node(sib).left;
                        let sr = self.node(sib).right;
                        if !self.is_red(sl) && !self.is_red(sr) {
                            self.node_mut(sib).red = true;
                            x = Some(xp);
                        } else {
                            let mut xp_opt = Some(xp);
                            let mut sib_opt = Some(sib);
                            if !self.is_red(sl) {
                                if let Some(sr) = sr {
                                    self.node_mut(sr).red = false;
                                }
                                self.node_mut(sib).red = true;
                                root = self.rotate_left(root, sib);
                                xp_opt = self.node(xk).parent;
                                sib_opt = xp_opt.and_then(|k| self.node(k).left);
                            }
                            if let Some(sib) = sib_opt {
                                let inherit = xp_opt.map_or(false, |k| self.node(k).red);
                                self.node_mut(sib).red = inherit;
                                if let Some(sl) = self.node(sib).left {
                                    self.node_mut(sl).red = false;
                                }
                            }
                            if let Some(xp) = xp_opt {
                                self.node_mut(xp).red = false;
                                root = self.rotate_right(root, xp);
                            }
                            x = Some(root);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(any(test, feature = "debug"))]
impl<K, V> Table<K, V> {
    /// Verify every structural invariant the table is supposed to
    /// uphold. Panics on the first violation.
    ///
    /// `strict_root` additionally demands that every tree slot
    /// references its true root; cursor-driven removal legitimately
    /// defers that until the next tree mutation.
    pub(crate) fn check(&self, expected_size: usize, strict_root: bool) {
        let mut seen = 0;
        for (index, bin) in self.bins.iter().enumerate() {
            match *bin {
                Bin::Empty => {}
                Bin::Chain(head) => {
                    let mut cursor = Some(head);
                    while let Some(nk) = cursor {
                        let node = self.node(nk);
                        assert_eq!(index, self.bin_index(node.hash), "chain node in wrong bin");
                        assert!(node.prev.is_none(), "chain node with trail link");
                        assert!(node.parent.is_none(), "chain node with parent");
                        assert!(node.left.is_none() && node.right.is_none());
                        assert!(!node.red, "chain node colored red");
                        seen += 1;
                        cursor = node.next;
                    }
                }
                Bin::Tree(first) => {
                    seen += self.check_tree(index, first, strict_root);
                }
            }
        }
        assert_eq!(expected_size, seen, "trail traversal disagrees with size");
        assert_eq!(expected_size, self.nodes.len(), "arena leaks nodes");
    }

    fn check_tree(&self, index: usize, first: NodeKey, strict_root: bool) -> usize {
        use std::collections::HashSet;

        let root = self.tree_root(first);
        if strict_root {
            assert_eq!(root, first, "tree slot not anchored at its root");
        }
        assert!(!self.node(root).red, "red root");

        // The trail and the tree must contain exactly the same nodes.
        let mut trail = HashSet::new();
        let mut cursor = Some(first);
        let mut prev = None;
        while let Some(nk) = cursor {
            let node = self.node(nk);
            assert_eq!(index, self.bin_index(node.hash), "tree node in wrong bin");
            assert_eq!(prev, node.prev, "broken trail back-link");
            assert!(trail.insert(nk), "trail cycle");
            prev = Some(nk);
            cursor = node.next;
        }
        let black_height = self.check_subtree(root, &trail);
        assert!(black_height > 0);

        let mut tree_count = 0;
        let mut stack = vec![root];
        while let Some(nk) = stack.pop() {
            tree_count += 1;
            let node = self.node(nk);
            stack.extend(node.left);
            stack.extend(node.right);
        }
        assert_eq!(trail.len(), tree_count, "trail and tree disagree");
        trail.len()
    }

    /// Returns the black height of the subtree at `nk`.
    fn check_subtree(
        &self,
        nk: NodeKey,
        trail: &std::collections::HashSet<NodeKey>,
    ) -> usize {
        let node = self.node(nk);
        assert!(trail.contains(&nk), "tree node missing from trail");
        let mut heights = [0; 2];
        for (slot, child) in [(0, node.left), (1, node.right)].iter() {
            match child {
                None => heights[*slot] = 1,
                Some(c) => {
                    let child_node = self.node(*c);
                    assert_eq!(Some(nk), child_node.parent, "broken parent link");
                    assert!(
                        !(node.red && child_node.red),
                        "red node with red child"
                    );
                    if *slot == 0 {
                        assert!(child_node.hash <= node.hash, "left child hash too large");
                    } else {
                        assert!(child_node.hash >= node.hash, "right child hash too small");
                    }
                    heights[*slot] = self.check_subtree(*c, trail);
                }
            }
        }
        assert_eq!(heights[0], heights[1], "unequal black heights");
        heights[0] + usize::from(!node.red)
    }
}
