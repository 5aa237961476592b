// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Chain-shaped buckets and the resize engine.
//!
//! Everything here treats a bucket as a singly linked list. The moment
//! a bucket escalates to a tree, operations dispatch into
//! [`tree`][super::tree] instead; the resize engine below is the one
//! place that sees both shapes.

use std::borrow::Borrow;
use std::mem;

use crate::config::TREEIFY_THRESHOLD;
use crate::nodes::{Bin, Node, NodeKey, Table};

/// What happened during a structural insert.
pub(crate) enum InsertOutcome<V> {
    /// The key was already mapped; the old value has been swapped out.
    Replaced { node: NodeKey, old: V },
    /// A new node was linked in. `needs_treeify` reports that the
    /// node's chain has reached the treeify threshold; the caller
    /// decides between treeifying and resizing.
    Added {
        node: NodeKey,
        index: usize,
        needs_treeify: bool,
    },
}

impl<K, V> Table<K, V> {
    /// Locate the node for `key`, if any.
    pub(crate) fn find<BK>(&self, hash: u32, key: &BK) -> Option<NodeKey>
    where
        K: Borrow<BK>,
        BK: Eq + Ord + ?Sized,
    {
        if self.bins.is_empty() {
            return None;
        }
        match self.bins[self.bin_index(hash)] {
            Bin::Empty => None,
            Bin::Chain(head) => {
                let mut cursor = Some(head);
                while let Some(nk) = cursor {
                    let node = self.node(nk);
                    if node.hash == hash && node.key.borrow() == key {
                        return Some(nk);
                    }
                    cursor = node.next;
                }
                None
            }
            Bin::Tree(first) => self.tree_find(first, hash, key),
        }
    }

    /// Insert `key`/`value`, replacing in place if the key is present.
    ///
    /// The caller has already ensured the table is allocated.
    pub(crate) fn insert(&mut self, hash: u32, key: K, value: V) -> InsertOutcome<V>
    where
        K: Eq + Ord,
    {
        let index = self.bin_index(hash);
        match self.bins[index] {
            Bin::Empty => {
                let node = self.nodes.insert(Node::new(hash, key, value));
                self.bins[index] = Bin::Chain(node);
                InsertOutcome::Added {
                    node,
                    index,
                    needs_treeify: false,
                }
            }
            Bin::Chain(head) => {
                let mut len = 1;
                let mut cursor = head;
                loop {
                    let node = self.node(cursor);
                    if node.hash == hash && node.key == key {
                        let old = mem::replace(&mut self.node_mut(cursor).value, value);
                        return InsertOutcome::Replaced { node: cursor, old };
                    }
                    match node.next {
                        Some(next) => {
                            cursor = next;
                            len += 1;
                        }
                        None => break,
                    }
                }
                let node = self.nodes.insert(Node::new(hash, key, value));
                self.node_mut(cursor).next = Some(node);
                len += 1;
                InsertOutcome::Added {
                    node,
                    index,
                    needs_treeify: len >= TREEIFY_THRESHOLD,
                }
            }
            Bin::Tree(first) => self.tree_insert(first, index, hash, key, value),
        }
    }

    /// Unlink `node` from its bucket. The node itself stays in the
    /// arena; the caller takes it out to recover the key and value.
    ///
    /// `movable` is false for cursor-driven removal, which must not
    /// shuffle the prev/next trail underneath the cursor.
    pub(crate) fn remove_node(&mut self, node: NodeKey, movable: bool) {
        let hash = self.node(node).hash;
        let index = self.bin_index(hash);
        match self.bins[index] {
            Bin::Empty => panic!("nodes::chain: removing from an empty bin"),
            Bin::Chain(head) => {
                if head == node {
                    self.bins[index] = match self.node(node).next {
                        Some(next) => Bin::Chain(next),
                        None => Bin::Empty,
                    };
                } else {
                    let mut cursor = head;
                    loop {
                        let next = self
                            .node(cursor)
                            .next
                            .expect("nodes::chain: node not on its own chain");
                        if next == node {
                            self.node_mut(cursor).next = self.node(node).next;
                            break;
                        }
                        cursor = next;
                    }
                }
            }
            Bin::Tree(_) => self.remove_tree_node(node, index, movable),
        }
    }

    /// Double (or initially allocate) the table to `new_capacity`
    /// buckets, re-distributing every bucket's contents into the "low"
    /// bucket it occupied before or the "high" bucket `old_capacity`
    /// slots above it.
    ///
    /// Doubling adds exactly one significant bit to the index mask, so
    /// `hash & old_capacity` fully decides each node's new home.
    pub(crate) fn grow(&mut self, new_capacity: usize)
    where
        K: Ord,
    {
        debug_assert!(new_capacity.is_power_of_two());
        let old_capacity = self.bins.len();
        let old_bins = mem::replace(&mut self.bins, vec![Bin::Empty; new_capacity]);
        for (index, bin) in old_bins.into_iter().enumerate() {
            match bin {
                Bin::Empty => {}
                Bin::Chain(head) => self.split_chain(head, index, old_capacity),
                Bin::Tree(first) => self.split_tree(first, index, old_capacity),
            }
        }
    }

    /// Partition a chain across the doubled table, preserving relative
    /// order within each half.
    fn split_chain(&mut self, head: NodeKey, index: usize, bit: usize) {
        let mut lo: (Option<NodeKey>, Option<NodeKey>) = (None, None);
        let mut hi: (Option<NodeKey>, Option<NodeKey>) = (None, None);
        let mut cursor = Some(head);
        while let Some(nk) = cursor {
            cursor = self.node(nk).next;
            self.node_mut(nk).next = None;
            let half = if self.node(nk).hash as usize & bit == 0 {
                &mut lo
            } else {
                &mut hi
            };
            match half.1 {
                Some(tail) => self.node_mut(tail).next = Some(nk),
                None => half.0 = Some(nk),
            }
            half.1 = Some(nk);
        }
        if let Some(head) = lo.0 {
            self.bins[index] = Bin::Chain(head);
        }
        if let Some(head) = hi.0 {
            self.bins[index + bit] = Bin::Chain(head);
        }
    }
}
