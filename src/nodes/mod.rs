// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::hash::{BuildHasher, Hash, Hasher};

use slotmap::{new_key_type, SlotMap};

pub(crate) mod chain;
pub(crate) mod tree;

new_key_type! {
    /// A stable, generational handle into a table's node arena.
    pub(crate) struct NodeKey;
}

/// Fold the high bits of a hash into the low bits.
///
/// Bucket indexing masks the hash with `len - 1`, so only the low bits
/// ever select a bucket. Spreading the high bits down keeps key sets
/// that differ only above the mask from piling into one bucket.
#[inline]
pub(crate) fn spread(h: u32) -> u32 {
    h ^ (h >> 16)
}

pub(crate) fn hash_key<K: Hash + ?Sized, S: BuildHasher>(bh: &S, key: &K) -> u32 {
    let mut hasher = bh.build_hasher();
    key.hash(&mut hasher);
    let h = hasher.finish();
    spread((h ^ (h >> 32)) as u32)
}

/// A single entry.
///
/// Every node lives in its table's arena and carries both chain and
/// tree linkage. While its bucket is a chain only `hash`, `key`,
/// `value` and `next` are meaningful; treeification fills in the rest.
/// The `prev`/`next` pair always forms the same logical chain the
/// bucket had before treeification, which is what iteration and
/// splitting walk.
#[derive(Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) hash: u32,
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) next: Option<NodeKey>,
    pub(crate) prev: Option<NodeKey>,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) left: Option<NodeKey>,
    pub(crate) right: Option<NodeKey>,
    pub(crate) red: bool,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new(hash: u32, key: K, value: V) -> Self {
        Node {
            hash,
            key,
            value,
            next: None,
            prev: None,
            parent: None,
            left: None,
            right: None,
            red: false,
        }
    }
}

/// One slot of the bucket table.
///
/// For a tree the key is the head of the prev/next trail. After every
/// public mutation the trail head is also the tree's root
/// (`move_root_to_front` restores this); cursor-driven removal defers
/// the restoration, so tree walks locate the true root through parent
/// links rather than trusting the slot blindly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Bin {
    Empty,
    Chain(NodeKey),
    Tree(NodeKey),
}

impl Bin {
    #[inline]
    pub(crate) fn head(self) -> Option<NodeKey> {
        match self {
            Bin::Empty => None,
            Bin::Chain(head) | Bin::Tree(head) => Some(head),
        }
    }
}

/// The bucket table and the arena that owns every node in it.
///
/// `bins.len()` is always zero or a power of two.
#[derive(Clone)]
pub(crate) struct Table<K, V> {
    pub(crate) bins: Vec<Bin>,
    pub(crate) nodes: SlotMap<NodeKey, Node<K, V>>,
}

impl<K, V> Table<K, V> {
    pub(crate) fn new() -> Self {
        Table {
            bins: Vec::new(),
            nodes: SlotMap::with_key(),
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Table {
            bins: vec![Bin::Empty; capacity],
            nodes: SlotMap::with_capacity_and_key(capacity),
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.bins.len()
    }

    #[inline]
    pub(crate) fn bin_index(&self, hash: u32) -> usize {
        hash as usize & (self.bins.len() - 1)
    }

    #[inline]
    pub(crate) fn node(&self, key: NodeKey) -> &Node<K, V> {
        &self.nodes[key]
    }

    #[inline]
    pub(crate) fn node_mut(&mut self, key: NodeKey) -> &mut Node<K, V> {
        &mut self.nodes[key]
    }

    pub(crate) fn clear(&mut self) {
        for bin in &mut self.bins {
            *bin = Bin::Empty;
        }
        self.nodes.clear();
    }
}
