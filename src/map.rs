// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An unordered map.
//!
//! A hash map whose buckets start out as singly linked chains and
//! escalate into red-black trees when enough keys collide, bounding
//! the worst case for a crowded bucket at O(log n) instead of O(n).
//!
//! Lookup and insertion are amortized O(1); an insertion that trips
//! the load factor pays O(n) to double the table, which happens
//! O(log n) times over n insertions. The structure is strictly
//! single-threaded: wrap it in a lock if you need to share it.
//!
//! Keys need [`Hash`][std::hash::Hash], [`Eq`][std::cmp::Eq] and
//! [`Ord`][std::cmp::Ord]. The ordering is what keeps a tree bucket
//! navigable when hashes tie, so it is a hard requirement on every
//! operation that may touch a tree.
//!
//! Iteration order is whatever the buckets dictate: stable for a given
//! map until a resize, but never sorted and never insertion order.

use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt::{Debug, Error, Formatter};
use std::hash::{BuildHasher, Hash};
use std::iter::{FromIterator, FusedIterator};
use std::ops::{Index, IndexMut};

use crate::config::{
    DEFAULT_INITIAL_CAPACITY, DEFAULT_LOAD_FACTOR, MAXIMUM_CAPACITY, MIN_TREEIFY_CAPACITY,
};
use crate::nodes::chain::InsertOutcome;
use crate::nodes::{hash_key, Node, NodeKey, Table};

/// Construct a map from a sequence of key/value pairs.
///
/// # Examples
///
/// ```
/// # #[macro_use] extern crate binmap;
/// # use binmap::BinMap;
/// # fn main() {
/// assert_eq!(
///   binmap!{
///     1 => 11,
///     2 => 22,
///     3 => 33
///   },
///   BinMap::from(vec![(1, 11), (2, 22), (3, 33)])
/// );
/// # }
/// ```
#[macro_export]
macro_rules! binmap {
    () => { $crate::map::BinMap::new() };

    ( $( $key:expr => $value:expr ),* ) => {{
        let mut map = $crate::map::BinMap::new();
        $({
            map.insert($key, $value);
        })*;
        map
    }};

    ( $( $key:expr => $value:expr ,)* ) => {{
        let mut map = $crate::map::BinMap::new();
        $({
            map.insert($key, $value);
        })*;
        map
    }};
}

/// Type alias for [`GenericBinMap`] that uses
/// [`RandomState`][std::collections::hash_map::RandomState] as the
/// hasher.
///
/// [GenericBinMap]: ./struct.GenericBinMap.html
pub type BinMap<K, V> = GenericBinMap<K, V, RandomState>;

/// An unordered map with tree-escalating buckets.
///
/// Buckets hold colliding entries as a linked chain until the chain
/// reaches eight entries on a table of at least 64 buckets, at which
/// point the bucket becomes a red-black tree keyed by hash (and by
/// `K: Ord` when hashes tie). Resizing splits each bucket across the
/// doubled table and flattens tree buckets that come out small enough.
///
/// All of this is invisible in the API, which looks like any other
/// hash map's plus a compute family ([`compute_if_absent`],
/// [`compute_if_present`], [`merge`]) and a detached, fail-fast
/// [`Cursor`].
///
/// [`compute_if_absent`]: #method.compute_if_absent
/// [`compute_if_present`]: #method.compute_if_present
/// [`merge`]: #method.merge
/// [`Cursor`]: ./struct.Cursor.html
pub struct GenericBinMap<K, V, S = RandomState> {
    table: Table<K, V>,
    size: usize,
    threshold: usize,
    load_factor: f32,
    generation: u64,
    hasher: S,
}

/// The map was structurally modified while a [`Cursor`] was walking
/// it.
///
/// This is a best-effort diagnostic, not a synchronization primitive:
/// it catches the mutation at the next cursor step, and only if the
/// generation counters happen to disagree.
///
/// [`Cursor`]: ./struct.Cursor.html
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConcurrentModification;

impl std::fmt::Display for ConcurrentModification {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        f.write_str("map was structurally modified during cursor traversal")
    }
}

impl std::error::Error for ConcurrentModification {}

impl<K, V> GenericBinMap<K, V, RandomState>
where
    K: Hash + Eq + Ord,
{
    /// Construct a map with a single mapping.
    ///
    /// # Examples
    ///
    /// ```
    /// # use binmap::BinMap;
    /// let map = BinMap::unit(123, "onetwothree");
    /// assert_eq!(
    ///   map.get(&123),
    ///   Some(&"onetwothree")
    /// );
    /// ```
    #[inline]
    #[must_use]
    pub fn unit(k: K, v: V) -> BinMap<K, V> {
        let mut map = BinMap::new();
        map.insert(k, v);
        map
    }
}

impl<K, V, S> GenericBinMap<K, V, S> {
    /// Construct an empty map.
    ///
    /// No table is allocated until the first insertion.
    #[inline]
    #[must_use]
    pub fn new() -> Self
    where
        S: Default,
    {
        Self::default()
    }

    /// Construct an empty map using the provided hasher.
    #[inline]
    #[must_use]
    pub fn with_hasher(hasher: S) -> Self {
        GenericBinMap {
            table: Table::new(),
            size: 0,
            threshold: 0,
            load_factor: DEFAULT_LOAD_FACTOR,
            generation: 0,
            hasher,
        }
    }

    /// Construct an empty map with at least `capacity` buckets
    /// pre-allocated.
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self
    where
        S: Default,
    {
        Self::with_capacity_and_hasher(capacity, S::default())
    }

    /// Construct an empty map with at least `capacity` buckets
    /// pre-allocated, using the provided hasher.
    #[must_use]
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        let mut map = Self::with_hasher(hasher);
        if capacity > 0 {
            let capacity = capacity.min(MAXIMUM_CAPACITY).next_power_of_two();
            map.table = Table::with_capacity(capacity);
            map.threshold = map.threshold_for(capacity);
        }
        map
    }

    /// Construct an empty map with a custom load factor.
    ///
    /// The load factor is the ratio of entries to buckets above which
    /// the table doubles; the default is 0.75.
    ///
    /// # Panics
    ///
    /// Panics if `load_factor` is not a positive, finite number.
    #[must_use]
    pub fn with_capacity_and_load_factor(capacity: usize, load_factor: f32) -> Self
    where
        S: Default,
    {
        assert!(
            load_factor > 0.0 && load_factor.is_finite(),
            "GenericBinMap: illegal load factor {}",
            load_factor
        );
        let mut map = Self::with_capacity_and_hasher(capacity, S::default());
        map.load_factor = load_factor;
        if map.table.capacity() > 0 {
            map.threshold = map.threshold_for(map.table.capacity());
        }
        map
    }

    /// Test whether the map is empty.
    ///
    /// Time: O(1)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the number of entries in the map.
    ///
    /// Time: O(1)
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate binmap;
    /// # fn main() {
    /// assert_eq!(3, binmap!{
    ///   1 => 11,
    ///   2 => 22,
    ///   3 => 33
    /// }.len());
    /// # }
    /// ```
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Get the current number of buckets.
    ///
    /// Zero until the first insertion; a power of two afterwards.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Get the map's load factor.
    #[inline]
    #[must_use]
    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Get a reference to the map's [`BuildHasher`][BuildHasher].
    ///
    /// [BuildHasher]: https://doc.rust-lang.org/std/hash/trait.BuildHasher.html
    #[must_use]
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Get an iterator over the key/value pairs of the map, in bucket
    /// order.
    ///
    /// The order is consistent for a given map until it resizes, but
    /// is otherwise unspecified.
    #[inline]
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            table: &self.table,
            index: 0,
            next: None,
            remaining: self.size,
        }
    }

    /// Get an iterator over the map's keys, in the same order as
    /// [`iter`][GenericBinMap::iter].
    #[inline]
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { it: self.iter() }
    }

    /// Get an iterator over the map's values, in the same order as
    /// [`iter`][GenericBinMap::iter].
    #[inline]
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V> {
        Values { it: self.iter() }
    }

    /// Get a mutable iterator over the map's values.
    ///
    /// This iterator walks the node arena directly, so its order can
    /// differ from [`iter`][GenericBinMap::iter]'s.
    #[inline]
    #[must_use]
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            it: self.table.nodes.iter_mut(),
        }
    }

    /// Get a mutable iterator over the map's values, in the same order
    /// as [`iter_mut`][GenericBinMap::iter_mut].
    #[inline]
    #[must_use]
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            it: self.iter_mut(),
        }
    }

    /// Construct a detached [`Cursor`] positioned before the first
    /// entry.
    ///
    /// Unlike [`iter`][GenericBinMap::iter], a cursor does not borrow
    /// the map; it captures the map's generation counter instead and
    /// fails with [`ConcurrentModification`] if the map is
    /// structurally modified behind its back.
    ///
    /// [`Cursor`]: ./struct.Cursor.html
    /// [`ConcurrentModification`]: ./struct.ConcurrentModification.html
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        Cursor {
            generation: self.generation,
            index: 0,
            next: None,
            current: None,
        }
    }

    /// Discard all entries from the map, keeping its allocated
    /// buckets.
    ///
    /// Time: O(n)
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate binmap;
    /// # fn main() {
    /// let mut map = binmap![1 => 1, 2 => 2, 3 => 3];
    /// map.clear();
    /// assert!(map.is_empty());
    /// # }
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
        self.size = 0;
        self.generation += 1;
    }

    /// Keep only the entries the predicate approves of.
    ///
    /// Time: O(n)
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V) -> bool,
    {
        let mut bin_nodes = Vec::new();
        for index in 0..self.table.bins.len() {
            // Snapshot the bucket's trail first: removal may rotate a
            // new root to the front of it.
            bin_nodes.clear();
            let mut cursor = self.table.bins[index].head();
            while let Some(nk) = cursor {
                bin_nodes.push(nk);
                cursor = self.table.node(nk).next;
            }
            for &nk in &bin_nodes {
                let keep = {
                    let node = self.table.node_mut(nk);
                    f(&node.key, &mut node.value)
                };
                if !keep {
                    self.remove_node(nk, true);
                }
            }
        }
        self.debug_check();
    }

    fn threshold_for(&self, capacity: usize) -> usize {
        if capacity >= MAXIMUM_CAPACITY {
            usize::MAX
        } else {
            (capacity as f64 * self.load_factor as f64) as usize
        }
    }

    /// Unlink a node, reclaim it from the arena, and do the size and
    /// generation bookkeeping. The node must exist.
    fn remove_node(&mut self, node: NodeKey, movable: bool) -> (K, V) {
        self.table.remove_node(node, movable);
        let node = self
            .table
            .nodes
            .remove(node)
            .expect("map::remove_node: node vanished from arena");
        self.size -= 1;
        self.generation += 1;
        (node.key, node.value)
    }

    #[inline]
    fn debug_check(&self) {
        #[cfg(feature = "debug")]
        self.table.check(self.size, false);
    }
}

impl<K, V, S> GenericBinMap<K, V, S>
where
    K: Hash + Eq + Ord,
    S: BuildHasher,
{
    /// Get a reference to the value for a key, if it is present.
    ///
    /// Time: O(1) amortized; O(log n) in a tree bucket
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate binmap;
    /// # fn main() {
    /// let map = binmap!{123 => "lol"};
    /// assert_eq!(
    ///   map.get(&123),
    ///   Some(&"lol")
    /// );
    /// # }
    /// ```
    #[must_use]
    pub fn get<BK>(&self, key: &BK) -> Option<&V>
    where
        BK: Hash + Eq + Ord + ?Sized,
        K: Borrow<BK>,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Get the key/value pair for a key, if it is present.
    #[must_use]
    pub fn get_key_value<BK>(&self, key: &BK) -> Option<(&K, &V)>
    where
        BK: Hash + Eq + Ord + ?Sized,
        K: Borrow<BK>,
    {
        if self.size == 0 {
            return None;
        }
        let hash = hash_key(&self.hasher, key);
        self.table.find(hash, key).map(|nk| {
            let node = self.table.node(nk);
            (&node.key, &node.value)
        })
    }

    /// Get the value for a key, or `default` if it is absent.
    ///
    /// Note that "absent" means there is no entry for the key;
    /// [`contains_key`][GenericBinMap::contains_key] is the
    /// authoritative way to distinguish a missing entry from whatever
    /// value an entry happens to hold.
    #[must_use]
    pub fn get_or_default<'a, BK>(&'a self, key: &BK, default: &'a V) -> &'a V
    where
        BK: Hash + Eq + Ord + ?Sized,
        K: Borrow<BK>,
    {
        self.get(key).unwrap_or(default)
    }

    /// Get a mutable reference to the value for a key, if it is
    /// present.
    #[must_use]
    pub fn get_mut<BK>(&mut self, key: &BK) -> Option<&mut V>
    where
        BK: Hash + Eq + Ord + ?Sized,
        K: Borrow<BK>,
    {
        self.get_key_value_mut(key).map(|(_, v)| v)
    }

    /// Get the key along with a mutable reference to its value, if it
    /// is present.
    #[must_use]
    pub fn get_key_value_mut<BK>(&mut self, key: &BK) -> Option<(&K, &mut V)>
    where
        BK: Hash + Eq + Ord + ?Sized,
        K: Borrow<BK>,
    {
        if self.size == 0 {
            return None;
        }
        let hash = hash_key(&self.hasher, key);
        let nk = self.table.find(hash, key)?;
        let node = self.table.node_mut(nk);
        Some((&node.key, &mut node.value))
    }

    /// Test whether the map contains a key.
    ///
    /// Time: O(1) amortized
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate binmap;
    /// # fn main() {
    /// let map = binmap!{123 => "lol"};
    /// assert!(map.contains_key(&123));
    /// assert!(!map.contains_key(&321));
    /// # }
    /// ```
    #[must_use]
    pub fn contains_key<BK>(&self, key: &BK) -> bool
    where
        BK: Hash + Eq + Ord + ?Sized,
        K: Borrow<BK>,
    {
        self.get(key).is_some()
    }

    /// Test whether any entry maps to `value`.
    ///
    /// Time: O(n); this scans every bucket.
    #[must_use]
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.iter().any(|(_, v)| v == value)
    }

    /// Insert a key/value mapping.
    ///
    /// If the key is already present its value is replaced in place
    /// and the old value returned; replacement does not count as a
    /// structural modification.
    ///
    /// Time: O(1) amortized
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate binmap;
    /// # use binmap::BinMap;
    /// # fn main() {
    /// let mut map = binmap!{123 => "123"};
    /// map.insert(456, "456");
    /// assert_eq!(
    ///   map,
    ///   binmap!{123 => "123", 456 => "456"}
    /// );
    /// # }
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = hash_key(&self.hasher, &key);
        self.insert_hashed(hash, key, value).1
    }

    /// Insert only if the key has no current mapping. Returns a
    /// reference to the already-present value otherwise.
    pub fn insert_if_absent(&mut self, key: K, value: V) -> Option<&mut V> {
        let hash = hash_key(&self.hasher, &key);
        if let Some(nk) = self.table.find(hash, &key) {
            return Some(&mut self.table.node_mut(nk).value);
        }
        self.insert_hashed(hash, key, value);
        None
    }

    /// Remove the entry for a key, returning its value.
    ///
    /// Removing an absent key is a no-op and returns [`None`][None].
    ///
    /// Time: O(1) amortized
    ///
    /// [None]: https://doc.rust-lang.org/std/option/enum.Option.html#variant.None
    pub fn remove<BK>(&mut self, key: &BK) -> Option<V>
    where
        BK: Hash + Eq + Ord + ?Sized,
        K: Borrow<BK>,
    {
        self.remove_with_key(key).map(|(_, v)| v)
    }

    /// Remove the entry for a key, returning both key and value.
    pub fn remove_with_key<BK>(&mut self, key: &BK) -> Option<(K, V)>
    where
        BK: Hash + Eq + Ord + ?Sized,
        K: Borrow<BK>,
    {
        if self.size == 0 {
            return None;
        }
        let hash = hash_key(&self.hasher, key);
        let node = self.table.find(hash, key)?;
        let pair = self.remove_node(node, true);
        self.debug_check();
        Some(pair)
    }

    /// Look the key up; if it is absent, call `f` to produce a value
    /// and insert it. Returns the value now in the map, or
    /// [`None`][None] if `f` declined to produce one.
    ///
    /// [None]: https://doc.rust-lang.org/std/option/enum.Option.html#variant.None
    pub fn compute_if_absent<F>(&mut self, key: K, f: F) -> Option<&mut V>
    where
        F: FnOnce(&K) -> Option<V>,
    {
        let hash = hash_key(&self.hasher, &key);
        if let Some(nk) = self.table.find(hash, &key) {
            return Some(&mut self.table.node_mut(nk).value);
        }
        let value = f(&key)?;
        let (node, _) = self.insert_hashed(hash, key, value);
        Some(&mut self.table.node_mut(node).value)
    }

    /// If the key is present, call `f` with its value; a
    /// [`Some`][Some] result replaces the value, a [`None`][None]
    /// result removes the entry.
    ///
    /// [Some]: https://doc.rust-lang.org/std/option/enum.Option.html#variant.Some
    /// [None]: https://doc.rust-lang.org/std/option/enum.Option.html#variant.None
    pub fn compute_if_present<BK, F>(&mut self, key: &BK, f: F) -> Option<&mut V>
    where
        BK: Hash + Eq + Ord + ?Sized,
        K: Borrow<BK>,
        F: FnOnce(&K, &V) -> Option<V>,
    {
        if self.size == 0 {
            return None;
        }
        let hash = hash_key(&self.hasher, key);
        let nk = self.table.find(hash, key)?;
        let new = {
            let node = self.table.node(nk);
            f(&node.key, &node.value)
        };
        match new {
            Some(value) => {
                let node = self.table.node_mut(nk);
                node.value = value;
                Some(&mut node.value)
            }
            None => {
                self.remove_node(nk, true);
                self.debug_check();
                None
            }
        }
    }

    /// Insert `value` for an absent key; for a present key, store
    /// `f(&old, value)` instead, removing the entry if `f` returns
    /// [`None`][None].
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate binmap;
    /// # fn main() {
    /// let mut counts = binmap!{"a" => 1};
    /// counts.merge("a", 1, |old, new| Some(old + new));
    /// counts.merge("b", 1, |old, new| Some(old + new));
    /// assert_eq!(Some(&2), counts.get("a"));
    /// assert_eq!(Some(&1), counts.get("b"));
    /// # }
    /// ```
    ///
    /// [None]: https://doc.rust-lang.org/std/option/enum.Option.html#variant.None
    pub fn merge<F>(&mut self, key: K, value: V, f: F) -> Option<&mut V>
    where
        F: FnOnce(&V, V) -> Option<V>,
    {
        let hash = hash_key(&self.hasher, &key);
        match self.table.find(hash, &key) {
            None => {
                let (node, _) = self.insert_hashed(hash, key, value);
                Some(&mut self.table.node_mut(node).value)
            }
            Some(nk) => {
                let new = f(&self.table.node(nk).value, value);
                match new {
                    Some(value) => {
                        let node = self.table.node_mut(nk);
                        node.value = value;
                        Some(&mut node.value)
                    }
                    None => {
                        self.remove_node(nk, true);
                        self.debug_check();
                        None
                    }
                }
            }
        }
    }

    /// Get the [`Entry`][Entry] for a key, for in-place manipulation.
    ///
    /// # Examples
    ///
    /// ```
    /// # #[macro_use] extern crate binmap;
    /// # fn main() {
    /// let mut map = binmap!{"a" => 1};
    /// *map.entry("a").or_insert(0) += 1;
    /// *map.entry("b").or_insert(0) += 1;
    /// assert_eq!(binmap!{"a" => 2, "b" => 1}, map);
    /// # }
    /// ```
    ///
    /// [Entry]: ./enum.Entry.html
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S> {
        let hash = hash_key(&self.hasher, &key);
        match self.table.find(hash, &key) {
            Some(node) => Entry::Occupied(OccupiedEntry { map: self, node }),
            None => Entry::Vacant(VacantEntry {
                map: self,
                hash,
                key,
            }),
        }
    }

    /// Insert, returning the new node's key and any replaced value.
    ///
    /// This is the one place size, generation, treeification and
    /// resizing are decided.
    fn insert_hashed(&mut self, hash: u32, key: K, value: V) -> (NodeKey, Option<V>) {
        if self.table.capacity() == 0 {
            self.grow();
        }
        match self.table.insert(hash, key, value) {
            InsertOutcome::Replaced { node, old } => (node, Some(old)),
            InsertOutcome::Added {
                node,
                index,
                needs_treeify,
            } => {
                self.size += 1;
                self.generation += 1;
                if needs_treeify {
                    if self.table.capacity() < MIN_TREEIFY_CAPACITY {
                        // Resize is preferred over treeification while
                        // the table is small.
                        self.grow();
                    } else {
                        self.table.treeify_bin(index);
                    }
                }
                if self.size > self.threshold {
                    self.grow();
                }
                self.debug_check();
                (node, None)
            }
        }
    }

    /// Double the table, or allocate the initial one.
    fn grow(&mut self) {
        let old_capacity = self.table.capacity();
        let new_capacity = if old_capacity == 0 {
            DEFAULT_INITIAL_CAPACITY
        } else if old_capacity >= MAXIMUM_CAPACITY {
            // Saturated; stop resizing and let chains and trees absorb
            // the pressure.
            self.threshold = usize::MAX;
            return;
        } else {
            old_capacity * 2
        };
        self.table.grow(new_capacity);
        self.threshold = self.threshold_for(new_capacity);
        self.generation += 1;
    }
}

#[cfg(any(test, feature = "debug"))]
impl<K, V, S> GenericBinMap<K, V, S> {
    /// Verify every structural invariant, panicking on violations.
    #[doc(hidden)]
    pub fn check_invariants(&self)
    where
        K: Hash + Eq + Ord,
        S: BuildHasher,
    {
        self.table.check(self.size, true);
    }

    /// White-box view of a key's bucket representation.
    #[doc(hidden)]
    pub fn is_tree_bucket<BK>(&self, key: &BK) -> bool
    where
        BK: Hash + Eq + Ord + ?Sized,
        K: Borrow<BK>,
        S: BuildHasher,
    {
        if self.table.capacity() == 0 {
            return false;
        }
        let hash = hash_key(&self.hasher, key);
        matches!(
            self.table.bins[self.table.bin_index(hash)],
            crate::nodes::Bin::Tree(_)
        )
    }
}

// // Entries

/// A handle for a key and its slot in the map, present or not.
pub enum Entry<'a, K, V, S> {
    /// An entry which exists in the map.
    Occupied(OccupiedEntry<'a, K, V, S>),
    /// An entry which doesn't exist in the map.
    Vacant(VacantEntry<'a, K, V, S>),
}

impl<'a, K, V, S> Entry<'a, K, V, S>
where
    K: Hash + Eq + Ord,
    S: BuildHasher,
{
    /// Insert the default value provided if there was no value
    /// already, and return a mutable reference to the value.
    pub fn or_insert(self, default: V) -> &'a mut V {
        self.or_insert_with(|| default)
    }

    /// Insert the default value from the provided function if there
    /// was no value already, and return a mutable reference to the
    /// value.
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Insert a default value if there was no value already, and
    /// return a mutable reference to the value.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(Default::default)
    }

    /// Get the key for this entry.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }

    /// Call the provided function to modify the value if the value
    /// exists.
    pub fn and_modify<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        if let Entry::Occupied(ref mut entry) = self {
            f(entry.get_mut());
        }
        self
    }
}

/// An entry for a mapping that already exists in the map.
pub struct OccupiedEntry<'a, K, V, S> {
    map: &'a mut GenericBinMap<K, V, S>,
    node: NodeKey,
}

impl<'a, K, V, S> OccupiedEntry<'a, K, V, S>
where
    K: Hash + Eq + Ord,
    S: BuildHasher,
{
    /// Get the key for this entry.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.map.table.node(self.node).key
    }

    /// Remove this entry from the map and return the removed mapping.
    pub fn remove_entry(self) -> (K, V) {
        let pair = self.map.remove_node(self.node, true);
        self.map.debug_check();
        pair
    }

    /// Get the current value.
    #[must_use]
    pub fn get(&self) -> &V {
        &self.map.table.node(self.node).value
    }

    /// Get a mutable reference to the current value.
    #[must_use]
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.map.table.node_mut(self.node).value
    }

    /// Convert this entry into a mutable reference.
    #[must_use]
    pub fn into_mut(self) -> &'a mut V {
        &mut self.map.table.node_mut(self.node).value
    }

    /// Overwrite the current value and return the previous value.
    pub fn insert(&mut self, value: V) -> V {
        std::mem::replace(self.get_mut(), value)
    }

    /// Remove this entry from the map and return the removed value.
    pub fn remove(self) -> V {
        self.remove_entry().1
    }
}

/// An entry for a mapping that does not already exist in the map.
pub struct VacantEntry<'a, K, V, S> {
    map: &'a mut GenericBinMap<K, V, S>,
    hash: u32,
    key: K,
}

impl<'a, K, V, S> VacantEntry<'a, K, V, S>
where
    K: Hash + Eq + Ord,
    S: BuildHasher,
{
    /// Get the key for this entry.
    #[must_use]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Convert this entry into its key.
    #[must_use]
    pub fn into_key(self) -> K {
        self.key
    }

    /// Insert a value into this entry.
    pub fn insert(self, value: V) -> &'a mut V {
        let (node, _) = self.map.insert_hashed(self.hash, self.key, value);
        &mut self.map.table.node_mut(node).value
    }
}

// // Cursor

/// A detached, fail-fast traversal handle.
///
/// A cursor holds no borrow of its map; every step takes the map as an
/// argument and re-validates the generation counter captured when the
/// cursor was created. A structural modification from anywhere other
/// than the cursor's own [`remove`][Cursor::remove] makes the next
/// step return [`ConcurrentModification`].
///
/// Entries come out in the same order as
/// [`iter`][GenericBinMap::iter].
///
/// # Examples
///
/// ```
/// # #[macro_use] extern crate binmap;
/// # fn main() {
/// let mut map = binmap!{1 => 1, 2 => 2, 3 => 3};
/// let mut cursor = map.cursor();
/// while let Some(step) = cursor.next(&map) {
///     let (k, v) = step.unwrap();
///     assert_eq!(k, v);
/// }
/// # }
/// ```
///
/// [`ConcurrentModification`]: ./struct.ConcurrentModification.html
pub struct Cursor {
    generation: u64,
    index: usize,
    next: Option<NodeKey>,
    current: Option<NodeKey>,
}

impl Cursor {
    /// Step to the next entry.
    ///
    /// Returns [`None`][None] at the end of the map, and
    /// `Some(Err(ConcurrentModification))` if the map has been
    /// structurally modified since the cursor was created.
    ///
    /// [None]: https://doc.rust-lang.org/std/option/enum.Option.html#variant.None
    #[allow(clippy::should_implement_trait)]
    pub fn next<'a, K, V, S>(
        &mut self,
        map: &'a GenericBinMap<K, V, S>,
    ) -> Option<Result<(&'a K, &'a V), ConcurrentModification>> {
        if self.generation != map.generation {
            return Some(Err(ConcurrentModification));
        }
        while self.next.is_none() {
            let bin = map.table.bins.get(self.index)?;
            self.next = bin.head();
            self.index += 1;
        }
        let nk = self.next.unwrap();
        let node: &'a Node<K, V> = &map.table.nodes[nk];
        self.current = Some(nk);
        self.next = node.next;
        Some(Ok((&node.key, &node.value)))
    }

    /// Remove the entry the cursor last yielded.
    ///
    /// This is the one mutation that does not trip the fail-fast
    /// check: the cursor re-synchronizes with the map's generation
    /// afterwards and traversal continues where it left off.
    ///
    /// Returns `Ok(None)` if there is no current entry (nothing
    /// yielded yet, or already removed).
    pub fn remove<K, V, S>(
        &mut self,
        map: &mut GenericBinMap<K, V, S>,
    ) -> Result<Option<(K, V)>, ConcurrentModification> {
        if self.generation != map.generation {
            return Err(ConcurrentModification);
        }
        let current = match self.current.take() {
            None => return Ok(None),
            Some(current) => current,
        };
        // movable = false: re-anchoring the tree root would reshuffle
        // the trail under our feet.
        let pair = map.remove_node(current, false);
        self.generation = map.generation;
        Ok(Some(pair))
    }
}

// // Iterators

/// An iterator over the key/value pairs of a map, in bucket order.
pub struct Iter<'a, K, V> {
    table: &'a Table<K, V>,
    index: usize,
    next: Option<NodeKey>,
    remaining: usize,
}

// We impl Clone instead of deriving it, because we want Clone even if
// K and V aren't.
impl<'a, K, V> Clone for Iter<'a, K, V> {
    fn clone(&self) -> Self {
        Iter {
            table: self.table,
            index: self.index,
            next: self.next,
            remaining: self.remaining,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        while self.next.is_none() {
            let bin = self.table.bins.get(self.index)?;
            self.next = bin.head();
            self.index += 1;
        }
        let nk = self.next.unwrap();
        let node: &'a Node<K, V> = &self.table.nodes[nk];
        self.next = node.next;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, K, V> ExactSizeIterator for Iter<'a, K, V> {}

impl<'a, K, V> FusedIterator for Iter<'a, K, V> {}

/// A mutable iterator over the entries of a map, in arena order.
pub struct IterMut<'a, K, V> {
    it: slotmap::basic::IterMut<'a, NodeKey, Node<K, V>>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, node)| (&node.key, &mut node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for IterMut<'a, K, V> {}

impl<'a, K, V> FusedIterator for IterMut<'a, K, V> {}

/// An iterator over the keys of a map.
pub struct Keys<'a, K, V> {
    it: Iter<'a, K, V>,
}

impl<'a, K, V> Clone for Keys<'a, K, V> {
    fn clone(&self) -> Self {
        Keys {
            it: self.it.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for Keys<'a, K, V> {}

impl<'a, K, V> FusedIterator for Keys<'a, K, V> {}

/// An iterator over the values of a map.
pub struct Values<'a, K, V> {
    it: Iter<'a, K, V>,
}

impl<'a, K, V> Clone for Values<'a, K, V> {
    fn clone(&self) -> Self {
        Values {
            it: self.it.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for Values<'a, K, V> {}

impl<'a, K, V> FusedIterator for Values<'a, K, V> {}

/// A mutable iterator over the values of a map, in arena order.
pub struct ValuesMut<'a, K, V> {
    it: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<'a, K, V> ExactSizeIterator for ValuesMut<'a, K, V> {}

impl<'a, K, V> FusedIterator for ValuesMut<'a, K, V> {}

/// A consuming iterator over the entries of a map.
pub struct IntoIter<K, V> {
    it: slotmap::basic::IntoIter<NodeKey, Node<K, V>>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, node)| (node.key, node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V> FusedIterator for IntoIter<K, V> {}

/// A consuming iterator over the keys of a map.
pub struct IntoKeys<K, V> {
    it: IntoIter<K, V>,
}

impl<K, V> Iterator for IntoKeys<K, V> {
    type Item = K;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoKeys<K, V> {}

impl<K, V> FusedIterator for IntoKeys<K, V> {}

/// A consuming iterator over the values of a map.
pub struct IntoValues<K, V> {
    it: IntoIter<K, V>,
}

impl<K, V> Iterator for IntoValues<K, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoValues<K, V> {}

impl<K, V> FusedIterator for IntoValues<K, V> {}

impl<K, V, S> GenericBinMap<K, V, S> {
    /// Convert the map into an iterator over its keys.
    #[must_use]
    pub fn into_keys(self) -> IntoKeys<K, V> {
        IntoKeys {
            it: IntoIter {
                it: self.table.nodes.into_iter(),
            },
        }
    }

    /// Convert the map into an iterator over its values.
    #[must_use]
    pub fn into_values(self) -> IntoValues<K, V> {
        IntoValues {
            it: IntoIter {
                it: self.table.nodes.into_iter(),
            },
        }
    }
}

impl<'a, K, V, S> IntoIterator for &'a GenericBinMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S> IntoIterator for &'a mut GenericBinMap<K, V, S> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<K, V, S> IntoIterator for GenericBinMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            it: self.table.nodes.into_iter(),
        }
    }
}

// // Core traits

impl<K, V, S> Clone for GenericBinMap<K, V, S>
where
    K: Clone,
    V: Clone,
    S: Clone,
{
    /// Clone the map. The clone shares nothing with the original; the
    /// bucket and tree structure is reproduced exactly.
    fn clone(&self) -> Self {
        GenericBinMap {
            table: self.table.clone(),
            size: self.size,
            threshold: self.threshold,
            load_factor: self.load_factor,
            generation: self.generation,
            hasher: self.hasher.clone(),
        }
    }
}

impl<K, V, S> PartialEq for GenericBinMap<K, V, S>
where
    K: Hash + Eq + Ord,
    V: PartialEq,
    S: BuildHasher,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).map_or(false, |ov| v == ov))
    }
}

impl<K, V, S> Eq for GenericBinMap<K, V, S>
where
    K: Hash + Eq + Ord,
    V: Eq,
    S: BuildHasher,
{
}

impl<K, V, S> Default for GenericBinMap<K, V, S>
where
    S: Default,
{
    fn default() -> Self {
        Self::with_hasher(S::default())
    }
}

impl<K, V, S> Debug for GenericBinMap<K, V, S>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        let mut d = f.debug_map();
        for (k, v) in self.iter() {
            d.entry(k, v);
        }
        d.finish()
    }
}

impl<BK, K, V, S> Index<&BK> for GenericBinMap<K, V, S>
where
    BK: Hash + Eq + Ord + ?Sized,
    K: Hash + Eq + Ord + Borrow<BK>,
    S: BuildHasher,
{
    type Output = V;

    fn index(&self, key: &BK) -> &Self::Output {
        match self.get(key) {
            None => panic!("GenericBinMap::index: invalid key"),
            Some(value) => value,
        }
    }
}

impl<BK, K, V, S> IndexMut<&BK> for GenericBinMap<K, V, S>
where
    BK: Hash + Eq + Ord + ?Sized,
    K: Hash + Eq + Ord + Borrow<BK>,
    S: BuildHasher,
{
    fn index_mut(&mut self, key: &BK) -> &mut Self::Output {
        match self.get_mut(key) {
            None => panic!("GenericBinMap::index_mut: invalid key"),
            Some(value) => value,
        }
    }
}

// // Conversions

impl<K, V, S> FromIterator<(K, V)> for GenericBinMap<K, V, S>
where
    K: Hash + Eq + Ord,
    S: BuildHasher + Default,
{
    fn from_iter<T>(i: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut map = Self::default();
        for (k, v) in i {
            map.insert(k, v);
        }
        map
    }
}

impl<K, V, S> Extend<(K, V)> for GenericBinMap<K, V, S>
where
    K: Hash + Eq + Ord,
    S: BuildHasher,
{
    fn extend<T>(&mut self, iter: T)
    where
        T: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<'a, K, V, S> Extend<(&'a K, &'a V)> for GenericBinMap<K, V, S>
where
    K: Hash + Eq + Ord + Copy,
    V: Copy,
    S: BuildHasher,
{
    fn extend<T>(&mut self, iter: T)
    where
        T: IntoIterator<Item = (&'a K, &'a V)>,
    {
        for (k, v) in iter {
            self.insert(*k, *v);
        }
    }
}

impl<K, V, S> From<Vec<(K, V)>> for GenericBinMap<K, V, S>
where
    K: Hash + Eq + Ord,
    S: BuildHasher + Default,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        Self::from_iter(pairs)
    }
}

impl<K, V, S> From<&[(K, V)]> for GenericBinMap<K, V, S>
where
    K: Hash + Eq + Ord + Clone,
    V: Clone,
    S: BuildHasher + Default,
{
    fn from(pairs: &[(K, V)]) -> Self {
        pairs.iter().cloned().collect()
    }
}

impl<K, V, S, const N: usize> From<[(K, V); N]> for GenericBinMap<K, V, S>
where
    K: Hash + Eq + Ord,
    S: BuildHasher + Default,
{
    fn from(pairs: [(K, V); N]) -> Self {
        Self::from_iter(pairs)
    }
}

// Tests

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::ClashHasher;
    #[rustfmt::skip]
    use ::proptest::{collection, num::i16, proptest};
    use metrohash::MetroHash64;
    use pretty_assertions::assert_eq as pretty_assert_eq;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};
    use static_assertions::{assert_impl_all, assert_not_impl_any};
    use std::collections;
    use std::hash::BuildHasherDefault;

    assert_impl_all!(BinMap<i32, i32>: Send, Sync);
    assert_not_impl_any!(BinMap<i32, *const i32>: Send, Sync);
    assert_not_impl_any!(BinMap<*const i32, i32>: Send, Sync);

    type ClashMap<K, V> = GenericBinMap<K, V, BuildHasherDefault<ClashHasher>>;

    /// Keys that collide into one bucket for every capacity up to
    /// 1024 under `ClashHasher`.
    fn colliding_key(i: u32) -> u32 {
        i * 1024
    }

    #[test]
    fn insert_get_roundtrip() {
        let mut map = BinMap::new();
        for i in 0..1000 {
            map.insert(i, i * 2);
        }
        assert_eq!(1000, map.len());
        for i in 0..1000 {
            assert_eq!(Some(&(i * 2)), map.get(&i));
        }
        assert_eq!(None, map.get(&1000));
        map.check_invariants();
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut map = BinMap::new();
        assert_eq!(None, map.insert("a", 1));
        let generation = map.generation;
        assert_eq!(Some(1), map.insert("a", 2));
        assert_eq!(1, map.len());
        assert_eq!(Some(&2), map.get(&"a"));
        // Replacement is not a structural modification.
        assert_eq!(generation, map.generation);
    }

    #[test]
    fn index_operator() {
        let mut map: BinMap<usize, usize> = binmap![1 => 2, 3 => 4, 5 => 6];
        assert_eq!(4, map[&3]);
        map[&3] = 8;
        let target_map: BinMap<usize, usize> = binmap![1 => 2, 3 => 8, 5 => 6];
        assert_eq!(target_map, map);
    }

    #[test]
    fn proper_formatting() {
        let map: BinMap<usize, usize> = binmap![1 => 2];
        assert_eq!("{1: 2}", format!("{:?}", map));

        assert_eq!("{}", format!("{:?}", BinMap::<usize, usize>::new()));
    }

    #[test]
    fn macro_allows_trailing_comma() {
        let map1: BinMap<&str, i32> = binmap! {"x" => 1, "y" => 2};
        let map2: BinMap<&str, i32> = binmap! {
            "x" => 1,
            "y" => 2,
        };
        assert_eq!(map1, map2);
    }

    #[test]
    fn match_string_keys_with_string_slices() {
        let mut map: BinMap<String, i32> =
            vec![("foo".to_string(), 1), ("bar".to_string(), 2), ("baz".to_string(), 3)]
                .into_iter()
                .collect();
        assert_eq!(Some(&1), map.get("foo"));
        assert_eq!(Some(3), map.remove("baz"));
        map["bar"] = 8;
        assert_eq!(8, map["bar"]);
    }

    #[test]
    fn treeify_under_collision_pressure() {
        let mut map: ClashMap<u32, u32> = Default::default();
        for i in 0..12 {
            map.insert(colliding_key(i), i);
        }
        // The table grew to 64 buckets fleeing the chain, then gave up
        // and treeified.
        assert!(map.capacity() >= MIN_TREEIFY_CAPACITY);
        assert!(map.is_tree_bucket(&colliding_key(0)));
        for i in 0..12 {
            assert_eq!(Some(&i), map.get(&colliding_key(i)));
        }
        map.check_invariants();
    }

    #[test]
    fn no_treeify_below_min_capacity() {
        let mut map: ClashMap<u32, u32> = Default::default();
        for i in 0..7 {
            map.insert(colliding_key(i), i);
        }
        assert!(!map.is_tree_bucket(&colliding_key(0)));
        assert!(map.capacity() < MIN_TREEIFY_CAPACITY);
        map.check_invariants();
    }

    #[test]
    fn treeify_scenario_at_capacity_64() {
        // Eight colliding keys on a 64-bucket table, then a ninth: the
        // bucket must come out the other side as a tree with every key
        // still reachable.
        let mut map: ClashMap<u32, u32> =
            GenericBinMap::with_capacity_and_hasher(64, Default::default());
        for i in 0..7 {
            map.insert(colliding_key(i), i);
            assert!(!map.is_tree_bucket(&colliding_key(0)));
        }
        for i in 7..9 {
            map.insert(colliding_key(i), i);
        }
        assert!(map.is_tree_bucket(&colliding_key(0)));
        for i in 0..9 {
            assert_eq!(Some(&i), map.get(&colliding_key(i)));
        }
        map.check_invariants();
    }

    #[test]
    fn untreeify_on_shrink() {
        let mut map: ClashMap<u32, u32> = Default::default();
        for i in 0..16 {
            map.insert(colliding_key(i), i);
        }
        assert!(map.is_tree_bucket(&colliding_key(0)));
        for i in 2..16 {
            assert_eq!(Some(i), map.remove(&colliding_key(i)));
            map.check_invariants();
        }
        assert!(!map.is_tree_bucket(&colliding_key(0)));
        assert_eq!(Some(&0), map.get(&colliding_key(0)));
        assert_eq!(Some(&1), map.get(&colliding_key(1)));
    }

    #[test]
    fn resize_keeps_every_key() {
        let mut map = BinMap::with_capacity(4);
        // At least three doublings from 16: 12 > threshold happens by
        // construction with 200 entries.
        for i in 0..200 {
            map.insert(i, i);
            for j in 0..=i {
                assert_eq!(Some(&j), map.get(&j), "lost key {} at size {}", j, i + 1);
            }
        }
        assert_eq!(200, map.len());
        assert_eq!(200, map.iter().count());
        let keys: collections::HashSet<i32> = map.keys().cloned().collect();
        assert_eq!(200, keys.len());
        map.check_invariants();
    }

    #[test]
    fn threshold_invariant() {
        let mut map: ClashMap<u32, u32> = Default::default();
        for i in 0..500 {
            map.insert(i, i);
            assert!(
                map.len()
                    <= (map.capacity() as f64 * map.load_factor() as f64) as usize,
                "threshold violated at size {}",
                map.len()
            );
        }
    }

    #[test]
    fn red_black_churn() {
        let mut rng = SmallRng::seed_from_u64(0x5eed);
        let mut map: ClashMap<u32, u32> = Default::default();
        let mut model: collections::HashMap<u32, u32> = collections::HashMap::new();
        for _ in 0..4000 {
            let key = colliding_key(rng.random_range(0..64));
            if rng.random_bool(0.6) {
                map.insert(key, key);
                model.insert(key, key);
            } else {
                assert_eq!(model.remove(&key), map.remove(&key));
            }
            map.check_invariants();
            assert_eq!(model.len(), map.len());
        }
        for (k, v) in &model {
            assert_eq!(Some(v), map.get(k));
        }
    }

    #[test]
    fn removing_absent_key_is_inert() {
        let mut map: BinMap<i32, i32> = binmap![1 => 1, 2 => 2];
        let generation = map.generation;
        assert_eq!(None, map.remove(&3));
        assert_eq!(2, map.len());
        assert_eq!(generation, map.generation);
    }

    #[test]
    fn cursor_walks_all_entries() {
        let mut map = BinMap::new();
        for i in 0..100 {
            map.insert(i, i);
        }
        let mut cursor = map.cursor();
        let mut seen = 0;
        while let Some(step) = cursor.next(&map) {
            let (k, v) = step.expect("unexpected concurrent modification");
            assert_eq!(k, v);
            seen += 1;
        }
        assert_eq!(100, seen);
    }

    #[test]
    fn cursor_fails_fast_on_insert() {
        let mut map = BinMap::new();
        for i in 0..10 {
            map.insert(i, i);
        }
        let mut cursor = map.cursor();
        assert!(matches!(cursor.next(&map), Some(Ok(_))));
        map.insert(1000, 1000);
        assert_eq!(Some(Err(ConcurrentModification)), cursor.next(&map));
    }

    #[test]
    fn cursor_fails_fast_on_remove_and_clear() {
        let mut map = BinMap::new();
        for i in 0..10 {
            map.insert(i, i);
        }
        let mut cursor = map.cursor();
        assert!(matches!(cursor.next(&map), Some(Ok(_))));
        map.remove(&5);
        assert_eq!(Some(Err(ConcurrentModification)), cursor.next(&map));

        let cursor = map.cursor();
        map.clear();
        let mut cursor = cursor;
        assert_eq!(Some(Err(ConcurrentModification)), cursor.next(&map));
    }

    #[test]
    fn cursor_tolerates_value_replacement() {
        let mut map = BinMap::new();
        for i in 0..10 {
            map.insert(i, i);
        }
        let mut cursor = map.cursor();
        assert!(matches!(cursor.next(&map), Some(Ok(_))));
        map.insert(5, 500);
        assert!(matches!(cursor.next(&map), Some(Ok(_))));
    }

    #[test]
    fn cursor_remove_is_exempt() {
        let mut map = BinMap::new();
        for i in 0..50 {
            map.insert(i, i);
        }
        let mut cursor = map.cursor();
        let mut removed = Vec::new();
        let mut kept = 0;
        while let Some(step) = cursor.next(&map) {
            let k = *step.expect("cursor tripped on its own removal").0;
            if k % 2 == 0 {
                let (rk, _) = cursor.remove(&mut map).unwrap().unwrap();
                assert_eq!(k, rk);
                removed.push(rk);
            } else {
                kept += 1;
            }
        }
        assert_eq!(25, removed.len());
        assert_eq!(25, kept);
        assert_eq!(25, map.len());
        for k in removed {
            assert!(!map.contains_key(&k));
        }
    }

    #[test]
    fn cursor_remove_in_tree_bucket() {
        let mut map: ClashMap<u32, u32> = Default::default();
        for i in 0..20 {
            map.insert(colliding_key(i), i);
        }
        assert!(map.is_tree_bucket(&colliding_key(0)));
        let mut cursor = map.cursor();
        while let Some(step) = cursor.next(&map) {
            let v = *step.unwrap().1;
            if v % 2 == 1 {
                assert!(cursor.remove(&mut map).unwrap().is_some());
            }
        }
        assert_eq!(10, map.len());
        for i in 0..20 {
            assert_eq!(i % 2 == 0, map.contains_key(&colliding_key(i)));
        }
    }

    #[test]
    fn entry_api() {
        let mut map: BinMap<&str, i32> = binmap! {"bar" => 5};
        map.entry("foo").and_modify(|v| *v += 5).or_insert(1);
        assert_eq!(1, map[&"foo"]);
        map.entry("foo").and_modify(|v| *v += 5).or_insert(1);
        assert_eq!(6, map[&"foo"]);
        map.entry("bar").and_modify(|v| *v += 5).or_insert(1);
        assert_eq!(10, map[&"bar"]);
        assert_eq!(
            10,
            match map.entry("bar") {
                Entry::Occupied(entry) => entry.remove(),
                _ => panic!(),
            }
        );
        assert!(!map.contains_key(&"bar"));
    }

    #[test]
    fn compute_family() {
        let mut map: BinMap<&str, i32> = BinMap::new();

        // compute_if_absent
        assert_eq!(Some(&mut 3), map.compute_if_absent("a", |k| Some(k.len() as i32 * 3)));
        assert_eq!(Some(&mut 3), map.compute_if_absent("a", |_| Some(999)));
        assert_eq!(None, map.compute_if_absent("b", |_| None));
        assert!(!map.contains_key(&"b"));

        // compute_if_present
        assert_eq!(None, map.compute_if_present(&"missing", |_, v| Some(*v)));
        assert_eq!(Some(&mut 6), map.compute_if_present(&"a", |_, v| Some(v * 2)));
        assert_eq!(None, map.compute_if_present(&"a", |_, _| None));
        assert!(!map.contains_key(&"a"));

        // merge
        assert_eq!(Some(&mut 1), map.merge("n", 1, |old, new| Some(old + new)));
        assert_eq!(Some(&mut 3), map.merge("n", 2, |old, new| Some(old + new)));
        assert_eq!(None, map.merge("n", 0, |_, _| None));
        assert!(!map.contains_key(&"n"));

        // insert_if_absent
        assert_eq!(None, map.insert_if_absent("x", 1));
        assert_eq!(Some(&mut 1), map.insert_if_absent("x", 2));
        assert_eq!(Some(&1), map.get(&"x"));

        // get_or_default
        assert_eq!(&1, map.get_or_default(&"x", &7));
        assert_eq!(&7, map.get_or_default(&"y", &7));
    }

    #[test]
    fn contains_value_scans_buckets() {
        let map: BinMap<i32, &str> = binmap![1 => "one", 2 => "two"];
        assert!(map.contains_value(&"one"));
        assert!(!map.contains_value(&"three"));
    }

    #[test]
    fn retain_routes_through_remove() {
        let mut map: ClashMap<u32, u32> = Default::default();
        for i in 0..30 {
            map.insert(colliding_key(i), i);
        }
        map.retain(|_, v| *v % 3 == 0);
        assert_eq!(10, map.len());
        for i in 0..30 {
            assert_eq!(i % 3 == 0, map.contains_key(&colliding_key(i)));
        }
        map.check_invariants();
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut map = BinMap::new();
        for i in 0..100 {
            map.insert(i, i);
        }
        let capacity = map.capacity();
        map.clear();
        assert!(map.is_empty());
        assert_eq!(capacity, map.capacity());
        map.insert(1, 1);
        assert_eq!(Some(&1), map.get(&1));
    }

    #[test]
    fn clone_is_independent() {
        let mut map: ClashMap<u32, u32> = Default::default();
        for i in 0..12 {
            map.insert(colliding_key(i), i);
        }
        let mut copy = map.clone();
        copy.insert(colliding_key(50), 50);
        copy.remove(&colliding_key(0));
        assert_eq!(12, map.len());
        assert_eq!(Some(&0), map.get(&colliding_key(0)));
        assert!(!map.contains_key(&colliding_key(50)));
        map.check_invariants();
        copy.check_invariants();
    }

    #[test]
    fn works_with_other_hashers() {
        let mut map: GenericBinMap<String, i32, BuildHasherDefault<MetroHash64>> =
            Default::default();
        for i in 0..100 {
            map.insert(format!("key-{}", i), i);
        }
        for i in 0..100 {
            assert_eq!(Some(&i), map.get(format!("key-{}", i).as_str()));
        }
        map.check_invariants();
    }

    #[test]
    fn equality_ignores_bucket_layout() {
        let mut a: BinMap<i32, i32> = BinMap::with_capacity(4);
        let mut b: BinMap<i32, i32> = BinMap::with_capacity(512);
        for i in 0..64 {
            a.insert(i, i);
            b.insert(63 - i, 63 - i);
        }
        pretty_assert_eq!(a, b);
    }

    #[test]
    fn large_map() {
        let mut map = BinMap::new();
        let size = 32769;
        for i in 0..size {
            map.insert(i, i);
        }
        assert_eq!(size, map.len());
        for i in 0..size {
            assert_eq!(Some(&i), map.get(&i));
        }
    }

    #[test]
    fn consuming_iterators() {
        let map: BinMap<i32, i32> = binmap![1 => 10, 2 => 20, 3 => 30];
        let mut pairs: Vec<(i32, i32)> = map.clone().into_iter().collect();
        pairs.sort_unstable();
        assert_eq!(vec![(1, 10), (2, 20), (3, 30)], pairs);
        let mut keys: Vec<i32> = map.clone().into_keys().collect();
        keys.sort_unstable();
        assert_eq!(vec![1, 2, 3], keys);
        let mut values: Vec<i32> = map.into_values().collect();
        values.sort_unstable();
        assert_eq!(vec![10, 20, 30], values);
    }

    #[test]
    fn iter_mut_mutates_values() {
        let mut map: ClashMap<u32, u32> = Default::default();
        for i in 0..20 {
            map.insert(colliding_key(i), i);
        }
        for (_, v) in map.iter_mut() {
            *v += 1;
        }
        for i in 0..20 {
            assert_eq!(Some(&(i + 1)), map.get(&colliding_key(i)));
        }
    }

    proptest! {
        #[test]
        fn insert_and_length(ref m in collection::hash_map(i16::ANY, i16::ANY, 0..1000)) {
            let mut map: ClashMap<i16, i16> = Default::default();
            for (index, (k, v)) in m.iter().enumerate() {
                map.insert(*k, *v);
                assert_eq!(Some(v), map.get(k));
                assert_eq!(index + 1, map.len());
            }
            map.check_invariants();
        }

        #[test]
        fn from_iterator(ref m in collection::hash_map(i16::ANY, i16::ANY, 0..1000)) {
            let map: BinMap<i16, i16> =
                FromIterator::from_iter(m.iter().map(|(k, v)| (*k, *v)));
            assert_eq!(m.len(), map.len());
        }

        #[test]
        fn iterate_over(ref m in collection::hash_map(i16::ANY, i16::ANY, 0..1000)) {
            let map: BinMap<i16, i16> = FromIterator::from_iter(m.iter().map(|(k, v)| (*k, *v)));
            assert_eq!(m.len(), map.iter().count());
        }

        #[test]
        fn equality(ref m in collection::hash_map(i16::ANY, i16::ANY, 0..1000)) {
            let map1: BinMap<i16, i16> = FromIterator::from_iter(m.iter().map(|(k, v)| (*k, *v)));
            let map2: BinMap<i16, i16> = FromIterator::from_iter(m.iter().map(|(k, v)| (*k, *v)));
            assert_eq!(map1, map2);
        }

        #[test]
        fn lookup(ref m in collection::hash_map(i16::ANY, i16::ANY, 0..1000)) {
            let map: BinMap<i16, i16> = FromIterator::from_iter(m.iter().map(|(k, v)| (*k, *v)));
            for (k, v) in m {
                assert_eq!(Some(*v), map.get(k).cloned());
            }
        }

        #[test]
        fn remove_all(ref pairs in collection::vec((i16::ANY, i16::ANY), 0..200)) {
            let mut m: collections::HashMap<i16, i16> = collections::HashMap::new();
            for (k, v) in pairs {
                m.insert(*k, *v);
            }
            let mut map: ClashMap<i16, i16> = Default::default();
            for (k, v) in &m {
                map.insert(*k, *v);
            }
            for k in m.keys() {
                let len = map.len();
                assert_eq!(m.get(k).cloned(), map.get(k).cloned());
                map.remove(k);
                assert_eq!(None, map.get(k));
                assert_eq!(len - 1, map.len());
                map.check_invariants();
            }
            assert!(map.is_empty());
        }

        #[test]
        fn size_matches_traversal(ref pairs in collection::vec((i16::ANY, i16::ANY), 0..400)) {
            let mut map: ClashMap<i16, i16> = Default::default();
            let mut model: collections::HashMap<i16, i16> = collections::HashMap::new();
            for (k, v) in pairs {
                if *v % 5 == 0 {
                    map.remove(k);
                    model.remove(k);
                } else {
                    map.insert(*k, *v);
                    model.insert(*k, *v);
                }
                assert_eq!(map.len(), map.iter().count());
                assert_eq!(model.len(), map.len());
            }
            map.check_invariants();
        }
    }
}
