// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A hash map with tree-escalating buckets.
//!
//! This crate provides [`BinMap`][map::BinMap], a mutable, strictly
//! single-threaded hash map in the lineage of classic bucket-and-chain
//! tables, with one twist: a bucket that collects too many colliding
//! keys is converted into a red-black tree, turning the adversarial
//! worst case from O(n) per lookup into O(log n). When removals or a
//! table resize thin a tree back out, it reverts to a plain chain.
//!
//! None of this machinery is visible in the API. What you get is a map
//! with the usual operations, a compute family
//! ([`compute_if_absent`][map::GenericBinMap::compute_if_absent],
//! [`compute_if_present`][map::GenericBinMap::compute_if_present],
//! [`merge`][map::GenericBinMap::merge]), an
//! [`Entry`][map::Entry] API, and a detached fail-fast
//! [`Cursor`][map::Cursor] that detects structural modification
//! mid-traversal instead of silently misbehaving.
//!
//! # Hashing and ordering
//!
//! Keys must implement [`Hash`][std::hash::Hash],
//! [`Eq`][std::cmp::Eq] and [`Ord`][std::cmp::Ord]. The ordering
//! exists to break ties inside tree buckets when two distinct keys
//! hash identically; without it a tree bucket would have nowhere
//! deterministic to send such a key. For the overwhelming majority of
//! key types the `Ord` bound costs nothing.
//!
//! The hasher is pluggable through the standard
//! [`BuildHasher`][std::hash::BuildHasher] mechanism and defaults to
//! [`RandomState`][std::collections::hash_map::RandomState].
//!
//! # Feature flags
//!
//! * `serde`: [`Serialize`/`Deserialize`][serde] implementations.
//! * `bincode`: [`Encode`/`Decode`][bincode] implementations; the
//!   encoded form records the table capacity so a decoded map starts
//!   at the size its encoder had grown to.
//! * `proptest`: a strategy for generating maps.
//! * `quickcheck`: an [`Arbitrary`][quickcheck] implementation.
//! * `arbitrary`: an [`Arbitrary`][arbitrary] implementation for
//!   fuzzing.
//! * `debug`: re-verify every structural invariant after each
//!   mutation. Far too slow for anything but tests and fuzzing.
//!
//! [serde]: https://docs.rs/serde
//! [bincode]: https://docs.rs/bincode
//! [quickcheck]: https://docs.rs/quickcheck
//! [arbitrary]: https://docs.rs/arbitrary

#![deny(unsafe_code, nonstandard_style)]
#![warn(rust_2018_idioms, unreachable_pub, missing_docs)]

mod config;
mod nodes;

pub mod map;

pub use crate::map::{
    BinMap, ConcurrentModification, Cursor, Entry, GenericBinMap, OccupiedEntry, VacantEntry,
};

#[cfg(feature = "arbitrary")]
mod arbitrary;
#[cfg(feature = "bincode")]
mod bincode;
#[cfg(any(test, feature = "proptest"))]
pub mod proptest;
#[cfg(feature = "quickcheck")]
mod quickcheck;
#[cfg(feature = "serde")]
mod ser;

#[cfg(test)]
mod test {
    use std::hash::Hasher;

    /// A hasher that passes small integer keys through unchanged, so
    /// tests can place keys in buckets by construction.
    #[derive(Default)]
    pub(crate) struct ClashHasher {
        hash: u64,
    }

    impl Hasher for ClashHasher {
        fn write(&mut self, bytes: &[u8]) {
            for byte in bytes.iter().rev() {
                self.hash = (self.hash << 8) | *byte as u64;
            }
        }

        fn finish(&self) -> u64 {
            self.hash
        }
    }
}
