// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Proptest strategies.
//!
//! These are only available when using the `proptest` feature flag.

use ::proptest::collection::vec;
use ::proptest::strategy::{BoxedStrategy, Strategy};
use std::hash::Hash;
use std::ops::Range;

use crate::map::BinMap;

/// A strategy for a map of a given size.
///
/// # Examples
///
/// ```rust,no_run
/// # use ::proptest::proptest;
/// proptest! {
///     #[test]
///     fn proptest_works(ref m in binmap::proptest::bin_map(0..9999, ".*", 10..100)) {
///         assert!(m.len() < 100);
///         assert!(m.len() >= 10);
///     }
/// }
/// ```
pub fn bin_map<K: Strategy + 'static, V: Strategy + 'static>(
    key: K,
    value: V,
    size: Range<usize>,
) -> BoxedStrategy<BinMap<<K as Strategy>::Value, <V as Strategy>::Value>>
where
    <K as Strategy>::Value: Hash + Eq + Ord,
{
    vec((key, value), size.clone())
        .prop_map(BinMap::from)
        .prop_filter("BinMap minimum size".to_owned(), move |m| {
            m.len() >= size.start
        })
        .boxed()
}
