// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/// The capacity of the first table allocated when a map constructed
/// without a capacity hint receives its first entry.
pub(crate) const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// The largest table we will ever allocate. Once a map grows to this
/// many buckets its threshold is pinned to `usize::MAX` and further
/// growth requests become no-ops.
pub(crate) const MAXIMUM_CAPACITY: usize = 1 << 30;

/// The default ratio of entries to buckets above which the table is
/// doubled.
pub(crate) const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// The chain length at which a bucket is converted to a red-black
/// tree, provided the table has at least `MIN_TREEIFY_CAPACITY`
/// buckets.
pub(crate) const TREEIFY_THRESHOLD: usize = 8;

/// The size at or below which a partition produced by a resize split
/// is flattened back into a plain chain.
// Must be strictly less than TREEIFY_THRESHOLD, with slack in between
// so churn around the boundary does not flap between representations.
pub(crate) const UNTREEIFY_THRESHOLD: usize = 6;

/// The smallest table capacity at which chains may be treeified.
/// Below this a crowded chain triggers a resize instead.
// Must be at least 4 * TREEIFY_THRESHOLD.
pub(crate) const MIN_TREEIFY_CAPACITY: usize = 64;
