// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use crate::map::GenericBinMap;
use ::quickcheck::{Arbitrary, Gen};
use std::hash::{BuildHasher, Hash};

impl<K, V, S> Arbitrary for GenericBinMap<K, V, S>
where
    K: Hash + Eq + Ord + Clone + Arbitrary + Sync,
    V: Clone + Arbitrary + Sync,
    S: BuildHasher + Default + Clone + Send + Sync + 'static,
{
    fn arbitrary(g: &mut Gen) -> Self {
        GenericBinMap::from(Vec::<(K, V)>::arbitrary(g))
    }
}
