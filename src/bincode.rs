// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::hash::{BuildHasher, Hash};

use bincode::de::Decoder;
use bincode::enc::Encoder;
use bincode::error::{DecodeError, EncodeError};
use bincode::{Decode, Encode};

use crate::map::GenericBinMap;

// The encoded form is the table capacity, then the entry count, then
// the entries. Capacity comes along so a decoded map starts out at the
// size its encoder had grown to instead of rediscovering it one resize
// at a time; the entries themselves are replayed through ordinary
// inserts, which rebuilds chains and trees from scratch.

impl<C, K, V, S> Decode<C> for GenericBinMap<K, V, S>
where
    K: Decode<C> + Hash + Eq + Ord,
    V: Decode<C>,
    S: BuildHasher + Default,
{
    fn decode<D: Decoder<Context = C>>(decoder: &mut D) -> Result<Self, DecodeError> {
        let capacity: usize = Decode::decode(decoder)?;
        let len: usize = Decode::decode(decoder)?;
        let mut output = Self::with_capacity(capacity);
        for _ in 0..len {
            let (k, v): (K, V) = Decode::decode(decoder)?;
            // Duplicates are silently ignored
            output.insert(k, v);
        }
        Ok(output)
    }
}

impl<K, V, S> Encode for GenericBinMap<K, V, S>
where
    K: Encode + Hash + Eq + Ord,
    V: Encode,
    S: BuildHasher,
{
    fn encode<E: Encoder>(&self, encoder: &mut E) -> Result<(), EncodeError> {
        Encode::encode(&self.capacity(), encoder)?;
        Encode::encode(&self.len(), encoder)?;
        for (k, v) in self.iter() {
            Encode::encode(&(k, v), encoder)?;
        }
        Ok(())
    }
}

// Tests
