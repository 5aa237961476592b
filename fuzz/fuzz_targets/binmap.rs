#![no_main]

use std::collections::HashMap as NatMap;
use std::iter::FromIterator;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use binmap::BinMap;

#[derive(Arbitrary, Debug)]
enum Action<K, V> {
    Insert(K, V),
    Remove(K),
    InsertIfAbsent(K, V),
    Merge(K, V),
    Retain(V),
    Clear,
}

// Keys are u8 so that collisions, long chains and tree buckets come up
// constantly.
fuzz_target!(|actions: Vec<Action<u8, u16>>| {
    let mut map = BinMap::new();
    let mut nat = NatMap::new();
    for action in actions {
        match action {
            Action::Insert(key, value) => {
                assert_eq!(nat.insert(key, value), map.insert(key, value));
            }
            Action::Remove(key) => {
                assert_eq!(nat.remove(&key), map.remove(&key));
            }
            Action::InsertIfAbsent(key, value) => {
                let expected = nat.get(&key).copied();
                nat.entry(key).or_insert(value);
                assert_eq!(expected, map.insert_if_absent(key, value).map(|v| *v));
            }
            Action::Merge(key, value) => {
                let expected = match nat.get(&key) {
                    None => value,
                    Some(old) => old.wrapping_add(value),
                };
                nat.insert(key, expected);
                let merged = map
                    .merge(key, value, |old, new| Some(old.wrapping_add(new)))
                    .map(|v| *v);
                assert_eq!(Some(expected), merged);
            }
            Action::Retain(limit) => {
                nat.retain(|_, v| *v < limit);
                map.retain(|_, v| *v < limit);
            }
            Action::Clear => {
                nat.clear();
                map.clear();
            }
        }
        assert_eq!(nat.len(), map.len());
        map.check_invariants();
    }
    for (k, v) in &nat {
        assert_eq!(Some(v), map.get(k));
    }
    assert_eq!(map.iter().count(), nat.len());
    assert_eq!(NatMap::from_iter(map.into_iter()), nat);
});
