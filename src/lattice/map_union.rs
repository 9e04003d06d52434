use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;

use super::{LatticeValue, Merge};

/// One entry of a [`MapUnion`], as produced by `scan`/consumed by `direct_add`
/// (spec.md §4.1: "for sets and maps the entries become `MapEntry{key,
/// value}`").
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapEntry<K, V> {
    /// The map key.
    pub key: K,
    /// The sub-lattice value merged at that key.
    pub value: V,
}

impl<K, V> MapEntry<K, V> {
    /// Build a `MapEntry` from a key and value.
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

/// A lattice mapping keys to lattice values, merged per-key. Absent keys are
/// treated as ⊥ for their value type. Grounded on `lattices::ght::lattice`'s
/// `HashMap`-entry merge (`Occupied` → recurse, `Vacant` → insert).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MapUnion<K, V>(HashMap<K, V>)
where
    K: Eq + Hash + Clone + std::fmt::Debug + 'static,
    V: LatticeValue;

impl<K, V> Default for MapUnion<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug + 'static,
    V: LatticeValue,
{
    fn default() -> Self {
        Self(HashMap::new())
    }
}

impl<K, V> MapUnion<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug + 'static,
    V: LatticeValue,
{
    /// An empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// The sub-lattice value at `key`, if present (spec.md §4.1's `at`).
    pub fn at(&self, key: &K) -> Option<&V> {
        self.0.get(key)
    }
}

impl<K, V> Merge<MapUnion<K, V>> for MapUnion<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug + 'static,
    V: LatticeValue,
{
    fn merge(&mut self, other: MapUnion<K, V>) -> bool {
        let mut changed = false;
        for (k, v) in other.0 {
            match self.0.entry(k) {
                Entry::Occupied(mut occupied) => changed |= occupied.get_mut().merge(v),
                Entry::Vacant(vacant) => {
                    vacant.insert(v);
                    changed = true;
                }
            }
        }
        changed
    }
}

impl<K, V> LatticeValue for MapUnion<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug + PartialEq + 'static,
    V: LatticeValue + PartialEq,
{
    type Tuple = MapEntry<K, V>;

    fn direct_add(&mut self, tuple: MapEntry<K, V>) -> bool {
        match self.0.entry(tuple.key) {
            Entry::Occupied(mut occupied) => occupied.get_mut().merge(tuple.value),
            Entry::Vacant(vacant) => {
                vacant.insert(tuple.value);
                true
            }
        }
    }

    fn scan(&self) -> Box<dyn Iterator<Item = MapEntry<K, V>> + '_> {
        Box::new(
            self.0
                .iter()
                .map(|(k, v)| MapEntry::new(k.clone(), v.clone())),
        )
    }

    fn is_bot(&self) -> bool {
        self.0.is_empty()
    }

    fn size(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lattice::SetUnion;

    #[test]
    fn per_key_merge() {
        let mut totals: MapUnion<String, SetUnion<String>> = MapUnion::new();
        assert!(totals.direct_add(MapEntry::new("r1".to_string(), SetUnion::singleton("alice".to_string()))));
        assert!(totals.direct_add(MapEntry::new("r1".to_string(), SetUnion::singleton("bob".to_string()))));
        assert!(!totals.direct_add(MapEntry::new("r1".to_string(), SetUnion::singleton("bob".to_string()))));

        let r1 = totals.at(&"r1".to_string()).unwrap();
        assert!(r1.contains(&"alice".to_string()));
        assert!(r1.contains(&"bob".to_string()));
        assert_eq!(totals.size(), 1);
    }

    #[test]
    fn absent_key_is_bottom() {
        let totals: MapUnion<String, SetUnion<i64>> = MapUnion::new();
        assert!(totals.at(&"missing".to_string()).is_none());
    }
}
