use std::collections::HashSet;
use std::hash::Hash;

use super::{LatticeValue, Merge, TupleValue};

/// A finite-set lattice ordered by subset inclusion; merge is union, ⊥ is ∅.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetUnion<T: TupleValue + Eq + Hash>(HashSet<T>);

impl<T: TupleValue + Eq + Hash> Default for SetUnion<T> {
    fn default() -> Self {
        Self(HashSet::new())
    }
}

impl<T: TupleValue + Eq + Hash> SetUnion<T> {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// A set containing exactly one element.
    pub fn singleton(item: T) -> Self {
        let mut set = HashSet::with_capacity(1);
        set.insert(item);
        Self(set)
    }

    /// Whether `item` is a member.
    pub fn contains(&self, item: &T) -> bool {
        self.0.contains(item)
    }
}

impl<T: TupleValue + Eq + Hash> Merge<SetUnion<T>> for SetUnion<T> {
    fn merge(&mut self, other: SetUnion<T>) -> bool {
        let before = self.0.len();
        self.0.extend(other.0);
        self.0.len() != before
    }
}

impl<T: TupleValue + Eq + Hash> LatticeValue for SetUnion<T> {
    type Tuple = T;

    fn direct_add(&mut self, tuple: T) -> bool {
        self.0.insert(tuple)
    }

    fn scan(&self) -> Box<dyn Iterator<Item = T> + '_> {
        Box::new(self.0.iter().cloned())
    }

    fn is_bot(&self) -> bool {
        self.0.is_empty()
    }

    fn size(&self) -> usize {
        self.0.len()
    }
}

impl<T: TupleValue + Eq + Hash> FromIterator<T> for SetUnion<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(HashSet::from_iter(iter))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn union_dedups() {
        let mut a = SetUnion::from_iter([1, 2, 3]);
        assert!(!a.merge(SetUnion::from_iter([1, 2])), "no new elements");
        assert!(a.merge(SetUnion::from_iter([4])));
        assert_eq!(a.size(), 4);
    }

    #[test]
    fn direct_add_reports_change() {
        let mut a: SetUnion<&str> = SetUnion::new();
        assert!(a.direct_add("x"));
        assert!(!a.direct_add("x"));
        assert!(a.contains(&"x"));
    }
}
