use super::{LatticeOrd, LatticeValue, Merge};

/// A boolean lattice ordered `false < true`. Merging is logical OR: once true,
/// stays true. ⊥ is `false`. Grounded on `lattices::ord::Max`'s merge-returns-
/// changed shape, specialized to `bool`.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoolOr(bool);

impl BoolOr {
    /// Create a new `BoolOr` lattice instance from a `bool`.
    pub fn new(val: bool) -> Self {
        Self(val)
    }

    /// Reveal the inner value.
    pub fn into_reveal(self) -> bool {
        self.0
    }

    /// Reveal the inner value as a shared reference.
    pub fn as_reveal_ref(&self) -> &bool {
        &self.0
    }
}

impl Merge<BoolOr> for BoolOr {
    fn merge(&mut self, other: BoolOr) -> bool {
        if !self.0 && other.0 {
            self.0 = true;
            true
        } else {
            false
        }
    }
}

impl LatticeOrd<Self> for BoolOr {}

impl LatticeValue for BoolOr {
    type Tuple = bool;

    fn direct_add(&mut self, tuple: bool) -> bool {
        self.merge(BoolOr(tuple))
    }

    fn scan(&self) -> Box<dyn Iterator<Item = bool> + '_> {
        Box::new(std::iter::once(self.0))
    }

    fn is_bot(&self) -> bool {
        !self.0
    }

    fn size(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::lattice::test_util::assert_lattice_identities;

    #[test]
    fn ordering() {
        assert!(BoolOr::new(false) < BoolOr::new(true));
        assert_eq!(BoolOr::new(true), BoolOr::new(true));
    }

    #[test]
    fn merge_is_sticky() {
        let mut v = BoolOr::default();
        assert!(v.is_bot());
        assert!(v.merge(BoolOr::new(true)));
        assert!(!v.merge(BoolOr::new(false)), "merging false must not un-set true");
        assert!(v.into_reveal());
    }

    #[test]
    fn consistency() {
        assert_lattice_identities(&[BoolOr::new(false), BoolOr::new(true)]);
    }
}
