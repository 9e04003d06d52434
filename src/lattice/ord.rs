use super::{LatticeOrd, LatticeValue, Merge};

/// A totally ordered max-int lattice. Merging keeps the larger value; ⊥ is
/// `i64::MIN`. Grounded on `lattices::ord::Max<T>`, specialized to a concrete
/// element type (rather than kept fully generic) so `Default` can encode the
/// correct ⊥ from spec.md §4.1's table instead of an arbitrary `T::default()`.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaxInt(i64);

impl MaxInt {
    /// Create a new `MaxInt` lattice instance.
    pub fn new(val: i64) -> Self {
        Self(val)
    }

    /// Reveal the inner value.
    pub fn into_reveal(self) -> i64 {
        self.0
    }

    /// Reveal the inner value as a shared reference.
    pub fn as_reveal_ref(&self) -> &i64 {
        &self.0
    }
}

impl Default for MaxInt {
    fn default() -> Self {
        Self(i64::MIN)
    }
}

impl Merge<MaxInt> for MaxInt {
    fn merge(&mut self, other: MaxInt) -> bool {
        if self.0 < other.0 {
            self.0 = other.0;
            true
        } else {
            false
        }
    }
}

impl LatticeOrd<Self> for MaxInt {}

impl LatticeValue for MaxInt {
    type Tuple = i64;

    fn direct_add(&mut self, tuple: i64) -> bool {
        self.merge(MaxInt(tuple))
    }

    fn scan(&self) -> Box<dyn Iterator<Item = i64> + '_> {
        Box::new(std::iter::once(self.0))
    }

    fn is_bot(&self) -> bool {
        self.0 == i64::MIN
    }

    fn size(&self) -> usize {
        1
    }
}

/// A lexicographically ordered max-string lattice. Merging keeps the larger
/// value; ⊥ is `""`.
#[repr(transparent)]
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaxStr(String);

impl MaxStr {
    /// Create a new `MaxStr` lattice instance.
    pub fn new(val: impl Into<String>) -> Self {
        Self(val.into())
    }

    /// Reveal the inner value.
    pub fn into_reveal(self) -> String {
        self.0
    }

    /// Reveal the inner value as a shared reference.
    pub fn as_reveal_ref(&self) -> &str {
        &self.0
    }
}

impl Merge<MaxStr> for MaxStr {
    fn merge(&mut self, other: MaxStr) -> bool {
        if self.0 < other.0 {
            self.0 = other.0;
            true
        } else {
            false
        }
    }
}

impl LatticeOrd<Self> for MaxStr {}

impl LatticeValue for MaxStr {
    type Tuple = String;

    fn direct_add(&mut self, tuple: String) -> bool {
        self.merge(MaxStr(tuple))
    }

    fn scan(&self) -> Box<dyn Iterator<Item = String> + '_> {
        Box::new(std::iter::once(self.0.clone()))
    }

    fn is_bot(&self) -> bool {
        self.0.is_empty()
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
    fn max_int_ordering() {
        assert!(MaxInt::default().is_bot());
        let mut v = MaxInt::new(5);
        assert!(!v.merge(MaxInt::new(3)));
        assert!(v.merge(MaxInt::new(7)));
        assert_eq!(v.into_reveal(), 7);
    }

    #[test]
    fn max_str_ordering() {
        assert!(MaxStr::default().is_bot());
        let mut v = MaxStr::new("alice");
        assert!(v.merge(MaxStr::new("bob")));
        assert!(!v.merge(MaxStr::new("alice")));
        assert_eq!(v.into_reveal(), "bob");
    }

    #[test]
    fn consistency() {
        assert_lattice_identities(&[MaxInt::new(0), MaxInt::new(1), MaxInt::default()]);
        assert_lattice_identities(&[MaxStr::new(""), MaxStr::new("a"), MaxStr::new("b")]);
    }
}
