//! Bounded join-semilattice value types.
//!
//! Every lattice kind has a ⊥ (via [`Default`]), a `merge` that computes a least
//! upper bound and reports whether the value changed, and a `scan` producing the
//! tuples the lattice currently holds. Grounded on `lattices::ord::Max` (merge
//! returns a changed-bool, newtype-wrapped element types) and
//! `lattices::ght::lattice` (per-key `HashMap` entry merge for the map kind).

mod bool_or;
mod map_union;
mod ord;
mod set_union;

pub use bool_or::BoolOr;
pub use map_union::{MapEntry, MapUnion};
pub use ord::{MaxInt, MaxStr};
pub use set_union::SetUnion;

/// Merges `other` into `self`, moving `self` up the lattice order.
///
/// Returns whether `self` changed. A `false` return is not an error: it means
/// `other` was already `≤ self` (spec.md §7.3's "idempotent no-op").
pub trait Merge<Other = Self> {
    /// Merge `other` into `self` in place. Returns `true` iff `self` changed.
    fn merge(&mut self, other: Other) -> bool;
}

/// Marker for lattice types whose `PartialOrd` agrees with the lattice order
/// (i.e. `a.merge(b)` changes `a` iff `!(a >= b)`).
pub trait LatticeOrd<Rhs = Self>: PartialOrd<Rhs> {}

/// Blanket bound for anything usable as a tuple flowing through a relation:
/// cheap to clone, debuggable, and structurally comparable (spec.md §4.1:
/// "Equality for tuple deduplication is structural").
pub trait TupleValue: Clone + std::fmt::Debug + PartialEq + 'static {}
impl<T: Clone + std::fmt::Debug + PartialEq + 'static> TupleValue for T {}

/// A bounded join-semilattice value that a [`crate::relation::Relation`] can wrap.
///
/// `Tuple` is the element type `scan`/`direct_add` work with: for scalar
/// lattices (bool-or, max) it's the scalar itself; for `SetUnion` it's the set
/// element; for `MapUnion` it's a [`MapEntry`].
pub trait LatticeValue: Merge<Self> + Default + Clone + std::fmt::Debug + PartialEq + 'static {
    /// The tuple type this lattice's relation exposes via `scan`/`direct_add`.
    type Tuple: TupleValue;

    /// Merge a single tuple in directly (spec.md §4.2's `direct_add`).
    ///
    /// For `SetUnion` this inserts; for `MapUnion` this upserts by key with a
    /// sub-lattice merge; for scalar lattices this merges the carried value.
    fn direct_add(&mut self, tuple: Self::Tuple) -> bool;

    /// A finite sequence of the tuples currently held (spec.md §4.1's `scan`).
    fn scan(&self) -> Box<dyn Iterator<Item = Self::Tuple> + '_>;

    /// Whether this value is exactly ⊥.
    fn is_bot(&self) -> bool;

    /// Cardinality, where meaningful (1 for scalar lattices).
    fn size(&self) -> usize;
}

#[cfg(test)]
pub(crate) mod test_util {
    use super::*;

    /// Checks `merge` is idempotent, commutative, and associative over a small
    /// sample — the same properties `lattices`' own `check_lattice_properties`
    /// asserts in `ord.rs`.
    pub(crate) fn assert_lattice_identities<L>(samples: &[L])
    where
        L: LatticeValue + PartialEq,
    {
        for a in samples {
            // idempotence
            let mut a1 = a.clone();
            a1.merge(a.clone());
            assert_eq!(&a1, a, "merge(a, a) must equal a");
        }
        for a in samples {
            for b in samples {
                // commutativity
                let mut ab = a.clone();
                ab.merge(b.clone());
                let mut ba = b.clone();
                ba.merge(a.clone());
                assert_eq!(ab, ba, "merge must be commutative");
            }
        }
    }
}
