//! Pending writes to relations (spec.md §4.7): `add` (a tuple) or `merge` (a
//! whole relation's lattice value), consumed FIFO at apply time.

use crate::lattice::LatticeValue;
use crate::relation::RelationHandle;

/// A single pending write, type-erased so immediate/next buffers can hold a
/// heterogeneous mix of changes targeting relations of different types.
pub(crate) trait ErasedChange {
    /// Apply this change to its target.
    fn apply(self: Box<Self>);
}

pub(crate) struct AddChange<V: LatticeValue> {
    pub(crate) target: RelationHandle<V>,
    pub(crate) tuple: V::Tuple,
}

impl<V: LatticeValue> ErasedChange for AddChange<V> {
    fn apply(self: Box<Self>) {
        self.target.direct_add(self.tuple);
    }
}

pub(crate) struct MergeChange<V: LatticeValue> {
    pub(crate) target: RelationHandle<V>,
    pub(crate) value: V,
}

impl<V: LatticeValue> ErasedChange for MergeChange<V> {
    fn apply(self: Box<Self>) {
        self.target.direct_merge(self.value);
    }
}

/// A FIFO queue of pending changes (spec.md §4.7's `apply_changes` consumes
/// one of these). Order within a buffer doesn't affect final state
/// (associativity + commutativity of lattice merge) but FIFO is the defined
/// execution order for diagnostics.
pub(crate) type ChangeBuffer = Vec<Box<dyn ErasedChange>>;

/// Drain `buffer`, applying every change in FIFO order.
pub(crate) fn apply_changes(buffer: &mut ChangeBuffer) {
    for change in buffer.drain(..) {
        change.apply();
    }
}
