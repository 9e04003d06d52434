//! Named, typed containers of tuples with lattice semantics (spec.md §4.2).

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::lattice::LatticeValue;

/// A shared handle to a declared relation. Cloning is cheap (`Rc`); every
/// clone refers to the same underlying state. Mirrors the
/// `Rc<RefCell<...>>` shape `dfir_rs::scheduled::handoff::VecHandoff` uses for
/// its own shared, interior-mutable buffers.
pub type RelationHandle<V> = Rc<Relation<V>>;

/// A named container wrapping one [`LatticeValue`] (spec.md §4.2).
///
/// Mutating methods take `&self`: the lattice state lives behind a
/// [`RefCell`] so a `RelationHandle` can be cloned into multiple join
/// declarations and the registry while the dataflow instance still exclusively
/// owns the single underlying allocation (spec.md §3's ownership rule).
#[derive(Debug)]
pub struct Relation<V: LatticeValue> {
    name: String,
    scratch: Cell<bool>,
    channel: bool,
    state: RefCell<V>,
}

impl<V: LatticeValue> Relation<V> {
    pub(crate) fn new(name: impl Into<String>, scratch: bool, channel: bool) -> RelationHandle<V> {
        Rc::new(Self {
            name: name.into(),
            scratch: Cell::new(scratch),
            channel,
            state: RefCell::new(V::default()),
        })
    }

    /// This relation's declared name, unique within its dataflow instance.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this relation resets to ⊥ at the start of every tick.
    pub fn is_scratch(&self) -> bool {
        self.scratch.get()
    }

    /// Whether this relation is a channel (a scratch set routable over the
    /// network by an embedder-supplied transport).
    pub fn is_channel(&self) -> bool {
        self.channel
    }

    /// Mark this relation scratch after the fact (spec.md §4.3's
    /// `scratch`/`input`/`output` sugar — "purely declarative").
    pub fn mark_scratch(&self) {
        self.scratch.set(true);
    }

    /// A finite snapshot of the tuples currently held.
    ///
    /// spec.md §4.1 calls `scan` "lazy"; here it materializes eagerly into a
    /// `Vec` instead of returning a borrow tied to the internal `RefCell`
    /// guard, which would otherwise need to outlive this method call. Tuple
    /// domains are already required to be finite per tick (spec.md §3
    /// invariant 5), so eager collection loses nothing observable — see
    /// DESIGN.md.
    pub fn scan(&self) -> Vec<V::Tuple> {
        self.state.borrow().scan().collect()
    }

    /// Merge a single tuple into this relation's lattice value
    /// (spec.md §4.2's `direct_add`).
    pub fn direct_add(&self, tuple: V::Tuple) -> bool {
        self.state.borrow_mut().direct_add(tuple)
    }

    /// Merge a whole lattice value of matching type into this relation
    /// (spec.md §4.2's `direct_merge`).
    pub fn direct_merge(&self, other: V) -> bool {
        self.state.borrow_mut().merge(other)
    }

    /// Reset to ⊥ if this relation is scratch; otherwise a no-op
    /// (spec.md §4.2's `start_tick`).
    pub fn start_tick(&self) {
        if self.scratch.get() {
            *self.state.borrow_mut() = V::default();
        }
    }

    /// Cardinality of the current lattice value.
    pub fn size(&self) -> usize {
        self.state.borrow().size()
    }

    /// Whether the current lattice value is ⊥.
    pub fn is_empty(&self) -> bool {
        self.state.borrow().is_bot()
    }

    /// A clone of the whole current lattice value, e.g. to compare a scalar
    /// relation's value directly in a test.
    pub fn value_snapshot(&self) -> V {
        self.state.borrow().clone()
    }
}

/// Type-erased view of a relation, used only at the engine's own internal
/// bookkeeping seam (scratch reset and channel enumeration each tick) — never
/// exposed to join declarations, which keep fully-typed `RelationHandle<V>`s
/// (spec.md §9's redesign note: "downcast only at the embedder boundary;
/// inside the engine, keep strongly-typed relation handles").
pub(crate) trait AnyRelation: Any {
    fn name(&self) -> &str;
    fn is_channel(&self) -> bool;
    fn is_scratch(&self) -> bool;
    fn size(&self) -> usize;
    fn start_tick(&self);
}

impl<V: LatticeValue> AnyRelation for Relation<V> {
    fn name(&self) -> &str {
        Relation::name(self)
    }

    fn is_channel(&self) -> bool {
        Relation::is_channel(self)
    }

    fn is_scratch(&self) -> bool {
        Relation::is_scratch(self)
    }

    fn size(&self) -> usize {
        Relation::size(self)
    }

    fn start_tick(&self) {
        Relation::start_tick(self)
    }
}
