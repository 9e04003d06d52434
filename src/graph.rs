//! The dataflow instance: a registry of relations and joins, plus the single
//! per-tick pass that evaluates them in declaration order (spec.md §3, §5).

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::change::{apply_changes, AddChange, ChangeBuffer, ErasedChange, MergeChange};
use crate::error::DeclarationError;
use crate::join::{ErasedJoin, Join1Builder, Join2Builder};
use crate::lattice::{BoolOr, LatticeValue, MapEntry, MapUnion, MaxInt, MaxStr, SetUnion};
use crate::relation::{AnyRelation, Relation, RelationHandle};

/// One running dataflow instance (spec.md §3: "one dataflow instance per
/// network address"). Owns every relation and join declared against it, plus
/// the immediate/deferred change buffers and the tick counter.
///
/// Mirrors `dfir_rs`'s own split between a typed registry (`Rc<dyn Any>`,
/// keyed by name, for `relation::<V>()` lookups) and a type-erased one
/// (`Rc<dyn AnyRelation>`, for whole-engine bookkeeping like scratch reset) —
/// both point at the same underlying `Rc<Relation<V>>` allocation, so keeping
/// two views costs only a refcount bump per relation.
pub struct Dataflow {
    address: String,
    named: RefCell<HashMap<String, Rc<dyn Any>>>,
    all: RefCell<Vec<Rc<dyn AnyRelation>>>,
    joins: RefCell<Vec<Box<dyn ErasedJoin>>>,
    immediate: RefCell<ChangeBuffer>,
    next: RefCell<ChangeBuffer>,
    tick: Cell<u64>,
    tick_before_hook: RefCell<Option<Box<dyn FnMut(&Dataflow)>>>,
}

/// A heterogeneous, embedder-facing snapshot of one declared relation —
/// spec.md §9's redesign note ("downcast only at the embedder boundary")
/// applied to introspection: an embedder enumerating every relation for a
/// diagnostics endpoint never needs the concrete `LatticeValue` type, only
/// these fields, so no per-kind tagged enum is needed to expose them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationSummary {
    /// The relation's declared name.
    pub name: String,
    /// Whether it resets to ⊥ at the start of every tick.
    pub is_scratch: bool,
    /// Whether it is a channel relation.
    pub is_channel: bool,
    /// Current cardinality of its lattice value.
    pub size: usize,
}

impl Dataflow {
    /// Create a fresh dataflow instance for `address` (spec.md §3's "network
    /// address" — opaque to the engine, used only for diagnostics and by the
    /// embedder to route channel relations).
    pub fn new_instance(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            named: RefCell::new(HashMap::new()),
            all: RefCell::new(Vec::new()),
            joins: RefCell::new(Vec::new()),
            immediate: RefCell::new(Vec::new()),
            next: RefCell::new(Vec::new()),
            tick: Cell::new(0),
            tick_before_hook: RefCell::new(None),
        }
    }

    /// The address this instance was created with.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// How many ticks have completed (spec.md's tick counter).
    pub fn tick_count(&self) -> u64 {
        self.tick.get()
    }

    // -- declaration -----------------------------------------------------

    /// Declare a relation of lattice type `V` under `name` (spec.md §4.2).
    /// Fails if `name` is already taken in this instance (spec.md §3
    /// invariant 3: names are unique per instance).
    pub fn declare_relation<V: LatticeValue>(
        &self,
        name: impl Into<String>,
        scratch: bool,
        channel: bool,
    ) -> Result<RelationHandle<V>, DeclarationError> {
        let name = name.into();
        if self.named.borrow().contains_key(&name) {
            return Err(DeclarationError::DuplicateRelation { name });
        }
        let relation = Relation::<V>::new(name.clone(), scratch, channel);
        self.named
            .borrow_mut()
            .insert(name, Rc::clone(&relation) as Rc<dyn Any>);
        self.all
            .borrow_mut()
            .push(Rc::clone(&relation) as Rc<dyn AnyRelation>);
        Ok(relation)
    }

    /// Look up a previously-declared relation by name and expected type
    /// (spec.md §4.2's named lookup, used at the embedder boundary where the
    /// caller only has a string).
    pub fn relation<V: LatticeValue>(
        &self,
        name: &str,
    ) -> Result<RelationHandle<V>, DeclarationError> {
        let entry = self
            .named
            .borrow()
            .get(name)
            .cloned()
            .ok_or_else(|| DeclarationError::UnknownRelation { name: name.to_string() })?;
        entry
            .downcast::<Relation<V>>()
            .map_err(|_| DeclarationError::RelationTypeMismatch { name: name.to_string() })
    }

    /// `bool-or` relation sugar (spec.md §4.1's named lattice kinds).
    pub fn declare_lbool(
        &self,
        name: impl Into<String>,
        scratch: bool,
    ) -> Result<RelationHandle<BoolOr>, DeclarationError> {
        self.declare_relation(name, scratch, false)
    }

    /// `max-int` relation sugar.
    pub fn declare_lmax(
        &self,
        name: impl Into<String>,
        scratch: bool,
    ) -> Result<RelationHandle<MaxInt>, DeclarationError> {
        self.declare_relation(name, scratch, false)
    }

    /// `max-string` relation sugar.
    pub fn declare_lmax_string(
        &self,
        name: impl Into<String>,
        scratch: bool,
    ) -> Result<RelationHandle<MaxStr>, DeclarationError> {
        self.declare_relation(name, scratch, false)
    }

    /// `set-union` relation sugar.
    pub fn declare_lset<T>(
        &self,
        name: impl Into<String>,
        scratch: bool,
    ) -> Result<RelationHandle<SetUnion<T>>, DeclarationError>
    where
        T: crate::lattice::TupleValue + Eq + std::hash::Hash,
    {
        self.declare_relation(name, scratch, false)
    }

    /// `map-union` relation sugar.
    pub fn declare_lmap<K, V>(
        &self,
        name: impl Into<String>,
        scratch: bool,
    ) -> Result<RelationHandle<MapUnion<K, V>>, DeclarationError>
    where
        K: Eq + std::hash::Hash + Clone + std::fmt::Debug + PartialEq + 'static,
        V: LatticeValue + PartialEq,
        MapUnion<K, V>: LatticeValue<Tuple = MapEntry<K, V>>,
    {
        self.declare_relation(name, scratch, false)
    }

    /// A channel relation: scratch, and routable over the network by an
    /// embedder-supplied transport (spec.md §4.3's "channel" sugar).
    pub fn declare_channel<V: LatticeValue>(
        &self,
        name: impl Into<String>,
    ) -> Result<RelationHandle<V>, DeclarationError> {
        self.declare_relation(name, true, true)
    }

    /// Sugar for `declare_relation(name, true, false)` (spec.md §4.3:
    /// "`scratch` declares a relation that resets every tick").
    pub fn scratch<V: LatticeValue>(
        &self,
        name: impl Into<String>,
    ) -> Result<RelationHandle<V>, DeclarationError> {
        self.declare_relation(name, true, false)
    }

    /// Sugar for an externally-fed, persistent relation (spec.md §4.3's
    /// `input` — "purely declarative": identical to `declare_relation` with
    /// `scratch = false`, kept separate only to name the intent).
    pub fn input<V: LatticeValue>(
        &self,
        name: impl Into<String>,
    ) -> Result<RelationHandle<V>, DeclarationError> {
        self.declare_relation(name, false, false)
    }

    /// Sugar for a persistent relation meant to be read externally
    /// (spec.md §4.3's `output`).
    pub fn output<V: LatticeValue>(
        &self,
        name: impl Into<String>,
    ) -> Result<RelationHandle<V>, DeclarationError> {
        self.declare_relation(name, false, false)
    }

    /// A snapshot of every declared relation, without needing its concrete
    /// lattice type — for embedder-facing diagnostics/admin surfaces.
    pub fn describe_relations(&self) -> Vec<RelationSummary> {
        self.all
            .borrow()
            .iter()
            .map(|r| RelationSummary {
                name: r.name().to_string(),
                is_scratch: r.is_scratch(),
                is_channel: r.is_channel(),
                size: r.size(),
            })
            .collect()
    }

    // -- join construction -------------------------------------------------

    /// Begin a join over a single source (spec.md §4.4/§4.5).
    pub fn join1<V1: LatticeValue>(&self, source: &RelationHandle<V1>) -> Join1Builder<'_, V1> {
        Join1Builder::new(self, Rc::clone(source))
    }

    /// Begin a join over two sources, scanned as a cartesian product
    /// (spec.md §4.5). Passing the same handle twice is a self-join
    /// (spec.md §8 scenario 3's transitive-closure step).
    pub fn join2<V1: LatticeValue, V2: LatticeValue>(
        &self,
        source1: &RelationHandle<V1>,
        source2: &RelationHandle<V2>,
    ) -> Join2Builder<'_, V1, V2> {
        Join2Builder::new(self, Rc::clone(source1), Rc::clone(source2))
    }

    pub(crate) fn register_join(&self, join: Box<dyn ErasedJoin>) {
        self.joins.borrow_mut().push(join);
    }

    pub(crate) fn enqueue(&self, change: Box<dyn ErasedChange>, asynchronous: bool) {
        if asynchronous {
            self.next.borrow_mut().push(change);
        } else {
            self.immediate.borrow_mut().push(change);
        }
    }

    // -- direct mutation (spec.md §4.7) -------------------------------------

    /// Enqueue a tuple to be added immediately: visible to joins evaluated
    /// later in the current tick (spec.md §4.7's `add`).
    pub fn add<V: LatticeValue>(&self, target: &RelationHandle<V>, tuple: V::Tuple) {
        self.enqueue(Box::new(AddChange { target: Rc::clone(target), tuple }), false);
    }

    /// Enqueue a whole lattice value to be merged immediately
    /// (spec.md §4.7's `merge`).
    pub fn merge<V: LatticeValue>(&self, target: &RelationHandle<V>, value: V) {
        self.enqueue(Box::new(MergeChange { target: Rc::clone(target), value }), false);
    }

    /// Enqueue a tuple to be added at the start of the *next* tick
    /// (spec.md §4.7's `add_next` — also how external drivers seed a
    /// relation before the first tick runs).
    pub fn add_next<V: LatticeValue>(&self, target: &RelationHandle<V>, tuple: V::Tuple) {
        self.enqueue(Box::new(AddChange { target: Rc::clone(target), tuple }), true);
    }

    /// Enqueue a whole lattice value to be merged at the start of the next
    /// tick (spec.md §4.7's `merge_next`).
    pub fn merge_next<V: LatticeValue>(&self, target: &RelationHandle<V>, value: V) {
        self.enqueue(Box::new(MergeChange { target: Rc::clone(target), value }), true);
    }

    // -- tick execution --------------------------------------------------

    /// Register a hook run once every `tick()`, right after scratch relations
    /// reset and before the deferred buffer is applied (spec.md §5's
    /// "tick-before" step — the embedder's seam for injecting
    /// externally-arrived data, e.g. inbound channel messages, or driving
    /// timers).
    pub fn set_tick_before_hook(&self, hook: impl FnMut(&Dataflow) + 'static) {
        *self.tick_before_hook.borrow_mut() = Some(Box::new(hook));
    }

    /// Run one tick (spec.md §5, §4.6):
    ///
    /// 1. reset every scratch relation to ⊥;
    /// 2. the tick-before hook, if any — an embedder's transport delivers
    ///    inbound channel messages here via `direct_add`, which must land
    ///    after scratches are cleared or they'd be wiped again before the
    ///    joins ever see them;
    /// 3. apply and clear the deferred (`next`) buffer;
    /// 4. evaluate every join once, in declaration order, draining the
    ///    immediate buffer after each one so a later join in the same tick
    ///    observes an earlier join's synchronous writes (spec.md §8: "∀ sync
    ///    write w enqueued during join jᵢ: visible to join jᵢ₊₁");
    /// 5. increment the tick counter.
    ///
    /// A tick is a single logical step: there is no intra-tick fixed-point
    /// iteration beyond this one pass and the sequential draining between
    /// joins (spec.md §4.6).
    pub fn tick(&self) {
        for relation in self.all.borrow().iter() {
            relation.start_tick();
        }

        if let Some(mut hook) = self.tick_before_hook.borrow_mut().take() {
            hook(self);
            *self.tick_before_hook.borrow_mut() = Some(hook);
        }

        {
            let mut next = self.next.borrow_mut();
            apply_changes(&mut next);
        }

        for join in self.joins.borrow().iter() {
            join.evaluate(self);
            let mut immediate = self.immediate.borrow_mut();
            if !immediate.is_empty() {
                apply_changes(&mut immediate);
            }
        }

        self.tick.set(self.tick.get() + 1);
        tracing::debug!(address = %self.address, tick = self.tick.get(), "tick complete");
    }
}
