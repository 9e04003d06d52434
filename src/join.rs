//! The join planner and evaluator (spec.md §4.4–4.5).
//!
//! spec.md's `join(args...)` is a runtime-variadic call validated by
//! reflection. Rust has no runtime variadics, and spec.md §9 explicitly asks
//! for "a typed builder: a projection is a function whose input/output types
//! are captured as generic parameters of the join constructor, with
//! compile-time enforcement" in place of reflection — so arity becomes a
//! family of constructors (`Dataflow::join1`, `::join2`, ...) instead of one
//! variadic entry point, and most of spec.md §7.1's declaration errors (wrong
//! arity, mismatched parameter/source types, mismatched output/destination
//! types) become compile errors rather than `DeclarationError` values. A
//! `#[must_use]` on every builder stage plays the same role for "absent
//! destination on a join attaching `into`" (spec.md §4.4): a join built but
//! never finished with `.into`/`.into_async`/`.for_each` is a compile-time
//! warning, not a runtime error.
//!
//! Three output modes per arity, matching spec.md §4.5's "Output policy":
//! `.map` (a projection returning `Option<Out>`, written as an `add` into a
//! destination whose `Tuple = Out`), `.map_flat` (a projection returning
//! `Option<VOut>` where `VOut` is itself a [`LatticeValue`], merged whole into
//! a destination of that type — spec.md §4.4's "flatten-flag"), and
//! `.for_each` (a predicate/action with no return, using `add`/`merge` on the
//! `&Dataflow` passed in — spec.md §4.5's "Function with no return").
//! `.forward()` (spec.md §8 scenario 1's identity join) is sugar for
//! `.map(|t| Some(t.clone()))` on a single source, not a fourth mode.

use itertools::Itertools;

use crate::change::{AddChange, MergeChange};
use crate::graph::Dataflow;
use crate::lattice::LatticeValue;
use crate::relation::RelationHandle;

/// A join evaluated once per tick, type-erased so `Dataflow` can hold joins of
/// differing arity/source types in one `Vec` (spec.md §3: "Join list").
pub(crate) trait ErasedJoin {
    fn evaluate(&self, df: &Dataflow);
}

// ---------------------------------------------------------------------
// Arity 1
// ---------------------------------------------------------------------

/// Builder for a join over a single source relation.
#[must_use = "a join has no effect until `.map`/`.map_flat`/`.for_each` and a destination are attached"]
pub struct Join1Builder<'d, V1: LatticeValue> {
    dataflow: &'d Dataflow,
    source: RelationHandle<V1>,
    name: Option<String>,
}

impl<'d, V1: LatticeValue> Join1Builder<'d, V1> {
    pub(crate) fn new(dataflow: &'d Dataflow, source: RelationHandle<V1>) -> Self {
        Self { dataflow, source, name: None }
    }

    /// Attach a diagnostic name (spec.md §4.4's `name`).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Project each tuple of the source to `Option<Out>`; `None` is skipped
    /// (spec.md §4.5's "projection returning the absent marker is skipped").
    pub fn map<F, Out>(self, f: F) -> Join1MapStage<'d, V1, F, Out>
    where
        F: Fn(&V1::Tuple) -> Option<Out> + 'static,
        Out: Clone + std::fmt::Debug + PartialEq + 'static,
    {
        Join1MapStage::build(self.dataflow, self.source, self.name, f)
    }

    /// Forward every tuple of the source verbatim (spec.md §4.4's
    /// "If no function is present, exactly one source is allowed and its
    /// tuples are forwarded verbatim").
    pub fn forward(self) -> Join1MapStage<'d, V1, impl Fn(&V1::Tuple) -> Option<V1::Tuple>, V1::Tuple> {
        self.map(|t: &V1::Tuple| Some(t.clone()))
    }

    /// Project each tuple to a whole sub-lattice value to merge into the
    /// destination (spec.md §4.4's flatten-flag / `join_flat`).
    pub fn map_flat<F, VOut>(self, f: F) -> Join1FlatStage<'d, V1, F, VOut>
    where
        F: Fn(&V1::Tuple) -> Option<VOut> + 'static,
        VOut: LatticeValue,
    {
        Join1FlatStage {
            dataflow: self.dataflow,
            source: self.source,
            name: self.name,
            f,
            _marker: std::marker::PhantomData,
        }
    }

    /// A predicate/side-effecting action with no destination: `f` enqueues
    /// its own changes via `df.add`/`df.merge`/`df.add_next`/`df.merge_next`
    /// (spec.md §4.5's "Function with no return"). Registers immediately;
    /// there is no `.into` to call since there is no single destination.
    pub fn for_each<F>(self, f: F)
    where
        F: Fn(&V1::Tuple, &Dataflow) + 'static,
    {
        self.dataflow.register_join(Box::new(Join1Action {
            source: self.source,
            f,
            name: self.name,
        }));
    }
}

/// A join over one source with a projection attached; needs `.into`/
/// `.into_async` to name a destination before it takes effect.
#[must_use = "a join has no effect until `.into` or `.into_async` is called"]
pub struct Join1MapStage<'d, V1: LatticeValue, F, Out> {
    dataflow: &'d Dataflow,
    source: RelationHandle<V1>,
    name: Option<String>,
    f: F,
    _marker: std::marker::PhantomData<fn() -> Out>,
}

impl<'d, V1, F, Out> Join1MapStage<'d, V1, F, Out>
where
    V1: LatticeValue,
{
    fn build(dataflow: &'d Dataflow, source: RelationHandle<V1>, name: Option<String>, f: F) -> Self {
        Self { dataflow, source, name, f, _marker: std::marker::PhantomData }
    }
}

impl<'d, V1, F, Out> Join1MapStage<'d, V1, F, Out>
where
    V1: LatticeValue,
    F: Fn(&V1::Tuple) -> Option<Out> + 'static,
    Out: Clone + std::fmt::Debug + PartialEq + 'static,
{
    /// Attach the destination; emissions are visible to later joins in the
    /// same tick (spec.md §4.4's `into`).
    pub fn into<Vout>(self, dest: &RelationHandle<Vout>)
    where
        Vout: LatticeValue<Tuple = Out>,
    {
        self.dataflow.register_join(Box::new(Join1Map {
            source: self.source,
            dest: dest.clone(),
            f: self.f,
            asynchronous: false,
            name: self.name,
        }));
    }

    /// Attach the destination; emissions are deferred to the next tick
    /// (spec.md §4.4's `into_async`).
    pub fn into_async<Vout>(self, dest: &RelationHandle<Vout>)
    where
        Vout: LatticeValue<Tuple = Out>,
    {
        self.dataflow.register_join(Box::new(Join1Map {
            source: self.source,
            dest: dest.clone(),
            f: self.f,
            asynchronous: true,
            name: self.name,
        }));
    }
}

/// A join over one source with a flattening projection attached.
#[must_use = "a join has no effect until `.into` or `.into_async` is called"]
pub struct Join1FlatStage<'d, V1: LatticeValue, F, VOut> {
    dataflow: &'d Dataflow,
    source: RelationHandle<V1>,
    name: Option<String>,
    f: F,
    _marker: std::marker::PhantomData<fn() -> VOut>,
}

impl<'d, V1, F, VOut> Join1FlatStage<'d, V1, F, VOut>
where
    V1: LatticeValue,
    F: Fn(&V1::Tuple) -> Option<VOut> + 'static,
    VOut: LatticeValue,
{
    /// Attach the destination, merged immediately.
    pub fn into(self, dest: &RelationHandle<VOut>) {
        self.dataflow.register_join(Box::new(Join1Flat {
            source: self.source,
            dest: dest.clone(),
            f: self.f,
            asynchronous: false,
            name: self.name,
        }));
    }

    /// Attach the destination, merged at the start of the next tick.
    pub fn into_async(self, dest: &RelationHandle<VOut>) {
        self.dataflow.register_join(Box::new(Join1Flat {
            source: self.source,
            dest: dest.clone(),
            f: self.f,
            asynchronous: true,
            name: self.name,
        }));
    }
}

struct Join1Map<V1: LatticeValue, Vout: LatticeValue, F> {
    source: RelationHandle<V1>,
    dest: RelationHandle<Vout>,
    f: F,
    asynchronous: bool,
    name: Option<String>,
}

impl<V1, Vout, F> ErasedJoin for Join1Map<V1, Vout, F>
where
    V1: LatticeValue,
    Vout: LatticeValue,
    F: Fn(&V1::Tuple) -> Option<Vout::Tuple>,
{
    fn evaluate(&self, df: &Dataflow) {
        let mut emitted = 0usize;
        for tuple in self.source.scan() {
            if let Some(out) = (self.f)(&tuple) {
                df.enqueue(
                    Box::new(AddChange { target: self.dest.clone(), tuple: out }),
                    self.asynchronous,
                );
                emitted += 1;
            }
        }
        tracing::trace!(join = self.name.as_deref().unwrap_or("<unnamed>"), emitted, "join1 evaluated");
    }
}

struct Join1Flat<V1: LatticeValue, Vout: LatticeValue, F> {
    source: RelationHandle<V1>,
    dest: RelationHandle<Vout>,
    f: F,
    asynchronous: bool,
    name: Option<String>,
}

impl<V1, Vout, F> ErasedJoin for Join1Flat<V1, Vout, F>
where
    V1: LatticeValue,
    Vout: LatticeValue,
    F: Fn(&V1::Tuple) -> Option<Vout>,
{
    fn evaluate(&self, df: &Dataflow) {
        let mut emitted = 0usize;
        for tuple in self.source.scan() {
            if let Some(value) = (self.f)(&tuple) {
                df.enqueue(
                    Box::new(MergeChange { target: self.dest.clone(), value }),
                    self.asynchronous,
                );
                emitted += 1;
            }
        }
        tracing::trace!(join = self.name.as_deref().unwrap_or("<unnamed>"), emitted, "join1_flat evaluated");
    }
}

struct Join1Action<V1: LatticeValue, F> {
    source: RelationHandle<V1>,
    f: F,
    name: Option<String>,
}

impl<V1, F> ErasedJoin for Join1Action<V1, F>
where
    V1: LatticeValue,
    F: Fn(&V1::Tuple, &Dataflow),
{
    fn evaluate(&self, df: &Dataflow) {
        for tuple in self.source.scan() {
            (self.f)(&tuple, df);
        }
        tracing::trace!(join = self.name.as_deref().unwrap_or("<unnamed>"), "join1_action evaluated");
    }
}

// ---------------------------------------------------------------------
// Arity 2
// ---------------------------------------------------------------------

/// Builder for a join over two source relations, scanned as a nested
/// cartesian product (spec.md §4.5). Built with `itertools::cartesian_product`
/// — matching `dfir_rs`'s own dependency on `itertools` for exactly this kind
/// of combinatorial iteration — instead of hand-rolled recursion (spec.md §9:
/// "implement as an explicit stack or an iterator product rather than deep
/// recursion to avoid stack blow-ups on wide joins").
#[must_use = "a join has no effect until `.map`/`.map_flat`/`.for_each` and a destination are attached"]
pub struct Join2Builder<'d, V1: LatticeValue, V2: LatticeValue> {
    dataflow: &'d Dataflow,
    source1: RelationHandle<V1>,
    source2: RelationHandle<V2>,
    name: Option<String>,
}

impl<'d, V1: LatticeValue, V2: LatticeValue> Join2Builder<'d, V1, V2> {
    pub(crate) fn new(
        dataflow: &'d Dataflow,
        source1: RelationHandle<V1>,
        source2: RelationHandle<V2>,
    ) -> Self {
        Self { dataflow, source1, source2, name: None }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Project each pair of bound tuples, one from each source, to
    /// `Option<Out>`.
    pub fn map<F, Out>(self, f: F) -> Join2MapStage<'d, V1, V2, F, Out>
    where
        F: Fn(&V1::Tuple, &V2::Tuple) -> Option<Out> + 'static,
        Out: Clone + std::fmt::Debug + PartialEq + 'static,
    {
        Join2MapStage {
            dataflow: self.dataflow,
            source1: self.source1,
            source2: self.source2,
            name: self.name,
            f,
            _marker: std::marker::PhantomData,
        }
    }

    /// Project each pair to a whole sub-lattice value to merge into the
    /// destination (spec.md §4.4's flatten-flag).
    pub fn map_flat<F, VOut>(self, f: F) -> Join2FlatStage<'d, V1, V2, F, VOut>
    where
        F: Fn(&V1::Tuple, &V2::Tuple) -> Option<VOut> + 'static,
        VOut: LatticeValue,
    {
        Join2FlatStage {
            dataflow: self.dataflow,
            source1: self.source1,
            source2: self.source2,
            name: self.name,
            f,
            _out: std::marker::PhantomData,
        }
    }

    /// A predicate/side-effecting action with no destination.
    pub fn for_each<F>(self, f: F)
    where
        F: Fn(&V1::Tuple, &V2::Tuple, &Dataflow) + 'static,
    {
        self.dataflow.register_join(Box::new(Join2Action {
            source1: self.source1,
            source2: self.source2,
            f,
            name: self.name,
        }));
    }
}

#[must_use = "a join has no effect until `.into` or `.into_async` is called"]
pub struct Join2MapStage<'d, V1: LatticeValue, V2: LatticeValue, F, Out> {
    dataflow: &'d Dataflow,
    source1: RelationHandle<V1>,
    source2: RelationHandle<V2>,
    name: Option<String>,
    f: F,
    _marker: std::marker::PhantomData<fn() -> Out>,
}

impl<'d, V1, V2, F, Out> Join2MapStage<'d, V1, V2, F, Out>
where
    V1: LatticeValue,
    V2: LatticeValue,
    F: Fn(&V1::Tuple, &V2::Tuple) -> Option<Out> + 'static,
    Out: Clone + std::fmt::Debug + PartialEq + 'static,
{
    /// Attach the destination; emissions are visible to later joins in the
    /// same tick.
    pub fn into<Vout>(self, dest: &RelationHandle<Vout>)
    where
        Vout: LatticeValue<Tuple = Out>,
    {
        self.dataflow.register_join(Box::new(Join2Map {
            source1: self.source1,
            source2: self.source2,
            dest: dest.clone(),
            f: self.f,
            asynchronous: false,
            name: self.name,
        }));
    }

    /// Attach the destination; emissions are deferred to the next tick.
    pub fn into_async<Vout>(self, dest: &RelationHandle<Vout>)
    where
        Vout: LatticeValue<Tuple = Out>,
    {
        self.dataflow.register_join(Box::new(Join2Map {
            source1: self.source1,
            source2: self.source2,
            dest: dest.clone(),
            f: self.f,
            asynchronous: true,
            name: self.name,
        }));
    }
}

#[must_use = "a join has no effect until `.into` or `.into_async` is called"]
pub struct Join2FlatStage<'d, V1: LatticeValue, V2: LatticeValue, F, VOut> {
    dataflow: &'d Dataflow,
    source1: RelationHandle<V1>,
    source2: RelationHandle<V2>,
    name: Option<String>,
    f: F,
    _out: std::marker::PhantomData<VOut>,
}

impl<'d, V1, V2, F, VOut> Join2FlatStage<'d, V1, V2, F, VOut>
where
    V1: LatticeValue,
    V2: LatticeValue,
    F: Fn(&V1::Tuple, &V2::Tuple) -> Option<VOut> + 'static,
    VOut: LatticeValue,
{
    /// Attach the destination, merged immediately.
    pub fn into(self, dest: &RelationHandle<VOut>) {
        self.dataflow.register_join(Box::new(Join2Flat {
            source1: self.source1,
            source2: self.source2,
            dest: dest.clone(),
            f: self.f,
            asynchronous: false,
            name: self.name,
        }));
    }

    /// Attach the destination, merged at the start of the next tick.
    pub fn into_async(self, dest: &RelationHandle<VOut>) {
        self.dataflow.register_join(Box::new(Join2Flat {
            source1: self.source1,
            source2: self.source2,
            dest: dest.clone(),
            f: self.f,
            asynchronous: true,
            name: self.name,
        }));
    }
}

struct Join2Map<V1: LatticeValue, V2: LatticeValue, Vout: LatticeValue, F> {
    source1: RelationHandle<V1>,
    source2: RelationHandle<V2>,
    dest: RelationHandle<Vout>,
    f: F,
    asynchronous: bool,
    name: Option<String>,
}

impl<V1, V2, Vout, F> ErasedJoin for Join2Map<V1, V2, Vout, F>
where
    V1: LatticeValue,
    V2: LatticeValue,
    Vout: LatticeValue,
    F: Fn(&V1::Tuple, &V2::Tuple) -> Option<Vout::Tuple>,
{
    fn evaluate(&self, df: &Dataflow) {
        let lhs = self.source1.scan();
        let rhs = self.source2.scan();
        let mut emitted = 0usize;
        for (t1, t2) in lhs.into_iter().cartesian_product(rhs) {
            if let Some(out) = (self.f)(&t1, &t2) {
                df.enqueue(
                    Box::new(AddChange { target: self.dest.clone(), tuple: out }),
                    self.asynchronous,
                );
                emitted += 1;
            }
        }
        tracing::trace!(join = self.name.as_deref().unwrap_or("<unnamed>"), emitted, "join2 evaluated");
    }
}

struct Join2Flat<V1: LatticeValue, V2: LatticeValue, Vout: LatticeValue, F> {
    source1: RelationHandle<V1>,
    source2: RelationHandle<V2>,
    dest: RelationHandle<Vout>,
    f: F,
    asynchronous: bool,
    name: Option<String>,
}

impl<V1, V2, Vout, F> ErasedJoin for Join2Flat<V1, V2, Vout, F>
where
    V1: LatticeValue,
    V2: LatticeValue,
    Vout: LatticeValue,
    F: Fn(&V1::Tuple, &V2::Tuple) -> Option<Vout>,
{
    fn evaluate(&self, df: &Dataflow) {
        let lhs = self.source1.scan();
        let rhs = self.source2.scan();
        let mut emitted = 0usize;
        for (t1, t2) in lhs.into_iter().cartesian_product(rhs) {
            if let Some(value) = (self.f)(&t1, &t2) {
                df.enqueue(
                    Box::new(MergeChange { target: self.dest.clone(), value }),
                    self.asynchronous,
                );
                emitted += 1;
            }
        }
        tracing::trace!(join = self.name.as_deref().unwrap_or("<unnamed>"), emitted, "join2_flat evaluated");
    }
}

struct Join2Action<V1: LatticeValue, V2: LatticeValue, F> {
    source1: RelationHandle<V1>,
    source2: RelationHandle<V2>,
    f: F,
    name: Option<String>,
}

impl<V1, V2, F> ErasedJoin for Join2Action<V1, V2, F>
where
    V1: LatticeValue,
    V2: LatticeValue,
    F: Fn(&V1::Tuple, &V2::Tuple, &Dataflow),
{
    fn evaluate(&self, df: &Dataflow) {
        let lhs = self.source1.scan();
        let rhs = self.source2.scan();
        for (t1, t2) in lhs.into_iter().cartesian_product(rhs) {
            (self.f)(&t1, &t2, df);
        }
        tracing::trace!(join = self.name.as_deref().unwrap_or("<unnamed>"), "join2_action evaluated");
    }
}
