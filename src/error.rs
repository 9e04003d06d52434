//! Error types for the dataflow engine.
//!
//! spec.md §7 names three kinds: declaration errors (fatal at setup),
//! engine invariants (fatal at runtime), and idempotent no-ops (not errors,
//! see [`crate::lattice::Merge::merge`]'s `bool` return). The first two are
//! represented here as `thiserror` enums rather than panics or strings,
//! grounded on the pack's `ra-kete-materialize` sub-crates (the teacher's own
//! error handling is proc-macro diagnostic machinery, not applicable to a
//! plain runtime library — see DESIGN.md).

use thiserror::Error;

/// A setup-time error raised while declaring relations or joins.
///
/// Most of spec.md §7.1's kinds (function not in last position, arity/type
/// mismatch, output-type mismatch) are caught by the Rust type system at
/// compile time instead: join arity and projection signatures are generic
/// parameters of `Dataflow::join1`/`join2`, not runtime-inspected values. Only
/// the name-registry checks, which are necessarily string-keyed at runtime,
/// surface here.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DeclarationError {
    /// `declare_relation` (or a sugar helper) was called with a name already
    /// registered in this dataflow (spec.md §3 invariant 3).
    #[error("relation `{name}` is already declared in this dataflow")]
    DuplicateRelation {
        /// The name that was already taken.
        name: String,
    },

    /// `Dataflow::relation` was called with a name that was never declared.
    #[error("no relation named `{name}` is declared in this dataflow")]
    UnknownRelation {
        /// The name that was looked up.
        name: String,
    },

    /// `Dataflow::relation` was called with a type that does not match the
    /// tuple/lattice type the relation was declared with.
    #[error("relation `{name}` exists but was requested as a different tuple/lattice type")]
    RelationTypeMismatch {
        /// The name whose declared type didn't match.
        name: String,
    },
}

/// A fatal runtime engine-invariant violation (spec.md §7.2).
///
/// `AbsentTupleFromScan` has no constructor in this crate: `LatticeValue::scan`
/// returns owned `Tuple`s, never `Option<Tuple>`, so "a scan yielding an
/// absent tuple" is ruled out by the type system rather than checked at
/// runtime. The variant is kept for API completeness and to document the
/// resolution; see DESIGN.md.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum EngineError {
    /// A join's `scan` produced an absent tuple. Structurally unreachable in
    /// this implementation — see the type-note above.
    #[error("relation `{relation}`'s scan yielded an absent tuple")]
    AbsentTupleFromScan {
        /// The relation whose scan misbehaved.
        relation: String,
    },

    /// An operation was attempted on a relation kind that doesn't support it
    /// (e.g. `at` on a non-`MapUnion` relation reached through the tagged
    /// embedder-boundary registry).
    #[error("unsupported operation `{op}` on relation `{relation}`")]
    UnsupportedOperation {
        /// The relation the operation was attempted on.
        relation: String,
        /// The attempted operation's name.
        op: &'static str,
    },
}
