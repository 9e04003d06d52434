//! A small declarative dataflow runtime for distributed protocols: relations
//! hold bounded join-semilattice values, joins are evaluated once per tick in
//! declaration order, and changes are either immediate (visible within the
//! same tick) or deferred (visible at the start of the next). See
//! `DESIGN.md` for how each piece is grounded.
//!
//! ```
//! use latticeflow::Dataflow;
//!
//! let df = Dataflow::new_instance("node-a");
//! let names = df.declare_lset::<String>("names", false).unwrap();
//! let echoed = df.declare_lset::<String>("echoed", false).unwrap();
//! df.join1(&names).forward().into(&echoed);
//!
//! df.add_next(&names, "alice".to_string());
//! df.tick();
//! assert!(echoed.scan().contains(&"alice".to_string()));
//! ```

mod change;
pub mod error;
pub mod join;
pub mod lattice;
pub mod relation;

mod graph;

pub use error::{DeclarationError, EngineError};
pub use graph::{Dataflow, RelationSummary};
pub use lattice::{BoolOr, LatticeValue, MapEntry, MapUnion, MaxInt, MaxStr, Merge, SetUnion};
pub use relation::{Relation, RelationHandle};
