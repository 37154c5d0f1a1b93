//! The elaborator: expression graph, type solver, evaluator, constraint
//! solver, and HIR solver for the dependently-typed core language, per
//! `spec.md` §3-§5.

pub mod builtins;
pub mod constraints;
pub mod diagnostics;
pub mod eval;
pub mod flags;
pub mod graph;
pub mod hir;
pub mod solver;
pub mod stringifier;
pub mod subst;
pub mod types;

pub use constraints::{Constraint, ConstraintSolver};
pub use diagnostics::ElabDiagnostic;
pub use eval::evaluate;
pub use flags::SymbolFlags;
pub use graph::{Builtins, Expr, Graph, Primitive, RewriteRule, SymbolId, UnknownId, VariableId};
pub use hir::{Hir, Register, RegisterId};
pub use solver::{elaborate, new_graph_with_builtins, Elaborated};
pub use stringifier::stringify;
