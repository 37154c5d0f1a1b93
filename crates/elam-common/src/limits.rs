//! Centralized limits for the elaborator's iterative algorithms.
//!
//! `spec.md` requires every algorithm that would naturally recurse through
//! the host call stack to instead use an explicit work queue/stack, so that
//! a 10,000-deep right-nested call expression elaborates without blowing the
//! stack. Explicit queues still need a termination backstop against a
//! solver bug that never converges; these constants are that backstop, not
//! a feature.

/// Maximum number of HIR solver sweeps (`iterate()` calls) before giving up
/// and reporting whatever registers are still unresolved as diagnostics.
///
/// Each sweep resolves at least one register or the loop exits early (no
/// register changed state), so in practice this is only hit by a genuine
/// solver bug; it exists so such a bug manifests as a diagnostic instead of
/// a hang.
pub const MAX_HIR_SOLVER_SWEEPS: usize = 100_000;

/// Maximum number of constraint solver fixed-point iterations per HIR
/// solver sweep.
pub const MAX_CONSTRAINT_SOLVER_ITERATIONS: usize = 10_000;

/// Maximum depth of the evaluator's explicit reduction stack.
///
/// Bounds runaway non-terminating rewrite rules (e.g. a user-declared
/// downValue whose right-hand side re-triggers itself) without relying on
/// host stack depth.
pub const MAX_EVAL_STACK_DEPTH: usize = 100_000;

/// Maximum depth the stringifier will descend before truncating with `...`.
///
/// Only affects diagnostic/trace rendering; never affects elaboration
/// results.
pub const MAX_STRINGIFY_DEPTH: u32 = 256;
