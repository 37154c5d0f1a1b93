//! The constraint solver: `Equal`, `EqualWithReplace`, `FnTypeType`, and
//! `Typeof` constraints, run to a fixed point alongside the HIR solver.
//!
//! `setUnknown` (see [`ConstraintSolver::set_unknown`]) is the single write
//! point for `Unknown.value`, guarded by an occurs check, so every other
//! piece of code that wants to resolve an Unknown must route through here.

use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::graph::{Expr, Graph, UnknownId, VariableId};
use crate::subst::{replace_scope_variables, same_q, Replacements};
use crate::types::type_of;

#[derive(Clone, Debug)]
pub enum Constraint {
    Equal(Expr, Expr),
    EqualWithReplace { target: UnknownId, source: UnknownId, replaces: FxHashMap<VariableId, Expr> },
    FnTypeType(UnknownId, Expr, Expr),
    Typeof(UnknownId, Expr),
}

/// An elaboration diagnostic raised when the solver cannot make further
/// progress. Carries the offending constraint or Unknown so the caller can
/// render it (see `elam-elab::diagnostics`).
#[derive(Clone, Debug)]
pub enum SolverError {
    Unresolved(Constraint),
}

/// Runs constraints to a fixed point. Never shares state with the HIR
/// solver's register array beyond the `Graph` both mutate; it is driven by
/// alternating calls to [`ConstraintSolver::run_pass`] from the HIR solver.
#[derive(Default)]
pub struct ConstraintSolver {
    active: Vec<Constraint>,
    errored: Vec<Constraint>,
}

/// Whether a solver pass over the active constraint queue made progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassResult {
    Progressed,
    Stalled,
}

impl ConstraintSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, constraint: Constraint) {
        trace!(?constraint, "constraint queued");
        self.active.push(constraint);
    }

    pub fn add_equal(&mut self, a: Expr, b: Expr) {
        self.add(Constraint::Equal(a, b));
    }

    pub fn errors(&self) -> &[Constraint] {
        &self.errored
    }

    /// Constraints still queued but not yet decided. Non-empty only once
    /// the outer HIR solver has stalled (see `elaborate`'s fixed-point
    /// loop) — a constraint can sit here indefinitely if `step_equal`'s
    /// dispatch has no rule to decompose or error it (e.g. a `Call` being
    /// compared against a bare `Symbol`), so the caller must promote these
    /// to diagnostics itself rather than assume `errors()` is exhaustive.
    pub fn active(&self) -> &[Constraint] {
        &self.active
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Runs one pass over the currently active queue: each constraint is
    /// attempted once, re-queued if it couldn't yet be decided, or moved to
    /// `errored` if it's a genuine rigid mismatch. Returns `Progressed` iff
    /// at least one Unknown was written or one constraint was permanently
    /// retired (decomposed or errored) this pass, matching the termination
    /// argument in `spec.md` §4.4: each pass is monotone in
    /// Unknowns-written + constraints-decomposed, so stalling means we've
    /// hit a true fixed point.
    pub fn run_pass(&mut self, graph: &mut Graph) -> PassResult {
        let queue = std::mem::take(&mut self.active);
        let mut progressed = false;
        let mut next = Vec::with_capacity(queue.len());
        for constraint in queue {
            match self.step(graph, constraint, &mut next) {
                StepOutcome::Progressed => progressed = true,
                StepOutcome::Requeued => {}
            }
        }
        self.active = next;
        if progressed { PassResult::Progressed } else { PassResult::Stalled }
    }

    fn step(&mut self, graph: &mut Graph, constraint: Constraint, next: &mut Vec<Constraint>) -> StepOutcome {
        match constraint {
            Constraint::Equal(a, b) => self.step_equal(graph, a, b, next),
            Constraint::EqualWithReplace { target, source, replaces } => {
                self.step_equal_with_replace(graph, target, source, replaces, next)
            }
            Constraint::FnTypeType(target, input_type, output_type) => {
                self.step_fn_type_type(graph, target, input_type, output_type, next)
            }
            Constraint::Typeof(target, source) => self.step_typeof(graph, target, source, next),
        }
    }

    fn step_typeof(&mut self, graph: &mut Graph, target: UnknownId, source: Expr, next: &mut Vec<Constraint>) -> StepOutcome {
        match type_of(graph, self, &source) {
            Some(ty) => {
                self.set_unknown(graph, target, ty);
                StepOutcome::Progressed
            }
            None => {
                next.push(Constraint::Typeof(target, source));
                StepOutcome::Requeued
            }
        }
    }

    fn step_fn_type_type(
        &mut self,
        graph: &mut Graph,
        target: UnknownId,
        input_type: Expr,
        output_type: Expr,
        next: &mut Vec<Constraint>,
    ) -> StepOutcome {
        let Some(input_level) = type_of(graph, self, &input_type) else {
            next.push(Constraint::FnTypeType(target, input_type, output_type));
            return StepOutcome::Requeued;
        };
        let Some(output_level) = type_of(graph, self, &output_type) else {
            next.push(Constraint::FnTypeType(target, input_type, output_type));
            return StepOutcome::Requeued;
        };
        let level = max_universe(&input_level, &output_level);
        self.set_unknown(graph, target, level);
        StepOutcome::Progressed
    }

    fn step_equal_with_replace(
        &mut self,
        graph: &mut Graph,
        target: UnknownId,
        source: UnknownId,
        replaces: Replacements,
        next: &mut Vec<Constraint>,
    ) -> StepOutcome {
        match graph.unknown(source).value.clone() {
            Some(value) => {
                match replace_scope_variables(graph, Some(self), &value, &replaces) {
                    Some(replaced) => {
                        self.add_equal(Expr::Unknown(target), replaced);
                        StepOutcome::Progressed
                    }
                    None => {
                        next.push(Constraint::EqualWithReplace { target, source, replaces });
                        StepOutcome::Requeued
                    }
                }
            }
            None => {
                next.push(Constraint::EqualWithReplace { target, source, replaces });
                StepOutcome::Requeued
            }
        }
    }

    fn step_equal(&mut self, graph: &mut Graph, a: Expr, b: Expr, next: &mut Vec<Constraint>) -> StepOutcome {
        let a = graph.follow(&a);
        let b = graph.follow(&b);

        // 1+2: orient so an unset Unknown is on the left; if both sides are
        // unset Unknowns, prefer the non-pattern one as the write target so
        // pattern metavariables resolve toward concrete structure.
        let (a, b) = match (&a, &b) {
            (Expr::Unknown(ua), Expr::Unknown(ub)) => {
                if graph.unknown(*ua).is_pattern && !graph.unknown(*ub).is_pattern {
                    (b, a)
                } else {
                    (a, b)
                }
            }
            (Expr::Unknown(_), _) => (a, b),
            (_, Expr::Unknown(_)) => (b, a),
            _ => (a, b),
        };

        if let Expr::Unknown(target) = a {
            if occurs(graph, target, &b) {
                next.push(Constraint::Equal(Expr::Unknown(target), b));
                return StepOutcome::Requeued;
            }
            self.set_unknown(graph, target, b);
            return StepOutcome::Progressed;
        }

        match (&a, &b) {
            (Expr::Number { value: v1, is_level: l1 }, Expr::Number { value: v2, is_level: l2 }) => {
                if v1 == v2 && l1 == l2 {
                    StepOutcome::Progressed
                } else {
                    self.errored.push(Constraint::Equal(a, b));
                    StepOutcome::Progressed
                }
            }
            (Expr::String(s1), Expr::String(s2)) => {
                if s1 == s2 {
                    StepOutcome::Progressed
                } else {
                    self.errored.push(Constraint::Equal(a, b));
                    StepOutcome::Progressed
                }
            }
            (Expr::Symbol(sa), Expr::Symbol(sb)) => {
                if sa == sb {
                    StepOutcome::Progressed
                } else {
                    self.errored.push(Constraint::Equal(a, b));
                    StepOutcome::Progressed
                }
            }
            (
                Expr::Call { func: fa, arg: aa, color: ca },
                Expr::Call { func: fb, arg: ab, color: cb },
            ) => {
                let rigid_symbol = matches!(graph.follow(fa), Expr::Symbol(_));
                let rigid_variable = matches!(graph.follow(fa), Expr::Variable(_));
                if ca != cb || !(rigid_symbol || rigid_variable) || !same_q(graph, fa, fb) {
                    if same_q(graph, &a, &b) {
                        return StepOutcome::Progressed;
                    }
                    next.push(Constraint::Equal(a, b));
                    return StepOutcome::Requeued;
                }
                self.add_equal(*fa.clone(), *fb.clone());
                self.add_equal(*aa.clone(), *ab.clone());
                StepOutcome::Progressed
            }
            (Expr::Lambda { .. }, _) if !matches!(b, Expr::Lambda { .. }) => {
                let expanded = eta_expand(graph, &a, &b);
                self.add_equal(a, expanded);
                StepOutcome::Progressed
            }
            (_, Expr::Lambda { .. }) if !matches!(a, Expr::Lambda { .. }) => {
                let expanded = eta_expand(graph, &b, &a);
                self.add_equal(expanded, b);
                StepOutcome::Progressed
            }
            (
                Expr::FnType { input_type: ia, arg: aarg, output_type: oa, color: cola },
                Expr::FnType { input_type: ib, arg: barg, output_type: ob, color: colb },
            ) => {
                if cola != colb {
                    self.errored.push(Constraint::Equal(a, b));
                    return StepOutcome::Progressed;
                }
                self.add_equal(*ia.clone(), *ib.clone());
                match (aarg, barg) {
                    (Some(va), Some(vb)) => {
                        let shared = *va;
                        let mut reps = Replacements::default();
                        reps.insert(*vb, Expr::Variable(shared));
                        match replace_scope_variables(graph, Some(self), ob, &reps) {
                            Some(ob_renamed) => {
                                self.add_equal(*oa.clone(), ob_renamed);
                                StepOutcome::Progressed
                            }
                            None => {
                                next.push(Constraint::Equal(a.clone(), b.clone()));
                                StepOutcome::Requeued
                            }
                        }
                    }
                    (None, None) => {
                        self.add_equal(*oa.clone(), *ob.clone());
                        StepOutcome::Progressed
                    }
                    _ => {
                        self.errored.push(Constraint::Equal(a, b));
                        StepOutcome::Progressed
                    }
                }
            }
            (
                Expr::Lambda { arg: aarg, arg_type: ata, body: ba, color: cola },
                Expr::Lambda { arg: barg, arg_type: atb, body: bb, color: colb },
            ) => {
                if cola != colb {
                    self.errored.push(Constraint::Equal(a, b));
                    return StepOutcome::Progressed;
                }
                self.add_equal(*ata.clone(), *atb.clone());
                match (aarg, barg) {
                    (Some(va), Some(vb)) => {
                        let shared = *va;
                        let mut reps = Replacements::default();
                        reps.insert(*vb, Expr::Variable(shared));
                        match replace_scope_variables(graph, Some(self), bb, &reps) {
                            Some(bb_renamed) => {
                                self.add_equal(*ba.clone(), bb_renamed);
                                StepOutcome::Progressed
                            }
                            None => {
                                next.push(Constraint::Equal(a.clone(), b.clone()));
                                StepOutcome::Requeued
                            }
                        }
                    }
                    (None, None) => {
                        self.add_equal(*ba.clone(), *bb.clone());
                        StepOutcome::Progressed
                    }
                    _ => {
                        self.errored.push(Constraint::Equal(a, b));
                        StepOutcome::Progressed
                    }
                }
            }
            _ => {
                if same_q(graph, &a, &b) {
                    StepOutcome::Progressed
                } else {
                    next.push(Constraint::Equal(a, b));
                    StepOutcome::Requeued
                }
            }
        }
    }

    /// The single write point for `Unknown.value`. Runs the occurs check
    /// (callers that need one have already run it; this is a defensive
    /// second check matching the spec's "occurs-check before every write"
    /// design note), installs the value, and posts
    /// `Equal(target.type, typeof(value))` so the type gets reconciled on a
    /// later pass.
    fn set_unknown(&mut self, graph: &mut Graph, target: UnknownId, value: Expr) {
        debug_assert!(!occurs(graph, target, &value), "occurs check violated at write site");
        debug!(target = target.index(), "resolving Unknown");
        let existing_type = graph.unknown(target).r#type.clone();
        graph.unknown_mut(target).value = Some(value.clone());
        if let Some(ty) = existing_type {
            if let Some(value_type) = type_of(graph, self, &value) {
                self.add_equal(ty, value_type);
            }
        }
    }
}

enum StepOutcome {
    Progressed,
    Requeued,
}

/// `makeLambda(other)`: η-expands `other` into `Lambda(v, Call(other, v))`
/// using a fresh variable shaped after `lambda_side`'s own binder, so an
/// `Equal(Lambda, non-Lambda)` constraint can decompose as Lambda/Lambda.
fn eta_expand(graph: &mut Graph, lambda_side: &Expr, other: &Expr) -> Expr {
    let Expr::Lambda { arg_type, color, .. } = lambda_side else {
        unreachable!("eta_expand called with a non-Lambda lambda_side")
    };
    let default_type = (**arg_type).clone();
    let fresh = graph.new_variable(None, default_type.clone());
    let call = Expr::call(other.clone(), Expr::Variable(fresh), *color);
    Expr::lambda(Some(fresh), default_type, call, *color)
}

fn occurs(graph: &Graph, target: UnknownId, expr: &Expr) -> bool {
    match graph.follow(expr) {
        Expr::Unknown(u) => u == target,
        Expr::Symbol(_) | Expr::Variable(_) | Expr::Number { .. } | Expr::String(_) => false,
        Expr::Call { func, arg, .. } => occurs(graph, target, &func) || occurs(graph, target, &arg),
        Expr::FnType { input_type, output_type, .. } => {
            occurs(graph, target, &input_type) || occurs(graph, target, &output_type)
        }
        Expr::Lambda { arg_type, body, .. } => occurs(graph, target, &arg_type) || occurs(graph, target, &body),
    }
}

fn max_universe(a: &Expr, b: &Expr) -> Expr {
    match (a, b) {
        (Expr::Number { value: va, is_level: true }, Expr::Number { value: vb, is_level: true }) => {
            Expr::level(*va.max(vb))
        }
        _ => a.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elam_common::Span;

    #[test]
    fn equal_constraint_resolves_an_unknown() {
        let mut graph = Graph::new();
        let u = graph.new_unknown(None, false);
        let mut solver = ConstraintSolver::new();
        solver.add_equal(Expr::Unknown(u), Expr::number(7));
        solver.run_pass(&mut graph);
        assert!(graph.unknown(u).value.is_some());
        let Expr::Number { value, .. } = graph.follow(&Expr::Unknown(u)) else {
            panic!("expected a resolved number");
        };
        assert_eq!(value, 7);
    }

    #[test]
    fn mismatched_rigid_numbers_error_out() {
        let mut graph = Graph::new();
        let mut solver = ConstraintSolver::new();
        solver.add_equal(Expr::number(1), Expr::number(2));
        solver.run_pass(&mut graph);
        assert_eq!(solver.errors().len(), 1);
    }

    #[test]
    fn distinct_rigid_symbols_error_out() {
        use crate::flags::SymbolFlags;
        let mut graph = Graph::new();
        let v = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        let w = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        let mut solver = ConstraintSolver::new();
        solver.add_equal(Expr::Symbol(v), Expr::Symbol(w));
        solver.run_pass(&mut graph);
        assert_eq!(solver.errors().len(), 1);
    }

    /// A shape `step_equal` has no decomposition rule for (a `Call` against
    /// a bare rigid `Symbol`) never reaches `errored` on its own — it stays
    /// in `active()` forever. `elaborate()` is responsible for promoting
    /// these to diagnostics once the outer fixed point stalls.
    #[test]
    fn wildcard_mismatch_stays_active_and_never_errors() {
        use crate::flags::SymbolFlags;
        let mut graph = Graph::new();
        let f = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        let g = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        let mut solver = ConstraintSolver::new();
        let call = Expr::call(Expr::Symbol(f), Expr::number(0), 0);
        solver.add_equal(call, Expr::Symbol(g));
        for _ in 0..4 {
            solver.run_pass(&mut graph);
        }
        assert!(solver.errors().is_empty());
        assert_eq!(solver.active().len(), 1);
    }

    #[test]
    fn call_constraints_decompose_on_a_rigid_symbol_head() {
        use crate::flags::SymbolFlags;
        let mut graph = Graph::new();
        let head = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        let u = graph.new_unknown(None, false);
        let mut solver = ConstraintSolver::new();
        let lhs = Expr::call(Expr::Symbol(head), Expr::Unknown(u), 0);
        let rhs = Expr::call(Expr::Symbol(head), Expr::number(4), 0);
        solver.add_equal(lhs, rhs);
        for _ in 0..4 {
            solver.run_pass(&mut graph);
        }
        let Expr::Number { value, .. } = graph.follow(&Expr::Unknown(u)) else {
            panic!("expected the call argument to resolve");
        };
        assert_eq!(value, 4);
    }
}
