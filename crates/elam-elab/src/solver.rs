//! The HIR solver: resolves every register in [`Hir`] to an [`Expr`],
//! alternating with the constraint solver until neither can make further
//! progress, per `spec.md` §4.5.
//!
//! Each register resolves at most once (`resolved[i]` is write-once); a
//! register whose dependencies aren't resolved yet is simply skipped this
//! sweep (`Unchanged`) and retried on the next one. A small "hint" pass
//! runs before each resolve sweep so a `Call`'s argument register learns
//! its expected type (the callee's `FnType.inputType`) before it resolves
//! itself — this is how a bare numeric literal like the `2` in
//! `Level.max(0, 2)` learns it should become a `Level`, not a `number`.

use elam_common::limits::MAX_HIR_SOLVER_SWEEPS;
use tracing::debug;

use crate::builtins;
use crate::constraints::{Constraint, ConstraintSolver, PassResult};
use crate::diagnostics::ElabDiagnostic;
use crate::flags::SymbolFlags;
use crate::graph::{Expr, Graph, RewriteRule, SymbolId, UnknownId, VariableId};
use crate::hir::{Hir, Register, RegisterId};
use crate::types::type_of;

const MAX_COLOR_BRIDGE_DEPTH: usize = 16;

pub struct Elaborated {
    pub graph: Graph,
    pub diagnostics: Vec<ElabDiagnostic>,
    resolved: Vec<Option<Expr>>,
}

impl Elaborated {
    pub fn get(&self, id: RegisterId) -> Option<&Expr> {
        self.resolved[id.index()].as_ref()
    }
}

#[derive(Default)]
struct SolverState {
    resolved: Vec<Option<Expr>>,
    expected_type: Vec<Option<Expr>>,
    symbol_of: Vec<Option<SymbolId>>,
    variable_of: Vec<Option<VariableId>>,
    unknown_of: Vec<Option<UnknownId>>,
}

impl SolverState {
    fn new(len: usize) -> Self {
        Self {
            resolved: vec![None; len],
            expected_type: vec![None; len],
            symbol_of: vec![None; len],
            variable_of: vec![None; len],
            unknown_of: vec![None; len],
        }
    }
}

/// Elaborates every register in `hir`, returning the final `Graph` and any
/// diagnostics raised. `root` must already have been installed via
/// [`builtins::install`] on `graph`.
pub fn elaborate(mut graph: Graph, hir: &Hir) -> Elaborated {
    let mut solver = ConstraintSolver::new();
    let mut state = SolverState::new(hir.len());

    for sweep in 0..MAX_HIR_SOLVER_SWEEPS {
        propagate_hints(&mut graph, &mut solver, hir, &mut state);
        let hir_progressed = resolve_sweep(&mut graph, &mut solver, hir, &mut state);
        let constraint_progress = if solver.is_empty() { PassResult::Stalled } else { solver.run_pass(&mut graph) };

        let all_resolved = state.resolved.iter().all(Option::is_some);
        if all_resolved && solver.is_empty() {
            debug!(sweep, "elaboration reached a fixed point");
            break;
        }
        if !hir_progressed && constraint_progress == PassResult::Stalled {
            debug!(sweep, "elaboration stalled");
            break;
        }
    }

    let mut diagnostics = Vec::new();
    for constraint in solver.errors() {
        diagnostics.push(ElabDiagnostic::UnresolvedConstraint(constraint.clone()));
    }
    // Per spec.md §7, `UnresolvedConstraint` covers every constraint left
    // after the fixed point, not just the ones `step_equal` classified as a
    // rigid mismatch — a constraint the dispatch has no decomposition rule
    // for (e.g. a `Call` compared against a bare `Symbol`) sits in the
    // active queue forever without ever reaching `errored` on its own.
    for constraint in solver.active() {
        diagnostics.push(ElabDiagnostic::UnresolvedConstraint(constraint.clone()));
    }
    for id in hir.ids() {
        if state.resolved[id.index()].is_none() {
            diagnostics.push(ElabDiagnostic::Uninferred(id));
        }
    }

    Elaborated { graph, diagnostics, resolved: state.resolved }
}

/// Looks ahead at registers whose function/declared-type subparts are
/// already known and pushes an expected type onto a not-yet-resolved
/// dependency, so context-sensitive registers (bare numeric literals,
/// unannotated variables) can pick the right type when they resolve.
fn propagate_hints(graph: &mut Graph, solver: &mut ConstraintSolver, hir: &Hir, state: &mut SolverState) {
    for id in hir.ids() {
        match hir.get(id) {
            Register::Call { func, arg, .. } => {
                if state.expected_type[arg.index()].is_some() {
                    continue;
                }
                let Some(func_expr) = state.resolved[func.index()].clone() else { continue };
                let Some(func_ty) = type_of(graph, solver, &func_expr) else { continue };
                if let Expr::FnType { input_type, .. } = graph.follow(&func_ty) {
                    state.expected_type[arg.index()] = Some(*input_type);
                }
            }
            Register::SymbolAssign { symbol, value } => {
                if state.expected_type[value.index()].is_some() {
                    continue;
                }
                let Some(Expr::Symbol(sym)) = state.resolved[symbol.index()] else { continue };
                if let Some(ty) = graph.symbol(sym).r#type.clone() {
                    state.expected_type[value.index()] = Some(ty);
                }
            }
            _ => {}
        }
    }
}

fn resolve_sweep(graph: &mut Graph, solver: &mut ConstraintSolver, hir: &Hir, state: &mut SolverState) -> bool {
    let mut progressed = false;
    for id in hir.ids() {
        if state.resolved[id.index()].is_some() {
            continue;
        }
        if let Some(expr) = resolve_register(graph, solver, hir, state, id) {
            state.resolved[id.index()] = Some(expr);
            progressed = true;
        }
    }
    progressed
}

fn resolved_expr(state: &SolverState, id: RegisterId) -> Option<Expr> {
    state.resolved[id.index()].clone()
}

fn resolved_symbol(state: &SolverState, id: RegisterId) -> Option<SymbolId> {
    match &state.resolved[id.index()] {
        Some(Expr::Symbol(s)) => Some(*s),
        _ => None,
    }
}

fn resolve_register(
    graph: &mut Graph,
    solver: &mut ConstraintSolver,
    hir: &Hir,
    state: &mut SolverState,
    id: RegisterId,
) -> Option<Expr> {
    match hir.get(id).clone() {
        Register::Root => Some(Expr::Symbol(graph.builtins.root())),
        Register::Expr(expr) => Some(expr),
        Register::Number(value) => {
            let is_level = match &state.expected_type[id.index()] {
                Some(ty) => matches!(graph.follow(ty), Expr::Symbol(s) if s == graph.builtins.level()),
                None => false,
            };
            Some(Expr::Number { value, is_level })
        }
        Register::String(atom) => Some(Expr::String(atom)),
        Register::Symbol { name, parent, flags } => {
            if let Some(sym) = state.symbol_of[id.index()] {
                return Some(Expr::Symbol(sym));
            }
            let parent_id = match parent {
                Some(p) => Some(resolved_symbol(state, p)?),
                None => None,
            };
            let sym = graph.new_symbol(name, parent_id, flags, hir.span(id));
            // A fresh declaration starts out with a bare, untyped placeholder
            // for its type (not `Type(_)` — the symbol's *value* need not be
            // a type at all, e.g. a plain numeric constant). The eventual
            // `SymbolType`/`SymbolAssign` registers pin this Unknown down via
            // ordinary `Equal` resolution instead of a structural comparison
            // against a universe shape.
            let fresh_type = if flags.intersects(SymbolFlags::ALLOW_DEF_TYPE | SymbolFlags::ALLOW_ASSIGNMENT) {
                Expr::Unknown(graph.new_unknown(None, false))
            } else {
                Expr::Symbol(graph.builtins.untyped())
            };
            graph.set_symbol_type(sym, fresh_type);
            if let (Some(p), Some(n)) = (parent_id, name) {
                graph.register_sub_symbol(p, n, sym);
            }
            state.symbol_of[id.index()] = Some(sym);
            Some(Expr::Symbol(sym))
        }
        Register::Variable { name, r#type } => {
            if let Some(v) = state.variable_of[id.index()] {
                return Some(Expr::Variable(v));
            }
            let default_type = match r#type {
                Some(t) => resolved_expr(state, t)?,
                None => Expr::Unknown(graph.new_unknown(None, false)),
            };
            let v = graph.new_variable(name, default_type);
            state.variable_of[id.index()] = Some(v);
            Some(Expr::Variable(v))
        }
        Register::Unknown { r#type, is_pattern } => {
            if let Some(u) = state.unknown_of[id.index()] {
                return Some(Expr::Unknown(u));
            }
            let ty = match r#type {
                Some(t) => Some(resolved_expr(state, t)?),
                None => None,
            };
            let u = graph.new_unknown(ty, is_pattern);
            state.unknown_of[id.index()] = Some(u);
            Some(Expr::Unknown(u))
        }
        Register::Lambda { arg, arg_type, body, color } => {
            let arg_id = match arg {
                Some(a) => Some(match resolved_expr(state, a)? {
                    Expr::Variable(v) => v,
                    _ => return None,
                }),
                None => None,
            };
            let arg_type_expr = match arg_type {
                Some(t) => resolved_expr(state, t)?,
                None => match arg_id {
                    Some(v) => graph.variable(v).default_type.clone(),
                    None => Expr::Symbol(graph.builtins.untyped()),
                },
            };
            let body_expr = resolved_expr(state, body)?;
            Some(Expr::lambda(arg_id, arg_type_expr, body_expr, color))
        }
        Register::FnType { input_type, arg, output_type, color } => {
            let input_expr = resolved_expr(state, input_type)?;
            let arg_id = match arg {
                Some(a) => Some(match resolved_expr(state, a)? {
                    Expr::Variable(v) => v,
                    _ => return None,
                }),
                None => None,
            };
            let output_expr = resolved_expr(state, output_type)?;
            Some(Expr::fn_type(input_expr, arg_id, output_expr, color))
        }
        Register::Call { func, arg, color, .. } => {
            let func_expr = resolved_expr(state, func)?;
            let arg_expr = resolved_expr(state, arg)?;

            let mut current_func = func_expr;
            for _ in 0..MAX_COLOR_BRIDGE_DEPTH {
                let Some(func_ty) = type_of(graph, solver, &current_func) else { break };
                let Expr::FnType { color: declared_color, .. } = graph.follow(&func_ty) else { break };
                if declared_color == color {
                    break;
                }
                let erased = graph.new_unknown(None, false);
                current_func = Expr::call(current_func, Expr::Unknown(erased), declared_color);
            }

            if let Some(func_ty) = type_of(graph, solver, &current_func) {
                if let Expr::FnType { input_type, .. } = graph.follow(&func_ty) {
                    if let Some(arg_ty) = type_of(graph, solver, &arg_expr) {
                        solver.add_equal(arg_ty, *input_type);
                    }
                }
            }

            Some(Expr::call(current_func, arg_expr, color))
        }
        Register::MemberAccess { lhs, name } => {
            let lhs_expr = resolved_expr(state, lhs)?;
            match graph.follow(&lhs_expr) {
                Expr::Symbol(s) => match graph.symbol(s).sub_symbols.get(&name) {
                    Some(child) => Some(Expr::Symbol(*child)),
                    None => Some(Expr::Symbol(graph.builtins.error_type())),
                },
                _ => Some(Expr::Symbol(graph.builtins.error_type())),
            }
        }
        Register::SymbolType { symbol, r#type } => {
            let sym = resolved_symbol(state, symbol)?;
            let ty = resolved_expr(state, r#type)?;
            if graph.symbol(sym).flags.contains(SymbolFlags::ALLOW_DEF_TYPE) {
                match graph.symbol(sym).r#type.clone() {
                    Some(existing) => solver.add_equal(existing, ty.clone()),
                    None => graph.set_symbol_type(sym, ty.clone()),
                }
                let universe_check = graph.new_unknown(None, false);
                solver.add(Constraint::Typeof(universe_check, ty));
            }
            Some(Expr::Symbol(sym))
        }
        Register::SymbolAssign { symbol, value } => {
            let sym = resolved_symbol(state, symbol)?;
            let value_expr = resolved_expr(state, value)?;
            if graph.symbol(sym).flags.contains(SymbolFlags::ALLOW_ASSIGNMENT) && graph.symbol(sym).value.is_none() {
                graph.set_symbol_value(sym, value_expr.clone());
                if let Some(declared_ty) = graph.symbol(sym).r#type.clone() {
                    if let Some(value_ty) = type_of(graph, solver, &value_expr) {
                        solver.add_equal(declared_ty, value_ty);
                    }
                }
            }
            Some(Expr::Symbol(sym))
        }
        Register::SymbolRule { symbol, lhs, rhs, is_up_value } => {
            let sym = resolved_symbol(state, symbol)?;
            let lhs_expr = resolved_expr(state, lhs)?;
            let rhs_expr = resolved_expr(state, rhs)?;
            alias_pattern_unknowns(graph, &lhs_expr, &rhs_expr);
            let allowed = if is_up_value {
                graph.symbol(sym).flags.contains(SymbolFlags::ALLOW_UP_VALUE)
            } else {
                graph.symbol(sym).flags.contains(SymbolFlags::ALLOW_DOWN_VALUE)
            };
            if allowed {
                let rule = RewriteRule { lhs: lhs_expr, rhs: rhs_expr };
                if is_up_value {
                    graph.symbol_mut(sym).up_values.push(rule);
                } else {
                    graph.symbol_mut(sym).down_values.push(rule);
                }
            }
            Some(Expr::Symbol(sym))
        }
    }
}

/// Converts every still-unresolved pattern `Unknown` reachable from `lhs`
/// or `rhs` into a fresh `Variable`, by aliasing `Unknown.value` — the
/// resolution chosen for the spec's open question on pattern-Unknown
/// handling. Downstream `sameQ`/`matchPattern`/`replace_scope_variables`
/// all call `Graph::follow` first, so this substitution is transparent:
/// the rule's `lhs`/`rhs` trees are never rewritten, only the arena
/// entries they point through.
fn alias_pattern_unknowns(graph: &mut Graph, lhs: &Expr, rhs: &Expr) {
    let mut seen = Vec::new();
    collect_pattern_unknowns(graph, lhs, &mut seen);
    collect_pattern_unknowns(graph, rhs, &mut seen);
    for u in seen {
        if graph.unknown(u).value.is_none() {
            let fresh = graph.new_variable(None, Expr::Symbol(graph.builtins.untyped()));
            graph.unknown_mut(u).value = Some(Expr::Variable(fresh));
        }
    }
}

fn collect_pattern_unknowns(graph: &Graph, expr: &Expr, seen: &mut Vec<UnknownId>) {
    match expr {
        Expr::Unknown(u) => {
            if graph.unknown(*u).is_pattern && !seen.contains(u) {
                seen.push(*u);
            }
        }
        Expr::Call { func, arg, .. } => {
            collect_pattern_unknowns(graph, func, seen);
            collect_pattern_unknowns(graph, arg, seen);
        }
        Expr::FnType { input_type, output_type, .. } => {
            collect_pattern_unknowns(graph, input_type, seen);
            collect_pattern_unknowns(graph, output_type, seen);
        }
        Expr::Lambda { arg_type, body, .. } => {
            collect_pattern_unknowns(graph, arg_type, seen);
            collect_pattern_unknowns(graph, body, seen);
        }
        Expr::Symbol(_) | Expr::Variable(_) | Expr::Number { .. } | Expr::String(_) => {}
    }
}

/// Builds a fresh `Graph` with the built-in tree installed, for callers
/// that don't already have one (the CLI driver).
pub fn new_graph_with_builtins(interner: &mut elam_common::Interner) -> Graph {
    let mut graph = Graph::new();
    builtins::install(&mut graph, interner);
    graph
}
