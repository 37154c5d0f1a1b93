//! Expression utilities: capture-avoiding substitution, structural
//! equality modulo α-renaming and Unknown-value-chasing, rewrite-rule
//! pattern matching, and the η-reduction predicate.

use rustc_hash::FxHashMap;

use crate::constraints::{Constraint, ConstraintSolver};
use crate::graph::{Expr, Graph, VariableId};

pub type Replacements = FxHashMap<VariableId, Expr>;

/// Replaces every free occurrence of each `Variable` key in `reps` with its
/// replacement. Capture-avoiding: descending under a binder drops any key
/// it shadows, and marks that binder's variable into the `excludedVariables`
/// of every Unknown appearing in the surviving replacements, so a later
/// resolution of that Unknown cannot introduce a capture.
///
/// Returns `None` only when an Unknown blocks the substitution (its
/// `excludedVariables` already contains a key we'd need to substitute) and
/// no `solver` was supplied to defer the work via an `EqualWithReplace`
/// constraint — the spec's "cannot rename" case, used during equality
/// testing where no solver is available.
pub fn replace_scope_variables(
    graph: &mut Graph,
    mut solver: Option<&mut ConstraintSolver>,
    expr: &Expr,
    reps: &Replacements,
) -> Option<Expr> {
    if reps.is_empty() {
        return Some(expr.clone());
    }
    replace_rec(graph, &mut solver, expr, reps)
}

fn replace_rec(
    graph: &mut Graph,
    solver: &mut Option<&mut ConstraintSolver>,
    expr: &Expr,
    reps: &Replacements,
) -> Option<Expr> {
    match expr {
        Expr::Variable(v) => Some(reps.get(v).cloned().unwrap_or_else(|| expr.clone())),
        Expr::Symbol(_) | Expr::Number { .. } | Expr::String(_) => Some(expr.clone()),
        Expr::Unknown(u) => match graph.follow(expr) {
            Expr::Unknown(_) => {
                let blocked = reps.keys().any(|v| graph.excludes(*u, *v));
                if !blocked {
                    return Some(expr.clone());
                }
                match solver {
                    Some(solver) => {
                        let target = graph.new_unknown(None, false);
                        solver.add(Constraint::EqualWithReplace {
                            target,
                            source: *u,
                            replaces: reps.clone(),
                        });
                        Some(Expr::Unknown(target))
                    }
                    None => None,
                }
            }
            // An Unknown aliased to a value (notably a pattern Unknown
            // aliased to a Variable by `alias_pattern_unknowns`) substitutes
            // through whatever it was followed to, same as any other expr.
            followed => replace_rec(graph, solver, &followed, reps),
        },
        Expr::Call { func, arg, color } => {
            let func = replace_rec(graph, solver, func, reps)?;
            let arg = replace_rec(graph, solver, arg, reps)?;
            Some(Expr::call(func, arg, *color))
        }
        Expr::FnType { input_type, arg, output_type, color } => {
            let input_type = replace_rec(graph, solver, input_type, reps)?;
            let inner_reps = shrink_and_mark(graph, reps, *arg);
            let output_type = replace_rec(graph, solver, output_type, &inner_reps)?;
            Some(Expr::fn_type(input_type, *arg, output_type, *color))
        }
        Expr::Lambda { arg, arg_type, body, color } => {
            let arg_type = replace_rec(graph, solver, arg_type, reps)?;
            let inner_reps = shrink_and_mark(graph, reps, *arg);
            let body = replace_rec(graph, solver, body, &inner_reps)?;
            Some(Expr::lambda(*arg, arg_type, body, *color))
        }
    }
}

/// Drops `binder` from `reps` for the recursive call under that binder,
/// and marks `binder` into the `excludedVariables` of every Unknown
/// appearing in the surviving replacement expressions.
fn shrink_and_mark(graph: &mut Graph, reps: &Replacements, binder: Option<VariableId>) -> Replacements {
    let Some(binder) = binder else { return reps.clone() };
    let mut inner = reps.clone();
    inner.remove(&binder);
    for replacement in inner.values() {
        mark_excluded(graph, replacement, binder);
    }
    inner
}

fn mark_excluded(graph: &mut Graph, expr: &Expr, var: VariableId) {
    match expr {
        Expr::Unknown(u) => graph.exclude_variable(*u, var),
        Expr::Call { func, arg, .. } => {
            mark_excluded(graph, func, var);
            mark_excluded(graph, arg, var);
        }
        Expr::FnType { input_type, output_type, .. } => {
            mark_excluded(graph, input_type, var);
            mark_excluded(graph, output_type, var);
        }
        Expr::Lambda { arg_type, body, .. } => {
            mark_excluded(graph, arg_type, var);
            mark_excluded(graph, body, var);
        }
        Expr::Symbol(_) | Expr::Variable(_) | Expr::Number { .. } | Expr::String(_) => {}
    }
}

/// Structural equality modulo α-renaming of binders. Follows `Unknown`
/// value chains before comparing; two still-unresolved Unknowns are equal
/// only if they are the same node.
pub fn same_q(graph: &Graph, a: &Expr, b: &Expr) -> bool {
    same_q_rec(graph, a, b, &mut Vec::new())
}

fn same_q_rec(graph: &Graph, a: &Expr, b: &Expr, alpha: &mut Vec<(VariableId, VariableId)>) -> bool {
    let a = graph.follow(a);
    let b = graph.follow(b);
    match (a, b) {
        (Expr::Symbol(x), Expr::Symbol(y)) => x == y,
        (Expr::Unknown(x), Expr::Unknown(y)) => x == y,
        (Expr::Variable(x), Expr::Variable(y)) => match alpha.iter().rev().find(|(ax, _)| *ax == x) {
            Some((_, mapped)) => *mapped == y,
            None => x == y,
        },
        (Expr::Number { value: v1, is_level: l1 }, Expr::Number { value: v2, is_level: l2 }) => {
            v1 == v2 && l1 == l2
        }
        (Expr::String(s1), Expr::String(s2)) => s1 == s2,
        (
            Expr::Call { func: f1, arg: a1, color: c1 },
            Expr::Call { func: f2, arg: a2, color: c2 },
        ) => c1 == c2 && same_q_rec(graph, &f1, &f2, alpha) && same_q_rec(graph, &a1, &a2, alpha),
        (
            Expr::FnType { input_type: i1, arg: arg1, output_type: o1, color: c1 },
            Expr::FnType { input_type: i2, arg: arg2, output_type: o2, color: c2 },
        ) => {
            c1 == c2
                && same_q_rec(graph, &i1, &i2, alpha)
                && same_q_binder(graph, arg1, &o1, arg2, &o2, alpha)
        }
        (
            Expr::Lambda { arg: arg1, arg_type: at1, body: b1, color: c1 },
            Expr::Lambda { arg: arg2, arg_type: at2, body: b2, color: c2 },
        ) => {
            c1 == c2
                && same_q_rec(graph, &at1, &at2, alpha)
                && same_q_binder(graph, arg1, &b1, arg2, &b2, alpha)
        }
        _ => false,
    }
}

fn same_q_binder(
    graph: &Graph,
    arg1: Option<VariableId>,
    body1: &Expr,
    arg2: Option<VariableId>,
    body2: &Expr,
    alpha: &mut Vec<(VariableId, VariableId)>,
) -> bool {
    match (arg1, arg2) {
        (Some(v1), Some(v2)) => {
            alpha.push((v1, v2));
            let result = same_q_rec(graph, body1, body2, alpha);
            alpha.pop();
            result
        }
        (None, None) => same_q_rec(graph, body1, body2, alpha),
        _ => false,
    }
}

/// Matches `pattern` against `expr`, yielding the variable bindings that
/// make them `sameQ`, or `None` if they don't match. An `Unknown` anywhere
/// in `pattern` aborts the match (a rule LHS containing an unresolved
/// metavariable can never be installed — see `SymbolRule` in the HIR
/// solver, which converts pattern Unknowns to Variables before this is
/// called).
pub fn match_pattern(graph: &Graph, pattern: &Expr, expr: &Expr) -> Option<Replacements> {
    let mut bindings = Replacements::default();
    if match_rec(graph, pattern, expr, &mut bindings) { Some(bindings) } else { None }
}

fn match_rec(graph: &Graph, pattern: &Expr, expr: &Expr, bindings: &mut Replacements) -> bool {
    // Chase the pattern's own Unknown chain first: a pattern `Unknown`
    // bound by a rule's `?x` is aliased to a `Variable` by
    // `alias_pattern_unknowns` once the rule is installed, and that alias
    // lives in the arena, not in the `lhs`/`rhs` trees themselves.
    match graph.follow(pattern) {
        Expr::Variable(v) => match bindings.get(&v) {
            Some(existing) => same_q(graph, existing, expr),
            None => {
                bindings.insert(v, expr.clone());
                true
            }
        },
        Expr::Unknown(_) => false,
        Expr::Symbol(s) => matches!(graph.follow(expr), Expr::Symbol(s2) if s2 == s),
        Expr::Number { value, is_level } => {
            matches!(graph.follow(expr), Expr::Number { value: v2, is_level: l2 } if v2 == value && l2 == is_level)
        }
        Expr::String(s) => matches!(graph.follow(expr), Expr::String(s2) if s2 == s),
        Expr::Call { func, arg, color } => match graph.follow(expr) {
            Expr::Call { func: f2, arg: a2, color: c2 } => {
                color == c2 && match_rec(graph, &func, &f2, bindings) && match_rec(graph, &arg, &a2, bindings)
            }
            _ => false,
        },
        Expr::FnType { input_type, arg, output_type, color } => match graph.follow(expr) {
            Expr::FnType { input_type: i2, arg: arg2, output_type: o2, color: c2 } => {
                color == c2
                    && arg == arg2
                    && match_rec(graph, &input_type, &i2, bindings)
                    && match_rec(graph, &output_type, &o2, bindings)
            }
            _ => false,
        },
        Expr::Lambda { arg, arg_type, body, color } => match graph.follow(expr) {
            Expr::Lambda { arg: arg2, arg_type: at2, body: b2, color: c2 } => {
                color == c2
                    && arg == arg2
                    && match_rec(graph, &arg_type, &at2, bindings)
                    && match_rec(graph, &body, &b2, bindings)
            }
            _ => false,
        },
    }
}

/// `call.arg` is a `Variable` that does not appear free in `call.fn`
/// (consulting `excludedVariables` as proof of absence where the callee
/// contains an unresolved Unknown).
pub fn can_use_eta_reduction(graph: &Graph, func: &Expr, arg: &Expr) -> bool {
    let Expr::Variable(v) = arg else { return false };
    !appears_free(graph, func, *v)
}

fn appears_free(graph: &Graph, expr: &Expr, v: VariableId) -> bool {
    match graph.follow(expr) {
        Expr::Variable(v2) => v2 == v,
        Expr::Unknown(u) => !graph.excludes(u, v),
        Expr::Symbol(_) | Expr::Number { .. } | Expr::String(_) => false,
        Expr::Call { func, arg, .. } => appears_free(graph, &func, v) || appears_free(graph, &arg, v),
        Expr::FnType { input_type, arg: binder, output_type, .. } => {
            appears_free(graph, &input_type, v) || (binder != Some(v) && appears_free(graph, &output_type, v))
        }
        Expr::Lambda { arg: binder, arg_type, body, .. } => {
            appears_free(graph, &arg_type, v) || (binder != Some(v) && appears_free(graph, &body, v))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::SymbolFlags;
    use elam_common::Span;

    #[test]
    fn same_q_is_reflexive() {
        let graph = Graph::new();
        let e = Expr::number(5);
        assert!(same_q(&graph, &e, &e));
    }

    #[test]
    fn replace_with_empty_reps_is_identity() {
        let mut graph = Graph::new();
        let sym = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        let e = Expr::Symbol(sym);
        let result = replace_scope_variables(&mut graph, None, &e, &Replacements::default()).unwrap();
        assert!(same_q(&graph, &e, &result));
    }

    #[test]
    fn replace_substitutes_free_variable() {
        let mut graph = Graph::new();
        let v = graph.new_variable(None, Expr::number(0));
        let mut reps = Replacements::default();
        reps.insert(v, Expr::number(9));
        let result =
            replace_scope_variables(&mut graph, None, &Expr::Variable(v), &reps).unwrap();
        assert!(same_q(&graph, &result, &Expr::number(9)));
    }

    #[test]
    fn replace_does_not_cross_a_shadowing_binder() {
        let mut graph = Graph::new();
        let v = graph.new_variable(None, Expr::number(0));
        let body = Expr::lambda(Some(v), Expr::number(0), Expr::Variable(v), 0);
        let mut reps = Replacements::default();
        reps.insert(v, Expr::number(9));
        let result = replace_scope_variables(&mut graph, None, &body, &reps).unwrap();
        // `v` is shadowed by the lambda's own binder, so the body still
        // refers to the lambda's bound variable, not the replacement.
        assert!(same_q(&graph, &result, &body));
    }

    #[test]
    fn match_pattern_binds_and_checks_consistency() {
        let mut graph = Graph::new();
        let v = graph.new_variable(None, Expr::number(0));
        let pattern = Expr::call(Expr::Variable(v), Expr::Variable(v), 0);
        let five = Expr::number(5);
        let same = Expr::call(five.clone(), five.clone(), 0);
        let different = Expr::call(five.clone(), Expr::number(6), 0);
        assert!(match_pattern(&graph, &pattern, &same).is_some());
        assert!(match_pattern(&graph, &pattern, &different).is_none());
    }

    #[test]
    fn unknown_pattern_aborts_match() {
        let mut graph = Graph::new();
        let u = graph.new_unknown(None, true);
        let result = match_pattern(&graph, &Expr::Unknown(u), &Expr::number(1));
        assert!(result.is_none());
    }

    /// Mirrors how `alias_pattern_unknowns` installs a down-value rule: the
    /// pattern Unknown is aliased to a fresh Variable in the arena, while
    /// `lhs`/`rhs` still hold the original `Unknown` node. Matching must
    /// see through that alias, and the match's binding must substitute
    /// through the `rhs`'s own (aliased) Unknown.
    #[test]
    fn aliased_pattern_unknown_matches_and_substitutes() {
        let mut graph = Graph::new();
        let u = graph.new_unknown(None, true);
        let f = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        let lhs = Expr::call(Expr::Symbol(f), Expr::Unknown(u), 0);
        let rhs = Expr::Unknown(u);
        let v = graph.new_variable(None, Expr::Symbol(f));
        graph.unknown_mut(u).value = Some(Expr::Variable(v));

        let call = Expr::call(Expr::Symbol(f), Expr::number(5), 0);
        let bindings = match_pattern(&graph, &lhs, &call).expect("pattern matches through the alias");
        let result = replace_scope_variables(&mut graph, None, &rhs, &bindings).expect("substitutes");
        assert!(same_q(&graph, &result, &Expr::number(5)));
    }

    #[test]
    fn eta_predicate_checks_freeness_in_callee() {
        let mut graph = Graph::new();
        let v = graph.new_variable(None, Expr::number(0));
        let sym = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        assert!(can_use_eta_reduction(&graph, &Expr::Symbol(sym), &Expr::Variable(v)));
        let calls_v = Expr::call(Expr::Symbol(sym), Expr::Variable(v), 0);
        assert!(!can_use_eta_reduction(&graph, &calls_v, &Expr::Variable(v)));
    }
}
