//! The type solver: one-shot, per-expression-kind typing, per `spec.md`
//! §4.2. Unlike the HIR solver's per-register cache (which memoizes by
//! register identity in `resolved[]`), this is a plain recursive function —
//! the only nodes with a stable identity across calls are `Symbol`,
//! `Variable`, and `Unknown`, and each of those is handled by a direct
//! arena lookup rather than recomputation.

use crate::constraints::{Constraint, ConstraintSolver};
use crate::graph::{Expr, Graph};
use crate::subst::Replacements;

/// Computes the type of `expr`. Builtin-typed leaves (`Number`, `String`,
/// untyped `Symbol`s) resolve immediately; `FnType` and unresolved
/// `Unknown`s post a constraint and return a fresh placeholder `Unknown`
/// that the constraint solver will fill in on a later pass.
pub fn type_of(graph: &mut Graph, solver: &mut ConstraintSolver, expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::Number { is_level, .. } => {
            let builtin = if *is_level { graph.builtins.level() } else { graph.builtins.number() };
            Some(Expr::Symbol(builtin))
        }
        Expr::String(_) => Some(Expr::Symbol(graph.builtins.string())),
        Expr::Symbol(id) => match graph.symbol(*id).r#type.clone() {
            Some(ty) => Some(ty),
            None => Some(Expr::Symbol(graph.builtins.untyped())),
        },
        Expr::Variable(id) => Some(graph.variable(*id).default_type.clone()),
        Expr::FnType { input_type, output_type, .. } => {
            let target = graph.new_unknown(None, false);
            solver.add(Constraint::FnTypeType(target, (**input_type).clone(), (**output_type).clone()));
            Some(Expr::Unknown(target))
        }
        Expr::Lambda { arg, arg_type, body, color } => {
            let output_type = type_of(graph, solver, body)?;
            Some(Expr::fn_type((**arg_type).clone(), *arg, output_type, *color))
        }
        Expr::Call { func, arg, .. } => {
            let func_type = type_of(graph, solver, func)?;
            match graph.follow(&func_type) {
                Expr::FnType { arg: binder, output_type, .. } => match binder {
                    Some(v) => {
                        let mut reps = Replacements::default();
                        reps.insert(v, (**arg).clone());
                        Some(
                            crate::subst::replace_scope_variables(graph, Some(solver), &output_type, &reps)
                                .unwrap_or_else(|| Expr::Symbol(graph.builtins.error_type())),
                        )
                    }
                    None => Some(*output_type),
                },
                _ => Some(Expr::Symbol(graph.builtins.error_type())),
            }
        }
        Expr::Unknown(id) => {
            if let Some(value) = graph.unknown(*id).value.clone() {
                return type_of(graph, solver, &value);
            }
            if let Some(ty) = graph.unknown(*id).r#type.clone() {
                return Some(ty);
            }
            let target = graph.new_unknown(None, false);
            solver.add(Constraint::Typeof(target, Expr::Unknown(*id)));
            Some(Expr::Unknown(target))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::SymbolFlags;
    use elam_common::Span;

    fn graph_with_builtins() -> Graph {
        let mut graph = Graph::new();
        let number = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        let level = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        let string = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        let untyped = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        let error_type = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        graph.builtins.number = Some(number);
        graph.builtins.level = Some(level);
        graph.builtins.string = Some(string);
        graph.builtins.untyped = Some(untyped);
        graph.builtins.error_type = Some(error_type);
        graph
    }

    #[test]
    fn number_types_to_the_number_builtin() {
        let mut graph = graph_with_builtins();
        let mut solver = ConstraintSolver::new();
        let ty = type_of(&mut graph, &mut solver, &Expr::number(3)).unwrap();
        assert!(matches!(ty, Expr::Symbol(s) if s == graph.builtins.number()));
    }

    #[test]
    fn level_number_types_to_level() {
        let mut graph = graph_with_builtins();
        let mut solver = ConstraintSolver::new();
        let ty = type_of(&mut graph, &mut solver, &Expr::level(2)).unwrap();
        assert!(matches!(ty, Expr::Symbol(s) if s == graph.builtins.level()));
    }

    #[test]
    fn untyped_symbol_types_to_untyped_builtin() {
        let mut graph = graph_with_builtins();
        let mut solver = ConstraintSolver::new();
        let sym = graph.new_symbol(None, None, SymbolFlags::USER_DECLARATION, Span::dummy());
        let ty = type_of(&mut graph, &mut solver, &Expr::Symbol(sym)).unwrap();
        assert!(matches!(ty, Expr::Symbol(s) if s == graph.builtins.untyped()));
    }

    #[test]
    fn variable_types_to_its_default_type() {
        let mut graph = graph_with_builtins();
        let mut solver = ConstraintSolver::new();
        let v = graph.new_variable(None, Expr::level(0));
        let ty = type_of(&mut graph, &mut solver, &Expr::Variable(v)).unwrap();
        assert!(matches!(ty, Expr::Number { value: 0, is_level: true }));
    }

    #[test]
    fn call_of_a_known_fn_type_substitutes_the_argument() {
        let mut graph = graph_with_builtins();
        let mut solver = ConstraintSolver::new();
        let v = graph.new_variable(None, Expr::level(0));
        let fn_ty = Expr::fn_type(Expr::level(0), Some(v), Expr::Variable(v), 0);
        let sym = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        graph.set_symbol_type(sym, fn_ty);
        let call = Expr::call(Expr::Symbol(sym), Expr::number(9), 0);
        let ty = type_of(&mut graph, &mut solver, &call).unwrap();
        assert!(matches!(ty, Expr::Number { value: 9, is_level: false }));
    }
}
