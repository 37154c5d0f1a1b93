//! The evaluator: β/δ/η-reduction plus built-in primitives and user rewrite
//! rules, per `spec.md` §4.3.
//!
//! Driven by an explicit work stack rather than host-language recursion —
//! the conformance suite includes a 10k-deep right-nested call chain, and a
//! naive recursive evaluator would blow the call stack on it. `Task::Eval`
//! pushes its subexpressions and a continuation `Frame`; `Task::Apply` pops
//! a finished value and resumes the frame that was waiting on it.

use crate::constraints::ConstraintSolver;
use crate::graph::{Expr, Graph, Primitive, SymbolId, VariableId};
use crate::flags::SymbolFlags;
use crate::subst::{can_use_eta_reduction, match_pattern, replace_scope_variables, Replacements};

enum Frame {
    CallFunc { arg: Expr, color: u8 },
    CallArg { func: Expr, color: u8 },
    FnTypeInput { arg: Option<VariableId>, output_type: Expr, color: u8 },
    FnTypeOutput { input_type: Expr, arg: Option<VariableId>, color: u8 },
    LambdaArgType { arg: Option<VariableId>, body: Expr, color: u8 },
    LambdaBody { arg: Option<VariableId>, arg_type: Expr, color: u8 },
}

enum Task {
    Eval(Expr),
    Apply(Frame),
}

/// Reduces `expr` to a normal form. Re-entrant: rule right-hand sides and
/// β-reduced lambda bodies are fed back through the same work stack rather
/// than a nested call.
pub fn evaluate(graph: &mut Graph, solver: &mut ConstraintSolver, expr: &Expr) -> Expr {
    let mut todo = vec![Task::Eval(expr.clone())];
    let mut values: Vec<Expr> = Vec::new();

    while let Some(task) = todo.pop() {
        match task {
            Task::Eval(e) => eval_step(graph, &mut todo, &mut values, e),
            Task::Apply(frame) => apply_step(graph, solver, &mut todo, &mut values, frame),
        }
    }

    values.pop().expect("evaluator work stack produced no value")
}

fn eval_step(graph: &Graph, todo: &mut Vec<Task>, values: &mut Vec<Expr>, expr: Expr) {
    match expr {
        Expr::Number { .. } | Expr::String(_) | Expr::Variable(_) => values.push(expr),
        Expr::Symbol(id) => {
            let data = graph.symbol(id);
            if data.flags.contains(SymbolFlags::HOLD) {
                values.push(expr);
                return;
            }
            match data.value.clone() {
                Some(value) => todo.push(Task::Eval(value)),
                None => values.push(expr),
            }
        }
        Expr::Unknown(id) => match graph.unknown(id).value.clone() {
            Some(value) => todo.push(Task::Eval(value)),
            None => values.push(expr),
        },
        Expr::Call { func, arg, color } => {
            todo.push(Task::Apply(Frame::CallFunc { arg: *arg, color }));
            todo.push(Task::Eval(*func));
        }
        Expr::FnType { input_type, arg, output_type, color } => {
            todo.push(Task::Apply(Frame::FnTypeInput { arg, output_type: *output_type, color }));
            todo.push(Task::Eval(*input_type));
        }
        Expr::Lambda { arg, arg_type, body, color } => {
            todo.push(Task::Apply(Frame::LambdaArgType { arg, body: *body, color }));
            todo.push(Task::Eval(*arg_type));
        }
    }
}

fn apply_step(
    graph: &mut Graph,
    solver: &mut ConstraintSolver,
    todo: &mut Vec<Task>,
    values: &mut Vec<Expr>,
    frame: Frame,
) {
    match frame {
        Frame::CallFunc { arg, color } => {
            let func = values.pop().expect("CallFunc frame with no evaluated func");
            todo.push(Task::Apply(Frame::CallArg { func, color }));
            todo.push(Task::Eval(arg));
        }
        Frame::CallArg { func, color } => {
            let arg = values.pop().expect("CallArg frame with no evaluated arg");
            match try_reduce_call(graph, solver, &func, &arg, color) {
                Some(reduced) => todo.push(Task::Eval(reduced)),
                None => values.push(Expr::call(func, arg, color)),
            }
        }
        Frame::FnTypeInput { arg, output_type, color } => {
            let input_type = values.pop().expect("FnTypeInput frame with no evaluated input");
            todo.push(Task::Apply(Frame::FnTypeOutput { input_type, arg, color }));
            todo.push(Task::Eval(output_type));
        }
        Frame::FnTypeOutput { input_type, arg, color } => {
            let output_type = values.pop().expect("FnTypeOutput frame with no evaluated output");
            values.push(Expr::fn_type(input_type, arg, output_type, color));
        }
        Frame::LambdaArgType { arg, body, color } => {
            let arg_type = values.pop().expect("LambdaArgType frame with no evaluated arg type");
            todo.push(Task::Apply(Frame::LambdaBody { arg, arg_type, color }));
            todo.push(Task::Eval(body));
        }
        Frame::LambdaBody { arg, arg_type, color } => {
            let body = values.pop().expect("LambdaBody frame with no evaluated body");
            let reduced = try_eta_reduce(graph, arg, color, &body);
            values.push(reduced.unwrap_or_else(|| Expr::lambda(arg, arg_type, body, color)));
        }
    }
}

/// `λv. f v` reduces to `f` when `v` is not free in `f`.
fn try_eta_reduce(graph: &Graph, arg: Option<VariableId>, color: u8, body: &Expr) -> Option<Expr> {
    let arg = arg?;
    let Expr::Call { func, arg: call_arg, color: call_color } = body else { return None };
    if *call_color != color {
        return None;
    }
    let Expr::Variable(v) = call_arg.as_ref() else { return None };
    if *v != arg {
        return None;
    }
    can_use_eta_reduction(graph, func, call_arg).then(|| (**func).clone())
}

fn try_reduce_call(graph: &mut Graph, solver: &mut ConstraintSolver, func: &Expr, arg: &Expr, color: u8) -> Option<Expr> {
    if let Expr::Lambda { arg: Some(v), body, .. } = func {
        let mut reps = Replacements::default();
        reps.insert(*v, arg.clone());
        if let Some(result) = replace_scope_variables(graph, Some(solver), body, &reps) {
            return Some(result);
        }
    }
    if let Expr::Lambda { arg: None, body, .. } = func {
        return Some((**body).clone());
    }

    let whole_call = Expr::call(func.clone(), arg.clone(), color);
    let mut candidates = Vec::new();
    if let Some(arg_head) = head_symbol(graph, arg) {
        candidates.extend(graph.symbol(arg_head).up_values.iter().cloned());
    }
    if let Some(func_head) = head_symbol(graph, func) {
        candidates.extend(graph.symbol(func_head).down_values.iter().cloned());
    }
    for rule in &candidates {
        if let Some(bindings) = match_pattern(graph, &rule.lhs, &whole_call) {
            if let Some(result) = replace_scope_variables(graph, Some(solver), &rule.rhs, &bindings) {
                return Some(result);
            }
        }
    }

    let (head, args) = collect_spine(&whole_call);
    if let Expr::Symbol(head_id) = head {
        if let Some(primitive) = graph.symbol(head_id).primitive {
            if args.len() == primitive.arity() {
                return eval_primitive(primitive, &args);
            }
        }
    }

    None
}

fn head_symbol(graph: &Graph, expr: &Expr) -> Option<SymbolId> {
    match graph.follow(expr) {
        Expr::Symbol(s) => Some(s),
        Expr::Call { func, .. } => head_symbol(graph, &func),
        _ => None,
    }
}

fn collect_spine(expr: &Expr) -> (Expr, Vec<Expr>) {
    let mut args = Vec::new();
    let mut current = expr.clone();
    loop {
        match current {
            Expr::Call { func, arg, .. } => {
                args.push(*arg);
                current = *func;
            }
            other => {
                args.reverse();
                return (other, args);
            }
        }
    }
}

fn eval_primitive(primitive: Primitive, args: &[Expr]) -> Option<Expr> {
    match primitive {
        Primitive::LevelSucc => match args[0] {
            Expr::Number { value, is_level: true } => Some(Expr::level(value + 1)),
            _ => None,
        },
        Primitive::LevelMax => match (&args[0], &args[1]) {
            (Expr::Number { value: v1, is_level: true }, Expr::Number { value: v2, is_level: true }) => {
                Some(Expr::level(*v1.max(v2)))
            }
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RewriteRule;
    use elam_common::Span;

    #[test]
    fn beta_reduces_an_applied_lambda() {
        let mut graph = Graph::new();
        let mut solver = ConstraintSolver::new();
        let v = graph.new_variable(None, Expr::number(0));
        let identity = Expr::lambda(Some(v), Expr::number(0), Expr::Variable(v), 0);
        let applied = Expr::call(identity, Expr::number(42), 0);
        let result = evaluate(&mut graph, &mut solver, &applied);
        assert!(matches!(result, Expr::Number { value: 42, .. }));
    }

    #[test]
    fn eta_reduces_a_wrapper_lambda() {
        let mut graph = Graph::new();
        let mut solver = ConstraintSolver::new();
        let f = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        let v = graph.new_variable(None, Expr::number(0));
        let wrapper = Expr::lambda(Some(v), Expr::number(0), Expr::call(Expr::Symbol(f), Expr::Variable(v), 0), 0);
        let result = evaluate(&mut graph, &mut solver, &wrapper);
        assert!(matches!(result, Expr::Symbol(s) if s == f));
    }

    #[test]
    fn applies_a_down_value_rewrite_rule() {
        let mut graph = Graph::new();
        let mut solver = ConstraintSolver::new();
        let f = graph.new_symbol(None, None, SymbolFlags::ALLOW_DOWN_VALUE, Span::dummy());
        let pattern_var = graph.new_variable(None, Expr::number(0));
        let lhs = Expr::call(Expr::Symbol(f), Expr::Variable(pattern_var), 0);
        let rhs = Expr::Variable(pattern_var);
        graph.symbol_mut(f).down_values.push(RewriteRule { lhs, rhs });
        let call = Expr::call(Expr::Symbol(f), Expr::number(5), 0);
        let result = evaluate(&mut graph, &mut solver, &call);
        assert!(matches!(result, Expr::Number { value: 5, .. }));
    }

    #[test]
    fn level_max_primitive_reduces_saturated_calls() {
        let mut graph = Graph::new();
        let mut solver = ConstraintSolver::new();
        let max_sym = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        graph.symbol_mut(max_sym).primitive = Some(Primitive::LevelMax);
        let call = Expr::call(Expr::call(Expr::Symbol(max_sym), Expr::level(0), 0), Expr::level(2), 0);
        let result = evaluate(&mut graph, &mut solver, &call);
        assert!(matches!(result, Expr::Number { value: 2, is_level: true }));
    }

    #[test]
    fn level_succ_primitive_increments() {
        let mut graph = Graph::new();
        let mut solver = ConstraintSolver::new();
        let succ_sym = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        graph.symbol_mut(succ_sym).primitive = Some(Primitive::LevelSucc);
        let call = Expr::call(Expr::Symbol(succ_sym), Expr::level(3), 0);
        let result = evaluate(&mut graph, &mut solver, &call);
        assert!(matches!(result, Expr::Number { value: 4, is_level: true }));
    }

    #[test]
    fn a_10000_deep_right_nested_call_chain_does_not_overflow_the_stack() {
        let mut graph = Graph::new();
        let mut solver = ConstraintSolver::new();
        let f = graph.new_symbol(None, None, SymbolFlags::HOLD, Span::dummy());
        let mut expr = Expr::Symbol(f);
        for _ in 0..10_000 {
            expr = Expr::call(expr, Expr::number(1), 0);
        }
        let result = evaluate(&mut graph, &mut solver, &expr);
        assert!(matches!(result, Expr::Call { .. }));
    }
}
