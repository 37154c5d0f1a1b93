//! Deterministic pretty-printer used by diagnostics and `-v` tracing.
//! Renders the same `Expr` to the same string every time; never consults
//! mutable arena state beyond what it's given, so it's safe to call mid
//! elaboration for a snapshot.

use elam_common::{limits::MAX_STRINGIFY_DEPTH, Interner};

use crate::graph::{Expr, Graph, SymbolId};

pub fn stringify(graph: &Graph, interner: &Interner, expr: &Expr) -> String {
    let mut out = String::new();
    write_expr(graph, interner, expr, &mut out, 0);
    out
}

fn write_expr(graph: &Graph, interner: &Interner, expr: &Expr, out: &mut String, depth: usize) {
    if depth > MAX_STRINGIFY_DEPTH as usize {
        out.push_str("...");
        return;
    }
    match graph.follow(expr) {
        Expr::Symbol(id) => write_symbol_path(graph, interner, id, out),
        Expr::Variable(id) => match graph.variable(id).name {
            Some(name) => out.push_str(interner.resolve(name)),
            None => out.push_str(&format!("_v{}", id.index())),
        },
        Expr::Unknown(id) => out.push_str(&format!("?{}", id.index())),
        Expr::Number { value, is_level } => {
            if is_level {
                out.push_str(&format!("Level({value})"));
            } else {
                out.push_str(&value.to_string());
            }
        }
        Expr::String(atom) => {
            out.push('"');
            for c in interner.resolve(atom).chars() {
                match c {
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    other => out.push(other),
                }
            }
            out.push('"');
        }
        Expr::Call { func, arg, color } => {
            write_expr(graph, interner, &func, out, depth + 1);
            out.push(if color == 0 { '(' } else { '[' });
            write_expr(graph, interner, &arg, out, depth + 1);
            out.push(if color == 0 { ')' } else { ']' });
        }
        Expr::FnType { input_type, arg, output_type, color } => {
            let (open, close) = if color == 0 { ('(', ')') } else { ('[', ']') };
            out.push(open);
            if let Some(v) = arg {
                match graph.variable(v).name {
                    Some(name) => out.push_str(interner.resolve(name)),
                    None => out.push_str(&format!("_v{}", v.index())),
                }
                out.push_str(": ");
            }
            write_expr(graph, interner, &input_type, out, depth + 1);
            out.push(close);
            out.push_str(" -> ");
            write_expr(graph, interner, &output_type, out, depth + 1);
        }
        Expr::Lambda { arg, arg_type, body, color } => {
            out.push_str(if color == 0 { "\\" } else { "\\\\" });
            out.push('(');
            if let Some(v) = arg {
                match graph.variable(v).name {
                    Some(name) => out.push_str(interner.resolve(name)),
                    None => out.push_str(&format!("_v{}", v.index())),
                }
                out.push_str(": ");
            }
            write_expr(graph, interner, &arg_type, out, depth + 1);
            out.push(')');
            out.push(' ');
            write_expr(graph, interner, &body, out, depth + 1);
        }
    }
}

fn write_symbol_path(graph: &Graph, interner: &Interner, id: SymbolId, out: &mut String) {
    let data = graph.symbol(id);
    if let Some(parent) = data.parent {
        if graph.symbol(parent).parent.is_some() {
            write_symbol_path(graph, interner, parent, out);
            out.push('.');
        }
    }
    match data.name {
        Some(name) => out.push_str(interner.resolve(name)),
        None => out.push_str(&format!("_s{}", id.index())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::SymbolFlags;
    use elam_common::Span;

    #[test]
    fn stringifies_a_dotted_symbol_path() {
        let mut graph = Graph::new();
        let mut interner = Interner::new();
        let root = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        let level_name = interner.intern("Level");
        let level = graph.new_symbol(Some(level_name), Some(root), SymbolFlags::empty(), Span::dummy());
        let succ_name = interner.intern("succ");
        let succ = graph.new_symbol(Some(succ_name), Some(level), SymbolFlags::empty(), Span::dummy());
        assert_eq!(stringify(&graph, &interner, &Expr::Symbol(succ)), "Level.succ");
    }

    #[test]
    fn stringifies_a_saturated_call() {
        let mut graph = Graph::new();
        let interner = Interner::new();
        let sym = graph.new_symbol(None, None, SymbolFlags::empty(), Span::dummy());
        let call = Expr::call(Expr::Symbol(sym), Expr::number(5), 0);
        assert_eq!(stringify(&graph, &interner, &call), "_s0(5)");
    }

    #[test]
    fn stringify_is_deterministic() {
        let mut graph = Graph::new();
        let interner = Interner::new();
        let u = graph.new_unknown(None, false);
        let expr = Expr::call(Expr::Unknown(u), Expr::level(1), 1);
        assert_eq!(stringify(&graph, &interner, &expr), stringify(&graph, &interner, &expr));
    }
}
