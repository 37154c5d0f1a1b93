//! Constructs the built-in symbol tree once at startup, per `spec.md` §3's
//! Lifecycles note: `builtin, Level, succ, max, Type, untyped, error-type,
//! number, string, void, unit, root`.

use elam_common::{Interner, Span};

use crate::flags::SymbolFlags;
use crate::graph::{Expr, Graph, Primitive, SymbolId};

/// Builds the built-in tree under a fresh `root` symbol, wires
/// `Level.succ`/`Level.max` to their primitive evaluators, and populates
/// `graph.builtins`. Returns `root`, the namespace every top-level user
/// declaration registers itself under.
pub fn install(graph: &mut Graph, interner: &mut Interner) -> SymbolId {
    let root = new_rigid(graph, interner, "root", None);

    let type_symbol = new_rigid(graph, interner, "Type", Some(root));
    let builtin = new_rigid(graph, interner, "builtin", Some(root));

    let level = new_rigid(graph, interner, "Level", Some(builtin));
    let number = new_rigid(graph, interner, "number", Some(builtin));
    let string = new_rigid(graph, interner, "string", Some(builtin));
    let untyped = new_rigid(graph, interner, "untyped", Some(builtin));
    let error_type = new_rigid(graph, interner, "error-type", Some(builtin));
    let unit = new_rigid(graph, interner, "unit", Some(builtin));

    // Two distinct `void` symbols, deliberately: the spec's open question
    // on `subSymbols` collisions is resolved as first-writer-wins, so the
    // second `void` is a real, separately-addressable symbol that simply
    // isn't reachable through `builtin.subSymbols["void"]`.
    let void = new_rigid(graph, interner, "void", Some(builtin));
    let _shadowed_void = new_rigid(graph, interner, "void", Some(builtin));

    let succ = new_rigid(graph, interner, "succ", Some(level));
    graph.symbol_mut(succ).primitive = Some(Primitive::LevelSucc);
    graph.set_symbol_type(succ, Expr::fn_type(Expr::Symbol(level), None, Expr::Symbol(level), 0));

    let max = new_rigid(graph, interner, "max", Some(level));
    graph.symbol_mut(max).primitive = Some(Primitive::LevelMax);
    let max_type = Expr::fn_type(
        Expr::Symbol(level),
        None,
        Expr::fn_type(Expr::Symbol(level), None, Expr::Symbol(level), 0),
        0,
    );
    graph.set_symbol_type(max, max_type);

    // `type(Type(i)) = Type(succ(i))`: `Type`'s own type is the dependent
    // function `(i : Level) -> Type(succ(i))`.
    let universe_var = graph.new_variable(Some(interner.intern("i")), Expr::Symbol(level));
    let successor_of_i = Expr::call(Expr::Symbol(succ), Expr::Variable(universe_var), 0);
    let type_of_type = Expr::fn_type(
        Expr::Symbol(level),
        Some(universe_var),
        Expr::call(Expr::Symbol(type_symbol), successor_of_i, 0),
        0,
    );
    graph.set_symbol_type(type_symbol, type_of_type);

    graph.builtins.root = Some(root);
    graph.builtins.type_ = Some(type_symbol);
    graph.builtins.builtin = Some(builtin);
    graph.builtins.level = Some(level);
    graph.builtins.succ = Some(succ);
    graph.builtins.max = Some(max);
    graph.builtins.number = Some(number);
    graph.builtins.string = Some(string);
    graph.builtins.untyped = Some(untyped);
    graph.builtins.error_type = Some(error_type);
    graph.builtins.void = Some(void);
    graph.builtins.unit = Some(unit);

    root
}

fn new_rigid(graph: &mut Graph, interner: &mut Interner, name: &str, parent: Option<SymbolId>) -> SymbolId {
    let atom = interner.intern(name);
    let id = graph.new_symbol(Some(atom), parent, SymbolFlags::RIGID_BUILTIN, Span::dummy());
    if let Some(parent) = parent {
        graph.register_sub_symbol(parent, atom, id);
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::ConstraintSolver;
    use crate::eval::evaluate;

    #[test]
    fn level_tree_is_reachable_from_builtin() {
        let mut graph = Graph::new();
        let mut interner = Interner::new();
        install(&mut graph, &mut interner);
        let builtin = graph.builtins.builtin();
        let level_name = interner.intern("Level");
        assert_eq!(graph.symbol(builtin).sub_symbols[&level_name], graph.builtins.level());
    }

    #[test]
    fn void_collision_keeps_the_first_symbol() {
        let mut graph = Graph::new();
        let mut interner = Interner::new();
        install(&mut graph, &mut interner);
        let builtin = graph.builtins.builtin();
        let void_name = interner.intern("void");
        assert_eq!(graph.symbol(builtin).sub_symbols[&void_name], graph.builtins.void());
    }

    #[test]
    fn level_max_evaluates_through_the_installed_primitive() {
        let mut graph = Graph::new();
        let mut interner = Interner::new();
        install(&mut graph, &mut interner);
        let mut solver = ConstraintSolver::new();
        let call = Expr::call(
            Expr::call(Expr::Symbol(graph.builtins.max()), Expr::level(0), 0),
            Expr::level(2),
            0,
        );
        let result = evaluate(&mut graph, &mut solver, &call);
        assert!(matches!(result, Expr::Number { value: 2, is_level: true }));
    }
}
