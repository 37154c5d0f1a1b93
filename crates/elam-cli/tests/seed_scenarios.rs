//! End-to-end coverage over the elaborator's canonical worked examples:
//! a polymorphic identity function, implicit inference of erased
//! parameters, down-value rewriting, the `Level.max` built-in, and
//! annotated-lambda normalization. Two distinct rigid symbols failing to
//! unify is covered at the constraint-solver level instead of through
//! source text: this grammar has no binary equality expression (`===`
//! tokenizes but has no parsed form), so there is no surface syntax that
//! posts an `Equal` constraint directly between two bare symbols.

use std::io::Write;

use elam_common::Interner;
use elam_elab::{evaluate, ConstraintSolver, Expr};
use elam_parser::Parser;
use tempfile::NamedTempFile;

fn write_source(source: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(source.as_bytes()).expect("write source");
    file.flush().expect("flush source");
    file
}

/// Runs the full pipeline and returns the elaborated graph plus the
/// interner needed to look names up in it, for tests that need to
/// inspect a resulting value rather than just the diagnostic count.
fn elaborate_source(source: &str) -> (elam_elab::Graph, Interner) {
    let mut interner = Interner::new();
    let parser = Parser::new(source, &mut interner);
    let (module, parse_diagnostics) = parser.parse_module();
    assert!(parse_diagnostics.is_empty(), "{parse_diagnostics:?}");

    let lowered = elam_lower::lower(&module, &mut interner);
    assert!(lowered.diagnostics.is_empty(), "{:?}", lowered.diagnostics);

    let graph = elam_elab::new_graph_with_builtins(&mut interner);
    let elaborated = elam_elab::elaborate(graph, &lowered.hir);
    assert!(elaborated.diagnostics.is_empty(), "{:?}", elaborated.diagnostics);
    (elaborated.graph, interner)
}

fn lookup(graph: &elam_elab::Graph, interner: &mut Interner, name: &str) -> Expr {
    let root = graph.builtins.root();
    let atom = interner.intern(name);
    let sym = graph.symbol(root).sub_symbols[&atom];
    Expr::Symbol(sym)
}

#[test]
fn identity_function_has_the_declared_type_and_value_with_no_diagnostics() {
    let file = write_source("id: (T: Type(0)) -> T -> T = \\T \\x x;");
    let result = elam_cli::driver::run(file.path()).expect("run succeeds");
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>());
}

#[test]
fn const_function_infers_both_erased_parameters() {
    let file = write_source(
        "const: [T: Type(0)] -> [U: Type(0)] -> T -> U -> T = \\x \\\\_ x;",
    );
    let result = elam_cli::driver::run(file.path()).expect("run succeeds");
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>());
}

#[test]
fn down_value_rule_reduces_a_call_at_its_use_site() {
    let (mut graph, mut interner) = elaborate_source("f(?x) = x;\nresult = f(5);");
    let value = match lookup(&graph, &mut interner, "result") {
        Expr::Symbol(s) => graph.symbol(s).value.clone().expect("result has a value"),
        _ => unreachable!(),
    };
    let evaluated = evaluate(&mut graph, &mut ConstraintSolver::new(), &value);
    assert!(matches!(evaluated, Expr::Number { value: 5, is_level: false }));
}

#[test]
fn level_max_builtin_reduces_to_the_larger_literal() {
    let (mut graph, mut interner) = elaborate_source("result = Level.max(0, 2);");
    let value = match lookup(&graph, &mut interner, "result") {
        Expr::Symbol(s) => graph.symbol(s).value.clone().expect("result has a value"),
        _ => unreachable!(),
    };
    let evaluated = evaluate(&mut graph, &mut ConstraintSolver::new(), &value);
    assert!(matches!(evaluated, Expr::Number { value: 2, is_level: true }));
}

#[test]
fn annotated_lambda_applied_to_a_level_normalizes_via_succ() {
    let (mut graph, mut interner) =
        elaborate_source("result = (\\(x: Level) Level.succ(x))(3);");
    let value = match lookup(&graph, &mut interner, "result") {
        Expr::Symbol(s) => graph.symbol(s).value.clone().expect("result has a value"),
        _ => unreachable!(),
    };
    let evaluated = evaluate(&mut graph, &mut ConstraintSolver::new(), &value);
    assert!(matches!(evaluated, Expr::Number { value: 4, is_level: true }));
}
