//! Recursive-descent parser over the surface grammar lexed by
//! `elam-lexer`, producing the AST forms `elam-lower` consumes.

pub mod ast;
pub mod parser;

pub use ast::{Binder, CallColor, Decl, Expr, FnTypeArg, Module};
pub use parser::Parser;

#[cfg(test)]
mod tests {
    use super::*;
    use elam_common::Interner;

    fn parse(source: &str) -> (Module, Vec<elam_common::Diagnostic>) {
        let mut interner = Interner::new();
        let parser = Parser::new(source, &mut interner);
        parser.parse_module()
    }

    #[test]
    fn parses_a_typed_module_declaration() {
        let (module, diags) = parse("id: (T: Type) -> T -> T = \\T \\x x;");
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(module.decls.len(), 1);
        match &module.decls[0] {
            Decl::Module { ty: Some(_), value: Some(_), .. } => {}
            other => panic!("expected a typed module decl, got {other:?}"),
        }
    }

    #[test]
    fn parses_a_rule_declaration() {
        let (module, diags) = parse("f(?x) = x;");
        assert!(diags.is_empty(), "{diags:?}");
        match &module.decls[0] {
            Decl::Rule { params, .. } => assert_eq!(params.len(), 1),
            other => panic!("expected a rule decl, got {other:?}"),
        }
    }

    #[test]
    fn parses_erased_application() {
        let (module, diags) = parse("x = f[5];");
        assert!(diags.is_empty(), "{diags:?}");
        match &module.decls[0] {
            Decl::Module { value: Some(Expr::Call { color: CallColor::Erased, .. }), .. } => {}
            other => panic!("expected an erased call, got {other:?}"),
        }
    }

    #[test]
    fn rejects_if_statements_with_a_diagnostic_not_a_panic() {
        let (_module, diags) = parse("if x { y; }");
        assert!(!diags.is_empty());
    }

    #[test]
    fn parses_member_access_chains() {
        let (module, diags) = parse("x = a.b.c;");
        assert!(diags.is_empty(), "{diags:?}");
        match &module.decls[0] {
            Decl::Module { value: Some(Expr::MemberAccess { .. }), .. } => {}
            other => panic!("expected member access, got {other:?}"),
        }
    }
}
