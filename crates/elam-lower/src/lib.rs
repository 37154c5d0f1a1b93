//! AST→HIR lowering: walks the `elam-parser` AST and emits `elam-elab` HIR
//! registers, resolving identifiers to registers via an explicit name-scope
//! stack rather than relying on lexical nesting in the source tree, per
//! `SPEC_FULL.md` §11.
//!
//! Built-in names (`Type`, `Level`, `number`, `string`, `untyped`, `unit`,
//! `void`) are not declared anywhere in user source; they're seeded into the
//! outermost scope frame as `MemberAccess` chains rooted at [`Register::Root`],
//! mirroring the tree `elam-elab::builtins::install` actually builds.

use rustc_hash::FxHashMap;

use elam_common::{Atom, Diagnostic, Interner, Span};
use elam_elab::flags::SymbolFlags;
use elam_elab::hir::{Hir, Register, RegisterId};
use elam_parser::ast::{Binder, CallColor, Decl, Expr, FnTypeArg, Module};

pub struct LowerResult {
    pub hir: Hir,
    pub diagnostics: Vec<Diagnostic>,
}

/// Lowers a whole parsed file. Every top-level name is pre-declared in one
/// pass before any declaration body is lowered, so forward and mutual
/// references (`f` calling `g` declared later in the same file) resolve to
/// the same [`RegisterId`] everywhere they occur.
pub fn lower(module: &Module, interner: &mut Interner) -> LowerResult {
    let mut lowering = Lowering::new(interner);
    lowering.declare_top_level(module);
    for decl in &module.decls {
        lowering.lower_decl(decl);
    }
    LowerResult { hir: lowering.hir, diagnostics: lowering.diagnostics }
}

struct Lowering<'i> {
    hir: Hir,
    interner: &'i mut Interner,
    scopes: Vec<FxHashMap<Atom, RegisterId>>,
    diagnostics: Vec<Diagnostic>,
    root: RegisterId,
}

impl<'i> Lowering<'i> {
    fn new(interner: &'i mut Interner) -> Self {
        let mut hir = Hir::new();
        let root = hir.push(Register::Root, Span::dummy());
        let builtin = hir.push(
            Register::MemberAccess { lhs: root, name: interner.intern("builtin") },
            Span::dummy(),
        );

        let mut global = FxHashMap::default();
        let mut seed = |hir: &mut Hir, scope: &mut FxHashMap<Atom, RegisterId>, under: RegisterId, name: &str, interner: &mut Interner| {
            let atom = interner.intern(name);
            let reg = hir.push(Register::MemberAccess { lhs: under, name: atom }, Span::dummy());
            scope.insert(atom, reg);
        };
        seed(&mut hir, &mut global, root, "Type", interner);
        seed(&mut hir, &mut global, builtin, "Level", interner);
        seed(&mut hir, &mut global, builtin, "number", interner);
        seed(&mut hir, &mut global, builtin, "string", interner);
        seed(&mut hir, &mut global, builtin, "untyped", interner);
        seed(&mut hir, &mut global, builtin, "unit", interner);
        seed(&mut hir, &mut global, builtin, "void", interner);

        Lowering { hir, interner, scopes: vec![global], diagnostics: Vec::new(), root }
    }

    fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn bind(&mut self, name: Atom, reg: RegisterId) {
        self.scopes.last_mut().expect("at least the global scope is always present").insert(name, reg);
    }

    fn lookup(&self, name: Atom) -> Option<RegisterId> {
        self.scopes.iter().rev().find_map(|scope| scope.get(&name).copied())
    }

    /// First pass: one [`Register::Symbol`] per distinct top-level name,
    /// shared by every declaration (and every reference) of that name.
    fn declare_top_level(&mut self, module: &Module) {
        for decl in &module.decls {
            let (name, span) = match decl {
                Decl::Module { name, span, .. } => (*name, *span),
                Decl::Rule { name, span, .. } => (*name, *span),
                Decl::Unsupported(_) => continue,
            };
            if self.scopes[0].contains_key(&name) {
                continue;
            }
            let sym = self.hir.push(
                Register::Symbol { name: Some(name), parent: Some(self.root), flags: SymbolFlags::USER_DECLARATION },
                span,
            );
            self.scopes[0].insert(name, sym);
        }
    }

    fn lower_decl(&mut self, decl: &Decl) {
        match decl {
            Decl::Module { name, ty, value, span } => {
                let Some(symbol_reg) = self.lookup(*name) else {
                    unreachable!("declare_top_level registers every Decl::Module name")
                };
                if let Some(ty) = ty {
                    let ty_reg = self.lower_expr(ty);
                    self.hir.push(Register::SymbolType { symbol: symbol_reg, r#type: ty_reg }, *span);
                }
                if let Some(value) = value {
                    let value_reg = self.lower_expr(value);
                    self.hir.push(Register::SymbolAssign { symbol: symbol_reg, value: value_reg }, *span);
                }
            }
            Decl::Rule { name, params, rhs, span } => {
                let Some(symbol_reg) = self.lookup(*name) else {
                    unreachable!("declare_top_level registers every Decl::Rule name")
                };
                self.push_scope();
                let mut lhs = symbol_reg;
                for param in params {
                    let arg_reg = self.lower_pattern_param(param);
                    lhs = self.hir.push(
                        Register::Call { func: lhs, arg: arg_reg, color: 0, is_pattern: true },
                        param.span(),
                    );
                }
                let rhs_reg = self.lower_expr(rhs);
                self.pop_scope();
                self.hir.push(
                    Register::SymbolRule { symbol: symbol_reg, lhs, rhs: rhs_reg, is_up_value: false },
                    *span,
                );
            }
            Decl::Unsupported(_) => {}
        }
    }

    /// Lowers one rule-declaration parameter. `?x` introduces a fresh
    /// pattern `Unknown` and binds `x` in the current scope for the rest of
    /// the parameter list and the right-hand side; anything else lowers as
    /// an ordinary expression and matches structurally (see `matchPattern`
    /// in `elam-elab::subst`).
    fn lower_pattern_param(&mut self, expr: &Expr) -> RegisterId {
        match expr {
            Expr::Pattern { name, span } => {
                let reg = self.hir.push(Register::Unknown { r#type: None, is_pattern: true }, *span);
                if let Some(name) = name {
                    self.bind(*name, reg);
                }
                reg
            }
            other => self.lower_expr(other),
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> RegisterId {
        match expr {
            Expr::Identifier(name, span) => match self.lookup(*name) {
                Some(reg) => reg,
                None => {
                    self.diagnostics.push(Diagnostic::error(
                        *span,
                        format!("undefined identifier `{}`", self.interner.resolve(*name)),
                    ));
                    self.hir.push(Register::Unknown { r#type: None, is_pattern: false }, *span)
                }
            },
            Expr::Number(n, span) => self.hir.push(Register::Number(*n), *span),
            Expr::String(s, span) => self.hir.push(Register::String(*s), *span),
            Expr::FnType { args, output, span } => self.lower_fn_type(args, output, *span),
            Expr::Lambda { arg, erased, body, span } => self.lower_lambda(arg, *erased, body, *span),
            Expr::Call { callee, arg, color, span } => self.lower_call(callee, arg.as_deref(), *color, *span),
            Expr::MemberAccess { lhs, member, span } => {
                let lhs_reg = self.lower_expr(lhs);
                self.hir.push(Register::MemberAccess { lhs: lhs_reg, name: *member }, *span)
            }
            Expr::Pattern { span, .. } => {
                self.diagnostics.push(Diagnostic::error(*span, "pattern `?` is only legal in a rule's argument list"));
                self.hir.push(Register::Unknown { r#type: None, is_pattern: false }, *span)
            }
            Expr::Paren(inner) => self.lower_expr(inner),
            Expr::Unsupported(span) => self.hir.push(Register::Unknown { r#type: None, is_pattern: false }, *span),
        }
    }

    fn lower_fn_type(&mut self, args: &[FnTypeArg], output: &Expr, span: Span) -> RegisterId {
        if args.is_empty() {
            return self.lower_expr(output);
        }
        let arg = &args[0];
        let input_reg = self.lower_expr(&arg.ty);
        let color = if arg.erased { 1 } else { 0 };

        match arg.name {
            Some(name) => {
                self.push_scope();
                let var_reg =
                    self.hir.push(Register::Variable { name: Some(name), r#type: Some(input_reg) }, span);
                self.bind(name, var_reg);
                let output_reg = self.lower_fn_type(&args[1..], output, span);
                self.pop_scope();
                self.hir.push(
                    Register::FnType { input_type: input_reg, arg: Some(var_reg), output_type: output_reg, color },
                    span,
                )
            }
            None => {
                let output_reg = self.lower_fn_type(&args[1..], output, span);
                self.hir.push(
                    Register::FnType { input_type: input_reg, arg: None, output_type: output_reg, color },
                    span,
                )
            }
        }
    }

    fn lower_lambda(&mut self, binder: &Binder, erased: bool, body: &Expr, span: Span) -> RegisterId {
        let arg_type_reg = binder.ty.as_deref().map(|t| self.lower_expr(t));
        self.push_scope();
        let var_reg = self.hir.push(
            Register::Variable { name: Some(binder.name), r#type: arg_type_reg },
            binder.span,
        );
        self.bind(binder.name, var_reg);
        let body_reg = self.lower_expr(body);
        self.pop_scope();
        let color = if erased { 1 } else { 0 };
        self.hir.push(Register::Lambda { arg: Some(var_reg), arg_type: arg_type_reg, body: body_reg, color }, span)
    }

    /// `f()` — an explicit niladic call site — applies `f` to the built-in
    /// `unit` value rather than needing a zero-argument `Call` shape, since
    /// the core language's `Call`/`FnType` are always one argument deep.
    fn lower_call(&mut self, callee: &Expr, arg: Option<&Expr>, color: CallColor, span: Span) -> RegisterId {
        let callee_reg = self.lower_expr(callee);
        let c = match color {
            CallColor::Explicit => 0,
            CallColor::Erased => 1,
        };
        let arg_reg = match arg {
            Some(arg) => self.lower_expr(arg),
            None => match self.lookup(self.interner.intern("unit")) {
                Some(reg) => reg,
                None => self.hir.push(Register::Unknown { r#type: None, is_pattern: false }, span),
            },
        };
        self.hir.push(Register::Call { func: callee_reg, arg: arg_reg, color: c, is_pattern: false }, span)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use elam_elab::hir::Register;
    use elam_parser::Parser;

    fn lower_source(source: &str) -> (Hir, Vec<Diagnostic>, Interner) {
        let mut interner = Interner::new();
        let parser = Parser::new(source, &mut interner);
        let (module, parse_diags) = parser.parse_module();
        assert!(parse_diags.is_empty(), "{parse_diags:?}");
        let result = lower(&module, &mut interner);
        (result.hir, result.diagnostics, interner)
    }

    #[test]
    fn lowers_a_typed_assignment_to_a_shared_symbol_register() {
        let (hir, diags, _interner) = lower_source("x: Level = 0;");
        assert!(diags.is_empty(), "{diags:?}");
        let symbol_regs: Vec<RegisterId> = hir
            .ids()
            .filter(|id| matches!(hir.get(*id), Register::Symbol { .. }))
            .collect();
        assert_eq!(symbol_regs.len(), 1, "exactly one Symbol register for `x`");
        let assigns = hir.ids().filter(|id| matches!(hir.get(*id), Register::SymbolAssign { .. })).count();
        let types = hir.ids().filter(|id| matches!(hir.get(*id), Register::SymbolType { .. })).count();
        assert_eq!(assigns, 1);
        assert_eq!(types, 1);
    }

    #[test]
    fn forward_reference_resolves_to_the_same_symbol_register() {
        let (hir, diags, _interner) = lower_source("a = b; b = 1;");
        assert!(diags.is_empty(), "{diags:?}");
        let assigns: Vec<_> =
            hir.ids().filter(|id| matches!(hir.get(*id), Register::SymbolAssign { .. })).collect();
        assert_eq!(assigns.len(), 2);
        let Register::SymbolAssign { value, .. } = hir.get(assigns[0]) else { unreachable!() };
        let Register::Symbol { .. } = hir.get(*value) else {
            panic!("`a`'s value should lower straight to b's shared Symbol register")
        };
    }

    #[test]
    fn rule_declaration_binds_its_pattern_variable_into_the_rhs() {
        let (hir, diags, _interner) = lower_source("f(?x) = x;");
        assert!(diags.is_empty(), "{diags:?}");
        let rule = hir.ids().find(|id| matches!(hir.get(*id), Register::SymbolRule { .. })).expect("one rule");
        let Register::SymbolRule { lhs, rhs, is_up_value, .. } = hir.get(rule) else { unreachable!() };
        assert!(!*is_up_value);
        let Register::Call { arg, is_pattern, .. } = hir.get(*lhs) else { panic!("lhs should be a pattern call") };
        assert!(*is_pattern);
        assert_eq!(arg, rhs, "the rule's rhs should reference the same register as its pattern argument");
    }

    #[test]
    fn undefined_identifier_is_a_diagnostic_not_a_panic() {
        let (_hir, diags, _interner) = lower_source("x = y;");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("undefined identifier"));
    }

    #[test]
    fn lambda_binder_is_visible_only_inside_its_own_body() {
        let (hir, diags, _interner) = lower_source("id = \\x x;");
        assert!(diags.is_empty(), "{diags:?}");
        let lambda = hir.ids().find(|id| matches!(hir.get(*id), Register::Lambda { .. })).expect("one lambda");
        let Register::Lambda { arg: Some(arg), body, .. } = hir.get(lambda) else { panic!("expected a named lambda") };
        assert_eq!(*body, *arg, "the body `x` should resolve to the lambda's own binder");
    }

    #[test]
    fn member_access_on_a_builtin_seed_lowers_to_a_member_access_register() {
        let (hir, diags, _interner) = lower_source("x = Level.succ;");
        assert!(diags.is_empty(), "{diags:?}");
        let accesses = hir.ids().filter(|id| matches!(hir.get(*id), Register::MemberAccess { .. })).count();
        // one for `builtin` (seeded), one for `Level` (seeded), one for `.succ`.
        assert!(accesses >= 3, "expected at least the seeded builtin/Level accesses plus .succ, got {accesses}");
    }
}
