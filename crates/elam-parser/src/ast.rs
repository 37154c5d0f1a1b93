//! AST node shapes. These mirror the forms `SPEC_FULL.md` §11 says
//! AST→HIR lowering consumes; everything else in the surface grammar
//! (blocks, structs, `if`/`while`, ...) parses to [`Decl::Unsupported`] /
//! [`Expr::Unsupported`] so lowering can reject it with one diagnostic
//! instead of the parser choking on it.

use elam_common::{Atom, Span};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallColor {
    /// `f(a)` — ordinary application.
    Explicit,
    /// `f[a]` — erased/implicit application.
    Erased,
}

/// `variable(name, type?)` — a binder occurrence, as opposed to an
/// `identifier` reference to one.
#[derive(Clone, Debug)]
pub struct Binder {
    pub name: Atom,
    pub ty: Option<Box<Expr>>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum Expr {
    Identifier(Atom, Span),
    Number(i64, Span),
    String(Atom, Span),
    /// `fn-type(inputArgList|singleType, output)`. A named argument list
    /// (`(a: T, b: U) -> V`) carries one entry per argument; an unnamed
    /// single-type arrow (`T -> U`) carries exactly one unnamed entry.
    FnType { args: Vec<FnTypeArg>, output: Box<Expr>, span: Span },
    /// `lambda(arg, body)`.
    Lambda { arg: Binder, erased: bool, body: Box<Expr>, span: Span },
    /// `call(fn, arg?, color)`. `arg` is `None` for a niladic erased call
    /// site such as a bare type constructor reference.
    Call { callee: Box<Expr>, arg: Option<Box<Expr>>, color: CallColor, span: Span },
    /// `member-access(lhs, identifier)`.
    MemberAccess { lhs: Box<Expr>, member: Atom, span: Span },
    /// `pattern(name?)`. Only legal inside a rule declaration's argument
    /// list; lowering rejects it anywhere else.
    Pattern { name: Option<Atom>, span: Span },
    Paren(Box<Expr>),
    /// A construct the core language doesn't elaborate (struct literal,
    /// binary operator, block, ...). Carried through so lowering can point
    /// at exactly where the unsupported syntax started.
    Unsupported(Span),
}

#[derive(Clone, Debug)]
pub struct FnTypeArg {
    pub name: Option<Atom>,
    pub erased: bool,
    pub ty: Expr,
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Identifier(_, s)
            | Expr::Number(_, s)
            | Expr::String(_, s)
            | Expr::FnType { span: s, .. }
            | Expr::Lambda { span: s, .. }
            | Expr::Call { span: s, .. }
            | Expr::MemberAccess { span: s, .. }
            | Expr::Pattern { span: s, .. }
            | Expr::Unsupported(s) => *s,
            Expr::Paren(inner) => inner.span(),
        }
    }
}

/// `module-decl(lhs, rhs?, type?)`: `name : Type = value;`, `name : Type;`,
/// `name = value;`, or a rule declaration `name(pattern-args) = rhs;`.
#[derive(Clone, Debug)]
pub enum Decl {
    Module { name: Atom, ty: Option<Expr>, value: Option<Expr>, span: Span },
    Rule { name: Atom, params: Vec<Expr>, rhs: Expr, span: Span },
    /// A top-level statement the core language doesn't elaborate.
    Unsupported(Span),
}

/// `module(name, decls)` — the whole source file is lowered as one
/// implicit top-level module.
#[derive(Clone, Debug)]
pub struct Module {
    pub decls: Vec<Decl>,
}
