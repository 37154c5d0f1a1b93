//! Recursive-descent parser with one token of lookahead. `->` is
//! right-associative and binds loosest; application (juxtaposition via
//! `(`/`[`) binds tightest.

use elam_common::{Diagnostic, Interner, Span};
use elam_lexer::{Lexer, Spanned, Token};

use crate::ast::{Binder, CallColor, Decl, Expr, FnTypeArg, Module};

pub struct Parser<'src> {
    lexer: Lexer<'src>,
    interner: &'src mut Interner,
    current: Spanned<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, interner: &'src mut Interner) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token(interner);
        Parser { lexer, interner, current, diagnostics: Vec::new() }
    }

    fn bump(&mut self) -> Spanned<Token> {
        let prev = self.current;
        self.current = self.lexer.next_token(self.interner);
        prev
    }

    fn at(&self, token: Token) -> bool {
        self.current.value == token
    }

    fn expect(&mut self, token: Token) -> Option<Spanned<Token>> {
        if self.at(token) {
            Some(self.bump())
        } else {
            self.diagnostics.push(Diagnostic::error(
                self.current.span,
                format!("expected {}, found {}", token.describe(), self.current.value.describe()),
            ));
            None
        }
    }

    /// Parse a whole file as an implicit top-level module.
    pub fn parse_module(mut self) -> (Module, Vec<Diagnostic>) {
        let mut decls = Vec::new();
        while !self.at(Token::Eof) {
            match self.parse_decl() {
                Some(decl) => decls.push(decl),
                None => {
                    // Resynchronize on the next `;` so one malformed
                    // declaration doesn't swallow the rest of the file.
                    while !self.at(Token::Semicolon) && !self.at(Token::Eof) {
                        self.bump();
                    }
                    if self.at(Token::Semicolon) {
                        self.bump();
                    }
                }
            }
        }
        self.diagnostics.extend(std::mem::take(&mut self.lexer.diagnostics));
        (Module { decls }, self.diagnostics)
    }

    fn parse_decl(&mut self) -> Option<Decl> {
        match self.current.value {
            Token::If
            | Token::While
            | Token::Struct
            | Token::Enum
            | Token::Inductive
            | Token::Defer
            | Token::Var
            | Token::Let
            | Token::LBrace => {
                let start = self.current.span;
                self.bump();
                self.diagnostics.push(Diagnostic::error(
                    start,
                    "this construct is not part of the elaborated core language",
                ));
                Some(Decl::Unsupported(start))
            }
            Token::Identifier(name) => self.parse_decl_from_identifier(name),
            _ => {
                let span = self.current.span;
                self.diagnostics.push(Diagnostic::error(
                    span,
                    format!("expected a declaration, found {}", self.current.value.describe()),
                ));
                None
            }
        }
    }

    fn parse_decl_from_identifier(&mut self, name: elam_common::Atom) -> Option<Decl> {
        let start = self.current.span;
        self.bump();

        if self.at(Token::LParen) {
            // Rule declaration: name(pattern-args) = rhs;
            let params = self.parse_paren_list(Self::parse_rule_param)?;
            self.expect(Token::Eq)?;
            let rhs = self.parse_expr()?;
            let end = self.current.span;
            self.expect(Token::Semicolon)?;
            return Some(Decl::Rule { name, params, rhs, span: start.merge(end) });
        }

        let ty = if self.at(Token::Colon) {
            self.bump();
            Some(self.parse_expr()?)
        } else {
            None
        };
        let value = if self.at(Token::Eq) {
            self.bump();
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end = self.current.span;
        self.expect(Token::Semicolon)?;
        Some(Decl::Module { name, ty, value, span: start.merge(end) })
    }

    fn parse_rule_param(&mut self) -> Option<Expr> {
        if self.at(Token::Question) {
            let start = self.current.span;
            self.bump();
            let name = if let Token::Identifier(atom) = self.current.value {
                self.bump();
                Some(atom)
            } else {
                None
            };
            Some(Expr::Pattern { name, span: start })
        } else {
            self.parse_expr()
        }
    }

    fn parse_paren_list<T>(
        &mut self,
        mut item: impl FnMut(&mut Self) -> Option<T>,
    ) -> Option<Vec<T>> {
        self.expect(Token::LParen)?;
        let mut items = Vec::new();
        if !self.at(Token::RParen) {
            loop {
                items.push(item(self)?);
                if self.at(Token::Comma) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;
        Some(items)
    }

    pub fn parse_expr(&mut self) -> Option<Expr> {
        self.parse_arrow()
    }

    /// `->` is right-associative and the lowest-precedence form.
    fn parse_arrow(&mut self) -> Option<Expr> {
        let lhs = self.parse_application()?;
        if self.at(Token::Arrow) {
            self.bump();
            let rhs = self.parse_arrow()?;
            let span = lhs.span().merge(rhs.span());
            let arg = FnTypeArg { name: None, erased: false, ty: lhs };
            return Some(Expr::FnType { args: vec![arg], output: Box::new(rhs), span });
        }
        Some(lhs)
    }

    /// Application and member access bind tightest, left-associative.
    fn parse_application(&mut self) -> Option<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.current.value {
                Token::LParen | Token::LBracket | Token::Dot => {
                    expr = self.apply_one_suffix(expr)?;
                }
                _ => break,
            }
        }
        Some(expr)
    }

    fn parse_binder(&mut self) -> Option<Binder> {
        let span = self.current.span;
        let Token::Identifier(name) = self.current.value else {
            self.diagnostics
                .push(Diagnostic::error(span, "expected a binder name"));
            return None;
        };
        self.bump();
        let ty = if self.at(Token::Colon) {
            self.bump();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        Some(Binder { name, ty, span })
    }

    fn parse_atom(&mut self) -> Option<Expr> {
        let span = self.current.span;
        match self.current.value {
            Token::Identifier(atom) => {
                self.bump();
                Some(Expr::Identifier(atom, span))
            }
            Token::Number(n) => {
                self.bump();
                Some(Expr::Number(n, span))
            }
            Token::String(atom) => {
                self.bump();
                Some(Expr::String(atom, span))
            }
            Token::Backslash | Token::DoubleBackslash => {
                let erased = self.current.value == Token::DoubleBackslash;
                self.bump();
                let arg = self.parse_binder()?;
                let body = self.parse_expr()?;
                let full = span.merge(body.span());
                Some(Expr::Lambda { arg, erased, body: Box::new(body), span: full })
            }
            Token::LParen => self.parse_paren_or_fn_type(),
            Token::LBracket => self.parse_erased_fn_type(),
            Token::Break | Token::Continue | Token::Return => {
                self.bump();
                self.diagnostics.push(Diagnostic::error(
                    span,
                    "this construct is not part of the elaborated core language",
                ));
                Some(Expr::Unsupported(span))
            }
            _ => {
                self.bump();
                self.diagnostics.push(Diagnostic::error(
                    span,
                    format!("unexpected token {}", self.current.value.describe()),
                ));
                None
            }
        }
    }

    /// Either a parenthesized expression `(e)` or a named-argument
    /// function type `(a: T, b: U) -> V`. Disambiguated by peeking: a
    /// binder must be `identifier :`.
    fn parse_paren_or_fn_type(&mut self) -> Option<Expr> {
        let start = self.current.span;
        self.bump(); // consume '('
        if self.at(Token::RParen) {
            self.bump();
            self.expect(Token::Arrow)?;
            let output = self.parse_arrow()?;
            let span = start.merge(output.span());
            return Some(Expr::FnType { args: Vec::new(), output: Box::new(output), span });
        }

        let first_expr_or_binder = self.parse_paren_arg()?;
        let mut args = vec![first_expr_or_binder];
        while self.at(Token::Comma) {
            self.bump();
            args.push(self.parse_paren_arg()?);
        }
        self.expect(Token::RParen)?;

        if self.at(Token::Arrow) {
            self.bump();
            let output = self.parse_arrow()?;
            let span = start.merge(output.span());
            return Some(Expr::FnType { args, output: Box::new(output), span });
        }

        // Not a function type: must have been a single parenthesized
        // expression.
        if args.len() != 1 {
            self.diagnostics.push(Diagnostic::error(
                start,
                "comma-separated list is only valid in a function type's argument list",
            ));
            return None;
        }
        let arg = args.pop().expect("checked len == 1");
        Some(Expr::Paren(Box::new(arg.ty)))
    }

    fn parse_erased_fn_type(&mut self) -> Option<Expr> {
        let start = self.current.span;
        self.bump();
        let binder = self.parse_binder()?;
        self.expect(Token::RBracket)?;
        self.expect(Token::Arrow)?;
        let output = self.parse_arrow()?;
        let span = start.merge(output.span());
        let ty = binder.ty.map(|b| *b).unwrap_or(Expr::Unsupported(Span::dummy()));
        let arg = FnTypeArg { name: Some(binder.name), erased: true, ty };
        Some(Expr::FnType { args: vec![arg], output: Box::new(output), span })
    }

    /// One entry inside a parenthesized function-type argument list or a
    /// plain parenthesized expression: `name : T` or a bare expression.
    fn parse_paren_arg(&mut self) -> Option<FnTypeArg> {
        if let Token::Identifier(name) = self.current.value {
            // Lookahead: `name :` means a binder; otherwise fall through
            // to parsing a full expression (which may itself start with
            // this identifier).
            let saved = self.bump();
            if self.at(Token::Colon) {
                self.bump();
                let ty = self.parse_expr()?;
                return Some(FnTypeArg { name: Some(name), erased: false, ty });
            }
            // Not a binder: re-synthesize the identifier expression and
            // keep parsing as an ordinary expression (application,
            // member access, ...).
            let ident = Expr::Identifier(name, saved.span);
            let expr = self.continue_application_from(ident)?;
            return Some(FnTypeArg { name: None, erased: false, ty: expr });
        }
        let ty = self.parse_expr()?;
        Some(FnTypeArg { name: None, erased: false, ty })
    }

    /// Continue parsing application/member-access/arrow suffixes after an
    /// atom that has already been consumed (used when `parse_paren_arg`'s
    /// lookahead determines the identifier it just read was not a binder).
    fn continue_application_from(&mut self, mut expr: Expr) -> Option<Expr> {
        loop {
            match self.current.value {
                Token::LParen | Token::LBracket | Token::Dot => {
                    // Re-dispatch through parse_application's suffix loop
                    // by temporarily treating `expr` as the atom already
                    // read.
                    expr = self.apply_one_suffix(expr)?;
                }
                Token::Arrow => {
                    self.bump();
                    let rhs = self.parse_arrow()?;
                    let span = expr.span().merge(rhs.span());
                    let arg = FnTypeArg { name: None, erased: false, ty: expr };
                    expr = Expr::FnType { args: vec![arg], output: Box::new(rhs), span };
                }
                _ => break,
            }
        }
        Some(expr)
    }

    fn apply_one_suffix(&mut self, expr: Expr) -> Option<Expr> {
        match self.current.value {
            Token::LParen => {
                let start = expr.span();
                let args = self.parse_paren_list(Self::parse_expr)?;
                let end = self.current.span;
                if args.is_empty() {
                    return Some(Expr::Call {
                        callee: Box::new(expr),
                        arg: None,
                        color: CallColor::Explicit,
                        span: start.merge(end),
                    });
                }
                let mut call = expr;
                for arg in args {
                    call = Expr::Call {
                        callee: Box::new(call),
                        arg: Some(Box::new(arg)),
                        color: CallColor::Explicit,
                        span: start.merge(end),
                    };
                }
                Some(call)
            }
            Token::LBracket => {
                let start = expr.span();
                self.bump();
                let arg = self.parse_expr()?;
                let end = self.current.span;
                self.expect(Token::RBracket)?;
                Some(Expr::Call {
                    callee: Box::new(expr),
                    arg: Some(Box::new(arg)),
                    color: CallColor::Erased,
                    span: start.merge(end),
                })
            }
            Token::Dot => {
                self.bump();
                let member_span = self.current.span;
                let Token::Identifier(member) = self.current.value else {
                    self.diagnostics
                        .push(Diagnostic::error(member_span, "expected a member name after '.'"));
                    return None;
                };
                self.bump();
                let span = expr.span().merge(member_span);
                Some(Expr::MemberAccess { lhs: Box::new(expr), member, span })
            }
            _ => Some(expr),
        }
    }
}
