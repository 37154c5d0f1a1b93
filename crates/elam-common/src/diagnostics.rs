//! Diagnostics collected while lexing, parsing, lowering, and elaborating a
//! source file. Nothing in this pipeline panics on malformed input; every
//! user-facing failure is a `Diagnostic` pushed onto a `Vec` and reported at
//! the end of the run.

use crate::span::Span;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticCategory {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Diagnostic { category: DiagnosticCategory::Error, span, message: message.into() }
    }

    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Diagnostic { category: DiagnosticCategory::Warning, span, message: message.into() }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.category {
            DiagnosticCategory::Error => "error",
            DiagnosticCategory::Warning => "warning",
        };
        write!(f, "{tag}[{}]: {}", self.span, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_category_and_span() {
        let d = Diagnostic::error(Span::new(3, 5), "oops");
        assert_eq!(d.to_string(), "error[3..5]: oops");
    }
}
