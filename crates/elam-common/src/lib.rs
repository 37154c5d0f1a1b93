//! Common types and utilities shared by every `elam` crate.
//!
//! - String interning (`Atom`, `Interner`)
//! - Source spans (`Span`, `Spanned`, `SpanBuilder`)
//! - Diagnostics (`Diagnostic`, `DiagnosticCategory`)
//! - Centralized limits and thresholds

pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticCategory};

pub mod interner;
pub use interner::{Atom, Interner};

pub mod span;
pub use span::{Span, SpanBuilder, Spanned};

pub mod limits;
