//! Elaboration-level diagnostics, per `spec.md` §7: an
//! `UnresolvedConstraint` for every constraint still active when the
//! solver stalls, and an `Uninferred` for every HIR register that never
//! resolved to a value.

use elam_common::{Diagnostic, Interner, Span};

use crate::constraints::Constraint;
use crate::graph::Graph;
use crate::hir::RegisterId;
use crate::stringifier::stringify;

#[derive(Clone, Debug)]
pub enum ElabDiagnostic {
    UnresolvedConstraint(Constraint),
    Uninferred(RegisterId),
}

impl ElabDiagnostic {
    pub fn render(&self, graph: &Graph, interner: &Interner) -> Diagnostic {
        match self {
            ElabDiagnostic::UnresolvedConstraint(c) => {
                Diagnostic::error(Span::dummy(), format!("unresolved constraint: {}", describe_constraint(graph, interner, c)))
            }
            ElabDiagnostic::Uninferred(register) => {
                Diagnostic::error(Span::dummy(), format!("could not infer a value for register {}", register.index()))
            }
        }
    }
}

fn describe_constraint(graph: &Graph, interner: &Interner, constraint: &Constraint) -> String {
    match constraint {
        Constraint::Equal(a, b) => {
            format!("{} =?= {}", stringify(graph, interner, a), stringify(graph, interner, b))
        }
        Constraint::EqualWithReplace { target, source, .. } => {
            format!("?{} =?= ?{} (with replacement)", target.index(), source.index())
        }
        Constraint::FnTypeType(target, input, output) => {
            format!(
                "?{} =?= typeof(({}) -> {})",
                target.index(),
                stringify(graph, interner, input),
                stringify(graph, interner, output)
            )
        }
        Constraint::Typeof(target, source) => {
            format!("?{} =?= typeof({})", target.index(), stringify(graph, interner, source))
        }
    }
}
