//! Reads a source file, runs it through lex → parse → lower → elaborate,
//! and reports every diagnostic raised along the way. Parse errors short
//! circuit before lowering begins (there is no HIR to lower from a tree
//! the parser refused to build); lowering diagnostics do not short
//! circuit, since a lowering error only degrades one register to a
//! filler `Unknown` and leaves the rest of the program elaborable.

use std::fs;
use std::path::Path;

use elam_common::{Diagnostic, Interner};
use elam_parser::Parser;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("could not read `{path}`: {source}")]
    Io { path: String, #[source] source: std::io::Error },
}

/// Outcome of a full run: every diagnostic collected, plus whether the
/// run should be considered successful (`diagnostics.is_empty()`).
pub struct RunResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl RunResult {
    pub fn exit_code(&self) -> i32 {
        if self.diagnostics.is_empty() {
            0
        } else {
            1
        }
    }
}

pub fn run(entry_file: &Path) -> Result<RunResult, DriverError> {
    let source = fs::read_to_string(entry_file)
        .map_err(|source| DriverError::Io { path: entry_file.display().to_string(), source })?;

    let mut interner = Interner::new();

    let parser = Parser::new(&source, &mut interner);
    let (module, parse_diagnostics) = parser.parse_module();
    debug!(decls = module.decls.len(), "parsed module");
    if !parse_diagnostics.is_empty() {
        debug!(count = parse_diagnostics.len(), "parse errors, skipping elaboration");
        return Ok(RunResult { diagnostics: parse_diagnostics });
    }

    let lowered = elam_lower::lower(&module, &mut interner);
    debug!(registers = lowered.hir.len(), "lowered to HIR");

    let graph = elam_elab::new_graph_with_builtins(&mut interner);
    let elaborated = elam_elab::elaborate(graph, &lowered.hir);
    debug!(count = elaborated.diagnostics.len(), "elaboration finished");

    let mut diagnostics = lowered.diagnostics;
    diagnostics.extend(elaborated.diagnostics.iter().map(|d| d.render(&elaborated.graph, &interner)));

    Ok(RunResult { diagnostics })
}
