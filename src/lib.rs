//! MomoScript core: a syntactic parser and a stateful semantic compiler
//! that together turn MomoScript source text into a JSON-shaped IR for a
//! downstream typesetting template.
//!
//! The crate has no file I/O, no logging, and no global state (spec §5,
//! §9) — every entry point takes its configuration and collaborators as
//! plain parameters.

pub mod ast;
pub mod common;
pub mod diagnostics;
pub mod ir;
pub mod lexer;
pub mod mode;
pub mod pack;
pub mod semantic;
pub mod span;

use diagnostics::{Diagnostic, Warning};
use ir::Ir;
use mode::ModeFlags;
use pack::PackRegistry;

/// The outcome of running the full pipeline on one source document (spec
/// §7): either a complete, self-consistent IR, or the first fatal
/// diagnostic encountered during parsing or compilation.
pub enum CompileOutcome {
    Success { ir: Ir, warnings: Vec<Warning> },
    Failed { diagnostics: Vec<Diagnostic> },
}

/// Parse and compile `source` in one step. The compiler never runs on a
/// parse that reported any error (spec §7.2) — a non-empty parser
/// diagnostic list is returned immediately as `Failed`.
pub fn run(source: &str, mode: ModeFlags, pack_registry: &dyn PackRegistry) -> CompileOutcome {
    let (ast, parse_diagnostics) = lexer::parse(source, mode);
    if !parse_diagnostics.is_empty() {
        return CompileOutcome::Failed {
            diagnostics: parse_diagnostics,
        };
    }
    let (ir, compile_diagnostics, warnings) = semantic::compile(&ast, mode, pack_registry);
    if !compile_diagnostics.is_empty() {
        return CompileOutcome::Failed {
            diagnostics: compile_diagnostics,
        };
    }
    CompileOutcome::Success { ir, warnings }
}
