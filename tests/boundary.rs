//! Boundary tests enumerated in spec §8.

#[path = "support.rs"]
mod support;

use momoscript::diagnostics::DiagnosticKind;
use momoscript::mode::ModeFlags;
use momoscript::{run, CompileOutcome};
use support::test_registry;

fn diagnostics_for(source: &str) -> Vec<momoscript::diagnostics::Diagnostic> {
    let registry = test_registry();
    match run(source, ModeFlags::default(), &registry) {
        CompileOutcome::Success { .. } => Vec::new(),
        CompileOutcome::Failed { diagnostics } => diagnostics,
    }
}

#[test]
fn empty_file_yields_empty_chat_and_meta() {
    let registry = test_registry();
    match run("", ModeFlags::default(), &registry) {
        CompileOutcome::Success { ir, .. } => {
            assert!(ir.chat.is_empty());
            assert!(ir.meta.iter().next().is_none());
        }
        CompileOutcome::Failed { diagnostics } => panic!("empty file should compile: {diagnostics:?}"),
    }
}

#[test]
fn header_only_file_yields_empty_chat_and_populated_meta() {
    let registry = test_registry();
    let source = "@title: Test Title\n@author: Someone\n";
    match run(source, ModeFlags::default(), &registry) {
        CompileOutcome::Success { ir, .. } => {
            assert!(ir.chat.is_empty());
            assert_eq!(ir.meta.get("title"), Some("Test Title"));
            assert_eq!(ir.meta.get("author"), Some("Someone"));
        }
        CompileOutcome::Failed { diagnostics } => panic!("header-only file should compile: {diagnostics:?}"),
    }
}

#[test]
fn leading_continuation_line_errors_at_line_one() {
    let diags = diagnostics_for("just a continuation, no statement before it\n");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind, DiagnosticKind::ContinuationBeforeStatement);
    assert_eq!(diags[0].span.start.line, 1);
}

#[test]
fn unclosed_block_reports_unclosed_block() {
    let diags = diagnostics_for("> 星野: \"\"\"\nunterminated content\n");
    assert!(diags.iter().any(|d| d.kind == DiagnosticKind::UnclosedBlock));
}

#[test]
fn nested_reply_is_rejected() {
    let source = "@reply\n是\n@reply\n否\n@end\n@end\n";
    let diags = diagnostics_for(source);
    assert!(diags.iter().any(|d| d.kind == DiagnosticKind::NestedDirective));
}

#[test]
fn pagebreak_with_argument_is_rejected() {
    let diags = diagnostics_for("@pagebreak abc\n");
    assert!(diags
        .iter()
        .any(|d| d.kind == DiagnosticKind::BadMarkerOnPagebreak));
}

#[test]
fn backref_out_of_range_history_length_two() {
    let diags = diagnostics_for("> 星野: a\n> 白子: b\n> _5:\n");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].kind, DiagnosticKind::BackrefOutOfRange);
}

#[test]
fn empty_reply_block_is_rejected() {
    let diags = diagnostics_for("@reply\n@end\n");
    assert!(diags.iter().any(|d| d.kind == DiagnosticKind::EmptyReply));
}

#[test]
fn unknown_directive_is_rejected() {
    let diags = diagnostics_for("@notarealdirective foo\n");
    assert!(diags.iter().any(|d| d.kind == DiagnosticKind::UnknownDirective));
}

#[test]
fn header_only_key_after_body_is_rejected() {
    let source = "> 星野: 你好\n@title: too late\n";
    let diags = diagnostics_for(source);
    assert!(diags
        .iter()
        .any(|d| d.kind == DiagnosticKind::HeaderKeyAfterBody));
}

#[test]
fn no_current_speaker_without_default_errors() {
    // Left side has no `__Sensei`-style default (spec §4.2), so an omitted
    // marker with no prior left speaker is fatal.
    let diags = diagnostics_for("> _no_such_name_but_none_marker\n");
    // Marker::None path: content has no colon at all, so this line is a
    // statement with marker None and content "_no_such_name_but_none_marker".
    assert!(diags
        .iter()
        .any(|d| d.kind == DiagnosticKind::NoCurrentSpeaker));
}

#[test]
fn right_side_defaults_to_sensei_with_no_history() {
    let registry = test_registry();
    let source = "< 你好\n";
    match run(source, ModeFlags::default(), &registry) {
        CompileOutcome::Success { ir, .. } => match &ir.chat[0] {
            momoscript::ir::ChatLine::Text(t) => assert_eq!(t.char_id, "__Sensei"),
            other => panic!("expected text, got {other:?}"),
        },
        CompileOutcome::Failed { diagnostics } => panic!("compile failed: {diagnostics:?}"),
    }
}
