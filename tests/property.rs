//! Property-based tests for the universal invariants in spec §8
//! (determinism, segment totality, no-panic parsing), complementing the
//! concrete `rstest` cases in `tests/invariants.rs`. Grounded on the
//! teacher's `proptest` dev-dependency, used here the same way the teacher
//! fuzzes its tokenizer/scanner layers against generated inputs.

#[path = "support.rs"]
mod support;

use momoscript::mode::ModeFlags;
use momoscript::semantic::segments::parse_segments;
use momoscript::{run, CompileOutcome};
use proptest::prelude::*;
use support::test_registry;

/// Text with no newline, backslash, bracket, paren, or quote characters —
/// none of the inline-segment or block-opener grammars can trigger on it, so
/// it is always safe both as statement content and as `parse_segments`
/// input whose output is a single literal `text` segment.
fn arbitrary_plain_text() -> impl Strategy<Value = String> {
    r#"[^\n\r\\\[\]()"]{0,40}"#
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// The parser must never panic on malformed input (spec §9): it fails
    /// by emitting a diagnostic and returning. `parse_segments` is the one
    /// hand-written character-by-character scanner in the crate, so it gets
    /// the fuzz treatment directly.
    #[test]
    fn segment_parsing_never_panics_on_arbitrary_input(s in ".{0,200}") {
        let _ = parse_segments(&s, false);
        let _ = parse_segments(&s, true);
    }

    /// Segment totality (spec §8 property 6), restricted to text with none
    /// of the bracket/paren/escape grammar in it: the whole string must
    /// come back as exactly one `text` segment, unchanged.
    #[test]
    fn bracket_free_text_is_a_single_untouched_text_segment(s in arbitrary_plain_text()) {
        let segs = parse_segments(&s, false);
        if s.is_empty() {
            prop_assert!(segs.is_empty());
        } else {
            prop_assert_eq!(segs.len(), 1);
            match &segs[0] {
                momoscript::semantic::segments::RawSegment::Text(t) => prop_assert_eq!(t, &s),
                other => prop_assert!(false, "expected a single text segment, got {:?}", other),
            }
        }
    }

    /// Deterministic output (spec §8 property 1): for a fixed generated
    /// document, `compile` must produce byte-identical IR JSON every time.
    #[test]
    fn generated_documents_compile_deterministically(
        names in prop::collection::vec(prop::sample::select(vec!["星野", "白子", "梦", "日富美"]), 1..8),
        texts in prop::collection::vec(arbitrary_plain_text(), 1..8),
    ) {
        let registry = test_registry();
        let n = names.len().min(texts.len());
        let mut source = String::new();
        for i in 0..n {
            let line = if texts[i].trim().is_empty() { "x" } else { texts[i].as_str() };
            source.push_str("> ");
            source.push_str(names[i]);
            source.push_str(": ");
            source.push_str(line);
            source.push('\n');
        }

        let first = match run(&source, ModeFlags::default(), &registry) {
            CompileOutcome::Success { ir, .. } => serde_json::to_string(&ir).unwrap(),
            CompileOutcome::Failed { diagnostics } => {
                prop_assert!(false, "unexpected compile failure: {:?}", diagnostics);
                return Ok(());
            }
        };
        let second = match run(&source, ModeFlags::default(), &registry) {
            CompileOutcome::Success { ir, .. } => serde_json::to_string(&ir).unwrap(),
            CompileOutcome::Failed { diagnostics } => {
                prop_assert!(false, "unexpected compile failure on second run: {:?}", diagnostics);
                return Ok(());
            }
        };
        prop_assert_eq!(first, second);

        // History consistency (spec §8 property 3): every emitted TEXT
        // line's char_id must have been the front of that side's history by
        // the time of the *next* same-side statement, which we approximate
        // here by checking no side ever regresses to an empty char_id.
        match run(&source, ModeFlags::default(), &registry) {
            CompileOutcome::Success { ir, .. } => {
                for line in &ir.chat {
                    if let momoscript::ir::ChatLine::Text(t) = line {
                        prop_assert!(!t.char_id.is_empty());
                    }
                }
            }
            CompileOutcome::Failed { diagnostics } => {
                prop_assert!(false, "unexpected compile failure on third run: {:?}", diagnostics);
            }
        }
    }
}
