//! End-to-end scenarios from spec §8 ("Concrete end-to-end scenarios") plus
//! the Open Question decisions pinned in DESIGN.md.

#[path = "support.rs"]
mod support;

use momoscript::ir::{ChatLine, Segment};
use momoscript::mode::ModeFlags;
use momoscript::{run, CompileOutcome};
use support::test_registry;

fn compile_ok(source: &str) -> momoscript::ir::Ir {
    let registry = test_registry();
    match run(source, ModeFlags::default(), &registry) {
        CompileOutcome::Success { ir, .. } => ir,
        CompileOutcome::Failed { diagnostics } => {
            panic!("expected successful compile, got diagnostics: {diagnostics:?}")
        }
    }
}

fn char_ids(ir: &momoscript::ir::Ir) -> Vec<String> {
    ir.chat
        .iter()
        .filter_map(|line| match line {
            ChatLine::Text(t) => Some(t.char_id.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn s1_speaker_history_and_backref() {
    let source = "> 星野: 早上好\n> 白子: 哦\n> _:\n";
    let ir = compile_ok(source);

    assert_eq!(
        char_ids(&ir),
        vec!["ba.星野".to_string(), "ba.白子".to_string(), "ba.星野".to_string()]
    );
    assert_eq!(ir.chat.len(), 3);
}

#[test]
fn s2_tmp_alias_scope() {
    let source = "@tmpalias 星野=星野(一年级)\n> 星野: 你好\n> 白子: 嗨\n> 星野: 你好\n";
    let ir = compile_ok(source);

    let overrides: Vec<Option<String>> = ir
        .chat
        .iter()
        .filter_map(|line| match line {
            ChatLine::Text(t) => Some(t.yuzutalk.name_override.clone()),
            _ => None,
        })
        .collect();

    assert_eq!(
        overrides,
        vec![
            Some("星野(一年级)".to_string()),
            None,
            None,
        ]
    );
}

#[test]
fn s3_reply_with_inline_form() {
    let source = "- 老师出题\n@reply: 是 | 否 | 跳过\n";
    let ir = compile_ok(source);

    assert_eq!(ir.chat.len(), 2);
    match &ir.chat[0] {
        ChatLine::Narration(n) => assert_eq!(n.content, "老师出题"),
        other => panic!("expected narration, got {other:?}"),
    }
    match &ir.chat[1] {
        ChatLine::Reply(r) => {
            assert_eq!(r.items.len(), 3);
            assert_eq!(r.items[0].text, "是");
            assert_eq!(r.label, "回复");
        }
        other => panic!("expected reply, got {other:?}"),
    }
}

#[test]
fn s4_bond_with_default_text() {
    let source = "> 日富美: 让我们继续吧\n@bond\n";
    let ir = compile_ok(source);

    assert_eq!(ir.chat.len(), 2);
    match &ir.chat[1] {
        ChatLine::Bond(b) => assert_eq!(b.content, "进入日富美的羁绊剧情"),
        other => panic!("expected bond, got {other:?}"),
    }
}

#[test]
fn bare_bond_absorbs_a_following_continuation_line_exactly_once() {
    // A bare `@bond` followed by a plain line must pick up that line as its
    // content without duplicating it (the lookahead line is consumed once,
    // not re-scanned).
    let source = "> 日富美: 让我们继续吧\n@bond\n继续冒险\n";
    let ir = compile_ok(source);

    assert_eq!(ir.chat.len(), 2);
    match &ir.chat[1] {
        ChatLine::Bond(b) => assert_eq!(b.content, "继续冒险"),
        other => panic!("expected bond, got {other:?}"),
    }
}

#[test]
fn bare_bond_does_not_swallow_a_following_statement() {
    // A statement line right after a bare `@bond` is not a continuation
    // line (spec §4.1.3) and must be left for the next node, not absorbed
    // as bond content.
    let source = "@bond\n> 星野: 你好\n";
    let ir = compile_ok(source);

    assert_eq!(ir.chat.len(), 2);
    match &ir.chat[0] {
        ChatLine::Bond(b) => assert_eq!(b.content, "进入羁绊剧情"),
        other => panic!("expected bond, got {other:?}"),
    }
    match &ir.chat[1] {
        ChatLine::Text(t) => assert_eq!(t.char_id, "ba.星野"),
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn bond_block_form_reads_every_body_line() {
    let source = "@bond: \"\"\"\n第一行\n第二行\n\"\"\"\n";
    let ir = compile_ok(source);

    assert_eq!(ir.chat.len(), 1);
    match &ir.chat[0] {
        ChatLine::Bond(b) => assert_eq!(b.content, "第一行\n第二行"),
        other => panic!("expected bond, got {other:?}"),
    }
}

#[test]
fn bare_bond_followed_by_block_opener_reads_every_body_line() {
    let source = "@bond\n\"\"\"\n第一行\n第二行\n\"\"\"\n";
    let ir = compile_ok(source);

    assert_eq!(ir.chat.len(), 1);
    match &ir.chat[0] {
        ChatLine::Bond(b) => assert_eq!(b.content, "第一行\n第二行"),
        other => panic!("expected bond, got {other:?}"),
    }
}

#[test]
fn s5_pack_override_and_custom_char() {
    let source = "@charid yz 柚子\n@asset.yz_ava: https://example/a.png\n@avatarid yz yz_ava\n> yz: 你好\n";
    let ir = compile_ok(source);

    assert_eq!(ir.custom_chars.len(), 1);
    let custom = &ir.custom_chars[0].0;
    assert_eq!(custom.char_id, "yz");
    assert_eq!(custom.display_name, "柚子");
    assert_eq!(custom.avatar_ref, "https://example/a.png");

    match &ir.chat[0] {
        ChatLine::Text(t) => {
            assert_eq!(t.char_id, "yz");
            assert_eq!(t.side, "left");
            assert_eq!(t.yuzutalk.name_override, None);
            assert_eq!(t.avatar_override.as_deref(), Some("https://example/a.png"));
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn s6_typst_mode_inline_expression() {
    let source = "@typst: on\n> 梦: [:开心] 你看\n";
    let ir = compile_ok(source);

    match &ir.chat[0] {
        ChatLine::Text(t) => {
            assert_eq!(t.char_id, "ba.梦");
            assert_eq!(
                t.segments,
                vec![
                    Segment::Expr {
                        query: "开心".to_string(),
                        target_char_id: Some("ba.梦".to_string()),
                        line_no: None,
                    },
                    Segment::Text {
                        text: " 你看".to_string(),
                    },
                ]
            );
        }
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn unresolved_alias_target_is_dropped_with_warning() {
    let registry = test_registry();
    let source = "@alias 不存在的人=别名\n> 星野: 你好\n";
    match run(source, ModeFlags::default(), &registry) {
        CompileOutcome::Success { ir, warnings } => {
            assert!(!warnings.is_empty(), "expected a dropped-alias warning");
            match &ir.chat[0] {
                ChatLine::Text(t) => assert_eq!(t.yuzutalk.name_override, None),
                other => panic!("expected text, got {other:?}"),
            }
        }
        CompileOutcome::Failed { diagnostics } => {
            panic!("unresolved @alias target must warn, not fail: {diagnostics:?}")
        }
    }
}

#[test]
fn tmp_alias_survives_other_side_statement() {
    // The temp alias on 星野 (left) must persist across the intervening
    // right-side statement and only clear when the *same side* speaks a
    // different char_id (DESIGN.md Open Question #2).
    let source = "@tmpalias 星野=星野(一年级)\n> 星野: 你好\n< 白子: 嗨\n> 星野: 还在吗\n";
    let ir = compile_ok(source);

    let overrides: Vec<Option<String>> = ir
        .chat
        .iter()
        .filter_map(|line| match line {
            ChatLine::Text(t) => Some(t.yuzutalk.name_override.clone()),
            _ => None,
        })
        .collect();

    assert_eq!(
        overrides,
        vec![
            Some("星野(一年级)".to_string()),
            None,
            Some("星野(一年级)".to_string()),
        ]
    );
}
