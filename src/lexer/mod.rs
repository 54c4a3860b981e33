//! Line classifier and AST builder (spec §4.1).
//!
//! Produces a flat, span-annotated node list from raw MomoScript source.
//! The classifier is a small state machine (`HEADER`/`BODY` plus the three
//! multi-line absorbing constructs: block, reply, bond) driven by a single
//! forward pass over 1-based source lines.

mod directive;

use crate::ast::{Marker, Node, NodeKind, ReplyItemRaw, Side, StatementKind};
use crate::common::{backref_regex, classify_open, global_index_regex, marker_head_regex, ContentOpen};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::mode::ModeFlags;
use crate::span::{Position, Span};

use directive::{parse_directive, ParsedDirective};

/// Parse MomoScript source text into a flat AST plus any diagnostics.
///
/// `mode.typst_mode` governs whether a blank line inside an
/// absorbing statement/bond is preserved as a literal blank line in the
/// content (Typst mode) or terminates the absorption (Plain mode) — see
/// DESIGN.md for why this crate threads `ModeFlags` into the parser rather
/// than only the compiler.
pub fn parse(source: &str, mode: ModeFlags) -> (Vec<Node>, Vec<Diagnostic>) {
    let normalized = normalize(source);
    let lines: Vec<&str> = normalized.split('\n').collect();

    let mut nodes = Vec::new();
    let mut diags = Vec::new();
    let mut body_started = false;
    let mut idx: usize = 0;

    while idx < lines.len() {
        let line_no = idx + 1;
        let raw = lines[idx];
        let (lead, trimmed) = crate::common::strip_leading_ws(raw);
        let start_col = lead + 1;

        if trimmed.is_empty() {
            idx += 1;
            continue;
        }

        if let Some(rest) = trimmed.strip_prefix('@') {
            match parse_directive(rest, line_no, start_col + 1, body_started) {
                ParsedDirective::Node(node) => {
                    check_header_gate(&node, body_started, &mut diags);
                    nodes.push(node);
                    idx += 1;
                }
                ParsedDirective::Error(d) => {
                    diags.push(d);
                    idx += 1;
                }
                ParsedDirective::OpenReplyBlock { origin_span } => {
                    idx += 1;
                    idx = consume_reply_block(&lines, idx, origin_span, &mut nodes, &mut diags);
                }
                ParsedDirective::OpenBond {
                    inline_content,
                    origin_line,
                } => {
                    idx += 1;
                    idx = consume_bond(
                        &lines,
                        idx,
                        inline_content,
                        origin_line,
                        mode,
                        &mut nodes,
                        &mut diags,
                    );
                }
                ParsedDirective::OpenTypstGlobalBlock {
                    first_line,
                    quote_len,
                    origin_line,
                } => {
                    idx += 1;
                    let origin_span = Span::on_line(origin_line, start_col, raw_char_len(raw) + 1);
                    let (next_idx, maybe_node) = consume_block(
                        &lines,
                        idx,
                        quote_len,
                        first_line,
                        origin_span,
                        &mut diags,
                        |content, end_line, end_col| {
                            Node::new(
                                NodeKind::TypstGlobal { value: content },
                                Span::new(
                                    Position::new(origin_line, start_col),
                                    Position::new(end_line, end_col),
                                ),
                            )
                        },
                    );
                    if let Some(node) = maybe_node {
                        nodes.push(node);
                    }
                    idx = next_idx;
                }
                ParsedDirective::EndReply => {
                    diags.push(Diagnostic::new(
                        DiagnosticKind::MalformedDirective,
                        "'@end' outside an @reply block",
                        Span::on_line(line_no, start_col, raw_char_len(raw) + 1),
                    ));
                    idx += 1;
                }
            }
            continue;
        }

        if let Some(side) = statement_prefix(trimmed) {
            body_started = true;
            idx = consume_statement(&lines, idx, side, mode, &mut nodes, &mut diags);
            continue;
        }

        // Plain continuation line with nothing open to absorb into.
        diags.push(Diagnostic::new(
            DiagnosticKind::ContinuationBeforeStatement,
            "continuation line has no preceding statement, reply, or bond to attach to",
            Span::on_line(line_no, start_col, raw_char_len(raw) + 1),
        ));
        body_started = true;
        idx += 1;
    }

    (nodes, diags)
}

fn raw_char_len(s: &str) -> usize {
    s.chars().count()
}

/// Normalize CRLF to LF and strip a leading UTF-8 BOM.
fn normalize(source: &str) -> String {
    let no_bom = source.strip_prefix('\u{FEFF}').unwrap_or(source);
    no_bom.replace("\r\n", "\n")
}

fn check_header_gate(node: &Node, body_started: bool, diags: &mut Vec<Diagnostic>) {
    if !body_started {
        return;
    }
    if let NodeKind::MetaKV { key, .. } = &node.kind {
        if directive::is_header_only_key(key) {
            diags.push(Diagnostic::new(
                DiagnosticKind::HeaderKeyAfterBody,
                format!("'@{}' is only valid before the first statement", key),
                node.span,
            ));
        }
    }
}

/// `None` if `trimmed` is not a valid `-`/`>`/`<` statement opener (the
/// marker character must be followed by at least one space, spec §4.1.3).
fn statement_prefix(trimmed: &str) -> Option<StatementKind> {
    let mut chars = trimmed.chars();
    let first = chars.next()?;
    let kind = match first {
        '-' => StatementKind::Narration,
        // Scenario S1 pins `>` lines to side_history[LEFT] (spec §8); `<`
        // is therefore RIGHT.
        '>' => StatementKind::Side(Side::Left),
        '<' => StatementKind::Side(Side::Right),
        _ => return None,
    };
    match chars.next() {
        Some(c) if c.is_whitespace() => Some(kind),
        _ => None,
    }
}

/// Split a `>`/`<` line's post-prefix text into `(marker, content_open)`.
/// `rest` is everything after the prefix char and its separating
/// whitespace, still containing its own interior whitespace verbatim.
fn split_marker(rest: &str) -> (Marker, &str) {
    let (lead, rest_trimmed) = crate::common::strip_leading_ws(rest);
    let _ = lead;
    if let Some(m) = marker_head_regex().find(rest_trimmed) {
        let matched = m.as_str();
        let after = &rest_trimmed[matched.len()..];
        if let Some(content) = after.strip_prefix(':') {
            let marker = classify_marker(matched);
            let (_, content_trimmed) = crate::common::strip_leading_ws(content);
            return (marker, content_trimmed);
        }
    }
    (Marker::None, rest_trimmed)
}

fn classify_marker(text: &str) -> Marker {
    if let Some(caps) = backref_regex().captures(text) {
        let n_str = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let n = if n_str.is_empty() {
            1
        } else {
            n_str.parse().unwrap_or(0)
        };
        return Marker::Backref(n);
    }
    if let Some(caps) = global_index_regex().captures(text) {
        let n: usize = caps[1].parse().unwrap_or(0);
        return Marker::Index(n);
    }
    Marker::Explicit(text.to_string())
}

fn consume_statement(
    lines: &[&str],
    start_idx: usize,
    kind: StatementKind,
    mode: ModeFlags,
    nodes: &mut Vec<Node>,
    diags: &mut Vec<Diagnostic>,
) -> usize {
    let line_no = start_idx + 1;
    let raw = lines[start_idx];
    let (lead, trimmed) = crate::common::strip_leading_ws(raw);
    let start_col = lead + 1;

    // Skip the prefix char and its separating whitespace.
    let mut chars = trimmed.char_indices();
    chars.next(); // the -, >, < char itself
    let mut rest_start = trimmed.len();
    for (i, c) in chars {
        if !c.is_whitespace() {
            rest_start = i;
            break;
        }
    }
    let rest = &trimmed[rest_start..];

    let (marker, content_text) = match kind {
        StatementKind::Narration => (Marker::None, rest),
        StatementKind::Side(_) => split_marker(rest),
    };

    match classify_open(content_text) {
        ContentOpen::Plain(first) => {
            let origin_span = Span::on_line(line_no, start_col, raw_char_len(raw) + 1);
            let (end_idx, content, end_span) =
                absorb_continuation(lines, start_idx + 1, first, mode, origin_span);
            nodes.push(Node::new(
                NodeKind::Statement {
                    kind,
                    marker,
                    content,
                },
                end_span,
            ));
            end_idx
        }
        ContentOpen::BlockOpen {
            quote_len,
            first_line,
        } => {
            let origin_span = Span::on_line(line_no, start_col, raw_char_len(raw) + 1);
            let (end_idx, maybe_node) = consume_block(
                lines,
                start_idx + 1,
                quote_len,
                first_line,
                origin_span,
                diags,
                |content, end_line, end_col| {
                    Node::new(
                        NodeKind::Block {
                            kind,
                            marker,
                            content,
                        },
                        Span::new(
                            Position::new(line_no, start_col),
                            Position::new(end_line, end_col),
                        ),
                    )
                },
            );
            if let Some(node) = maybe_node {
                nodes.push(node);
            }
            end_idx
        }
    }
}

/// Absorb continuation lines following an already-opened statement/bond
/// content string. Returns the next unconsumed line index, the joined
/// content, and the node's full span.
fn absorb_continuation(
    lines: &[&str],
    mut idx: usize,
    first: String,
    mode: ModeFlags,
    origin_span: Span,
) -> (usize, String, Span) {
    let sep = mode.join_continuation_with.separator();
    let mut content = first;
    let mut last_line = origin_span.start.line;
    let mut last_col = origin_span.end.column;

    while idx < lines.len() {
        let raw = lines[idx];
        let (lead, trimmed) = crate::common::strip_leading_ws(raw);

        if trimmed.is_empty() {
            if mode.typst_mode {
                content.push_str(sep);
                last_line = idx + 1;
                last_col = raw_char_len(raw) + 1;
                idx += 1;
                continue;
            } else {
                idx += 1;
                break;
            }
        }

        if trimmed.starts_with('@') || statement_prefix(trimmed).is_some() {
            break;
        }

        content.push_str(sep);
        content.push_str(trimmed);
        last_line = idx + 1;
        last_col = lead + raw_char_len(trimmed) + 1;
        idx += 1;
    }

    (
        idx,
        content,
        Span::new(origin_span.start, Position::new(last_line, last_col)),
    )
}

/// Consume a `"""`-delimited block body. Returns the next line index and
/// the constructed node (`None` if the block was never closed, in which
/// case an `UnclosedBlock` diagnostic has already been pushed).
fn consume_block<F>(
    lines: &[&str],
    mut idx: usize,
    quote_len: usize,
    first_line: Option<String>,
    origin_span: Span,
    diags: &mut Vec<Diagnostic>,
    build: F,
) -> (usize, Option<Node>)
where
    F: FnOnce(String, usize, usize) -> Node,
{
    let closer: String = std::iter::repeat('"').take(quote_len).collect();
    let mut body_lines: Vec<String> = Vec::new();
    if let Some(f) = first_line {
        body_lines.push(f);
    }

    while idx < lines.len() {
        let raw = lines[idx];
        if raw.trim() == closer {
            let content = body_lines.join("\n");
            let end_line = idx + 1;
            let end_col = raw_char_len(raw) + 1;
            return (idx + 1, Some(build(content, end_line, end_col)));
        }
        body_lines.push(raw.to_string());
        idx += 1;
    }

    diags.push(
        Diagnostic::new(
            DiagnosticKind::UnclosedBlock,
            "block opened with a run of `\"` was never closed",
            Span::on_line(
                origin_span.end.line,
                origin_span.end.column,
                origin_span.end.column,
            ),
        )
        .with_note("block opened here", origin_span),
    );
    (idx, None)
}

fn consume_reply_block(
    lines: &[&str],
    mut idx: usize,
    origin_span: Span,
    nodes: &mut Vec<Node>,
    diags: &mut Vec<Diagnostic>,
) -> usize {
    let mut items: Vec<ReplyItemRaw> = Vec::new();
    let mut end_line = origin_span.start.line;
    let mut end_col = origin_span.end.column;

    while idx < lines.len() {
        let raw = lines[idx];
        let (lead, trimmed) = crate::common::strip_leading_ws(raw);
        let line_no = idx + 1;

        if trimmed.is_empty() {
            idx += 1;
            continue;
        }

        if trimmed == "@end" {
            end_line = line_no;
            end_col = raw_char_len(raw) + 1;
            idx += 1;
            if items.is_empty() {
                diags.push(Diagnostic::new(
                    DiagnosticKind::EmptyReply,
                    "@reply block has no items",
                    Span::new(origin_span.start, Position::new(end_line, end_col)),
                ));
            } else {
                nodes.push(Node::new(
                    NodeKind::Reply { items },
                    Span::new(origin_span.start, Position::new(end_line, end_col)),
                ));
            }
            return idx;
        }

        if trimmed.starts_with("@reply") {
            diags.push(Diagnostic::new(
                DiagnosticKind::NestedDirective,
                "'@reply' cannot be nested inside another @reply block",
                Span::on_line(line_no, lead + 1, raw_char_len(raw) + 1),
            ));
            idx += 1;
            continue;
        }

        items.push(ReplyItemRaw {
            text: trimmed.to_string(),
            span: Span::on_line(line_no, lead + 1, lead + raw_char_len(trimmed) + 1),
        });
        end_line = line_no;
        end_col = raw_char_len(raw) + 1;
        idx += 1;
    }

    diags.push(
        Diagnostic::new(
            DiagnosticKind::MalformedDirective,
            "@reply block was never closed with @end",
            Span::on_line(end_line, end_col, end_col),
        )
        .with_note("@reply opened here", origin_span),
    );
    idx
}

/// What the line right after a bare `@bond` (no same-line content) looks
/// like, for deciding whether it is absorbed as bond content at all (spec
/// §4.1.3's definition of a continuation line: not blank, not a directive,
/// not a statement).
enum BondLookahead {
    /// Nothing to absorb; the line belongs to the outer parse loop.
    None,
    Continuation { first: String },
    Block {
        quote_len: usize,
        first_line: Option<String>,
    },
}

fn lookahead_bond_content(lines: &[&str], idx: usize) -> BondLookahead {
    let Some(raw) = lines.get(idx) else {
        return BondLookahead::None;
    };
    let (_, trimmed) = crate::common::strip_leading_ws(raw);
    if trimmed.is_empty() || trimmed.starts_with('@') || statement_prefix(trimmed).is_some() {
        return BondLookahead::None;
    }
    match crate::common::classify_open(trimmed) {
        ContentOpen::Plain(text) => BondLookahead::Continuation { first: text },
        ContentOpen::BlockOpen {
            quote_len,
            first_line,
        } => BondLookahead::Block {
            quote_len,
            first_line,
        },
    }
}

fn consume_bond(
    lines: &[&str],
    idx: usize,
    inline_content: ContentOpen,
    origin_line: usize,
    mode: ModeFlags,
    nodes: &mut Vec<Node>,
    diags: &mut Vec<Diagnostic>,
) -> usize {
    let origin_col = 1;

    match inline_content {
        ContentOpen::Plain(text) if text.is_empty() => {
            // Bare `@bond` with no same-line content: the *next* line may
            // still be absorbed as bond content or open a triple-quote block
            // (spec §4.1.2 "may_absorb"), but only if it actually qualifies
            // as a continuation line — a blank line, a directive, or a
            // statement is left untouched for the outer parse loop.
            match lookahead_bond_content(lines, idx) {
                BondLookahead::None => {
                    nodes.push(Node::new(
                        NodeKind::Bond { content: None },
                        Span::on_line(origin_line, origin_col, origin_col + 1),
                    ));
                    idx
                }
                BondLookahead::Continuation { first } => {
                    let origin_span = Span::on_line(origin_line, origin_col, origin_col + 1);
                    let (end_idx, content, end_span) =
                        absorb_continuation(lines, idx + 1, first, mode, origin_span);
                    let final_content = if content.trim().is_empty() {
                        None
                    } else {
                        Some(content)
                    };
                    nodes.push(Node::new(
                        NodeKind::Bond {
                            content: final_content,
                        },
                        Span::new(Position::new(origin_line, 1), end_span.end),
                    ));
                    end_idx
                }
                BondLookahead::Block {
                    quote_len,
                    first_line,
                } => {
                    let origin_span = Span::on_line(origin_line, origin_col, origin_col + 1);
                    // The opener line itself was `lines[idx]`, so the block
                    // body starts on the line after it.
                    let (end_idx, maybe_node) = consume_block(
                        lines,
                        idx + 1,
                        quote_len,
                        first_line,
                        origin_span,
                        diags,
                        |content, end_line, end_col| {
                            Node::new(
                                NodeKind::Bond {
                                    content: Some(content),
                                },
                                Span::new(
                                    Position::new(origin_line, 1),
                                    Position::new(end_line, end_col),
                                ),
                            )
                        },
                    );
                    if let Some(node) = maybe_node {
                        nodes.push(node);
                    }
                    end_idx
                }
            }
        }
        ContentOpen::Plain(text) => {
            // Genuine same-line inline content, e.g. `@bond: hello`; further
            // continuation lines start right after the directive line.
            let origin_span =
                Span::on_line(origin_line, origin_col, origin_col + text.chars().count());
            let (end_idx, content, end_span) =
                absorb_continuation(lines, idx, text, mode, origin_span);
            let final_content = if content.trim().is_empty() {
                None
            } else {
                Some(content)
            };
            nodes.push(Node::new(
                NodeKind::Bond {
                    content: final_content,
                },
                Span::new(Position::new(origin_line, 1), end_span.end),
            ));
            end_idx
        }
        ContentOpen::BlockOpen {
            quote_len,
            first_line,
        } => {
            // Genuine same-line inline opener, e.g. `@bond: """`: the body
            // starts on the very next line, same as `@typst_global`'s block
            // handling — `idx` already points right after the directive
            // line, so no extra line is skipped.
            let origin_span = Span::on_line(origin_line, origin_col, origin_col + 1);
            let (end_idx, maybe_node) = consume_block(
                lines,
                idx,
                quote_len,
                first_line,
                origin_span,
                diags,
                |content, end_line, end_col| {
                    Node::new(
                        NodeKind::Bond {
                            content: Some(content),
                        },
                        Span::new(Position::new(origin_line, 1), Position::new(end_line, end_col)),
                    )
                },
            );
            if let Some(node) = maybe_node {
                nodes.push(node);
            }
            end_idx
        }
    }
}

