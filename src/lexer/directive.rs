//! Parsing of `@...` directive lines (spec §4.1.3, §6.5).

use crate::ast::{Node, NodeKind};
use crate::common::{classify_open, ContentOpen};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::span::{Position, Span};

pub enum ParsedDirective {
    Node(Node),
    Error(Diagnostic),
    OpenReplyBlock { origin_span: Span },
    OpenBond { inline_content: ContentOpen, origin_line: usize },
    OpenTypstGlobalBlock { first_line: Option<String>, quote_len: usize, origin_line: usize },
    EndReply,
}

const HEADER_ONLY_KEYS: &[&str] = &["title", "author", "created_at", "width", "bubble_inset", "typst"];

pub fn is_header_only_key(key: &str) -> bool {
    HEADER_ONLY_KEYS.contains(&key) || key.starts_with("asset.")
}

/// Split `rest` (text right after the leading `@`) into `(keyword,
/// remainder)`, where `remainder` still includes a leading `:` if the
/// directive used colon-value form.
fn split_keyword(rest: &str) -> (&str, &str) {
    let idx = rest
        .char_indices()
        .find(|(_, c)| *c == ':' || c.is_whitespace())
        .map(|(i, _)| i);
    match idx {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    }
}

fn value_after_colon_or_space(remainder: &str) -> String {
    let r = remainder.strip_prefix(':').unwrap_or(remainder);
    r.trim().to_string()
}

/// Split `NAME=DISPLAY` on the first unescaped `=`. `display` is empty when
/// the directive clears an override (spec §3.2 "empty ⇒ clear").
fn split_name_eq_value(s: &str) -> Option<(String, String)> {
    let bytes = s.as_bytes();
    let mut i = 0;
    let mut prev_escape = false;
    while i < bytes.len() {
        let c = s[i..].chars().next().unwrap();
        if c == '=' && !prev_escape {
            let name = s[..i].trim().to_string();
            let value = s[i + 1..].trim().to_string();
            return Some((name, value.replace("\\=", "=")));
        }
        prev_escape = c == '\\' && !prev_escape;
        i += c.len_utf8();
    }
    None
}

pub fn parse_directive(
    rest: &str,
    line_no: usize,
    start_col: usize,
    _body_started: bool,
) -> ParsedDirective {
    let (keyword, remainder) = split_keyword(rest);
    let end_col = start_col + rest.chars().count();
    let span = Span::new(
        Position::new(line_no, start_col - 1),
        Position::new(line_no, end_col),
    );

    let err = |kind: DiagnosticKind, msg: String| ParsedDirective::Error(Diagnostic::new(kind, msg, span));

    if keyword.starts_with("asset.") {
        let value = value_after_colon_or_space(remainder);
        return ParsedDirective::Node(Node::new(
            NodeKind::MetaKV {
                key: keyword.to_string(),
                value,
            },
            span,
        ));
    }

    match keyword {
        "title" | "author" | "created_at" | "width" | "bubble_inset" | "typst" => {
            let value = value_after_colon_or_space(remainder);
            ParsedDirective::Node(Node::new(
                NodeKind::MetaKV {
                    key: keyword.to_string(),
                    value,
                },
                span,
            ))
        }
        "typst_global" => {
            let value = value_after_colon_or_space(remainder);
            match classify_open(&value) {
                ContentOpen::Plain(v) => ParsedDirective::Node(Node::new(
                    NodeKind::TypstGlobal { value: v },
                    span,
                )),
                ContentOpen::BlockOpen {
                    quote_len,
                    first_line,
                } => ParsedDirective::OpenTypstGlobalBlock {
                    first_line,
                    quote_len,
                    origin_line: line_no,
                },
            }
        }
        "usepack" => {
            let value = value_after_colon_or_space(remainder);
            let parts: Vec<&str> = value.split_whitespace().collect();
            if parts.len() == 3 && parts[1] == "as" {
                ParsedDirective::Node(Node::new(
                    NodeKind::UsePack {
                        pack_id: parts[0].to_string(),
                        alias: parts[2].to_string(),
                    },
                    span,
                ))
            } else {
                err(
                    DiagnosticKind::MalformedDirective,
                    "expected '@usepack <pack_id> as <alias>'".to_string(),
                )
            }
        }
        "alias" | "tmpalias" => {
            let value = value_after_colon_or_space(remainder);
            match split_name_eq_value(&value) {
                Some((name, display)) if !name.is_empty() => {
                    let kind = if keyword == "alias" {
                        NodeKind::Alias { name, display }
                    } else {
                        NodeKind::TmpAlias { name, display }
                    };
                    ParsedDirective::Node(Node::new(kind, span))
                }
                _ => err(
                    DiagnosticKind::MalformedDirective,
                    format!("expected '@{} <name>=<display>'", keyword),
                ),
            }
        }
        "avatar" => {
            let value = value_after_colon_or_space(remainder);
            match split_name_eq_value(&value) {
                Some((name, asset_ref)) if !name.is_empty() => ParsedDirective::Node(Node::new(
                    NodeKind::AvatarOverride { name, asset_ref },
                    span,
                )),
                _ => err(
                    DiagnosticKind::MalformedDirective,
                    "expected '@avatar <name>=<asset_ref>'".to_string(),
                ),
            }
        }
        "aliasid" => {
            let value = value_after_colon_or_space(remainder);
            let parts: Vec<&str> = value.splitn(2, char::is_whitespace).collect();
            match parts.as_slice() {
                [short_id, name] if !short_id.is_empty() && !name.trim().is_empty() => {
                    ParsedDirective::Node(Node::new(
                        NodeKind::AliasId {
                            short_id: short_id.to_string(),
                            name: Some(name.trim().to_string()),
                        },
                        span,
                    ))
                }
                _ => err(
                    DiagnosticKind::MalformedDirective,
                    "expected '@aliasid <short_id> <name>'".to_string(),
                ),
            }
        }
        "unaliasid" => {
            let value = value_after_colon_or_space(remainder);
            if value.is_empty() {
                err(
                    DiagnosticKind::MalformedDirective,
                    "expected '@unaliasid <short_id>'".to_string(),
                )
            } else {
                ParsedDirective::Node(Node::new(
                    NodeKind::UnaliasId {
                        short_id: value,
                    },
                    span,
                ))
            }
        }
        "charid" => {
            let value = value_after_colon_or_space(remainder);
            let parts: Vec<&str> = value.splitn(2, char::is_whitespace).collect();
            match parts.as_slice() {
                [short_id, display] if !short_id.is_empty() && !display.trim().is_empty() => {
                    ParsedDirective::Node(Node::new(
                        NodeKind::CharId {
                            short_id: Some(short_id.to_string()),
                            display: display.trim().to_string(),
                        },
                        span,
                    ))
                }
                _ => err(
                    DiagnosticKind::MalformedDirective,
                    "expected '@charid <short_id> <display>'".to_string(),
                ),
            }
        }
        "uncharid" => {
            let value = value_after_colon_or_space(remainder);
            if value.is_empty() {
                err(
                    DiagnosticKind::MalformedDirective,
                    "expected '@uncharid <short_id>'".to_string(),
                )
            } else {
                ParsedDirective::Node(Node::new(NodeKind::UncharId { short_id: value }, span))
            }
        }
        "avatarid" => {
            let value = value_after_colon_or_space(remainder);
            let parts: Vec<&str> = value.splitn(2, char::is_whitespace).collect();
            match parts.as_slice() {
                [short_id, asset_ref] if !short_id.is_empty() && !asset_ref.trim().is_empty() => {
                    ParsedDirective::Node(Node::new(
                        NodeKind::AvatarId {
                            short_id: short_id.to_string(),
                            asset_ref: Some(asset_ref.trim().to_string()),
                        },
                        span,
                    ))
                }
                _ => err(
                    DiagnosticKind::MalformedDirective,
                    "expected '@avatarid <short_id> <asset_ref>'".to_string(),
                ),
            }
        }
        "unavatarid" => {
            let value = value_after_colon_or_space(remainder);
            if value.is_empty() {
                err(
                    DiagnosticKind::MalformedDirective,
                    "expected '@unavatarid <short_id>'".to_string(),
                )
            } else {
                ParsedDirective::Node(Node::new(NodeKind::UnavatarId { short_id: value }, span))
            }
        }
        "pagebreak" => {
            let value = value_after_colon_or_space(remainder);
            if value.is_empty() {
                ParsedDirective::Node(Node::new(NodeKind::PageBreak, span))
            } else {
                err(
                    DiagnosticKind::BadMarkerOnPagebreak,
                    "'@pagebreak' takes no arguments".to_string(),
                )
            }
        }
        "reply" => {
            if remainder.trim_start().starts_with(':') {
                let value = value_after_colon_or_space(remainder);
                let items = split_reply_items(&value, line_no, start_col);
                if items.is_empty() {
                    err(
                        DiagnosticKind::EmptyReply,
                        "'@reply:' has no items".to_string(),
                    )
                } else {
                    ParsedDirective::Node(Node::new(NodeKind::Reply { items }, span))
                }
            } else {
                ParsedDirective::OpenReplyBlock { origin_span: span }
            }
        }
        "end" => ParsedDirective::EndReply,
        "bond" => {
            let value = value_after_colon_or_space(remainder);
            ParsedDirective::OpenBond {
                inline_content: classify_open(&value),
                origin_line: line_no,
            }
        }
        other => err(
            DiagnosticKind::UnknownDirective,
            format!("unknown directive '@{}'", other),
        ),
    }
}

fn split_reply_items(value: &str, line_no: usize, start_col: usize) -> Vec<crate::ast::ReplyItemRaw> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut prev_escape = false;
    for c in value.chars() {
        if c == '|' && !prev_escape {
            let text = current.trim().replace("\\|", "|");
            if !text.is_empty() {
                items.push(crate::ast::ReplyItemRaw {
                    text,
                    span: Span::on_line(line_no, start_col, start_col),
                });
            }
            current.clear();
        } else {
            current.push(c);
        }
        prev_escape = c == '\\' && !prev_escape;
    }
    let text = current.trim().replace("\\|", "|");
    if !text.is_empty() {
        items.push(crate::ast::ReplyItemRaw {
            text,
            span: Span::on_line(line_no, start_col, start_col),
        });
    }
    items
}
