//! Shared lexical building blocks used by both the line classifier and the
//! selector resolver (spec §3.3, §4.1 "Marker pre-parse", §4.4).

use regex::Regex;
use std::sync::OnceLock;

/// Characters a bare selector/short-id token may contain: ASCII
/// alphanumerics and underscore, `.` (namespace separator), `(` `)` (skin
/// variant), and non-ASCII code points U+0080..U+FFFF (spec §4.1 regex
/// `[A-Za-z0-9_-￿\.\(\)]+`).
fn selector_body_pattern() -> &'static str {
    r"[A-Za-z0-9_.()\u{0080}-\u{FFFF}]+"
}

/// Matches a permissible marker selector at the start of a string: a
/// backref (`_`, `_1`, `_12`, …), a global index (`~1`, `~12`, …), or a
/// bare/namespaced/skin-variant selector body.
pub fn marker_head_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"^(?:_[0-9]*|~[0-9]+|{})", selector_body_pattern())).unwrap()
    })
}

pub fn backref_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^_([0-9]*)$").unwrap())
}

pub fn global_index_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^~([0-9]+)$").unwrap())
}

/// A run of N>=3 `"` characters at the very start of `s`, returning the run
/// length and the remainder of the string after it.
pub fn leading_quote_run(s: &str) -> Option<(usize, &str)> {
    let mut count = 0;
    for c in s.chars() {
        if c == '"' {
            count += 1;
        } else {
            break;
        }
    }
    if count >= 3 {
        Some((count, &s[count..]))
    } else {
        None
    }
}

/// Result of classifying a statement/bond/typst_global opener's trailing
/// text (spec §4.1.3): either it is plain content, or it opens a
/// triple-quote block.
#[derive(Debug, Clone)]
pub enum ContentOpen {
    Plain(String),
    BlockOpen {
        quote_len: usize,
        first_line: Option<String>,
    },
}

/// Classify trailing text as plain content or a block opener.
pub fn classify_open(text: &str) -> ContentOpen {
    if let Some((quote_len, body)) = leading_quote_run(text) {
        if body.trim().is_empty() {
            ContentOpen::BlockOpen {
                quote_len,
                first_line: None,
            }
        } else {
            ContentOpen::BlockOpen {
                quote_len,
                first_line: Some(body.trim_start().to_string()),
            }
        }
    } else {
        ContentOpen::Plain(text.to_string())
    }
}

/// Strip leading ASCII/Unicode whitespace, returning the stripped count in
/// code points and the remainder.
pub fn strip_leading_ws(s: &str) -> (usize, &str) {
    let mut count = 0;
    let mut byte_offset = 0;
    for c in s.chars() {
        if c.is_whitespace() {
            count += 1;
            byte_offset += c.len_utf8();
        } else {
            break;
        }
    }
    (count, &s[byte_offset..])
}
