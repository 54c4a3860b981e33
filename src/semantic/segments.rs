//! Inline segment parsing (spec §4.5).
//!
//! Produces `RawSegment`s with an *unresolved* `target` selector string for
//! the explicit `(TARGET)[QUERY]` / `[QUERY](TARGET)` forms — resolving
//! `target` to a canonical `char_id` (or falling back to the statement's own
//! speaker) is the compiler's job, since that requires the same selector
//! tables `resolve_explicit` uses.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSegment {
    Text(String),
    Expr { query: String, target: Option<String> },
}

/// Classify a bracket body as an expression query, or `None` if it does not
/// qualify and the brackets should be kept as literal text.
fn classify_query(body: &str, typst_mode: bool) -> Option<String> {
    if typst_mode {
        body.strip_prefix(':').map(|q| q.to_string())
    } else if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

/// Scan a `[...]` body starting right after the opening bracket at
/// `chars[start]`. Returns `(body, index_after_closing_bracket)`; `\[`/`\]`
/// inside the body are unescaped. `None` if no unescaped closer is found.
fn scan_bracket(chars: &[char], start: usize) -> Option<(String, usize)> {
    let mut body = String::new();
    let mut i = start;
    while i < chars.len() {
        if chars[i] == '\\' && i + 1 < chars.len() && (chars[i + 1] == '[' || chars[i + 1] == ']')
        {
            body.push(chars[i + 1]);
            i += 2;
            continue;
        }
        if chars[i] == ']' {
            return Some((body, i + 1));
        }
        body.push(chars[i]);
        i += 1;
    }
    None
}

/// Scan a `(...)` run starting at `chars[start]` (which must be `(`).
/// Returns `(inner, index_after_closing_paren)`.
fn scan_paren(chars: &[char], start: usize) -> Option<(String, usize)> {
    if chars.get(start) != Some(&'(') {
        return None;
    }
    let mut inner = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == ')' {
            return Some((inner, i + 1));
        }
        inner.push(chars[i]);
        i += 1;
    }
    None
}

/// Parse `content` into an ordered list of segments (spec §4.5). Escapes
/// `\[`/`\]` apply in both modes.
pub fn parse_segments(content: &str, typst_mode: bool) -> Vec<RawSegment> {
    let chars: Vec<char> = content.chars().collect();
    let n = chars.len();
    let mut segments = Vec::new();
    let mut text_buf = String::new();
    let mut i = 0;

    let flush = |buf: &mut String, out: &mut Vec<RawSegment>| {
        if !buf.is_empty() {
            out.push(RawSegment::Text(std::mem::take(buf)));
        }
    };

    while i < n {
        let c = chars[i];

        if c == '\\' && i + 1 < n && (chars[i + 1] == '[' || chars[i + 1] == ']') {
            text_buf.push(chars[i + 1]);
            i += 2;
            continue;
        }

        if c == '[' {
            if let Some((body, after_bracket)) = scan_bracket(&chars, i + 1) {
                // `[QUERY](TARGET)` form.
                if let Some((target, after_paren)) = scan_paren(&chars, after_bracket) {
                    if let Some(query) = classify_query(&body, typst_mode) {
                        flush(&mut text_buf, &mut segments);
                        segments.push(RawSegment::Expr {
                            query,
                            target: Some(target),
                        });
                        i = after_paren;
                        continue;
                    }
                }
                if let Some(query) = classify_query(&body, typst_mode) {
                    flush(&mut text_buf, &mut segments);
                    segments.push(RawSegment::Expr { query, target: None });
                    i = after_bracket;
                    continue;
                }
                // Doesn't qualify as an expression: keep the brackets literal.
                text_buf.push('[');
                text_buf.push_str(&body);
                text_buf.push(']');
                i = after_bracket;
                continue;
            }
            text_buf.push('[');
            i += 1;
            continue;
        }

        if c == '(' {
            // `(TARGET)[QUERY]` form.
            if let Some((target, after_paren)) = scan_paren(&chars, i) {
                if chars.get(after_paren) == Some(&'[') {
                    if let Some((body, after_bracket)) = scan_bracket(&chars, after_paren + 1) {
                        if let Some(query) = classify_query(&body, typst_mode) {
                            flush(&mut text_buf, &mut segments);
                            segments.push(RawSegment::Expr {
                                query,
                                target: Some(target),
                            });
                            i = after_bracket;
                            continue;
                        }
                    }
                }
            }
            text_buf.push(c);
            i += 1;
            continue;
        }

        text_buf.push(c);
        i += 1;
    }

    flush(&mut text_buf, &mut segments);
    segments
}
