//! Selector resolution (spec §4.4): turning a marker's selector string into
//! a canonical `char_id`.
//!
//! Backref (`_n`) and global-index (`~n`) markers are classified at parse
//! time (see `lexer`) and resolved here against the relevant history list.
//! Everything else is an `Explicit` selector, resolved against packs,
//! custom characters, and `usepack` aliases in the fixed order spec §4.2
//! documents.

use std::collections::HashMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::pack::PackRegistry;
use crate::span::Span;

/// Everything `resolve_explicit` needs read-only access to. Borrowed from
/// `CompilerState` for the duration of one resolution.
pub struct ResolutionTables<'a> {
    pub short_id_map: &'a HashMap<String, String>,
    pub custom_chars: &'a HashMap<String, String>,
    /// `usepack pack_id as alias` registrations, in declaration order.
    pub usepack_aliases: &'a [(String, String)],
    pub pack_registry: &'a dyn PackRegistry,
}

fn unknown(selector: &str, span: Span) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::UnknownCharacter,
        format!("unknown character selector '{}'", selector),
        span,
    )
}

/// `_n:` — n-th most recent distinct speaker on this side (spec §3.3, §8
/// scenario S1). `history` is most-recent-first, as `side_history[side]` is
/// maintained, and `history[0]` is already what `Marker::None` resolves to
/// (the speaker who would continue by default). A backref is only useful
/// when it names someone *other* than that default continuation, so `_n`
/// indexes `history[n]`, not `history[n-1]`: `_1` names the speaker one
/// step further back than the one who'd continue, `_2` two steps back, and
/// so on. `_0` would be redundant with plain continuation and is rejected.
pub fn resolve_backref(n: usize, history: &[String], span: Span) -> Result<String, Diagnostic> {
    if n == 0 {
        return Err(Diagnostic::new(
            DiagnosticKind::BackrefOutOfRange,
            "'_0' is not a valid backref; backrefs start at 1".to_string(),
            span,
        ));
    }
    history.get(n).cloned().ok_or_else(|| {
        Diagnostic::new(
            DiagnosticKind::BackrefOutOfRange,
            format!(
                "backref '_{}' exceeds history length {}",
                n,
                history.len()
            ),
            span,
        )
    })
}

/// `~n:` — n-th distinct speaker across the whole document, in order of
/// first appearance, evaluated against prior state (spec §4.2, §9).
pub fn resolve_global_index(
    n: usize,
    global_order: &[String],
    span: Span,
) -> Result<String, Diagnostic> {
    if n == 0 {
        return Err(Diagnostic::new(
            DiagnosticKind::IndexOutOfRange,
            "'~0' is not a valid global index; indices start at 1".to_string(),
            span,
        ));
    }
    global_order.get(n - 1).cloned().ok_or_else(|| {
        Diagnostic::new(
            DiagnosticKind::IndexOutOfRange,
            format!(
                "global index '~{}' exceeds {} known speaker(s)",
                n,
                global_order.len()
            ),
            span,
        )
    })
}

fn resolve_in_pack(
    label: &str,
    pack_id: &str,
    name: &str,
    tables: &ResolutionTables,
) -> Option<String> {
    tables
        .pack_registry
        .lookup_by_name(pack_id, name)
        .map(|char_id| format!("{}.{}", label, char_id))
}

/// Custom characters are matched by their own `char_id` directly (no
/// namespace prefix is added — the `custom_chars` key already is the
/// canonical id, per the `@charid` directive).
fn resolve_in_custom(name: &str, tables: &ResolutionTables) -> Option<String> {
    tables
        .custom_chars
        .contains_key(name)
        .then(|| name.to_string())
}

/// Resolve an `Explicit(selector)` marker to a canonical `char_id` (spec
/// §4.4). A selector containing `(...)` (a skin variant) is passed through
/// verbatim — it simply names a different character than its base, with no
/// special-cased alias inheritance.
pub fn resolve_explicit(
    selector: &str,
    tables: &ResolutionTables,
    span: Span,
) -> Result<String, Diagnostic> {
    if let Some(dot) = selector.find('.') {
        let ns = &selector[..dot];
        let rest = &selector[dot + 1..];

        if ns == "custom" {
            return resolve_in_custom(rest, tables).ok_or_else(|| unknown(selector, span));
        }
        if let Some((_, pack_id)) = tables.usepack_aliases.iter().find(|(a, _)| a == ns) {
            return resolve_in_pack(ns, pack_id, rest, tables)
                .ok_or_else(|| unknown(selector, span));
        }
        if tables.pack_registry.default_namespaces().iter().any(|p| p == ns)
            || tables.pack_registry.known_packs().iter().any(|p| p == ns)
        {
            return resolve_in_pack(ns, ns, rest, tables).ok_or_else(|| unknown(selector, span));
        }
        return Err(unknown(selector, span));
    }

    // No namespace qualifier: one level of short_id indirection, then try
    // every candidate namespace in the fixed default order.
    let effective = tables
        .short_id_map
        .get(selector)
        .cloned()
        .unwrap_or_else(|| selector.to_string());

    for pack_id in tables.pack_registry.default_namespaces() {
        if let Some(id) = resolve_in_pack(&pack_id, &pack_id, &effective, tables) {
            return Ok(id);
        }
    }
    if let Some(id) = resolve_in_custom(&effective, tables) {
        return Ok(id);
    }
    for (alias, pack_id) in tables.usepack_aliases {
        if let Some(id) = resolve_in_pack(alias, pack_id, &effective, tables) {
            return Ok(id);
        }
    }
    Err(unknown(selector, span))
}
