//! Semantic compiler (spec §4.2): folds a flat AST into the JSON IR while
//! maintaining the layered state spec §3.5 describes (speaker history per
//! side, alias/temp-alias tables, short-id indirection, custom characters,
//! avatar overrides) and validating every reference against the pack
//! registry and that state.

pub mod charid;
pub mod segments;
pub mod selector;

use std::collections::HashMap;

use crate::ast::{Marker, Node, NodeKind, Side, StatementKind};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Warning};
use crate::ir::*;
use crate::mode::ModeFlags;
use crate::pack::PackRegistry;
use crate::span::Span;

use charid::custom_char_id;
use segments::{parse_segments, RawSegment};
use selector::{resolve_backref, resolve_explicit, resolve_global_index, ResolutionTables};

fn side_idx(side: Side) -> usize {
    match side {
        Side::Left => 0,
        Side::Right => 1,
    }
}

fn side_str(side: Side) -> &'static str {
    match side {
        Side::Left => "left",
        Side::Right => "right",
    }
}

#[derive(Debug, Clone)]
struct TmpAliasSlot {
    char_id: String,
    display: String,
}

struct CompilerState<'a> {
    meta: OrderedMap,
    typst_global_parts: Vec<String>,
    side_history: [Vec<String>; 2],
    global_speaker_order: Vec<String>,
    aliases: HashMap<String, String>,
    /// Set by `@tmpalias`, consumed the next time that char_id speaks on
    /// any side (spec §3.5 "pending-apply flag").
    pending_tmp_aliases: HashMap<String, String>,
    /// The currently active temp alias per side, cleared when that side's
    /// speaker changes to a different char_id (spec §3.7 invariant 5).
    active_tmp_alias: [Option<TmpAliasSlot>; 2],
    short_id_map: HashMap<String, String>,
    custom_chars: HashMap<String, CustomChar>,
    /// `custom_chars` keys only, kept for `resolve_explicit`'s lookup table
    /// (which only checks membership); insertion order is tracked
    /// separately in `custom_chars_order`.
    custom_lookup: HashMap<String, String>,
    custom_chars_order: Vec<String>,
    avatar_overrides: HashMap<String, String>,
    /// `@asset.<name>` entries, also mirrored verbatim into `meta`.
    assets: HashMap<String, String>,
    /// `usepack pack_id as alias`, in declaration order.
    usepack_aliases: Vec<(String, String)>,
    /// Most recent speaker across both sides, used to synthesize the
    /// default bond greeting (spec §4.2 Bond).
    last_speaker: Option<String>,
    /// Set once a `@typst` header directive's value is recognized as
    /// truthy (spec §4.1: "Determined later by the compiler from `@typst`
    /// meta or mode passed in"). Segment parsing uses `mode.typst_mode ||
    /// typst_from_meta`, so either the caller's `ModeFlags` or the
    /// document's own header can switch a bubble into Typst expression
    /// syntax.
    typst_from_meta: bool,
    pack_registry: &'a dyn PackRegistry,
    chat: Vec<ChatLine>,
}

impl<'a> CompilerState<'a> {
    fn new(pack_registry: &'a dyn PackRegistry) -> Self {
        Self {
            meta: OrderedMap::new(),
            typst_global_parts: Vec::new(),
            side_history: [Vec::new(), Vec::new()],
            global_speaker_order: Vec::new(),
            aliases: HashMap::new(),
            pending_tmp_aliases: HashMap::new(),
            active_tmp_alias: [None, None],
            short_id_map: HashMap::new(),
            custom_chars: HashMap::new(),
            custom_lookup: HashMap::new(),
            custom_chars_order: Vec::new(),
            avatar_overrides: HashMap::new(),
            assets: HashMap::new(),
            usepack_aliases: Vec::new(),
            last_speaker: None,
            typst_from_meta: false,
            pack_registry,
            chat: Vec::new(),
        }
    }

    fn effective_typst_mode(&self, mode: ModeFlags) -> bool {
        mode.typst_mode || self.typst_from_meta
    }

    fn resolution_tables(&self) -> ResolutionTables<'_> {
        ResolutionTables {
            short_id_map: &self.short_id_map,
            custom_chars: &self.custom_lookup,
            usepack_aliases: &self.usepack_aliases,
            pack_registry: self.pack_registry,
        }
    }

    fn display_name_for(&self, char_id: &str) -> String {
        for slot in self.active_tmp_alias.iter().flatten() {
            if slot.char_id == char_id {
                return slot.display.clone();
            }
        }
        if let Some(display) = self.aliases.get(char_id) {
            return display.clone();
        }
        if let Some(custom) = self.custom_chars.get(char_id) {
            return custom.display_name.clone();
        }
        match char_id.rfind('.') {
            Some(i) => char_id[i + 1..].to_string(),
            None => char_id.to_string(),
        }
    }

    fn touch_side_history(&mut self, side: Side, char_id: &str) {
        let hist = &mut self.side_history[side_idx(side)];
        hist.retain(|c| c != char_id);
        hist.insert(0, char_id.to_string());
        if !self.global_speaker_order.iter().any(|c| c == char_id) {
            self.global_speaker_order.push(char_id.to_string());
        }
    }

    fn resolve_marker(&self, side: Side, marker: &Marker, span: Span) -> Result<String, Diagnostic> {
        match marker {
            Marker::None => {
                if let Some(current) = self.side_history[side_idx(side)].first() {
                    Ok(current.clone())
                } else if side == Side::Right {
                    Ok("__Sensei".to_string())
                } else {
                    Err(Diagnostic::new(
                        DiagnosticKind::NoCurrentSpeaker,
                        "no current speaker on this side and marker was omitted",
                        span,
                    ))
                }
            }
            Marker::Backref(n) => resolve_backref(*n, &self.side_history[side_idx(side)], span),
            Marker::Index(n) => resolve_global_index(*n, &self.global_speaker_order, span),
            Marker::Explicit(selector) => {
                resolve_explicit(selector, &self.resolution_tables(), span)
            }
        }
    }

    fn resolve_asset_ref(&self, raw: &str, span: Span) -> Result<String, Diagnostic> {
        if let Some(name) = raw.strip_prefix("@asset.") {
            return self.assets.get(name).cloned().ok_or_else(|| {
                Diagnostic::new(
                    DiagnosticKind::UnknownAsset,
                    format!("unknown asset '@asset.{}'", name),
                    span,
                )
            });
        }
        if raw.starts_with("kivo-")
            || raw.starts_with("http://")
            || raw.starts_with("https://")
            || raw.starts_with("data:image/")
        {
            return Ok(raw.to_string());
        }
        // A bare name registered via `@asset.<name>` may also be referenced
        // without the `@asset.` prefix (spec §8 scenario S5).
        if let Some(asset) = self.assets.get(raw) {
            return Ok(asset.clone());
        }
        // Otherwise: borrow a pack character's default avatar.
        let resolved = resolve_explicit(raw, &self.resolution_tables(), span)?;
        if let Some(dot) = resolved.find('.') {
            let ns = &resolved[..dot];
            let char_id = &resolved[dot + 1..];
            if ns != "custom" {
                if let Some(path) = self.pack_registry.default_avatar_path(ns, char_id) {
                    return Ok(path);
                }
            }
        }
        Err(Diagnostic::new(
            DiagnosticKind::InvalidAssetPath,
            format!("no default avatar available for '{}'", raw),
            span,
        ))
    }

    fn convert_segments(
        &self,
        raw: Vec<RawSegment>,
        default_target: Option<&str>,
        span: Span,
    ) -> Result<Vec<Segment>, Diagnostic> {
        raw.into_iter()
            .map(|seg| match seg {
                RawSegment::Text(text) => Ok(Segment::Text { text }),
                RawSegment::Expr { query, target } => {
                    let target_char_id = match target {
                        Some(selector) => {
                            Some(resolve_explicit(&selector, &self.resolution_tables(), span)?)
                        }
                        None => default_target.map(|s| s.to_string()),
                    };
                    Ok(Segment::Expr {
                        query,
                        target_char_id,
                        line_no: None,
                    })
                }
            })
            .collect()
    }

    fn synth_bond_greeting(&self) -> String {
        match &self.last_speaker {
            Some(char_id) => format!("进入{}的羁绊剧情", self.display_name_for(char_id)),
            None => "进入羁绊剧情".to_string(),
        }
    }

    fn emit_text(
        &mut self,
        side: Side,
        marker: &Marker,
        content: String,
        mode: ModeFlags,
        span: Span,
    ) -> Result<(), Diagnostic> {
        let char_id = self.resolve_marker(side, marker, span)?;
        self.touch_side_history(side, &char_id);
        self.last_speaker = Some(char_id.clone());

        let idx = side_idx(side);
        if let Some(slot) = &self.active_tmp_alias[idx] {
            if slot.char_id != char_id {
                self.active_tmp_alias[idx] = None;
            }
        }
        if let Some(display) = self.pending_tmp_aliases.remove(&char_id) {
            self.active_tmp_alias[idx] = Some(TmpAliasSlot {
                char_id: char_id.clone(),
                display,
            });
        }
        let name_override = self.active_tmp_alias[idx]
            .as_ref()
            .filter(|slot| slot.char_id == char_id)
            .map(|slot| slot.display.clone())
            .or_else(|| self.aliases.get(&char_id).cloned());
        // Custom characters have no pack-supplied default avatar, so their
        // own `@avatarid`-set avatar_ref is threaded through as the line's
        // avatar_override whenever no explicit `@avatar` override is active
        // (spec §8 scenario S5).
        let avatar_override = self.avatar_overrides.get(&char_id).cloned().or_else(|| {
            self.custom_chars
                .get(&char_id)
                .map(|c| c.avatar_ref.clone())
                .filter(|s| !s.is_empty())
        });

        let raw_segments = parse_segments(&content, self.effective_typst_mode(mode));
        let segments = self.convert_segments(raw_segments, Some(&char_id), span)?;

        self.chat.push(ChatLine::Text(TextLine {
            yuzutalk: YuzutalkText {
                kind: "TEXT",
                name_override,
            },
            char_id,
            side: side_str(side),
            content,
            segments,
            avatar_override,
            line_no: span.start_line(),
        }));
        Ok(())
    }

    fn clear_tmp_alias_for(&mut self, char_id: &str) {
        self.pending_tmp_aliases.remove(char_id);
        for slot in self.active_tmp_alias.iter_mut() {
            if slot.as_ref().map(|s| s.char_id.as_str()) == Some(char_id) {
                *slot = None;
            }
        }
    }

    fn apply_node(
        &mut self,
        node: &Node,
        mode: ModeFlags,
        warnings: &mut Vec<Warning>,
    ) -> Result<(), Diagnostic> {
        match &node.kind {
            NodeKind::MetaKV { key, value } => {
                self.meta.set(key.clone(), value.clone());
                if let Some(name) = key.strip_prefix("asset.") {
                    self.assets.insert(name.to_string(), value.clone());
                }
                if key == "typst" {
                    let normalized = value.trim().to_ascii_lowercase();
                    self.typst_from_meta = matches!(normalized.as_str(), "on" | "true" | "1" | "yes");
                }
                Ok(())
            }
            NodeKind::TypstGlobal { value } => {
                self.typst_global_parts.push(value.clone());
                Ok(())
            }
            NodeKind::UsePack { pack_id, alias } => {
                if !self.pack_registry.known_packs().iter().any(|p| p == pack_id) {
                    return Err(Diagnostic::new(
                        DiagnosticKind::UnknownPack,
                        format!("unknown pack '{}'", pack_id),
                        node.span,
                    ));
                }
                if self.usepack_aliases.iter().any(|(a, _)| a == alias) {
                    return Err(Diagnostic::new(
                        DiagnosticKind::DuplicateAlias,
                        format!("alias '{}' is already registered", alias),
                        node.span,
                    ));
                }
                self.usepack_aliases.push((alias.clone(), pack_id.clone()));
                Ok(())
            }
            NodeKind::Alias { name, display } => {
                match resolve_explicit(name, &self.resolution_tables(), node.span) {
                    Ok(char_id) => {
                        if display.is_empty() {
                            self.aliases.remove(&char_id);
                        } else {
                            self.aliases.insert(char_id, display.clone());
                        }
                    }
                    Err(diag) => warnings.push(Warning {
                        message: format!("@alias target unresolved, directive dropped: {}", diag.message),
                        span: node.span,
                    }),
                }
                Ok(())
            }
            NodeKind::TmpAlias { name, display } => {
                match resolve_explicit(name, &self.resolution_tables(), node.span) {
                    Ok(char_id) => {
                        if display.is_empty() {
                            self.clear_tmp_alias_for(&char_id);
                        } else {
                            self.pending_tmp_aliases.insert(char_id, display.clone());
                        }
                    }
                    Err(diag) => warnings.push(Warning {
                        message: format!(
                            "@tmpalias target unresolved, directive dropped: {}",
                            diag.message
                        ),
                        span: node.span,
                    }),
                }
                Ok(())
            }
            NodeKind::AliasId { short_id, name } => {
                self.short_id_map
                    .insert(short_id.clone(), name.clone().unwrap_or_default());
                Ok(())
            }
            NodeKind::UnaliasId { short_id } => {
                if !self.short_id_map.contains_key(short_id) {
                    return Err(Diagnostic::new(
                        DiagnosticKind::UnknownShortId,
                        format!("short id '{}' is not registered", short_id),
                        node.span,
                    ));
                }
                let collides = self
                    .pack_registry
                    .default_namespaces()
                    .iter()
                    .any(|pack_id| self.pack_registry.lookup_by_name(pack_id, short_id).is_some());
                if collides {
                    return Err(Diagnostic::new(
                        DiagnosticKind::UnknownShortId,
                        format!(
                            "'{}' collides with a name directly resolvable via a pack",
                            short_id
                        ),
                        node.span,
                    ));
                }
                self.short_id_map.remove(short_id);
                Ok(())
            }
            NodeKind::CharId { short_id, display } => {
                let char_id = short_id.clone().unwrap_or_else(|| custom_char_id(display));
                let avatar_ref = self
                    .custom_chars
                    .get(&char_id)
                    .map(|c| c.avatar_ref.clone())
                    .unwrap_or_default();
                self.custom_chars.insert(
                    char_id.clone(),
                    CustomChar {
                        char_id: char_id.clone(),
                        avatar_ref,
                        display_name: display.clone(),
                    },
                );
                self.custom_lookup.insert(char_id.clone(), String::new());
                if !self.custom_chars_order.contains(&char_id) {
                    self.custom_chars_order.push(char_id);
                }
                Ok(())
            }
            NodeKind::UncharId { short_id } => {
                self.custom_chars.remove(short_id);
                self.custom_lookup.remove(short_id);
                self.custom_chars_order.retain(|c| c != short_id);
                self.avatar_overrides.remove(short_id);
                Ok(())
            }
            NodeKind::AvatarId { short_id, asset_ref } => {
                if !self.custom_chars.contains_key(short_id) {
                    return Err(Diagnostic::new(
                        DiagnosticKind::UnknownShortId,
                        format!("'{}' is not a declared custom character", short_id),
                        node.span,
                    ));
                }
                let raw = asset_ref.clone().unwrap_or_default();
                let resolved = self.resolve_asset_ref(&raw, node.span)?;
                if let Some(entry) = self.custom_chars.get_mut(short_id) {
                    entry.avatar_ref = resolved;
                }
                Ok(())
            }
            NodeKind::UnavatarId { short_id } => {
                if let Some(entry) = self.custom_chars.get_mut(short_id) {
                    entry.avatar_ref = String::new();
                }
                Ok(())
            }
            NodeKind::AvatarOverride { name, asset_ref } => {
                match resolve_explicit(name, &self.resolution_tables(), node.span) {
                    Ok(char_id) => {
                        if asset_ref.is_empty() {
                            self.avatar_overrides.remove(&char_id);
                        } else {
                            let resolved = self.resolve_asset_ref(asset_ref, node.span)?;
                            self.avatar_overrides.insert(char_id, resolved);
                        }
                    }
                    Err(diag) => warnings.push(Warning {
                        message: format!(
                            "@avatar target unresolved, directive dropped: {}",
                            diag.message
                        ),
                        span: node.span,
                    }),
                }
                Ok(())
            }
            NodeKind::PageBreak => {
                self.chat.push(ChatLine::Pagebreak(PagebreakLine {
                    yuzutalk: YuzutalkSimple { kind: "PAGEBREAK" },
                    line_no: node.span.start_line(),
                }));
                Ok(())
            }
            NodeKind::Reply { items } => {
                let mut ir_items = Vec::with_capacity(items.len());
                for item in items {
                    let raw_segments = parse_segments(&item.text, self.effective_typst_mode(mode));
                    let segments = self.convert_segments(raw_segments, None, item.span)?;
                    ir_items.push(ReplyItemIr {
                        text: item.text.clone(),
                        segments,
                    });
                }
                self.chat.push(ChatLine::Reply(ReplyLine {
                    yuzutalk: YuzutalkSimple { kind: "REPLY" },
                    items: ir_items,
                    label: "回复".to_string(),
                    line_no: node.span.start_line(),
                }));
                Ok(())
            }
            NodeKind::Bond { content } => {
                let text = content.clone().unwrap_or_else(|| self.synth_bond_greeting());
                let raw_segments = parse_segments(&text, self.effective_typst_mode(mode));
                let default_target = self.last_speaker.clone();
                let segments =
                    self.convert_segments(raw_segments, default_target.as_deref(), node.span)?;
                self.chat.push(ChatLine::Bond(BondLine {
                    yuzutalk: YuzutalkSimple { kind: "BOND" },
                    content: text,
                    segments,
                    line_no: node.span.start_line(),
                }));
                Ok(())
            }
            NodeKind::Statement {
                kind: StatementKind::Narration,
                content,
                ..
            }
            | NodeKind::Block {
                kind: StatementKind::Narration,
                content,
                ..
            } => {
                let raw_segments = parse_segments(content, self.effective_typst_mode(mode));
                let segments = self.convert_segments(raw_segments, None, node.span)?;
                self.chat.push(ChatLine::Narration(NarrationLine {
                    yuzutalk: YuzutalkSimple { kind: "NARRATION" },
                    content: content.clone(),
                    segments,
                    line_no: node.span.start_line(),
                }));
                Ok(())
            }
            NodeKind::Statement {
                kind: StatementKind::Side(side),
                marker,
                content,
            }
            | NodeKind::Block {
                kind: StatementKind::Side(side),
                marker,
                content,
            } => self.emit_text(*side, marker, content.clone(), mode, node.span),
        }
    }

    fn into_ir(self) -> Ir {
        let custom_chars = self
            .custom_chars_order
            .iter()
            .filter_map(|id| self.custom_chars.get(id).cloned())
            .map(CustomCharTuple)
            .collect();
        Ir {
            meta: self.meta,
            typst_global: self.typst_global_parts.join("\n"),
            typst_assets_global: String::new(),
            custom_chars,
            chat: self.chat,
        }
    }
}

/// Fold a parsed AST into the IR (spec §4.2). Compilation is fatal on the
/// first error (spec §4.6, §7): on failure the returned IR is empty and the
/// diagnostic list has exactly one entry. Callers must not invoke this on
/// an AST produced alongside any parser diagnostics (spec §7.2).
pub fn compile(
    ast: &[Node],
    mode: ModeFlags,
    pack_registry: &dyn PackRegistry,
) -> (Ir, Vec<Diagnostic>, Vec<Warning>) {
    let mut state = CompilerState::new(pack_registry);
    let mut warnings = Vec::new();
    for node in ast {
        if let Err(diag) = state.apply_node(node, mode, &mut warnings) {
            return (Ir::new(), vec![diag], warnings);
        }
    }
    (state.into_ir(), Vec::new(), warnings)
}
