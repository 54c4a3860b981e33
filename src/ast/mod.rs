//! Abstract syntax tree emitted by the line classifier (spec §3.2, §4.1).
//!
//! The AST is a flat list of span-annotated nodes — no nesting (spec §1
//! Non-goals: "nested directive or block structures"). Node variants form a
//! closed tagged union; dispatch over them should be exhaustive (spec §9).

use serde::{Deserialize, Serialize};

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// The kind of a `Statement` or `Block` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatementKind {
    Narration,
    Side(Side),
}

/// Speaker marker prefix on a `>`/`<` statement (spec §3.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Marker {
    /// Inherit the current speaker on the same side.
    None,
    /// A selector string, possibly namespaced (`ns.name`).
    Explicit(String),
    /// `_` (n=1) or `_n`: n-th most recent distinct speaker on this side.
    Backref(usize),
    /// `~n`: n-th distinct speaker across the whole document.
    Index(usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyItemRaw {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    MetaKV {
        key: String,
        value: String,
    },
    TypstGlobal {
        value: String,
    },
    UsePack {
        pack_id: String,
        alias: String,
    },
    Alias {
        name: String,
        /// Empty string clears the alias.
        display: String,
    },
    TmpAlias {
        name: String,
        display: String,
    },
    AliasId {
        short_id: String,
        name: Option<String>,
    },
    UnaliasId {
        short_id: String,
    },
    CharId {
        short_id: Option<String>,
        display: String,
    },
    UncharId {
        short_id: String,
    },
    AvatarId {
        short_id: String,
        asset_ref: Option<String>,
    },
    UnavatarId {
        short_id: String,
    },
    AvatarOverride {
        name: String,
        /// Empty string clears the override.
        asset_ref: String,
    },
    PageBreak,
    Reply {
        items: Vec<ReplyItemRaw>,
    },
    Bond {
        /// `None` ⇒ synthesize the default greeting at compile time.
        content: Option<String>,
    },
    Statement {
        kind: StatementKind,
        marker: Marker,
        content: String,
    },
    Block {
        kind: StatementKind,
        marker: Marker,
        content: String,
    },
}

impl NodeKind {
    /// Short, stable name for diagnostics and tests; never shown to end users
    /// as the sole explanation, but useful for `Debug`-free assertions.
    pub fn variant_name(&self) -> &'static str {
        match self {
            NodeKind::MetaKV { .. } => "MetaKV",
            NodeKind::TypstGlobal { .. } => "TypstGlobal",
            NodeKind::UsePack { .. } => "UsePack",
            NodeKind::Alias { .. } => "Alias",
            NodeKind::TmpAlias { .. } => "TmpAlias",
            NodeKind::AliasId { .. } => "AliasId",
            NodeKind::UnaliasId { .. } => "UnaliasId",
            NodeKind::CharId { .. } => "CharId",
            NodeKind::UncharId { .. } => "UncharId",
            NodeKind::AvatarId { .. } => "AvatarId",
            NodeKind::UnavatarId { .. } => "UnavatarId",
            NodeKind::AvatarOverride { .. } => "AvatarOverride",
            NodeKind::PageBreak => "PageBreak",
            NodeKind::Reply { .. } => "Reply",
            NodeKind::Bond { .. } => "Bond",
            NodeKind::Statement { .. } => "Statement",
            NodeKind::Block { .. } => "Block",
        }
    }
}
