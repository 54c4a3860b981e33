//! Diagnostics: errors and warnings are plain data, never thrown control
//! flow (spec §9 "Exceptions / control flow"). The taxonomy is closed
//! (spec §4.6); adding a new kind means updating this enum and every match
//! on it, which is intentional.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::span::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DiagnosticKind {
    // SyntaxError
    ContinuationBeforeStatement,
    UnclosedBlock,
    MalformedDirective,
    EmptyReply,
    NestedDirective,
    BadMarkerOnPagebreak,
    HeaderKeyAfterBody,
    UnknownDirective,
    // NameError
    UnknownPack,
    DuplicateAlias,
    UnknownCharacter,
    UnknownShortId,
    BackrefOutOfRange,
    IndexOutOfRange,
    NoCurrentSpeaker,
    // AssetError
    UnknownAsset,
    InvalidAssetPath,
    // InvariantError: must never fire on valid input.
    InvariantError,
}

impl DiagnosticKind {
    /// Warnings are informational and do not halt compilation; everything
    /// else is fatal on first occurrence (spec §7).
    pub fn is_warning(&self) -> bool {
        false
    }
}

/// A secondary span with an explanatory note, e.g. the opener of an
/// unclosed block alongside the EOF span where the error was raised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub message: String,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub span: Span,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Note>,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, message: impl Into<String>, span: Span) -> Self {
        self.notes.push(Note {
            message: message.into(),
            span,
        });
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}: {} ({}:{})",
            self.kind, self.message, self.span.start.line, self.span.start.column
        )
    }
}

impl std::error::Error for Diagnostic {}

/// A non-fatal warning produced during compilation (spec §7): dropped alias
/// directives referencing unknown targets, and pack-registry EULA/version
/// notices passed through verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Warning {
    pub message: String,
    pub span: Span,
}
