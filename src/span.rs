//! Source position and span primitives.
//!
//! Mirrors the `Position`/`SourceSpan` pair used throughout the line
//! classifier and AST, except columns here count code points (spec §3.1)
//! rather than UTF-8 byte offsets, and line/column numbers are 1-based.

use serde::{Deserialize, Serialize};

/// A 1-based code-point position in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A span over source text. `start` is inclusive, `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A span covering a single line, from `start_col` to `end_col` (exclusive).
    pub fn on_line(line: usize, start_col: usize, end_col: usize) -> Self {
        Self {
            start: Position::new(line, start_col),
            end: Position::new(line, end_col),
        }
    }

    /// A zero-width span at a single point, used for synthesized nodes
    /// (e.g. a synthesized bond greeting) that have no literal source text.
    pub fn point(line: usize, column: usize) -> Self {
        Self {
            start: Position::new(line, column),
            end: Position::new(line, column),
        }
    }

    pub fn start_line(&self) -> usize {
        self.start.line
    }

    pub fn start_col(&self) -> usize {
        self.start.column
    }

    pub fn end_line(&self) -> usize {
        self.end.line
    }

    pub fn end_col(&self) -> usize {
        self.end.column
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(&self, other: &Span) -> Span {
        let start = if self.start <= other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end >= other.end {
            self.end
        } else {
            other.end
        };
        Span { start, end }
    }

    /// Extract the substring this span covers out of `lines`, where `lines`
    /// is the source split on `\n` (no trailing terminators). Used by the
    /// span-containment test property: a node's span, read back out of the
    /// source, must re-classify to the same node kind.
    pub fn text_of(&self, lines: &[&str]) -> String {
        if self.start.line == self.end.line {
            let line = lines.get(self.start.line - 1).copied().unwrap_or("");
            return substr_cols(line, self.start.column, self.end.column);
        }
        let mut out = String::new();
        for line_no in self.start.line..=self.end.line {
            let line = lines.get(line_no - 1).copied().unwrap_or("");
            if line_no == self.start.line {
                out.push_str(&substr_cols(line, self.start.column, usize::MAX));
            } else if line_no == self.end.line {
                out.push_str(&substr_cols(line, 1, self.end.column));
            } else {
                out.push_str(line);
            }
            if line_no != self.end.line {
                out.push('\n');
            }
        }
        out
    }
}

/// Slice `line` (a string of code points) from 1-based column `start_col`
/// (inclusive) to `end_col` (exclusive, may be `usize::MAX` for "to end").
fn substr_cols(line: &str, start_col: usize, end_col: usize) -> String {
    line.chars()
        .enumerate()
        .filter(|(i, _)| {
            let col = i + 1;
            col >= start_col && col < end_col
        })
        .map(|(_, c)| c)
        .collect()
}
