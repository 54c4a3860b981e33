//! Mode configuration passed explicitly into both the line classifier and
//! the compiler (spec §5 "configuration is passed explicitly as
//! `mode_flags`"; spec §6.1 "Mode flags"). Never a global — see
//! SPEC_FULL.md §0.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationJoin {
    Newline,
    Space,
}

impl ContinuationJoin {
    pub fn separator(&self) -> &'static str {
        match self {
            ContinuationJoin::Newline => "\n",
            ContinuationJoin::Space => " ",
        }
    }
}

impl Default for ContinuationJoin {
    fn default() -> Self {
        ContinuationJoin::Newline
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeFlags {
    pub typst_mode: bool,
    pub join_continuation_with: ContinuationJoin,
}

impl Default for ModeFlags {
    fn default() -> Self {
        Self {
            typst_mode: false,
            join_continuation_with: ContinuationJoin::Newline,
        }
    }
}

impl ModeFlags {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn typst() -> Self {
        Self {
            typst_mode: true,
            ..Self::default()
        }
    }
}
