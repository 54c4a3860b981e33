//! The JSON-shaped intermediate representation emitted by the compiler
//! (spec §3.6, §6.2). Field ordering is part of the wire contract, so every
//! type here is a concrete struct/enum whose `Serialize` derive follows
//! declaration order — nothing is built as an ad-hoc `serde_json::Value`
//! map, which would not guarantee order.

use serde::Serialize;

/// An insertion-ordered string→string map, used for `meta` (spec §3.5:
/// "insertion-order preserved"). `HashMap` cannot make that guarantee, and
/// the teacher's dependency set has no ordered-map crate, so this is a thin
/// `Vec`-backed wrapper with manual `Serialize`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedMap(Vec<(String, String)>);

impl OrderedMap {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or overwrite `key`, preserving its original position on
    /// overwrite (spec §4.2 MetaKV: "last-write-wins").
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.0.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Serialize for OrderedMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CustomChar {
    pub char_id: String,
    pub avatar_ref: String,
    pub display_name: String,
}

impl Serialize for CustomCharTuple {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(3))?;
        seq.serialize_element(&self.0.char_id)?;
        seq.serialize_element(&self.0.avatar_ref)?;
        seq.serialize_element(&self.0.display_name)?;
        seq.end()
    }
}

/// `custom_chars` entries serialize as `[char_id, avatar_ref, display_name]`
/// 3-element arrays (spec §3.6), not objects.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomCharTuple(pub CustomChar);

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    Text {
        text: String,
    },
    Image {
        #[serde(rename = "ref")]
        ref_: String,
    },
    Expr {
        query: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        target_char_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        line_no: Option<usize>,
    },
}

/// A line is image-only iff it has exactly one image/expr segment and no
/// non-whitespace text segment (spec §4.5 `image_only` hint; not stored in
/// the IR, derived by downstream consumers — exposed here as a helper since
/// this crate is the natural place to define that derivation once).
pub fn is_image_only(segments: &[Segment]) -> bool {
    let mut media_count = 0;
    for seg in segments {
        match seg {
            Segment::Image { .. } | Segment::Expr { .. } => media_count += 1,
            Segment::Text { text } => {
                if !text.trim().is_empty() {
                    return false;
                }
            }
        }
    }
    media_count == 1
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct YuzutalkSimple {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct YuzutalkText {
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "nameOverride")]
    pub name_override: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TextLine {
    pub yuzutalk: YuzutalkText,
    pub char_id: String,
    pub side: &'static str,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_override: Option<String>,
    pub line_no: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NarrationLine {
    pub yuzutalk: YuzutalkSimple,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,
    pub line_no: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PagebreakLine {
    pub yuzutalk: YuzutalkSimple,
    pub line_no: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReplyItemIr {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReplyLine {
    pub yuzutalk: YuzutalkSimple,
    pub items: Vec<ReplyItemIr>,
    pub label: String,
    pub line_no: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BondLine {
    pub yuzutalk: YuzutalkSimple,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,
    pub line_no: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ChatLine {
    Text(TextLine),
    Narration(NarrationLine),
    Pagebreak(PagebreakLine),
    Reply(ReplyLine),
    Bond(BondLine),
}

impl ChatLine {
    pub fn line_no(&self) -> usize {
        match self {
            ChatLine::Text(l) => l.line_no,
            ChatLine::Narration(l) => l.line_no,
            ChatLine::Pagebreak(l) => l.line_no,
            ChatLine::Reply(l) => l.line_no,
            ChatLine::Bond(l) => l.line_no,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Ir {
    pub meta: OrderedMap,
    pub typst_global: String,
    pub typst_assets_global: String,
    pub custom_chars: Vec<CustomCharTuple>,
    pub chat: Vec<ChatLine>,
}

impl Ir {
    pub fn new() -> Self {
        Self {
            meta: OrderedMap::new(),
            typst_global: String::new(),
            typst_assets_global: String::new(),
            custom_chars: Vec::new(),
            chat: Vec::new(),
        }
    }
}

impl Default for Ir {
    fn default() -> Self {
        Self::new()
    }
}
