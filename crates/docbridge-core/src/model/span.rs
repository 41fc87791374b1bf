//! Spans and mark definitions
//!
//! A span is a run of text carrying zero or more marks. Style marks (bold, italic, ...)
//! are referenced by fixed names; parameterized marks (links, wiki links, block
//! references, attributes) are referenced by the key of a [`MarkDef`] stored on the
//! enclosing block.

use serde::{Deserialize, Serialize};

use super::new_key;

/// Fixed names for unparameterized style marks
pub mod style {
    pub const STRONG: &str = "strong";
    pub const EM: &str = "em";
    pub const STRIKE: &str = "strike";
    pub const CODE: &str = "code";
    pub const UNDERLINE: &str = "underline";
    pub const HIGHLIGHT: &str = "highlight";

    /// All style marks
    pub const ALL: [&str; 6] = [STRONG, EM, STRIKE, CODE, UNDERLINE, HIGHLIGHT];
}

/// Check whether a mark id names a built-in style rather than a mark definition
pub fn is_style_mark(mark: &str) -> bool {
    style::ALL.contains(&mark)
}

/// A run of text with marks
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<String>,
}

impl Span {
    /// Create an unmarked span
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    /// Create a span carrying the given marks
    pub fn marked<I, S>(text: impl Into<String>, marks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: text.into(),
            marks: marks.into_iter().map(Into::into).collect(),
        }
    }

    /// Add a mark (no-op if already present)
    pub fn with_mark(mut self, mark: impl Into<String>) -> Self {
        let mark = mark.into();
        if !self.marks.contains(&mark) {
            self.marks.push(mark);
        }
        self
    }

    pub fn has_mark(&self, mark: &str) -> bool {
        self.marks.iter().any(|m| m == mark)
    }

    /// Marks that reference a mark definition
    pub fn def_marks(&self) -> impl Iterator<Item = &str> {
        self.marks
            .iter()
            .map(String::as_str)
            .filter(|m| !is_style_mark(m))
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Payload of a parameterized mark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum MarkKind {
    #[serde(rename = "link")]
    Link {
        href: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    #[serde(rename = "wikiLink")]
    WikiLink {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
    },
    #[serde(rename = "blockReference", rename_all = "camelCase")]
    BlockReference { block_uid: String },
    #[serde(rename = "attribute")]
    Attribute { name: String },
}

impl MarkKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            MarkKind::Link { .. } => "link",
            MarkKind::WikiLink { .. } => "wikiLink",
            MarkKind::BlockReference { .. } => "blockReference",
            MarkKind::Attribute { .. } => "attribute",
        }
    }
}

/// Out-of-line payload for a parameterized mark, referenced by key from spans
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkDef {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(flatten)]
    pub kind: MarkKind,
}

impl MarkDef {
    /// Create a mark definition with a fresh key
    pub fn new(kind: MarkKind) -> Self {
        Self {
            key: new_key(),
            kind,
        }
    }

    pub fn link(href: impl Into<String>, title: Option<String>) -> Self {
        Self::new(MarkKind::Link {
            href: href.into(),
            title,
        })
    }

    pub fn wiki_link(target: impl Into<String>, alias: Option<String>) -> Self {
        Self::new(MarkKind::WikiLink {
            target: target.into(),
            alias,
        })
    }

    pub fn block_reference(block_uid: impl Into<String>) -> Self {
        Self::new(MarkKind::BlockReference {
            block_uid: block_uid.into(),
        })
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        Self::new(MarkKind::Attribute { name: name.into() })
    }
}

/// Look up a mark definition by key
pub fn find_mark_def<'a>(defs: &'a [MarkDef], key: &str) -> Option<&'a MarkDef> {
    defs.iter().find(|def| def.key == key)
}

/// Concatenate the text of a span sequence
pub fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(|span| span.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_marks() {
        assert!(is_style_mark("strong"));
        assert!(is_style_mark(style::HIGHLIGHT));
        assert!(!is_style_mark("a1b2c3"));
    }

    #[test]
    fn test_span_marks() {
        let span = Span::new("hello").with_mark(style::STRONG).with_mark(style::STRONG);
        assert_eq!(span.marks, vec!["strong"]);
        assert!(span.has_mark("strong"));

        let span = Span::marked("x", ["em", "k1"]);
        assert_eq!(span.def_marks().collect::<Vec<_>>(), vec!["k1"]);
    }

    #[test]
    fn test_mark_def_serialization() {
        let def = MarkDef::block_reference("abc123");
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["_type"], "blockReference");
        assert_eq!(json["blockUid"], "abc123");
        assert_eq!(json["_key"], def.key.as_str());

        let back: MarkDef = serde_json::from_value(json).unwrap();
        assert_eq!(back, def);
    }

    #[test]
    fn test_mark_def_keys_are_unique() {
        let a = MarkDef::link("https://a.example", None);
        let b = MarkDef::link("https://a.example", None);
        assert_ne!(a.key, b.key);
    }
}
