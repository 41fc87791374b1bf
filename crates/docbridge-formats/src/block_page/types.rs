//! Wire types of the block-page JSON format

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One block as delivered by the page API
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub children: Vec<RawBlock>,
    /// The type-named payload object plus any other fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Union of the payload fields used by the block kinds this adapter maps
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct Payload {
    pub rich_text: Vec<RichText>,
    /// Older API revisions name the rich text array `text`
    pub text: Vec<RichText>,
    pub color: Option<String>,
    pub checked: bool,
    pub language: Option<String>,
    pub caption: Vec<RichText>,
    pub url: Option<String>,
    pub external: Option<FileRef>,
    pub file: Option<FileRef>,
    pub table_width: usize,
    pub has_column_header: bool,
    pub cells: Vec<Vec<RichText>>,
    pub title: Option<String>,
    pub expression: Option<String>,
    pub children: Vec<RawBlock>,
}

impl Payload {
    pub fn text(&self) -> &[RichText] {
        if self.rich_text.is_empty() {
            &self.text
        } else {
            &self.rich_text
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct FileRef {
    pub url: String,
}

/// One rich-text run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct RichText {
    #[serde(rename = "type", default = "text_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    #[serde(default)]
    pub annotations: Annotations,
    #[serde(default)]
    pub plain_text: String,
    #[serde(default)]
    pub href: Option<String>,
}

fn text_kind() -> String {
    "text".to_string()
}

impl RichText {
    /// Visible text of the run
    pub fn content(&self) -> &str {
        match &self.text {
            Some(text) if self.plain_text.is_empty() => &text.content,
            _ => &self.plain_text,
        }
    }

    /// Link target, from either the text link or the run's href
    pub fn link(&self) -> Option<&str> {
        self.text
            .as_ref()
            .and_then(|text| text.link.as_ref())
            .map(|link| link.url.as_str())
            .or(self.href.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct TextContent {
    pub content: String,
    #[serde(default)]
    pub link: Option<Link>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Link {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: String,
}

impl Default for Annotations {
    fn default() -> Self {
        Self {
            bold: false,
            italic: false,
            strikethrough: false,
            underline: false,
            code: false,
            color: "default".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_block_keeps_payload() {
        let raw: RawBlock = serde_json::from_value(json!({
            "object": "block",
            "id": "b1",
            "type": "paragraph",
            "paragraph": {"rich_text": [{"type": "text", "text": {"content": "Hi"}, "plain_text": "Hi"}]}
        }))
        .unwrap();

        assert_eq!(raw.kind, "paragraph");
        assert_eq!(raw.id.as_deref(), Some("b1"));
        let payload: Payload = serde_json::from_value(raw.fields["paragraph"].clone()).unwrap();
        assert_eq!(payload.text()[0].content(), "Hi");
    }

    #[test]
    fn test_rich_text_defaults() {
        let rt: RichText = serde_json::from_value(json!({
            "text": {"content": "x", "link": {"url": "https://example.com"}}
        }))
        .unwrap();
        assert_eq!(rt.kind, "text");
        assert_eq!(rt.content(), "x");
        assert_eq!(rt.link(), Some("https://example.com"));
        assert_eq!(rt.annotations.color, "default");
    }
}
