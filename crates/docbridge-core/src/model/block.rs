//! Block types for the intermediate document model
//!
//! Blocks are a closed sum type tagged by `_type` when serialized. Lists are flat:
//! a list item is a text block carrying a [`ListItem`] with a nesting level, and the
//! children of an item are the consecutive items that follow it at `level + 1`.

use serde::{Deserialize, Serialize};

use super::new_key;
use super::span::{spans_text, MarkDef, MarkKind, Span};

/// Checkbox prefix of an open task item
pub const TASK_OPEN: &str = "☐ ";
/// Checkbox prefix of a completed task item
pub const TASK_DONE: &str = "☑ ";

/// Paragraph style of a text block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextStyle {
    #[default]
    Normal,
    H1,
    H2,
    H3,
    H4,
    H5,
    H6,
    Blockquote,
}

impl TextStyle {
    /// Heading style for a level, clamped to 1..=6
    pub fn heading(level: u8) -> Self {
        match level {
            0 | 1 => TextStyle::H1,
            2 => TextStyle::H2,
            3 => TextStyle::H3,
            4 => TextStyle::H4,
            5 => TextStyle::H5,
            _ => TextStyle::H6,
        }
    }

    pub fn heading_level(&self) -> Option<u8> {
        match self {
            TextStyle::H1 => Some(1),
            TextStyle::H2 => Some(2),
            TextStyle::H3 => Some(3),
            TextStyle::H4 => Some(4),
            TextStyle::H5 => Some(5),
            TextStyle::H6 => Some(6),
            TextStyle::Normal | TextStyle::Blockquote => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextStyle::Normal => "normal",
            TextStyle::H1 => "h1",
            TextStyle::H2 => "h2",
            TextStyle::H3 => "h3",
            TextStyle::H4 => "h4",
            TextStyle::H5 => "h5",
            TextStyle::H6 => "h6",
            TextStyle::Blockquote => "blockquote",
        }
    }
}

/// Marker kind of a list item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Bullet,
    Number,
}

/// List membership of a text block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListItem {
    pub kind: ListKind,
    /// Nesting level, 1 for top-level items
    pub level: u32,
}

impl ListItem {
    /// Create a list item; levels below 1 are raised to 1
    pub fn new(kind: ListKind, level: u32) -> Self {
        Self {
            kind,
            level: level.max(1),
        }
    }
}

/// Paragraph, heading, quote or list item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(default)]
    pub style: TextStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_item: Option<ListItem>,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default)]
    pub mark_defs: Vec<MarkDef>,
}

impl TextBlock {
    pub fn new(style: TextStyle) -> Self {
        Self {
            key: new_key(),
            style,
            list_item: None,
            spans: Vec::new(),
            mark_defs: Vec::new(),
        }
    }

    /// Normal paragraph holding a single unmarked span
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(TextStyle::Normal).with_span(Span::new(text))
    }

    /// Heading holding a single unmarked span
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Self::new(TextStyle::heading(level)).with_span(Span::new(text))
    }

    /// List item holding a single unmarked span
    pub fn list_item(kind: ListKind, level: u32, text: impl Into<String>) -> Self {
        Self::new(TextStyle::Normal)
            .with_list_item(kind, level)
            .with_span(Span::new(text))
    }

    pub fn with_list_item(mut self, kind: ListKind, level: u32) -> Self {
        self.list_item = Some(ListItem::new(kind, level));
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.push_span(span);
        self
    }

    pub fn with_spans(mut self, spans: impl IntoIterator<Item = Span>) -> Self {
        for span in spans {
            self.push_span(span);
        }
        self
    }

    /// Append a span, merging it into the previous one when the marks are identical
    pub fn push_span(&mut self, span: Span) {
        push_merged(&mut self.spans, span);
    }

    /// Register a mark definition and return its key
    pub fn add_mark_def(&mut self, kind: MarkKind) -> String {
        let def = MarkDef::new(kind);
        let key = def.key.clone();
        self.mark_defs.push(def);
        key
    }

    pub fn plain_text(&self) -> String {
        spans_text(&self.spans)
    }

    pub fn is_list_item(&self) -> bool {
        self.list_item.is_some()
    }

    /// Checkbox state of a task item and its spans without the checkbox prefix
    pub fn task(&self) -> Option<(bool, Vec<Span>)> {
        let first = self.spans.first()?;
        let (checked, rest) = if let Some(rest) = first.text.strip_prefix(TASK_OPEN) {
            (false, rest)
        } else {
            (true, first.text.strip_prefix(TASK_DONE)?)
        };

        let mut spans = Vec::with_capacity(self.spans.len());
        push_merged(&mut spans, Span::marked(rest, first.marks.iter().cloned()));
        spans.extend(self.spans[1..].iter().cloned());
        Some((checked, spans))
    }

    pub fn is_empty(&self) -> bool {
        self.spans.iter().all(|span| span.text.trim().is_empty())
    }
}

/// Append a span, merging with the previous one when marks match
pub fn push_merged(spans: &mut Vec<Span>, span: Span) {
    if span.text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if last.marks == span.marks => last.text.push_str(&span.text),
        _ => spans.push(span),
    }
}

/// Fenced or indented code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl CodeBlock {
    pub fn new(language: Option<String>, code: impl Into<String>) -> Self {
        Self {
            key: new_key(),
            language: language.filter(|lang| !lang.trim().is_empty()),
            code: code.into(),
            filename: None,
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}

/// Image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageBlock {
    #[serde(rename = "_key")]
    pub key: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl ImageBlock {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            key: new_key(),
            url: url.into(),
            alt: None,
            caption: None,
            width: None,
            height: None,
        }
    }

    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into()).filter(|alt: &String| !alt.is_empty());
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into()).filter(|caption: &String| !caption.is_empty());
        self
    }

    pub fn with_size(mut self, width: Option<u32>, height: Option<u32>) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Callout flavor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalloutKind {
    Info,
    Warning,
    Error,
    Success,
    #[default]
    Note,
}

impl CalloutKind {
    /// Map a callout label (`[!tip]`, `[!danger]`, ...) onto a kind
    ///
    /// Labels outside the known alias sets fall back to [`CalloutKind::Note`].
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "info" | "tip" | "hint" | "important" | "abstract" | "summary" | "tldr" => {
                CalloutKind::Info
            }
            "warning" | "caution" | "attention" | "question" | "help" | "faq" => {
                CalloutKind::Warning
            }
            "error" | "danger" | "failure" | "fail" | "missing" | "bug" => CalloutKind::Error,
            "success" | "check" | "done" => CalloutKind::Success,
            _ => CalloutKind::Note,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CalloutKind::Info => "info",
            CalloutKind::Warning => "warning",
            CalloutKind::Error => "error",
            CalloutKind::Success => "success",
            CalloutKind::Note => "note",
        }
    }
}

/// Highlighted aside with its own inline content and optional nested blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalloutBlock {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(default)]
    pub kind: CalloutKind,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default)]
    pub mark_defs: Vec<MarkDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl CalloutBlock {
    pub fn new(kind: CalloutKind) -> Self {
        Self {
            key: new_key(),
            kind,
            spans: Vec::new(),
            mark_defs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_spans(mut self, spans: impl IntoIterator<Item = Span>) -> Self {
        for span in spans {
            push_merged(&mut self.spans, span);
        }
        self
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = children;
        self
    }

    pub fn plain_text(&self) -> String {
        spans_text(&self.spans)
    }
}

/// One table row
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<String>,
    #[serde(default)]
    pub header: bool,
}

impl TableRow {
    pub fn new(cells: Vec<String>) -> Self {
        Self {
            cells,
            header: false,
        }
    }

    pub fn header(cells: Vec<String>) -> Self {
        Self {
            cells,
            header: true,
        }
    }
}

/// Table of plain-text cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableBlock {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    /// Column count; may exceed the width of any row when cells are not populated
    #[serde(default)]
    pub column_count: usize,
}

impl TableBlock {
    pub fn new(rows: Vec<TableRow>) -> Self {
        let column_count = rows.iter().map(|row| row.cells.len()).max().unwrap_or(0);
        Self {
            key: new_key(),
            rows,
            column_count,
        }
    }

    /// Table with a known width and no populated cells
    pub fn with_width(column_count: usize) -> Self {
        Self {
            key: new_key(),
            rows: Vec::new(),
            column_count,
        }
    }

    pub fn has_header(&self) -> bool {
        self.rows.first().is_some_and(|row| row.header)
    }
}

/// Embedded external resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedBlock {
    #[serde(rename = "_key")]
    pub key: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl EmbedBlock {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            key: new_key(),
            url: url.into(),
            caption: None,
        }
    }
}

/// Format-specific block kind carried opaquely through the model
///
/// A format that knows `kind` can re-emit `payload` verbatim; every other format
/// renders `fallback` as a plain paragraph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionBlock {
    #[serde(rename = "_key")]
    pub key: String,
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub fallback: Vec<Span>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Block>,
}

impl ExtensionBlock {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            key: new_key(),
            kind: kind.into(),
            payload,
            fallback: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        push_merged(&mut self.fallback, Span::new(text));
        self
    }

    /// Fallback rendering as a plain text block
    pub fn to_text_block(&self) -> TextBlock {
        let mut block = TextBlock::new(TextStyle::Normal);
        if self.fallback.is_empty() {
            block.push_span(Span::new(format!("[{}]", self.kind)));
        } else {
            for span in &self.fallback {
                block.push_span(span.clone());
            }
        }
        block
    }
}

/// A structural unit of a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type")]
pub enum Block {
    #[serde(rename = "textBlock")]
    Text(TextBlock),
    #[serde(rename = "codeBlock")]
    Code(CodeBlock),
    #[serde(rename = "imageBlock")]
    Image(ImageBlock),
    #[serde(rename = "calloutBlock")]
    Callout(CalloutBlock),
    #[serde(rename = "tableBlock")]
    Table(TableBlock),
    #[serde(rename = "embedBlock")]
    Embed(EmbedBlock),
    #[serde(rename = "extensionBlock")]
    Extension(ExtensionBlock),
}

impl Block {
    pub fn key(&self) -> &str {
        match self {
            Block::Text(b) => &b.key,
            Block::Code(b) => &b.key,
            Block::Image(b) => &b.key,
            Block::Callout(b) => &b.key,
            Block::Table(b) => &b.key,
            Block::Embed(b) => &b.key,
            Block::Extension(b) => &b.key,
        }
    }

    /// The `_type` tag of this block
    pub fn type_name(&self) -> &'static str {
        match self {
            Block::Text(_) => "textBlock",
            Block::Code(_) => "codeBlock",
            Block::Image(_) => "imageBlock",
            Block::Callout(_) => "calloutBlock",
            Block::Table(_) => "tableBlock",
            Block::Embed(_) => "embedBlock",
            Block::Extension(_) => "extensionBlock",
        }
    }

    /// Nested blocks; only callouts and extensions nest
    pub fn children(&self) -> &[Block] {
        match self {
            Block::Callout(b) => &b.children,
            Block::Extension(b) => &b.children,
            Block::Text(_) | Block::Code(_) | Block::Image(_) | Block::Table(_) | Block::Embed(_) => {
                &[]
            }
        }
    }

    pub fn spans(&self) -> &[Span] {
        match self {
            Block::Text(b) => &b.spans,
            Block::Callout(b) => &b.spans,
            Block::Extension(b) => &b.fallback,
            Block::Code(_) | Block::Image(_) | Block::Table(_) | Block::Embed(_) => &[],
        }
    }

    pub fn mark_defs(&self) -> &[MarkDef] {
        match self {
            Block::Text(b) => &b.mark_defs,
            Block::Callout(b) => &b.mark_defs,
            _ => &[],
        }
    }

    pub fn as_text(&self) -> Option<&TextBlock> {
        match self {
            Block::Text(b) => Some(b),
            _ => None,
        }
    }

    /// Best-effort plain text of the block
    pub fn plain_text(&self) -> String {
        match self {
            Block::Text(b) => b.plain_text(),
            Block::Code(b) => b.code.clone(),
            Block::Image(b) => b.alt.clone().or_else(|| b.caption.clone()).unwrap_or_default(),
            Block::Callout(b) => b.plain_text(),
            Block::Table(b) => b
                .rows
                .iter()
                .map(|row| row.cells.join(" "))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Embed(b) => b.url.clone(),
            Block::Extension(b) => spans_text(&b.fallback),
        }
    }
}

impl From<TextBlock> for Block {
    fn from(block: TextBlock) -> Self {
        Block::Text(block)
    }
}

impl From<CodeBlock> for Block {
    fn from(block: CodeBlock) -> Self {
        Block::Code(block)
    }
}

impl From<ImageBlock> for Block {
    fn from(block: ImageBlock) -> Self {
        Block::Image(block)
    }
}

impl From<CalloutBlock> for Block {
    fn from(block: CalloutBlock) -> Self {
        Block::Callout(block)
    }
}

impl From<TableBlock> for Block {
    fn from(block: TableBlock) -> Self {
        Block::Table(block)
    }
}

impl From<EmbedBlock> for Block {
    fn from(block: EmbedBlock) -> Self {
        Block::Embed(block)
    }
}

impl From<ExtensionBlock> for Block {
    fn from(block: ExtensionBlock) -> Self {
        Block::Extension(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::span::style;

    #[test]
    fn test_task_prefix_split() {
        let block = TextBlock::list_item(ListKind::Bullet, 1, "☑ ship it")
            .with_span(Span::new(" now").with_mark(style::STRONG));
        let (checked, spans) = block.task().unwrap();
        assert!(checked);
        assert_eq!(spans_text(&spans), "ship it now");
        assert_eq!(spans.len(), 2);

        assert!(TextBlock::paragraph("plain").task().is_none());
        assert_eq!(TextBlock::paragraph("☐ ").task(), Some((false, Vec::new())));
    }

    #[test]
    fn test_heading_style_clamping() {
        assert_eq!(TextStyle::heading(0), TextStyle::H1);
        assert_eq!(TextStyle::heading(3), TextStyle::H3);
        assert_eq!(TextStyle::heading(9), TextStyle::H6);
        assert_eq!(TextStyle::H4.heading_level(), Some(4));
        assert_eq!(TextStyle::Blockquote.heading_level(), None);
    }

    #[test]
    fn test_list_level_is_positive() {
        let item = ListItem::new(ListKind::Bullet, 0);
        assert_eq!(item.level, 1);
    }

    #[test]
    fn test_push_span_merges_identical_marks() {
        let mut block = TextBlock::new(TextStyle::Normal);
        block.push_span(Span::new("Hello "));
        block.push_span(Span::new("world"));
        block.push_span(Span::new("!").with_mark(style::STRONG));
        block.push_span(Span::new(""));

        assert_eq!(block.spans.len(), 2);
        assert_eq!(block.spans[0].text, "Hello world");
        assert_eq!(block.plain_text(), "Hello world!");
    }

    #[test]
    fn test_callout_label_mapping() {
        assert_eq!(CalloutKind::from_label("TIP"), CalloutKind::Info);
        assert_eq!(CalloutKind::from_label("danger"), CalloutKind::Error);
        assert_eq!(CalloutKind::from_label("check"), CalloutKind::Success);
        assert_eq!(CalloutKind::from_label("caution"), CalloutKind::Warning);
        assert_eq!(CalloutKind::from_label("whatever"), CalloutKind::Note);
    }

    #[test]
    fn test_block_serialization_tags() {
        let block: Block = TextBlock::heading(2, "Title").into();
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["_type"], "textBlock");
        assert_eq!(json["style"], "h2");
        assert!(json.get("listItem").is_none());

        let block: Block = TextBlock::list_item(ListKind::Number, 2, "Item").into();
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["listItem"]["kind"], "number");
        assert_eq!(json["listItem"]["level"], 2);

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_children_only_on_nesting_kinds() {
        let callout = CalloutBlock::new(CalloutKind::Info)
            .with_children(vec![TextBlock::paragraph("inner").into()]);
        let block: Block = callout.into();
        assert_eq!(block.children().len(), 1);

        let block: Block = CodeBlock::new(Some("rust".into()), "fn main() {}").into();
        assert!(block.children().is_empty());
    }

    #[test]
    fn test_table_column_count() {
        let table = TableBlock::new(vec![
            TableRow::header(vec!["a".into(), "b".into()]),
            TableRow::new(vec!["1".into(), "2".into(), "3".into()]),
        ]);
        assert_eq!(table.column_count, 3);
        assert!(table.has_header());
    }

    #[test]
    fn test_extension_fallback() {
        let ext = ExtensionBlock::new("table_of_contents", serde_json::json!({}));
        assert_eq!(ext.to_text_block().plain_text(), "[table_of_contents]");

        let ext = ExtensionBlock::new("child_page", serde_json::json!({"title": "Sub"}))
            .with_fallback("Sub");
        assert_eq!(ext.to_text_block().plain_text(), "Sub");
    }
}
