//! Outliner importer

use docbridge_core::model::{
    Block, CodeBlock, EmbedBlock, ImageBlock, ListKind, Metadata, SourceMapBuilder, Span,
    TableBlock, TableRow, TextBlock, TextStyle, TASK_DONE, TASK_OPEN,
};
use docbridge_core::{ConvertError, ConvertResult, Document, ImportOptions, Importer};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

use super::inline;
use super::types::{Node, Page};
use super::{millis_to_rfc3339, FORMAT};
use crate::markdown::inline::{into_callout, take_callout_marker};

static IMAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^!\[([^\]\n]*)\]\(([^()\s]+)\)$").expect("image regex")
});

static TABLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{\[{0,2}table\]{0,2}\}\}$").expect("table regex"));

static EMBED_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{\{\[{0,2}embed\]{0,2}:\s*(\S+?)\s*\}\}$").expect("embed regex")
});

static HEADING_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})\s+").expect("heading prefix regex"));

/// Imports outliner page exports
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlinerImporter;

impl OutlinerImporter {
    pub fn new() -> Self {
        Self
    }
}

impl Importer for OutlinerImporter {
    fn name(&self) -> &str {
        FORMAT
    }

    fn supported_formats(&self) -> &[&str] {
        &["outliner", "roam"]
    }

    fn detect(&self, input: &str) -> bool {
        let trimmed = input.trim_start();
        if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
            return false;
        }
        match serde_json::from_str::<Value>(input) {
            Ok(Value::Array(items)) => items.first().is_some_and(is_page),
            Ok(value) => is_page(&value),
            Err(_) => false,
        }
    }

    fn import(&self, input: &str, options: &ImportOptions) -> ConvertResult<Document> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| ConvertError::invalid_json(FORMAT, e))?;
        let pages: Vec<Page> = match value {
            Value::Array(_) => serde_json::from_value(value),
            Value::Object(_) => serde_json::from_value(value).map(|page| vec![page]),
            _ => {
                return Err(ConvertError::invalid_format(
                    FORMAT,
                    "expected a page or an array of pages",
                ))
            }
        }
        .map_err(|e| ConvertError::invalid_format(FORMAT, e.to_string()))?;

        let mut metadata = Metadata::from_source(FORMAT);
        if let Some(first) = pages.first() {
            if !first.title.is_empty() {
                metadata.title = Some(first.title.clone());
            }
            metadata.source_id = first.uid.clone();
            metadata.created_at = first.create_time.and_then(millis_to_rfc3339);
            metadata.updated_at = first.edit_time.and_then(millis_to_rfc3339);
        }

        let mut walker = Walker {
            input,
            source_map: options
                .include_source_map
                .then(|| SourceMapBuilder::new(FORMAT, input)),
            cursor: 0,
        };
        let mut content = Vec::new();
        let multi_page = pages.len() > 1;

        for page in &pages {
            if multi_page {
                content.push(TextBlock::heading(1, page.title.as_str()).into());
            }
            for node in &page.children {
                walker.node(node, 0, &mut content);
            }
        }

        debug!("Imported {} outliner pages into {} blocks", pages.len(), content.len());
        let document = Document::new(content, metadata);
        Ok(match walker.source_map {
            Some(map) => document.with_source_map(map.build()),
            None => document,
        })
    }
}

/// A page object: has a title and is not a block-page object
fn is_page(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    object.get("title").is_some_and(Value::is_string)
        && !object.contains_key("type")
        && !object.contains_key("object")
}

struct Walker<'a> {
    input: &'a str,
    source_map: Option<SourceMapBuilder>,
    cursor: usize,
}

impl Walker<'_> {
    /// Convert `node` found at `depth`, appending it and its descendants to `out`
    fn node(&mut self, node: &Node, depth: u32, out: &mut Vec<Block>) {
        let offset = self.locate(node);
        let block = self.convert(node, depth);
        if let (Some(map), Some(offset)) = (&mut self.source_map, offset) {
            map.map_offset(block.key(), offset, "block");
        }

        let consumes_children = matches!(&block, Block::Table(_) | Block::Callout(_));
        out.push(block);
        if !consumes_children {
            for child in &node.children {
                self.node(child, depth + 1, out);
            }
        }
    }

    fn convert(&mut self, node: &Node, depth: u32) -> Block {
        let (task, string) = inline::take_task(&node.string);

        if task.is_none() {
            if let Some(block) = self.special(node, string) {
                return block;
            }
        }

        let mut rest = string;
        let style = match (depth, node.heading) {
            (0, Some(level)) if level > 0 => {
                let heading = TextStyle::heading(level);
                if let Some(caps) = HEADING_PREFIX_REGEX.captures(rest) {
                    if caps.get(1).map(|hashes| hashes.len()) == Some(usize::from(level)) {
                        rest = &rest[caps.get(0).map_or(0, |whole| whole.end())..];
                    }
                }
                heading
            }
            _ => TextStyle::Normal,
        };

        let mut block = TextBlock::new(style);
        if depth > 0 {
            block = block.with_list_item(ListKind::Bullet, depth);
        }
        if let Some(done) = task {
            block.push_span(Span::new(if done { TASK_DONE } else { TASK_OPEN }));
        }
        let (spans, defs) = inline::parse(rest);
        block = block.with_spans(spans);
        block.mark_defs = defs;
        block.into()
    }

    /// Node strings that stand for a non-text block
    fn special(&mut self, node: &Node, string: &str) -> Option<Block> {
        if let Some(fenced) = string.strip_prefix("```") {
            let fenced = fenced.strip_suffix("```").unwrap_or(fenced);
            let (info, code) = fenced.split_once('\n').unwrap_or(("", fenced));
            let language = Some(info.trim().to_string()).filter(|lang| !lang.is_empty());
            return Some(CodeBlock::new(language, code.strip_suffix('\n').unwrap_or(code)).into());
        }

        if let Some(caps) = IMAGE_REGEX.captures(string) {
            let alt = caps.get(1).map_or("", |alt| alt.as_str());
            let url = caps.get(2).map_or("", |url| url.as_str());
            return Some(ImageBlock::new(url).with_alt(alt).into());
        }

        if let Some(caps) = EMBED_REGEX.captures(string) {
            return Some(EmbedBlock::new(caps.get(1).map_or("", |url| url.as_str())).into());
        }

        if TABLE_REGEX.is_match(string) {
            let rows = node
                .children
                .iter()
                .map(|row| TableRow::new(row_cells(row)))
                .collect();
            return Some(TableBlock::new(rows).into());
        }

        if let Some(quoted) = string.strip_prefix("> ") {
            let (spans, defs) = inline::parse(quoted);
            let mut block = TextBlock::new(TextStyle::Blockquote).with_spans(spans);
            block.mark_defs = defs;
            return Some(match take_callout_marker(&mut block) {
                Some(kind) => {
                    let mut children = Vec::new();
                    for child in &node.children {
                        self.node(child, 0, &mut children);
                    }
                    let mut callout = into_callout(block, kind);
                    callout.children = children;
                    callout.into()
                }
                None => block.into(),
            });
        }

        None
    }

    /// Byte offset of the node's uid in the input, scanning forward only
    fn locate(&mut self, node: &Node) -> Option<usize> {
        self.source_map.as_ref()?;
        let needle = format!("\"{}\"", node.uid.as_deref()?);
        let offset = self.input.get(self.cursor..)?.find(&needle)? + self.cursor;
        self.cursor = offset + needle.len();
        Some(offset)
    }
}

/// A table row is a chain of first children, one cell per level
fn row_cells(row: &Node) -> Vec<String> {
    let mut cells = Vec::new();
    let mut cell = Some(row);
    while let Some(node) = cell {
        cells.push(node.string.clone());
        cell = node.children.first();
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbridge_core::model::{find_mark_def, style, CalloutKind, MarkKind};
    use serde_json::json;
    use std::time::{Duration, Instant};

    fn import(value: Value) -> Document {
        OutlinerImporter::new()
            .import(&value.to_string(), &ImportOptions::default())
            .unwrap()
    }

    fn text(block: &Block) -> &TextBlock {
        block.as_text().expect("text block")
    }

    #[test]
    fn test_nodes_become_headings_paragraphs_and_items() {
        let doc = import(json!([{
            "title": "Daily Notes",
            "uid": "page1",
            "create-time": 1_700_000_000_000_i64,
            "children": [
                {"string": "## Plans", "uid": "a", "heading": 2},
                {"string": "Intro **bold**", "uid": "b", "children": [
                    {"string": "child", "uid": "c", "children": [
                        {"string": "grandchild", "uid": "d"}
                    ]}
                ]}
            ]
        }]));

        assert_eq!(doc.metadata.title.as_deref(), Some("Daily Notes"));
        assert_eq!(doc.metadata.source_id.as_deref(), Some("page1"));
        assert_eq!(doc.metadata.created_at.as_deref(), Some("2023-11-14T22:13:20+00:00"));
        assert_eq!(doc.block_count(), 4);

        let heading = text(&doc.content[0]);
        assert_eq!(heading.style, TextStyle::H2);
        assert_eq!(heading.plain_text(), "Plans");

        let intro = text(&doc.content[1]);
        assert!(intro.list_item.is_none());
        assert!(intro.spans[1].has_mark(style::STRONG));

        let levels: Vec<u32> = doc.content[2..]
            .iter()
            .map(|b| text(b).list_item.unwrap().level)
            .collect();
        assert_eq!(levels, vec![1, 2]);
        assert!(doc.is_valid());
    }

    #[test]
    fn test_cross_references() {
        let doc = import(json!([{
            "title": "Refs",
            "children": [{"string": "See [[Target]] and ((abc123))", "uid": "x"}]
        }]));

        let block = text(&doc.content[0]);
        let kinds: Vec<&MarkKind> = block
            .spans
            .iter()
            .flat_map(|span| span.def_marks())
            .map(|key| &find_mark_def(&block.mark_defs, key).unwrap().kind)
            .collect();
        assert_eq!(kinds.len(), 2);
        assert!(matches!(kinds[0], MarkKind::WikiLink { target, .. } if target == "Target"));
        assert!(matches!(kinds[1], MarkKind::BlockReference { block_uid } if block_uid == "abc123"));
    }

    #[test]
    fn test_tasks() {
        let doc = import(json!([{
            "title": "Tasks",
            "children": [{"string": "List", "children": [
                {"string": "{{[[TODO]]}} write tests"},
                {"string": "{{[DONE]}} ship"}
            ]}]
        }]));

        assert_eq!(doc.content[1].plain_text(), "☐ write tests");
        assert_eq!(doc.content[2].plain_text(), "☑ ship");
    }

    #[test]
    fn test_special_strings() {
        let doc = import(json!([{
            "title": "Special",
            "children": [
                {"string": "```rust\nfn main() {}```"},
                {"string": "![diagram](https://img.example/d.png)"},
                {"string": "> just a quote"},
                {"string": "> [!warning] careful", "children": [{"string": "inside"}]},
                {"string": "{{[[table]]}}", "children": [
                    {"string": "a", "children": [{"string": "b"}]},
                    {"string": "1", "children": [{"string": "2"}]}
                ]},
                {"string": "{{[[embed]]: https://video.example/v}}"}
            ]
        }]));

        assert_eq!(doc.block_count(), 6);
        let Block::Code(code) = &doc.content[0] else { panic!("expected code") };
        assert_eq!(code.language.as_deref(), Some("rust"));
        assert_eq!(code.code, "fn main() {}");

        let Block::Image(image) = &doc.content[1] else { panic!("expected image") };
        assert_eq!(image.alt.as_deref(), Some("diagram"));

        assert_eq!(text(&doc.content[2]).style, TextStyle::Blockquote);

        let Block::Callout(callout) = &doc.content[3] else { panic!("expected callout") };
        assert_eq!(callout.kind, CalloutKind::Warning);
        assert_eq!(callout.plain_text(), "careful");
        assert_eq!(callout.children.len(), 1);

        let Block::Table(table) = &doc.content[4] else { panic!("expected table") };
        assert_eq!(table.rows[1].cells, vec!["1", "2"]);

        assert!(matches!(&doc.content[5], Block::Embed(embed) if embed.url == "https://video.example/v"));
    }

    #[test]
    fn test_multiple_pages_get_title_headings() {
        let doc = import(json!([
            {"title": "One", "children": [{"string": "a"}]},
            {"title": "Two", "children": [{"string": "b"}]}
        ]));

        let texts: Vec<String> = doc.content.iter().map(Block::plain_text).collect();
        assert_eq!(texts, vec!["One", "a", "Two", "b"]);
        assert_eq!(text(&doc.content[2]).style, TextStyle::H1);
        assert_eq!(doc.metadata.title.as_deref(), Some("One"));
    }

    #[test]
    fn test_source_map_follows_uids() {
        let input = "[{\"title\": \"P\", \"children\": [\n  {\"string\": \"a\", \"uid\": \"u1\"},\n  {\"string\": \"b\", \"uid\": \"u2\"}\n]}]";
        let doc = OutlinerImporter::new()
            .import(input, &ImportOptions::new().with_source_map())
            .unwrap();

        let map = doc.source_map.unwrap();
        let lines: Vec<usize> = map.mappings.iter().map(|m| m.line).collect();
        assert_eq!(lines, vec![2, 3]);
        assert_eq!(map.find(doc.content[1].key()).unwrap().line, 3);
    }

    #[test]
    fn test_unclosed_brackets_import_in_linear_time() {
        let string = "[[".repeat(500_000);
        let started = Instant::now();
        let doc = import(json!([{"title": "Brackets", "children": [{"string": string}]}]));

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(doc.content[0].plain_text(), string);
        assert!(text(&doc.content[0]).mark_defs.is_empty());
    }

    #[test]
    fn test_errors_and_detection() {
        let importer = OutlinerImporter::new();
        assert!(matches!(
            importer.import("[{", &ImportOptions::default()),
            Err(ConvertError::InvalidJson { .. })
        ));
        assert!(matches!(
            importer.import("[{\"children\": []}]", &ImportOptions::default()),
            Err(ConvertError::InvalidFormat { .. })
        ));
        assert!(matches!(
            importer.import("\"text\"", &ImportOptions::default()),
            Err(ConvertError::InvalidFormat { .. })
        ));

        assert!(importer.detect(r#"[{"title": "P", "children": []}]"#));
        assert!(importer.detect(r#"{"title": "P"}"#));
        assert!(!importer.detect(r#"{"object": "page", "title": "P"}"#));
        assert!(!importer.detect("[]"));
    }
}
