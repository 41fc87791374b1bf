//! Block-page importer

use docbridge_core::model::{
    Block, CalloutBlock, CodeBlock, EmbedBlock, ExtensionBlock, ImageBlock, ListKind, Metadata,
    SourceMapBuilder, Span, TableBlock, TableRow, TextBlock, TextStyle, TASK_DONE, TASK_OPEN,
};
use docbridge_core::{ConvertError, ConvertResult, Document, ImportOptions, Importer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::rich_text;
use super::types::{Payload, RawBlock, RichText};
use super::{callout_kind_from_color, FORMAT};

/// Non-text block kinds carried through as extension blocks without a warning
const KNOWN_EXTENSION_KINDS: &[&str] = &[
    "child_page",
    "child_database",
    "table_of_contents",
    "breadcrumb",
    "equation",
    "synced_block",
    "column_list",
    "column",
    "video",
    "audio",
    "file",
    "pdf",
    "link_preview",
    "link_to_page",
    "unsupported",
];

/// Imports block-page JSON (page object, list envelope or bare block array)
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockPageImporter;

impl BlockPageImporter {
    pub fn new() -> Self {
        Self
    }
}

impl Importer for BlockPageImporter {
    fn name(&self) -> &str {
        FORMAT
    }

    fn supported_formats(&self) -> &[&str] {
        &["block-page", "notion"]
    }

    fn detect(&self, input: &str) -> bool {
        let trimmed = input.trim_start();
        if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
            return false;
        }
        match serde_json::from_str::<Value>(input) {
            Ok(value) => looks_like_block_page(&value),
            Err(_) => false,
        }
    }

    fn import(&self, input: &str, options: &ImportOptions) -> ConvertResult<Document> {
        let value: Value =
            serde_json::from_str(input).map_err(|e| ConvertError::invalid_json(FORMAT, e))?;

        let mut metadata = Metadata::from_source(FORMAT);
        let raw_blocks = match value {
            Value::Array(items) => items,
            Value::Object(mut object) => {
                read_page_metadata(&object, &mut metadata);
                take_block_array(&mut object)?
            }
            _ => {
                return Err(ConvertError::invalid_format(
                    FORMAT,
                    "expected a page object, list envelope or block array",
                ))
            }
        };

        let mut source_map = options
            .include_source_map
            .then(|| SourceMapBuilder::new(FORMAT, input));
        let mut cursor = 0;
        let mut content = Vec::new();

        for (index, item) in raw_blocks.into_iter().enumerate() {
            let raw: RawBlock = serde_json::from_value(item).map_err(|e| {
                ConvertError::invalid_format(FORMAT, format!("block {index}: {e}"))
            })?;

            let first = content.len();
            convert_block(&raw, 0, &mut content)?;

            if let (Some(map), Some(id), Some(block)) =
                (&mut source_map, raw.id.as_deref(), content.get(first))
            {
                let needle = format!("\"{id}\"");
                if let Some(offset) = map.map_needle(block.key(), &needle, cursor, &raw.kind) {
                    cursor = offset + 1;
                }
            }
        }

        debug!("Imported {} block-page blocks", content.len());
        let document = Document::new(content, metadata);
        Ok(match source_map {
            Some(map) => document.with_source_map(map.build()),
            None => document,
        })
    }
}

/// Shape check used by detection
fn looks_like_block_page(value: &Value) -> bool {
    match value {
        Value::Object(object) => {
            matches!(
                object.get("object").and_then(Value::as_str),
                Some("list" | "page" | "block")
            ) || object.get("results").is_some_and(Value::is_array)
        }
        Value::Array(items) => items.first().is_some_and(is_raw_block),
        _ => false,
    }
}

fn is_raw_block(value: &Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };
    match object.get("type").and_then(Value::as_str) {
        Some(kind) => {
            object.get("object").and_then(Value::as_str) == Some("block")
                || object.contains_key(kind)
        }
        None => false,
    }
}

/// Pull the block list out of an envelope or page object
fn take_block_array(object: &mut Map<String, Value>) -> ConvertResult<Vec<Value>> {
    for key in ["results", "children", "blocks"] {
        match object.remove(key) {
            Some(Value::Array(items)) => return Ok(items),
            Some(_) => {
                return Err(ConvertError::invalid_format(
                    FORMAT,
                    format!("'{key}' is not an array"),
                ))
            }
            None => {}
        }
    }

    match object.get("object").and_then(Value::as_str) {
        Some("page") => Ok(Vec::new()),
        Some("block") => Ok(vec![Value::Object(std::mem::take(object))]),
        _ => Err(ConvertError::invalid_format(
            FORMAT,
            "object has no 'results', 'children' or 'blocks' array",
        )),
    }
}

fn read_page_metadata(page: &Map<String, Value>, metadata: &mut Metadata) {
    if let Some(id) = page.get("id").and_then(Value::as_str) {
        if page.get("object").and_then(Value::as_str) != Some("block") {
            metadata.source_id = Some(id.to_string());
        }
    }
    if let Some(created) = page.get("created_time").and_then(Value::as_str) {
        metadata.created_at = Some(created.to_string());
    }
    if let Some(edited) = page.get("last_edited_time").and_then(Value::as_str) {
        metadata.updated_at = Some(edited.to_string());
    }

    let Some(properties) = page.get("properties").and_then(Value::as_object) else {
        return;
    };
    for (name, property) in properties {
        match property.get("type").and_then(Value::as_str) {
            Some("title") => {
                metadata.title = property
                    .get("title")
                    .map(runs_text)
                    .filter(|title| !title.is_empty());
            }
            Some("multi_select") if name.eq_ignore_ascii_case("tags") => {
                let options = property.get("multi_select").and_then(Value::as_array);
                for option in options.into_iter().flatten() {
                    if let Some(tag) = option.get("name").and_then(Value::as_str) {
                        metadata.add_tag(tag);
                    }
                }
            }
            Some(kind) => metadata.insert_extra(name.clone(), property_value(kind, property)),
            None => metadata.insert_extra(name.clone(), property.clone()),
        }
    }
}

fn runs_text(value: &Value) -> String {
    serde_json::from_value::<Vec<RichText>>(value.clone())
        .map(|runs| rich_text::plain(&runs))
        .unwrap_or_default()
}

/// Simplified value of a page property
fn property_value(kind: &str, property: &Value) -> Value {
    let inner = property.get(kind).cloned().unwrap_or(Value::Null);
    match kind {
        "rich_text" => Value::String(runs_text(&inner)),
        "select" | "status" => inner.get("name").cloned().unwrap_or(Value::Null),
        "multi_select" => Value::Array(
            inner
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|option| option.get("name").cloned())
                .collect(),
        ),
        "date" => inner.get("start").cloned().unwrap_or(Value::Null),
        _ => inner,
    }
}

/// Convert one raw block, appending the result and its flattened children to `out`
///
/// `list_level` is the nesting level of the enclosing list item, 0 outside lists.
fn convert_block(raw: &RawBlock, list_level: u32, out: &mut Vec<Block>) -> ConvertResult<()> {
    let payload_value = raw.fields.get(&raw.kind).cloned().unwrap_or(Value::Null);
    let payload: Payload = match &payload_value {
        Value::Object(_) => serde_json::from_value(payload_value.clone()).map_err(|e| {
            ConvertError::invalid_format(FORMAT, format!("{} block: {e}", raw.kind))
        })?,
        _ => Payload::default(),
    };
    let children: Vec<&RawBlock> = raw.children.iter().chain(payload.children.iter()).collect();

    match raw.kind.as_str() {
        "paragraph" | "toggle" | "template" => {
            out.push(text_block(TextStyle::Normal, &payload).into());
            convert_children(&children, list_level, out)?;
        }
        "heading_1" | "heading_2" | "heading_3" => {
            let level = raw.kind.as_bytes()[raw.kind.len() - 1] - b'0';
            out.push(text_block(TextStyle::heading(level), &payload).into());
            convert_children(&children, list_level, out)?;
        }
        "quote" => {
            out.push(text_block(TextStyle::Blockquote, &payload).into());
            convert_children(&children, list_level, out)?;
        }
        "bulleted_list_item" | "numbered_list_item" | "to_do" => {
            let kind = if raw.kind == "numbered_list_item" {
                ListKind::Number
            } else {
                ListKind::Bullet
            };
            let level = list_level + 1;
            let mut block = TextBlock::new(TextStyle::Normal).with_list_item(kind, level);
            if raw.kind == "to_do" {
                block.push_span(Span::new(if payload.checked { TASK_DONE } else { TASK_OPEN }));
            }
            let (spans, defs) = rich_text::to_spans(payload.text());
            block = block.with_spans(spans);
            block.mark_defs = defs;
            out.push(block.into());
            convert_children(&children, level, out)?;
        }
        "code" => {
            let language = payload
                .language
                .clone()
                .filter(|language| language != "plain text");
            let mut block = CodeBlock::new(language, rich_text::plain(payload.text()));
            let caption = rich_text::plain(&payload.caption);
            if !caption.is_empty() {
                block = block.with_filename(caption);
            }
            out.push(block.into());
        }
        "callout" => {
            let kind = callout_kind_from_color(payload.color.as_deref().unwrap_or("default"));
            let (spans, defs) = rich_text::to_spans(payload.text());
            let mut callout = CalloutBlock::new(kind).with_spans(spans);
            callout.mark_defs = defs;
            let mut nested = Vec::new();
            convert_children(&children, 0, &mut nested)?;
            out.push(callout.with_children(nested).into());
        }
        "divider" => out.push(TextBlock::paragraph("---").into()),
        "image" => {
            let url = payload
                .external
                .as_ref()
                .or(payload.file.as_ref())
                .map(|file| file.url.clone())
                .or_else(|| payload.url.clone())
                .unwrap_or_default();
            let image = ImageBlock::new(url).with_caption(rich_text::plain(&payload.caption));
            out.push(image.into());
        }
        "table" => {
            let mut rows = Vec::new();
            for (index, child) in children.iter().enumerate() {
                if child.kind != "table_row" {
                    continue;
                }
                let row_payload: Payload = child
                    .fields
                    .get("table_row")
                    .cloned()
                    .map(serde_json::from_value)
                    .transpose()
                    .map_err(|e| ConvertError::invalid_format(FORMAT, format!("table_row: {e}")))?
                    .unwrap_or_default();
                let cells: Vec<String> = row_payload
                    .cells
                    .iter()
                    .map(|cell| rich_text::plain(cell))
                    .collect();
                rows.push(if index == 0 && payload.has_column_header {
                    TableRow::header(cells)
                } else {
                    TableRow::new(cells)
                });
            }
            let mut table = TableBlock::new(rows);
            table.column_count = table.column_count.max(payload.table_width);
            out.push(table.into());
        }
        "bookmark" => {
            let url = payload.url.clone().unwrap_or_default();
            out.push(TextBlock::paragraph(format!("[{url}]")).into());
        }
        "embed" => {
            let mut embed = EmbedBlock::new(payload.url.clone().unwrap_or_default());
            embed.caption = Some(rich_text::plain(&payload.caption)).filter(|c| !c.is_empty());
            out.push(embed.into());
        }
        kind if !payload.text().is_empty() => {
            warn!("Unknown block-page block type '{}', importing as paragraph", kind);
            out.push(text_block(TextStyle::Normal, &payload).into());
            convert_children(&children, list_level, out)?;
        }
        kind => {
            if !KNOWN_EXTENSION_KINDS.contains(&kind) {
                warn!("Unknown block-page block type '{}', keeping as extension", kind);
            }
            let mut extension = ExtensionBlock::new(kind, payload_value);
            if let Some(fallback) = payload.title.as_ref().or(payload.expression.as_ref()) {
                extension = extension.with_fallback(fallback.clone());
            }
            let mut nested = Vec::new();
            convert_children(&children, 0, &mut nested)?;
            extension.children = nested;
            out.push(extension.into());
        }
    }

    Ok(())
}

fn convert_children(
    children: &[&RawBlock],
    list_level: u32,
    out: &mut Vec<Block>,
) -> ConvertResult<()> {
    for child in children {
        convert_block(child, list_level, out)?;
    }
    Ok(())
}

fn text_block(style: TextStyle, payload: &Payload) -> TextBlock {
    let (spans, defs) = rich_text::to_spans(payload.text());
    let mut block = TextBlock::new(style).with_spans(spans);
    block.mark_defs = defs;
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbridge_core::model::{style, CalloutKind, MarkKind};
    use serde_json::json;

    fn rt(text: &str) -> Value {
        json!({"type": "text", "text": {"content": text}, "plain_text": text})
    }

    fn block(kind: &str, payload: Value) -> Value {
        let mut object = Map::new();
        object.insert("object".into(), json!("block"));
        object.insert("type".into(), json!(kind));
        object.insert(kind.into(), payload);
        Value::Object(object)
    }

    fn import(value: Value) -> Document {
        BlockPageImporter::new()
            .import(&value.to_string(), &ImportOptions::default())
            .unwrap()
    }

    #[test]
    fn test_list_envelope_with_basic_blocks() {
        let doc = import(json!({
            "object": "list",
            "results": [
                block("heading_2", json!({"rich_text": [rt("Section")]})),
                block("paragraph", json!({"rich_text": [
                    rt("Hello "),
                    {"type": "text", "text": {"content": "world", "link": {"url": "https://example.com"}},
                     "annotations": {"bold": true}, "plain_text": "world", "href": "https://example.com"}
                ]})),
                block("divider", json!({})),
                block("quote", json!({"rich_text": [rt("Quoted")]}))
            ]
        }));

        assert_eq!(doc.content.len(), 4);
        assert_eq!(doc.content[0].as_text().unwrap().style, TextStyle::H2);

        let para = doc.content[1].as_text().unwrap();
        assert_eq!(para.plain_text(), "Hello world");
        assert!(para.spans[1].has_mark(style::STRONG));
        assert!(matches!(&para.mark_defs[0].kind, MarkKind::Link { href, .. } if href == "https://example.com"));

        assert_eq!(doc.content[2].plain_text(), "---");
        assert_eq!(doc.content[3].as_text().unwrap().style, TextStyle::Blockquote);
        assert_eq!(doc.metadata.source.as_deref(), Some("block-page"));
        assert!(doc.is_valid());
    }

    #[test]
    fn test_nested_list_items_flatten() {
        let mut parent = block("bulleted_list_item", json!({"rich_text": [rt("parent")]}));
        parent["children"] = json!([
            block("numbered_list_item", json!({"rich_text": [rt("child")]})),
            block("to_do", json!({"rich_text": [rt("task")], "checked": true}))
        ]);
        let doc = import(json!([parent]));

        let levels: Vec<(String, ListKind, u32)> = doc
            .content
            .iter()
            .map(|b| {
                let t = b.as_text().unwrap();
                let item = t.list_item.unwrap();
                (t.plain_text(), item.kind, item.level)
            })
            .collect();
        assert_eq!(
            levels,
            vec![
                ("parent".to_string(), ListKind::Bullet, 1),
                ("child".to_string(), ListKind::Number, 2),
                ("☑ task".to_string(), ListKind::Bullet, 2),
            ]
        );
    }

    #[test]
    fn test_page_object_metadata() {
        let doc = import(json!({
            "object": "page",
            "id": "page-1",
            "created_time": "2024-01-01T00:00:00.000Z",
            "properties": {
                "Name": {"type": "title", "title": [rt("My Page")]},
                "Tags": {"type": "multi_select", "multi_select": [{"name": "a"}, {"name": "b"}]},
                "Status": {"type": "select", "select": {"name": "Done"}}
            },
            "children": [block("paragraph", json!({"rich_text": [rt("Body")]}))]
        }));

        assert_eq!(doc.metadata.title.as_deref(), Some("My Page"));
        assert_eq!(doc.metadata.source_id.as_deref(), Some("page-1"));
        assert_eq!(doc.metadata.created_at.as_deref(), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(doc.metadata.tags, vec!["a", "b"]);
        assert_eq!(doc.metadata.extra.get("Status"), Some(&json!("Done")));
        assert_eq!(doc.content.len(), 1);
    }

    #[test]
    fn test_code_callout_image_and_table() {
        let mut callout = block("callout", json!({"rich_text": [rt("Heads up")], "color": "red_background"}));
        callout["children"] = json!([block("paragraph", json!({"rich_text": [rt("inside")]}))]);

        let mut table = block("table", json!({"table_width": 3, "has_column_header": true}));
        table["children"] = json!([
            block("table_row", json!({"cells": [[rt("a")], [rt("b")]]})),
            block("table_row", json!({"cells": [[rt("1")], [rt("2")]]}))
        ]);

        let doc = import(json!([
            block("code", json!({"rich_text": [rt("let x = 1;")], "language": "rust", "caption": [rt("main.rs")]})),
            callout,
            block("image", json!({"type": "external", "external": {"url": "https://img.example/a.png"}, "caption": [rt("Pic")]})),
            table
        ]));

        let Block::Code(code) = &doc.content[0] else { panic!("expected code") };
        assert_eq!(code.language.as_deref(), Some("rust"));
        assert_eq!(code.filename.as_deref(), Some("main.rs"));

        let Block::Callout(callout) = &doc.content[1] else { panic!("expected callout") };
        assert_eq!(callout.kind, CalloutKind::Error);
        assert_eq!(callout.children.len(), 1);

        let Block::Image(image) = &doc.content[2] else { panic!("expected image") };
        assert_eq!(image.url, "https://img.example/a.png");
        assert_eq!(image.caption.as_deref(), Some("Pic"));

        let Block::Table(table) = &doc.content[3] else { panic!("expected table") };
        assert_eq!(table.column_count, 3);
        assert!(table.has_header());
        assert_eq!(table.rows[1].cells, vec!["1", "2"]);
    }

    #[test]
    fn test_extension_and_unknown_kinds() {
        let doc = import(json!([
            block("child_page", json!({"title": "Sub page"})),
            block("table_of_contents", json!({"color": "default"})),
            block("fancy_new_block", json!({"rich_text": [rt("still text")]})),
            block("bookmark", json!({"url": "https://example.com"})),
            block("embed", json!({"url": "https://video.example"}))
        ]));

        let Block::Extension(child) = &doc.content[0] else { panic!("expected extension") };
        assert_eq!(child.kind, "child_page");
        assert_eq!(child.payload["title"], "Sub page");
        assert_eq!(doc.content[0].plain_text(), "Sub page");

        assert!(matches!(&doc.content[1], Block::Extension(ext) if ext.kind == "table_of_contents"));
        assert_eq!(doc.content[2].plain_text(), "still text");
        assert_eq!(doc.content[3].plain_text(), "[https://example.com]");
        assert!(matches!(&doc.content[4], Block::Embed(embed) if embed.url == "https://video.example"));
    }

    #[test]
    fn test_errors() {
        let importer = BlockPageImporter::new();
        let err = importer.import("{not json", &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidJson { .. }));

        let err = importer
            .import(r#"{"object": "list", "results": 3}"#, &ImportOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidFormat { .. }));

        let err = importer
            .import(r#"[{"no_type": true}]"#, &ImportOptions::default())
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidFormat { .. }));

        let err = importer.import("42", &ImportOptions::default()).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidFormat { .. }));
    }

    #[test]
    fn test_source_map_tracks_block_ids() {
        let input = "[\n  {\"object\": \"block\", \"id\": \"b1\", \"type\": \"paragraph\", \"paragraph\": {}},\n  {\"object\": \"block\", \"id\": \"b2\", \"type\": \"divider\", \"divider\": {}}\n]";
        let doc = BlockPageImporter::new()
            .import(input, &ImportOptions::new().with_source_map())
            .unwrap();

        let map = doc.source_map.unwrap();
        assert_eq!(map.mappings.len(), 2);
        assert_eq!(map.mappings[0].line, 2);
        assert_eq!(map.mappings[1].line, 3);
        assert_eq!(map.mappings[1].original_type, "divider");
    }

    #[test]
    fn test_detect() {
        let importer = BlockPageImporter::new();
        assert!(importer.detect(r#"{"object": "list", "results": []}"#));
        assert!(importer.detect(r#"[{"type": "paragraph", "paragraph": {}}]"#));
        assert!(!importer.detect(r#"[{"title": "Page", "children": []}]"#));
        assert!(!importer.detect("# markdown"));
    }
}
