//! Block-page exporter

use docbridge_core::model::{new_key, Block, ListKind, Metadata, TextBlock, TextStyle};
use docbridge_core::{ConvertError, ConvertResult, Document, ExportOptions, Exporter};
use serde_json::{json, Map, Value};
use tracing::debug;

use super::rich_text;
use super::{callout_color, FORMAT};
use crate::nesting::nest;

/// Serializes documents as a block-page list envelope
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockPageExporter;

impl BlockPageExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for BlockPageExporter {
    fn name(&self) -> &str {
        FORMAT
    }

    fn target_format(&self) -> &str {
        FORMAT
    }

    fn export(&self, document: &Document, options: &ExportOptions) -> ConvertResult<String> {
        let mut envelope = Map::new();
        envelope.insert("object".into(), json!("list"));
        envelope.insert("results".into(), Value::Array(export_blocks(&document.content)));
        if options.include_metadata {
            envelope.insert("properties".into(), properties(&document.metadata));
        }

        let envelope = Value::Object(envelope);
        let output = if options.pretty_print {
            serde_json::to_string_pretty(&envelope)
        } else {
            serde_json::to_string(&envelope)
        }
        .map_err(ConvertError::serialization)?;

        debug!("Exported {} blocks as block-page JSON", document.block_count());
        Ok(output)
    }
}

/// Convert a block sequence, folding flat list items back under their parents
fn export_blocks(blocks: &[Block]) -> Vec<Value> {
    let items = blocks.iter().map(|block| {
        let level = block
            .as_text()
            .and_then(|text| text.list_item)
            .map(|item| item.level);
        (level, export_block(block))
    });
    nest(items, append_child)
}

fn append_child(parent: &mut Value, child: Value) {
    let Some(kind) = parent.get("type").and_then(Value::as_str).map(str::to_string) else {
        return;
    };
    let Some(payload) = parent.get_mut(&kind).and_then(Value::as_object_mut) else {
        return;
    };
    match payload.entry("children").or_insert_with(|| Value::Array(Vec::new())) {
        Value::Array(children) => children.push(child),
        other => *other = Value::Array(vec![child]),
    }
}

fn wrap(id: &str, kind: &str, payload: Value) -> Value {
    let mut object = Map::new();
    object.insert("object".into(), json!("block"));
    object.insert("id".into(), json!(id));
    object.insert("type".into(), json!(kind));
    object.insert(kind.to_string(), payload);
    Value::Object(object)
}

fn export_block(block: &Block) -> Value {
    match block {
        Block::Text(text) => export_text(text),
        Block::Code(code) => {
            let caption = code.filename.as_deref().map(rich_text::plain_runs).unwrap_or_default();
            wrap(
                &code.key,
                "code",
                json!({
                    "rich_text": rich_text::plain_runs(&code.code),
                    "language": code.language.as_deref().unwrap_or("plain text"),
                    "caption": caption,
                }),
            )
        }
        Block::Image(image) => {
            let caption = image
                .caption
                .as_deref()
                .or(image.alt.as_deref())
                .map(rich_text::plain_runs)
                .unwrap_or_default();
            wrap(
                &image.key,
                "image",
                json!({
                    "type": "external",
                    "external": {"url": image.url},
                    "caption": caption,
                }),
            )
        }
        Block::Callout(callout) => {
            let mut payload = json!({
                "rich_text": rich_text::from_spans(&callout.spans, &callout.mark_defs),
                "color": callout_color(callout.kind),
            });
            if !callout.children.is_empty() {
                payload["children"] = Value::Array(export_blocks(&callout.children));
            }
            wrap(&callout.key, "callout", payload)
        }
        Block::Table(table) => {
            let rows: Vec<Value> = table
                .rows
                .iter()
                .map(|row| {
                    let cells: Vec<Value> = (0..table.column_count)
                        .map(|column| {
                            let cell = row.cells.get(column).map(String::as_str).unwrap_or("");
                            json!(rich_text::plain_runs(cell))
                        })
                        .collect();
                    wrap(&new_key(), "table_row", json!({ "cells": cells }))
                })
                .collect();
            wrap(
                &table.key,
                "table",
                json!({
                    "table_width": table.column_count,
                    "has_column_header": table.has_header(),
                    "has_row_header": false,
                    "children": rows,
                }),
            )
        }
        Block::Embed(embed) => {
            let caption = embed.caption.as_deref().map(rich_text::plain_runs).unwrap_or_default();
            wrap(&embed.key, "embed", json!({ "url": embed.url, "caption": caption }))
        }
        Block::Extension(extension) => {
            let mut payload = match &extension.payload {
                Value::Object(object) => Value::Object(object.clone()),
                _ => Value::Object(Map::new()),
            };
            if !extension.children.is_empty() {
                payload["children"] = Value::Array(export_blocks(&extension.children));
            }
            wrap(&extension.key, &extension.kind, payload)
        }
    }
}

fn export_text(text: &TextBlock) -> Value {
    if let Some(item) = text.list_item {
        if item.kind == ListKind::Bullet {
            if let Some((checked, spans)) = text.task() {
                return wrap(
                    &text.key,
                    "to_do",
                    json!({
                        "rich_text": rich_text::from_spans(&spans, &text.mark_defs),
                        "checked": checked,
                    }),
                );
            }
        }
        let kind = match item.kind {
            ListKind::Bullet => "bulleted_list_item",
            ListKind::Number => "numbered_list_item",
        };
        return wrap(&text.key, kind, rich_payload(text));
    }

    let kind = match text.style {
        TextStyle::H1 => "heading_1",
        TextStyle::H2 => "heading_2",
        TextStyle::H3 | TextStyle::H4 | TextStyle::H5 | TextStyle::H6 => "heading_3",
        TextStyle::Blockquote => "quote",
        TextStyle::Normal if is_divider(text) => return wrap(&text.key, "divider", json!({})),
        TextStyle::Normal => "paragraph",
    };
    wrap(&text.key, kind, rich_payload(text))
}

fn rich_payload(text: &TextBlock) -> Value {
    json!({
        "rich_text": rich_text::from_spans(&text.spans, &text.mark_defs),
        "color": "default",
    })
}

fn is_divider(text: &TextBlock) -> bool {
    matches!(text.spans.as_slice(), [span] if span.marks.is_empty() && span.text == "---")
}

/// Page properties carrying the title and tags
fn properties(metadata: &Metadata) -> Value {
    let mut properties = Map::new();
    let title = metadata.title.as_deref().unwrap_or_default();
    properties.insert(
        "title".into(),
        json!({"type": "title", "title": rich_text::plain_runs(title)}),
    );
    if !metadata.tags.is_empty() {
        let options: Vec<Value> = metadata.tags.iter().map(|tag| json!({ "name": tag })).collect();
        properties.insert(
            "tags".into(),
            json!({"type": "multi_select", "multi_select": options}),
        );
    }
    Value::Object(properties)
}
