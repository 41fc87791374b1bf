//! Outliner exporter

use docbridge_core::model::{style, Block, MarkKind, TableBlock, TextBlock, TextStyle};
use docbridge_core::{ConvertError, ConvertResult, Document, ExportOptions, Exporter};
use tracing::debug;

use super::types::{Node, Page};
use super::{new_uid, rfc3339_to_millis, FORMAT};
use crate::nesting::nest;
use crate::render::{render_spans, InlineSyntax};

const UNTITLED: &str = "Untitled";

/// Serializes documents as a single-page outliner export
#[derive(Debug, Clone, Copy, Default)]
pub struct OutlinerExporter;

impl OutlinerExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for OutlinerExporter {
    fn name(&self) -> &str {
        FORMAT
    }

    fn target_format(&self) -> &str {
        FORMAT
    }

    fn export(&self, document: &Document, options: &ExportOptions) -> ConvertResult<String> {
        let metadata = &document.metadata;
        let mut page = Page {
            title: metadata
                .title
                .clone()
                .filter(|title| !title.trim().is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            children: export_blocks(&document.content),
            uid: Some(new_uid()),
            ..Page::default()
        };
        if options.include_metadata {
            page.create_time = metadata.created_at.as_deref().and_then(rfc3339_to_millis);
            page.edit_time = metadata.updated_at.as_deref().and_then(rfc3339_to_millis);
        }

        let pages = [page];
        let output = if options.pretty_print {
            serde_json::to_string_pretty(&pages)
        } else {
            serde_json::to_string(&pages)
        }
        .map_err(ConvertError::serialization)?;

        debug!("Exported {} blocks as outliner JSON", document.block_count());
        Ok(output)
    }
}

struct Outliner;

impl InlineSyntax for Outliner {
    fn delimiters(&self, mark: &str) -> Option<(&'static str, &'static str)> {
        match mark {
            style::STRONG => Some(("**", "**")),
            style::EM => Some(("__", "__")),
            style::STRIKE => Some(("~~", "~~")),
            style::HIGHLIGHT => Some(("^^", "^^")),
            _ => None,
        }
    }

    fn code(&self, text: &str) -> String {
        format!("`{text}`")
    }

    fn mark_def(&self, kind: &MarkKind, rendered: &str, plain: &str) -> String {
        match kind {
            MarkKind::Link { href, .. } => format!("[{rendered}]({href})"),
            MarkKind::WikiLink { target, .. } if plain == target || plain.is_empty() => {
                format!("[[{target}]]")
            }
            MarkKind::WikiLink { target, .. }
                if plain.strip_prefix('#') == Some(target.as_str()) =>
            {
                format!("#[[{target}]]")
            }
            MarkKind::WikiLink { target, .. } => format!("[{plain}]([[{target}]])"),
            MarkKind::BlockReference { block_uid } => format!("(({block_uid}))"),
            MarkKind::Attribute { name } => format!("{name}:: {rendered}"),
        }
    }
}

/// Convert a block sequence; list items nest under the block before them
fn export_blocks(blocks: &[Block]) -> Vec<Node> {
    let items = blocks.iter().map(|block| {
        let level = block
            .as_text()
            .and_then(|text| text.list_item)
            .map_or(0, |item| item.level);
        (Some(level), export_block(block))
    });
    nest(items, |parent: &mut Node, child| parent.children.push(child))
}

fn export_block(block: &Block) -> Node {
    match block {
        Block::Text(text) => export_text(text),
        Block::Code(code) => {
            let language = code.language.as_deref().unwrap_or_default();
            Node::new(new_uid(), format!("```{language}\n{}```", code.code))
        }
        Block::Image(image) => {
            let alt = image.alt.as_deref().or(image.caption.as_deref()).unwrap_or_default();
            Node::new(new_uid(), format!("![{alt}]({})", image.url))
        }
        Block::Callout(callout) => {
            let text = render_spans(&callout.spans, &callout.mark_defs, &Outliner);
            let mut node = Node::new(new_uid(), format!("> [!{}] {text}", callout.kind.as_str()));
            node.children = export_blocks(&callout.children);
            node
        }
        Block::Table(table) => {
            let mut node = Node::new(new_uid(), "{{[[table]]}}");
            node.children = table_rows(table);
            node
        }
        Block::Embed(embed) => Node::new(new_uid(), format!("{{{{[[embed]]: {}}}}}", embed.url)),
        Block::Extension(extension) => {
            let text = extension.to_text_block();
            let string = render_spans(&text.spans, &text.mark_defs, &Outliner);
            let mut node = Node::new(new_uid(), string);
            node.children = export_blocks(&extension.children);
            node
        }
    }
}

fn export_text(text: &TextBlock) -> Node {
    let (task, spans) = match text.task() {
        Some((done, spans)) => (Some(done), spans),
        None => (None, text.spans.clone()),
    };
    let rendered = render_spans(&spans, &text.mark_defs, &Outliner);

    let mut node = Node::new(new_uid(), String::new());
    node.string = match (task, text.style) {
        (Some(true), _) => format!("{{{{[[DONE]]}}}} {rendered}"),
        (Some(false), _) => format!("{{{{[[TODO]]}}}} {rendered}"),
        (None, TextStyle::Blockquote) => format!("> {rendered}"),
        (None, style) => match style.heading_level() {
            Some(level) => {
                let level = level.min(3);
                node.heading = Some(level);
                format!("{} {rendered}", "#".repeat(usize::from(level)))
            }
            None => rendered,
        },
    };
    node
}

/// Each row becomes a chain of nodes, one level per cell
fn table_rows(table: &TableBlock) -> Vec<Node> {
    table
        .rows
        .iter()
        .filter_map(|row| {
            row.cells.iter().rev().fold(None, |child: Option<Node>, cell| {
                let mut node = Node::new(new_uid(), cell.as_str());
                node.children.extend(child);
                Some(node)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outliner::OutlinerImporter;
    use docbridge_core::model::{
        CalloutBlock, CalloutKind, CodeBlock, ListKind, Metadata, Span, TableRow,
    };
    use docbridge_core::{ImportOptions, Importer};

    fn export(blocks: Vec<Block>) -> Vec<Page> {
        let doc = Document::new(blocks, Metadata::new().with_title("Notes"));
        let output = OutlinerExporter::new()
            .export(&doc, &ExportOptions::default())
            .unwrap();
        serde_json::from_str(&output).unwrap()
    }

    #[test]
    fn test_headings_tasks_and_nesting() {
        let pages = export(vec![
            TextBlock::heading(5, "Deep").into(),
            TextBlock::paragraph("Parent").into(),
            TextBlock::list_item(ListKind::Bullet, 1, "☐ todo").into(),
            TextBlock::list_item(ListKind::Number, 2, "☑ done").into(),
            TextBlock::paragraph("Next").into(),
        ]);

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "Notes");
        let nodes = &pages[0].children;
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].string, "### Deep");
        assert_eq!(nodes[0].heading, Some(3));
        assert_eq!(nodes[1].children[0].string, "{{[[TODO]]}} todo");
        assert_eq!(nodes[1].children[0].children[0].string, "{{[[DONE]]}} done");
        assert_eq!(nodes[2].string, "Next");
        assert!(nodes.iter().all(|n| n.uid.as_ref().is_some_and(|uid| uid.len() == 9)));
    }

    #[test]
    fn test_inline_marks() {
        let mut block = TextBlock::paragraph("Read ");
        let wiki = block.add_mark_def(MarkKind::WikiLink {
            target: "Page".into(),
            alias: None,
        });
        block.push_span(Span::new("Page").with_mark(wiki));
        block.push_span(Span::new(", "));
        let tag = block.add_mark_def(MarkKind::WikiLink {
            target: "tag".into(),
            alias: None,
        });
        block.push_span(Span::new("#tag").with_mark(tag));
        block.push_span(Span::new(" "));
        let reference = block.add_mark_def(MarkKind::BlockReference {
            block_uid: "abc123".into(),
        });
        block.push_span(Span::new("abc123").with_mark(reference));
        block.push_span(Span::new(" "));
        block.push_span(Span::new("it").with_mark(style::EM).with_mark(style::HIGHLIGHT));

        let pages = export(vec![block.into()]);
        assert_eq!(
            pages[0].children[0].string,
            "Read [[Page]], #[[tag]] ((abc123)) __^^it^^__"
        );
    }

    #[test]
    fn test_structured_blocks() {
        let pages = export(vec![
            CodeBlock::new(Some("rust".into()), "let x = 1;").into(),
            CalloutBlock::new(CalloutKind::Info)
                .with_spans([Span::new("Note this")])
                .with_children(vec![TextBlock::paragraph("inside").into()])
                .into(),
            TableBlock::new(vec![
                TableRow::header(vec!["a".into(), "b".into()]),
                TableRow::new(vec!["1".into(), "2".into()]),
            ])
            .into(),
        ]);
        let nodes = &pages[0].children;

        assert_eq!(nodes[0].string, "```rust\nlet x = 1;```");
        assert_eq!(nodes[1].string, "> [!info] Note this");
        assert_eq!(nodes[1].children[0].string, "inside");
        assert_eq!(nodes[2].string, "{{[[table]]}}");
        assert_eq!(nodes[2].children[1].string, "1");
        assert_eq!(nodes[2].children[1].children[0].string, "2");
    }

    #[test]
    fn test_timestamps_only_with_metadata() {
        let mut metadata = Metadata::new();
        metadata.created_at = Some("2023-11-14T22:13:20+00:00".into());
        let doc = Document::new(vec![TextBlock::paragraph("x").into()], metadata);
        let exporter = OutlinerExporter::new();

        let json = exporter.export(&doc, &ExportOptions::default()).unwrap();
        let bare: Vec<Page> = serde_json::from_str(&json).unwrap();
        assert_eq!(bare[0].title, UNTITLED);
        assert_eq!(bare[0].create_time, None);

        let full: Vec<Page> = serde_json::from_str(
            &exporter.export(&doc, &ExportOptions::new().with_metadata()).unwrap(),
        )
        .unwrap();
        assert_eq!(full[0].create_time, Some(1_700_000_000_000));
    }

    #[test]
    fn test_reimport_round_trip() {
        let blocks: Vec<Block> = vec![
            TextBlock::heading(2, "Plans").into(),
            TextBlock::paragraph("Parent").into(),
            TextBlock::list_item(ListKind::Bullet, 1, "☐ child").into(),
            CalloutBlock::new(CalloutKind::Warning)
                .with_spans([Span::new("careful")])
                .into(),
        ];
        let doc = Document::new(blocks, Metadata::new().with_title("Round"));
        let output = OutlinerExporter::new()
            .export(&doc, &ExportOptions::default())
            .unwrap();
        let back = OutlinerImporter::new()
            .import(&output, &ImportOptions::default())
            .unwrap();

        assert_eq!(back.metadata.title.as_deref(), Some("Round"));
        let texts: Vec<String> = back.content.iter().map(Block::plain_text).collect();
        assert_eq!(texts, vec!["Plans", "Parent", "☐ child", "careful"]);
        assert_eq!(back.content[0].as_text().unwrap().style, TextStyle::H2);
        assert!(matches!(&back.content[3], Block::Callout(c) if c.kind == CalloutKind::Warning));
    }
}
