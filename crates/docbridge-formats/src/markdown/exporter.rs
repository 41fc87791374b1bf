//! Markdown exporter

use docbridge_core::model::{
    style, Block, ListItem, ListKind, MarkDef, MarkKind, Metadata, Span, TableBlock, TextBlock,
    TextStyle, TASK_DONE, TASK_OPEN,
};
use docbridge_core::{ConvertError, ConvertResult, Document, ExportOptions, Exporter};
use tracing::debug;

use super::FORMAT;
use crate::render::{longest_run, render_spans, InlineSyntax};

/// Serializes documents as CommonMark/GFM
///
/// Ordered lists are numbered from 1; the start number of an imported list is not kept.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownExporter;

impl MarkdownExporter {
    pub fn new() -> Self {
        Self
    }
}

impl Exporter for MarkdownExporter {
    fn name(&self) -> &str {
        FORMAT
    }

    fn target_format(&self) -> &str {
        FORMAT
    }

    fn export(&self, document: &Document, options: &ExportOptions) -> ConvertResult<String> {
        let mut out = String::new();
        if options.include_metadata {
            if let Some(front_matter) = front_matter(&document.metadata)? {
                out.push_str(&front_matter);
            }
        }

        out.push_str(&render_blocks(&document.content));
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }

        debug!("Exported {} blocks as markdown", document.block_count());
        Ok(out)
    }
}

struct Markdown;

impl InlineSyntax for Markdown {
    fn delimiters(&self, mark: &str) -> Option<(&'static str, &'static str)> {
        match mark {
            style::STRONG => Some(("**", "**")),
            style::EM => Some(("*", "*")),
            style::STRIKE => Some(("~~", "~~")),
            style::HIGHLIGHT => Some(("==", "==")),
            style::UNDERLINE => Some(("<u>", "</u>")),
            _ => None,
        }
    }

    fn code(&self, text: &str) -> String {
        let text = text.replace('\n', " ");
        let fence = "`".repeat(longest_run(&text, '`') + 1);
        let pad = if text.starts_with('`') || text.ends_with('`') {
            " "
        } else {
            ""
        };
        format!("{fence}{pad}{text}{pad}{fence}")
    }

    /// Escaped text with hard breaks
    fn text(&self, text: &str) -> String {
        escape_inline(text).replace('\n', "\\\n")
    }

    fn mark_def(&self, kind: &MarkKind, rendered: &str, plain: &str) -> String {
        match kind {
            MarkKind::Link { href, title } => {
                let href = link_destination(href);
                match title {
                    Some(title) => {
                        let title = title.replace('"', "\\\"");
                        format!("[{rendered}]({href} \"{title}\")")
                    }
                    None => format!("[{rendered}]({href})"),
                }
            }
            MarkKind::WikiLink { target, .. } if plain == target || plain.is_empty() => {
                format!("[[{target}]]")
            }
            MarkKind::WikiLink { target, .. } => format!("[[{target}|{plain}]]"),
            MarkKind::BlockReference { block_uid } => format!("(({block_uid}))"),
            MarkKind::Attribute { name } => format!("{}:: {rendered}", escape_inline(name)),
        }
    }
}

/// Backslash-escape the characters that could open inline syntax
///
/// `=`, `&` and `<` only open syntax next to certain characters, so they are left bare
/// elsewhere.
fn escape_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut previous = None;

    while let Some(ch) = chars.next() {
        let next = chars.peek().copied();
        let escape = match ch {
            '\\' | '`' | '*' | '_' | '[' | ']' | '~' => true,
            '=' => previous == Some('=') || next == Some('='),
            '&' => next.is_some_and(|next| next == '#' || next.is_ascii_alphanumeric()),
            '<' => next.is_some_and(|next| next.is_ascii_alphabetic() || "/!?".contains(next)),
            _ => false,
        };
        if escape {
            out.push('\\');
        }
        out.push(ch);
        previous = Some(ch);
    }
    out
}

/// Escape a line start that would otherwise open a block
fn escape_line_start(line: &str) -> String {
    let indent = line.len() - line.trim_start_matches(' ').len();
    let rest = &line[indent..];
    match block_marker(rest) {
        Some(at) if indent < 4 => format!("{}{}\\{}", &line[..indent], &rest[..at], &rest[at..]),
        _ => line.to_string(),
    }
}

/// Offset of the character to escape when `line` opens with a block marker
fn block_marker(line: &str) -> Option<usize> {
    let ends_marker = |after: &str| after.is_empty() || after.starts_with([' ', '\t']);

    let hashes = line.len() - line.trim_start_matches('#').len();
    if (1..=6).contains(&hashes) && ends_marker(&line[hashes..]) {
        return Some(0);
    }
    if line.starts_with('>') {
        return Some(0);
    }
    if line.starts_with('=') && line.trim_end().chars().all(|ch| ch == '=') {
        return Some(0);
    }
    if line.starts_with('+') && ends_marker(&line[1..]) {
        return Some(0);
    }
    if line.starts_with('-') {
        let rule = line.chars().all(|ch| matches!(ch, '-' | ' ' | '\t'));
        if rule || ends_marker(&line[1..]) {
            return Some(0);
        }
    }

    let digits = line.len() - line.trim_start_matches(|ch: char| ch.is_ascii_digit()).len();
    let after = &line[digits..];
    if (1..=9).contains(&digits) && after.starts_with(['.', ')']) && ends_marker(&after[1..]) {
        return Some(digits);
    }
    None
}

fn link_destination(href: &str) -> String {
    if href.contains([' ', '(', ')']) {
        format!("<{href}>")
    } else {
        href.to_string()
    }
}

/// Numbering and indentation of the list currently being written
#[derive(Default)]
struct ListState {
    /// Marker kind and item count per level
    counters: Vec<(ListKind, u64)>,
    /// Content column per level
    widths: Vec<usize>,
}

impl ListState {
    fn reset(&mut self) {
        self.counters.clear();
        self.widths.clear();
    }

    fn render_item(&mut self, block: &TextBlock, item: ListItem) -> String {
        let level = item.level.max(1) as usize;

        // Nested items sit at the parent's content column, which is the marker width
        // rather than two spaces; CommonMark only nests under `1. ` from three spaces.
        let indent = if level == 1 {
            0
        } else if let Some(width) = self.widths.get(level - 2) {
            *width
        } else {
            let missing = level - 1 - self.widths.len();
            self.widths.last().copied().unwrap_or(0) + 2 * missing
        };

        self.counters.truncate(level);
        while self.counters.len() < level {
            self.counters.push((item.kind, 0));
        }
        let counter = &mut self.counters[level - 1];
        if counter.0 != item.kind {
            *counter = (item.kind, 0);
        }
        counter.1 += 1;

        let marker = match item.kind {
            ListKind::Bullet => "- ".to_string(),
            ListKind::Number => format!("{}. ", counter.1),
        };

        self.widths.truncate(level - 1);
        while self.widths.len() < level - 1 {
            self.widths.push(indent);
        }
        self.widths.push(indent + marker.len());

        let mut content = render_text(block);
        if item.kind == ListKind::Bullet {
            if let Some(rest) = content.strip_prefix(TASK_OPEN) {
                content = format!("[ ] {rest}");
            } else if let Some(rest) = content.strip_prefix(TASK_DONE) {
                content = format!("[x] {rest}");
            }
        }

        let continuation = format!("\n{}", " ".repeat(indent + marker.len()));
        format!(
            "{}{}{}",
            " ".repeat(indent),
            marker,
            content.replace('\n', &continuation)
        )
    }
}

fn render_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut lists = ListState::default();
    let mut previous_was_item = false;

    for block in blocks {
        let item = block.as_text().and_then(|text| text.list_item);
        if !out.is_empty() {
            out.push_str(if previous_was_item && item.is_some() {
                "\n"
            } else {
                "\n\n"
            });
        }

        match (block, item) {
            (Block::Text(text), Some(item)) => out.push_str(&lists.render_item(text, item)),
            _ => {
                lists.reset();
                out.push_str(&render_block(block));
            }
        }
        previous_was_item = item.is_some();
    }

    out
}

/// Inline content of a text block with its heading prefix
fn render_text(block: &TextBlock) -> String {
    match block.style.heading_level() {
        Some(level) => {
            let mut inline = render_spans(&block.spans, &block.mark_defs, &Markdown);
            if inline.ends_with('#') {
                inline.insert(inline.len() - 1, '\\');
            }
            format!("{} {}", "#".repeat(usize::from(level)), inline)
        }
        None => render_inline(&block.spans, &block.mark_defs),
    }
}

/// Rendered spans with every line start escaped
fn render_inline(spans: &[Span], defs: &[MarkDef]) -> String {
    render_spans(spans, defs, &Markdown)
        .split('\n')
        .map(escape_line_start)
        .collect::<Vec<_>>()
        .join("\n")
}

/// The paragraph a thematic break imports as
fn is_thematic_break(block: &TextBlock) -> bool {
    block.style == TextStyle::Normal
        && block.list_item.is_none()
        && matches!(block.spans.as_slice(), [span] if span.text == "---" && span.marks.is_empty())
}

fn render_block(block: &Block) -> String {
    match block {
        Block::Text(text) if text.style == TextStyle::Blockquote => {
            quote_lines(&render_text(text))
        }
        Block::Text(text) if is_thematic_break(text) => "---".to_string(),
        Block::Text(text) => render_text(text),
        Block::Code(code) => {
            let fence = "`".repeat((longest_run(&code.code, '`') + 1).max(3));
            format!(
                "{fence}{}\n{}\n{fence}",
                code.language.as_deref().unwrap_or(""),
                code.code
            )
        }
        Block::Image(image) => {
            let alt = escape_inline(image.alt.as_deref().unwrap_or(""));
            let url = link_destination(&image.url);
            match &image.caption {
                Some(caption) => format!("![{alt}]({url} \"{}\")", caption.replace('"', "\\\"")),
                None => format!("![{alt}]({url})"),
            }
        }
        Block::Callout(callout) => {
            let mut body = format!("[!{}]", callout.kind.as_str());
            let inline = render_inline(&callout.spans, &callout.mark_defs);
            if !inline.is_empty() {
                body.push(' ');
                body.push_str(&inline);
            }
            let children = render_blocks(&callout.children);
            if !children.is_empty() {
                body.push_str("\n\n");
                body.push_str(&children);
            }
            quote_lines(&body)
        }
        Block::Table(table) => render_table(table),
        Block::Embed(embed) => match &embed.caption {
            Some(caption) => {
                format!("[{}]({})", escape_inline(caption), link_destination(&embed.url))
            }
            None => format!("<{}>", embed.url),
        },
        Block::Extension(extension) => {
            let mut out = render_text(&extension.to_text_block());
            let children = render_blocks(&extension.children);
            if !children.is_empty() {
                out.push_str("\n\n");
                out.push_str(&children);
            }
            out
        }
    }
}

fn quote_lines(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                ">".to_string()
            } else {
                format!("> {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// GFM pipe table; a table without a header row promotes its first row
fn render_table(table: &TableBlock) -> String {
    let columns = table
        .rows
        .iter()
        .map(|row| row.cells.len())
        .max()
        .unwrap_or(0)
        .max(table.column_count);
    if columns == 0 {
        return String::new();
    }

    let row_line = |cells: &[String]| {
        let cells: Vec<String> = (0..columns)
            .map(|idx| {
                cells
                    .get(idx)
                    .map(|cell| escape_inline(&cell.replace('\n', " ")).replace('|', "\\|"))
                    .unwrap_or_default()
            })
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let empty = Vec::new();
    let mut rows = table.rows.iter();
    let header = rows.next().map_or(&empty, |row| &row.cells);

    let mut lines = vec![
        row_line(header),
        format!("|{}", " --- |".repeat(columns)),
    ];
    lines.extend(rows.map(|row| row_line(&row.cells)));
    lines.join("\n")
}

/// YAML front-matter for the recognized metadata fields and extras
fn front_matter(metadata: &Metadata) -> ConvertResult<Option<String>> {
    let mut fields = serde_json::Map::new();
    let mut put = |key: &str, value: &Option<String>| {
        if let Some(value) = value {
            fields.insert(key.to_string(), serde_json::Value::from(value.as_str()));
        }
    };
    put("title", &metadata.title);
    put("author", &metadata.author);
    put("created", &metadata.created_at);
    put("updated", &metadata.updated_at);
    put("id", &metadata.source_id);

    if !metadata.tags.is_empty() {
        fields.insert("tags".to_string(), serde_json::Value::from(metadata.tags.clone()));
    }
    for (key, value) in &metadata.extra {
        fields.entry(key.clone()).or_insert_with(|| value.clone());
    }

    if fields.is_empty() {
        return Ok(None);
    }
    let yaml = serde_yaml::to_string(&fields).map_err(ConvertError::serialization)?;
    Ok(Some(format!("---\n{yaml}---\n\n")))
}
