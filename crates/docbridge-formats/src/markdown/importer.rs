//! Markdown importer built on the pulldown-cmark event stream

use docbridge_core::model::{
    style, Block, CalloutBlock, CodeBlock, ImageBlock, ListKind, MarkKind, Metadata,
    SourceMap, SourceMapBuilder, Span, TableBlock, TableRow, TextBlock, TextStyle, TASK_DONE,
    TASK_OPEN,
};
use docbridge_core::{ConvertResult, Document, ImportOptions, Importer};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use std::ops::Range;
use tracing::{debug, warn};

use super::frontmatter;
use super::inline;
use super::FORMAT;

/// Imports CommonMark/GFM text with note-taking extensions
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownImporter;

impl MarkdownImporter {
    pub fn new() -> Self {
        Self
    }
}

impl Importer for MarkdownImporter {
    fn name(&self) -> &str {
        FORMAT
    }

    fn supported_formats(&self) -> &[&str] {
        &["markdown", "md", "commonmark", "gfm"]
    }

    /// Anything that is not a JSON object or array
    fn detect(&self, input: &str) -> bool {
        !looks_like_json(input)
    }

    fn import(&self, input: &str, options: &ImportOptions) -> ConvertResult<Document> {
        let mut metadata = Metadata::from_source(FORMAT);

        let body_offset = match frontmatter::split(input) {
            Some(fm) => {
                if let Err(err) = fm.apply_to(&mut metadata) {
                    warn!("Ignoring front-matter: {}", err);
                    options.report(&err);
                }
                fm.body_offset
            }
            None => 0,
        };

        let source_map = options
            .include_source_map
            .then(|| SourceMapBuilder::new(FORMAT, input));
        let mut builder = BlockBuilder::new(body_offset, source_map);
        let body = &input[body_offset..];
        for (event, range) in Parser::new_ext(body, parser_options()).into_offset_iter() {
            match event {
                Event::Text(text) if follows_escape(body, range.start) => {
                    builder.escaped_text(&text, range.start + body_offset);
                }
                event => builder.handle(event, range),
            }
        }
        let (content, source_map) = builder.finish();

        if metadata.title.is_none() {
            metadata.title = content.iter().find_map(|block| match block {
                Block::Text(text) if text.style == TextStyle::H1 && text.list_item.is_none() => {
                    Some(text.plain_text())
                }
                _ => None,
            });
        }

        debug!("Imported {} markdown blocks", content.len());
        let document = Document::new(content, metadata);
        Ok(match source_map {
            Some(map) => document.with_source_map(map),
            None => document,
        })
    }
}

fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Whether the character at `at` was written with a backslash escape
///
/// pulldown-cmark starts a new text event at every escaped character, so checking the
/// first character of each event finds all of them.
fn follows_escape(source: &str, at: usize) -> bool {
    let backslashes = source.as_bytes()[..at]
        .iter()
        .rev()
        .take_while(|byte| **byte == b'\\')
        .count();
    backslashes % 2 == 1
}

fn looks_like_json(input: &str) -> bool {
    let trimmed = input.trim_start();
    (trimmed.starts_with('{') || trimmed.starts_with('['))
        && serde_json::from_str::<serde::de::IgnoredAny>(input).is_ok()
}

/// Convert pulldown-cmark HeadingLevel to u8
fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// A text block being filled from inline events
struct TextFrame {
    block: TextBlock,
    start: usize,
    original_type: &'static str,
    marks: Vec<String>,
    links: Vec<String>,
    /// Adjacent text events are coalesced here before extension splitting
    pending: String,
    /// Offsets into `pending` of backslash-escaped characters
    literal: Vec<usize>,
    /// The block text opens with an escaped character
    literal_start: bool,
    images: Vec<ImageBlock>,
}

impl TextFrame {
    fn new(block: TextBlock, start: usize, original_type: &'static str) -> Self {
        Self {
            block,
            start,
            original_type,
            marks: Vec::new(),
            links: Vec::new(),
            pending: String::new(),
            literal: Vec::new(),
            literal_start: false,
            images: Vec::new(),
        }
    }

    fn flush_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending);
        let literal = std::mem::take(&mut self.literal);
        inline::push_extended_text(&mut self.block, &text, &self.marks, &literal);
    }

    /// Queue text whose first character was escaped in the source
    fn push_escaped(&mut self, text: &str) {
        if self.block.is_empty() && self.pending.is_empty() {
            self.literal_start = true;
        }
        self.literal.push(self.pending.len());
        self.pending.push_str(text);
    }

    fn push_mark(&mut self, mark: String) {
        self.flush_pending();
        self.marks.push(mark);
    }

    fn pop_mark(&mut self, mark: &str) {
        self.flush_pending();
        if let Some(idx) = self.marks.iter().rposition(|m| m == mark) {
            self.marks.remove(idx);
        }
    }

    fn is_blank(&self) -> bool {
        self.block.is_empty() && self.pending.trim().is_empty() && self.images.is_empty()
    }
}

struct QuoteFrame {
    start: usize,
    blocks: Vec<Block>,
    /// The first block opens with an escaped character
    literal_start: bool,
}

struct CodeFrame {
    language: Option<String>,
    code: String,
    start: usize,
}

struct TableFrame {
    rows: Vec<TableRow>,
    row: Vec<String>,
    cell: String,
    start: usize,
}

struct ImageFrame {
    url: String,
    title: String,
    alt: String,
    start: usize,
}

/// Folds the event stream into blocks
struct BlockBuilder {
    offset: usize,
    source_map: Option<SourceMapBuilder>,
    root: Vec<Block>,
    quotes: Vec<QuoteFrame>,
    lists: Vec<ListKind>,
    text: Option<TextFrame>,
    code: Option<CodeFrame>,
    table: Option<TableFrame>,
    image: Option<ImageFrame>,
    html: Option<(String, usize)>,
}

impl BlockBuilder {
    fn new(offset: usize, source_map: Option<SourceMapBuilder>) -> Self {
        Self {
            offset,
            source_map,
            root: Vec::new(),
            quotes: Vec::new(),
            lists: Vec::new(),
            text: None,
            code: None,
            table: None,
            image: None,
            html: None,
        }
    }

    fn handle(&mut self, event: Event<'_>, range: Range<usize>) {
        let start = range.start + self.offset;
        match event {
            Event::Start(tag) => self.start_tag(tag, start),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text, start),
            Event::Code(code) => self.inline_code(&code, start),
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html, start),
            Event::SoftBreak => self.text(" ", start),
            Event::HardBreak => self.text("\n", start),
            Event::Rule => {
                self.flush_text();
                self.emit(TextBlock::paragraph("---").into(), start, "thematicBreak");
            }
            Event::TaskListMarker(checked) => {
                let glyph = if checked { TASK_DONE } else { TASK_OPEN };
                self.frame(start).pending.push_str(glyph);
            }
            Event::FootnoteReference(name) => self.text(&format!("[^{name}]"), start),
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>, start: usize) {
        match tag {
            Tag::Paragraph => {
                self.frame(start);
            }
            Tag::Heading { level, .. } => {
                let style = TextStyle::heading(heading_level_to_u8(level));
                let item_heading = self
                    .text
                    .as_ref()
                    .is_some_and(|frame| frame.block.is_list_item() && frame.is_blank());
                if item_heading {
                    if let Some(frame) = &mut self.text {
                        frame.block.style = style;
                    }
                } else {
                    self.flush_text();
                    self.text = Some(TextFrame::new(TextBlock::new(style), start, "heading"));
                }
            }
            Tag::BlockQuote { .. } => {
                self.flush_text();
                self.quotes.push(QuoteFrame {
                    start,
                    blocks: Vec::new(),
                    literal_start: false,
                });
            }
            Tag::CodeBlock(kind) => {
                self.flush_text();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().map(str::to_string)
                    }
                    CodeBlockKind::Indented => None,
                };
                self.code = Some(CodeFrame {
                    language,
                    code: String::new(),
                    start,
                });
            }
            Tag::HtmlBlock => {
                self.flush_text();
                self.html = Some((String::new(), start));
            }
            Tag::List(first_number) => {
                self.flush_text();
                self.lists.push(match first_number {
                    Some(_) => ListKind::Number,
                    None => ListKind::Bullet,
                });
            }
            Tag::Item => {
                self.flush_text();
                let kind = self.lists.last().copied().unwrap_or(ListKind::Bullet);
                let level = u32::try_from(self.lists.len()).unwrap_or(u32::MAX);
                let block = TextBlock::new(TextStyle::Normal).with_list_item(kind, level);
                self.text = Some(TextFrame::new(block, start, "listItem"));
            }
            Tag::Table(_) => {
                self.flush_text();
                self.table = Some(TableFrame {
                    rows: Vec::new(),
                    row: Vec::new(),
                    cell: String::new(),
                    start,
                });
            }
            Tag::TableHead | Tag::TableRow => {
                if let Some(table) = &mut self.table {
                    table.row.clear();
                }
            }
            Tag::TableCell => {
                if let Some(table) = &mut self.table {
                    table.cell.clear();
                }
            }
            Tag::Emphasis => self.push_style(style::EM, start),
            Tag::Strong => self.push_style(style::STRONG, start),
            Tag::Strikethrough => self.push_style(style::STRIKE, start),
            Tag::Link {
                dest_url, title, ..
            } => {
                if self.in_literal_context() {
                    return;
                }
                let frame = self.frame(start);
                frame.flush_pending();
                let key = frame.block.add_mark_def(MarkKind::Link {
                    href: dest_url.to_string(),
                    title: Some(title.to_string()).filter(|t| !t.is_empty()),
                });
                frame.links.push(key.clone());
                frame.push_mark(key);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                self.image = Some(ImageFrame {
                    url: dest_url.to_string(),
                    title: title.to_string(),
                    alt: String::new(),
                    start,
                });
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item => self.flush_text(),
            TagEnd::BlockQuote { .. } => self.finish_quote(),
            TagEnd::CodeBlock => {
                if let Some(code) = self.code.take() {
                    let mut text = code.code;
                    if text.ends_with('\n') {
                        text.pop();
                    }
                    self.emit(CodeBlock::new(code.language, text).into(), code.start, "codeBlock");
                }
            }
            TagEnd::HtmlBlock => {
                if let Some((html, start)) = self.html.take() {
                    let html = html.trim_end();
                    if !html.is_empty() {
                        self.emit(TextBlock::paragraph(html).into(), start, "html");
                    }
                }
            }
            TagEnd::List(_) => {
                self.flush_text();
                self.lists.pop();
            }
            TagEnd::TableHead => {
                if let Some(table) = &mut self.table {
                    let cells = std::mem::take(&mut table.row);
                    table.rows.push(TableRow::header(cells));
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = &mut self.table {
                    let cells = std::mem::take(&mut table.row);
                    table.rows.push(TableRow::new(cells));
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = &mut self.table {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell.trim().to_string());
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.emit(TableBlock::new(table.rows).into(), table.start, "table");
                }
            }
            TagEnd::Emphasis => self.pop_style(style::EM),
            TagEnd::Strong => self.pop_style(style::STRONG),
            TagEnd::Strikethrough => self.pop_style(style::STRIKE),
            TagEnd::Link => {
                if self.in_literal_context() {
                    return;
                }
                if let Some(frame) = &mut self.text {
                    if let Some(key) = frame.links.pop() {
                        frame.pop_mark(&key);
                    }
                }
            }
            TagEnd::Image => self.finish_image(),
            _ => {}
        }
    }

    /// Image alt text and table cells take text verbatim
    fn in_literal_context(&self) -> bool {
        self.image.is_some() || self.table.is_some()
    }

    /// The open text frame, starting a paragraph if none is open
    fn frame(&mut self, start: usize) -> &mut TextFrame {
        self.text.get_or_insert_with(|| {
            TextFrame::new(TextBlock::new(TextStyle::Normal), start, "paragraph")
        })
    }

    fn text(&mut self, text: &str, start: usize) {
        if let Some(image) = &mut self.image {
            image.alt.push_str(text);
        } else if let Some(code) = &mut self.code {
            code.code.push_str(text);
        } else if let Some(table) = &mut self.table {
            table.cell.push_str(text);
        } else if let Some((html, _)) = &mut self.html {
            html.push_str(text);
        } else {
            self.frame(start).pending.push_str(text);
        }
    }

    /// Text event opening with a backslash-escaped character
    fn escaped_text(&mut self, text: &str, start: usize) {
        let verbatim = self.in_literal_context() || self.code.is_some() || self.html.is_some();
        if verbatim {
            self.text(text, start);
        } else {
            self.frame(start).push_escaped(text);
        }
    }

    fn inline_code(&mut self, code: &str, start: usize) {
        if self.in_literal_context() {
            self.text(code, start);
            return;
        }
        let frame = self.frame(start);
        frame.flush_pending();
        let span = Span::marked(code, frame.marks.iter().cloned()).with_mark(style::CODE);
        frame.block.push_span(span);
    }

    fn push_style(&mut self, mark: &str, start: usize) {
        if self.in_literal_context() {
            return;
        }
        self.frame(start).push_mark(mark.to_string());
    }

    fn pop_style(&mut self, mark: &str) {
        if self.in_literal_context() {
            return;
        }
        if let Some(frame) = &mut self.text {
            frame.pop_mark(mark);
        }
    }

    fn finish_image(&mut self) {
        let Some(image) = self.image.take() else {
            return;
        };
        if let Some(table) = &mut self.table {
            table.cell.push_str(&image.alt);
            return;
        }
        let block = ImageBlock::new(image.url)
            .with_alt(image.alt)
            .with_caption(image.title);
        self.frame(image.start).images.push(block);
    }

    /// Close the open text frame and emit its block, followed by any inline images
    fn flush_text(&mut self) {
        let Some(mut frame) = self.text.take() else {
            return;
        };
        frame.flush_pending();
        let images = std::mem::take(&mut frame.images);
        let start = frame.start;
        let mut block = frame.block;

        let keep_text = !block.is_empty() || (block.is_list_item() && images.is_empty());
        if keep_text {
            let at_top_level = self.quotes.is_empty();
            if frame.literal_start {
                if let Some(quote) = self.quotes.last_mut() {
                    quote.literal_start |= quote.blocks.is_empty();
                }
            }
            let plain = block.list_item.is_none() && block.style == TextStyle::Normal;
            let marker = if at_top_level && plain && !frame.literal_start {
                inline::take_callout_marker(&mut block)
            } else {
                None
            };
            match marker {
                Some(kind) => {
                    let callout = inline::into_callout(block, kind);
                    self.emit(callout.into(), start, "callout");
                }
                None => self.emit(block.into(), start, frame.original_type),
            }
        }

        for image in images {
            self.emit(image.into(), start, "image");
        }
    }

    fn finish_quote(&mut self) {
        self.flush_text();
        let Some(quote) = self.quotes.pop() else {
            return;
        };

        let mut blocks = quote.blocks;
        let marker = match blocks.first_mut() {
            Some(Block::Text(first)) if first.list_item.is_none() && !quote.literal_start => {
                inline::take_callout_marker(first)
            }
            _ => None,
        };

        match marker {
            Some(kind) => {
                let mut rest = blocks.into_iter();
                let mut callout = match rest.next() {
                    Some(Block::Text(first)) => inline::into_callout(first, kind),
                    _ => CalloutBlock::new(kind),
                };
                callout.children = rest.collect();
                self.emit(callout.into(), quote.start, "callout");
            }
            None => {
                for block in blocks {
                    let block = match block {
                        Block::Text(mut text)
                            if text.list_item.is_none() && text.style == TextStyle::Normal =>
                        {
                            text.style = TextStyle::Blockquote;
                            Block::Text(text)
                        }
                        other => other,
                    };
                    self.emit(block, quote.start, "blockquote");
                }
            }
        }
    }

    fn emit(&mut self, block: Block, start: usize, original_type: &str) {
        match self.quotes.last_mut() {
            Some(quote) => quote.blocks.push(block),
            None => {
                if let Some(map) = &mut self.source_map {
                    map.map_offset(block.key(), start, original_type);
                }
                self.root.push(block);
            }
        }
    }

    fn finish(mut self) -> (Vec<Block>, Option<SourceMap>) {
        self.flush_text();
        while !self.quotes.is_empty() {
            self.finish_quote();
        }
        (self.root, self.source_map.map(SourceMapBuilder::build))
    }
}
