//! Inline extensions the CommonMark parser does not know about
//!
//! pulldown-cmark hands these through as plain text, so they are split out of each
//! coalesced text run after parsing.

use docbridge_core::model::{style, CalloutBlock, CalloutKind, MarkKind, Span, TextBlock};
use regex::Regex;
use std::sync::LazyLock;

/// `[[Target]]`, `[[Target|Alias]]` or `==highlight==`
static INLINE_EXTENSION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[\[([^\[\]|\n]+)(?:\|([^\[\]\n]+))?\]\]|==([^=\n]+)==")
        .expect("inline extension regex")
});

/// Leading `[!kind]` callout marker with optional fold indicator
static CALLOUT_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[!([A-Za-z][\w-]*)\][+-]?[ \t]*").expect("callout marker regex")
});

/// Append a text run carrying `marks`, splitting out wiki links and highlights
///
/// `literal` holds offsets of characters that were backslash-escaped in the source; a
/// match covering any of them stays plain text.
pub(crate) fn push_extended_text(
    block: &mut TextBlock,
    text: &str,
    marks: &[String],
    literal: &[usize],
) {
    let mut last = 0;
    let mut search = 0;

    while let Some(caps) = INLINE_EXTENSION_REGEX.captures_at(text, search) {
        let Some(whole) = caps.get(0) else { break };
        if literal.iter().any(|offset| whole.range().contains(offset)) {
            // Delimiters are ASCII, so one byte on is still a char boundary
            search = whole.start() + 1;
            continue;
        }
        block.push_span(Span::marked(&text[last..whole.start()], marks.iter().cloned()));

        if let Some(target) = caps.get(1) {
            let target = target.as_str().trim().to_string();
            let alias = caps
                .get(2)
                .map(|alias| alias.as_str().trim().to_string())
                .filter(|alias| !alias.is_empty());
            let label = alias.clone().unwrap_or_else(|| target.clone());
            let key = block.add_mark_def(MarkKind::WikiLink { target, alias });
            block.push_span(Span::marked(label, marks.iter().cloned()).with_mark(key));
        } else if let Some(highlighted) = caps.get(3) {
            let span = Span::marked(highlighted.as_str(), marks.iter().cloned());
            block.push_span(span.with_mark(style::HIGHLIGHT));
        }

        last = whole.end();
        search = last;
    }

    block.push_span(Span::marked(&text[last..], marks.iter().cloned()));
}

/// Strip a leading `[!kind]` marker from the block's text and return the kind
///
/// The block is left untouched when it does not open with a marker.
pub(crate) fn take_callout_marker(block: &mut TextBlock) -> Option<CalloutKind> {
    let first = block.spans.first_mut()?;
    let (label, marker_len) = {
        let caps = CALLOUT_MARKER_REGEX.captures(&first.text)?;
        (caps.get(1)?.as_str().to_string(), caps.get(0)?.end())
    };

    first.text.replace_range(..marker_len, "");
    if first.text.is_empty() {
        block.spans.remove(0);
        if let Some(next) = block.spans.first_mut() {
            let trimmed = next.text.trim_start().to_string();
            next.text = trimmed;
        }
        block.spans.retain(|span| !span.text.is_empty());
    }

    Some(CalloutKind::from_label(&label))
}

/// Turn a text block whose marker was already taken into a callout
pub(crate) fn into_callout(block: TextBlock, kind: CalloutKind) -> CalloutBlock {
    CalloutBlock {
        key: block.key,
        kind,
        spans: block.spans,
        mark_defs: block.mark_defs,
        children: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docbridge_core::model::{find_mark_def, TextStyle};

    fn extended(text: &str) -> TextBlock {
        let mut block = TextBlock::new(TextStyle::Normal);
        push_extended_text(&mut block, text, &[], &[]);
        block
    }

    #[test]
    fn test_wiki_links_split_text() {
        let block = extended("See [[Other Note]] and [[Reference|alias]].");
        let texts: Vec<&str> = block.spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["See ", "Other Note", " and ", "alias", "."]);

        let key = &block.spans[3].marks[0];
        let def = find_mark_def(&block.mark_defs, key).unwrap();
        assert_eq!(
            def.kind,
            MarkKind::WikiLink {
                target: "Reference".into(),
                alias: Some("alias".into())
            }
        );
    }

    #[test]
    fn test_highlight() {
        let block = extended("a ==marked== b");
        assert_eq!(block.spans[1].text, "marked");
        assert!(block.spans[1].has_mark(style::HIGHLIGHT));
        assert_eq!(block.plain_text(), "a marked b");
    }

    #[test]
    fn test_escaped_characters_block_extensions() {
        let mut block = TextBlock::new(TextStyle::Normal);
        push_extended_text(&mut block, "[[not a link]] ==lit== [[Real]]", &[], &[0, 16]);
        assert_eq!(block.mark_defs.len(), 1);
        assert_eq!(block.plain_text(), "[[not a link]] ==lit== Real");
        assert!(block.spans.iter().all(|span| !span.has_mark(style::HIGHLIGHT)));
    }

    #[test]
    fn test_marks_carry_into_wiki_links() {
        let mut block = TextBlock::new(TextStyle::Normal);
        push_extended_text(&mut block, "[[Note]]", &[style::STRONG.to_string()], &[]);
        assert_eq!(block.spans.len(), 1);
        assert!(block.spans[0].has_mark(style::STRONG));
        assert_eq!(block.spans[0].marks.len(), 2);
    }

    #[test]
    fn test_take_callout_marker() {
        let mut block = TextBlock::paragraph("[!WARNING] Mind the gap");
        assert_eq!(take_callout_marker(&mut block), Some(CalloutKind::Warning));
        assert_eq!(block.plain_text(), "Mind the gap");

        let mut block = TextBlock::paragraph("[!tip]");
        assert_eq!(take_callout_marker(&mut block), Some(CalloutKind::Info));
        assert!(block.spans.is_empty());

        let mut block = TextBlock::paragraph("Plain [!note] text");
        assert_eq!(take_callout_marker(&mut block), None);
        assert_eq!(block.plain_text(), "Plain [!note] text");
    }
}
