//! Rich text runs to spans and back

use docbridge_core::model::{find_mark_def, push_merged, style, MarkDef, MarkKind, Span};

use super::types::{Annotations, Link, RichText, TextContent};

/// Longest text content the page API accepts in one run
const MAX_RUN_CHARS: usize = 2000;

const HIGHLIGHT_COLOR: &str = "yellow_background";

/// Plain text of a rich text array
pub(crate) fn plain(runs: &[RichText]) -> String {
    runs.iter().map(RichText::content).collect()
}

/// Convert runs to spans, allocating a link definition per linked run
///
/// Consecutive runs with the same link target share one definition.
pub(crate) fn to_spans(runs: &[RichText]) -> (Vec<Span>, Vec<MarkDef>) {
    let mut spans = Vec::new();
    let mut defs: Vec<MarkDef> = Vec::new();
    let mut last_link: Option<(String, String)> = None;

    for run in runs {
        let text = run.content();
        if text.is_empty() {
            continue;
        }

        let mut span = Span::new(text);
        let annotations = &run.annotations;
        for (on, mark) in [
            (annotations.bold, style::STRONG),
            (annotations.italic, style::EM),
            (annotations.strikethrough, style::STRIKE),
            (annotations.underline, style::UNDERLINE),
            (annotations.code, style::CODE),
            (annotations.color.ends_with("_background"), style::HIGHLIGHT),
        ] {
            if on {
                span = span.with_mark(mark);
            }
        }

        last_link = match run.link() {
            Some(url) => {
                let key = match &last_link {
                    Some((previous, key)) if previous == url => key.clone(),
                    _ => {
                        let def = MarkDef::link(url, None);
                        let key = def.key.clone();
                        defs.push(def);
                        key
                    }
                };
                span = span.with_mark(key.clone());
                Some((url.to_string(), key))
            }
            None => None,
        };

        push_merged(&mut spans, span);
    }

    (spans, defs)
}

/// Convert spans back to runs
///
/// Only link definitions have a rich-text equivalent; other parameterized marks keep
/// their visible text.
pub(crate) fn from_spans(spans: &[Span], defs: &[MarkDef]) -> Vec<RichText> {
    let mut runs = Vec::new();

    for span in spans {
        let annotations = Annotations {
            bold: span.has_mark(style::STRONG),
            italic: span.has_mark(style::EM),
            strikethrough: span.has_mark(style::STRIKE),
            underline: span.has_mark(style::UNDERLINE),
            code: span.has_mark(style::CODE),
            color: if span.has_mark(style::HIGHLIGHT) {
                HIGHLIGHT_COLOR.to_string()
            } else {
                "default".to_string()
            },
        };
        let link = span
            .def_marks()
            .filter_map(|key| find_mark_def(defs, key))
            .find_map(|def| match &def.kind {
                MarkKind::Link { href, .. } => Some(href.as_str()),
                _ => None,
            });

        for chunk in chunks(&span.text, MAX_RUN_CHARS) {
            runs.push(text_run(chunk, annotations.clone(), link));
        }
    }

    runs
}

/// A single unannotated run
pub(crate) fn plain_runs(text: &str) -> Vec<RichText> {
    chunks(text, MAX_RUN_CHARS)
        .into_iter()
        .map(|chunk| text_run(chunk, Annotations::default(), None))
        .collect()
}

fn text_run(content: &str, annotations: Annotations, link: Option<&str>) -> RichText {
    RichText {
        kind: "text".to_string(),
        text: Some(TextContent {
            content: content.to_string(),
            link: link.map(|url| Link {
                url: url.to_string(),
            }),
        }),
        annotations,
        plain_text: content.to_string(),
        href: link.map(str::to_string),
    }
}

/// Split on char boundaries into pieces of at most `max_chars` chars
fn chunks(text: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == max_chars {
            pieces.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}
