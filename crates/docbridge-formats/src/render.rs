//! Shared span rendering for text-based exporters
//!
//! Text formats differ in their delimiters but agree on structure: style marks wrap a
//! single span, while a parameterized mark wraps the whole run of consecutive spans
//! that share its key.

use docbridge_core::model::{find_mark_def, spans_text, style, MarkDef, MarkKind, Span};

/// Inline syntax of one text format
pub(crate) trait InlineSyntax {
    /// Opening and closing delimiter for a style mark, if the format has one
    fn delimiters(&self, mark: &str) -> Option<(&'static str, &'static str)>;

    /// Render literal code text
    fn code(&self, text: &str) -> String;

    /// Render unmarked text
    fn text(&self, text: &str) -> String {
        text.to_string()
    }

    /// Wrap a rendered run carrying a parameterized mark
    fn mark_def(&self, kind: &MarkKind, rendered: &str, plain: &str) -> String;
}

/// Style marks outside code, innermost first
///
/// Strong wraps everything else and code always sits innermost, since delimiters inside
/// a code span are literal text.
const WRAP_ORDER: [&str; 5] = [
    style::UNDERLINE,
    style::HIGHLIGHT,
    style::STRIKE,
    style::EM,
    style::STRONG,
];

/// Render spans with their marks
pub(crate) fn render_spans(spans: &[Span], defs: &[MarkDef], syntax: &impl InlineSyntax) -> String {
    let mut out = String::new();
    let mut i = 0;

    while i < spans.len() {
        let Some(key) = spans[i].def_marks().next().map(str::to_string) else {
            out.push_str(&render_styled(&spans[i], syntax));
            i += 1;
            continue;
        };

        let end = spans[i..]
            .iter()
            .position(|span| !span.has_mark(&key))
            .map_or(spans.len(), |offset| i + offset);
        let run: Vec<Span> = spans[i..end]
            .iter()
            .map(|span| without_mark(span, &key))
            .collect();
        let rendered = render_spans(&run, defs, syntax);

        match find_mark_def(defs, &key) {
            Some(def) => out.push_str(&syntax.mark_def(&def.kind, &rendered, &spans_text(&run))),
            None => out.push_str(&rendered),
        }
        i = end;
    }

    out
}

fn without_mark(span: &Span, key: &str) -> Span {
    Span {
        text: span.text.clone(),
        marks: span.marks.iter().filter(|m| *m != key).cloned().collect(),
    }
}

/// Render one span whose marks are all style marks
///
/// Surrounding whitespace is kept outside the delimiters since most formats do not
/// allow a delimiter run to be flanked by whitespace on its inner side.
fn render_styled(span: &Span, syntax: &impl InlineSyntax) -> String {
    let text = span.text.as_str();
    let core = text.trim();
    if core.is_empty() {
        return syntax.text(text);
    }

    let lead_len = text.len() - text.trim_start().len();
    let lead = &text[..lead_len];
    let trail = &text[lead_len + core.len()..];

    let mut rendered = if span.has_mark(style::CODE) {
        syntax.code(core)
    } else {
        syntax.text(core)
    };
    for mark in WRAP_ORDER {
        if !span.has_mark(mark) {
            continue;
        }
        if let Some((open, close)) = syntax.delimiters(mark) {
            rendered = format!("{open}{rendered}{close}");
        }
    }

    format!("{}{}{}", syntax.text(lead), rendered, syntax.text(trail))
}

/// Longest run of `ch` in `text`
pub(crate) fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain;

    impl InlineSyntax for Plain {
        fn delimiters(&self, mark: &str) -> Option<(&'static str, &'static str)> {
            match mark {
                style::STRONG => Some(("<b>", "</b>")),
                style::EM => Some(("<i>", "</i>")),
                _ => None,
            }
        }

        fn code(&self, text: &str) -> String {
            format!("<c>{text}</c>")
        }

        fn mark_def(&self, kind: &MarkKind, rendered: &str, _plain: &str) -> String {
            match kind {
                MarkKind::Link { href, .. } => format!("<a {href}>{rendered}</a>"),
                _ => rendered.to_string(),
            }
        }
    }

    #[test]
    fn test_whitespace_stays_outside_delimiters() {
        let spans = vec![
            Span::new("a"),
            Span::new(" bold ").with_mark(style::STRONG),
            Span::new("b"),
        ];
        assert_eq!(render_spans(&spans, &[], &Plain), "a <b>bold</b> b");
    }

    #[test]
    fn test_code_is_innermost() {
        let spans = vec![Span::marked("x", [style::CODE, style::STRONG, style::EM])];
        assert_eq!(render_spans(&spans, &[], &Plain), "<b><i><c>x</c></i></b>");
    }

    #[test]
    fn test_link_runs_are_grouped() {
        let def = MarkDef::link("u", None);
        let spans = vec![
            Span::new("see "),
            Span::new("the ").with_mark(def.key.clone()),
            Span::marked("docs", [def.key.clone(), style::STRONG.to_string()]),
        ];
        assert_eq!(
            render_spans(&spans, &[def], &Plain),
            "see <a u>the <b>docs</b></a>"
        );
    }

    #[test]
    fn test_unresolved_def_renders_text() {
        let spans = vec![Span::new("dangling").with_mark("missing")];
        assert_eq!(render_spans(&spans, &[], &Plain), "dangling");
    }

    #[test]
    fn test_longest_run() {
        assert_eq!(longest_run("a ``` b ` c", '`'), 3);
        assert_eq!(longest_run("none", '`'), 0);
    }
}
