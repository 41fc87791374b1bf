//! Inline micro-syntax of outliner strings
//!
//! Outliner nodes carry a single string, so styles, page links, block references and
//! attributes are all recovered here by a small left-to-right scanner.

use docbridge_core::model::{push_merged, style, MarkDef, Span};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Style toggles and the mark each one sets
const STYLE_DELIMITERS: [(&str, &str); 4] = [
    ("**", style::STRONG),
    ("__", style::EM),
    ("~~", style::STRIKE),
    ("^^", style::HIGHLIGHT),
];

static CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^`([^`]+)`").expect("code regex"));

/// `[alias]([[Page]])`
static ALIAS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([^\[\]\n]+)\]\(\[\[([^\[\]\n]+)\]\]\)").expect("alias regex")
});

static LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([^\[\]\n]+)\]\(([^()\s]+)\)").expect("link regex")
});

static BLOCK_REF_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\(([\w-]+)\)\)").expect("block reference regex"));

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#([\w/-]+)").expect("tag regex"));

/// Leading `key:: value`
static ATTRIBUTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^:\s`\[\]][^:`\[\]\n]*?)::[ \t]*(\S)").expect("attribute regex")
});

/// `{{TODO}}`, `{{[[TODO]]}}`, `{{[DONE]}}` and friends
static TASK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{\{\[{0,2}(TODO|DONE)\]{0,2}\}\}[ \t]*").expect("task regex")
});

/// Split a leading task token off `text`, returning whether it is done
pub(crate) fn take_task(text: &str) -> (Option<bool>, &str) {
    match TASK_REGEX.captures(text) {
        Some(caps) => {
            let done = caps.get(1).is_some_and(|state| state.as_str() == "DONE");
            let end = caps.get(0).map_or(0, |whole| whole.end());
            (Some(done), &text[end..])
        }
        None => (None, text),
    }
}

/// Parse an outliner string into spans and the definitions their marks point at
pub(crate) fn parse(text: &str) -> (Vec<Span>, Vec<MarkDef>) {
    let mut scanner = Scanner::default();

    match attribute(text) {
        Some((name, value_start)) => {
            let def = MarkDef::attribute(name);
            scanner.scope = Some(def.key.clone());
            scanner.defs.push(def);
            scanner.run(&text[value_start..]);
        }
        None => scanner.run(text),
    }

    (scanner.spans, scanner.defs)
}

fn attribute(text: &str) -> Option<(&str, usize)> {
    let caps = ATTRIBUTE_REGEX.captures(text)?;
    let name = caps.get(1)?.as_str().trim();
    Some((name, caps.get(2)?.start()))
}

#[derive(Default)]
struct Scanner {
    spans: Vec<Span>,
    defs: Vec<MarkDef>,
    active: Vec<&'static str>,
    /// Definition key applied to every span, used for attribute values
    scope: Option<String>,
    plain: String,
}

impl Scanner {
    fn run(&mut self, text: &str) {
        let lookahead = Lookahead::new(text);
        let mut i = 0;
        while i < text.len() {
            let word_start = text[..i].chars().next_back().map_or(true, char::is_whitespace);
            if let Some(consumed) = self.token(text, i, word_start, &lookahead) {
                i += consumed;
                continue;
            }
            let Some(ch) = text[i..].chars().next() else { break };
            self.plain.push(ch);
            i += ch.len_utf8();
        }
        self.flush();
    }

    /// Try every token starting at `at`; returns the bytes consumed
    fn token(
        &mut self,
        text: &str,
        at: usize,
        word_start: bool,
        lookahead: &Lookahead,
    ) -> Option<usize> {
        let rest = &text[at..];

        if rest.starts_with('`') {
            if let Some(caps) = CODE_REGEX.captures(rest) {
                let whole = caps.get(0)?;
                self.emit(caps.get(1)?.as_str(), Some(style::CODE), None);
                return Some(whole.end());
            }
        }

        for (index, (delimiter, mark)) in STYLE_DELIMITERS.into_iter().enumerate() {
            if !rest.starts_with(delimiter) {
                continue;
            }
            if let Some(position) = self.active.iter().position(|active| *active == mark) {
                self.flush();
                self.active.remove(position);
                return Some(delimiter.len());
            }
            if lookahead.closes(index, at + delimiter.len()) {
                self.flush();
                self.active.push(mark);
                return Some(delimiter.len());
            }
        }

        if rest.starts_with('[') && !rest.starts_with("[[") {
            if let Some(caps) = ALIAS_REGEX.captures(rest) {
                let alias = caps.get(1)?.as_str();
                let def = MarkDef::wiki_link(caps.get(2)?.as_str(), Some(alias.to_string()));
                self.emit(alias, None, Some(def));
                return Some(caps.get(0)?.end());
            }

            if let Some(caps) = LINK_REGEX.captures(rest) {
                let def = MarkDef::link(caps.get(2)?.as_str(), None);
                self.emit(caps.get(1)?.as_str(), None, Some(def));
                return Some(caps.get(0)?.end());
            }
        }

        if rest.starts_with("#[[") {
            if let Some((target, len)) = lookahead.bracketed(text, at + 1) {
                self.emit(&format!("#{target}"), None, Some(MarkDef::wiki_link(target, None)));
                return Some(1 + len);
            }
        }

        if let Some((target, len)) = lookahead.bracketed(text, at) {
            self.emit(target, None, Some(MarkDef::wiki_link(target, None)));
            return Some(len);
        }

        if rest.starts_with("((") {
            if let Some(caps) = BLOCK_REF_REGEX.captures(rest) {
                let uid = caps.get(1)?.as_str();
                self.emit(uid, None, Some(MarkDef::block_reference(uid)));
                return Some(caps.get(0)?.end());
            }
        }

        if word_start && rest.starts_with('#') {
            if let Some(caps) = TAG_REGEX.captures(rest) {
                let tag = caps.get(1)?.as_str();
                self.emit(&format!("#{tag}"), None, Some(MarkDef::wiki_link(tag, None)));
                return Some(caps.get(0)?.end());
            }
        }

        None
    }

    fn emit(&mut self, text: &str, extra: Option<&str>, def: Option<MarkDef>) {
        self.flush();
        let mut span = self.span(text);
        if let Some(mark) = extra {
            span = span.with_mark(mark);
        }
        if let Some(def) = def {
            span = span.with_mark(def.key.clone());
            self.defs.push(def);
        }
        push_merged(&mut self.spans, span);
    }

    fn flush(&mut self) {
        if self.plain.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.plain);
        let span = self.span(&text);
        push_merged(&mut self.spans, span);
    }

    fn span(&self, text: &str) -> Span {
        let span = Span::marked(text, self.active.iter().copied());
        match &self.scope {
            Some(key) => span.with_mark(key.clone()),
            None => span,
        }
    }
}

/// Closing positions of one scanned string, computed in a single pass
struct Lookahead {
    /// Offset of each `[[` to the end of its matching `]]`
    brackets: HashMap<usize, usize>,
    /// Last offset of each entry of [`STYLE_DELIMITERS`]
    last_style: [Option<usize>; STYLE_DELIMITERS.len()],
}

impl Lookahead {
    /// Pair `[[` with `]]` left to right; a newline drops every open bracket
    fn new(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut brackets = HashMap::new();
        let mut open = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            match bytes.get(i..i + 2) {
                Some(b"[[") => {
                    open.push(i);
                    i += 2;
                }
                Some(b"]]") => {
                    if let Some(start) = open.pop() {
                        brackets.insert(start, i + 2);
                    }
                    i += 2;
                }
                _ => {
                    if bytes[i] == b'\n' {
                        open.clear();
                    }
                    i += 1;
                }
            }
        }

        Self {
            brackets,
            last_style: STYLE_DELIMITERS.map(|(delimiter, _)| text.rfind(delimiter)),
        }
    }

    /// Whether style delimiter `index` occurs again at or after `from`
    fn closes(&self, index: usize, from: usize) -> bool {
        self.last_style[index].is_some_and(|last| last >= from)
    }

    /// `[[...]]` opening at `at`, as the inner target and the length of the whole token
    fn bracketed<'t>(&self, text: &'t str, at: usize) -> Option<(&'t str, usize)> {
        let end = *self.brackets.get(&at)?;
        let target = &text[at + 2..end - 2];
        (!target.trim().is_empty()).then_some((target, end - at))
    }
}
