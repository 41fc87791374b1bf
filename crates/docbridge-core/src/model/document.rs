//! The document value produced by importers and consumed by exporters

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use super::block::Block;
use super::metadata::Metadata;
use super::source_map::SourceMap;
use super::span::{find_mark_def, is_style_mark};

/// An imported document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub content: Vec<Block>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_map: Option<SourceMap>,
}

/// Referential-integrity problem found by [`Document::validate`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityViolation {
    #[error("block {block_key} uses mark '{mark}' with no matching markDef")]
    UnresolvedMark { block_key: String, mark: String },
    #[error("block key '{0}' is used more than once")]
    DuplicateKey(String),
}

impl Document {
    pub fn new(content: Vec<Block>, metadata: Metadata) -> Self {
        Self {
            content,
            metadata,
            source_map: None,
        }
    }

    pub fn with_source_map(mut self, source_map: SourceMap) -> Self {
        self.source_map = Some(source_map);
        self
    }

    /// Number of top-level blocks
    pub fn block_count(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Every block in document order, nested children included
    pub fn iter_blocks(&self) -> impl Iterator<Item = &Block> {
        let mut stack: Vec<&Block> = self.content.iter().rev().collect();
        std::iter::from_fn(move || {
            let block = stack.pop()?;
            stack.extend(block.children().iter().rev());
            Some(block)
        })
    }

    /// Deepest level of block nesting; top-level blocks are depth 0
    ///
    /// Iterative so that hostile documents cannot exhaust the stack here.
    pub fn max_depth(&self) -> usize {
        let mut max = 0;
        let mut stack: Vec<(&Block, usize)> = self.content.iter().map(|b| (b, 0)).collect();
        while let Some((block, depth)) = stack.pop() {
            max = max.max(depth);
            stack.extend(block.children().iter().map(|child| (child, depth + 1)));
        }
        max
    }

    /// Check key uniqueness and that every mark resolves in its block's markDefs
    pub fn validate(&self) -> Vec<IntegrityViolation> {
        let mut violations = Vec::new();
        let mut seen = HashSet::new();

        for block in self.iter_blocks() {
            if !seen.insert(block.key()) {
                violations.push(IntegrityViolation::DuplicateKey(block.key().to_string()));
            }
            for span in block.spans() {
                for mark in &span.marks {
                    if is_style_mark(mark) || find_mark_def(block.mark_defs(), mark).is_some() {
                        continue;
                    }
                    violations.push(IntegrityViolation::UnresolvedMark {
                        block_key: block.key().to_string(),
                        mark: mark.clone(),
                    });
                }
            }
        }

        violations
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Plain text of the top-level blocks separated by blank lines
    pub fn plain_text(&self) -> String {
        self.content
            .iter()
            .map(Block::plain_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::block::{CalloutBlock, CalloutKind, TextBlock};
    use crate::model::span::{MarkKind, Span};

    fn nested_callouts(depth: usize) -> Block {
        let mut block: Block = TextBlock::paragraph("leaf").into();
        for _ in 0..depth {
            block = CalloutBlock::new(CalloutKind::Note)
                .with_children(vec![block])
                .into();
        }
        block
    }

    #[test]
    fn test_max_depth() {
        let doc = Document::new(vec![TextBlock::paragraph("flat").into()], Metadata::new());
        assert_eq!(doc.max_depth(), 0);

        let doc = Document::new(vec![nested_callouts(3)], Metadata::new());
        assert_eq!(doc.max_depth(), 3);
        assert_eq!(doc.iter_blocks().count(), 4);
    }

    #[test]
    fn test_validate_detects_unresolved_marks() {
        let mut block = TextBlock::paragraph("ok");
        let key = block.add_mark_def(MarkKind::Link {
            href: "https://example.com".into(),
            title: None,
        });
        block.push_span(Span::new(" link").with_mark(key));
        block.push_span(Span::new(" broken").with_mark("dangling"));

        let doc = Document::new(vec![block.into()], Metadata::new());
        let violations = doc.validate();
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            &violations[0],
            IntegrityViolation::UnresolvedMark { mark, .. } if mark == "dangling"
        ));
    }

    #[test]
    fn test_validate_detects_duplicate_keys() {
        let block = TextBlock::paragraph("a");
        let mut copy = TextBlock::paragraph("b");
        copy.key = block.key.clone();

        let doc = Document::new(vec![block.into(), copy.into()], Metadata::new());
        assert!(!doc.is_valid());
    }

    #[test]
    fn test_document_serialization() {
        let doc = Document::new(
            vec![TextBlock::heading(1, "Hi").into()],
            Metadata::from_source("markdown"),
        );
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["content"][0]["_type"], "textBlock");
        assert_eq!(json["metadata"]["source"], "markdown");
        assert!(json.get("sourceMap").is_none());
    }
}
