//! Source maps tracing top-level blocks back to the original input

use serde::{Deserialize, Serialize};

/// One traced block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMapping {
    pub block_key: String,
    /// 1-based line of the block's first byte
    pub line: usize,
    /// 0-based byte column within that line
    pub column: usize,
    /// Index into [`SourceMap::sources`]
    pub source: usize,
    /// Native type name of the construct the block came from
    pub original_type: String,
}

/// Side table from blocks to positions in the original input
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub sources: Vec<String>,
    pub sources_content: Vec<String>,
    pub mappings: Vec<SourceMapping>,
}

impl SourceMap {
    pub fn find(&self, block_key: &str) -> Option<&SourceMapping> {
        self.mappings.iter().find(|m| m.block_key == block_key)
    }
}

/// Byte offset to line/column lookup
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(idx, _)| idx + 1));
        Self { line_starts }
    }

    /// (1-based line, 0-based column) of a byte offset
    pub fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line.saturating_sub(1)];
        (line.max(1), offset.saturating_sub(line_start))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// Accumulates mappings for one import
#[derive(Debug, Clone)]
pub struct SourceMapBuilder {
    format: String,
    content: String,
    index: LineIndex,
    mappings: Vec<SourceMapping>,
}

impl SourceMapBuilder {
    pub fn new(format: impl Into<String>, content: &str) -> Self {
        Self {
            format: format.into(),
            content: content.to_string(),
            index: LineIndex::new(content),
            mappings: Vec::new(),
        }
    }

    /// Record that `block_key` starts at byte `offset` of the input
    pub fn map_offset(&mut self, block_key: &str, offset: usize, original_type: &str) {
        let (line, column) = self.index.position(offset);
        self.mappings.push(SourceMapping {
            block_key: block_key.to_string(),
            line,
            column,
            source: 0,
            original_type: original_type.to_string(),
        });
    }

    /// Record the first occurrence of `needle` at or after `from`; returns the match offset
    pub fn map_needle(
        &mut self,
        block_key: &str,
        needle: &str,
        from: usize,
        original_type: &str,
    ) -> Option<usize> {
        let offset = self.content.get(from..)?.find(needle)? + from;
        self.map_offset(block_key, offset, original_type);
        Some(offset)
    }

    pub fn build(self) -> SourceMap {
        SourceMap {
            sources: vec![self.format],
            sources_content: vec![self.content],
            mappings: self.mappings,
        }
    }
}
