//! Intermediate document model
//!
//! The shared tree every format converts through: a [`Document`] is an ordered list of
//! [`Block`]s plus [`Metadata`] and an optional [`SourceMap`]. Importers build it,
//! exporters read it; nothing in the engine mutates a document after import.
//!
//! Invariants every importer upholds:
//! - block keys are unique within a document
//! - every non-style mark on a span resolves to a [`MarkDef`] on the same block
//! - nested lists are flat: a child item follows its parent with `level + 1`

mod block;
mod document;
mod metadata;
mod source_map;
mod span;

pub use block::{
    push_merged, Block, CalloutBlock, CalloutKind, CodeBlock, EmbedBlock, ExtensionBlock,
    ImageBlock, ListItem, ListKind, TableBlock, TableRow, TextBlock, TextStyle, TASK_DONE,
    TASK_OPEN,
};
pub use document::{Document, IntegrityViolation};
pub use metadata::Metadata;
pub use source_map::{LineIndex, SourceMap, SourceMapBuilder, SourceMapping};
pub use span::{find_mark_def, is_style_mark, spans_text, style, MarkDef, MarkKind, Span};

/// Generate a fresh block or mark key
pub fn new_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
