//! Markdown adapter
//!
//! CommonMark with GFM tables, strikethrough and task lists, plus the note-taking
//! extensions commonly layered on top:
//!
//! - Wiki links: `[[Target]]`, `[[Target|Alias]]`
//! - Highlights: `==text==`
//! - Callouts: `> [!kind] text`
//! - Front-matter: YAML between `---` fences or TOML between `+++` fences

mod exporter;
mod frontmatter;
mod importer;
pub(crate) mod inline;

pub use exporter::MarkdownExporter;
pub use importer::MarkdownImporter;

/// Format tag of this adapter
pub const FORMAT: &str = "markdown";
