//! Block-page adapter
//!
//! JSON exported from block-based workspace tools: a page object, a paginated
//! `{"object": "list", "results": [...]}` envelope, or a bare array of blocks. Each block
//! carries its payload under a key equal to its `type`, with rich text as an array of
//! annotated runs.

mod exporter;
mod importer;
mod rich_text;
mod types;

use docbridge_core::model::CalloutKind;

pub use exporter::BlockPageExporter;
pub use importer::BlockPageImporter;

/// Format tag of this adapter
pub const FORMAT: &str = "block-page";

fn callout_kind_from_color(color: &str) -> CalloutKind {
    match color.trim_end_matches("_background") {
        "blue" => CalloutKind::Info,
        "yellow" | "orange" => CalloutKind::Warning,
        "red" => CalloutKind::Error,
        "green" => CalloutKind::Success,
        _ => CalloutKind::Note,
    }
}

fn callout_color(kind: CalloutKind) -> &'static str {
    match kind {
        CalloutKind::Info => "blue_background",
        CalloutKind::Warning => "yellow_background",
        CalloutKind::Error => "red_background",
        CalloutKind::Success => "green_background",
        CalloutKind::Note => "gray_background",
    }
}
