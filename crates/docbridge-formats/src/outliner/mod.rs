//! Outliner adapter
//!
//! JSON exported by outliner note tools: an array of pages, each an ordered tree of nodes
//! whose text lives in one `string` field. Nested nodes map to bullet list items, and
//! the inline syntax (`**bold**`, `__italic__`, `^^highlight^^`, `[[Page]]`, `#tag`,
//! `((uid))`, `key:: value`) is parsed out of that string.

mod exporter;
mod importer;
mod inline;
mod types;

use chrono::DateTime;
use rand::{distr::Alphanumeric, Rng};

pub use exporter::OutlinerExporter;
pub use importer::OutlinerImporter;

/// Format tag of this adapter
pub const FORMAT: &str = "outliner";

/// Length of generated node uids
const UID_LEN: usize = 9;

/// Fresh node uid, independent of the model's block keys
fn new_uid() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(UID_LEN)
        .map(char::from)
        .collect()
}

fn millis_to_rfc3339(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(|time| time.to_rfc3339())
}

fn rfc3339_to_millis(text: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|time| time.timestamp_millis())
}
