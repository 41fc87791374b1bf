//! Document metadata

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recognized metadata fields plus a free-form map for everything else
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Ordered set: insertion order is kept, duplicates are dropped
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Format tag of the importer that produced the document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Identifier of the document in its source system
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata tagged with the producing format
    pub fn from_source(source: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Add a tag unless it is already present
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        let tag = tag.trim();
        if !tag.is_empty() && !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }

    pub fn insert_extra(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.extra.insert(key.into(), value);
    }

    /// Apply one key/value pair, routing recognized keys to their fields
    ///
    /// Recognized keys accept both camelCase and snake_case spellings and a few common
    /// aliases (`date`, `created`, `modified`, `updated`). Unrecognized keys land in
    /// [`Metadata::extra`].
    pub fn apply_field(&mut self, key: &str, value: serde_json::Value) {
        match key {
            "title" => self.title = value_to_string(&value),
            "author" | "authors" => self.author = value_to_string(&value),
            "createdAt" | "created_at" | "created" | "date" => {
                self.created_at = value_to_string(&value)
            }
            "updatedAt" | "updated_at" | "updated" | "modified" | "lastmod" => {
                self.updated_at = value_to_string(&value)
            }
            "tags" | "keywords" => match value {
                serde_json::Value::Array(items) => {
                    for item in items {
                        if let Some(tag) = value_to_string(&item) {
                            self.add_tag(tag);
                        }
                    }
                }
                serde_json::Value::String(s) => {
                    for tag in s.split([',', ' ']) {
                        self.add_tag(tag.trim_start_matches('#'));
                    }
                }
                other => self.insert_extra(key, other),
            },
            "sourceId" | "source_id" | "id" => self.source_id = value_to_string(&value),
            _ => self.insert_extra(key, value),
        }
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.created_at.is_none()
            && self.updated_at.is_none()
            && self.tags.is_empty()
            && self.source.is_none()
            && self.source_id.is_none()
            && self.extra.is_empty()
    }
}

/// Render a scalar JSON value as a string; arrays join their scalar members
fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(value_to_string).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        serde_json::Value::Null | serde_json::Value::Object(_) => None,
    }
}
