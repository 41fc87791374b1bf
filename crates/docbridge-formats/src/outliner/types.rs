//! Wire types of the outliner export format

use serde::{Deserialize, Serialize};

/// One page of an outliner export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Page {
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    /// Epoch milliseconds
    #[serde(rename = "create-time", default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<i64>,
    /// Epoch milliseconds
    #[serde(rename = "edit-time", default, skip_serializing_if = "Option::is_none")]
    pub edit_time: Option<i64>,
}

/// One outline node; the whole text lives in `string`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Node {
    #[serde(default)]
    pub string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    #[serde(rename = "create-time", default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<i64>,
    #[serde(rename = "edit-time", default, skip_serializing_if = "Option::is_none")]
    pub edit_time: Option<i64>,
}

impl Node {
    pub fn new(uid: String, string: impl Into<String>) -> Self {
        Self {
            string: string.into(),
            uid: Some(uid),
            ..Self::default()
        }
    }
}
