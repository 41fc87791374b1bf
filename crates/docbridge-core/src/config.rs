//! Converter configuration
//!
//! Safety limits applied to every import. Each limit is disabled by setting it to 0.
//! Configuration can be built in code or loaded from TOML, YAML or JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{ConvertError, ConvertResult};

/// Default maximum input size: 10 MiB
pub const DEFAULT_MAX_DOCUMENT_SIZE: usize = 10 * 1024 * 1024;
/// Default maximum number of top-level blocks
pub const DEFAULT_MAX_BLOCKS: usize = 10_000;
/// Default maximum nesting depth
pub const DEFAULT_MAX_BLOCK_DEPTH: usize = 50;

/// Input-safety limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Maximum input size in bytes
    pub max_document_size: usize,
    /// Maximum number of top-level blocks in an imported document
    pub max_blocks: usize,
    /// Maximum nesting depth of an imported document (top level is 0)
    pub max_block_depth: usize,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            max_document_size: DEFAULT_MAX_DOCUMENT_SIZE,
            max_blocks: DEFAULT_MAX_BLOCKS,
            max_block_depth: DEFAULT_MAX_BLOCK_DEPTH,
        }
    }
}

impl ConverterConfig {
    /// Configuration with every limit disabled
    pub fn unlimited() -> Self {
        Self {
            max_document_size: 0,
            max_blocks: 0,
            max_block_depth: 0,
        }
    }

    pub fn with_max_document_size(mut self, bytes: usize) -> Self {
        self.max_document_size = bytes;
        self
    }

    pub fn with_max_blocks(mut self, count: usize) -> Self {
        self.max_blocks = count;
        self
    }

    pub fn with_max_block_depth(mut self, depth: usize) -> Self {
        self.max_block_depth = depth;
        self
    }

    pub fn from_toml_str(content: &str) -> ConvertResult<Self> {
        toml::from_str(content).map_err(|e| ConvertError::config(format!("invalid TOML: {e}")))
    }

    pub fn from_yaml_str(content: &str) -> ConvertResult<Self> {
        // An empty YAML document deserializes as unit, not as an empty map
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| ConvertError::config(format!("invalid YAML: {e}")))
    }

    pub fn from_json_str(content: &str) -> ConvertResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| ConvertError::config(format!("invalid JSON: {e}")))
    }

    /// Load configuration from a file, choosing the parser by extension
    ///
    /// `.toml`, `.yaml`/`.yml` and `.json` are recognized; anything else is rejected.
    pub async fn load_from_file(path: impl AsRef<Path>) -> ConvertResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConvertError::config(format!("{}: {e}", path.display())))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        debug!("Loading converter config from {}", path.display());

        match extension.as_deref() {
            Some("toml") => Self::from_toml_str(&content),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            Some("json") => Self::from_json_str(&content),
            _ => Err(ConvertError::config(format!(
                "unsupported config file extension: {}",
                path.display()
            ))),
        }
    }

    /// True when the byte limit is enabled and `size` exceeds it
    pub fn exceeds_document_size(&self, size: usize) -> bool {
        self.max_document_size > 0 && size > self.max_document_size
    }

    pub fn exceeds_blocks(&self, count: usize) -> bool {
        self.max_blocks > 0 && count > self.max_blocks
    }

    pub fn exceeds_depth(&self, depth: usize) -> bool {
        self.max_block_depth > 0 && depth > self.max_block_depth
    }
}
