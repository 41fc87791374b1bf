//! Importer and exporter plugin traits
//!
//! A format adapter implements [`Importer`] (native text → [`Document`]) and/or
//! [`Exporter`] ([`Document`] → native text). Plugins are registered by name in a
//! [`crate::PluginRegistry`] and must be shareable across threads.

use std::fmt;
use std::sync::Arc;

use crate::error::{ConvertError, ConvertResult};
use crate::model::Document;

/// Callback receiving non-fatal import problems
pub type ErrorCallback = Arc<dyn Fn(&ConvertError) + Send + Sync>;

/// Options for a single import
#[derive(Clone, Default)]
pub struct ImportOptions {
    /// Importer name; auto-detect when unset
    pub format: Option<String>,
    /// Attach a source map to the document
    pub include_source_map: bool,
    /// Validate referential integrity after import and suppress `on_error` reporting
    pub strict_mode: bool,
    /// Receives recoverable problems (bad front-matter, ...) in non-strict mode
    pub on_error: Option<ErrorCallback>,
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_source_map(mut self) -> Self {
        self.include_source_map = true;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict_mode = true;
        self
    }

    pub fn with_error_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ConvertError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Hand a recoverable error to the callback, unless running strict
    pub fn report(&self, error: &ConvertError) {
        if self.strict_mode {
            return;
        }
        if let Some(callback) = &self.on_error {
            callback(error);
        }
    }
}

impl fmt::Debug for ImportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportOptions")
            .field("format", &self.format)
            .field("include_source_map", &self.include_source_map)
            .field("strict_mode", &self.strict_mode)
            .field("on_error", &self.on_error.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Options for a single export
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Indent structured output
    pub pretty_print: bool,
    /// Emit document metadata (front-matter, page properties, ...)
    pub include_metadata: bool,
}

impl ExportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pretty(mut self) -> Self {
        self.pretty_print = true;
        self
    }

    pub fn with_metadata(mut self) -> Self {
        self.include_metadata = true;
        self
    }
}

/// Converts native input into a [`Document`]
pub trait Importer: Send + Sync {
    /// Unique plugin name, also used for explicit format selection
    fn name(&self) -> &str;

    /// Format aliases that also select this importer explicitly
    fn supported_formats(&self) -> &[&str] {
        &[]
    }

    /// Cheap check whether `input` looks like this importer's format
    fn detect(&self, input: &str) -> bool;

    /// Parse `input` into a document
    fn import(&self, input: &str, options: &ImportOptions) -> ConvertResult<Document>;
}

/// Converts a [`Document`] into native output
pub trait Exporter: Send + Sync {
    /// Unique plugin name
    fn name(&self) -> &str;

    /// Format tag this exporter produces; export lookups match on this
    fn target_format(&self) -> &str;

    /// Serialize `document`
    fn export(&self, document: &Document, options: &ExportOptions) -> ConvertResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_report_respects_strict_mode() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let options = ImportOptions::new().with_error_callback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        options.report(&ConvertError::frontmatter("bad"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let strict = options.clone().strict();
        strict.report(&ConvertError::frontmatter("bad"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_options_debug_hides_callback() {
        let options = ImportOptions::new()
            .with_format("markdown")
            .with_error_callback(|_| {});
        let debug = format!("{:?}", options);
        assert!(debug.contains("markdown"));
        assert!(debug.contains("<callback>"));
    }
}
