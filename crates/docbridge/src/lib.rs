//! # docbridge
//!
//! Converts documents between markdown, block-page JSON and outliner JSON through a
//! shared intermediate block model.
//!
//! The [`Converter`] owns its own [`PluginRegistry`] pre-loaded with the built-in
//! formats and enforces the input-safety limits of its [`ConverterConfig`] on every
//! import:
//!
//! ```no_run
//! use docbridge::{ConvertOptions, Converter};
//!
//! let converter = Converter::default();
//! let json = converter.convert("# Notes\n\n- one\n- two", "block-page", &ConvertOptions::default())?;
//! # Ok::<(), docbridge::ConvertError>(())
//! ```
//!
//! Extra formats are plain [`Importer`]/[`Exporter`] implementations registered on a
//! converter instance; nothing is shared between converters.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

pub use docbridge_core::{
    config, error, model, registry, traits, Block, CalloutBlock, CalloutKind, CodeBlock,
    ConvertError, ConvertResult, ConverterConfig, Document, EmbedBlock, ErrorCallback, ErrorCode,
    ExportOptions, Exporter, ExtensionBlock, ImageBlock, ImportOptions, Importer,
    IntegrityViolation, ListItem, ListKind, MarkDef, MarkKind, Metadata, PluginKind,
    PluginRegistry, RegisterOptions, SourceMap, SourceMapping, Span, TableBlock, TableRow,
    TextBlock, TextStyle,
};
pub use docbridge_formats::{
    block_page, markdown, outliner, register_builtins, BlockPageExporter, BlockPageImporter,
    MarkdownExporter, MarkdownImporter, OutlinerExporter, OutlinerImporter,
};

/// Import and export options for a full conversion
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub import: ImportOptions,
    pub export: ExportOptions,
}

impl ConvertOptions {
    pub fn new(import: ImportOptions, export: ExportOptions) -> Self {
        Self { import, export }
    }
}

/// Limit-enforcing conversion facade over a private plugin registry
pub struct Converter {
    config: ConverterConfig,
    registry: PluginRegistry,
}

impl Converter {
    /// Converter with the built-in formats registered
    pub fn new(config: ConverterConfig) -> Self {
        let converter = Self::empty(config);
        if let Err(err) = register_builtins(&converter.registry) {
            warn!("Failed to register built-in formats: {}", err);
        }
        converter
    }

    /// Converter with no plugins at all
    pub fn empty(config: ConverterConfig) -> Self {
        Self {
            config,
            registry: PluginRegistry::new(),
        }
    }

    /// Converter configured from a TOML, YAML or JSON file
    pub async fn from_config_file(path: impl AsRef<Path>) -> ConvertResult<Self> {
        let config = ConverterConfig::load_from_file(path).await?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Import `input`, rejecting documents that break the configured limits
    ///
    /// The byte size is checked before any parsing. Block count (top level only) and
    /// nesting depth are checked on the imported document. In strict mode the document
    /// must also pass [`Document::validate`].
    pub fn import(&self, input: &str, options: &ImportOptions) -> ConvertResult<Document> {
        let size = input.len();
        if self.config.exceeds_document_size(size) {
            warn!(
                "Rejecting {} byte input (limit {})",
                size, self.config.max_document_size
            );
            return Err(ConvertError::DocumentTooLarge {
                size,
                max: self.config.max_document_size,
            });
        }

        let document = self.registry.import(input, options)?;

        let count = document.block_count();
        if self.config.exceeds_blocks(count) {
            warn!(
                "Rejecting document with {} blocks (limit {})",
                count, self.config.max_blocks
            );
            return Err(ConvertError::TooManyBlocks {
                count,
                max: self.config.max_blocks,
            });
        }

        let depth = document.max_depth();
        if self.config.exceeds_depth(depth) {
            warn!(
                "Rejecting document nested {} levels deep (limit {})",
                depth, self.config.max_block_depth
            );
            return Err(ConvertError::NestingTooDeep {
                depth,
                max: self.config.max_block_depth,
            });
        }

        if options.strict_mode {
            check_integrity(&document)?;
        }

        debug!("Imported {} blocks, depth {}", count, depth);
        Ok(document)
    }

    pub fn export(
        &self,
        document: &Document,
        format: &str,
        options: &ExportOptions,
    ) -> ConvertResult<String> {
        self.registry.export(document, format, options)
    }

    /// Import then export to `target_format`
    pub fn convert(
        &self,
        input: &str,
        target_format: &str,
        options: &ConvertOptions,
    ) -> ConvertResult<String> {
        self.convert_with(input, target_format, options, |document| document)
    }

    /// Import, apply `transform`, then export to `target_format`
    pub fn convert_with<F>(
        &self,
        input: &str,
        target_format: &str,
        options: &ConvertOptions,
        transform: F,
    ) -> ConvertResult<String>
    where
        F: FnOnce(Document) -> Document,
    {
        let document = self.import(input, &options.import)?;
        debug!(
            "Converting {} document to {}",
            document.metadata.source.as_deref().unwrap_or("unknown"),
            target_format
        );
        let document = transform(document);
        self.export(&document, target_format, &options.export)
    }

    // --- plugin management ---

    pub fn register_importer<I: Importer + 'static>(
        &self,
        importer: I,
        options: RegisterOptions,
    ) -> ConvertResult<()> {
        self.registry.register_importer(importer, options)
    }

    pub fn register_exporter<E: Exporter + 'static>(
        &self,
        exporter: E,
        options: RegisterOptions,
    ) -> ConvertResult<()> {
        self.registry.register_exporter(exporter, options)
    }

    pub fn register_importer_arc(
        &self,
        importer: Arc<dyn Importer>,
        options: RegisterOptions,
    ) -> ConvertResult<()> {
        self.registry.register_importer_arc(importer, options)
    }

    pub fn register_exporter_arc(
        &self,
        exporter: Arc<dyn Exporter>,
        options: RegisterOptions,
    ) -> ConvertResult<()> {
        self.registry.register_exporter_arc(exporter, options)
    }

    /// Register an importer, queued behind other async registrations
    pub async fn register_importer_async<I: Importer + 'static>(
        &self,
        importer: I,
        options: RegisterOptions,
    ) -> ConvertResult<()> {
        self.registry.register_importer_async(importer, options).await
    }

    /// Register an exporter, queued behind other async registrations
    pub async fn register_exporter_async<E: Exporter + 'static>(
        &self,
        exporter: E,
        options: RegisterOptions,
    ) -> ConvertResult<()> {
        self.registry.register_exporter_async(exporter, options).await
    }

    pub fn unregister_importer(&self, name: &str) -> bool {
        self.registry.unregister_importer(name)
    }

    pub fn unregister_exporter(&self, name: &str) -> bool {
        self.registry.unregister_exporter(name)
    }

    pub fn has_importer(&self, name: &str) -> bool {
        self.registry.has_importer(name)
    }

    pub fn has_exporter(&self, name: &str) -> bool {
        self.registry.has_exporter(name)
    }

    pub fn list_importers(&self) -> Vec<String> {
        self.registry.list_importers()
    }

    pub fn list_exporters(&self) -> Vec<String> {
        self.registry.list_exporters()
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConverterConfig::default())
    }
}

fn check_integrity(document: &Document) -> ConvertResult<()> {
    let violations = document.validate();
    if violations.is_empty() {
        return Ok(());
    }
    let format = document.metadata.source.as_deref().unwrap_or("unknown");
    let message = violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    warn!("{} document failed integrity checks: {}", format, message);
    Err(ConvertError::invalid_format(format, message))
}
