//! # docbridge-core
//!
//! Format-agnostic building blocks of the docbridge conversion engine:
//!
//! - [`model`]: the intermediate document tree (blocks, spans, mark definitions,
//!   metadata, source maps)
//! - [`traits`]: the [`Importer`] and [`Exporter`] plugin interfaces
//! - [`registry`]: name-keyed plugin tables with auto-detection
//! - [`config`]: input-safety limits
//! - [`error`]: the single [`ConvertError`] type
//!
//! Format adapters live in `docbridge-formats`; the `Converter` facade that enforces
//! the limits lives in `docbridge`.

pub mod config;
pub mod error;
pub mod model;
pub mod registry;
pub mod traits;

pub use config::ConverterConfig;
pub use error::{ConvertError, ConvertResult, ErrorCode, PluginKind};
pub use model::{
    Block, CalloutBlock, CalloutKind, CodeBlock, Document, EmbedBlock, ExtensionBlock,
    ImageBlock, IntegrityViolation, ListItem, ListKind, MarkDef, MarkKind, Metadata, SourceMap,
    SourceMapping, Span, TableBlock, TableRow, TextBlock, TextStyle,
};
pub use registry::{PluginRegistry, RegisterOptions};
pub use traits::{ErrorCallback, ExportOptions, Exporter, ImportOptions, Importer};
