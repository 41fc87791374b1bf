//! Conversion error types
//!
//! Every failure the engine can produce is a [`ConvertError`]. Each variant maps to a
//! stable, machine-readable [`ErrorCode`] so callers can branch on the kind of failure
//! without matching on display strings.

use std::fmt;
use thiserror::Error;

/// Which side of the registry a plugin lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginKind {
    Importer,
    Exporter,
}

impl PluginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKind::Importer => "importer",
            PluginKind::Exporter => "exporter",
        }
    }
}

impl fmt::Display for PluginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversion error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// Input for a JSON-based format is not valid JSON
    #[error("Invalid JSON for {format}: {message}")]
    InvalidJson {
        /// Format the input was being imported as
        format: String,
        /// Underlying parser message
        message: String,
    },

    /// Input is well-formed but does not have the shape the format requires
    #[error("Invalid {format} input: {message}")]
    InvalidFormat {
        /// Format the input was being imported as
        format: String,
        /// What was wrong with the input
        message: String,
    },

    /// No registered importer claimed the input and none was named explicitly
    #[error("No registered importer recognizes the input")]
    DetectionFailed,

    /// A named importer is not registered
    #[error("Importer not found: {0}")]
    ImporterNotFound(String),

    /// No exporter targets the requested format
    #[error("Exporter not found for format: {0}")]
    ExporterNotFound(String),

    /// A plugin with the same name is already registered
    #[error("{kind} already registered: {name}")]
    DuplicatePlugin {
        /// Importer or exporter
        kind: PluginKind,
        /// Colliding plugin name
        name: String,
    },

    /// Input exceeds the configured byte limit
    #[error("Document too large: {size} bytes (max {max} bytes)")]
    DocumentTooLarge {
        /// Measured input size in bytes
        size: usize,
        /// Configured limit
        max: usize,
    },

    /// Imported document has more top-level blocks than allowed
    #[error("Too many blocks: {count} (max {max})")]
    TooManyBlocks {
        /// Measured top-level block count
        count: usize,
        /// Configured limit
        max: usize,
    },

    /// Imported document nests blocks deeper than allowed
    #[error("Nesting too deep: depth {depth} (max {max})")]
    NestingTooDeep {
        /// Measured maximum depth
        depth: usize,
        /// Configured limit
        max: usize,
    },

    /// Front-matter could not be parsed; the import continues without it
    #[error("Front-matter parse error: {0}")]
    Frontmatter(String),

    /// Writing an output format failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Converter configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Specialized Result type for conversion operations
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Machine-readable error code carried by every [`ConvertError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidJson,
    InvalidFormat,
    DetectionFailed,
    ImporterNotFound,
    ExporterNotFound,
    DuplicatePlugin,
    DocumentTooLarge,
    TooManyBlocks,
    NestingTooDeep,
    Frontmatter,
    Serialization,
    Config,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidJson => "INVALID_JSON",
            ErrorCode::InvalidFormat => "INVALID_FORMAT",
            ErrorCode::DetectionFailed => "DETECTION_FAILED",
            ErrorCode::ImporterNotFound => "IMPORTER_NOT_FOUND",
            ErrorCode::ExporterNotFound => "EXPORTER_NOT_FOUND",
            ErrorCode::DuplicatePlugin => "DUPLICATE_PLUGIN",
            ErrorCode::DocumentTooLarge => "DOCUMENT_TOO_LARGE",
            ErrorCode::TooManyBlocks => "TOO_MANY_BLOCKS",
            ErrorCode::NestingTooDeep => "NESTING_TOO_DEEP",
            ErrorCode::Frontmatter => "FRONTMATTER_ERROR",
            ErrorCode::Serialization => "SERIALIZATION_ERROR",
            ErrorCode::Config => "CONFIG_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConvertError {
    /// Create an invalid JSON error
    pub fn invalid_json(format: impl Into<String>, err: impl fmt::Display) -> Self {
        Self::InvalidJson {
            format: format.into(),
            message: err.to_string(),
        }
    }

    /// Create an invalid format error
    pub fn invalid_format(format: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidFormat {
            format: format.into(),
            message: msg.into(),
        }
    }

    /// Create a front-matter error
    pub fn frontmatter(msg: impl Into<String>) -> Self {
        Self::Frontmatter(msg.into())
    }

    /// Create a serialization error
    pub fn serialization(err: impl fmt::Display) -> Self {
        Self::Serialization(err.to_string())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Machine-readable code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidJson { .. } => ErrorCode::InvalidJson,
            Self::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            Self::DetectionFailed => ErrorCode::DetectionFailed,
            Self::ImporterNotFound(_) => ErrorCode::ImporterNotFound,
            Self::ExporterNotFound(_) => ErrorCode::ExporterNotFound,
            Self::DuplicatePlugin { .. } => ErrorCode::DuplicatePlugin,
            Self::DocumentTooLarge { .. } => ErrorCode::DocumentTooLarge,
            Self::TooManyBlocks { .. } => ErrorCode::TooManyBlocks,
            Self::NestingTooDeep { .. } => ErrorCode::NestingTooDeep,
            Self::Frontmatter(_) => ErrorCode::Frontmatter,
            Self::Serialization(_) => ErrorCode::Serialization,
            Self::Config(_) => ErrorCode::Config,
        }
    }

    /// Check if this error is recoverable (the import continues past it)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Frontmatter(_))
    }

    /// Check if this error is fatal (aborts the operation)
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Check if this error is a safety-limit violation
    pub fn is_limit_violation(&self) -> bool {
        matches!(
            self,
            Self::DocumentTooLarge { .. } | Self::TooManyBlocks { .. } | Self::NestingTooDeep { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = ConvertError::frontmatter("bad yaml");
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());

        let err = ConvertError::DocumentTooLarge { size: 1000, max: 500 };
        assert!(err.is_fatal());
        assert!(err.is_limit_violation());
        assert!(!ConvertError::DetectionFailed.is_limit_violation());
    }

    #[test]
    fn test_error_display() {
        let err = ConvertError::DocumentTooLarge { size: 1000, max: 500 };
        assert_eq!(err.to_string(), "Document too large: 1000 bytes (max 500 bytes)");

        let err = ConvertError::DuplicatePlugin {
            kind: PluginKind::Importer,
            name: "markdown".to_string(),
        };
        assert_eq!(err.to_string(), "importer already registered: markdown");

        let err = ConvertError::invalid_json("block-page", "expected value at line 1 column 1");
        assert_eq!(
            err.to_string(),
            "Invalid JSON for block-page: expected value at line 1 column 1"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(ConvertError::DetectionFailed.code(), ErrorCode::DetectionFailed);
        assert_eq!(
            ConvertError::TooManyBlocks { count: 10, max: 5 }.code().as_str(),
            "TOO_MANY_BLOCKS"
        );
        assert_eq!(
            ConvertError::NestingTooDeep { depth: 3, max: 2 }.code().to_string(),
            "NESTING_TOO_DEEP"
        );
        assert_eq!(
            ConvertError::ImporterNotFound("x".into()).code(),
            ErrorCode::ImporterNotFound
        );
    }
}
