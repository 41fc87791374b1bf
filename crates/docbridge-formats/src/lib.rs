//! # docbridge-formats
//!
//! Built-in format adapters for the docbridge conversion engine. Each adapter is a
//! module exposing one [`Importer`](docbridge_core::Importer) and one
//! [`Exporter`](docbridge_core::Exporter):
//!
//! | Module | Format tag | Input |
//! |--------|------------|-------|
//! | [`markdown`] | `markdown` | CommonMark + GFM tables/tasks, wiki links, callouts, front-matter |
//! | [`block_page`] | `block-page` | Block-based workspace page JSON |
//! | [`outliner`] | `outliner` | Outliner page export JSON |
//!
//! [`register_builtins`] installs all three in detection order.

pub mod block_page;
pub mod markdown;
pub mod outliner;

mod nesting;
mod render;

use docbridge_core::{ConvertResult, PluginRegistry, RegisterOptions};

pub use block_page::{BlockPageExporter, BlockPageImporter};
pub use markdown::{MarkdownExporter, MarkdownImporter};
pub use outliner::{OutlinerExporter, OutlinerImporter};

/// Register the built-in importers and exporters
///
/// Markdown is registered first; its detector declines JSON input so the JSON formats
/// behind it still get a chance.
pub fn register_builtins(registry: &PluginRegistry) -> ConvertResult<()> {
    let options = RegisterOptions::default();

    registry.register_importer(MarkdownImporter::new(), options)?;
    registry.register_importer(BlockPageImporter::new(), options)?;
    registry.register_importer(OutlinerImporter::new(), options)?;

    registry.register_exporter(MarkdownExporter::new(), options)?;
    registry.register_exporter(BlockPageExporter::new(), options)?;
    registry.register_exporter(OutlinerExporter::new(), options)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_register_in_order() {
        let registry = PluginRegistry::new();
        register_builtins(&registry).unwrap();

        assert_eq!(
            registry.list_importers(),
            vec!["markdown", "block-page", "outliner"]
        );
        assert_eq!(
            registry.list_exporters(),
            vec!["markdown", "block-page", "outliner"]
        );
    }

    #[test]
    fn test_detection_routes_by_shape() {
        let registry = PluginRegistry::new();
        register_builtins(&registry).unwrap();

        let detect = |input: &str| registry.detect_importer(input).map(|i| i.name().to_string());

        assert_eq!(detect("# Title\n\nBody").as_deref(), Some("markdown"));
        assert_eq!(
            detect(r#"{"object":"list","results":[]}"#).as_deref(),
            Some("block-page")
        );
        assert_eq!(
            detect(r#"[{"title":"Page","children":[{"string":"hi","uid":"a1"}]}]"#).as_deref(),
            Some("outliner")
        );
        assert_eq!(detect("{\"unrelated\": true}"), None);
    }

    #[test]
    fn test_format_aliases_select_importers() {
        let registry = PluginRegistry::new();
        register_builtins(&registry).unwrap();

        assert_eq!(registry.get_importer("md").unwrap().name(), "markdown");
        assert_eq!(registry.get_importer("notion").unwrap().name(), "block-page");
        assert_eq!(registry.get_importer("roam").unwrap().name(), "outliner");
        assert!(registry.get_importer("docx").is_err());
    }
}
