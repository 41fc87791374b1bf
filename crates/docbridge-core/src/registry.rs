//! Plugin registry for importer/exporter discovery and selection
//!
//! The registry maps plugin names to [`Importer`] and [`Exporter`] implementations and
//! performs format auto-detection. Detection walks importers in registration order, so
//! built-in formats should be registered before ad-hoc ones that might also match.
//!
//! ## Locking
//!
//! Lookups are read-mostly: each table sits behind a `parking_lot::RwLock` and plugins
//! are `Arc`-cloned out before any import/export runs, so no lock is held while a
//! plugin does work. The async registration entry points additionally queue on a
//! `tokio::sync::Mutex`, which serializes concurrent registrations from independent
//! tasks: distinct names all land, and a same-name race resolves to one success and one
//! [`ConvertError::DuplicatePlugin`] (or last-writer-wins with overwrite).

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ConvertError, ConvertResult, PluginKind};
use crate::model::Document;
use crate::traits::{ExportOptions, Exporter, ImportOptions, Importer};

/// Registration behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegisterOptions {
    /// Replace an existing plugin of the same name instead of failing
    pub allow_overwrite: bool,
}

impl RegisterOptions {
    pub fn overwrite() -> Self {
        Self {
            allow_overwrite: true,
        }
    }
}

trait Named {
    fn plugin_name(&self) -> &str;
}

impl Named for dyn Importer {
    fn plugin_name(&self) -> &str {
        self.name()
    }
}

impl Named for dyn Exporter {
    fn plugin_name(&self) -> &str {
        self.name()
    }
}

/// Registration-ordered plugin table
struct PluginTable<T: ?Sized> {
    kind: PluginKind,
    entries: Vec<Arc<T>>,
}

impl<T: ?Sized + Named> PluginTable<T> {
    fn new(kind: PluginKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|p| p.plugin_name() == name)
    }

    /// Insert a plugin; an overwrite keeps the original detection position
    fn insert(&mut self, plugin: Arc<T>, options: RegisterOptions) -> ConvertResult<()> {
        let name = plugin.plugin_name().to_string();
        match self.position(&name) {
            Some(_) if !options.allow_overwrite => Err(ConvertError::DuplicatePlugin {
                kind: self.kind,
                name,
            }),
            Some(idx) => {
                info!("Replacing {}: {}", self.kind, name);
                self.entries[idx] = plugin;
                Ok(())
            }
            None => {
                info!("Registered {}: {}", self.kind, name);
                self.entries.push(plugin);
                Ok(())
            }
        }
    }

    fn remove(&mut self, name: &str) -> bool {
        match self.position(name) {
            Some(idx) => {
                self.entries.remove(idx);
                info!("Unregistered {}: {}", self.kind, name);
                true
            }
            None => false,
        }
    }

    fn get(&self, name: &str) -> Option<Arc<T>> {
        self.position(name).map(|idx| self.entries[idx].clone())
    }

    fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|p| p.plugin_name().to_string())
            .collect()
    }
}

/// Registry of format plugins
pub struct PluginRegistry {
    importers: RwLock<PluginTable<dyn Importer>>,
    exporters: RwLock<PluginTable<dyn Exporter>>,
    registration: Mutex<()>,
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            importers: RwLock::new(PluginTable::new(PluginKind::Importer)),
            exporters: RwLock::new(PluginTable::new(PluginKind::Exporter)),
            registration: Mutex::new(()),
        }
    }

    /// Register an importer
    pub fn register_importer<I: Importer + 'static>(
        &self,
        importer: I,
        options: RegisterOptions,
    ) -> ConvertResult<()> {
        self.register_importer_arc(Arc::new(importer), options)
    }

    /// Register an already shared importer
    pub fn register_importer_arc(
        &self,
        importer: Arc<dyn Importer>,
        options: RegisterOptions,
    ) -> ConvertResult<()> {
        self.importers.write().insert(importer, options)
    }

    /// Register an importer, serialized against other async registrations
    pub async fn register_importer_async<I: Importer + 'static>(
        &self,
        importer: I,
        options: RegisterOptions,
    ) -> ConvertResult<()> {
        let _queue = self.registration.lock().await;
        self.register_importer_arc(Arc::new(importer), options)
    }

    /// Register an exporter
    pub fn register_exporter<E: Exporter + 'static>(
        &self,
        exporter: E,
        options: RegisterOptions,
    ) -> ConvertResult<()> {
        self.register_exporter_arc(Arc::new(exporter), options)
    }

    /// Register an already shared exporter
    pub fn register_exporter_arc(
        &self,
        exporter: Arc<dyn Exporter>,
        options: RegisterOptions,
    ) -> ConvertResult<()> {
        self.exporters.write().insert(exporter, options)
    }

    /// Register an exporter, serialized against other async registrations
    pub async fn register_exporter_async<E: Exporter + 'static>(
        &self,
        exporter: E,
        options: RegisterOptions,
    ) -> ConvertResult<()> {
        let _queue = self.registration.lock().await;
        self.register_exporter_arc(Arc::new(exporter), options)
    }

    /// Remove an importer; returns whether one was present
    pub fn unregister_importer(&self, name: &str) -> bool {
        self.importers.write().remove(name)
    }

    /// Remove an exporter; returns whether one was present
    pub fn unregister_exporter(&self, name: &str) -> bool {
        self.exporters.write().remove(name)
    }

    pub fn has_importer(&self, name: &str) -> bool {
        self.importers.read().position(name).is_some()
    }

    pub fn has_exporter(&self, name: &str) -> bool {
        self.exporters.read().position(name).is_some()
    }

    /// Importer names in registration order
    pub fn list_importers(&self) -> Vec<String> {
        self.importers.read().names()
    }

    /// Exporter names in registration order
    pub fn list_exporters(&self) -> Vec<String> {
        self.exporters.read().names()
    }

    /// Importer by name, falling back to one listing `name` among its supported formats
    pub fn get_importer(&self, name: &str) -> ConvertResult<Arc<dyn Importer>> {
        let importers = self.importers.read();
        importers
            .get(name)
            .or_else(|| {
                importers
                    .entries
                    .iter()
                    .find(|i| i.supported_formats().contains(&name))
                    .cloned()
            })
            .ok_or_else(|| ConvertError::ImporterNotFound(name.to_string()))
    }

    /// First exporter whose target format matches
    pub fn get_exporter(&self, target_format: &str) -> ConvertResult<Arc<dyn Exporter>> {
        self.exporters
            .read()
            .entries
            .iter()
            .find(|e| e.target_format() == target_format)
            .cloned()
            .ok_or_else(|| ConvertError::ExporterNotFound(target_format.to_string()))
    }

    /// First importer, in registration order, that claims the input
    pub fn detect_importer(&self, input: &str) -> Option<Arc<dyn Importer>> {
        let candidates = self.importers.read().entries.clone();
        let found = candidates.into_iter().find(|i| i.detect(input));
        if let Some(importer) = &found {
            debug!("Detected input format: {}", importer.name());
        }
        found
    }

    /// Import using the named importer, or auto-detect when none is named
    pub fn import(&self, input: &str, options: &ImportOptions) -> ConvertResult<Document> {
        let importer = match options.format.as_deref() {
            Some(name) => self.get_importer(name)?,
            None => self
                .detect_importer(input)
                .ok_or(ConvertError::DetectionFailed)?,
        };
        debug!("Importing {} bytes with {}", input.len(), importer.name());
        importer.import(input, options)
    }

    /// Export using the exporter that targets `target_format`
    pub fn export(
        &self,
        document: &Document,
        target_format: &str,
        options: &ExportOptions,
    ) -> ConvertResult<String> {
        let exporter = self.get_exporter(target_format)?;
        debug!(
            "Exporting {} blocks with {}",
            document.block_count(),
            exporter.name()
        );
        exporter.export(document, options)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}
