//! Plugin loader - Reads plugin manifests from disk and builds handlers

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::errors::PluginResult;
use crate::plugins::{CommandHandler, HandlerFactory};
use super::manifest::PluginManifest;

/// Plugin loader
pub struct PluginLoader {
    plugin_dir: PathBuf,
    extension: String,
    factory: HandlerFactory,
}

impl PluginLoader {
    pub fn new(plugin_dir: impl Into<PathBuf>, extension: impl Into<String>, factory: HandlerFactory) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            extension: extension.into(),
            factory,
        }
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// Whether `path` names a plugin file (recognized extension, not hidden)
    pub fn is_plugin_file(&self, path: &Path) -> bool {
        is_plugin_file(path, &self.extension)
    }

    /// List candidate plugin files, sorted by file name
    pub fn list_plugin_files(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in std::fs::read_dir(&self.plugin_dir)? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            if path.is_file() && self.is_plugin_file(&path) {
                files.push(path);
            }
        }

        // read_dir order is filesystem dependent; last-write-wins needs a stable order
        files.sort();
        Ok(files)
    }

    /// Load one plugin file, reading it fresh from disk
    pub fn load_file(&self, path: impl AsRef<Path>) -> PluginResult<Arc<dyn CommandHandler>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let (spec, handler) = PluginManifest::parse(&content)?.validate()?;

        tracing::debug!(
            file = %path.as_ref().display(),
            kind = handler.kind(),
            "Building handler for {:?}",
            spec.commands
        );

        self.factory.build(spec, handler)
    }
}

pub fn is_plugin_file(path: &Path, extension: &str) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true);

    !hidden
        && path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(extension))
            .unwrap_or(false)
}
