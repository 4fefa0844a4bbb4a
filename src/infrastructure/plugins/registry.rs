//! Plugin registry - Maps command tokens to handlers
//!
//! The registry is rebuilt from scratch on every reload. A new [`Generation`]
//! is populated off to the side and only then published, so lookups see
//! either the old mapping or the new one, never a half-built one.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use crate::plugins::CommandHandler;
use super::loader::PluginLoader;

/// A handler together with the file it came from
#[derive(Clone)]
pub struct LoadedPlugin {
    pub file: String,
    pub handler: Arc<dyn CommandHandler>,
}

/// One immutable command → handler mapping
#[derive(Default)]
pub struct Generation {
    by_command: HashMap<String, usize>,
    plugins: Vec<LoadedPlugin>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under every lowercased command token, replacing earlier owners
    pub fn register(&mut self, file: impl Into<String>, handler: Arc<dyn CommandHandler>) {
        let file = file.into();
        let index = self.plugins.len();
        for token in handler.spec().tokens() {
            match self.by_command.insert(token.clone(), index) {
                Some(previous) if previous != index => {
                    tracing::warn!(
                        "Command /{} from {} overrides {}",
                        token,
                        file,
                        self.plugins[previous].file
                    );
                }
                _ => {}
            }
        }
        self.plugins.push(LoadedPlugin { file, handler });
    }

    /// Case-insensitive exact match
    pub fn lookup(&self, command: &str) -> Option<Arc<dyn CommandHandler>> {
        self.by_command
            .get(&command.to_lowercase())
            .map(|&i| Arc::clone(&self.plugins[i].handler))
    }

    /// Plugins still addressable by at least one command, in registration order
    pub fn plugins(&self) -> impl Iterator<Item = &LoadedPlugin> {
        self.plugins
            .iter()
            .enumerate()
            .filter(move |(i, _)| self.by_command.values().any(|v| v == i))
            .map(|(_, p)| p)
    }

    /// Registered command tokens, sorted
    pub fn commands(&self) -> Vec<&str> {
        let mut commands: Vec<&str> = self.by_command.keys().map(String::as_str).collect();
        commands.sort_unstable();
        commands
    }

    pub fn command_count(&self) -> usize {
        self.by_command.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_command.is_empty()
    }

    /// (command, description) pairs for the platform's command menu.
    ///
    /// Tokens Telegram would reject (over 32 chars, or anything besides
    /// lowercase letters, digits and `_`) are left out. The description is
    /// the first help line, else the first tag, else the command itself.
    pub fn command_menu(&self) -> Vec<(String, String)> {
        let mut menu = Vec::new();
        for command in self.commands() {
            let valid = command.len() <= 32
                && command.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
            if !valid {
                continue;
            }
            let Some(handler) = self.lookup(command) else {
                continue;
            };
            let description = handler
                .help()
                .first()
                .or_else(|| handler.tags().first())
                .cloned()
                .unwrap_or_else(|| command.to_string());
            menu.push((command.to_string(), description));
        }
        menu
    }
}

/// Registry for the currently published generation
pub struct PluginRegistry {
    loader: PluginLoader,
    current: RwLock<Arc<Generation>>,
}

impl PluginRegistry {
    pub fn new(loader: PluginLoader) -> Self {
        Self {
            loader,
            current: RwLock::new(Arc::new(Generation::new())),
        }
    }

    pub fn plugin_dir(&self) -> &Path {
        self.loader.plugin_dir()
    }

    /// Rebuild the mapping from the plugin directory and publish it.
    ///
    /// Per-file failures are logged and skipped; an unreadable directory
    /// publishes an empty mapping. Nothing here is fatal.
    pub fn reload(&self) {
        let generation = self.build();
        self.publish(generation);
    }

    fn build(&self) -> Generation {
        let mut generation = Generation::new();
        let dir = self.loader.plugin_dir();

        let files = match self.loader.list_plugin_files() {
            Ok(files) => files,
            Err(e) => {
                tracing::error!("Failed to read plugin directory {}: {}", dir.display(), e);
                return generation;
            }
        };

        let mut loaded = Vec::new();
        for path in files {
            let file = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            match self.loader.load_file(&path) {
                Ok(handler) => {
                    generation.register(file.clone(), handler);
                    loaded.push(file);
                }
                Err(e) => {
                    tracing::warn!(file = %file, "Failed to load plugin {}: {}", file, e);
                }
            }
        }

        if loaded.is_empty() {
            tracing::warn!("No plugins loaded from {}", dir.display());
        } else {
            tracing::info!("Loaded {} plugin(s):", loaded.len());
            for file in &loaded {
                tracing::info!("  └─ {}", file);
            }
        }

        generation
    }

    fn publish(&self, generation: Generation) {
        let generation = Arc::new(generation);
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = generation;
    }

    #[cfg(test)]
    pub(crate) fn publish_for_test(&self, generation: Generation) {
        self.publish(generation);
    }

    /// Current generation; stays valid even if a reload happens meanwhile
    pub fn snapshot(&self) -> Arc<Generation> {
        let current = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&current)
    }

    pub fn lookup(&self, command: &str) -> Option<Arc<dyn CommandHandler>> {
        self.snapshot().lookup(command)
    }

    /// Get the number of registered command tokens
    pub fn len(&self) -> usize {
        self.snapshot().command_count()
    }
}
