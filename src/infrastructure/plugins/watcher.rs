//! Plugin hot-reload -- polls the plugin directory and core files for changes.
//!
//! Plugin file changes trigger a registry reload. Changes to the config file
//! or the running executable ask the process to exit so a supervisor can
//! start it fresh.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::loader::is_plugin_file;

/// Describes a change detected on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Added(PathBuf),
    Modified(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Added(p) | FileChange::Modified(p) | FileChange::Removed(p) => p,
        }
    }
}

/// What the runtime should do about a batch of changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// Rebuild the registry; carries the plugin files that changed
    ReloadPlugins(Vec<PathBuf>),
    /// A core file changed; shut down for a clean restart
    Restart(PathBuf),
}

/// Polls plugin files and core files for modification-time changes.
#[derive(Debug)]
pub struct FileWatcher {
    plugin_dir: PathBuf,
    extension: String,
    core_files: Vec<PathBuf>,
    /// File modification times at last poll.
    known: HashMap<PathBuf, SystemTime>,
}

impl FileWatcher {
    pub fn new(plugin_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            extension: extension.into(),
            core_files: Vec::new(),
            known: HashMap::new(),
        }
    }

    /// Watch a file whose modification means the process must restart.
    pub fn watch_core_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.core_files.contains(&path) {
            self.core_files.push(path);
        }
    }

    pub fn core_files(&self) -> &[PathBuf] {
        &self.core_files
    }

    /// Record the current state without reporting anything.
    pub fn prime(&mut self) {
        self.known = self.snapshot();
    }

    /// Compare the filesystem against the last poll.
    pub fn poll_changes(&mut self) -> Vec<FileChange> {
        let current = self.snapshot();
        let mut changes = Vec::new();

        for (path, mtime) in &current {
            match self.known.get(path) {
                None => changes.push(FileChange::Added(path.clone())),
                Some(old) if old != mtime => changes.push(FileChange::Modified(path.clone())),
                Some(_) => {}
            }
        }

        for path in self.known.keys() {
            if !current.contains_key(path) {
                changes.push(FileChange::Removed(path.clone()));
            }
        }

        changes.sort_by(|a, b| a.path().cmp(b.path()));
        self.known = current;
        changes
    }

    /// Map a change to the action it calls for, if any.
    pub fn classify(&self, change: &FileChange) -> Option<WatchAction> {
        let path = change.path();

        if self.core_files.iter().any(|core| core == path) {
            return match change {
                FileChange::Removed(_) => {
                    warn!("{} was removed; keeping the running process", path.display());
                    None
                }
                _ => Some(WatchAction::Restart(path.to_path_buf())),
            };
        }

        if path.starts_with(&self.plugin_dir) && is_plugin_file(path, &self.extension) {
            return Some(WatchAction::ReloadPlugins(vec![path.to_path_buf()]));
        }

        None
    }

    /// Poll and coalesce: at most one restart, otherwise at most one reload.
    pub fn poll_actions(&mut self) -> Vec<WatchAction> {
        let changes = self.poll_changes();
        let mut reload = Vec::new();

        for change in &changes {
            debug!("change detected: {:?}", change);
            match self.classify(change) {
                Some(WatchAction::Restart(path)) => return vec![WatchAction::Restart(path)],
                Some(WatchAction::ReloadPlugins(paths)) => reload.extend(paths),
                None => {}
            }
        }

        if reload.is_empty() {
            Vec::new()
        } else {
            vec![WatchAction::ReloadPlugins(reload)]
        }
    }

    /// Start polling on the runtime; actions arrive on the returned channel.
    pub fn spawn(mut self, every: Duration) -> mpsc::Receiver<WatchAction> {
        let (tx, rx) = mpsc::channel(8);
        self.prime();
        info!(
            "Watching {} and {} core file(s) every {:?}",
            self.plugin_dir.display(),
            self.core_files.len(),
            every
        );

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                for action in self.poll_actions() {
                    if tx.send(action).await.is_err() {
                        debug!("watch receiver dropped, stopping watcher");
                        return;
                    }
                }
            }
        });

        rx
    }

    fn snapshot(&self) -> HashMap<PathBuf, SystemTime> {
        let mut mtimes = HashMap::new();

        match std::fs::read_dir(&self.plugin_dir) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if !is_plugin_file(&path, &self.extension) {
                        continue;
                    }
                    if let Some(mtime) = modified(&path) {
                        mtimes.insert(path, mtime);
                    }
                }
            }
            Err(e) => debug!("failed to scan {}: {e}", self.plugin_dir.display()),
        }

        for path in &self.core_files {
            if let Some(mtime) = modified(path) {
                mtimes.insert(path.clone(), mtime);
            }
        }

        mtimes
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    let metadata = std::fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }
    metadata.modified().ok()
}
