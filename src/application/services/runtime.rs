//! Update loop - Polls the platform, dispatches updates, reacts to the watcher

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::application::errors::BotError;
use crate::application::messaging::Dispatcher;
use crate::domain::traits::UpdateSource;
use crate::infrastructure::plugins::WatchAction;

/// How long in-flight dispatches get to finish once the loop stops
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Why the loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shutdown {
    /// Config file or executable changed; a supervisor restarts us
    CoreFileChanged(PathBuf),
    /// Update source has nothing more to deliver
    SourceClosed,
    Interrupted,
}

pub struct BotRuntime {
    dispatcher: Arc<Dispatcher>,
    source: Arc<dyn UpdateSource>,
    watcher: Option<mpsc::Receiver<WatchAction>>,
    error_backoff: Duration,
}

impl BotRuntime {
    pub fn new(dispatcher: Dispatcher, source: Arc<dyn UpdateSource>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            source,
            watcher: None,
            error_backoff: Duration::from_secs(5),
        }
    }

    pub fn with_watcher(mut self, actions: mpsc::Receiver<WatchAction>) -> Self {
        self.watcher = Some(actions);
        self
    }

    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    pub async fn run(mut self) -> Shutdown {
        let mut in_flight = JoinSet::new();
        tracing::info!("Starting message loop...");

        let reason = loop {
            tokio::select! {
                action = next_action(&mut self.watcher) => match action {
                    Some(WatchAction::ReloadPlugins(changed)) => self.reload_plugins(changed).await,
                    Some(WatchAction::Restart(path)) => {
                        tracing::info!("Core file changed: {}, restarting", path.display());
                        break Shutdown::CoreFileChanged(path);
                    }
                    None => {
                        tracing::warn!("File watcher stopped, hot reload disabled");
                        self.watcher = None;
                    }
                },
                polled = self.source.poll_updates() => match polled {
                    Ok(updates) => {
                        if !updates.is_empty() {
                            tracing::debug!("Received {} updates", updates.len());
                        }
                        for update in updates {
                            let dispatcher = Arc::clone(&self.dispatcher);
                            in_flight.spawn(async move { dispatcher.dispatch(update).await });
                        }
                    }
                    Err(BotError::Closed) => break Shutdown::SourceClosed,
                    Err(e) => {
                        tracing::error!("Failed to get updates: {}", e);
                        tokio::time::sleep(self.error_backoff).await;
                    }
                },
                Some(finished) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = finished {
                        tracing::error!("Dispatch task failed: {}", e);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Interrupted, shutting down");
                    break Shutdown::Interrupted;
                }
            }
        };

        let drain = async { while in_flight.join_next().await.is_some() {} };
        if tokio::time::timeout(SHUTDOWN_GRACE, drain).await.is_err() {
            tracing::warn!("Abandoning {} unfinished dispatch(es)", in_flight.len());
        }
        reason
    }

    async fn reload_plugins(&self, changed: Vec<PathBuf>) {
        for path in &changed {
            tracing::info!("Plugin file changed: {}", path.display());
        }

        let registry = Arc::clone(self.dispatcher.registry());
        if let Err(e) = tokio::task::spawn_blocking(move || registry.reload()).await {
            tracing::error!("Plugin reload failed: {}", e);
            return;
        }
        self.dispatcher.publish_commands().await;
    }
}

async fn next_action(watcher: &mut Option<mpsc::Receiver<WatchAction>>) -> Option<WatchAction> {
    match watcher {
        Some(actions) => actions.recv().await,
        None => std::future::pending().await,
    }
}
