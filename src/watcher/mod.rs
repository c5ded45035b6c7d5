//! Workspace watch run
//!
//! Keeps the analysis sessions' view of the workspace in step with the disk.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌───────────────┐
//! │   notify    │────>│ EventWorker │────>│  Debouncer  │────>│ DispatchQueue │
//! │ (per dir)   │     │ (classify)  │     │ (writes)    │     │    (FIFO)     │
//! └─────────────┘     └─────────────┘     └─────────────┘     └───────────────┘
//!                            │    create / delete                     ^    │
//!                            └────────────────────────────────────────┘    v
//!                                               PatternRegistry <──── Notifier ──> sessions
//! ```
//!
//! A run starts with [`WorkspaceWatcher::start`] and lives until the returned
//! [`WatcherHandle`] is stopped or dropped. Teardown cancels every pending
//! debounce timer and aborts the dispatcher, including a session call still in
//! flight, so nothing is delivered after the handle is gone.

pub mod debounce;
pub mod event;
pub mod notifier;
pub mod skip;
pub mod walk;
pub mod worker;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::WatchConfig;
use crate::error::{Result, SyncError};
use crate::events::{EventEmitter, WatchStartedEvent, WatchStoppedEvent};
use crate::paths::clean_path;
use crate::registry::PatternRegistry;
use crate::session::SessionSet;

pub use debounce::Debouncer;
pub use event::{ChangeEvent, ChangeKind, RawEvent, RawOps};
pub use notifier::{DispatchQueue, Notifier};
pub use skip::SkipRules;
pub use walk::{install_watches, WatchTarget};
pub use worker::EventWorker;

/// Everything a watch run needs, assembled before it starts.
pub struct WorkspaceWatcher {
    root: PathBuf,
    config: WatchConfig,
    sessions: SessionSet,
    registry: Arc<PatternRegistry>,
    emitter: EventEmitter,
}

impl WorkspaceWatcher {
    pub fn new(root: PathBuf, config: WatchConfig, sessions: SessionSet) -> Self {
        let root = clean_path(&root);
        let registry = Arc::new(
            PatternRegistry::new(root.clone()).with_debug(config.debug_registrations),
        );
        Self {
            root,
            config,
            sessions,
            registry,
            emitter: EventEmitter::disabled(),
        }
    }

    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &Arc<PatternRegistry> {
        &self.registry
    }

    /// Start the watch run.
    ///
    /// Subscribes the registry to every session, creates the OS watch source,
    /// installs directory watches and spawns the event worker. Must be called
    /// from within a tokio runtime.
    pub fn start(self) -> Result<WatcherHandle> {
        for session in self.sessions.iter() {
            session.on_watch_registration(self.registry.handler());
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut source = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            // receiver gone means the run is over
            let _ = tx.send(res);
        })
        .map_err(|e| {
            tracing::error!("Error creating watcher: {}", e);
            SyncError::WatcherSetup {
                message: e.to_string(),
            }
        })?;

        let rules = SkipRules::from_config(&self.config);
        let watched = install_watches(&mut source, &self.root, &rules).map_err(|e| {
            tracing::error!(root = %self.root.display(), "Error walking workspace: {}", e);
            e
        })?;

        tracing::info!(
            root = %self.root.display(),
            watched_dirs = watched,
            debounce_ms = self.config.debounce_ms,
            "Watching workspace"
        );
        self.emitter.emit(&WatchStartedEvent::new(
            &self.root.to_string_lossy(),
            watched,
            self.config.debounce_ms,
        ));

        let debouncer = Arc::new(Debouncer::new(self.config.debounce_window()));
        let (queue, dispatcher) =
            Notifier::new(self.sessions.clone(), Arc::clone(&self.registry)).spawn();
        let worker = EventWorker::new(
            self.root.clone(),
            rules,
            source,
            Arc::clone(&debouncer),
            queue,
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(worker.run(rx, shutdown_rx));

        Ok(WatcherHandle {
            root: self.root,
            shutdown: shutdown_tx,
            task: Some(task),
            dispatcher: Some(dispatcher),
            debouncer,
            registry: self.registry,
            emitter: self.emitter,
            watched_dirs: watched,
        })
    }
}

/// A running watch run. Stopping or dropping it tears the run down.
pub struct WatcherHandle {
    root: PathBuf,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
    debouncer: Arc<Debouncer>,
    registry: Arc<PatternRegistry>,
    emitter: EventEmitter,
    watched_dirs: usize,
}

impl WatcherHandle {
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn registry(&self) -> &Arc<PatternRegistry> {
        &self.registry
    }

    /// Directories watched at startup.
    pub fn watched_dirs(&self) -> usize {
        self.watched_dirs
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    pub fn pending_debounces(&self) -> usize {
        self.debouncer.pending_count()
    }

    /// Signal the worker, wait for it to exit, cancel pending timers and
    /// abort the dispatcher.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Watcher task ended abnormally: {}", e);
            }
        }
        let cancelled = self.debouncer.cancel_all();
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.abort();
            if let Err(e) = dispatcher.await {
                if !e.is_cancelled() {
                    tracing::warn!("Dispatcher task ended abnormally: {}", e);
                }
            }
        }
        tracing::info!(root = %self.root.display(), cancelled_timers = cancelled, "Stopped watching");
        self.emitter
            .emit(&WatchStoppedEvent::new(&self.root.to_string_lossy(), cancelled));
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            let _ = self.shutdown.send(true);
            self.debouncer.cancel_all();
        }
        if let Some(dispatcher) = self.dispatcher.take() {
            dispatcher.abort();
        }
    }
}
