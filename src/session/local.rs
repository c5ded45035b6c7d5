//! In-process analysis session.
//!
//! `LocalSession` has no server process behind it: it keeps the open-file
//! set and diagnostic cache a real session would keep, logs every outbound
//! call, and optionally prints those calls as JSON-lines events. The CLI uses
//! it to trace a watch run and to query diagnostic snapshots offline.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::error::{Result, SyncError};
use crate::events::{
    DiagnosticsInvalidatedEvent, EventEmitter, FileResyncedEvent, WatchedFilesChangedEvent,
};
use crate::paths::target_to_path;
use crate::protocol::{
    Diagnostic, DidChangeWatchedFilesParams, FileEvent, FileSystemWatcher,
    PublishDiagnosticsParams,
};
use crate::registry::RegistrationHandler;

use super::{AnalysisSession, DiagnosticStore};

/// An outbound call recorded by a [`LocalSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCall {
    Open(PathBuf),
    Resync(PathBuf),
    DiagnosticsFor(PathBuf),
    Invalidate(PathBuf),
    WatchedFilesChanged(Vec<FileEvent>),
}

pub struct LocalSession {
    name: String,
    store: DiagnosticStore,
    open_files: RwLock<HashSet<PathBuf>>,
    handlers: Mutex<Vec<RegistrationHandler>>,
    /// Registrations advertised so far, replayed to late subscribers
    advertised: Mutex<Vec<(String, Vec<FileSystemWatcher>)>>,
    calls: Mutex<Vec<SessionCall>>,
    emitter: EventEmitter,
}

impl LocalSession {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: DiagnosticStore::new(),
            open_files: RwLock::new(HashSet::new()),
            handlers: Mutex::new(Vec::new()),
            advertised: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            emitter: EventEmitter::disabled(),
        }
    }

    pub fn with_emitter(mut self, emitter: EventEmitter) -> Self {
        self.emitter = emitter;
        self
    }

    /// Load one session per top-level key of a diagnostics snapshot file.
    ///
    /// Expected shape: `{ "<session>": { "<uri or path>": [Diagnostic, ...] } }`.
    /// Sessions come back ordered by name.
    pub fn load_snapshot(path: &Path) -> Result<Vec<LocalSession>> {
        let content = fs::read_to_string(path)?;
        let snapshot: BTreeMap<String, BTreeMap<String, Vec<Diagnostic>>> =
            serde_json::from_str(&content)?;

        Ok(snapshot
            .into_iter()
            .map(|(name, files)| {
                let session = LocalSession::new(name);
                for (target, diagnostics) in files {
                    session.store.set(&target_to_path(&target), diagnostics);
                }
                session
            })
            .collect())
    }

    pub fn store(&self) -> &DiagnosticStore {
        &self.store
    }

    /// Accept a `publishDiagnostics` push.
    pub fn publish(&self, params: PublishDiagnosticsParams) {
        self.store.publish(params);
    }

    /// Advertise watch patterns to every subscriber, current and future.
    pub fn advertise(&self, id: &str, watchers: Vec<FileSystemWatcher>) {
        // lock order: advertised, then handlers
        let mut advertised = self.advertised.lock();
        let handlers: Vec<RegistrationHandler> = self.handlers.lock().clone();
        for handler in &handlers {
            handler(id, &watchers);
        }
        advertised.push((id.to_string(), watchers));
    }

    /// Every outbound call so far, in order.
    pub fn calls(&self) -> Vec<SessionCall> {
        self.calls.lock().clone()
    }

    /// Only the watched-files notifications, flattened.
    pub fn notified_changes(&self) -> Vec<FileEvent> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                SessionCall::WatchedFilesChanged(changes) => Some(changes.clone()),
                _ => None,
            })
            .flatten()
            .collect()
    }

    fn record(&self, call: SessionCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl AnalysisSession for LocalSession {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_open(&self, path: &Path) -> bool {
        self.open_files.read().contains(path)
    }

    async fn open(&self, path: &Path) -> Result<()> {
        self.record(SessionCall::Open(path.to_path_buf()));
        self.open_files.write().insert(path.to_path_buf());
        Ok(())
    }

    async fn resync(&self, path: &Path) -> Result<()> {
        if !self.is_open(path) {
            return Err(SyncError::session(
                &self.name,
                format!("file not opened: {}", path.display()),
            ));
        }
        self.record(SessionCall::Resync(path.to_path_buf()));
        self.emitter
            .emit(&FileResyncedEvent::new(&self.name, &path.to_string_lossy()));
        Ok(())
    }

    async fn diagnostics_for(&self, path: &Path) -> Result<Vec<Diagnostic>> {
        self.record(SessionCall::DiagnosticsFor(path.to_path_buf()));
        Ok(self.store.get(path))
    }

    fn diagnostics_all(&self) -> BTreeMap<PathBuf, Vec<Diagnostic>> {
        self.store.snapshot()
    }

    fn invalidate(&self, path: &Path) {
        self.record(SessionCall::Invalidate(path.to_path_buf()));
        self.store.clear(path);
        self.emitter
            .emit(&DiagnosticsInvalidatedEvent::new(&self.name, &path.to_string_lossy()));
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) -> Result<()> {
        self.emitter
            .emit(&WatchedFilesChangedEvent::new(&self.name, params.changes.clone()));
        self.record(SessionCall::WatchedFilesChanged(params.changes));
        Ok(())
    }

    fn on_watch_registration(&self, handler: RegistrationHandler) {
        let advertised = self.advertised.lock();
        for (id, watchers) in advertised.iter() {
            handler(id, watchers);
        }
        self.handlers.lock().push(handler);
    }
}
