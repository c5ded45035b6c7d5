//! Common test utilities and fixtures for lspsync integration tests
//!
//! This module provides:
//! - `TestWorkspace` for building throwaway workspace trees
//! - `FailingSession`, a session whose every protocol call errors
//! - `HangingSession`, a session whose change notifications never complete
//! - Helpers for assembling session sets and waiting on async conditions

#![allow(unused_imports)]
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use lspsync::protocol::{Diagnostic, DidChangeWatchedFilesParams, PublishDiagnosticsParams};
use lspsync::{AnalysisSession, LocalSession, RegistrationHandler, SessionSet, SyncError};

/// Builder for temporary workspace trees
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Canonical root, so paths reported by the OS share its prefix
    pub fn path(&self) -> PathBuf {
        fs::canonicalize(self.dir.path()).expect("Failed to canonicalize temp dir")
    }

    pub fn join(&self, relative: &str) -> PathBuf {
        self.path().join(relative)
    }

    pub fn add_file(&self, relative: &str, content: &str) -> &Self {
        let full = self.join(relative);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full, content).expect("Failed to write file");
        self
    }

    pub fn add_dir(&self, relative: &str) -> &Self {
        fs::create_dir_all(self.join(relative)).expect("Failed to create dir");
        self
    }
}

/// A session whose server has gone away: every call fails.
pub struct FailingSession {
    name: String,
}

impl FailingSession {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    fn err(&self) -> SyncError {
        SyncError::session(&self.name, "connection closed")
    }
}

#[async_trait]
impl AnalysisSession for FailingSession {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_open(&self, _path: &Path) -> bool {
        false
    }

    async fn open(&self, _path: &Path) -> lspsync::Result<()> {
        Err(self.err())
    }

    async fn resync(&self, _path: &Path) -> lspsync::Result<()> {
        Err(self.err())
    }

    async fn diagnostics_for(&self, _path: &Path) -> lspsync::Result<Vec<Diagnostic>> {
        Err(self.err())
    }

    fn diagnostics_all(&self) -> BTreeMap<PathBuf, Vec<Diagnostic>> {
        BTreeMap::new()
    }

    fn invalidate(&self, _path: &Path) {}

    async fn did_change_watched_files(&self, _params: DidChangeWatchedFilesParams) -> lspsync::Result<()> {
        Err(self.err())
    }

    fn on_watch_registration(&self, _handler: RegistrationHandler) {}
}

/// A session stuck mid-call: `did_change_watched_files` never returns.
#[derive(Default)]
pub struct HangingSession {
    entered: AtomicBool,
}

impl HangingSession {
    /// Whether a change notification has started (and is now stuck).
    pub fn entered(&self) -> bool {
        self.entered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisSession for HangingSession {
    fn name(&self) -> &str {
        "hung"
    }

    fn is_open(&self, _path: &Path) -> bool {
        false
    }

    async fn open(&self, _path: &Path) -> lspsync::Result<()> {
        Ok(())
    }

    async fn resync(&self, _path: &Path) -> lspsync::Result<()> {
        Ok(())
    }

    async fn diagnostics_for(&self, _path: &Path) -> lspsync::Result<Vec<Diagnostic>> {
        Ok(Vec::new())
    }

    fn diagnostics_all(&self) -> BTreeMap<PathBuf, Vec<Diagnostic>> {
        BTreeMap::new()
    }

    fn invalidate(&self, _path: &Path) {}

    async fn did_change_watched_files(&self, _params: DidChangeWatchedFilesParams) -> lspsync::Result<()> {
        self.entered.store(true, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(())
    }

    fn on_watch_registration(&self, _handler: RegistrationHandler) {}
}

/// Wrap sessions into a set, keeping the concrete handles for assertions.
pub fn session_set(sessions: &[Arc<dyn AnalysisSession>]) -> SessionSet {
    SessionSet::new(sessions.to_vec())
}

pub fn local(name: &str) -> Arc<LocalSession> {
    Arc::new(LocalSession::new(name))
}

pub fn publish(session: &LocalSession, path: &Path, diagnostics: Vec<Diagnostic>) {
    let uri = lspsync::paths::path_to_uri(path).expect("absolute path");
    session.publish(PublishDiagnosticsParams::new(uri, diagnostics, None));
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
