//! Analysis session boundary
//!
//! lspsync does not run analysis servers itself. A session is whatever keeps a
//! connection to one server alive; this module defines the calls the watcher
//! and the diagnostics aggregator need from it, plus two building blocks for
//! implementations: [`DiagnosticStore`] (the published-diagnostics cache) and
//! [`LocalSession`] (an in-process session with no server behind it).
//!
//! The set of active sessions is owned by the caller and is read-only here.

pub mod local;
pub mod store;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{Diagnostic, DidChangeWatchedFilesParams};
use crate::registry::RegistrationHandler;

pub use local::{LocalSession, SessionCall};
pub use store::DiagnosticStore;

/// One live connection to an analysis server.
#[async_trait]
pub trait AnalysisSession: Send + Sync {
    /// Session name, used as the diagnostic source when the server sends none.
    fn name(&self) -> &str;

    /// Whether `path` has been explicitly opened in this session.
    fn is_open(&self, path: &Path) -> bool;

    /// Open `path` in the session.
    async fn open(&self, path: &Path) -> Result<()>;

    /// Push the current on-disk content of an open file to the session.
    async fn resync(&self, path: &Path) -> Result<()>;

    /// Diagnostics for exactly this path.
    async fn diagnostics_for(&self, path: &Path) -> Result<Vec<Diagnostic>>;

    /// Full snapshot of cached diagnostics, keyed by plain path.
    fn diagnostics_all(&self) -> BTreeMap<PathBuf, Vec<Diagnostic>>;

    /// Drop any cached diagnostics for `path`.
    fn invalidate(&self, path: &Path);

    /// Send a watched-files change notification.
    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) -> Result<()>;

    /// Subscribe to the session's watch-pattern registrations.
    fn on_watch_registration(&self, handler: RegistrationHandler);
}

/// The active sessions, as handed to the watcher and the aggregator.
#[derive(Clone, Default)]
pub struct SessionSet {
    sessions: Arc<Vec<Arc<dyn AnalysisSession>>>,
}

impl SessionSet {
    pub fn new(sessions: Vec<Arc<dyn AnalysisSession>>) -> Self {
        Self {
            sessions: Arc::new(sessions),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn AnalysisSession>> {
        self.sessions.iter()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Bring every session up to date with a file a tool just wrote.
    ///
    /// Opens the file where it is not open yet, then resyncs it. A failing
    /// session is logged and skipped.
    pub async fn sync_file(&self, path: &Path) {
        for session in self.iter() {
            if !session.is_open(path) {
                if let Err(e) = session.open(path).await {
                    tracing::warn!(session = session.name(), path = %path.display(), "Error opening file: {}", e);
                    continue;
                }
            }
            if let Err(e) = session.resync(path).await {
                tracing::warn!(session = session.name(), path = %path.display(), "Error notifying change: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for SessionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.sessions.iter().map(|s| s.name()))
            .finish()
    }
}

impl FromIterator<Arc<dyn AnalysisSession>> for SessionSet {
    fn from_iter<I: IntoIterator<Item = Arc<dyn AnalysisSession>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
