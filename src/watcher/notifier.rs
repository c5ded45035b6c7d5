//! Routes classified changes to the sessions.
//!
//! | Change  | Action                                                        |
//! |---------|---------------------------------------------------------------|
//! | Deleted | invalidate cached diagnostics in every session                |
//! | Changed | resync where the file is open, else notify if eligible        |
//! | Created | notify every session if eligible                              |
//!
//! Every outbound call is fire-and-forget: failures are logged and dropped.
//!
//! Session calls run on a dedicated dispatcher task fed by a [`DispatchQueue`].
//! The event worker and the debounce timers only enqueue, so a slow or hung
//! session delays delivery but never event processing or teardown. The queue
//! is FIFO, which keeps per-path order intact.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::protocol::DidChangeWatchedFilesParams;
use crate::registry::PatternRegistry;
use crate::session::{AnalysisSession, SessionSet};

use super::event::{ChangeEvent, ChangeKind};

/// Sending half of the dispatch queue.
#[derive(Clone)]
pub struct DispatchQueue {
    tx: UnboundedSender<ChangeEvent>,
}

impl DispatchQueue {
    pub fn channel() -> (Self, UnboundedReceiver<ChangeEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue a change for delivery. Never blocks; returns false once the
    /// dispatcher is gone.
    pub fn submit(&self, change: ChangeEvent) -> bool {
        match self.tx.send(change) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(path = %e.0.path.display(), "Dispatcher stopped, dropping change");
                false
            }
        }
    }
}

#[derive(Clone)]
pub struct Notifier {
    sessions: SessionSet,
    registry: Arc<PatternRegistry>,
}

impl Notifier {
    pub fn new(sessions: SessionSet, registry: Arc<PatternRegistry>) -> Self {
        Self { sessions, registry }
    }

    pub fn registry(&self) -> &Arc<PatternRegistry> {
        &self.registry
    }

    /// Spawn the dispatcher task. It runs until every queue handle is dropped
    /// or the task is aborted.
    pub fn spawn(self) -> (DispatchQueue, JoinHandle<()>) {
        let (queue, rx) = DispatchQueue::channel();
        (queue, tokio::spawn(self.run(rx)))
    }

    /// Deliver queued changes one at a time, in arrival order.
    pub async fn run(self, mut changes: UnboundedReceiver<ChangeEvent>) {
        while let Some(change) = changes.recv().await {
            self.dispatch(&change).await;
        }
        tracing::debug!("[WATCHER] Dispatcher stopped");
    }

    pub async fn dispatch(&self, change: &ChangeEvent) {
        match change.kind {
            ChangeKind::Deleted => {
                for session in self.sessions.iter() {
                    session.invalidate(&change.path);
                }
                tracing::debug!(path = %change.path.display(), "Invalidated diagnostics");
            }
            ChangeKind::Changed => {
                let mut eligible = None;
                for session in self.sessions.iter() {
                    if session.is_open(&change.path) {
                        if let Err(e) = session.resync(&change.path).await {
                            tracing::error!(
                                session = session.name(),
                                path = %change.path.display(),
                                "Error resyncing file: {}",
                                e
                            );
                        }
                        continue;
                    }
                    if *eligible.get_or_insert_with(|| self.is_eligible(change)) {
                        self.notify(session.as_ref(), change).await;
                    }
                }
            }
            ChangeKind::Created => {
                if !self.is_eligible(change) {
                    return;
                }
                for session in self.sessions.iter() {
                    self.notify(session.as_ref(), change).await;
                }
            }
        }
    }

    fn is_eligible(&self, change: &ChangeEvent) -> bool {
        let eligible = self.registry.should_notify_path(&change.path);
        if !eligible {
            tracing::trace!(path = %change.path.display(), "No matching watch pattern, dropping");
        }
        eligible
    }

    async fn notify(&self, session: &dyn AnalysisSession, change: &ChangeEvent) {
        let event = match change.to_file_event() {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(path = %change.path.display(), "Error building file event: {}", e);
                return;
            }
        };
        let params = DidChangeWatchedFilesParams {
            changes: vec![event],
        };
        if let Err(e) = session.did_change_watched_files(params).await {
            tracing::error!(
                session = session.name(),
                path = %change.path.display(),
                "Error notifying watched file change: {}",
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use crate::protocol::{
        diagnostic_at, parse_uri, plain_watcher, DiagnosticSeverity, FileChangeType,
        PublishDiagnosticsParams,
    };
    use crate::session::{LocalSession, SessionCall};

    fn setup(names: &[&str]) -> (Vec<Arc<LocalSession>>, Notifier) {
        let sessions: Vec<Arc<LocalSession>> =
            names.iter().map(|n| Arc::new(LocalSession::new(*n))).collect();
        let set = sessions
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn AnalysisSession>)
            .collect();
        let registry = Arc::new(PatternRegistry::new(PathBuf::from("/proj")));
        (sessions, Notifier::new(set, registry))
    }

    #[tokio::test]
    async fn test_changed_open_file_resyncs_and_bypasses_patterns() {
        let (sessions, notifier) = setup(&["gopls", "tsserver"]);
        notifier
            .registry()
            .add_registrations("1", &[plain_watcher("*.ts")]);
        let path = Path::new("/proj/a.go");
        sessions[0].open(path).await.unwrap();

        notifier
            .dispatch(&ChangeEvent::new(path, ChangeKind::Changed))
            .await;

        assert_eq!(sessions[0].calls().last(), Some(&SessionCall::Resync(path.to_path_buf())));
        // not open there and not eligible
        assert!(sessions[1].calls().is_empty());
    }

    #[tokio::test]
    async fn test_changed_eligible_is_notified() {
        let (sessions, notifier) = setup(&["gopls"]);
        notifier
            .registry()
            .add_registrations("1", &[plain_watcher("*.go")]);

        notifier
            .dispatch(&ChangeEvent::new("/proj/sub/x.go", ChangeKind::Changed))
            .await;
        notifier
            .dispatch(&ChangeEvent::new("/proj/sub/readme.md", ChangeKind::Changed))
            .await;

        let changes = sessions[0].notified_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].uri.as_str(), "file:///proj/sub/x.go");
        assert_eq!(changes[0].typ, FileChangeType::CHANGED);
    }

    #[tokio::test]
    async fn test_created_goes_to_every_session_when_registry_empty() {
        let (sessions, notifier) = setup(&["a", "b"]);
        notifier
            .dispatch(&ChangeEvent::new("/proj/new.txt", ChangeKind::Created))
            .await;
        for session in &sessions {
            let changes = session.notified_changes();
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0].typ, FileChangeType::CREATED);
        }
    }

    #[tokio::test]
    async fn test_deleted_only_invalidates() {
        let (sessions, notifier) = setup(&["gopls"]);
        sessions[0].publish(PublishDiagnosticsParams::new(
            parse_uri("file:///proj/a.go").unwrap(),
            vec![diagnostic_at(0, 0, DiagnosticSeverity::ERROR, "x")],
            None,
        ));

        notifier
            .dispatch(&ChangeEvent::new("/proj/a.go", ChangeKind::Deleted))
            .await;

        assert!(sessions[0].diagnostics_all().is_empty());
        assert!(sessions[0].notified_changes().is_empty());
        assert_eq!(
            sessions[0].calls(),
            vec![SessionCall::Invalidate(PathBuf::from("/proj/a.go"))]
        );
    }

    #[tokio::test]
    async fn test_deleted_escaped_path_invalidates_and_notifies_encoded_uri() {
        let (sessions, notifier) = setup(&["gopls"]);
        sessions[0].publish(PublishDiagnosticsParams::new(
            parse_uri("file:///proj/my%20dir/a.go").unwrap(),
            vec![diagnostic_at(0, 0, DiagnosticSeverity::ERROR, "broken")],
            None,
        ));

        notifier
            .dispatch(&ChangeEvent::new("/proj/my dir/b.go", ChangeKind::Created))
            .await;
        assert_eq!(
            sessions[0].notified_changes()[0].uri.as_str(),
            "file:///proj/my%20dir/b.go"
        );

        notifier
            .dispatch(&ChangeEvent::new("/proj/my dir/a.go", ChangeKind::Deleted))
            .await;
        assert!(sessions[0].diagnostics_all().is_empty());
    }

    #[tokio::test]
    async fn test_queue_delivers_in_order() {
        let (sessions, notifier) = setup(&["gopls"]);
        let (queue, task) = notifier.spawn();

        for name in ["a.go", "b.go", "c.go"] {
            assert!(queue.submit(ChangeEvent::new(format!("/proj/{}", name), ChangeKind::Created)));
        }
        drop(queue);
        task.await.unwrap();

        let uris: Vec<String> = sessions[0]
            .notified_changes()
            .iter()
            .map(|c| c.uri.as_str().to_string())
            .collect();
        assert_eq!(
            uris,
            vec!["file:///proj/a.go", "file:///proj/b.go", "file:///proj/c.go"]
        );
    }

    #[tokio::test]
    async fn test_submit_after_dispatcher_gone() {
        let (queue, rx) = DispatchQueue::channel();
        drop(rx);
        assert!(!queue.submit(ChangeEvent::new("/proj/a.go", ChangeKind::Created)));
    }
}
