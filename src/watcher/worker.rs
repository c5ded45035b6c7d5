//! The single event worker.
//!
//! Consumes raw OS events strictly in arrival order. Creates and deletes are
//! queued for the dispatcher straight away; writes go through the debouncer
//! and are queued when their timer fires. The worker never awaits a session.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::watch;

use super::debounce::Debouncer;
use super::event::{ChangeEvent, ChangeKind, RawEvent};
use super::notifier::DispatchQueue;
use super::skip::SkipRules;
use super::walk::{install_watches, WatchTarget};

pub struct EventWorker<W: WatchTarget> {
    root: PathBuf,
    rules: SkipRules,
    target: W,
    debouncer: Arc<Debouncer>,
    queue: DispatchQueue,
}

impl<W: WatchTarget> EventWorker<W> {
    pub fn new(
        root: PathBuf,
        rules: SkipRules,
        target: W,
        debouncer: Arc<Debouncer>,
        queue: DispatchQueue,
    ) -> Self {
        Self {
            root,
            rules,
            target,
            debouncer,
            queue,
        }
    }

    pub fn target(&self) -> &W {
        &self.target
    }

    /// Classify and route one raw event.
    pub fn handle(&mut self, raw: RawEvent) {
        let RawEvent { path, ops } = raw;

        if self.rules.is_excluded(&self.root, &path) {
            tracing::trace!(path = %path.display(), "[WATCHER] Ignoring event in skipped directory");
            return;
        }

        // Already gone: no directory check, carry on with the notification.
        let is_dir = match fs::metadata(&path) {
            Ok(meta) => meta.is_dir(),
            Err(e) => {
                tracing::trace!(path = %path.display(), "[WATCHER] Stat failed: {}", e);
                false
            }
        };

        if ops.create {
            if is_dir {
                if self.rules.should_skip_dir(&path) {
                    tracing::debug!(path = %path.display(), "[WATCHER] Skipping created directory");
                    return;
                }
                if let Err(e) = install_watches(&mut self.target, &path, &self.rules) {
                    tracing::error!(path = %path.display(), "Error watching new directory: {}", e);
                }
            }
            self.queue
                .submit(ChangeEvent::new(path.clone(), ChangeKind::Created));
        }

        if ops.write {
            let queue = self.queue.clone();
            let change = ChangeEvent::new(path.clone(), ChangeKind::Changed);
            self.debouncer.schedule(path.clone(), move || {
                queue.submit(change);
            });
        }

        if ops.remove || ops.rename {
            self.debouncer.cancel(&path);
            self.queue.submit(ChangeEvent::new(path, ChangeKind::Deleted));
        }
    }

    /// Process events until the stream closes or `shutdown` flips to true.
    pub async fn run(
        mut self,
        mut events: UnboundedReceiver<notify::Result<notify::Event>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        tracing::debug!(root = %self.root.display(), "[WATCHER] Event loop started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                event = events.recv() => match event {
                    Some(Ok(event)) => {
                        for raw in RawEvent::from_notify(event) {
                            self.handle(raw);
                        }
                    }
                    Some(Err(e)) => tracing::error!("Watcher error: {}", e),
                    None => break,
                },
            }
        }
        tracing::debug!(root = %self.root.display(), "[WATCHER] Event loop stopped");
    }
}
