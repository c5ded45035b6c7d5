//! Per-path debounce timers.
//!
//! Each path has at most one pending timer. Scheduling again for the same path
//! aborts the pending timer and starts a fresh one, so a burst of writes fires
//! once, one full window after the last write. Paths are independent of each
//! other; no ordering across paths is implied.
//!
//! Timers run as tokio tasks. The timer table is a `parking_lot::Mutex`
//! held for insert/cancel and, at fire time, for the ownership check plus the
//! callback itself, never across an await. Callbacks must not block; the
//! watch run's callback only enqueues a change for the dispatcher. The closed
//! flag is read under the same lock, so once [`Debouncer::cancel_all`]
//! returns no callback is running or will run.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// A live scheduled callback for one path.
struct PendingDebounce {
    id: u64,
    task: JoinHandle<()>,
}

pub struct Debouncer {
    window: Duration,
    pending: Arc<Mutex<HashMap<PathBuf, PendingDebounce>>>,
    /// Set on teardown; timers that wake afterwards do not fire
    closed: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Arc::new(Mutex::new(HashMap::new())),
            closed: Arc::new(AtomicBool::new(false)),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `fire` to run once `key` has been quiet for one window.
    ///
    /// Replaces any timer already pending for `key`; returns whether one was
    /// replaced. Must be called from within a tokio runtime. After
    /// [`cancel_all`](Self::cancel_all) this is a no-op.
    pub fn schedule<F>(&self, key: PathBuf, fire: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let window = self.window;
        let table = Arc::clone(&self.pending);
        let closed = Arc::clone(&self.closed);
        let task_key = key.clone();

        // Held across spawn + insert so the new timer cannot look itself up
        // before it is in the table.
        let mut pending = self.pending.lock();
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }

        let task = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let mut table = table.lock();
            match table.get(&task_key) {
                Some(entry) if entry.id == id => {
                    table.remove(&task_key);
                }
                // superseded by a newer write
                _ => return,
            }
            if closed.load(Ordering::SeqCst) {
                return;
            }
            fire();
        });

        match pending.insert(key, PendingDebounce { id, task }) {
            Some(previous) => {
                previous.task.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel the pending timer for `key`, if any.
    pub fn cancel(&self, key: &Path) -> bool {
        match self.pending.lock().remove(key) {
            Some(entry) => {
                entry.task.abort();
                true
            }
            None => false,
        }
    }

    /// Abort every pending timer and refuse new ones. Returns how many were
    /// cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<PendingDebounce> = {
            let mut pending = self.pending.lock();
            self.closed.store(true, Ordering::SeqCst);
            pending.drain().map(|(_, e)| e).collect()
        };
        for entry in &drained {
            entry.task.abort();
        }
        drained.len()
    }

    pub fn is_pending(&self, key: &Path) -> bool {
        self.pending.lock().contains_key(key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
