//! Watch-run events for the `lspsync watch` trace output
//!
//! When tracing a watch run, every outbound call that would reach an analysis
//! server is printed to stdout as one JSON object per line (JSON Lines):
//! ```json
//! {"type":"watched_files_changed","session":"trace","changes":[{"uri":"file:///proj/a.go","type":2}],...}
//! ```
//!
//! # Event Types
//!
//! - `watch_started` - Watches installed, event worker running
//! - `watched_files_changed` - A change notification was sent to a session
//! - `file_resynced` - An open file's content was pushed to a session
//! - `diagnostics_invalidated` - Cached diagnostics for a deleted path were dropped
//! - `watch_stopped` - The watch run was torn down

use serde::Serialize;
use std::io::{self, Write};

use crate::protocol::FileEvent;

/// Event emitter for sending JSON events to stdout
#[derive(Debug, Clone, Copy)]
pub struct EventEmitter {
    enabled: bool,
}

impl EventEmitter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Emit an event to stdout as JSON
    pub fn emit<E: WatchEvent>(&self, event: &E) {
        if !self.enabled {
            return;
        }

        if let Some(line) = render(event) {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            // Ignore write errors (reader may have gone away)
            let _ = writeln!(handle, "{}", line);
            let _ = handle.flush();
        }
    }
}

/// Serialize an event into its JSON line (without the trailing newline).
pub fn render<E: WatchEvent>(event: &E) -> Option<String> {
    let wrapper = EventWrapper {
        event_type: E::event_type(),
        payload: event,
    };
    serde_json::to_string(&wrapper).ok()
}

/// Wrapper for events with type field
#[derive(Serialize)]
struct EventWrapper<'a, P: Serialize> {
    #[serde(rename = "type")]
    event_type: &'static str,
    #[serde(flatten)]
    payload: &'a P,
}

/// Trait for watch-run events
pub trait WatchEvent: Serialize {
    fn event_type() -> &'static str;
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

// ============================================================================
// Event Types
// ============================================================================

/// Emitted once the initial walk has installed its watches
#[derive(Debug, Clone, Serialize)]
pub struct WatchStartedEvent {
    pub root: String,
    pub watched_dirs: usize,
    pub debounce_ms: u64,
    pub timestamp: String,
}

impl WatchEvent for WatchStartedEvent {
    fn event_type() -> &'static str {
        "watch_started"
    }
}

impl WatchStartedEvent {
    pub fn new(root: &str, watched_dirs: usize, debounce_ms: u64) -> Self {
        Self {
            root: root.to_string(),
            watched_dirs,
            debounce_ms,
            timestamp: now(),
        }
    }
}

/// Emitted when a session receives a watched-files change notification
#[derive(Debug, Clone, Serialize)]
pub struct WatchedFilesChangedEvent {
    pub session: String,
    pub changes: Vec<FileEvent>,
    pub timestamp: String,
}

impl WatchEvent for WatchedFilesChangedEvent {
    fn event_type() -> &'static str {
        "watched_files_changed"
    }
}

impl WatchedFilesChangedEvent {
    pub fn new(session: &str, changes: Vec<FileEvent>) -> Self {
        Self {
            session: session.to_string(),
            changes,
            timestamp: now(),
        }
    }
}

/// Emitted when an open file's content is pushed to a session
#[derive(Debug, Clone, Serialize)]
pub struct FileResyncedEvent {
    pub session: String,
    pub path: String,
    pub timestamp: String,
}

impl WatchEvent for FileResyncedEvent {
    fn event_type() -> &'static str {
        "file_resynced"
    }
}

impl FileResyncedEvent {
    pub fn new(session: &str, path: &str) -> Self {
        Self {
            session: session.to_string(),
            path: path.to_string(),
            timestamp: now(),
        }
    }
}

/// Emitted when cached diagnostics for a path are dropped
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsInvalidatedEvent {
    pub session: String,
    pub path: String,
    pub timestamp: String,
}

impl WatchEvent for DiagnosticsInvalidatedEvent {
    fn event_type() -> &'static str {
        "diagnostics_invalidated"
    }
}

impl DiagnosticsInvalidatedEvent {
    pub fn new(session: &str, path: &str) -> Self {
        Self {
            session: session.to_string(),
            path: path.to_string(),
            timestamp: now(),
        }
    }
}

/// Emitted when the watch run is torn down
#[derive(Debug, Clone, Serialize)]
pub struct WatchStoppedEvent {
    pub root: String,
    pub cancelled_timers: usize,
    pub timestamp: String,
}

impl WatchEvent for WatchStoppedEvent {
    fn event_type() -> &'static str {
        "watch_stopped"
    }
}

impl WatchStoppedEvent {
    pub fn new(root: &str, cancelled_timers: usize) -> Self {
        Self {
            root: root.to_string(),
            cancelled_timers,
            timestamp: now(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{parse_uri, FileChangeType};

    #[test]
    fn test_watched_files_changed_serialization() {
        let event = WatchedFilesChangedEvent {
            session: "gopls".to_string(),
            changes: vec![FileEvent {
                uri: parse_uri("file:///proj/a.go").unwrap(),
                typ: FileChangeType::CREATED,
            }],
            timestamp: "2024-01-15T10:30:00Z".to_string(),
        };

        let json = render(&event).unwrap();
        assert!(json.starts_with(r#"{"type":"watched_files_changed""#));
        assert!(json.contains(r#""session":"gopls""#));
        assert!(json.contains(r#""changes":[{"uri":"file:///proj/a.go","type":1}]"#));
    }

    #[test]
    fn test_watch_started_event() {
        let event = WatchStartedEvent::new("/proj", 12, 300);
        assert_eq!(event.watched_dirs, 12);
        let json = render(&event).unwrap();
        assert!(json.contains(r#""root":"/proj""#));
        assert!(json.contains(r#""debounce_ms":300"#));
    }

    #[test]
    fn test_disabled_emitter_is_noop() {
        let emitter = EventEmitter::disabled();
        assert!(!emitter.is_enabled());
        emitter.emit(&WatchStoppedEvent::new("/proj", 0));
    }
}
