//! lspsync: filesystem watch sync for analysis servers
//!
//! Keeps a set of external code-analysis sessions' view of a workspace in step
//! with the real filesystem, and turns what they report into a readable,
//! deterministic diagnostics report.
//!
//! # Components
//!
//! - [`watcher`] - directory walk, event classification, per-path debounce,
//!   and routing of changes to sessions
//! - [`registry`] - dynamically registered interest patterns and matching
//! - [`diagnostics`] - per-file and project-wide aggregation
//! - [`session`] - the boundary to the analysis sessions themselves
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lspsync::{LocalSession, SessionSet, SyncConfig, WorkspaceWatcher};
//!
//! let session: Arc<dyn lspsync::AnalysisSession> = Arc::new(LocalSession::new("gopls"));
//! let sessions = SessionSet::new(vec![session]);
//! let handle = WorkspaceWatcher::new(root, SyncConfig::default().watch, sessions).start()?;
//! // ...
//! handle.stop().await;
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod events;
pub mod paths;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod watcher;

// Re-export commonly used types
pub use cli::{Cli, Commands};
pub use config::{SyncConfig, WatchConfig};
pub use diagnostics::{DiagnosticRecord, DiagnosticsAggregator, DiagnosticsReport, Severity};
pub use error::{Result, SyncError};
pub use events::EventEmitter;
pub use registry::{PatternRegistry, PatternSpec, RegistrationHandler, WatchRegistration};
pub use session::{AnalysisSession, DiagnosticStore, LocalSession, SessionSet};
pub use watcher::{ChangeEvent, ChangeKind, WatcherHandle, WorkspaceWatcher};
