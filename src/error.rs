//! Error types and exit codes for lspsync

use std::process::ExitCode;
use thiserror::Error;

/// Main error type for lspsync operations
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to create file watcher: {message}")]
    WatcherSetup { message: String },

    #[error("Failed to read workspace root {path}: {message}")]
    RootUnreadable { path: String, message: String },

    #[error("Failed to watch directory {path}: {message}")]
    WatchInstall { path: String, message: String },

    #[error("Session {session} failed: {message}")]
    Session { session: String, message: String },

    #[error("Path is outside workspace root: {path}")]
    OutsideRoot { path: String },

    #[error("Invalid URI {uri}: {message}")]
    InvalidUri { uri: String, message: String },

    #[error("Invalid glob pattern {pattern}: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SyncError {
    /// Shorthand for a failed call against one analysis session.
    pub fn session(session: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Session {
            session: session.into(),
            message: message.into(),
        }
    }

    /// Convert error to the CLI exit code:
    /// - 0: Success
    /// - 1: IO / configuration error
    /// - 2: Watch setup failure (watch source or workspace root)
    /// - 3: Path outside the workspace root
    /// - 4: Session, URI or pattern error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::Io(_) | Self::Json(_) | Self::Config { .. } => ExitCode::from(1),
            Self::WatcherSetup { .. } | Self::RootUnreadable { .. } | Self::WatchInstall { .. } => {
                ExitCode::from(2)
            }
            Self::OutsideRoot { .. } => ExitCode::from(3),
            Self::Session { .. } | Self::InvalidUri { .. } | Self::InvalidPattern { .. } => {
                ExitCode::from(4)
            }
        }
    }

    /// Whether this error ends the watch run or is isolated to one
    /// directory, event or session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::WatcherSetup { .. } | Self::RootUnreadable { .. }
        )
    }
}

/// Result type alias for lspsync operations
pub type Result<T> = std::result::Result<T, SyncError>;
