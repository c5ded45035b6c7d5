//! Analysis protocol messages touched by lspsync.
//!
//! The message types come from `lsp-types`; this module re-exports the ones
//! lspsync relays and adds a few constructors and accessors on top. lspsync
//! never renegotiates message content.

use std::str::FromStr;

use crate::error::{Result, SyncError};

pub use lsp_types::{
    Diagnostic, DiagnosticSeverity, DidChangeWatchedFilesParams, FileChangeType, FileEvent,
    FileSystemWatcher, GlobPattern, NumberOrString, OneOf, Position, PublishDiagnosticsParams,
    Range, RelativePattern, Uri, WatchKind, WorkspaceFolder,
};

/// Parse a URI string as received on the wire.
pub fn parse_uri(uri: &str) -> Result<Uri> {
    Uri::from_str(uri).map_err(|e| SyncError::InvalidUri {
        uri: uri.to_string(),
        message: format!("{:?}", e),
    })
}

/// Watcher for a workspace-relative (or absolute) glob, all change kinds.
pub fn plain_watcher(glob: impl Into<String>) -> FileSystemWatcher {
    FileSystemWatcher {
        glob_pattern: GlobPattern::String(glob.into()),
        kind: None,
    }
}

/// Watcher for a glob anchored at `base` instead of the workspace root.
pub fn relative_watcher(base: Uri, glob: impl Into<String>) -> FileSystemWatcher {
    FileSystemWatcher {
        glob_pattern: GlobPattern::Relative(RelativePattern {
            base_uri: OneOf::Right(base),
            pattern: glob.into(),
        }),
        kind: None,
    }
}

/// Base URI of a relative pattern, whichever form it was sent in.
pub fn base_uri(pattern: &RelativePattern) -> &Uri {
    match &pattern.base_uri {
        OneOf::Left(folder) => &folder.uri,
        OneOf::Right(uri) => uri,
    }
}

/// Point diagnostic at a 0-based line and column.
pub fn diagnostic_at(
    line: u32,
    character: u32,
    severity: DiagnosticSeverity,
    message: impl Into<String>,
) -> Diagnostic {
    let pos = Position::new(line, character);
    let mut diagnostic = Diagnostic::new_simple(Range::new(pos, pos), message.into());
    diagnostic.severity = Some(severity);
    diagnostic
}

/// Render a diagnostic code the way it was sent.
pub fn code_string(code: &NumberOrString) -> String {
    match code {
        NumberOrString::Number(n) => n.to_string(),
        NumberOrString::String(s) => s.clone(),
    }
}
