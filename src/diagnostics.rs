//! Diagnostics aggregation across sessions
//!
//! Merges what every active session knows about a file (or the whole
//! workspace) into one report. Rendered lines are sorted before joining, so
//! the same underlying set always renders byte-identically no matter which
//! session answered first.
//!
//! Line format:
//!
//! ```text
//! Error: /proj/a.go:3:5 [gopls][UndeclaredName] undefined: x
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::paths::{absolutize, clean_path, is_within_root};
use crate::protocol::{code_string, Diagnostic, DiagnosticSeverity};
use crate::session::{AnalysisSession, SessionSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Error,
    Warn,
    Info,
    Hint,
}

impl Severity {
    /// Map the protocol severity. Absent or unrecognized is `Info`.
    pub fn from_lsp(severity: Option<DiagnosticSeverity>) -> Self {
        match severity {
            Some(s) if s == DiagnosticSeverity::ERROR => Self::Error,
            Some(s) if s == DiagnosticSeverity::WARNING => Self::Warn,
            Some(s) if s == DiagnosticSeverity::HINT => Self::Hint,
            _ => Self::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warn => "Warn",
            Self::Info => "Info",
            Self::Hint => "Hint",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One diagnostic, flattened for display. Line and column are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub severity: Severity,
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
    pub source: String,
    pub code: Option<String>,
    pub message: String,
}

impl DiagnosticRecord {
    /// Flatten a protocol diagnostic; `session` stands in for a missing source.
    pub fn from_protocol(path: &Path, diagnostic: &Diagnostic, session: &str) -> Self {
        let source = match diagnostic.source.as_deref() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => session.to_string(),
        };
        Self {
            severity: Severity::from_lsp(diagnostic.severity),
            path: path.to_path_buf(),
            line: diagnostic.range.start.line.saturating_add(1),
            column: diagnostic.range.start.character.saturating_add(1),
            source,
            code: diagnostic.code.as_ref().map(code_string),
            message: diagnostic.message.clone(),
        }
    }

    pub fn render(&self) -> String {
        let code = self
            .code
            .as_ref()
            .map(|c| format!("[{}]", c))
            .unwrap_or_default();
        format!(
            "{}: {}:{}:{} [{}]{} {}",
            self.severity,
            self.path.display(),
            self.line,
            self.column,
            self.source,
            code,
            self.message
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticsScope {
    File(PathBuf),
    Project,
}

/// Result of a diagnostics query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticsReport {
    /// No analysis sessions are active
    Unavailable,
    /// Sessions answered, with nothing to report
    Empty(DiagnosticsScope),
    /// Sorted, rendered lines
    Found {
        scope: DiagnosticsScope,
        lines: Vec<String>,
    },
}

impl DiagnosticsReport {
    fn from_lines(scope: DiagnosticsScope, mut lines: Vec<String>) -> Self {
        if lines.is_empty() {
            return Self::Empty(scope);
        }
        lines.sort();
        Self::Found { scope, lines }
    }

    pub fn lines(&self) -> &[String] {
        match self {
            Self::Found { lines, .. } => lines,
            _ => &[],
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable)
    }
}

impl fmt::Display for DiagnosticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "no analysis sessions available"),
            Self::Empty(DiagnosticsScope::File(path)) => {
                write!(f, "No diagnostics found for {}", path.display())
            }
            Self::Empty(DiagnosticsScope::Project) => write!(f, "No project diagnostics found"),
            Self::Found {
                scope: DiagnosticsScope::File(path),
                lines,
            } => write!(f, "Diagnostics for {}:\n{}", path.display(), lines.join("\n")),
            Self::Found {
                scope: DiagnosticsScope::Project,
                lines,
            } => write!(f, "Project diagnostics:\n{}", lines.join("\n")),
        }
    }
}

pub struct DiagnosticsAggregator {
    root: PathBuf,
    sessions: SessionSet,
}

impl DiagnosticsAggregator {
    pub fn new(root: PathBuf, sessions: SessionSet) -> Self {
        Self {
            root: clean_path(&root),
            sessions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Query one file, or the whole project when `file` is absent or blank.
    ///
    /// Relative paths resolve against the workspace root. A path outside the
    /// root is rejected.
    pub async fn query(&self, file: Option<&str>) -> Result<DiagnosticsReport> {
        if self.sessions.is_empty() {
            return Ok(DiagnosticsReport::Unavailable);
        }

        let file = file.map(str::trim).filter(|f| !f.is_empty());
        match file {
            Some(file) => {
                let path = absolutize(Path::new(file), &self.root);
                if !is_within_root(&self.root, &path) {
                    return Err(SyncError::OutsideRoot {
                        path: path.display().to_string(),
                    });
                }
                Ok(self.for_file(&path).await)
            }
            None => Ok(self.project()),
        }
    }

    /// Diagnostics for exactly `path`, refreshed from disk first.
    ///
    /// Each session gets the file opened (if needed) and resynced before being
    /// asked. A session that fails the final query is left out.
    pub async fn for_file(&self, path: &Path) -> DiagnosticsReport {
        if self.sessions.is_empty() {
            return DiagnosticsReport::Unavailable;
        }

        let mut lines = Vec::new();
        for session in self.sessions.iter() {
            refresh(session.as_ref(), path).await;
            match session.diagnostics_for(path).await {
                Ok(diagnostics) => lines.extend(
                    diagnostics
                        .iter()
                        .map(|d| DiagnosticRecord::from_protocol(path, d, session.name()).render()),
                ),
                Err(e) => {
                    tracing::warn!(
                        session = session.name(),
                        path = %path.display(),
                        "Error getting diagnostics: {}",
                        e
                    );
                }
            }
        }

        DiagnosticsReport::from_lines(DiagnosticsScope::File(path.to_path_buf()), lines)
    }

    /// Everything every session has cached under the workspace root.
    pub fn project(&self) -> DiagnosticsReport {
        if self.sessions.is_empty() {
            return DiagnosticsReport::Unavailable;
        }

        let mut lines = Vec::new();
        for session in self.sessions.iter() {
            for (path, diagnostics) in session.diagnostics_all() {
                if !is_within_root(&self.root, &path) {
                    continue;
                }
                lines.extend(
                    diagnostics
                        .iter()
                        .map(|d| DiagnosticRecord::from_protocol(&path, d, session.name()).render()),
                );
            }
        }

        DiagnosticsReport::from_lines(DiagnosticsScope::Project, lines)
    }
}

async fn refresh(session: &dyn AnalysisSession, path: &Path) {
    if !session.is_open(path) {
        if let Err(e) = session.open(path).await {
            tracing::debug!(session = session.name(), path = %path.display(), "Error opening file: {}", e);
        }
    }
    if let Err(e) = session.resync(path).await {
        tracing::debug!(session = session.name(), path = %path.display(), "Error resyncing file: {}", e);
    }
}
