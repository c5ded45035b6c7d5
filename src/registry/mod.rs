//! Watch interest registry
//!
//! Analysis sessions advertise, at any point during a watch run, which files
//! they want change notifications for. The registry accumulates those patterns
//! (append-only, no dedup) and answers whether a given change is notifiable.
//!
//! # Thread Safety
//!
//! Registrations live behind a `parking_lot::RwLock`: matching takes the read
//! side and never blocks other matchers; only appending takes the write side.

pub mod matcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::paths::{clean_path, target_to_path, to_slash};
use crate::protocol::{base_uri, FileSystemWatcher, GlobPattern};

pub use matcher::{expand_braces, CompiledGlob};

/// Callback a session invokes when it advertises new watch patterns.
///
/// Arguments are the registration id and the advertised watchers.
pub type RegistrationHandler = Arc<dyn Fn(&str, &[FileSystemWatcher]) + Send + Sync>;

/// An interest pattern, anchored at the workspace root or an explicit base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternSpec {
    /// Workspace-relative (or absolute) glob
    Plain(String),
    /// Glob relative to `base` instead of the workspace root
    Relative { base: PathBuf, glob: String },
}

impl PatternSpec {
    pub fn glob(&self) -> &str {
        match self {
            Self::Plain(glob) => glob,
            Self::Relative { glob, .. } => glob,
        }
    }
}

impl From<&FileSystemWatcher> for PatternSpec {
    fn from(watcher: &FileSystemWatcher) -> Self {
        match &watcher.glob_pattern {
            GlobPattern::String(glob) => Self::Plain(glob.clone()),
            GlobPattern::Relative(rel) => Self::Relative {
                base: target_to_path(base_uri(rel).as_str()),
                glob: rel.pattern.clone(),
            },
        }
    }
}

/// A registered pattern with its compiled matcher.
///
/// A pattern that fails to compile is still kept (it counts toward the
/// registry being non-empty) but never matches.
#[derive(Debug, Clone)]
pub struct WatchRegistration {
    pub pattern: PatternSpec,
    matcher: Option<CompiledGlob>,
}

impl WatchRegistration {
    pub fn new(pattern: PatternSpec) -> Self {
        let matcher = match CompiledGlob::new(pattern.glob()) {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::error!(pattern = pattern.glob(), "Error compiling glob pattern: {}", e);
                None
            }
        };
        Self { pattern, matcher }
    }

    /// Match a plain path against this registration.
    ///
    /// The path is made relative to the pattern's base (the workspace root for
    /// plain patterns); a path outside the base never matches.
    pub fn matches(&self, path: &Path, workspace_root: &Path) -> bool {
        let Some(matcher) = &self.matcher else {
            return false;
        };

        let base = match &self.pattern {
            PatternSpec::Plain(glob) if glob.starts_with('/') => {
                return matcher.matches(&path.to_string_lossy());
            }
            PatternSpec::Plain(_) => workspace_root,
            PatternSpec::Relative { base, .. } => base.as_path(),
        };

        match path.strip_prefix(clean_path(base)) {
            Ok(rel) => matcher.matches(&to_slash(rel)),
            Err(_) => false,
        }
    }
}

/// Append-only, concurrency-safe store of watch interest patterns.
pub struct PatternRegistry {
    /// Workspace root, the implicit base of plain patterns (immutable)
    root: PathBuf,
    /// Log every advertised pattern individually
    debug: bool,
    registrations: RwLock<Vec<WatchRegistration>>,
}

impl PatternRegistry {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root: clean_path(&root),
            debug: false,
            registrations: RwLock::new(Vec::new()),
        }
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Record the watchers advertised by one capability registration.
    pub fn add_registrations(&self, id: &str, watchers: &[FileSystemWatcher]) {
        let new: Vec<WatchRegistration> = watchers
            .iter()
            .map(|w| WatchRegistration::new(PatternSpec::from(w)))
            .collect();

        let total = {
            let mut registrations = self.registrations.write();
            registrations.extend(new.iter().cloned());
            registrations.len()
        };

        tracing::debug!(id, added = new.len(), total, "Adding file watcher registrations");

        if self.debug {
            for (i, registration) in new.iter().enumerate() {
                match &registration.pattern {
                    PatternSpec::Plain(glob) => {
                        tracing::debug!(index = i + 1, pattern = %glob, "Registration");
                    }
                    PatternSpec::Relative { base, glob } => {
                        tracing::debug!(
                            index = i + 1,
                            pattern = %glob,
                            base = %base.display(),
                            "Registration"
                        );
                    }
                }
            }
        }
    }

    /// Register a single pattern directly.
    pub fn register(&self, pattern: PatternSpec) {
        self.registrations.write().push(WatchRegistration::new(pattern));
    }

    /// Whether a change on `target` (plain path or `file://` URI) should be
    /// sent to the sessions.
    ///
    /// True when any registered pattern matches, or when nothing has been
    /// registered yet.
    pub fn should_notify(&self, target: &str) -> bool {
        self.should_notify_path(&target_to_path(target))
    }

    /// [`should_notify`](Self::should_notify) for an already-decoded path.
    pub fn should_notify_path(&self, path: &Path) -> bool {
        let path = clean_path(path);
        let registrations = self.registrations.read();
        registrations.is_empty() || registrations.iter().any(|r| r.matches(&path, &self.root))
    }

    pub fn len(&self) -> usize {
        self.registrations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.read().is_empty()
    }

    /// Snapshot of the registered patterns, in registration order.
    pub fn patterns(&self) -> Vec<PatternSpec> {
        self.registrations
            .read()
            .iter()
            .map(|r| r.pattern.clone())
            .collect()
    }

    /// Handler to hand to sessions so their registrations land here.
    pub fn handler(self: &Arc<Self>) -> RegistrationHandler {
        let registry = Arc::clone(self);
        Arc::new(move |id: &str, watchers: &[FileSystemWatcher]| {
            registry.add_registrations(id, watchers);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{parse_uri, plain_watcher, relative_watcher};

    fn registry() -> PatternRegistry {
        PatternRegistry::new(PathBuf::from("/proj"))
    }

    #[test]
    fn test_empty_registry_fails_open() {
        let reg = registry();
        assert!(reg.is_empty());
        assert!(reg.should_notify("/proj/anything.txt"));
        assert!(reg.should_notify("/elsewhere/anything.txt"));
    }

    #[test]
    fn test_unrelated_path_dropped_once_patterns_exist() {
        let reg = registry();
        reg.add_registrations(
            "1",
            &[plain_watcher("*.go"), plain_watcher("{*.ts,*.tsx}")],
        );
        assert_eq!(reg.len(), 2);
        assert!(!reg.should_notify("/proj/sub/readme.md"));
        assert!(reg.should_notify("/proj/sub/x.go"));
        assert!(reg.should_notify("/proj/web/app.tsx"));
    }

    #[test]
    fn test_scheme_prefix_is_irrelevant() {
        let reg = registry();
        reg.register(PatternSpec::Plain("**/*.go".to_string()));
        for target in ["/proj/sub/x.go", "file:///proj/sub/x.go"] {
            assert!(reg.should_notify(target), "{} should match", target);
        }
        for target in ["/proj/sub/x.rs", "file:///proj/sub/x.rs"] {
            assert!(!reg.should_notify(target), "{} should not match", target);
        }
    }

    #[test]
    fn test_relative_pattern_uses_its_base() {
        let reg = registry();
        reg.add_registrations(
            "2",
            &[relative_watcher(parse_uri("file:///proj/pkg").unwrap(), "*.ts")],
        );
        assert!(reg.should_notify("/proj/pkg/index.ts"));
        // outside the base: relative path cannot be computed
        assert!(!reg.should_notify("/proj/other/index.ts"));
    }

    #[test]
    fn test_escaped_base_and_target_are_decoded() {
        let reg = registry();
        reg.add_registrations(
            "3",
            &[relative_watcher(parse_uri("file:///proj/my%20dir").unwrap(), "*.ts")],
        );
        assert!(reg.should_notify("/proj/my dir/index.ts"));
        assert!(reg.should_notify("file:///proj/my%20dir/index.ts"));
        assert!(!reg.should_notify("/proj/my%20dir/index.ts"));
    }

    #[test]
    fn test_path_outside_root_does_not_match_plain_pattern() {
        let reg = registry();
        reg.register(PatternSpec::Plain("**/*.go".to_string()));
        assert!(!reg.should_notify("/tmp/x.go"));
    }

    #[test]
    fn test_absolute_plain_pattern() {
        let reg = registry();
        reg.register(PatternSpec::Plain("/proj/**/*.go".to_string()));
        assert!(reg.should_notify("/proj/a/b/x.go"));
        assert!(!reg.should_notify("/proj/a/b/x.py"));
    }

    #[test]
    fn test_invalid_pattern_is_kept_but_never_matches() {
        let reg = registry();
        reg.register(PatternSpec::Plain("a**b".to_string()));
        assert_eq!(reg.len(), 1);
        assert!(!reg.should_notify("/proj/a**b"));
    }

    #[test]
    fn test_append_only_keeps_duplicates() {
        let reg = registry();
        let watchers = [plain_watcher("*.go")];
        reg.add_registrations("a", &watchers);
        reg.add_registrations("b", &watchers);
        assert_eq!(reg.len(), 2);
        assert_eq!(
            reg.patterns(),
            vec![
                PatternSpec::Plain("*.go".to_string()),
                PatternSpec::Plain("*.go".to_string())
            ]
        );
    }

    #[test]
    fn test_handler_feeds_registry() {
        let reg = Arc::new(registry());
        let handler = reg.handler();
        handler("gopls-1", &[plain_watcher("**/*.go")]);
        assert_eq!(reg.len(), 1);
    }
}
