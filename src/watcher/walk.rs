//! Watch installation.
//!
//! Watches are installed one directory at a time (non-recursive), so skipped
//! directories never get a watch and never produce events.

use std::fs;
use std::path::Path;

use ignore::WalkBuilder;
use notify::{RecursiveMode, Watcher};

use crate::error::{Result, SyncError};

use super::skip::SkipRules;

/// Something that can observe a single directory.
pub trait WatchTarget: Send {
    fn watch_dir(&mut self, dir: &Path) -> Result<()>;
}

impl WatchTarget for notify::RecommendedWatcher {
    fn watch_dir(&mut self, dir: &Path) -> Result<()> {
        self.watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| SyncError::WatchInstall {
                path: dir.display().to_string(),
                message: e.to_string(),
            })
    }
}

/// Walk `root` and install a watch on every directory not excluded by `rules`.
///
/// `root` itself is always watched. A directory whose watch cannot be
/// installed is logged and skipped; the walk continues. Returns the number of
/// directories now watched.
pub fn install_watches<W>(target: &mut W, root: &Path, rules: &SkipRules) -> Result<usize>
where
    W: WatchTarget + ?Sized,
{
    fs::read_dir(root).map_err(|e| SyncError::RootUnreadable {
        path: root.display().to_string(),
        message: e.to_string(),
    })?;

    let filter_rules = rules.clone();
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            entry.depth() == 0 || !is_dir || !filter_rules.should_skip_dir(entry.path())
        })
        .build();

    let mut watched = 0;
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("[WATCHER] Error walking directory: {}", e);
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        match target.watch_dir(entry.path()) {
            Ok(()) => watched += 1,
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), "Error watching directory: {}", e);
            }
        }
    }

    tracing::debug!(root = %root.display(), watched, "Installed directory watches");
    Ok(watched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingTarget {
        dirs: Vec<PathBuf>,
        fail_on: Option<&'static str>,
    }

    impl WatchTarget for RecordingTarget {
        fn watch_dir(&mut self, dir: &Path) -> Result<()> {
            if let Some(name) = self.fail_on {
                if dir.ends_with(name) {
                    return Err(SyncError::WatchInstall {
                        path: dir.display().to_string(),
                        message: "too many watches".to_string(),
                    });
                }
            }
            self.dirs.push(dir.to_path_buf());
            Ok(())
        }
    }

    fn layout() -> TempDir {
        let dir = TempDir::new().unwrap();
        for sub in ["src/api", "pkg", "node_modules/left-pad", ".git/objects", "target/debug"] {
            fs::create_dir_all(dir.path().join(sub)).unwrap();
        }
        fs::write(dir.path().join("src/main.go"), "package main").unwrap();
        dir
    }

    #[test]
    fn test_skipped_dirs_are_never_watched() {
        let dir = layout();
        let mut target = RecordingTarget::default();
        let count = install_watches(&mut target, dir.path(), &SkipRules::default()).unwrap();

        assert_eq!(count, 4);
        assert!(target.dirs.contains(&dir.path().to_path_buf()));
        assert!(target.dirs.contains(&dir.path().join("src/api")));
        assert!(target.dirs.contains(&dir.path().join("pkg")));
        for skipped in ["node_modules", ".git", "target"] {
            assert!(
                !target.dirs.iter().any(|d| d.starts_with(dir.path().join(skipped))),
                "{} should not be watched",
                skipped
            );
        }
    }

    #[test]
    fn test_hidden_root_is_still_watched() {
        let outer = TempDir::new().unwrap();
        let root = outer.path().join(".workspace");
        fs::create_dir_all(root.join("src")).unwrap();

        let mut target = RecordingTarget::default();
        let count = install_watches(&mut target, &root, &SkipRules::default()).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_failing_dir_does_not_abort_walk() {
        let dir = layout();
        let mut target = RecordingTarget {
            fail_on: Some("pkg"),
            ..Default::default()
        };
        let count = install_watches(&mut target, dir.path(), &SkipRules::default()).unwrap();
        assert_eq!(count, 3);
        assert!(target.dirs.contains(&dir.path().join("src/api")));
    }

    #[test]
    fn test_unreadable_root_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let mut target = RecordingTarget::default();
        let err = install_watches(&mut target, &missing, &SkipRules::default()).unwrap_err();
        assert!(matches!(err, SyncError::RootUnreadable { .. }));
    }
}
