//! Directory skip rules.
//!
//! Checked before a watch is installed and before an event is forwarded,
//! never after the fact.

use std::collections::HashSet;
use std::path::{Component, Path};

use crate::config::WatchConfig;

#[derive(Debug, Clone)]
pub struct SkipRules {
    skip_hidden: bool,
    names: HashSet<String>,
}

impl SkipRules {
    pub fn new<I, S>(skip_hidden: bool, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip_hidden,
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &WatchConfig) -> Self {
        Self::new(config.skip_hidden, config.skip_dirs.iter().cloned())
    }

    /// Whether a directory with this final name is excluded.
    pub fn skips_name(&self, name: &str) -> bool {
        if self.skip_hidden && name != "." && name.starts_with('.') {
            return true;
        }
        self.names.contains(name)
    }

    /// Whether the directory at `path` must not be watched or descended into.
    pub fn should_skip_dir(&self, path: &Path) -> bool {
        match path.file_name() {
            Some(name) => self.skips_name(&name.to_string_lossy()),
            None => false,
        }
    }

    /// Whether `path` sits inside a skipped directory below `root`.
    ///
    /// Only the directories between `root` and the entry are checked; the entry
    /// itself is judged by [`should_skip_dir`](Self::should_skip_dir) once it is
    /// known to be a directory.
    pub fn is_excluded(&self, root: &Path, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(root) else {
            return false;
        };
        let Some(parent) = rel.parent() else {
            return false;
        };
        parent.components().any(|c| match c {
            Component::Normal(name) => self.skips_name(&name.to_string_lossy()),
            _ => false,
        })
    }
}

impl Default for SkipRules {
    fn default() -> Self {
        Self::from_config(&WatchConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let rules = SkipRules::default();
        for dir in ["/proj/node_modules", "/proj/.git", "/proj/target", "/proj/dist", "/proj/.cache"] {
            assert!(rules.should_skip_dir(Path::new(dir)), "{} should be skipped", dir);
        }
        for dir in ["/proj/src", "/proj/pkg/api", "/proj/."] {
            assert!(!rules.should_skip_dir(Path::new(dir)), "{} should be watched", dir);
        }
    }

    #[test]
    fn test_hidden_can_be_disabled() {
        let rules = SkipRules::new(false, ["node_modules"]);
        assert!(!rules.should_skip_dir(Path::new("/proj/.config")));
        assert!(rules.should_skip_dir(Path::new("/proj/node_modules")));
    }

    #[test]
    fn test_is_excluded_checks_ancestors_only() {
        let rules = SkipRules::default();
        let root = Path::new("/proj");
        assert!(rules.is_excluded(root, Path::new("/proj/node_modules/pkg/index.js")));
        assert!(rules.is_excluded(root, Path::new("/proj/sub/.git/HEAD")));
        assert!(!rules.is_excluded(root, Path::new("/proj/sub/a.go")));
        // the entry itself is not an ancestor
        assert!(!rules.is_excluded(root, Path::new("/proj/.env")));
        assert!(!rules.is_excluded(root, Path::new("/other/node_modules/x.js")));
    }
}
