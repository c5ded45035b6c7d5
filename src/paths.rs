//! Path and URI normalization shared by the watcher, the pattern matcher and
//! the diagnostics query surface.
//!
//! Analysis servers speak in `file://` URIs while the OS watch source reports
//! plain paths. Everything inside lspsync is keyed by plain paths; conversion
//! happens at the edges through these helpers.

use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::error::{Result, SyncError};
use crate::protocol::{parse_uri, Uri};

/// Decode a `file://` URI into a filesystem path.
///
/// Percent-escapes are decoded, so `file:///proj/my%20dir/a.go` becomes
/// `/proj/my dir/a.go`. Returns `None` for anything that is not a local file
/// URI.
pub fn uri_to_path(uri: &Uri) -> Option<PathBuf> {
    Url::parse(uri.as_str()).ok()?.to_file_path().ok()
}

/// Turn a `file://` URI or a plain path into a plain path.
///
/// ```ignore
/// assert_eq!(target_to_path("file:///proj/a%20b.go"), PathBuf::from("/proj/a b.go"));
/// assert_eq!(target_to_path("/proj/a.go"), PathBuf::from("/proj/a.go"));
/// ```
pub fn target_to_path(target: &str) -> PathBuf {
    match Url::parse(target) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .unwrap_or_else(|_| PathBuf::from(target)),
        _ => PathBuf::from(target),
    }
}

/// Build a percent-encoded `file://` URI for an absolute path.
pub fn path_to_uri(path: &Path) -> Result<Uri> {
    let url = Url::from_file_path(path).map_err(|_| SyncError::InvalidUri {
        uri: path.display().to_string(),
        message: "not an absolute path".to_string(),
    })?;
    parse_uri(url.as_str())
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. Does not touch the filesystem.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` at the root stays at the root
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Resolve `path` against `base` when relative, then clean it.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        clean_path(path)
    } else {
        clean_path(&base.join(path))
    }
}

/// Check whether `target` is the workspace root itself or lies beneath it.
///
/// Comparison is case-insensitive and component-wise, so `/proj-other` is not
/// considered inside `/proj`.
pub fn is_within_root(root: &Path, target: &Path) -> bool {
    let root = clean_path(root);
    let target = clean_path(target);

    let root_str = root.to_string_lossy().to_lowercase();
    let target_str = target.to_string_lossy().to_lowercase();

    if root_str == target_str {
        return true;
    }

    let sep = std::path::MAIN_SEPARATOR;
    let prefix = if root_str.ends_with(sep) {
        root_str
    } else {
        format!("{}{}", root_str, sep)
    };
    target_str.starts_with(&prefix)
}

/// Render a relative path with `/` separators for glob matching.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
