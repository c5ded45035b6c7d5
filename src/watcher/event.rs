use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::EventKind;

use crate::error::Result;
use crate::paths::path_to_uri;
use crate::protocol::{FileChangeType, FileEvent, Uri};

/// Operations carried by one raw OS event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawOps {
    pub create: bool,
    pub write: bool,
    pub remove: bool,
    pub rename: bool,
}

impl RawOps {
    pub fn is_empty(&self) -> bool {
        !(self.create || self.write || self.remove || self.rename)
    }
}

/// A raw filesystem event for a single path, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: PathBuf,
    pub ops: RawOps,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, ops: RawOps) -> Self {
        Self {
            path: path.into(),
            ops,
        }
    }

    /// Split a `notify` event into per-path raw events.
    ///
    /// - `Create` and the destination half of a rename (`Name(To)`) → create
    /// - data/unspecified modifications → write
    /// - `Remove` → remove
    /// - the source half of a rename (`Name(From)`) → rename
    /// - `Name(Both)` is dropped: both halves also arrive on their own
    /// - `Name(Any)` (backends that cannot tell the halves apart) → create if
    ///   the path still exists, rename otherwise
    /// - metadata-only changes and accesses are dropped
    pub fn from_notify(event: notify::Event) -> Vec<RawEvent> {
        let mut ops = RawOps::default();
        match event.kind {
            EventKind::Create(_) => ops.create = true,
            EventKind::Remove(_) => ops.remove = true,
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ops.create = true,
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {}
            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ops.rename = true,
            EventKind::Modify(ModifyKind::Name(_)) => {
                return event
                    .paths
                    .into_iter()
                    .map(|path| {
                        let ops = if path.exists() {
                            RawOps { create: true, ..Default::default() }
                        } else {
                            RawOps { rename: true, ..Default::default() }
                        };
                        RawEvent { path, ops }
                    })
                    .collect();
            }
            EventKind::Modify(ModifyKind::Metadata(_)) => {}
            EventKind::Modify(_) => ops.write = true,
            EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
        }

        if ops.is_empty() {
            return Vec::new();
        }
        event
            .paths
            .into_iter()
            .map(|path| RawEvent { path, ops })
            .collect()
    }
}

/// Normalized change vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Created,
    Changed,
    Deleted,
}

impl From<ChangeKind> for FileChangeType {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::Created => FileChangeType::CREATED,
            ChangeKind::Changed => FileChangeType::CHANGED,
            ChangeKind::Deleted => FileChangeType::DELETED,
        }
    }
}

/// A classified change, produced once and consumed once by the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn uri(&self) -> Result<Uri> {
        path_to_uri(&self.path)
    }

    pub fn to_file_event(&self) -> Result<FileEvent> {
        Ok(FileEvent {
            uri: self.uri()?,
            typ: self.kind.into(),
        })
    }
}
