//! Published-diagnostics cache for one session.
//!
//! Servers push diagnostics whenever they like; the store keeps the latest
//! snapshot per file so queries never block on the server. Keys are plain
//! paths regardless of the URI form the server published under.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use crate::paths::{clean_path, uri_to_path};
use crate::protocol::{Diagnostic, PublishDiagnosticsParams};

#[derive(Debug, Default)]
pub struct DiagnosticStore {
    entries: RwLock<HashMap<PathBuf, Vec<Diagnostic>>>,
}

impl DiagnosticStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the diagnostics for the published file. An empty list clears it.
    ///
    /// Publishes for non-file URIs are dropped.
    pub fn publish(&self, params: PublishDiagnosticsParams) {
        match uri_to_path(&params.uri) {
            Some(path) => self.set(&path, params.diagnostics),
            None => {
                tracing::debug!(uri = params.uri.as_str(), "Ignoring diagnostics for non-file URI");
            }
        }
    }

    /// Replace the diagnostics cached for `path`. An empty list clears it.
    pub fn set(&self, path: &Path, diagnostics: Vec<Diagnostic>) {
        let path = clean_path(path);
        let mut entries = self.entries.write();
        if diagnostics.is_empty() {
            entries.remove(&path);
        } else {
            entries.insert(path, diagnostics);
        }
    }

    pub fn get(&self, path: &Path) -> Vec<Diagnostic> {
        self.entries.read().get(path).cloned().unwrap_or_default()
    }

    /// Drop the entry for `path`; returns whether one existed.
    pub fn clear(&self, path: &Path) -> bool {
        self.entries.write().remove(path).is_some()
    }

    /// Ordered copy of everything cached.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, Vec<Diagnostic>> {
        self.entries
            .read()
            .iter()
            .map(|(path, diags)| (path.clone(), diags.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
