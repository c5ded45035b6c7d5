//! Command modules for the lspsync CLI
//!
//! Each command module implements a single top-level command:
//! - `watch` - Run a traced watch session against a workspace
//! - `diagnostics` - Aggregate diagnostics from a snapshot file
//!
//! Handlers return the text to print on stdout; errors carry their exit code.

pub mod diagnostics;
pub mod watch;

pub use diagnostics::run_diagnostics;
pub use watch::run_watch;

use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

use crate::error::Result;
use crate::paths::absolutize;

/// Install the stderr subscriber. `RUST_LOG` wins over `level` when set.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lspsync={}", level)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Absolute, cleaned form of a workspace root given on the command line.
pub(crate) fn resolve_root(root: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(absolutize(root, &cwd))
}
