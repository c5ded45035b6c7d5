//! Watch command handler
//!
//! Runs a watch run against a single in-process session named `trace`. That
//! session prints every outbound call (watched-files notifications, resyncs,
//! invalidations) as a JSON line on stdout, so the run can be piped into
//! another tool or inspected by hand. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::cli::WatchArgs;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::events::EventEmitter;
use crate::protocol::plain_watcher;
use crate::session::{AnalysisSession, LocalSession, SessionSet};
use crate::watcher::WorkspaceWatcher;

use super::{init_logging, resolve_root};

/// Name of the session the watch command traces through.
pub const TRACE_SESSION: &str = "trace";

/// Run the watch command until Ctrl-C.
pub fn run_watch(args: &WatchArgs, log_level: Option<&str>) -> anyhow::Result<String> {
    let root = resolve_root(&args.root_or_cwd())?;
    let mut config = SyncConfig::load(&root)?;
    init_logging(log_level.unwrap_or(&config.logging.level));

    if let Some(ms) = args.debounce_ms {
        config.watch.debounce_ms = ms;
    }

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    runtime.block_on(watch_async(root, config, &args.patterns))?;

    Ok(String::new())
}

async fn watch_async(root: PathBuf, config: SyncConfig, patterns: &[String]) -> Result<()> {
    let emitter = EventEmitter::new(true);
    let session = Arc::new(LocalSession::new(TRACE_SESSION).with_emitter(emitter));

    if !patterns.is_empty() {
        let watchers = patterns
            .iter()
            .map(|p| plain_watcher(p.as_str()))
            .collect();
        session.advertise("cli", watchers);
    }

    let sessions = SessionSet::new(vec![session as Arc<dyn AnalysisSession>]);
    let handle = WorkspaceWatcher::new(root, config.watch, sessions)
        .with_emitter(emitter)
        .start()?;

    tracing::info!("Press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    handle.stop().await;
    Ok(())
}
