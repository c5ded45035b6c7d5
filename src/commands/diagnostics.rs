//! Diagnostics command handler

use std::sync::Arc;

use anyhow::Context;

use crate::cli::DiagnosticsArgs;
use crate::config::SyncConfig;
use crate::diagnostics::DiagnosticsAggregator;
use crate::session::{AnalysisSession, LocalSession, SessionSet};

use super::{init_logging, resolve_root};

/// Load the snapshot into local sessions and render the report.
pub fn run_diagnostics(args: &DiagnosticsArgs, log_level: Option<&str>) -> anyhow::Result<String> {
    let root = resolve_root(&args.root_or_cwd())?;
    let config = SyncConfig::load(&root)?;
    init_logging(log_level.unwrap_or(&config.logging.level));

    let sessions: SessionSet = LocalSession::load_snapshot(&args.snapshot)
        .with_context(|| format!("Failed to load snapshot {}", args.snapshot.display()))?
        .into_iter()
        .map(|s| Arc::new(s) as Arc<dyn AnalysisSession>)
        .collect();
    tracing::debug!(sessions = ?sessions, "Loaded diagnostics snapshot");

    let aggregator = DiagnosticsAggregator::new(root, sessions);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;
    let report = runtime.block_on(aggregator.query(args.file.as_deref()))?;

    Ok(format!("{}\n", report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    use crate::error::SyncError;
    use crate::paths::path_to_uri;

    fn workspace() -> (TempDir, DiagnosticsArgs) {
        let dir = TempDir::new().unwrap();
        let root = fs::canonicalize(dir.path()).unwrap();
        let snapshot = root.join("diags.json");
        let uri = path_to_uri(&root.join("a.go")).unwrap();
        fs::write(
            &snapshot,
            format!(
                r#"{{"gopls": {{"{}": [{{"range":{{"start":{{"line":2,"character":0}},"end":{{"line":2,"character":1}}}},"severity":1,"message":"undefined: x"}}]}}}}"#,
                uri.as_str()
            ),
        )
        .unwrap();
        let args = DiagnosticsArgs {
            file: None,
            snapshot,
            root: Some(root),
        };
        (dir, args)
    }

    #[test]
    fn test_project_report() {
        let (_dir, args) = workspace();
        let output = run_diagnostics(&args, Some("error")).unwrap();
        assert!(output.starts_with("Project diagnostics:\nError: "));
        assert!(output.ends_with("a.go:3:1 [gopls] undefined: x\n"));
    }

    #[test]
    fn test_outside_root_keeps_exit_code() {
        let (_dir, mut args) = workspace();
        args.file = Some("/definitely/elsewhere.go".to_string());
        let err = run_diagnostics(&args, Some("error")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::OutsideRoot { .. })
        ));
    }

    #[test]
    fn test_missing_snapshot_has_context() {
        let (_dir, mut args) = workspace();
        args.snapshot = args.snapshot.with_file_name("missing.json");
        let err = run_diagnostics(&args, Some("error")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to load snapshot"));
    }
}
