//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Keeps analysis servers in sync with the workspace on disk
#[derive(Parser, Debug)]
#[command(name = "lspsync")]
#[command(about = "Filesystem watch sync and diagnostics aggregation for analysis servers")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LSPSYNC_LOG")]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch a workspace and print every outbound session notification as JSON
    #[command(visible_alias = "w")]
    Watch(WatchArgs),

    /// Print aggregated diagnostics for a file or the whole project
    #[command(visible_alias = "d")]
    Diagnostics(DiagnosticsArgs),
}

// ============================================
// Watch Subcommand
// ============================================

/// Arguments for the watch command
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Workspace root (default: current directory)
    #[arg(value_name = "ROOT")]
    pub root: Option<PathBuf>,

    /// Quiescence window for write events, in milliseconds
    #[arg(long, value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Pre-register an interest pattern (repeatable)
    #[arg(short, long = "pattern", value_name = "GLOB")]
    pub patterns: Vec<String>,
}

// ============================================
// Diagnostics Subcommand
// ============================================

/// Arguments for the diagnostics command
#[derive(Args, Debug)]
pub struct DiagnosticsArgs {
    /// File to report on (omit for project-wide diagnostics)
    #[arg(value_name = "FILE")]
    pub file: Option<String>,

    /// JSON snapshot: `{ "<session>": { "<uri>": [Diagnostic, ...] } }`
    #[arg(long, value_name = "PATH")]
    pub snapshot: PathBuf,

    /// Workspace root (default: current directory)
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

impl WatchArgs {
    pub fn root_or_cwd(&self) -> PathBuf {
        root_or_cwd(self.root.as_ref())
    }
}

impl DiagnosticsArgs {
    pub fn root_or_cwd(&self) -> PathBuf {
        root_or_cwd(self.root.as_ref())
    }
}

fn root_or_cwd(root: Option<&PathBuf>) -> PathBuf {
    root.cloned()
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}
