//! Command-line surface: `serve` (MCP server over stdio), `index` (enqueue
//! a webhook-triggered reindex job), `invalidate` (clear or trim a context).

use clap::{Parser, Subcommand};

/// cxxcache - a lazy-evaluated, multi-repository semantic fact cache for
/// C++ codebases.
#[derive(Debug, Parser)]
#[command(name = "cxxcache")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Path to a TOML configuration file, merged over defaults and under
    /// `CXXCACHE_`-prefixed environment variables.
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Runs the MCP server over stdio.
    Serve,
    /// Enqueues a webhook-triggered reindex job for a workspace.
    Index {
        /// The workspace id to reindex.
        #[arg(long)]
        workspace_id: String,
        /// Opaque payload forwarded to the index job (e.g. a webhook body).
        #[arg(long, default_value = "")]
        payload: String,
    },
    /// Clears cached facts for a context, or deletes specific tracked files.
    Invalidate {
        /// The context to invalidate.
        #[arg(long)]
        context_id: String,
        /// `"{repoId}:{relPath}"` file-keys to delete; omit to clear the
        /// whole context.
        #[arg(long = "file-key")]
        file_keys: Vec<String>,
    },
}
