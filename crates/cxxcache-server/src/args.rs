//! Typed, `schemars`-derived request payloads for each MCP tool.
//!
//! These mirror the [`cxxcache_application::orchestrator`] request types but
//! stay independent of them: the orchestrator's types carry no `JsonSchema`
//! derive (the application layer has no business knowing about MCP), so the
//! wire surface owns its own plain-string/enum shapes and converts.

use schemars::JsonSchema;
use serde::Deserialize;

/// Shared addressing fields for the four query tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryArgs {
    /// The workspace being queried.
    pub workspace_id: String,
    /// Workspace root on disk.
    pub root_path: String,
    /// Path to the workspace manifest.
    pub manifest_path: String,
    /// An overlay (PR-scoped) context id, or omit for the workspace baseline.
    #[serde(default)]
    pub overlay_context_id: Option<String>,
    /// Entry repos for the candidate-repo BFS; empty means all repos.
    #[serde(default)]
    pub repo_scope: Vec<String>,
    /// The fully- or partially-qualified symbol name to resolve.
    pub symbol: String,
}

/// Direction for [`query_call_graph`](crate::service::CxxCacheServer::query_call_graph).
#[derive(Debug, Clone, Copy, Default, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CallDirectionArg {
    /// Callers of the requested symbol.
    Callers,
    /// Callees of the requested symbol.
    Callees,
    /// Both directions.
    #[default]
    Both,
}

impl From<CallDirectionArg> for cxxcache_domain::model::CallDirection {
    fn from(value: CallDirectionArg) -> Self {
        match value {
            CallDirectionArg::Callers => Self::Callers,
            CallDirectionArg::Callees => Self::Callees,
            CallDirectionArg::Both => Self::Both,
        }
    }
}

/// Request for `query_call_graph`: a [`QueryArgs`] plus traversal direction.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CallGraphArgs {
    /// The shared query addressing fields.
    #[serde(flatten)]
    pub query: QueryArgs,
    /// Which direction to traverse from `symbol`.
    #[serde(default)]
    pub direction: CallDirectionArg,
}

/// Request for `query_file_symbols`: addresses one file directly, skipping
/// recall entirely.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FileSymbolsArgs {
    /// The workspace being queried.
    pub workspace_id: String,
    /// Workspace root on disk.
    pub root_path: String,
    /// Path to the workspace manifest.
    pub manifest_path: String,
    /// An overlay (PR-scoped) context id, or omit for the workspace baseline.
    #[serde(default)]
    pub overlay_context_id: Option<String>,
    /// The `"{repoId}:{relPath}"` file-key to list symbols for.
    pub file_key: String,
}

/// Request for `invalidate_cache`: either clears a whole context, or
/// deletes a specific list of tracked files from one.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum InvalidateArgs {
    /// Clears every tracked file and recall-index row for `context_id`.
    Context {
        /// The context to clear.
        context_id: String,
    },
    /// Deletes specific tracked files from `context_id`.
    Files {
        /// The context to delete from.
        context_id: String,
        /// The `"{repoId}:{relPath}"` file-keys to delete.
        file_keys: Vec<String>,
    },
}

/// Request for `register_workspace`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct RegisterWorkspaceArgs {
    /// The workspace id to register or re-register.
    pub workspace_id: String,
    /// Workspace root on disk.
    pub root_path: String,
    /// Path to the workspace manifest.
    pub manifest_path: String,
}

/// Request for `get_workspace_info`.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct WorkspaceInfoArgs {
    /// The workspace to report on.
    pub workspace_id: String,
}
