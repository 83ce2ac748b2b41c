//! The MCP tool-dispatch surface: one method per tool, each deserializing
//! its request, calling straight into the [`Orchestrator`], and serializing
//! the response. No business logic lives here.

use std::sync::Arc;

use rmcp::handler::server::tool::Parameters;
use rmcp::model::{
    CallToolResult, Content, ErrorData as McpError, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{tool, tool_handler, tool_router, ServerHandler};

use cxxcache_application::{InvalidateTarget, Orchestrator, QueryRequest, RegisterWorkspaceRequest};
use cxxcache_domain::model::FileKey;

use crate::args::{
    CallGraphArgs, FileSymbolsArgs, InvalidateArgs, QueryArgs, RegisterWorkspaceArgs, WorkspaceInfoArgs,
};
use crate::results::{
    CallGraphPayload, DefinitionPayload, FileSymbolsPayload, InvalidatePayload, ReferencesPayload,
    RegisterWorkspacePayload, WorkspaceInfoPayload,
};

fn to_query_request(args: &QueryArgs) -> QueryRequest {
    QueryRequest {
        workspace_id: args.workspace_id.clone(),
        root_path: args.root_path.clone(),
        manifest_path: args.manifest_path.clone(),
        overlay_context_id: args.overlay_context_id.clone(),
        repo_scope: args.repo_scope.clone(),
        symbol: args.symbol.clone(),
    }
}

fn to_mcp_error(err: cxxcache_domain::Error) -> McpError {
    McpError::internal_error(err.to_string(), None)
}

fn invalid_params(message: impl Into<String>) -> McpError {
    McpError::invalid_params(message.into(), None)
}

fn json_result<T: serde::Serialize>(payload: &T) -> Result<CallToolResult, McpError> {
    let body = serde_json::to_string(payload)
        .map_err(|e| McpError::internal_error(format!("failed to serialize tool response: {e}"), None))?;
    Ok(CallToolResult::success(vec![Content::text(body)]))
}

/// The cxxcache MCP server: a thin, `Clone`-able wrapper over a shared
/// [`Orchestrator`], exposing the four query shapes plus workspace
/// registration, workspace info, and cache invalidation as MCP tools.
#[derive(Clone)]
pub struct CxxCacheServer {
    orchestrator: Arc<Orchestrator>,
    tool_router: rmcp::handler::server::tool::ToolRouter<Self>,
}

#[tool_router]
impl CxxCacheServer {
    /// Wraps an already-wired [`Orchestrator`] for MCP tool dispatch.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "References of a symbol: its own definition plus every use-site, with a confidence envelope.")]
    pub async fn query_references(
        &self,
        Parameters(args): Parameters<QueryArgs>,
    ) -> Result<CallToolResult, McpError> {
        let req = to_query_request(&args);
        let resp = self
            .orchestrator
            .query_references(&req)
            .await
            .map_err(to_mcp_error)?;
        json_result(&ReferencesPayload::from(resp))
    }

    #[tool(description = "Definition(s) of a symbol, with a confidence envelope.")]
    pub async fn query_definition(
        &self,
        Parameters(args): Parameters<QueryArgs>,
    ) -> Result<CallToolResult, McpError> {
        let req = to_query_request(&args);
        let resp = self
            .orchestrator
            .query_definition(&req)
            .await
            .map_err(to_mcp_error)?;
        json_result(&DefinitionPayload::from(resp))
    }

    #[tool(description = "Call edges touching a symbol, in the requested direction (callers/callees/both).")]
    pub async fn query_call_graph(
        &self,
        Parameters(args): Parameters<CallGraphArgs>,
    ) -> Result<CallToolResult, McpError> {
        let req = to_query_request(&args.query);
        let resp = self
            .orchestrator
            .query_call_graph(&req, args.direction.into())
            .await
            .map_err(to_mcp_error)?;
        json_result(&CallGraphPayload::from(resp))
    }

    #[tool(description = "Symbols defined in one file-key, skipping recall entirely.")]
    pub async fn query_file_symbols(
        &self,
        Parameters(args): Parameters<FileSymbolsArgs>,
    ) -> Result<CallToolResult, McpError> {
        let file_key = FileKey::parse(&args.file_key)
            .ok_or_else(|| invalid_params(format!("'{}' is not a valid \"repoId:relPath\" file-key", args.file_key)))?;
        let req = QueryRequest {
            workspace_id: args.workspace_id,
            root_path: args.root_path,
            manifest_path: args.manifest_path,
            overlay_context_id: args.overlay_context_id,
            repo_scope: Vec::new(),
            symbol: String::new(),
        };
        let resp = self
            .orchestrator
            .query_file_symbols(&req, &file_key)
            .await
            .map_err(to_mcp_error)?;
        json_result(&FileSymbolsPayload::from(resp))
    }

    #[tool(description = "Clears cached facts for a context, or deletes specific tracked files from one.")]
    pub async fn invalidate_cache(
        &self,
        Parameters(args): Parameters<InvalidateArgs>,
    ) -> Result<CallToolResult, McpError> {
        let target = match args {
            InvalidateArgs::Context { context_id } => InvalidateTarget::Context(context_id),
            InvalidateArgs::Files { context_id, file_keys } => {
                let mut parsed = Vec::with_capacity(file_keys.len());
                for raw in file_keys {
                    let key = FileKey::parse(&raw)
                        .ok_or_else(|| invalid_params(format!("'{raw}' is not a valid \"repoId:relPath\" file-key")))?;
                    parsed.push(key);
                }
                InvalidateTarget::Files {
                    context_id,
                    file_keys: parsed,
                }
            }
        };
        let resp = self
            .orchestrator
            .invalidate_cache(target)
            .await
            .map_err(to_mcp_error)?;
        json_result(&InvalidatePayload::from(resp))
    }

    #[tool(description = "Registers or re-registers a workspace: reloads its manifest and ensures a baseline context exists.")]
    pub async fn register_workspace(
        &self,
        Parameters(args): Parameters<RegisterWorkspaceArgs>,
    ) -> Result<CallToolResult, McpError> {
        let req = RegisterWorkspaceRequest {
            workspace_id: args.workspace_id,
            root_path: args.root_path,
            manifest_path: args.manifest_path,
        };
        let resp = self
            .orchestrator
            .register_workspace(&req)
            .await
            .map_err(to_mcp_error)?;
        json_result(&RegisterWorkspacePayload::from(resp))
    }

    #[tool(description = "Currently active context ids for a workspace, without mutating anything.")]
    pub async fn get_workspace_info(
        &self,
        Parameters(args): Parameters<WorkspaceInfoArgs>,
    ) -> Result<CallToolResult, McpError> {
        let resp = self
            .orchestrator
            .get_workspace_info(&args.workspace_id)
            .await
            .map_err(to_mcp_error)?;
        json_result(&WorkspaceInfoPayload::from(resp))
    }
}

#[tool_handler]
impl ServerHandler for CxxCacheServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "cxxcache".to_owned(),
                version: env!("CARGO_PKG_VERSION").to_owned(),
            },
            instructions: Some(
                "Lazy-evaluated, multi-repository semantic fact cache for C++ codebases. \
                 Query references/definitions/call graphs/file symbols, or manage workspaces and the cache."
                    .to_owned(),
            ),
        }
    }
}
