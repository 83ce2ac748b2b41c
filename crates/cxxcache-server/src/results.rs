//! Serializable response payloads, converted from the orchestrator's
//! response types (which stay free of any wire-format derive).

use serde::Serialize;

use cxxcache_application::{
    CallGraphResponse, DefinitionResponse, FileSymbolsResponse, InvalidateResponse,
    ReferencesResponse, RegisterWorkspaceResponse, WorkspaceInfoResponse,
};
use cxxcache_domain::model::{CallEdge, ConfidenceEnvelope, Symbol, SymbolReference};

#[derive(Debug, Serialize)]
pub struct ReferencesPayload {
    pub definition: Vec<Symbol>,
    pub references: Vec<SymbolReference>,
    pub confidence: ConfidenceEnvelope,
}

impl From<ReferencesResponse> for ReferencesPayload {
    fn from(resp: ReferencesResponse) -> Self {
        Self {
            definition: resp.definition,
            references: resp.references,
            confidence: resp.confidence,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DefinitionPayload {
    pub definition: Vec<Symbol>,
    pub confidence: ConfidenceEnvelope,
}

impl From<DefinitionResponse> for DefinitionPayload {
    fn from(resp: DefinitionResponse) -> Self {
        Self {
            definition: resp.definition,
            confidence: resp.confidence,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CallGraphPayload {
    pub edges: Vec<CallEdge>,
    pub confidence: ConfidenceEnvelope,
}

impl From<CallGraphResponse> for CallGraphPayload {
    fn from(resp: CallGraphResponse) -> Self {
        Self {
            edges: resp.edges,
            confidence: resp.confidence,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FileSymbolsPayload {
    pub symbols: Vec<Symbol>,
    pub confidence: ConfidenceEnvelope,
}

impl From<FileSymbolsResponse> for FileSymbolsPayload {
    fn from(resp: FileSymbolsResponse) -> Self {
        Self {
            symbols: resp.symbols,
            confidence: resp.confidence,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvalidatePayload {
    pub removed_count: usize,
}

impl From<InvalidateResponse> for InvalidatePayload {
    fn from(resp: InvalidateResponse) -> Self {
        Self {
            removed_count: resp.removed_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterWorkspacePayload {
    pub repo_ids: Vec<String>,
    pub baseline_context_id: String,
}

impl From<RegisterWorkspaceResponse> for RegisterWorkspacePayload {
    fn from(resp: RegisterWorkspaceResponse) -> Self {
        Self {
            repo_ids: resp.repo_ids,
            baseline_context_id: resp.baseline_context_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorkspaceInfoPayload {
    pub active_context_ids: Vec<String>,
}

impl From<WorkspaceInfoResponse> for WorkspaceInfoPayload {
    fn from(resp: WorkspaceInfoResponse) -> Self {
        Self {
            active_context_ids: resp.active_context_ids,
        }
    }
}
