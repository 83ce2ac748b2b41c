//! # Application Layer
//!
//! Use-case orchestration for the C++ semantic fact cache: the Candidate
//! Service, Freshness Service, Context Service, Query Reader, and the
//! Orchestrator that composes them into the four query shapes plus
//! workspace/cache-invalidation operations.
//!
//! Depends only on [`cxxcache_domain`] port traits — never on a concrete
//! storage, subprocess, or filesystem adapter. Infrastructure wires
//! concrete adapters in behind `Arc<dyn Trait>` at the composition root.
#![allow(missing_docs)]

pub mod candidate;
pub mod compiledb_cache;
pub mod context;
pub mod freshness;
pub mod orchestrator;
pub mod reader;

pub use candidate::{CandidateRequest, CandidateResult, CandidateService, CandidateSource};
pub use compiledb_cache::CompileDbCache;
pub use context::ContextService;
pub use freshness::{ClassifyRequest, ClassifyResult, Freshness, FreshnessService, ParseOutcome, ParseTask};
pub use orchestrator::{
    CallGraphResponse, DefinitionResponse, FileSymbolsResponse, InvalidateResponse,
    InvalidateTarget, Orchestrator, OrchestratorConfig, QueryRequest, ReferencesResponse,
    RegisterWorkspaceRequest, RegisterWorkspaceResponse, WorkspaceInfoResponse,
};
pub use reader::QueryReader;
