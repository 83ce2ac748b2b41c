//! # MCP wire surface
//!
//! Thin `rmcp`-based tool dispatch over [`cxxcache_application::Orchestrator`]:
//! `query_references`, `query_definition`, `query_call_graph`,
//! `query_file_symbols`, `invalidate_cache`, `register_workspace`, and
//! `get_workspace_info`. Every tool method deserializes a `schemars`-derived
//! request, calls the orchestrator, and serializes the typed response. No
//! business logic lives here by design.
#![allow(missing_docs)]

pub mod args;
pub mod results;
pub mod service;

pub use service::CxxCacheServer;
