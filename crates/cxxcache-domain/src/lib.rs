//! # Domain Layer
//!
//! Core types, port traits, and error taxonomy for the C++ semantic fact cache.
//! Contains only pure domain logic: no subprocess, filesystem, or SQL here.
//!
//! ## Architecture
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`model`] | Workspace/context/tracked-file/fact/confidence types |
//! | [`ports`] | Storage/recall/parser/writer/manifest port traits |
//! | [`hash`] | Composite content/flags/includes hashing primitives |
//! | [`error`] | Domain error types |
//!
//! The domain crate has no dependency on any concrete logging backend; it
//! exposes a small facade ([`macros`] + [`infra::logging`]) that upper
//! layers register a sink into at startup.
#![allow(missing_docs)]

/// Logging macros (trace!/debug!/info!/warn!/error!) forwarding to a registered sink.
#[macro_use]
pub mod macros;

/// Compile-command catalog normalization, flag extraction, and lookup
pub mod compiledb;
/// Domain error types
pub mod error;
/// Composite content/flags/includes hashing primitives
pub mod hash;
/// Logging sink registration (infra-facing half of the logging facade)
pub mod infra;
/// Core domain types: workspace, context, tracked file, facts, confidence
pub mod model;
/// Absolute-path / file-key / include-path resolution against a workspace manifest
pub mod path_resolver;
/// Port traits implemented by the infrastructure layer
pub mod ports;

pub use error::{Error, Result};
pub use model::*;
