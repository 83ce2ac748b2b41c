//! # Infrastructure Layer
//!
//! Concrete adapters for every [`cxxcache_domain::ports`] trait: the
//! SQLite-backed storage engine and FTS5 recall index, ripgrep-based
//! lexical recall, the `cpp-extractor` subprocess pool, the single-writer
//! persistence worker, the repo-sync job workers, YAML manifest loading,
//! layered configuration, and tracing-backed logging.
#![allow(missing_docs)]

pub mod config;
pub mod logging;
pub mod manifest;
pub mod parser;
pub mod recall;
pub mod storage;
pub mod sync_worker;
pub mod writer;

pub use config::{load_settings, Settings};
pub use logging::{set_stderr_log_level, stderr_log_fn, tracing_log_fn, TracingOperationLogger};
pub use manifest::YamlManifestLoader;
pub use parser::CppExtractorParserPool;
pub use recall::RipgrepRecallEngine;
pub use storage::{connect_and_init, SqliteStorageEngine};
pub use sync_worker::{RepoSyncWorkerPool, SyncWorkerConfig};
pub use writer::{SqliteSingleWriter, WriterConfig};
