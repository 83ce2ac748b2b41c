//! Core domain types: workspace topology, analysis contexts, tracked files,
//! extracted facts, compile-command entries, confidence envelopes, and job
//! queue rows. All pure data — no I/O.

mod compile_db;
mod confidence;
mod context;
mod facts;
mod file_key;
mod job;
mod tracked_file;
mod workspace;

pub use compile_db::{CompileEntry, MatchType};
pub use confidence::{ConfidenceEnvelope, Warning};
pub use context::{
    AnalysisContext, ContextFileState, ContextMode, ContextStatus, FileState, OverlayMode,
};
pub use facts::{
    CallDirection, CallEdge, IncludeDep, ParseRun, ReferenceKind, Symbol, SymbolReference,
};
pub use file_key::FileKey;
pub use job::{Job, JobKind, JobStatus};
pub use tracked_file::TrackedFile;
pub use workspace::{PathRemap, RepoManifest, ResolvedIncludeDep, WorkspaceManifest};
