//! Storage engine port: the transactional, context-partitioned fact store.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    AnalysisContext, CallDirection, CallEdge, ContextFileState, FileKey, Job, JobKind,
    OverlayMode, Symbol, SymbolReference, TrackedFile,
};
use crate::ports::ParsePayload;

/// The transactional, context-partitioned fact store.
///
/// Invariant: all derived-row deletions for a `(context, file-key)` happen
/// inside the same transaction that re-inserts them, so a reader never
/// observes a partial fact set.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    // -- parse payload persistence -----------------------------------

    /// Upserts the tracked-file row, replaces its derived rows, and
    /// refreshes its recall-index content, all within one transaction.
    async fn upsert_parse_payload(&self, payload: &ParsePayload) -> Result<()>;

    /// Looks up the cached freshness record for `(context, file_key)`.
    async fn get_tracked_file(
        &self,
        context_id: &str,
        file_key: &FileKey,
    ) -> Result<Option<TrackedFile>>;

    /// Deletes a tracked file and all of its derived rows. Returns whether
    /// a row was actually removed.
    async fn delete_tracked_file(&self, context_id: &str, file_key: &FileKey) -> Result<bool>;

    /// Deletes all tracked files and recall content for `context_id`.
    /// Returns the count of files removed.
    async fn clear_context(&self, context_id: &str) -> Result<usize>;

    // -- chain-walking reads --------------------------------------------

    /// Symbols matching `name` (by unqualified or qualified name),
    /// walking `context_chain` in order and deduplicating by
    /// `(file_key, qualified_name, line, col)`, skipping rows whose
    /// file-key is in `excluded`.
    async fn search_symbols_by_name(
        &self,
        context_chain: &[String],
        name: &str,
        candidate_files: Option<&HashSet<FileKey>>,
        excluded: &HashSet<FileKey>,
    ) -> Result<Vec<Symbol>>;

    /// References of `symbol`, walking the chain and deduplicating by
    /// `(file_key, symbol, line, col, ref_kind)`.
    async fn search_references_by_symbol(
        &self,
        context_chain: &[String],
        symbol: &str,
        candidate_files: Option<&HashSet<FileKey>>,
        excluded: &HashSet<FileKey>,
    ) -> Result<Vec<SymbolReference>>;

    /// Call edges touching `symbol` in the requested `direction`, walking
    /// the chain and deduplicating by `(file_key, caller, callee, line)`.
    async fn call_edges_for(
        &self,
        context_chain: &[String],
        symbol: &str,
        direction: CallDirection,
        candidate_files: Option<&HashSet<FileKey>>,
        excluded: &HashSet<FileKey>,
    ) -> Result<Vec<CallEdge>>;

    /// All symbols defined in one file, walking the chain.
    async fn symbols_in_file(
        &self,
        context_chain: &[String],
        file_key: &FileKey,
        excluded: &HashSet<FileKey>,
    ) -> Result<Vec<Symbol>>;

    /// Full-text match over recall content for `context_id`, returning
    /// distinct file-keys capped at `max_files`.
    async fn search_recall_candidates(
        &self,
        context_id: &str,
        query: &str,
        repo_ids: &[String],
        max_files: usize,
    ) -> Result<Vec<FileKey>>;

    // -- context lifecycle ------------------------------------------------

    /// Returns the workspace's baseline context id, creating one if absent.
    async fn ensure_baseline_context(&self, workspace_id: &str) -> Result<String>;

    /// Creates a new overlay context (`sparse` mode) layered on
    /// `base_context_id`, using `explicit_id` if given or a generated id
    /// otherwise. Errs if `base_context_id` does not name an active
    /// baseline.
    async fn create_overlay(
        &self,
        workspace_id: &str,
        base_context_id: &str,
        explicit_id: Option<&str>,
    ) -> Result<AnalysisContext>;

    /// Looks up a context by id, regardless of status.
    async fn get_context(&self, context_id: &str) -> Result<Option<AnalysisContext>>;

    /// Marks a context expired. Its tracked data is retained but is no
    /// longer reachable by chain walks.
    async fn expire_context(&self, context_id: &str) -> Result<()>;

    /// Bumps a context's last-accessed timestamp to now.
    async fn touch_context(&self, context_id: &str) -> Result<()>;

    /// Applies `(file_delta, row_delta)` to an overlay's counters and
    /// returns its possibly-escalated overlay mode. `Sparse` baselines are
    /// a no-op that returns `Sparse`.
    async fn update_context_overlay_stats(
        &self,
        context_id: &str,
        file_delta: i64,
        row_delta: i64,
        max_overlay_files: u64,
        max_overlay_rows: u64,
    ) -> Result<OverlayMode>;

    /// Currently-active context ids for a workspace.
    async fn list_active_contexts(&self, workspace_id: &str) -> Result<Vec<String>>;

    // -- overlay file state ------------------------------------------

    /// All overlay file-state rows for `context_id` (used by the
    /// Candidate Service to apply deletion/rename masking).
    async fn list_context_file_states(&self, context_id: &str) -> Result<Vec<ContextFileState>>;

    /// Upserts one overlay file-state row.
    async fn upsert_context_file_state(&self, state: &ContextFileState) -> Result<()>;

    // -- workspace registry -----------------------------------------------

    /// Upserts the workspace's root path and manifest path.
    async fn upsert_workspace(
        &self,
        workspace_id: &str,
        root_path: &str,
        manifest_path: &str,
    ) -> Result<()>;

    /// Looks up `(root_path, manifest_path)` for a registered workspace.
    async fn get_workspace(&self, workspace_id: &str) -> Result<Option<(String, String)>>;

    // -- job queues --------------------------------------------------

    /// Enqueues a job, returning its assigned id.
    async fn enqueue_job(
        &self,
        kind: JobKind,
        workspace_id: &str,
        repo_id: Option<&str>,
        payload: &str,
        max_attempts: u32,
    ) -> Result<i64>;

    /// Atomically selects the oldest `pending` job of `kind` and marks it
    /// `running` with `attempts + 1`.
    async fn lease_next_job(&self, kind: JobKind) -> Result<Option<Job>>;

    /// Marks a leased job `done`.
    async fn mark_job_done(&self, job_id: i64) -> Result<()>;

    /// Marks a leased job `failed`, or `dead_letter` if it has exhausted
    /// its retry budget.
    async fn mark_job_failed(&self, job_id: i64, dead_letter: bool) -> Result<()>;
}
