//! Index and repo-sync job queue rows.

use serde::{Deserialize, Serialize};

/// Which queue a job belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Webhook-triggered coarse reindex work.
    Index,
    /// Remote-to-local checkout to an exact pinned SHA.
    RepoSync,
}

/// A job's lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to be leased by a worker.
    Pending,
    /// Leased by a worker and in progress.
    Running,
    /// Completed successfully.
    Done,
    /// Failed, with attempts remaining.
    Failed,
    /// Failed after exhausting `max_attempts`.
    DeadLetter,
}

/// A row in the index-job or repo-sync-job queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Which queue this job belongs to.
    pub kind: JobKind,
    /// The workspace this job operates on.
    pub workspace_id: String,
    /// The repo id, for `RepoSync` jobs.
    pub repo_id: Option<String>,
    /// Opaque job-kind-specific payload (e.g. a webhook body for `Index`).
    pub payload: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Number of lease attempts so far.
    pub attempts: u32,
    /// Maximum attempts before dead-lettering.
    pub max_attempts: u32,
    /// Unix-seconds timestamp the job was enqueued.
    pub created_at: i64,
    /// Unix-seconds timestamp of the most recent lease.
    pub leased_at: Option<i64>,
}

impl Job {
    /// Whether another lease attempt is permitted.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }
}
