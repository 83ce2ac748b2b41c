//! Single-writer port: the serialized persistence path for parse payloads.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{CallEdge, FileKey, IncludeDep, Symbol, SymbolReference};

/// Everything needed to persist one successfully parsed translation unit.
/// Idempotent by construction: replaying the same payload twice leaves the
/// same final state (the storage engine deletes-then-reinserts derived
/// rows transactionally).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsePayload {
    /// The context this payload is persisted into.
    pub context_id: String,
    /// The file this payload describes.
    pub file_key: FileKey,
    /// Absolute path at parse time.
    pub abs_path: String,
    /// SHA-256 hex of the file's raw bytes.
    pub content_hash: String,
    /// SHA-256 hex of the sorted, null-joined forwarded compiler flags.
    pub flags_hash: String,
    /// SHA-256 hex of the sorted, null-joined include-dependency content hashes.
    pub includes_hash: String,
    /// `H(content_hash || includes_hash || flags_hash)`.
    pub composite_hash: String,
    /// Raw bytes, used to refresh the full-text recall index.
    pub file_bytes: Vec<u8>,
    /// Symbols defined in this file.
    pub symbols: Vec<Symbol>,
    /// References observed in this file.
    pub references: Vec<SymbolReference>,
    /// Call edges observed in this file.
    pub call_edges: Vec<CallEdge>,
    /// Include dependencies observed in this file.
    pub include_deps: Vec<IncludeDep>,
}

/// Observability snapshot of the single-writer's queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriterStats {
    /// Number of payloads currently queued.
    pub queue_depth: usize,
    /// Milliseconds since the oldest still-queued enqueue, or `0` if the
    /// queue is empty.
    pub lag_ms: u64,
}

/// A bounded queue of [`ParsePayload`]s drained by exactly one worker.
///
/// FIFO is preserved: for two enqueues `e1 < e2` of the same
/// `(context, file-key)`, the final persisted state equals `e2`'s payload.
/// Batching is a throughput optimization only and must not reorder
/// payloads relative to each other.
#[async_trait]
pub trait SingleWriter: Send + Sync {
    /// Spawns the worker task. Calling `start` twice is a no-op.
    async fn start(&self);

    /// Enqueues a payload. Errs with [`crate::Error::writer_not_running`]
    /// if the worker has not been started or has been stopped.
    async fn enqueue(&self, payload: ParsePayload) -> Result<()>;

    /// Blocks until the queue is empty and all in-flight payloads have
    /// been persisted (or dropped after exhausting their retry budget).
    async fn flush(&self);

    /// Flushes, then cancels the worker.
    async fn stop(&self);

    /// Current queue depth and lag, for observability.
    fn stats(&self) -> WriterStats;
}
