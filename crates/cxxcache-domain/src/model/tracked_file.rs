//! Per-`(context, file-key)` freshness record.

use serde::{Deserialize, Serialize};

use super::FileKey;

/// The freshness record backing one `(context, file-key)` pair.
///
/// Invariant: `composite_hash == hash::composite_hash(content_hash,
/// includes_hash, flags_hash)`. Deleting a tracked file also removes all of
/// its derived rows (symbols/references/call-edges/include-deps) and its
/// recall-index content for that context — enforced transactionally by the
/// storage engine, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    /// Owning context.
    pub context_id: String,
    /// The file this row describes.
    pub file_key: FileKey,
    /// Absolute path at the time of last parse.
    pub abs_path: String,
    /// SHA-256 hex of the file's raw bytes.
    pub content_hash: String,
    /// SHA-256 hex of the sorted, null-joined forwarded compiler flags.
    pub flags_hash: String,
    /// SHA-256 hex of the sorted, null-joined include-dependency content hashes.
    pub includes_hash: String,
    /// `H(content_hash || includes_hash || flags_hash)` — the freshness oracle.
    pub composite_hash: String,
    /// Unix-seconds timestamp of the last successful parse.
    pub last_parsed_at: i64,
}
