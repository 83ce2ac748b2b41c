//! Analysis contexts: the versioned "view" of facts a query reads through.

use serde::{Deserialize, Serialize};

use super::FileKey;

/// Whether a context is the long-lived canonical view or a PR-like overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextMode {
    /// The canonical, long-lived view for a workspace.
    Baseline,
    /// A layered view carrying modifications for a PR-like review.
    Pr,
}

/// Overlay-mode escalates irreversibly from `Sparse` to `PartialOverlay`
/// once either overlay counter crosses a configured ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayMode {
    /// Few files/rows touched relative to baseline.
    Sparse,
    /// One of `max_overlay_files` / `max_overlay_rows` has been crossed.
    PartialOverlay,
}

impl OverlayMode {
    /// Returns the escalated mode given updated overlay counters against
    /// the configured ceilings. Escalation is irreversible: a context
    /// already in `PartialOverlay` never returns to `Sparse`.
    #[must_use]
    pub fn escalate(self, file_count: u64, row_count: u64, max_files: u64, max_rows: u64) -> Self {
        if matches!(self, Self::PartialOverlay) {
            return Self::PartialOverlay;
        }
        if file_count > max_files || row_count > max_rows {
            Self::PartialOverlay
        } else {
            Self::Sparse
        }
    }
}

/// A context's lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextStatus {
    /// Returned by chain-construction and reachable by chain walks.
    Active,
    /// Tracked data remains, but chain walks no longer traverse it.
    Expired,
}

/// A versioned view of facts: `baseline` or an overlay (`pr`) layered on a
/// baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisContext {
    /// Unique context identifier.
    pub context_id: String,
    /// Owning workspace.
    pub workspace_id: String,
    /// Baseline or overlay.
    pub mode: ContextMode,
    /// The baseline this overlay is layered on; empty for a baseline context.
    pub base_context_id: Option<String>,
    /// Overlay escalation state.
    pub overlay_mode: OverlayMode,
    /// Count of distinct files touched by this overlay.
    pub overlay_file_count: u64,
    /// Count of derived-fact rows written under this overlay.
    pub overlay_row_count: u64,
    /// Lifecycle status.
    pub status: ContextStatus,
    /// Unix-seconds timestamp of last access.
    pub last_accessed_at: i64,
    /// Unix-seconds timestamp this context expires at, if any.
    pub expires_at: Option<i64>,
}

impl AnalysisContext {
    /// Whether this context is reachable by chain walks right now.
    pub fn is_active(&self) -> bool {
        matches!(self.status, ContextStatus::Active)
    }
}

/// Per-`(context, file-key)` overlay file state for an overlay context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    /// File does not exist in the baseline; new in this overlay.
    Added,
    /// File exists in baseline and has been re-parsed under this overlay.
    Modified,
    /// File exists in baseline under a different file-key; tracked here
    /// under its new identity.
    Renamed,
    /// File has been removed in this overlay; masked from all reads.
    Deleted,
}

/// The overlay file-state row driving candidate merge and deletion masking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFileState {
    /// The overlay context this state belongs to.
    pub context_id: String,
    /// The file-key this state describes.
    pub file_key: FileKey,
    /// The overlay file state.
    pub state: FileState,
    /// For `Renamed`, the file-key this entry replaces.
    pub replaced_from_file_key: Option<FileKey>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation_is_irreversible() {
        let escalated = OverlayMode::PartialOverlay.escalate(0, 0, 100, 100);
        assert_eq!(escalated, OverlayMode::PartialOverlay);
    }

    #[test]
    fn escalates_when_file_count_ceiling_crossed() {
        let mode = OverlayMode::Sparse.escalate(101, 0, 100, 100_000);
        assert_eq!(mode, OverlayMode::PartialOverlay);
    }

    #[test]
    fn escalates_when_row_count_ceiling_crossed() {
        let mode = OverlayMode::Sparse.escalate(0, 100_001, 100, 100_000);
        assert_eq!(mode, OverlayMode::PartialOverlay);
    }

    #[test]
    fn stays_sparse_under_ceilings() {
        let mode = OverlayMode::Sparse.escalate(5, 50, 100, 100_000);
        assert_eq!(mode, OverlayMode::Sparse);
    }
}
