//! Lexical recall port: invokes an external `rg`-like subprocess.

use async_trait::async_trait;

use crate::error::Result;

/// One lexical-search hit line, projected from the external tool's JSON
/// output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecallHit {
    /// Absolute or repo-relative path as reported by the search tool.
    pub file_path: String,
    /// 1-based line number of the match.
    pub line_number: u32,
    /// The matched line's text.
    pub line_text: String,
}

/// Invokes the external lexical-search binary and parses its hit lines.
///
/// Failure modes (timeout, missing binary, non-matching exit code, decode
/// failure) are reported as an empty result plus a warning at the call
/// site — never as an `Err` — so the orchestrator can still serve cached
/// results in degraded form.
#[async_trait]
pub trait RecallEngine: Send + Sync {
    /// Runs the search for `symbol` under `repo_root`, returning
    /// deduplicated hits (first hit per unique file), capped at
    /// `max_files`. Returns `Ok(warnings)` paired with the hits so callers
    /// can surface subprocess-level degradation without treating it as a
    /// query-ending error.
    async fn run_recall(
        &self,
        symbol: &str,
        repo_root: &str,
        max_files: usize,
    ) -> Result<(Vec<RecallHit>, Vec<String>)>;
}
