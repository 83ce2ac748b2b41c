//! The confidence envelope: the contract for communicating partial success.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{FileKey, OverlayMode};

/// A human-readable note on a degraded or partial result. Warnings are
/// deduplicated and sorted before being attached to a
/// [`ConfidenceEnvelope`].
pub type Warning = String;

/// Structured per-response summary of verified / stale / unparsed files,
/// warnings, and overlay mode. This is how callers distinguish "no results"
/// from "degraded results."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceEnvelope {
    /// File-keys whose cached facts were confirmed fresh or freshly parsed.
    pub verified_files: Vec<FileKey>,
    /// File-keys that failed to (re)parse.
    pub stale_files: Vec<FileKey>,
    /// File-keys that could not be classified at all (no compile entry,
    /// unresolvable path, ...).
    pub unparsed_files: Vec<FileKey>,
    /// `|verified| + |stale| + |unparsed|`.
    pub total_candidates: usize,
    /// `|verified| / total_candidates`, rounded to 4 decimal places. `0.0`
    /// when `total_candidates == 0`.
    pub verified_ratio: f64,
    /// Deduplicated, sorted warnings collected across the pipeline.
    pub warnings: Vec<Warning>,
    /// The overlay-mode of the context this response was served from.
    pub overlay_mode: OverlayMode,
    /// Per-repo `verified / total` coverage, keyed by the file-key's
    /// `repoId:` prefix.
    pub repo_coverage: BTreeMap<String, f64>,
}

impl ConfidenceEnvelope {
    /// Builds the envelope from classified file-key sets, following §4.12:
    /// `verifiedRatio = |verified| / total` (0 if `total == 0`), warnings
    /// deduped and sorted, and a per-repo coverage map rounded to 4 decimals.
    pub fn build(
        verified: Vec<FileKey>,
        stale: Vec<FileKey>,
        unparsed: Vec<FileKey>,
        mut warnings: Vec<Warning>,
        overlay_mode: OverlayMode,
    ) -> Self {
        warnings.sort();
        warnings.dedup();

        let total = verified.len() + stale.len() + unparsed.len();
        let verified_ratio = if total == 0 {
            0.0
        } else {
            round4(verified.len() as f64 / total as f64)
        };

        let mut repo_totals: BTreeMap<String, usize> = BTreeMap::new();
        let mut repo_verified: BTreeMap<String, usize> = BTreeMap::new();
        for key in verified.iter().chain(stale.iter()).chain(unparsed.iter()) {
            *repo_totals.entry(key.repo_id().to_owned()).or_default() += 1;
        }
        for key in &verified {
            *repo_verified.entry(key.repo_id().to_owned()).or_default() += 1;
        }
        let repo_coverage = repo_totals
            .into_iter()
            .map(|(repo, total)| {
                let verified = repo_verified.get(&repo).copied().unwrap_or(0);
                let ratio = if total == 0 {
                    0.0
                } else {
                    round4(verified as f64 / total as f64)
                };
                (repo, ratio)
            })
            .collect();

        Self {
            verified_files: verified,
            stale_files: stale,
            unparsed_files: unparsed,
            total_candidates: total,
            verified_ratio,
            warnings,
            overlay_mode,
            repo_coverage,
        }
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> FileKey {
        FileKey::new(s.split(':').next().unwrap(), s.split(':').nth(1).unwrap())
    }

    #[test]
    fn zero_candidates_yields_zero_ratio() {
        let env = ConfidenceEnvelope::build(vec![], vec![], vec![], vec![], OverlayMode::Sparse);
        assert_eq!(env.verified_ratio, 0.0);
        assert_eq!(env.total_candidates, 0);
    }

    #[test]
    fn ratio_rounds_to_four_decimals() {
        let verified = vec![key("repoA:a.cpp"), key("repoA:b.cpp")];
        let stale = vec![key("repoA:c.cpp")];
        let env = ConfidenceEnvelope::build(verified, stale, vec![], vec![], OverlayMode::Sparse);
        assert_eq!(env.verified_ratio, 0.6667);
    }

    #[test]
    fn repo_coverage_numerators_sum_to_verified_count() {
        let verified = vec![key("repoA:a.cpp"), key("repoB:x.cpp")];
        let stale = vec![key("repoA:b.cpp")];
        let unparsed = vec![key("repoB:y.cpp")];
        let env =
            ConfidenceEnvelope::build(verified.clone(), stale, unparsed, vec![], OverlayMode::Sparse);
        assert_eq!(env.repo_coverage["repoA"], 0.5);
        assert_eq!(env.repo_coverage["repoB"], 0.5);
        let _ = verified;
    }

    #[test]
    fn warnings_deduped_and_sorted() {
        let warnings = vec!["b warn".to_owned(), "a warn".to_owned(), "b warn".to_owned()];
        let env = ConfidenceEnvelope::build(vec![], vec![], vec![], warnings, OverlayMode::Sparse);
        assert_eq!(env.warnings, vec!["a warn".to_owned(), "b warn".to_owned()]);
    }
}
