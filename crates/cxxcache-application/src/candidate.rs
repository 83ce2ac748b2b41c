//! Candidate Service: merges baseline recall, overlay recall, and live
//! lexical search into the ordered candidate file-key list for one query,
//! applying overlay file-state masking.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use cxxcache_domain::model::{FileKey, FileState, WorkspaceManifest};
use cxxcache_domain::path_resolver;
use cxxcache_domain::ports::{RecallEngine, StorageEngine};
use cxxcache_domain::Result;

/// Minimum per-repo lexical-search budget, applied even when `maxFiles`
/// divided across many repos would otherwise starve a single repo.
const MIN_PER_REPO_BUDGET: usize = 20;

/// One repo's disk location, used to fan out the live lexical search.
#[derive(Debug, Clone)]
pub struct RepoSearchTarget {
    /// The repo's id within the workspace.
    pub repo_id: String,
    /// Absolute filesystem root of this repo's checkout.
    pub abs_root: String,
}

/// Where a candidate file-key was contributed from; a candidate may carry
/// more than one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    /// Full-text recall within the overlay context.
    Overlay,
    /// Full-text recall within the baseline context.
    Baseline,
    /// Live lexical search on disk.
    LiveSearch,
}

/// Input to [`CandidateService::resolve`].
pub struct CandidateRequest<'a> {
    /// The workspace's baseline context id.
    pub baseline_context_id: &'a str,
    /// The overlay context id, if this query runs against an overlay.
    pub overlay_context_id: Option<&'a str>,
    /// The loaded workspace manifest, used to resolve live-search hits
    /// back to file-keys.
    pub manifest: &'a WorkspaceManifest,
    /// Workspace root on disk.
    pub workspace_root: &'a str,
    /// Repos to fan the live lexical search across.
    pub repos: &'a [RepoSearchTarget],
    /// The symbol/query string driving recall.
    pub query: &'a str,
    /// Global cap on the candidate list.
    pub max_files: usize,
}

/// Output of [`CandidateService::resolve`].
#[derive(Debug, Default)]
pub struct CandidateResult {
    /// The merged, capped, ordered candidate file-keys.
    pub candidates: Vec<FileKey>,
    /// File-keys the overlay marks deleted or superseded by rename.
    pub deleted: HashSet<FileKey>,
    /// Non-fatal warnings (recall subprocess failures, truncation).
    pub warnings: Vec<String>,
    /// Every source that contributed each candidate, for diagnostics.
    pub provenance: HashMap<FileKey, Vec<CandidateSource>>,
}

/// Merges baseline recall, overlay recall, and live lexical search.
pub struct CandidateService {
    storage: Arc<dyn StorageEngine>,
    recall: Arc<dyn RecallEngine>,
}

impl CandidateService {
    /// Builds a service over the given storage and recall ports.
    pub fn new(storage: Arc<dyn StorageEngine>, recall: Arc<dyn RecallEngine>) -> Self {
        Self { storage, recall }
    }

    /// Produces the ordered candidate list for one query.
    ///
    /// # Errors
    /// Propagates a storage failure from the full-text recall reads or the
    /// overlay file-state read; live-search subprocess failures are
    /// captured as warnings instead.
    pub async fn resolve(&self, req: CandidateRequest<'_>) -> Result<CandidateResult> {
        let mut ordered: Vec<FileKey> = Vec::new();
        let mut provenance: HashMap<FileKey, Vec<CandidateSource>> = HashMap::new();
        let mut warnings = Vec::new();

        let repo_ids: Vec<String> = req.repos.iter().map(|r| r.repo_id.clone()).collect();

        if let Some(overlay_id) = req.overlay_context_id {
            let hits = self
                .storage
                .search_recall_candidates(overlay_id, req.query, &repo_ids, req.max_files)
                .await?;
            push_all(&mut ordered, &mut provenance, hits, CandidateSource::Overlay);
        }

        let baseline_hits = self
            .storage
            .search_recall_candidates(
                req.baseline_context_id,
                req.query,
                &repo_ids,
                req.max_files,
            )
            .await?;
        push_all(
            &mut ordered,
            &mut provenance,
            baseline_hits,
            CandidateSource::Baseline,
        );

        let per_repo_budget = if req.repos.is_empty() {
            MIN_PER_REPO_BUDGET
        } else {
            (req.max_files / req.repos.len()).max(MIN_PER_REPO_BUDGET)
        };
        for repo in req.repos {
            match self
                .recall
                .run_recall(req.query, &repo.abs_root, per_repo_budget)
                .await
            {
                Ok((hits, recall_warnings)) => {
                    warnings.extend(recall_warnings);
                    let keys: Vec<FileKey> = hits
                        .into_iter()
                        .filter_map(|hit| {
                            path_resolver::resolve_file_key(
                                req.manifest,
                                req.workspace_root,
                                &hit.file_path,
                            )
                        })
                        .collect();
                    push_all(&mut ordered, &mut provenance, keys, CandidateSource::LiveSearch);
                }
                Err(err) => warnings.push(format!(
                    "live lexical search failed for repo '{}': {err}",
                    repo.repo_id
                )),
            }
        }

        let mut deleted = HashSet::new();
        if let Some(overlay_id) = req.overlay_context_id {
            let states = self.storage.list_context_file_states(overlay_id).await?;
            for state in states {
                match state.state {
                    FileState::Deleted => {
                        remove_candidate(&mut ordered, &mut provenance, &state.file_key);
                        deleted.insert(state.file_key);
                    }
                    FileState::Renamed => {
                        if let Some(old_key) = state.replaced_from_file_key {
                            remove_candidate(&mut ordered, &mut provenance, &old_key);
                            deleted.insert(old_key);
                        }
                        push_all(
                            &mut ordered,
                            &mut provenance,
                            vec![state.file_key],
                            CandidateSource::Overlay,
                        );
                    }
                    FileState::Added | FileState::Modified => {}
                }
            }
        }

        let truncated = ordered.len() > req.max_files;
        if truncated {
            ordered.truncate(req.max_files);
            warnings.push(format!(
                "candidate list truncated to max_files={}",
                req.max_files
            ));
        }

        Ok(CandidateResult {
            candidates: ordered,
            deleted,
            warnings,
            provenance,
        })
    }
}

fn push_all(
    ordered: &mut Vec<FileKey>,
    provenance: &mut HashMap<FileKey, Vec<CandidateSource>>,
    keys: Vec<FileKey>,
    source: CandidateSource,
) {
    for key in keys {
        let sources = provenance.entry(key.clone()).or_default();
        if sources.is_empty() {
            ordered.push(key);
        }
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
}

fn remove_candidate(
    ordered: &mut Vec<FileKey>,
    provenance: &mut HashMap<FileKey, Vec<CandidateSource>>,
    key: &FileKey,
) {
    ordered.retain(|k| k != key);
    provenance.remove(key);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_all_preserves_first_insertion_order() {
        let mut ordered = Vec::new();
        let mut provenance = HashMap::new();
        let a = FileKey::new("repoA", "a.cpp");
        let b = FileKey::new("repoA", "b.cpp");
        push_all(
            &mut ordered,
            &mut provenance,
            vec![a.clone(), b.clone()],
            CandidateSource::Overlay,
        );
        push_all(
            &mut ordered,
            &mut provenance,
            vec![a.clone()],
            CandidateSource::Baseline,
        );
        assert_eq!(ordered, vec![a.clone(), b]);
        assert_eq!(
            provenance.get(&a).unwrap(),
            &vec![CandidateSource::Overlay, CandidateSource::Baseline]
        );
    }

    #[test]
    fn remove_candidate_drops_order_and_provenance() {
        let mut ordered = Vec::new();
        let mut provenance = HashMap::new();
        let a = FileKey::new("repoA", "a.cpp");
        push_all(&mut ordered, &mut provenance, vec![a.clone()], CandidateSource::Baseline);
        remove_candidate(&mut ordered, &mut provenance, &a);
        assert!(ordered.is_empty());
        assert!(provenance.is_empty());
    }
}
