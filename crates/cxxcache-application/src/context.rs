//! Context Service: workspace/manifest resolution (with process-wide
//! manifest caching), baseline/overlay context lifecycle, and the
//! dependency-graph BFS behind `candidateRepos`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use cxxcache_domain::model::{AnalysisContext, OverlayMode, WorkspaceManifest};
use cxxcache_domain::ports::{ManifestLoader, StorageEngine};
use cxxcache_domain::{Error, Result};
use tokio::sync::RwLock;

/// The resolved `(contextId, baselineId, overlayMode)` triple for a query.
#[derive(Debug, Clone)]
pub struct ResolvedContexts {
    /// The context reads should chain from first (equals `baseline_id` when
    /// no overlay was requested).
    pub context_id: String,
    /// The workspace's baseline context id.
    pub baseline_id: String,
    /// The resolved context's overlay mode.
    pub overlay_mode: OverlayMode,
}

impl ResolvedContexts {
    /// The ordered context chain reads should walk: `[overlay, baseline]`
    /// or just `[baseline]` when no overlay is in play.
    #[must_use]
    pub fn chain(&self) -> Vec<String> {
        if self.context_id == self.baseline_id {
            vec![self.baseline_id.clone()]
        } else {
            vec![self.context_id.clone(), self.baseline_id.clone()]
        }
    }
}

/// Workspace/manifest resolution and context lifecycle.
pub struct ContextService {
    storage: Arc<dyn StorageEngine>,
    manifest_loader: Arc<dyn ManifestLoader>,
    manifest_cache: RwLock<HashMap<String, Arc<WorkspaceManifest>>>,
}

impl ContextService {
    /// Builds a service over the given storage and manifest-loader ports.
    pub fn new(storage: Arc<dyn StorageEngine>, manifest_loader: Arc<dyn ManifestLoader>) -> Self {
        Self {
            storage,
            manifest_loader,
            manifest_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Loads (from cache, or from disk on a miss) the manifest at
    /// `manifest_path`, upserts the workspace's root/manifest path, and
    /// returns the manifest plus its repo ids.
    ///
    /// # Errors
    /// Propagates a manifest schema violation or a storage failure.
    pub async fn resolve_workspace(
        &self,
        workspace_id: &str,
        root_path: &str,
        manifest_path: &str,
    ) -> Result<(Arc<WorkspaceManifest>, Vec<String>)> {
        let manifest = self.load_manifest(manifest_path).await?;
        self.storage
            .upsert_workspace(workspace_id, root_path, manifest_path)
            .await?;
        let repo_ids = manifest.repos.iter().map(|r| r.repo_id.clone()).collect();
        Ok((manifest, repo_ids))
    }

    /// Drops the cached manifest for `manifest_path`, forcing the next
    /// [`Self::resolve_workspace`] call to reload it from disk.
    pub async fn refresh_manifest(&self, manifest_path: &str) {
        self.manifest_cache.write().await.remove(manifest_path);
    }

    async fn load_manifest(&self, manifest_path: &str) -> Result<Arc<WorkspaceManifest>> {
        if let Some(cached) = self.manifest_cache.read().await.get(manifest_path) {
            return Ok(Arc::clone(cached));
        }
        let manifest = Arc::new(self.manifest_loader.load(manifest_path).await?);
        self.manifest_cache
            .write()
            .await
            .insert(manifest_path.to_owned(), Arc::clone(&manifest));
        Ok(manifest)
    }

    /// Ensures a baseline context exists for the workspace and resolves the
    /// `(contextId, baselineId, overlayMode)` triple for a query, optionally
    /// layered on `overlay_context_id`.
    ///
    /// # Errors
    /// Errs if `overlay_context_id` does not name an active context whose
    /// `base_context_id` equals the workspace's baseline.
    pub async fn resolve_contexts(
        &self,
        workspace_id: &str,
        overlay_context_id: Option<&str>,
    ) -> Result<ResolvedContexts> {
        let baseline_id = self.storage.ensure_baseline_context(workspace_id).await?;
        match overlay_context_id {
            None => Ok(ResolvedContexts {
                context_id: baseline_id.clone(),
                baseline_id,
                overlay_mode: OverlayMode::Sparse,
            }),
            Some(overlay_id) => {
                let context = self
                    .storage
                    .get_context(overlay_id)
                    .await?
                    .ok_or_else(|| Error::not_found(format!("context '{overlay_id}'")))?;
                if !context.is_active() {
                    return Err(Error::invalid_argument(format!(
                        "context '{overlay_id}' is not active"
                    )));
                }
                if context.base_context_id.as_deref() != Some(baseline_id.as_str()) {
                    return Err(Error::invalid_argument(format!(
                        "context '{overlay_id}' is not layered on workspace baseline"
                    )));
                }
                Ok(ResolvedContexts {
                    context_id: overlay_id.to_owned(),
                    baseline_id,
                    overlay_mode: context.overlay_mode,
                })
            }
        }
    }

    /// Allocates a new overlay context on top of `base_context_id`.
    ///
    /// # Errors
    /// Propagates a storage failure, e.g. `base_context_id` is not an
    /// active baseline.
    pub async fn create_overlay(
        &self,
        workspace_id: &str,
        base_context_id: &str,
        explicit_id: Option<&str>,
    ) -> Result<AnalysisContext> {
        self.storage
            .create_overlay(workspace_id, base_context_id, explicit_id)
            .await
    }

    /// Marks a context expired.
    ///
    /// # Errors
    /// Propagates a storage failure.
    pub async fn expire(&self, context_id: &str) -> Result<()> {
        self.storage.expire_context(context_id).await
    }

    /// Bumps a context's last-accessed timestamp.
    ///
    /// # Errors
    /// Propagates a storage failure.
    pub async fn touch(&self, context_id: &str) -> Result<()> {
        self.storage.touch_context(context_id).await
    }

    /// BFS over repo dependencies from `entry_repos`, up to `max_hops`.
    /// An empty `entry_repos` returns every repo in the manifest.
    #[must_use]
    pub fn candidate_repos(
        manifest: &WorkspaceManifest,
        entry_repos: &[String],
        max_hops: u32,
    ) -> Vec<String> {
        if entry_repos.is_empty() {
            return manifest.repos.iter().map(|r| r.repo_id.clone()).collect();
        }
        let mut visited: HashSet<String> = entry_repos.iter().cloned().collect();
        let mut frontier: VecDeque<(String, u32)> =
            entry_repos.iter().cloned().map(|r| (r, 0)).collect();
        let mut ordered: Vec<String> = entry_repos.to_vec();

        while let Some((repo_id, hops)) = frontier.pop_front() {
            if hops >= max_hops {
                continue;
            }
            let Some(repo) = manifest.repo(&repo_id) else {
                continue;
            };
            for dep in &repo.depends_on {
                if visited.insert(dep.clone()) {
                    ordered.push(dep.clone());
                    frontier.push_back((dep.clone(), hops + 1));
                }
            }
        }
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxxcache_domain::model::RepoManifest;

    fn repo(id: &str, deps: &[&str]) -> RepoManifest {
        RepoManifest {
            repo_id: id.to_owned(),
            root: id.to_owned(),
            compile_commands: None,
            default_branch: "main".to_owned(),
            depends_on: deps.iter().map(|s| (*s).to_owned()).collect(),
            remote_url: None,
            token_env_var: None,
            project_path: None,
            commit_sha: None,
        }
    }

    fn manifest() -> WorkspaceManifest {
        WorkspaceManifest {
            workspace_id: "ws".to_owned(),
            repos: vec![
                repo("a", &["b"]),
                repo("b", &["c"]),
                repo("c", &[]),
                repo("isolated", &[]),
            ],
            path_remaps: vec![],
        }
    }

    #[test]
    fn empty_entry_repos_returns_all() {
        let repos = ContextService::candidate_repos(&manifest(), &[], 10);
        assert_eq!(repos.len(), 4);
    }

    #[test]
    fn bfs_respects_max_hops() {
        let entry = vec!["a".to_owned()];
        let repos = ContextService::candidate_repos(&manifest(), &entry, 1);
        assert_eq!(repos, vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn bfs_reaches_transitive_dependency() {
        let entry = vec!["a".to_owned()];
        let repos = ContextService::candidate_repos(&manifest(), &entry, 2);
        assert_eq!(repos, vec!["a".to_owned(), "b".to_owned(), "c".to_owned()]);
    }
}
