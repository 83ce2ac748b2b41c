//! Multi-repo workspace topology, loaded from a strict YAML manifest.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A prefix-rewrite rule used to resolve `#include` paths that cross repo
/// boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRemap {
    /// Prefix to match against a raw include path.
    pub from_prefix: String,
    /// Repo id the remap resolves into.
    pub to_repo_id: String,
    /// Prefix to substitute within that repo.
    pub to_prefix: String,
}

/// One repository's topology entry within a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoManifest {
    /// Unique identifier within the workspace.
    pub repo_id: String,
    /// Filesystem root, relative to the workspace root.
    pub root: String,
    /// Optional path to a `compile_commands.json`, relative to `root`.
    #[serde(default)]
    pub compile_commands: Option<String>,
    /// Default branch name, used by the sync worker.
    pub default_branch: String,
    /// Other repo ids this repo depends on (drives `candidateRepos` BFS).
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// HTTPS remote URL, if this repo is synced from a remote host.
    #[serde(default)]
    pub remote_url: Option<String>,
    /// Name of the environment variable holding the sync token.
    #[serde(default)]
    pub token_env_var: Option<String>,
    /// Optional path within the remote (monorepo-style checkouts).
    #[serde(default)]
    pub project_path: Option<String>,
    /// Pinned 40-hex commit SHA to sync to.
    #[serde(default)]
    pub commit_sha: Option<String>,
}

impl RepoManifest {
    fn validate(&self) -> Result<()> {
        if self.repo_id.trim().is_empty() {
            return Err(Error::manifest_invalid("repo_id must not be empty"));
        }
        if let Some(url) = &self.remote_url {
            if !url.starts_with("https://") {
                return Err(Error::manifest_invalid(format!(
                    "repo '{}': remote_url must be HTTPS",
                    self.repo_id
                )));
            }
            if self.token_env_var.is_none() {
                return Err(Error::manifest_invalid(format!(
                    "repo '{}': remote_url present but token_env_var missing",
                    self.repo_id
                )));
            }
            let sha = self.commit_sha.as_deref().unwrap_or("");
            if sha.len() != 40 || !sha.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(Error::manifest_invalid(format!(
                    "repo '{}': commit_sha must be a 40-hex string",
                    self.repo_id
                )));
            }
        }
        Ok(())
    }
}

/// Typed, validated multi-repo workspace topology.
///
/// Loaded by `cxxcache_infrastructure::workspace` via `serde_yaml`; domain
/// owns only the shape and the validation rules, not the YAML parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceManifest {
    /// The workspace this manifest belongs to.
    pub workspace_id: String,
    /// The set of repos in this workspace.
    pub repos: Vec<RepoManifest>,
    /// Cross-repo include path remaps.
    #[serde(default)]
    pub path_remaps: Vec<PathRemap>,
}

impl WorkspaceManifest {
    /// Validates repo-id uniqueness and per-repo sync-field invariants.
    /// Callers must invoke this immediately after deserializing.
    pub fn validate(&self) -> Result<()> {
        if self.workspace_id.trim().is_empty() {
            return Err(Error::manifest_invalid("workspace_id must not be empty"));
        }
        let mut seen = std::collections::HashSet::with_capacity(self.repos.len());
        for repo in &self.repos {
            repo.validate()?;
            if !seen.insert(repo.repo_id.as_str()) {
                return Err(Error::manifest_invalid(format!(
                    "duplicate repo_id '{}'",
                    repo.repo_id
                )));
            }
        }
        Ok(())
    }

    /// Looks up a repo by id.
    pub fn repo(&self, repo_id: &str) -> Option<&RepoManifest> {
        self.repos.iter().find(|r| r.repo_id == repo_id)
    }
}

/// Result of resolving a raw `#include` path against repo membership and
/// configured path remaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIncludeDep {
    /// Whether resolution succeeded.
    pub resolved: bool,
    /// The resolved file-key, if resolution succeeded.
    pub file_key: Option<crate::model::FileKey>,
    /// Number of remap hops applied (diagnostics only).
    pub depth: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(remote: bool) -> WorkspaceManifest {
        let mut repo = RepoManifest {
            repo_id: "repoA".to_owned(),
            root: "repoA".to_owned(),
            compile_commands: None,
            default_branch: "main".to_owned(),
            depends_on: vec![],
            remote_url: None,
            token_env_var: None,
            project_path: None,
            commit_sha: None,
        };
        if remote {
            repo.remote_url = Some("https://example.com/repoA.git".to_owned());
            repo.token_env_var = Some("REPOA_TOKEN".to_owned());
            repo.commit_sha =
                Some("0123456789abcdef0123456789abcdef01234567".to_owned());
        }
        WorkspaceManifest {
            workspace_id: "ws1".to_owned(),
            repos: vec![repo],
            path_remaps: vec![],
        }
    }

    #[test]
    fn validates_minimal_manifest() {
        assert!(manifest(false).validate().is_ok());
    }

    #[test]
    fn rejects_http_remote_url() {
        let mut m = manifest(true);
        m.repos[0].remote_url = Some("http://example.com/repoA.git".to_owned());
        assert!(m.validate().is_err());
    }

    #[test]
    fn rejects_remote_without_token() {
        let mut m = manifest(true);
        m.repos[0].token_env_var = None;
        assert!(m.validate().is_err());
    }

    #[test]
    fn rejects_non_hex_commit_sha() {
        let mut m = manifest(true);
        m.repos[0].commit_sha = Some("not-a-sha".to_owned());
        assert!(m.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_repo_ids() {
        let mut m = manifest(false);
        m.repos.push(m.repos[0].clone());
        assert!(m.validate().is_err());
    }

    #[test]
    fn accepts_valid_remote_sync_fields() {
        assert!(manifest(true).validate().is_ok());
    }
}
