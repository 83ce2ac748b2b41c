//! Pure path/identity resolution against a loaded [`WorkspaceManifest`]:
//! absolute path to file-key, file-key back to absolute path, and raw
//! `#include` path to a resolved dependency file-key.
//!
//! Takes the workspace root and manifest as plain arguments rather than
//! holding them — callers own the lifetime of a loaded manifest.

use crate::model::{FileKey, PathRemap, ResolvedIncludeDep, WorkspaceManifest};

/// Resolves an absolute on-disk path to its owning repo's file-key, by
/// longest-prefix match over each repo's root (case-folded, like
/// [`crate::compiledb`]'s lookups).
pub fn resolve_file_key(
    manifest: &WorkspaceManifest,
    workspace_root: &str,
    abs_path: &str,
) -> Option<FileKey> {
    let abs_norm = normalize(abs_path);
    let mut best: Option<(&str, String)> = None;
    for repo in &manifest.repos {
        let repo_root = normalize(&join(workspace_root, &repo.root));
        let prefix = format!("{repo_root}/");
        if fold(&abs_norm).starts_with(&fold(&prefix)) || fold(&abs_norm) == fold(&repo_root) {
            if best
                .as_ref()
                .map(|(_, cur)| repo_root.len() > cur.len())
                .unwrap_or(true)
            {
                best = Some((&repo.repo_id, repo_root));
            }
        }
    }
    let (repo_id, repo_root) = best?;
    let rel = abs_norm.strip_prefix(&format!("{repo_root}/")).unwrap_or(
        abs_norm
            .strip_prefix(&repo_root)
            .unwrap_or(&abs_norm)
            .trim_start_matches('/'),
    );
    Some(FileKey::new(repo_id, rel))
}

/// Reconstructs the absolute on-disk path for a file-key, given the repo
/// it names exists in the manifest.
pub fn file_key_to_abs_path(
    manifest: &WorkspaceManifest,
    workspace_root: &str,
    file_key: &FileKey,
) -> Option<String> {
    let repo = manifest.repo(file_key.repo_id())?;
    Some(normalize(&join(
        &join(workspace_root, &repo.root),
        file_key.rel_path(),
    )))
}

/// Resolves a raw `#include` path written in `from_repo_id` against
/// configured [`PathRemap`]s, then against same-repo relative lookup.
/// Remaps are tried in manifest order; the first matching prefix wins.
pub fn resolve_include_dep(
    manifest: &WorkspaceManifest,
    from_repo_id: &str,
    from_rel_dir: &str,
    raw_include_path: &str,
) -> ResolvedIncludeDep {
    for remap in &manifest.path_remaps {
        if let Some(rest) = raw_include_path.strip_prefix(&remap.from_prefix) {
            if manifest.repo(&remap.to_repo_id).is_some() {
                let rel = join(&remap.to_prefix, rest.trim_start_matches('/'));
                return ResolvedIncludeDep {
                    resolved: true,
                    file_key: Some(FileKey::new(&remap.to_repo_id, &normalize(&rel))),
                    depth: 1,
                };
            }
        }
    }
    if manifest.repo(from_repo_id).is_some() {
        let rel = join(from_rel_dir, raw_include_path);
        return ResolvedIncludeDep {
            resolved: true,
            file_key: Some(FileKey::new(from_repo_id, &normalize(&rel))),
            depth: 0,
        };
    }
    ResolvedIncludeDep {
        resolved: false,
        file_key: None,
        depth: 0,
    }
}

fn join(base: &str, rel: &str) -> String {
    if rel.is_empty() {
        return base.to_owned();
    }
    format!("{}/{}", base.trim_end_matches('/'), rel.trim_start_matches('/'))
}

fn normalize(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    let mut parts = Vec::new();
    for part in replaced.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if replaced.starts_with('/') {
        format!("/{joined}")
    } else {
        joined
    }
}

fn fold(s: &str) -> String {
    s.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> WorkspaceManifest {
        WorkspaceManifest {
            workspace_id: "ws1".to_owned(),
            repos: vec![
                crate::model::RepoManifest {
                    repo_id: "core".to_owned(),
                    root: "core".to_owned(),
                    compile_commands: None,
                    default_branch: "main".to_owned(),
                    depends_on: vec![],
                    remote_url: None,
                    token_env_var: None,
                    project_path: None,
                    commit_sha: None,
                },
                crate::model::RepoManifest {
                    repo_id: "app".to_owned(),
                    root: "app".to_owned(),
                    compile_commands: None,
                    default_branch: "main".to_owned(),
                    depends_on: vec!["core".to_owned()],
                    remote_url: None,
                    token_env_var: None,
                    project_path: None,
                    commit_sha: None,
                },
            ],
            path_remaps: vec![PathRemap {
                from_prefix: "core/".to_owned(),
                to_repo_id: "core".to_owned(),
                to_prefix: String::new(),
            }],
        }
    }

    #[test]
    fn resolves_abs_path_to_owning_repo() {
        let key = resolve_file_key(&manifest(), "/ws", "/ws/app/src/main.cpp").unwrap();
        assert_eq!(key.repo_id(), "app");
        assert_eq!(key.rel_path(), "src/main.cpp");
    }

    #[test]
    fn round_trips_file_key_to_abs_path() {
        let m = manifest();
        let key = resolve_file_key(&m, "/ws", "/ws/core/include/x.h").unwrap();
        let abs = file_key_to_abs_path(&m, "/ws", &key).unwrap();
        assert_eq!(abs, "/ws/core/include/x.h");
    }

    #[test]
    fn remap_prefix_redirects_into_other_repo() {
        let resolved = resolve_include_dep(&manifest(), "app", "src", "core/include/x.h");
        assert!(resolved.resolved);
        assert_eq!(resolved.file_key.unwrap().repo_id(), "core");
    }

    #[test]
    fn same_repo_relative_include_resolves_without_remap() {
        let resolved = resolve_include_dep(&manifest(), "app", "src", "util.h");
        assert!(resolved.resolved);
        assert_eq!(resolved.file_key.unwrap().rel_path(), "src/util.h");
    }

    #[test]
    fn unknown_repo_fails_to_resolve() {
        let resolved = resolve_include_dep(&manifest(), "ghost", "src", "util.h");
        assert!(!resolved.resolved);
    }
}
