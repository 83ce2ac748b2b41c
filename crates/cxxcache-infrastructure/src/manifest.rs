//! YAML workspace-manifest loading.

use async_trait::async_trait;
use cxxcache_domain::model::WorkspaceManifest;
use cxxcache_domain::ports::ManifestLoader;
use cxxcache_domain::{Error, Result};

/// Loads a [`WorkspaceManifest`] from a YAML file on disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct YamlManifestLoader;

#[async_trait]
impl ManifestLoader for YamlManifestLoader {
    async fn load(&self, manifest_path: &str) -> Result<WorkspaceManifest> {
        let raw = tokio::fs::read_to_string(manifest_path)
            .await
            .map_err(|e| Error::io_with_source(format!("read manifest '{manifest_path}'"), e))?;
        let manifest: WorkspaceManifest = serde_yaml::from_str(&raw)
            .map_err(|e| Error::yaml_with_source(format!("parse manifest '{manifest_path}'"), e))?;
        manifest.validate()?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_and_validates_minimal_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workspace.yaml");
        tokio::fs::write(
            &path,
            r#"
workspace_id: ws1
repos:
  - repo_id: repoA
    root: repoA
    default_branch: main
"#,
        )
        .await
        .unwrap();

        let loader = YamlManifestLoader;
        let manifest = loader.load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(manifest.workspace_id, "ws1");
        assert_eq!(manifest.repos.len(), 1);
    }

    #[tokio::test]
    async fn rejects_invalid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workspace.yaml");
        tokio::fs::write(&path, "workspace_id: ''\nrepos: []\n")
            .await
            .unwrap();

        let loader = YamlManifestLoader;
        assert!(loader.load(path.to_str().unwrap()).await.is_err());
    }
}
