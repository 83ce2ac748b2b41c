//! Workspace manifest loader port: text-format parsing lives in
//! infrastructure (`serde_yaml`); domain owns only the resulting shape and
//! its validation rules (see [`crate::model::WorkspaceManifest::validate`]).

use async_trait::async_trait;

use crate::error::Result;
use crate::model::WorkspaceManifest;

/// Loads and validates a workspace manifest from its on-disk path.
#[async_trait]
pub trait ManifestLoader: Send + Sync {
    /// Reads `manifest_path`, deserializes it, and calls
    /// [`WorkspaceManifest::validate`] before returning it. A schema
    /// violation is a [`crate::Error::manifest_invalid`], fatal for the
    /// calling `resolveWorkspace`.
    async fn load(&self, manifest_path: &str) -> Result<WorkspaceManifest>;
}
