//! Process-wide cache of loaded [`CompileDbIndex`]es, keyed by
//! `(workspaceId, repoId, normalizedCcPath)`. Entries are immutable once
//! inserted; `invalidate` drops a single entry, matching `refreshManifest`'s
//! effect on related caches.

use std::collections::HashMap;
use std::sync::Arc;

use cxxcache_domain::compiledb::CompileDbIndex;
use cxxcache_domain::Result;
use tokio::sync::RwLock;

/// Guards process-wide compile-command catalog state behind a single lock,
/// as the teacher's own process-wide caches do.
#[derive(Default)]
pub struct CompileDbCache {
    entries: RwLock<HashMap<(String, String, String), Arc<CompileDbIndex>>>,
}

impl CompileDbCache {
    /// Builds an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached index for `(workspace_id, repo_id, cc_path)`,
    /// loading and parsing it via `load_text` on a cache miss.
    ///
    /// # Errors
    /// Propagates whatever `load_text` returns (I/O failure reading the
    /// catalog) or a JSON-decode error from [`CompileDbIndex::from_json`].
    pub async fn get_or_load<F, Fut>(
        &self,
        workspace_id: &str,
        repo_id: &str,
        cc_path: &str,
        load_text: F,
    ) -> Result<Arc<CompileDbIndex>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<String>>,
    {
        let key = (
            workspace_id.to_owned(),
            repo_id.to_owned(),
            normalize_key(cc_path),
        );
        if let Some(existing) = self.entries.read().await.get(&key) {
            return Ok(Arc::clone(existing));
        }
        let text = load_text().await?;
        let index = Arc::new(CompileDbIndex::from_json(&text)?);
        self.entries
            .write()
            .await
            .insert(key, Arc::clone(&index));
        Ok(index)
    }

    /// Drops a single cached entry, forcing the next `get_or_load` to
    /// re-read the catalog.
    pub async fn invalidate(&self, workspace_id: &str, repo_id: &str, cc_path: &str) {
        let key = (
            workspace_id.to_owned(),
            repo_id.to_owned(),
            normalize_key(cc_path),
        );
        self.entries.write().await.remove(&key);
    }
}

fn normalize_key(path: &str) -> String {
    path.replace('\\', "/").to_lowercase()
}
