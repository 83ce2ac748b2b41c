//! Layered configuration: defaults, then an optional TOML file, then
//! `CXXCACHE_`-prefixed environment variables, via [`figment`].

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use cxxcache_domain::{Error, Result};

/// Central configuration for the cache engine. Resolved in order:
/// environment variables > TOML file > these defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // -- external tool paths ---------------------------------------------
    /// Ripgrep binary used by the recall engine.
    pub rg_binary: String,
    /// AST extractor binary invoked per translation unit.
    pub extractor_binary: String,
    /// Fallback `compile_commands.json` path when a repo configures none.
    pub default_compile_commands: String,
    /// Expected filename of a workspace manifest within a workspace root.
    pub workspace_manifest_name: String,

    // -- storage -----------------------------------------------------------
    /// Path to the embedded SQLite database file.
    pub db_path: String,

    // -- concurrency & limits ------------------------------------------------
    /// Bounded concurrency for the extractor subprocess pool.
    pub max_parse_workers: usize,
    /// Cap on distinct candidate files returned by recall.
    pub max_recall_files: usize,
    /// Per-invocation ripgrep timeout, in seconds.
    pub recall_timeout_s: u64,
    /// Per-invocation extractor timeout, in seconds.
    pub parse_timeout_s: u64,
    /// Bounded single-writer channel capacity.
    pub writer_queue_size: usize,
    /// Maximum payloads persisted per single-writer drain iteration.
    pub writer_batch_size: usize,
    /// Single-writer retry attempts before a payload is dropped.
    pub writer_retry_attempts: u32,
    /// Delay between single-writer retry attempts, in milliseconds.
    pub writer_retry_delay_ms: u64,

    // -- server --------------------------------------------------------------
    /// Bind host for the MCP server's network transport, if enabled.
    pub host: String,
    /// Bind port for the MCP server's network transport, if enabled.
    pub port: u16,

    // -- overlay controls ------------------------------------------------------
    /// Overlay file-count ceiling before escalation to `partial_overlay`.
    pub max_overlay_files: u64,
    /// Overlay row-count ceiling before escalation to `partial_overlay`.
    pub max_overlay_rows: u64,
    /// Hours of inactivity before an overlay context is eligible for expiry.
    pub context_ttl_hours: u64,
    /// Soft disk-usage budget across all overlay contexts, in bytes.
    pub context_disk_budget_bytes: u64,

    // -- repo sync -------------------------------------------------------------
    /// Concurrent repo-sync worker loops.
    pub git_sync_worker_count: usize,
    /// Retry budget before a repo-sync job is dead-lettered.
    pub git_sync_retry_attempts: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rg_binary: "rg".to_owned(),
            extractor_binary: "cpp-extractor".to_owned(),
            default_compile_commands: String::new(),
            workspace_manifest_name: "workspace.yaml".to_owned(),
            db_path: "./cxxcache.db".to_owned(),
            max_parse_workers: 4,
            max_recall_files: 200,
            recall_timeout_s: 30,
            parse_timeout_s: 120,
            writer_queue_size: 1024,
            writer_batch_size: 10,
            writer_retry_attempts: 3,
            writer_retry_delay_ms: 200,
            host: "127.0.0.1".to_owned(),
            port: 8000,
            max_overlay_files: 5_000,
            max_overlay_rows: 2_000_000,
            context_ttl_hours: 72,
            context_disk_budget_bytes: 4 * 1024 * 1024 * 1024,
            git_sync_worker_count: 2,
            git_sync_retry_attempts: 3,
        }
    }
}

/// Loads [`Settings`], merging an optional TOML file over the defaults and
/// `CXXCACHE_`-prefixed environment variables over both.
///
/// # Errors
/// Propagates a malformed TOML file or an env var that fails to coerce
/// into its field's type.
pub fn load_settings(config_path: Option<&str>) -> Result<Settings> {
    let mut figment = Figment::from(Serialized::defaults(Settings::default()));
    if let Some(path) = config_path {
        if std::path::Path::new(path).exists() {
            figment = figment.merge(Toml::file(path));
        }
    }
    figment = figment.merge(Env::prefixed("CXXCACHE_"));
    figment
        .extract()
        .map_err(|e| Error::config_with_source("failed to load configuration", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_overrides() {
        let settings = load_settings(None).unwrap();
        assert_eq!(settings.rg_binary, "rg");
        assert_eq!(settings.max_parse_workers, 4);
    }

    #[test]
    #[serial_test::serial]
    fn env_var_overrides_default() {
        std::env::set_var("CXXCACHE_MAX_PARSE_WORKERS", "16");
        let settings = load_settings(None).unwrap();
        std::env::remove_var("CXXCACHE_MAX_PARSE_WORKERS");
        assert_eq!(settings.max_parse_workers, 16);
    }

    #[test]
    fn toml_file_overrides_default_and_env_overrides_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cxxcache.toml");
        std::fs::write(&path, "db_path = \"/tmp/from-toml.db\"\n").unwrap();
        let settings = load_settings(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(settings.db_path, "/tmp/from-toml.db");
    }
}
