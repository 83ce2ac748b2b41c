//! `cpp-extractor`-backed AST extraction: one subprocess per translation
//! unit, audited in the `parse_runs` table.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use cxxcache_domain::model::CompileEntry;
use cxxcache_domain::ports::{ExtractorOutput, ParserPool};
use cxxcache_domain::{debug, error, warn, Result};
use sqlx::SqlitePool;
use tokio::process::Command;

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Records a `parse_runs` row keyed only by absolute path: the
/// [`ParserPool`] port deliberately carries no context-id or file-key, so
/// the audit row's `file_key` column holds the same path as `abs_path`.
async fn insert_run(pool: &SqlitePool, abs_path: &str, started_at_ms: i64) -> Option<i64> {
    sqlx::query(
        "INSERT INTO parse_runs (context_id, file_key, abs_path, started_at_ms, success)
         VALUES ('', ?, ?, ?, 0)",
    )
    .bind(abs_path)
    .bind(abs_path)
    .bind(started_at_ms)
    .execute(pool)
    .await
    .ok()
    .map(|r| r.last_insert_rowid())
}

async fn finish_run(pool: &SqlitePool, run_id: i64, success: bool, error_msg: Option<&str>) {
    let _ = sqlx::query(
        "UPDATE parse_runs SET finished_at_ms = ?, success = ?, error_msg = ? WHERE id = ?",
    )
    .bind(now_ms())
    .bind(success)
    .bind(error_msg)
    .bind(run_id)
    .execute(pool)
    .await;
}

/// Invokes `cpp-extractor --action extract-all --file <path> -- <flags>`
/// and decodes its JSON stdout, recording one audit row per attempt.
pub struct CppExtractorParserPool {
    binary: String,
    timeout: Duration,
    audit_pool: SqlitePool,
}

impl CppExtractorParserPool {
    /// Builds a pool invoking `binary`, bounding each invocation to
    /// `timeout` and recording `parse_runs` audit rows through `audit_pool`.
    #[must_use]
    pub fn new(binary: impl Into<String>, timeout: Duration, audit_pool: SqlitePool) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            audit_pool,
        }
    }
}

#[async_trait]
impl ParserPool for CppExtractorParserPool {
    async fn parse_file(
        &self,
        abs_path: &str,
        entry: &CompileEntry,
    ) -> Result<Option<ExtractorOutput>> {
        let started_at_ms = now_ms();
        let run_id = insert_run(&self.audit_pool, abs_path, started_at_ms).await;

        let mut cmd = Command::new(&self.binary);
        cmd.args(["--action", "extract-all", "--file", abs_path, "--"])
            .args(&entry.arguments)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if !entry.directory.is_empty() {
            cmd.current_dir(&entry.directory);
        }

        debug!("parser", &format!("spawning extractor for {abs_path}"));

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let message = format!("cpp-extractor binary not found: {e}");
                error!("parser", &message);
                if let Some(id) = run_id {
                    finish_run(&self.audit_pool, id, false, Some(&message)).await;
                }
                return Ok(None);
            }
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                let message = format!("cpp-extractor subprocess failed: {e}");
                warn!("parser", &message);
                if let Some(id) = run_id {
                    finish_run(&self.audit_pool, id, false, Some(&message)).await;
                }
                return Ok(None);
            }
            Err(_) => {
                let message = format!(
                    "cpp-extractor timed out after {}s for {abs_path}",
                    self.timeout.as_secs()
                );
                warn!("parser", &message);
                if let Some(id) = run_id {
                    finish_run(&self.audit_pool, id, false, Some(&message)).await;
                }
                return Ok(None);
            }
        };

        if !output.status.success() {
            let stderr_text = String::from_utf8_lossy(&output.stderr);
            let truncated: String = stderr_text.chars().take(1000).collect();
            let message = format!(
                "cpp-extractor failed for {abs_path} (exit {:?}): {truncated}",
                output.status.code()
            );
            warn!("parser", &message);
            if let Some(id) = run_id {
                finish_run(&self.audit_pool, id, false, Some(&truncated)).await;
            }
            return Ok(None);
        }

        let stdout_text = String::from_utf8_lossy(&output.stdout);
        let parsed: Option<ExtractorOutput> = serde_json::from_str(&stdout_text).ok();
        match parsed {
            None => {
                let message = format!("invalid JSON output from cpp-extractor for {abs_path}");
                error!("parser", &message);
                if let Some(id) = run_id {
                    finish_run(&self.audit_pool, id, false, Some("invalid JSON output")).await;
                }
                Ok(None)
            }
            Some(extracted) if !extracted.success => {
                if let Some(id) = run_id {
                    finish_run(&self.audit_pool, id, false, Some("extractor reported failure")).await;
                }
                Ok(None)
            }
            Some(extracted) => {
                if let Some(id) = run_id {
                    finish_run(&self.audit_pool, id, true, None).await;
                }
                Ok(Some(extracted))
            }
        }
    }
}
