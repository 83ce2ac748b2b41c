//! SQLite-backed [`StorageEngine`]: the embedded, context-partitioned fact
//! store, with an FTS5 virtual table backing full-text recall.

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use cxxcache_domain::model::{
    AnalysisContext, CallDirection, CallEdge, ContextFileState, ContextMode, ContextStatus,
    FileKey, FileState, Job, JobKind, JobStatus, OverlayMode, ReferenceKind, Symbol,
    SymbolReference, TrackedFile,
};
use cxxcache_domain::ports::{ParsePayload, StorageEngine};
use cxxcache_domain::{Error, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

use super::schema::{ddl_statements, CURRENT_SCHEMA_VERSION};

/// Opens (creating if absent) the SQLite database at `path`, applies
/// pending DDL, and enables WAL journaling.
///
/// # Errors
/// Propagates a connection or DDL failure.
pub async fn connect_and_init(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io_with_source("create database directory", e))?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| Error::storage_with_source("connect to SQLite database", e))?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await
        .map_err(|e| Error::storage_with_source("enable WAL mode", e))?;
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .map_err(|e| Error::storage_with_source("enable foreign keys", e))?;

    apply_schema(&pool).await?;
    Ok(pool)
}

async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    let row = sqlx::query("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(|e| Error::storage_with_source("read schema version", e))?;
    let version: i64 = row.try_get(0).unwrap_or(0);
    if version >= CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| Error::storage_with_source("begin schema migration", e))?;
    for stmt in ddl_statements() {
        sqlx::query(stmt)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::storage_with_source(format!("apply DDL: {stmt}"), e))?;
    }
    tx.commit()
        .await
        .map_err(|e| Error::storage_with_source("commit schema migration", e))?;

    sqlx::query(&format!("PRAGMA user_version = {CURRENT_SCHEMA_VERSION}"))
        .execute(pool)
        .await
        .map_err(|e| Error::storage_with_source("record schema version", e))?;
    Ok(())
}

/// SQLite implementation of [`StorageEngine`].
pub struct SqliteStorageEngine {
    pool: SqlitePool,
}

impl SqliteStorageEngine {
    /// Wraps an already-initialized pool. Use [`connect_and_init`] to build one.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn now_s() -> i64 {
    chrono::Utc::now().timestamp()
}

fn mode_to_str(mode: ContextMode) -> &'static str {
    match mode {
        ContextMode::Baseline => "baseline",
        ContextMode::Pr => "pr",
    }
}

fn mode_from_str(s: &str) -> ContextMode {
    match s {
        "pr" => ContextMode::Pr,
        _ => ContextMode::Baseline,
    }
}

fn overlay_mode_to_str(mode: OverlayMode) -> &'static str {
    match mode {
        OverlayMode::Sparse => "sparse",
        OverlayMode::PartialOverlay => "partial_overlay",
    }
}

fn overlay_mode_from_str(s: &str) -> OverlayMode {
    match s {
        "partial_overlay" => OverlayMode::PartialOverlay,
        _ => OverlayMode::Sparse,
    }
}

fn status_to_str(status: ContextStatus) -> &'static str {
    match status {
        ContextStatus::Active => "active",
        ContextStatus::Expired => "expired",
    }
}

fn status_from_str(s: &str) -> ContextStatus {
    match s {
        "expired" => ContextStatus::Expired,
        _ => ContextStatus::Active,
    }
}

fn file_state_to_str(state: FileState) -> &'static str {
    match state {
        FileState::Added => "added",
        FileState::Modified => "modified",
        FileState::Renamed => "renamed",
        FileState::Deleted => "deleted",
    }
}

fn file_state_from_str(s: &str) -> FileState {
    match s {
        "added" => FileState::Added,
        "renamed" => FileState::Renamed,
        "deleted" => FileState::Deleted,
        _ => FileState::Modified,
    }
}

fn ref_kind_to_str(kind: ReferenceKind) -> &'static str {
    match kind {
        ReferenceKind::Call => "call",
        ReferenceKind::Read => "read",
        ReferenceKind::Write => "write",
        ReferenceKind::Addr => "addr",
        ReferenceKind::Other => "other",
    }
}

fn ref_kind_from_str(s: &str) -> ReferenceKind {
    match s {
        "call" => ReferenceKind::Call,
        "read" => ReferenceKind::Read,
        "write" => ReferenceKind::Write,
        "addr" => ReferenceKind::Addr,
        _ => ReferenceKind::Other,
    }
}

fn job_kind_to_str(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Index => "index",
        JobKind::RepoSync => "repo_sync",
    }
}

fn job_kind_from_str(s: &str) -> JobKind {
    match s {
        "repo_sync" => JobKind::RepoSync,
        _ => JobKind::Index,
    }
}

fn job_status_to_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "pending",
        JobStatus::Running => "running",
        JobStatus::Done => "done",
        JobStatus::Failed => "failed",
        JobStatus::DeadLetter => "dead_letter",
    }
}

fn job_status_from_str(s: &str) -> JobStatus {
    match s {
        "running" => JobStatus::Running,
        "done" => JobStatus::Done,
        "failed" => JobStatus::Failed,
        "dead_letter" => JobStatus::DeadLetter,
        _ => JobStatus::Pending,
    }
}

/// Builds `query MATCH "<escaped query>"` so the FTS5 `query` string is
/// always treated as a single literal phrase, regardless of punctuation.
fn fts_phrase(query: &str) -> String {
    format!("\"{}\"", query.replace('"', "\"\""))
}

#[async_trait]
impl StorageEngine for SqliteStorageEngine {
    async fn upsert_parse_payload(&self, payload: &ParsePayload) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::storage_with_source("begin upsert_parse_payload", e))?;

        let context_id = payload.context_id.as_str();
        let file_key = payload.file_key.as_str();

        sqlx::query("DELETE FROM tracked_files WHERE context_id = ? AND file_key = ?")
            .bind(context_id)
            .bind(file_key)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::storage_with_source("delete stale tracked_files row", e))?;
        sqlx::query(
            "INSERT INTO tracked_files
             (context_id, file_key, abs_path, content_hash, flags_hash, includes_hash, composite_hash, last_parsed_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(context_id)
        .bind(file_key)
        .bind(&payload.abs_path)
        .bind(&payload.content_hash)
        .bind(&payload.flags_hash)
        .bind(&payload.includes_hash)
        .bind(&payload.composite_hash)
        .bind(now_s())
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::storage_with_source("insert tracked_files row", e))?;

        for table in ["symbols", "symbol_references", "call_edges", "include_deps"] {
            sqlx::query(&format!(
                "DELETE FROM {table} WHERE context_id = ? AND file_key = ?"
            ))
            .bind(context_id)
            .bind(file_key)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::storage_with_source(format!("delete stale {table} rows"), e))?;
        }

        for symbol in &payload.symbols {
            sqlx::query(
                "INSERT INTO symbols (context_id, file_key, name, qualified_name, kind, line, col, extent_end_line)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(context_id)
            .bind(file_key)
            .bind(&symbol.name)
            .bind(&symbol.qualified_name)
            .bind(&symbol.kind)
            .bind(i64::from(symbol.line))
            .bind(i64::from(symbol.col))
            .bind(i64::from(symbol.extent_end_line))
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::storage_with_source("insert symbol row", e))?;
        }

        for reference in &payload.references {
            sqlx::query(
                "INSERT INTO symbol_references (context_id, file_key, symbol, line, col, ref_kind)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(context_id)
            .bind(file_key)
            .bind(&reference.symbol)
            .bind(i64::from(reference.line))
            .bind(i64::from(reference.col))
            .bind(ref_kind_to_str(reference.ref_kind))
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::storage_with_source("insert reference row", e))?;
        }

        for edge in &payload.call_edges {
            sqlx::query(
                "INSERT INTO call_edges (context_id, file_key, caller, callee, line)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(context_id)
            .bind(file_key)
            .bind(&edge.caller)
            .bind(&edge.callee)
            .bind(i64::from(edge.line))
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::storage_with_source("insert call_edge row", e))?;
        }

        for dep in &payload.include_deps {
            sqlx::query(
                "INSERT INTO include_deps (context_id, file_key, path, depth)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(context_id)
            .bind(file_key)
            .bind(&dep.path)
            .bind(i64::from(dep.depth))
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::storage_with_source("insert include_dep row", e))?;
        }

        sqlx::query("DELETE FROM recall_fts WHERE context_id = ? AND file_key = ?")
            .bind(context_id)
            .bind(file_key)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::storage_with_source("delete stale recall_fts row", e))?;
        sqlx::query("INSERT INTO recall_fts (context_id, file_key, body) VALUES (?, ?, ?)")
            .bind(context_id)
            .bind(file_key)
            .bind(String::from_utf8_lossy(&payload.file_bytes).into_owned())
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::storage_with_source("insert recall_fts row", e))?;

        tx.commit()
            .await
            .map_err(|e| Error::storage_with_source("commit upsert_parse_payload", e))?;
        Ok(())
    }

    async fn get_tracked_file(
        &self,
        context_id: &str,
        file_key: &FileKey,
    ) -> Result<Option<TrackedFile>> {
        let row = sqlx::query(
            "SELECT abs_path, content_hash, flags_hash, includes_hash, composite_hash, last_parsed_at
             FROM tracked_files WHERE context_id = ? AND file_key = ?",
        )
        .bind(context_id)
        .bind(file_key.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source("get_tracked_file", e))?;

        Ok(row.map(|row| TrackedFile {
            context_id: context_id.to_owned(),
            file_key: file_key.clone(),
            abs_path: row.get("abs_path"),
            content_hash: row.get("content_hash"),
            flags_hash: row.get("flags_hash"),
            includes_hash: row.get("includes_hash"),
            composite_hash: row.get("composite_hash"),
            last_parsed_at: row.get("last_parsed_at"),
        }))
    }

    async fn delete_tracked_file(&self, context_id: &str, file_key: &FileKey) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::storage_with_source("begin delete_tracked_file", e))?;
        let result = sqlx::query("DELETE FROM tracked_files WHERE context_id = ? AND file_key = ?")
            .bind(context_id)
            .bind(file_key.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::storage_with_source("delete tracked_files row", e))?;
        for table in [
            "symbols",
            "symbol_references",
            "call_edges",
            "include_deps",
            "recall_fts",
        ] {
            sqlx::query(&format!(
                "DELETE FROM {table} WHERE context_id = ? AND file_key = ?"
            ))
            .bind(context_id)
            .bind(file_key.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::storage_with_source(format!("delete {table} rows"), e))?;
        }
        tx.commit()
            .await
            .map_err(|e| Error::storage_with_source("commit delete_tracked_file", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_context(&self, context_id: &str) -> Result<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::storage_with_source("begin clear_context", e))?;
        let result = sqlx::query("DELETE FROM tracked_files WHERE context_id = ?")
            .bind(context_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::storage_with_source("delete tracked_files for context", e))?;
        for table in [
            "symbols",
            "symbol_references",
            "call_edges",
            "include_deps",
            "recall_fts",
            "context_file_states",
        ] {
            sqlx::query(&format!("DELETE FROM {table} WHERE context_id = ?"))
                .bind(context_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| Error::storage_with_source(format!("clear {table} for context"), e))?;
        }
        tx.commit()
            .await
            .map_err(|e| Error::storage_with_source("commit clear_context", e))?;
        Ok(result.rows_affected() as usize)
    }

    async fn search_symbols_by_name(
        &self,
        context_chain: &[String],
        name: &str,
        candidate_files: Option<&HashSet<FileKey>>,
        excluded: &HashSet<FileKey>,
    ) -> Result<Vec<Symbol>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for context_id in context_chain {
            let rows = sqlx::query(
                "SELECT file_key, name, qualified_name, kind, line, col, extent_end_line
                 FROM symbols WHERE context_id = ? AND (name = ? OR qualified_name = ?)",
            )
            .bind(context_id)
            .bind(name)
            .bind(name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source("search_symbols_by_name", e))?;

            for row in rows {
                let file_key = FileKey::parse(row.get::<String, _>("file_key").as_str())
                    .ok_or_else(|| Error::internal("malformed file_key in symbols row"))?;
                if excluded.contains(&file_key) {
                    continue;
                }
                if let Some(candidates) = candidate_files {
                    if !candidates.contains(&file_key) {
                        continue;
                    }
                }
                let symbol = Symbol {
                    file_key,
                    name: row.get("name"),
                    qualified_name: row.get("qualified_name"),
                    kind: row.get("kind"),
                    line: row.get::<i64, _>("line") as u32,
                    col: row.get::<i64, _>("col") as u32,
                    extent_end_line: row.get::<i64, _>("extent_end_line") as u32,
                };
                if seen.insert(symbol.dedup_key()) {
                    out.push(symbol);
                }
            }
        }
        Ok(out)
    }

    async fn search_references_by_symbol(
        &self,
        context_chain: &[String],
        symbol: &str,
        candidate_files: Option<&HashSet<FileKey>>,
        excluded: &HashSet<FileKey>,
    ) -> Result<Vec<SymbolReference>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for context_id in context_chain {
            let rows = sqlx::query(
                "SELECT file_key, symbol, line, col, ref_kind FROM symbol_references
                 WHERE context_id = ? AND symbol = ?",
            )
            .bind(context_id)
            .bind(symbol)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source("search_references_by_symbol", e))?;

            for row in rows {
                let file_key = FileKey::parse(row.get::<String, _>("file_key").as_str())
                    .ok_or_else(|| Error::internal("malformed file_key in symbol_references row"))?;
                if excluded.contains(&file_key) {
                    continue;
                }
                if let Some(candidates) = candidate_files {
                    if !candidates.contains(&file_key) {
                        continue;
                    }
                }
                let reference = SymbolReference {
                    file_key,
                    symbol: row.get("symbol"),
                    line: row.get::<i64, _>("line") as u32,
                    col: row.get::<i64, _>("col") as u32,
                    ref_kind: ref_kind_from_str(row.get::<String, _>("ref_kind").as_str()),
                };
                if seen.insert(reference.dedup_key()) {
                    out.push(reference);
                }
            }
        }
        Ok(out)
    }

    async fn call_edges_for(
        &self,
        context_chain: &[String],
        symbol: &str,
        direction: CallDirection,
        candidate_files: Option<&HashSet<FileKey>>,
        excluded: &HashSet<FileKey>,
    ) -> Result<Vec<CallEdge>> {
        let predicate = match direction {
            CallDirection::Callers => "callee = ?",
            CallDirection::Callees => "caller = ?",
            CallDirection::Both => "(caller = ? OR callee = ?)",
        };
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for context_id in context_chain {
            let sql = format!(
                "SELECT file_key, caller, callee, line FROM call_edges WHERE context_id = ? AND {predicate}"
            );
            let mut query = sqlx::query(&sql).bind(context_id).bind(symbol);
            if matches!(direction, CallDirection::Both) {
                query = query.bind(symbol);
            }
            let rows = query
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::storage_with_source("call_edges_for", e))?;

            for row in rows {
                let file_key = FileKey::parse(row.get::<String, _>("file_key").as_str())
                    .ok_or_else(|| Error::internal("malformed file_key in call_edges row"))?;
                if excluded.contains(&file_key) {
                    continue;
                }
                if let Some(candidates) = candidate_files {
                    if !candidates.contains(&file_key) {
                        continue;
                    }
                }
                let edge = CallEdge {
                    file_key,
                    caller: row.get("caller"),
                    callee: row.get("callee"),
                    line: row.get::<i64, _>("line") as u32,
                };
                if seen.insert(edge.dedup_key()) {
                    out.push(edge);
                }
            }
        }
        Ok(out)
    }

    async fn symbols_in_file(
        &self,
        context_chain: &[String],
        file_key: &FileKey,
        excluded: &HashSet<FileKey>,
    ) -> Result<Vec<Symbol>> {
        if excluded.contains(file_key) {
            return Ok(Vec::new());
        }
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for context_id in context_chain {
            let rows = sqlx::query(
                "SELECT name, qualified_name, kind, line, col, extent_end_line
                 FROM symbols WHERE context_id = ? AND file_key = ?",
            )
            .bind(context_id)
            .bind(file_key.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source("symbols_in_file", e))?;

            for row in rows {
                let symbol = Symbol {
                    file_key: file_key.clone(),
                    name: row.get("name"),
                    qualified_name: row.get("qualified_name"),
                    kind: row.get("kind"),
                    line: row.get::<i64, _>("line") as u32,
                    col: row.get::<i64, _>("col") as u32,
                    extent_end_line: row.get::<i64, _>("extent_end_line") as u32,
                };
                if seen.insert(symbol.dedup_key()) {
                    out.push(symbol);
                }
            }
        }
        Ok(out)
    }

    async fn search_recall_candidates(
        &self,
        context_id: &str,
        query: &str,
        repo_ids: &[String],
        max_files: usize,
    ) -> Result<Vec<FileKey>> {
        let phrase = fts_phrase(query);
        let rows = sqlx::query(
            "SELECT DISTINCT file_key FROM recall_fts WHERE context_id = ? AND recall_fts MATCH ?",
        )
        .bind(context_id)
        .bind(&phrase)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source("search_recall_candidates", e))?;

        let mut out = Vec::new();
        for row in rows {
            let raw: String = row.get("file_key");
            let Some(file_key) = FileKey::parse(&raw) else {
                continue;
            };
            if !repo_ids.is_empty() && !repo_ids.iter().any(|r| r == file_key.repo_id()) {
                continue;
            }
            out.push(file_key);
            if out.len() >= max_files {
                break;
            }
        }
        Ok(out)
    }

    async fn ensure_baseline_context(&self, workspace_id: &str) -> Result<String> {
        let existing = sqlx::query(
            "SELECT context_id FROM contexts WHERE workspace_id = ? AND mode = 'baseline'",
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source("ensure_baseline_context lookup", e))?;
        if let Some(row) = existing {
            return Ok(row.get("context_id"));
        }

        let context_id = format!("{workspace_id}-baseline");
        let now = now_s();
        sqlx::query(
            "INSERT INTO contexts
             (context_id, workspace_id, mode, base_context_id, overlay_mode, status, last_accessed_at)
             VALUES (?, ?, 'baseline', NULL, 'sparse', 'active', ?)",
        )
        .bind(&context_id)
        .bind(workspace_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source("insert baseline context", e))?;
        Ok(context_id)
    }

    async fn create_overlay(
        &self,
        workspace_id: &str,
        base_context_id: &str,
        explicit_id: Option<&str>,
    ) -> Result<AnalysisContext> {
        let base = self.get_context(base_context_id).await?.ok_or_else(|| {
            Error::invalid_argument(format!("base context '{base_context_id}' does not exist"))
        })?;
        if base.mode != ContextMode::Baseline || !base.is_active() {
            return Err(Error::invalid_argument(format!(
                "'{base_context_id}' is not an active baseline context"
            )));
        }

        let context_id = explicit_id
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("ovl-{}", uuid::Uuid::new_v4()));
        let now = now_s();
        sqlx::query(
            "INSERT INTO contexts
             (context_id, workspace_id, mode, base_context_id, overlay_mode, status, last_accessed_at)
             VALUES (?, ?, 'pr', ?, 'sparse', 'active', ?)",
        )
        .bind(&context_id)
        .bind(workspace_id)
        .bind(base_context_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source("insert overlay context", e))?;

        Ok(AnalysisContext {
            context_id,
            workspace_id: workspace_id.to_owned(),
            mode: ContextMode::Pr,
            base_context_id: Some(base_context_id.to_owned()),
            overlay_mode: OverlayMode::Sparse,
            overlay_file_count: 0,
            overlay_row_count: 0,
            status: ContextStatus::Active,
            last_accessed_at: now,
            expires_at: None,
        })
    }

    async fn get_context(&self, context_id: &str) -> Result<Option<AnalysisContext>> {
        let row = sqlx::query(
            "SELECT context_id, workspace_id, mode, base_context_id, overlay_mode,
                    overlay_file_count, overlay_row_count, status, last_accessed_at, expires_at
             FROM contexts WHERE context_id = ?",
        )
        .bind(context_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source("get_context", e))?;

        Ok(row.map(|row| AnalysisContext {
            context_id: row.get("context_id"),
            workspace_id: row.get("workspace_id"),
            mode: mode_from_str(row.get::<String, _>("mode").as_str()),
            base_context_id: row.get("base_context_id"),
            overlay_mode: overlay_mode_from_str(row.get::<String, _>("overlay_mode").as_str()),
            overlay_file_count: row.get::<i64, _>("overlay_file_count") as u64,
            overlay_row_count: row.get::<i64, _>("overlay_row_count") as u64,
            status: status_from_str(row.get::<String, _>("status").as_str()),
            last_accessed_at: row.get("last_accessed_at"),
            expires_at: row.get("expires_at"),
        }))
    }

    async fn expire_context(&self, context_id: &str) -> Result<()> {
        sqlx::query("UPDATE contexts SET status = 'expired' WHERE context_id = ?")
            .bind(context_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source("expire_context", e))?;
        Ok(())
    }

    async fn touch_context(&self, context_id: &str) -> Result<()> {
        sqlx::query("UPDATE contexts SET last_accessed_at = ? WHERE context_id = ?")
            .bind(now_s())
            .bind(context_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source("touch_context", e))?;
        Ok(())
    }

    async fn update_context_overlay_stats(
        &self,
        context_id: &str,
        file_delta: i64,
        row_delta: i64,
        max_overlay_files: u64,
        max_overlay_rows: u64,
    ) -> Result<OverlayMode> {
        let row = sqlx::query(
            "SELECT mode, overlay_mode, overlay_file_count, overlay_row_count
             FROM contexts WHERE context_id = ?",
        )
        .bind(context_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source("update_context_overlay_stats lookup", e))?
        .ok_or_else(|| Error::not_found(format!("context '{context_id}'")))?;

        if mode_from_str(row.get::<String, _>("mode").as_str()) == ContextMode::Baseline {
            return Ok(OverlayMode::Sparse);
        }

        let new_files = (row.get::<i64, _>("overlay_file_count") + file_delta).max(0) as u64;
        let new_rows = (row.get::<i64, _>("overlay_row_count") + row_delta).max(0) as u64;
        let current_mode = overlay_mode_from_str(row.get::<String, _>("overlay_mode").as_str());
        let new_mode = current_mode.escalate(new_files, new_rows, max_overlay_files, max_overlay_rows);

        sqlx::query(
            "UPDATE contexts SET overlay_file_count = ?, overlay_row_count = ?, overlay_mode = ?
             WHERE context_id = ?",
        )
        .bind(new_files as i64)
        .bind(new_rows as i64)
        .bind(overlay_mode_to_str(new_mode))
        .bind(context_id)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source("update_context_overlay_stats write", e))?;
        Ok(new_mode)
    }

    async fn list_active_contexts(&self, workspace_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT context_id FROM contexts WHERE workspace_id = ? AND status = 'active'",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source("list_active_contexts", e))?;
        Ok(rows.into_iter().map(|row| row.get("context_id")).collect())
    }

    async fn list_context_file_states(&self, context_id: &str) -> Result<Vec<ContextFileState>> {
        let rows = sqlx::query(
            "SELECT file_key, state, replaced_from_file_key FROM context_file_states WHERE context_id = ?",
        )
        .bind(context_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source("list_context_file_states", e))?;

        rows.into_iter()
            .map(|row| {
                let file_key = FileKey::parse(row.get::<String, _>("file_key").as_str())
                    .ok_or_else(|| Error::internal("malformed file_key in context_file_states row"))?;
                let replaced_from_file_key = row
                    .get::<Option<String>, _>("replaced_from_file_key")
                    .and_then(|raw| FileKey::parse(&raw));
                Ok(ContextFileState {
                    context_id: context_id.to_owned(),
                    file_key,
                    state: file_state_from_str(row.get::<String, _>("state").as_str()),
                    replaced_from_file_key,
                })
            })
            .collect()
    }

    async fn upsert_context_file_state(&self, state: &ContextFileState) -> Result<()> {
        sqlx::query(
            "INSERT INTO context_file_states (context_id, file_key, state, replaced_from_file_key)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(context_id, file_key) DO UPDATE SET
               state = excluded.state,
               replaced_from_file_key = excluded.replaced_from_file_key",
        )
        .bind(&state.context_id)
        .bind(state.file_key.as_str())
        .bind(file_state_to_str(state.state))
        .bind(state.replaced_from_file_key.as_ref().map(FileKey::as_str))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source("upsert_context_file_state", e))?;
        Ok(())
    }

    async fn upsert_workspace(
        &self,
        workspace_id: &str,
        root_path: &str,
        manifest_path: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO workspaces (workspace_id, root_path, manifest_path) VALUES (?, ?, ?)
             ON CONFLICT(workspace_id) DO UPDATE SET
               root_path = excluded.root_path,
               manifest_path = excluded.manifest_path",
        )
        .bind(workspace_id)
        .bind(root_path)
        .bind(manifest_path)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source("upsert_workspace", e))?;
        Ok(())
    }

    async fn get_workspace(&self, workspace_id: &str) -> Result<Option<(String, String)>> {
        let row = sqlx::query("SELECT root_path, manifest_path FROM workspaces WHERE workspace_id = ?")
            .bind(workspace_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source("get_workspace", e))?;
        Ok(row.map(|row| (row.get("root_path"), row.get("manifest_path"))))
    }

    async fn enqueue_job(
        &self,
        kind: JobKind,
        workspace_id: &str,
        repo_id: Option<&str>,
        payload: &str,
        max_attempts: u32,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO jobs (kind, workspace_id, repo_id, payload, status, attempts, max_attempts, created_at)
             VALUES (?, ?, ?, ?, 'pending', 0, ?, ?)",
        )
        .bind(job_kind_to_str(kind))
        .bind(workspace_id)
        .bind(repo_id)
        .bind(payload)
        .bind(i64::from(max_attempts))
        .bind(now_s())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source("enqueue_job", e))?;
        Ok(result.last_insert_rowid())
    }

    async fn lease_next_job(&self, kind: JobKind) -> Result<Option<Job>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::storage_with_source("begin lease_next_job", e))?;

        let row = sqlx::query(
            "SELECT id FROM jobs WHERE kind = ? AND status = 'pending' ORDER BY created_at ASC LIMIT 1",
        )
        .bind(job_kind_to_str(kind))
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| Error::storage_with_source("lease_next_job lookup", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| Error::storage_with_source("rollback empty lease_next_job", e))?;
            return Ok(None);
        };
        let job_id: i64 = row.get("id");
        let now = now_s();

        sqlx::query(
            "UPDATE jobs SET status = 'running', attempts = attempts + 1, leased_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(job_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::storage_with_source("lease_next_job update", e))?;

        let row = sqlx::query(
            "SELECT id, kind, workspace_id, repo_id, payload, status, attempts, max_attempts, created_at, leased_at
             FROM jobs WHERE id = ?",
        )
        .bind(job_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Error::storage_with_source("lease_next_job reselect", e))?;

        tx.commit()
            .await
            .map_err(|e| Error::storage_with_source("commit lease_next_job", e))?;

        Ok(Some(Job {
            id: row.get("id"),
            kind: job_kind_from_str(row.get::<String, _>("kind").as_str()),
            workspace_id: row.get("workspace_id"),
            repo_id: row.get("repo_id"),
            payload: row.get("payload"),
            status: job_status_from_str(row.get::<String, _>("status").as_str()),
            attempts: row.get::<i64, _>("attempts") as u32,
            max_attempts: row.get::<i64, _>("max_attempts") as u32,
            created_at: row.get("created_at"),
            leased_at: row.get("leased_at"),
        }))
    }

    async fn mark_job_done(&self, job_id: i64) -> Result<()> {
        sqlx::query("UPDATE jobs SET status = 'done' WHERE id = ?")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source("mark_job_done", e))?;
        Ok(())
    }

    async fn mark_job_failed(&self, job_id: i64, dead_letter: bool) -> Result<()> {
        let status = if dead_letter {
            job_status_to_str(JobStatus::DeadLetter)
        } else {
            job_status_to_str(JobStatus::Failed)
        };
        sqlx::query("UPDATE jobs SET status = ? WHERE id = ?")
            .bind(status)
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source("mark_job_failed", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cxxcache_domain::ports::ParsePayload;

    async fn test_engine() -> SqliteStorageEngine {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool");
        apply_schema(&pool).await.expect("apply schema");
        SqliteStorageEngine::new(pool)
    }

    fn payload(context_id: &str, file_key: &FileKey) -> ParsePayload {
        ParsePayload {
            context_id: context_id.to_owned(),
            file_key: file_key.clone(),
            abs_path: "/abs/a.cpp".to_owned(),
            content_hash: "c1".to_owned(),
            flags_hash: "f1".to_owned(),
            includes_hash: "i1".to_owned(),
            composite_hash: "comp1".to_owned(),
            file_bytes: b"int doLogin() { return 0; }".to_vec(),
            symbols: vec![Symbol {
                file_key: file_key.clone(),
                name: "doLogin".to_owned(),
                qualified_name: "doLogin".to_owned(),
                kind: "function".to_owned(),
                line: 1,
                col: 0,
                extent_end_line: 1,
            }],
            references: vec![],
            call_edges: vec![],
            include_deps: vec![],
        }
    }

    #[tokio::test]
    async fn upsert_then_get_tracked_file_round_trips() {
        let engine = test_engine().await;
        let file_key = FileKey::new("repoA", "a.cpp");
        engine
            .upsert_parse_payload(&payload("ctx1", &file_key))
            .await
            .unwrap();
        let tracked = engine.get_tracked_file("ctx1", &file_key).await.unwrap();
        assert_eq!(tracked.unwrap().composite_hash, "comp1");
    }

    #[tokio::test]
    async fn search_symbols_by_name_finds_inserted_symbol() {
        let engine = test_engine().await;
        let file_key = FileKey::new("repoA", "a.cpp");
        engine
            .upsert_parse_payload(&payload("ctx1", &file_key))
            .await
            .unwrap();
        let symbols = engine
            .search_symbols_by_name(&["ctx1".to_owned()], "doLogin", None, &HashSet::new())
            .await
            .unwrap();
        assert_eq!(symbols.len(), 1);
    }

    #[tokio::test]
    async fn search_recall_candidates_matches_file_content() {
        let engine = test_engine().await;
        let file_key = FileKey::new("repoA", "a.cpp");
        engine
            .upsert_parse_payload(&payload("ctx1", &file_key))
            .await
            .unwrap();
        let hits = engine
            .search_recall_candidates("ctx1", "doLogin", &[], 10)
            .await
            .unwrap();
        assert_eq!(hits, vec![file_key]);
    }

    #[tokio::test]
    async fn ensure_baseline_context_is_idempotent() {
        let engine = test_engine().await;
        let first = engine.ensure_baseline_context("ws1").await.unwrap();
        let second = engine.ensure_baseline_context("ws1").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn overlay_stats_escalate_past_ceiling() {
        let engine = test_engine().await;
        let baseline = engine.ensure_baseline_context("ws1").await.unwrap();
        let overlay = engine
            .create_overlay("ws1", &baseline, None)
            .await
            .unwrap();
        let mode = engine
            .update_context_overlay_stats(&overlay.context_id, 10_000, 0, 100, 100_000)
            .await
            .unwrap();
        assert_eq!(mode, OverlayMode::PartialOverlay);
    }

    #[tokio::test]
    async fn delete_tracked_file_removes_derived_rows() {
        let engine = test_engine().await;
        let file_key = FileKey::new("repoA", "a.cpp");
        engine
            .upsert_parse_payload(&payload("ctx1", &file_key))
            .await
            .unwrap();
        assert!(engine.delete_tracked_file("ctx1", &file_key).await.unwrap());
        let symbols = engine
            .search_symbols_by_name(&["ctx1".to_owned()], "doLogin", None, &HashSet::new())
            .await
            .unwrap();
        assert!(symbols.is_empty());
    }

    #[tokio::test]
    async fn job_lease_cycle_marks_running_then_done() {
        let engine = test_engine().await;
        let job_id = engine
            .enqueue_job(JobKind::Index, "ws1", None, "{}", 3)
            .await
            .unwrap();
        let job = engine.lease_next_job(JobKind::Index).await.unwrap().unwrap();
        assert_eq!(job.id, job_id);
        assert_eq!(job.attempts, 1);
        assert!(engine.lease_next_job(JobKind::Index).await.unwrap().is_none());
        engine.mark_job_done(job_id).await.unwrap();
    }
}
