//! Schema DDL and `user_version`-tracked migrations for the embedded SQLite store.

/// Bump when a DDL statement below changes the schema shape.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Statements applied, in order, to bring a fresh database to
/// [`CURRENT_SCHEMA_VERSION`]. Idempotent (`IF NOT EXISTS` throughout) so
/// re-applying against an up-to-date database is a no-op.
pub fn ddl_statements() -> Vec<&'static str> {
    vec![
        "CREATE TABLE IF NOT EXISTS workspaces (
            workspace_id TEXT PRIMARY KEY,
            root_path TEXT NOT NULL,
            manifest_path TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS contexts (
            context_id TEXT PRIMARY KEY,
            workspace_id TEXT NOT NULL,
            mode TEXT NOT NULL,
            base_context_id TEXT,
            overlay_mode TEXT NOT NULL,
            overlay_file_count INTEGER NOT NULL DEFAULT 0,
            overlay_row_count INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL,
            last_accessed_at INTEGER NOT NULL,
            expires_at INTEGER
        )",
        "CREATE INDEX IF NOT EXISTS idx_contexts_workspace ON contexts (workspace_id, status)",
        "CREATE TABLE IF NOT EXISTS tracked_files (
            context_id TEXT NOT NULL,
            file_key TEXT NOT NULL,
            abs_path TEXT NOT NULL,
            content_hash TEXT NOT NULL,
            flags_hash TEXT NOT NULL,
            includes_hash TEXT NOT NULL,
            composite_hash TEXT NOT NULL,
            last_parsed_at INTEGER NOT NULL,
            PRIMARY KEY (context_id, file_key)
        )",
        "CREATE TABLE IF NOT EXISTS symbols (
            context_id TEXT NOT NULL,
            file_key TEXT NOT NULL,
            name TEXT NOT NULL,
            qualified_name TEXT NOT NULL,
            kind TEXT NOT NULL,
            line INTEGER NOT NULL,
            col INTEGER NOT NULL,
            extent_end_line INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_symbols_lookup ON symbols (context_id, name)",
        "CREATE INDEX IF NOT EXISTS idx_symbols_qualified ON symbols (context_id, qualified_name)",
        "CREATE INDEX IF NOT EXISTS idx_symbols_file ON symbols (context_id, file_key)",
        "CREATE TABLE IF NOT EXISTS symbol_references (
            context_id TEXT NOT NULL,
            file_key TEXT NOT NULL,
            symbol TEXT NOT NULL,
            line INTEGER NOT NULL,
            col INTEGER NOT NULL,
            ref_kind TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_references_symbol ON symbol_references (context_id, symbol)",
        "CREATE TABLE IF NOT EXISTS call_edges (
            context_id TEXT NOT NULL,
            file_key TEXT NOT NULL,
            caller TEXT NOT NULL,
            callee TEXT NOT NULL,
            line INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_call_edges_caller ON call_edges (context_id, caller)",
        "CREATE INDEX IF NOT EXISTS idx_call_edges_callee ON call_edges (context_id, callee)",
        "CREATE TABLE IF NOT EXISTS include_deps (
            context_id TEXT NOT NULL,
            file_key TEXT NOT NULL,
            path TEXT NOT NULL,
            depth INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_include_deps_file ON include_deps (context_id, file_key)",
        "CREATE TABLE IF NOT EXISTS context_file_states (
            context_id TEXT NOT NULL,
            file_key TEXT NOT NULL,
            state TEXT NOT NULL,
            replaced_from_file_key TEXT,
            PRIMARY KEY (context_id, file_key)
        )",
        "CREATE TABLE IF NOT EXISTS parse_runs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            context_id TEXT NOT NULL,
            file_key TEXT NOT NULL,
            abs_path TEXT NOT NULL,
            started_at_ms INTEGER NOT NULL,
            finished_at_ms INTEGER,
            success INTEGER NOT NULL,
            error_msg TEXT
        )",
        "CREATE INDEX IF NOT EXISTS idx_parse_runs_file ON parse_runs (context_id, file_key)",
        "CREATE TABLE IF NOT EXISTS jobs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            kind TEXT NOT NULL,
            workspace_id TEXT NOT NULL,
            repo_id TEXT,
            payload TEXT NOT NULL,
            status TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            max_attempts INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            leased_at INTEGER
        )",
        "CREATE INDEX IF NOT EXISTS idx_jobs_lease ON jobs (kind, status, created_at)",
        "CREATE VIRTUAL TABLE IF NOT EXISTS recall_fts USING fts5(
            context_id UNINDEXED,
            file_key UNINDEXED,
            body
        )",
    ]
}
