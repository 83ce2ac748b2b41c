//! Tool-dispatch tests against a real (in-memory/tempdir-backed)
//! orchestrator: no mocks, exercising the actual translation from MCP
//! request JSON through to a serialized tool response.

use std::sync::Arc;
use std::time::Duration;

use rmcp::handler::server::tool::Parameters;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use cxxcache_application::{Orchestrator, OrchestratorConfig};
use cxxcache_domain::ports::{ManifestLoader, ParserPool, RecallEngine, SingleWriter, StorageEngine};
use cxxcache_infrastructure::{
    CppExtractorParserPool, RipgrepRecallEngine, SqliteSingleWriter, SqliteStorageEngine, WriterConfig,
    YamlManifestLoader,
};
use cxxcache_server::args::{RegisterWorkspaceArgs, WorkspaceInfoArgs};
use cxxcache_server::CxxCacheServer;

async fn in_memory_pool() -> sqlx::SqlitePool {
    let options = SqliteConnectOptions::new().filename(":memory:").create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(1).connect_with(options).await.unwrap();
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await.unwrap();
    for stmt in cxxcache_infrastructure::storage::schema::ddl_statements() {
        sqlx::query(stmt).execute(&pool).await.unwrap();
    }
    pool
}

async fn build_server() -> (CxxCacheServer, tempfile::TempDir) {
    let pool = in_memory_pool().await;
    let storage: Arc<dyn StorageEngine> = Arc::new(SqliteStorageEngine::new(pool.clone()));
    let recall: Arc<dyn RecallEngine> =
        Arc::new(RipgrepRecallEngine::new("cxxcache-nonexistent-rg", Duration::from_secs(1)));
    let parser: Arc<dyn ParserPool> = Arc::new(CppExtractorParserPool::new(
        "cxxcache-nonexistent-extractor",
        Duration::from_secs(1),
        pool,
    ));
    let manifest_loader: Arc<dyn ManifestLoader> = Arc::new(YamlManifestLoader);
    let writer: Arc<dyn SingleWriter> = Arc::new(SqliteSingleWriter::new(Arc::clone(&storage), WriterConfig::default()));
    writer.start().await;

    let orchestrator = Arc::new(Orchestrator::new(
        storage,
        recall,
        parser,
        writer,
        manifest_loader,
        OrchestratorConfig {
            max_recall_files: 50,
            max_parse_workers: 2,
            parse_timeout: Duration::from_secs(1),
            max_repo_hops: 4,
        },
    ));

    let dir = tempfile::tempdir().unwrap();
    (CxxCacheServer::new(orchestrator), dir)
}

fn write_manifest(dir: &std::path::Path) -> String {
    let path = dir.join("workspace.yaml");
    std::fs::write(
        &path,
        "workspace_id: ws1\nrepos:\n  - repo_id: repoA\n    root: repoA\n    default_branch: main\n",
    )
    .unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn register_workspace_then_get_info_round_trips() {
    let (server, dir) = build_server().await;
    let manifest_path = write_manifest(dir.path());

    let register = server
        .register_workspace(Parameters(RegisterWorkspaceArgs {
            workspace_id: "ws1".to_owned(),
            root_path: dir.path().to_string_lossy().into_owned(),
            manifest_path,
        }))
        .await
        .expect("register_workspace should succeed");
    assert!(!register.is_error.unwrap_or(false));

    let info = server
        .get_workspace_info(Parameters(WorkspaceInfoArgs {
            workspace_id: "ws1".to_owned(),
        }))
        .await
        .expect("get_workspace_info should succeed");
    assert!(!info.is_error.unwrap_or(false));
}

#[tokio::test]
async fn get_workspace_info_on_unknown_workspace_reports_no_active_contexts() {
    let (server, _dir) = build_server().await;
    let result = server
        .get_workspace_info(Parameters(WorkspaceInfoArgs {
            workspace_id: "never-registered".to_owned(),
        }))
        .await
        .expect("get_workspace_info should succeed even for an unregistered workspace");
    assert!(!result.is_error.unwrap_or(false));
}
