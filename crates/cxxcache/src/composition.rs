//! Composition root: wires concrete infrastructure adapters into the
//! application layer behind domain port trait objects.

use std::sync::Arc;
use std::time::Duration;

use cxxcache_application::{Orchestrator, OrchestratorConfig};
use cxxcache_domain::ports::{ManifestLoader, ParserPool, RecallEngine, SingleWriter, StorageEngine};
use cxxcache_domain::Result;
use cxxcache_infrastructure::{
    connect_and_init, CppExtractorParserPool, RepoSyncWorkerPool, RipgrepRecallEngine, Settings,
    SqliteSingleWriter, SqliteStorageEngine, SyncWorkerConfig, WriterConfig, YamlManifestLoader,
};

/// Every long-lived component the binary holds onto: the orchestrator for
/// MCP/CLI query dispatch, the single-writer (needs an explicit `start`/
/// `stop`), and the repo-sync worker pool (same).
pub struct Application {
    /// Composed use-case orchestrator, ready for query/registration calls.
    pub orchestrator: Arc<Orchestrator>,
    /// The single-writer persistence worker. Caller starts/stops it.
    pub writer: Arc<dyn SingleWriter>,
    /// The repo-sync job worker pool. Caller starts/stops it.
    pub sync_workers: Arc<RepoSyncWorkerPool>,
    /// The underlying storage engine, for CLI subcommands that bypass the
    /// orchestrator (e.g. `index` job enqueueing).
    pub storage: Arc<dyn StorageEngine>,
}

/// Builds every adapter and wires them into an [`Orchestrator`], per
/// `settings`. Does not start the single-writer or the sync worker pool;
/// callers decide the process's lifecycle (e.g. `serve` starts both,
/// `invalidate` needs neither).
///
/// # Errors
/// Propagates a database-connection or schema-migration failure.
pub async fn build(settings: &Settings) -> Result<Application> {
    let pool = connect_and_init(std::path::Path::new(&settings.db_path)).await?;
    let storage: Arc<dyn StorageEngine> = Arc::new(SqliteStorageEngine::new(pool.clone()));

    let recall: Arc<dyn RecallEngine> = Arc::new(RipgrepRecallEngine::new(
        settings.rg_binary.clone(),
        Duration::from_secs(settings.recall_timeout_s),
    ));

    let parser: Arc<dyn ParserPool> = Arc::new(CppExtractorParserPool::new(
        settings.extractor_binary.clone(),
        Duration::from_secs(settings.parse_timeout_s),
        pool,
    ));

    let manifest_loader: Arc<dyn ManifestLoader> = Arc::new(YamlManifestLoader);

    let writer: Arc<dyn SingleWriter> = Arc::new(SqliteSingleWriter::new(
        Arc::clone(&storage),
        WriterConfig {
            queue_size: settings.writer_queue_size,
            batch_size: settings.writer_batch_size,
            retry_attempts: settings.writer_retry_attempts,
            retry_delay: Duration::from_millis(settings.writer_retry_delay_ms),
            max_overlay_files: settings.max_overlay_files,
            max_overlay_rows: settings.max_overlay_rows,
        },
    ));

    let sync_workers = Arc::new(RepoSyncWorkerPool::new(
        Arc::clone(&storage),
        Arc::clone(&manifest_loader),
        SyncWorkerConfig {
            worker_count: settings.git_sync_worker_count,
            git_timeout: Duration::from_secs(settings.parse_timeout_s),
            max_attempts: settings.git_sync_retry_attempts,
        },
    ));

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&storage),
        recall,
        parser,
        Arc::clone(&writer),
        manifest_loader,
        OrchestratorConfig {
            max_recall_files: settings.max_recall_files,
            max_parse_workers: settings.max_parse_workers,
            parse_timeout: Duration::from_secs(settings.parse_timeout_s),
            max_repo_hops: 8,
        },
    ));

    Ok(Application {
        orchestrator,
        writer,
        sync_workers,
        storage,
    })
}
