//! Top-level command dispatch shared by `main` and the integration tests.

use cxxcache_domain::model::JobKind;
use cxxcache_domain::ports::StorageEngine;
use cxxcache_infrastructure::load_settings;

use crate::cli::{Cli, Commands};
use crate::composition;

/// Runs the parsed CLI: loads configuration, then dispatches to the
/// matched subcommand.
///
/// # Errors
/// Propagates configuration loading, database, or orchestrator failures.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve => serve(&settings).await,
        Commands::Index { workspace_id, payload } => index(&settings, &workspace_id, &payload).await,
        Commands::Invalidate { context_id, file_keys } => invalidate(&settings, &context_id, &file_keys).await,
    }
}

async fn serve(settings: &cxxcache_infrastructure::Settings) -> anyhow::Result<()> {
    let app = composition::build(settings).await?;
    app.writer.start().await;
    app.sync_workers.start();

    tracing::info!("cxxcache MCP server starting on stdio");
    let server = cxxcache_server::CxxCacheServer::new(app.orchestrator);
    let running = rmcp::ServiceExt::serve(server, rmcp::transport::stdio()).await?;
    running.waiting().await?;

    app.sync_workers.stop().await;
    app.writer.stop().await;
    Ok(())
}

async fn index(settings: &cxxcache_infrastructure::Settings, workspace_id: &str, payload: &str) -> anyhow::Result<()> {
    let app = composition::build(settings).await?;
    let job_id = app
        .storage
        .enqueue_job(JobKind::Index, workspace_id, None, payload, 3)
        .await?;
    println!("enqueued index job {job_id} for workspace '{workspace_id}'");
    Ok(())
}

async fn invalidate(
    settings: &cxxcache_infrastructure::Settings,
    context_id: &str,
    file_keys: &[String],
) -> anyhow::Result<()> {
    use cxxcache_application::InvalidateTarget;
    use cxxcache_domain::model::FileKey;

    let app = composition::build(settings).await?;
    let target = if file_keys.is_empty() {
        InvalidateTarget::Context(context_id.to_owned())
    } else {
        let mut parsed = Vec::with_capacity(file_keys.len());
        for raw in file_keys {
            let key = FileKey::parse(raw)
                .ok_or_else(|| anyhow::anyhow!("'{raw}' is not a valid \"repoId:relPath\" file-key"))?;
            parsed.push(key);
        }
        InvalidateTarget::Files {
            context_id: context_id.to_owned(),
            file_keys: parsed,
        }
    };

    let resp = app.orchestrator.invalidate_cache(target).await?;
    println!("removed {} tracked file(s)", resp.removed_count);
    Ok(())
}
