//! Repo-sync job worker pool: checks out a workspace repo to its pinned
//! commit SHA over HTTPS, folding the git plumbing directly into the
//! worker loop (no separate sync-state table or service layer).

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cxxcache_domain::model::{Job, JobKind, RepoManifest};
use cxxcache_domain::ports::{ManifestLoader, StorageEngine};
use cxxcache_domain::{error, info, warn};
use tokio::process::Command;
use tokio::task::JoinHandle;

/// Tuning knobs for [`RepoSyncWorkerPool`].
#[derive(Debug, Clone, Copy)]
pub struct SyncWorkerConfig {
    /// Number of concurrent worker loops.
    pub worker_count: usize,
    /// Per-subprocess timeout.
    pub git_timeout: Duration,
    /// Retry budget recorded on each enqueued job (dead-lettered past this).
    pub max_attempts: u32,
}

impl Default for SyncWorkerConfig {
    fn default() -> Self {
        Self {
            worker_count: 2,
            git_timeout: Duration::from_secs(120),
            max_attempts: 3,
        }
    }
}

/// Polls the `repo_sync` job queue and executes each job's checkout.
pub struct RepoSyncWorkerPool {
    storage: Arc<dyn StorageEngine>,
    manifest_loader: Arc<dyn ManifestLoader>,
    config: SyncWorkerConfig,
    running: Arc<AtomicBool>,
    handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl RepoSyncWorkerPool {
    /// Builds a pool over `storage` (job leasing) and `manifest_loader`
    /// (workspace repo topology), not yet started.
    #[must_use]
    pub fn new(
        storage: Arc<dyn StorageEngine>,
        manifest_loader: Arc<dyn ManifestLoader>,
        config: SyncWorkerConfig,
    ) -> Self {
        Self {
            storage,
            manifest_loader,
            config,
            running: Arc::new(AtomicBool::new(false)),
            handles: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Spawns `config.worker_count` poll loops. A second call is a no-op.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut handles = self.handles.lock().unwrap();
        for worker_id in 0..self.config.worker_count.max(1) {
            let storage = Arc::clone(&self.storage);
            let manifest_loader = Arc::clone(&self.manifest_loader);
            let config = self.config;
            let running = Arc::clone(&self.running);
            handles.push(tokio::spawn(worker_loop(
                worker_id,
                storage,
                manifest_loader,
                config,
                running,
            )));
        }
    }

    /// Signals all worker loops to stop after their current job, and
    /// aborts them once they've had a chance to exit cleanly.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let handles = std::mem::take(&mut *self.handles.lock().unwrap());
        for handle in handles {
            handle.abort();
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    storage: Arc<dyn StorageEngine>,
    manifest_loader: Arc<dyn ManifestLoader>,
    config: SyncWorkerConfig,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        match storage.lease_next_job(JobKind::RepoSync).await {
            Ok(Some(job)) => {
                process_job(worker_id, &job, &storage, &manifest_loader, &config).await;
            }
            Ok(None) => tokio::time::sleep(Duration::from_millis(200)).await,
            Err(err) => {
                error!("sync_worker", &format!("worker {worker_id}: lease failed: {err}"));
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
        }
    }
}

async fn process_job(
    worker_id: usize,
    job: &Job,
    storage: &Arc<dyn StorageEngine>,
    manifest_loader: &Arc<dyn ManifestLoader>,
    config: &SyncWorkerConfig,
) {
    let Some(repo_id) = &job.repo_id else {
        fail_job(storage, job, config, "repo_id missing from repo_sync job").await;
        return;
    };

    let result = run_checkout(storage, manifest_loader, &job.workspace_id, repo_id, config).await;
    match result {
        Ok(resolved_sha) => {
            info!(
                "sync_worker",
                &format!(
                    "worker {worker_id}: synced workspace={} repo={repo_id} sha={resolved_sha}",
                    job.workspace_id
                )
            );
            if let Err(err) = storage.mark_job_done(job.id).await {
                error!("sync_worker", &format!("mark_job_done failed: {err}"));
            }
        }
        Err(message) => {
            warn!(
                "sync_worker",
                &format!(
                    "worker {worker_id}: sync failed workspace={} repo={repo_id}: {message}",
                    job.workspace_id
                )
            );
            fail_job(storage, job, config, &message).await;
        }
    }
}

async fn fail_job(storage: &Arc<dyn StorageEngine>, job: &Job, config: &SyncWorkerConfig, _reason: &str) {
    let dead_letter = job.attempts + 1 >= config.max_attempts;
    if let Err(err) = storage.mark_job_failed(job.id, dead_letter).await {
        error!("sync_worker", &format!("mark_job_failed failed: {err}"));
    }
}

async fn run_checkout(
    storage: &Arc<dyn StorageEngine>,
    manifest_loader: &Arc<dyn ManifestLoader>,
    workspace_id: &str,
    repo_id: &str,
    config: &SyncWorkerConfig,
) -> std::result::Result<String, String> {
    let Some((root_path, manifest_path)) = storage
        .get_workspace(workspace_id)
        .await
        .map_err(|e| e.to_string())?
    else {
        return Err(format!("workspace '{workspace_id}' is not registered"));
    };

    let manifest = manifest_loader
        .load(&manifest_path)
        .await
        .map_err(|e| e.to_string())?;

    let repo_cfg = manifest
        .repo(repo_id)
        .ok_or_else(|| format!("repo '{repo_id}' not found in workspace manifest"))?;

    let remote_url = repo_cfg
        .remote_url
        .as_deref()
        .ok_or_else(|| format!("repo '{repo_id}' has no remote_url configured"))?;
    let commit_sha = repo_cfg
        .commit_sha
        .as_deref()
        .ok_or_else(|| format!("repo '{repo_id}' has no pinned commit_sha"))?;
    let token = resolve_token(repo_cfg)?;

    let repo_dir = std::path::Path::new(&root_path).join(&repo_cfg.root);
    sync_to_commit(remote_url, &token, commit_sha, &repo_dir, config.git_timeout).await?;
    Ok(commit_sha.to_owned())
}

fn resolve_token(repo_cfg: &RepoManifest) -> std::result::Result<String, String> {
    let var = repo_cfg
        .token_env_var
        .as_deref()
        .ok_or_else(|| format!("repo '{}' has no token_env_var configured", repo_cfg.repo_id))?;
    std::env::var(var).map_err(|_| format!("environment variable '{var}' is not set"))
}

async fn run_git(args: &[&str], cwd: Option<&std::path::Path>, timeout: Duration) -> std::result::Result<(), String> {
    let mut cmd = Command::new("git");
    cmd.args(args).stdout(Stdio::piped()).stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    let child = cmd.spawn().map_err(|e| format!("failed to spawn git: {e}"))?;
    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| format!("git {args:?} timed out after {}s", timeout.as_secs()))?
        .map_err(|e| format!("git {args:?} failed: {e}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        return Err(format!("git {args:?} exited with {:?}: {stderr}", output.status.code()));
    }
    Ok(())
}

async fn sync_to_commit(
    remote_url: &str,
    token: &str,
    commit_sha: &str,
    repo_dir: &std::path::Path,
    timeout: Duration,
) -> std::result::Result<(), String> {
    let auth_header = format!("http.extraHeader=Authorization: Bearer {token}");

    if !repo_dir.join(".git").exists() {
        if let Some(parent) = repo_dir.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("failed to create {}: {e}", parent.display()))?;
        }
        run_git(
            &["-c", &auth_header, "clone", remote_url, &repo_dir.to_string_lossy()],
            None,
            timeout,
        )
        .await?;
    } else {
        run_git(&["-c", &auth_header, "fetch", "origin"], Some(repo_dir), timeout).await?;
    }

    run_git(&["checkout", "--force", commit_sha], Some(repo_dir), timeout).await?;
    run_git(&["clean", "-fdx"], Some(repo_dir), timeout).await?;
    Ok(())
}
