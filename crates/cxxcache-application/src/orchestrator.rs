//! Orchestrator: the single entry point per query shape, composing
//! Context, Candidate, Freshness, and Reader into the recall → classify →
//! parse → read → confidence pipeline.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use cxxcache_domain::model::{CallDirection, CallEdge, ConfidenceEnvelope, FileKey, Symbol, SymbolReference};
use cxxcache_domain::ports::{ManifestLoader, ParserPool, RecallEngine, SingleWriter, StorageEngine};
use cxxcache_domain::Result;

use crate::candidate::{CandidateRequest, CandidateService, RepoSearchTarget};
use crate::compiledb_cache::CompileDbCache;
use crate::context::ContextService;
use crate::freshness::{ClassifyRequest, FreshnessService};
use crate::reader::QueryReader;

/// Numeric knobs the orchestrator needs at every pipeline stage. The
/// infrastructure-side `Settings` struct is the source of truth; this is
/// the slice of it the application layer actually consumes.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Global cap on the candidate file-key list per query.
    pub max_recall_files: usize,
    /// Concurrency ceiling for extractor subprocesses.
    pub max_parse_workers: usize,
    /// Per-task timeout for the extractor subprocess.
    pub parse_timeout: Duration,
    /// Maximum BFS hop count for `candidateRepos`.
    pub max_repo_hops: u32,
}

/// One query's inputs shared across all four query shapes.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// The workspace being queried.
    pub workspace_id: String,
    /// Workspace root on disk.
    pub root_path: String,
    /// Path to the workspace manifest.
    pub manifest_path: String,
    /// The overlay context to read through, if this is a PR-scoped query.
    pub overlay_context_id: Option<String>,
    /// Entry repos for the `candidateRepos` BFS; empty means all repos.
    pub repo_scope: Vec<String>,
    /// The symbol name driving recall and the reader query.
    pub symbol: String,
}

/// Response shared by `queryReferences`.
#[derive(Debug)]
pub struct ReferencesResponse {
    /// The symbol's own definition(s).
    pub definition: Vec<Symbol>,
    /// Use-sites of the symbol.
    pub references: Vec<SymbolReference>,
    /// Summary of how much of the candidate set was actually verified.
    pub confidence: ConfidenceEnvelope,
}

/// Response for `queryDefinition`.
#[derive(Debug)]
pub struct DefinitionResponse {
    /// The symbol's own definition(s).
    pub definition: Vec<Symbol>,
    /// Summary of how much of the candidate set was actually verified.
    pub confidence: ConfidenceEnvelope,
}

/// Response for `queryCallGraph`.
#[derive(Debug)]
pub struct CallGraphResponse {
    /// Call edges touching the requested symbol in the requested direction.
    pub edges: Vec<CallEdge>,
    /// Summary of how much of the candidate set was actually verified.
    pub confidence: ConfidenceEnvelope,
}

/// Response for `queryFileSymbols`.
#[derive(Debug)]
pub struct FileSymbolsResponse {
    /// Symbols defined in the requested file.
    pub symbols: Vec<Symbol>,
    /// Summary of how much of the candidate set was actually verified.
    pub confidence: ConfidenceEnvelope,
}

/// What `invalidateCache` should clear.
#[derive(Debug, Clone)]
pub enum InvalidateTarget {
    /// Clears every tracked file and recall-index row for a context.
    Context(String),
    /// Deletes specific tracked files from a context.
    Files {
        /// The context to delete from.
        context_id: String,
        /// The file-keys to delete.
        file_keys: Vec<FileKey>,
    },
}

/// Result of `invalidateCache`: the count of files actually removed.
#[derive(Debug, Clone, Copy)]
pub struct InvalidateResponse {
    /// Number of tracked files actually removed.
    pub removed_count: usize,
}

/// Input to `registerWorkspace`.
#[derive(Debug, Clone)]
pub struct RegisterWorkspaceRequest {
    /// The workspace id to register or re-register.
    pub workspace_id: String,
    /// Workspace root on disk.
    pub root_path: String,
    /// Path to the workspace manifest.
    pub manifest_path: String,
}

/// Result of `registerWorkspace`.
#[derive(Debug, Clone)]
pub struct RegisterWorkspaceResponse {
    /// Every repo id declared by the (re)loaded manifest.
    pub repo_ids: Vec<String>,
    /// The workspace's baseline context id.
    pub baseline_context_id: String,
}

/// Result of `getWorkspaceInfo`.
#[derive(Debug, Clone)]
pub struct WorkspaceInfoResponse {
    /// Every currently active context id for the workspace.
    pub active_context_ids: Vec<String>,
}

/// Composes the Context/Candidate/Freshness/Reader services into the four
/// query shapes plus workspace registration and cache invalidation.
pub struct Orchestrator {
    storage: Arc<dyn StorageEngine>,
    context: ContextService,
    candidate: CandidateService,
    freshness: FreshnessService,
    reader: QueryReader,
    compile_dbs: CompileDbCache,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Wires the four services and the compile-db cache behind the given
    /// domain ports.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        storage: Arc<dyn StorageEngine>,
        recall: Arc<dyn RecallEngine>,
        parser: Arc<dyn ParserPool>,
        writer: Arc<dyn SingleWriter>,
        manifest_loader: Arc<dyn ManifestLoader>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            context: ContextService::new(Arc::clone(&storage), manifest_loader),
            candidate: CandidateService::new(Arc::clone(&storage), recall),
            freshness: FreshnessService::new(Arc::clone(&storage), parser, writer),
            reader: QueryReader::new(Arc::clone(&storage)),
            compile_dbs: CompileDbCache::new(),
            storage,
            config,
        }
    }

    /// `references` of `req.symbol`: its own definition plus every use-site.
    ///
    /// # Errors
    /// Propagates a workspace/manifest resolution failure or a storage
    /// error; per-candidate parse/recall failures are captured as
    /// warnings in the returned [`ConfidenceEnvelope`] instead.
    pub async fn query_references(&self, req: &QueryRequest) -> Result<ReferencesResponse> {
        let pipeline = self.run_pipeline(req).await?;
        let definition = self
            .reader
            .load_definition(
                &pipeline.chain,
                &req.symbol,
                Some(&pipeline.candidate_set),
                &pipeline.deleted,
            )
            .await?;
        let references = self
            .reader
            .load_references(
                &pipeline.chain,
                &req.symbol,
                Some(&pipeline.candidate_set),
                &pipeline.deleted,
            )
            .await?;
        Ok(ReferencesResponse {
            definition,
            references,
            confidence: pipeline.confidence(),
        })
    }

    /// `definition` of `req.symbol` only.
    ///
    /// # Errors
    /// See [`Self::query_references`].
    pub async fn query_definition(&self, req: &QueryRequest) -> Result<DefinitionResponse> {
        let pipeline = self.run_pipeline(req).await?;
        let definition = self
            .reader
            .load_definition(
                &pipeline.chain,
                &req.symbol,
                Some(&pipeline.candidate_set),
                &pipeline.deleted,
            )
            .await?;
        Ok(DefinitionResponse {
            definition,
            confidence: pipeline.confidence(),
        })
    }

    /// Call edges touching `req.symbol` in `direction`.
    ///
    /// # Errors
    /// See [`Self::query_references`].
    pub async fn query_call_graph(
        &self,
        req: &QueryRequest,
        direction: CallDirection,
    ) -> Result<CallGraphResponse> {
        let pipeline = self.run_pipeline(req).await?;
        let edges = self
            .reader
            .load_call_graph(
                &pipeline.chain,
                &req.symbol,
                direction,
                Some(&pipeline.candidate_set),
                &pipeline.deleted,
            )
            .await?;
        Ok(CallGraphResponse {
            edges,
            confidence: pipeline.confidence(),
        })
    }

    /// Symbols defined in `file_key`, skipping the recall step entirely
    /// since the candidate set is just that one file.
    ///
    /// # Errors
    /// See [`Self::query_references`].
    pub async fn query_file_symbols(
        &self,
        req: &QueryRequest,
        file_key: &FileKey,
    ) -> Result<FileSymbolsResponse> {
        let manifest_path = req.manifest_path.clone();
        let (manifest, _repo_ids) = self
            .context
            .resolve_workspace(&req.workspace_id, &req.root_path, &manifest_path)
            .await?;
        let resolved = self
            .context
            .resolve_contexts(&req.workspace_id, req.overlay_context_id.as_deref())
            .await?;
        self.context.touch(&resolved.context_id).await?;
        let chain = resolved.chain();

        let mut compile_dbs = HashMap::new();
        self.load_compile_db_for_repo(&req.workspace_id, &manifest, file_key.repo_id(), &mut compile_dbs)
            .await?;

        let classify = self
            .freshness
            .classify(ClassifyRequest {
                context_id: &resolved.context_id,
                candidates: std::slice::from_ref(file_key),
                workspace_root: &req.root_path,
                manifest: &manifest,
                compile_dbs: &compile_dbs,
            })
            .await?;
        let parse_outcome = self
            .freshness
            .parse(
                classify.stale_tasks,
                &manifest,
                &req.root_path,
                self.config.max_parse_workers,
                self.config.parse_timeout,
            )
            .await?;

        let mut verified = classify.fresh;
        verified.extend(parse_outcome.parsed.iter().cloned());
        let mut warnings = classify.warnings;
        warnings.extend(parse_outcome.warnings);

        let excluded = HashSet::new();
        let symbols = self.reader.load_file_symbols(&chain, file_key, &excluded).await?;

        let confidence = ConfidenceEnvelope::build(
            verified,
            parse_outcome.failed,
            classify.unparsed,
            warnings,
            resolved.overlay_mode,
        );
        Ok(FileSymbolsResponse { symbols, confidence })
    }

    /// Clears cached facts for a context, or deletes specific tracked
    /// files from one, returning the count actually removed.
    ///
    /// # Errors
    /// Propagates a storage failure.
    pub async fn invalidate_cache(&self, target: InvalidateTarget) -> Result<InvalidateResponse> {
        let removed_count = match target {
            InvalidateTarget::Context(context_id) => self.storage.clear_context(&context_id).await?,
            InvalidateTarget::Files { context_id, file_keys } => {
                let mut count = 0;
                for file_key in &file_keys {
                    if self.storage.delete_tracked_file(&context_id, file_key).await? {
                        count += 1;
                    }
                }
                count
            }
        };
        Ok(InvalidateResponse { removed_count })
    }

    /// Registers (or re-registers) a workspace: upserts it, forces a
    /// manifest reload, and ensures a baseline context exists.
    ///
    /// # Errors
    /// Propagates a manifest schema violation or storage failure.
    pub async fn register_workspace(
        &self,
        req: &RegisterWorkspaceRequest,
    ) -> Result<RegisterWorkspaceResponse> {
        self.context.refresh_manifest(&req.manifest_path).await;
        let (_manifest, repo_ids) = self
            .context
            .resolve_workspace(&req.workspace_id, &req.root_path, &req.manifest_path)
            .await?;
        let baseline_context_id = self.storage.ensure_baseline_context(&req.workspace_id).await?;
        Ok(RegisterWorkspaceResponse {
            repo_ids,
            baseline_context_id,
        })
    }

    /// Read-only variant of [`Self::register_workspace`]: the currently
    /// active context ids for a workspace, without mutating anything.
    ///
    /// # Errors
    /// Propagates a storage failure.
    pub async fn get_workspace_info(&self, workspace_id: &str) -> Result<WorkspaceInfoResponse> {
        let active_context_ids = self.storage.list_active_contexts(workspace_id).await?;
        Ok(WorkspaceInfoResponse { active_context_ids })
    }

    async fn run_pipeline(&self, req: &QueryRequest) -> Result<PipelineOutcome> {
        let (manifest, _repo_ids) = self
            .context
            .resolve_workspace(&req.workspace_id, &req.root_path, &req.manifest_path)
            .await?;
        let resolved = self
            .context
            .resolve_contexts(&req.workspace_id, req.overlay_context_id.as_deref())
            .await?;
        self.context.touch(&resolved.context_id).await?;

        let candidate_repo_ids =
            ContextService::candidate_repos(&manifest, &req.repo_scope, self.config.max_repo_hops);

        let mut compile_dbs = HashMap::new();
        let mut repo_targets = Vec::with_capacity(candidate_repo_ids.len());
        for repo_id in &candidate_repo_ids {
            if let Some(repo) = manifest.repo(repo_id) {
                repo_targets.push(RepoSearchTarget {
                    repo_id: repo.repo_id.clone(),
                    abs_root: format!("{}/{}", req.root_path.trim_end_matches('/'), repo.root),
                });
            }
            self.load_compile_db_for_repo(&req.workspace_id, &req.root_path, &manifest, repo_id, &mut compile_dbs)
                .await?;
        }

        let candidate_result = self
            .candidate
            .resolve(CandidateRequest {
                baseline_context_id: &resolved.baseline_id,
                overlay_context_id: if resolved.context_id == resolved.baseline_id {
                    None
                } else {
                    Some(resolved.context_id.as_str())
                },
                manifest: &manifest,
                workspace_root: &req.root_path,
                repos: &repo_targets,
                query: &req.symbol,
                max_files: self.config.max_recall_files,
            })
            .await?;

        let classify = self
            .freshness
            .classify(ClassifyRequest {
                context_id: &resolved.context_id,
                candidates: &candidate_result.candidates,
                workspace_root: &req.root_path,
                manifest: &manifest,
                compile_dbs: &compile_dbs,
            })
            .await?;

        let parse_outcome = self
            .freshness
            .parse(
                classify.stale_tasks,
                &manifest,
                &req.root_path,
                self.config.max_parse_workers,
                self.config.parse_timeout,
            )
            .await?;

        let mut verified = classify.fresh;
        verified.extend(parse_outcome.parsed.iter().cloned());
        let mut warnings = candidate_result.warnings;
        warnings.extend(classify.warnings);
        warnings.extend(parse_outcome.warnings);

        let candidate_set: HashSet<FileKey> = candidate_result.candidates.iter().cloned().collect();

        Ok(PipelineOutcome {
            chain: resolved.chain(),
            candidate_set,
            deleted: candidate_result.deleted,
            verified,
            failed: parse_outcome.failed,
            unparsed: classify.unparsed,
            warnings,
            overlay_mode: resolved.overlay_mode,
        })
    }

    async fn load_compile_db_for_repo(
        &self,
        workspace_id: &str,
        root_path: &str,
        manifest: &cxxcache_domain::model::WorkspaceManifest,
        repo_id: &str,
        into: &mut HashMap<String, Arc<cxxcache_domain::compiledb::CompileDbIndex>>,
    ) -> Result<()> {
        let Some(repo) = manifest.repo(repo_id) else {
            return Ok(());
        };
        let Some(cc_rel_path) = &repo.compile_commands else {
            return Ok(());
        };
        let cc_path = format!(
            "{}/{}/{}",
            root_path.trim_end_matches('/'),
            repo.root.trim_end_matches('/'),
            cc_rel_path
        );
        let owned_path = cc_path.clone();
        let index = self
            .compile_dbs
            .get_or_load(workspace_id, repo_id, &cc_path, move || async move {
                tokio::fs::read_to_string(&owned_path)
                    .await
                    .map_err(|err| cxxcache_domain::Error::io_with_source("reading compile-commands catalog", err))
            })
            .await?;
        into.insert(repo_id.to_owned(), index);
        Ok(())
    }
}

struct PipelineOutcome {
    chain: Vec<String>,
    candidate_set: HashSet<FileKey>,
    deleted: HashSet<FileKey>,
    verified: Vec<FileKey>,
    failed: Vec<FileKey>,
    unparsed: Vec<FileKey>,
    warnings: Vec<String>,
    overlay_mode: cxxcache_domain::model::OverlayMode,
}

impl PipelineOutcome {
    fn confidence(&self) -> ConfidenceEnvelope {
        ConfidenceEnvelope::build(
            self.verified.clone(),
            self.failed.clone(),
            self.unparsed.clone(),
            self.warnings.clone(),
            self.overlay_mode,
        )
    }
}
