//! Freshness Service: per-candidate compile-flag resolution and
//! composite-hash comparison, plus the bounded-concurrency parse step that
//! drains stale candidates through the Parser Pool and Single-Writer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cxxcache_domain::compiledb::CompileDbIndex;
use cxxcache_domain::hash;
use cxxcache_domain::model::{
    CallEdge, CompileEntry, FileKey, IncludeDep, MatchType, ReferenceKind, Symbol, SymbolReference,
    WorkspaceManifest,
};
use cxxcache_domain::path_resolver;
use cxxcache_domain::ports::{ExtractorOutput, ParsePayload, ParserPool, SingleWriter, StorageEngine};
use cxxcache_domain::Result;
use tokio::sync::Semaphore;

/// The classification a candidate file-key falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Cached composite hash matches the recomputed one.
    Fresh,
    /// No cached hash, or it no longer matches; needs (re)parsing.
    Stale,
    /// No resolvable path, or no (fallback-eligible) compile entry.
    Unparsed,
}

/// One stale candidate's resolved parse inputs.
#[derive(Debug, Clone)]
pub struct ParseTask {
    /// Context this task persists into.
    pub context_id: String,
    /// The file being parsed.
    pub file_key: FileKey,
    /// Resolved absolute path.
    pub abs_path: String,
    /// The matched compile-command entry.
    pub entry: CompileEntry,
}

/// Result of [`FreshnessService::classify`].
#[derive(Debug, Default)]
pub struct ClassifyResult {
    /// Candidates whose cached facts are still valid.
    pub fresh: Vec<FileKey>,
    /// Candidates that need (re)parsing.
    pub stale_tasks: Vec<ParseTask>,
    /// Candidates with no resolvable path or compile entry.
    pub unparsed: Vec<FileKey>,
    /// Fallback-entry notices and other non-fatal classification warnings.
    pub warnings: Vec<String>,
}

/// Input to [`FreshnessService::classify`].
pub struct ClassifyRequest<'a> {
    /// Context the cached [`cxxcache_domain::model::TrackedFile`] rows live in.
    pub context_id: &'a str,
    /// Candidates to classify.
    pub candidates: &'a [FileKey],
    /// Workspace root on disk.
    pub workspace_root: &'a str,
    /// The loaded workspace manifest.
    pub manifest: &'a WorkspaceManifest,
    /// Loaded compile-command catalogs, keyed by repo id. A repo absent
    /// from this map has no configured catalog.
    pub compile_dbs: &'a HashMap<String, Arc<CompileDbIndex>>,
}

/// Result of [`FreshnessService::parse`].
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// File-keys successfully parsed and persisted.
    pub parsed: Vec<FileKey>,
    /// File-keys that failed to parse (timeout, non-zero exit, bad JSON).
    pub failed: Vec<FileKey>,
    /// Non-fatal warnings from the parse step.
    pub warnings: Vec<String>,
}

/// Resolves compile flags, compares composite hashes, and drives the parse
/// fan-out for stale candidates.
pub struct FreshnessService {
    storage: Arc<dyn StorageEngine>,
    parser: Arc<dyn ParserPool>,
    writer: Arc<dyn SingleWriter>,
}

impl FreshnessService {
    /// Builds a service over the given storage, parser pool, and writer ports.
    pub fn new(
        storage: Arc<dyn StorageEngine>,
        parser: Arc<dyn ParserPool>,
        writer: Arc<dyn SingleWriter>,
    ) -> Self {
        Self {
            storage,
            parser,
            writer,
        }
    }

    /// Classifies each candidate as fresh, stale, or unparsed.
    ///
    /// # Errors
    /// Propagates a storage failure reading cached [`cxxcache_domain::model::TrackedFile`] rows.
    pub async fn classify(&self, req: ClassifyRequest<'_>) -> Result<ClassifyResult> {
        let mut result = ClassifyResult::default();
        for file_key in req.candidates {
            let Some(abs_path) =
                path_resolver::file_key_to_abs_path(req.manifest, req.workspace_root, file_key)
            else {
                result.unparsed.push(file_key.clone());
                continue;
            };

            let Some(index) = req.compile_dbs.get(file_key.repo_id()) else {
                result.unparsed.push(file_key.clone());
                continue;
            };

            let (entry, match_type) = index.resolve(&abs_path);
            let Some(entry) = entry else {
                result.unparsed.push(file_key.clone());
                continue;
            };
            if match_type == MatchType::Fallback {
                result
                    .warnings
                    .push(format!("{file_key}: using fallback compile entry"));
            }

            let bytes = tokio::fs::read(&abs_path).await.unwrap_or_default();
            let content_hash = hash::content_hash(&bytes);

            let cached = self
                .storage
                .get_tracked_file(req.context_id, file_key)
                .await?;

            let is_fresh = match &cached {
                None => false,
                Some(tracked) => {
                    let recomputed =
                        hash::composite_hash(&content_hash, &tracked.includes_hash, &entry.flags_hash);
                    recomputed == tracked.composite_hash
                }
            };

            if is_fresh {
                result.fresh.push(file_key.clone());
            } else {
                result.stale_tasks.push(ParseTask {
                    context_id: req.context_id.to_owned(),
                    file_key: file_key.clone(),
                    abs_path,
                    entry,
                });
            }
        }
        Ok(result)
    }

    /// Parses stale tasks with bounded concurrency, persisting each
    /// successful payload through the Single-Writer before returning.
    ///
    /// # Errors
    /// Propagates a [`SingleWriter::enqueue`] failure (writer not running).
    pub async fn parse(
        &self,
        tasks: Vec<ParseTask>,
        manifest: &WorkspaceManifest,
        workspace_root: &str,
        max_workers: usize,
        timeout: Duration,
    ) -> Result<ParseOutcome> {
        let semaphore = Arc::new(Semaphore::new(max_workers.max(1)));
        let mut outcome = ParseOutcome::default();

        let mut futures = Vec::with_capacity(tasks.len());
        for task in tasks {
            let semaphore = Arc::clone(&semaphore);
            let parser = Arc::clone(&self.parser);
            futures.push(async move {
                let _permit = semaphore.acquire().await;
                let result = tokio::time::timeout(timeout, parser.parse_file(&task.abs_path, &task.entry))
                    .await;
                (task, result)
            });
        }
        let results = futures::future::join_all(futures).await;

        for (task, result) in results {
            match result {
                Err(_elapsed) => {
                    outcome.failed.push(task.file_key.clone());
                    outcome
                        .warnings
                        .push(format!("{}: parse timed out", task.file_key));
                }
                Ok(Err(err)) => {
                    outcome.failed.push(task.file_key.clone());
                    outcome.warnings.push(format!("{}: {err}", task.file_key));
                }
                Ok(Ok(None)) => {
                    outcome.failed.push(task.file_key.clone());
                    outcome
                        .warnings
                        .push(format!("{}: extractor reported failure", task.file_key));
                }
                Ok(Ok(Some(output))) => {
                    match build_payload(&task, &output, manifest, workspace_root).await {
                        Ok(payload) => match self.writer.enqueue(payload).await {
                            Ok(()) => outcome.parsed.push(task.file_key.clone()),
                            Err(err) => {
                                outcome.failed.push(task.file_key.clone());
                                outcome.warnings.push(format!("{}: {err}", task.file_key));
                            }
                        },
                        Err(err) => {
                            outcome.failed.push(task.file_key.clone());
                            outcome.warnings.push(format!("{}: {err}", task.file_key));
                        }
                    }
                }
            }
        }

        self.writer.flush().await;
        Ok(outcome)
    }
}

async fn build_payload(
    task: &ParseTask,
    output: &ExtractorOutput,
    manifest: &WorkspaceManifest,
    workspace_root: &str,
) -> Result<ParsePayload> {
    let file_bytes = tokio::fs::read(&task.abs_path).await.unwrap_or_default();
    let content_hash = hash::content_hash(&file_bytes);

    let rel_dir = parent_of(task.file_key.rel_path());
    let mut include_hashes = Vec::with_capacity(output.include_deps.len());
    let mut include_deps = Vec::with_capacity(output.include_deps.len());
    for raw in &output.include_deps {
        let resolved = path_resolver::resolve_include_dep(
            manifest,
            task.file_key.repo_id(),
            &rel_dir,
            &raw.path,
        );
        if let Some(dep_key) = resolved.file_key {
            if let Some(dep_abs_path) =
                path_resolver::file_key_to_abs_path(manifest, workspace_root, &dep_key)
            {
                let dep_bytes = tokio::fs::read(&dep_abs_path).await.unwrap_or_default();
                include_hashes.push(hash::content_hash(&dep_bytes));
            }
        }
        include_deps.push(IncludeDep {
            file_key: task.file_key.clone(),
            path: raw.path.clone(),
            depth: raw.depth,
        });
    }
    let includes_hash = hash::includes_hash(include_hashes);
    let composite_hash = hash::composite_hash(&content_hash, &includes_hash, &task.entry.flags_hash);

    let symbols = output
        .symbols
        .iter()
        .map(|raw| Symbol {
            file_key: task.file_key.clone(),
            name: raw.name.clone(),
            qualified_name: raw.qualified_name.clone(),
            kind: raw.kind.clone(),
            line: raw.line,
            col: raw.col,
            extent_end_line: raw.extent_end_line,
        })
        .collect();

    let references = output
        .references
        .iter()
        .map(|raw| SymbolReference {
            file_key: task.file_key.clone(),
            symbol: raw.symbol.clone(),
            line: raw.line,
            col: raw.col,
            ref_kind: reference_kind(&raw.kind),
        })
        .collect();

    let call_edges = output
        .call_edges
        .iter()
        .map(|raw| CallEdge {
            file_key: task.file_key.clone(),
            caller: raw.caller.clone(),
            callee: raw.callee.clone(),
            line: raw.line,
        })
        .collect();

    Ok(ParsePayload {
        context_id: task.context_id.clone(),
        file_key: task.file_key.clone(),
        abs_path: task.abs_path.clone(),
        content_hash,
        flags_hash: task.entry.flags_hash.clone(),
        includes_hash,
        composite_hash,
        file_bytes,
        symbols,
        references,
        call_edges,
        include_deps,
    })
}

fn reference_kind(raw: &str) -> ReferenceKind {
    match raw {
        "call" => ReferenceKind::Call,
        "read" => ReferenceKind::Read,
        "write" => ReferenceKind::Write,
        "addr" => ReferenceKind::Addr,
        _ => ReferenceKind::Other,
    }
}

fn parent_of(rel_path: &str) -> String {
    match rel_path.rsplit_once('/') {
        Some((dir, _)) => dir.to_owned(),
        None => String::new(),
    }
}
