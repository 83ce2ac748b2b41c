//! Parser pool port: bounded-concurrency invocation of the external C++
//! AST extractor subprocess.

use async_trait::async_trait;

use crate::error::Result;
use crate::model::CompileEntry;

/// A symbol definition as reported by the extractor, pre-hashing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct RawSymbol {
    /// Unqualified name.
    pub name: String,
    /// Fully qualified name.
    pub qualified_name: String,
    /// Extractor-reported kind.
    pub kind: String,
    /// 1-based definition line.
    pub line: u32,
    /// 0-based definition column.
    pub col: u32,
    /// 1-based line the symbol's extent ends at.
    pub extent_end_line: u32,
}

/// A reference as reported by the extractor, pre-hashing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct RawReference {
    /// Qualified name of the referenced symbol.
    pub symbol: String,
    /// 1-based reference line.
    pub line: u32,
    /// 0-based reference column.
    pub col: u32,
    /// `"call"`, `"read"`, `"write"`, `"addr"`, or another extractor-defined kind.
    pub kind: String,
}

/// A call edge as reported by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct RawCallEdge {
    /// Qualified name of the calling symbol.
    pub caller: String,
    /// Qualified name of the called symbol.
    pub callee: String,
    /// 1-based call-site line.
    pub line: u32,
}

/// An include dependency as reported by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct RawIncludeDep {
    /// Raw include path as written in source.
    pub path: String,
    /// Include depth (diagnostics only).
    pub depth: u32,
}

/// Decoded and schema-validated extractor stdout for one translation unit.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct ExtractorOutput {
    /// Whether the extractor itself considers the parse successful.
    /// `success = false` is treated as a failed parse regardless of
    /// whatever partial content the arrays below carry.
    pub success: bool,
    /// Extractor-reported diagnostics (not surfaced further by this crate).
    #[serde(default)]
    pub diagnostics: Vec<String>,
    /// Symbols defined in the parsed translation unit.
    #[serde(default)]
    pub symbols: Vec<RawSymbol>,
    /// References observed in the parsed translation unit.
    #[serde(default)]
    pub references: Vec<RawReference>,
    /// Call edges observed in the parsed translation unit.
    #[serde(default)]
    pub call_edges: Vec<RawCallEdge>,
    /// Include dependencies observed in the parsed translation unit.
    #[serde(default)]
    pub include_deps: Vec<RawIncludeDep>,
}

/// Bounded-concurrency invocation of the external AST extractor.
///
/// A `null`/`None` result for a file is a *reported failure*, never an
/// `Err` — the concurrency gate and per-task timeout are the caller's
/// (Freshness Service's) responsibility to apply via `max_workers`.
#[async_trait]
pub trait ParserPool: Send + Sync {
    /// Parses one translation unit, applying `entry`'s forwarded flags and
    /// build directory. Returns `Ok(None)` for a reported failure
    /// (timeout, non-zero exit, invalid JSON); `Err` only for a setup
    /// error the caller cannot attribute to this file (e.g. binary not
    /// found is still reported via `Ok(None)` per the state machine in
    /// §4.8 — `Err` is reserved for truly exceptional conditions).
    async fn parse_file(
        &self,
        abs_path: &str,
        entry: &CompileEntry,
    ) -> Result<Option<ExtractorOutput>>;
}
