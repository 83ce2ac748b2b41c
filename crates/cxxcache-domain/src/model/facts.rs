//! Extracted AST facts: symbols, references, call edges, include deps, and
//! the append-only parse-run audit log.

use serde::{Deserialize, Serialize};

use super::FileKey;

/// A symbol definition emitted by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// The file the symbol is defined in.
    pub file_key: FileKey,
    /// Unqualified name.
    pub name: String,
    /// Fully qualified name (dedup key component).
    pub qualified_name: String,
    /// Extractor-reported symbol kind (function, class, variable, ...).
    pub kind: String,
    /// 1-based definition line.
    pub line: u32,
    /// 0-based definition column.
    pub col: u32,
    /// 1-based line the symbol's extent ends at.
    pub extent_end_line: u32,
}

impl Symbol {
    /// Dedup key: `(file_key, qualified_name, line, col)`.
    pub fn dedup_key(&self) -> (FileKey, String, u32, u32) {
        (
            self.file_key.clone(),
            self.qualified_name.clone(),
            self.line,
            self.col,
        )
    }
}

/// The kind of use a reference represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// A call expression.
    Call,
    /// A read of the symbol's value.
    Read,
    /// A write to the symbol.
    Write,
    /// Taking the symbol's address.
    Addr,
    /// Any other use the extractor reports but does not further classify.
    Other,
}

/// A reference (use-site) of a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolReference {
    /// The file the reference occurs in.
    pub file_key: FileKey,
    /// The qualified name of the referenced symbol.
    pub symbol: String,
    /// 1-based reference line.
    pub line: u32,
    /// 0-based reference column.
    pub col: u32,
    /// The use-site kind.
    pub ref_kind: ReferenceKind,
}

impl SymbolReference {
    /// Dedup key: `(file_key, symbol, line, col, ref_kind)`.
    pub fn dedup_key(&self) -> (FileKey, String, u32, u32, ReferenceKind) {
        (
            self.file_key.clone(),
            self.symbol.clone(),
            self.line,
            self.col,
            self.ref_kind,
        )
    }
}

/// The direction a call-graph query traverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    /// Callers of the requested symbol.
    Callers,
    /// Callees of the requested symbol.
    Callees,
    /// Both directions.
    Both,
}

/// A static call edge between two qualified symbol names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    /// The file the call site occurs in.
    pub file_key: FileKey,
    /// Qualified name of the calling symbol.
    pub caller: String,
    /// Qualified name of the called symbol.
    pub callee: String,
    /// 1-based call-site line.
    pub line: u32,
}

impl CallEdge {
    /// Dedup key: `(file_key, caller, callee, line)`.
    pub fn dedup_key(&self) -> (FileKey, String, String, u32) {
        (
            self.file_key.clone(),
            self.caller.clone(),
            self.callee.clone(),
            self.line,
        )
    }
}

/// An `#include` dependency reported by the extractor for a translation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeDep {
    /// The translation unit that includes `path`.
    pub file_key: FileKey,
    /// Raw include path as written in source (pre path-remap resolution).
    pub path: String,
    /// Include depth reported by the extractor (diagnostics only).
    pub depth: u32,
}

/// Append-only audit row for one parse attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseRun {
    /// The context the parse was run under.
    pub context_id: String,
    /// The file that was parsed.
    pub file_key: FileKey,
    /// Absolute path passed to the extractor.
    pub abs_path: String,
    /// Unix-millis timestamp the subprocess was spawned.
    pub started_at_ms: i64,
    /// Unix-millis timestamp the subprocess finished, if it did.
    pub finished_at_ms: Option<i64>,
    /// Whether the parse succeeded.
    pub success: bool,
    /// Truncated stderr or a decode-failure description, on failure.
    pub error_msg: Option<String>,
}
