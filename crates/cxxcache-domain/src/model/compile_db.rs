//! A single resolved entry from a `compile_commands.json` catalog.

use serde::{Deserialize, Serialize};

/// How a compile-command entry was matched to a requested path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// The catalog has a direct entry for this exact path.
    Exact,
    /// No direct entry; a sibling translation unit's flags were adopted
    /// (headers are never compiled on their own).
    Fallback,
    /// No entry and no eligible sibling.
    Missing,
}

/// One normalized, flag-extracted entry from a compile-command catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileEntry {
    /// Case-folded, normalized absolute path this entry was indexed under.
    pub normalized_path: String,
    /// Absolute build directory the command was expected to run from.
    pub directory: String,
    /// Forwarded compiler flags (compiler executable, `-o`/output pair, and
    /// the source path itself already stripped).
    pub arguments: Vec<String>,
    /// `hash::flags_hash(arguments)`.
    pub flags_hash: String,
    /// How this entry was matched to the file it is now attached to.
    pub match_type: MatchType,
}
