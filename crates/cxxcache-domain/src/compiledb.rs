//! Compile-command catalog indexing: normalization, flag extraction, and
//! exact/fallback lookup. Pure given the catalog's already-loaded JSON text
//! — reading `compile_commands.json` off disk is the infrastructure
//! layer's job.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::Result;
use crate::hash;
use crate::model::{CompileEntry, MatchType};

#[derive(Debug, Deserialize)]
struct RawCompileCommand {
    file: String,
    directory: String,
    #[serde(default)]
    arguments: Option<Vec<String>>,
    #[serde(default)]
    command: Option<String>,
}

/// A loaded, normalized compile-command catalog, keyed by case-folded
/// absolute path.
#[derive(Debug, Default)]
pub struct CompileDbIndex {
    entries: HashMap<String, CompileEntry>,
}

impl CompileDbIndex {
    /// Parses a `compile_commands.json` document (already read into
    /// memory) into a normalized, case-folded index.
    pub fn from_json(json_text: &str) -> Result<Self> {
        let raw: Vec<RawCompileCommand> = serde_json::from_str(json_text)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for cmd in raw {
            let abs_file = normalize_against(&cmd.directory, &cmd.file);
            let key = fold_case(&abs_file);
            let tokens = match cmd.arguments {
                Some(args) => args,
                None => {
                    let command = cmd.command.clone().unwrap_or_default();
                    shell_split(&command)
                }
            };
            let arguments = strip_non_forwarded(&tokens, &cmd.file);
            let flags_hash = hash::flags_hash(&arguments);
            entries.insert(
                key,
                CompileEntry {
                    normalized_path: abs_file,
                    directory: cmd.directory,
                    arguments,
                    flags_hash,
                    match_type: MatchType::Exact,
                },
            );
        }
        Ok(Self { entries })
    }

    /// Exact lookup by absolute path (case-folded internally).
    pub fn get(&self, abs_path: &str) -> Option<&CompileEntry> {
        self.entries.get(&fold_case(abs_path))
    }

    /// Whether an exact entry exists for `abs_path`.
    pub fn has(&self, abs_path: &str) -> bool {
        self.get(abs_path).is_some()
    }

    /// Picks a sibling translation unit's entry for a header absent from
    /// the catalog, by directory membership and deterministic lex-order
    /// tie-break over normalized absolute path.
    pub fn fallback_entry(&self, header_abs_path: &str) -> Option<CompileEntry> {
        let dir = parent_dir(header_abs_path)?;
        let mut candidates: Vec<&CompileEntry> = self
            .entries
            .values()
            .filter(|e| parent_dir(&e.normalized_path).as_deref() == Some(dir.as_str()))
            .collect();
        candidates.sort_by(|a, b| a.normalized_path.cmp(&b.normalized_path));
        candidates.first().map(|e| CompileEntry {
            match_type: MatchType::Fallback,
            ..(*e).clone()
        })
    }

    /// Resolves `abs_path` to an entry and reports how it was matched:
    /// `Exact` direct hit, `Fallback` sibling adoption, or `Missing`.
    pub fn resolve(&self, abs_path: &str) -> (Option<CompileEntry>, MatchType) {
        if let Some(entry) = self.get(abs_path) {
            return (Some(entry.clone()), MatchType::Exact);
        }
        match self.fallback_entry(abs_path) {
            Some(entry) => (Some(entry), MatchType::Fallback),
            None => (None, MatchType::Missing),
        }
    }
}

fn fold_case(path: &str) -> String {
    path.to_lowercase()
}

fn normalize_against(directory: &str, file: &str) -> String {
    let path = std::path::Path::new(file);
    if path.is_absolute() {
        path.to_string_lossy().replace('\\', "/")
    } else {
        std::path::Path::new(directory)
            .join(file)
            .to_string_lossy()
            .replace('\\', "/")
    }
}

fn parent_dir(abs_path: &str) -> Option<String> {
    std::path::Path::new(abs_path)
        .parent()
        .map(|p| p.to_string_lossy().replace('\\', "/"))
}

/// Posix-style shell splitting, matching the reference implementation's
/// `shlex.split(command, posix=False)` fallback: a best-effort tokenizer
/// that honors single/double quotes and backslash escapes but does not
/// attempt full shell semantics (no globbing, no variable expansion).
fn shell_split(command: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    in_token = true;
                }
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                        in_token = true;
                    }
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                c => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }
    if in_token || !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Strips the compiler executable (first token), any `-o`/`/Fo`/`/Fe`
/// output-flag pair, and the source path itself, leaving only the flags
/// that should participate in the flags-hash.
fn strip_non_forwarded(tokens: &[String], source_file: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut iter = tokens.iter().skip(1).peekable(); // skip compiler executable
    while let Some(tok) = iter.next() {
        if is_output_flag(tok) {
            // consume the paired output argument, whether it's the next
            // token or fused onto this one (`-oFoo.o`).
            if tok == "-o" || tok == "/Fo" || tok == "/Fe" {
                iter.next();
            }
            continue;
        }
        if tok == source_file || tok.ends_with(source_file) {
            continue;
        }
        out.push(tok.clone());
    }
    out
}

fn is_output_flag(tok: &str) -> bool {
    tok == "-o" || tok == "/Fo" || tok == "/Fe" || tok.starts_with("-o") && tok.len() > 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> String {
        r#"[
            {"file": "a.cpp", "directory": "/repo", "arguments": ["clang++", "-std=c++17", "-DFOO", "-o", "a.o", "a.cpp"]},
            {"file": "b.cpp", "directory": "/repo", "command": "clang++ -Wall b.cpp -o b.o"}
        ]"#
        .to_owned()
    }

    #[test]
    fn exact_lookup_strips_compiler_output_and_source() {
        let index = CompileDbIndex::from_json(&sample_json()).unwrap();
        let entry = index.get("/repo/a.cpp").expect("entry present");
        assert_eq!(entry.arguments, vec!["-std=c++17", "-DFOO"]);
        assert_eq!(entry.match_type, MatchType::Exact);
    }

    #[test]
    fn command_string_is_shell_split() {
        let index = CompileDbIndex::from_json(&sample_json()).unwrap();
        let entry = index.get("/repo/b.cpp").expect("entry present");
        assert_eq!(entry.arguments, vec!["-Wall"]);
    }

    #[test]
    fn fallback_picks_lexicographically_first_sibling() {
        let index = CompileDbIndex::from_json(&sample_json()).unwrap();
        let (entry, match_type) = index.resolve("/repo/a.h");
        assert_eq!(match_type, MatchType::Fallback);
        assert_eq!(entry.unwrap().normalized_path, "/repo/a.cpp");
    }

    #[test]
    fn missing_when_no_sibling_exists() {
        let index = CompileDbIndex::from_json(&sample_json()).unwrap();
        let (entry, match_type) = index.resolve("/other/c.h");
        assert!(entry.is_none());
        assert_eq!(match_type, MatchType::Missing);
    }

    #[test]
    fn lookup_is_case_folded() {
        let index = CompileDbIndex::from_json(&sample_json()).unwrap();
        assert!(index.has("/REPO/A.CPP"));
    }
}
