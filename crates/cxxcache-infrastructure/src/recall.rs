//! `rg`-backed lexical recall: the first stage of candidate resolution.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use cxxcache_domain::ports::{RecallEngine, RecallHit};
use cxxcache_domain::{warn, Result};
use serde_json::Value;
use tokio::process::Command;

const DEFAULT_GLOBS: &[&str] = &[
    "*.cpp", "*.cxx", "*.cc", "*.c", "*.h", "*.hpp", "*.hxx", "*.inl",
];

/// Converts a qualified C++ symbol into a ripgrep regex that tolerates
/// incidental whitespace around `::`.
///
/// `"Session::Auth"` becomes `\bSession\s*::\s*Auth\b`.
fn build_symbol_pattern(symbol: &str) -> String {
    let parts: Vec<String> = symbol
        .split("::")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(regex::escape)
        .collect();
    format!(r"\b{}\b", parts.join(r"\s*::\s*"))
}

fn dedup_by_resolved_path(hits: Vec<RecallHit>, max_files: usize) -> Vec<RecallHit> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for hit in hits {
        let resolved = std::fs::canonicalize(&hit.file_path)
            .unwrap_or_else(|_| PathBuf::from(&hit.file_path))
            .to_string_lossy()
            .into_owned();
        if seen.insert(resolved) {
            out.push(hit);
            if out.len() >= max_files {
                break;
            }
        }
    }
    out
}

fn parse_rg_json(output: &str) -> Vec<RecallHit> {
    let mut hits = Vec::new();
    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(msg) = serde_json::from_str::<Value>(line) else {
            continue;
        };
        if msg.get("type").and_then(Value::as_str) != Some("match") {
            continue;
        }
        let data = &msg["data"];
        let file_path = data["path"]["text"].as_str().unwrap_or_default();
        if file_path.is_empty() {
            continue;
        }
        let line_number = data["line_number"].as_u64().unwrap_or(0) as u32;
        let line_text = data["lines"]["text"]
            .as_str()
            .unwrap_or_default()
            .trim_end_matches('\n')
            .to_owned();
        hits.push(RecallHit {
            file_path: file_path.to_owned(),
            line_number,
            line_text,
        });
    }
    hits
}

/// Invokes a ripgrep-compatible binary to find candidate files.
pub struct RipgrepRecallEngine {
    binary: String,
    timeout: Duration,
    globs: Vec<String>,
}

impl RipgrepRecallEngine {
    /// Builds an engine invoking `binary` (typically `"rg"`), bounding each
    /// search to `timeout`.
    #[must_use]
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
            globs: DEFAULT_GLOBS.iter().map(|g| (*g).to_owned()).collect(),
        }
    }
}

#[async_trait]
impl RecallEngine for RipgrepRecallEngine {
    async fn run_recall(
        &self,
        symbol: &str,
        repo_root: &str,
        max_files: usize,
    ) -> Result<(Vec<RecallHit>, Vec<String>)> {
        let pattern = build_symbol_pattern(symbol);
        let mut cmd = Command::new(&self.binary);
        cmd.args(["--json", "--no-heading", "--max-count", "5"])
            .args(["--type-add", "cpp:*.cpp,*.cxx,*.cc,*.c,*.h,*.hpp,*.hxx,*.inl"]);
        for glob in &self.globs {
            cmd.args(["--glob", glob]);
        }
        cmd.args(["--", &pattern, repo_root])
            .current_dir(repo_root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                let message = format!("failed to spawn '{}': {e}", self.binary);
                warn!("recall", &message);
                return Ok((Vec::new(), vec![message]));
            }
        };

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                let message = format!("recall subprocess failed: {e}");
                warn!("recall", &message);
                return Ok((Vec::new(), vec![message]));
            }
            Err(_) => {
                let message = format!(
                    "ripgrep timed out after {}s for symbol '{symbol}'",
                    self.timeout.as_secs()
                );
                warn!("recall", &message);
                return Ok((Vec::new(), vec![message]));
            }
        };

        // rg returns exit code 1 when no matches are found — that's normal.
        match output.status.code() {
            Some(0) | Some(1) => {}
            _ => {
                let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
                let message = format!(
                    "ripgrep exited with code {:?}: {stderr}",
                    output.status.code()
                );
                warn!("recall", &message);
                return Ok((Vec::new(), vec![message]));
            }
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let hits = dedup_by_resolved_path(parse_rg_json(&stdout), max_files);
        Ok((hits, Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_pattern_escapes_double_colon() {
        assert_eq!(
            build_symbol_pattern("Session::Auth"),
            r"\bSession\s*::\s*Auth\b"
        );
    }

    #[test]
    fn symbol_pattern_handles_unqualified_name() {
        assert_eq!(build_symbol_pattern("doLogin"), r"\bdoLogin\b");
    }

    #[test]
    fn parses_rg_match_lines_and_skips_others() {
        let output = r#"{"type":"begin","data":{}}
{"type":"match","data":{"path":{"text":"a.cpp"},"line_number":7,"lines":{"text":"void doLogin() {}\n"}}}
{"type":"end","data":{}}"#;
        let hits = parse_rg_json(output);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].file_path, "a.cpp");
        assert_eq!(hits[0].line_number, 7);
    }

    #[test]
    fn dedup_caps_to_max_files() {
        let hits = vec![
            RecallHit {
                file_path: "/tmp/does-not-exist-a.cpp".into(),
                line_number: 1,
                line_text: String::new(),
            },
            RecallHit {
                file_path: "/tmp/does-not-exist-b.cpp".into(),
                line_number: 2,
                line_text: String::new(),
            },
        ];
        let capped = dedup_by_resolved_path(hits, 1);
        assert_eq!(capped.len(), 1);
    }
}
