//! Canonical `"{repoId}:{relPath}"` file identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical identity of a source file within a workspace.
///
/// All cache rows are keyed by file-key, never by absolute path. The
/// mapping between a file-key and an absolute path is one-to-one within a
/// workspace (see `PathResolver` in the application layer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileKey(String);

impl FileKey {
    /// Builds a file-key from a repo id and a forward-slash relative path.
    pub fn new(repo_id: impl AsRef<str>, rel_path: impl AsRef<str>) -> Self {
        Self(format!(
            "{}:{}",
            repo_id.as_ref(),
            rel_path.as_ref().replace('\\', "/")
        ))
    }

    /// Parses a `"repoId:relPath"` string. Only the first `:` is treated as
    /// the separator, so a `relPath` containing `:` (Windows drive letters
    /// inside relative paths never occur, but Windows UNC shares could)
    /// remains intact.
    pub fn parse(raw: &str) -> Option<Self> {
        let (_, _) = raw.split_once(':')?;
        Some(Self(raw.to_owned()))
    }

    /// The `repoId` prefix of this file-key.
    pub fn repo_id(&self) -> &str {
        self.0.split_once(':').map(|(r, _)| r).unwrap_or(&self.0)
    }

    /// The `relPath` suffix of this file-key.
    pub fn rel_path(&self) -> &str {
        self.0.split_once(':').map(|(_, p)| p).unwrap_or("")
    }

    /// The raw `"repoId:relPath"` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<FileKey> for String {
    fn from(key: FileKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_normalizes_backslashes() {
        let key = FileKey::new("repoA", "src\\a.cpp");
        assert_eq!(key.as_str(), "repoA:src/a.cpp");
    }

    #[test]
    fn repo_id_and_rel_path_round_trip() {
        let key = FileKey::new("repoA", "src/a.cpp");
        assert_eq!(key.repo_id(), "repoA");
        assert_eq!(key.rel_path(), "src/a.cpp");
    }

    #[test]
    fn parse_requires_colon() {
        assert!(FileKey::parse("no-colon-here").is_none());
        assert_eq!(
            FileKey::parse("repoA:src/a.cpp").unwrap().as_str(),
            "repoA:src/a.cpp"
        );
    }
}
