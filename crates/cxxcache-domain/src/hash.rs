//! Composite content/flags/includes hashing primitives. Pure and
//! deterministic — no filesystem access.

use sha2::{Digest, Sha256};

/// The fixed separator joining the three hex hashes in [`composite_hash`].
/// Distinct from the NUL byte used to join sorted lists in [`flags_hash`]
/// and [`includes_hash`].
const COMPOSITE_SEPARATOR: &str = "||";

/// SHA-256 hex digest of raw file bytes. Missing files (empty slice) yield
/// the hash of the empty string, which is never equal to any non-empty
/// file's hash, so classification always treats a missing file as stale.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Hashes a flag sequence after sorting it, so flag reordering never
/// invalidates the cache. Flags are joined with NUL before hashing.
pub fn flags_hash<I, S>(flags: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sorted: Vec<String> = flags.into_iter().map(|s| s.as_ref().to_owned()).collect();
    sorted.sort_unstable();
    hex::encode(Sha256::digest(sorted.join("\0").as_bytes()))
}

/// Hashes a list of include-dependency content hashes after sorting, so
/// include-list reordering never invalidates the cache.
pub fn includes_hash<I, S>(hashes: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut sorted: Vec<String> = hashes.into_iter().map(|s| s.as_ref().to_owned()).collect();
    sorted.sort_unstable();
    hex::encode(Sha256::digest(sorted.join("\0").as_bytes()))
}

/// `H(content || includes || flags)` — the freshness oracle. The three
/// hex strings are joined with the literal `"||"` separator (not NUL,
/// which is reserved for joining the sorted lists that produce
/// `includes_hash`/`flags_hash` themselves).
pub fn composite_hash(content: &str, includes: &str, flags: &str) -> String {
    let joined = format!("{content}{COMPOSITE_SEPARATOR}{includes}{COMPOSITE_SEPARATOR}{flags}");
    hex::encode(Sha256::digest(joined.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        assert_eq!(content_hash(b"hello"), content_hash(b"hello"));
        assert_ne!(content_hash(b"hello"), content_hash(b"world"));
    }

    #[test]
    fn content_hash_of_empty_is_stable() {
        assert_eq!(content_hash(b""), content_hash(&[]));
    }

    #[test]
    fn flags_hash_stable_under_reordering() {
        let a = flags_hash(["-DFOO", "-Wall", "-std=c++17"]);
        let b = flags_hash(["-std=c++17", "-DFOO", "-Wall"]);
        assert_eq!(a, b);
    }

    #[test]
    fn flags_hash_distinguishes_different_flag_sets() {
        let a = flags_hash(["-DFOO"]);
        let b = flags_hash(["-DBAR"]);
        assert_ne!(a, b);
    }

    #[test]
    fn includes_hash_stable_under_reordering() {
        let a = includes_hash(["hash1", "hash2", "hash3"]);
        let b = includes_hash(["hash3", "hash1", "hash2"]);
        assert_eq!(a, b);
    }

    #[test]
    fn composite_hash_is_deterministic_and_order_sensitive_on_inputs() {
        let a = composite_hash("c1", "i1", "f1");
        let b = composite_hash("c1", "i1", "f1");
        assert_eq!(a, b);
        // swapping which *argument* carries which hash must differ, even
        // though the underlying strings are identical sets.
        let c = composite_hash("f1", "i1", "c1");
        assert_ne!(a, c);
    }

    #[test]
    fn composite_hash_changes_when_any_input_changes() {
        let base = composite_hash("c1", "i1", "f1");
        assert_ne!(base, composite_hash("c2", "i1", "f1"));
        assert_ne!(base, composite_hash("c1", "i2", "f1"));
        assert_ne!(base, composite_hash("c1", "i1", "f2"));
    }
}
