//! Content-addressed storage names.

use std::fmt;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::INDEX_FILE;
use crate::key::QueryKey;

/// Extension appended to the digest to form the file name.
pub const FILE_EXTENSION: &str = "json";

/// File name of a stored response, `<hex digest>.json`.
///
/// Derived only from the key, so re-capturing a key always targets the same
/// file. Distinct keys map to distinct names only as strongly as SHA-256
/// resists collisions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageName(String);

impl StorageName {
    /// Derive the storage name for a key.
    pub fn for_key(key: &QueryKey) -> Self {
        Self(format!("{}.{FILE_EXTENSION}", compute_digest(key.as_str())))
    }

    /// Accept a name read back from an index document.
    ///
    /// Rejects anything that could escape the responses directory, and the
    /// index document itself (or its temp file), which a body must never
    /// overwrite.
    pub fn parse(name: &str) -> Option<Self> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && !name.contains('\0')
            && !is_index_file(name);
        valid.then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_index_file(name: &str) -> bool {
    name.strip_prefix(INDEX_FILE).is_some_and(|rest| rest.is_empty() || rest == ".tmp")
}

/// HMAC-SHA256 of `input`, keyed with `input` itself, as lowercase hex.
pub fn compute_digest(input: &str) -> String {
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(input.as_bytes()) else {
        unreachable!("HMAC accepts keys of any length")
    };
    mac.update(input.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_stability() {
        let key = QueryKey::normalized("?b=2&a=1");
        assert_eq!(StorageName::for_key(&key), StorageName::for_key(&key));
        assert_eq!(StorageName::for_key(&key), StorageName::for_key(&QueryKey::raw("?a=1&b=2")));
    }

    #[test]
    fn test_name_different_keys() {
        let a = StorageName::for_key(&QueryKey::raw("?a=1"));
        let b = StorageName::for_key(&QueryKey::raw("?a=2"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_name_format() {
        let name = StorageName::for_key(&QueryKey::raw("?a=1&b=2"));
        let (digest, ext) = name.as_str().split_once('.').unwrap();
        assert_eq!(ext, "json");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_digest_is_keyed() {
        use sha2::Digest;
        let plain = hex::encode(Sha256::digest(b"?a=1"));
        assert_ne!(compute_digest("?a=1"), plain);
        assert_ne!(compute_digest("key"), compute_digest("Key"));
    }

    #[test]
    fn test_parse_rejects_traversal() {
        assert!(StorageName::parse("abc.json").is_some());
        assert!(StorageName::parse("../index.json").is_none());
        assert!(StorageName::parse("a/b.json").is_none());
        assert!(StorageName::parse("..").is_none());
        assert!(StorageName::parse("").is_none());
    }

    #[test]
    fn test_parse_rejects_index_document() {
        assert!(StorageName::parse(INDEX_FILE).is_none());
        assert!(StorageName::parse("index.json.tmp").is_none());
        assert!(StorageName::parse("index.json.bak").is_some());
        assert!(StorageName::parse("my-index.json").is_some());
    }
}
