//! Query string canonicalization for stable lookup keys.
//!
//! Normalization steps:
//! 1. Strip a single leading `?`
//! 2. Parse as `application/x-www-form-urlencoded` (percent-decoding, `+` as space)
//! 3. Stable-sort the pairs by name, keeping duplicates in their original order
//! 4. Re-encode each pair, join with `&` and prefix with `?`

use std::fmt;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// A lookup key in the index.
///
/// Either a normalized query string (see [`normalize`]) or a raw query string
/// taken verbatim from the request target, depending on how it was built.
/// Always starts with `?`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryKey(String);

impl QueryKey {
    /// Build the canonical key for a query string.
    pub fn normalized(query: &str) -> Self {
        Self(normalize(query))
    }

    /// Use a query string verbatim, adding the leading `?` if it is missing.
    pub fn raw(query: &str) -> Self {
        if query.starts_with('?') { Self(query.to_string()) } else { Self(format!("?{query}")) }
    }

    /// Re-normalize an existing key.
    pub fn to_normalized(&self) -> Self {
        Self::normalized(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QueryKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalize a query string.
///
/// Pure and total: malformed percent sequences are kept literally rather than
/// rejected. A query with no parameters normalizes to `?`.
pub fn normalize(query: &str) -> String {
    let query = query.strip_prefix('?').unwrap_or(query);

    let mut pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes()).into_owned().collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish();

    format!("?{encoded}")
}
