//! Stable JSON rendering shared by the index and captured bodies.
//!
//! Objects are written with sorted keys and four-space indentation, so equal
//! values always render to identical bytes.

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

const INDENT: &[u8] = b"    ";

/// Serialize `value` with stable formatting.
pub fn to_stable_vec<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Re-render a response body with stable formatting if it is JSON.
///
/// Returns `None` when the body does not parse, in which case callers keep
/// the original bytes.
pub fn canonicalize_body(body: &[u8]) -> Option<Vec<u8>> {
    let mut value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.sort_all_objects();
    to_stable_vec(&value).ok()
}
