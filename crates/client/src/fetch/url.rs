//! Live backend URL construction.

/// Error type for base URL validation failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Check that `base` is an absolute http(s) URL.
///
/// The base is returned trimmed but otherwise untouched; it is never
/// re-serialized, since [`live_url`] appends keys to it verbatim.
pub fn validate_base(base: &str) -> Result<String, UrlError> {
    let trimmed = base.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let parsed = url::Url::parse(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    Ok(trimmed.to_string())
}

/// Build the live URL for a key by plain concatenation.
///
/// The key already carries its own percent-encoding, so nothing is escaped
/// again here.
pub fn live_url(base: &str, key: &str) -> String {
    format!("{base}{key}")
}
