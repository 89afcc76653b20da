//! Request resolution for replay and capture modes.
//!
//! The mode is chosen once at startup. Replay answers from an immutable
//! snapshot of the responses directory; capture fetches from the live backend,
//! records the body and echoes it back.

use std::sync::Arc;

use bytes::Bytes;
use canned_client::{FetchClient, FetchConfig, Upstream};
use canned_core::store::json::canonicalize_body;
use canned_core::{AppConfig, Error, QueryKey, ReplaySnapshot, ResponsesDir};
use serde::Serialize;

/// Outcome of resolving one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Replay mode found a stored body.
    Hit(Bytes),
    /// Replay mode had no entry; the body is the JSON error payload.
    Miss(Bytes),
    /// Capture mode fetched and recorded a body.
    Captured { key: QueryKey, body: Bytes },
    /// The request target had no query component.
    NoQuery,
}

impl Resolution {
    /// Body sent to the client, if the outcome carries one.
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Resolution::Hit(body) | Resolution::Miss(body) | Resolution::Captured { body, .. } => Some(body),
            Resolution::NoQuery => None,
        }
    }
}

#[derive(Serialize)]
struct ErrorPayload<'a> {
    error: &'a str,
}

/// Capture-mode state: where to fetch from and where to record to.
pub struct Recorder {
    upstream: Arc<dyn Upstream>,
    responses: ResponsesDir,
    normalize_keys: bool,
    pretty_json_bodies: bool,
}

impl Recorder {
    pub fn new(upstream: Arc<dyn Upstream>, responses: ResponsesDir) -> Self {
        Self { upstream, responses, normalize_keys: false, pretty_json_bodies: false }
    }

    /// Store normalized query strings as index keys.
    pub fn normalize_keys(mut self, enabled: bool) -> Self {
        self.normalize_keys = enabled;
        self
    }

    /// Re-render JSON bodies with stable formatting before storing them.
    pub fn pretty_json_bodies(mut self, enabled: bool) -> Self {
        self.pretty_json_bodies = enabled;
        self
    }

    async fn capture(&self, raw: QueryKey) -> Result<Resolution, Error> {
        let key = if self.normalize_keys { raw.to_normalized() } else { raw };

        let mut body = match self.upstream.fetch_body(&key).await {
            Ok(body) => body,
            Err(err) => {
                tracing::error!(key = %key, "{err}");
                Bytes::new()
            }
        };

        if self.pretty_json_bodies
            && let Some(pretty) = canonicalize_body(&body)
        {
            body = Bytes::from(pretty);
        }

        self.responses.record(key.clone(), &body).await?;

        Ok(Resolution::Captured { key, body })
    }
}

/// Operating mode, fixed for the lifetime of the process.
pub enum Mode {
    Replay(ReplaySnapshot),
    Capture(Recorder),
}

/// Resolves request queries to response bodies.
pub struct Resolver {
    mode: Mode,
}

impl Resolver {
    pub fn replay(snapshot: ReplaySnapshot) -> Self {
        Self { mode: Mode::Replay(snapshot) }
    }

    pub fn capture(recorder: Recorder) -> Self {
        Self { mode: Mode::Capture(recorder) }
    }

    /// Build the resolver the configuration asks for.
    ///
    /// Replay mode loads the whole responses directory here; a missing or
    /// malformed index, or a missing body, aborts startup. Capture mode starts
    /// from an empty index when none exists yet.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let root = config
            .require_responses_directory()
            .map_err(|e| Error::InvalidInput(e.to_string()))?;
        let responses = ResponsesDir::new(root);

        match &config.live_backend_base_url {
            Some(base_url) => {
                let client = FetchClient::new(base_url, FetchConfig::from(config))?;
                tracing::info!(base_url = client.base_url(), "capture mode: recording live responses");
                let recorder = Recorder::new(Arc::new(client), responses)
                    .normalize_keys(config.normalize_keys_before_storing)
                    .pretty_json_bodies(config.pretty_json_bodies);
                Ok(Self::capture(recorder))
            }
            None => {
                let snapshot = responses.load_snapshot().await?;
                tracing::info!(
                    directory = %responses.root().display(),
                    entries = snapshot.len(),
                    "replay mode: serving recorded responses"
                );
                Ok(Self::replay(snapshot))
            }
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match self.mode {
            Mode::Replay(_) => "replay",
            Mode::Capture(_) => "capture",
        }
    }

    /// Resolve the query component of a request target.
    ///
    /// `raw_query` includes its leading `?`; `None` means the target had no
    /// query at all. Only capture-mode storage failures return `Err`.
    pub async fn resolve(&self, raw_query: Option<&str>) -> Result<Resolution, Error> {
        let Some(raw_query) = raw_query else {
            return Ok(Resolution::NoQuery);
        };
        let raw = QueryKey::raw(raw_query);

        match &self.mode {
            Mode::Replay(snapshot) => Ok(replay(snapshot, &raw)),
            Mode::Capture(recorder) => recorder.capture(raw).await,
        }
    }
}

fn replay(snapshot: &ReplaySnapshot, raw: &QueryKey) -> Resolution {
    match snapshot.get(&raw.to_normalized()) {
        Some(body) => Resolution::Hit(body.clone()),
        None => {
            let err = Error::KeyNotFound(raw.to_string());
            tracing::error!("{err}");
            Resolution::Miss(error_payload(&Error::not_found_message(raw.as_str())))
        }
    }
}

fn error_payload(message: &str) -> Bytes {
    match serde_json::to_vec(&ErrorPayload { error: message }) {
        Ok(body) => Bytes::from(body),
        Err(err) => {
            tracing::error!("failed to serialize error payload: {err}");
            Bytes::new()
        }
    }
}
