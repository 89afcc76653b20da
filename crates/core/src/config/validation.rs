//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if `responses_directory` is unset, and
    /// `ConfigError::Invalid` if:
    /// - `live_backend_base_url` is not an absolute http(s) URL
    /// - `fetch_timeout_ms` is set below 100ms or above 5 minutes
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.require_responses_directory()?;

        if let Some(base_url) = &self.live_backend_base_url {
            let parsed = url::Url::parse(base_url).map_err(|e| ConfigError::Invalid {
                field: "live_backend_base_url".into(),
                reason: format!("not a valid URL: {e}"),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid {
                    field: "live_backend_base_url".into(),
                    reason: format!("unsupported scheme: {}", parsed.scheme()),
                });
            }
            if parsed.fragment().is_some() {
                tracing::warn!(base_url, "live_backend_base_url has a fragment; appended query strings will be ignored");
            }
        }

        if let Some(timeout_ms) = self.fetch_timeout_ms {
            if timeout_ms < 100 {
                return Err(ConfigError::Invalid {
                    field: "fetch_timeout_ms".into(),
                    reason: "must be at least 100ms".into(),
                });
            }
            if timeout_ms > 300_000 {
                return Err(ConfigError::Invalid {
                    field: "fetch_timeout_ms".into(),
                    reason: "must not exceed 5 minutes (300000ms)".into(),
                });
            }
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.normalize_keys_before_storing && !self.capture_enabled() {
            tracing::debug!("normalize_keys_before_storing only affects capture mode");
        }

        Ok(())
    }
}
