//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Caller-supplied overrides (command-line flags)
//! 2. Environment variables (CANNED_*)
//! 3. TOML config file (if CANNED_CONFIG_FILE set)
//! 4. Built-in defaults

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment, Provider,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Environment variable naming an optional TOML config file.
pub const CONFIG_FILE_ENV: &str = "CANNED_CONFIG_FILE";

/// Application configuration with layered loading.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding `index.json` and the captured bodies. Required.
    ///
    /// Set via CANNED_RESPONSES_DIRECTORY environment variable.
    #[serde(default)]
    pub responses_directory: Option<PathBuf>,

    /// Listen port.
    ///
    /// Set via CANNED_PORT environment variable.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the real backend. Setting it switches to capture mode.
    ///
    /// Set via CANNED_LIVE_BACKEND_BASE_URL environment variable.
    #[serde(default)]
    pub live_backend_base_url: Option<String>,

    /// Whether capture mode stores normalized query strings as index keys
    /// instead of the raw query string.
    ///
    /// Set via CANNED_NORMALIZE_KEYS_BEFORE_STORING environment variable.
    #[serde(default)]
    pub normalize_keys_before_storing: bool,

    /// Log at debug level instead of info.
    ///
    /// Set via CANNED_VERBOSE_LOGGING environment variable.
    #[serde(default)]
    pub verbose_logging: bool,

    /// Directory that additionally receives a per-run log file.
    ///
    /// Set via CANNED_LOG_DIRECTORY environment variable.
    #[serde(default)]
    pub log_directory: Option<PathBuf>,

    /// Upper bound on a live fetch, in milliseconds. Unset means no bound.
    ///
    /// Set via CANNED_FETCH_TIMEOUT_MS environment variable.
    #[serde(default)]
    pub fetch_timeout_ms: Option<u64>,

    /// User-Agent string for live fetches.
    ///
    /// Set via CANNED_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Re-render captured JSON bodies with sorted keys and stable indentation.
    ///
    /// Set via CANNED_PRETTY_JSON_BODIES environment variable.
    #[serde(default)]
    pub pretty_json_bodies: bool,
}

fn default_port() -> u16 {
    3000
}

fn default_user_agent() -> String {
    "canned/0.1".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            responses_directory: None,
            port: default_port(),
            live_backend_base_url: None,
            normalize_keys_before_storing: false,
            verbose_logging: false,
            log_directory: None,
            fetch_timeout_ms: None,
            user_agent: default_user_agent(),
            pretty_json_bodies: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, config file and environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the sources cannot be read or parsed, or if
    /// validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        Self::extract(Self::figment())
    }

    /// Load configuration with `overrides` merged on top of every other source.
    ///
    /// Priority (highest wins):
    /// 1. `overrides`
    /// 2. Environment variables prefixed with `CANNED_`
    /// 3. TOML file from `CANNED_CONFIG_FILE` (if set)
    /// 4. Built-in defaults via `Default::default()`
    pub fn load_with(overrides: impl Provider) -> Result<Self, ConfigError> {
        Self::extract(Self::figment().merge(overrides))
    }

    fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var(CONFIG_FILE_ENV) {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment.merge(
            Env::prefixed("CANNED_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into()),
        )
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The responses directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if it was not configured.
    pub fn require_responses_directory(&self) -> Result<&Path, ConfigError> {
        self.responses_directory.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "responses_directory".into(),
            hint: "Pass it as the first argument or set CANNED_RESPONSES_DIRECTORY".into(),
        })
    }

    /// Whether a live backend is configured.
    pub fn capture_enabled(&self) -> bool {
        self.live_backend_base_url.is_some()
    }

    /// Fetch timeout as Duration for use with reqwest, if one is configured.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.responses_directory.is_none());
        assert_eq!(config.port, 3000);
        assert!(config.live_backend_base_url.is_none());
        assert!(!config.normalize_keys_before_storing);
        assert!(!config.verbose_logging);
        assert!(config.log_directory.is_none());
        assert!(config.fetch_timeout_ms.is_none());
        assert_eq!(config.user_agent, "canned/0.1");
        assert!(!config.pretty_json_bodies);
        assert!(!config.capture_enabled());
    }

    #[test]
    fn test_fetch_timeout_duration() {
        let config = AppConfig { fetch_timeout_ms: Some(1_500), ..Default::default() };
        assert_eq!(config.fetch_timeout(), Some(Duration::from_millis(1_500)));
        assert_eq!(AppConfig::default().fetch_timeout(), None);
    }

    #[test]
    fn test_require_responses_directory_missing() {
        let config = AppConfig::default();
        let result = config.require_responses_directory();
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_responses_directory_present() {
        let config = AppConfig { responses_directory: Some("fixtures".into()), ..Default::default() };
        assert_eq!(config.require_responses_directory().unwrap(), Path::new("fixtures"));
    }

    #[test]
    fn test_load_from_env() {
        Jail::expect_with(|jail| {
            jail.set_env("CANNED_RESPONSES_DIRECTORY", "responses");
            jail.set_env("CANNED_PORT", "8080");
            jail.set_env("CANNED_NORMALIZE_KEYS_BEFORE_STORING", "true");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.responses_directory, Some(PathBuf::from("responses")));
            assert_eq!(config.port, 8080);
            assert!(config.normalize_keys_before_storing);
            Ok(())
        });
    }

    #[test]
    fn test_load_from_file_then_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "canned.toml",
                r#"
                responses_directory = "from-file"
                port = 4000
                live_backend_base_url = "http://upstream.test/api"
                "#,
            )?;
            jail.set_env(CONFIG_FILE_ENV, "canned.toml");
            jail.set_env("CANNED_PORT", "5000");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.responses_directory, Some(PathBuf::from("from-file")));
            assert_eq!(config.port, 5000);
            assert!(config.capture_enabled());
            Ok(())
        });
    }

    #[test]
    fn test_overrides_win() {
        Jail::expect_with(|jail| {
            jail.set_env("CANNED_RESPONSES_DIRECTORY", "from-env");
            jail.set_env("CANNED_PORT", "5000");

            let overrides = Serialized::defaults(serde_json::json!({ "port": 6000 }));
            let config = AppConfig::load_with(overrides).map_err(|e| e.to_string())?;
            assert_eq!(config.port, 6000);
            assert_eq!(config.responses_directory, Some(PathBuf::from("from-env")));
            Ok(())
        });
    }

    #[test]
    fn test_load_without_directory_fails() {
        Jail::expect_with(|_jail| {
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Missing { .. })));
            Ok(())
        });
    }
}
