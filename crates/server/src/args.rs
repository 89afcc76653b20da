//! Command-line arguments.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Serialize;

#[derive(Debug, Parser)]
#[command(name = "canned", version, about = "Serve recorded API responses, or record them from a live backend")]
pub struct Cli {
    /// Directory holding index.json and the recorded responses.
    pub responses_directory: Option<PathBuf>,

    /// Listen port (default 3000).
    #[arg(long)]
    pub port: Option<u16>,

    /// Record mode: fetch every request from this base URL and store the response.
    #[arg(long = "update-responses-server-url", value_name = "URL")]
    pub live_backend_base_url: Option<String>,

    /// Store normalized query strings as index keys when recording.
    #[arg(long = "normalize-query-strings-in-index")]
    pub normalize_keys_before_storing: bool,

    /// Log at debug level.
    #[arg(long)]
    pub verbose: bool,

    /// Also write logs to a per-run file in this directory.
    #[arg(long, value_name = "DIR")]
    pub log_directory: Option<PathBuf>,
}

/// Flags given on the command line, as a figment layer.
///
/// Absent flags are skipped so they do not mask file or environment values.
#[derive(Debug, Default, PartialEq, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses_directory: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_backend_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalize_keys_before_storing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose_logging: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_directory: Option<PathBuf>,
}

impl Cli {
    pub fn overrides(&self) -> CliOverrides {
        CliOverrides {
            responses_directory: self.responses_directory.as_ref().map(|dir| resolve_directory(dir)),
            port: self.port,
            live_backend_base_url: self.live_backend_base_url.clone(),
            normalize_keys_before_storing: self.normalize_keys_before_storing.then_some(true),
            verbose_logging: self.verbose.then_some(true),
            log_directory: self.log_directory.clone(),
        }
    }
}

/// Resolve an existing directory to its canonical path; keep others as given.
fn resolve_directory(dir: &Path) -> PathBuf {
    std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}
