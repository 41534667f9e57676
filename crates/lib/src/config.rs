//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.askrelay/config.json`) and environment.
//! Every field has a compiled-in default, so a missing file serves the production skill.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Application id of the voice skill this adapter serves.
pub const DEFAULT_APPLICATION_ID: &str = "amzn1.echo-sdk-ams.app.31f81f3c-4b1b-44c7-8126-cd4e468b72c2";

/// Scheme and host of the upstream API.
pub const DEFAULT_UPSTREAM_BASE_URL: &str = "https://api.rogertalk.com";

/// Route on the upstream API that accepts forwarded skill requests.
pub const DEFAULT_UPSTREAM_PATH: &str = "/ask/v1/request";

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Identity check and upstream endpoint.
    #[serde(default)]
    pub forwarder: ForwarderConfig,

    /// Webhook host bind and port.
    #[serde(default)]
    pub server: ServerConfig,
}

/// Settings consumed by the request forwarder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwarderConfig {
    /// Only events whose `session.application.applicationId` equals this are served.
    /// Overridden by ASKRELAY_APPLICATION_ID env.
    #[serde(default = "default_application_id")]
    pub application_id: String,

    /// Scheme and host of the upstream (e.g. "https://api.rogertalk.com").
    /// Overridden by ASKRELAY_UPSTREAM_BASE_URL env.
    #[serde(default = "default_upstream_base_url")]
    pub upstream_base_url: String,

    /// Path the event is POSTed to.
    #[serde(default = "default_upstream_path")]
    pub upstream_path: String,
}

/// Webhook host bind address and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Port for HTTP (default 15152).
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1").
    #[serde(default = "default_server_bind")]
    pub bind: String,
}

fn default_application_id() -> String {
    DEFAULT_APPLICATION_ID.to_string()
}

fn default_upstream_base_url() -> String {
    DEFAULT_UPSTREAM_BASE_URL.to_string()
}

fn default_upstream_path() -> String {
    DEFAULT_UPSTREAM_PATH.to_string()
}

fn default_server_port() -> u16 {
    15152
}

fn default_server_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            application_id: default_application_id(),
            upstream_base_url: default_upstream_base_url(),
            upstream_path: default_upstream_path(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_server_port(),
            bind: default_server_bind(),
        }
    }
}

impl ForwarderConfig {
    /// Full upstream URL: base and path joined with exactly one `/`.
    pub fn upstream_url(&self) -> String {
        let base = self.upstream_base_url.trim_end_matches('/');
        let path = self.upstream_path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }
}

/// Read a non-empty, trimmed env var.
fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Apply env overrides: ASKRELAY_APPLICATION_ID and ASKRELAY_UPSTREAM_BASE_URL win over the file.
pub fn apply_env_overrides(config: &mut Config) {
    if let Some(id) = env_non_empty("ASKRELAY_APPLICATION_ID") {
        config.forwarder.application_id = id;
    }
    if let Some(base) = env_non_empty("ASKRELAY_UPSTREAM_BASE_URL") {
        config.forwarder.upstream_base_url = base;
    }
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("ASKRELAY_CONFIG_PATH").map(PathBuf::from).unwrap_or_else(|_| {
        dirs::home_dir()
            .map(|h| h.join(".askrelay").join("config.json"))
            .unwrap_or_else(|| PathBuf::from("config.json"))
    })
}

/// Load config from the given path, or the default path (or ASKRELAY_CONFIG_PATH). Missing file => default config.
/// Env overrides are applied last. Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let mut config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    apply_env_overrides(&mut config);
    Ok((config, path))
}
