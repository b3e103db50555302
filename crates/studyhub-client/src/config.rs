//! Configuration types and loading
//!
//! Config precedence: explicit path > CONFIG_PATH env var > default file
//! name. No secrets live in the TOML — tokens belong to the credential
//! store, the config only points at its file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    pub api: ApiConfig,
    pub credentials: CredentialsConfig,
}

/// API connection settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    /// Base URL all request paths are appended to, e.g. `https://api.studyhub.app/api/v1`
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Bound on the session renewal call; a timed-out renewal is treated
    /// like a transport failure (no logout)
    #[serde(default = "default_renew_timeout")]
    pub renew_timeout_secs: u64,
}

/// Credential persistence settings
#[derive(Debug, Deserialize)]
pub struct CredentialsConfig {
    /// Path of the JSON credential file
    pub path: PathBuf,
}

fn default_timeout() -> u64 {
    30
}

fn default_renew_timeout() -> u64 {
    30
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: ClientConfig = toml::from_str(&contents)?;

        if !config.api.base_url.starts_with("http://")
            && !config.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.api.renew_timeout_secs == 0 {
            return Err(common::Error::Config(
                "renew_timeout_secs must be greater than 0".into(),
            ));
        }

        // Request paths always start with '/', so drop trailing slashes to
        // keep concatenation predictable.
        while config.api.base_url.ends_with('/') {
            config.api.base_url.pop();
        }

        Ok(config)
    }

    /// Resolve config file path from an explicit path or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("studyhub-client.toml")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn renew_timeout(&self) -> Duration {
        Duration::from_secs(self.api.renew_timeout_secs)
    }

    /// Build the HTTP client with the configured request timeout.
    pub fn http_client(&self) -> common::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout())
            .build()
            .map_err(|e| common::Error::Http(format!("building HTTP client: {e}")))
    }
}
