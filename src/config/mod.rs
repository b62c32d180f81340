//! Core configuration.
//!
//! A host application builds a [`CoreConfig`] in code or loads it from a
//! TOML file. Every field has a default so a partial file (or an empty
//! one) is valid.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "https://api.tether.dev";
const DEFAULT_PROBE_HOST: &str = "1.1.1.1";
const DEFAULT_PROBE_PORT: u16 = 53;
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 3;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Configuration for the session core (`[core]` in the host's config.toml).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Base URL of the backend API.
    pub api_base_url: String,
    /// Host used by the active reachability probe. Should be a fixed,
    /// highly-available address; the default is a public DNS resolver.
    pub probe_host: String,
    /// Port used by the active reachability probe.
    pub probe_port: u16,
    /// Upper bound on a single reachability probe, in seconds.
    pub probe_timeout_secs: u64,
    /// Per-request timeout for backend calls, in seconds.
    pub request_timeout_secs: u64,
    /// Build number of the running application. Compared against the
    /// server's minimum supported build to decide block/update states.
    pub running_build: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            probe_host: DEFAULT_PROBE_HOST.to_string(),
            probe_port: DEFAULT_PROBE_PORT,
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            running_build: 0,
        }
    }
}

impl CoreConfig {
    /// Load configuration from a TOML file. Missing fields fall back to
    /// their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
