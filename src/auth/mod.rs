//! Session and authorization state.
//!
//! [`SessionResolver`] owns the application's [`AuthState`]; the
//! collaborator traits here are the seams to the persisted session store,
//! the remote configuration endpoint, and the logout endpoint.

mod logout;
mod resolver;

pub use logout::LogoutCoordinator;
pub use resolver::SessionResolver;

use crate::transport::TransportError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::sync::watch;

/// The single authorization state driving the rest of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    /// Startup, or a configuration fetch in flight.
    Init,
    /// No stored session credential.
    Unauthorized,
    /// The configuration fetch failed; waiting for an explicit retry.
    ConfigError,
    /// The server blocks this build entirely.
    Blocked,
    /// A mandatory update must be installed before continuing.
    UpdateRequired,
    /// An optional update is available.
    UpdateAvailable,
    /// Fully authorized.
    Authorized,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::Unauthorized => "unauthorized",
            Self::ConfigError => "config_error",
            Self::Blocked => "blocked",
            Self::UpdateRequired => "update_required",
            Self::UpdateAvailable => "update_available",
            Self::Authorized => "authorized",
        };
        f.write_str(s)
    }
}

/// Opaque session credential persisted by the host application.
///
/// The core only reads presence and attaches the token to outgoing calls;
/// it never interprets or stores the credential itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: String,
    pub account_id: String,
}

/// Server-provided client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    /// Minimum supported build number. Block/update branches only apply
    /// when this is strictly greater than the running build.
    pub min_build: u64,
    #[serde(default)]
    pub block_app: bool,
    #[serde(default)]
    pub force_update: bool,
    #[serde(default)]
    pub flexible_update: bool,
    /// Server-side feature switches.
    #[serde(default)]
    pub features: BTreeMap<String, bool>,
}

/// A fetched configuration with its fetch time.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub config: RemoteConfig,
    pub fetched_at: DateTime<Utc>,
}

/// Persisted session store collaborator.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Observable current credential. `None` means signed out.
    fn credential(&self) -> watch::Receiver<Option<Credential>>;

    /// Drop the stored credential (logout).
    async fn clear_session(&self);
}

/// Remote configuration endpoint collaborator.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self) -> Result<RemoteConfig, TransportError>;
}

/// Logout endpoint collaborator.
#[async_trait]
pub trait LogoutApi: Send + Sync {
    async fn logout(&self) -> Result<(), TransportError>;
}
