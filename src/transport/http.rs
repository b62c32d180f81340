//! reqwest-backed transport glue.
//!
//! Maps `reqwest` failures onto the [`TransportError`] raise-classes and
//! provides [`HttpConfigSource`], the production fetcher for the remote
//! configuration endpoint.

use super::TransportError;
use crate::auth::{ConfigSource, RemoteConfig, SessionStore};
use crate::config::CoreConfig;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Classify a `reqwest` error into a [`TransportError`].
///
/// A connect failure or a timeout with no response yet means no byte was
/// exchanged — host unreachable. Body-decode failures map to `Decode`.
/// A status error (from `error_for_status`) maps to `Http` without a body;
/// [`get_json`] captures bodies itself before that point.
pub fn classify(err: reqwest::Error) -> TransportError {
    if err.is_connect() || (err.is_timeout() && err.status().is_none()) {
        return TransportError::HostUnreachable(err.to_string());
    }
    if err.is_decode() {
        return TransportError::Decode(err.to_string());
    }
    if let Some(status) = err.status() {
        return TransportError::Http {
            status: status.as_u16(),
            body: None,
        };
    }
    TransportError::Other(err.to_string())
}

/// GET `url` and decode the JSON body into `T`.
///
/// Non-success statuses are returned as `Http { status, body }` with the
/// raw body captured for message extraction; a body that fails to decode
/// into `T` is returned as `Decode`.
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
) -> Result<T, TransportError> {
    let mut request = client.get(url);
    if let Some(token) = bearer {
        request = request.bearer_auth(token);
    }

    let response = request.send().await.map_err(classify)?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.ok().filter(|b| !b.is_empty());
        debug!(url, status = status.as_u16(), "backend returned error status");
        return Err(TransportError::Http {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await.map_err(classify)?;
    serde_json::from_slice(&bytes).map_err(|e| TransportError::Decode(e.to_string()))
}

/// Fetches the remote configuration from `{api_base_url}/client/config`,
/// attaching the stored credential as a bearer token when present.
pub struct HttpConfigSource {
    client: reqwest::Client,
    url: String,
    store: Arc<dyn SessionStore>,
}

impl HttpConfigSource {
    pub fn new(config: &CoreConfig, store: Arc<dyn SessionStore>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: format!("{}/client/config", config.api_base_url),
            store,
        }
    }
}

#[async_trait]
impl ConfigSource for HttpConfigSource {
    async fn fetch(&self) -> Result<RemoteConfig, TransportError> {
        let token = {
            let rx = self.store.credential();
            let cred = rx.borrow();
            cred.as_ref().map(|c| c.token.clone())
        };
        get_json(&self.client, &self.url, token.as_deref()).await
    }
}

impl std::fmt::Debug for HttpConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConfigSource")
            .field("url", &self.url)
            .finish()
    }
}
