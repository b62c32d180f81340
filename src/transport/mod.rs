//! Transport failure taxonomy and the HTTP collaborator.
//!
//! Remote operations hand the executor a `Result<T, TransportError>`.
//! The three raise-classes the executor distinguishes are all here:
//! host-unreachable, HTTP-status-with-body, and payload-decode failure.
//! Everything else folds into [`TransportError::Other`].

mod http;

pub use http::{classify, get_json, HttpConfigSource};

use thiserror::Error;

/// Failure classes a remote operation can raise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// DNS/connection failure before any byte was exchanged.
    #[error("host unreachable: {0}")]
    HostUnreachable(String),
    /// The server answered with a non-success HTTP status. `body` is the
    /// raw response body when one was captured.
    #[error("http status {status}")]
    Http { status: u16, body: Option<String> },
    /// The response body could not be decoded into the expected shape.
    #[error("decode failure: {0}")]
    Decode(String),
    /// Unclassified failure.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Shorthand for an HTTP error with no captured body.
    pub fn status(status: u16) -> Self {
        Self::Http { status, body: None }
    }

    /// Shorthand for an HTTP error with a body.
    pub fn status_with_body(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: Some(body.into()),
        }
    }
}
