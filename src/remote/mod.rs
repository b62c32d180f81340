//! Uniform remote-call results.
//!
//! Every backend operation in the application goes through
//! [`RemoteExecutor`] and comes back as a [`CallResult`]: first
//! `InProgress`, then exactly one terminal `Success` or `Error`. Failure
//! classification is done once, here, instead of per feature.
//!
//! The error taxonomy is two-sided: [`CallError::Local`] for failures
//! detected before the network boundary (input validation, local parse)
//! and [`CallError::Remote`] for everything attributable to the server or
//! the transport. Callers route `Local` into inline field feedback and
//! `Remote` into a dismissible alert.

mod envelope;
mod executor;

pub use envelope::Envelope;
pub use executor::{CallHandle, RemoteExecutor, UnauthorizedHandler};

use serde::Deserialize;

/// Fallback message when nothing better is known.
pub const GENERIC_REMOTE_MSG: &str = "Something went wrong. Please try again.";
/// Message for host-unreachable failures.
pub const NETWORK_UNREACHABLE_MSG: &str =
    "Unable to reach the server. Check your connection and try again.";
/// Message for 5xx statuses with no usable body.
pub const SERVER_ISSUE_MSG: &str = "The server is having issues. Please try again later.";
/// Message for payload-decode failures with no detail.
pub const MISMATCHED_DATA_MSG: &str = "Received unexpected data from the server.";

/// A classified call failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// Detected before or without reaching the network boundary.
    Local(String),
    /// Attributable to the server or the transport.
    Remote(String),
}

impl CallError {
    pub fn message(&self) -> &str {
        match self {
            Self::Local(m) | Self::Remote(m) => m,
        }
    }
}

impl std::fmt::Display for CallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Result stream value for a remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallResult<T> {
    InProgress,
    Success(T),
    Error(CallError),
}

impl<T> CallResult<T> {
    /// A local (pre-network) failure — produced by callers, never by the
    /// executor itself.
    pub fn local(message: impl Into<String>) -> Self {
        Self::Error(CallError::Local(message.into()))
    }

    pub fn remote(message: impl Into<String>) -> Self {
        Self::Error(CallError::Remote(message.into()))
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The success value, if this is `Success`.
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(v) => Some(v),
            _ => None,
        }
    }

    /// The error, if this is `Error`.
    pub fn error(self) -> Option<CallError> {
        match self {
            Self::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Extract a human-readable message from a structured error body.
///
/// Accepts both `{"error":{"message":…}}` and the flat `{"message":…}`
/// shape. Returns `None` for absent, malformed, or blank messages — never
/// an empty string.
pub fn extract_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Wrapper {
        error: Option<Inner>,
        message: Option<String>,
    }
    #[derive(Deserialize)]
    struct Inner {
        message: Option<String>,
    }

    let parsed: Wrapper = serde_json::from_str(body).ok()?;
    parsed
        .error
        .and_then(|e| e.message)
        .or(parsed.message)
        .filter(|m| !m.trim().is_empty())
}

/// Message fallback chain for an HTTP failure: structured body message,
/// else a server-issue message for 5xx, else the generic message.
pub(crate) fn message_for_status(status: u16, body: Option<&str>) -> String {
    body.and_then(extract_error_message).unwrap_or_else(|| {
        if (500..600).contains(&status) {
            SERVER_ISSUE_MSG.to_string()
        } else {
            GENERIC_REMOTE_MSG.to_string()
        }
    })
}
