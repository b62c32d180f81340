//! Response envelopes.
//!
//! Some transports hand back a response object carrying its own
//! success/failure flag instead of raising on failure. The executor
//! inspects that flag through this trait.

/// A transport response that reports success or failure itself.
pub trait Envelope {
    /// Whether the response represents a successful call.
    fn is_success(&self) -> bool;

    /// Raw structured error body, when the response carries one.
    fn error_body(&self) -> Option<&str>;
}
