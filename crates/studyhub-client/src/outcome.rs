//! Outcome taxonomy for dispatched requests
//!
//! `Outcome` is what the dispatcher reports; `Error` is what callers see.
//! The two differ by exactly one variant: `AuthExpired` is absorbed by the
//! renewal machinery in `client.rs` and has no public counterpart, so the
//! type system enforces that it can never leak to a caller.

use thiserror::Error;

/// Raw classification of one dispatched request.
#[derive(Debug)]
pub(crate) enum Outcome {
    /// Successful response; payload is the envelope's `data` field.
    Success(serde_json::Value),
    /// The server rejected the access token; retryable via renewal.
    AuthExpired,
    /// The request never completed (connection refused, timeout, DNS).
    Transport(String),
    /// The server answered with a well-formed rejection unrelated to auth.
    Api(String),
}

/// Terminal error surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The refresh token was rejected; the user must re-authenticate.
    #[error("session invalid: re-authentication required")]
    SessionInvalid,

    /// The request (or the renewal) never reached the server. The session
    /// is intact and a later request may succeed.
    #[error("network error: {0}")]
    Transport(String),

    /// The server answered and said no, for a reason unrelated to auth.
    #[error("API error: {0}")]
    Api(String),
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
