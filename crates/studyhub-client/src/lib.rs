//! Authenticated Studyhub API client with single-flight session renewal
//!
//! Every feature of the host application talks to the API through
//! [`ApiClient::execute`]. The client attaches the current access token,
//! classifies the response, and when the server rejects an expired token it
//! renews the session with the refresh token — at most one renewal in
//! flight no matter how many requests discover the expired token at the
//! same time. Requests that arrive mid-renewal are queued and replayed with
//! the new token; each caller receives the outcome of its own replay.
//!
//! Session-survival policy: a request or renewal that never reaches the
//! server is a transport failure and never ends the session. Only an
//! explicit 401/403 from the renewal endpoint invalidates the session,
//! which clears the credential store and fires the [`SessionNotifier`]
//! exactly once.

mod classify;
mod dispatch;
mod outcome;

pub mod client;
pub mod config;
pub mod notify;
pub mod request;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use notify::{NullNotifier, SessionNotifier};
pub use outcome::{Error, Result};
pub use request::ApiRequest;
