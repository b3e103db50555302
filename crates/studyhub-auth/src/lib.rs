//! Session credential management for the Studyhub API client
//!
//! Provides the credential pair model, pluggable credential storage, and the
//! one renewal wire operation the client ever issues. This crate is a
//! standalone library with no dependency on the request dispatcher — it can
//! be tested and used independently.
//!
//! Credential flow:
//! 1. Host application stores tokens after login via `CredentialStore::set()`
//! 2. The client reads them at request time via `CredentialStore::get()`
//! 3. On an expired access token the client calls `token::renew_session()`
//! 4. The renewed pair is saved via `CredentialStore::set()`
//! 5. An authoritative rejection of the refresh token ends the session and
//!    the store is wiped via `CredentialStore::clear()`

pub mod credentials;
pub mod error;
pub mod token;

pub use credentials::{Credentials, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::{Error, Result};
pub use token::{RenewedSession, renew_session};
