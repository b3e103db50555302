//! Session renewal wire operation
//!
//! The one call this workspace ever makes with the refresh token:
//! `POST {base}/auth/refresh` with the refresh token in the JSON body. The
//! API wraps every response in a `{"data": ..., "message": ...}` envelope;
//! a successful renewal carries the new access token (and optionally a
//! rotated refresh token) under `data`.
//!
//! Error mapping is the heart of the session-survival policy: only an
//! explicit 401/403 from the renewal endpoint means the refresh token is
//! dead. A request that never reached the server, or a server-side failure,
//! must stay distinguishable so the caller never wipes a session over a
//! connectivity blip.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Path of the renewal endpoint, relative to the API base URL.
pub const RENEW_PATH: &str = "/auth/refresh";

/// Tokens returned by a successful renewal.
///
/// `refresh_token` is optional: the server may rotate it on every renewal
/// or keep reusing the original. Callers keep their existing refresh token
/// when the field is absent.
#[derive(Debug, Deserialize)]
pub struct RenewedSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RenewEnvelope {
    #[serde(default)]
    data: Option<RenewedSession>,
}

/// Exchange a refresh token for a new access token.
///
/// - 2xx with a parseable envelope → `RenewedSession`
/// - 401/403 → `Error::InvalidCredentials` (authoritative rejection)
/// - other non-success status or malformed body → `Error::Renewal`
/// - request never completed → `Error::Http`
pub async fn renew_session(
    client: &reqwest::Client,
    base_url: &str,
    refresh_token: &str,
) -> Result<RenewedSession> {
    let response = client
        .post(format!("{base_url}{RENEW_PATH}"))
        .json(&serde_json::json!({ "refresh_token": refresh_token }))
        .send()
        .await
        .map_err(|e| Error::Http(format!("session renewal request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        // 401/403 means the refresh token is revoked or expired
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::InvalidCredentials(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }

        return Err(Error::Renewal(format!(
            "renewal endpoint returned {status}: {body}"
        )));
    }

    let envelope = response
        .json::<RenewEnvelope>()
        .await
        .map_err(|e| Error::Renewal(format!("invalid renewal response: {e}")))?;

    envelope
        .data
        .ok_or_else(|| Error::Renewal("renewal response missing data".into()))
}
