//! Response classification
//!
//! Pure mapping from a raw status/body pair to the outcome taxonomy. The
//! API wraps every response in a `{"data": ..., "message": ...}` envelope;
//! successful payloads come from `data`, error messages from `message`.
//!
//! Transport failures never reach this function — the dispatcher maps them
//! before a status code exists. That split is what keeps "could not talk to
//! the server" distinguishable from "server talked back and said no".

use serde::Deserialize;

use crate::outcome::Outcome;

/// Fallback when the server provides no usable error message.
const GENERIC_ERROR: &str = "request failed";

/// Response envelope used by every API endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
}

/// Classify a completed HTTP exchange.
///
/// - 401 → `AuthExpired` (the access token was rejected)
/// - 2xx with a parseable envelope → `Success(data)`
/// - 2xx without a parseable envelope → `Api` with a generic message
/// - anything else → `Api` with the server's `message` or the fallback
pub(crate) fn classify_response(status: u16, body: &str) -> Outcome {
    if status == 401 {
        return Outcome::AuthExpired;
    }

    let envelope: Option<Envelope> = serde_json::from_str(body).ok();

    if (200..300).contains(&status) {
        match envelope {
            Some(env) => Outcome::Success(env.data.unwrap_or(serde_json::Value::Null)),
            None => Outcome::Api(GENERIC_ERROR.to_string()),
        }
    } else {
        let message = envelope
            .and_then(|env| env.message)
            .unwrap_or_else(|| GENERIC_ERROR.to_string());
        Outcome::Api(message)
    }
}
