//! Session invalidation signal
//!
//! When the refresh token itself is rejected the rest of the application
//! has to react (drop local state, show the login screen). That reaction
//! lives behind this trait so the client never depends on UI concerns.

/// Receiver for the one-shot "session invalidated" signal.
///
/// Fired at most once per failed renewal, no matter how many requests were
/// waiting on that renewal.
pub trait SessionNotifier: Send + Sync {
    fn session_invalidated(&self);
}

/// Notifier that ignores the signal, for hosts that poll session state
/// instead of reacting to it.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl SessionNotifier for NullNotifier {
    fn session_invalidated(&self) {}
}
